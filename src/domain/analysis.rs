//! Scoring service payloads.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::review::Review;

/// Request body sent to the scoring service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest<'a> {
    pub reviews: &'a [Review],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_review_count: Option<u64>,
}

/// Trust score and supporting detail returned by the scoring service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub timestamp: String,
    pub summary: AnalysisSummary,
    pub metrics: AnalysisMetrics,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub green_flags: Vec<AnalysisFlag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub red_flags: Vec<AnalysisFlag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub trust_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    pub analyzed: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFlag {
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl AnalysisResult {
    /// Zeroed neutral record used whenever the scoring service cannot answer.
    pub fn fallback() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            summary: AnalysisSummary {
                trust_score: 0.0,
                confidence: None,
                text: None,
            },
            metrics: AnalysisMetrics::default(),
            green_flags: Vec::new(),
            red_flags: Vec::new(),
        }
    }

    /// Whether the record can be handed to the presentation layer.
    pub fn is_valid(&self) -> bool {
        !self.timestamp.trim().is_empty() && self.summary.trust_score.is_finite()
    }

    pub fn is_fallback(&self) -> bool {
        self.summary.trust_score == 0.0
            && self.metrics == AnalysisMetrics::default()
            && self.green_flags.is_empty()
            && self.red_flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_service_payload() {
        let payload = r#"{
            "timestamp": "2024-01-01T00:00:00Z",
            "summary": { "trustScore": 85 },
            "metrics": { "analyzed": 10, "total": 50 },
            "greenFlags": [
                { "type": "high_verified_purchases", "confidence": 0.9, "details": { "percentage": 90 } }
            ]
        }"#;

        let result: AnalysisResult = serde_json::from_str(payload).unwrap();

        assert!(result.is_valid());
        assert!((result.summary.trust_score - 85.0).abs() < f64::EPSILON);
        assert_eq!(result.metrics, AnalysisMetrics { analyzed: 10, total: 50 });
        assert_eq!(result.green_flags[0].kind, "high_verified_purchases");
        assert!(result.red_flags.is_empty());
    }

    #[test]
    fn fallback_is_zeroed_but_valid() {
        let fallback = AnalysisResult::fallback();
        assert!(fallback.is_valid());
        assert!(fallback.is_fallback());
    }

    #[test]
    fn request_omits_missing_total() {
        let reviews = vec![Review::new("R1", 5.0, "Great")];
        let body = serde_json::to_value(AnalysisRequest {
            reviews: &reviews,
            total_review_count: None,
        })
        .unwrap();

        assert!(body.get("totalReviewCount").is_none());
        assert_eq!(body["reviews"][0]["id"], "R1");
    }
}
