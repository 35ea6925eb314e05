//! Client for the TrueStar review scoring service

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info};
use url::Url;

use super::config::ScoringConfig;
use super::error_reporter::ErrorReporter;
use super::fetch_error::FetchError;
use super::http_client::{HttpClient, HttpClientConfig};
use crate::domain::analysis::{AnalysisRequest, AnalysisResult};
use crate::domain::review::Review;

pub const PRODUCT_CHECK_PATH: &str = "/check/amazon/product";

/// Scores a batch of reviews. Never fails: service problems yield
/// [`AnalysisResult::fallback`].
#[async_trait]
pub trait ScoringClient: Send + Sync {
    async fn analyze_reviews(&self, reviews: &[Review], total_review_count: Option<u64>) -> AnalysisResult;
}

pub struct TrueStarApiClient {
    http: HttpClient,
    endpoint: Url,
    reporter: Arc<dyn ErrorReporter>,
}

impl TrueStarApiClient {
    pub fn new(http: HttpClient, base_url: &Url, reporter: Arc<dyn ErrorReporter>) -> anyhow::Result<Self> {
        let endpoint = base_url.join(PRODUCT_CHECK_PATH)?;
        Ok(Self {
            http,
            endpoint,
            reporter,
        })
    }

    pub fn from_config(config: &ScoringConfig, reporter: Arc<dyn ErrorReporter>) -> anyhow::Result<Self> {
        let http = HttpClient::new(HttpClientConfig {
            timeout_seconds: config.timeout_seconds,
            ..HttpClientConfig::default()
        })?;
        let base_url = Url::parse(&config.base_url)?;
        Self::new(http, &base_url, reporter)
    }

    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn request(&self, reviews: &[Review], total_review_count: Option<u64>) -> Result<AnalysisResult, FetchError> {
        let body = AnalysisRequest {
            reviews,
            total_review_count,
        };
        self.http.post_json(self.endpoint.as_str(), &body).await
    }
}

#[async_trait]
impl ScoringClient for TrueStarApiClient {
    async fn analyze_reviews(&self, reviews: &[Review], total_review_count: Option<u64>) -> AnalysisResult {
        info!(
            "Submitting {} reviews for scoring (total hint: {:?})",
            reviews.len(),
            total_review_count
        );

        match self.request(reviews, total_review_count).await {
            Ok(result) => {
                info!("Scoring complete: trust score {}", result.summary.trust_score);
                result
            }
            Err(e) => {
                error!("Backend API error: {}", e);
                self.reporter.report_error(
                    "Failed to analyze reviews",
                    &e,
                    json!({
                        "reviewCount": reviews.len(),
                        "status": e.status(),
                    }),
                );
                AnalysisResult::fallback()
            }
        }
    }
}
