//! Review total detection on a rendered product or listing page

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use super::config::ReviewSelectors;
use super::review_parser::compile_selectors;
use crate::domain::pagination::PaginationInfo;
use crate::infrastructure::parsing_error::ParsingResult;

/// Integer with optional thousands separators (comma, period, spaces, NBSP).
static LOCALIZED_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+(?:[.,\s\u{a0}\u{202f}]\d+)*").expect("valid count regex")
});
static GLOBAL_REVIEWS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:,\d+)*)\s+global reviews").expect("valid global reviews regex")
});
static DEFAULT_ANALYZER: Lazy<PaginationAnalyzer> =
    Lazy::new(|| PaginationAnalyzer::new().expect("default count selectors compile"));

pub struct PaginationAnalyzer {
    total_count: Vec<Selector>,
}

impl PaginationAnalyzer {
    pub fn new() -> ParsingResult<Self> {
        Self::with_selectors(&ReviewSelectors::default())
    }

    pub fn with_selectors(config: &ReviewSelectors) -> ParsingResult<Self> {
        Ok(Self {
            total_count: compile_selectors("total_review_count", &config.total_review_count)?,
        })
    }

    /// Review total and page count; `{0, 0}` when no indicator is found.
    pub fn analyze(&self, html: &str) -> PaginationInfo {
        let document = Html::parse_document(html);

        let from_element = self.total_count.iter().find_map(|selector| {
            document
                .select(selector)
                .map(|element| element.text().collect::<String>())
                .find_map(|text| parse_localized_count(&text))
        });

        let total = from_element.or_else(|| {
            GLOBAL_REVIEWS
                .captures(html)
                .and_then(|caps| caps.get(1))
                .and_then(|m| parse_localized_count(m.as_str()))
        });

        match total {
            Some(total_reviews) => {
                let info = PaginationInfo::from_total_reviews(total_reviews);
                debug!(
                    "Detected {} reviews across {} pages",
                    info.total_reviews, info.total_pages
                );
                info
            }
            None => {
                debug!("No review count indicator found");
                PaginationInfo::default()
            }
        }
    }
}

/// Convenience wrapper over the default analyzer.
pub fn analyze_pagination(html: &str) -> PaginationInfo {
    DEFAULT_ANALYZER.analyze(html)
}

fn parse_localized_count(text: &str) -> Option<u64> {
    let number = LOCALIZED_COUNT.find(text)?;
    number
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("30,230 global ratings", Some(30_230))]
    #[case("1.234 Bewertungen", Some(1_234))]
    #[case("1\u{a0}234 évaluations", Some(1_234))]
    #[case("12 global ratings", Some(12))]
    #[case("no numbers", None)]
    fn parses_localized_counts(#[case] text: &str, #[case] expected: Option<u64>) {
        assert_eq!(parse_localized_count(text), expected);
    }

    #[test]
    fn reads_total_review_count_element() {
        let html = r#"<span data-hook="total-review-count">2,156 global ratings</span>"#;
        let info = analyze_pagination(html);
        assert_eq!(info.total_reviews, 2_156);
        assert_eq!(info.total_pages, 216);
    }

    #[test]
    fn falls_back_to_global_reviews_text() {
        let html = "<div>4.5 out of 5 stars</div><div>196 global reviews</div>";
        assert_eq!(
            analyze_pagination(html),
            PaginationInfo {
                total_reviews: 196,
                total_pages: 20
            }
        );
    }

    #[test]
    fn missing_indicator_is_zero() {
        assert_eq!(analyze_pagination("<p>nothing</p>"), PaginationInfo::default());
    }

    #[test]
    fn small_totals_round_up() {
        let html = r#"<span data-hook="total-review-count">11 global ratings</span>"#;
        assert_eq!(analyze_pagination(html).total_pages, 2);
    }

    #[test]
    fn invalid_count_selector_is_skipped() {
        let config = ReviewSelectors {
            total_review_count: vec!["[[".to_string(), r#"[data-hook="total-review-count"]"#.to_string()],
            ..ReviewSelectors::default()
        };
        let analyzer = PaginationAnalyzer::with_selectors(&config).unwrap();
        let html = r#"<span data-hook="total-review-count">45 global ratings</span>"#;
        assert_eq!(analyzer.analyze(html).total_reviews, 45);
    }

    #[test]
    fn all_invalid_count_selectors_are_reported() {
        let config = ReviewSelectors {
            total_review_count: vec!["[[".to_string()],
            ..ReviewSelectors::default()
        };
        let error = PaginationAnalyzer::with_selectors(&config).err().unwrap();
        assert!(matches!(
            error,
            crate::infrastructure::parsing_error::ParsingError::NoValidSelectors { ref field, .. }
                if field == "total_review_count"
        ));
    }
}
