//! CSS selector configuration for review extraction
//!
//! Every field carries a priority-ordered list: the first selector that
//! yields a usable value wins, later entries are fallbacks for older markup.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSelectors {
    /// One element per review; its `id` attribute is the review id
    pub review_container: Vec<String>,
    pub author: Vec<String>,
    pub title_container: Vec<String>,
    /// Element whose text reads like "4.0 out of 5 stars"
    pub rating: Vec<String>,
    pub body: Vec<String>,
    pub verified_badge: Vec<String>,
    pub date: Vec<String>,
    pub helpful_votes: Vec<String>,
    pub variation: Vec<String>,
    pub vine_badge: Vec<String>,
    pub badges: Vec<String>,
    /// Element holding the localized total review count
    pub total_review_count: Vec<String>,
}

fn selectors(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ReviewSelectors {
    fn default() -> Self {
        Self {
            review_container: selectors(&[r#"[data-hook="review"]"#]),
            author: selectors(&[".a-profile-name", r#"[data-hook="genome-widget"] .a-profile-name"#]),
            title_container: selectors(&[r#"[data-hook="review-title"]"#, ".review-title"]),
            rating: selectors(&[
                r#"[data-hook="review-star-rating"] .a-icon-alt"#,
                r#"[data-hook="cmps-review-star-rating"] .a-icon-alt"#,
                ".review-rating .a-icon-alt",
            ]),
            body: selectors(&[r#"[data-hook="review-body"]"#, ".review-text-content"]),
            verified_badge: selectors(&[
                r#"[data-hook="avp-badge"]"#,
                r#"[data-hook="avp-badge-linkless"]"#,
            ]),
            date: selectors(&[r#"[data-hook="review-date"]"#]),
            helpful_votes: selectors(&[r#"[data-hook="helpful-vote-statement"]"#]),
            variation: selectors(&[
                r#"[data-hook="format-strip"]"#,
                ".review-data .a-color-secondary",
            ]),
            vine_badge: selectors(&[r#"[data-hook="vine-badge"]"#]),
            badges: selectors(&[
                r#"[data-hook="review-badge"]"#,
                ".c7y-badge-text",
                ".a-profile-descriptor",
            ]),
            total_review_count: selectors(&[r#"[data-hook="total-review-count"]"#]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn default_selectors_all_compile() {
        let config = ReviewSelectors::default();
        let all = [
            &config.review_container,
            &config.author,
            &config.title_container,
            &config.rating,
            &config.body,
            &config.verified_badge,
            &config.date,
            &config.helpful_votes,
            &config.variation,
            &config.vine_badge,
            &config.badges,
            &config.total_review_count,
        ];
        for list in all {
            assert!(!list.is_empty());
            for selector in list {
                assert!(Selector::parse(selector).is_ok(), "{selector}");
            }
        }
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let config: ReviewSelectors =
            serde_json::from_str(r#"{ "author": [".reviewer"] }"#).unwrap();
        assert_eq!(config.author, vec![".reviewer".to_string()]);
        assert_eq!(config.rating, ReviewSelectors::default().rating);
    }
}
