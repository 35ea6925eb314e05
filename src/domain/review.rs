use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Author label used when a review carries no profile name.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// A single marketplace review, normalized from listing markup.
///
/// Only reviews with a marketplace-assigned `id`, a positive `rating` and
/// non-empty `text` are ever constructed by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Review {
    pub id: String,
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub title: Option<String>,
    pub text: String,
    pub author_name: String,
    #[serde(default)]
    pub is_verified_purchase: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub helpful_votes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub total_votes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub product_variation: Option<String>,
    #[serde(default)]
    pub is_vine_review: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub badges: Option<BTreeSet<String>>,
}

impl Review {
    /// Minimal review with the three required fields set and every optional field absent.
    pub fn new(id: impl Into<String>, rating: f64, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rating,
            title: None,
            text: text.into(),
            author_name: ANONYMOUS_AUTHOR.to_string(),
            is_verified_purchase: false,
            date: None,
            helpful_votes: None,
            total_votes: None,
            product_variation: None,
            is_vine_review: false,
            badges: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author_name = author.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub const fn verified(mut self, verified: bool) -> Self {
        self.is_verified_purchase = verified;
        self
    }
}

/// Deduplicate reviews by id, keeping the first occurrence and preserving order.
pub fn dedupe_by_id(reviews: impl IntoIterator<Item = Review>) -> Vec<Review> {
    let mut seen = std::collections::HashSet::new();
    reviews
        .into_iter()
        .filter(|review| seen.insert(review.id.clone()))
        .collect()
}
