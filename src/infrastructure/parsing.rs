//! HTML parsing for review listing pages
//!
//! Selector-driven extraction with priority-ordered fallbacks, plus the
//! page-level lookups (review totals, CSRF token, AJAX payload decoding)
//! the acquisition flow needs.

pub mod ajax_response;
pub mod config;
pub mod csrf_token;
pub mod pagination_analyzer;
pub mod review_parser;

pub use ajax_response::extract_review_fragments;
pub use config::ReviewSelectors;
pub use csrf_token::extract_reviews_csrf_token;
pub use pagination_analyzer::{PaginationAnalyzer, analyze_pagination};
pub use review_parser::ReviewParser;
