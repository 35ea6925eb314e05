//! TrueStar Reviews - Amazon review acquisition pipeline
//!
//! Collects customer reviews for a product page across multiple listing
//! pages, caches them per product and hands them to the TrueStar scoring
//! service for fake-review analysis.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{AcquisitionOrchestrator, AcquisitionOutcome, PageContext, ResultPresenter, RunOutcome};
pub use domain::{AnalysisResult, PaginationInfo, Review};
pub use infrastructure::{AppConfig, ConfigManager};
