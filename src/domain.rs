//! Domain module - Core entities and pure domain rules
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod analysis;
pub mod pagination;
pub mod review;

pub use analysis::{AnalysisFlag, AnalysisMetrics, AnalysisRequest, AnalysisResult, AnalysisSummary};
pub use pagination::{PageSampler, PaginationInfo, REVIEWS_PER_PAGE};
pub use review::{ANONYMOUS_AUTHOR, Review, dedupe_by_id};
