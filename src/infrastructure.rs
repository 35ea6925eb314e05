//! Infrastructure layer: HTTP transport, HTML parsing and external services
//!
//! Everything that touches the network, the filesystem or marketplace markup
//! lives here, behind the types the application layer composes.

pub mod config;
pub mod error_reporter;
pub mod fetch_error;
pub mod http_client;
pub mod logging;
pub mod page_fetcher;
pub mod parsing;
pub mod parsing_error;
pub mod rate_limiter;
pub mod retry_policy;
pub mod review_cache;
pub mod scoring_client;

pub use config::{AppConfig, ConfigManager, FetchConfig, TransportKind};
pub use error_reporter::{ErrorReporter, Preferences, TracingErrorReporter};
pub use fetch_error::FetchError;
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::{get_log_directory, init_logging_with_config};
pub use page_fetcher::{FetchMode, HttpPageTransport, PageFetcher, PageResult, PageTarget, PageTransport};
pub use parsing::{PaginationAnalyzer, ReviewParser, ReviewSelectors, analyze_pagination, extract_reviews_csrf_token};
pub use parsing_error::{ParsingError, ParsingResult};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use retry_policy::RetryPolicy;
pub use review_cache::{CacheStats, ReviewCache};
pub use scoring_client::{ScoringClient, TrueStarApiClient};
