//! Review acquisition for one product page load
//!
//! Flow: detect context → consult cache → parse the rendered page → analyze
//! pagination → sample pages → fetch (rate limited, retried) → parse →
//! merge/dedupe → cache → hand off to scoring → present.
//!
//! Context errors and bulk fetch failures never escape: the cycle degrades to
//! the reviews already rendered on the page.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};
use url::Url;
use uuid::Uuid;

use super::page_context::PageContext;
use super::presentation::{DismissHandle, ResultPresenter};
use crate::domain::analysis::AnalysisResult;
use crate::domain::pagination::{PageSampler, PaginationInfo};
use crate::domain::review::{Review, dedupe_by_id};
use crate::infrastructure::config::{AppConfig, FetchConfig, TransportKind};
use crate::infrastructure::error_reporter::ErrorReporter;
use crate::infrastructure::http_client::{HttpClient, HttpClientConfig};
use crate::infrastructure::page_fetcher::{
    HttpPageTransport, PageFetcher, PageResult, PageTarget, PageTransport,
};
use crate::infrastructure::parsing::csrf_token::extract_reviews_csrf_token;
use crate::infrastructure::parsing::{PaginationAnalyzer, ReviewParser};
use crate::infrastructure::parsing_error::ParsingResult;
use crate::infrastructure::review_cache::ReviewCache;
use crate::infrastructure::scoring_client::{ScoringClient, TrueStarApiClient};

pub const INVALID_ANALYSIS_MESSAGE: &str = "Invalid analysis response received";
pub const UNEXPECTED_FAILURE_MESSAGE: &str = "Unable to analyze reviews for this product";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("Not a supported product page: {url}")]
    UnsupportedPage { url: String },

    #[error("Could not extract product id from {url}")]
    MissingProductId { url: String },

    #[error("Could not extract CSRF token from page")]
    MissingCsrfToken,

    #[error("All {requested} sampled pages failed to fetch")]
    AllPagesFailed { requested: usize },

    #[error("Invalid review page target: {0}")]
    InvalidTarget(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AcquisitionState {
    Idle,
    DetectingContext,
    CacheHit,
    Fetching,
    Parsing,
    Merging,
    Cached,
    HandedOff,
    Errored,
}

impl AcquisitionState {
    pub const fn can_transition_to(self, next: Self) -> bool {
        use AcquisitionState::{CacheHit, Cached, DetectingContext, Errored, Fetching, HandedOff, Idle, Merging, Parsing};
        matches!(
            (self, next),
            (Idle, DetectingContext)
                | (DetectingContext, CacheHit | Fetching)
                | (Fetching, Parsing)
                | (Parsing, Merging)
                | (Merging, Cached)
                | (CacheHit | Cached | Errored, HandedOff)
        ) || (matches!(next, Errored) && !matches!(self, Errored | HandedOff))
    }
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReviewSource {
    Cache,
    MultiPage,
    SinglePageFallback,
}

/// Result of one acquisition cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquisitionOutcome {
    pub run_id: Uuid,
    pub product_id: Option<String>,
    pub reviews: Vec<Review>,
    pub total_review_count: Option<u64>,
    pub source: ReviewSource,
    pub pages_requested: usize,
    pub pages_failed: usize,
    /// Set when the cycle degraded to the rendered page
    pub error: Option<String>,
    pub states: Vec<AcquisitionState>,
}

impl AcquisitionOutcome {
    pub fn final_state(&self) -> AcquisitionState {
        self.states.last().copied().unwrap_or(AcquisitionState::Idle)
    }

    fn transition(&mut self, next: AcquisitionState) {
        let current = self.final_state();
        if current.can_transition_to(next) {
            debug!("state: {} -> {}", current, next);
        } else {
            warn!("Unexpected state transition: {} -> {}", current, next);
        }
        self.states.push(next);
    }
}

/// What the page-load lifecycle ended up showing.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    NotProductPage,
    NoReviews(AcquisitionOutcome),
    Presented {
        acquisition: AcquisitionOutcome,
        analysis: AnalysisResult,
    },
    InvalidAnalysis {
        acquisition: AcquisitionOutcome,
        analysis: AnalysisResult,
    },
    Failed { message: String },
}

/// Where sampled pages come from and how deep the AJAX endpoint goes.
#[derive(Debug, Clone)]
pub struct AcquisitionSettings {
    pub transport: TransportKind,
    pub marketplace_base_url: Url,
    pub max_ajax_pages: u32,
}

impl AcquisitionSettings {
    pub fn from_fetch_config(config: &FetchConfig) -> anyhow::Result<Self> {
        Ok(Self {
            transport: config.transport,
            marketplace_base_url: config.base_url()?,
            max_ajax_pages: config.max_ajax_pages,
        })
    }
}

/// Successful multi-page collection before it is written to the cache.
struct Collected {
    reviews: Vec<Review>,
    pagination: PaginationInfo,
    pages_requested: usize,
    pages_failed: usize,
}

pub struct AcquisitionOrchestrator {
    fetcher: PageFetcher,
    parser: ReviewParser,
    analyzer: PaginationAnalyzer,
    sampler: PageSampler,
    cache: Arc<ReviewCache>,
    scoring: Arc<dyn ScoringClient>,
    presenter: Arc<dyn ResultPresenter>,
    reporter: Arc<dyn ErrorReporter>,
    settings: AcquisitionSettings,
    panel_visible: Arc<AtomicBool>,
}

impl AcquisitionOrchestrator {
    pub fn new(
        fetcher: PageFetcher,
        cache: Arc<ReviewCache>,
        scoring: Arc<dyn ScoringClient>,
        presenter: Arc<dyn ResultPresenter>,
        reporter: Arc<dyn ErrorReporter>,
        settings: AcquisitionSettings,
    ) -> ParsingResult<Self> {
        Ok(Self {
            fetcher,
            parser: ReviewParser::new()?,
            analyzer: PaginationAnalyzer::new()?,
            sampler: PageSampler::default(),
            cache,
            scoring,
            presenter,
            reporter,
            settings,
            panel_visible: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Wire every collaborator from configuration.
    pub fn from_config(
        config: &AppConfig,
        presenter: Arc<dyn ResultPresenter>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> anyhow::Result<Self> {
        let http = HttpClient::new(HttpClientConfig::from_fetch_config(&config.fetch))?;
        let transport: Arc<dyn PageTransport> =
            Arc::new(HttpPageTransport::new(http, config.fetch.base_url()?));
        let fetcher = PageFetcher::from_config(transport, &config.fetch);
        let scoring = Arc::new(TrueStarApiClient::from_config(&config.scoring, Arc::clone(&reporter))?);
        let cache = Arc::new(ReviewCache::with_ttl_minutes(config.cache.ttl_minutes));

        Ok(Self::new(
            fetcher,
            cache,
            scoring,
            presenter,
            reporter,
            AcquisitionSettings::from_fetch_config(&config.fetch)?,
        )?)
    }

    #[must_use]
    pub fn with_sampler(mut self, sampler: PageSampler) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn cache(&self) -> &ReviewCache {
        &self.cache
    }

    pub fn is_panel_visible(&self) -> bool {
        self.panel_visible.load(Ordering::SeqCst)
    }

    /// Full page-load lifecycle. Never panics and never returns an error;
    /// every failure ends in a presented state or a quiet stop.
    pub async fn run(&self, context: &PageContext) -> RunOutcome {
        if !context.is_product_page() {
            debug!("Not a product page: {}", context.url);
            return RunOutcome::NotProductPage;
        }

        self.presenter.show_loading();

        match AssertUnwindSafe(self.acquire_and_score(context))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Error analyzing reviews: {}", detail);
                self.reporter.report_warning(
                    "Unexpected failure while analyzing reviews",
                    json!({ "url": context.url.as_str(), "detail": detail }),
                );
                self.presenter.hide_loading();
                self.display_error(UNEXPECTED_FAILURE_MESSAGE);
                RunOutcome::Failed { message: detail }
            }
        }
    }

    async fn acquire_and_score(&self, context: &PageContext) -> RunOutcome {
        let mut acquisition = self.acquire(context).await;

        if acquisition.reviews.is_empty() {
            info!("No reviews found on page");
            self.presenter.hide_loading();
            return RunOutcome::NoReviews(acquisition);
        }

        let analysis = self
            .scoring
            .analyze_reviews(&acquisition.reviews, acquisition.total_review_count)
            .await;
        acquisition.transition(AcquisitionState::HandedOff);
        self.presenter.hide_loading();

        if !analysis.is_valid() {
            error!("Invalid analysis result received: {:?}", analysis);
            self.reporter.report_warning(
                INVALID_ANALYSIS_MESSAGE,
                json!({ "productId": acquisition.product_id, "timestamp": analysis.timestamp }),
            );
            self.display_error(INVALID_ANALYSIS_MESSAGE);
            return RunOutcome::InvalidAnalysis {
                acquisition,
                analysis,
            };
        }

        self.display_analysis(&analysis);
        RunOutcome::Presented {
            acquisition,
            analysis,
        }
    }

    fn display_analysis(&self, analysis: &AnalysisResult) {
        self.panel_visible.store(true, Ordering::SeqCst);
        let panel_visible = Arc::clone(&self.panel_visible);
        self.presenter.show_analysis(
            analysis,
            DismissHandle::new(move || {
                panel_visible.store(false, Ordering::SeqCst);
            }),
        );
    }

    fn display_error(&self, message: &str) {
        self.panel_visible.store(true, Ordering::SeqCst);
        self.presenter.show_error(message, &AnalysisResult::fallback());
    }

    /// Collect reviews for the page, degrading to the rendered page on any
    /// context or bulk-fetch error.
    pub async fn acquire(&self, context: &PageContext) -> AcquisitionOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("acquisition", %run_id, url = %context.url);
        self.acquire_inner(run_id, context).instrument(span).await
    }

    async fn acquire_inner(&self, run_id: Uuid, context: &PageContext) -> AcquisitionOutcome {
        let mut outcome = AcquisitionOutcome {
            run_id,
            product_id: None,
            reviews: Vec::new(),
            total_review_count: None,
            source: ReviewSource::MultiPage,
            pages_requested: 0,
            pages_failed: 0,
            error: None,
            states: vec![AcquisitionState::Idle],
        };

        match self.collect(context, &mut outcome).await {
            Ok(Some(cached)) => {
                outcome.reviews = cached;
                outcome.source = ReviewSource::Cache;
                outcome.total_review_count = total_hint(self.analyzer.analyze(&context.html));
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Multi-page acquisition failed, using rendered page only: {}", e);
                outcome.transition(AcquisitionState::Errored);
                outcome.error = Some(e.to_string());
                outcome.source = ReviewSource::SinglePageFallback;
                outcome.reviews = dedupe_by_id(self.parser.parse_reviews(&context.html));
                outcome.total_review_count = total_hint(self.analyzer.analyze(&context.html));
            }
        }

        info!(
            "Acquired {} reviews ({:?}, {} pages requested, {} failed)",
            outcome.reviews.len(),
            outcome.source,
            outcome.pages_requested,
            outcome.pages_failed
        );
        outcome
    }

    /// `Ok(Some)` on cache hit; `Ok(None)` when `outcome` was filled from the network.
    async fn collect(
        &self,
        context: &PageContext,
        outcome: &mut AcquisitionOutcome,
    ) -> Result<Option<Vec<Review>>, AcquisitionError> {
        outcome.transition(AcquisitionState::DetectingContext);
        if !context.is_product_page() {
            return Err(AcquisitionError::UnsupportedPage {
                url: context.url.to_string(),
            });
        }
        let product_id = context
            .product_id()
            .ok_or_else(|| AcquisitionError::MissingProductId {
                url: context.url.to_string(),
            })?;
        outcome.product_id = Some(product_id.clone());

        if let Some(cached) = self.cache.get(&product_id) {
            info!("Cache hit for {} ({} reviews)", product_id, cached.len());
            outcome.transition(AcquisitionState::CacheHit);
            return Ok(Some(cached));
        }

        outcome.transition(AcquisitionState::Fetching);
        let collected = self.fetch_sampled_pages(context, &product_id).await?;
        outcome.pages_requested = collected.pages_requested;
        outcome.pages_failed = collected.pages_failed;
        outcome.total_review_count = total_hint(collected.pagination);

        outcome.transition(AcquisitionState::Parsing);
        outcome.transition(AcquisitionState::Merging);
        outcome.reviews = dedupe_by_id(collected.reviews);

        if outcome.reviews.is_empty() {
            debug!("Nothing collected for {}, cache left untouched", product_id);
        } else {
            self.cache.set(&product_id, outcome.reviews.clone());
            outcome.transition(AcquisitionState::Cached);
        }
        Ok(None)
    }

    async fn fetch_sampled_pages(&self, context: &PageContext, product_id: &str) -> Result<Collected, AcquisitionError> {
        let rendered = self.parser.parse_reviews(&context.html);
        let pagination = self.analyzer.analyze(&context.html);
        if pagination.total_pages == 0 {
            warn!("No pagination found - product may have no reviews");
        }

        let targets = self.build_targets(context, product_id, pagination.total_pages)?;
        let results = self.fetcher.fetch_multiple_pages(&targets).await;
        let pages_failed = results.iter().filter(|r| !r.is_success()).count();
        if !results.is_empty() && pages_failed == results.len() {
            return Err(AcquisitionError::AllPagesFailed {
                requested: results.len(),
            });
        }

        let mut reviews = rendered;
        for result in results.iter().filter(|r| r.is_success()) {
            reviews.extend(self.parse_page(result));
        }

        Ok(Collected {
            reviews,
            pagination,
            pages_requested: targets.len(),
            pages_failed,
        })
    }

    /// Sampled pages other than the rendered first page.
    fn build_targets(
        &self,
        context: &PageContext,
        product_id: &str,
        total_pages: u32,
    ) -> Result<Vec<PageTarget>, AcquisitionError> {
        let pages = self
            .sampler
            .select_pages(total_pages)
            .into_iter()
            .filter(|&page| page > 1);

        match self.settings.transport {
            TransportKind::Url => pages
                .map(|page| {
                    PageTarget::review_listing(&self.settings.marketplace_base_url, product_id, page)
                        .map_err(|e| AcquisitionError::InvalidTarget(e.to_string()))
                })
                .collect(),
            TransportKind::Ajax => {
                let token = extract_reviews_csrf_token(&context.html).ok_or(AcquisitionError::MissingCsrfToken)?;
                Ok(pages
                    .filter(|&page| page <= self.settings.max_ajax_pages)
                    .map(|page| PageTarget::ajax(product_id, page, &token))
                    .collect())
            }
        }
    }

    fn parse_page(&self, result: &PageResult) -> Vec<Review> {
        match result.target {
            PageTarget::Ajax(_) => self.parser.parse_ajax_response(&result.content),
            PageTarget::Url(_) => self.parser.parse_reviews(&result.content),
        }
    }
}

fn total_hint(pagination: PaginationInfo) -> Option<u64> {
    (!pagination.is_empty()).then_some(pagination.total_reviews)
}

#[cfg(test)]
mod tests {
    use super::*;
    use AcquisitionState::{CacheHit, Cached, DetectingContext, Errored, Fetching, HandedOff, Idle, Merging, Parsing};

    #[test]
    fn happy_path_transitions_are_valid() {
        let path = [Idle, DetectingContext, Fetching, Parsing, Merging, Cached, HandedOff];
        assert!(path.windows(2).all(|w| w[0].can_transition_to(w[1])));

        let cached = [Idle, DetectingContext, CacheHit, HandedOff];
        assert!(cached.windows(2).all(|w| w[0].can_transition_to(w[1])));
    }

    #[test]
    fn errored_is_reachable_from_any_active_state() {
        for state in [Idle, DetectingContext, CacheHit, Fetching, Parsing, Merging, Cached] {
            assert!(state.can_transition_to(Errored), "{state}");
        }
        assert!(Errored.can_transition_to(HandedOff));
        assert!(!Errored.can_transition_to(Errored));
        assert!(!HandedOff.can_transition_to(Errored));
    }

    #[test]
    fn skipping_states_is_rejected() {
        assert!(!Idle.can_transition_to(Fetching));
        assert!(!Fetching.can_transition_to(Cached));
        assert!(!CacheHit.can_transition_to(Parsing));
    }

    #[test]
    fn total_hint_omits_zero() {
        assert_eq!(total_hint(PaginationInfo::default()), None);
        assert_eq!(total_hint(PaginationInfo::from_total_reviews(42)), Some(42));
    }
}
