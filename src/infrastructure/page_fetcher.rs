//! Review page fetching
//!
//! Every request goes through the shared rate limiter and the retry policy.
//! Batch fetches never fail as a whole: each target yields a [`PageResult`]
//! carrying either the page body or the error that ended it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::config::FetchConfig;
use super::fetch_error::FetchError;
use super::http_client::HttpClient;
use super::rate_limiter::RateLimiter;
use super::retry_policy::RetryPolicy;

pub const CSRF_HEADER: &str = "anti-csrftoken-a2z";
pub const DEFAULT_STAGGER_DELAY: Duration = Duration::from_millis(200);

/// AJAX paging request for one review listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AjaxPageRequest {
    pub asin: String,
    pub page_number: u32,
    pub csrf_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    /// Review listing URL returning rendered HTML
    Url(String),
    /// Marketplace AJAX endpoint returning bracketed command chunks
    Ajax(AjaxPageRequest),
}

impl PageTarget {
    /// Listing URL for a given product and page number.
    pub fn review_listing(base_url: &Url, asin: &str, page_number: u32) -> Result<Self, FetchError> {
        let mut url = base_url
            .join(&format!("/product-reviews/{asin}"))
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("pageNumber", &page_number.to_string());
        Ok(Self::Url(url.into()))
    }

    pub fn ajax(asin: &str, page_number: u32, csrf_token: &str) -> Self {
        Self::Ajax(AjaxPageRequest {
            asin: asin.to_string(),
            page_number,
            csrf_token: csrf_token.to_string(),
        })
    }
}

impl fmt::Display for PageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Ajax(request) => write!(f, "ajax:{}#{}", request.asin, request.page_number),
        }
    }
}

/// Outcome of fetching one target. `content` is empty when `error` is set.
#[derive(Debug, Clone)]
pub struct PageResult {
    pub target: PageTarget,
    pub content: String,
    pub error: Option<FetchError>,
}

impl PageResult {
    pub fn success(target: PageTarget, content: String) -> Self {
        Self {
            target,
            content,
            error: None,
        }
    }

    pub fn failure(target: PageTarget, error: FetchError) -> Self {
        Self {
            target,
            content: String::new(),
            error: Some(error),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// All requests in flight at once, bounded only by the rate limiter
    #[default]
    Parallel,
    /// One request at a time with a fixed pause between issuances
    Staggered,
}

/// Single attempt at retrieving a page, no rate limiting or retries.
#[async_trait]
pub trait PageTransport: Send + Sync {
    async fn fetch(&self, target: &PageTarget) -> Result<String, FetchError>;
}

/// Transport backed by the marketplace website.
pub struct HttpPageTransport {
    client: HttpClient,
    base_url: Url,
}

impl HttpPageTransport {
    pub const fn new(client: HttpClient, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn ajax_url(&self, page_number: u32) -> Result<Url, FetchError> {
        self.base_url
            .join(&format!(
                "/hz/reviews-render/ajax/reviews/get/ref=cm_cr_arp_d_paging_btm_next_{page_number}"
            ))
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))
    }

    fn ajax_form(request: &AjaxPageRequest) -> Vec<(&'static str, String)> {
        vec![
            ("sortBy", "recent".to_string()),
            ("reviewerType", "all_reviews".to_string()),
            ("formatType", String::new()),
            ("mediaType", String::new()),
            ("filterByStar", String::new()),
            ("filterByAge", String::new()),
            ("pageNumber", request.page_number.to_string()),
            ("filterByLanguage", String::new()),
            ("filterByKeyword", String::new()),
            ("shouldAppend", "undefined".to_string()),
            ("deviceType", "desktop".to_string()),
            ("canShowIntHeader", "undefined".to_string()),
            ("reftag", format!("cm_cr_arp_d_paging_btm_next_{}", request.page_number)),
            ("pageSize", "10".to_string()),
            ("asin", request.asin.clone()),
            ("scope", format!("reviewsAjax{}", request.page_number)),
        ]
    }
}

#[async_trait]
impl PageTransport for HttpPageTransport {
    async fn fetch(&self, target: &PageTarget) -> Result<String, FetchError> {
        match target {
            PageTarget::Url(url) => self.client.get_text(url).await,
            PageTarget::Ajax(request) => {
                let url = self.ajax_url(request.page_number)?;
                let mut headers = HeaderMap::new();
                headers.insert(
                    CSRF_HEADER,
                    HeaderValue::from_str(&request.csrf_token)
                        .map_err(|e| FetchError::InvalidRequest(format!("invalid CSRF token: {e}")))?,
                );
                headers.insert(
                    "x-requested-with",
                    HeaderValue::from_static("XMLHttpRequest"),
                );
                self.client
                    .post_form_text(url.as_str(), headers, &Self::ajax_form(request))
                    .await
            }
        }
    }
}

/// Rate-limited, retrying page fetcher.
#[derive(Clone)]
pub struct PageFetcher {
    transport: Arc<dyn PageTransport>,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
    mode: FetchMode,
    stagger_delay: Duration,
}

impl PageFetcher {
    pub fn new(transport: Arc<dyn PageTransport>, rate_limiter: RateLimiter, retry: RetryPolicy) -> Self {
        Self {
            transport,
            rate_limiter,
            retry,
            mode: FetchMode::Parallel,
            stagger_delay: DEFAULT_STAGGER_DELAY,
        }
    }

    pub fn from_config(transport: Arc<dyn PageTransport>, config: &FetchConfig) -> Self {
        Self::new(transport, RateLimiter::new(config.rate_limiter()), config.retry_policy())
            .with_mode(config.mode)
            .with_stagger_delay(Duration::from_millis(config.stagger_delay_ms))
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: FetchMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn with_stagger_delay(mut self, delay: Duration) -> Self {
        self.stagger_delay = delay;
        self
    }

    pub const fn mode(&self) -> FetchMode {
        self.mode
    }

    /// Fetch one page. Each attempt, retries included, takes a rate-limit slot.
    pub async fn fetch_page(&self, target: &PageTarget) -> Result<String, FetchError> {
        self.retry
            .run(
                || {
                    self.rate_limiter
                        .execute_with_limit(|| self.transport.fetch(target))
                },
                FetchError::is_retryable,
            )
            .await
    }

    /// Fetch every target, returning results in input order.
    pub async fn fetch_multiple_pages(&self, targets: &[PageTarget]) -> Vec<PageResult> {
        info!("📄 Fetching {} pages ({:?} mode)", targets.len(), self.mode);

        let results = match self.mode {
            FetchMode::Parallel => {
                join_all(targets.iter().map(|target| self.fetch_into_result(target))).await
            }
            FetchMode::Staggered => {
                let mut results = Vec::with_capacity(targets.len());
                for (index, target) in targets.iter().enumerate() {
                    if index > 0 {
                        tokio::time::sleep(self.stagger_delay).await;
                    }
                    results.push(self.fetch_into_result(target).await);
                }
                results
            }
        };

        let failed = results.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            warn!("{}/{} pages failed to fetch", failed, results.len());
        } else {
            debug!("All {} pages fetched", results.len());
        }
        results
    }

    async fn fetch_into_result(&self, target: &PageTarget) -> PageResult {
        match self.fetch_page(target).await {
            Ok(content) => PageResult::success(target.clone(), content),
            Err(error) => {
                warn!("Failed to fetch {}: {}", target, error);
                PageResult::failure(target.clone(), error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rate_limiter::RateLimiterConfig;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Scripted transport: per-target queue of responses, then a fixed body.
    #[derive(Default)]
    struct ScriptedTransport {
        scripts: Mutex<HashMap<String, Vec<Result<String, FetchError>>>>,
        calls: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedTransport {
        fn script(self, target: &str, responses: Vec<Result<String, FetchError>>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(target.to_string(), responses);
            self
        }

        fn call_count(&self, target: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, _)| t == target)
                .count()
        }
    }

    #[async_trait]
    impl PageTransport for ScriptedTransport {
        async fn fetch(&self, target: &PageTarget) -> Result<String, FetchError> {
            let key = target.to_string();
            self.calls.lock().unwrap().push((key.clone(), Instant::now()));
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(&key) {
                Some(queue) if !queue.is_empty() => queue.remove(0),
                _ => Ok(format!("<html>{key}</html>")),
            }
        }
    }

    fn http(status: u16) -> FetchError {
        FetchError::Http {
            status,
            url: "test".into(),
        }
    }

    fn fetcher(transport: Arc<ScriptedTransport>) -> PageFetcher {
        PageFetcher::new(
            transport,
            RateLimiter::new(RateLimiterConfig {
                max_requests: 5,
                window: Duration::from_millis(1000),
            }),
            RetryPolicy::default(),
        )
    }

    fn url(n: u32) -> PageTarget {
        PageTarget::Url(format!("https://www.amazon.com/product-reviews/B0TEST?pageNumber={n}"))
    }

    #[test]
    fn builds_listing_url() {
        let base = Url::parse("https://www.amazon.com").unwrap();
        let target = PageTarget::review_listing(&base, "B08N5WRWNW", 3).unwrap();
        assert_eq!(
            target,
            PageTarget::Url("https://www.amazon.com/product-reviews/B08N5WRWNW?pageNumber=3".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn batch_keeps_input_order_and_isolates_failures() {
        let transport = Arc::new(
            ScriptedTransport::default().script(&url(2).to_string(), vec![Err(http(404))]),
        );
        let targets = vec![url(1), url(2), url(3)];

        let results = fetcher(Arc::clone(&transport))
            .fetch_multiple_pages(&targets)
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert_eq!(results[1].error.as_ref().and_then(FetchError::status), Some(404));
        assert!(results[1].content.is_empty());
        assert!(results[2].content.contains("pageNumber=3"));
        for (result, target) in results.iter().zip(&targets) {
            assert_eq!(&result.target, target);
        }
        assert_eq!(transport.call_count(&url(2).to_string()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried() {
        let key = url(1).to_string();
        let transport = Arc::new(
            ScriptedTransport::default().script(&key, vec![Err(http(503)), Ok("page".into())]),
        );

        let body = fetcher(Arc::clone(&transport)).fetch_page(&url(1)).await.unwrap();

        assert_eq!(body, "page");
        assert_eq!(transport.call_count(&key), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn staggered_mode_spaces_requests() {
        let transport = Arc::new(ScriptedTransport::default());
        let fetcher = fetcher(Arc::clone(&transport)).with_mode(FetchMode::Staggered);

        fetcher.fetch_multiple_pages(&[url(1), url(2), url(3)]).await;

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1].1.duration_since(pair[0].1) >= DEFAULT_STAGGER_DELAY);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_mode_respects_rate_limit() {
        let transport = Arc::new(ScriptedTransport::default());
        let targets: Vec<PageTarget> = (1..=7).map(url).collect();
        let start = Instant::now();

        let results = fetcher(Arc::clone(&transport)).fetch_multiple_pages(&targets).await;

        assert!(results.iter().all(PageResult::is_success));
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[test]
    fn mode_follows_configuration() {
        let transport = Arc::new(ScriptedTransport::default());
        assert_eq!(fetcher(Arc::clone(&transport)).mode(), FetchMode::Parallel);

        let config = FetchConfig {
            mode: FetchMode::Staggered,
            ..FetchConfig::default()
        };
        assert_eq!(PageFetcher::from_config(transport, &config).mode(), FetchMode::Staggered);
    }

    #[test]
    fn ajax_form_carries_page_scope() {
        let request = AjaxPageRequest {
            asin: "B0TEST".into(),
            page_number: 4,
            csrf_token: "tok".into(),
        };
        let form = HttpPageTransport::ajax_form(&request);
        let lookup = |key: &str| form.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str());

        assert_eq!(lookup("pageNumber"), Some("4"));
        assert_eq!(lookup("scope"), Some("reviewsAjax4"));
        assert_eq!(lookup("asin"), Some("B0TEST"));
        assert_eq!(lookup("pageSize"), Some("10"));
        assert_eq!(lookup("sortBy"), Some("recent"));
    }
}
