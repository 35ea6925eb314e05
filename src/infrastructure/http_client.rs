//! HTTP client shared by the page transport and the scoring client
//!
//! Thin wrapper over `reqwest` that maps every failure into [`FetchError`].
//! Rate limiting and retries are layered on top by the page fetcher.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::config::FetchConfig;
use super::fetch_error::FetchError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone, Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub follow_redirects: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: 30,
            follow_redirects: true,
        }
    }
}

impl HttpClientConfig {
    pub fn from_fetch_config(fetch: &FetchConfig) -> Self {
        Self {
            user_agent: fetch.user_agent.clone(),
            timeout_seconds: fetch.request_timeout_seconds,
            follow_redirects: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// GET a URL and return the body as text.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        info!("🌐 HTTP GET: {}", url);
        self.send_for_text(url, self.client.get(url)).await
    }

    /// POST a urlencoded form and return the body as text.
    pub async fn post_form_text(
        &self,
        url: &str,
        headers: HeaderMap,
        form: &[(&str, String)],
    ) -> Result<String, FetchError> {
        info!("🌐 HTTP POST (form): {}", url);
        let request = self.client.post(url).headers(headers).form(form);
        self.send_for_text(url, request).await
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, FetchError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        info!("🌐 HTTP POST (json): {}", url);
        let response = self.send(url, self.client.post(url).json(body)).await?;
        response
            .json::<R>()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))
    }

    async fn send_for_text(&self, url: &str, request: RequestBuilder) -> Result<String, FetchError> {
        let response = self.send(url, request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;
        debug!("Received {} bytes from {}", body.len(), url);
        Ok(body)
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<reqwest::Response, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> HttpClient {
        HttpClient::new(HttpClientConfig::default()).unwrap()
    }

    #[test]
    fn rejects_invalid_user_agent() {
        let config = HttpClientConfig {
            user_agent: "bad\nagent".into(),
            ..HttpClientConfig::default()
        };
        assert!(HttpClient::new(config).is_err());
    }

    #[test]
    fn client_keeps_fetch_settings() {
        let fetch = FetchConfig {
            user_agent: "TrueStarTest/1.0".into(),
            request_timeout_seconds: 7,
            ..FetchConfig::default()
        };
        let client = HttpClient::new(HttpClientConfig::from_fetch_config(&fetch)).unwrap();

        assert_eq!(client.config().user_agent, "TrueStarTest/1.0");
        assert_eq!(client.config().timeout_seconds, 7);
        assert!(client.config().follow_redirects);
    }

    #[tokio::test]
    async fn non_success_status_becomes_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let error = client()
            .get_text(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();

        assert_eq!(error.status(), Some(404));
        assert!(!error.is_retryable());
    }

    #[tokio::test]
    async fn posts_form_with_extra_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ajax"))
            .and(header("anti-csrftoken-a2z", "token-1"))
            .and(body_string_contains("pageNumber=2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("anti-csrftoken-a2z", HeaderValue::from_static("token-1"));
        let body = client()
            .post_form_text(
                &format!("{}/ajax", server.uri()),
                headers,
                &[("pageNumber", "2".to_string())],
            )
            .await
            .unwrap();

        assert_eq!(body, "ok");
    }
}
