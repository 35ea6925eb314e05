//! Transport error taxonomy for page and scoring requests
//!
//! Classification drives the retry policy: transient failures are retried,
//! client errors are surfaced immediately.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP request failed with status {status}: {url}")]
    Http { status: u16, url: String },

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Network error while fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Classify a reqwest failure for the given URL.
    pub fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return Self::Http {
                status: status.as_u16(),
                url: url.to_string(),
            };
        }
        if error.is_timeout() {
            return Self::Timeout { url: url.to_string() };
        }
        if error.is_body() || error.is_decode() {
            return Self::Body {
                url: url.to_string(),
                message: error.to_string(),
            };
        }
        if error.is_builder() {
            return Self::InvalidRequest(error.to_string());
        }
        Self::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }

    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a retry has a chance of succeeding.
    ///
    /// 429/502/503/504, timeouts and network errors are retryable;
    /// 400/401/403/404 are not. Everything else defaults to retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => match status {
                429 | 502 | 503 | 504 => true,
                400 | 401 | 403 | 404 => false,
                _ => true,
            },
            Self::Timeout { .. } | Self::Network { .. } | Self::Body { .. } => true,
            Self::InvalidRequest(_) => false,
            Self::Other(message) => is_retryable_message(message),
        }
    }
}

/// Text-based classification for errors that only carry a message.
pub fn is_retryable_message(message: &str) -> bool {
    let message = message.to_lowercase();

    let transient = ["429", "502", "503", "504", "network", "timeout"];
    if transient.iter().any(|marker| message.contains(marker)) {
        return true;
    }

    let permanent = ["400", "401", "403", "404"];
    if permanent.iter().any(|marker| message.contains(marker)) {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn http(status: u16) -> FetchError {
        FetchError::Http {
            status,
            url: "https://www.amazon.com/product-reviews/B000000000".into(),
        }
    }

    #[rstest]
    #[case(429, true)]
    #[case(502, true)]
    #[case(503, true)]
    #[case(504, true)]
    #[case(400, false)]
    #[case(401, false)]
    #[case(403, false)]
    #[case(404, false)]
    #[case(500, true)]
    #[case(418, true)]
    fn classifies_http_status(#[case] status: u16, #[case] retryable: bool) {
        assert_eq!(http(status).is_retryable(), retryable);
    }

    #[rstest]
    #[case("Network error", true)]
    #[case("request timeout after 30s", true)]
    #[case("Failed to fetch page: 404 Not Found", false)]
    #[case("Failed to fetch page: 403 Forbidden", false)]
    #[case("something odd happened", true)]
    fn classifies_messages(#[case] message: &str, #[case] retryable: bool) {
        assert_eq!(FetchError::Other(message.into()).is_retryable(), retryable);
    }

    #[test]
    fn network_and_timeout_are_retryable() {
        assert!(FetchError::Timeout { url: "u".into() }.is_retryable());
        assert!(
            FetchError::Network {
                url: "u".into(),
                message: "connection reset".into()
            }
            .is_retryable()
        );
        assert!(!FetchError::InvalidRequest("bad url".into()).is_retryable());
    }
}
