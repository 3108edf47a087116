//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made during URL discovery:
//! - Building HTTP clients with a user agent and an explicit timeout
//! - GET requests to fetch page content
//! - Error classification into page states
//!
//! Failed fetches are never retried; the coordinator records them as skipped.

use crate::state::PageState;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;

/// Default user agent sent by the discovery crawler
pub const DEFAULT_USER_AGENT: &str = concat!("ux-sweep/", env!("CARGO_PKG_VERSION"));

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched an HTML page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Page is not HTML (Content-Type mismatch)
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// HTTP error that maps to a specific page state
    HttpError {
        /// The HTTP status code
        status_code: u16,
        /// The page state this error maps to
        state: PageState,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
        /// The page state this error maps to
        state: PageState,
    },
}

impl FetchResult {
    /// Page state and human-readable reason for a failed fetch
    ///
    /// Returns `None` for a successful fetch.
    pub fn failure(&self) -> Option<(PageState, String)> {
        match self {
            Self::Success { .. } => None,
            Self::ContentMismatch { content_type } => Some((
                PageState::ContentMismatch,
                format!("Expected HTML, got {}", content_type),
            )),
            Self::HttpError { status_code, state } => {
                Some((*state, format!("HTTP {}", status_code)))
            }
            Self::NetworkError { error, state } => Some((*state, error.clone())),
        }
    }
}

/// Builds an HTTP client for discovery
///
/// # Arguments
///
/// * `user_agent` - The user agent string to send
/// * `timeout` - Per-request timeout; requests exceeding it are recorded as failed
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use ux_sweep::crawler::{build_http_client, DEFAULT_USER_AGENT};
///
/// let client = build_http_client(DEFAULT_USER_AGENT, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the outcome
///
/// | Condition | Result |
/// |-----------|--------|
/// | HTTP 404 / 410 | DeadLink |
/// | Other non-2xx | Failed |
/// | Non-HTML Content-Type | ContentMismatch |
/// | Timeout | Timeout |
/// | Connection refused, DNS, TLS | Unreachable |
/// | Too many redirects, body read error | Failed |
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(&e),
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
            state: PageState::DeadLink,
        };
    }

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
            state: PageState::Failed,
        };
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_html_content_type(&content_type) {
        return FetchResult::ContentMismatch { content_type };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => classify_error(&e),
    }
}

/// A missing Content-Type is treated as HTML
fn is_html_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml+xml")
}

fn classify_error(e: &reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::NetworkError {
            error: "Request timeout".to_string(),
            state: PageState::Timeout,
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: format!("Connection failed: {}", e),
            state: PageState::Unreachable,
        }
    } else if e.is_redirect() {
        FetchResult::NetworkError {
            error: "Too many redirects".to_string(),
            state: PageState::Failed,
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
            state: PageState::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        build_http_client(DEFAULT_USER_AGENT, Duration::from_millis(500)).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client("TestBot/1.0", Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_html_content_types() {
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("application/xhtml+xml"));
        assert!(is_html_content_type(""));
        assert!(!is_html_content_type("application/pdf"));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
            .mount(&server)
            .await;

        let result = fetch_url(&client(), &format!("{}/", server.uri())).await;
        assert!(matches!(result, FetchResult::Success { status_code: 200, .. }));
        assert!(result.failure().is_none());
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_dead_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = fetch_url(&client(), &format!("{}/missing", server.uri())).await;
        let (state, reason) = result.failure().unwrap();
        assert_eq!(state, PageState::DeadLink);
        assert_eq!(reason, "HTTP 404");
    }

    #[tokio::test]
    async fn test_fetch_non_html_is_content_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF", "application/pdf"))
            .mount(&server)
            .await;

        let result = fetch_url(&client(), &server.uri()).await;
        assert!(matches!(result, FetchResult::ContentMismatch { .. }));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html></html>", "text/html")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let result = fetch_url(&client(), &server.uri()).await;
        let (state, _) = result.failure().unwrap();
        assert_eq!(state, PageState::Timeout);
    }
}
