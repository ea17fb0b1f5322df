//! Page fetching.
//!
//! [`PageFetcher`] is the seam between the link walk and the network: the
//! walk only needs "body, not found, or failed". [`HttpFetcher`] is the real
//! implementation; tests drive the walk with scripted fetchers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use adoptedtexts_shared::{AdoptedTextsError, CrawlConfig, Result};

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// Fetch failure signal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// HTTP 404. Recoverable once through term correction.
    #[error("not found")]
    NotFound,

    /// Any other status or transport error. Ends the walk.
    #[error("{0}")]
    Transient(String),
}

/// Retrieves raw HTML for a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> std::result::Result<String, FetchError>;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Sequential HTTP fetcher with a politeness pause before every request.
pub struct HttpFetcher {
    client: Client,
    rate_limit: Duration,
}

impl HttpFetcher {
    /// Create a fetcher from the crawl configuration.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AdoptedTextsError::Network(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            rate_limit: Duration::from_millis(config.rate_limit_ms),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> std::result::Result<String, FetchError> {
        if !self.rate_limit.is_zero() {
            tokio::time::sleep(self.rate_limit).await;
        }

        debug!("fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Transient(format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transient(format!("body read failed: {e}")))?;

        debug!(len = bytes.len(), %status, "page fetched");
        Ok(decode_body(&bytes))
    }
}

/// Decode a page body.
///
/// Older pages declare ISO-8859-1 but are UTF-8 encoded, so the declared
/// charset is ignored: valid UTF-8 is taken as is, anything else is read as
/// ISO-8859-1 (one byte per code point).
pub(crate) fn decode_body(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        let config = CrawlConfig {
            rate_limit_ms: 0,
            timeout_secs: 5,
            ..CrawlConfig::default()
        };
        HttpFetcher::new(&config).unwrap()
    }

    #[test]
    fn decode_utf8_despite_declared_latin1() {
        let body = "Verordening betreffende één markt".as_bytes();
        assert_eq!(decode_body(body), "Verordening betreffende één markt");
    }

    #[test]
    fn decode_latin1_fallback() {
        // "één" in ISO-8859-1
        let body = [0xE9, 0xE9, 0x6E];
        assert_eq!(decode_body(&body), "één");
    }

    #[tokio::test]
    async fn fetch_maps_statuses() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=ISO-8859-1")
                    .set_body_bytes("<p>één</p>".as_bytes()),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = fetcher();
        let base = Url::parse(&server.uri()).unwrap();

        let ok = fetcher.fetch(&base.join("/ok").unwrap()).await;
        assert_eq!(ok, Ok("<p>één</p>".to_string()));

        let missing = fetcher.fetch(&base.join("/missing").unwrap()).await;
        assert_eq!(missing, Err(FetchError::NotFound));

        let broken = fetcher.fetch(&base.join("/broken").unwrap()).await;
        match broken {
            Err(FetchError::Transient(message)) => assert!(message.contains("503")),
            other => panic!("expected transient error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_connection_failure_is_transient() {
        // Nothing listens on port 9 (discard) on a test host.
        let url = Url::parse("http://127.0.0.1:9/unreachable").unwrap();
        let result = fetcher().fetch(&url).await;
        assert!(matches!(result, Err(FetchError::Transient(_))));
    }
}
