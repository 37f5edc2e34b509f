//! HTTP client for the TruthWeave backend.
//!
//! Two operations exist on the wire:
//!
//! - `GET /api/v1/news/feed?page={page}&limit={limit}` returning a JSON
//!   array of tagged [`FeedEntry`] objects
//! - `POST /api/v1/chat` with `{"article_id": ..., "question": ...}`
//!   returning `{"answer": ...}`
//!
//! [`ApiClient`] performs both and decodes responses into typed values.
//! Failures surface as [`NetworkError`]; no call retries on its own unless
//! the client was built with [`ApiClient::with_retry`], which applies the
//! policy in [`retry`] to every request.

pub mod retry;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use truthweave_types::FeedEntry;

/// Development backend address; deployment config overrides this.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

pub const FEED_PATH: &str = "/api/v1/news/feed";
pub const CHAT_PATH: &str = "/api/v1/chat";

const CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 8;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Transport, protocol, and decode failures for both API operations.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
}

fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    article_id: Option<&'a str>,
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    answer: String,
}

/// Typed client over the two backend operations.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    retry: Option<retry::RetryConfig>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, NetworkError> {
        Self::with_timeout(
            base_url,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NetworkError> {
        let http = base_client_builder().timeout(timeout).build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            http,
            base_url,
            retry: None,
        })
    }

    /// Enables automatic retries for every request issued by this client.
    #[must_use]
    pub fn with_retry(mut self, config: retry::RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches one page of the feed. `page` starts at 1.
    pub async fn fetch_feed_page(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<Vec<FeedEntry>, NetworkError> {
        if page == 0 {
            return Err(NetworkError::InvalidRequest("page must be >= 1"));
        }
        if limit == 0 {
            return Err(NetworkError::InvalidRequest("limit must be > 0"));
        }

        let url = format!("{}{FEED_PATH}", self.base_url);
        let response = self
            .send(|| {
                self.http
                    .get(&url)
                    .query(&[("page", page), ("limit", limit)])
            })
            .await?;
        tracing::debug!(page, limit, status = %response.status(), "fetched feed page");
        decode_json(response).await
    }

    /// Asks the oracle a question, optionally scoped to one article.
    /// Returns the answer text.
    pub async fn ask_oracle(
        &self,
        article_id: Option<&str>,
        question: &str,
    ) -> Result<String, NetworkError> {
        let url = format!("{}{CHAT_PATH}", self.base_url);
        let body = ChatRequest {
            article_id,
            question,
        };
        let response = self.send(|| self.http.post(&url).json(&body)).await?;
        let reply: ChatResponse = decode_json(response).await?;
        Ok(reply.answer)
    }

    async fn send<F>(&self, build_request: F) -> Result<reqwest::Response, NetworkError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        match &self.retry {
            Some(config) => match retry::send_with_retry(build_request, config).await {
                retry::RetryOutcome::Success(response)
                | retry::RetryOutcome::HttpError(response) => Ok(response),
                retry::RetryOutcome::ConnectionError { attempts, source } => {
                    tracing::warn!(attempts, error = %source, "request exhausted retries");
                    Err(NetworkError::Transport(source))
                }
                retry::RetryOutcome::NonRetryable(source) => Err(NetworkError::Transport(source)),
            },
            None => Ok(build_request().send().await?),
        }
    }
}

async fn decode_json<T>(response: reqwest::Response) -> Result<T, NetworkError>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = read_capped_error_body(response).await;
        return Err(NetworkError::Status { status, body });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(NetworkError::Decode)
}

/// Reads an error body without letting a hostile response balloon memory.
pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}


#[cfg(test)]
mod integration_tests {
    use super::{ApiClient, CHAT_PATH, FEED_PATH, NetworkError};
    use truthweave_types::FeedEntry;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed_body() -> serde_json::Value {
        serde_json::json!([
            {
                "type": "article",
                "content": {
                    "id": "root_1",
                    "title": "Federal Reserve Announces 0.50% Rate Hike",
                    "summary": "Rates up.",
                    "content": "Full content...",
                    "truth_score": 0.98,
                    "bias_rating": "Center",
                    "timestamp": "2 hrs ago"
                }
            },
            {
                "type": "article",
                "content": {
                    "id": "child_1",
                    "title": "Tech Sector Sell-Off",
                    "summary": "NASDAQ drops.",
                    "content": "Full content...",
                    "truth_score": 0.92,
                    "bias_rating": "Market Data",
                    "timestamp": "1 hr ago",
                    "causal_parent_id": "root_1",
                    "lane": 1
                }
            },
            {
                "type": "ad",
                "content": {
                    "id": "ad_1",
                    "title": "Sponsored post",
                    "body": "Buy now",
                    "media_url": "https://cdn.example/ad.png",
                    "target_url": "https://example.com"
                }
            }
        ])
    }

    #[tokio::test]
    async fn fetch_feed_page_decodes_tagged_entries() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .and(query_param("page", "1"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(feed_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let entries = client.fetch_feed_page(1, 10).await.unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id(), "root_1");
        let child = entries[1].as_article().unwrap();
        assert_eq!(child.causal_parent_id.as_deref(), Some("root_1"));
        assert_eq!(child.lane, 1);
        assert!(matches!(entries[2], FeedEntry::Ad(_)));
    }

    #[tokio::test]
    async fn ask_oracle_returns_answer_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .and(body_json(serde_json::json!({
                "article_id": null,
                "question": "What caused the rate hike?"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"answer": "Inflation control"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let answer = client
            .ask_oracle(None, "What caused the rate hike?")
            .await
            .unwrap();
        assert_eq!(answer, "Inflation control");
    }

    #[tokio::test]
    async fn ask_oracle_sends_article_scope() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .and(body_json(serde_json::json!({
                "article_id": "root_1",
                "question": "Why?"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"answer": "Because."})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let answer = client.ask_oracle(Some("root_1"), "Why?").await.unwrap();
        assert_eq!(answer, "Because.");
    }

    #[tokio::test]
    async fn non_success_status_surfaces_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let err = client.fetch_feed_page(1, 10).await.unwrap_err();
        match err {
            NetworkError::Status { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let err = client.fetch_feed_page(1, 10).await.unwrap_err();
        assert!(matches!(err, NetworkError::Decode(_)));
    }

    #[tokio::test]
    async fn out_of_range_truth_score_fails_decode() {
        let server = MockServer::start().await;

        let body = serde_json::json!([{
            "type": "article",
            "content": {
                "id": "bad",
                "title": "t",
                "summary": "s",
                "content": "c",
                "truth_score": 1.5,
                "bias_rating": "Center",
                "timestamp": "now"
            }
        }]);

        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let err = client.fetch_feed_page(1, 10).await.unwrap_err();
        assert!(matches!(err, NetworkError::Decode(_)));
    }

    #[tokio::test]
    async fn retrying_client_recovers_from_transient_errors() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let server = MockServer::start().await;
        let attempt = AtomicU32::new(0);

        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(move |_: &wiremock::Request| {
                let n = attempt.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({"answer": "ok"}))
                }
            })
            .expect(2)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri())
            .unwrap()
            .with_retry(super::retry::RetryConfig {
                max_retries: 2,
                initial_delay: std::time::Duration::from_millis(1),
                max_delay: std::time::Duration::from_millis(10),
                jitter_factor: 0.0,
            });

        let answer = client.ask_oracle(None, "q").await.unwrap();
        assert_eq!(answer, "ok");
    }
}
