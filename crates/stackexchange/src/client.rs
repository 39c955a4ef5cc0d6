//! HTTP client for the Stack Exchange API.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use tracing::{debug, warn};

use crate::error::Error;
use crate::query::Query;
use crate::types::QuestionsEnvelope;

pub const DEFAULT_API_HOST: &str = "https://api.stackexchange.com";
pub const DEFAULT_API_VERSION: &str = "2.3";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_host: String,
    pub api_version: String,
    /// Optional app key; raises the daily quota from 300 to 10000 requests.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Request quota as last reported by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quota {
    pub max: u32,
    pub remaining: u32,
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}/{})", self.remaining, self.max)
    }
}

/// Stack Exchange API client.
///
/// Executes [`Query`] values one page at a time and remembers the quota
/// reported by the most recent response.
pub struct Client {
    http: reqwest::Client,
    api_host: String,
    api_version: String,
    api_key: Option<String>,
    quota_max: AtomicU32,
    quota_remaining: AtomicU32,
}

impl Client {
    /// Build a client. Fails only if the TLS backend cannot be initialised.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("slackoverflow/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            api_host: config.api_host,
            api_version: config.api_version,
            api_key: config.api_key.filter(|k| !k.is_empty()),
            quota_max: AtomicU32::new(0),
            quota_remaining: AtomicU32::new(0),
        })
    }

    /// New `/search/advanced` query carrying the configured key.
    #[must_use]
    pub fn search_advanced(&self) -> Query {
        Query::search_advanced(self.api_key.as_deref())
    }

    /// New `/questions/{ids}` query carrying the configured key.
    #[must_use]
    pub fn questions(&self, ids: &[i64]) -> Query {
        Query::questions(ids, self.api_key.as_deref())
    }

    /// Quota reported by the last successful response.
    #[must_use]
    pub fn quota(&self) -> Quota {
        Quota {
            max: self.quota_max.load(Ordering::Relaxed),
            remaining: self.quota_remaining.load(Ordering::Relaxed),
        }
    }

    /// Fetch the current page of `query`.
    ///
    /// Records `has_more` on the query's cursor; the caller decides whether
    /// to move to the next page.
    pub async fn fetch(&self, query: &mut Query) -> Result<QuestionsEnvelope, Error> {
        let url = query.url(&self.api_host, &self.api_version)?;
        debug!(path = %url.path(), page = query.paging.current_page(), "Fetching questions");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Stack Exchange reports errors as an envelope with a 4xx status.
            if let Ok(envelope) = serde_json::from_str::<QuestionsEnvelope>(&body) {
                self.record_quota(&envelope);
                if let Some(err) = envelope.error() {
                    warn!(status = %status, error = %err, "Stack Exchange request failed");
                    return Err(err);
                }
            }
            warn!(status = %status, "Stack Exchange request failed");
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: QuestionsEnvelope = serde_json::from_str(&body)?;
        self.record_quota(&envelope);
        if let Some(err) = envelope.error() {
            return Err(err);
        }

        query.paging.record(envelope.has_more);

        if let Some(backoff) = envelope.backoff {
            warn!(backoff_secs = backoff, "Stack Exchange asked to back off");
        }

        debug!(
            items = envelope.items.len(),
            has_more = envelope.has_more,
            quota = %self.quota(),
            "Fetched questions"
        );

        Ok(envelope)
    }

    /// Remember the quota of a response. Error wrappers may omit it.
    fn record_quota(&self, envelope: &QuestionsEnvelope) {
        if envelope.quota_max == 0 {
            return;
        }
        self.quota_max.store(envelope.quota_max, Ordering::Relaxed);
        self.quota_remaining
            .store(envelope.quota_remaining, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, key: Option<&str>) -> Client {
        Client::new(ClientConfig {
            api_host: server.uri(),
            api_key: key.map(ToString::to_string),
            timeout: Duration::from_secs(5),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    fn page_body(ids: &[i64], has_more: bool) -> serde_json::Value {
        let items: Vec<_> = ids
            .iter()
            .map(|id| {
                serde_json::json!({
                    "question_id": id,
                    "title": format!("question {id}"),
                    "creation_date": 1_500_000_000 + id,
                    "last_activity_date": 1_500_000_000 + id,
                    "owner": {"user_id": 7, "display_name": "asker"},
                    "is_answered": false,
                    "tags": ["aframe"],
                    "score": 0
                })
            })
            .collect();
        serde_json::json!({
            "items": items,
            "has_more": has_more,
            "quota_max": 10000,
            "quota_remaining": 9990
        })
    }

    #[tokio::test]
    async fn test_search_sends_parameters() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2.3/search/advanced"))
            .and(query_param("site", "stackoverflow"))
            .and(query_param("tagged", "aframe"))
            .and(query_param("fromdate", "1500000001"))
            .and(query_param("sort", "creation"))
            .and(query_param("page", "2"))
            .and(query_param("key", "app-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[1, 2], true)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("app-key"));
        let mut query = client.search_advanced();
        query.parameters.set("tagged", "aframe");
        query.parameters.set("fromdate", 1_500_000_001_i64);
        query.paging.next_page();

        let envelope = client.fetch(&mut query).await.unwrap();
        assert_eq!(envelope.items.len(), 2);
        assert!(query.paging.has_more());
        assert_eq!(
            client.quota(),
            Quota {
                max: 10000,
                remaining: 9990
            }
        );
        assert_eq!(client.quota().to_string(), "(9990/10000)");
    }

    #[tokio::test]
    async fn test_questions_by_ids() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2.3/questions/3;4"))
            .and(query_param("sort", "activity"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[3, 4], false)))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let mut query = client.questions(&[3, 4]);
        let envelope = client.fetch(&mut query).await.unwrap();

        let ids: Vec<_> = envelope.items.iter().map(|q| q.question_id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert!(!query.paging.has_more());
    }

    #[tokio::test]
    async fn test_error_envelope_is_returned() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error_id": 400,
                "error_name": "bad_parameter",
                "error_message": "site is required"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let mut query = client.search_advanced();
        let err = client.fetch(&mut query).await.unwrap_err();

        assert!(
            matches!(&err, Error::Api { id: 400, name, .. } if name == "bad_parameter"),
            "expected api error, got {err:?}"
        );
        assert_eq!(client.quota(), Quota::default());
    }

    #[tokio::test]
    async fn test_error_envelope_updates_quota() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error_id": 502,
                "error_name": "throttle_violation",
                "error_message": "too many requests from this IP",
                "quota_max": 300,
                "quota_remaining": 0
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let mut query = client.search_advanced();
        let err = client.fetch(&mut query).await.unwrap_err();

        assert!(matches!(err, Error::Api { id: 502, .. }), "got {err:?}");
        assert_eq!(
            client.quota(),
            Quota {
                max: 300,
                remaining: 0
            }
        );
    }

    #[tokio::test]
    async fn test_plain_status_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let mut query = client.questions(&[1]);
        let err = client.fetch(&mut query).await.unwrap_err();

        assert!(
            matches!(&err, Error::Status { status: 503, body } if body == "unavailable"),
            "expected status error, got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let mut query = client.search_advanced();
        let err = client.fetch(&mut query).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_backoff_is_exposed() {
        let server = MockServer::start().await;

        let mut body = page_body(&[9], true);
        body["backoff"] = serde_json::json!(10);

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let mut query = client.search_advanced();
        let envelope = client.fetch(&mut query).await.unwrap();
        assert_eq!(envelope.backoff, Some(10));
    }

    #[tokio::test]
    async fn test_empty_ids_hit_placeholder() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2.3/questions/100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[], false)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let mut query = client.questions(&[]);
        let envelope = client.fetch(&mut query).await.unwrap();
        assert!(envelope.items.is_empty());
    }
}
