//! Slack Web API client.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::message::{ChannelInfo, ChatMessage, PostedMessage};

pub const DEFAULT_API_HOST: &str = "https://slack.com/api";

/// Fallback wait when a 429 comes without `retry-after`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Page size for `conversations.list`.
const CHANNEL_PAGE_LIMIT: u32 = 200;

/// Connection settings for [`SlackClient`].
#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub api_host: String,
    /// Bot or user OAuth token.
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Slack Web API client.
pub struct SlackClient {
    client: reqwest::Client,
    api_host: String,
    token: Option<String>,
}

impl SlackClient {
    pub fn new(config: SlackConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let token = config.token.filter(|t| !t.is_empty());
        if token.is_some() {
            debug!("Slack client enabled");
        } else {
            debug!("Slack client disabled (no token)");
        }

        Ok(Self {
            client,
            api_host: config.api_host.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Whether a token is configured.
    pub fn enabled(&self) -> bool {
        self.token.is_some()
    }

    /// `chat.postMessage`
    pub async fn post_message(
        &self,
        channel: &str,
        message: &ChatMessage,
    ) -> Result<PostedMessage, ChannelError> {
        let payload = Payload {
            channel,
            ts: None,
            message,
        };
        let response = self.call("chat.postMessage", &payload).await?;
        debug!(channel, ts = ?response.ts, "Message posted");
        posted(channel, response)
    }

    /// `chat.update`
    pub async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        message: &ChatMessage,
    ) -> Result<PostedMessage, ChannelError> {
        let payload = Payload {
            channel,
            ts: Some(ts),
            message,
        };
        let response = self.call("chat.update", &payload).await?;
        debug!(channel, ts, "Message updated");
        posted(channel, response)
    }

    /// `conversations.list`, following cursors until exhausted.
    pub async fn list_channels(&self) -> Result<Vec<ChannelInfo>, ChannelError> {
        let token = self.token()?;
        let url = format!("{}/conversations.list", self.api_host);
        let mut channels = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut query = vec![
                ("limit", CHANNEL_PAGE_LIMIT.to_string()),
                ("exclude_archived", "true".to_string()),
            ];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }

            let response = self
                .client
                .get(&url)
                .bearer_auth(token)
                .query(&query)
                .send()
                .await?;
            let body = decode(response).await?;

            channels.extend(body.channels);
            cursor = body
                .response_metadata
                .map(|m| m.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                break;
            }
        }

        debug!(count = channels.len(), "Listed channels");
        Ok(channels)
    }

    fn token(&self) -> Result<&str, ChannelError> {
        self.token
            .as_deref()
            .ok_or_else(|| ChannelError::NotConfigured("slack.token".to_string()))
    }

    async fn call<T: Serialize + ?Sized>(
        &self,
        method: &str,
        payload: &T,
    ) -> Result<ApiResponse, ChannelError> {
        let token = self.token()?;
        let response = self
            .client
            .post(format!("{}/{method}", self.api_host))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        decode(response).await
    }
}

/// Map HTTP status and the `ok` flag onto [`ChannelError`].
async fn decode(response: Response) -> Result<ApiResponse, ChannelError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

        warn!(
            channel = "slack",
            retry_after_secs = retry_after,
            "Rate limited by Slack"
        );

        return Err(ChannelError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(channel = "slack", status = %status, body = %body, "Slack request failed");
        return Err(ChannelError::Other(format!("Slack returned {status}: {body}")));
    }

    let body: ApiResponse = serde_json::from_str(&response.text().await?)?;
    if !body.ok {
        let error = body.error.unwrap_or_else(|| "unknown_error".to_string());
        warn!(channel = "slack", error = %error, "Slack API returned an error");
        return Err(ChannelError::Api(error));
    }

    if let Some(warning) = &body.warning {
        debug!(channel = "slack", warning = %warning, "Slack API warning");
    }

    Ok(body)
}

fn posted(channel: &str, response: ApiResponse) -> Result<PostedMessage, ChannelError> {
    let ts = response
        .ts
        .ok_or_else(|| ChannelError::Api("response missing ts".to_string()))?;
    Ok(PostedMessage {
        channel: response.channel.unwrap_or_else(|| channel.to_string()),
        ts,
    })
}

// =============================================================================
// Slack API types
// =============================================================================

#[derive(Debug, Serialize)]
struct Payload<'a> {
    channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<&'a str>,
    #[serde(flatten)]
    message: &'a ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warning: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    channels: Vec<ChannelInfo>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Attachment;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>) -> SlackClient {
        SlackClient::new(SlackConfig {
            api_host: server.uri(),
            token: token.map(ToString::to_string),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn message() -> ChatMessage {
        let mut message = ChatMessage::with_attachment(Attachment {
            fallback: "How do I rotate an entity?".to_string(),
            color: "#B7E0ED".to_string(),
            title: "How do I rotate an entity?".to_string(),
            title_link: "https://stackoverflow.com/q/42".to_string(),
            ..Default::default()
        });
        message.username = Some("vr dev asked on stackoverflow:".to_string());
        message
    }

    #[tokio::test]
    async fn test_post_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(header("authorization", "Bearer xoxb-test"))
            .and(body_partial_json(serde_json::json!({
                "channel": "C123",
                "username": "vr dev asked on stackoverflow:",
                "parse": "full",
                "attachments": [{"color": "#B7E0ED"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "channel": "C123",
                "ts": "1500000000.000100"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("xoxb-test"));
        let posted = client.post_message("C123", &message()).await.unwrap();
        assert_eq!(
            posted,
            PostedMessage {
                channel: "C123".to_string(),
                ts: "1500000000.000100".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_update_message_sends_ts() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat.update"))
            .and(body_partial_json(serde_json::json!({
                "channel": "C123",
                "ts": "1.0001"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "channel": "C123",
                "ts": "1.0001"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("xoxb-test"));
        let updated = client
            .update_message("C123", "1.0001", &message())
            .await
            .unwrap();
        assert_eq!(updated.ts, "1.0001");
    }

    #[tokio::test]
    async fn test_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "channel_not_found"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("xoxb-test"));
        let err = client.post_message("C404", &message()).await.unwrap_err();
        assert!(
            matches!(&err, ChannelError::Api(e) if e == "channel_not_found"),
            "expected api error, got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("xoxb-test"));
        let err = client.post_message("C123", &message()).await.unwrap_err();
        assert!(
            matches!(err, ChannelError::RateLimited { retry_after_secs: 30 }),
            "expected rate limit, got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_missing_token() {
        let server = MockServer::start().await;
        let client = client_for(&server, Some(""));
        assert!(!client.enabled());

        let err = client.post_message("C123", &message()).await.unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_list_channels_follows_cursor() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .and(query_param("cursor", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "channels": [{"id": "C2", "name": "aframe", "is_member": true}],
                "response_metadata": {"next_cursor": ""}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "channels": [{"id": "C1", "name": "general"}],
                "response_metadata": {"next_cursor": "page2"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("xoxb-test"));
        let channels = client.list_channels().await.unwrap();

        let names: Vec<_> = channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["general", "aframe"]);
        assert!(channels[1].is_member);
    }
}
