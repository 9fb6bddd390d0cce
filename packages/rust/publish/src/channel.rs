//! Messaging channel client (Telegram-style bot API).

use std::time::Duration;

use coalwire_shared::{ChannelConfig, CoalwireError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::chunk::{CAPTION_LIMIT, CHANNEL_CHUNK_LIMIT, split_for_channel, truncate_caption};

/// Pause between consecutive chunks of one logical message.
const INTER_CHUNK_DELAY: Duration = Duration::from_millis(500);

/// Request timeout for channel calls.
const SEND_TIMEOUT_SECS: u64 = 30;

/// Thin client over the bot HTTP API.
pub struct ChannelClient {
    client: Client,
    base_url: String,
    token: String,
    chat_id: String,
    admin_chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<SentMessage>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl ChannelClient {
    /// Build a client from config plus the resolved bot token.
    pub fn new(config: &ChannelConfig, token: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("coalwire/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .map_err(|e| CoalwireError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            chat_id: config.chat_id.clone(),
            admin_chat_id: config.admin_chat_id.clone(),
        })
    }

    /// One bot API method call; returns the sent message id.
    async fn call(&self, api_method: &str, body: serde_json::Value) -> Result<String> {
        let url = format!("{}/bot{}/{}", self.base_url, self.token, api_method);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoalwireError::Network(format!("{api_method}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoalwireError::Network(format!(
                "{api_method}: HTTP {status}"
            )));
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| CoalwireError::parse(format!("{api_method}: invalid response: {e}")))?;

        if !parsed.ok {
            return Err(CoalwireError::Publish(format!(
                "{api_method}: {}",
                parsed.description.unwrap_or_else(|| "unknown API error".into())
            )));
        }
        parsed
            .result
            .map(|m| m.message_id.to_string())
            .ok_or_else(|| CoalwireError::parse(format!("{api_method}: response has no result")))
    }

    /// Send HTML text to the channel, chunking long messages.
    ///
    /// Returns the id of the first sent message; that id anchors the
    /// publication record's channel slot.
    #[instrument(skip_all, fields(chars = text.chars().count()))]
    pub async fn send_message(&self, text: &str) -> Result<String> {
        let chunks = split_for_channel(text, CHANNEL_CHUNK_LIMIT);
        let total = chunks.len();
        let mut first_id = None;

        for (i, chunk) in chunks.iter().enumerate() {
            let id = self
                .call(
                    "sendMessage",
                    json!({
                        "chat_id": self.chat_id,
                        "text": chunk,
                        "parse_mode": "HTML",
                    }),
                )
                .await?;
            if first_id.is_none() {
                first_id = Some(id);
            }
            if i + 1 < total {
                tokio::time::sleep(INTER_CHUNK_DELAY).await;
            }
        }

        info!(chunks = total, "channel message sent");
        first_id.ok_or_else(|| CoalwireError::Publish("empty message".into()))
    }

    /// Send a photo with a caption, truncating the caption to the API limit.
    pub async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<String> {
        let caption = truncate_caption(caption, CAPTION_LIMIT);
        self.call(
            "sendPhoto",
            json!({
                "chat_id": self.chat_id,
                "photo": photo_url,
                "caption": caption,
                "parse_mode": "HTML",
            }),
        )
        .await
    }

    /// Send a status message to the admin chat, if one is configured.
    /// Admin notification failures are swallowed: they never affect the
    /// cycle outcome.
    pub async fn notify_admin(&self, text: &str) {
        let Some(admin_chat_id) = &self.admin_chat_id else {
            return;
        };
        let result = self
            .call(
                "sendMessage",
                json!({
                    "chat_id": admin_chat_id,
                    "text": text,
                    "parse_mode": "HTML",
                }),
            )
            .await;
        if let Err(e) = result {
            tracing::warn!(error = %e, "admin notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> ChannelClient {
        let config = ChannelConfig {
            base_url: server.uri(),
            chat_id: "@coalwire".into(),
            admin_chat_id: Some("777".into()),
            ..ChannelConfig::default()
        };
        ChannelClient::new(&config, "TEST_TOKEN".into()).unwrap()
    }

    fn ok_body(message_id: i64) -> serde_json::Value {
        json!({"ok": true, "result": {"message_id": message_id}})
    }

    #[tokio::test]
    async fn send_message_returns_first_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST_TOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(42)))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let id = client.send_message("<b>Coal up 4%</b>").await.unwrap();
        assert_eq!(id, "42");
    }

    #[tokio::test]
    async fn long_message_is_chunked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST_TOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(7)))
            .expect(3)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let para = "Coal demand held firm across Asian markets this week. ".repeat(40);
        let text = format!("{para}\n\n{para}\n\n{para}");
        assert!(text.chars().count() > CHANNEL_CHUNK_LIMIT);
        client.send_message(&text).await.unwrap();
    }

    #[tokio::test]
    async fn api_level_failure_is_publish_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST_TOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false, "description": "chat not found"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.send_message("hi").await.unwrap_err();
        assert!(err.to_string().contains("chat not found"));
    }

    #[tokio::test]
    async fn photo_caption_is_truncated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST_TOKEN/sendPhoto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(9)))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let caption = "c".repeat(3000);
        let id = client
            .send_photo("https://example.org/p.jpg", &caption)
            .await
            .unwrap();
        assert_eq!(id, "9");
    }

    #[tokio::test]
    async fn admin_notify_targets_admin_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST_TOKEN/sendMessage"))
            .and(body_string_contains("\"chat_id\":\"777\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(1)))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.notify_admin("status").await;
    }
}
