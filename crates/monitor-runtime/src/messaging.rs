//! Report delivery.
//!
//! [`ReportSink`] is the seam between report producers and the transport.
//! [`SlackClient`] implements it over the Slack Web API. Delivery is attempted
//! once; the outcome comes back as a [`Delivery`] and is never retried here.

use std::future::Future;

use monitor_core::error::{MonitorError, Result};
use monitor_core::settings::{MessagingConfig, ReportTarget};
use monitor_data::report::Report;
use reqwest::Client;
use serde_json::{json, Value};

pub const SLACK_API_BASE: &str = "https://slack.com/api";

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub success: bool,
    /// Human-readable outcome, shown to the user or logged.
    pub message: String,
}

impl Delivery {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Something that can deliver a report.
pub trait ReportSink: Send + Sync {
    fn deliver(&self, report: &Report) -> impl Future<Output = Delivery> + Send;
}

// ── SlackClient ───────────────────────────────────────────────────────────────

/// Slack Web API client posting reports to a channel or a user's DM.
#[derive(Debug, Clone)]
pub struct SlackClient {
    client: Client,
    config: MessagingConfig,
    base_url: String,
}

impl SlackClient {
    pub fn new(config: MessagingConfig) -> Self {
        Self::with_base_url(config, SLACK_API_BASE)
    }

    /// Point the client at another API root.
    pub fn with_base_url(config: MessagingConfig, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            config,
            base_url: base_url.into(),
        }
    }

    async fn send(&self, report: &Report) -> Result<String> {
        let (channel, described) = match &self.config.target {
            ReportTarget::Channel(name) => {
                (channel_name(name).to_string(), format!("channel {name}"))
            }
            ReportTarget::User(user) => {
                let response = self
                    .call("conversations.open", &open_conversation_payload(user))
                    .await?;
                let id = conversation_id(&response).ok_or_else(|| {
                    MonitorError::Delivery("conversations.open returned no channel id".into())
                })?;
                tracing::debug!(channel = %id, "opened DM channel");
                (id, format!("user {user}"))
            }
        };

        self.call("chat.postMessage", &post_message_payload(&channel, report))
            .await?;
        Ok(format!("Message sent to {described}"))
    }

    async fn call(&self, method: &str, payload: &Value) -> Result<Value> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), method);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.bot_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| MonitorError::Delivery(format!("Error sending message: {e}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| MonitorError::Delivery(format!("Error sending message: {e}")))?;

        parse_response(body)
    }
}

impl ReportSink for SlackClient {
    async fn deliver(&self, report: &Report) -> Delivery {
        match self.send(report).await {
            Ok(message) => {
                tracing::info!("{}", message);
                Delivery::ok(message)
            }
            Err(MonitorError::Delivery(message)) => {
                tracing::error!("{}", message);
                Delivery::failed(message)
            }
            Err(e) => {
                tracing::error!("{}", e);
                Delivery::failed(e.to_string())
            }
        }
    }
}

// ── Payloads ──────────────────────────────────────────────────────────────────

/// Channel names are accepted with or without a leading `#`.
pub fn channel_name(name: &str) -> &str {
    name.trim_start_matches('#')
}

/// Body of `chat.postMessage`: the text doubles as the notification fallback.
pub fn post_message_payload(channel: &str, report: &Report) -> Value {
    json!({
        "channel": channel,
        "text": report.to_text(),
        "blocks": report.to_blocks(),
    })
}

/// Body of `conversations.open` for a single user.
pub fn open_conversation_payload(user: &str) -> Value {
    json!({ "users": user })
}

/// Channel id of a `conversations.open` response.
pub fn conversation_id(response: &Value) -> Option<String> {
    response["channel"]["id"].as_str().map(str::to_string)
}

/// Slack answers HTTP 200 with `"ok": false` on API errors.
pub fn parse_response(body: Value) -> Result<Value> {
    if body["ok"].as_bool() == Some(true) {
        return Ok(body);
    }
    let error = body["error"].as_str().unwrap_or("unknown_error");
    Err(MonitorError::Delivery(format!("Slack API error: {error}")))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
