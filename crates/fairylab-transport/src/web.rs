//! Slack Web API client.
//!
//! The client is async. Its [`ChatClient`] implementation bridges onto the
//! runtime handle captured at construction, so it must only be called from
//! threads that are not driving the runtime, such as the `spawn_blocking`
//! threads plugin hooks run on.

use std::time::Duration;

#[cfg(feature = "ws-client")]
use async_trait::async_trait;
use fairylab_core::{Attachment, ChatClient, ChatResult};
use reqwest::{Client, ClientBuilder};
use serde_json::{Value, json};
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::error::{TransportError, TransportResult};
#[cfg(feature = "ws-client")]
use crate::socket::SocketUrl;

/// Default Web API base URL.
pub const SLACK_API_URL: &str = "https://slack.com/api";

/// Authenticated Slack Web API client.
#[derive(Debug, Clone)]
pub struct SlackWebClient {
    client: Client,
    token: String,
    api_url: String,
    handle: Handle,
}

impl SlackWebClient {
    /// Creates a client for `token`, bound to the current tokio runtime.
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> TransportResult<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let handle = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        Ok(Self {
            client,
            token: token.into(),
            api_url: api_url.into().trim_end_matches('/').to_owned(),
            handle,
        })
    }

    /// Calls a Web API method with a JSON body and returns the reply.
    pub async fn api_call(&self, method: &str, body: Value) -> TransportResult<Value> {
        let url = format!("{}/{}", self.api_url, method);
        debug!(method = %method, "Calling Slack API");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!(
                "HTTP {} error: {}",
                status.as_u16(),
                text
            )));
        }

        let reply: Value = resp
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse {
                method: method.to_owned(),
                reason: e.to_string(),
            })?;
        check_ok(method, reply)
    }

    /// Requests a fresh real-time messaging socket URL.
    pub async fn rtm_connect(&self) -> TransportResult<String> {
        let reply = self.api_call("rtm.connect", json!({})).await?;
        let url = reply
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::InvalidResponse {
                method: "rtm.connect".into(),
                reason: "missing url".into(),
            })?;
        info!("Obtained socket URL");
        Ok(url.to_owned())
    }

    pub async fn chat_post_message(
        &self,
        channel: &str,
        text: &str,
        attachments: &[Attachment],
    ) -> TransportResult<Option<String>> {
        let mut body = json!({
            "channel": channel,
            "text": text,
            "as_user": true,
            "link_names": true,
        });
        if !attachments.is_empty() {
            body["attachments"] = json!(attachments);
        }
        let reply = self.api_call("chat.postMessage", body).await?;
        Ok(reply.get("ts").and_then(Value::as_str).map(str::to_owned))
    }

    pub async fn reactions_add(&self, channel: &str, ts: &str, name: &str) -> TransportResult<()> {
        self.api_call(
            "reactions.add",
            json!({"channel": channel, "timestamp": ts, "name": name}),
        )
        .await?;
        Ok(())
    }
}

/// Turns an `ok: false` reply into [`TransportError::Api`].
fn check_ok(method: &str, reply: Value) -> TransportResult<Value> {
    if reply.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(reply);
    }
    let error = reply
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error")
        .to_owned();
    Err(TransportError::Api {
        method: method.to_owned(),
        error,
    })
}

impl ChatClient for SlackWebClient {
    fn post_message(
        &self,
        channel: &str,
        text: &str,
        attachments: &[Attachment],
    ) -> ChatResult<Option<String>> {
        Ok(self
            .handle
            .block_on(self.chat_post_message(channel, text, attachments))?)
    }

    fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> ChatResult<()> {
        Ok(self.handle.block_on(self.reactions_add(channel, ts, name))?)
    }
}

#[cfg(feature = "ws-client")]
#[async_trait]
impl SocketUrl for SlackWebClient {
    async fn socket_url(&self) -> TransportResult<String> {
        self.rtm_connect().await
    }
}
