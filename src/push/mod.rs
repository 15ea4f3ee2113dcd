/// Push notifications through Firebase Cloud Messaging (HTTP v1 API)
use crate::{
    config::PushConfig,
    error::{AppError, AppResult},
    notifications::PushChannel,
};
use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

/// Push notification payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: &str, value: impl Into<String>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

/// Where an FCM message is addressed
enum Target<'a> {
    Token(&'a str),
    Topic(&'a str),
}

/// Build the `messages:send` request body
fn fcm_request_body(target: Target<'_>, message: &PushMessage) -> serde_json::Value {
    let mut payload = json!({
        "notification": {
            "title": message.title,
            "body": message.body,
        },
        "data": message.data,
    });

    match target {
        Target::Token(token) => payload["token"] = json!(token),
        Target::Topic(topic) => payload["topic"] = json!(topic),
    }

    json!({ "message": payload })
}

/// FCM client
#[derive(Clone)]
pub struct FcmClient {
    http: reqwest::Client,
    /// `(send URL, access token)`; `None` disables push
    target: Option<(String, String)>,
}

impl FcmClient {
    pub fn new(config: &PushConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let target = config.fcm.as_ref().map(|fcm| {
            (
                format!(
                    "{}/v1/projects/{}/messages:send",
                    fcm.endpoint, fcm.project_id
                ),
                fcm.access_token.clone(),
            )
        });

        Ok(Self { http, target })
    }

    pub fn is_configured(&self) -> bool {
        self.target.is_some()
    }

    async fn send(&self, target: Target<'_>, message: &PushMessage) -> anyhow::Result<()> {
        let Some((url, access_token)) = &self.target else {
            tracing::warn!("Push not configured, skipping '{}'", message.title);
            return Ok(());
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&fcm_request_body(target, message))
            .send()
            .await
            .context("FCM request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("FCM returned {}: {}", status, body);
        }

        Ok(())
    }
}

#[async_trait]
impl PushChannel for FcmClient {
    async fn send_to_token(&self, token: &str, message: &PushMessage) -> anyhow::Result<()> {
        self.send(Target::Token(token), message).await
    }

    async fn broadcast_to_topic(&self, topic: &str, message: &PushMessage) -> anyhow::Result<()> {
        self.send(Target::Topic(topic), message).await
    }
}
