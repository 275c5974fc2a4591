//! Operator alerts

use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Sends a text alert
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message`
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Writes alerts to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        info!(target: "alarm", "{}", message);
        Ok(())
    }
}

#[derive(Serialize)]
struct SlackBody<'a> {
    text: &'a str,
}

/// Posts alerts to a Slack incoming webhook
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    http: reqwest::Client,
    webhook_url: String,
}

impl SlackNotifier {
    /// Notifier for `webhook_url`
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?,
            webhook_url: webhook_url.into(),
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let body = self
            .http
            .post(&self.webhook_url)
            .json(&SlackBody { text: message })
            .send()
            .await?
            .text()
            .await?;
        if body != "ok" {
            return Err(Error::Network(format!(
                "non-ok response returned from Slack: {}",
                body
            )));
        }
        Ok(())
    }
}
