use crate::batch::{BatchCollector, CollectorHandle, FlushHandler};
use crate::config::RobotConfig;
use crate::digest::{self, Digest, TitleFormatter};
use crate::signing::{self, SignScheme, Signature};
use crate::telemetry::DeliverySink;
use crate::transport::{check_api_code, HttpTransport};
use crate::types::{At, Markdown, RobotMessage};
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// DingTalk custom robot.
///
/// Cloning is cheap; clones share the pending digest batch.
#[derive(Clone)]
pub struct DingTalkRobot {
    config: Arc<RobotConfig>,
    url: Url,
    transport: HttpTransport,
    collector: BatchCollector<RobotMessage>,
    title_formatter: Option<TitleFormatter>,
    at: Option<At>,
}

impl DingTalkRobot {
    pub fn new(config: RobotConfig) -> Result<Self> {
        Self::with_transport(config, HttpTransport::new()?)
    }

    pub fn with_transport(config: RobotConfig, transport: HttpTransport) -> Result<Self> {
        let url = config.webhook_url()?;
        Ok(Self {
            collector: BatchCollector::new(format!("dingtalk:{}", url.path())),
            config: Arc::new(config),
            url,
            transport,
            title_formatter: None,
            at: None,
        })
    }

    /// Report digest outcomes to `sink` instead of the tracing log.
    pub fn with_sink(mut self, sink: Arc<dyn DeliverySink>) -> Self {
        self.collector = self.collector.with_sink(sink);
        self
    }

    pub fn with_title_formatter<F>(mut self, format: F) -> Self
    where
        F: Fn(&[RobotMessage]) -> String + Send + Sync + 'static,
    {
        self.title_formatter = Some(Arc::new(format));
        self
    }

    /// Mention these people on every message this robot sends.
    pub fn with_at(mut self, at: At) -> Self {
        self.at = Some(at);
        self
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub fn collector(&self) -> &BatchCollector<RobotMessage> {
        &self.collector
    }

    /// Queue a message for the next digest.
    pub fn push(&self, message: impl Into<RobotMessage>) {
        self.collector.push(message.into());
    }

    /// Start sending a digest every flush interval.
    pub fn listen(&self) -> CollectorHandle {
        self.listen_with_token(CancellationToken::new())
    }

    pub fn listen_with_token(&self, token: CancellationToken) -> CollectorHandle {
        self.collector
            .start_with_token(self.config.flush_interval(), self.clone(), token)
    }

    pub fn prepare_digest(&self, messages: &[RobotMessage]) -> Digest {
        digest::build(
            messages,
            self.title_formatter.as_ref(),
            self.config.title.as_deref(),
        )
    }

    pub fn prepare_markdown(&self, messages: &[RobotMessage]) -> Markdown {
        let digest = self.prepare_digest(messages);
        Markdown {
            title: digest.title,
            text: digest.text,
        }
    }

    /// Webhook URL with `timestamp` and `sign` appended. The webhook's own
    /// query (the access token) is kept. Unsigned robots get the bare URL.
    pub fn signed_url(&self, timestamp: i64) -> Result<Url> {
        let mut url = self.url.clone();
        if self.config.is_signed() {
            let Signature { timestamp, sign } =
                signing::sign_at(SignScheme::SecretKeyed, &self.config.secret, timestamp)?;
            url.query_pairs_mut()
                .append_pair("timestamp", &timestamp.to_string())
                .append_pair("sign", &sign);
        }
        Ok(url)
    }

    /// Request body for a direct send.
    pub fn payload(&self, message: &RobotMessage) -> Result<serde_json::Value> {
        let body = match message {
            RobotMessage::Text(t) => serde_json::to_value(t)?,
            RobotMessage::Link(l) => serde_json::to_value(l)?,
            RobotMessage::Markdown(m) => serde_json::to_value(m)?,
            RobotMessage::ActionCard(c) => serde_json::to_value(c)?,
            RobotMessage::FeedCard(f) => serde_json::to_value(f)?,
            RobotMessage::Other(v) => json!({ "content": v.to_string() }),
        };
        let msg_type = message.msg_type();
        let mut payload = json!({ "msgtype": msg_type });
        payload[msg_type] = body;
        if let Some(at) = &self.at {
            payload["at"] = serde_json::to_value(at)?;
        }
        Ok(payload)
    }

    /// Send one message right away, bypassing the digest.
    pub async fn send(&self, message: impl Into<RobotMessage>) -> Result<()> {
        let message = message.into();
        let payload = self.payload(&message)?;
        self.request(&payload).await
    }

    pub async fn send_markdown(&self, markdown: Markdown) -> Result<()> {
        self.send(RobotMessage::Markdown(markdown)).await
    }

    /// Render `messages` into one markdown digest and send it. An empty
    /// slice sends nothing.
    pub async fn send_digest(&self, messages: &[RobotMessage]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = messages.len(), "sending dingtalk digest");
        self.send_markdown(self.prepare_markdown(messages)).await
    }

    async fn request(&self, payload: &serde_json::Value) -> Result<()> {
        let url = self.signed_url(signing::unix_millis())?;
        let reply = self.transport.post_json(&url, payload).await?;
        check_api_code(&reply, &["errcode"], &["errmsg"])
    }
}

#[async_trait]
impl FlushHandler<RobotMessage> for DingTalkRobot {
    async fn flush(&self, items: Vec<RobotMessage>) -> Result<()> {
        self.send_digest(&items).await
    }
}
