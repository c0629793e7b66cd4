use crate::batch::{BatchCollector, CollectorHandle, FlushHandler};
use crate::config::RobotConfig;
use crate::digest::{self, Digest, TitleFormatter};
use crate::signing::{self, SignScheme};
use crate::telemetry::DeliverySink;
use crate::transport::{check_api_code, HttpTransport};
use crate::types::RobotMessage;
use crate::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Message bodies understood by the FeiShu bot webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum FeiShuContent {
    Text(String),
    /// Rich text: a title and one paragraph per line.
    Post { title: String, lines: Vec<String> },
    /// Interactive card JSON, passed through as-is.
    Interactive(serde_json::Value),
}

impl FeiShuContent {
    pub fn msg_type(&self) -> &'static str {
        match self {
            FeiShuContent::Text(_) => "text",
            FeiShuContent::Post { .. } => "post",
            FeiShuContent::Interactive(_) => "interactive",
        }
    }
}

/// FeiShu (Lark) custom bot.
///
/// Signing uses a seconds timestamp and travels in the request body.
#[derive(Clone)]
pub struct FeiShuRobot {
    config: Arc<RobotConfig>,
    url: Url,
    transport: HttpTransport,
    collector: BatchCollector<RobotMessage>,
    title_formatter: Option<TitleFormatter>,
}

impl FeiShuRobot {
    pub fn new(webhook: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        Self::from_config(RobotConfig::new(webhook).with_secret(secret))
    }

    pub fn from_config(config: RobotConfig) -> Result<Self> {
        Self::with_transport(config, HttpTransport::new()?)
    }

    pub fn with_transport(config: RobotConfig, transport: HttpTransport) -> Result<Self> {
        let url = config.webhook_url()?;
        Ok(Self {
            collector: BatchCollector::new(format!("feishu:{}", url.path())),
            config: Arc::new(config),
            url,
            transport,
            title_formatter: None,
        })
    }

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

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub fn collector(&self) -> &BatchCollector<RobotMessage> {
        &self.collector
    }

    pub fn push(&self, message: impl Into<RobotMessage>) {
        self.collector.push(message.into());
    }

    pub fn listen(&self) -> CollectorHandle {
        self.listen_with_token(CancellationToken::new())
    }

    pub fn listen_with_token(&self, token: CancellationToken) -> CollectorHandle {
        self.collector
            .start_with_token(self.config.flush_interval(), self.clone(), token)
    }

    pub fn sign(&self, timestamp: i64) -> Result<String> {
        signing::sign(SignScheme::PayloadKeyed, &self.config.secret, timestamp)
    }

    pub fn prepare_digest(&self, messages: &[RobotMessage]) -> Digest {
        digest::build(
            messages,
            self.title_formatter.as_ref(),
            self.config.title.as_deref(),
        )
    }

    /// A digest as a `post`: one paragraph per message.
    pub fn prepare_post(&self, messages: &[RobotMessage]) -> FeiShuContent {
        let digest = self.prepare_digest(messages);
        FeiShuContent::Post {
            title: digest.title,
            lines: messages
                .iter()
                .map(|m| m.render_markdown().trim_end().to_string())
                .collect(),
        }
    }

    /// Request body for `content` signed at `timestamp` (seconds).
    pub fn payload(&self, content: &FeiShuContent, timestamp: i64) -> Result<serde_json::Value> {
        let mut payload = match content {
            FeiShuContent::Text(text) => json!({
                "msg_type": "text",
                "content": { "text": text },
            }),
            FeiShuContent::Post { title, lines } => {
                let paragraphs: Vec<serde_json::Value> = lines
                    .iter()
                    .map(|line| json!([{ "tag": "text", "text": line }]))
                    .collect();
                json!({
                    "msg_type": "post",
                    "content": {
                        "post": {
                            "zh_cn": { "title": title, "content": paragraphs }
                        }
                    },
                })
            }
            FeiShuContent::Interactive(card) => json!({
                "msg_type": "interactive",
                "card": card,
            }),
        };
        if self.config.is_signed() {
            payload["timestamp"] = json!(timestamp.to_string());
            payload["sign"] = json!(self.sign(timestamp)?);
        }
        Ok(payload)
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(FeiShuContent::Text(text.into())).await
    }

    pub async fn send_post(&self, title: impl Into<String>, lines: Vec<String>) -> Result<()> {
        self.send(FeiShuContent::Post {
            title: title.into(),
            lines,
        })
        .await
    }

    pub async fn send_card(&self, card: serde_json::Value) -> Result<()> {
        self.send(FeiShuContent::Interactive(card)).await
    }

    pub async fn send(&self, content: FeiShuContent) -> Result<()> {
        let payload = self.payload(&content, signing::unix_seconds())?;
        let reply = self.transport.post_json(&self.url, &payload).await?;
        tracing::debug!(msg_type = content.msg_type(), reply = %reply, "feishu reply");
        check_api_code(&reply, &["code", "StatusCode"], &["msg", "StatusMessage"])
    }

    pub async fn send_digest(&self, messages: &[RobotMessage]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = messages.len(), "sending feishu digest");
        self.send(self.prepare_post(messages)).await
    }
}

#[async_trait]
impl FlushHandler<RobotMessage> for FeiShuRobot {
    async fn flush(&self, items: Vec<RobotMessage>) -> Result<()> {
        self.send_digest(&items).await
    }
}
