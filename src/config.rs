//! Per-channel robot configuration.
//!
//! A config can be built in code, read from YAML, or read from the
//! environment:
//!
//! ```yaml
//! webhook: https://oapi.dingtalk.com/robot/send?access_token=abc
//! secret: SEC0123
//! flush_interval_ms: 2000
//! title: nightly jobs
//! ```

use crate::batch::normalize_interval;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotConfig {
    pub webhook: String,
    /// Shared signing secret. Empty disables signing.
    #[serde(default, alias = "sign_secret")]
    pub secret: String,
    #[serde(
        rename = "flush_interval_ms",
        with = "duration_ms",
        default = "default_flush_interval"
    )]
    pub flush_interval: Duration,
    /// Fixed digest title; falls back to the item count when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

fn default_flush_interval() -> Duration {
    crate::batch::DEFAULT_FLUSH_INTERVAL
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

// The secret stays out of logs.
impl fmt::Debug for RobotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotConfig")
            .field("webhook", &self.webhook)
            .field("secret", &if self.secret.is_empty() { "" } else { "***" })
            .field("flush_interval", &self.flush_interval)
            .field("title", &self.title)
            .finish()
    }
}

impl RobotConfig {
    pub fn new(webhook: impl Into<String>) -> Self {
        Self {
            webhook: webhook.into(),
            secret: String::new(),
            flush_interval: default_flush_interval(),
            title: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Flush cadence with zero normalized to the default.
    pub fn flush_interval(&self) -> Duration {
        normalize_interval(self.flush_interval)
    }

    pub fn is_signed(&self) -> bool {
        !self.secret.is_empty()
    }

    pub fn webhook_url(&self) -> Result<Url> {
        Url::parse(&self.webhook).map_err(|e| {
            Error::configuration_with_context(
                "invalid webhook url",
                ErrorContext::new()
                    .with_field_path("webhook")
                    .with_details(e.to_string()),
            )
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.webhook_url()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Read `{PREFIX}_WEBHOOK` (required), `{PREFIX}_SECRET`,
    /// `{PREFIX}_FLUSH_INTERVAL_MS` and `{PREFIX}_TITLE`.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = |suffix: &str| format!("{}_{}", prefix, suffix);

        let webhook_key = key("WEBHOOK");
        let webhook = lookup(&webhook_key).ok_or_else(|| {
            Error::configuration_with_context(
                "missing webhook",
                ErrorContext::new()
                    .with_field_path(webhook_key.clone())
                    .with_source("config_env"),
            )
        })?;

        let mut config = Self::new(webhook);
        if let Some(secret) = lookup(&key("SECRET")) {
            config.secret = secret;
        }
        let interval_key = key("FLUSH_INTERVAL_MS");
        if let Some(raw) = lookup(&interval_key) {
            let ms = raw.trim().parse::<u64>().map_err(|e| {
                Error::configuration_with_context(
                    "flush interval must be a whole number of milliseconds",
                    ErrorContext::new()
                        .with_field_path(interval_key.clone())
                        .with_details(e.to_string())
                        .with_source("config_env"),
                )
            })?;
            config.flush_interval = Duration::from_millis(ms);
        }
        config.title = lookup(&key("TITLE")).filter(|t| !t.is_empty());

        config.webhook_url()?;
        Ok(config)
    }
}
