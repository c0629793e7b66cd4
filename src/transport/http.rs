use crate::{Error, Result};
use reqwest::Proxy;
use serde::Serialize;
use std::env;
use std::time::Duration;
use url::Url;

/// Thin JSON-over-HTTP client shared by the robots.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client from env-overridable defaults.
    pub fn new() -> Result<Self> {
        let timeout_secs = env::var("ROBOT_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(
                env::var("ROBOT_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(8),
            )
            .user_agent(concat!("robot-webhook/", env!("CARGO_PKG_VERSION")));

        if let Ok(proxy_url) = env::var("ROBOT_PROXY_URL") {
            match Proxy::all(&proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => tracing::warn!(proxy = %proxy_url, error = %e, "ignoring invalid proxy url"),
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client })
    }

    /// Reuse an existing reqwest client (shared pools, custom TLS, tests).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// POST `body` as JSON and return the decoded response body.
    ///
    /// Non-2xx statuses become [`Error::Remote`]. An empty or non-JSON
    /// success body is returned as `Null` or a JSON string respectively.
    pub async fn post_json<B>(&self, url: &Url, body: &B) -> Result<serde_json::Value>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        if !status.is_success() {
            return Err(Error::Remote {
                status: status.as_u16(),
                message: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }
}

/// Check a robot's JSON reply for an application-level error code.
///
/// The first key in `code_keys` present as an integer decides; zero means
/// success. Replies without any of the keys are treated as success.
pub fn check_api_code(
    body: &serde_json::Value,
    code_keys: &[&str],
    message_keys: &[&str],
) -> Result<()> {
    let Some(code) = code_keys.iter().find_map(|k| body.get(*k).and_then(|v| v.as_i64())) else {
        return Ok(());
    };
    if code == 0 {
        return Ok(());
    }
    let message = message_keys
        .iter()
        .find_map(|k| body.get(*k).and_then(|v| v.as_str()))
        .unwrap_or("unknown error")
        .to_string();
    Err(Error::Api { code, message })
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_code_zero_is_success() {
        let body = json!({"errcode": 0, "errmsg": "ok"});
        assert!(check_api_code(&body, &["errcode"], &["errmsg"]).is_ok());
    }

    #[test]
    fn test_api_code_nonzero_is_error() {
        let body = json!({"errcode": 310000, "errmsg": "sign not match"});
        match check_api_code(&body, &["errcode"], &["errmsg"]) {
            Err(Error::Api { code, message }) => {
                assert_eq!(code, 310000);
                assert_eq!(message, "sign not match");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_api_code_falls_through_keys() {
        let body = json!({"StatusCode": 9499, "StatusMessage": "Bad Request"});
        let err = check_api_code(&body, &["code", "StatusCode"], &["msg", "StatusMessage"])
            .unwrap_err();
        assert_eq!(err.to_string(), "Robot API error: code 9499: Bad Request");
    }

    #[test]
    fn test_missing_code_is_success() {
        assert!(check_api_code(&serde_json::Value::Null, &["code"], &["msg"]).is_ok());
        assert!(check_api_code(&json!("ok"), &["code"], &["msg"]).is_ok());
    }
}
