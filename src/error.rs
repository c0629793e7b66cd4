use thiserror::Error;

/// Structured error context attached to configuration failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field or key that caused the error (e.g., "webhook", "ROBOT_FLUSH_INTERVAL_MS")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the rejected value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config_env", "dingtalk")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for robot delivery.
///
/// Errors never travel back to producers calling `push`; inside a running
/// collector they are converted into delivery events and reported.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Signature error: {message}")]
    Signature { message: String },

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Remote error: HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Robot API error: code {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn signature(msg: impl Into<String>) -> Self {
        Error::Signature {
            message: msg.into(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// True when the robot endpoint was reached but refused the message.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Error::Remote { .. } | Error::Api { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_display_includes_context() {
        let err = Error::configuration_with_context(
            "missing webhook",
            ErrorContext::new()
                .with_field_path("ROBOT_WEBHOOK")
                .with_source("config_env"),
        );
        assert_eq!(
            err.to_string(),
            "Configuration error: missing webhook (field: ROBOT_WEBHOOK, source: config_env)"
        );
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("ROBOT_WEBHOOK")
        );
    }

    #[test]
    fn test_configuration_display_without_context() {
        let err = Error::configuration("bad");
        assert_eq!(err.to_string(), "Configuration error: bad");
    }

    #[test]
    fn test_rejected_classification() {
        assert!(Error::Remote {
            status: 500,
            message: "boom".into()
        }
        .is_rejected());
        assert!(Error::Api {
            code: 310000,
            message: "sign not match".into()
        }
        .is_rejected());
        assert!(!Error::signature("bad key").is_rejected());
    }
}
