//! Digest construction: one flushed batch becomes one titled markdown message.

use crate::types::RobotMessage;
use std::sync::Arc;

/// Custom digest title, given the full batch.
pub type TitleFormatter = Arc<dyn Fn(&[RobotMessage]) -> String + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub title: String,
    pub text: String,
    pub count: usize,
}

/// Title used when neither a formatter nor a configured title is set.
pub fn default_title(count: usize) -> String {
    format!("{} messages", count)
}

/// Formatter first, then a non-empty configured title, then the item count.
pub fn select_title(
    messages: &[RobotMessage],
    formatter: Option<&TitleFormatter>,
    configured: Option<&str>,
) -> String {
    if let Some(format) = formatter {
        return format(messages);
    }
    match configured {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => default_title(messages.len()),
    }
}

/// Concatenate every message's markdown fragment, in order.
pub fn render_body(messages: &[RobotMessage]) -> String {
    messages.iter().map(RobotMessage::render_markdown).collect()
}

pub fn build(
    messages: &[RobotMessage],
    formatter: Option<&TitleFormatter>,
    configured: Option<&str>,
) -> Digest {
    Digest {
        title: select_title(messages, formatter, configured),
        text: render_body(messages),
        count: messages.len(),
    }
}
