//! Robot message variants and their markdown rendering.
//!
//! Field names serialize the way the DingTalk robot API spells them, so each
//! struct can be embedded directly in a request body.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub title: String,
    pub text: String,
    #[serde(rename = "messageUrl")]
    pub message_url: String,
    #[serde(rename = "picUrl", default, skip_serializing_if = "String::is_empty")]
    pub pic_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markdown {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCard {
    pub title: String,
    pub text: String,
    #[serde(rename = "singleTitle")]
    pub single_title: String,
    #[serde(rename = "singleURL")]
    pub single_url: String,
    #[serde(
        rename = "btnOrientation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub btn_orientation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedLink {
    pub title: String,
    #[serde(rename = "messageURL")]
    pub message_url: String,
    #[serde(rename = "picURL")]
    pub pic_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCard {
    pub links: Vec<FeedLink>,
}

/// Who to mention alongside a DingTalk message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct At {
    #[serde(rename = "atMobiles", default, skip_serializing_if = "Vec::is_empty")]
    pub at_mobiles: Vec<String>,
    #[serde(rename = "atUserIds", default, skip_serializing_if = "Vec::is_empty")]
    pub at_user_ids: Vec<String>,
    #[serde(rename = "isAtAll", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_at_all: bool,
}

impl At {
    pub fn all() -> Self {
        Self {
            is_at_all: true,
            ..Self::default()
        }
    }

    pub fn mobiles<I, S>(mobiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            at_mobiles: mobiles.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_user_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.at_user_ids = ids.into_iter().map(Into::into).collect();
        self
    }
}

/// One application-level notification.
///
/// `Other` carries any serializable value that has no dedicated variant; it
/// renders as compact JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum RobotMessage {
    Text(Text),
    Link(Link),
    Markdown(Markdown),
    ActionCard(ActionCard),
    FeedCard(FeedCard),
    Other(serde_json::Value),
}

impl RobotMessage {
    pub fn text(content: impl Into<String>) -> Self {
        RobotMessage::Text(Text {
            content: content.into(),
        })
    }

    pub fn markdown(title: impl Into<String>, text: impl Into<String>) -> Self {
        RobotMessage::Markdown(Markdown {
            title: title.into(),
            text: text.into(),
        })
    }

    pub fn link(
        title: impl Into<String>,
        text: impl Into<String>,
        message_url: impl Into<String>,
    ) -> Self {
        RobotMessage::Link(Link {
            title: title.into(),
            text: text.into(),
            message_url: message_url.into(),
            pic_url: String::new(),
        })
    }

    pub fn action_card(
        title: impl Into<String>,
        text: impl Into<String>,
        single_title: impl Into<String>,
        single_url: impl Into<String>,
    ) -> Self {
        RobotMessage::ActionCard(ActionCard {
            title: title.into(),
            text: text.into(),
            single_title: single_title.into(),
            single_url: single_url.into(),
            btn_orientation: None,
        })
    }

    /// Wrap any serializable value.
    pub fn other<T: Serialize>(value: &T) -> crate::Result<Self> {
        Ok(RobotMessage::Other(serde_json::to_value(value)?))
    }

    /// DingTalk `msgtype` for a direct send. `Other` goes out as text.
    pub fn msg_type(&self) -> &'static str {
        match self {
            RobotMessage::Text(_) | RobotMessage::Other(_) => "text",
            RobotMessage::Link(_) => "link",
            RobotMessage::Markdown(_) => "markdown",
            RobotMessage::ActionCard(_) => "actionCard",
            RobotMessage::FeedCard(_) => "feedCard",
        }
    }

    /// Render this message as a markdown fragment, newline-terminated.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = match self {
            RobotMessage::Markdown(m) => writeln!(out, "## {}\n{}", m.title, m.text),
            RobotMessage::Text(t) => writeln!(out, "{}", t.content),
            RobotMessage::ActionCard(c) => writeln!(
                out,
                "## {}\n[{}]({})\n{}",
                c.title, c.single_title, c.single_url, c.text
            ),
            RobotMessage::Link(l) => {
                let image = if l.pic_url.is_empty() {
                    String::new()
                } else {
                    format!("![]({})", l.pic_url)
                };
                writeln!(
                    out,
                    "## {}\n{}[{}]({})\n{}",
                    l.title, image, l.message_url, l.message_url, l.text
                )
            }
            RobotMessage::FeedCard(f) => f
                .links
                .iter()
                .try_for_each(|l| writeln!(out, "- [{}]({})", l.title, l.message_url)),
            RobotMessage::Other(v) => writeln!(out, "{}", v),
        };
        out
    }
}

impl From<Text> for RobotMessage {
    fn from(v: Text) -> Self {
        RobotMessage::Text(v)
    }
}

impl From<Link> for RobotMessage {
    fn from(v: Link) -> Self {
        RobotMessage::Link(v)
    }
}

impl From<Markdown> for RobotMessage {
    fn from(v: Markdown) -> Self {
        RobotMessage::Markdown(v)
    }
}

impl From<ActionCard> for RobotMessage {
    fn from(v: ActionCard) -> Self {
        RobotMessage::ActionCard(v)
    }
}

impl From<FeedCard> for RobotMessage {
    fn from(v: FeedCard) -> Self {
        RobotMessage::FeedCard(v)
    }
}

impl From<serde_json::Value> for RobotMessage {
    fn from(v: serde_json::Value) -> Self {
        RobotMessage::Other(v)
    }
}

impl From<&str> for RobotMessage {
    fn from(v: &str) -> Self {
        RobotMessage::text(v)
    }
}

impl From<String> for RobotMessage {
    fn from(v: String) -> Self {
        RobotMessage::text(v)
    }
}
