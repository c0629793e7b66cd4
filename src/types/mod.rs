//! # Types Module
//!
//! Message shapes accepted by the robots.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RobotMessage`] | Closed set of notification variants plus a JSON fallback |
//! | [`Text`], [`Link`], [`Markdown`], [`ActionCard`], [`FeedCard`] | Variant payloads |
//! | [`At`] | DingTalk mention list |
//!
//! Every variant can render itself as a markdown fragment, which is how a
//! batch of mixed messages becomes one digest.
//!
//! ```rust
//! use robot_webhook::types::RobotMessage;
//!
//! let msg = RobotMessage::markdown("Deploy", "v1.2 is live");
//! assert_eq!(msg.render_markdown(), "## Deploy\nv1.2 is live\n");
//! ```

pub mod message;

pub use message::{ActionCard, At, FeedCard, FeedLink, Link, Markdown, RobotMessage, Text};
