//! # robot-webhook
//!
//! Signed webhook clients for DingTalk and FeiShu chat robots, with
//! time-windowed digests.
//!
//! ## Overview
//!
//! Each robot formats a message, signs it with the robot's HMAC-SHA256
//! scheme and POSTs it to the configured webhook. Delivery is fire-and-forget:
//! there is no retry, and failures are reported rather than returned to
//! whoever queued the message.
//!
//! Besides direct sends, every robot owns a [`batch::BatchCollector`]. Messages
//! pushed onto it are rendered into one markdown digest per flush window, so a
//! burst of alerts turns into a single chat message.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use robot_webhook::dingtalk::DingTalkRobot;
//! use robot_webhook::{RobotConfig, RobotMessage};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> robot_webhook::Result<()> {
//!     let robot = DingTalkRobot::new(
//!         RobotConfig::from_env("DINGTALK")?.with_flush_interval(Duration::from_secs(5)),
//!     )?;
//!
//!     // One-off message
//!     robot.send(RobotMessage::text("service started")).await?;
//!
//!     // Batched digest
//!     let handle = robot.listen();
//!     robot.push("job 1 done");
//!     robot.push("job 2 done");
//!     handle.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`batch`] | Time-windowed batch collector |
//! | [`dingtalk`] | DingTalk robot client |
//! | [`feishu`] | FeiShu robot client |
//! | [`types`] | Message variants and markdown rendering |
//! | [`digest`] | Batch to titled digest |
//! | [`signing`] | HMAC-SHA256 request signatures |
//! | [`transport`] | JSON-over-HTTP delivery |
//! | [`config`] | Per-channel configuration |
//! | [`telemetry`] | Delivery outcome sinks |

pub mod batch;
pub mod config;
pub mod dingtalk;
pub mod digest;
pub mod feishu;
pub mod signing;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use batch::{BatchCollector, CollectorHandle, FlushHandler};
pub use config::RobotConfig;
pub use dingtalk::DingTalkRobot;
pub use feishu::{FeiShuContent, FeiShuRobot};
pub use telemetry::{DeliveryEvent, DeliverySink};
pub use types::{At, RobotMessage};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

pub mod error;
pub use error::{Error, ErrorContext};
