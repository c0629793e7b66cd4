//! # DingTalk robot
//!
//! Sends messages to a DingTalk custom robot webhook. Requests are signed by
//! appending `timestamp` (milliseconds) and `sign` to the webhook query.
//!
//! Messages can be sent directly with [`DingTalkRobot::send`] or queued with
//! [`DingTalkRobot::push`]; queued messages go out as one markdown digest per
//! flush interval once [`DingTalkRobot::listen`] is running.
//!
//! ```rust,no_run
//! use robot_webhook::dingtalk::DingTalkRobot;
//! use robot_webhook::{RobotConfig, RobotMessage};
//!
//! # async fn run() -> robot_webhook::Result<()> {
//! let robot = DingTalkRobot::new(
//!     RobotConfig::new("https://oapi.dingtalk.com/robot/send?access_token=...")
//!         .with_secret("SEC..."),
//! )?;
//! let handle = robot.listen();
//!
//! robot.push(RobotMessage::markdown("backup", "finished in 4m"));
//! robot.push("disk at 91%");
//!
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```

mod robot;

pub use robot::DingTalkRobot;
