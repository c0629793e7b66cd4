//! # FeiShu robot
//!
//! Sends messages to a FeiShu (Lark) custom bot webhook. The signature is a
//! seconds timestamp plus `sign`, both carried as JSON body fields.
//!
//! ```rust,no_run
//! use robot_webhook::feishu::FeiShuRobot;
//!
//! # async fn run() -> robot_webhook::Result<()> {
//! let robot = FeiShuRobot::new(
//!     "https://open.feishu.cn/open-apis/bot/v2/hook/...",
//!     "secret",
//! )?;
//! robot.send_text("Hello world!").await?;
//! # Ok(())
//! # }
//! ```

mod robot;

pub use robot::{FeiShuContent, FeiShuRobot};
