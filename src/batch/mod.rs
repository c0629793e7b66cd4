//! # Batching
//!
//! A [`BatchCollector`] accumulates arbitrary values pushed by any number of
//! producers and hands the whole accumulated batch to a [`FlushHandler`] once
//! per flush window.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchCollector`] | Thread-safe pending batch plus the flush loop |
//! | [`FlushHandler`] | Consumer of each non-empty batch (closures implement it) |
//! | [`CollectorHandle`] | Stops a running loop, with a final flush |
//!
//! ## Example
//!
//! ```rust,no_run
//! use robot_webhook::batch::BatchCollector;
//! use std::time::Duration;
//!
//! # async fn run() {
//! let collector: BatchCollector<String> = BatchCollector::new("alerts");
//! let handle = collector.start(Duration::from_secs(1), |items: Vec<String>| async move {
//!     println!("{} alerts", items.len());
//!     Ok::<_, robot_webhook::Error>(())
//! });
//!
//! collector.push("disk full".to_string());
//! collector.push("disk still full".to_string());
//!
//! handle.stop().await;
//! # }
//! ```
//!
//! ## Guarantees
//!
//! - Items in one flush arrive in push order, exactly once.
//! - Empty windows produce no flush.
//! - Flushes of the same collector never overlap, even with several loops started;
//!   a slow handler delays the next tick.
//! - A failed or panicking flush is reported and its items are dropped.

mod collector;

pub use collector::{
    normalize_interval, BatchCollector, CollectorHandle, FlushHandler, DEFAULT_FLUSH_INTERVAL,
};
