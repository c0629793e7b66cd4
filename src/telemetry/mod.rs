//! Delivery telemetry.
//!
//! A running collector never surfaces errors to producers. Instead every flush
//! outcome is turned into a [`DeliveryEvent`] and handed to an injected
//! [`DeliverySink`]. The default sink writes `tracing` records; tests swap in
//! [`InMemoryDeliverySink`] to assert on outcomes without capturing logs.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`DeliveryEvent`] | Outcome of one flush (delivered or failed) |
//! | [`DeliverySink`] | Trait for event destinations |
//! | [`NoopDeliverySink`] | Discards everything |
//! | [`TracingDeliverySink`] | Logs through `tracing` (default) |
//! | [`InMemoryDeliverySink`] | Bounded in-memory buffer for tests |
//! | [`CompositeDeliverySink`] | Fans out to several sinks |

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

fn timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// A batch reached the flush handler and the handler returned `Ok`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushedEvent {
    pub channel: String,
    pub count: usize,
    pub timestamp: f64,
}

impl FlushedEvent {
    pub fn new(channel: impl Into<String>, count: usize) -> Self {
        Self {
            channel: channel.into(),
            count,
            timestamp: timestamp(),
        }
    }
}

/// A batch was dropped because the flush handler failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedEvent {
    pub channel: String,
    pub count: usize,
    pub error: String,
    pub timestamp: f64,
}

impl FailedEvent {
    pub fn new(channel: impl Into<String>, count: usize, error: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            count,
            error: error.into(),
            timestamp: timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryEvent {
    Flushed(FlushedEvent),
    Failed(FailedEvent),
}

impl DeliveryEvent {
    pub fn channel(&self) -> &str {
        match self {
            DeliveryEvent::Flushed(e) => &e.channel,
            DeliveryEvent::Failed(e) => &e.channel,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            DeliveryEvent::Flushed(e) => e.count,
            DeliveryEvent::Failed(e) => e.count,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DeliveryEvent::Failed(_))
    }
}

#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn report(&self, event: DeliveryEvent) -> Result<()>;
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Discards every event.
pub struct NoopDeliverySink;

#[async_trait]
impl DeliverySink for NoopDeliverySink {
    async fn report(&self, _event: DeliveryEvent) -> Result<()> {
        Ok(())
    }
}

/// Writes events as `tracing` records: successes at debug, failures at warn.
#[derive(Debug, Default, Clone)]
pub struct TracingDeliverySink;

#[async_trait]
impl DeliverySink for TracingDeliverySink {
    async fn report(&self, event: DeliveryEvent) -> Result<()> {
        match &event {
            DeliveryEvent::Flushed(e) => {
                tracing::debug!(channel = %e.channel, count = e.count, "batch delivered");
            }
            DeliveryEvent::Failed(e) => {
                tracing::warn!(
                    channel = %e.channel,
                    count = e.count,
                    error = %e.error,
                    "batch delivery failed, items dropped"
                );
            }
        }
        Ok(())
    }
}

pub fn tracing_sink() -> Arc<dyn DeliverySink> {
    Arc::new(TracingDeliverySink)
}

/// In-memory sink for testing.
pub struct InMemoryDeliverySink {
    events: Arc<RwLock<Vec<DeliveryEvent>>>,
    max_events: usize,
}

impl InMemoryDeliverySink {
    pub fn new(max: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            max_events: max,
        }
    }
    pub fn get_events(&self) -> Vec<DeliveryEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
    pub fn failures(&self) -> Vec<FailedEvent> {
        self.get_events()
            .into_iter()
            .filter_map(|e| match e {
                DeliveryEvent::Failed(f) => Some(f),
                DeliveryEvent::Flushed(_) => None,
            })
            .collect()
    }
    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DeliverySink for InMemoryDeliverySink {
    async fn report(&self, event: DeliveryEvent) -> Result<()> {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        events.push(event);
        if events.len() > self.max_events {
            events.remove(0);
        }
        Ok(())
    }
}

/// Composite sink for multiple destinations.
pub struct CompositeDeliverySink {
    sinks: Vec<Arc<dyn DeliverySink>>,
}

impl CompositeDeliverySink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }
    pub fn add_sink(mut self, sink: Arc<dyn DeliverySink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Default for CompositeDeliverySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliverySink for CompositeDeliverySink {
    async fn report(&self, event: DeliveryEvent) -> Result<()> {
        let reports = self.sinks.iter().map(|s| s.report(event.clone()));
        for res in futures::future::join_all(reports).await {
            if let Err(e) = res {
                tracing::debug!(error = %e, "delivery sink rejected event");
            }
        }
        Ok(())
    }
    async fn close(&self) -> Result<()> {
        for s in &self.sinks {
            if let Err(e) = s.close().await {
                tracing::debug!(error = %e, "delivery sink failed to close");
            }
        }
        Ok(())
    }
}
