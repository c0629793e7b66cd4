//! Time-windowed batch collector.

use crate::telemetry::{tracing_sink, DeliveryEvent, DeliverySink, FailedEvent, FlushedEvent};
use crate::Result;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Flush cadence used when none (or zero) is given.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Zero means "unset" and falls back to [`DEFAULT_FLUSH_INTERVAL`].
pub fn normalize_interval(interval: Duration) -> Duration {
    if interval.is_zero() {
        DEFAULT_FLUSH_INTERVAL
    } else {
        interval
    }
}

/// Receives every non-empty batch, in push order.
#[async_trait]
pub trait FlushHandler<T: Send + 'static>: Send + Sync {
    async fn flush(&self, items: Vec<T>) -> Result<()>;
}

#[async_trait]
impl<T, F, Fut> FlushHandler<T> for F
where
    T: Send + 'static,
    F: Fn(Vec<T>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn flush(&self, items: Vec<T>) -> Result<()> {
        self(items).await
    }
}

/// Accumulates values and hands them over in bulk.
///
/// `push` only ever holds the internal lock long enough to append; a flush
/// swaps the whole batch out under the lock and runs the handler after
/// releasing it, so a slow handler never blocks producers. Anything pushed
/// while a flush is running lands in the next window.
///
/// Cloning is cheap and every clone shares the same pending batch, flush
/// gate and loop bookkeeping. Starting several loops on one collector is
/// allowed; their flushes still run one at a time.
pub struct BatchCollector<T> {
    channel: Arc<str>,
    items: Arc<Mutex<Vec<T>>>,
    gate: Arc<tokio::sync::Mutex<()>>,
    loops: Arc<LoopState>,
    sink: Arc<dyn DeliverySink>,
}

impl<T> Clone for BatchCollector<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            items: self.items.clone(),
            gate: self.gate.clone(),
            loops: self.loops.clone(),
            sink: self.sink.clone(),
        }
    }
}

#[derive(Default)]
struct LoopState {
    running: AtomicUsize,
    started: AtomicBool,
}

/// Counts one running loop for as long as it lives.
struct LoopGuard(Arc<LoopState>);

impl LoopGuard {
    fn enter(state: &Arc<LoopState>) -> Self {
        state.started.store(true, Ordering::SeqCst);
        state.running.fetch_add(1, Ordering::SeqCst);
        Self(state.clone())
    }
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::SeqCst);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("flush handler panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("flush handler panicked: {}", s)
    } else {
        "flush handler panicked".to_string()
    }
}

impl<T: Send + 'static> BatchCollector<T> {
    pub fn new(channel: impl Into<String>) -> Self {
        let channel: String = channel.into();
        Self {
            channel: Arc::from(channel),
            items: Arc::new(Mutex::new(Vec::new())),
            gate: Arc::new(tokio::sync::Mutex::new(())),
            loops: Arc::new(LoopState::default()),
            sink: tracing_sink(),
        }
    }

    /// Route flush outcomes to `sink` instead of the tracing log.
    pub fn with_sink(mut self, sink: Arc<dyn DeliverySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Queue `item` for the next flush.
    ///
    /// Pushing is always accepted. Once every loop has stopped nothing
    /// drains the batch again, so the items stay queued until the caller
    /// drains or restarts the collector.
    pub fn push(&self, item: T) {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.push(item);
        if !self.is_running() && self.loops.started.load(Ordering::SeqCst) {
            tracing::debug!(channel = %self.channel, pending = items.len(), "push on stopped collector");
        }
    }

    /// Whether at least one flush loop is currently running.
    pub fn is_running(&self) -> bool {
        self.loops.running.load(Ordering::SeqCst) > 0
    }

    /// Swap the pending batch for an empty one and return what was pending.
    pub fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.items.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run a single tick: drain, skip if empty, hand the batch to `handler`
    /// and report the outcome. Returns how many items were handed over.
    ///
    /// A failed or panicking handler drops its items; they are never
    /// re-queued. Concurrent calls on the same collector are serialized.
    pub async fn flush_once<H>(&self, handler: &H) -> usize
    where
        H: FlushHandler<T> + ?Sized,
    {
        let _gate = self.gate.lock().await;
        let items = self.drain();
        if items.is_empty() {
            return 0;
        }
        let count = items.len();
        let outcome = AssertUnwindSafe(handler.flush(items)).catch_unwind().await;
        let event = match outcome {
            Ok(Ok(())) => DeliveryEvent::Flushed(FlushedEvent::new(&*self.channel, count)),
            Ok(Err(e)) => DeliveryEvent::Failed(FailedEvent::new(
                &*self.channel,
                count,
                e.to_string(),
            )),
            Err(payload) => DeliveryEvent::Failed(FailedEvent::new(
                &*self.channel,
                count,
                panic_message(payload.as_ref()),
            )),
        };
        if let Err(e) = self.sink.report(event).await {
            tracing::debug!(channel = %self.channel, error = %e, "delivery sink rejected event");
        }
        count
    }

    /// Spawn the flush loop on the current tokio runtime.
    ///
    /// The first flush happens one `interval` after the call. Dropping the
    /// returned handle detaches the loop; it then runs for the lifetime of
    /// the runtime.
    pub fn start<H>(&self, interval: Duration, handler: H) -> CollectorHandle
    where
        H: FlushHandler<T> + 'static,
    {
        self.start_with_token(interval, handler, CancellationToken::new())
    }

    /// Like [`start`](Self::start), stopping when `token` is cancelled.
    pub fn start_with_token<H>(
        &self,
        interval: Duration,
        handler: H,
        token: CancellationToken,
    ) -> CollectorHandle
    where
        H: FlushHandler<T> + 'static,
    {
        let period = normalize_interval(interval);
        let collector = self.clone();
        let cancel = token.clone();
        let guard = LoopGuard::enter(&self.loops);
        let task = tokio::spawn(async move {
            let _guard = guard;
            collector.run(period, handler, cancel).await
        });
        CollectorHandle { token, task }
    }

    async fn run<H>(self, period: Duration, handler: H, cancel: CancellationToken)
    where
        H: FlushHandler<T>,
    {
        let mut ticker = interval_at(Instant::now() + period, period);
        // A slow handler pushes the next tick back instead of bursting.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!(channel = %self.channel, period_ms = period.as_millis() as u64, "collector started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.flush_once(&handler).await;
                }
            }
        }

        let remaining = self.flush_once(&handler).await;
        tracing::debug!(channel = %self.channel, final_flush = remaining, "collector stopped");
    }
}

/// Control handle for a running flush loop.
#[derive(Debug)]
pub struct CollectorHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl CollectorHandle {
    /// Token driving this loop; cancelling it is equivalent to [`stop`](Self::stop)
    /// without waiting.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for it to finish its final flush.
    ///
    /// The collector keeps accepting pushes afterwards but no longer
    /// flushes them unless another loop is running.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "collector task ended abnormally");
        }
    }
}
