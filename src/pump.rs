//! Async message pump feeding an [`EventRouter`] from an mpsc queue.
//!
//! The transport (WebSocket client, test harness, replay file) pushes raw
//! messages into a [`PumpSender`]; [`run`] drains the queue and dispatches each
//! message in arrival order. Failures are logged and counted, never fatal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    constants::DEFAULT_PUMP_QUEUE_SIZE,
    error::AriError,
    payload::RawMessage,
    router::EventRouter,
};

/// Producer side of the pump queue.
///
/// Cloneable; all clones share the dropped-message counter.
#[derive(Debug, Clone)]
pub struct PumpSender {
    tx: mpsc::Sender<RawMessage>,
    dropped: Arc<AtomicU64>,
}

impl PumpSender {
    /// Queue a message, waiting for capacity.
    ///
    /// Returns `false` once the pump has stopped.
    pub async fn send(&self, raw: impl Into<RawMessage>) -> bool {
        self.tx
            .send(raw.into())
            .await
            .is_ok()
    }

    /// Queue a message without waiting.
    ///
    /// When the queue is full the message is dropped and counted. Returns
    /// `false` only once the pump has stopped.
    pub fn try_send(&self, raw: impl Into<RawMessage>) -> bool {
        match self
            .tx
            .try_send(raw.into())
        {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped
                    .fetch_add(1, Ordering::Relaxed);
                warn!("[PUMP] Queue full, dropping message");
                true
            }
        }
    }

    /// Messages dropped by [`PumpSender::try_send`] because the queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
            .load(Ordering::Relaxed)
    }

    /// Whether the pump has stopped receiving.
    pub fn is_closed(&self) -> bool {
        self.tx
            .is_closed()
    }
}

/// Create a pump queue holding at most `capacity` messages.
pub fn channel(capacity: usize) -> (PumpSender, mpsc::Receiver<RawMessage>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        PumpSender {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

/// [`channel`] sized by [`DEFAULT_PUMP_QUEUE_SIZE`].
pub fn default_channel() -> (PumpSender, mpsc::Receiver<RawMessage>) {
    channel(DEFAULT_PUMP_QUEUE_SIZE)
}

/// Counters reported when the pump stops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PumpStats {
    /// Messages taken off the queue.
    pub received: u64,
    /// Messages dispatched with every handler succeeding.
    pub dispatched: u64,
    /// Messages dropped before any handler ran: undecodable JSON, non-object
    /// roots, malformed payloads.
    pub projection_failures: u64,
    /// Messages rejected by [`UnknownEventPolicy::Reject`](crate::UnknownEventPolicy::Reject).
    pub rejected_unknown: u64,
    /// Individual handler failures across all messages.
    pub handler_failures: u64,
    /// The loop itself panicked rather than ending with the queue closing.
    /// Handler panics never set this; they count as handler failures.
    pub panicked: bool,
}

/// Drain `rx` into `router` until every sender is dropped.
pub async fn run(router: Arc<EventRouter>, mut rx: mpsc::Receiver<RawMessage>) -> PumpStats {
    let mut stats = PumpStats::default();
    info!("[PUMP] Started");
    let result = std::panic::AssertUnwindSafe(run_inner(&router, &mut rx, &mut stats));
    if futures_util::FutureExt::catch_unwind(result)
        .await
        .is_err()
    {
        error!("[PUMP] Dispatch loop panicked");
        stats.panicked = true;
    }
    info!(
        "[PUMP] Stopped after {} message(s): {} dispatched, {} dropped, {} rejected, {} handler failure(s)",
        stats.received,
        stats.dispatched,
        stats.projection_failures,
        stats.rejected_unknown,
        stats.handler_failures
    );
    stats
}

/// Spawn [`run`] on the current tokio runtime.
pub fn spawn(router: Arc<EventRouter>, rx: mpsc::Receiver<RawMessage>) -> JoinHandle<PumpStats> {
    tokio::spawn(run(router, rx))
}

async fn run_inner(
    router: &EventRouter,
    rx: &mut mpsc::Receiver<RawMessage>,
    stats: &mut PumpStats,
) {
    while let Some(raw) = rx
        .recv()
        .await
    {
        stats.received += 1;
        match router.dispatch(raw) {
            Ok(report) => {
                debug!(
                    "[PUMP] {} delivered to {} handler(s)",
                    report.event_type, report.handlers_invoked
                );
                stats.dispatched += 1;
            }
            Err(AriError::HandlerExecution(failures)) => {
                stats.handler_failures += failures.len() as u64;
            }
            Err(AriError::UnknownEventType(_)) => {
                stats.rejected_unknown += 1;
            }
            Err(_) => {
                stats.projection_failures += 1;
            }
        }
    }
}
