//! Ingestion session: fast path (precomputed summary) with streaming fallback.
//!
//! ```text
//! Idle -> FastPathAttempt -> Done
//!                        \-> (miss) StreamingFallback -> Done | Failed
//! ```
//!
//! A session owns its `AggregateStore`; observers only ever receive
//! materialized snapshots. Every callback is gated on the cancel flag.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryIter};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::AggregateStore;
use crate::domain::{IngestConfig, PeriodAggregate};

pub mod source;
pub mod state;
pub mod stream;
pub mod throttle;

pub use state::IngestState;
pub use throttle::{Clock, SystemClock, Throttle};

/// Why an input could not be loaded.
///
/// For the summary artifact these are logged and swallowed; for the raw CSV
/// they end the session with `IngestEvent::Failed`.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: reqwest::StatusCode },

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid summary JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("summary contains no usable rows")]
    EmptySummary,
}

/// Receives the outcome of an ingestion session.
pub trait IngestObserver {
    /// A fresh, ascending series. Each call supersedes the previous one.
    fn on_snapshot(&mut self, series: Vec<PeriodAggregate>);
    /// Ingestion finished; the last snapshot is final.
    fn on_done(&mut self);
    /// The raw source could not be loaded. No `on_done` follows.
    fn on_error(&mut self, err: IngestError);
}

/// Events delivered by a background session (`spawn_ingest`).
#[derive(Debug)]
pub enum IngestEvent {
    Snapshot(Vec<PeriodAggregate>),
    Done,
    Failed(IngestError),
}

/// Cooperative cancellation flag shared between a session and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a session ended (for logging and tests; observers see events instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    FastPath { periods: usize },
    Streamed { periods: usize, rows: usize, chunks: usize },
    Failed,
    Cancelled,
}

// Drops every callback once the session is cancelled.
struct Gated<'a, O: IngestObserver + ?Sized> {
    cancel: &'a CancelHandle,
    inner: &'a mut O,
}

impl<O: IngestObserver + ?Sized> Gated<'_, O> {
    fn snapshot(&mut self, store: &AggregateStore) {
        if !self.cancel.is_cancelled() {
            self.inner.on_snapshot(store.materialize());
        }
    }

    fn done(&mut self) {
        if !self.cancel.is_cancelled() {
            self.inner.on_done();
        }
    }

    fn error(&mut self, err: IngestError) {
        if !self.cancel.is_cancelled() {
            self.inner.on_error(err);
        }
    }
}

/// Run one ingestion session to completion on the current thread.
pub fn run_ingest<O>(config: &IngestConfig, clock: &dyn Clock, cancel: &CancelHandle, observer: &mut O) -> IngestOutcome
where
    O: IngestObserver + ?Sized,
{
    let mut out = Gated { cancel, inner: observer };

    if let Some(location) = &config.summary {
        match try_fast_path(location) {
            Ok(store) => {
                info!(source = %location, periods = store.len(), "loaded precomputed summary");
                out.snapshot(&store);
                out.done();
                return finish(cancel, IngestOutcome::FastPath { periods: store.len() });
            }
            Err(err) => {
                debug!(source = %location, error = %err, "summary unavailable; streaming raw CSV");
            }
        }
    }

    if cancel.is_cancelled() {
        return IngestOutcome::Cancelled;
    }

    let reader = match source::open(&config.csv) {
        Ok(r) => r,
        Err(err) => {
            warn!(source = %config.csv, error = %err, "failed to open raw CSV");
            out.error(err);
            return finish(cancel, IngestOutcome::Failed);
        }
    };

    let mut store = AggregateStore::new();
    let mut throttle = Throttle::new(config.throttle);

    let streamed = stream::for_each_chunk(reader, config.chunk_bytes, |rows| {
        store.ingest_records(&rows);
        if cancel.is_cancelled() {
            return ControlFlow::Break(());
        }
        if throttle.ready(clock, false) {
            out.snapshot(&store);
        }
        ControlFlow::Continue(())
    });

    match streamed {
        Ok(stats) if !stats.stopped => {
            // The final snapshot ignores the throttle window.
            throttle.ready(clock, true);
            out.snapshot(&store);
            out.done();
            info!(source = %config.csv, periods = store.len(), rows = stats.rows, "streamed raw CSV");
            finish(
                cancel,
                IngestOutcome::Streamed {
                    periods: store.len(),
                    rows: stats.rows,
                    chunks: stats.chunks,
                },
            )
        }
        Ok(_) => IngestOutcome::Cancelled,
        Err(err) => {
            warn!(source = %config.csv, error = %err, "raw CSV stream failed");
            out.error(err);
            finish(cancel, IngestOutcome::Failed)
        }
    }
}

fn finish(cancel: &CancelHandle, outcome: IngestOutcome) -> IngestOutcome {
    if cancel.is_cancelled() { IngestOutcome::Cancelled } else { outcome }
}

fn try_fast_path(location: &crate::domain::SourceLocation) -> Result<AggregateStore, IngestError> {
    let records = source::load_summary(location)?;
    let mut store = AggregateStore::new();
    store.ingest_records(&records);
    if store.is_empty() {
        return Err(IngestError::EmptySummary);
    }
    Ok(store)
}

struct ChannelObserver {
    tx: Sender<IngestEvent>,
}

impl IngestObserver for ChannelObserver {
    // Send failures mean the receiver is gone; nothing left to notify.
    fn on_snapshot(&mut self, series: Vec<PeriodAggregate>) {
        let _ = self.tx.send(IngestEvent::Snapshot(series));
    }

    fn on_done(&mut self) {
        let _ = self.tx.send(IngestEvent::Done);
    }

    fn on_error(&mut self, err: IngestError) {
        let _ = self.tx.send(IngestEvent::Failed(err));
    }
}

/// A session running on a background thread.
///
/// Dropping the handle cancels the session without waiting for it.
pub struct IngestHandle {
    events: Receiver<IngestEvent>,
    cancel: CancelHandle,
    worker: Option<JoinHandle<IngestOutcome>>,
}

impl IngestHandle {
    /// Drain events that have arrived so far without blocking.
    pub fn try_events(&self) -> TryIter<'_, IngestEvent> {
        self.events.try_iter()
    }

    /// Block until the next event, or `None` once the session has ended.
    pub fn recv(&self) -> Option<IngestEvent> {
        self.events.recv().ok()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the worker thread and return its outcome.
    pub fn join(mut self) -> Option<IngestOutcome> {
        self.worker.take()?.join().ok()
    }
}

impl Drop for IngestHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start an ingestion session on a dedicated thread using the system clock.
pub fn spawn_ingest(config: IngestConfig) -> IngestHandle {
    spawn_ingest_with_clock(config, Arc::new(SystemClock))
}

pub fn spawn_ingest_with_clock(config: IngestConfig, clock: Arc<dyn Clock>) -> IngestHandle {
    let (tx, rx) = mpsc::channel();
    let cancel = CancelHandle::new();
    let worker_cancel = cancel.clone();

    let worker = thread::Builder::new()
        .name("pulse-ingest".to_string())
        .spawn(move || {
            let mut observer = ChannelObserver { tx };
            run_ingest(&config, clock.as_ref(), &worker_cancel, &mut observer)
        });

    let worker = match worker {
        Ok(handle) => Some(handle),
        Err(err) => {
            // The sender moved into the failed closure is dropped, so the
            // receiver reports disconnection instead of hanging.
            warn!(error = %err, "failed to spawn ingest thread");
            None
        }
    };

    IngestHandle {
        events: rx,
        cancel,
        worker,
    }
}
