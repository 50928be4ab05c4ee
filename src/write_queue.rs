use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;

/// One queued mutation awaiting serialized execution.
struct WorkItem {
    op: BoxFuture<'static, anyhow::Result<()>>,
    label: Option<String>,
    done: oneshot::Sender<anyhow::Result<()>>,
}

#[derive(Default)]
struct Inner {
    queue: VecDeque<WorkItem>,
    draining: bool,
}

/// FIFO serializer for database writes.
///
/// All mutations against one pool share one queue; the drain task awaits each
/// item fully (including its durable flush) before starting the next, so at
/// most one write is in flight per queue instance. A queue is a plain value
/// owned by whatever owns the pool — independent pools get independent
/// queues, there is no process-wide singleton.
#[derive(Clone, Default)]
pub struct WriteQueue {
    inner: Arc<Mutex<Inner>>,
    drains_started: Arc<AtomicU64>,
}

#[derive(Debug, thiserror::Error)]
pub enum WriteQueueError {
    /// The operation itself failed; the queue kept draining.
    #[error(transparent)]
    Operation(#[from] anyhow::Error),
    /// The runtime tore the drain task down before the operation reported
    /// back. The write may or may not have run.
    #[error("write queue shut down before the operation completed")]
    Closed,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `op` to the queue and return a future that settles with the
    /// operation's own outcome once it has run.
    ///
    /// The append happens synchronously in this call, so submission order is
    /// execution order regardless of when (or whether) callers poll the
    /// returned futures. A failed operation rejects only its own caller; the
    /// queue moves on to the next item.
    ///
    /// Must be called from within a tokio runtime. No timeout: an operation
    /// that never settles stalls the queue (see DESIGN.md).
    pub fn enqueue<F>(
        &self,
        label: Option<&str>,
        op: F,
    ) -> impl Future<Output = Result<(), WriteQueueError>> + Send
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let start_drain = {
            // Flag check-and-set shares the queue lock, so two racing
            // enqueues cannot both spawn a drain task.
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.queue.push_back(WorkItem {
                op: op.boxed(),
                label: label.map(str::to_owned),
                done: done_tx,
            });
            if inner.draining {
                false
            } else {
                inner.draining = true;
                true
            }
        };
        if start_drain {
            self.drains_started.fetch_add(1, Ordering::Relaxed);
            let queue = self.clone();
            tokio::spawn(async move { queue.drain().await });
        }
        async move {
            match done_rx.await {
                Ok(res) => res.map_err(WriteQueueError::from),
                Err(_) => Err(WriteQueueError::Closed),
            }
        }
    }

    /// Consume the queue head-first until empty, then clear the draining
    /// flag and exit. A later enqueue starts a fresh task.
    async fn drain(&self) {
        loop {
            let item = {
                let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
                match inner.queue.pop_front() {
                    Some(item) => item,
                    None => {
                        inner.draining = false;
                        return;
                    }
                }
            };
            let label = item.label.as_deref().unwrap_or("unlabelled");
            tracing::debug!(target: "tallybook", event = "write_start", label = %label);
            let started = Instant::now();
            let result = match AssertUnwindSafe(item.op).catch_unwind().await {
                Ok(res) => res,
                Err(panic) => {
                    let msg = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".into());
                    Err(anyhow::anyhow!("write operation panicked: {msg}"))
                }
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => {
                    tracing::info!(
                        target: "tallybook",
                        event = "write_done",
                        label = %label,
                        elapsed_ms
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        target: "tallybook",
                        event = "write_failed",
                        label = %label,
                        elapsed_ms,
                        error = %e
                    );
                }
            }
            // The caller may have stopped waiting; the write still happened.
            let _ = item.done.send(result);
        }
    }

    /// Number of idle→draining transitions so far. Diagnostic only.
    pub fn drains_started(&self) -> u64 {
        self.drains_started.load(Ordering::Relaxed)
    }

    /// Whether a drain task is currently active. Diagnostic only.
    pub fn is_draining(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .draining
    }

    /// Items waiting behind the one currently executing. Diagnostic only.
    pub fn pending(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .queue
            .len()
    }
}
