// camfan-queue/src/lib.rs
// ============================================================
// Bounded, order-preserving, lossy hand-off queue for camfan
// One producer publishes, one consumer takes. When the queue is
// full the oldest entry is evicted so the producer never stalls.
// ------------------------------------------------------------
// Public API:
//   * LatestQueue::publish()       – insert newest, evict oldest
//   * LatestQueue::take_blocking() – wait for the oldest entry
//   * LatestQueue::try_take()      – oldest entry or Empty, never waits
//   * LatestQueue::close()         – terminal sentinel for takers
// ============================================================

//! camfan – latest-results queue
//!
//! [`LatestQueue`] decouples a producer's publish rate from the consumer's
//! read rate. It wraps a `crossbeam_channel::bounded(capacity)` pair and
//! keeps its own receiver handle, so a publish into a full channel can
//! discard the single oldest item and retry instead of blocking.
//!
//! Closing the queue drops the sender. Items already retained are still
//! handed out; once the channel is disconnected *and* drained, takers get
//! [`Closed`] instead of waiting forever.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,
}

/// The queue was closed and every retained item has been taken.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("queue closed")]
pub struct Closed;

/// Why a non-blocking (or timed) take returned no item.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryTakeError {
    #[error("queue empty")]
    Empty,
    #[error("queue closed")]
    Closed,
}

impl From<Closed> for TryTakeError {
    fn from(_: Closed) -> Self {
        TryTakeError::Closed
    }
}

impl From<TryRecvError> for TryTakeError {
    fn from(err: TryRecvError) -> Self {
        match err {
            TryRecvError::Empty => TryTakeError::Empty,
            TryRecvError::Disconnected => TryTakeError::Closed,
        }
    }
}

impl From<RecvTimeoutError> for TryTakeError {
    fn from(err: RecvTimeoutError) -> Self {
        match err {
            RecvTimeoutError::Timeout => TryTakeError::Empty,
            RecvTimeoutError::Disconnected => TryTakeError::Closed,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;

/// Fixed-capacity FIFO with drop-oldest-on-overflow semantics.
pub struct LatestQueue<T> {
    // `None` once closed. Held across a whole publish so evict-and-retry
    // is never interleaved with another publish.
    tx: Mutex<Option<Sender<T>>>,
    rx: Receiver<T>,
    capacity: usize,
    dropped: AtomicU64,
}

impl<T> LatestQueue<T> {
    /// Create an empty queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        let (tx, rx) = bounded(capacity);
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            rx,
            capacity,
            dropped: AtomicU64::new(0),
        })
    }

    fn sender(&self) -> MutexGuard<'_, Option<Sender<T>>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `item` as the newest entry, returning the evicted oldest entry
    /// when the queue was already full. Never blocks.
    ///
    /// A closed queue accepts nothing; the item is handed straight back.
    pub fn publish(&self, item: T) -> Option<T> {
        let guard = self.sender();
        let Some(tx) = guard.as_ref() else {
            return Some(item);
        };

        let mut evicted = None;
        let mut item = item;
        loop {
            match tx.try_send(item) {
                Ok(()) => return evicted,
                Err(TrySendError::Full(back)) => {
                    item = back;
                    // the consumer may have emptied it in the meantime
                    if let Ok(oldest) = self.rx.try_recv() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        evicted = Some(oldest);
                    }
                }
                // unreachable while `self.rx` is alive
                Err(TrySendError::Disconnected(back)) => return Some(back),
            }
        }
    }

    /// Remove and return the oldest entry, waiting while the queue is empty.
    ///
    /// Returns [`Closed`] only when the queue has been closed and drained.
    pub fn take_blocking(&self) -> std::result::Result<T, Closed> {
        self.rx.recv().map_err(|_| Closed)
    }

    /// Remove and return the oldest entry without waiting.
    pub fn try_take(&self) -> std::result::Result<T, TryTakeError> {
        Ok(self.rx.try_recv()?)
    }

    /// Like [`take_blocking`](Self::take_blocking) but gives up after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> std::result::Result<T, TryTakeError> {
        Ok(self.rx.recv_timeout(timeout)?)
    }

    /// Drop the sender and wake every blocked taker. Idempotent.
    pub fn close(&self) {
        self.sender().take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender().is_none()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items evicted by overflowing publishes so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T> std::fmt::Debug for LatestQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatestQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .field("dropped", &self.dropped())
            .finish()
    }
}
