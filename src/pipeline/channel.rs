//! Single-slot handoff between pipeline stages.
//!
//! [`BoundedChannel`] wraps a capacity-1 `crossbeam_channel` together with a
//! shared `closed` flag.  Both ends live in the same value so a stage can be
//! given a cheap clone and the owning [`Pipeline`](super::Pipeline) can still
//! drain and close the channel from outside.
//!
//! Every blocking operation takes a timeout; nothing here waits forever.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use welch_noise::pipeline::BoundedChannel;
//!
//! let ch = BoundedChannel::new();
//! ch.offer(1u32, Duration::from_millis(10)).unwrap();
//! assert!(ch.offer(2u32, Duration::from_millis(10)).is_err()); // slot taken
//! assert_eq!(ch.poll(Duration::from_millis(10)).unwrap(), 1);
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use crossbeam_channel::{
    bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError,
};
use thiserror::Error;

// ---------------------------------------------------------------------------
// HandoffError
// ---------------------------------------------------------------------------

/// Why an offer or poll did not move an item.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum HandoffError {
    /// The slot stayed full (offer) or empty (poll) for the whole timeout.
    #[error("handoff timed out")]
    Timeout,

    /// The channel was closed by its owner.
    #[error("channel closed")]
    Closed,

    /// The other end of the channel no longer exists.
    #[error("channel disconnected")]
    Disconnected,
}

// ---------------------------------------------------------------------------
// BoundedChannel
// ---------------------------------------------------------------------------

/// Capacity-1, FIFO, timeout-bounded handoff.
///
/// Cloning yields another handle to the same slot.
pub struct BoundedChannel<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    closed: Arc<AtomicBool>,
}

impl<T> Clone for BoundedChannel<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<T> std::fmt::Debug for BoundedChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedChannel")
            .field("pending", &self.rx.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> Default for BoundedChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BoundedChannel<T> {
    /// Create an open, empty channel.
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self {
            tx,
            rx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Hand `item` over, waiting at most `timeout` for the slot to free up.
    ///
    /// On failure the item is dropped.
    pub fn offer(&self, item: T, timeout: Duration) -> Result<(), HandoffError> {
        if self.is_closed() {
            return Err(HandoffError::Closed);
        }
        match self.tx.send_timeout(item, timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(HandoffError::Timeout),
            Err(SendTimeoutError::Disconnected(_)) => Err(HandoffError::Disconnected),
        }
    }

    /// Take the pending item, waiting at most `timeout` for one to arrive.
    pub fn poll(&self, timeout: Duration) -> Result<T, HandoffError> {
        if self.is_closed() {
            return Err(HandoffError::Closed);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Ok(item),
            Err(RecvTimeoutError::Timeout) => Err(HandoffError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(HandoffError::Disconnected),
        }
    }

    /// Take the pending item without waiting.
    pub fn try_take(&self) -> Option<T> {
        if self.is_closed() {
            return None;
        }
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// `true` when an item is waiting in the slot.
    pub fn has_pending(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Discard any pending item. Returns how many were dropped.
    pub fn drain(&self) -> usize {
        self.rx.try_iter().count()
    }

    /// Close the channel: further offers and polls fail with
    /// [`HandoffError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Drain and reopen for a fresh run.
    pub fn reset(&self) {
        self.drain();
        self.closed.store(false, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    const SHORT: Duration = Duration::from_millis(20);

    #[test]
    fn offer_then_poll_moves_item() {
        let ch = BoundedChannel::new();
        ch.offer(vec![1.0, 2.0], SHORT).unwrap();
        assert!(ch.has_pending());
        assert_eq!(ch.poll(SHORT).unwrap(), vec![1.0, 2.0]);
        assert!(!ch.has_pending());
    }

    #[test]
    fn second_offer_times_out_while_slot_full() {
        let ch = BoundedChannel::new();
        ch.offer(1, SHORT).unwrap();

        let started = Instant::now();
        assert_eq!(ch.offer(2, SHORT), Err(HandoffError::Timeout));
        assert!(started.elapsed() >= SHORT);

        // The first item is still there, the second was dropped.
        assert_eq!(ch.poll(SHORT).unwrap(), 1);
        assert_eq!(ch.poll(SHORT), Err(HandoffError::Timeout));
    }

    #[test]
    fn poll_on_empty_times_out() {
        let ch: BoundedChannel<u8> = BoundedChannel::new();
        assert_eq!(ch.poll(SHORT), Err(HandoffError::Timeout));
        assert!(ch.try_take().is_none());
    }

    #[test]
    fn items_cross_threads_in_order() {
        let ch = BoundedChannel::new();
        let producer = {
            let ch = ch.clone();
            thread::spawn(move || {
                for i in 0..5 {
                    ch.offer(i, Duration::from_secs(1)).unwrap();
                }
            })
        };

        let got: Vec<i32> = (0..5).map(|_| ch.poll(Duration::from_secs(1)).unwrap()).collect();
        producer.join().unwrap();
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn close_rejects_offer_and_poll() {
        let ch = BoundedChannel::new();
        ch.offer(7, SHORT).unwrap();
        ch.close();

        assert!(ch.is_closed());
        assert_eq!(ch.offer(8, SHORT), Err(HandoffError::Closed));
        assert_eq!(ch.poll(SHORT), Err(HandoffError::Closed));
        assert!(ch.try_take().is_none());
    }

    #[test]
    fn reset_drains_stale_item_and_reopens() {
        let ch = BoundedChannel::new();
        ch.offer(1, SHORT).unwrap();
        ch.close();
        ch.reset();

        assert!(!ch.is_closed());
        assert!(!ch.has_pending());
        ch.offer(2, SHORT).unwrap();
        assert_eq!(ch.try_take(), Some(2));
    }

    #[test]
    fn drain_reports_dropped_count() {
        let ch = BoundedChannel::new();
        assert_eq!(ch.drain(), 0);
        ch.offer('x', SHORT).unwrap();
        assert_eq!(ch.drain(), 1);
    }
}
