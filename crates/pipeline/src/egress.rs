//! Ordered egress queue to the transport
//!
//! A single delivery point for all client-facing messages. Message order is
//! the order of `send` calls; interrupt handling may drop undelivered audio
//! chunks while preserving everything else.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use voice_loop_core::EgressMessage;

/// Cloneable handle to the session's egress queue.
///
/// The engine side calls `send`/`try_send`; the transport side calls `recv`.
#[derive(Clone)]
pub struct Egress {
    inner: Arc<Inner>,
}

struct Inner {
    queue: Mutex<VecDeque<EgressMessage>>,
    capacity: usize,
    closed: AtomicBool,
    readable: Notify,
    writable: Notify,
}

impl Egress {
    /// Create a queue holding at most `capacity` undelivered messages
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::new()),
                capacity,
                closed: AtomicBool::new(false),
                readable: Notify::new(),
                writable: Notify::new(),
            }),
        }
    }

    fn try_push(&self, message: EgressMessage) -> Result<(), EgressMessage> {
        let mut queue = self.inner.queue.lock();
        if queue.len() < self.inner.capacity {
            tracing::trace!(kind = message.kind(), queued = queue.len(), "egress message");
            queue.push_back(message);
            drop(queue);
            self.inner.readable.notify_one();
            Ok(())
        } else {
            Err(message)
        }
    }

    /// Append a message, waiting for space if the queue is full.
    ///
    /// Messages sent after `close` are discarded.
    pub async fn send(&self, message: EgressMessage) {
        let mut pending = message;
        loop {
            if self.inner.closed.load(Ordering::Acquire) {
                return;
            }
            let writable = self.inner.writable.notified();
            match self.try_push(pending) {
                Ok(()) => return,
                Err(back) => pending = back,
            }
            writable.await;
        }
    }

    /// Append a message if there is space; returns false when full or closed
    pub fn try_send(&self, message: EgressMessage) -> bool {
        if self.inner.closed.load(Ordering::Acquire) {
            return false;
        }
        self.try_push(message).is_ok()
    }

    /// Receive the next message in order; `None` once closed and drained
    pub async fn recv(&self) -> Option<EgressMessage> {
        loop {
            let readable = self.inner.readable.notified();
            if let Some(message) = self.inner.queue.lock().pop_front() {
                self.inner.writable.notify_one();
                return Some(message);
            }
            if self.inner.closed.load(Ordering::Acquire) {
                return None;
            }
            readable.await;
        }
    }

    /// Drop undelivered audio chunks, keeping every other message in place.
    ///
    /// Returns the number of chunks removed.
    pub fn clear_audio(&self) -> usize {
        let removed = {
            let mut queue = self.inner.queue.lock();
            let before = queue.len();
            queue.retain(|m| !m.is_audio());
            before - queue.len()
        };
        if removed > 0 {
            self.inner.writable.notify_one();
        }
        removed
    }

    /// Close the queue; pending messages remain receivable
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.readable.notify_waiters();
        self.inner.writable.notify_waiters();
    }

    /// Number of undelivered messages
    pub fn len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Is the queue empty?
    pub fn is_empty(&self) -> bool {
        self.inner.queue.lock().is_empty()
    }
}
