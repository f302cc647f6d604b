//! Blocking FIFO channels for machine I/O.
//!
//! A [`Channel`] carries integer values between exactly one producer and one
//! consumer: a machine and its upstream neighbor, its downstream neighbor, or
//! an external collaborator. `take` suspends while the channel is empty and
//! `put` suspends while it is full, so a pipeline of machines alternates in
//! lock step without any external scheduler.
//!
//! A `take` against a channel that will never see another `put` blocks
//! forever. That is a wiring bug in the surrounding topology, not a runtime
//! condition this module detects; see [`fabric`](crate::fabric).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::Notify;

/// Capacity used when the caller has no specific bound in mind.
pub const DEFAULT_CAPACITY: usize = 1024;

/// A bounded, blocking, strictly FIFO channel of `i64` values.
///
/// Shared between tasks through an `Arc`; the only operations are
/// [`put`](Channel::put), [`take`](Channel::take),
/// [`drain_all`](Channel::drain_all), and the observer-side
/// [`peek`](Channel::peek)/[`subscribe`](Channel::subscribe) pair.
#[derive(Debug)]
pub struct Channel {
    inner: Mutex<Inner>,
    /// Signaled when a value arrives; a blocked `take` retries on it.
    readable: Notify,
    /// Signaled when space frees up; a blocked `put` retries on it.
    writable: Notify,
    capacity: usize,
}

#[derive(Debug)]
struct Inner {
    queue: VecDeque<i64>,
    /// Readiness observers, held weakly so a dropped [`Watcher`] falls out
    /// of the notification path instead of accumulating forever.
    watchers: Vec<Weak<Notify>>,
}

impl Channel {
    /// Creates a channel holding at most `capacity` values (minimum 1).
    pub fn new(capacity: usize) -> Arc<Channel> {
        Arc::new(Channel {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                watchers: Vec::new(),
            }),
            readable: Notify::new(),
            writable: Notify::new(),
            capacity: capacity.max(1),
        })
    }

    /// Creates a channel with [`DEFAULT_CAPACITY`].
    pub fn with_default_capacity() -> Arc<Channel> {
        Channel::new(DEFAULT_CAPACITY)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The critical sections below cannot panic, but recover anyway rather
        // than propagating poison to every later channel operation.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `value` to the tail, suspending while the channel is full.
    pub async fn put(&self, value: i64) {
        loop {
            // Register interest before inspecting the queue so a take racing
            // with us cannot slip a wakeup past the retry.
            let writable = self.writable.notified();
            {
                let mut inner = self.lock();
                if inner.queue.len() < self.capacity {
                    inner.queue.push_back(value);
                    inner.watchers.retain(|watcher| match watcher.upgrade() {
                        Some(notify) => {
                            notify.notify_one();
                            true
                        }
                        None => false,
                    });
                    self.readable.notify_one();
                    return;
                }
            }
            writable.await;
        }
    }

    /// Appends every value in order, suspending as needed.
    pub async fn put_all(&self, values: &[i64]) {
        for &value in values {
            self.put(value).await;
        }
    }

    /// Removes and returns the head, suspending while the channel is empty.
    pub async fn take(&self) -> i64 {
        loop {
            let readable = self.readable.notified();
            {
                let mut inner = self.lock();
                if let Some(value) = inner.queue.pop_front() {
                    self.writable.notify_one();
                    return value;
                }
            }
            readable.await;
        }
    }

    /// Removes and returns every currently buffered value without waiting.
    ///
    /// Used to harvest trailing output after a producer halts.
    pub fn drain_all(&self) -> Vec<i64> {
        let mut inner = self.lock();
        let drained: Vec<i64> = inner.queue.drain(..).collect();
        if !drained.is_empty() {
            self.writable.notify_waiters();
        }
        drained
    }

    /// Returns the head value without removing it.
    ///
    /// The one sanctioned way for a readiness observer to look at a value the
    /// designated consumer has not taken yet.
    pub fn peek(&self) -> Option<i64> {
        self.lock().queue.front().copied()
    }

    /// Registers a readiness observer.
    ///
    /// The returned [`Watcher`] resolves each time a value is enqueued after
    /// the call, without consuming anything from the channel.
    pub fn subscribe(&self) -> Watcher {
        let notify = Arc::new(Notify::new());
        self.lock().watchers.push(Arc::downgrade(&notify));
        Watcher { notify }
    }
}

/// Readiness signal handed out by [`Channel::subscribe`].
///
/// Notifications coalesce: several rapid `put`s may wake a waiting observer
/// only once, so observers should re-inspect state (via
/// [`Channel::peek`] or their own bookkeeping) on every wakeup.
pub struct Watcher {
    notify: Arc<Notify>,
}

impl Watcher {
    /// Suspends until a value is enqueued on the observed channel.
    pub async fn enqueued(&self) {
        self.notify.notified().await;
    }
}
