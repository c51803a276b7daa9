//! Input debouncing.
//!
//! Defers a value until it has been left alone for a fixed window. Every new
//! value cancels the pending timer and starts a fresh one, so one quiet
//! period produces exactly one emission carrying the last value.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Identifies one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebounceHandle(u64);

struct ArmedTimer {
    handle: DebounceHandle,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Cancellable timer that forwards the surviving value to a channel.
pub struct Debouncer<T> {
    tx: UnboundedSender<T>,
    armed: Option<ArmedTimer>,
    next_id: u64,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(tx: UnboundedSender<T>) -> Self {
        Self {
            tx,
            armed: None,
            next_id: 0,
        }
    }

    /// Arm the timer with `value`, replacing any timer that has not fired yet.
    pub fn arm(&mut self, value: T, delay: Duration) -> DebounceHandle {
        self.cancel_all();

        self.next_id += 1;
        let handle = DebounceHandle(self.next_id);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let tx = self.tx.clone();

        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    // mark fired before the value becomes observable
                    token.cancel();
                    // receiver gone means the owner is shutting down
                    let _ = tx.send(value);
                }
            }
        });

        self.armed = Some(ArmedTimer {
            handle,
            cancel,
            task,
        });
        handle
    }

    pub fn schedule(&mut self, value: T, window: Duration) -> DebounceHandle {
        self.arm(value, window)
    }

    /// Cancel `handle` if it is still the armed timer.
    ///
    /// Returns `false` when the handle was already replaced or cancelled.
    pub fn cancel(&mut self, handle: DebounceHandle) -> bool {
        match &self.armed {
            Some(timer) if timer.handle == handle => self.cancel_all(),
            _ => false,
        }
    }

    /// Cancel whatever is armed. Returns `true` if a timer was still pending.
    pub fn cancel_all(&mut self) -> bool {
        match self.armed.take() {
            Some(timer) => {
                let pending = !timer.cancel.is_cancelled();
                timer.cancel.cancel();
                timer.task.abort();
                pending
            }
            None => false,
        }
    }

    /// Whether a timer is armed and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.armed
            .as_ref()
            .is_some_and(|timer| !timer.cancel.is_cancelled())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(timer) = self.armed.take() {
            timer.cancel.cancel();
        }
    }
}
