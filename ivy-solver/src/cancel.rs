//! Cooperative cancellation for in-flight solver tasks (spec.md §4.7).
//!
//! A task is never killed asynchronously from the outside; it notices a
//! cancellation request at its own suspension points (lease-await,
//! subprocess-await) and unwinds itself. `already_solved` and `abandoned`
//! are independent: `already_solved` means some other task already
//! settled this entity, so the scheduler skips warning about a require
//! mismatch when it writes this event's status to that task's own row;
//! `abandoned` selects whether the event itself reads as `pending` (still
//! worth retrying later) or `abandoned` (give up on this solver for this
//! entity).

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CancelSignal {
    pub already_solved: bool,
    pub abandoned: bool,
}

#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<Option<CancelSignal>>,
}

impl CancelHandle {
    pub fn new() -> (Self, CancelToken) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, CancelToken { rx })
    }

    /// Requests cancellation. Idempotent: a second call after the first
    /// is a no-op, the first signal wins.
    pub fn cancel(&self, signal: CancelSignal) {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(signal);
            true
        });
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<Option<CancelSignal>>,
}

impl CancelToken {
    /// The signal if cancellation has already been requested, without
    /// suspending.
    pub fn signal(&self) -> Option<CancelSignal> {
        *self.rx.borrow()
    }

    /// Suspends until cancellation is requested.
    pub async fn cancelled(&mut self) -> CancelSignal {
        loop {
            if let Some(signal) = *self.rx.borrow() {
                return signal;
            }
            if self.rx.changed().await.is_err() {
                return CancelSignal {
                    already_solved: false,
                    abandoned: true,
                };
            }
        }
    }
}
