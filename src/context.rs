// Cancellation and deadline propagation for a single search

use std::{future::pending, time::Duration};

use thiserror::Error;
use tokio::{sync::watch, time::Instant};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    #[error("search cancelled")]
    Cancelled,

    #[error("search deadline exceeded")]
    DeadlineExceeded,
}

/// Cloneable view of a search's cancellation state, handed to every provider task.
#[derive(Debug, Clone)]
pub struct SearchContext {
    cancel: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

/// Owner side of a [`SearchContext`]; dropping it without calling `cancel` leaves
/// the context running.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl SearchContext {
    pub fn new() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                cancel: rx,
                deadline: None,
            },
            CancelHandle { tx },
        )
    }

    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        let (ctx, _handle) = Self::new();
        ctx
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn interrupted(&self) -> Option<Interrupt> {
        if *self.cancel.borrow() {
            return Some(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupt::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> Interrupt {
        let mut rx = self.cancel.clone();
        let cancelled = async move {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    // Handle dropped without cancelling: never fires.
                    pending::<()>().await;
                }
            }
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = cancelled => Interrupt::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Interrupt::DeadlineExceeded,
            },
            None => {
                cancelled.await;
                Interrupt::Cancelled
            }
        }
    }
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_wakes_waiters() {
        let (ctx, handle) = SearchContext::new();
        assert_eq!(ctx.interrupted(), None);

        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.done().await })
        };

        handle.cancel();
        assert_eq!(waiter.await.unwrap(), Interrupt::Cancelled);
        assert_eq!(ctx.interrupted(), Some(Interrupt::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires() {
        let ctx = SearchContext::background().with_timeout(Duration::from_millis(100));
        assert_eq!(ctx.done().await, Interrupt::DeadlineExceeded);
        assert_eq!(ctx.interrupted(), Some(Interrupt::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_never_fires() {
        let ctx = SearchContext::background();
        let res = tokio::time::timeout(Duration::from_secs(5), ctx.done()).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn test_shorter_timeout_wins() {
        let ctx = SearchContext::background()
            .with_timeout(Duration::from_secs(10))
            .with_timeout(Duration::from_secs(1));
        let long = SearchContext::background().with_timeout(Duration::from_secs(10));
        assert!(ctx.deadline().unwrap() < long.deadline().unwrap());
    }
}
