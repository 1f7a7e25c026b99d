//! Cooperative cancellation for remote calls.
//!
//! A [`CancelSignal`] fires either when its [`Canceller`] is triggered or when
//! its deadline passes. Both outcomes are reported as distinct errors.

use std::future::pending;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::GatewayError;

/// Triggers every [`CancelSignal`] created from it.
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    /// Creates a canceller and its first signal.
    pub fn new() -> (Self, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        let signal = CancelSignal {
            rx: Some(rx),
            deadline: None,
        };
        (Self { tx }, signal)
    }

    /// Another signal observing this canceller.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: Some(self.tx.subscribe()),
            deadline: None,
        }
    }

    pub fn cancel(&self) {
        // Receivers may already be gone; that only means nobody is waiting.
        let _ = self.tx.send(true);
    }
}

/// Cancellation and deadline observed by one operation.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn none() -> Self {
        Self::default()
    }

    /// Adds (or tightens) a deadline `timeout` from now.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Non-blocking check; returns the error the signal would produce.
    pub fn check(&self) -> Result<(), GatewayError> {
        if self.rx.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Err(GatewayError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(GatewayError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves once the signal fires, yielding the matching error.
    pub async fn fired(&self) -> GatewayError {
        let cancelled = async {
            match &self.rx {
                Some(rx) => {
                    let mut rx = rx.clone();
                    loop {
                        if *rx.borrow_and_update() {
                            return;
                        }
                        // Dropped canceller: can no longer fire.
                        if rx.changed().await.is_err() {
                            pending::<()>().await;
                        }
                    }
                }
                None => pending::<()>().await,
            }
        };
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => pending::<()>().await,
            }
        };
        tokio::select! {
            _ = cancelled => GatewayError::Cancelled,
            _ = deadline => GatewayError::DeadlineExceeded,
        }
    }
}
