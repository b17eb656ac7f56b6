//! # Cancellation
//!
//! A provider-wide, one-way cancellation signal built on `tokio::sync::watch`.
//!
//! [`CancelSource`] is owned by the [`Provider`](crate::Provider); every in-flight
//! operation holds a [`CancelSignal`] and races its work against
//! [`CancelSignal::cancelled`]. Once tripped, the signal stays tripped: a provider
//! that received `Cancel` is shutting down and accepts no further work.

use tokio::sync::watch;

/// The sending half. Trips the signal for every subscriber at once.
#[derive(Debug)]
pub struct CancelSource {
    sender: watch::Sender<bool>,
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSource {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Trips the signal. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// A new receiving half observing this source.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

/// The receiving half, handed to operations through their context.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the source is tripped. Never resolves if the source is
    /// dropped without being tripped.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
