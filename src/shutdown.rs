// MIT License - Copyright (c) 2026 Peter Wright
// Process-wide shutdown flag

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    /// SIGINT/SIGTERM; exit cleanly.
    Requested,
    /// A loop hit an unrecoverable condition; exit non-zero.
    Fatal(String),
}

/// Cooperative shutdown shared by every long-lived task.
///
/// Loops poll [`Shutdown::is_triggered`]; `main` waits on
/// [`Shutdown::triggered`] and tears the process down.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<ShutdownState>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ShutdownState::Running);
        Self { tx: Arc::new(tx) }
    }

    /// Graceful stop. Does not override an earlier fatal condition.
    pub fn request(&self) {
        let changed = self.tx.send_if_modified(|state| {
            if *state == ShutdownState::Running {
                *state = ShutdownState::Requested;
                true
            } else {
                false
            }
        });
        if changed {
            info!("Caught signal, mochad2mqtt is exiting...");
        }
    }

    /// Stop because of an unrecoverable condition. The last fatal reason wins.
    pub fn fatal(&self, reason: impl Into<String>) {
        let reason = reason.into();
        error!("{reason}");
        self.tx.send_replace(ShutdownState::Fatal(reason));
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow() != ShutdownState::Running
    }

    pub fn state(&self) -> ShutdownState {
        self.tx.borrow().clone()
    }

    /// Resolve once shutdown has been requested or forced.
    pub async fn triggered(&self) -> ShutdownState {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(|state| *state != ShutdownState::Running).await {
            Ok(state) => state.clone(),
            // The sender lives in self, so the channel cannot close here.
            Err(_) => self.state(),
        }
    }
}
