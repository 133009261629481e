// MIT License - Copyright (c) 2026 Peter Wright
// Connection worker: keeps mochad connected and feeds the dispatcher

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::dispatch::Dispatch;
use crate::error::BridgeError;
use crate::event::DecodedEvent;
use crate::health::{ConnectionHealth, FailureOutcome};
use crate::protocol::LineParser;
use crate::shutdown::Shutdown;
use crate::transport::LineSource;

/// Why the worker loop returned.
#[derive(Debug)]
pub enum WorkerExit {
    /// Shutdown was requested elsewhere.
    Shutdown,
    /// The controller could not be reached; the process must end.
    Fatal(BridgeError),
}

enum ReadOutcome {
    Lost,
    Shutdown,
}

/// Maintains the connection to mochad, reads its status lines and hands
/// decoded events to the dispatcher.
///
/// A first connection that fails is fatal. After a healthy connection is
/// lost the worker retries once per poll interval until the reconnect limit
/// runs out.
pub struct ConnectionWorker<S, D> {
    source: S,
    parser: LineParser,
    dispatcher: Arc<D>,
    shutdown: Shutdown,
    health: ConnectionHealth,
    reconnect_limit: Duration,
    poll_interval: Duration,
}

impl<S: LineSource, D: Dispatch> ConnectionWorker<S, D> {
    pub fn new(source: S, dispatcher: Arc<D>, config: &BridgeConfig, shutdown: Shutdown) -> Self {
        Self {
            source,
            parser: LineParser::new(config.house_codes.clone(), config.style),
            dispatcher,
            shutdown,
            health: ConnectionHealth::NeverConnected,
            reconnect_limit: config.reconnect_limit,
            poll_interval: config.poll_interval,
        }
    }

    #[cfg(test)]
    fn health(&self) -> ConnectionHealth {
        self.health
    }

    /// Run until shutdown or a fatal connection failure. A fatal exit also
    /// triggers `shutdown`.
    pub async fn run(mut self) -> WorkerExit {
        let exit = self.run_loop().await;
        self.source.close();
        if let WorkerExit::Fatal(e) = &exit {
            self.shutdown.fatal(e.to_string());
        }
        exit
    }

    async fn run_loop(&mut self) -> WorkerExit {
        while !self.shutdown.is_triggered() {
            if self.health.is_reconnecting() {
                sleep(self.poll_interval).await;
                if self.health.exceeded(Instant::now(), self.reconnect_limit) {
                    return WorkerExit::Fatal(BridgeError::ReconnectTimeout {
                        peer: "mochad",
                        limit: self.reconnect_limit,
                    });
                }
            }

            if let Err(e) = self.source.open().await {
                match self.health.record_failure(Instant::now()) {
                    FailureOutcome::FirstAttempt => return WorkerExit::Fatal(e),
                    FailureOutcome::Started => {
                        warn!("Could not connect to mochad. Retrying: {e}");
                    }
                    FailureOutcome::Continuing => {
                        debug!("Could not connect to mochad: {e}");
                    }
                }
                continue;
            }

            self.health.record_success();
            info!("Connected to mochad host: {}", self.source.peer());

            match self.read_until_lost().await {
                ReadOutcome::Shutdown => break,
                ReadOutcome::Lost => {
                    warn!("Lost connection to mochad. Retrying.");
                    self.source.close();
                    self.health.record_failure(Instant::now());
                }
            }
        }
        WorkerExit::Shutdown
    }

    async fn read_until_lost(&mut self) -> ReadOutcome {
        loop {
            let line = tokio::select! {
                line = self.source.read_line() => line,
                _ = self.shutdown.triggered() => return ReadOutcome::Shutdown,
            };
            match line {
                Ok(Some(line)) => self.handle_line(&line),
                Ok(None) => return ReadOutcome::Lost,
                Err(e) => {
                    warn!("Read from mochad failed: {e}");
                    return ReadOutcome::Lost;
                }
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        let parsed = match self.parser.parse(line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => return,
            Err(e) if e.is_malformed_input() => {
                warn!("Skipping malformed mochad message {line}: {e}");
                return;
            }
            Err(e) => {
                error!("Failed to parse mochad message {line}: {e}");
                return;
            }
        };

        let event = DecodedEvent::new(parsed.address, parsed.kind, parsed.payload, Utc::now());
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            let payload = event.to_json();
            if let Err(e) = dispatcher.publish(event).await {
                error!("Failed to dispatch mochad message {payload}: {e}");
            }
        });
    }
}
