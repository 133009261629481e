// MIT License - Copyright (c) 2026 Peter Wright
// MQTT broker health watchdog

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::BridgeError;
use crate::health::ConnectionHealth;
use crate::shutdown::Shutdown;

/// Ends the process when the broker has been unreachable for too long.
///
/// rumqttc keeps retrying the broker on its own and never gives up, so this
/// loop watches the health published by the session tracker and turns a
/// sustained outage into a fatal shutdown. It only ever reads the health.
pub struct HealthWatchdog {
    health: watch::Receiver<ConnectionHealth>,
    shutdown: Shutdown,
    limit: Duration,
    poll_interval: Duration,
}

impl HealthWatchdog {
    pub fn new(
        health: watch::Receiver<ConnectionHealth>,
        shutdown: Shutdown,
        limit: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            health,
            shutdown,
            limit,
            poll_interval,
        }
    }

    pub async fn run(self) {
        while !self.shutdown.is_triggered() {
            let health = *self.health.borrow();
            if health.exceeded(Instant::now(), self.limit) {
                let err = BridgeError::ReconnectTimeout {
                    peer: "MQTT broker",
                    limit: self.limit,
                };
                self.shutdown.fatal(err.to_string());
                break;
            }
            sleep(self.poll_interval).await;
        }
        debug!("MQTT watchdog stopped");
    }
}
