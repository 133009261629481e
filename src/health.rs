// MIT License - Copyright (c) 2026 Peter Wright
// Connection health state shared by the mochad and MQTT links

use std::time::Duration;

use tokio::time::Instant;

/// Health of one long-lived connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionHealth {
    /// No connection has ever succeeded.
    #[default]
    NeverConnected,
    Healthy,
    /// Lost after a healthy period; retrying since the given instant.
    Reconnecting { since: Instant },
}

/// What a failure did to a [`ConnectionHealth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The very first attempt failed. Nothing has ever worked, so this is a
    /// configuration problem rather than an outage.
    FirstAttempt,
    /// A healthy link just failed; the reconnect clock started.
    Started,
    /// Already reconnecting; the clock keeps running.
    Continuing,
}

impl ConnectionHealth {
    pub fn record_success(&mut self) {
        *self = Self::Healthy;
    }

    pub fn record_failure(&mut self, now: Instant) -> FailureOutcome {
        match *self {
            Self::NeverConnected => FailureOutcome::FirstAttempt,
            Self::Healthy => {
                *self = Self::Reconnecting { since: now };
                FailureOutcome::Started
            }
            Self::Reconnecting { .. } => FailureOutcome::Continuing,
        }
    }

    pub fn is_reconnecting(&self) -> bool {
        matches!(self, Self::Reconnecting { .. })
    }

    /// How long the link has been down, if it is reconnecting.
    pub fn outage(&self, now: Instant) -> Option<Duration> {
        match self {
            Self::Reconnecting { since } => Some(now.saturating_duration_since(*since)),
            _ => None,
        }
    }

    /// Whether the link has been reconnecting for strictly longer than `limit`.
    pub fn exceeded(&self, now: Instant, limit: Duration) -> bool {
        self.outage(now).is_some_and(|outage| outage > limit)
    }
}
