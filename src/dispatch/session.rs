// MIT License - Copyright (c) 2026 Peter Wright
// rumqttc session and broker health tracking

use std::time::Duration;

use gethostname::gethostname;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Transport};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::constants::{MQTT_CLIENT_ID_PREFIX, MQTT_REQUEST_CAPACITY};
use crate::error::{BridgeError, Result};
use crate::health::{ConnectionHealth, FailureOutcome};
use crate::shutdown::Shutdown;

/// What the rumqttc event loop reports about the broker connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    Connected,
    Disconnected(String),
}

/// A live rumqttc client plus the tasks that drive it.
///
/// The event loop task turns rumqttc events into [`SessionSignal`]s; the
/// tracker task folds them into a [`ConnectionHealth`] that the health
/// watchdog observes. The tracker is the only writer.
pub struct MqttSession {
    client: AsyncClient,
    health: watch::Receiver<ConnectionHealth>,
    tasks: Vec<JoinHandle<()>>,
}

impl MqttSession {
    /// Start a session with the configured broker.
    ///
    /// Fails with [`BridgeError::BrokerUnreachable`] if the broker does not
    /// accept a TCP connection at all. A connection that opens but never
    /// completes the MQTT handshake is reported later, through `shutdown`.
    pub async fn connect(config: &BridgeConfig, shutdown: Shutdown) -> Result<Self> {
        let broker = &config.broker;
        info!("Connecting to MQTT broker at {}:{}", broker.host, broker.port);
        TcpStream::connect((broker.host.as_str(), broker.port))
            .await
            .map_err(|source| BridgeError::BrokerUnreachable {
                host: broker.host.clone(),
                port: broker.port,
                source,
            })?;

        let options = mqtt_options(config, &client_id())?;
        info!(
            "mqtt_client_id: {}, mqtt host: {}, mqtt port: {}",
            options.client_id(),
            broker.host,
            broker.port
        );
        let (client, eventloop) = AsyncClient::new(options, MQTT_REQUEST_CAPACITY);

        let (signal_tx, signal_rx) = mpsc::channel(16);
        let (health_tx, health_rx) = watch::channel(ConnectionHealth::NeverConnected);
        let tasks = vec![
            tokio::spawn(drive_event_loop(
                eventloop,
                signal_tx,
                shutdown.clone(),
                config.poll_interval,
            )),
            tokio::spawn(track_health(signal_rx, health_tx, shutdown)),
        ];

        Ok(Self {
            client,
            health: health_rx,
            tasks,
        })
    }

    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }

    /// Read-only view of broker health for the watchdog.
    pub fn health(&self) -> watch::Receiver<ConnectionHealth> {
        self.health.clone()
    }

    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            debug!("MQTT disconnect: {e}");
        }
    }
}

impl Drop for MqttSession {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// `mochadc/<pid>-<hostname>`, unique per running instance.
pub fn client_id() -> String {
    format!("{MQTT_CLIENT_ID_PREFIX}/{}-{}", std::process::id(), hostname())
}

fn hostname() -> String {
    gethostname().to_string_lossy().trim().to_string()
}

/// rumqttc options for the configured broker, credentials and TLS.
pub fn mqtt_options(config: &BridgeConfig, client_id: &str) -> Result<MqttOptions> {
    let broker = &config.broker;
    let mut options = MqttOptions::new(client_id, &broker.host, broker.port);
    options.set_keep_alive(config.mqtt_keep_alive);

    if let Some((user, pass)) = &broker.credentials {
        info!("mqtt connection with username and password.");
        options.set_credentials(user, pass);
    }

    if let Some(path) = &config.ca_file {
        let ca = std::fs::read(path).map_err(|source| BridgeError::TlsCaFile {
            path: path.display().to_string(),
            source,
        })?;
        options.set_transport(Transport::tls(ca, None, None));
    }

    Ok(options)
}

/// Fold one signal into the broker health.
///
/// A disconnect before the first successful connect means TCP came up but
/// the handshake above it failed, which points at TLS or credentials rather
/// than an outage.
pub fn apply_signal(
    health: &mut ConnectionHealth,
    signal: SessionSignal,
    now: Instant,
) -> Result<()> {
    match signal {
        SessionSignal::Connected => {
            if health.is_reconnecting() {
                info!("Reconnected to MQTT broker");
            } else {
                info!("Connected to MQTT broker");
            }
            health.record_success();
            Ok(())
        }
        SessionSignal::Disconnected(details) => match health.record_failure(now) {
            FailureOutcome::FirstAttempt => Err(BridgeError::HandshakeFailed { details }),
            FailureOutcome::Started => {
                warn!("Lost connection to MQTT broker: {details}. Reconnecting.");
                Ok(())
            }
            FailureOutcome::Continuing => {
                debug!("MQTT reconnect attempt failed: {details}");
                Ok(())
            }
        },
    }
}

async fn drive_event_loop(
    mut eventloop: EventLoop,
    signals: mpsc::Sender<SessionSignal>,
    shutdown: Shutdown,
    retry_delay: Duration,
) {
    while !shutdown.is_triggered() {
        let signal = match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => SessionSignal::Connected,
            Ok(Event::Incoming(Packet::Disconnect)) => {
                SessionSignal::Disconnected("broker sent DISCONNECT".to_string())
            }
            Ok(_) => continue,
            Err(e) => {
                // rumqttc reconnects on the next poll
                let signal = SessionSignal::Disconnected(e.to_string());
                if signals.send(signal).await.is_err() {
                    break;
                }
                tokio::time::sleep(retry_delay).await;
                continue;
            }
        };
        if signals.send(signal).await.is_err() {
            break;
        }
    }
    debug!("MQTT event loop stopped");
}

async fn track_health(
    mut signals: mpsc::Receiver<SessionSignal>,
    health: watch::Sender<ConnectionHealth>,
    shutdown: Shutdown,
) {
    while let Some(signal) = signals.recv().await {
        let mut state = *health.borrow();
        if let Err(e) = apply_signal(&mut state, signal, Instant::now()) {
            shutdown.fatal(e.to_string());
            break;
        }
        health.send_replace(state);
    }
}
