// MIT License - Copyright (c) 2026 Peter Wright
// X10 mochad to MQTT bridge
//
//! # mochad-bridge
//!
//! Reads the status stream of a [mochad](https://sourceforge.net/projects/mochad/)
//! X10 controller daemon and republishes button presses and security sensor
//! events as JSON on an MQTT broker, optionally with Home Assistant device
//! discovery.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mochad_bridge::dispatch::{MqttDispatcher, MqttSession, TopicScheme};
//! use mochad_bridge::transport::TcpLineSource;
//! use mochad_bridge::{BridgeConfig, BrokerUri, ConnectionWorker, HealthWatchdog, Shutdown};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BridgeConfig::builder()
//!         .controller_host("192.168.0.10")
//!         .broker(BrokerUri::parse("mqtt://localhost:1883")?)
//!         .build();
//!     let shutdown = Shutdown::new();
//!
//!     let session = MqttSession::connect(&config, shutdown.clone()).await?;
//!     let dispatcher = Arc::new(MqttDispatcher::new(
//!         session.client(),
//!         TopicScheme::from_config(&config),
//!         config.discovery_settle,
//!     ));
//!
//!     tokio::spawn(
//!         HealthWatchdog::new(
//!             session.health(),
//!             shutdown.clone(),
//!             config.reconnect_limit,
//!             config.poll_interval,
//!         )
//!         .run(),
//!     );
//!
//!     let source = TcpLineSource::new(config.controller_host.clone(), config.controller_port);
//!     ConnectionWorker::new(source, dispatcher, &config, shutdown).run().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod func;
pub mod health;
pub mod protocol;
pub mod shutdown;
pub mod transport;
pub mod watchdog;
pub mod worker;

// Re-exports for convenience
pub use config::{
    BridgeConfig, BridgeConfigBuilder, BrokerUri, DiscoveryTarget, HouseCodes, PayloadStyle,
};
pub use error::{BridgeError, Result};
pub use event::{DecodedEvent, EventKind};
pub use health::ConnectionHealth;
pub use shutdown::{Shutdown, ShutdownState};
pub use watchdog::HealthWatchdog;
pub use worker::{ConnectionWorker, WorkerExit};
