// MIT License - Copyright (c) 2026 Peter Wright
// Event dispatch to MQTT

pub mod session;

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, QoS};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{BridgeConfig, DiscoveryTarget, PayloadStyle};
use crate::constants::{ORIGIN_NAME, ORIGIN_URL, TOPIC_ROOT};
use crate::error::Result;
use crate::event::{DecodedEvent, EventKind};

pub use session::{MqttSession, SessionSignal};

/// Anything that can take a decoded event off the connection worker's hands.
pub trait Dispatch: Send + Sync + 'static {
    fn publish(&self, event: DecodedEvent) -> impl Future<Output = Result<()>> + Send;
}

/// The one MQTT operation the dispatcher needs.
pub trait Publisher: Send + Sync + 'static {
    fn publish(
        &self,
        topic: String,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl Publisher for AsyncClient {
    async fn publish(&self, topic: String, qos: QoS, retain: bool, payload: Vec<u8>) -> Result<()> {
        AsyncClient::publish(self, topic, qos, retain, payload).await?;
        Ok(())
    }
}

/// Delivery policy: button presses are transient, security states are the
/// last known value and must survive broker restarts and late subscribers.
pub fn delivery(kind: EventKind) -> (QoS, bool) {
    match kind {
        EventKind::Button => (QoS::AtMostOnce, false),
        EventKind::Security => (QoS::AtLeastOnce, true),
    }
}

/// How topics are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicScheme {
    /// `X10/<controller host>/<kind>/<address>`
    Legacy { controller_host: String },
    /// `X10/<ha id>/<kind>/<address>` plus discovery config under `<prefix>`
    Discovery(DiscoveryTarget),
}

impl TopicScheme {
    pub fn from_config(config: &BridgeConfig) -> Self {
        match config.style {
            PayloadStyle::Legacy => Self::Legacy {
                controller_host: config.controller_host.clone(),
            },
            PayloadStyle::Discovery => Self::Discovery(config.discovery.clone()),
        }
    }

    pub fn state_topic(&self, kind: EventKind, address: &str) -> String {
        let namespace = match self {
            Self::Legacy { controller_host } => controller_host,
            Self::Discovery(target) => &target.ha_id,
        };
        format!("{TOPIC_ROOT}/{namespace}/{kind}/{address}")
    }
}

// Home Assistant device discovery message
#[derive(Serialize)]
struct DiscoveryConfig {
    device: DiscoveryDevice,
    origin: DiscoveryOrigin,
    cmps: BTreeMap<String, DiscoveryComponent>,
    state_topic: String,
}

#[derive(Serialize)]
struct DiscoveryDevice {
    identifiers: String,
    name: String,
    model: &'static str,
    manufacturer: &'static str,
}

#[derive(Serialize)]
struct DiscoveryOrigin {
    name: &'static str,
    url: &'static str,
}

#[derive(Serialize)]
struct DiscoveryComponent {
    p: &'static str,
    value_template: &'static str,
    unique_id: String,
}

/// Topic and JSON body announcing `address` to Home Assistant.
pub fn discovery_message(
    target: &DiscoveryTarget,
    kind: EventKind,
    address: &str,
) -> Result<(String, Vec<u8>)> {
    let dev_id = format!("{}_{address}", target.ha_id);
    let mut cmps = BTreeMap::new();
    cmps.insert(
        format!("{dev_id}_state"),
        DiscoveryComponent {
            p: "binary_sensor",
            value_template: "{{ value_json.state }}",
            unique_id: format!("{dev_id}_{kind}"),
        },
    );
    let config = DiscoveryConfig {
        device: DiscoveryDevice {
            identifiers: dev_id.clone(),
            name: dev_id,
            model: ORIGIN_NAME,
            manufacturer: ORIGIN_NAME,
        },
        origin: DiscoveryOrigin {
            name: ORIGIN_NAME,
            url: ORIGIN_URL,
        },
        cmps,
        state_topic: TopicScheme::Discovery(target.clone()).state_topic(kind, address),
    };
    let topic = format!("{}/device/{}/{address}/config", target.prefix, target.ha_id);
    Ok((topic, serde_json::to_vec(&config)?))
}

/// Publishes decoded events to an MQTT broker.
///
/// In discovery mode the first event for each address is preceded by a
/// retained config announcement and the settle delay. Events for one
/// address are published in arrival order; an event that arrives while the
/// announcement is in flight waits for it. Announced addresses live for the
/// process, so every restart announces again.
pub struct MqttDispatcher<P: Publisher> {
    publisher: P,
    scheme: TopicScheme,
    discovery_settle: Duration,
    // address -> announced
    addresses: Mutex<HashMap<String, Arc<Mutex<bool>>>>,
}

impl<P: Publisher> MqttDispatcher<P> {
    pub fn new(publisher: P, scheme: TopicScheme, discovery_settle: Duration) -> Self {
        Self {
            publisher,
            scheme,
            discovery_settle,
            addresses: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    fn publisher(&self) -> &P {
        &self.publisher
    }

    async fn address_slot(&self, address: &str) -> Arc<Mutex<bool>> {
        let mut addresses = self.addresses.lock().await;
        Arc::clone(addresses.entry(address.to_string()).or_default())
    }

    async fn announce(&self, target: &DiscoveryTarget, kind: EventKind, address: &str) -> Result<()> {
        let (topic, payload) = discovery_message(target, kind, address)?;
        info!("MQTT discovery: announcing {address} on {topic}");
        self.publisher
            .publish(topic, QoS::AtLeastOnce, true, payload)
            .await?;
        tokio::time::sleep(self.discovery_settle).await;
        Ok(())
    }

    async fn publish_state(&self, event: &DecodedEvent) -> Result<()> {
        let topic = self.scheme.state_topic(event.kind, &event.address);
        let payload = serde_json::to_vec(&event.to_json())?;
        let (qos, retain) = delivery(event.kind);
        debug!("Publishing to {topic} (qos={qos:?}, retain={retain})");
        self.publisher.publish(topic, qos, retain, payload).await
    }
}

impl<P: Publisher> Dispatch for MqttDispatcher<P> {
    async fn publish(&self, event: DecodedEvent) -> Result<()> {
        let TopicScheme::Discovery(target) = &self.scheme else {
            return self.publish_state(&event).await;
        };

        // tokio's Mutex is FIFO, so later events for this address queue
        // behind the announcement and keep their order.
        let slot = self.address_slot(&event.address).await;
        let mut announced = slot.lock().await;
        if !*announced {
            self.announce(target, event.kind, &event.address).await?;
            *announced = true;
        }
        self.publish_state(&event).await
    }
}
