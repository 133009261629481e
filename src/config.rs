// MIT License - Copyright (c) 2026 Peter Wright
// Bridge configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    ALL_HOUSE_CODES, DEFAULT_CONTROLLER_HOST, DEFAULT_CONTROLLER_PORT, DEFAULT_MQTT_DISCOVERY,
    DEFAULT_MQTT_PORT, DISCOVERY_SETTLE, MQTT_KEEP_ALIVE, POLL_INTERVAL, RECONNECT_LIMIT,
};
use crate::error::{BridgeError, Result};

/// Topic and payload convention for published events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadStyle {
    /// `X10/<controller host>/<kind>/<address>`, `{"func": "On"}` payloads,
    /// short remote command labels.
    Legacy,
    /// Home Assistant MQTT discovery: `X10/<ha id>/<kind>/<address>`,
    /// `{"state": "ON"}` payloads, one retained config message per device.
    #[default]
    Discovery,
}

/// Broker location parsed from `mqtt://host[:port][,user=U,pass=P]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerUri {
    pub host: String,
    pub port: u16,
    pub credentials: Option<(String, String)>,
}

impl BrokerUri {
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = |reason: &str| BridgeError::InvalidBrokerUri {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = uri.split(',');
        let base = segments.next().unwrap_or_default().trim();

        let (scheme, rest) = base
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        if scheme != "mqtt" {
            return Err(BridgeError::UnsupportedScheme {
                scheme: scheme.to_string(),
            });
        }

        let authority = rest.trim_end_matches('/');
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port: u16 = port.parse().map_err(|_| invalid("invalid port number"))?;
                (host, port)
            }
            None => (authority, DEFAULT_MQTT_PORT),
        };
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        let mut user = None;
        let mut pass = None;
        for segment in segments {
            match segment.trim().split_once('=') {
                Some(("user", value)) => user = Some(value.to_string()),
                Some(("pass", value)) => pass = Some(value.to_string()),
                _ => return Err(invalid("expected user=<name> or pass=<password>")),
            }
        }

        let credentials = match (user, pass) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        };

        Ok(Self {
            host: host.to_string(),
            port,
            credentials,
        })
    }
}

/// Discovery topic prefix and Home Assistant id, from `prefix/id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryTarget {
    pub prefix: String,
    pub ha_id: String,
}

impl DiscoveryTarget {
    pub fn parse(value: &str) -> Result<Self> {
        match value.split_once('/') {
            Some((prefix, ha_id))
                if !prefix.is_empty() && !ha_id.is_empty() && !ha_id.contains('/') =>
            {
                Ok(Self {
                    prefix: prefix.to_string(),
                    ha_id: ha_id.to_string(),
                })
            }
            _ => Err(BridgeError::InvalidDiscoveryTarget {
                value: value.to_string(),
            }),
        }
    }
}

impl Default for DiscoveryTarget {
    fn default() -> Self {
        Self {
            prefix: "homeassistant".to_string(),
            ha_id: DEFAULT_MQTT_DISCOVERY
                .split_once('/')
                .map(|(_, id)| id.to_string())
                .unwrap_or_default(),
        }
    }
}

/// Allow-list of X10 house code letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HouseCodes(String);

impl HouseCodes {
    pub fn parse(value: &str) -> Result<Self> {
        let upper = value.to_uppercase();
        if upper.is_empty() || !upper.chars().all(|c| ALL_HOUSE_CODES.contains(c)) {
            return Err(BridgeError::InvalidHouseCodes {
                value: value.to_string(),
            });
        }
        Ok(Self(upper))
    }

    /// Whether the house code of a `B1`-style address is allowed.
    pub fn allows(&self, house_unit: &str) -> bool {
        house_unit
            .chars()
            .next()
            .is_some_and(|hc| self.0.contains(hc))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HouseCodes {
    fn default() -> Self {
        Self(ALL_HOUSE_CODES.to_string())
    }
}

/// Everything the bridge needs, built once at startup and passed to each
/// component.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// mochad host; also names the legacy topic namespace
    pub controller_host: String,
    /// mochad status port (default: 1099)
    pub controller_port: u16,
    pub broker: BrokerUri,
    /// CA bundle; when set the broker connection uses TLS
    pub ca_file: Option<PathBuf>,
    pub house_codes: HouseCodes,
    pub style: PayloadStyle,
    pub discovery: DiscoveryTarget,
    /// How long a link may stay down before the process exits (default: 60s)
    pub reconnect_limit: Duration,
    /// Reconnect and watchdog poll interval (default: 1s)
    pub poll_interval: Duration,
    /// Delay between a discovery announcement and the first state (default: 1s)
    pub discovery_settle: Duration,
    pub mqtt_keep_alive: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            controller_host: DEFAULT_CONTROLLER_HOST.to_string(),
            controller_port: DEFAULT_CONTROLLER_PORT,
            broker: BrokerUri {
                host: "localhost".to_string(),
                port: DEFAULT_MQTT_PORT,
                credentials: None,
            },
            ca_file: None,
            house_codes: HouseCodes::default(),
            style: PayloadStyle::default(),
            discovery: DiscoveryTarget::default(),
            reconnect_limit: RECONNECT_LIMIT,
            poll_interval: POLL_INTERVAL,
            discovery_settle: DISCOVERY_SETTLE,
            mqtt_keep_alive: MQTT_KEEP_ALIVE,
        }
    }
}

impl BridgeConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }
}

/// Builder for BridgeConfig.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn controller_host(mut self, host: impl Into<String>) -> Self {
        self.config.controller_host = host.into();
        self
    }

    pub fn controller_port(mut self, port: u16) -> Self {
        self.config.controller_port = port;
        self
    }

    pub fn broker(mut self, broker: BrokerUri) -> Self {
        self.config.broker = broker;
        self
    }

    pub fn ca_file(mut self, path: Option<PathBuf>) -> Self {
        self.config.ca_file = path;
        self
    }

    pub fn house_codes(mut self, codes: HouseCodes) -> Self {
        self.config.house_codes = codes;
        self
    }

    pub fn style(mut self, style: PayloadStyle) -> Self {
        self.config.style = style;
        self
    }

    pub fn discovery(mut self, discovery: DiscoveryTarget) -> Self {
        self.config.discovery = discovery;
        self
    }

    pub fn reconnect_limit(mut self, limit: Duration) -> Self {
        self.config.reconnect_limit = limit;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn discovery_settle(mut self, settle: Duration) -> Self {
        self.config.discovery_settle = settle;
        self
    }

    pub fn mqtt_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.config.mqtt_keep_alive = keep_alive;
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_uri_default_port() {
        let uri = BrokerUri::parse("mqtt://broker.lan").unwrap();
        assert_eq!(uri.host, "broker.lan");
        assert_eq!(uri.port, 1883);
        assert_eq!(uri.credentials, None);
    }

    #[test]
    fn test_broker_uri_with_port_and_credentials() {
        let uri = BrokerUri::parse("mqtt://10.0.0.5:8883,user=bob,pass=s3cret").unwrap();
        assert_eq!(uri.host, "10.0.0.5");
        assert_eq!(uri.port, 8883);
        assert_eq!(
            uri.credentials,
            Some(("bob".to_string(), "s3cret".to_string()))
        );
    }

    #[test]
    fn test_broker_uri_credentials_any_order() {
        let uri = BrokerUri::parse("mqtt://host:1883/,pass=p,user=u").unwrap();
        assert_eq!(uri.credentials, Some(("u".to_string(), "p".to_string())));
    }

    #[test]
    fn test_broker_uri_user_without_pass_ignored() {
        let uri = BrokerUri::parse("mqtt://host,user=u").unwrap();
        assert_eq!(uri.credentials, None);
    }

    #[test]
    fn test_broker_uri_errors() {
        assert!(matches!(
            BrokerUri::parse("http://host:80"),
            Err(BridgeError::UnsupportedScheme { ref scheme }) if scheme == "http"
        ));
        assert!(matches!(
            BrokerUri::parse("host:1883"),
            Err(BridgeError::InvalidBrokerUri { .. })
        ));
        assert!(matches!(
            BrokerUri::parse("mqtt://host:notaport"),
            Err(BridgeError::InvalidBrokerUri { .. })
        ));
        assert!(matches!(
            BrokerUri::parse("mqtt://host,token=abc"),
            Err(BridgeError::InvalidBrokerUri { .. })
        ));
    }

    #[test]
    fn test_discovery_target() {
        let target = DiscoveryTarget::parse("homeassistant/5A0uqYZF2_mochad_dispatch").unwrap();
        assert_eq!(target.prefix, "homeassistant");
        assert_eq!(target.ha_id, "5A0uqYZF2_mochad_dispatch");
        assert_eq!(target, DiscoveryTarget::default());

        assert!(DiscoveryTarget::parse("homeassistant").is_err());
        assert!(DiscoveryTarget::parse("/id").is_err());
        assert!(DiscoveryTarget::parse("a/b/c").is_err());
    }

    #[test]
    fn test_house_codes() {
        let codes = HouseCodes::parse("ab").unwrap();
        assert_eq!(codes.as_str(), "AB");
        assert!(codes.allows("A1"));
        assert!(codes.allows("B16"));
        assert!(!codes.allows("C1"));
        assert!(!codes.allows(""));

        assert!(HouseCodes::parse("").is_err());
        assert!(HouseCodes::parse("AZ").is_err());
        assert!(HouseCodes::default().allows("P16"));
    }

    #[test]
    fn test_config_builder() {
        let config = BridgeConfig::builder()
            .controller_host("mochad.lan")
            .controller_port(1100)
            .style(PayloadStyle::Legacy)
            .reconnect_limit(Duration::from_secs(30))
            .build();

        assert_eq!(config.controller_host, "mochad.lan");
        assert_eq!(config.controller_port, 1100);
        assert_eq!(config.style, PayloadStyle::Legacy);
        assert_eq!(config.reconnect_limit, Duration::from_secs(30));
    }

    #[test]
    fn test_config_defaults() {
        let config = BridgeConfig::builder().build();
        assert_eq!(config.controller_port, 1099);
        assert_eq!(config.style, PayloadStyle::Discovery);
        assert_eq!(config.reconnect_limit, Duration::from_secs(60));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.discovery_settle, Duration::from_secs(1));
    }
}
