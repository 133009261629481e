// MIT License - Copyright (c) 2026 Peter Wright
// Error taxonomy for the bridge

use std::time::Duration;

/// All errors that can occur in the mochad bridge library.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not connect to {host}:{port}: {source}")]
    Connection {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection is not open")]
    NotConnected,

    #[error("Unknown device type in {raw}: {device_type}")]
    UnknownDeviceType { raw: String, device_type: String },

    #[error("Unknown func parameter in {raw}: {token}")]
    UnknownFuncToken { raw: String, token: String },

    #[error("Sensor func is missing its event type/state: {raw}")]
    MissingSensorFields { raw: String },

    #[error("Malformed line ({reason}): {line}")]
    MalformedLine { line: String, reason: &'static str },

    #[error("Invalid broker URI {uri}: {reason}")]
    InvalidBrokerUri { uri: String, reason: String },

    #[error("Unsupported URI scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    #[error("Invalid MQTT discovery setting '{value}' (expected prefix/id)")]
    InvalidDiscoveryTarget { value: String },

    #[error("Invalid house codes '{value}' (expected letters A-P)")]
    InvalidHouseCodes { value: String },

    #[error("Could not connect to MQTT broker {host}:{port}: {source}")]
    BrokerUnreachable {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not connect to MQTT broker: possibly SSL/TLS failure ({details})")]
    HandshakeFailed { details: String },

    #[error("Could not reconnect to {peer} after {}s", .limit.as_secs())]
    ReconnectTimeout { peer: &'static str, limit: Duration },

    #[error("Failed to read CA file {path}: {source}")]
    TlsCaFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to publish: {0}")]
    Publish(#[from] rumqttc::ClientError),
}

impl BridgeError {
    /// Whether this error came from a single bad input line. Such errors are
    /// logged and the line dropped; they never touch connection state.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            BridgeError::UnknownDeviceType { .. }
                | BridgeError::UnknownFuncToken { .. }
                | BridgeError::MissingSensorFields { .. }
                | BridgeError::MalformedLine { .. }
        )
    }

    /// Whether this error ends the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::BrokerUnreachable { .. }
                | BridgeError::HandshakeFailed { .. }
                | BridgeError::ReconnectTimeout { .. }
                | BridgeError::UnsupportedScheme { .. }
                | BridgeError::InvalidBrokerUri { .. }
                | BridgeError::TlsCaFile { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
