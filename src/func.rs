// MIT License - Copyright (c) 2026 Peter Wright
// Decoder for the `Func:` field of RFSEC messages

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::PayloadStyle;
use crate::constants::{REMOTE_DEVICE_TYPES, SENSOR_DEVICE_TYPES};
use crate::error::{BridgeError, Result};

/// The two device families mochad reports over RFSEC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFamily {
    /// Motion and door/window sensors (DS10A, DS12A, MS10A, SP554A)
    Sensor,
    /// Keychain and console remotes (KR10A, KR15A, SH624)
    Remote,
}

impl DeviceFamily {
    pub fn classify(device_type: &str) -> Option<Self> {
        if SENSOR_DEVICE_TYPES.contains(&device_type) {
            Some(Self::Sensor)
        } else if REMOTE_DEVICE_TYPES.contains(&device_type) {
            Some(Self::Remote)
        } else {
            None
        }
    }
}

/// Sensor delay switch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delay {
    Min,
    Max,
}

/// A command sent from a security remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityCommand {
    Arm,
    ArmHome,
    ArmAway,
    Disarm,
    Panic,
    LightsOn,
    LightsOff,
}

impl SecurityCommand {
    /// Wire label. The legacy style keeps mochad_dispatch's original short
    /// labels; the discovery style uses Home Assistant alarm states.
    pub fn label(&self, style: PayloadStyle) -> &'static str {
        match (self, style) {
            (Self::Arm, _) => "arm",
            (Self::ArmHome, PayloadStyle::Legacy) => "arm_home",
            (Self::ArmHome, PayloadStyle::Discovery) => "armed_home",
            (Self::ArmAway, PayloadStyle::Legacy) => "arm_away",
            (Self::ArmAway, PayloadStyle::Discovery) => "armed_away",
            (Self::Disarm, PayloadStyle::Legacy) => "disarm",
            (Self::Disarm, PayloadStyle::Discovery) => "disarming",
            (Self::Panic, _) => "panic",
            (Self::LightsOn, _) => "lights_on",
            (Self::LightsOff, _) => "lights_off",
        }
    }
}

/// Decoded `Func:` field of a security message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncRecord {
    pub device_type: String,
    pub event_type: Option<String>,
    pub event_state: Option<String>,
    pub delay: Option<Delay>,
    pub tamper: bool,
    pub low_battery: bool,
    pub home_away: bool,
    pub command: Option<SecurityCommand>,
}

/// Wire shape of a [`FuncRecord`]; absent fields and false flags are omitted.
#[derive(Serialize)]
struct FuncPayload<'a> {
    device_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_state: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delay: Option<Delay>,
    #[serde(skip_serializing_if = "is_false")]
    tamper: bool,
    #[serde(skip_serializing_if = "is_false")]
    low_battery: bool,
    #[serde(skip_serializing_if = "is_false")]
    home_away: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'static str>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl FuncRecord {
    fn new(device_type: &str) -> Self {
        Self {
            device_type: device_type.to_string(),
            event_type: None,
            event_state: None,
            delay: None,
            tamper: false,
            low_battery: false,
            home_away: false,
            command: None,
        }
    }

    /// Render as the JSON object published for this event.
    pub fn to_payload(&self, style: PayloadStyle) -> Map<String, Value> {
        let payload = FuncPayload {
            device_type: &self.device_type,
            event_type: self.event_type.as_deref(),
            event_state: self.event_state.as_deref(),
            delay: self.delay,
            tamper: self.tamper,
            low_battery: self.low_battery,
            home_away: self.home_away,
            command: self.command.map(|c| c.label(style)),
        };
        match serde_json::to_value(payload) {
            Ok(Value::Object(map)) => map,
            // A struct of strings and bools always serializes to an object.
            _ => Map::new(),
        }
    }
}

/// Decode a raw func string such as `Contact_alert_min_DS10A`.
///
/// The last `_`-separated token is the device type. Sensors carry an event
/// type and state before any flags; remotes go straight to flags. The
/// remaining tokens are scanned left to right with one token of lookahead,
/// and a token is never revisited once consumed.
pub fn decode(raw: &str) -> Result<FuncRecord> {
    let mut tokens: Vec<&str> = raw.split('_').collect();
    // split always yields at least one item
    let device_type = tokens.pop().unwrap_or_default();

    let family = DeviceFamily::classify(device_type).ok_or_else(|| {
        BridgeError::UnknownDeviceType {
            raw: raw.to_string(),
            device_type: device_type.to_string(),
        }
    })?;

    let mut record = FuncRecord::new(device_type);
    let mut i = match family {
        DeviceFamily::Sensor => {
            let [event_type, event_state, ..] = tokens.as_slice() else {
                return Err(BridgeError::MissingSensorFields {
                    raw: raw.to_string(),
                });
            };
            record.event_type = Some(event_type.to_lowercase());
            record.event_state = Some(event_state.to_string());
            2
        }
        DeviceFamily::Remote => 0,
    };

    while i < tokens.len() {
        let token = tokens[i];
        let next = tokens.get(i + 1).copied();
        let consumed = match (token, next) {
            ("min", _) => {
                record.delay = Some(Delay::Min);
                1
            }
            ("max", _) => {
                record.delay = Some(Delay::Max);
                1
            }
            ("tamper", _) => {
                record.tamper = true;
                1
            }
            ("low", _) => {
                record.low_battery = true;
                1
            }
            ("Home", Some("Away")) => {
                record.home_away = true;
                2
            }
            ("Arm", None) => {
                record.command = Some(SecurityCommand::Arm);
                1
            }
            ("Arm", Some("Home")) => {
                record.command = Some(SecurityCommand::ArmHome);
                2
            }
            ("Arm", Some("Away")) => {
                record.command = Some(SecurityCommand::ArmAway);
                2
            }
            ("Disarm", _) => {
                record.command = Some(SecurityCommand::Disarm);
                1
            }
            ("Panic", _) => {
                record.command = Some(SecurityCommand::Panic);
                1
            }
            ("Lights", Some("On")) => {
                record.command = Some(SecurityCommand::LightsOn);
                2
            }
            ("Lights", Some("Off")) => {
                record.command = Some(SecurityCommand::LightsOff);
                2
            }
            _ => {
                return Err(BridgeError::UnknownFuncToken {
                    raw: raw.to_string(),
                    token: token.to_string(),
                });
            }
        };
        i += consumed;
    }

    Ok(record)
}
