// MIT License - Copyright (c) 2026 Peter Wright
// Decoded controller events

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// What sort of X10 traffic an event came from. Also the third topic level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// RFSEC sensor or remote; last-known state, published retained
    Security,
    /// RF or powerline button press; transient
    Button,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Button => "button",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event ready for dispatch.
///
/// `dispatch_time` is wall-clock time at the bridge; mochad's own timestamps
/// have no year.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub address: String,
    pub kind: EventKind,
    pub payload: Map<String, Value>,
    pub dispatch_time: DateTime<Utc>,
}

impl DecodedEvent {
    pub fn new(
        address: impl Into<String>,
        kind: EventKind,
        payload: Map<String, Value>,
        dispatch_time: DateTime<Utc>,
    ) -> Self {
        Self {
            address: address.into(),
            kind,
            payload,
            dispatch_time,
        }
    }

    /// The JSON object published for this event: the payload plus a
    /// `dispatch_time` field.
    pub fn to_json(&self) -> Value {
        let mut object = self.payload.clone();
        object.insert(
            "dispatch_time".to_string(),
            Value::String(format_dispatch_time(&self.dispatch_time)),
        );
        Value::Object(object)
    }
}

/// RFC 3339 with microseconds and an explicit `+00:00` offset.
pub fn format_dispatch_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_kind_strings() {
        assert_eq!(EventKind::Security.to_string(), "security");
        assert_eq!(EventKind::Button.as_str(), "button");
    }

    #[test]
    fn test_to_json_adds_dispatch_time() {
        let time = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let mut payload = Map::new();
        payload.insert("state".to_string(), json!("ON"));
        let event = DecodedEvent::new("B1", EventKind::Button, payload, time);

        assert_eq!(
            event.to_json(),
            json!({"state": "ON", "dispatch_time": "2026-03-14T15:09:26.000000+00:00"})
        );
        // payload itself is untouched
        assert_eq!(event.payload.len(), 1);
    }
}
