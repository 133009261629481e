// Schema validation tests for MQTT wire format
//
// Hand-written instances check the schemas themselves; library-built
// payloads check that what the bridge publishes matches them.

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use mochad_bridge::dispatch::discovery_message;
use mochad_bridge::protocol::{LineParser, state_payload};
use mochad_bridge::{DecodedEvent, DiscoveryTarget, EventKind, HouseCodes, PayloadStyle, func};

fn load_schema(name: &str) -> Value {
    let path = format!("{}/schemas/mqtt/{name}", env!("CARGO_MANIFEST_DIR"));
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read schema {path}: {e}"));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("Failed to parse schema {path}: {e}"))
}

fn build_validator(schema_name: &str) -> jsonschema::Validator {
    let schema = load_schema(schema_name);
    jsonschema::validator_for(&schema)
        .unwrap_or_else(|e| panic!("Failed to compile schema {schema_name}: {e}"))
}

fn validate(schema_name: &str, instance: &Value) {
    let validator = build_validator(schema_name);
    let errors: Vec<_> = validator.iter_errors(instance).collect();
    if !errors.is_empty() {
        let msgs: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
        panic!(
            "Schema validation failed for {schema_name}:\n{}\nInstance: {}",
            msgs.join("\n"),
            serde_json::to_string_pretty(instance).unwrap()
        );
    }
}

fn validate_fails(schema_name: &str, instance: &Value) {
    let validator = build_validator(schema_name);
    assert!(
        !validator.is_valid(instance),
        "Expected schema validation to fail for {schema_name}, but it passed.\nInstance: {}",
        serde_json::to_string_pretty(instance).unwrap()
    );
}

/// Publish-ready JSON for a payload, stamped at a fixed time.
fn published(address: &str, kind: EventKind, payload: serde_json::Map<String, Value>) -> Value {
    let time = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
    DecodedEvent::new(address, kind, payload, time).to_json()
}

// ---------------------------------------------------------------------------
// Button state (discovery style)
// ---------------------------------------------------------------------------

#[test]
fn button_state_valid() {
    validate(
        "button_state.schema.json",
        &json!({"state": "ON", "dispatch_time": "2026-03-14T15:09:26.123456+00:00"}),
    );
}

#[test]
fn button_state_lowercase_rejected() {
    validate_fails(
        "button_state.schema.json",
        &json!({"state": "on", "dispatch_time": "2026-03-14T15:09:26.123456+00:00"}),
    );
}

#[test]
fn button_state_zulu_time_rejected() {
    validate_fails(
        "button_state.schema.json",
        &json!({"state": "ON", "dispatch_time": "2026-03-14T15:09:26.123456Z"}),
    );
}

#[test]
fn button_state_missing_time() {
    validate_fails("button_state.schema.json", &json!({"state": "OFF"}));
}

#[test]
fn button_state_from_parser() {
    let mut parser = LineParser::new(HouseCodes::default(), PayloadStyle::Discovery);
    for line in [
        "02/13 23:54:28 Rx RF HouseUnit: B1 Func: On",
        "02/13 23:54:29 Rx RF HouseUnit: B1 Func: Off",
    ] {
        let parsed = parser.parse(line).unwrap().unwrap();
        validate(
            "button_state.schema.json",
            &published(&parsed.address, parsed.kind, parsed.payload),
        );
    }
}

// ---------------------------------------------------------------------------
// Button function (legacy style)
// ---------------------------------------------------------------------------

#[test]
fn button_func_valid() {
    validate(
        "button_func.schema.json",
        &json!({"func": "On", "dispatch_time": "2026-03-14T15:09:26.000000+00:00"}),
    );
}

#[test]
fn button_func_state_key_rejected() {
    validate_fails(
        "button_func.schema.json",
        &json!({"state": "ON", "dispatch_time": "2026-03-14T15:09:26.000000+00:00"}),
    );
}

#[test]
fn button_func_from_library() {
    let instance = published("A4", EventKind::Button, state_payload(PayloadStyle::Legacy, "Off"));
    assert_eq!(instance["func"], "Off");
    validate("button_func.schema.json", &instance);
}

// ---------------------------------------------------------------------------
// Security events
// ---------------------------------------------------------------------------

#[test]
fn security_sensor_valid() {
    validate(
        "security_state.schema.json",
        &json!({
            "device_type": "DS10A",
            "event_type": "contact",
            "event_state": "alert",
            "delay": "min",
            "low_battery": true,
            "dispatch_time": "2026-03-14T15:09:26.000000+00:00"
        }),
    );
}

#[test]
fn security_remote_valid() {
    validate(
        "security_state.schema.json",
        &json!({
            "device_type": "SH624",
            "command": "armed_away",
            "delay": "max",
            "dispatch_time": "2026-03-14T15:09:26.000000+00:00"
        }),
    );
}

#[test]
fn security_false_flag_rejected() {
    validate_fails(
        "security_state.schema.json",
        &json!({
            "device_type": "DS10A",
            "event_type": "contact",
            "event_state": "normal",
            "tamper": false,
            "dispatch_time": "2026-03-14T15:09:26.000000+00:00"
        }),
    );
}

#[test]
fn security_event_type_without_state_rejected() {
    validate_fails(
        "security_state.schema.json",
        &json!({
            "device_type": "MS10A",
            "event_type": "motion",
            "dispatch_time": "2026-03-14T15:09:26.000000+00:00"
        }),
    );
}

#[test]
fn security_nested_func_rejected() {
    validate_fails(
        "security_state.schema.json",
        &json!({
            "device_type": "DS10A",
            "func": {"event_type": "contact"},
            "dispatch_time": "2026-03-14T15:09:26.000000+00:00"
        }),
    );
}

#[test]
fn security_payloads_from_decoder() {
    let funcs = [
        "Contact_alert_min_DS10A",
        "Contact_normal_max_low_DS10A",
        "Contact_alert_min_tamper_DS12A",
        "Motion_alert_Home_Away_SP554A",
        "Motion_normal_low_MS10A",
        "Arm_KR10A",
        "Panic_KR15A",
        "Lights_Off_SH624",
        "Arm_Home_min_SH624",
        "Arm_Away_max_SH624",
        "Disarm_SH624",
    ];
    for style in [PayloadStyle::Legacy, PayloadStyle::Discovery] {
        for raw in funcs {
            let record = func::decode(raw).unwrap();
            let instance = published("21:26:80", EventKind::Security, record.to_payload(style));
            validate("security_state.schema.json", &instance);
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery config
// ---------------------------------------------------------------------------

#[test]
fn discovery_config_valid() {
    validate(
        "discovery_config.schema.json",
        &json!({
            "device": {
                "identifiers": "house_B1",
                "name": "house_B1",
                "model": "mochad_dispatch",
                "manufacturer": "mochad_dispatch"
            },
            "origin": {
                "name": "mochad_dispatch",
                "url": "https://github.com/StoaferP/mochad_dispatch"
            },
            "cmps": {
                "house_B1_state": {
                    "p": "binary_sensor",
                    "value_template": "{{ value_json.state }}",
                    "unique_id": "house_B1_button"
                }
            },
            "state_topic": "X10/house/button/B1"
        }),
    );
}

#[test]
fn discovery_config_missing_state_topic() {
    validate_fails(
        "discovery_config.schema.json",
        &json!({
            "device": {
                "identifiers": "house_B1",
                "name": "house_B1",
                "model": "mochad_dispatch",
                "manufacturer": "mochad_dispatch"
            },
            "origin": {
                "name": "mochad_dispatch",
                "url": "https://github.com/StoaferP/mochad_dispatch"
            },
            "cmps": {}
        }),
    );
}

#[test]
fn discovery_config_from_library() {
    let target = DiscoveryTarget::default();
    for (kind, address) in [(EventKind::Button, "B1"), (EventKind::Security, "21:26:80")] {
        let (topic, payload) = discovery_message(&target, kind, address).unwrap();
        assert_eq!(
            topic,
            format!("homeassistant/device/5A0uqYZF2_mochad_dispatch/{address}/config")
        );
        let instance: Value = serde_json::from_slice(&payload).unwrap();
        validate("discovery_config.schema.json", &instance);
    }
}
