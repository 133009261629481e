// MIT License - Copyright (c) 2026 Peter Wright
// Protocol and timing constants

use std::time::Duration;

/// mochad listens for status clients on this TCP port.
pub const DEFAULT_CONTROLLER_PORT: u16 = 1099;

/// Default controller host.
pub const DEFAULT_CONTROLLER_HOST: &str = "127.0.0.1";

/// Broker port used when the dispatch URI carries none.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Default `prefix/id` for Home Assistant MQTT discovery.
pub const DEFAULT_MQTT_DISCOVERY: &str = "homeassistant/5A0uqYZF2_mochad_dispatch";

/// Every X10 house code.
pub const ALL_HOUSE_CODES: &str = "ABCDEFGHIJKLMNOP";

/// How long either link may stay in reconnect before the process gives up.
pub const RECONNECT_LIMIT: Duration = Duration::from_secs(60);

/// Sleep between reconnect attempts and between watchdog polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pause between a discovery announcement and the first state publish.
pub const DISCOVERY_SETTLE: Duration = Duration::from_secs(1);

/// MQTT keep-alive.
pub const MQTT_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Capacity of the rumqttc request channel.
pub const MQTT_REQUEST_CAPACITY: usize = 64;

/// Prefix of the MQTT client id; pid and hostname are appended.
pub const MQTT_CLIENT_ID_PREFIX: &str = "mochadc";

/// Root of every state topic.
pub const TOPIC_ROOT: &str = "X10";

/// Name/model/manufacturer advertised in discovery announcements.
pub const ORIGIN_NAME: &str = "mochad_dispatch";
pub const ORIGIN_URL: &str = "https://github.com/StoaferP/mochad_dispatch";

/// Fixed-offset verb markers in mochad status lines, as `(start, end, marker)`.
///
/// ```text
/// 09/22 15:39:07 Rx RFSEC Addr: 21:26:80 Func: Contact_alert_min_DS10A
/// 02/13 23:54:28 Rx RF HouseUnit: B1 Func: On
/// 02/13 23:54:28 Rx PL HouseUnit: B1
/// ```
pub const MARKER_RFSEC: (usize, usize, &str) = (15, 23, "Rx RFSEC");
/// Matches both `Rx RF` and `Tx RF`.
pub const MARKER_RF: (usize, usize, &str) = (16, 20, "x RF");
pub const MARKER_PL: (usize, usize, &str) = (15, 20, "Rx PL");

/// Motion and door/window sensors: func starts with event type and state.
pub const SENSOR_DEVICE_TYPES: [&str; 4] = ["DS10A", "DS12A", "MS10A", "SP554A"];

/// Security remotes: func is only commands and flags.
pub const REMOTE_DEVICE_TYPES: [&str; 3] = ["KR10A", "KR15A", "SH624"];
