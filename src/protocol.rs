// MIT License - Copyright (c) 2026 Peter Wright
// mochad status line parser

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{HouseCodes, PayloadStyle};
use crate::constants::{MARKER_PL, MARKER_RF, MARKER_RFSEC};
use crate::error::{BridgeError, Result};
use crate::event::EventKind;
use crate::func;

/// A line that produced something to dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub address: String,
    pub kind: EventKind,
    pub payload: Map<String, Value>,
}

/// Classifies and decodes mochad status lines.
///
/// mochad prints fixed-width `MM/DD HH:MM:SS` timestamps and verbs, so lines
/// are classified by the text at fixed offsets and then split on single
/// spaces:
///
/// ```text
/// 09/22 15:39:07 Rx RFSEC Addr: 21:26:80 Func: Contact_alert_min_DS10A
/// 02/13 23:54:28 Rx RF HouseUnit: B1 Func: On
/// 02/13 23:54:28 Rx PL HouseUnit: B1
/// 02/13 23:54:28 Rx PL House: B Func: On
/// ```
///
/// Powerline commands arrive as two lines; the unit from the `HouseUnit:`
/// line is cached until the next `House:` line. The cache is only ever
/// overwritten, never cleared, so a later `House:` line reuses the last unit
/// seen even if it was meant for another device.
#[derive(Debug, Clone)]
pub struct LineParser {
    house_codes: HouseCodes,
    style: PayloadStyle,
    pending_house_unit: Option<String>,
}

impl LineParser {
    pub fn new(house_codes: HouseCodes, style: PayloadStyle) -> Self {
        Self {
            house_codes,
            style,
            pending_house_unit: None,
        }
    }

    /// The powerline unit waiting for its `House:` line, if any.
    #[cfg(test)]
    fn pending_house_unit(&self) -> Option<&str> {
        self.pending_house_unit.as_deref()
    }

    /// Parse one line. `Ok(None)` means nothing to dispatch, which is the
    /// normal outcome for most mochad output.
    pub fn parse(&mut self, line: &str) -> Result<Option<ParsedLine>> {
        if has_marker(line, MARKER_RFSEC) {
            self.parse_security(line).map(Some)
        } else if has_marker(line, MARKER_RF) {
            self.parse_rf(line)
        } else if has_marker(line, MARKER_PL) {
            self.parse_powerline(line)
        } else {
            Ok(None)
        }
    }

    fn parse_security(&self, line: &str) -> Result<ParsedLine> {
        let fields: Vec<&str> = line.split(' ').collect();
        let address = field(&fields, 5, line)?;
        let raw_func = field(&fields, 7, line)?;
        let record = func::decode(raw_func)?;
        Ok(ParsedLine {
            address: address.to_string(),
            kind: EventKind::Security,
            payload: record.to_payload(self.style),
        })
    }

    fn parse_rf(&self, line: &str) -> Result<Option<ParsedLine>> {
        let fields: Vec<&str> = line.split(' ').collect();
        let house_unit = field(&fields, 5, line)?;
        if !self.house_codes.allows(house_unit) {
            debug!("Ignoring RF {house_unit}: house code not allowed");
            return Ok(None);
        }
        let function = field(&fields, 7, line)?;
        Ok(Some(ParsedLine {
            address: house_unit.to_string(),
            kind: EventKind::Button,
            payload: state_payload(self.style, function),
        }))
    }

    fn parse_powerline(&mut self, line: &str) -> Result<Option<ParsedLine>> {
        let fields: Vec<&str> = line.split(' ').collect();
        match fields.get(4).copied() {
            Some("HouseUnit:") => {
                let house_unit = field(&fields, 5, line)?;
                if self.house_codes.allows(house_unit) {
                    self.pending_house_unit = Some(house_unit.to_string());
                } else {
                    debug!("Ignoring PL {house_unit}: house code not allowed");
                }
                Ok(None)
            }
            Some("House:") => {
                let Some(house_unit) = self.pending_house_unit.clone() else {
                    debug!("PL House: line without a preceding HouseUnit:");
                    return Ok(None);
                };
                let function = field(&fields, 7, line)?;
                Ok(Some(ParsedLine {
                    address: house_unit,
                    kind: EventKind::Button,
                    payload: state_payload(self.style, function),
                }))
            }
            _ => Ok(None),
        }
    }
}

/// Payload for a button press: `{"func": "On"}` in legacy style,
/// `{"state": "ON"}` otherwise.
pub fn state_payload(style: PayloadStyle, function: &str) -> Map<String, Value> {
    let mut payload = Map::new();
    match style {
        PayloadStyle::Legacy => {
            payload.insert("func".to_string(), Value::String(function.to_string()));
        }
        PayloadStyle::Discovery => {
            payload.insert(
                "state".to_string(),
                Value::String(function.to_uppercase()),
            );
        }
    }
    payload
}

fn has_marker(line: &str, (start, end, marker): (usize, usize, &str)) -> bool {
    line.get(start..end) == Some(marker)
}

fn field<'a>(fields: &[&'a str], index: usize, line: &str) -> Result<&'a str> {
    fields
        .get(index)
        .copied()
        .ok_or_else(|| BridgeError::MalformedLine {
            line: line.to_string(),
            reason: "too few fields",
        })
}
