use std::time::Duration;

use serde_json::{Map, Value, json};

pub const DEFAULT_PROTOCOL: &str = "http";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const STATUS_INTERVAL: Duration = Duration::from_secs(10);
pub const SETTINGS_INTERVAL: Duration = Duration::from_secs(30);
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);

pub const STATUS_PATH: &str = "/__//usr/eos/is";
pub const SETTINGS_PATH: &str = "/__//usr/eos/setdev";
pub const CONTROL_PATH: &str = "/__//usr/eos/setcld";

// Actual status keys.
pub const KEY_STATUS: &str = "S";
pub const KEY_TEMPERATURE: &str = "T";
pub const KEY_HUMIDITY: &str = "H";
pub const KEY_LIGHT: &str = "L";

// Desired settings keys.
pub const KEY_SAUNA_DESIRED: &str = "Sxd";
pub const KEY_VAPOR_DESIRED: &str = "Vxd";
pub const KEY_LIGHT_DESIRED: &str = "Lxd";
pub const KEY_TARGET_TEMPERATURE: &str = "Td";
pub const KEY_TARGET_HUMIDITY: &str = "Hd";
pub const KEY_LIGHT_INTENSITY: &str = "Ld";

// Control keys.
pub const CONTROL_SAUNA: &str = "Sxc";
pub const CONTROL_VAPOR: &str = "Vxc";
pub const CONTROL_LIGHT: &str = "Lxc";
pub const CONTROL_TARGET_TEMPERATURE: &str = "Tc";
pub const CONTROL_TARGET_HUMIDITY: &str = "Hc";
pub const CONTROL_LIGHT_INTENSITY: &str = "Lc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Status,
    Settings,
    Control,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Status => STATUS_PATH,
            Endpoint::Settings => SETTINGS_PATH,
            Endpoint::Control => CONTROL_PATH,
        }
    }
}

/// Body of a control request: a single-key object.
pub fn control_payload(key: &str, value: i64) -> Value {
    let mut body = Map::new();
    body.insert(key.to_string(), json!(value));
    Value::Object(body)
}

/// Decode a response body. Empty bodies decode to `null`.
pub fn parse_body(body: &[u8]) -> serde_json::Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_payload_has_single_key() {
        let body = control_payload("Sxc", 0);
        let obj = body.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(body["Sxc"], 0);
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::Status.path(), "/__//usr/eos/is");
        assert_eq!(Endpoint::Settings.path(), "/__//usr/eos/setdev");
        assert_eq!(Endpoint::Control.path(), "/__//usr/eos/setcld");
    }

    #[test]
    fn parse_empty_body() {
        assert_eq!(parse_body(b"").unwrap(), Value::Null);
        assert_eq!(parse_body(b" \n").unwrap(), Value::Null);
    }

    #[test]
    fn parse_object_body() {
        let v = parse_body(br#"{"S": 2, "T": 81}"#).unwrap();
        assert_eq!(v["S"], 2);
        assert_eq!(v["T"], 81);
    }

    #[test]
    fn parse_invalid_body() {
        assert!(parse_body(b"<html>").is_err());
    }
}
