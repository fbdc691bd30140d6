use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use tracing::trace;

use crate::error::Operation;
use crate::{Error, Result};

/// Product id of the Halo smart dimmer; other abstract devices are ignored.
pub const DIMMER_PRODUCT_ID: u64 = 162;

pub const SESSIONS_PATH: &str = "sessions";
pub const LOCATIONS_PATH: &str = "user/locations";

pub fn groups_path(location: &Pid) -> String {
    format!("locations/{location}/groups")
}

pub fn devices_path(location: &Pid) -> String {
    format!("locations/{location}/abstract_devices")
}

pub fn scenes_path(location: &Pid) -> String {
    format!("locations/{location}/scenes")
}

pub fn device_state_path(pid: &Pid) -> String {
    format!("devices/{pid}/state")
}

pub fn group_state_path(pid: &Pid) -> String {
    format!("groups/{pid}/state")
}

pub fn scene_state_path(pid: &Pid) -> String {
    format!("scenes/{pid}/state")
}

/// Provider-assigned identifier. The API emits these as numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Pid(pub String);

impl Pid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Pid {
    fn from(s: &str) -> Self {
        Pid(s.to_string())
    }
}

impl From<String> for Pid {
    fn from(s: String) -> Self {
        Pid(s)
    }
}

impl From<u64> for Pid {
    fn from(n: u64) -> Self {
        Pid(n.to_string())
    }
}

impl<'de> Deserialize<'de> for Pid {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Unsigned(u64),
            Signed(i64),
        }
        Ok(match Raw::deserialize(d)? {
            Raw::Str(s) => Pid(s),
            Raw::Unsigned(n) => Pid(n.to_string()),
            Raw::Signed(n) => Pid(n.to_string()),
        })
    }
}

/// Wire form of one stateful attribute: `{name, value, humanized}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedState {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub humanized: Value,
}

/// Decodes state tuples one at a time, dropping entries that do not parse.
pub fn decode_named_states(items: Vec<Value>) -> Vec<NamedState> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<NamedState>(item) {
            Ok(state) => Some(state),
            Err(e) => {
                trace!("ignoring malformed state tuple: {e}");
                None
            }
        })
        .collect()
}

/// A location as returned by `user/locations`. Only `pid` is interpreted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Location {
    pub pid: Pid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GroupEntry {
    pub pid: Pid,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DeviceEntry {
    pub pid: Pid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub product_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SceneEntry {
    pub pid: Pid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Value,
}

pub fn session_body(email: &str, password: &str) -> Value {
    json!({ "email": email, "password": password })
}

pub fn state_body(name: &str, value: Value) -> Value {
    json!({ "state": { "name": name, "value": value } })
}

/// `on_off` value: `"[1]"` or `"[0]"`.
pub fn power_value(on: bool) -> Value {
    Value::String(format!("[{}]", u8::from(on)))
}

/// `dim` value, array-wrapped and stringified. Not range checked.
pub fn dim_value(level: u32) -> Value {
    Value::String(format!("[{level}]"))
}

/// `white` value: bare Kelvin integer.
pub fn white_value(kelvin: u32) -> Value {
    Value::from(kelvin)
}

pub fn scene_action_value() -> Value {
    Value::String("on".to_string())
}

pub fn parse_body(operation: Operation, body: &str) -> Result<Value> {
    serde_json::from_str(body)
        .map_err(|e| Error::protocol(operation, format!("invalid JSON body: {e}")))
}

/// Removes and deserializes a required top-level key.
pub fn take_key<T: serde::de::DeserializeOwned>(
    operation: Operation,
    body: &mut Value,
    key: &str,
) -> Result<T> {
    let value = body
        .as_object_mut()
        .and_then(|obj| obj.remove(key))
        .ok_or_else(|| Error::protocol(operation, format!("response missing `{key}`")))?;
    serde_json::from_value(value)
        .map_err(|e| Error::protocol(operation, format!("malformed `{key}`: {e}")))
}

/// Pulls `credentials.auth_token` out of a session response.
pub fn auth_token(body: &Value) -> Option<&str> {
    body.pointer("/credentials/auth_token")
        .and_then(|v| v.as_str())
        .filter(|t| !t.is_empty())
}

pub(crate) fn is_dimmer(entry: &DeviceEntry) -> bool {
    entry.product_id == Some(DIMMER_PRODUCT_ID)
}
