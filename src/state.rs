use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::trace;

use crate::protocol::{decode_named_states, NamedState};

/// Closed set of state names the cloud reports for dimmers, groups and scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateField {
    OnOff,
    Dim,
    White,
    Action,
}

impl StateField {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            StateField::OnOff => "on_off",
            StateField::Dim => "dim",
            StateField::White => "white",
            StateField::Action => "action",
        }
    }

    pub fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "on_off" => Some(StateField::OnOff),
            "dim" => Some(StateField::Dim),
            "white" => Some(StateField::White),
            "action" => Some(StateField::Action),
            _ => None,
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateValue {
    Power(bool),
    Level(u32),
    Kelvin(u32),
    /// Scene trigger state; `true` once the scene has been activated.
    Active(bool),
}

/// Decoded entity state, keyed by field name.
///
/// Built once from the wire tuples; the derived accessors never fail and
/// return `None` when the backing field is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateMap {
    fields: BTreeMap<StateField, StateValue>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_named_states(states: &[NamedState]) -> Self {
        let mut map = Self::new();
        for state in states {
            let Some(field) = StateField::from_wire_str(&state.name) else {
                trace!(name = %state.name, "ignoring unknown state field");
                continue;
            };
            match decode_field(field, &state.value, &state.humanized) {
                Some(value) => map.set(field, value),
                None => trace!(%field, value = %state.value, "ignoring undecodable state value"),
            }
        }
        map
    }

    /// Decodes a scene's `properties`, which arrive either as a tuple list or
    /// as a plain object.
    pub fn from_properties(properties: &Value) -> Self {
        match properties {
            Value::Array(items) => Self::from_named_states(&decode_named_states(items.clone())),
            Value::Object(obj) => {
                let mut map = Self::new();
                if let Some(active) = obj.get("action").and_then(decode_action) {
                    map.set(StateField::Action, StateValue::Active(active));
                }
                map
            }
            _ => Self::new(),
        }
    }

    pub fn get(&self, field: StateField) -> Option<StateValue> {
        self.fields.get(&field).copied()
    }

    pub fn set(&mut self, field: StateField, value: StateValue) {
        self.fields.insert(field, value);
    }

    /// Overlays every field of `other` onto this map.
    pub fn merge(&mut self, other: StateMap) {
        self.fields.extend(other.fields);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateField, StateValue)> + '_ {
        self.fields.iter().map(|(k, v)| (*k, *v))
    }

    /// Power state from `on_off`, or from a scene's `action`.
    pub fn is_on(&self) -> Option<bool> {
        match self.get(StateField::OnOff) {
            Some(StateValue::Power(on)) => Some(on),
            _ => match self.get(StateField::Action) {
                Some(StateValue::Active(active)) => Some(active),
                _ => None,
            },
        }
    }

    /// Brightness 0-255. Zero when off; a reported level of 0 while on means full.
    pub fn brightness(&self) -> Option<u8> {
        match self.is_on()? {
            false => Some(0),
            true => match self.get(StateField::Dim)? {
                StateValue::Level(0) => Some(u8::MAX),
                StateValue::Level(level) => Some(level.min(u8::MAX as u32) as u8),
                _ => None,
            },
        }
    }

    /// Color temperature in Kelvin.
    pub fn color_temp(&self) -> Option<u32> {
        match self.get(StateField::White)? {
            StateValue::Kelvin(k) => Some(k),
            _ => None,
        }
    }
}

fn decode_field(field: StateField, value: &Value, humanized: &Value) -> Option<StateValue> {
    match field {
        StateField::OnOff => {
            let head = array_head(value)?;
            let on = match head {
                Value::Bool(b) => b,
                Value::Number(n) => n.as_f64()? != 0.0,
                _ => return None,
            };
            Some(StateValue::Power(on))
        }
        StateField::Dim => {
            let level = array_head(value)?.as_u64()?;
            Some(StateValue::Level(u32::try_from(level).unwrap_or(u32::MAX)))
        }
        StateField::White => parse_kelvin(humanized)
            .or_else(|| array_head(value).as_ref().and_then(parse_kelvin))
            .map(StateValue::Kelvin),
        StateField::Action => decode_action(value).map(StateValue::Active),
    }
}

/// Unwraps the JSON-in-a-string single element array used for values, e.g. `"[128]"`.
fn array_head(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => items.into_iter().next(),
            Ok(Value::String(_)) | Err(_) => None,
            Ok(other) => Some(other),
        },
        Value::Array(items) => items.first().cloned(),
        Value::Number(_) | Value::Bool(_) => Some(value.clone()),
        _ => None,
    }
}

fn parse_kelvin(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|k| u32::try_from(k).ok()),
        Value::String(s) => {
            let s = s.trim().trim_end_matches(['K', 'k']).trim();
            s.parse::<u32>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f.round() as u32))
        }
        _ => None,
    }
}

fn decode_action(value: &Value) -> Option<bool> {
    if let Value::String(s) = value {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => return Some(true),
            "off" => return Some(false),
            _ => {}
        }
    }
    match array_head(value)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => Some(n.as_f64()? != 0.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn states(v: Value) -> StateMap {
        let named: Vec<NamedState> = serde_json::from_value(v).unwrap();
        StateMap::from_named_states(&named)
    }

    #[test]
    fn missing_on_off_is_unknown() {
        let map = states(json!([{"name": "dim", "value": "[40]", "humanized": 16}]));
        assert_eq!(map.is_on(), None);
        assert_eq!(map.brightness(), None);
        assert_eq!(StateMap::new().is_on(), None);
        assert_eq!(StateMap::new().color_temp(), None);
    }

    #[test]
    fn off_forces_zero_brightness() {
        let map = states(json!([
            {"name": "on_off", "value": "[0]", "humanized": "Off"},
            {"name": "dim", "value": "[180]", "humanized": 70}
        ]));
        assert_eq!(map.is_on(), Some(false));
        assert_eq!(map.brightness(), Some(0));

        let map = states(json!([{"name": "on_off", "value": "[0]"}]));
        assert_eq!(map.brightness(), Some(0));
    }

    #[test]
    fn zero_dim_while_on_means_full() {
        let map = states(json!([
            {"name": "on_off", "value": "[1]"},
            {"name": "dim", "value": "[0]"}
        ]));
        assert_eq!(map.brightness(), Some(255));
    }

    #[test]
    fn dim_level_passes_through_and_saturates() {
        let map = states(json!([
            {"name": "on_off", "value": "[1]"},
            {"name": "dim", "value": "[128]"}
        ]));
        assert_eq!(map.brightness(), Some(128));

        let map = states(json!([
            {"name": "on_off", "value": "[1]"},
            {"name": "dim", "value": "[900]"}
        ]));
        assert_eq!(map.brightness(), Some(255));
    }

    #[test]
    fn color_temp_reads_humanized() {
        let map = states(json!([{"name": "white", "value": "[50]", "humanized": 4000}]));
        assert_eq!(map.color_temp(), Some(4000));

        let map = states(json!([{"name": "white", "value": "[50]", "humanized": "3500K"}]));
        assert_eq!(map.color_temp(), Some(3500));

        let map = states(json!([{"name": "white", "value": 2700}]));
        assert_eq!(map.color_temp(), Some(2700));
    }

    #[test]
    fn unknown_and_malformed_entries_are_skipped() {
        let map = states(json!([
            {"name": "rgb", "value": "[1,2,3]"},
            {"name": "on_off", "value": "not json"},
            {"name": "dim", "value": "[]"}
        ]));
        assert!(map.is_empty());
    }

    #[test]
    fn scene_properties_as_object_or_tuples() {
        let map = StateMap::from_properties(&json!({"action": "on", "color": "warm"}));
        assert_eq!(map.is_on(), Some(true));

        let map = StateMap::from_properties(&json!([{"name": "action", "value": "off"}]));
        assert_eq!(map.is_on(), Some(false));

        let map = StateMap::from_properties(&Value::Null);
        assert_eq!(map.is_on(), None);
    }

    #[test]
    fn merge_overlays_fields() {
        let mut map = states(json!([
            {"name": "on_off", "value": "[1]"},
            {"name": "dim", "value": "[10]"}
        ]));
        map.merge(states(json!([{"name": "dim", "value": "[200]"}])));
        assert_eq!(map.len(), 2);
        assert_eq!(map.brightness(), Some(200));
    }
}
