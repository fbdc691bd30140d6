use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::Freshness;
use crate::client::HaloClient;
use crate::protocol::{self, Pid};
use crate::state::{StateField, StateMap, StateValue};
use crate::{Error, Result};

/// Coolest color temperature the dimmers accept, in Kelvin.
pub const MAX_COLOR_TEMP_KELVIN: u32 = 5000;
/// Warmest color temperature the dimmers accept, in Kelvin.
pub const MIN_COLOR_TEMP_KELVIN: u32 = 2700;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Device,
    /// Same as a device, but state calls go to the group endpoints.
    Group,
    /// Scenes have no state endpoint of their own; lookups re-list `location_id`.
    Scene { location_id: Pid },
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Device => "device",
            EntityKind::Group => "group",
            EntityKind::Scene { .. } => "scene",
        }
    }
}

/// Attributes to apply when turning a light on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightCommand {
    pub brightness: Option<u32>,
    /// Kelvin.
    pub color_temp: Option<u32>,
}

/// A device, group or scene bound to the client it was listed from.
///
/// Handles are independent snapshots: two handles for the same `pid` from
/// separate listings do not share state.
#[derive(Debug, Clone)]
pub struct Entity {
    client: HaloClient,
    kind: EntityKind,
    pid: Pid,
    name: String,
    state: StateMap,
    last_updated: Option<Instant>,
}

impl Entity {
    pub(crate) fn new(
        client: HaloClient,
        kind: EntityKind,
        pid: Pid,
        name: Option<String>,
    ) -> Self {
        Self {
            client,
            kind,
            pid,
            name: name.unwrap_or_default(),
            state: StateMap::new(),
            last_updated: None,
        }
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn is_group(&self) -> bool {
        self.kind == EntityKind::Group
    }

    pub fn state(&self) -> &StateMap {
        &self.state
    }

    pub fn last_updated(&self) -> Option<Instant> {
        self.last_updated
    }

    pub fn freshness(&self) -> Freshness {
        self.client.cache_policy().freshness(self.last_updated)
    }

    pub fn is_on(&self) -> Option<bool> {
        self.state.is_on()
    }

    pub fn brightness(&self) -> Option<u8> {
        self.state.brightness()
    }

    pub fn color_temp(&self) -> Option<u32> {
        self.state.color_temp()
    }

    /// Fetch state from the cloud and replace the cached copy.
    ///
    /// On error the cached state is left as it was.
    pub async fn refresh(&mut self) -> Result<()> {
        let fetched = match &self.kind {
            EntityKind::Device => self.client.get_device_state(&self.pid).await,
            EntityKind::Group => self.client.get_group_state(&self.pid).await,
            EntityKind::Scene { location_id } => {
                self.client.get_scene_state(location_id, &self.pid).await
            }
        };
        match fetched {
            Ok(state) => {
                self.replace_state(state);
                Ok(())
            }
            Err(e) => {
                warn!(pid = %self.pid, kind = self.kind.as_str(), "refresh failed: {e}");
                Err(e)
            }
        }
    }

    /// Refresh unless the cached state is still within the TTL. Returns whether
    /// a fetch was made.
    pub async fn update(&mut self) -> Result<bool> {
        if self.freshness() == Freshness::Fresh {
            debug!(pid = %self.pid, kind = self.kind.as_str(), "state fresh, skipping refresh");
            return Ok(false);
        }
        self.refresh().await?;
        Ok(true)
    }

    pub async fn turn_on(&mut self) -> Result<()> {
        self.set_power(true).await
    }

    /// For scenes this sends the same activation as `turn_on`; scenes cannot be
    /// switched off.
    pub async fn turn_off(&mut self) -> Result<()> {
        self.set_power(false).await
    }

    /// Set the dim level. Values are sent as given, without range checks.
    pub async fn set_brightness(&mut self, level: u32) -> Result<()> {
        self.write(
            "set_brightness",
            StateField::Dim,
            protocol::dim_value(level),
            StateValue::Level(level),
        )
        .await
    }

    pub async fn set_color_temp(&mut self, kelvin: u32) -> Result<()> {
        self.write(
            "set_color_temp",
            StateField::White,
            protocol::white_value(kelvin),
            StateValue::Kelvin(kelvin),
        )
        .await
    }

    /// Turn on with optional attributes. With none given, powers on and sets
    /// the coolest color temperature.
    pub async fn turn_on_with(&mut self, cmd: LightCommand) -> Result<()> {
        if cmd == LightCommand::default() {
            self.turn_on().await?;
            return self.set_color_temp(MAX_COLOR_TEMP_KELVIN).await;
        }
        if let Some(level) = cmd.brightness {
            self.set_brightness(level).await?;
        }
        if let Some(kelvin) = cmd.color_temp {
            self.set_color_temp(kelvin).await?;
        }
        Ok(())
    }

    async fn set_power(&mut self, on: bool) -> Result<()> {
        if let EntityKind::Scene { .. } = self.kind {
            return self.activate_scene().await;
        }
        self.write(
            if on { "turn_on" } else { "turn_off" },
            StateField::OnOff,
            protocol::power_value(on),
            StateValue::Power(on),
        )
        .await
    }

    async fn activate_scene(&mut self) -> Result<()> {
        let sent = self
            .client
            .set_scene_state(
                &self.pid,
                StateField::Action.as_wire_str(),
                protocol::scene_action_value(),
            )
            .await;
        if let Err(e) = sent {
            warn!(pid = %self.pid, kind = "scene", "activation failed: {e}");
            return Err(e);
        }
        self.state.set(StateField::Action, StateValue::Active(true));
        self.last_updated = Some(Instant::now());
        Ok(())
    }

    /// Send one field to the device or group endpoint, then apply the written
    /// value and whatever the response reports.
    async fn write(
        &mut self,
        operation: &'static str,
        field: StateField,
        wire_value: Value,
        local: StateValue,
    ) -> Result<()> {
        let name = field.as_wire_str();
        let sent = match self.kind {
            EntityKind::Device => self.client.set_device_state(&self.pid, name, wire_value).await,
            EntityKind::Group => self.client.set_group_state(&self.pid, name, wire_value).await,
            EntityKind::Scene { .. } => {
                return Err(Error::Unsupported {
                    kind: "scene",
                    operation,
                });
            }
        };
        let reported = match sent {
            Ok(reported) => reported,
            Err(e) => {
                warn!(pid = %self.pid, kind = self.kind.as_str(), operation, "write failed: {e}");
                return Err(e);
            }
        };
        self.state.set(field, local);
        self.state.merge(reported);
        self.last_updated = Some(Instant::now());
        Ok(())
    }

    pub(crate) fn replace_state(&mut self, state: StateMap) {
        self.state = state;
        self.last_updated = Some(Instant::now());
    }
}

/// Every entity found by `HaloClient::discover`.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub devices: Vec<Entity>,
    pub groups: Vec<Entity>,
    pub scenes: Vec<Entity>,
}

impl Topology {
    pub fn len(&self) -> usize {
        self.devices.len() + self.groups.len() + self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_entities(self) -> Vec<Entity> {
        let mut all = self.devices;
        all.extend(self.groups);
        all.extend(self.scenes);
        all
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// TTL-guarded refresh of many entities. A failing entity keeps its previous
/// state (the failure is logged by `Entity::refresh`); the rest are still
/// refreshed.
pub async fn refresh_all(entities: &mut [Entity]) -> RefreshSummary {
    let mut summary = RefreshSummary::default();
    for entity in entities.iter_mut() {
        match entity.update().await {
            Ok(true) => summary.refreshed += 1,
            Ok(false) => summary.skipped += 1,
            Err(e) => {
                debug!(pid = %entity.pid, "counted as failed: {e}");
                summary.failed += 1;
            }
        }
    }
    summary
}
