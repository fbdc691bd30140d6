//! Blocking facade over the async client.
//!
//! Each call runs the async implementation to completion on a private
//! current-thread tokio runtime shared by the client and all of its entities.
//! Do not call these from inside an async runtime.

use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Runtime;

use crate::cache::{CachePolicy, Freshness};
use crate::config::{Credentials, HaloConfig};
use crate::entity::{self, EntityKind, LightCommand, RefreshSummary};
use crate::protocol::{Location, Pid};
use crate::state::StateMap;
use crate::Result;

fn runtime() -> Result<Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

#[derive(Debug)]
pub struct HaloClient {
    inner: crate::HaloClient,
    runtime: Arc<Runtime>,
}

impl HaloClient {
    pub fn new(inner: crate::HaloClient) -> Result<Self> {
        Ok(Self {
            inner,
            runtime: Arc::new(runtime()?),
        })
    }

    pub fn setup(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        Self::setup_with(HaloConfig::default(), Credentials::new(username, password))
    }

    pub fn setup_with(config: HaloConfig, credentials: Credentials) -> Result<Self> {
        let runtime = Arc::new(runtime()?);
        let inner = runtime.block_on(crate::HaloClient::setup_with(config, credentials))?;
        Ok(Self { inner, runtime })
    }

    /// The async client this facade drives.
    pub fn as_async(&self) -> &crate::HaloClient {
        &self.inner
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.inner.cache_policy()
    }

    pub fn authenticate(&self) -> Result<String> {
        self.runtime.block_on(self.inner.authenticate())
    }

    pub fn list_locations(&self) -> Result<Vec<Location>> {
        self.runtime.block_on(self.inner.list_locations())
    }

    pub fn list_devices(&self, location: &Pid) -> Result<Vec<Entity>> {
        let found = self.runtime.block_on(self.inner.list_devices(location))?;
        Ok(self.wrap(found))
    }

    pub fn list_groups(&self, location: &Pid) -> Result<Vec<Entity>> {
        let found = self.runtime.block_on(self.inner.list_groups(location))?;
        Ok(self.wrap(found))
    }

    pub fn list_scenes(&self, location: &Pid) -> Result<Vec<Entity>> {
        let found = self.runtime.block_on(self.inner.list_scenes(location))?;
        Ok(self.wrap(found))
    }

    pub fn discover(&self) -> Result<Topology> {
        let topology = self.runtime.block_on(self.inner.discover())?;
        Ok(Topology {
            devices: self.wrap(topology.devices),
            groups: self.wrap(topology.groups),
            scenes: self.wrap(topology.scenes),
        })
    }

    fn wrap(&self, entities: Vec<entity::Entity>) -> Vec<Entity> {
        entities
            .into_iter()
            .map(|inner| Entity {
                inner,
                runtime: self.runtime.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct Topology {
    pub devices: Vec<Entity>,
    pub groups: Vec<Entity>,
    pub scenes: Vec<Entity>,
}

impl Topology {
    pub fn into_entities(self) -> Vec<Entity> {
        let mut all = self.devices;
        all.extend(self.groups);
        all.extend(self.scenes);
        all
    }
}

/// Blocking counterpart of [`crate::Entity`].
#[derive(Debug)]
pub struct Entity {
    inner: entity::Entity,
    runtime: Arc<Runtime>,
}

impl Entity {
    pub fn pid(&self) -> &Pid {
        self.inner.pid()
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn kind(&self) -> &EntityKind {
        self.inner.kind()
    }

    pub fn is_group(&self) -> bool {
        self.inner.is_group()
    }

    pub fn state(&self) -> &StateMap {
        self.inner.state()
    }

    pub fn last_updated(&self) -> Option<Instant> {
        self.inner.last_updated()
    }

    pub fn freshness(&self) -> Freshness {
        self.inner.freshness()
    }

    pub fn is_on(&self) -> Option<bool> {
        self.inner.is_on()
    }

    pub fn brightness(&self) -> Option<u8> {
        self.inner.brightness()
    }

    pub fn color_temp(&self) -> Option<u32> {
        self.inner.color_temp()
    }

    pub fn refresh(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.refresh())
    }

    pub fn update(&mut self) -> Result<bool> {
        self.runtime.block_on(self.inner.update())
    }

    pub fn turn_on(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.turn_on())
    }

    pub fn turn_off(&mut self) -> Result<()> {
        self.runtime.block_on(self.inner.turn_off())
    }

    pub fn set_brightness(&mut self, level: u32) -> Result<()> {
        self.runtime.block_on(self.inner.set_brightness(level))
    }

    pub fn set_color_temp(&mut self, kelvin: u32) -> Result<()> {
        self.runtime.block_on(self.inner.set_color_temp(kelvin))
    }

    pub fn turn_on_with(&mut self, cmd: LightCommand) -> Result<()> {
        self.runtime.block_on(self.inner.turn_on_with(cmd))
    }

    pub fn into_async(self) -> entity::Entity {
        self.inner
    }
}

/// Blocking [`crate::refresh_all`].
pub fn refresh_all(entities: &mut [Entity]) -> RefreshSummary {
    let mut summary = RefreshSummary::default();
    for handle in entities.iter_mut() {
        let runtime = handle.runtime.clone();
        let one = runtime.block_on(entity::refresh_all(std::slice::from_mut(&mut handle.inner)));
        summary.refreshed += one.refreshed;
        summary.skipped += one.skipped;
        summary.failed += one.failed;
    }
    summary
}
