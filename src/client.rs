use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, trace};

use crate::cache::CachePolicy;
use crate::config::{Credentials, HaloConfig};
use crate::entity::{Entity, EntityKind, Topology};
use crate::error::Operation;
use crate::logger::MessageLogger;
use crate::protocol::{
    self, auth_token, decode_named_states, is_dimmer, parse_body, take_key, DeviceEntry,
    GroupEntry, Location, Pid, SceneEntry, LOCATIONS_PATH, SESSIONS_PATH,
};
use crate::session::Session;
use crate::state::StateMap;
use crate::{Error, Result};

pub struct HaloClientBuilder {
    config: HaloConfig,
    credentials: Credentials,
    log_path: Option<PathBuf>,
}

impl HaloClientBuilder {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_credentials(Credentials::new(username, password))
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            config: HaloConfig::default(),
            credentials,
            log_path: None,
        }
    }

    /// Replaces all settings at once; individual setters still apply afterwards.
    pub fn config(mut self, config: HaloConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    /// Append every request and response to a JSON-lines file.
    pub fn message_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<HaloClient> {
        self.config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        let logger = match self.log_path {
            Some(path) => Some(Mutex::new(MessageLogger::new(&path)?)),
            None => None,
        };

        Ok(HaloClient {
            inner: Arc::new(Inner {
                http,
                base_url: self.config.normalized_base_url(),
                credentials: self.credentials,
                session: Session::default(),
                policy: CachePolicy::new(self.config.cache_ttl),
                logger,
            }),
        })
    }
}

struct Inner {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    session: Session,
    policy: CachePolicy,
    logger: Option<Mutex<MessageLogger>>,
}

/// Async client for the Halo cloud API.
///
/// Cloning is cheap and every clone shares the session token. Entity handles
/// returned by the `list_*` calls hold a clone.
#[derive(Clone)]
pub struct HaloClient {
    inner: Arc<Inner>,
}

impl fmt::Debug for HaloClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HaloClient")
            .field("base_url", &self.inner.base_url)
            .field("username", &self.inner.credentials.username())
            .field("authenticated", &self.inner.session.is_authenticated())
            .finish()
    }
}

impl HaloClient {
    pub fn builder(username: impl Into<String>, password: impl Into<String>) -> HaloClientBuilder {
        HaloClientBuilder::new(username, password)
    }

    /// Build with default settings and authenticate.
    pub async fn setup(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        Self::setup_with(HaloConfig::default(), Credentials::new(username, password)).await
    }

    pub async fn setup_with(config: HaloConfig, credentials: Credentials) -> Result<Self> {
        let client = HaloClientBuilder::with_credentials(credentials)
            .config(config)
            .build()?;
        client.authenticate().await?;
        Ok(client)
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.inner.policy
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.session.is_authenticated()
    }

    /// Exchange credentials for a session token and keep it for later calls.
    ///
    /// Any failure of the session call, including a timeout, is reported as
    /// `Error::Authentication`.
    pub async fn authenticate(&self) -> Result<String> {
        let creds = &self.inner.credentials;
        debug!(username = creds.username(), "authenticating");
        let body = protocol::session_body(creds.username(), creds.password());

        let response = self
            .request(Operation::Authenticate, Method::POST, SESSIONS_PATH, Some(&body))
            .await;
        let response = match response {
            Ok(v) => v,
            Err(Error::Transport { source, .. }) => {
                return Err(Error::Authentication {
                    operation: Operation::Authenticate,
                    message: "session request failed".to_string(),
                    source: Some(source),
                });
            }
            Err(Error::Protocol { message, .. }) => {
                return Err(Error::auth(Operation::Authenticate, message));
            }
            Err(e) => return Err(e),
        };

        let token = auth_token(&response)
            .ok_or_else(|| {
                Error::auth(Operation::Authenticate, "response carried no auth token")
            })?
            .to_string();
        self.inner.session.set_token(token.clone());
        debug!("authenticated");
        Ok(token)
    }

    pub async fn list_locations(&self) -> Result<Vec<Location>> {
        let op = Operation::ListLocations;
        let mut body = self.request(op, Method::GET, LOCATIONS_PATH, None).await?;
        take_key(op, &mut body, "locations")
    }

    /// Dimmers at a location. Abstract devices of any other product are dropped.
    pub async fn list_devices(&self, location: &Pid) -> Result<Vec<Entity>> {
        let op = Operation::ListDevices;
        let path = protocol::devices_path(location);
        let mut body = self.request(op, Method::GET, &path, None).await?;
        let entries: Vec<DeviceEntry> = take_key(op, &mut body, "abstract_devices")?;
        let total = entries.len();
        let devices: Vec<Entity> = entries
            .into_iter()
            .filter(is_dimmer)
            .map(|d| Entity::new(self.clone(), EntityKind::Device, d.pid, d.name))
            .collect();
        debug!(%location, total, kept = devices.len(), "listed devices");
        Ok(devices)
    }

    pub async fn list_groups(&self, location: &Pid) -> Result<Vec<Entity>> {
        let op = Operation::ListGroups;
        let path = protocol::groups_path(location);
        let mut body = self.request(op, Method::GET, &path, None).await?;
        let entries: Vec<GroupEntry> = take_key(op, &mut body, "groups")?;
        Ok(entries
            .into_iter()
            .map(|g| Entity::new(self.clone(), EntityKind::Group, g.pid, g.name))
            .collect())
    }

    /// Scenes at a location, each bound to `location` and seeded from its `properties`.
    pub async fn list_scenes(&self, location: &Pid) -> Result<Vec<Entity>> {
        let entries = self.scene_entries(location).await?;
        Ok(entries
            .into_iter()
            .map(|s| {
                let kind = EntityKind::Scene {
                    location_id: location.clone(),
                };
                let mut scene = Entity::new(self.clone(), kind, s.pid, s.name);
                scene.replace_state(StateMap::from_properties(&s.properties));
                scene
            })
            .collect())
    }

    /// Every device, group and scene across all locations.
    pub async fn discover(&self) -> Result<Topology> {
        let mut topology = Topology::default();
        for location in self.list_locations().await? {
            topology.devices.extend(self.list_devices(&location.pid).await?);
            topology.groups.extend(self.list_groups(&location.pid).await?);
            topology.scenes.extend(self.list_scenes(&location.pid).await?);
        }
        debug!(
            devices = topology.devices.len(),
            groups = topology.groups.len(),
            scenes = topology.scenes.len(),
            "discovery complete"
        );
        Ok(topology)
    }

    pub async fn get_device_state(&self, pid: &Pid) -> Result<StateMap> {
        self.get_state(Operation::GetDeviceState, &protocol::device_state_path(pid))
            .await
    }

    pub async fn get_group_state(&self, pid: &Pid) -> Result<StateMap> {
        self.get_state(Operation::GetGroupState, &protocol::group_state_path(pid))
            .await
    }

    /// Current state of one scene. The API has no per-scene endpoint, so this
    /// re-lists the location and picks `pid`.
    pub async fn get_scene_state(&self, location: &Pid, pid: &Pid) -> Result<StateMap> {
        self.scene_entries(location)
            .await?
            .into_iter()
            .find(|s| &s.pid == pid)
            .map(|s| StateMap::from_properties(&s.properties))
            .ok_or_else(|| Error::NotFound {
                kind: "scene",
                pid: pid.to_string(),
            })
    }

    pub async fn set_device_state(&self, pid: &Pid, name: &str, value: Value) -> Result<StateMap> {
        let path = protocol::device_state_path(pid);
        self.set_state(Operation::SetDeviceState, &path, name, value)
            .await
    }

    pub async fn set_group_state(&self, pid: &Pid, name: &str, value: Value) -> Result<StateMap> {
        let path = protocol::group_state_path(pid);
        self.set_state(Operation::SetGroupState, &path, name, value)
            .await
    }

    /// Trigger a scene. The response body is ignored, so an empty or
    /// non-JSON reply still counts as success.
    pub async fn set_scene_state(&self, pid: &Pid, name: &str, value: Value) -> Result<()> {
        let op = Operation::SetSceneState;
        let path = protocol::scene_state_path(pid);
        let body = protocol::state_body(name, value);
        match self.request(op, Method::POST, &path, Some(&body)).await {
            Ok(_) => Ok(()),
            Err(Error::Protocol { message, .. }) => {
                trace!(%pid, "ignoring scene response body: {message}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn scene_entries(&self, location: &Pid) -> Result<Vec<SceneEntry>> {
        let op = Operation::ListScenes;
        let path = protocol::scenes_path(location);
        let mut body = self.request(op, Method::GET, &path, None).await?;
        take_key(op, &mut body, "scenes")
    }

    async fn get_state(&self, op: Operation, path: &str) -> Result<StateMap> {
        let mut body = self.request(op, Method::GET, path, None).await?;
        let items: Vec<Value> = take_key(op, &mut body, "state")?;
        Ok(StateMap::from_named_states(&decode_named_states(items)))
    }

    async fn set_state(
        &self,
        op: Operation,
        path: &str,
        name: &str,
        value: Value,
    ) -> Result<StateMap> {
        let body = protocol::state_body(name, value);
        let mut response = self.request(op, Method::POST, path, Some(&body)).await?;
        let items: Vec<Value> = take_key(op, &mut response, "states")?;
        Ok(StateMap::from_named_states(&decode_named_states(items)))
    }

    async fn request(
        &self,
        op: Operation,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.inner.base_url, path);
        debug!(%method, path, operation = %op, "request");
        self.log(|l| l.log_request(method.as_str(), path, body));

        let mut req = self.inner.http.request(method.clone(), &url);
        if op != Operation::Authenticate {
            let token = self.inner.session.authorization().ok_or_else(|| {
                Error::auth(op, "not authenticated; call authenticate() first")
            })?;
            req = req.header(AUTHORIZATION, token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|source| Error::Transport { operation: op, source })?;
        let status = resp.status();
        trace!(status = status.as_u16(), path, "response");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.log(|l| l.log_response(method.as_str(), path, status.as_u16(), &Value::Null));
            return Err(Error::auth(op, format!("rejected (HTTP {status})")));
        }
        if let Err(source) = resp.error_for_status_ref() {
            self.log(|l| l.log_response(method.as_str(), path, status.as_u16(), &Value::Null));
            return Err(Error::Transport { operation: op, source });
        }

        let text = resp
            .text()
            .await
            .map_err(|source| Error::Transport { operation: op, source })?;
        let parsed = if text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            parse_body(op, &text)
        };
        if self.inner.logger.is_some() {
            let logged = match &parsed {
                Ok(v) => v.clone(),
                Err(_) => Value::String(text.clone()),
            };
            self.log(|l| l.log_response(method.as_str(), path, status.as_u16(), &logged));
        }
        parsed
    }

    fn log(&self, f: impl FnOnce(&mut MessageLogger)) {
        if let Some(logger) = &self.inner.logger {
            match logger.lock() {
                Ok(mut guard) => f(&mut *guard),
                Err(poisoned) => f(&mut *poisoned.into_inner()),
            }
        }
    }
}
