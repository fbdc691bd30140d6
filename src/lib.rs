//! Client for Halo Bluetooth mesh dimmers, controlled through the Avi-on cloud API.
//!
//! ```no_run
//! # async fn run() -> halo_cloud::Result<()> {
//! let client = halo_cloud::HaloClient::setup("me@example.com", "password").await?;
//! for location in client.list_locations().await? {
//!     for mut light in client.list_devices(&location.pid).await? {
//!         light.refresh().await?;
//!         light.set_brightness(128).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod blocking;
mod cache;
mod client;
mod config;
mod entity;
mod error;
mod logger;
mod protocol;
mod session;
mod state;

pub use cache::{CachePolicy, Freshness};
pub use client::{HaloClient, HaloClientBuilder};
pub use config::{Credentials, HaloConfig, DEFAULT_BASE_URL, DEFAULT_CACHE_TTL, DEFAULT_TIMEOUT};
pub use entity::{
    refresh_all, Entity, EntityKind, LightCommand, RefreshSummary, Topology,
    MAX_COLOR_TEMP_KELVIN, MIN_COLOR_TEMP_KELVIN,
};
pub use error::{Error, Operation, Result};
pub use protocol::{Location, NamedState, Pid, DIMMER_PRODUCT_ID};
pub use state::{StateField, StateMap, StateValue};
