use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.avi-on.com/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3);

/// Client settings. Deserializes from `{"baseURL", "timeoutSeconds", "cacheTTLSeconds"}`;
/// every key is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HaloConfig {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    #[serde(rename = "timeoutSeconds", with = "seconds")]
    pub timeout: Duration,
    #[serde(rename = "cacheTTLSeconds", with = "seconds")]
    pub cache_ttl: Duration,
}

impl Default for HaloConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl HaloConfig {
    pub fn from_json(s: &str) -> Result<Self> {
        let config: HaloConfig =
            serde_json::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Base URL with exactly one trailing slash, ready for path joining.
    pub(crate) fn normalized_base_url(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Account credentials, fixed for the lifetime of a client.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
