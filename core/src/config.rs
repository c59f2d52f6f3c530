//! Configuration lookup for host, API prefix and API version.
//!
//! `UrlResolver` reads configuration through the `ConfigSource` trait using
//! dotted keys (`api.prefix`, `api.version`, `api.<SERVICE>`). `ApiConfig` is
//! the bundled source; plain maps work too.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RestError, Result};

/// Read-only key lookup consumed by `UrlResolver`.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// API settings shared by every sibling service.
///
/// ```json
/// {"prefix": "api", "version": "v1", "hosts": {"users": "http://users.internal"}}
/// ```
///
/// Host keys are stored uppercased so `api.USERS` resolves regardless of how
/// the document spelled it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub hosts: HashMap<String, String>,
}

impl ApiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_host(mut self, key: &str, host: impl Into<String>) -> Self {
        self.hosts.insert(key.to_ascii_uppercase(), host.into());
        self
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: ApiConfig =
            serde_json::from_str(raw).map_err(|e| RestError::InvalidConfig(e.to_string()))?;
        Ok(config.normalized())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RestError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    /// Reads `API_PREFIX`, `API_VERSION` and every other `API_<KEY>` variable
    /// from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Same as [`ApiConfig::from_env`] over an explicit variable list.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = ApiConfig::default();
        for (name, value) in vars {
            let Some(key) = name.as_ref().strip_prefix("API_") else {
                continue;
            };
            match key {
                "PREFIX" => config.prefix = Some(value.into()),
                "VERSION" => config.version = Some(value.into()),
                "" => {}
                host => {
                    config.hosts.insert(host.to_ascii_uppercase(), value.into());
                }
            }
        }
        config
    }

    fn normalized(mut self) -> Self {
        self.hosts = self
            .hosts
            .into_iter()
            .map(|(k, v)| (k.to_ascii_uppercase(), v))
            .collect();
        self
    }
}

impl ConfigSource for ApiConfig {
    fn get(&self, key: &str) -> Option<String> {
        match key.strip_prefix("api.")? {
            "prefix" => self.prefix.clone(),
            "version" => self.version.clone(),
            host => self.hosts.get(host).cloned(),
        }
    }
}
