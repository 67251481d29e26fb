use crate::cookie::SameSite;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::time::Duration;

fn default_namespace() -> SmolStr {
    SmolStr::new_static("session")
}

fn default_pool_size() -> usize {
    10
}

fn default_request_timeout_secs() -> u64 {
    5
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct InMemoryConfiguration {
    pub max_capacity: Option<u64>,
    pub time_to_idle_secs: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RedisConfiguration {
    pub url: SmolStr,
    #[serde(default = "default_namespace")]
    pub namespace: SmolStr,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum StoreConfiguration {
    InMemory(InMemoryConfiguration),
    Redis(RedisConfiguration),
}

impl Default for StoreConfiguration {
    fn default() -> Self {
        Self::InMemory(InMemoryConfiguration::default())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Configuration {
    pub cookie_name: SmolStr,
    /// Unset means a browser-session cookie
    pub cookie_age_secs: Option<u64>,
    pub cookie_domain: Option<SmolStr>,
    pub cookie_path: SmolStr,
    pub cookie_secure: bool,
    pub cookie_httponly: bool,
    pub cookie_same_site: Option<SameSite>,
    pub store: StoreConfiguration,
}

impl Configuration {
    #[must_use]
    pub fn cookie_age(&self) -> Option<Duration> {
        self.cookie_age_secs.map(Duration::from_secs)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            cookie_name: SmolStr::new_static("session_id"),
            cookie_age_secs: None,
            cookie_domain: None,
            cookie_path: SmolStr::new_static("/"),
            cookie_secure: false,
            cookie_httponly: false,
            cookie_same_site: None,
            store: StoreConfiguration::default(),
        }
    }
}
