use crate::cookie::SameSite;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::time::Duration;

const DEFAULT_COOKIE_AGE_SECS: u64 = 60 * 60 * 24 * 7 * 52;
const DEFAULT_MAX_FORM_SIZE: usize = 2 * 1024 * 1024;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Configuration {
    pub cookie_name: SmolStr,
    pub cookie_age_secs: u64,
    pub cookie_domain: Option<SmolStr>,
    pub cookie_path: SmolStr,
    pub cookie_secure: bool,
    pub cookie_httponly: bool,
    pub cookie_same_site: Option<SameSite>,
    pub header_name: SmolStr,
    pub field_name: SmolStr,
    /// `host[:port]` entries. A leading dot also admits every subdomain
    pub trusted_origins: Vec<SmolStr>,
    /// Treat `X-Forwarded-Proto: https` as a secure connection
    pub trust_forwarded_proto: bool,
    /// Upper bound for buffering urlencoded bodies while looking for the token field
    pub max_form_size: usize,
}

impl Configuration {
    #[must_use]
    pub fn cookie_age(&self) -> Duration {
        Duration::from_secs(self.cookie_age_secs)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            cookie_name: SmolStr::new_static("csrftoken"),
            cookie_age_secs: DEFAULT_COOKIE_AGE_SECS,
            cookie_domain: None,
            cookie_path: SmolStr::new_static("/"),
            cookie_secure: false,
            cookie_httponly: false,
            cookie_same_site: None,
            header_name: SmolStr::new_static("x-csrftoken"),
            field_name: SmolStr::new_static("csrf_token"),
            trusted_origins: Vec::new(),
            trust_forwarded_proto: false,
            max_form_size: DEFAULT_MAX_FORM_SIZE,
        }
    }
}
