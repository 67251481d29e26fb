#![forbid(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, forbidden_lint_groups)]

pub mod cookie;
pub mod csrf;
pub mod server;
pub mod session;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    #[serde(default)]
    pub csrf: csrf::Configuration,
    pub server: server::Configuration,
    #[serde(default)]
    pub session: session::Configuration,
}

impl Configuration {
    pub async fn load<P>(path: P) -> eyre::Result<Self>
    where
        P: AsRef<Path>,
    {
        let content = fs::read_to_string(path).await?;
        content.parse()
    }
}

impl std::str::FromStr for Configuration {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).map_err(eyre::Report::from)
    }
}
