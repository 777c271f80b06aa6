//! Server configuration

use anyhow::{Context, Result};
use predictor_lib::DomainId;
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name attached to every structured log event
    #[serde(default = "default_instance")]
    pub instance: String,

    /// API server port for predictions, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding one subdirectory per domain
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,

    /// Comma-separated domain ids; empty or `all` serves every domain
    #[serde(default)]
    pub domains: String,
}

fn default_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from("artifacts")
}

impl ServerConfig {
    /// Load configuration from `predictor.toml` (optional) and `PREDICTOR_*` variables
    pub fn load() -> Result<Self> {
        Self::build(
            config::Config::builder()
                .add_source(config::File::with_name("predictor").required(false))
                .add_source(config::Environment::with_prefix("PREDICTOR")),
        )
    }

    fn build(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config = builder.build().context("Failed to read configuration")?;
        config
            .try_deserialize()
            .context("Invalid predictor configuration")
    }

    /// Domains to load at startup
    pub fn enabled_domains(&self) -> Result<Vec<DomainId>> {
        let list = self.domains.trim();
        if list.is_empty() || list.eq_ignore_ascii_case("all") {
            return Ok(DomainId::ALL.to_vec());
        }
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<DomainId>().map_err(anyhow::Error::msg))
            .collect()
    }
}
