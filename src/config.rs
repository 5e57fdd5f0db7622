use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const ADMIN_TOKEN_ENV: &str = "VISOR_ADMIN_TOKEN";

/// Warning and critical thresholds for one health metric
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub warning: f64,
    pub critical: f64,
}

impl Band {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalApiConfig {
    pub enabled: bool,
    pub url: String,
    pub timeout_secs: u64,
    pub slow_response_ms: u64,
}

impl Default for ExternalApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://api.gbif.org/v1/species/search?q=Puma".to_string(),
            timeout_secs: 10,
            slow_response_ms: 5000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub storage_latency_ms: Band,
    /// Lower is worse: critical sits below warning
    pub disk_free_percent: Band,
    pub memory_used_percent: Band,
    /// One-minute load average over core count, as a percentage
    pub cpu_load_percent: Band,
    pub disk_path: String,
    pub external_api: ExternalApiConfig,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            storage_latency_ms: Band::new(1000.0, 5000.0),
            disk_free_percent: Band::new(20.0, 10.0),
            memory_used_percent: Band::new(80.0, 95.0),
            cpu_load_percent: Band::new(80.0, 150.0),
            disk_path: "/".to_string(),
            external_api: ExternalApiConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub database: String,
    pub cors_origin: Option<String>,
    pub admin_token: Option<String>,
    pub max_body_bytes: usize,
    pub health: HealthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            database: "visor.db".to_string(),
            cors_origin: None,
            admin_token: None,
            max_body_bytes: 10 * 1024 * 1024,
            health: HealthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from an optional YAML file, then apply the admin token from the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Ok(token) = std::env::var(ADMIN_TOKEN_ENV) {
            if !token.is_empty() {
                config.admin_token = Some(token);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_body_bytes == 0 {
            bail!("max_body_bytes must be greater than zero");
        }

        let health = &self.health;
        for (name, band) in [
            ("storage_latency_ms", health.storage_latency_ms),
            ("memory_used_percent", health.memory_used_percent),
            ("cpu_load_percent", health.cpu_load_percent),
        ] {
            if band.warning > band.critical {
                bail!(
                    "health.{}: warning ({}) must not exceed critical ({})",
                    name,
                    band.warning,
                    band.critical
                );
            }
        }
        if health.disk_free_percent.critical > health.disk_free_percent.warning {
            bail!(
                "health.disk_free_percent: critical ({}) must not exceed warning ({})",
                health.disk_free_percent.critical,
                health.disk_free_percent.warning
            );
        }
        if health.external_api.timeout_secs == 0 {
            bail!("health.external_api.timeout_secs must be greater than zero");
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
