use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde_json::json;

use super::system;
use super::{classify_above, classify_below, round_to, CheckResult, CheckStatus, HealthProbe};
use crate::cache::ResponseCache;
use crate::config::{Band, ExternalApiConfig};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Storage reachability and `SELECT 1` latency
pub struct StorageProbe {
    db: DatabaseConnection,
    latency_ms: Band,
}

impl StorageProbe {
    pub fn new(db: DatabaseConnection, latency_ms: Band) -> Self {
        Self { db, latency_ms }
    }
}

#[async_trait]
impl HealthProbe for StorageProbe {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> anyhow::Result<CheckResult> {
        let started = Instant::now();
        let backend = self.db.get_database_backend();
        if let Err(err) = self
            .db
            .execute(Statement::from_string(backend, "SELECT 1".to_string()))
            .await
        {
            return Ok(CheckResult::unhealthy(format!("Database connection failed: {}", err)));
        }
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let status = classify_above(elapsed_ms, self.latency_ms);
        let message = match status {
            CheckStatus::Healthy => "Database is accessible".to_string(),
            CheckStatus::Warning => format!("Database response time is high: {:.2}ms", elapsed_ms),
            _ => format!("Database response time is critical: {:.2}ms", elapsed_ms),
        };

        Ok(CheckResult::new(status, message).with_metric("response_time_ms", round_to(elapsed_ms, 2)))
    }
}

/// Set/get/delete round trip through the response cache
pub struct CacheProbe {
    cache: Arc<ResponseCache>,
}

impl CacheProbe {
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl HealthProbe for CacheProbe {
    fn name(&self) -> &str {
        "cache"
    }

    async fn check(&self) -> anyhow::Result<CheckResult> {
        let key = "health_check_test";
        let value = json!(chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());

        self.cache.set_with_ttl(key, value.clone(), Duration::from_secs(30));
        let read_back = self.cache.get(key);
        self.cache.delete(key);

        if read_back.as_ref() == Some(&value) {
            Ok(CheckResult::healthy("Cache is working correctly"))
        } else {
            Ok(CheckResult::unhealthy("Cache read/write test failed"))
        }
    }
}

/// Free space on the filesystem holding `path`
pub struct DiskProbe {
    path: PathBuf,
    free_percent: Band,
}

impl DiskProbe {
    pub fn new(path: impl Into<PathBuf>, free_percent: Band) -> Self {
        Self {
            path: path.into(),
            free_percent,
        }
    }
}

#[async_trait]
impl HealthProbe for DiskProbe {
    fn name(&self) -> &str {
        "disk_space"
    }

    async fn check(&self) -> anyhow::Result<CheckResult> {
        let usage = match system::disk_usage(&self.path) {
            Ok(usage) => usage,
            Err(err) => return Ok(CheckResult::error(format!("Disk space check failed: {}", err))),
        };
        let free = usage.free_percent();

        let status = classify_below(free, self.free_percent);
        let message = match status {
            CheckStatus::Healthy => format!("Disk space: {:.1}% free", free),
            CheckStatus::Warning => format!("Low disk space: {:.1}% free", free),
            _ => format!("Critical disk space: {:.1}% free", free),
        };

        Ok(CheckResult::new(status, message)
            .with_metric("free_percent", round_to(free, 1))
            .with_metric("free_gb", round_to(usage.free_bytes as f64 / GIB, 2))
            .with_metric("total_gb", round_to(usage.total_bytes as f64 / GIB, 2)))
    }
}

pub struct MemoryProbe {
    used_percent: Band,
}

impl MemoryProbe {
    pub fn new(used_percent: Band) -> Self {
        Self { used_percent }
    }

    fn evaluate(&self, info: Option<system::MemoryInfo>) -> CheckResult {
        let Some(info) = info else {
            return CheckResult::warning("Could not determine memory usage");
        };
        let used = info.used_percent();

        let status = classify_above(used, self.used_percent);
        let message = match status {
            CheckStatus::Healthy => format!("Memory usage: {:.1}%", used),
            CheckStatus::Warning => format!("High memory usage: {:.1}%", used),
            _ => format!("Critical memory usage: {:.1}%", used),
        };

        CheckResult::new(status, message)
            .with_metric("used_percent", round_to(used, 1))
            .with_metric("available_gb", round_to(info.available_bytes as f64 / GIB, 2))
            .with_metric("total_gb", round_to(info.total_bytes as f64 / GIB, 2))
    }
}

#[async_trait]
impl HealthProbe for MemoryProbe {
    fn name(&self) -> &str {
        "memory"
    }

    async fn check(&self) -> anyhow::Result<CheckResult> {
        match system::read_meminfo() {
            Ok(info) => Ok(self.evaluate(info)),
            Err(err) => Ok(CheckResult::warning(format!(
                "Could not determine memory usage: {}",
                err
            ))),
        }
    }
}

/// One-minute load average relative to the number of cores
pub struct CpuProbe {
    load_percent: Band,
}

impl CpuProbe {
    pub fn new(load_percent: Band) -> Self {
        Self { load_percent }
    }

    fn evaluate(&self, load_avg: [f64; 3], cpu_count: usize) -> CheckResult {
        let load = load_avg[0];
        let percent = load / cpu_count.max(1) as f64 * 100.0;

        let status = classify_above(percent, self.load_percent);
        let message = match status {
            CheckStatus::Healthy => format!("CPU load: {:.2} ({:.1}%)", load, percent),
            CheckStatus::Warning => format!("High CPU load: {:.2} ({:.1}%)", load, percent),
            _ => format!("Critical CPU load: {:.2} ({:.1}%)", load, percent),
        };

        CheckResult::new(status, message)
            .with_metric("cpu_load", round_to(load, 2))
            .with_metric("cpu_count", cpu_count)
            .with_metric("load_avg", load_avg.to_vec())
    }
}

#[async_trait]
impl HealthProbe for CpuProbe {
    fn name(&self) -> &str {
        "cpu"
    }

    async fn check(&self) -> anyhow::Result<CheckResult> {
        let load_avg = system::read_loadavg()?
            .ok_or_else(|| anyhow::anyhow!("/proc/loadavg has an unexpected format"))?;
        Ok(self.evaluate(load_avg, system::cpu_count()))
    }
}

/// Reachability of the third-party species API
pub struct ExternalApiProbe {
    client: reqwest::Client,
    url: String,
    slow_response_ms: u64,
}

impl ExternalApiProbe {
    pub fn new(config: &ExternalApiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build external API client")?;
        Ok(Self {
            client,
            url: config.url.clone(),
            slow_response_ms: config.slow_response_ms,
        })
    }
}

#[async_trait]
impl HealthProbe for ExternalApiProbe {
    fn name(&self) -> &str {
        "external_apis"
    }

    async fn check(&self) -> anyhow::Result<CheckResult> {
        let started = Instant::now();
        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(err) => {
                return Ok(CheckResult::warning(format!("External API check failed: {}", err)))
            }
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let result = if response.status() != reqwest::StatusCode::OK {
            CheckResult::warning(format!(
                "External API returned status {}",
                response.status().as_u16()
            ))
        } else if elapsed_ms > self.slow_response_ms as f64 {
            CheckResult::warning(format!("External API response time is high: {:.2}ms", elapsed_ms))
        } else {
            CheckResult::healthy("External APIs are accessible")
        };

        Ok(result.with_metric("response_time_ms", round_to(elapsed_ms, 2)))
    }
}
