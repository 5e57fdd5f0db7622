//! Composite health checks
//!
//! Independent probes report `healthy | warning | unhealthy | error` and the
//! [`HealthService`] folds them into one report. Warnings keep the service
//! healthy; any unhealthy or errored probe makes the aggregate unhealthy.

pub mod probes;
pub mod system;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use indexmap::IndexMap;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::cache::ResponseCache;
use crate::config::{Band, HealthConfig};

pub use probes::{CacheProbe, CpuProbe, DiskProbe, ExternalApiProbe, MemoryProbe, StorageProbe};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Warning,
    Unhealthy,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Healthy => "healthy",
            CheckStatus::Warning => "warning",
            CheckStatus::Unhealthy => "unhealthy",
            CheckStatus::Error => "error",
        }
    }
}

/// Outcome of one probe; extra metrics are flattened into the JSON entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub message: String,
    pub timestamp: String,
    #[serde(flatten)]
    pub metrics: Map<String, Value>,
}

impl CheckResult {
    pub fn new(status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            metrics: Map::new(),
        }
    }

    pub fn healthy(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Healthy, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Warning, message)
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Unhealthy, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Error, message)
    }

    pub fn with_metric(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metrics.insert(key.to_string(), value.into());
        self
    }
}

/// A named, independently runnable health check
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> anyhow::Result<CheckResult>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Unhealthy,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub checks: IndexMap<String, CheckResult>,
    pub summary: HealthSummary,
}

impl HealthReport {
    /// Fold probe results, kept in the given order, into one report.
    pub fn aggregate(results: Vec<(String, CheckResult)>) -> Self {
        let mut summary = HealthSummary {
            total: results.len(),
            ..Default::default()
        };
        let mut checks = IndexMap::with_capacity(results.len());

        for (name, result) in results {
            match result.status {
                CheckStatus::Healthy => summary.passed += 1,
                CheckStatus::Warning => summary.warnings += 1,
                CheckStatus::Unhealthy | CheckStatus::Error => summary.failed += 1,
            }
            checks.insert(name, result);
        }

        let status = if summary.failed > 0 {
            OverallStatus::Unhealthy
        } else {
            OverallStatus::Healthy
        };

        Self {
            status,
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now().to_rfc3339(),
            checks,
            summary,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == OverallStatus::Healthy
    }
}

/// Classify a metric where higher values are worse. The critical band is
/// checked first.
pub fn classify_above(value: f64, band: Band) -> CheckStatus {
    if value > band.critical {
        CheckStatus::Unhealthy
    } else if value > band.warning {
        CheckStatus::Warning
    } else {
        CheckStatus::Healthy
    }
}

/// Classify a metric where lower values are worse.
pub fn classify_below(value: f64, band: Band) -> CheckStatus {
    if value < band.critical {
        CheckStatus::Unhealthy
    } else if value < band.warning {
        CheckStatus::Warning
    } else {
        CheckStatus::Healthy
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Clone)]
pub struct HealthService {
    probes: Vec<Arc<dyn HealthProbe>>,
}

impl HealthService {
    pub fn new(probes: Vec<Arc<dyn HealthProbe>>) -> Self {
        Self { probes }
    }

    /// The standard probe set: storage, cache, disk, memory, CPU and the
    /// external API (when enabled).
    pub fn with_defaults(
        db: DatabaseConnection,
        cache: Arc<ResponseCache>,
        config: &HealthConfig,
    ) -> anyhow::Result<Self> {
        let mut probes: Vec<Arc<dyn HealthProbe>> = vec![
            Arc::new(StorageProbe::new(db, config.storage_latency_ms)),
            Arc::new(CacheProbe::new(cache)),
            Arc::new(DiskProbe::new(&config.disk_path, config.disk_free_percent)),
            Arc::new(MemoryProbe::new(config.memory_used_percent)),
            Arc::new(CpuProbe::new(config.cpu_load_percent)),
        ];
        if config.external_api.enabled {
            probes.push(Arc::new(ExternalApiProbe::new(&config.external_api)?));
        }
        Ok(Self::new(probes))
    }

    /// Run every probe concurrently.
    pub async fn run(&self) -> HealthReport {
        self.run_probes(self.probes.iter()).await
    }

    /// Run only the named probes, in declaration order.
    pub async fn run_only(&self, names: &[&str]) -> HealthReport {
        self.run_probes(
            self.probes
                .iter()
                .filter(|p| names.iter().any(|name| *name == p.name())),
        )
        .await
    }

    async fn run_probes<'a>(&self, probes: impl Iterator<Item = &'a Arc<dyn HealthProbe>>) -> HealthReport {
        let results = join_all(probes.map(|probe| async move {
            let name = probe.name().to_string();
            let result = match probe.check().await {
                Ok(result) => result,
                Err(err) => {
                    error!("Health check {} failed: {:#}", name, err);
                    CheckResult::error(format!("Check failed: {}", err))
                }
            };
            (name, result)
        }))
        .await;

        let report = HealthReport::aggregate(results);
        if !report.is_healthy() {
            warn!(
                "Health report unhealthy: {} of {} checks failed",
                report.summary.failed, report.summary.total
            );
        }
        report
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Probe returning a canned status, or an error when `status` is `None`
    pub struct FixedProbe {
        pub name: &'static str,
        pub status: Option<CheckStatus>,
    }

    #[async_trait]
    impl HealthProbe for FixedProbe {
        fn name(&self) -> &str {
            self.name
        }

        async fn check(&self) -> anyhow::Result<CheckResult> {
            match self.status {
                Some(status) => Ok(CheckResult::new(status, format!("{} is {}", self.name, status.as_str()))),
                None => anyhow::bail!("{} exploded", self.name),
            }
        }
    }

    pub fn service(statuses: &[(&'static str, Option<CheckStatus>)]) -> HealthService {
        HealthService::new(
            statuses
                .iter()
                .map(|&(name, status)| Arc::new(FixedProbe { name, status }) as Arc<dyn HealthProbe>)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::testing::service;
    use super::*;

    const NAMES: [&str; 6] = ["database", "cache", "disk_space", "memory", "cpu", "external_apis"];

    #[tokio::test]
    async fn test_single_warning_keeps_service_healthy() {
        let mut probes: Vec<_> = NAMES.iter().map(|n| (*n, Some(CheckStatus::Healthy))).collect();
        probes[5].1 = Some(CheckStatus::Warning);

        let report = service(&probes).run().await;
        assert_eq!(report.status, OverallStatus::Healthy);
        assert_eq!(
            report.summary,
            HealthSummary { total: 6, passed: 5, failed: 0, warnings: 1 }
        );
    }

    #[tokio::test]
    async fn test_unhealthy_probe_fails_aggregate() {
        let mut probes: Vec<_> = NAMES.iter().map(|n| (*n, Some(CheckStatus::Healthy))).collect();
        probes[2].1 = Some(CheckStatus::Unhealthy);

        let report = service(&probes).run().await;
        assert_eq!(report.status, OverallStatus::Unhealthy);
        assert_eq!(report.summary.failed, 1);
    }

    #[tokio::test]
    async fn test_probe_error_becomes_error_entry() {
        let report = service(&[("database", Some(CheckStatus::Healthy)), ("cache", None)])
            .run()
            .await;
        let cache = &report.checks["cache"];
        assert_eq!(cache.status, CheckStatus::Error);
        assert!(cache.message.contains("exploded"));
        assert!(!report.is_healthy());
    }

    #[tokio::test]
    async fn test_report_keeps_declaration_order() {
        let probes: Vec<_> = NAMES.iter().map(|n| (*n, Some(CheckStatus::Healthy))).collect();
        let report = service(&probes).run().await;
        let keys: Vec<&str> = report.checks.keys().map(String::as_str).collect();
        assert_eq!(keys, NAMES.to_vec());
    }

    #[tokio::test]
    async fn test_run_only_selects_probes() {
        let report = service(&[("database", Some(CheckStatus::Healthy)), ("cpu", Some(CheckStatus::Unhealthy))])
            .run_only(&["database"])
            .await;
        assert_eq!(report.summary.total, 1);
        assert!(report.is_healthy());
    }

    #[test]
    fn test_critical_band_checked_first() {
        let band = Band::new(80.0, 95.0);
        assert_eq!(classify_above(50.0, band), CheckStatus::Healthy);
        assert_eq!(classify_above(80.0, band), CheckStatus::Healthy);
        assert_eq!(classify_above(85.0, band), CheckStatus::Warning);
        assert_eq!(classify_above(97.0, band), CheckStatus::Unhealthy);

        let disk = Band::new(20.0, 10.0);
        assert_eq!(classify_below(50.0, disk), CheckStatus::Healthy);
        assert_eq!(classify_below(15.0, disk), CheckStatus::Warning);
        assert_eq!(classify_below(5.0, disk), CheckStatus::Unhealthy);
    }

    #[test]
    fn test_metrics_flatten_into_entry() {
        let result = CheckResult::healthy("ok").with_metric("response_time_ms", 1.5);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["response_time_ms"], 1.5);
    }

    #[tokio::test]
    async fn test_default_checks_follow_config() {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        let cache = Arc::new(ResponseCache::default());
        let mut config = HealthConfig::default();
        config.external_api.url = "http://127.0.0.1:9/species".to_string();
        config.external_api.timeout_secs = 1;

        let health = HealthService::with_defaults(db.clone(), cache.clone(), &config).unwrap();
        let report = health.run_only(&["database", "cache", "external_apis"]).await;
        let names: Vec<&str> = report.checks.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["database", "cache", "external_apis"]);
        assert_eq!(report.checks["external_apis"].status, CheckStatus::Warning);
        assert!(report.is_healthy());

        config.external_api.enabled = false;
        let health = HealthService::with_defaults(db, cache, &config).unwrap();
        let report = health.run_only(&["external_apis"]).await;
        assert!(report.checks.is_empty());
    }
}
