use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reverb_core::{Cache, HealthReport, Result, ReverbError, ServingStatus};
use tracing::{debug, error};

use crate::stats::StatsTracker;

const PROBE_KEY: &str = "health_check";
const PROBE_TTL: Duration = Duration::from_secs(10);

/// Aggregates a fixed sequence of checks into a single serving status.
/// A failed check surfaces as NOT_SERVING with the failure text; nothing
/// ever propagates out of `evaluate` as an error.
pub struct HealthEvaluator {
    cache: Arc<dyn Cache>,
    stats: Arc<StatsTracker>,
    op_timeout: Duration,
}

impl HealthEvaluator {
    pub fn new(cache: Arc<dyn Cache>, stats: Arc<StatsTracker>, op_timeout: Duration) -> Self {
        Self {
            cache,
            stats,
            op_timeout,
        }
    }

    pub async fn evaluate(&self, include_details: bool) -> HealthReport {
        match self.run_checks(include_details).await {
            Ok(details) => {
                debug!("Health check passed");
                HealthReport {
                    status: ServingStatus::Serving,
                    message: "Service is healthy".into(),
                    details: if include_details {
                        details
                    } else {
                        HashMap::new()
                    },
                }
            }
            Err(e) => {
                error!("Health check failed: {e}");
                HealthReport {
                    status: ServingStatus::NotServing,
                    message: format!("Service is unhealthy: {e}"),
                    details: HashMap::new(),
                }
            }
        }
    }

    async fn run_checks(&self, include_details: bool) -> Result<HashMap<String, String>> {
        let mut checks = HashMap::new();

        checks.insert("memory_usage".into(), resident_memory());

        self.probe_cache().await?;
        checks.insert("cache".into(), "OK".into());

        let snapshot = self.stats.snapshot(false);
        if !snapshot.average_processing_time_ms.is_finite() {
            return Err(ReverbError::HealthCheck(
                "stats average is not a finite number".into(),
            ));
        }
        checks.insert("stats_consistency".into(), "OK".into());

        if include_details {
            checks.insert(
                "uptime".into(),
                format!("{} seconds", snapshot.uptime_seconds),
            );
            checks.insert(
                "server_version".into(),
                env!("CARGO_PKG_VERSION").to_string(),
            );
            checks.insert("runtime".into(), "tokio".into());
        }

        Ok(checks)
    }

    /// Write-then-read round trip against the cache with a short-lived
    /// sentinel. Timeouts count as failures.
    async fn probe_cache(&self) -> Result<()> {
        let set = self
            .cache
            .set(PROBE_KEY, serde_json::json!("ok"), PROBE_TTL);
        tokio::time::timeout(self.op_timeout, set)
            .await
            .map_err(|_| ReverbError::HealthCheck("cache probe write timed out".into()))??;

        let read = tokio::time::timeout(self.op_timeout, self.cache.get(PROBE_KEY))
            .await
            .map_err(|_| ReverbError::HealthCheck("cache probe read timed out".into()))??;

        match read {
            Some(value) if value == serde_json::json!("ok") => Ok(()),
            _ => Err(ReverbError::HealthCheck(
                "cache round trip returned an unexpected value".into(),
            )),
        }
    }
}

fn resident_memory() -> String {
    std::fs::read_to_string("/proc/self/statm")
        .ok()
        .and_then(|s| {
            s.split_whitespace()
                .nth(1)
                .and_then(|pages| pages.parse::<u64>().ok())
        })
        .map(|pages| format!("{} bytes", pages * 4096))
        .unwrap_or_else(|| "unknown".into())
}
