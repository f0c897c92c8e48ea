//! Liveness Service
//!
//! Probes the store and the cache side by side and folds both outcomes into
//! one report. Probe failures are part of the report, never an error.

use std::sync::Arc;
use std::time::Duration;

use jotter_core::{
    DependencyUnavailable, HealthStatus, LivenessProbe, LivenessReport, ProbeOutcome,
};

/// Longest a single backend may take to answer a liveness check.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Liveness orchestrator.
pub struct LivenessInteractor {
    store_probe: Arc<dyn LivenessProbe>,
    cache_probe: Arc<dyn LivenessProbe>,
    check_timeout: Duration,
}

impl LivenessInteractor {
    pub fn new(store_probe: Arc<dyn LivenessProbe>, cache_probe: Arc<dyn LivenessProbe>) -> Self {
        Self {
            store_probe,
            cache_probe,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }

    /// Override the per-backend bound. A backend that has not answered by
    /// then is reported unavailable.
    pub fn with_check_timeout(mut self, check_timeout: Duration) -> Self {
        self.check_timeout = check_timeout;
        self
    }

    async fn ping_bounded(&self, backend: &dyn LivenessProbe) -> Result<(), DependencyUnavailable> {
        tokio::time::timeout(self.check_timeout, backend.ping())
            .await
            .unwrap_or_else(|_| {
                Err(DependencyUnavailable::new(format!(
                    "timed out after {:?}",
                    self.check_timeout
                )))
            })
    }

    /// Run both probes concurrently. Neither outcome gates the other.
    pub async fn check(&self) -> LivenessReport {
        let (store, cache) = tokio::join!(
            self.ping_bounded(self.store_probe.as_ref()),
            self.ping_bounded(self.cache_probe.as_ref())
        );

        let report = LivenessReport::from_outcomes(
            &ProbeOutcome::new(self.store_probe.name(), store),
            &ProbeOutcome::new(self.cache_probe.name(), cache),
        );

        match report.status() {
            HealthStatus::Healthy => tracing::debug!("all backends available"),
            status => tracing::warn!(?status, message = %report.message, "backend unavailable"),
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jotter_test_utils::{SilentLiveness, StaticProbe};

    async fn check(store: StaticProbe, cache: StaticProbe) -> LivenessReport {
        LivenessInteractor::new(Arc::new(store), Arc::new(cache))
            .check()
            .await
    }

    #[tokio::test]
    async fn test_all_available() {
        let report = check(StaticProbe::up("PostgreSQL"), StaticProbe::up("Redis")).await;
        assert_eq!(report.message, "All services are available");
        assert!(report.store_available && report.cache_available);
    }

    #[tokio::test]
    async fn test_cache_down() {
        let report = check(
            StaticProbe::up("PostgreSQL"),
            StaticProbe::down("Redis", "dial tcp: connection refused"),
        )
        .await;
        assert!(report.store_available);
        assert!(!report.cache_available);
        assert_eq!(
            report.message,
            "PostgreSQL is available, Redis is not: dial tcp: connection refused"
        );
    }

    #[tokio::test]
    async fn test_store_down() {
        let report = check(
            StaticProbe::down("PostgreSQL", "timed out"),
            StaticProbe::up("Redis"),
        )
        .await;
        assert!(!report.store_available);
        assert!(report.cache_available);
        assert_eq!(report.message, "Redis is available, PostgreSQL is not: timed out");
    }

    #[tokio::test]
    async fn test_both_down() {
        let report = check(
            StaticProbe::down("PostgreSQL", "timed out"),
            StaticProbe::down("Redis", "refused"),
        )
        .await;
        assert_eq!(
            report.message,
            "Both services are unavailable. PostgreSQL: timed out, Redis: refused"
        );
        assert_eq!(report.status(), HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_failed_store_probe_does_not_skip_cache_probe() {
        let store = Arc::new(StaticProbe::down("PostgreSQL", "timed out"));
        let cache = Arc::new(StaticProbe::up("Redis"));
        let liveness = LivenessInteractor::new(store.clone(), cache.clone());

        liveness.check().await;

        assert_eq!(store.calls(), 1);
        assert_eq!(cache.calls(), 1);
    }

    #[tokio::test]
    async fn test_silent_store_reported_as_timed_out() {
        let liveness = LivenessInteractor::new(
            Arc::new(SilentLiveness::new("PostgreSQL")),
            Arc::new(StaticProbe::up("Redis")),
        )
        .with_check_timeout(Duration::from_millis(50));

        let report = tokio::time::timeout(Duration::from_secs(5), liveness.check())
            .await
            .expect("check must finish even when a backend never answers");

        assert!(!report.store_available);
        assert!(report.cache_available);
        assert_eq!(
            report.message,
            "Redis is available, PostgreSQL is not: timed out after 50ms"
        );
    }

    #[tokio::test]
    async fn test_both_silent_reported_as_unavailable() {
        let liveness = LivenessInteractor::new(
            Arc::new(SilentLiveness::new("PostgreSQL")),
            Arc::new(SilentLiveness::new("Redis")),
        )
        .with_check_timeout(Duration::from_millis(50));

        let report = tokio::time::timeout(Duration::from_secs(5), liveness.check())
            .await
            .expect("check must finish even when no backend answers");

        assert_eq!(
            report.message,
            "Both services are unavailable. PostgreSQL: timed out after 50ms, Redis: timed out after 50ms"
        );
        assert_eq!(report.status(), HealthStatus::Unhealthy);
    }
}
