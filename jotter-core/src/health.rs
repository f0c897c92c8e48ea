//! Liveness aggregation
//!
//! Combines the outcomes of the store and cache probes into the payload
//! returned by `Ping`. Unavailability is data here, never an error.

use crate::error::DependencyUnavailable;

/// Health status for the service as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    /// Every backend answered
    Healthy,
    /// One backend answered
    Degraded,
    /// No backend answered
    Unhealthy,
}

/// Result of running a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub name: String,
    pub result: Result<(), DependencyUnavailable>,
}

impl ProbeOutcome {
    pub fn new(name: impl Into<String>, result: Result<(), DependencyUnavailable>) -> Self {
        Self {
            name: name.into(),
            result,
        }
    }

    pub fn is_available(&self) -> bool {
        self.result.is_ok()
    }

    fn error_text(&self) -> String {
        match &self.result {
            Ok(()) => String::new(),
            Err(err) => err.to_string(),
        }
    }
}

/// Combined store/cache availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessReport {
    pub store_available: bool,
    pub cache_available: bool,
    pub message: String,
}

impl LivenessReport {
    /// Apply the fixed four-way message table.
    pub fn from_outcomes(store: &ProbeOutcome, cache: &ProbeOutcome) -> Self {
        let store_available = store.is_available();
        let cache_available = cache.is_available();

        let message = match (store_available, cache_available) {
            (true, true) => "All services are available".to_string(),
            (true, false) => format!(
                "{} is available, {} is not: {}",
                store.name,
                cache.name,
                cache.error_text()
            ),
            (false, true) => format!(
                "{} is available, {} is not: {}",
                cache.name,
                store.name,
                store.error_text()
            ),
            (false, false) => format!(
                "Both services are unavailable. {}: {}, {}: {}",
                store.name,
                store.error_text(),
                cache.name,
                cache.error_text()
            ),
        };

        Self {
            store_available,
            cache_available,
            message,
        }
    }

    pub fn status(&self) -> HealthStatus {
        match (self.store_available, self.cache_available) {
            (true, true) => HealthStatus::Healthy,
            (false, false) => HealthStatus::Unhealthy,
            _ => HealthStatus::Degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn up(name: &str) -> ProbeOutcome {
        ProbeOutcome::new(name, Ok(()))
    }

    fn down(name: &str, reason: &str) -> ProbeOutcome {
        ProbeOutcome::new(name, Err(DependencyUnavailable::new(reason)))
    }

    #[test]
    fn test_both_up() {
        let report = LivenessReport::from_outcomes(&up("PostgreSQL"), &up("Redis"));
        assert!(report.store_available);
        assert!(report.cache_available);
        assert_eq!(report.message, "All services are available");
        assert_eq!(report.status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_store_up_cache_down() {
        let report = LivenessReport::from_outcomes(
            &up("PostgreSQL"),
            &down("Redis", "connection refused"),
        );
        assert!(report.store_available);
        assert!(!report.cache_available);
        assert_eq!(
            report.message,
            "PostgreSQL is available, Redis is not: connection refused"
        );
        assert_eq!(report.status(), HealthStatus::Degraded);
    }

    #[test]
    fn test_store_down_cache_up() {
        let report = LivenessReport::from_outcomes(
            &down("PostgreSQL", "pool timed out"),
            &up("Redis"),
        );
        assert!(!report.store_available);
        assert!(report.cache_available);
        assert_eq!(
            report.message,
            "Redis is available, PostgreSQL is not: pool timed out"
        );
        assert_eq!(report.status(), HealthStatus::Degraded);
    }

    #[test]
    fn test_both_down() {
        let report = LivenessReport::from_outcomes(
            &down("PostgreSQL", "pool timed out"),
            &down("Redis", "connection refused"),
        );
        assert_eq!(
            report.message,
            "Both services are unavailable. PostgreSQL: pool timed out, Redis: connection refused"
        );
        assert_eq!(report.status(), HealthStatus::Unhealthy);
    }
}
