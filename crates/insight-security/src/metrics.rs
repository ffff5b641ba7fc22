//! ---
//! insight_section: "02-access-control"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Role model, credential hashing, and authorization decisions."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use prometheus::{IntCounter, Registry};
use std::sync::Arc;

/// Security metrics exported via Prometheus.
#[derive(Clone)]
pub struct SecurityMetrics {
    registry: Arc<Registry>,
    auth_attempts_total: IntCounter,
    auth_failures_total: IntCounter,
    rbac_denials_total: IntCounter,
}

impl std::fmt::Debug for SecurityMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityMetrics")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityMetricsSnapshot {
    /// Credential verifications attempted.
    pub auth_attempts: u64,
    /// Credential verifications that failed.
    pub auth_failures: u64,
    /// Permission checks that were refused.
    pub rbac_denials: u64,
}

/// Create `name` and register it on `registry` in one step.
pub fn register_counter(
    registry: &Registry,
    name: &str,
    help: &str,
) -> prometheus::Result<IntCounter> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl SecurityMetrics {
    /// Register the credential and permission counters on `registry`.
    /// Fails if they are already registered there.
    pub fn new(registry: Arc<Registry>) -> anyhow::Result<Self> {
        Ok(Self {
            auth_attempts_total: register_counter(
                &registry,
                "insight_auth_attempts_total",
                "Total credential verification attempts",
            )?,
            auth_failures_total: register_counter(
                &registry,
                "insight_auth_failures_total",
                "Failed credential verifications",
            )?,
            rbac_denials_total: register_counter(
                &registry,
                "insight_rbac_denials_total",
                "Access denials due to role permissions",
            )?,
            registry,
        })
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Count one credential verification.
    pub fn inc_auth_attempt(&self) {
        self.auth_attempts_total.inc();
    }

    /// Count one rejected credential.
    pub fn inc_auth_failure(&self) {
        self.auth_failures_total.inc();
    }

    /// Count one refused permission check.
    pub fn inc_rbac_denial(&self) {
        self.rbac_denials_total.inc();
    }

    /// Read current counter values.
    pub fn snapshot(&self) -> SecurityMetricsSnapshot {
        SecurityMetricsSnapshot {
            auth_attempts: self.auth_attempts_total.get(),
            auth_failures: self.auth_failures_total.get(),
            rbac_denials: self.rbac_denials_total.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_attempts_failures_and_denials() {
        let registry = Arc::new(Registry::new());
        let metrics = SecurityMetrics::new(registry.clone()).unwrap();
        metrics.inc_auth_attempt();
        metrics.inc_auth_failure();
        metrics.inc_rbac_denial();
        metrics.inc_rbac_denial();
        let families = registry.gather();
        assert_eq!(families.len(), 3);
        assert_eq!(metrics.snapshot().rbac_denials, 2);
    }

    #[test]
    fn registering_twice_on_one_registry_fails() {
        let registry = Arc::new(Registry::new());
        SecurityMetrics::new(registry.clone()).unwrap();
        assert!(SecurityMetrics::new(registry).is_err());
    }
}
