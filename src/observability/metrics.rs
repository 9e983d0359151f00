//! Metrics registry for docpilot
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase
//! - Reset only on process start
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Pipeline counters
///
/// # Thread Safety
///
/// All counters use atomic operations with Relaxed ordering; readers may
/// see counters from slightly different instants.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Plans that passed normalization and safety validation
    plans_generated: AtomicU64,
    /// Plans rejected by normalization or safety validation
    plans_rejected: AtomicU64,
    /// Successful executions
    executions: AtomicU64,
    /// Failed executions
    execution_failures: AtomicU64,
    /// Requests turned away by the rate limiter
    rate_limited: AtomicU64,
    /// Failed calls to the language-model endpoint
    upstream_failures: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_plans_generated(&self) {
        self.plans_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_plans_rejected(&self) {
        self.plans_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_executions(&self) {
        self.executions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_execution_failures(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_upstream_failures(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            plans_generated: self.plans_generated.load(Ordering::Relaxed),
            plans_rejected: self.plans_rejected.load(Ordering::Relaxed),
            executions: self.executions.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub plans_generated: u64,
    pub plans_rejected: u64,
    pub executions: u64,
    pub execution_failures: u64,
    pub rate_limited: u64,
    pub upstream_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();

        registry.increment_plans_generated();
        registry.increment_plans_generated();
        registry.increment_plans_rejected();
        registry.increment_executions();
        registry.increment_execution_failures();
        registry.increment_rate_limited();
        registry.increment_upstream_failures();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.plans_generated, 2);
        assert_eq!(snapshot.plans_rejected, 1);
        assert_eq!(snapshot.executions, 1);
        assert_eq!(snapshot.execution_failures, 1);
        assert_eq!(snapshot.rate_limited, 1);
        assert_eq!(snapshot.upstream_failures, 1);
    }

    #[test]
    fn test_snapshot_serializes_flat() {
        let registry = MetricsRegistry::new();
        registry.increment_executions();

        let parsed = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(parsed["executions"], 1);
        assert_eq!(parsed["rate_limited"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let reg = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    reg.increment_plans_generated();
                    reg.increment_executions();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.plans_generated, 1000);
        assert_eq!(snapshot.executions, 1000);
    }
}
