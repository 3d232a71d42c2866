// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Health Monitor: aggregated per-subsystem status with fail-safe rollup.

use breeze_core::health::{ComponentHealth, HealthStatus, Snapshot};
use breeze_core::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared health registry. `update` and `summary` each take the single
/// internal lock exactly once, so a `summary()` call always observes a
/// consistent cross-component view.
pub struct HealthMonitor {
    clock: Arc<dyn Clock>,
    components: Mutex<HashMap<String, ComponentHealth>>,
}

impl HealthMonitor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            components: Mutex::new(HashMap::new()),
        }
    }

    /// Record a status string from any caller. Unrecognized status strings
    /// rank as [`HealthStatus::Unknown`], which is fail-safe-worse than any
    /// real status.
    pub fn update(&self, component: impl Into<String>, status_str: &str, message: impl Into<String>) {
        let status = HealthStatus::parse_fail_safe(status_str);
        self.update_status(component, status, message);
    }

    pub fn update_status(&self, component: impl Into<String>, status: HealthStatus, message: impl Into<String>) {
        let component = component.into();
        let message = message.into();
        let mut components = self.components.lock();
        let changed = components
            .get(&component)
            .map(|c| c.status != status)
            .unwrap_or(true);
        if changed {
            tracing::info!(component = %component, status = status.as_str(), "health transition");
        }
        components.insert(
            component,
            ComponentHealth {
                status,
                message,
                updated_at: self.clock.now(),
            },
        );
    }

    pub fn summary(&self) -> Snapshot {
        let components = self.components.lock().clone();
        Snapshot::from_components(components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breeze_core::FakeClock;
    use chrono::Utc;

    fn monitor() -> HealthMonitor {
        HealthMonitor::new(Arc::new(FakeClock::new(Utc::now())))
    }

    #[test]
    fn empty_monitor_reports_unknown() {
        let monitor = monitor();
        let snap = monitor.summary();
        assert_eq!(snap.overall, HealthStatus::Unknown);
    }

    #[test]
    fn worst_component_wins_rollup() {
        let monitor = monitor();
        monitor.update("transport", "healthy", "connected");
        monitor.update("audit", "degraded", "init failed");
        let snap = monitor.summary();
        assert_eq!(snap.overall, HealthStatus::Degraded);
    }

    #[test]
    fn unrecognized_status_string_fails_safe_to_unhealthy_or_worse() {
        let monitor = monitor();
        monitor.update("transport", "healthy", "connected");
        monitor.update("weird", "made-up-status", "???");
        let snap = monitor.summary();
        assert!(snap.overall >= HealthStatus::Unhealthy);
    }

    #[test]
    fn update_overwrites_previous_status_for_same_component() {
        let monitor = monitor();
        monitor.update("transport", "unhealthy", "disconnected");
        monitor.update("transport", "healthy", "reconnected");
        let snap = monitor.summary();
        assert_eq!(snap.components["transport"].status, HealthStatus::Healthy);
    }
}
