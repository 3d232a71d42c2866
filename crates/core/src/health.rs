// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health status domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Component health, ranked strictly
/// `Healthy (0) < Degraded (1) < Unhealthy (2) < Unknown (3)`, i.e. unknown is the
/// worst rank — an unrecognized status is treated as worse than any known-bad one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy = 0,
    Degraded = 1,
    Unhealthy = 2,
    Unknown = 3,
}

impl HealthStatus {
    /// Any status string the caller supplies that isn't one of the four
    /// recognized values is treated as `Unknown` (fail-safe).
    pub fn parse_fail_safe(raw: &str) -> Self {
        match raw {
            "healthy" => HealthStatus::Healthy,
            "degraded" => HealthStatus::Degraded,
            "unhealthy" => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
        }
    }
}

/// Per-component health record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

/// Aggregated health snapshot: per-component map plus the worst-rank rollup.
/// An empty map reports `Unknown`/"starting".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub components: HashMap<String, ComponentHealth>,
    pub overall: HealthStatus,
    pub overall_message: String,
}

impl Snapshot {
    pub fn from_components(components: HashMap<String, ComponentHealth>) -> Self {
        if components.is_empty() {
            return Self {
                components,
                overall: HealthStatus::Unknown,
                overall_message: "starting".to_string(),
            };
        }
        let worst = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Unknown);
        Self {
            overall_message: worst.as_str().to_string(),
            components,
            overall: worst,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_outranks_unhealthy() {
        assert!(HealthStatus::Unknown > HealthStatus::Unhealthy);
        assert!(HealthStatus::Unhealthy > HealthStatus::Degraded);
        assert!(HealthStatus::Degraded > HealthStatus::Healthy);
    }

    #[test]
    fn unrecognized_status_string_is_unknown() {
        assert_eq!(HealthStatus::parse_fail_safe("bogus"), HealthStatus::Unknown);
    }

    #[test]
    fn empty_snapshot_is_unknown_starting() {
        let snap = Snapshot::from_components(HashMap::new());
        assert_eq!(snap.overall, HealthStatus::Unknown);
        assert_eq!(snap.overall_message, "starting");
    }

    #[test]
    fn rollup_is_worst_component() {
        let mut map = HashMap::new();
        map.insert(
            "transport".to_string(),
            ComponentHealth {
                status: HealthStatus::Healthy,
                message: "ok".into(),
                updated_at: Utc::now(),
            },
        );
        map.insert(
            "audit".to_string(),
            ComponentHealth {
                status: HealthStatus::Degraded,
                message: "audit disabled".into(),
                updated_at: Utc::now(),
            },
        );
        let snap = Snapshot::from_components(map);
        assert_eq!(snap.overall, HealthStatus::Degraded);
    }
}
