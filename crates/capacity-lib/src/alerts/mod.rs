//! Threshold classification of pool nodes
//!
//! Each pool lands in at most one of critical or warning; a critical pool
//! that fills up within the urgency window is also listed as urgent.

mod recommendations;

pub use recommendations::{total_savings, RecommendationGenerator};

use std::cmp::Ordering;

use tracing::debug;

use crate::config::EngineConfig;
use crate::forecast::ForecastProjector;
use crate::models::{Alert, AlertSeverity, AlertSummary, DaysUntilFull, HierarchyNode, NodeLevel};

/// Classifies pools into alert buckets
#[derive(Debug, Clone)]
pub struct AlertGenerator {
    critical_pct: f64,
    warning_pct: f64,
    urgent_days: u32,
    projector: ForecastProjector,
}

impl AlertGenerator {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            critical_pct: config.critical_utilization_pct,
            warning_pct: config.warning_utilization_pct,
            urgent_days: config.urgent_days_threshold,
            projector: ForecastProjector::from_config(config),
        }
    }

    /// Severities a pool qualifies for, most severe bucket first
    pub fn classify(&self, utilization_pct: f64, days_until_full: DaysUntilFull) -> Vec<AlertSeverity> {
        if utilization_pct > self.critical_pct {
            let mut severities = vec![AlertSeverity::Critical];
            if days_until_full.is_within(self.urgent_days) {
                severities.push(AlertSeverity::Urgent);
            }
            severities
        } else if utilization_pct > self.warning_pct {
            vec![AlertSeverity::Warning]
        } else {
            Vec::new()
        }
    }

    /// Classify every pool node; each group is sorted by utilization, highest first
    pub fn generate(&self, nodes: &[HierarchyNode]) -> AlertSummary {
        let mut summary = AlertSummary::default();

        for pool in nodes.iter().filter(|n| n.level == NodeLevel::Pool) {
            let days = self.projector.days_until_full(pool.utilization_pct);
            for severity in self.classify(pool.utilization_pct, days) {
                let alert = Alert {
                    severity,
                    pool_name: pool.name.clone(),
                    storage_system_name: pool.storage_system.clone(),
                    utilization_pct: pool.utilization_pct,
                    estimated_days_until_full: days,
                };
                match severity {
                    AlertSeverity::Critical => summary.critical.push(alert),
                    AlertSeverity::Warning => summary.warning.push(alert),
                    AlertSeverity::Urgent => summary.urgent.push(alert),
                }
            }
        }

        for group in [
            &mut summary.critical,
            &mut summary.warning,
            &mut summary.urgent,
        ] {
            group.sort_by(by_utilization_desc);
        }
        summary.critical_count = summary.critical.len();
        summary.warning_count = summary.warning.len();
        summary.urgent_count = summary.urgent.len();

        debug!(
            critical = summary.critical_count,
            warning = summary.warning_count,
            urgent = summary.urgent_count,
            "Pool alerts classified"
        );
        summary
    }
}

impl Default for AlertGenerator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

fn by_utilization_desc(a: &Alert, b: &Alert) -> Ordering {
    b.utilization_pct
        .partial_cmp(&a.utilization_pct)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.pool_name.cmp(&b.pool_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(name: &str, utilization: f64) -> HierarchyNode {
        HierarchyNode {
            name: name.to_string(),
            label: name.to_string(),
            parent_name: "sys|t".to_string(),
            level: NodeLevel::Pool,
            storage_system: "sys".to_string(),
            total_capacity: 1000.0,
            used_capacity: utilization * 10.0,
            available_capacity: 1000.0 - utilization * 10.0,
            utilization_pct: utilization,
            simple_avg_utilization_pct: utilization,
            weighted_avg_utilization_pct: utilization,
            child_count: 0,
            volume_count: 1,
            data_quality: Vec::new(),
        }
    }

    #[test]
    fn test_threshold_boundaries() {
        let generator = AlertGenerator::default();
        let stable = DaysUntilFull::Stable;

        assert!(generator.classify(70.0, stable).is_empty());
        assert_eq!(generator.classify(70.1, stable), vec![AlertSeverity::Warning]);
        assert_eq!(generator.classify(80.0, stable), vec![AlertSeverity::Warning]);
        assert_eq!(generator.classify(80.1, stable), vec![AlertSeverity::Critical]);
    }

    #[test]
    fn test_urgent_requires_critical() {
        let generator = AlertGenerator::default();
        assert_eq!(
            generator.classify(85.0, DaysUntilFull::Days(10)),
            vec![AlertSeverity::Critical, AlertSeverity::Urgent]
        );
        assert_eq!(
            generator.classify(75.0, DaysUntilFull::Days(10)),
            vec![AlertSeverity::Warning]
        );
        assert_eq!(
            generator.classify(85.0, DaysUntilFull::Days(30)),
            vec![AlertSeverity::Critical]
        );
    }

    #[test]
    fn test_generate_groups_and_counts() {
        let generator = AlertGenerator::default();
        let nodes = vec![
            pool("p-warm", 75.0),
            pool("p-hot", 85.0),
            pool("p-full", 99.5),
            pool("p-cool", 20.0),
        ];

        let summary = generator.generate(&nodes);
        assert_eq!(summary.critical_count, 2);
        assert_eq!(summary.warning_count, 1);
        // 99.5% at 2 pts/month leaves 7 days
        assert_eq!(summary.urgent_count, 1);

        assert_eq!(summary.critical[0].pool_name, "p-full");
        assert_eq!(summary.critical[1].pool_name, "p-hot");
        assert_eq!(summary.urgent[0].estimated_days_until_full, DaysUntilFull::Days(7));
        assert_eq!(summary.warning[0].pool_name, "p-warm");
    }

    #[test]
    fn test_no_pools_no_alerts() {
        let summary = AlertGenerator::default().generate(&[]);
        assert!(summary.is_empty());
        assert_eq!(summary.critical_count, 0);
    }
}
