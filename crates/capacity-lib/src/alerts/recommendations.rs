//! Short operator recommendations derived from a finished report
//!
//! Nothing here is persisted; recommendations are rebuilt on every call.

use std::collections::HashSet;

use tracing::debug;

use crate::config::EngineConfig;
use crate::models::{
    AlertSummary, HierarchyNode, NodeLevel, Recommendation, RecommendationCategory,
    RecommendationSeverity, SystemSavings,
};
use crate::units::format_gib;

/// Pools named in the urgent-action details
const MAX_URGENT_DETAILS: usize = 3;

#[derive(Debug, Clone)]
pub struct RecommendationGenerator {
    urgent_days: u32,
    low_utilization_pct: f64,
    savings_ratio_threshold: f64,
    expansion_fraction: f64,
}

impl RecommendationGenerator {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            urgent_days: config.urgent_days_threshold,
            low_utilization_pct: config.low_utilization_pct,
            savings_ratio_threshold: config.savings_ratio_threshold,
            expansion_fraction: config.expansion_fraction,
        }
    }

    /// Build recommendations for one report
    ///
    /// An empty hierarchy (root only) yields no recommendations at all.
    pub fn generate(
        &self,
        nodes: &[HierarchyNode],
        alerts: &AlertSummary,
        savings: &[SystemSavings],
    ) -> Vec<Recommendation> {
        let Some(root) = nodes.iter().find(|n| n.level == NodeLevel::Root) else {
            return Vec::new();
        };
        if nodes.len() == 1 {
            return Vec::new();
        }

        let mut recommendations = Vec::new();
        recommendations.extend(self.urgent_action(nodes, alerts));
        recommendations.extend(self.efficiency_opportunity(nodes));
        recommendations.extend(self.savings_achieved(root, nodes, savings));

        if recommendations.is_empty() {
            recommendations.push(Recommendation {
                category: RecommendationCategory::AllNormal,
                severity: RecommendationSeverity::Success,
                title: "All systems normal".to_string(),
                message: "No immediate actions required. All systems operating normally."
                    .to_string(),
                details: Vec::new(),
            });
        }

        debug!(
            recommendations = recommendations.len(),
            "Recommendations generated"
        );
        recommendations
    }

    fn urgent_action(
        &self,
        nodes: &[HierarchyNode],
        alerts: &AlertSummary,
    ) -> Option<Recommendation> {
        if alerts.urgent.is_empty() {
            return None;
        }

        let details = alerts
            .urgent
            .iter()
            .take(MAX_URGENT_DETAILS)
            .map(|alert| {
                let capacity = nodes
                    .iter()
                    .find(|n| n.name == alert.pool_name)
                    .map(|n| n.total_capacity)
                    .unwrap_or(0.0);
                format!(
                    "{}: add ~{} to extend runway ({} days left at {:.1}%)",
                    alert.pool_name,
                    format_gib(capacity * self.expansion_fraction),
                    alert.estimated_days_until_full,
                    alert.utilization_pct
                )
            })
            .collect();

        Some(Recommendation {
            category: RecommendationCategory::UrgentAction,
            severity: RecommendationSeverity::Danger,
            title: "Urgent action required".to_string(),
            message: format!(
                "{} pools will reach capacity in < {} days",
                alerts.urgent.len(),
                self.urgent_days
            ),
            details,
        })
    }

    fn efficiency_opportunity(&self, nodes: &[HierarchyNode]) -> Option<Recommendation> {
        let low: Vec<&HierarchyNode> = nodes
            .iter()
            .filter(|n| {
                n.level == NodeLevel::System
                    && n.total_capacity > 0.0
                    && n.utilization_pct < self.low_utilization_pct
            })
            .collect();
        if low.is_empty() {
            return None;
        }

        let reclaimable: f64 = low.iter().map(|n| n.available_capacity).sum();
        Some(Recommendation {
            category: RecommendationCategory::EfficiencyOpportunity,
            severity: RecommendationSeverity::Info,
            title: "Efficiency opportunity".to_string(),
            message: format!(
                "{} systems have < {:.0}% utilization",
                low.len(),
                self.low_utilization_pct
            ),
            details: vec![
                format!(
                    "Underused systems: {}",
                    low.iter()
                        .map(|n| n.label.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                "Consolidate workloads to reduce hardware footprint".to_string(),
                format!("Potential to reclaim ~{}", format_gib(reclaimable)),
            ],
        })
    }

    fn savings_achieved(
        &self,
        root: &HierarchyNode,
        nodes: &[HierarchyNode],
        savings: &[SystemSavings],
    ) -> Option<Recommendation> {
        let systems: HashSet<&str> = nodes
            .iter()
            .filter(|n| n.level == NodeLevel::System)
            .map(|n| n.storage_system.as_str())
            .collect();
        let total_savings = total_savings(savings, &systems);

        if total_savings <= 0.0 || root.total_capacity <= 0.0 {
            return None;
        }
        let ratio = total_savings / root.total_capacity;
        if ratio <= self.savings_ratio_threshold {
            return None;
        }

        Some(Recommendation {
            category: RecommendationCategory::SavingsAchieved,
            severity: RecommendationSeverity::Success,
            title: "Savings achieved".to_string(),
            message: format!(
                "Storage efficiency features saved {}",
                format_gib(total_savings)
            ),
            details: vec![
                format!("This represents {:.1}% of total capacity", ratio * 100.0),
                "Keep compression and deduplication enabled for continued savings".to_string(),
            ],
        })
    }
}

impl Default for RecommendationGenerator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Data-reduction savings of the systems present in a report
pub fn total_savings(savings: &[SystemSavings], systems: &HashSet<&str>) -> f64 {
    savings
        .iter()
        .filter(|s| systems.contains(s.storage_system_id.trim()))
        .filter_map(|s| s.data_reduction_capacity)
        .filter(|v| *v > 0.0)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Alert, AlertSeverity, DaysUntilFull};

    fn node(name: &str, level: NodeLevel, total: f64, used: f64) -> HierarchyNode {
        HierarchyNode {
            name: name.to_string(),
            label: name.rsplit('|').next().unwrap_or(name).to_string(),
            parent_name: String::new(),
            storage_system: match level {
                NodeLevel::Root => String::new(),
                _ => name.split('|').next().unwrap_or(name).to_string(),
            },
            level,
            total_capacity: total,
            used_capacity: used,
            available_capacity: total - used,
            utilization_pct: if total > 0.0 { used / total * 100.0 } else { 0.0 },
            simple_avg_utilization_pct: 0.0,
            weighted_avg_utilization_pct: 0.0,
            child_count: 0,
            volume_count: 0,
            data_quality: Vec::new(),
        }
    }

    fn savings(system: &str, gib: f64) -> SystemSavings {
        SystemSavings {
            storage_system_id: system.to_string(),
            data_reduction_capacity: Some(gib),
            compression_ratio: None,
        }
    }

    #[test]
    fn test_root_only_has_no_recommendations() {
        let nodes = vec![node("All Storage", NodeLevel::Root, 0.0, 0.0)];
        let recs = RecommendationGenerator::default().generate(&nodes, &AlertSummary::default(), &[]);
        assert!(recs.is_empty());
    }

    #[test]
    fn test_all_normal_when_nothing_fires() {
        let nodes = vec![
            node("All Storage", NodeLevel::Root, 1000.0, 500.0),
            node("sys-1", NodeLevel::System, 1000.0, 500.0),
        ];
        let recs = RecommendationGenerator::default().generate(&nodes, &AlertSummary::default(), &[]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].category, RecommendationCategory::AllNormal);
        assert_eq!(recs[0].severity, RecommendationSeverity::Success);
    }

    #[test]
    fn test_low_utilization_system_is_reported() {
        let nodes = vec![
            node("All Storage", NodeLevel::Root, 3000.0, 1700.0),
            node("sys-1", NodeLevel::System, 2000.0, 1500.0),
            node("sys-2", NodeLevel::System, 1000.0, 200.0),
        ];
        let recs = RecommendationGenerator::default().generate(&nodes, &AlertSummary::default(), &[]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].category, RecommendationCategory::EfficiencyOpportunity);
        assert!(recs[0].details[0].contains("sys-2"));
        assert!(recs[0].details[2].contains("800.00 GiB"));
    }

    #[test]
    fn test_urgent_pools_listed_with_expansion() {
        let nodes = vec![
            node("All Storage", NodeLevel::Root, 1000.0, 995.0),
            node("sys-1", NodeLevel::System, 1000.0, 995.0),
            node("sys-1|t|p1", NodeLevel::Pool, 1000.0, 995.0),
        ];
        let alert = Alert {
            severity: AlertSeverity::Urgent,
            pool_name: "sys-1|t|p1".to_string(),
            storage_system_name: "sys-1".to_string(),
            utilization_pct: 99.5,
            estimated_days_until_full: DaysUntilFull::Days(7),
        };
        let alerts = AlertSummary {
            urgent_count: 1,
            urgent: vec![alert],
            ..AlertSummary::default()
        };

        let recs = RecommendationGenerator::default().generate(&nodes, &alerts, &[]);
        assert_eq!(recs[0].category, RecommendationCategory::UrgentAction);
        assert_eq!(recs[0].severity, RecommendationSeverity::Danger);
        assert!(recs[0].details[0].contains("300.00 GiB"));
        assert!(recs.iter().all(|r| r.category != RecommendationCategory::AllNormal));
    }

    #[test]
    fn test_savings_only_count_reported_systems() {
        let nodes = vec![
            node("All Storage", NodeLevel::Root, 1000.0, 500.0),
            node("sys-1", NodeLevel::System, 1000.0, 500.0),
        ];
        let recs = RecommendationGenerator::default().generate(
            &nodes,
            &AlertSummary::default(),
            &[savings("sys-1", 100.0), savings("sys-9", 5000.0)],
        );
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].category, RecommendationCategory::SavingsAchieved);
        assert!(recs[0].message.contains("100.00 GiB"));
        assert!(recs[0].details[0].contains("10.0%"));
    }

    #[test]
    fn test_savings_below_threshold_are_ignored() {
        let mut config = EngineConfig::default();
        config.savings_ratio_threshold = 0.2;
        let nodes = vec![
            node("All Storage", NodeLevel::Root, 1000.0, 500.0),
            node("sys-1", NodeLevel::System, 1000.0, 500.0),
        ];
        let recs = RecommendationGenerator::from_config(&config).generate(
            &nodes,
            &AlertSummary::default(),
            &[savings("sys-1", 100.0)],
        );
        assert_eq!(recs[0].category, RecommendationCategory::AllNormal);
    }
}
