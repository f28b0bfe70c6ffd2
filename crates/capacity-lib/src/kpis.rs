//! Headline figures for the overview page

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use crate::alerts::total_savings;
use crate::models::{
    HierarchyNode, NodeLevel, OverviewKpis, SavingsEntry, SystemCapacity, SystemSavings,
    UtilizationDistribution,
};

/// Number of histogram bins, each 10 points wide
const DISTRIBUTION_BINS: usize = 10;

/// Length of the top-systems and savings lists
const TOP_SYSTEMS: usize = 10;

/// Summarize a built hierarchy
pub fn overview(nodes: &[HierarchyNode], savings: &[SystemSavings]) -> OverviewKpis {
    let root = nodes.iter().find(|n| n.level == NodeLevel::Root);
    let systems: Vec<&HierarchyNode> = nodes
        .iter()
        .filter(|n| n.level == NodeLevel::System)
        .collect();
    let system_ids: HashSet<&str> = systems.iter().map(|n| n.storage_system.as_str()).collect();

    let tenants: BTreeSet<&str> = nodes
        .iter()
        .filter(|n| n.level == NodeLevel::Tenant)
        .map(|n| n.label.as_str())
        .collect();
    let num_pools = nodes.iter().filter(|n| n.level == NodeLevel::Pool).count();

    OverviewKpis {
        total_capacity: root.map(|r| r.total_capacity).unwrap_or(0.0),
        used_capacity: root.map(|r| r.used_capacity).unwrap_or(0.0),
        available_capacity: root.map(|r| r.available_capacity).unwrap_or(0.0),
        total_savings: total_savings(savings, &system_ids),
        provisioned_utilization_pct: root.map(|r| r.weighted_avg_utilization_pct).unwrap_or(0.0),
        num_systems: systems.len(),
        num_tenants: tenants.len(),
        num_pools,
        num_volumes: root.map(|r| r.volume_count).unwrap_or(0),
        utilization_distribution: utilization_distribution(&systems),
        top_systems: top_systems(&systems),
        savings_analysis: savings_analysis(savings, &system_ids),
    }
}

/// Largest systems by total capacity, ties broken by id
pub fn top_systems(systems: &[&HierarchyNode]) -> Vec<SystemCapacity> {
    let mut ranked = systems.to_vec();
    ranked.sort_by(|a, b| {
        b.total_capacity
            .partial_cmp(&a.total_capacity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.storage_system.cmp(&b.storage_system))
    });

    ranked
        .into_iter()
        .take(TOP_SYSTEMS)
        .map(|system| SystemCapacity {
            storage_system: system.storage_system.clone(),
            total_capacity: system.total_capacity,
            used_capacity: system.used_capacity,
            available_capacity: system.available_capacity,
            utilization_pct: system.utilization_pct,
        })
        .collect()
}

/// Systems of the report with positive savings, largest first
pub fn savings_analysis(savings: &[SystemSavings], systems: &HashSet<&str>) -> Vec<SavingsEntry> {
    let mut entries: Vec<SavingsEntry> = savings
        .iter()
        .filter(|s| systems.contains(s.storage_system_id.trim()))
        .filter_map(|s| {
            let saved = s.data_reduction_capacity.filter(|v| *v > 0.0)?;
            Some(SavingsEntry {
                storage_system: s.storage_system_id.trim().to_string(),
                savings: saved,
                compression_ratio: s.compression_ratio.unwrap_or(1.0),
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.savings
            .partial_cmp(&a.savings)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.storage_system.cmp(&b.storage_system))
    });
    entries.truncate(TOP_SYSTEMS);
    entries
}

/// Ten-bin histogram of system utilization; systems without capacity are skipped
pub fn utilization_distribution(systems: &[&HierarchyNode]) -> UtilizationDistribution {
    let bins = (0..DISTRIBUTION_BINS)
        .map(|i| format!("{}-{}%", i * 10, (i + 1) * 10))
        .collect();
    let mut counts = vec![0; DISTRIBUTION_BINS];

    for system in systems.iter().filter(|s| s.total_capacity > 0.0) {
        let bin = (system.utilization_pct.max(0.0) / 10.0) as usize;
        counts[bin.min(DISTRIBUTION_BINS - 1)] += 1;
    }

    UtilizationDistribution { bins, counts }
}
