//! Dual utilization averages
//!
//! Every grouping carries two utilization figures that answer different
//! questions and must never be swapped:
//!
//! - the *simple* average treats each child as one data point, whatever its size
//! - the *weighted* average is total used over total capacity of the children
//!
//! The same formulas feed both the per-system tenant nodes of the tree and
//! the cross-system [`TenantRollup`]s; only the grouping key differs.

use std::collections::{BTreeMap, BTreeSet};

use crate::hierarchy::{escape_segment, system_node_name};
use crate::models::{HierarchyNode, TenantRollup, NODE_PATH_SEPARATOR};
use crate::tenant::TenantAssignment;
use crate::units::utilization_pct;

/// Summed capacities of a grouping (GiB)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CapacityTotals {
    pub provisioned: f64,
    pub used: f64,
    pub available: f64,
}

impl CapacityTotals {
    pub fn new(provisioned: f64, used: f64, available: f64) -> Self {
        Self {
            provisioned,
            used,
            available,
        }
    }

    pub fn add(&mut self, other: &CapacityTotals) {
        self.provisioned += other.provisioned;
        self.used += other.used;
        self.available += other.available;
    }

    pub fn utilization_pct(&self) -> f64 {
        utilization_pct(self.used, self.provisioned)
    }
}

/// Both averages of one grouping
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UtilizationAverages {
    pub simple_avg_utilization_pct: f64,
    pub weighted_avg_utilization_pct: f64,
}

/// Unweighted mean of child utilization percentages; 0 for no children
pub fn simple_average(child_utilizations: &[f64]) -> f64 {
    if child_utilizations.is_empty() {
        return 0.0;
    }
    child_utilizations.iter().sum::<f64>() / child_utilizations.len() as f64
}

/// Summed used over summed total capacity; 0 when the total is 0
pub fn weighted_average(total_used: f64, total_capacity: f64) -> f64 {
    utilization_pct(total_used, total_capacity)
}

/// Sum the capacities of a set of nodes and compute both averages over them
pub fn aggregate_children(children: &[&HierarchyNode]) -> (CapacityTotals, UtilizationAverages) {
    let mut totals = CapacityTotals::default();
    let mut utilizations = Vec::with_capacity(children.len());

    for child in children {
        totals.add(&CapacityTotals::new(
            child.total_capacity,
            child.used_capacity,
            child.available_capacity,
        ));
        utilizations.push(child.utilization_pct);
    }

    let averages = UtilizationAverages {
        simple_avg_utilization_pct: simple_average(&utilizations),
        weighted_avg_utilization_pct: weighted_average(totals.used, totals.provisioned),
    };
    (totals, averages)
}

/// A pool as seen by the cross-system tenant rollup
#[derive(Debug, Clone, Copy)]
pub struct PoolContribution<'a> {
    pub storage_system: &'a str,
    pub tenant: &'a TenantAssignment,
    pub pool_id: &'a str,
    pub totals: CapacityTotals,
    pub utilization_pct: f64,
}

#[derive(Default)]
struct RollupAccumulator {
    systems: BTreeSet<String>,
    pools: Vec<String>,
    totals: CapacityTotals,
    utilizations: Vec<f64>,
}

/// Aggregate every tenant across all storage systems
///
/// Output is sorted by tenant, with UNKNOWN last.
pub fn tenant_rollups<'a, I>(pools: I) -> Vec<TenantRollup>
where
    I: IntoIterator<Item = PoolContribution<'a>>,
{
    let mut by_tenant: BTreeMap<&TenantAssignment, RollupAccumulator> = BTreeMap::new();

    for pool in pools {
        let acc = by_tenant.entry(pool.tenant).or_default();
        acc.systems.insert(pool.storage_system.to_string());
        acc.pools.push(format!(
            "{}{}{}",
            system_node_name(pool.storage_system),
            NODE_PATH_SEPARATOR,
            escape_segment(pool.pool_id)
        ));
        acc.totals.add(&pool.totals);
        acc.utilizations.push(pool.utilization_pct);
    }

    by_tenant
        .into_iter()
        .map(|(tenant, mut acc)| {
            acc.pools.sort();
            TenantRollup {
                tenant_name: tenant.label().to_string(),
                systems: acc.systems.into_iter().collect(),
                pool_identifiers: acc.pools,
                total_capacity: acc.totals.provisioned,
                used_capacity: acc.totals.used,
                simple_avg_utilization_pct: simple_average(&acc.utilizations),
                weighted_avg_utilization_pct: weighted_average(
                    acc.totals.used,
                    acc.totals.provisioned,
                ),
            }
        })
        .collect()
}
