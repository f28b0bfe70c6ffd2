//! Pool → tenant → system → root rollup
//!
//! Records are grouped once by `(system, tenant, pool)`. Higher levels are
//! summed from the nodes directly below them, so every parent's capacity is
//! the sum of its children by construction.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::averaging::{aggregate_children, simple_average, CapacityTotals, PoolContribution};
use crate::models::{HierarchyNode, NodeLevel, VolumeRecord, NODE_PATH_SEPARATOR, ROOT_NODE_NAME};
use crate::quality::{check_capacity_consistency, CapacityTolerance};
use crate::tenant::{normalize_identifier, TenantAssignment, TenantResolver};
use crate::units::utilization_pct;

const BLANK_SYSTEM_NODE_NAME: &str = "\\(blank)";

/// Grouping key of a pool node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey {
    pub storage_system: String,
    pub tenant: TenantAssignment,
    pub pool_id: String,
}

impl PoolKey {
    pub fn tenant_node_name(&self) -> String {
        tenant_node_name(&self.storage_system, &self.tenant)
    }

    pub fn pool_node_name(&self) -> String {
        format!(
            "{}{}{}",
            self.tenant_node_name(),
            NODE_PATH_SEPARATOR,
            escape_segment(&self.pool_id)
        )
    }
}

/// Escape one identifier for use inside a path-qualified node name
///
/// Backslashes and separators are prefixed with a backslash, so joining
/// escaped segments never produces the same name for two different paths.
pub fn escape_segment(id: &str) -> Cow<'_, str> {
    if !id.contains(|c| c == '\\' || c == NODE_PATH_SEPARATOR) {
        return Cow::Borrowed(id);
    }
    let mut escaped = String::with_capacity(id.len() + 2);
    for c in id.chars() {
        if c == '\\' || c == NODE_PATH_SEPARATOR {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}

/// Node name of a storage system
///
/// Reserved names start with a lone backslash, which no escaped segment can
/// start with. A system id equal to the root name keeps its text behind that
/// backslash; a blank id gets a fixed placeholder so no non-root node has an
/// empty name.
pub fn system_node_name(storage_system: &str) -> String {
    let segment = escape_segment(storage_system);
    if segment.is_empty() {
        BLANK_SYSTEM_NODE_NAME.to_string()
    } else if segment == ROOT_NODE_NAME {
        format!("\\{}", segment)
    } else {
        segment.into_owned()
    }
}

fn tenant_node_name(storage_system: &str, tenant: &TenantAssignment) -> String {
    format!(
        "{}{}{}",
        system_node_name(storage_system),
        NODE_PATH_SEPARATOR,
        escape_segment(tenant.label())
    )
}

/// Accumulated records of one pool
#[derive(Debug, Clone)]
pub struct PoolGroup {
    pub key: PoolKey,
    pub totals: CapacityTotals,
    /// Each record's own used/provisioned percentage
    pub record_utilizations: Vec<f64>,
    pub all_fields_present: bool,
}

impl PoolGroup {
    fn new(key: PoolKey) -> Self {
        Self {
            key,
            totals: CapacityTotals::default(),
            record_utilizations: Vec::new(),
            all_fields_present: true,
        }
    }

    fn add_record(&mut self, record: &VolumeRecord) {
        let provisioned = record.provisioned_capacity.unwrap_or(0.0);
        let used = record.used_capacity.unwrap_or(0.0);
        let available = record.available_capacity.unwrap_or(0.0);

        self.totals.add(&CapacityTotals::new(provisioned, used, available));
        self.record_utilizations.push(utilization_pct(used, provisioned));
        self.all_fields_present &= record.is_complete();
    }

    pub fn volume_count(&self) -> usize {
        self.record_utilizations.len()
    }

    pub fn utilization_pct(&self) -> f64 {
        self.totals.utilization_pct()
    }

    pub fn contribution(&self) -> PoolContribution<'_> {
        PoolContribution {
            storage_system: &self.key.storage_system,
            tenant: &self.key.tenant,
            pool_id: &self.key.pool_id,
            totals: self.totals,
            utilization_pct: self.utilization_pct(),
        }
    }
}

/// Output of a hierarchy build
#[derive(Debug, Clone)]
pub struct Hierarchy {
    /// Root first, then each system followed depth-first by its subtree
    pub nodes: Vec<HierarchyNode>,
    /// Pool groups in node order, for cross-system rollups
    pub pools: Vec<PoolGroup>,
}

impl Hierarchy {
    pub fn root(&self) -> &HierarchyNode {
        // The builder always emits the root first
        &self.nodes[0]
    }

    pub fn nodes_at(&self, level: NodeLevel) -> impl Iterator<Item = &HierarchyNode> {
        self.nodes.iter().filter(move |n| n.level == level)
    }
}

/// Builds the four-level capacity hierarchy
pub struct HierarchyBuilder<'a> {
    resolver: &'a TenantResolver,
    tolerance: CapacityTolerance,
    tenant_filter: Option<&'a str>,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(resolver: &'a TenantResolver) -> Self {
        Self {
            resolver,
            tolerance: CapacityTolerance::default(),
            tenant_filter: None,
        }
    }

    pub fn with_tolerance(mut self, tolerance: CapacityTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Restrict the hierarchy to volumes resolving to one tenant
    pub fn with_tenant_filter(mut self, tenant: Option<&'a str>) -> Self {
        self.tenant_filter = tenant;
        self
    }

    /// Build the hierarchy from one reporting date's records
    pub fn build<'r, I>(&self, records: I) -> Hierarchy
    where
        I: IntoIterator<Item = &'r VolumeRecord>,
    {
        let (mut pools, record_count) = self.group_pools(records);
        pools.sort_by(|a, b| a.key.cmp(&b.key));

        // system -> tenant -> pools, in deterministic order
        let mut grouped: BTreeMap<&str, BTreeMap<&TenantAssignment, Vec<&PoolGroup>>> =
            BTreeMap::new();
        for pool in &pools {
            grouped
                .entry(pool.key.storage_system.as_str())
                .or_default()
                .entry(&pool.key.tenant)
                .or_default()
                .push(pool);
        }

        let mut system_nodes = Vec::with_capacity(grouped.len());
        let mut subtrees = Vec::with_capacity(grouped.len());

        for (system, tenants) in &grouped {
            let system_name = system_node_name(system);
            let mut tenant_nodes = Vec::with_capacity(tenants.len());
            let mut pool_nodes_by_tenant = Vec::with_capacity(tenants.len());

            for (tenant, tenant_pools) in tenants {
                let pool_nodes: Vec<HierarchyNode> = tenant_pools
                    .iter()
                    .map(|pool| self.pool_node(pool))
                    .collect();
                let tenant_node = rollup_node(
                    tenant_node_name(system, tenant),
                    tenant.label().to_string(),
                    system_name.clone(),
                    NodeLevel::Tenant,
                    system,
                    &pool_nodes,
                );
                tenant_nodes.push(tenant_node);
                pool_nodes_by_tenant.push(pool_nodes);
            }

            let system_node = rollup_node(
                system_name,
                system.to_string(),
                ROOT_NODE_NAME.to_string(),
                NodeLevel::System,
                system,
                &tenant_nodes,
            );
            system_nodes.push(system_node);
            subtrees.push((tenant_nodes, pool_nodes_by_tenant));
        }

        let root = rollup_node(
            ROOT_NODE_NAME.to_string(),
            ROOT_NODE_NAME.to_string(),
            String::new(),
            NodeLevel::Root,
            "",
            &system_nodes,
        );

        let mut nodes = Vec::with_capacity(1 + system_nodes.len() + pools.len() * 2);
        nodes.push(root);
        for (system_node, (tenant_nodes, pool_nodes_by_tenant)) in
            system_nodes.into_iter().zip(subtrees)
        {
            nodes.push(system_node);
            for (tenant_node, pool_nodes) in tenant_nodes.into_iter().zip(pool_nodes_by_tenant) {
                nodes.push(tenant_node);
                nodes.extend(pool_nodes);
            }
        }

        debug!(
            records = record_count,
            pools = pools.len(),
            nodes = nodes.len(),
            "Hierarchy built"
        );

        Hierarchy { nodes, pools }
    }

    /// Single pass over the records, accumulating duplicates into one group
    fn group_pools<'r, I>(&self, records: I) -> (Vec<PoolGroup>, usize)
    where
        I: IntoIterator<Item = &'r VolumeRecord>,
    {
        let mut index: HashMap<PoolKey, usize> = HashMap::new();
        let mut groups: Vec<PoolGroup> = Vec::new();
        let mut seen = 0;

        for record in records {
            seen += 1;
            let tenant = self.resolver.resolve(record);
            if let Some(filter) = self.tenant_filter {
                if !tenant.matches_filter(filter) {
                    continue;
                }
            }

            let key = PoolKey {
                storage_system: normalize_identifier(&record.storage_system_id).to_string(),
                tenant,
                pool_id: normalize_identifier(&record.pool_id).to_string(),
            };

            let slot = match index.get(&key) {
                Some(slot) => *slot,
                None => {
                    groups.push(PoolGroup::new(key.clone()));
                    index.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[slot].add_record(record);
        }

        if self.tenant_filter.is_some() {
            // Filtered views omit anything left without capacity
            groups.retain(|group| group.totals.provisioned > 0.0);
        }

        (groups, seen)
    }

    fn pool_node(&self, pool: &PoolGroup) -> HierarchyNode {
        let name = pool.key.pool_node_name();
        let data_quality = check_capacity_consistency(
            &name,
            pool.totals.provisioned,
            pool.totals.used,
            pool.totals.available,
            pool.all_fields_present,
            &self.tolerance,
        );
        let weighted = pool.utilization_pct();

        HierarchyNode {
            label: pool.key.pool_id.clone(),
            parent_name: pool.key.tenant_node_name(),
            level: NodeLevel::Pool,
            storage_system: pool.key.storage_system.clone(),
            total_capacity: pool.totals.provisioned,
            used_capacity: pool.totals.used,
            available_capacity: pool.totals.available,
            utilization_pct: weighted,
            simple_avg_utilization_pct: simple_average(&pool.record_utilizations),
            weighted_avg_utilization_pct: weighted,
            child_count: 0,
            volume_count: pool.volume_count(),
            data_quality,
            name,
        }
    }
}

/// Build a parent node from its immediate children
fn rollup_node(
    name: String,
    label: String,
    parent_name: String,
    level: NodeLevel,
    storage_system: &str,
    children: &[HierarchyNode],
) -> HierarchyNode {
    let refs: Vec<&HierarchyNode> = children.iter().collect();
    let (totals, averages) = aggregate_children(&refs);

    HierarchyNode {
        name,
        label,
        parent_name,
        level,
        storage_system: storage_system.to_string(),
        total_capacity: totals.provisioned,
        used_capacity: totals.used,
        available_capacity: totals.available,
        utilization_pct: averages.weighted_avg_utilization_pct,
        simple_avg_utilization_pct: averages.simple_avg_utilization_pct,
        weighted_avg_utilization_pct: averages.weighted_avg_utilization_pct,
        child_count: children.len(),
        volume_count: children.iter().map(|c| c.volume_count).sum(),
        data_quality: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::HierarchyIndex;
    use crate::models::TenantMappingEntry;
    use chrono::NaiveDate;

    fn volume(system: &str, pool: &str, provisioned: f64, used: f64, available: f64) -> VolumeRecord {
        VolumeRecord {
            pool_id: pool.to_string(),
            storage_system_id: system.to_string(),
            report_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            volume_name: None,
            provisioned_capacity: Some(provisioned),
            used_capacity: Some(used),
            available_capacity: Some(available),
        }
    }

    fn resolver() -> TenantResolver {
        TenantResolver::new(&[TenantMappingEntry {
            pool_id: "p1".to_string(),
            storage_system_id: "s1".to_string(),
            tenant_name: "Ops".to_string(),
        }])
    }

    #[test]
    fn test_empty_records_build_root_only() {
        let resolver = resolver();
        let hierarchy = HierarchyBuilder::new(&resolver).build(std::iter::empty());

        assert_eq!(hierarchy.nodes.len(), 1);
        assert_eq!(hierarchy.root().name, ROOT_NODE_NAME);
        assert_eq!(hierarchy.root().child_count, 0);
        assert!(hierarchy.pools.is_empty());
    }

    #[test]
    fn test_levels_and_parents() {
        let resolver = resolver();
        let records = vec![
            volume("s1", "p2", 100.0, 10.0, 90.0),
            volume("s1", "p1", 100.0, 50.0, 50.0),
        ];
        let hierarchy = HierarchyBuilder::new(&resolver).build(&records);

        let levels: Vec<(NodeLevel, &str, &str)> = hierarchy
            .nodes
            .iter()
            .map(|n| (n.level, n.name.as_str(), n.parent_name.as_str()))
            .collect();
        assert_eq!(
            levels,
            vec![
                (NodeLevel::Root, "All Storage", ""),
                (NodeLevel::System, "s1", "All Storage"),
                (NodeLevel::Tenant, "s1|Ops", "s1"),
                (NodeLevel::Pool, "s1|Ops|p1", "s1|Ops"),
                (NodeLevel::Tenant, "s1|UNKNOWN", "s1"),
                (NodeLevel::Pool, "s1|UNKNOWN|p2", "s1|UNKNOWN"),
            ]
        );
        assert_eq!(hierarchy.nodes_at(NodeLevel::Pool).count(), 2);
        assert_eq!(hierarchy.root().volume_count, 2);
    }

    #[test]
    fn test_pool_groups_follow_node_order() {
        let resolver = resolver();
        let records = vec![
            volume("s2", "p9", 10.0, 1.0, 9.0),
            volume("s1", "p2", 10.0, 1.0, 9.0),
            volume("s1", "p1", 10.0, 1.0, 9.0),
        ];
        let hierarchy = HierarchyBuilder::new(&resolver).build(&records);
        let pool_nodes: Vec<String> = hierarchy
            .nodes_at(NodeLevel::Pool)
            .map(|n| n.name.clone())
            .collect();
        let groups: Vec<String> = hierarchy.pools.iter().map(|p| p.key.pool_node_name()).collect();
        assert_eq!(pool_nodes, groups);
    }

    #[test]
    fn test_capacity_mismatch_is_attached_to_pool() {
        let resolver = resolver();
        let records = vec![volume("s1", "p1", 1000.0, 600.0, 200.0)];
        let hierarchy = HierarchyBuilder::new(&resolver).build(&records);

        let pool = hierarchy.nodes_at(NodeLevel::Pool).next().unwrap();
        assert_eq!(pool.data_quality.len(), 1);
        assert_eq!(pool.data_quality[0].kind(), "capacity_mismatch");
        assert!(hierarchy.root().data_quality.is_empty());
    }

    #[test]
    fn test_custom_tolerance_silences_mismatch() {
        let resolver = resolver();
        let records = vec![volume("s1", "p1", 1000.0, 600.0, 390.0)];

        let strict = HierarchyBuilder::new(&resolver)
            .with_tolerance(CapacityTolerance {
                absolute_gib: 1.0,
                relative: 0.0,
            })
            .build(&records);
        assert_eq!(strict.nodes_at(NodeLevel::Pool).next().unwrap().data_quality.len(), 1);

        let lenient = HierarchyBuilder::new(&resolver).build(&records);
        assert!(lenient.nodes_at(NodeLevel::Pool).next().unwrap().data_quality.is_empty());
    }

    #[test]
    fn test_escape_segment() {
        assert_eq!(escape_segment("pool-1"), "pool-1");
        assert_eq!(escape_segment("s1|Ops"), "s1\\|Ops");
        assert_eq!(escape_segment("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_system_named_like_root_is_not_its_own_parent() {
        let resolver = resolver();
        let records = vec![volume("All Storage", "p1", 100.0, 10.0, 90.0)];
        let hierarchy = HierarchyBuilder::new(&resolver).build(&records);

        let system = hierarchy.nodes_at(NodeLevel::System).next().unwrap();
        assert_eq!(system.name, "\\All Storage");
        assert_eq!(system.label, "All Storage");
        assert_eq!(system.parent_name, ROOT_NODE_NAME);
        assert!(hierarchy.nodes.iter().all(|n| n.name != n.parent_name));
        assert_eq!(HierarchyIndex::new(&hierarchy.nodes).validate(1e-6), Ok(()));
    }

    #[test]
    fn test_separator_in_ids_keeps_names_unique() {
        let resolver = resolver();
        let records = vec![
            volume("s1|Ops", "p1", 100.0, 10.0, 90.0),
            volume("s1", "p1", 100.0, 20.0, 80.0),
            volume("s1", "x|y", 100.0, 30.0, 70.0),
            volume("   ", "p1", 100.0, 40.0, 60.0),
            volume("|UNKNOWN", "p1", 100.0, 50.0, 50.0),
        ];
        let hierarchy = HierarchyBuilder::new(&resolver).build(&records);

        let mut names: Vec<&str> = hierarchy.nodes.iter().map(|n| n.name.as_str()).collect();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);

        assert_eq!(hierarchy.nodes.iter().filter(|n| n.is_root()).count(), 1);
        assert!(names.contains(&"s1\\|Ops"));
        assert!(names.contains(&"s1|Ops"));
        assert!(names.contains(&"s1|UNKNOWN|x\\|y"));
        assert!(names.contains(&"\\(blank)|UNKNOWN"));
        assert!(names.contains(&"\\|UNKNOWN"));
        assert_eq!(HierarchyIndex::new(&hierarchy.nodes).validate(1e-6), Ok(()));
    }
}
