//! Capacity rollup engine
//!
//! Pure transformation from one [`CapacitySnapshot`] plus the tenant mapping
//! table into a [`CapacityReport`]. The engine performs no I/O and keeps no
//! state between calls, so it can be shared freely across threads.


use tracing::{debug, error, warn};

use crate::alerts::{AlertGenerator, RecommendationGenerator};
use crate::averaging::tenant_rollups;
use crate::config::EngineConfig;
use crate::forecast::ForecastProjector;
use crate::hierarchy::{Hierarchy, HierarchyBuilder, HierarchyIndex};
use crate::kpis;
use crate::models::{
    CapacityReport, CapacitySnapshot, TenantMappingEntry, TrendPoint, VolumeRecord,
};
use crate::quality::DataQualityWarning;
use crate::tenant::{normalize_identifier, TenantResolver};

#[derive(Debug, Clone, Default)]
pub struct CapacityEngine {
    config: EngineConfig,
}

impl CapacityEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Build the full report for one reporting date
    ///
    /// `tenant_filter` restricts every output to volumes resolving to that
    /// tenant label. Blank filters are treated as absent.
    pub fn run(
        &self,
        snapshot: &CapacitySnapshot,
        mappings: &[TenantMappingEntry],
        tenant_filter: Option<&str>,
    ) -> CapacityReport {
        let tenant_filter = normalize_filter(tenant_filter);

        let resolver = TenantResolver::new(mappings);
        let mut data_quality: Vec<DataQualityWarning> = resolver.skipped_entries().to_vec();

        let records = self.records_for_date(snapshot, &mut data_quality);
        let hierarchy = self.build_hierarchy(&resolver, tenant_filter, &records);

        data_quality.extend(
            hierarchy
                .nodes
                .iter()
                .flat_map(|node| node.data_quality.iter().cloned()),
        );

        let rollups = tenant_rollups(hierarchy.pools.iter().map(|pool| pool.contribution()));
        let forecasts = ForecastProjector::from_config(&self.config).forecast(&hierarchy.nodes);
        let alerts = AlertGenerator::from_config(&self.config).generate(&hierarchy.nodes);
        let recommendations = RecommendationGenerator::from_config(&self.config).generate(
            &hierarchy.nodes,
            &alerts,
            &snapshot.system_savings,
        );
        let kpis = kpis::overview(&hierarchy.nodes, &snapshot.system_savings);

        debug!(
            report_date = %snapshot.report_date,
            nodes = hierarchy.nodes.len(),
            tenants = rollups.len(),
            forecasts = forecasts.len(),
            data_quality = data_quality.len(),
            "Capacity report assembled"
        );

        CapacityReport {
            report_date: snapshot.report_date,
            tenant_filter: tenant_filter.map(str::to_string),
            hierarchy_nodes: hierarchy.nodes,
            tenant_rollups: rollups,
            forecasts,
            alerts,
            recommendations,
            kpis,
            data_quality,
        }
    }

    /// Root totals of each snapshot, oldest first
    ///
    /// Every point goes through the same tenant resolution and filter as a
    /// full report, so it matches the root node of that date's report.
    pub fn trend(
        &self,
        snapshots: &[CapacitySnapshot],
        mappings: &[TenantMappingEntry],
        tenant_filter: Option<&str>,
    ) -> Vec<TrendPoint> {
        let tenant_filter = normalize_filter(tenant_filter);
        let resolver = TenantResolver::new(mappings);

        let mut points: Vec<TrendPoint> = snapshots
            .iter()
            .map(|snapshot| {
                let mut skipped = Vec::new();
                let records = self.records_for_date(snapshot, &mut skipped);
                let hierarchy = self.build_hierarchy(&resolver, tenant_filter, &records);
                let root = hierarchy.root();
                TrendPoint {
                    report_date: snapshot.report_date,
                    total_capacity: root.total_capacity,
                    used_capacity: root.used_capacity,
                    available_capacity: root.available_capacity,
                    utilization_pct: root.utilization_pct,
                }
            })
            .collect();
        points.sort_by_key(|p| p.report_date);

        debug!(points = points.len(), "Capacity trend assembled");
        points
    }

    fn build_hierarchy(
        &self,
        resolver: &TenantResolver,
        tenant_filter: Option<&str>,
        records: &[&VolumeRecord],
    ) -> Hierarchy {
        let hierarchy = HierarchyBuilder::new(resolver)
            .with_tolerance(self.config.capacity_tolerance)
            .with_tenant_filter(tenant_filter)
            .build(records.iter().copied());

        let index = HierarchyIndex::new(&hierarchy.nodes);
        if let Err(violation) = index.validate(self.config.capacity_tolerance.absolute_gib) {
            error!(error = %violation, "Capacity hierarchy failed validation");
        }
        hierarchy
    }

    /// Records belonging to the snapshot's date; strays are reported and skipped
    fn records_for_date<'a>(
        &self,
        snapshot: &'a CapacitySnapshot,
        data_quality: &mut Vec<DataQualityWarning>,
    ) -> Vec<&'a VolumeRecord> {
        let mut records = Vec::with_capacity(snapshot.volumes.len());
        for record in &snapshot.volumes {
            if record.report_date == snapshot.report_date {
                records.push(record);
                continue;
            }
            warn!(
                pool_id = %record.pool_id,
                storage_system_id = %record.storage_system_id,
                record_date = %record.report_date,
                report_date = %snapshot.report_date,
                "Skipping volume record from another reporting date"
            );
            data_quality.push(DataQualityWarning::ForeignReportDate {
                pool_id: record.pool_id.clone(),
                storage_system_id: record.storage_system_id.clone(),
                record_date: record.report_date.to_string(),
                report_date: snapshot.report_date.to_string(),
            });
        }
        records
    }
}

/// Trimmed filter, with blank treated as absent
fn normalize_filter(tenant_filter: Option<&str>) -> Option<&str> {
    tenant_filter
        .map(normalize_identifier)
        .filter(|f| !f.is_empty())
}
