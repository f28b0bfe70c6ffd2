use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{RecordSource, SourceResult};
use crate::models::{CapacitySnapshot, SystemSavings, TenantMappingEntry, VolumeRecord};

/// Snapshots held in memory, for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    snapshots: BTreeMap<NaiveDate, CapacitySnapshot>,
    mappings: Vec<TenantMappingEntry>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a snapshot, replacing any previous one for the same date
    pub fn with_snapshot(mut self, snapshot: CapacitySnapshot) -> Self {
        self.snapshots.insert(snapshot.report_date, snapshot);
        self
    }

    pub fn with_mappings(mut self, mappings: Vec<TenantMappingEntry>) -> Self {
        self.mappings = mappings;
        self
    }
}

#[async_trait]
impl RecordSource for InMemorySource {
    async fn available_report_dates(&self) -> SourceResult<Vec<NaiveDate>> {
        Ok(self.snapshots.keys().rev().copied().collect())
    }

    async fn fetch_volume_records(&self, report_date: NaiveDate) -> SourceResult<Vec<VolumeRecord>> {
        Ok(self
            .snapshots
            .get(&report_date)
            .map(|s| s.volumes.clone())
            .unwrap_or_default())
    }

    async fn fetch_system_savings(&self, report_date: NaiveDate) -> SourceResult<Vec<SystemSavings>> {
        Ok(self
            .snapshots
            .get(&report_date)
            .map(|s| s.system_savings.clone())
            .unwrap_or_default())
    }

    async fn fetch_tenant_mappings(&self) -> SourceResult<Vec<TenantMappingEntry>> {
        Ok(self.mappings.clone())
    }
}
