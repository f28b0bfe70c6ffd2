//! Inputs for the rollup engine
//!
//! A [`RecordSource`] hands out fully materialized snapshots; the engine
//! itself never touches storage.

mod json;
mod memory;

pub use json::{JsonSnapshotSource, TENANT_MAPPINGS_FILE};
pub use memory::InMemorySource;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{CapacitySnapshot, SystemSavings, TenantMappingEntry, VolumeRecord};

/// Failure to obtain engine input
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no capacity snapshot for {0}")]
    NotFound(NaiveDate),

    #[error("no capacity snapshots available")]
    Empty,
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Supplier of volume records, savings and tenant mappings
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Reporting dates with data, newest first
    async fn available_report_dates(&self) -> SourceResult<Vec<NaiveDate>>;

    async fn latest_report_date(&self) -> SourceResult<Option<NaiveDate>> {
        Ok(self.available_report_dates().await?.into_iter().next())
    }

    /// Volume records of one date; an unknown date yields an empty list
    async fn fetch_volume_records(&self, report_date: NaiveDate) -> SourceResult<Vec<VolumeRecord>>;

    async fn fetch_system_savings(&self, report_date: NaiveDate) -> SourceResult<Vec<SystemSavings>>;

    async fn fetch_tenant_mappings(&self) -> SourceResult<Vec<TenantMappingEntry>>;

    /// Everything the engine needs for one date
    ///
    /// `None` picks the latest date. Fails with [`SourceError::NotFound`] for
    /// a date without data and [`SourceError::Empty`] when there is no data
    /// at all.
    async fn fetch_snapshot(&self, report_date: Option<NaiveDate>) -> SourceResult<CapacitySnapshot> {
        let dates = self.available_report_dates().await?;
        let report_date = match report_date {
            Some(date) if dates.contains(&date) => date,
            Some(date) => return Err(SourceError::NotFound(date)),
            None => dates.first().copied().ok_or(SourceError::Empty)?,
        };

        Ok(CapacitySnapshot {
            report_date,
            volumes: self.fetch_volume_records(report_date).await?,
            system_savings: self.fetch_system_savings(report_date).await?,
        })
    }

    /// Snapshots of every date within `start..=end`, oldest first
    ///
    /// Either bound may be left open. An empty range is not an error.
    async fn fetch_snapshots(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> SourceResult<Vec<CapacitySnapshot>> {
        let mut dates: Vec<NaiveDate> = self
            .available_report_dates()
            .await?
            .into_iter()
            .filter(|d| start.map_or(true, |s| *d >= s) && end.map_or(true, |e| *d <= e))
            .collect();
        dates.sort_unstable();

        let mut snapshots = Vec::with_capacity(dates.len());
        for date in dates {
            snapshots.push(self.fetch_snapshot(Some(date)).await?);
        }
        Ok(snapshots)
    }
}
