//! Snapshot directory on disk
//!
//! Layout:
//!
//! ```text
//! <dir>/2024-06-30.json        one CapacitySnapshot per reporting date
//! <dir>/tenant_mappings.json   array of TenantMappingEntry
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, warn};

use super::{RecordSource, SourceError, SourceResult};
use crate::models::{CapacitySnapshot, SystemSavings, TenantMappingEntry, VolumeRecord};

pub const TENANT_MAPPINGS_FILE: &str = "tenant_mappings.json";

const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads snapshots from a directory of JSON files
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    dir: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self, report_date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}.json", report_date.format(SNAPSHOT_DATE_FORMAT)))
    }

    /// Read and parse a JSON file; `None` if it does not exist
    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> SourceResult<Option<T>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SourceError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| SourceError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Read one date's snapshot file
    ///
    /// The file name's date wins over an embedded `report_date` that
    /// disagrees with it. Volumes carrying the embedded date move to the file
    /// date with it; volumes dated anything else are left for the engine to
    /// report as strays.
    async fn read_snapshot(&self, report_date: NaiveDate) -> SourceResult<Option<CapacitySnapshot>> {
        let path = self.snapshot_path(report_date);
        let Some(mut snapshot) = self.read_json::<CapacitySnapshot>(&path).await? else {
            return Ok(None);
        };

        if snapshot.report_date != report_date {
            let embedded = snapshot.report_date;
            let mut redated = 0;
            for volume in snapshot
                .volumes
                .iter_mut()
                .filter(|v| v.report_date == embedded)
            {
                volume.report_date = report_date;
                redated += 1;
            }
            warn!(
                path = %path.display(),
                file_date = %report_date,
                embedded_date = %embedded,
                redated_volumes = redated,
                "Snapshot file name and report_date disagree, using the file name"
            );
            snapshot.report_date = report_date;
        }

        debug!(
            path = %path.display(),
            volumes = snapshot.volumes.len(),
            "Loaded capacity snapshot"
        );
        Ok(Some(snapshot))
    }
}

#[async_trait]
impl RecordSource for JsonSnapshotSource {
    async fn available_report_dates(&self) -> SourceResult<Vec<NaiveDate>> {
        let io_err = |source| SourceError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut entries = fs::read_dir(&self.dir).await.map_err(io_err)?;

        let mut dates = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(date) = NaiveDate::parse_from_str(stem, SNAPSHOT_DATE_FORMAT) {
                dates.push(date);
            }
        }

        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }

    async fn fetch_volume_records(&self, report_date: NaiveDate) -> SourceResult<Vec<VolumeRecord>> {
        Ok(self
            .read_snapshot(report_date)
            .await?
            .map(|s| s.volumes)
            .unwrap_or_default())
    }

    async fn fetch_system_savings(&self, report_date: NaiveDate) -> SourceResult<Vec<SystemSavings>> {
        Ok(self
            .read_snapshot(report_date)
            .await?
            .map(|s| s.system_savings)
            .unwrap_or_default())
    }

    async fn fetch_tenant_mappings(&self) -> SourceResult<Vec<TenantMappingEntry>> {
        let path = self.dir.join(TENANT_MAPPINGS_FILE);
        Ok(self.read_json(&path).await?.unwrap_or_default())
    }

    async fn fetch_snapshot(&self, report_date: Option<NaiveDate>) -> SourceResult<CapacitySnapshot> {
        let report_date = match report_date {
            Some(date) => date,
            None => self.latest_report_date().await?.ok_or(SourceError::Empty)?,
        };

        // One read for both volumes and savings
        self.read_snapshot(report_date)
            .await?
            .ok_or(SourceError::NotFound(report_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn write(dir: &TempDir, name: &str, body: &str) {
        std::fs::write(dir.path().join(name), body).unwrap();
    }

    const SNAPSHOT: &str = r#"{
        "report_date": "2024-06-30",
        "volumes": [
            {
                "pool_id": "pool-a",
                "storage_system_id": "sys-1",
                "report_date": "2024-06-30",
                "volume_name": "vol-001",
                "provisioned_capacity": 1000.0,
                "used_capacity": 800.0,
                "available_capacity": 200.0
            },
            {
                "pool_id": "pool-b",
                "storage_system_id": "sys-1",
                "report_date": "2024-06-30",
                "provisioned_capacity": null,
                "used_capacity": null,
                "available_capacity": null
            }
        ],
        "system_savings": [
            { "storage_system_id": "sys-1", "data_reduction_capacity": 120.5 }
        ]
    }"#;

    #[tokio::test]
    async fn test_lists_dates_newest_first() {
        let dir = TempDir::new().unwrap();
        write(&dir, "2024-06-01.json", r#"{"report_date": "2024-06-01"}"#);
        write(&dir, "2024-06-30.json", SNAPSHOT);
        write(&dir, TENANT_MAPPINGS_FILE, "[]");
        write(&dir, "notes.txt", "ignored");
        write(&dir, "draft.json", "{}");

        let source = JsonSnapshotSource::new(dir.path());
        assert_eq!(
            source.available_report_dates().await.unwrap(),
            vec![day(30), day(1)]
        );
        assert_eq!(source.latest_report_date().await.unwrap(), Some(day(30)));
    }

    #[tokio::test]
    async fn test_fetch_snapshot_reads_records_and_savings() {
        let dir = TempDir::new().unwrap();
        write(&dir, "2024-06-30.json", SNAPSHOT);

        let source = JsonSnapshotSource::new(dir.path());
        let snapshot = source.fetch_snapshot(None).await.unwrap();

        assert_eq!(snapshot.report_date, day(30));
        assert_eq!(snapshot.volumes.len(), 2);
        assert_eq!(snapshot.volumes[0].volume_name.as_deref(), Some("vol-001"));
        assert_eq!(snapshot.volumes[1].provisioned_capacity, None);
        assert_eq!(snapshot.system_savings[0].data_reduction_capacity, Some(120.5));
    }

    #[tokio::test]
    async fn test_file_name_date_wins_over_embedded_date() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "2024-06-30.json",
            r#"{
                "report_date": "2024-06-29",
                "volumes": [
                    {
                        "pool_id": "pool-a",
                        "storage_system_id": "sys-1",
                        "report_date": "2024-06-29",
                        "provisioned_capacity": 100.0,
                        "used_capacity": 40.0,
                        "available_capacity": 60.0
                    },
                    {
                        "pool_id": "pool-b",
                        "storage_system_id": "sys-1",
                        "report_date": "2024-05-31",
                        "provisioned_capacity": 50.0,
                        "used_capacity": 5.0,
                        "available_capacity": 45.0
                    }
                ]
            }"#,
        );

        let source = JsonSnapshotSource::new(dir.path());
        let snapshot = source.fetch_snapshot(Some(day(30))).await.unwrap();
        assert_eq!(snapshot.report_date, day(30));
        assert_eq!(snapshot.volumes[0].report_date, day(30));
        assert_eq!(
            snapshot.volumes[1].report_date,
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
        );

        let records = source.fetch_volume_records(day(30)).await.unwrap();
        assert_eq!(records[0].report_date, day(30));

        let report = crate::CapacityEngine::default().run(&snapshot, &[], None);
        let root = report.root().unwrap();
        assert_eq!(root.total_capacity, 100.0);
        assert_eq!(root.used_capacity, 40.0);
        assert_eq!(report.data_quality.len(), 1);
        assert_eq!(report.data_quality[0].kind(), "foreign_report_date");
    }

    #[tokio::test]
    async fn test_missing_date_and_missing_mappings() {
        let dir = TempDir::new().unwrap();
        write(&dir, "2024-06-30.json", SNAPSHOT);
        let source = JsonSnapshotSource::new(dir.path());

        assert!(source.fetch_volume_records(day(1)).await.unwrap().is_empty());
        assert!(source.fetch_tenant_mappings().await.unwrap().is_empty());
        assert!(matches!(
            source.fetch_snapshot(Some(day(1))).await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reads_tenant_mappings() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            TENANT_MAPPINGS_FILE,
            r#"[{"pool_id": "pool-a", "storage_system_id": "sys-1", "tenant_name": "Finance"}]"#,
        );

        let mappings = JsonSnapshotSource::new(dir.path())
            .fetch_tenant_mappings()
            .await
            .unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].tenant_name, "Finance");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "2024-06-30.json", "{ not json");

        let err = JsonSnapshotSource::new(dir.path())
            .fetch_snapshot(Some(day(30)))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let source = JsonSnapshotSource::new(dir.path().join("absent"));
        assert!(matches!(
            source.available_report_dates().await,
            Err(SourceError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let source = JsonSnapshotSource::new(dir.path());
        assert!(matches!(source.fetch_snapshot(None).await, Err(SourceError::Empty)));
    }
}
