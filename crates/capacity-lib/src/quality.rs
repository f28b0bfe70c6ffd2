//! Data-quality signaling
//!
//! Inconsistent source data never aborts a report. It is surfaced as a
//! warning attached to the affected node (or to the report, for mapping
//! problems) so consumers can flag it.

use serde::{Deserialize, Serialize};

/// Tolerance used when reconciling `used + available` against provisioned
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityTolerance {
    /// Absolute slack in GiB
    pub absolute_gib: f64,
    /// Slack as a fraction of provisioned capacity
    pub relative: f64,
}

impl Default for CapacityTolerance {
    fn default() -> Self {
        Self {
            absolute_gib: 1.0,
            relative: 0.01,
        }
    }
}

impl CapacityTolerance {
    /// Allowed difference for a given provisioned capacity
    pub fn allowance(&self, provisioned: f64) -> f64 {
        self.absolute_gib.max(provisioned.abs() * self.relative)
    }
}

/// A data-quality problem found while aggregating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    UsedExceedsProvisioned {
        node: String,
        used_capacity: f64,
        provisioned_capacity: f64,
    },
    CapacityMismatch {
        node: String,
        provisioned_capacity: f64,
        used_capacity: f64,
        available_capacity: f64,
        difference: f64,
    },
    MalformedMapping {
        pool_id: String,
        storage_system_id: String,
        tenant_name: String,
        reason: String,
    },
    ConflictingMapping {
        pool_id: String,
        storage_system_id: String,
        kept_tenant: String,
        ignored_tenant: String,
    },
    ForeignReportDate {
        pool_id: String,
        storage_system_id: String,
        record_date: String,
        report_date: String,
    },
}

impl DataQualityWarning {
    /// Node the warning is attached to, if any
    pub fn node(&self) -> Option<&str> {
        match self {
            DataQualityWarning::UsedExceedsProvisioned { node, .. }
            | DataQualityWarning::CapacityMismatch { node, .. } => Some(node),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DataQualityWarning::UsedExceedsProvisioned { .. } => "used_exceeds_provisioned",
            DataQualityWarning::CapacityMismatch { .. } => "capacity_mismatch",
            DataQualityWarning::MalformedMapping { .. } => "malformed_mapping",
            DataQualityWarning::ConflictingMapping { .. } => "conflicting_mapping",
            DataQualityWarning::ForeignReportDate { .. } => "foreign_report_date",
        }
    }
}

impl std::fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataQualityWarning::UsedExceedsProvisioned {
                node,
                used_capacity,
                provisioned_capacity,
            } => write!(
                f,
                "{}: used capacity {:.2} GiB exceeds provisioned {:.2} GiB",
                node, used_capacity, provisioned_capacity
            ),
            DataQualityWarning::CapacityMismatch {
                node,
                provisioned_capacity,
                used_capacity,
                available_capacity,
                difference,
            } => write!(
                f,
                "{}: used {:.2} + available {:.2} differs from provisioned {:.2} by {:.2} GiB",
                node, used_capacity, available_capacity, provisioned_capacity, difference
            ),
            DataQualityWarning::MalformedMapping {
                pool_id,
                storage_system_id,
                reason,
                ..
            } => write!(
                f,
                "mapping for pool '{}' on '{}' skipped: {}",
                pool_id, storage_system_id, reason
            ),
            DataQualityWarning::ConflictingMapping {
                pool_id,
                storage_system_id,
                kept_tenant,
                ignored_tenant,
            } => write!(
                f,
                "pool '{}' on '{}' mapped to both '{}' and '{}'; keeping '{}'",
                pool_id, storage_system_id, kept_tenant, ignored_tenant, kept_tenant
            ),
            DataQualityWarning::ForeignReportDate {
                pool_id,
                storage_system_id,
                record_date,
                report_date,
            } => write!(
                f,
                "record for pool '{}' on '{}' dated {} ignored in report for {}",
                pool_id, storage_system_id, record_date, report_date
            ),
        }
    }
}

/// Check aggregated pool capacities for internal consistency
///
/// The sum check only runs when every contributing record reported all
/// three quantities.
pub fn check_capacity_consistency(
    node: &str,
    provisioned: f64,
    used: f64,
    available: f64,
    all_fields_present: bool,
    tolerance: &CapacityTolerance,
) -> Vec<DataQualityWarning> {
    let mut warnings = Vec::new();
    let allowance = tolerance.allowance(provisioned);

    if used > provisioned + allowance {
        warnings.push(DataQualityWarning::UsedExceedsProvisioned {
            node: node.to_string(),
            used_capacity: used,
            provisioned_capacity: provisioned,
        });
    }

    if all_fields_present {
        let difference = used + available - provisioned;
        if difference.abs() > allowance {
            warnings.push(DataQualityWarning::CapacityMismatch {
                node: node.to_string(),
                provisioned_capacity: provisioned,
                used_capacity: used,
                available_capacity: available,
                difference,
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistent_capacities_produce_no_warnings() {
        let warnings =
            check_capacity_consistency("p", 1000.0, 600.0, 400.0, true, &CapacityTolerance::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_small_rounding_is_tolerated() {
        let warnings =
            check_capacity_consistency("p", 1000.0, 600.0, 400.5, true, &CapacityTolerance::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_used_exceeding_provisioned_is_flagged() {
        let warnings =
            check_capacity_consistency("p", 100.0, 150.0, 0.0, true, &CapacityTolerance::default());
        assert!(warnings
            .iter()
            .any(|w| matches!(w, DataQualityWarning::UsedExceedsProvisioned { .. })));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, DataQualityWarning::CapacityMismatch { .. })));
    }

    #[test]
    fn test_mismatch_skipped_when_fields_missing() {
        let warnings =
            check_capacity_consistency("p", 1000.0, 100.0, 0.0, false, &CapacityTolerance::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let warning = DataQualityWarning::UsedExceedsProvisioned {
            node: "sys|t|p".to_string(),
            used_capacity: 2.0,
            provisioned_capacity: 1.0,
        };
        let value = serde_json::to_value(&warning).unwrap();
        assert_eq!(value["kind"], "used_exceeds_provisioned");
        assert_eq!(warning.node(), Some("sys|t|p"));
    }
}
