//! Core data models for capacity reporting
//!
//! Inputs arrive as one immutable [`CapacitySnapshot`] per reporting date;
//! everything else in this module is produced fresh by the engine on every
//! invocation and is never mutated afterwards.

use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::quality::DataQualityWarning;

/// Name of the synthetic root node
pub const ROOT_NODE_NAME: &str = "All Storage";

/// Separator used to build path-qualified node names
pub const NODE_PATH_SEPARATOR: char = '|';

/// Volume-level capacity record (GiB)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub pool_id: String,
    pub storage_system_id: String,
    pub report_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,
    pub provisioned_capacity: Option<f64>,
    pub used_capacity: Option<f64>,
    pub available_capacity: Option<f64>,
}

impl VolumeRecord {
    /// True when all three capacity quantities were reported
    pub fn is_complete(&self) -> bool {
        self.provisioned_capacity.is_some()
            && self.used_capacity.is_some()
            && self.available_capacity.is_some()
    }
}

/// One row of the `(pool, system) -> tenant` mapping table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMappingEntry {
    pub pool_id: String,
    pub storage_system_id: String,
    pub tenant_name: String,
}

/// Data-reduction savings reported for a storage system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSavings {
    pub storage_system_id: String,
    pub data_reduction_capacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
}

/// All engine input for a single reporting date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    pub report_date: NaiveDate,
    #[serde(default)]
    pub volumes: Vec<VolumeRecord>,
    #[serde(default)]
    pub system_savings: Vec<SystemSavings>,
}

impl CapacitySnapshot {
    pub fn empty(report_date: NaiveDate) -> Self {
        Self {
            report_date,
            volumes: Vec::new(),
            system_savings: Vec::new(),
        }
    }
}

/// Level of a node in the ownership hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeLevel {
    Root,
    System,
    Tenant,
    Pool,
}

impl std::fmt::Display for NodeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeLevel::Root => write!(f, "root"),
            NodeLevel::System => write!(f, "system"),
            NodeLevel::Tenant => write!(f, "tenant"),
            NodeLevel::Pool => write!(f, "pool"),
        }
    }
}

/// A node of the flat capacity hierarchy
///
/// `name` is path-qualified and therefore unique across the whole output;
/// `parent_name` is empty only for the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub name: String,
    pub label: String,
    pub parent_name: String,
    pub level: NodeLevel,
    pub storage_system: String,
    pub total_capacity: f64,
    pub used_capacity: f64,
    pub available_capacity: f64,
    /// Used over total; not clamped, so inconsistent input can exceed 100
    pub utilization_pct: f64,
    pub simple_avg_utilization_pct: f64,
    pub weighted_avg_utilization_pct: f64,
    pub child_count: usize,
    pub volume_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_quality: Vec<DataQualityWarning>,
}

impl HierarchyNode {
    pub fn is_root(&self) -> bool {
        self.parent_name.is_empty()
    }
}

/// One tenant aggregated across every storage system it has pools in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRollup {
    pub tenant_name: String,
    pub systems: Vec<String>,
    pub pool_identifiers: Vec<String>,
    pub total_capacity: f64,
    pub used_capacity: f64,
    pub simple_avg_utilization_pct: f64,
    pub weighted_avg_utilization_pct: f64,
}

/// Estimated time until a pool is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaysUntilFull {
    Days(u32),
    /// Utilization is not expected to grow any further
    Stable,
}

impl DaysUntilFull {
    pub fn days(&self) -> Option<u32> {
        match self {
            DaysUntilFull::Days(days) => Some(*days),
            DaysUntilFull::Stable => None,
        }
    }

    pub fn is_within(&self, days: u32) -> bool {
        self.days().map(|d| d < days).unwrap_or(false)
    }
}

impl std::fmt::Display for DaysUntilFull {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DaysUntilFull::Days(days) => write!(f, "{}", days),
            DaysUntilFull::Stable => write!(f, "stable"),
        }
    }
}

impl Serialize for DaysUntilFull {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DaysUntilFull::Days(days) => serializer.serialize_u32(*days),
            DaysUntilFull::Stable => serializer.serialize_str("stable"),
        }
    }
}

impl<'de> Deserialize<'de> for DaysUntilFull {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Days(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Days(days) => Ok(DaysUntilFull::Days(days)),
            Raw::Text(text) if text == "stable" => Ok(DaysUntilFull::Stable),
            Raw::Text(other) => Err(D::Error::custom(format!(
                "invalid days-until-full value: {}",
                other
            ))),
        }
    }
}

/// Linear utilization projection for one pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub pool_name: String,
    pub storage_system_name: String,
    pub current_utilization_pct: f64,
    pub monthly_growth_rate_pct: f64,
    /// Index 0 is the current month
    pub projected_utilization_pct: Vec<f64>,
    pub estimated_days_until_full: DaysUntilFull,
}

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Urgent,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Critical => write!(f, "critical"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(AlertSeverity::Critical),
            "warning" => Ok(AlertSeverity::Warning),
            "urgent" => Ok(AlertSeverity::Urgent),
            other => Err(format!("unknown alert severity: {}", other)),
        }
    }
}

/// Pool-level capacity alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub pool_name: String,
    pub storage_system_name: String,
    pub utilization_pct: f64,
    pub estimated_days_until_full: DaysUntilFull,
}

/// Alerts grouped by severity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub critical_count: usize,
    pub warning_count: usize,
    pub urgent_count: usize,
    pub critical: Vec<Alert>,
    pub warning: Vec<Alert>,
    pub urgent: Vec<Alert>,
}

impl AlertSummary {
    pub fn is_empty(&self) -> bool {
        self.critical.is_empty() && self.warning.is_empty() && self.urgent.is_empty()
    }

    pub fn by_severity(&self, severity: AlertSeverity) -> &[Alert] {
        match severity {
            AlertSeverity::Critical => &self.critical,
            AlertSeverity::Warning => &self.warning,
            AlertSeverity::Urgent => &self.urgent,
        }
    }
}

/// What a recommendation is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    UrgentAction,
    EfficiencyOpportunity,
    SavingsAchieved,
    AllNormal,
}

/// Display tone of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSeverity {
    Danger,
    Info,
    Success,
}

impl std::fmt::Display for RecommendationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationSeverity::Danger => write!(f, "danger"),
            RecommendationSeverity::Info => write!(f, "info"),
            RecommendationSeverity::Success => write!(f, "success"),
        }
    }
}

/// Short operator-facing recommendation, regenerated on every call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: RecommendationCategory,
    pub severity: RecommendationSeverity,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// System utilization histogram in ten 10% bins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationDistribution {
    pub bins: Vec<String>,
    pub counts: Vec<usize>,
}

/// One storage system in the largest-systems list (GiB)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemCapacity {
    pub storage_system: String,
    pub total_capacity: f64,
    pub used_capacity: f64,
    pub available_capacity: f64,
    pub utilization_pct: f64,
}

/// Data-reduction savings of one storage system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsEntry {
    pub storage_system: String,
    pub savings: f64,
    /// 1.0 when the system did not report a ratio
    pub compression_ratio: f64,
}

/// Headline figures for the overview dashboard (GiB)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewKpis {
    pub total_capacity: f64,
    pub used_capacity: f64,
    pub available_capacity: f64,
    pub total_savings: f64,
    pub provisioned_utilization_pct: f64,
    pub num_systems: usize,
    pub num_tenants: usize,
    pub num_pools: usize,
    pub num_volumes: usize,
    pub utilization_distribution: UtilizationDistribution,
    /// Largest systems by capacity
    #[serde(default)]
    pub top_systems: Vec<SystemCapacity>,
    /// Systems with the largest data-reduction savings
    #[serde(default)]
    pub savings_analysis: Vec<SavingsEntry>,
}

/// Complete response payload for one reporting date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityReport {
    pub report_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_filter: Option<String>,
    pub hierarchy_nodes: Vec<HierarchyNode>,
    pub tenant_rollups: Vec<TenantRollup>,
    pub forecasts: Vec<ForecastSeries>,
    pub alerts: AlertSummary,
    pub recommendations: Vec<Recommendation>,
    pub kpis: OverviewKpis,
    #[serde(default)]
    pub data_quality: Vec<DataQualityWarning>,
}

/// Capacity totals of one reporting date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub report_date: NaiveDate,
    pub total_capacity: f64,
    pub used_capacity: f64,
    pub available_capacity: f64,
    pub utilization_pct: f64,
}

/// Capacity totals across a range of reporting dates, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityTrend {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_filter: Option<String>,
    pub points: Vec<TrendPoint>,
}

impl CapacityReport {
    pub fn root(&self) -> Option<&HierarchyNode> {
        self.hierarchy_nodes.iter().find(|n| n.level == NodeLevel::Root)
    }

    pub fn nodes_at(&self, level: NodeLevel) -> impl Iterator<Item = &HierarchyNode> {
        self.hierarchy_nodes.iter().filter(move |n| n.level == level)
    }
}
