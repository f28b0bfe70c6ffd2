//! Engine thresholds and tunables

use serde::Deserialize;

use crate::quality::CapacityTolerance;

/// Pools above this utilization are critical
pub const DEFAULT_CRITICAL_UTILIZATION_PCT: f64 = 80.0;

/// Pools above this utilization (and not critical) are warnings
pub const DEFAULT_WARNING_UTILIZATION_PCT: f64 = 70.0;

/// Critical pools filling up sooner than this are urgent
pub const DEFAULT_URGENT_DAYS: u32 = 30;

/// Number of pools forecast per report
pub const DEFAULT_FORECAST_TOP_N: usize = 5;

/// Forecast horizon in months
pub const DEFAULT_FORECAST_HORIZON_MONTHS: usize = 12;

/// Monthly growth rate, in percentage points, by utilization tier
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GrowthTiers {
    /// Lower bound (inclusive) of the fastest-growing tier
    pub high_threshold_pct: f64,
    /// Lower bound (inclusive) of the middle tier
    pub elevated_threshold_pct: f64,
    pub high_rate_pct: f64,
    pub elevated_rate_pct: f64,
    pub base_rate_pct: f64,
}

impl Default for GrowthTiers {
    fn default() -> Self {
        Self {
            high_threshold_pct: 95.0,
            elevated_threshold_pct: 80.0,
            high_rate_pct: 2.0,
            elevated_rate_pct: 1.5,
            base_rate_pct: 1.0,
        }
    }
}

impl GrowthTiers {
    /// Monthly growth rate for a given current utilization
    pub fn rate_for(&self, utilization_pct: f64) -> f64 {
        if utilization_pct >= self.high_threshold_pct {
            self.high_rate_pct
        } else if utilization_pct >= self.elevated_threshold_pct {
            self.elevated_rate_pct
        } else {
            self.base_rate_pct
        }
    }
}

/// Configuration for the rollup engine
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub critical_utilization_pct: f64,
    pub warning_utilization_pct: f64,
    pub urgent_days_threshold: u32,
    /// Only pools strictly above this utilization are forecast
    pub forecast_floor_pct: f64,
    pub forecast_top_n: usize,
    pub forecast_horizon_months: usize,
    pub growth_tiers: GrowthTiers,
    /// Days used to turn a monthly growth rate into a daily one
    pub days_per_month: f64,
    /// Systems below this utilization get an efficiency recommendation
    pub low_utilization_pct: f64,
    /// Savings-to-capacity ratio above which savings are reported
    pub savings_ratio_threshold: f64,
    /// Share of pool capacity suggested as expansion for urgent pools
    pub expansion_fraction: f64,
    pub capacity_tolerance: CapacityTolerance,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            critical_utilization_pct: DEFAULT_CRITICAL_UTILIZATION_PCT,
            warning_utilization_pct: DEFAULT_WARNING_UTILIZATION_PCT,
            urgent_days_threshold: DEFAULT_URGENT_DAYS,
            forecast_floor_pct: DEFAULT_WARNING_UTILIZATION_PCT,
            forecast_top_n: DEFAULT_FORECAST_TOP_N,
            forecast_horizon_months: DEFAULT_FORECAST_HORIZON_MONTHS,
            growth_tiers: GrowthTiers::default(),
            days_per_month: 30.0,
            low_utilization_pct: 30.0,
            savings_ratio_threshold: 0.0,
            expansion_fraction: 0.3,
            capacity_tolerance: CapacityTolerance::default(),
        }
    }
}
