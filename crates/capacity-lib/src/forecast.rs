//! Linear capacity-exhaustion forecasts for hot pools
//!
//! Growth is additive in percentage points per month and depends only on the
//! pool's current utilization tier. Projections are clamped at 100%.

use std::cmp::Ordering;

use tracing::debug;

use crate::config::{EngineConfig, GrowthTiers};
use crate::models::{DaysUntilFull, ForecastSeries, HierarchyNode, NodeLevel};

const FULL_PCT: f64 = 100.0;

/// Projects pool utilization over a fixed horizon
#[derive(Debug, Clone)]
pub struct ForecastProjector {
    tiers: GrowthTiers,
    floor_pct: f64,
    top_n: usize,
    horizon_months: usize,
    days_per_month: f64,
}

impl ForecastProjector {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            tiers: config.growth_tiers,
            floor_pct: config.forecast_floor_pct,
            top_n: config.forecast_top_n,
            horizon_months: config.forecast_horizon_months,
            days_per_month: config.days_per_month,
        }
    }

    /// Monthly growth rate in percentage points
    pub fn growth_rate(&self, utilization_pct: f64) -> f64 {
        self.tiers.rate_for(utilization_pct)
    }

    /// Utilization for months `0..=horizon`, index 0 being the current month
    pub fn project(&self, utilization_pct: f64) -> Vec<f64> {
        let rate = self.growth_rate(utilization_pct);
        (0..=self.horizon_months)
            .map(|month| (utilization_pct + rate * month as f64).min(FULL_PCT))
            .collect()
    }

    /// Whole days until the pool reaches 100% at its tier's daily rate
    ///
    /// Tier rates are monthly, so the daily rate is the tier value divided by
    /// `days_per_month`. With the default tiers an 85% pool has 300 days of
    /// headroom; under the default 30-day window only pools within about two
    /// points of full become urgent. Raise `urgent_days_threshold` for an
    /// earlier warning.
    pub fn days_until_full(&self, utilization_pct: f64) -> DaysUntilFull {
        let monthly = self.growth_rate(utilization_pct);
        if utilization_pct >= FULL_PCT || monthly <= 0.0 || self.days_per_month <= 0.0 {
            return DaysUntilFull::Stable;
        }

        // headroom / (monthly / days_per_month)
        let days = ((FULL_PCT - utilization_pct) * self.days_per_month / monthly).floor();
        if days >= u32::MAX as f64 {
            DaysUntilFull::Stable
        } else {
            DaysUntilFull::Days(days.max(0.0) as u32)
        }
    }

    /// Forecast the hottest pools above the floor, highest utilization first
    pub fn forecast(&self, nodes: &[HierarchyNode]) -> Vec<ForecastSeries> {
        let mut candidates: Vec<&HierarchyNode> = nodes
            .iter()
            .filter(|n| n.level == NodeLevel::Pool && n.utilization_pct > self.floor_pct)
            .collect();

        candidates.sort_by(|a, b| {
            b.utilization_pct
                .partial_cmp(&a.utilization_pct)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        candidates.truncate(self.top_n);

        debug!(forecasts = candidates.len(), "Pool forecasts computed");

        candidates
            .into_iter()
            .map(|pool| ForecastSeries {
                pool_name: pool.name.clone(),
                storage_system_name: pool.storage_system.clone(),
                current_utilization_pct: pool.utilization_pct,
                monthly_growth_rate_pct: self.growth_rate(pool.utilization_pct),
                projected_utilization_pct: self.project(pool.utilization_pct),
                estimated_days_until_full: self.days_until_full(pool.utilization_pct),
            })
            .collect()
    }
}

impl Default for ForecastProjector {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
