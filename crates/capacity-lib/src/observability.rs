//! Metrics and structured events for report generation
//!
//! Prometheus metrics live in the default registry and are registered once
//! per process; [`ReportMetrics`] is a cheap handle onto them.

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge_vec, Histogram, IntCounter,
    IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::models::{Alert, AlertSeverity, CapacityReport};
use crate::quality::DataQualityWarning;

/// Report latency buckets (seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

static GLOBAL_METRICS: OnceLock<ReportMetricsInner> = OnceLock::new();

struct ReportMetricsInner {
    report_latency_seconds: Histogram,
    reports_generated: IntCounter,
    records_processed: IntCounter,
    alerts_active: IntGaugeVec,
    data_quality_warnings: IntCounter,
    report_errors: IntCounter,
}

impl ReportMetricsInner {
    fn new() -> Self {
        Self {
            report_latency_seconds: register_histogram!(
                "capacity_insights_report_latency_seconds",
                "Time spent fetching inputs and building one capacity report",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register report_latency_seconds"),

            reports_generated: register_int_counter!(
                "capacity_insights_reports_generated_total",
                "Total number of capacity reports generated"
            )
            .expect("Failed to register reports_generated"),

            records_processed: register_int_counter!(
                "capacity_insights_records_processed_total",
                "Total number of volume records aggregated"
            )
            .expect("Failed to register records_processed"),

            alerts_active: register_int_gauge_vec!(
                "capacity_insights_alerts",
                "Pool alerts in the most recent report, by severity",
                &["severity"]
            )
            .expect("Failed to register alerts"),

            data_quality_warnings: register_int_counter!(
                "capacity_insights_data_quality_warnings_total",
                "Total number of data-quality warnings raised"
            )
            .expect("Failed to register data_quality_warnings"),

            report_errors: register_int_counter!(
                "capacity_insights_report_errors_total",
                "Total number of report requests that failed"
            )
            .expect("Failed to register report_errors"),
        }
    }
}

/// Handle to the process-wide report metrics; clones share the same series
#[derive(Clone)]
pub struct ReportMetrics {
    _private: (),
}

impl Default for ReportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ReportMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ReportMetricsInner {
        GLOBAL_METRICS.get_or_init(ReportMetricsInner::new)
    }

    pub fn observe_report_latency(&self, duration_secs: f64) {
        self.inner().report_latency_seconds.observe(duration_secs);
    }

    /// Record a finished report
    pub fn record_report(&self, report: &CapacityReport, records: usize) {
        let inner = self.inner();
        inner.reports_generated.inc();
        inner.records_processed.inc_by(records as u64);
        inner
            .data_quality_warnings
            .inc_by(report.data_quality.len() as u64);

        for severity in [
            AlertSeverity::Critical,
            AlertSeverity::Warning,
            AlertSeverity::Urgent,
        ] {
            inner
                .alerts_active
                .with_label_values(&[&severity.to_string()])
                .set(report.alerts.by_severity(severity).len() as i64);
        }
    }

    pub fn inc_report_errors(&self) {
        self.inner().report_errors.inc();
    }
}

/// Structured logger for reporting events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, snapshot_dir: &str) {
        info!(
            event = "server_started",
            instance = %self.instance,
            version = %version,
            snapshot_dir = %snapshot_dir,
            "Capacity insights server started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "server_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Capacity insights server shutting down"
        );
    }

    /// Summary line for one generated report
    pub fn log_report(&self, report: &CapacityReport, records: usize, duration_ms: u128) {
        info!(
            event = "report_generated",
            instance = %self.instance,
            report_date = %report.report_date,
            tenant_filter = report.tenant_filter.as_deref().unwrap_or(""),
            records = records,
            nodes = report.hierarchy_nodes.len(),
            critical = report.alerts.critical_count,
            warning = report.alerts.warning_count,
            urgent = report.alerts.urgent_count,
            data_quality_warnings = report.data_quality.len(),
            duration_ms = duration_ms as u64,
            "Capacity report generated"
        );
    }

    pub fn log_data_quality(&self, warning: &DataQualityWarning) {
        warn!(
            event = "data_quality_warning",
            instance = %self.instance,
            kind = warning.kind(),
            node = warning.node().unwrap_or(""),
            details = %warning,
            "Data-quality problem in capacity input"
        );
    }

    /// Urgent alerts log at warn, everything else at info
    pub fn log_alert(&self, alert: &Alert) {
        match alert.severity {
            AlertSeverity::Urgent => warn!(
                event = "alert_raised",
                instance = %self.instance,
                severity = %alert.severity,
                pool = %alert.pool_name,
                storage_system = %alert.storage_system_name,
                utilization_pct = alert.utilization_pct,
                days_until_full = %alert.estimated_days_until_full,
                "Pool will fill up soon"
            ),
            _ => info!(
                event = "alert_raised",
                instance = %self.instance,
                severity = %alert.severity,
                pool = %alert.pool_name,
                storage_system = %alert.storage_system_name,
                utilization_pct = alert.utilization_pct,
                days_until_full = %alert.estimated_days_until_full,
                "Pool utilization above threshold"
            ),
        }
    }
}
