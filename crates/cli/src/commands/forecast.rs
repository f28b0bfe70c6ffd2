//! Forecast and alert commands

use anyhow::Result;
use capacity_lib::models::{Alert, AlertSeverity, AlertSummary, ForecastSeries};
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ReportQuery};
use crate::output::{
    color_severity, color_utilization, format_days, format_pct, print_rows, print_success,
    OutputFormat,
};

/// Row for forecasts table
#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Pool")]
    pool: String,
    #[tabled(rename = "System")]
    system: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Growth/mo")]
    growth: String,
    #[tabled(rename = "+3m")]
    month_3: String,
    #[tabled(rename = "+6m")]
    month_6: String,
    #[tabled(rename = "+12m")]
    month_12: String,
    #[tabled(rename = "Full In")]
    full_in: String,
}

/// Row for alerts table
#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Pool")]
    pool: String,
    #[tabled(rename = "System")]
    system: String,
    #[tabled(rename = "Utilization")]
    utilization: String,
    #[tabled(rename = "Full In")]
    full_in: String,
}

fn projected_at(series: &ForecastSeries, month: usize) -> String {
    series
        .projected_utilization_pct
        .get(month)
        .map(|pct| format_pct(*pct))
        .unwrap_or_else(|| "-".to_string())
}

fn forecast_row(series: &ForecastSeries) -> ForecastRow {
    ForecastRow {
        pool: series.pool_name.clone(),
        system: series.storage_system_name.clone(),
        current: color_utilization(series.current_utilization_pct),
        growth: format!("+{:.1}", series.monthly_growth_rate_pct),
        month_3: projected_at(series, 3),
        month_6: projected_at(series, 6),
        month_12: projected_at(series, 12),
        full_in: format_days(series.estimated_days_until_full),
    }
}

/// Show utilization forecasts for the most utilized pools
pub async fn show_forecasts(client: &ApiClient, query: &ReportQuery, format: OutputFormat) -> Result<()> {
    let report = client.report(query).await?;

    if format == OutputFormat::Table && report.forecasts.is_empty() {
        print_success("No pools above the forecast threshold");
        return Ok(());
    }

    let rows = report.forecasts.iter().map(forecast_row).collect();
    print_rows(rows, &report.forecasts, format);

    Ok(())
}

/// Alerts in display order: urgent, critical, then warning
fn select_alerts(summary: &AlertSummary, severity: Option<AlertSeverity>) -> Vec<&Alert> {
    let severities = match severity {
        Some(severity) => vec![severity],
        None => vec![
            AlertSeverity::Urgent,
            AlertSeverity::Critical,
            AlertSeverity::Warning,
        ],
    };

    severities
        .into_iter()
        .flat_map(|severity| summary.by_severity(severity))
        .collect()
}

/// Show pool alerts, optionally restricted to one severity
pub async fn show_alerts(
    client: &ApiClient,
    query: &ReportQuery,
    severity: Option<AlertSeverity>,
    format: OutputFormat,
) -> Result<()> {
    let report = client.report(query).await?;
    let alerts = select_alerts(&report.alerts, severity);

    if format == OutputFormat::Table {
        if alerts.is_empty() {
            print_success("No capacity alerts");
            return Ok(());
        }
        println!(
            "{} {} critical, {} warning, {} urgent",
            "Alerts:".bold(),
            report.alerts.critical_count,
            report.alerts.warning_count,
            report.alerts.urgent_count
        );
    }

    let rows = alerts
        .iter()
        .map(|alert| AlertRow {
            severity: color_severity(alert.severity),
            pool: alert.pool_name.clone(),
            system: alert.storage_system_name.clone(),
            utilization: color_utilization(alert.utilization_pct),
            full_in: format_days(alert.estimated_days_until_full),
        })
        .collect();
    print_rows(rows, &alerts, format);

    Ok(())
}
