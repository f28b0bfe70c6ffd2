//! Report overview and reporting-date commands

use anyhow::Result;
use capacity_lib::models::{
    CapacityReport, SavingsEntry, SystemCapacity, TrendPoint, UtilizationDistribution,
};
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ReportQuery, TrendQuery};
use crate::output::{
    color_utilization, format_capacity, format_pct, print_info, print_json, print_rows,
    print_warning, recommendation_marker, render_table, OutputFormat,
};

#[derive(Tabled)]
struct DistributionRow {
    #[tabled(rename = "Utilization")]
    bin: String,
    #[tabled(rename = "Systems")]
    count: usize,
}

#[derive(Tabled)]
struct SystemRow {
    #[tabled(rename = "System")]
    system: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Util")]
    utilization: String,
}

#[derive(Tabled)]
struct SavingsRow {
    #[tabled(rename = "System")]
    system: String,
    #[tabled(rename = "Saved")]
    savings: String,
    #[tabled(rename = "Compression")]
    compression: String,
}

#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "Report Date")]
    date: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Util")]
    utilization: String,
}

#[derive(Tabled)]
struct DateRow {
    #[tabled(rename = "Report Date")]
    date: String,
    #[tabled(rename = "")]
    marker: String,
}

/// Show the headline figures, alert counts and recommendations
pub async fn show_report(client: &ApiClient, query: &ReportQuery, format: OutputFormat) -> Result<()> {
    let report = client.report(query).await?;

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => print_overview(&report),
    }

    Ok(())
}

fn print_overview(report: &CapacityReport) {
    let kpis = &report.kpis;

    let title = match &report.tenant_filter {
        Some(tenant) => format!("Capacity Report {} (tenant: {})", report.report_date, tenant),
        None => format!("Capacity Report {}", report.report_date),
    };
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));

    println!("Total Capacity:         {}", format_capacity(kpis.total_capacity));
    println!("Used:                   {}", format_capacity(kpis.used_capacity));
    println!("Available:              {}", format_capacity(kpis.available_capacity));
    println!(
        "Utilization:            {}",
        color_utilization(kpis.provisioned_utilization_pct)
    );
    println!(
        "Data Reduction Savings: {}",
        format_capacity(kpis.total_savings).green()
    );
    println!();

    println!(
        "Systems: {}   Tenants: {}   Pools: {}   Volumes: {}",
        kpis.num_systems, kpis.num_tenants, kpis.num_pools, kpis.num_volumes
    );
    println!(
        "Alerts:  {} critical   {} warning   {} urgent",
        report.alerts.critical_count.to_string().red(),
        report.alerts.warning_count.to_string().yellow(),
        report.alerts.urgent_count.to_string().red().bold()
    );
    println!();

    if kpis.num_systems > 0 {
        println!("{}", "System Utilization".bold());
        println!("{}", "-".repeat(50));
        println!("{}", render_table(distribution_rows(&kpis.utilization_distribution)));
        println!();
    }

    if !kpis.top_systems.is_empty() {
        println!("{}", "Largest Systems".bold());
        println!("{}", "-".repeat(50));
        println!("{}", render_table(kpis.top_systems.iter().map(system_row).collect()));
        println!();
    }

    if !kpis.savings_analysis.is_empty() {
        println!("{}", "Data Reduction by System".bold());
        println!("{}", "-".repeat(50));
        println!(
            "{}",
            render_table(kpis.savings_analysis.iter().map(savings_row).collect())
        );
        println!();
    }

    if !report.recommendations.is_empty() {
        println!("{}", "Recommendations".bold());
        println!("{}", "-".repeat(50));
        for recommendation in &report.recommendations {
            println!(
                "{} {}",
                recommendation_marker(recommendation.severity),
                recommendation.title.bold()
            );
            println!("  {}", recommendation.message);
            for detail in &recommendation.details {
                println!("    - {}", detail);
            }
        }
        println!();
    }

    if !report.data_quality.is_empty() {
        print_warning(&format!(
            "{} data-quality warning(s) in this report",
            report.data_quality.len()
        ));
        for warning in &report.data_quality {
            println!("  {}", warning.to_string().dimmed());
        }
    }
}

fn distribution_rows(distribution: &UtilizationDistribution) -> Vec<DistributionRow> {
    distribution
        .bins
        .iter()
        .zip(&distribution.counts)
        .map(|(bin, count)| DistributionRow {
            bin: bin.clone(),
            count: *count,
        })
        .collect()
}

fn system_row(system: &SystemCapacity) -> SystemRow {
    SystemRow {
        system: system.storage_system.clone(),
        total: format_capacity(system.total_capacity),
        used: format_capacity(system.used_capacity),
        available: format_capacity(system.available_capacity),
        utilization: color_utilization(system.utilization_pct),
    }
}

fn savings_row(entry: &SavingsEntry) -> SavingsRow {
    SavingsRow {
        system: entry.storage_system.clone(),
        savings: format_capacity(entry.savings),
        compression: format!("{:.2}:1", entry.compression_ratio),
    }
}

fn trend_row(point: &TrendPoint) -> TrendRow {
    TrendRow {
        date: point.report_date.to_string(),
        total: format_capacity(point.total_capacity),
        used: format_capacity(point.used_capacity),
        available: format_capacity(point.available_capacity),
        utilization: format_pct(point.utilization_pct),
    }
}

/// Show capacity totals across reporting dates, oldest first
pub async fn show_trend(client: &ApiClient, query: &TrendQuery, format: OutputFormat) -> Result<()> {
    let trend = client.trend(query).await?;

    let rows: Vec<TrendRow> = trend.points.iter().map(trend_row).collect();
    print_rows(rows, &trend, format);

    Ok(())
}

/// List reporting dates with data, newest first
pub async fn show_dates(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.report_dates().await?;

    if format == OutputFormat::Table && result.report_dates.is_empty() {
        print_info("No capacity snapshots available yet");
        return Ok(());
    }

    let rows: Vec<DateRow> = result
        .report_dates
        .iter()
        .map(|date| DateRow {
            date: date.to_string(),
            marker: if Some(*date) == result.latest {
                "latest".green().to_string()
            } else {
                String::new()
            },
        })
        .collect();

    print_rows(rows, &result, format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_rows_pair_bins_with_counts() {
        let distribution = UtilizationDistribution {
            bins: vec!["0-10%".to_string(), "10-20%".to_string()],
            counts: vec![3, 0],
        };

        let rows = distribution_rows(&distribution);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bin, "0-10%");
        assert_eq!(rows[0].count, 3);
        assert_eq!(rows[1].count, 0);
    }

    #[test]
    fn test_savings_row_shows_ratio() {
        let row = savings_row(&SavingsEntry {
            storage_system: "sys-1".to_string(),
            savings: 2048.0,
            compression_ratio: 2.5,
        });
        assert_eq!(row.system, "sys-1");
        assert_eq!(row.savings, "2.00 TiB");
        assert_eq!(row.compression, "2.50:1");
    }

    #[test]
    fn test_trend_row_formats_point() {
        let row = trend_row(&TrendPoint {
            report_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            total_capacity: 1000.0,
            used_capacity: 625.0,
            available_capacity: 375.0,
            utilization_pct: 62.5,
        });
        assert_eq!(row.date, "2024-06-30");
        assert_eq!(row.used, "625.00 GiB");
        assert_eq!(row.utilization, "62.5%");
    }
}
