//! Hierarchy and tenant commands

use anyhow::Result;
use capacity_lib::models::{HierarchyNode, NodeLevel, TenantRollup};
use capacity_lib::HierarchyIndex;
use clap::ValueEnum;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ReportQuery};
use crate::output::{color_utilization, format_capacity, format_pct, print_rows, OutputFormat};

/// Hierarchy level selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    System,
    Tenant,
    Pool,
}

impl From<LevelArg> for NodeLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::System => NodeLevel::System,
            LevelArg::Tenant => NodeLevel::Tenant,
            LevelArg::Pool => NodeLevel::Pool,
        }
    }
}

/// Row for the hierarchy table
#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Util")]
    utilization: String,
    #[tabled(rename = "Simple Avg")]
    simple_avg: String,
    #[tabled(rename = "Weighted Avg")]
    weighted_avg: String,
    #[tabled(rename = "Volumes")]
    volumes: usize,
}

/// Row for the tenant rollup table
#[derive(Tabled)]
struct TenantRow {
    #[tabled(rename = "Tenant")]
    tenant: String,
    #[tabled(rename = "Systems")]
    systems: String,
    #[tabled(rename = "Pools")]
    pools: usize,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Simple Avg")]
    simple_avg: String,
    #[tabled(rename = "Weighted Avg")]
    weighted_avg: String,
}

#[derive(Tabled)]
struct TenantNameRow {
    #[tabled(rename = "Mapped Tenant")]
    name: String,
}

/// Build a table row; `depth` indents the label, otherwise the qualified name is shown
fn node_row(node: &HierarchyNode, depth: Option<usize>) -> NodeRow {
    let mut name = match depth {
        Some(depth) => format!("{}{}", "  ".repeat(depth), node.label),
        None => node.name.clone(),
    };
    if !node.data_quality.is_empty() {
        name = format!("{} {}", name, "⚠".yellow());
    }

    NodeRow {
        name,
        level: node.level.to_string(),
        total: format_capacity(node.total_capacity),
        used: format_capacity(node.used_capacity),
        available: format_capacity(node.available_capacity),
        utilization: color_utilization(node.utilization_pct),
        simple_avg: format_pct(node.simple_avg_utilization_pct),
        weighted_avg: format_pct(node.weighted_avg_utilization_pct),
        volumes: node.volume_count,
    }
}

/// The whole tree depth-first with depths, or the nodes of one level
fn select_nodes(
    nodes: &[HierarchyNode],
    level: Option<LevelArg>,
) -> Vec<(Option<usize>, &HierarchyNode)> {
    match level {
        Some(level) => {
            let level = NodeLevel::from(level);
            nodes
                .iter()
                .filter(|n| n.level == level)
                .map(|n| (None, n))
                .collect()
        }
        None => HierarchyIndex::new(nodes)
            .walk()
            .into_iter()
            .map(|(depth, n)| (Some(depth), n))
            .collect(),
    }
}

/// Show the capacity hierarchy
pub async fn show_hierarchy(
    client: &ApiClient,
    query: &ReportQuery,
    level: Option<LevelArg>,
    format: OutputFormat,
) -> Result<()> {
    let report = client.report(query).await?;
    let selected = select_nodes(&report.hierarchy_nodes, level);

    // A single level reads better with qualified names than with indentation
    let rows = selected
        .iter()
        .map(|(depth, node)| node_row(node, *depth))
        .collect();
    let nodes: Vec<&HierarchyNode> = selected.iter().map(|(_, node)| *node).collect();
    print_rows(rows, &nodes, format);

    Ok(())
}

/// Show tenants aggregated across storage systems
pub async fn show_tenants(
    client: &ApiClient,
    query: &ReportQuery,
    mapped_only: bool,
    format: OutputFormat,
) -> Result<()> {
    if mapped_only {
        let result = client.tenants().await?;
        let rows = result
            .tenants
            .iter()
            .map(|name| TenantNameRow { name: name.clone() })
            .collect();
        print_rows(rows, &result, format);
        return Ok(());
    }

    let report = client.report(query).await?;
    let rows = report.tenant_rollups.iter().map(tenant_row).collect();
    print_rows(rows, &report.tenant_rollups, format);

    Ok(())
}

fn tenant_row(rollup: &TenantRollup) -> TenantRow {
    TenantRow {
        tenant: rollup.tenant_name.bold().to_string(),
        systems: rollup.systems.join(", "),
        pools: rollup.pool_identifiers.len(),
        total: format_capacity(rollup.total_capacity),
        used: format_capacity(rollup.used_capacity),
        simple_avg: format_pct(rollup.simple_avg_utilization_pct),
        weighted_avg: format_pct(rollup.weighted_avg_utilization_pct),
    }
}
