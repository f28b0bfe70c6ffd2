//! Storage Capacity Insights CLI
//!
//! A command-line tool for browsing capacity reports, forecasts and alerts
//! served by capacity-server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use capacity_lib::models::AlertSeverity;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use commands::{configure, forecast, hierarchy, report};

/// Storage Capacity Insights CLI
#[derive(Parser)]
#[command(name = "capctl")]
#[command(author, version, about = "CLI for Storage Capacity Insights", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via CAPCTL_API_URL env var)
    #[arg(long, env = "CAPCTL_API_URL")]
    pub api_url: Option<String>,

    /// Output format [default: table]
    #[arg(long, short, value_enum)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which report to fetch
#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Reporting date (YYYY-MM-DD); latest when omitted
    #[arg(long, short)]
    pub date: Option<NaiveDate>,

    /// Restrict the report to one tenant (UNKNOWN selects unmapped pools)
    #[arg(long, short)]
    pub tenant: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the capacity overview with recommendations
    Report(ReportArgs),

    /// Show the All Storage → system → tenant → pool hierarchy
    Hierarchy {
        #[command(flatten)]
        report: ReportArgs,

        /// Only show nodes at this level
        #[arg(long, short, value_enum)]
        level: Option<hierarchy::LevelArg>,
    },

    /// Show tenants aggregated across storage systems
    Tenants {
        #[command(flatten)]
        report: ReportArgs,

        /// List mapped tenant names instead of capacity rollups
        #[arg(long)]
        mapped: bool,
    },

    /// Show utilization forecasts for the most utilized pools
    Forecast(ReportArgs),

    /// Show pool capacity alerts
    Alerts {
        #[command(flatten)]
        report: ReportArgs,

        /// Only show alerts of this severity (critical, warning, urgent)
        #[arg(long, short)]
        severity: Option<AlertSeverity>,
    },

    /// Show capacity totals across reporting dates
    Trend {
        /// First reporting date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last reporting date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Restrict totals to one tenant (UNKNOWN selects unmapped pools)
        #[arg(long, short)]
        tenant: Option<String>,
    },

    /// List reporting dates with data
    Dates,

    /// Manage local CLI configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the stored configuration
    Show,

    /// Update stored defaults (pass an empty value to clear one)
    Set {
        /// Default API endpoint URL
        #[arg(long)]
        api_url: Option<String>,

        /// Tenant used when --tenant is not given
        #[arg(long)]
        default_tenant: Option<String>,

        /// Default output format (table, json)
        #[arg(long)]
        default_format: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        if let Some(api_error) = e.downcast_ref::<client::ApiError>() {
            if api_error.is_not_found() {
                output::print_error(&api_error.message);
                output::print_info("Run `capctl dates` to list available reporting dates");
                std::process::exit(1);
            }
        }
        return Err(e);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;

    // Config commands work without a reachable server, and must still run
    // when the stored defaults are invalid
    if let Commands::Config(config_cmd) = cli.command {
        return match config_cmd {
            ConfigCommands::Show => {
                configure::show_config(config.resolve_format(cli.format).unwrap_or_default())
            }
            ConfigCommands::Set {
                api_url,
                default_tenant,
                default_format,
            } => configure::set_config(api_url, default_tenant, default_format),
        };
    }

    let format = config.resolve_format(cli.format)?;

    // Initialize client
    let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url.as_deref()))?;

    let query = |args: ReportArgs| client::ReportQuery {
        report_date: args.date,
        tenant: config.resolve_tenant(args.tenant),
    };

    // Execute command
    match cli.command {
        Commands::Report(args) => {
            report::show_report(&client, &query(args), format).await?;
        }
        Commands::Hierarchy {
            report: args,
            level,
        } => {
            hierarchy::show_hierarchy(&client, &query(args), level, format).await?;
        }
        Commands::Tenants {
            report: args,
            mapped,
        } => {
            hierarchy::show_tenants(&client, &query(args), mapped, format).await?;
        }
        Commands::Forecast(args) => {
            forecast::show_forecasts(&client, &query(args), format).await?;
        }
        Commands::Alerts {
            report: args,
            severity,
        } => {
            forecast::show_alerts(&client, &query(args), severity, format).await?;
        }
        Commands::Trend { from, to, tenant } => {
            let query = client::TrendQuery {
                start_date: from,
                end_date: to,
                tenant: config.resolve_tenant(tenant),
            };
            report::show_trend(&client, &query, format).await?;
        }
        Commands::Dates => {
            report::show_dates(&client, format).await?;
        }
        Commands::Config(_) => {}
    }

    Ok(())
}
