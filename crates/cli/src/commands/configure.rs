//! Local CLI configuration commands

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;

use crate::config::Config;
use crate::output::{print_json, print_success, OutputFormat};

/// Show the stored configuration
pub fn show_config(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;

    match format {
        OutputFormat::Json => print_json(&config),
        OutputFormat::Table => {
            let unset = || "(unset)".dimmed().to_string();
            println!("{}", "CLI Configuration".bold());
            println!("{}", "=".repeat(50));
            println!("File:                   {}", Config::config_path()?.display());
            println!(
                "API URL:                {}",
                config.api_url.clone().unwrap_or_else(unset)
            );
            println!(
                "Default tenant:         {}",
                config.default_tenant.clone().unwrap_or_else(unset)
            );
            println!(
                "Default format:         {}",
                config.default_format.clone().unwrap_or_else(unset)
            );
        }
    }

    Ok(())
}

/// Update stored defaults; an empty value clears the setting
pub fn set_config(
    api_url: Option<String>,
    default_tenant: Option<String>,
    default_format: Option<String>,
) -> Result<()> {
    let mut config = Config::load()?;
    apply_updates(&mut config, api_url, default_tenant, default_format)?;

    let path = config.save()?;
    print_success(&format!("Configuration saved to {}", path.display()));
    Ok(())
}

fn apply_updates(
    config: &mut Config,
    api_url: Option<String>,
    default_tenant: Option<String>,
    default_format: Option<String>,
) -> Result<()> {
    if let Some(url) = api_url {
        if !url.is_empty() {
            url::Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid API URL {}: {}", url, e))?;
        }
        config.api_url = non_empty(url);
    }
    if let Some(tenant) = default_tenant {
        config.default_tenant = non_empty(tenant.trim().to_string());
    }
    if let Some(format) = default_format {
        if !format.is_empty() {
            OutputFormat::from_str(&format, true)
                .map_err(|_| anyhow::anyhow!("Unknown output format: {}", format))?;
        }
        config.default_format = non_empty(format);
    }
    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
