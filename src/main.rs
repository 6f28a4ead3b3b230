//! Collision Dash - Vehicle Collision Dashboard Reports
//!
//! Loads a collision CSV and prints the data behind every dashboard panel.

use anyhow::Context;
use clap::Parser;
use collision_dash::config::DashboardConfig;
use collision_dash::dashboard::{Dashboard, MAX_MIN_INJURED, TOP_N_CHOICES};
use collision_dash::logging;
use collision_dash::stats::InjuryCategory;
use std::path::PathBuf;

/// Where are people injured in vehicle collisions, and when?
#[derive(Parser, Debug)]
#[command(name = "collision-dash", version, about)]
struct Cli {
    /// CSV path or http(s) URL (overrides the config file).
    #[arg(short, long)]
    source: Option<String>,

    /// Maximum number of CSV rows to read; 0 reads all rows.
    #[arg(short, long)]
    rows: Option<usize>,

    /// Minimum number of injured persons for the injury map.
    #[arg(short = 'i', long, value_parser = clap::value_parser!(u32).range(0..=MAX_MIN_INJURED as i64))]
    min_injured: Option<u32>,

    /// Hour of day to break down by minute (0-23).
    #[arg(short = 'H', long, value_parser = clap::value_parser!(u32).range(0..=23))]
    hour: Option<u32>,

    /// Victim category for the street ranking.
    #[arg(short, long)]
    category: Option<InjuryCategory>,

    /// Number of streets to rank (5, 10 or 15).
    #[arg(short, long, value_parser = parse_top_n)]
    top: Option<usize>,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also print the raw rows of the selected hour.
    #[arg(long)]
    raw: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short, long)]
    debug: bool,
}

fn parse_top_n(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{e}"))?;
    if TOP_N_CHOICES.contains(&n) {
        Ok(n)
    } else {
        Err(format!("expected one of {TOP_N_CHOICES:?}"))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let mut config = match &cli.config {
        Some(path) => DashboardConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DashboardConfig::default(),
    };

    if let Some(source) = cli.source {
        config.source = source;
    }
    if let Some(rows) = cli.rows {
        config.row_limit = (rows > 0).then_some(rows);
    }
    if let Some(min_injured) = cli.min_injured {
        config.params.min_injured = min_injured;
    }
    if let Some(hour) = cli.hour {
        config.params.hour = hour;
    }
    if let Some(category) = cli.category {
        config.params.category = category;
    }
    if let Some(top) = cli.top {
        config.params.top_n = top;
    }

    tracing::info!(source = %config.source, params = ?config.params, "Building dashboard");

    let dashboard = Dashboard::new(&config);
    let report = dashboard
        .report(&config.params)
        .with_context(|| format!("building report for {}", dashboard.source()))?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if cli.raw {
        let df = dashboard.raw_hour_view(&config.params)?;
        println!("{df}");
    }

    Ok(())
}
