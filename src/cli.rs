//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Superstore sales overview in the terminal
#[derive(Parser)]
#[command(name = "sales-dashboard")]
#[command(about = "Sales KPIs, trends, rollups and insights over a transaction dataset", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Dataset path (.json or .csv); overrides `data_path` from the config
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Config file (defaults to ./sales_dashboard.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Year to report on (defaults to the latest year in the data)
    #[arg(short, long, global = true)]
    pub year: Option<i32>,

    /// Month name or "All"
    #[arg(short, long, global = true)]
    pub month: Option<String>,

    /// Segment name or "All"
    #[arg(short, long, global = true)]
    pub segment: Option<String>,

    /// Newest month of the trend series, 1-12 (defaults to the current month)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub anchor_month: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print KPI cards, rollups and insights
    Summary {
        /// Print the full dashboard as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Write every table as CSV plus dashboard.json
    Export {
        /// Output directory (overrides the config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List the years, months and segments that can be selected
    Options,

    /// Change filters interactively and re-render
    Explore,
}
