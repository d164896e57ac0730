// Entry point and high-level CLI flow.
//
// - `summary` renders one dashboard for the selected filters.
// - `export` writes every table as CSV plus the full view as JSON.
// - `options` lists what can be selected.
// - `explore` keeps the dataset loaded and re-renders as filters change.
mod cli;

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};
use sales_dashboard::config::{load_config, DashboardConfig};
use sales_dashboard::dashboard::{DashboardSession, DashboardView};
use sales_dashboard::filter::{
    available_segments, available_years, FilterSelection, Month, MonthFilter, SegmentFilter,
};
use sales_dashboard::loader::LoadState;
use sales_dashboard::trend::TrendAnchor;
use sales_dashboard::{output, reports, util};

/// Apply command-line overrides on top of the file configuration.
fn resolve_config(cli: &Cli) -> Result<DashboardConfig> {
    let mut config = load_config(cli.config.as_deref()).context("Invalid configuration")?;
    if let Some(data) = &cli.data {
        config.data_path = data.clone();
    }
    if let Some(year) = cli.year {
        config.year = Some(year);
    }
    if let Some(month) = &cli.month {
        config.month = month.parse().context("Invalid --month")?;
    }
    if let Some(segment) = &cli.segment {
        config.segment = segment.parse().context("Invalid --segment")?;
    }
    if let Some(n) = cli.anchor_month {
        config.anchor = Some(TrendAnchor::from_number(n)?);
    }
    Ok(config)
}

fn initial_selection(session: &DashboardSession, config: &DashboardConfig) -> FilterSelection {
    let year = config
        .year
        .unwrap_or_else(|| FilterSelection::default_for(session.dataset()).year);
    FilterSelection::new(year, config.month, config.segment.clone())
}

/// `true` when the session has rows to show; otherwise explains why not.
fn report_load_state(session: &DashboardSession, config: &DashboardConfig) -> bool {
    match session.load_state() {
        LoadState::Failed { reason } => {
            println!(
                "Error: No data loaded from {} ({}).\n",
                config.data_path.display(),
                reason
            );
            false
        }
        LoadState::Ready(report) => {
            println!(
                "Dataset ready ({} rows loaded, {} skipped, {} without an order date)\n",
                util::format_int(report.loaded_rows),
                util::format_int(report.skipped_rows),
                util::format_int(report.undated_rows)
            );
            true
        }
    }
}

fn print_dashboard(view: &DashboardView, preview_rows: usize) {
    let s = &view.selection;
    println!(
        "Sales Overview: {} | Month: {} | Segment: {} ({} records)\n",
        s.year,
        s.month,
        s.segment,
        util::format_int(view.record_count)
    );

    output::preview_table(
        "Key Metrics",
        Some("vs prior year, same period"),
        &reports::kpi_rows(view),
        5,
    );
    output::preview_table(
        "Sales by State",
        Some(
            format!(
                "Top {} of {}",
                preview_rows.min(view.states.len()),
                view.states.len()
            )
            .as_str(),
        ),
        &reports::state_rows(view),
        preview_rows,
    );
    output::preview_table(
        "Sales by Category",
        None,
        &reports::category_rows(view),
        preview_rows,
    );
    output::preview_table(
        "Sales by Segment",
        Some("current vs previous year"),
        &reports::segment_rows(view),
        preview_rows,
    );
    output::preview_table(
        "Top Sub-Categories",
        Some("Top 10 by sales"),
        &reports::sub_category_rows(view),
        10,
    );
    output::preview_table("Insights", None, &reports::insight_rows(view), 4);
}

fn cmd_summary(config: &DashboardConfig, json: bool) -> Result<()> {
    let mut session = DashboardSession::open(&config.data_path, config.trend_anchor());
    if json {
        // Keep stdout machine-readable; load failures are still logged.
        let selection = initial_selection(&session, config);
        let view = session.view(&selection);
        println!("{}", serde_json::to_string_pretty(&*view)?);
        return Ok(());
    }
    if !report_load_state(&session, config) {
        return Ok(());
    }
    let selection = initial_selection(&session, config);
    let view = session.view(&selection);
    print_dashboard(&view, config.preview_rows);
    Ok(())
}

fn export_view(view: &DashboardView, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    output::write_csv(&dir.join("kpis.csv"), &reports::kpi_rows(view))?;
    output::write_csv(&dir.join("states.csv"), &reports::state_rows(view))?;
    output::write_csv(&dir.join("categories.csv"), &reports::category_rows(view))?;
    output::write_csv(&dir.join("segments.csv"), &reports::segment_rows(view))?;
    output::write_csv(&dir.join("subcategories.csv"), &reports::sub_category_rows(view))?;
    output::write_csv(&dir.join("insights.csv"), &reports::insight_rows(view))?;
    output::write_json(&dir.join("dashboard.json"), view)?;
    Ok(())
}

fn cmd_export(config: &DashboardConfig, out: Option<&Path>) -> Result<()> {
    let mut session = DashboardSession::open(&config.data_path, config.trend_anchor());
    if !report_load_state(&session, config) {
        return Ok(());
    }
    let selection = initial_selection(&session, config);
    let view = session.view(&selection);
    let dir = out.unwrap_or(config.output_dir.as_path());

    println!("Generating reports...");
    export_view(&view, dir).context("Export failed")?;
    tracing::info!(dir = %dir.display(), "Export complete");
    println!("Outputs saved to {}\n", dir.display());
    Ok(())
}

fn cmd_options(config: &DashboardConfig) -> Result<()> {
    let session = DashboardSession::open(&config.data_path, config.trend_anchor());
    if !report_load_state(&session, config) {
        return Ok(());
    }
    let years: Vec<String> = available_years(session.dataset())
        .iter()
        .map(|y| y.to_string())
        .collect();
    let months: Vec<&str> = Month::ALL.iter().map(|m| m.as_str()).collect();
    println!("Years:    {}", years.join(", "));
    println!("Months:   All, {}", months.join(", "));
    println!("Segments: All, {}", available_segments(session.dataset()).join(", "));
    Ok(())
}

/// Read a single line of input after printing `label`. `None` at end of input.
fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn cmd_explore(config: &DashboardConfig) -> Result<()> {
    let mut session = DashboardSession::open(&config.data_path, config.trend_anchor());
    if !report_load_state(&session, config) {
        return Ok(());
    }
    let mut selection = initial_selection(&session, config);

    loop {
        println!(
            "Filters: Year {} | Month {} | Segment {}",
            selection.year, selection.month, selection.segment
        );
        println!("[1] Change year");
        println!("[2] Change month");
        println!("[3] Change segment");
        println!("[4] Show dashboard");
        println!("[5] Exit\n");

        let Some(choice) = prompt("Enter choice: ") else {
            break;
        };
        match choice.as_str() {
            "1" => {
                let years = available_years(session.dataset());
                match prompt("Year: ").unwrap_or_default().parse::<i32>() {
                    Ok(y) if years.contains(&y) => selection.year = y,
                    _ => println!("Invalid year. Available: {:?}\n", years),
                }
            }
            "2" => {
                let input = prompt("Month (name or All): ").unwrap_or_default();
                match input.parse::<MonthFilter>() {
                    Ok(m) => selection.month = m,
                    Err(e) => println!("{}\n", e),
                }
            }
            "3" => {
                let input = prompt("Segment (name or All): ").unwrap_or_default();
                match input.parse::<SegmentFilter>() {
                    Ok(s) => selection.segment = s,
                    Err(e) => println!("{}\n", e),
                }
            }
            "4" => {
                println!();
                let view = session.view(&selection);
                print_dashboard(&view, config.preview_rows);
                tracing::debug!(stats = ?session.stats(), "Cache statistics");
            }
            "5" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 1-5.\n"),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(io::stderr))
        .init();

    let config = resolve_config(&cli)?;

    match &cli.command {
        Commands::Summary { json } => cmd_summary(&config, *json),
        Commands::Export { out } => cmd_export(&config, out.as_deref()),
        Commands::Options => cmd_options(&config),
        Commands::Explore => cmd_explore(&config),
    }
}
