//! Dashboard configuration
//!
//! Resolution order:
//! 1. An explicit `--config` path (must exist)
//! 2. `sales_dashboard.toml` in the working directory, when present
//! 3. Built-in defaults
//!
//! Command-line flags are applied on top by the binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::filter::{MonthFilter, SegmentFilter};
use crate::trend::TrendAnchor;

pub const DEFAULT_CONFIG_FILE: &str = "sales_dashboard.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    /// `None` selects the latest year in the dataset.
    pub year: Option<i32>,
    pub month: MonthFilter,
    pub segment: SegmentFilter,
    /// `None` anchors trends on the current wall-clock month.
    pub anchor: Option<TrendAnchor>,
    pub output_dir: PathBuf,
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data.json"),
            year: None,
            month: MonthFilter::All,
            segment: SegmentFilter::All,
            anchor: None,
            output_dir: PathBuf::from("."),
            preview_rows: 5,
        }
    }
}

impl DashboardConfig {
    pub fn trend_anchor(&self) -> TrendAnchor {
        self.anchor.unwrap_or_else(TrendAnchor::current)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    data_path: Option<PathBuf>,
    filters: Option<RawFilters>,
    trend: Option<RawTrend>,
    output: Option<RawOutput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFilters {
    year: Option<i32>,
    month: Option<String>,
    segment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTrend {
    anchor_month: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutput {
    dir: Option<PathBuf>,
    preview_rows: Option<usize>,
}

pub fn parse_config(content: &str) -> Result<DashboardConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    let mut config = DashboardConfig::default();

    if let Some(path) = raw.data_path {
        config.data_path = path;
    }

    if let Some(filters) = raw.filters {
        config.year = filters.year;
        if let Some(month) = filters.month {
            config.month = month
                .parse()
                .map_err(|e| Error::Config(format!("filters.month: {}", e)))?;
        }
        if let Some(segment) = filters.segment {
            config.segment = segment
                .parse()
                .map_err(|e| Error::Config(format!("filters.segment: {}", e)))?;
        }
    }

    if let Some(trend) = raw.trend {
        if let Some(month) = trend.anchor_month {
            config.anchor = Some(
                TrendAnchor::from_number(month)
                    .map_err(|e| Error::Config(format!("trend.anchor_month: {}", e)))?,
            );
        }
    }

    if let Some(output) = raw.output {
        if let Some(dir) = output.dir {
            config.output_dir = dir;
        }
        if let Some(rows) = output.preview_rows {
            if rows == 0 {
                return Err(Error::Config(
                    "output.preview_rows must be at least 1".to_string(),
                ));
            }
            config.preview_rows = rows;
        }
    }

    Ok(config)
}

pub fn load_config(explicit: Option<&Path>) -> Result<DashboardConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(DashboardConfig::default());
            }
            default
        }
    };

    let content = fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}
