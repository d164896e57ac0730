//! Sales dashboard engine
//!
//! Turns a flat, pre-processed set of retail transaction rows into filtered
//! KPIs with year-over-year changes, trailing twelve-month trends, grouped
//! rollups and a short list of rule-based insights.
//!
//! Data flows one way:
//! `loader` → `filter` → `aggregate` + `trend` → `insights` → `dashboard`.
//! Every stage is a pure function of the immutable [`loader::Dataset`] and the
//! current [`filter::FilterSelection`]; [`dashboard::DashboardSession`] adds
//! per-stage memoization on top.

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod insights;
pub mod loader;
pub mod output;
pub mod reports;
pub mod trend;
pub mod types;
pub mod util;

pub use error::{Error, Result};
