//! Trailing twelve-month trend series
//!
//! Trends ignore the month and segment filters: every point is resolved
//! against the whole dataset, matching only on the target (year, month).

use std::collections::HashSet;

use chrono::{Datelike, Local};
use serde::Serialize;

use crate::aggregate::{profit_margin, OrderKey};
use crate::error::{Error, Result};
use crate::filter::Month;
use crate::loader::Dataset;

pub const TREND_POINTS: usize = 12;

pub type TrendSeries = [f64; TREND_POINTS];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrendMetric {
    Sales,
    Profit,
    ProfitMargin,
    Orders,
    Quantity,
}

impl TrendMetric {
    pub fn all() -> &'static [TrendMetric] {
        &[
            Self::Sales,
            Self::Profit,
            Self::ProfitMargin,
            Self::Orders,
            Self::Quantity,
        ]
    }
}

/// The newest month of every trend series.
///
/// Anchoring on the wall clock makes trends drift with calendar time even for
/// a static dataset, so the anchor is an explicit value and
/// [`TrendAnchor::current`] is only one way to obtain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrendAnchor {
    pub month: Month,
}

impl TrendAnchor {
    pub fn new(month: Month) -> Self {
        Self { month }
    }

    /// Anchor on a 1-based calendar month number.
    pub fn from_number(month: u32) -> Result<Self> {
        month
            .checked_sub(1)
            .and_then(Month::from_index)
            .map(Self::new)
            .ok_or_else(|| Error::InvalidFilter(format!("Month number out of range: {}", month)))
    }

    /// The month the process is running in, local time.
    pub fn current() -> Self {
        let month0 = Local::now().month0();
        Self::new(Month::from_index(month0).unwrap_or(Month::December))
    }

    /// `(year, month_index)` for each point, oldest first. Months before
    /// January roll back into the previous year; a point whose year falls
    /// below `i32::MIN` is `None` and stays empty.
    pub fn target_months(&self, anchor_year: i32) -> [Option<(i32, u32)>; TREND_POINTS] {
        let mut targets = [None; TREND_POINTS];
        let anchor = self.month.index() as i32;
        for (i, slot) in targets.iter_mut().enumerate() {
            let offset = (TREND_POINTS - 1 - i) as i32;
            let month = anchor - offset;
            *slot = if month < 0 {
                anchor_year
                    .checked_sub(1)
                    .map(|year| (year, (month + 12) as u32))
            } else {
                Some((anchor_year, month as u32))
            };
        }
        targets
    }
}

/// Sums for one trend point.
#[derive(Debug, Default)]
struct MonthBucket<'a> {
    sales: f64,
    profit: f64,
    quantity: i64,
    orders: HashSet<OrderKey<'a>>,
}

impl MonthBucket<'_> {
    fn value(&self, metric: TrendMetric) -> f64 {
        match metric {
            TrendMetric::Sales => self.sales,
            TrendMetric::Profit => self.profit,
            TrendMetric::ProfitMargin => profit_margin(self.profit, self.sales),
            TrendMetric::Orders => self.orders.len() as f64,
            TrendMetric::Quantity => self.quantity as f64,
        }
    }
}

/// One pass over the dataset filling all twelve points at once.
fn month_buckets<'a>(
    dataset: &'a Dataset,
    anchor_year: i32,
    anchor: TrendAnchor,
) -> Vec<MonthBucket<'a>> {
    let targets = anchor.target_months(anchor_year);
    let mut buckets: Vec<MonthBucket<'a>> =
        (0..TREND_POINTS).map(|_| MonthBucket::default()).collect();

    for row in dataset.rows() {
        let (Some(year), Some(month)) = (row.year, row.month_index) else {
            continue;
        };
        // Targets are twelve consecutive months, so at most one matches.
        if let Some(pos) = targets.iter().position(|t| *t == Some((year, month))) {
            let bucket = &mut buckets[pos];
            bucket.sales += row.sales;
            bucket.profit += row.profit;
            bucket.quantity += row.quantity;
            bucket.orders.insert(OrderKey::of(row));
        }
    }
    buckets
}

fn series(buckets: &[MonthBucket<'_>], metric: TrendMetric) -> TrendSeries {
    let mut out = [0.0; TREND_POINTS];
    for (slot, bucket) in out.iter_mut().zip(buckets) {
        *slot = bucket.value(metric);
    }
    out
}

/// Twelve trailing monthly values of `metric`, oldest first, ending at the
/// anchor month of `anchor_year`.
pub fn trend(
    dataset: &Dataset,
    metric: TrendMetric,
    anchor_year: i32,
    anchor: TrendAnchor,
) -> TrendSeries {
    series(&month_buckets(dataset, anchor_year, anchor), metric)
}

/// Trend series for every KPI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSet {
    pub sales: TrendSeries,
    pub profit: TrendSeries,
    pub profit_margin: TrendSeries,
    pub orders: TrendSeries,
    pub quantity: TrendSeries,
}

impl TrendSet {
    pub fn compute(dataset: &Dataset, anchor_year: i32, anchor: TrendAnchor) -> Self {
        let buckets = month_buckets(dataset, anchor_year, anchor);
        Self {
            sales: series(&buckets, TrendMetric::Sales),
            profit: series(&buckets, TrendMetric::Profit),
            profit_margin: series(&buckets, TrendMetric::ProfitMargin),
            orders: series(&buckets, TrendMetric::Orders),
            quantity: series(&buckets, TrendMetric::Quantity),
        }
    }

    pub fn get(&self, metric: TrendMetric) -> &TrendSeries {
        match metric {
            TrendMetric::Sales => &self.sales,
            TrendMetric::Profit => &self.profit,
            TrendMetric::ProfitMargin => &self.profit_margin,
            TrendMetric::Orders => &self.orders,
            TrendMetric::Quantity => &self.quantity,
        }
    }
}
