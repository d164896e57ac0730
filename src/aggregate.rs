//! Scalar KPIs and grouped rollups over a period subset
//!
//! All functions are pure scans over borrowed rows. Ratios with a zero
//! denominator resolve to `0.0`, so nothing here can produce NaN or infinity
//! from finite input.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::types::Row;
use crate::util::safe_percent;

/// The sub-category rollup keeps only this many entries.
pub const SUB_CATEGORY_LIMIT: usize = 10;

/// Grouping key for order counting.
///
/// Rows without an order id are not dropped: they all collapse into the single
/// `Unknown` key and count as one order together. With many id-less rows this
/// undercounts orders, which usually points at an upstream data problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderKey<'a> {
    Id(&'a str),
    Unknown,
}

impl<'a> OrderKey<'a> {
    pub fn of(row: &'a Row) -> Self {
        match row.order_id.as_deref() {
            Some(id) => OrderKey::Id(id),
            None => OrderKey::Unknown,
        }
    }
}

pub fn distinct_orders<'a, I>(rows: I) -> usize
where
    I: IntoIterator<Item = &'a Row>,
{
    rows.into_iter().map(OrderKey::of).collect::<HashSet<_>>().len()
}

/// `(current - previous) / previous * 100`, or `0` when there is no base.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    safe_percent(current - previous, previous)
}

/// Profit margin as a percentage of sales, `0` without sales.
pub fn profit_margin(profit: f64, sales: f64) -> f64 {
    safe_percent(profit, sales)
}

/// Margin movement in percentage points, `0` when the prior margin is zero.
pub fn margin_change(current_margin: f64, previous_margin: f64) -> f64 {
    if previous_margin == 0.0 {
        0.0
    } else {
        current_margin - previous_margin
    }
}

/// Sums over one period subset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodTotals {
    pub sales: f64,
    pub profit: f64,
    pub quantity: i64,
    pub orders: usize,
}

impl PeriodTotals {
    pub fn from_rows(rows: &[&Row]) -> Self {
        let mut totals = PeriodTotals {
            orders: distinct_orders(rows.iter().copied()),
            ..Default::default()
        };
        for r in rows {
            totals.sales += r.sales;
            totals.profit += r.profit;
            totals.quantity += r.quantity;
        }
        totals
    }

    pub fn profit_margin(&self) -> f64 {
        profit_margin(self.profit, self.sales)
    }
}

/// Current and prior-year totals with their year-over-year changes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KpiComparison {
    pub current: PeriodTotals,
    pub previous: PeriodTotals,
}

impl KpiComparison {
    pub fn new(current: &[&Row], previous: &[&Row]) -> Self {
        Self {
            current: PeriodTotals::from_rows(current),
            previous: PeriodTotals::from_rows(previous),
        }
    }

    pub fn sales_change(&self) -> f64 {
        percent_change(self.current.sales, self.previous.sales)
    }

    pub fn profit_change(&self) -> f64 {
        percent_change(self.current.profit, self.previous.profit)
    }

    pub fn quantity_change(&self) -> f64 {
        percent_change(self.current.quantity as f64, self.previous.quantity as f64)
    }

    pub fn orders_change(&self) -> f64 {
        percent_change(self.current.orders as f64, self.previous.orders as f64)
    }

    pub fn profit_margin_change(&self) -> f64 {
        margin_change(self.current.profit_margin(), self.previous.profit_margin())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSales {
    pub state: String,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySales {
    pub category: String,
    pub sales: f64,
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentShare {
    pub segment: String,
    pub current_year: f64,
    pub previous_year: f64,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategoryShare {
    pub sub_category: String,
    pub sales: f64,
    pub percentage: u32,
}

/// Sales summed per key, remembering the order in which keys first appear so
/// that ties keep input order after the stable sort.
#[derive(Default)]
struct GroupSums<'a> {
    index: HashMap<&'a str, usize>,
    entries: Vec<(&'a str, f64, f64)>,
}

impl<'a> GroupSums<'a> {
    fn slot(&mut self, key: &'a str) -> &mut (&'a str, f64, f64) {
        let idx = match self.index.get(key) {
            Some(i) => *i,
            None => {
                self.entries.push((key, 0.0, 0.0));
                self.index.insert(key, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx]
    }

    fn add_current<F>(&mut self, rows: &[&'a Row], key: F)
    where
        F: Fn(&'a Row) -> Option<&'a str>,
    {
        for &r in rows {
            if let Some(k) = key(r) {
                self.slot(k).1 += r.sales;
            }
        }
    }

    fn add_previous<F>(&mut self, rows: &[&'a Row], key: F)
    where
        F: Fn(&'a Row) -> Option<&'a str>,
    {
        for &r in rows {
            if let Some(k) = key(r) {
                self.slot(k).2 += r.sales;
            }
        }
    }

    /// `(key, current, previous)` sorted by current sales, highest first.
    fn into_sorted(self) -> Vec<(&'a str, f64, f64)> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        entries
    }
}

/// Integer share of `total`, rounded per entry and kept within `0..=100`.
fn share(value: f64, total: f64) -> u32 {
    if total == 0.0 {
        return 0;
    }
    safe_percent(value, total).round().clamp(0.0, 100.0) as u32
}

fn total_sales(rows: &[&Row]) -> f64 {
    rows.iter().map(|r| r.sales).sum()
}

pub fn rollup_states<'a>(current: &[&'a Row]) -> Vec<StateSales> {
    let mut sums = GroupSums::default();
    sums.add_current(current, |r: &'a Row| r.state.as_deref());
    sums.into_sorted()
        .into_iter()
        .map(|(state, sales, _)| StateSales {
            state: state.to_string(),
            sales,
        })
        .collect()
}

pub fn rollup_categories<'a>(current: &[&'a Row], previous: &[&'a Row]) -> Vec<CategorySales> {
    let mut sums = GroupSums::default();
    sums.add_current(current, |r: &'a Row| r.category.as_deref());
    sums.add_previous(previous, |r: &'a Row| r.category.as_deref());
    sums.into_sorted()
        .into_iter()
        .map(|(category, sales, prev)| CategorySales {
            category: category.to_string(),
            sales,
            change: percent_change(sales, prev),
        })
        .collect()
}

/// Segment sales for both years. `percentage` is measured against the
/// current subset's total sales.
pub fn rollup_segments<'a>(current: &[&'a Row], previous: &[&'a Row]) -> Vec<SegmentShare> {
    let total = total_sales(current);
    let mut sums = GroupSums::default();
    sums.add_current(current, |r: &'a Row| r.segment.as_deref());
    sums.add_previous(previous, |r: &'a Row| r.segment.as_deref());
    sums.into_sorted()
        .into_iter()
        .map(|(segment, cur, prev)| SegmentShare {
            segment: segment.to_string(),
            current_year: cur,
            previous_year: prev,
            percentage: share(cur, total),
        })
        .collect()
}

/// Top sub-categories by sales, at most [`SUB_CATEGORY_LIMIT`].
pub fn rollup_sub_categories<'a>(current: &[&'a Row]) -> Vec<SubCategoryShare> {
    let total = total_sales(current);
    let mut sums = GroupSums::default();
    sums.add_current(current, |r: &'a Row| r.sub_category.as_deref());
    sums.into_sorted()
        .into_iter()
        .take(SUB_CATEGORY_LIMIT)
        .map(|(sub_category, sales, _)| SubCategoryShare {
            sub_category: sub_category.to_string(),
            sales,
            percentage: share(sales, total),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(order_id: Option<&str>, sales: f64, profit: f64) -> Row {
        Row {
            year: Some(2022),
            month_index: Some(0),
            order_id: order_id.map(str::to_string),
            sales,
            profit,
            quantity: 1,
            ..Default::default()
        }
    }

    fn keyed(category: &str, segment: &str, sub: &str, state: &str, sales: f64) -> Row {
        Row {
            category: Some(category.to_string()),
            segment: Some(segment.to_string()),
            sub_category: Some(sub.to_string()),
            state: Some(state.to_string()),
            sales,
            ..Default::default()
        }
    }

    #[test]
    fn test_totals_two_lines_one_order() {
        let rows = [sale(Some("A"), 100.0, 10.0), sale(Some("A"), 50.0, -5.0)];
        let refs: Vec<&Row> = rows.iter().collect();
        let totals = PeriodTotals::from_rows(&refs);
        assert_eq!(totals.sales, 150.0);
        assert_eq!(totals.profit, 5.0);
        assert_eq!(totals.orders, 1);
        assert_eq!(totals.quantity, 2);
        assert!((totals.profit_margin() - 3.3333).abs() < 1e-3);
    }

    #[test]
    fn test_missing_order_ids_count_as_one_order() {
        let rows = [
            sale(None, 1.0, 0.0),
            sale(None, 1.0, 0.0),
            sale(Some("B"), 1.0, 0.0),
        ];
        assert_eq!(distinct_orders(rows.iter()), 2);
        assert_eq!(distinct_orders(rows[..2].iter()), 1);
        assert_eq!(distinct_orders(std::iter::empty()), 0);
    }

    #[test]
    fn test_percent_change_zero_base() {
        assert_eq!(percent_change(120.0, 100.0), 20.0);
        assert_eq!(percent_change(50.0, 0.0), 0.0);
        assert_eq!(percent_change(0.0, 0.0), 0.0);
        assert_eq!(percent_change(-50.0, -100.0), -50.0);
    }

    #[test]
    fn test_margin_change_is_point_difference() {
        assert_eq!(margin_change(12.0, 10.0), 2.0);
        assert_eq!(margin_change(12.0, 0.0), 0.0);
        assert_eq!(profit_margin(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_comparison_with_empty_previous() {
        let rows = [sale(Some("A"), 100.0, 10.0)];
        let refs: Vec<&Row> = rows.iter().collect();
        let cmp = KpiComparison::new(&refs, &[]);
        assert_eq!(cmp.sales_change(), 0.0);
        assert_eq!(cmp.profit_change(), 0.0);
        assert_eq!(cmp.orders_change(), 0.0);
        assert_eq!(cmp.quantity_change(), 0.0);
        assert_eq!(cmp.profit_margin_change(), 0.0);
    }

    #[test]
    fn test_comparison_changes() {
        let cur = [sale(Some("A"), 150.0, 30.0), sale(Some("B"), 50.0, 10.0)];
        let prev = [sale(Some("C"), 100.0, 10.0)];
        let cur: Vec<&Row> = cur.iter().collect();
        let prev: Vec<&Row> = prev.iter().collect();
        let cmp = KpiComparison::new(&cur, &prev);
        assert_eq!(cmp.sales_change(), 100.0);
        assert_eq!(cmp.profit_change(), 300.0);
        assert_eq!(cmp.orders_change(), 100.0);
        assert_eq!(cmp.quantity_change(), 100.0);
        // 20% now versus 10% before
        assert!((cmp.profit_margin_change() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_category_rollup_with_change() {
        let cur = [
            keyed("Furniture", "Consumer", "Chairs", "Texas", 100.0),
            keyed("Technology", "Consumer", "Phones", "Ohio", 300.0),
            keyed("Furniture", "Corporate", "Tables", "Texas", 50.0),
        ];
        let prev = [
            keyed("Furniture", "Consumer", "Chairs", "Texas", 100.0),
            keyed("Office Supplies", "Consumer", "Paper", "Texas", 20.0),
        ];
        let cur: Vec<&Row> = cur.iter().collect();
        let prev: Vec<&Row> = prev.iter().collect();
        let rollup = rollup_categories(&cur, &prev);

        assert_eq!(rollup.len(), 3);
        assert_eq!(rollup[0].category, "Technology");
        assert_eq!(rollup[0].change, 0.0);
        assert_eq!(rollup[1].category, "Furniture");
        assert_eq!(rollup[1].sales, 150.0);
        assert_eq!(rollup[1].change, 50.0);
        assert_eq!(rollup[2].category, "Office Supplies");
        assert_eq!(rollup[2].sales, 0.0);
        assert_eq!(rollup[2].change, -100.0);
    }

    #[test]
    fn test_state_rollup_skips_missing_keys() {
        let mut unnamed = keyed("Furniture", "Consumer", "Chairs", "Texas", 999.0);
        unnamed.state = None;
        let rows = [
            keyed("Furniture", "Consumer", "Chairs", "Texas", 10.0),
            keyed("Furniture", "Consumer", "Chairs", "Ohio", 30.0),
            unnamed,
        ];
        let refs: Vec<&Row> = rows.iter().collect();
        let states = rollup_states(&refs);
        assert_eq!(
            states,
            vec![
                StateSales { state: "Ohio".to_string(), sales: 30.0 },
                StateSales { state: "Texas".to_string(), sales: 10.0 },
            ]
        );
    }

    #[test]
    fn test_segment_shares_use_current_total() {
        let cur = [
            keyed("F", "Consumer", "A", "X", 50.0),
            keyed("F", "Corporate", "A", "X", 30.0),
            keyed("F", "Home Office", "A", "X", 20.0),
        ];
        let prev = [keyed("F", "Consumer", "A", "X", 1000.0)];
        let cur: Vec<&Row> = cur.iter().collect();
        let prev: Vec<&Row> = prev.iter().collect();
        let segments = rollup_segments(&cur, &prev);

        assert_eq!(segments[0].segment, "Consumer");
        assert_eq!(segments[0].current_year, 50.0);
        assert_eq!(segments[0].previous_year, 1000.0);
        assert_eq!(segments[0].percentage, 50);
        assert_eq!(segments[1].percentage, 30);
        assert_eq!(segments[2].percentage, 20);
    }

    #[test]
    fn test_shares_round_independently() {
        let cur = [
            keyed("F", "A", "One", "X", 1.0),
            keyed("F", "B", "Two", "X", 1.0),
            keyed("F", "C", "Three", "X", 1.0),
        ];
        let cur: Vec<&Row> = cur.iter().collect();
        let subs = rollup_sub_categories(&cur);
        assert!(subs.iter().all(|s| s.percentage == 33));
        let sum: u32 = subs.iter().map(|s| s.percentage).sum();
        assert_eq!(sum, 99);
    }

    #[test]
    fn test_shares_clamped_with_negative_sales() {
        // Returns push the total below the largest group's sales
        let cur = [
            keyed("F", "Consumer", "Chairs", "X", 150.0),
            keyed("F", "Corporate", "Returns", "X", -50.0),
        ];
        let cur: Vec<&Row> = cur.iter().collect();

        let segments = rollup_segments(&cur, &[]);
        assert_eq!(segments[0].percentage, 100);
        assert_eq!(segments[1].percentage, 0);

        let subs = rollup_sub_categories(&cur);
        assert_eq!(subs[0].sub_category, "Chairs");
        assert_eq!(subs[0].percentage, 100);
        assert_eq!(subs[1].percentage, 0);
        assert!(subs.iter().all(|s| s.percentage <= 100));
    }

    #[test]
    fn test_sub_category_top_ten_stable() {
        let rows: Vec<Row> = (0..14)
            .map(|i| {
                let sales = if i % 2 == 0 { 10.0 } else { 5.0 };
                keyed("F", "S", &format!("Sub{}", i), "X", sales)
            })
            .collect();
        let refs: Vec<&Row> = rows.iter().collect();
        let subs = rollup_sub_categories(&refs);

        assert_eq!(subs.len(), SUB_CATEGORY_LIMIT);
        assert!(subs.windows(2).all(|w| w[0].sales >= w[1].sales));
        let names: Vec<&str> = subs.iter().map(|s| s.sub_category.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Sub0", "Sub2", "Sub4", "Sub6", "Sub8", "Sub10", "Sub12", "Sub1", "Sub3", "Sub5"
            ]
        );
    }

    #[test]
    fn test_empty_rollups() {
        assert!(rollup_states(&[]).is_empty());
        assert!(rollup_categories(&[], &[]).is_empty());
        assert!(rollup_segments(&[], &[]).is_empty());
        assert!(rollup_sub_categories(&[]).is_empty());
    }
}
