//! One render cycle: filter, aggregate, trend, insights
//!
//! [`compute_view`] derives the complete output for a selection from
//! scratch. [`DashboardSession`] produces the same values but memoizes each
//! stage on its exact inputs, so a month or segment change reuses the trend
//! series and re-selecting the same filters costs nothing.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::{
    rollup_categories, rollup_segments, rollup_states, rollup_sub_categories, CategorySales,
    KpiComparison, SegmentShare, StateSales, SubCategoryShare,
};
use crate::filter::{select_periods, FilterSelection};
use crate::insights::{generate_insights, Insight, InsightInput};
use crate::loader::{load_or_empty, Dataset, LoadReport, LoadState};
use crate::trend::{TrendAnchor, TrendSeries, TrendSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Kpi {
    pub value: f64,
    pub change: f64,
    pub trend: TrendSeries,
}

impl Kpi {
    pub fn new(value: f64, change: f64, trend: TrendSeries) -> Self {
        Self {
            value,
            change,
            trend,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSet {
    pub sales: Kpi,
    pub profit: Kpi,
    pub profit_margin: Kpi,
    pub orders: Kpi,
    pub quantity: Kpi,
}

impl KpiSet {
    pub fn build(cmp: &KpiComparison, trends: &TrendSet) -> Self {
        let cur = &cmp.current;
        Self {
            sales: Kpi::new(cur.sales, cmp.sales_change(), trends.sales),
            profit: Kpi::new(cur.profit, cmp.profit_change(), trends.profit),
            profit_margin: Kpi::new(
                cur.profit_margin(),
                cmp.profit_margin_change(),
                trends.profit_margin,
            ),
            orders: Kpi::new(cur.orders as f64, cmp.orders_change(), trends.orders),
            quantity: Kpi::new(cur.quantity as f64, cmp.quantity_change(), trends.quantity),
        }
    }
}

/// Everything derived from the current / prior-year period pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodAggregates {
    pub record_count: usize,
    pub comparison: KpiComparison,
    pub states: Vec<StateSales>,
    pub categories: Vec<CategorySales>,
    pub segments: Vec<SegmentShare>,
    pub sub_categories: Vec<SubCategoryShare>,
}

impl PeriodAggregates {
    pub fn compute(dataset: &Dataset, selection: &FilterSelection) -> Self {
        let pair = select_periods(dataset, selection);
        tracing::debug!(
            year = selection.year,
            month = %selection.month,
            segment = %selection.segment,
            current = pair.current.len(),
            previous = pair.previous.len(),
            "Periods selected"
        );
        Self {
            record_count: pair.current.len(),
            comparison: KpiComparison::new(&pair.current, &pair.previous),
            states: rollup_states(&pair.current),
            categories: rollup_categories(&pair.current, &pair.previous),
            segments: rollup_segments(&pair.current, &pair.previous),
            sub_categories: rollup_sub_categories(&pair.current),
        }
    }
}

/// The full output handed to a presentation layer for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub selection: FilterSelection,
    pub record_count: usize,
    pub kpis: KpiSet,
    pub states: Vec<StateSales>,
    pub categories: Vec<CategorySales>,
    pub segments: Vec<SegmentShare>,
    pub sub_categories: Vec<SubCategoryShare>,
    pub insights: Vec<Insight>,
}

fn assemble(
    selection: &FilterSelection,
    periods: &PeriodAggregates,
    trends: &TrendSet,
) -> DashboardView {
    let kpis = KpiSet::build(&periods.comparison, trends);
    let insights = generate_insights(&InsightInput {
        kpis: &kpis,
        categories: &periods.categories,
        states: &periods.states,
    });
    DashboardView {
        selection: selection.clone(),
        record_count: periods.record_count,
        kpis,
        states: periods.states.clone(),
        categories: periods.categories.clone(),
        segments: periods.segments.clone(),
        sub_categories: periods.sub_categories.clone(),
        insights,
    }
}

/// Derive the dashboard for `selection` from scratch.
pub fn compute_view(
    dataset: &Dataset,
    selection: &FilterSelection,
    anchor: TrendAnchor,
) -> DashboardView {
    let periods = PeriodAggregates::compute(dataset, selection);
    let trends = TrendSet::compute(dataset, selection.year, anchor);
    assemble(selection, &periods, &trends)
}

/// Single-slot cache: holds the value for the last key only. A different key
/// replaces it.
#[derive(Debug)]
struct Memo<K, V> {
    slot: Option<(K, V)>,
    hits: u64,
    misses: u64,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            slot: None,
            hits: 0,
            misses: 0,
        }
    }
}

impl<K: PartialEq, V: Clone> Memo<K, V> {
    fn get_or_compute<F: FnOnce() -> V>(&mut self, key: K, compute: F) -> V {
        if let Some((k, v)) = &self.slot {
            if *k == key {
                self.hits += 1;
                return v.clone();
            }
        }
        self.misses += 1;
        let value = compute();
        self.slot = Some((key, value.clone()));
        value
    }

    fn clear(&mut self) {
        self.slot = None;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub views: StageStats,
    pub periods: StageStats,
    pub trends: StageStats,
}

type PeriodKey = (String, FilterSelection);
type TrendKey = (String, i32, TrendAnchor);
type ViewKey = (String, FilterSelection, TrendAnchor);

/// Owns the loaded dataset for the lifetime of the process and serves
/// memoized views of it.
pub struct DashboardSession {
    dataset: Dataset,
    load_state: LoadState,
    anchor: TrendAnchor,
    periods: Memo<PeriodKey, Arc<PeriodAggregates>>,
    trends: Memo<TrendKey, Arc<TrendSet>>,
    views: Memo<ViewKey, Arc<DashboardView>>,
}

impl DashboardSession {
    pub fn new(dataset: Dataset, anchor: TrendAnchor) -> Self {
        let load_state = LoadState::Ready(LoadReport::for_rows(dataset.rows()));
        Self::with_state(dataset, load_state, anchor)
    }

    /// Load from `path`; a failed load leaves an empty session that still
    /// answers every query.
    pub fn open(path: &Path, anchor: TrendAnchor) -> Self {
        let (dataset, load_state) = load_or_empty(path);
        Self::with_state(dataset, load_state, anchor)
    }

    fn with_state(dataset: Dataset, load_state: LoadState, anchor: TrendAnchor) -> Self {
        Self {
            dataset,
            load_state,
            anchor,
            periods: Memo::default(),
            trends: Memo::default(),
            views: Memo::default(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn anchor(&self) -> TrendAnchor {
        self.anchor
    }

    pub fn set_anchor(&mut self, anchor: TrendAnchor) {
        self.anchor = anchor;
    }

    /// Swap in a new dataset. Its version differs from the old one, so every
    /// cached stage misses on the next call.
    pub fn replace_dataset(&mut self, dataset: Dataset) {
        self.load_state = LoadState::Ready(LoadReport::for_rows(dataset.rows()));
        self.dataset = dataset;
        self.periods.clear();
        self.trends.clear();
        self.views.clear();
    }

    pub fn view(&mut self, selection: &FilterSelection) -> Arc<DashboardView> {
        let version = self.dataset.version().to_string();
        let anchor = self.anchor;
        let view_key = (version.clone(), selection.clone(), anchor);

        // Split borrows: the closure only touches the stage caches.
        let dataset = &self.dataset;
        let periods = &mut self.periods;
        let trends = &mut self.trends;
        self.views.get_or_compute(view_key, || {
            let p = periods.get_or_compute((version.clone(), selection.clone()), || {
                Arc::new(PeriodAggregates::compute(dataset, selection))
            });
            let t = trends.get_or_compute((version, selection.year, anchor), || {
                tracing::debug!(year = selection.year, "Rebuilding trend series");
                Arc::new(TrendSet::compute(dataset, selection.year, anchor))
            });
            Arc::new(assemble(selection, &p, &t))
        })
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            views: StageStats {
                hits: self.views.hits,
                misses: self.views.misses,
            },
            periods: StageStats {
                hits: self.periods.hits,
                misses: self.periods.misses,
            },
            trends: StageStats {
                hits: self.trends.hits,
                misses: self.trends.misses,
            },
        }
    }
}
