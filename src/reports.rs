// Render-ready tables built from a `DashboardView`.
//
// Every numeric field is formatted here so the CSV exports and the console
// previews show identical text.
use crate::dashboard::{DashboardView, Kpi};
use crate::types::{
    CategorySalesRow, InsightRow, KpiCardRow, SegmentShareRow, StateSalesRow, SubCategoryShareRow,
};
use crate::util::{abbreviate_number, format_int, format_number, format_percent};

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Bar-height sparkline scaled to the series maximum. Non-positive points
/// render as the lowest bar.
pub fn sparkline(values: &[f64]) -> String {
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    values
        .iter()
        .map(|v| {
            if max <= 0.0 || *v <= 0.0 {
                return SPARK_LEVELS[0];
            }
            let level = ((v / max) * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect()
}

fn card(metric: &str, value: String, change: String, kpi: &Kpi) -> KpiCardRow {
    KpiCardRow {
        metric: metric.to_string(),
        value,
        change,
        trend: sparkline(&kpi.trend),
    }
}

pub fn kpi_rows(view: &DashboardView) -> Vec<KpiCardRow> {
    let k = &view.kpis;
    vec![
        card(
            "Total Sales",
            abbreviate_number(k.sales.value),
            format_percent(k.sales.change),
            &k.sales,
        ),
        card(
            "Total Profit",
            abbreviate_number(k.profit.value),
            format_percent(k.profit.change),
            &k.profit,
        ),
        // Margin moves in percentage points, not percent
        card(
            "Profit Margin",
            format!("{}%", format_number(k.profit_margin.value, 1)),
            format!("{} pp", format_percent(k.profit_margin.change).trim_end_matches('%')),
            &k.profit_margin,
        ),
        card(
            "Orders",
            format_int(k.orders.value as i64),
            format_percent(k.orders.change),
            &k.orders,
        ),
        card(
            "Quantity Sold",
            format_int(k.quantity.value as i64),
            format_percent(k.quantity.change),
            &k.quantity,
        ),
    ]
}

pub fn state_rows(view: &DashboardView) -> Vec<StateSalesRow> {
    view.states
        .iter()
        .enumerate()
        .map(|(idx, s)| StateSalesRow {
            rank: idx + 1,
            state: s.state.clone(),
            sales: format_number(s.sales, 2),
        })
        .collect()
}

pub fn category_rows(view: &DashboardView) -> Vec<CategorySalesRow> {
    view.categories
        .iter()
        .map(|c| CategorySalesRow {
            category: c.category.clone(),
            sales: format_number(c.sales, 2),
            change: format_percent(c.change),
        })
        .collect()
}

pub fn segment_rows(view: &DashboardView) -> Vec<SegmentShareRow> {
    view.segments
        .iter()
        .map(|s| SegmentShareRow {
            segment: s.segment.clone(),
            current_year: format_number(s.current_year, 2),
            previous_year: format_number(s.previous_year, 2),
            percentage: format!("{}%", s.percentage),
        })
        .collect()
}

pub fn sub_category_rows(view: &DashboardView) -> Vec<SubCategoryShareRow> {
    view.sub_categories
        .iter()
        .enumerate()
        .map(|(idx, s)| SubCategoryShareRow {
            rank: idx + 1,
            sub_category: s.sub_category.clone(),
            sales: format_number(s.sales, 2),
            percentage: format!("{}%", s.percentage),
        })
        .collect()
}

pub fn insight_rows(view: &DashboardView) -> Vec<InsightRow> {
    view.insights
        .iter()
        .map(|i| InsightRow {
            kind: i.kind.to_string(),
            title: i.title.clone(),
            description: i.description.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::compute_view;
    use crate::filter::{FilterSelection, Month, MonthFilter, SegmentFilter};
    use crate::loader::Dataset;
    use crate::trend::TrendAnchor;
    use crate::types::Row;

    #[test]
    fn test_sparkline() {
        assert_eq!(sparkline(&[0.0, 5.0, 10.0]), "▁▅█");
        assert_eq!(sparkline(&[0.0; 4]), "▁▁▁▁");
        assert_eq!(sparkline(&[-3.0, 3.0]), "▁█");
        assert_eq!(sparkline(&[]), "");
    }

    #[test]
    fn test_rows_from_view() {
        let ds = Dataset::new(
            vec![Row {
                year: Some(2022),
                month_index: Some(4),
                order_id: Some("A".to_string()),
                state: Some("Texas".to_string()),
                category: Some("Technology".to_string()),
                segment: Some("Consumer".to_string()),
                sub_category: Some("Phones".to_string()),
                sales: 1234.5,
                profit: 123.45,
                quantity: 3,
                ..Default::default()
            }],
            "t",
        );
        let selection = FilterSelection::new(2022, MonthFilter::All, SegmentFilter::All);
        let view = compute_view(&ds, &selection, TrendAnchor::new(Month::December));

        let kpis = kpi_rows(&view);
        assert_eq!(kpis.len(), 5);
        assert_eq!(kpis[0].value, "1.2K");
        assert_eq!(kpis[0].change, "+0.0%");
        assert_eq!(kpis[2].value, "10.0%");
        assert_eq!(kpis[2].change, "+0.0 pp");
        assert_eq!(kpis[3].value, "1");
        assert_eq!(kpis[4].value, "3");
        assert_eq!(kpis[0].trend.chars().count(), 12);

        let states = state_rows(&view);
        assert_eq!(states[0].rank, 1);
        assert_eq!(states[0].sales, "1,234.50");
        assert_eq!(segment_rows(&view)[0].percentage, "100%");
        assert_eq!(sub_category_rows(&view)[0].sub_category, "Phones");
        assert_eq!(category_rows(&view)[0].change, "+0.0%");
        assert_eq!(insight_rows(&view).len(), view.insights.len());
    }
}
