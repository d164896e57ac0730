//! Rule-based insights over one render cycle's aggregates
//!
//! Rules run in a fixed order and each contributes at most one insight. The
//! output keeps rule order; it is not ranked by kind.

use std::fmt;

use serde::Serialize;

use crate::aggregate::{profit_margin, CategorySales, StateSales};
use crate::dashboard::KpiSet;
use crate::util::format_percent;

/// Sales growth above this (percent) is called out as strong.
pub const STRONG_GROWTH_PCT: f64 = 10.0;
/// Sales change below this (percent) is called out as a decline.
pub const DECLINE_PCT: f64 = -5.0;
pub const LOW_MARGIN_PCT: f64 = 5.0;
pub const HEALTHY_MARGIN_PCT: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Positive,
    Negative,
    Neutral,
    Highlight,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::Positive => "positive",
            InsightKind::Negative => "negative",
            InsightKind::Neutral => "neutral",
            InsightKind::Highlight => "highlight",
        }
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
}

impl Insight {
    fn new(kind: InsightKind, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Everything the rules look at.
pub struct InsightInput<'a> {
    pub kpis: &'a KpiSet,
    pub categories: &'a [CategorySales],
    pub states: &'a [StateSales],
}

type Rule = fn(&InsightInput<'_>) -> Option<Insight>;

const RULES: [Rule; 4] = [sales_growth, top_category, top_state, margin_health];

fn sales_growth(input: &InsightInput<'_>) -> Option<Insight> {
    let change = input.kpis.sales.change;
    if change > STRONG_GROWTH_PCT {
        Some(Insight::new(
            InsightKind::Positive,
            "Strong Sales Growth",
            format!(
                "Sales increased by {:.1}% compared to last year, indicating strong market performance.",
                change
            ),
        ))
    } else if change < DECLINE_PCT {
        Some(Insight::new(
            InsightKind::Negative,
            "Sales Decline",
            format!(
                "Sales decreased by {:.1}% compared to last year. Review market conditions and strategies.",
                change.abs()
            ),
        ))
    } else {
        None
    }
}

fn top_category(input: &InsightInput<'_>) -> Option<Insight> {
    let top = input.categories.first()?;
    Some(Insight::new(
        InsightKind::Highlight,
        format!("{} Leading Category", top.category),
        format!(
            "{} generates the highest revenue with {} YoY growth.",
            top.category,
            format_percent(top.change)
        ),
    ))
}

fn top_state(input: &InsightInput<'_>) -> Option<Insight> {
    let top = input.states.first()?;
    Some(Insight::new(
        InsightKind::Neutral,
        format!("{} Top Performing State", top.state),
        format!(
            "{} leads in sales performance. Consider expanding operations in this region.",
            top.state
        ),
    ))
}

fn margin_health(input: &InsightInput<'_>) -> Option<Insight> {
    // Recomputed from the filtered totals rather than read from the margin KPI.
    let margin = profit_margin(input.kpis.profit.value, input.kpis.sales.value);
    if margin < LOW_MARGIN_PCT {
        Some(Insight::new(
            InsightKind::Negative,
            "Low Profit Margin",
            format!(
                "Current profit margin is {:.1}%. Consider cost optimization strategies.",
                margin
            ),
        ))
    } else if margin > HEALTHY_MARGIN_PCT {
        Some(Insight::new(
            InsightKind::Positive,
            "Healthy Profit Margin",
            format!(
                "Profit margin of {:.1}% indicates efficient operations and pricing.",
                margin
            ),
        ))
    } else {
        None
    }
}

pub fn generate_insights(input: &InsightInput<'_>) -> Vec<Insight> {
    let insights: Vec<Insight> = RULES.iter().filter_map(|rule| rule(input)).collect();
    tracing::debug!(count = insights.len(), "Insights generated");
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::rollup_categories;
    use crate::dashboard::Kpi;
    use crate::types::Row;

    fn kpis(sales: f64, sales_change: f64, profit: f64) -> KpiSet {
        KpiSet {
            sales: Kpi::new(sales, sales_change, [0.0; 12]),
            profit: Kpi::new(profit, 0.0, [0.0; 12]),
            profit_margin: Kpi::new(profit_margin(profit, sales), 0.0, [0.0; 12]),
            orders: Kpi::new(1.0, 0.0, [0.0; 12]),
            quantity: Kpi::new(1.0, 0.0, [0.0; 12]),
        }
    }

    fn run(kpis: &KpiSet) -> Vec<Insight> {
        generate_insights(&InsightInput {
            kpis,
            categories: &[],
            states: &[],
        })
    }

    fn growth_insights(change: f64) -> Vec<Insight> {
        // 10% margin keeps the margin rule quiet
        run(&kpis(100.0, change, 10.0))
    }

    #[test]
    fn test_strong_growth() {
        let insights = growth_insights(12.5);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::Positive);
        assert!(insights[0].description.contains("12.5%"));
    }

    #[test]
    fn test_sales_decline() {
        let insights = growth_insights(-6.0);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::Negative);
        assert!(insights[0].description.contains("6.0%"));
    }

    #[test]
    fn test_flat_sales_no_growth_insight() {
        assert!(growth_insights(3.0).is_empty());
        assert!(growth_insights(10.0).is_empty());
        assert!(growth_insights(-5.0).is_empty());
    }

    #[test]
    fn test_margin_rules() {
        let low = run(&kpis(100.0, 0.0, 2.0));
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].title, "Low Profit Margin");
        assert!(low[0].description.contains("2.0%"));

        let healthy = run(&kpis(100.0, 0.0, 20.0));
        assert_eq!(healthy[0].kind, InsightKind::Positive);
        assert_eq!(healthy[0].title, "Healthy Profit Margin");

        // No sales means a zero margin, which reads as low
        let empty = run(&kpis(0.0, 0.0, 0.0));
        assert_eq!(empty[0].title, "Low Profit Margin");
    }

    #[test]
    fn test_rule_order_and_top_entries() {
        let categories = vec![
            CategorySales {
                category: "Technology".to_string(),
                sales: 300.0,
                change: -2.4,
            },
            CategorySales {
                category: "Furniture".to_string(),
                sales: 100.0,
                change: 40.0,
            },
        ];
        let states = vec![StateSales {
            state: "California".to_string(),
            sales: 500.0,
        }];
        let k = kpis(1000.0, 25.0, 300.0);
        let insights = generate_insights(&InsightInput {
            kpis: &k,
            categories: &categories,
            states: &states,
        });

        let kinds: Vec<InsightKind> = insights.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                InsightKind::Positive,
                InsightKind::Highlight,
                InsightKind::Neutral,
                InsightKind::Positive,
            ]
        );
        assert_eq!(insights[1].title, "Technology Leading Category");
        assert!(insights[1].description.contains("with -2.4% YoY growth"));
        assert_eq!(insights[2].title, "California Top Performing State");
    }

    #[test]
    fn test_positive_category_change_is_signed() {
        let categories = vec![CategorySales {
            category: "Furniture".to_string(),
            sales: 1.0,
            change: 0.0,
        }];
        let k = kpis(100.0, 0.0, 10.0);
        let insights = generate_insights(&InsightInput {
            kpis: &k,
            categories: &categories,
            states: &[],
        });
        assert_eq!(insights.len(), 1);
        assert!(insights[0].description.contains("+0.0% YoY growth"));
    }

    #[test]
    fn test_flat_negative_sales_read_as_unsigned_zero() {
        // Returns booked as negative sales, equal in both years
        let ret = |year| Row {
            year: Some(year),
            month_index: Some(0),
            category: Some("Returns".to_string()),
            sales: -40.0,
            ..Default::default()
        };
        let (current, previous) = (ret(2022), ret(2021));
        let categories = rollup_categories(&[&current], &[&previous]);
        let k = kpis(-40.0, 0.0, 0.0);
        let insights = generate_insights(&InsightInput {
            kpis: &k,
            categories: &categories,
            states: &[],
        });

        assert_eq!(insights.len(), 2);
        assert_eq!(
            insights[0].description,
            "Returns generates the highest revenue with +0.0% YoY growth."
        );
        assert_eq!(
            insights[1].description,
            "Current profit margin is 0.0%. Consider cost optimization strategies."
        );
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&InsightKind::Highlight).unwrap(),
            "\"highlight\""
        );
    }
}
