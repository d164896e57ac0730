use chrono::NaiveDate;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::util::parse_f64_safe;

/// A single cell as produced by the ETL step. Spreadsheet exports mix numbers
/// and numeric-looking strings, so both are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Number(f64),
    Text(String),
    /// Booleans, arrays, objects: kept so the row still loads, read as absent.
    Other(IgnoredAny),
}

impl Field {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::Number(n) if n.is_finite() => Some(*n),
            Field::Number(_) => None,
            Field::Text(s) => parse_f64_safe(Some(s)),
            Field::Other(_) => None,
        }
    }

    /// Text view of the cell. Numbers keep their shortest form so an order id
    /// exported as `1234` still reads `"1234"`.
    pub fn as_text(&self) -> Option<String> {
        let s = match self {
            Field::Text(s) => s.trim().to_string(),
            Field::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Field::Number(n) => n.to_string(),
            Field::Other(_) => return None,
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

/// One transaction line as handed over by the ETL collaborator. Any field may
/// be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Order Date", default)]
    pub order_date: Option<Field>,
    #[serde(rename = "Ship Date", default)]
    pub ship_date: Option<Field>,
    #[serde(rename = "Sales", default)]
    pub sales: Option<Field>,
    #[serde(rename = "Profit", default)]
    pub profit: Option<Field>,
    #[serde(rename = "Quantity", default)]
    pub quantity: Option<Field>,
    #[serde(rename = "Discount", default)]
    pub discount: Option<Field>,
    #[serde(rename = "Category", default)]
    pub category: Option<Field>,
    #[serde(rename = "Sub-Category", default)]
    pub sub_category: Option<Field>,
    #[serde(rename = "Segment", default)]
    pub segment: Option<Field>,
    #[serde(rename = "State", default)]
    pub state: Option<Field>,
    #[serde(rename = "Order ID", default)]
    pub order_id: Option<Field>,
}

/// A loaded transaction line with its temporal keys derived once.
///
/// `year` and `month_index` are `Some` exactly when `order_date` is.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    pub order_date: Option<NaiveDate>,
    pub ship_date: Option<NaiveDate>,
    pub year: Option<i32>,
    /// Zero-based month, January = 0.
    pub month_index: Option<u32>,
    pub sales: f64,
    pub profit: f64,
    pub quantity: i64,
    pub discount: f64,
    pub order_id: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub segment: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KpiCardRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Change")]
    #[tabled(rename = "vs PY")]
    pub change: String,
    #[serde(rename = "Trend")]
    #[tabled(rename = "Trend (12 mo)")]
    pub trend: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct StateSalesRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "State")]
    #[tabled(rename = "State")]
    pub state: String,
    #[serde(rename = "Sales")]
    #[tabled(rename = "Sales")]
    pub sales: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CategorySalesRow {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Sales")]
    #[tabled(rename = "Sales")]
    pub sales: String,
    #[serde(rename = "YoYChange")]
    #[tabled(rename = "YoYChange")]
    pub change: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SegmentShareRow {
    #[serde(rename = "Segment")]
    #[tabled(rename = "Segment")]
    pub segment: String,
    #[serde(rename = "CurrentYear")]
    #[tabled(rename = "CurrentYear")]
    pub current_year: String,
    #[serde(rename = "PreviousYear")]
    #[tabled(rename = "PreviousYear")]
    pub previous_year: String,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub percentage: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SubCategoryShareRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "SubCategory")]
    #[tabled(rename = "SubCategory")]
    pub sub_category: String,
    #[serde(rename = "Sales")]
    #[tabled(rename = "Sales")]
    pub sales: String,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub percentage: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct InsightRow {
    #[serde(rename = "Kind")]
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[serde(rename = "Title")]
    #[tabled(rename = "Title")]
    pub title: String,
    #[serde(rename = "Description")]
    #[tabled(rename = "Description")]
    pub description: String,
}
