//! Filter selection and period partitioning

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::Error;
use crate::loader::Dataset;
use crate::types::Row;

/// Calendar month, in calendar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Month for a zero-based index (January = 0).
    pub fn from_index(index: u32) -> Option<Month> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(&self) -> u32 {
        *self as u32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Month {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Month::ALL
            .iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| Error::InvalidFilter(format!("Unknown month: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MonthFilter {
    #[default]
    All,
    Only(Month),
}

impl MonthFilter {
    pub fn matches(&self, month_index: Option<u32>) -> bool {
        match self {
            MonthFilter::All => true,
            MonthFilter::Only(m) => month_index == Some(m.index()),
        }
    }
}

impl fmt::Display for MonthFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthFilter::All => write!(f, "All"),
            MonthFilter::Only(m) => write!(f, "{}", m),
        }
    }
}

impl FromStr for MonthFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(MonthFilter::All)
        } else {
            s.parse().map(MonthFilter::Only)
        }
    }
}

impl Serialize for MonthFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum SegmentFilter {
    #[default]
    All,
    Only(String),
}

impl SegmentFilter {
    pub fn matches(&self, segment: Option<&str>) -> bool {
        match self {
            SegmentFilter::All => true,
            SegmentFilter::Only(s) => segment == Some(s.as_str()),
        }
    }
}

impl fmt::Display for SegmentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentFilter::All => write!(f, "All"),
            SegmentFilter::Only(s) => write!(f, "{}", s),
        }
    }
}

impl FromStr for SegmentFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            Err(Error::InvalidFilter("Segment must not be empty".to_string()))
        } else if s.eq_ignore_ascii_case("all") {
            Ok(SegmentFilter::All)
        } else {
            Ok(SegmentFilter::Only(s.to_string()))
        }
    }
}

impl Serialize for SegmentFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The user's current year / month / segment choice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilterSelection {
    pub year: i32,
    pub month: MonthFilter,
    pub segment: SegmentFilter,
}

impl FilterSelection {
    pub fn new(year: i32, month: MonthFilter, segment: SegmentFilter) -> Self {
        Self {
            year,
            month,
            segment,
        }
    }

    /// Latest year present in the dataset with no month or segment
    /// restriction. Falls back to year 0 for an empty dataset.
    pub fn default_for(dataset: &Dataset) -> Self {
        let year = available_years(dataset).first().copied().unwrap_or(0);
        Self::new(year, MonthFilter::All, SegmentFilter::All)
    }

    /// Same month/segment predicate, one year earlier. `None` when there is
    /// no earlier `i32` year.
    pub fn prior_year(&self) -> Option<Self> {
        let year = self.year.checked_sub(1)?;
        Some(Self {
            year,
            ..self.clone()
        })
    }

    pub fn matches(&self, row: &Row) -> bool {
        match row.year {
            Some(y) if y == self.year => {
                self.month.matches(row.month_index) && self.segment.matches(row.segment.as_deref())
            }
            _ => false,
        }
    }
}

/// Rows of `dataset` matching the given year, month and segment, in dataset
/// order. Rows without an order date never match.
pub fn select_period<'a>(
    dataset: &'a Dataset,
    year: i32,
    month: &MonthFilter,
    segment: &SegmentFilter,
) -> Vec<&'a Row> {
    let selection = FilterSelection::new(year, *month, segment.clone());
    dataset
        .rows()
        .iter()
        .filter(|row| selection.matches(row))
        .collect()
}

/// Current period and prior-year-same-period subsets for one selection.
#[derive(Debug, Clone)]
pub struct PeriodPair<'a> {
    pub current: Vec<&'a Row>,
    pub previous: Vec<&'a Row>,
}

pub fn select_periods<'a>(dataset: &'a Dataset, selection: &FilterSelection) -> PeriodPair<'a> {
    let current = select_period(dataset, selection.year, &selection.month, &selection.segment);
    let previous = match selection.prior_year() {
        Some(prior) => select_period(dataset, prior.year, &prior.month, &prior.segment),
        None => Vec::new(),
    };
    PeriodPair { current, previous }
}

/// Distinct years present in the dataset, newest first.
pub fn available_years(dataset: &Dataset) -> Vec<i32> {
    let years: BTreeSet<i32> = dataset.rows().iter().filter_map(|r| r.year).collect();
    years.into_iter().rev().collect()
}

/// Distinct segment names, alphabetically.
pub fn available_segments(dataset: &Dataset) -> Vec<String> {
    let segments: BTreeSet<&str> = dataset
        .rows()
        .iter()
        .filter_map(|r| r.segment.as_deref())
        .collect();
    segments.into_iter().map(str::to_string).collect()
}
