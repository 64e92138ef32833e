//! Aggregation pipeline: indicators and chart tables over a filtered view
//!
//! Every chart aggregation returns an [`Availability`]: either the computed
//! table or the reason it cannot be drawn (empty selection, absent column,
//! zero denominator). A skipped chart never aborts the rest of the report.

mod indicators;
mod charts;

pub use indicators::{covered_population, distinct_months, overall_rate, total_count, Indicators};
pub use charts::{
    age_sort_key, by_age_bracket, by_region_share, by_type, pareto_by_status,
    population_by_region, rate_by_month_sex, rate_by_region, AgeBracketTotal, MonthSexRate,
    MonthSexRates, ParetoRow, RegionPopulation, RegionRate, RegionShare, RegionShares, TypeTotal,
};

use crate::dataset::Column;
use crate::filter::FilteredView;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Rates are expressed per 100,000 inhabitants
pub const RATE_SCALE: f64 = 100_000.0;

/// `count / population * 100000`, or 0 when there is no population
pub fn rate_per_100k(count: f64, population: f64) -> f64 {
    if population > 0.0 {
        count / population * RATE_SCALE
    } else {
        0.0
    }
}

/// Why an aggregation produced no data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "column", rename_all = "snake_case")]
pub enum SkipReason {
    /// A column the aggregation needs is not in the file
    MissingColumn(Column),
    /// The filters matched no rows
    NoRows,
    /// Every group summed to zero
    ZeroTotal,
    /// No region carries a positive population
    NoPositivePopulation,
    /// The population denominator is zero
    ZeroDenominator,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingColumn(column) => write!(f, "column '{}' not found", column),
            SkipReason::NoRows => f.write_str("no data matches the selected filters"),
            SkipReason::ZeroTotal => f.write_str("insufficient or zeroed data"),
            SkipReason::NoPositivePopulation => f.write_str("no region with a positive population"),
            SkipReason::ZeroDenominator => f.write_str("population denominator is zero"),
        }
    }
}

/// Result of a capability-checked aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Availability<T> {
    Available(T),
    Unavailable(SkipReason),
}

impl<T> Availability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Availability::Available(data) => Some(data),
            Availability::Unavailable(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Availability::Available(_) => None,
            Availability::Unavailable(reason) => Some(*reason),
        }
    }
}

impl<T> From<Result<T, SkipReason>> for Availability<T> {
    fn from(result: Result<T, SkipReason>) -> Self {
        match result {
            Ok(data) => Availability::Available(data),
            Err(reason) => Availability::Unavailable(reason),
        }
    }
}

/// Preconditions shared by the chart aggregations
fn require(view: &FilteredView<'_>, columns: &[Column]) -> Result<(), SkipReason> {
    if view.is_empty() {
        return Err(SkipReason::NoRows);
    }
    match view.columns().first_missing(columns) {
        Some(column) => Err(SkipReason::MissingColumn(column)),
        None => Ok(()),
    }
}

/// Sum of benefit counts per value of a categorical column
///
/// Rows without a value for the column are left out. Keys come back sorted.
fn sum_by(view: &FilteredView<'_>, column: Column) -> BTreeMap<String, f64> {
    let mut sums = BTreeMap::new();
    for record in view.iter() {
        if let Some(key) = record.category_value(column) {
            *sums.entry(key.to_string()).or_insert(0.0) += record.benefit_count;
        }
    }
    sums
}

/// Population of each region, taken from the first row seen for it
///
/// Population repeats on every row of a region, so it is never summed.
fn first_population_by_region(view: &FilteredView<'_>) -> BTreeMap<String, f64> {
    let mut populations = BTreeMap::new();
    for record in view.iter() {
        if let Some(region) = record.region.as_deref() {
            populations
                .entry(region.to_string())
                .or_insert(record.population);
        }
    }
    populations
}

/// Sort groups by value, largest first; ties keep key order
fn sorted_descending(sums: BTreeMap<String, f64>) -> Vec<(String, f64)> {
    let mut groups: Vec<(String, f64)> = sums.into_iter().collect();
    groups.sort_by(|a, b| b.1.total_cmp(&a.1));
    groups
}
