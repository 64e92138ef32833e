//! Headline indicators for the filtered period

use super::{first_population_by_region, rate_per_100k};
use crate::dataset::Column;
use crate::filter::FilteredView;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sum of benefit counts (0 when empty or the count column is absent)
pub fn total_count(view: &FilteredView<'_>) -> f64 {
    if !view.columns().contains(Column::BenefitCount) {
        return 0.0;
    }
    view.iter().map(|r| r.benefit_count).sum()
}

/// Population covered by the regions present in the view
///
/// Each region contributes its population once, however many rows it has.
pub fn covered_population(view: &FilteredView<'_>) -> f64 {
    if view.columns().first_missing(&[Column::Region, Column::Population]).is_some() {
        return 0.0;
    }
    first_population_by_region(view).values().sum()
}

/// Benefits per 100k inhabitants of the covered population
pub fn overall_rate(total: f64, population: f64) -> f64 {
    rate_per_100k(total, population)
}

/// Number of distinct year-months in the view
pub fn distinct_months(view: &FilteredView<'_>) -> usize {
    view.iter()
        .map(|r| r.month_key.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

/// The four indicator cards
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub total_benefits: f64,
    pub covered_population: f64,
    /// Benefits per 100k inhabitants
    pub overall_rate: f64,
    pub distinct_months: usize,
}

impl Indicators {
    pub fn compute(view: &FilteredView<'_>) -> Self {
        let total_benefits = total_count(view);
        let covered_population = covered_population(view);

        Self {
            total_benefits,
            covered_population,
            overall_rate: overall_rate(total_benefits, covered_population),
            distinct_months: distinct_months(view),
        }
    }
}
