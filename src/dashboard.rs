//! Dashboard facade: one loaded dataset, recomputed per selection
//!
//! Loads the benefits table once, then produces a complete report (indicators
//! plus every chart table) for each filter selection without touching the
//! file again.

use crate::aggregate::{
    by_age_bracket, by_region_share, by_type, pareto_by_status, population_by_region,
    rate_by_month_sex, rate_by_region, AgeBracketTotal, Availability, Indicators, MonthSexRates,
    ParetoRow, RegionPopulation, RegionRate, RegionShares, SkipReason, TypeTotal,
};
use crate::dataset::{self, Dataset, LoadError};
use crate::filter::{filter, region_baseline, FilterOptions, FilterSelection, FilterValidationError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every chart table of the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charts {
    pub by_region: Availability<RegionShares>,
    pub by_type: Availability<Vec<TypeTotal>>,
    pub pareto_by_status: Availability<Vec<ParetoRow>>,
    pub by_age_bracket: Availability<Vec<AgeBracketTotal>>,
    pub rate_by_region: Availability<Vec<RegionRate>>,
    pub rate_by_month_sex: Availability<MonthSexRates>,
    pub population_by_region: Availability<Vec<RegionPopulation>>,
}

impl Charts {
    /// Charts that could not be computed, with the reason
    pub fn skipped(&self) -> Vec<(&'static str, SkipReason)> {
        [
            ("by_region", self.by_region.skip_reason()),
            ("by_type", self.by_type.skip_reason()),
            ("pareto_by_status", self.pareto_by_status.skip_reason()),
            ("by_age_bracket", self.by_age_bracket.skip_reason()),
            ("rate_by_region", self.rate_by_region.skip_reason()),
            ("rate_by_month_sex", self.rate_by_month_sex.skip_reason()),
            ("population_by_region", self.population_by_region.skip_reason()),
        ]
        .into_iter()
        .filter_map(|(name, reason)| reason.map(|r| (name, r)))
        .collect()
    }
}

/// Everything the presentation layer needs for one selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub selection: FilterSelection,
    /// Rows left after filtering
    pub row_count: usize,
    pub indicators: Indicators,
    pub charts: Charts,
}

impl DashboardReport {
    /// Whether any row matched the selection
    pub fn has_data(&self) -> bool {
        self.row_count > 0
    }
}

/// Pre-loaded dashboard
///
/// # Example
/// ```ignore
/// let dashboard = Dashboard::load_default()?;
/// let selection = dashboard.default_selection().unwrap();
/// let report = dashboard.compute(&selection)?;
/// println!("Total: {}", report.indicators.total_benefits);
/// ```
#[derive(Debug, Clone)]
pub struct Dashboard {
    dataset: Dataset,
    options: FilterOptions,
}

impl Dashboard {
    pub fn new(dataset: Dataset) -> Self {
        let options = FilterOptions::from_dataset(&dataset);
        Self { dataset, options }
    }

    /// Create dashboard by loading the table from a CSV file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Ok(Self::new(dataset::load(path)?))
    }

    /// Create dashboard from the default output/base_final.csv location
    pub fn load_default() -> Result<Self, LoadError> {
        Ok(Self::new(dataset::load_default()?))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Months, regions and categories available to the controls
    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Initial page state (full range, everything selected)
    pub fn default_selection(&self) -> Option<FilterSelection> {
        self.options.default_selection()
    }

    /// Filter the dataset and recompute every indicator and chart
    pub fn compute(&self, selection: &FilterSelection) -> Result<DashboardReport, FilterValidationError> {
        selection.validate()?;

        let view = filter(&self.dataset, selection);
        let baseline = region_baseline(&self.dataset, &selection.regions);

        let charts = Charts {
            by_region: by_region_share(&view),
            by_type: by_type(&view),
            pareto_by_status: pareto_by_status(&view),
            by_age_bracket: by_age_bracket(&view),
            rate_by_region: rate_by_region(&view),
            rate_by_month_sex: rate_by_month_sex(&view, &baseline),
            population_by_region: population_by_region(&view),
        };

        if view.is_empty() {
            warn!("No data matches the selected filters");
        } else {
            for (name, reason) in charts.skipped() {
                warn!("Skipping {} chart: {}", name, reason);
            }
        }
        debug!(
            "Computed report over {} rows (baseline {} rows)",
            view.len(),
            baseline.len()
        );

        Ok(DashboardReport {
            selection: selection.clone(),
            row_count: view.len(),
            indicators: Indicators::compute(&view),
            charts,
        })
    }
}
