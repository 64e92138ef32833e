//! User filter selections and the options they are picked from

use crate::dataset::{first_of_month, Column, Dataset};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Recoverable problems with a user selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterValidationError {
    #[error("start date {start} is after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("no date range selected and the dataset has no months to default to")]
    NoDateRange,
}

/// Tri-state multi-select filter
///
/// Keeps "never touched" apart from "explicitly cleared": an empty `Subset`
/// excludes every row and only `Unset` imposes no constraint. `All` behaves
/// like a `Subset` of every available value, so rows with no value are
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "values", rename_all = "snake_case")]
pub enum Selection {
    /// Control never touched
    #[default]
    Unset,
    /// Every available value selected
    All,
    /// Only these values
    Subset(BTreeSet<String>),
}

impl Selection {
    pub fn subset<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Subset(values.into_iter().map(Into::into).collect())
    }

    /// Explicitly cleared selection
    pub fn none() -> Self {
        Selection::Subset(BTreeSet::new())
    }

    /// Whether this selection restricts rows at all
    pub fn is_constrained(&self) -> bool {
        !matches!(self, Selection::Unset)
    }

    /// Whether a row carrying `value` passes this selection
    pub fn allows(&self, value: Option<&str>) -> bool {
        match self {
            Selection::Unset => true,
            Selection::All => value.is_some(),
            Selection::Subset(values) => value.is_some_and(|v| values.contains(v)),
        }
    }
}

impl From<Option<Vec<String>>> for Selection {
    fn from(values: Option<Vec<String>>) -> Self {
        match values {
            Some(values) => Selection::subset(values),
            None => Selection::Unset,
        }
    }
}

/// Values available to the date pickers and multi-selects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Earliest month in the dataset
    pub first_month: Option<NaiveDate>,
    /// Latest month in the dataset
    pub last_month: Option<NaiveDate>,
    /// Sorted distinct regions (empty when the column is absent)
    pub regions: Vec<String>,
    /// Sorted distinct diagnosis categories (empty when the column is absent)
    pub categories: Vec<String>,
}

impl FilterOptions {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let records = dataset.records();
        let distinct = |column: Column| -> Vec<String> {
            if !dataset.columns().contains(column) {
                return Vec::new();
            }
            records
                .iter()
                .filter_map(|r| r.category_value(column))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(str::to_string)
                .collect()
        };

        Self {
            first_month: records.iter().map(|r| r.month).min(),
            last_month: records.iter().map(|r| r.month).max(),
            regions: distinct(Column::Region),
            categories: distinct(Column::DiagnosisCategory),
        }
    }

    /// Initial page state: whole date range, everything selected
    pub fn default_selection(&self) -> Option<FilterSelection> {
        let (start, end) = (self.first_month?, self.last_month?);
        Some(
            FilterSelection::new(start, end)
                .with_regions(Selection::All)
                .with_categories(Selection::All),
        )
    }
}

/// Constraints chosen by the user for one recompute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    /// Inclusive start; only its month matters
    pub date_start: NaiveDate,
    /// Inclusive end; only its month matters
    pub date_end: NaiveDate,
    #[serde(default)]
    pub regions: Selection,
    #[serde(default)]
    pub categories: Selection,
}

impl FilterSelection {
    pub fn new(date_start: NaiveDate, date_end: NaiveDate) -> Self {
        Self {
            date_start,
            date_end,
            regions: Selection::Unset,
            categories: Selection::Unset,
        }
    }

    pub fn with_regions(mut self, regions: Selection) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_categories(mut self, categories: Selection) -> Self {
        self.categories = categories;
        self
    }

    /// Build a selection from optional parts, defaulting the dates to the
    /// dataset's full range
    pub fn resolve(
        options: &FilterOptions,
        date_start: Option<NaiveDate>,
        date_end: Option<NaiveDate>,
        regions: Selection,
        categories: Selection,
    ) -> Result<Self, FilterValidationError> {
        let date_start = date_start
            .or(options.first_month)
            .ok_or(FilterValidationError::NoDateRange)?;
        let date_end = date_end
            .or(options.last_month)
            .ok_or(FilterValidationError::NoDateRange)?;

        let selection = Self::new(date_start, date_end)
            .with_regions(regions)
            .with_categories(categories);
        selection.validate()?;
        Ok(selection)
    }

    pub fn validate(&self) -> Result<(), FilterValidationError> {
        if self.date_start > self.date_end {
            return Err(FilterValidationError::StartAfterEnd {
                start: self.date_start,
                end: self.date_end,
            });
        }
        Ok(())
    }

    /// First day of the starting month
    pub fn start_month(&self) -> NaiveDate {
        first_of_month(self.date_start)
    }

    /// First day of the ending month
    pub fn end_month(&self) -> NaiveDate {
        first_of_month(self.date_end)
    }
}
