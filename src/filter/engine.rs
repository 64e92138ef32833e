//! Row predicates over the immutable dataset

use super::{FilterSelection, Selection};
use crate::dataset::{BenefitRecord, Column, ColumnSet, Dataset};
use log::debug;

/// Borrowed subset of dataset rows
///
/// Carries the source column set so aggregations can tell an absent column
/// apart from a column whose values happen to be missing.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    records: Vec<&'a BenefitRecord>,
    columns: &'a ColumnSet,
}

impl<'a> FilteredView<'a> {
    /// Every row of the dataset, unfiltered
    pub fn all(dataset: &'a Dataset) -> Self {
        Self {
            records: dataset.records().iter().collect(),
            columns: dataset.columns(),
        }
    }

    fn matching<F>(dataset: &'a Dataset, predicate: F) -> Self
    where
        F: Fn(&BenefitRecord) -> bool,
    {
        Self {
            records: dataset.records().iter().filter(|r| predicate(*r)).collect(),
            columns: dataset.columns(),
        }
    }

    pub fn records(&self) -> &[&'a BenefitRecord] {
        &self.records
    }

    pub fn columns(&self) -> &ColumnSet {
        self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a BenefitRecord> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Applies a set selection to one categorical column
///
/// A selection on a column the file does not carry is ignored.
fn set_predicate<'s>(
    columns: &ColumnSet,
    column: Column,
    selection: &'s Selection,
) -> Option<&'s Selection> {
    if !selection.is_constrained() {
        return None;
    }
    if !columns.contains(column) {
        debug!("Ignoring {} filter: column not present in dataset", column);
        return None;
    }
    Some(selection)
}

/// Keep rows matching the date range, region and category selections
///
/// The selection must already be validated; an inverted range simply
/// matches nothing.
pub fn filter<'a>(dataset: &'a Dataset, selection: &FilterSelection) -> FilteredView<'a> {
    let start = selection.start_month();
    let end = selection.end_month();
    let regions = set_predicate(dataset.columns(), Column::Region, &selection.regions);
    let categories = set_predicate(
        dataset.columns(),
        Column::DiagnosisCategory,
        &selection.categories,
    );

    let view = FilteredView::matching(dataset, |r| {
        r.month >= start
            && r.month <= end
            && regions.map_or(true, |s| s.allows(r.region.as_deref()))
            && categories.map_or(true, |s| s.allows(r.diagnosis_category.as_deref()))
    });

    debug!(
        "Filter {}..{} kept {} of {} rows",
        start.format("%Y-%m"),
        end.format("%Y-%m"),
        view.len(),
        dataset.len()
    );
    view
}

/// Rows restricted by the region selection only
///
/// Date and category filters are deliberately not applied, so a
/// denominator computed from this view stays fixed while the user moves the
/// date range.
pub fn region_baseline<'a>(dataset: &'a Dataset, regions: &Selection) -> FilteredView<'a> {
    match set_predicate(dataset.columns(), Column::Region, regions) {
        Some(selection) => FilteredView::matching(dataset, |r| selection.allows(r.region.as_deref())),
        None => FilteredView::all(dataset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Dataset {
        Dataset::from_records(vec![
            BenefitRecord::new(ymd(2024, 6, 1), 10.0, 100.0).with_region("Norte").with_category("A"),
            BenefitRecord::new(ymd(2024, 6, 1), 5.0, 100.0).with_region("Norte").with_category("B"),
            BenefitRecord::new(ymd(2024, 7, 1), 20.0, 200.0).with_region("Sul").with_category("A"),
            BenefitRecord::new(ymd(2024, 8, 1), 7.0, 200.0).with_region("Sul").with_category("B"),
        ])
    }

    fn full_range() -> FilterSelection {
        FilterSelection::new(ymd(2024, 6, 1), ymd(2024, 8, 1))
    }

    #[test]
    fn test_unset_and_all_without_nulls_keep_everything() {
        let dataset = sample();
        assert_eq!(filter(&dataset, &full_range()).len(), 4);
        assert_eq!(
            filter(&dataset, &full_range().with_regions(Selection::All).with_categories(Selection::All)).len(),
            4
        );
    }

    #[test]
    fn test_all_drops_rows_without_a_value() {
        let dataset = Dataset::from_records(vec![
            BenefitRecord::new(ymd(2024, 6, 1), 10.0, 100.0).with_region("Norte").with_category("A"),
            BenefitRecord::new(ymd(2024, 6, 1), 7.0, 100.0).with_category("A"),
            BenefitRecord::new(ymd(2024, 6, 1), 3.0, 100.0).with_region("Norte"),
        ]);
        let range = FilterSelection::new(ymd(2024, 6, 1), ymd(2024, 6, 1));

        let everything = filter(
            &dataset,
            &range.clone().with_regions(Selection::All).with_categories(Selection::All),
        );
        let listed = filter(
            &dataset,
            &range
                .clone()
                .with_regions(Selection::subset(["Norte"]))
                .with_categories(Selection::subset(["A"])),
        );

        assert_eq!(everything.len(), 1);
        assert_eq!(everything.records()[0].benefit_count, 10.0);
        assert_eq!(everything.records(), listed.records());

        // Untouched controls keep the rows without a value
        assert_eq!(filter(&dataset, &range).len(), 3);
        assert_eq!(region_baseline(&dataset, &Selection::All).len(), 2);
    }

    #[test]
    fn test_full_region_set_matches_unfiltered() {
        let dataset = sample();
        let all = filter(&dataset, &full_range());
        let full = filter(&dataset, &full_range().with_regions(Selection::subset(["Norte", "Sul"])));

        assert_eq!(all.records(), full.records());
    }

    #[test]
    fn test_cleared_selection_yields_nothing() {
        let dataset = sample();
        assert!(filter(&dataset, &full_range().with_regions(Selection::none())).is_empty());
        assert!(filter(&dataset, &full_range().with_categories(Selection::none())).is_empty());
    }

    #[test]
    fn test_filters_compose_by_conjunction() {
        let dataset = sample();
        let selection = full_range()
            .with_regions(Selection::subset(["Sul"]))
            .with_categories(Selection::subset(["A"]));
        let view = filter(&dataset, &selection);

        assert_eq!(view.len(), 1);
        assert_eq!(view.records()[0].benefit_count, 20.0);
    }

    #[test]
    fn test_date_filter_is_month_granular_and_inclusive() {
        let dataset = sample();

        // A single day mid-month still matches the whole month
        let single_day = FilterSelection::new(ymd(2024, 6, 15), ymd(2024, 6, 15));
        assert_eq!(filter(&dataset, &single_day).len(), 2);

        // Both ends inclusive
        let span = FilterSelection::new(ymd(2024, 7, 31), ymd(2024, 8, 2));
        let view = filter(&dataset, &span);
        assert_eq!(view.len(), 2);
        assert!(view.iter().all(|r| r.region.as_deref() == Some("Sul")));
    }

    #[test]
    fn test_selection_on_absent_column_is_ignored() {
        let columns: ColumnSet = [Column::Month, Column::BenefitCount].into_iter().collect();
        let dataset = Dataset::new(
            vec![BenefitRecord::new(ymd(2024, 6, 1), 1.0, 0.0)],
            columns,
        );
        let selection = FilterSelection::new(ymd(2024, 6, 1), ymd(2024, 6, 1))
            .with_regions(Selection::subset(["Norte"]));

        assert_eq!(filter(&dataset, &selection).len(), 1);
    }

    #[test]
    fn test_region_baseline_ignores_dates_and_categories() {
        let dataset = sample();
        let baseline = region_baseline(&dataset, &Selection::subset(["Sul"]));
        assert_eq!(baseline.len(), 2);

        assert_eq!(region_baseline(&dataset, &Selection::Unset).len(), 4);
        assert!(region_baseline(&dataset, &Selection::none()).is_empty());
    }

    #[test]
    fn test_source_is_not_mutated() {
        let dataset = sample();
        let before = dataset.records().to_vec();
        let _ = filter(&dataset, &full_range().with_regions(Selection::none()));
        assert_eq!(dataset.records(), before.as_slice());
    }
}
