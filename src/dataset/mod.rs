//! Benefit records and dataset loading

mod record;
pub mod loader;

pub use record::{first_of_month, month_key, BenefitRecord, Column, ColumnSet};
pub use loader::{
    load, load_default, load_from_reader, parse_month, parse_month_arg, LoadError,
    DEFAULT_DATASET_PATH,
};

/// The full benefits table, immutable once loaded
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<BenefitRecord>,
    columns: ColumnSet,
}

impl Dataset {
    /// Build a dataset from records and the set of columns the source carried
    pub fn new(records: Vec<BenefitRecord>, columns: ColumnSet) -> Self {
        Self { records, columns }
    }

    /// Build a dataset where every known column is considered present
    pub fn from_records(records: Vec<BenefitRecord>) -> Self {
        Self::new(records, ColumnSet::all())
    }

    pub fn records(&self) -> &[BenefitRecord] {
        &self.records
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
