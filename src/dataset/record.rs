//! Benefit record and column definitions matching the base_final.csv format

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Known input columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Column {
    /// Reference month (required)
    Month,
    /// Number of benefits granted
    BenefitCount,
    /// Region population (constant per region)
    Population,
    Region,
    DiagnosisCategory,
    BenefitType,
    BeneficiaryStatus,
    AgeBracket,
    Sex,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::Month,
        Column::BenefitCount,
        Column::Population,
        Column::Region,
        Column::DiagnosisCategory,
        Column::BenefitType,
        Column::BeneficiaryStatus,
        Column::AgeBracket,
        Column::Sex,
    ];

    /// Header name in the CSV file (case-sensitive)
    pub fn header(&self) -> &'static str {
        match self {
            Column::Month => "MES",
            Column::BenefitCount => "QTD_BENEFICIOS",
            Column::Population => "POPULACAO",
            Column::Region => "REGIAO_PAIS",
            Column::DiagnosisCategory => "CID_TIPO",
            Column::BenefitType => "BENEF_TIPO",
            Column::BeneficiaryStatus => "STATUS_BENEFICIARIO",
            Column::AgeBracket => "IDADE_FAIXA",
            Column::Sex => "SEXO",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Set of columns present in a loaded file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet(BTreeSet<Column>);

impl ColumnSet {
    /// Every known column
    pub fn all() -> Self {
        Self(Column::ALL.into_iter().collect())
    }

    pub fn insert(&mut self, column: Column) {
        self.0.insert(column);
    }

    pub fn contains(&self, column: Column) -> bool {
        self.0.contains(&column)
    }

    /// First column of `required` that is absent, if any
    pub fn first_missing(&self, required: &[Column]) -> Option<Column> {
        required.iter().copied().find(|c| !self.contains(*c))
    }

    pub fn iter(&self) -> impl Iterator<Item = Column> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Column> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = Column>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Truncate a date to the first day of its month
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Canonical "YYYY-MM" key for a month
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// A single row of the pre-aggregated benefits table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenefitRecord {
    /// Reference month, always the first day
    pub month: NaiveDate,

    /// "YYYY-MM" formatting of `month`
    pub month_key: String,

    pub region: Option<String>,

    /// CID (diagnosis code) category
    pub diagnosis_category: Option<String>,

    pub benefit_type: Option<String>,

    pub beneficiary_status: Option<String>,

    /// Age bracket label, e.g. "60-69" or "70+"
    pub age_bracket: Option<String>,

    pub sex: Option<String>,

    /// Number of benefits (0 when the cell could not be read as a number)
    pub benefit_count: f64,

    /// Population of the row's region, repeated on every row of that region
    pub population: f64,
}

impl BenefitRecord {
    /// Create a record for the given month with no categorical values set
    pub fn new(month: NaiveDate, benefit_count: f64, population: f64) -> Self {
        let month = first_of_month(month);
        Self {
            month,
            month_key: month_key(month),
            region: None,
            diagnosis_category: None,
            benefit_type: None,
            beneficiary_status: None,
            age_bracket: None,
            sex: None,
            benefit_count,
            population,
        }
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.diagnosis_category = Some(category.to_string());
        self
    }

    pub fn with_benefit_type(mut self, benefit_type: &str) -> Self {
        self.benefit_type = Some(benefit_type.to_string());
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.beneficiary_status = Some(status.to_string());
        self
    }

    pub fn with_age_bracket(mut self, age_bracket: &str) -> Self {
        self.age_bracket = Some(age_bracket.to_string());
        self
    }

    pub fn with_sex(mut self, sex: &str) -> Self {
        self.sex = Some(sex.to_string());
        self
    }

    /// Categorical value of a column, if the column is categorical and set
    pub fn category_value(&self, column: Column) -> Option<&str> {
        match column {
            Column::Region => self.region.as_deref(),
            Column::DiagnosisCategory => self.diagnosis_category.as_deref(),
            Column::BenefitType => self.benefit_type.as_deref(),
            Column::BeneficiaryStatus => self.beneficiary_status.as_deref(),
            Column::AgeBracket => self.age_bracket.as_deref(),
            Column::Sex => self.sex.as_deref(),
            Column::Month => Some(self.month_key.as_str()),
            Column::BenefitCount | Column::Population => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_month_is_normalized() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 17).unwrap();
        let record = BenefitRecord::new(date, 3.0, 10.0);

        assert_eq!(record.month, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(record.month_key, "2024-06");
    }

    #[test]
    fn test_column_set_first_missing() {
        let columns: ColumnSet = [Column::Month, Column::Region].into_iter().collect();

        assert_eq!(columns.first_missing(&[Column::Month, Column::Region]), None);
        assert_eq!(
            columns.first_missing(&[Column::Region, Column::Population, Column::Sex]),
            Some(Column::Population)
        );
        assert!(ColumnSet::all().first_missing(&Column::ALL).is_none());
    }

    #[test]
    fn test_category_value() {
        let record = BenefitRecord::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 1.0, 1.0)
            .with_region("Sul")
            .with_sex("F");

        assert_eq!(record.category_value(Column::Region), Some("Sul"));
        assert_eq!(record.category_value(Column::Sex), Some("F"));
        assert_eq!(record.category_value(Column::AgeBracket), None);
        assert_eq!(record.category_value(Column::Month), Some("2025-01"));
    }
}
