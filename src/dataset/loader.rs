//! Load the benefits table from base_final.csv
//!
//! Only the month column is required. Every other known column is optional and
//! its absence is recorded on the returned [`Dataset`] so that downstream
//! aggregations can report themselves unavailable instead of failing.

use super::{first_of_month, BenefitRecord, Column, ColumnSet, Dataset};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{Reader, StringRecord};
use log::{debug, info};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default location of the pre-aggregated benefits table
pub const DEFAULT_DATASET_PATH: &str = "output/base_final.csv";

/// Fatal errors while loading the dataset
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("dataset file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("required column '{0}' not found in dataset")]
    MissingColumn(&'static str),

    #[error("invalid month value '{value}' on line {line}")]
    InvalidMonth { line: u64, value: String },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read dataset: {0}")]
    Io(#[from] io::Error),
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a month cell into the first day of its month
///
/// Accepts full dates, date-times and bare "YYYY-MM" values.
pub fn parse_month(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").ok())?;

    Some(first_of_month(date))
}

/// Parse a month given on the command line
pub fn parse_month_arg(value: &str) -> Result<NaiveDate, String> {
    parse_month(value).ok_or_else(|| format!("'{}' is not a month (expected YYYY-MM or YYYY-MM-DD)", value))
}

/// Raw CSV row matching base_final.csv columns
///
/// Every column but MES may be missing from the file. Empty cells become
/// `None`; numbers that fail to parse become `None` as well.
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "MES")]
    month: String,
    #[serde(rename = "QTD_BENEFICIOS", default, deserialize_with = "csv::invalid_option")]
    benefit_count: Option<f64>,
    #[serde(rename = "POPULACAO", default, deserialize_with = "csv::invalid_option")]
    population: Option<f64>,
    #[serde(rename = "REGIAO_PAIS", default)]
    region: Option<String>,
    #[serde(rename = "CID_TIPO", default)]
    diagnosis_category: Option<String>,
    #[serde(rename = "BENEF_TIPO", default)]
    benefit_type: Option<String>,
    #[serde(rename = "STATUS_BENEFICIARIO", default)]
    beneficiary_status: Option<String>,
    #[serde(rename = "IDADE_FAIXA", default)]
    age_bracket: Option<String>,
    #[serde(rename = "SEXO", default)]
    sex: Option<String>,
}

/// Known columns named in the header row
fn columns_from_headers(headers: &StringRecord) -> ColumnSet {
    Column::ALL
        .iter()
        .copied()
        .filter(|column| headers.iter().any(|h| h == column.header()))
        .collect()
}

/// Numeric cell of a present column, with a flag telling whether it had to
/// be repaired to zero
fn repair_number(value: Option<f64>, present: bool) -> (f64, bool) {
    match value.filter(|v| v.is_finite()) {
        Some(value) => (value, false),
        None => (0.0, present),
    }
}

/// Load the dataset from a CSV file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Dataset, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io(e),
    })?;

    let dataset = load_from_reader(file)?;
    info!(
        "Loaded {} benefit rows from {} ({} of {} known columns)",
        dataset.len(),
        path.display(),
        dataset.columns().iter().count(),
        Column::ALL.len()
    );
    Ok(dataset)
}

/// Load the dataset from any reader (e.g., string buffer, request body)
pub fn load_from_reader<R: io::Read>(reader: R) -> Result<Dataset, LoadError> {
    let mut csv_reader = Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let columns = columns_from_headers(&headers);

    if !columns.contains(Column::Month) {
        return Err(LoadError::MissingColumn(Column::Month.header()));
    }
    let has_count = columns.contains(Column::BenefitCount);
    let has_population = columns.contains(Column::Population);

    let mut records = Vec::new();
    let mut repaired = 0usize;

    for (row, result) in csv_reader.records().enumerate() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(row as u64 + 2);
        let raw: CsvRow = record.deserialize(Some(&headers))?;

        let month = parse_month(&raw.month).ok_or_else(|| LoadError::InvalidMonth {
            line,
            value: raw.month.clone(),
        })?;

        let (benefit_count, count_repaired) = repair_number(raw.benefit_count, has_count);
        let (population, population_repaired) = repair_number(raw.population, has_population);
        repaired += usize::from(count_repaired) + usize::from(population_repaired);

        let mut benefit = BenefitRecord::new(month, benefit_count, population);
        benefit.region = raw.region;
        benefit.diagnosis_category = raw.diagnosis_category;
        benefit.benefit_type = raw.benefit_type;
        benefit.beneficiary_status = raw.beneficiary_status;
        benefit.age_bracket = raw.age_bracket;
        benefit.sex = raw.sex;
        records.push(benefit);
    }

    if repaired > 0 {
        debug!("Replaced {} non-numeric count/population cells with 0", repaired);
    }

    Ok(Dataset::new(records, columns))
}

/// Load the dataset from the default output/base_final.csv location
pub fn load_default() -> Result<Dataset, LoadError> {
    load(DEFAULT_DATASET_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_month_formats() {
        assert_eq!(parse_month("2024-06-01"), Some(ymd(2024, 6, 1)));
        assert_eq!(parse_month("2024-06-15"), Some(ymd(2024, 6, 1)));
        assert_eq!(parse_month(" 2024/07/31 "), Some(ymd(2024, 7, 1)));
        assert_eq!(parse_month("2024-08-01 00:00:00"), Some(ymd(2024, 8, 1)));
        assert_eq!(parse_month("2024-09-10T12:30:00"), Some(ymd(2024, 9, 1)));
        assert_eq!(parse_month("2025-03"), Some(ymd(2025, 3, 1)));

        assert_eq!(parse_month(""), None);
        assert_eq!(parse_month("junho"), None);
        assert_eq!(parse_month("2024-13-01"), None);
    }

    #[test]
    fn test_numeric_cells_are_repaired() {
        let csv = "\
MES,QTD_BENEFICIOS,POPULACAO
2024-06-01,12.5,1e3
2024-06-01,abc,NaN
2024-06-01,inf,
";
        let dataset = load_from_reader(csv.as_bytes()).expect("Failed to load");
        let records = dataset.records();

        assert_eq!(records[0].benefit_count, 12.5);
        assert_eq!(records[0].population, 1000.0);
        assert_eq!(records[1].benefit_count, 0.0);
        assert_eq!(records[1].population, 0.0);
        assert_eq!(records[2].benefit_count, 0.0);
        assert_eq!(records[2].population, 0.0);
    }

    #[test]
    fn test_headers_in_any_order_and_unknown_columns() {
        let csv = "SEXO,EXTRA,MES,QTD_BENEFICIOS\nF,x,2024-06,4\n";
        let dataset = load_from_reader(csv.as_bytes()).expect("Failed to load");

        let record = &dataset.records()[0];
        assert_eq!(record.month_key, "2024-06");
        assert_eq!(record.sex.as_deref(), Some("F"));
        assert_eq!(record.benefit_count, 4.0);
        assert!(!dataset.columns().contains(Column::Region));
    }

    #[test]
    fn test_load_from_reader() {
        let csv = "\
MES,QTD_BENEFICIOS,POPULACAO,REGIAO_PAIS,CID_TIPO,BENEF_TIPO,STATUS_BENEFICIARIO,IDADE_FAIXA,SEXO
2024-06-01,10,100,Norte,F,Auxilio,Ativo,60-69,F
2024-06-01,x,,Norte,F,Auxilio,Ativo,60-69,M
2024-07-01,20,200,,M,Aposentadoria,Cessado,70+,F
";
        let dataset = load_from_reader(csv.as_bytes()).expect("Failed to load");
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.columns(), &ColumnSet::all());

        let records = dataset.records();
        assert_eq!(records[0].month_key, "2024-06");
        assert_eq!(records[0].region.as_deref(), Some("Norte"));
        assert_eq!(records[0].benefit_count, 10.0);

        // Invalid and empty numerics are repaired to zero
        assert_eq!(records[1].benefit_count, 0.0);
        assert_eq!(records[1].population, 0.0);

        // Empty categorical cells become None
        assert_eq!(records[2].region, None);
        assert_eq!(records[2].age_bracket.as_deref(), Some("70+"));
    }

    #[test]
    fn test_optional_columns_are_tolerated() {
        let csv = "MES,REGIAO_PAIS\n2024-06-01,Sul\n";
        let dataset = load_from_reader(csv.as_bytes()).expect("Failed to load");

        assert_eq!(dataset.len(), 1);
        assert!(dataset.columns().contains(Column::Region));
        assert!(!dataset.columns().contains(Column::BenefitCount));
        assert!(!dataset.columns().contains(Column::Population));
        assert_eq!(dataset.records()[0].benefit_count, 0.0);
    }

    #[test]
    fn test_missing_month_column_is_fatal() {
        let csv = "QTD_BENEFICIOS,REGIAO_PAIS\n1,Sul\n";
        let err = load_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("MES")));
    }

    #[test]
    fn test_invalid_month_is_fatal() {
        let csv = "MES,QTD_BENEFICIOS\n2024-06-01,1\nnot a date,2\n";
        let err = load_from_reader(csv.as_bytes()).unwrap_err();
        match err {
            LoadError::InvalidMonth { line, value } => {
                assert_eq!(line, 3);
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn test_load_fixture() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/sample_base.csv");
        let dataset = load(path).expect("Failed to load fixture");

        assert_eq!(dataset.len(), 24);
        assert_eq!(dataset.columns(), &ColumnSet::all());
        assert!(dataset.records().iter().all(|r| r.month_key.starts_with("2024") || r.month_key.starts_with("2025")));
    }
}
