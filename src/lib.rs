//! Benefit Dashboard - Filtering and aggregation engine for granted-benefit reports
//!
//! This library provides:
//! - Loading of the pre-aggregated benefits table (month, region, type, status, age, sex)
//! - Date range, region and diagnosis category filters with explicit tri-state selections
//! - Indicators (total, covered population, rate per 100k, months) and chart tables
//! - Capability-checked results so a missing column or empty filter skips one chart only

pub mod dataset;
pub mod filter;
pub mod aggregate;
pub mod dashboard;
pub mod presentation;

// Re-export commonly used types
pub use dataset::{BenefitRecord, Column, Dataset, LoadError};
pub use filter::{FilterOptions, FilterSelection, FilterValidationError, Selection};
pub use aggregate::{Availability, Indicators, SkipReason};
pub use dashboard::{Charts, Dashboard, DashboardReport};
pub use presentation::PresentationConfig;
