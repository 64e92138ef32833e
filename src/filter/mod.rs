//! Filter engine: user selections and the row predicates they drive

mod selection;
mod engine;

pub use selection::{FilterOptions, FilterSelection, FilterValidationError, Selection};
pub use engine::{filter, region_baseline, FilteredView};
