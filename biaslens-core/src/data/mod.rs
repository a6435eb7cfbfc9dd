//! Tabular data model, loading, and descriptive statistics.

pub mod dataset;
pub mod source;
pub mod stats;

pub use dataset::{ColumnKind, Dataset, Value, cell};
pub use source::{DatasetFormat, load_bytes, load_file, validate_for_analysis};
