//! DataFrame clean-up utilities.
//!
//! Schema checks, numeric coercion, column replacement and ordering used by
//! the preprocessing pipeline and the analyzer.

pub mod cleaning;

pub use cleaning::{coerce_to_float, missing_columns, put_column, sort_by_column, validate_schema};
