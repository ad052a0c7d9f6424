//! Input preparation: clean-up, typing and validation of mix tables.
//!
//! # Modules
//!
//! - [`pipeline`]: raw table to typed DataFrame
//! - [`validator`]: schema errors and data quality warnings

pub mod pipeline;
pub mod validator;

pub use pipeline::{PreprocessConfig, PreprocessPipeline, PreprocessResult};
pub use validator::{MixValidator, ValidationResult, ValidationStats};
