use polars::prelude::*;

use crate::core::domain::{NUMERIC_INPUT_COLUMNS, REQUIRED_COLUMNS};
use crate::core::error::MixResult;
use crate::parsing::raw_table::RawTable;
use crate::preprocessing::validator::{MixValidator, ValidationResult};
use crate::transformations::cleaning::{coerce_to_float, validate_schema};

/// Result of preprocessing operation
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    pub dataframe: DataFrame,
    pub validation: ValidationResult,
    /// Duplicate columns removed, in input order
    pub dropped_columns: Vec<String>,
    pub dropped_rows: usize,
    /// Required columns converted to Float64
    pub coerced_columns: Vec<String>,
}

/// Configuration for the preprocessing pipeline
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub validate: bool,
    pub drop_empty_rows: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            validate: true,
            drop_empty_rows: true,
        }
    }
}

/// Turns a raw input table into a typed DataFrame ready for calculation
pub struct PreprocessPipeline {
    config: PreprocessConfig,
}

impl Default for PreprocessPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl PreprocessPipeline {
    /// Create a new pipeline with default configuration
    pub fn new() -> Self {
        Self {
            config: PreprocessConfig::default(),
        }
    }

    /// Create a pipeline with custom configuration
    pub fn with_config(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Process a raw table into a validated DataFrame
    ///
    /// # Returns
    /// PreprocessResult with the typed DataFrame and validation info, or
    /// `MixError::MissingColumns` when a required column is absent
    pub fn process(&self, mut table: RawTable) -> MixResult<PreprocessResult> {
        // Step 1: Drop fully empty rows
        let dropped_rows = if self.config.drop_empty_rows {
            table.drop_empty_rows()
        } else {
            0
        };
        if dropped_rows > 0 {
            log::debug!("Ignored {} empty row(s)", dropped_rows);
        }

        // Step 2: Collapse duplicate columns
        let dropped_columns = table.dedup_columns();
        if !dropped_columns.is_empty() {
            log::warn!(
                "Dropped duplicate column(s), keeping first occurrence: {}",
                dropped_columns.join(", ")
            );
        }

        // Step 3: Build the DataFrame
        let mut df = table.to_dataframe()?;

        // Step 4: Validate
        validate_schema(&df, &REQUIRED_COLUMNS)?;
        let validation = if self.config.validate {
            MixValidator::validate_dataframe(&df)
        } else {
            ValidationResult::new()
        };
        for warning in &validation.warnings {
            log::warn!("{}", warning);
        }

        // Step 5: Coerce numeric inputs
        let coerced_columns = coerce_to_float(&mut df, &NUMERIC_INPUT_COLUMNS)?;
        if !coerced_columns.is_empty() {
            log::debug!("Converted to numeric: {}", coerced_columns.join(", "));
        }

        log::info!(
            "Preprocessed {} sample(s) with {} column(s)",
            df.height(),
            df.width()
        );

        Ok(PreprocessResult {
            dataframe: df,
            validation,
            dropped_columns,
            dropped_rows,
            coerced_columns,
        })
    }
}
