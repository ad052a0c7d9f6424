//! Mix table validation with error and warning reporting.
//!
//! This module checks laboratory mix tables for completeness and physical
//! plausibility before the volumetric calculation. Missing required columns
//! are errors; suspicious values (missing measurements, zero Gmm, negative
//! numbers, Gmb above Gmm) are warnings, because the calculation turns them
//! into undefined results rather than failing.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::domain::{GMB_COL, GMM_COL, NUMERIC_INPUT_COLUMNS, REQUIRED_COLUMNS, SAMPLE_COL};
use crate::parsing::raw_table::format_number;
use crate::transformations::cleaning::{coerce_to_float, missing_columns};

/// Maximum number of per-sample warnings emitted for each kind of issue.
const MAX_LISTED: usize = 5;

/// Validation result with categorized issues and statistics.
///
/// Errors make `is_valid` false, while warnings are informational.
///
/// # Examples
///
/// ```
/// use mixvol::preprocessing::validator::ValidationResult;
///
/// let mut result = ValidationResult::new();
/// assert!(result.is_valid);
///
/// result.add_error("Missing required column: Gmm".to_string());
/// assert!(!result.is_valid);
/// assert_eq!(result.errors.len(), 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: ValidationStats,
}

/// Summary statistics computed during validation.
///
/// # Fields
///
/// * `total_samples` - Number of rows validated
/// * `missing_sample_ids` - Rows without a sample identifier
/// * `missing_values` - Empty or NaN cells in the numeric input columns
/// * `non_numeric_values` - Text cells in numeric columns that do not read as numbers
/// * `zero_gmm` - Rows with Gmm equal to zero
/// * `negative_values` - Negative cells in the numeric input columns
/// * `gmb_exceeds_gmm` - Rows where Gmb is greater than Gmm
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationStats {
    pub total_samples: usize,
    pub missing_sample_ids: usize,
    pub missing_values: usize,
    pub non_numeric_values: usize,
    pub zero_gmm: usize,
    pub negative_values: usize,
    pub gmb_exceeds_gmm: usize,
}

impl ValidationResult {
    /// Creates a new validation result with valid status and empty error/warning lists.
    pub fn new() -> Self {
        Self {
            is_valid: true,
            ..Default::default()
        }
    }

    /// Adds a critical error and marks the result as invalid.
    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    /// Adds a non-critical warning without invalidating the result.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

/// Validator for laboratory mix tables.
pub struct MixValidator;

impl MixValidator {
    /// Validates a mix DataFrame.
    ///
    /// Numeric checks run on a Float64 view of the input columns, so text
    /// columns are judged by the values the calculation will actually see.
    ///
    /// # Examples
    ///
    /// ```
    /// use mixvol::preprocessing::validator::MixValidator;
    /// use polars::prelude::*;
    ///
    /// let df = df!(
    ///     "Sample" => &["S1", "S2"],
    ///     "Bitumen Content (%)" => &[4.5, 5.0],
    ///     "Gmb" => &[2.35, 2.37],
    ///     "Gmm" => &[2.45, 0.0],
    /// ).unwrap();
    ///
    /// let result = MixValidator::validate_dataframe(&df);
    /// assert!(result.is_valid);
    /// assert_eq!(result.stats.zero_gmm, 1);
    /// ```
    pub fn validate_dataframe(df: &DataFrame) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.stats.total_samples = df.height();

        for column in missing_columns(df, &REQUIRED_COLUMNS) {
            result.add_error(format!("Missing required column: {}", column));
        }

        if !result.is_valid {
            return result;
        }

        let labels = sample_labels(df);
        result.stats.missing_sample_ids = df
            .column(SAMPLE_COL)
            .map(|c| c.null_count())
            .unwrap_or(0);
        if result.stats.missing_sample_ids > 0 {
            result.add_warning(format!(
                "{} row(s) have no sample identifier",
                result.stats.missing_sample_ids
            ));
        }

        let numeric = match Self::numeric_view(df) {
            Ok(numeric) => numeric,
            Err(e) => {
                result.add_error(format!("Failed to read numeric columns: {}", e));
                return result;
            }
        };

        for (name, values, nulls_before) in &numeric {
            let nulls_after = values.iter().filter(|v| v.is_none()).count();
            let non_numeric = nulls_after.saturating_sub(*nulls_before);
            if non_numeric > 0 {
                result.stats.non_numeric_values += non_numeric;
                result.add_warning(format!(
                    "Column '{}' has {} non-numeric value(s); they are treated as missing",
                    name, non_numeric
                ));
            }

            let missing = values
                .iter()
                .filter(|v| v.map_or(true, |x| x.is_nan()))
                .count();
            result.stats.missing_values += missing;
            if missing > 0 {
                result.add_warning(format!(
                    "Column '{}' has {} missing value(s); dependent results will be undefined",
                    name, missing
                ));
            }

            let mut negatives = 0;
            for (row, value) in values.iter().enumerate() {
                if let Some(v) = value {
                    if *v < 0.0 {
                        negatives += 1;
                        if negatives <= MAX_LISTED {
                            result.add_warning(format!(
                                "Sample {}: negative {} value {}",
                                labels[row], name, v
                            ));
                        }
                    }
                }
            }
            if negatives > MAX_LISTED {
                result.add_warning(format!(
                    "Total negative {} values: {} (showing first {})",
                    name, negatives, MAX_LISTED
                ));
            }
            result.stats.negative_values += negatives;
        }

        let gmb = values_of(&numeric, GMB_COL);
        let gmm = values_of(&numeric, GMM_COL);

        for (row, value) in gmm.iter().enumerate() {
            if *value == Some(0.0) {
                result.stats.zero_gmm += 1;
                if result.stats.zero_gmm <= MAX_LISTED {
                    result.add_warning(format!(
                        "Sample {}: Gmm is zero; air voids are undefined",
                        labels[row]
                    ));
                }
            }
        }
        if result.stats.zero_gmm > MAX_LISTED {
            result.add_warning(format!(
                "Total samples with zero Gmm: {} (showing first {})",
                result.stats.zero_gmm, MAX_LISTED
            ));
        }

        for (row, (b, m)) in gmb.iter().zip(gmm).enumerate() {
            if let (Some(b), Some(m)) = (b, m) {
                if b > m {
                    result.stats.gmb_exceeds_gmm += 1;
                    if result.stats.gmb_exceeds_gmm <= MAX_LISTED {
                        result.add_warning(format!(
                            "Sample {}: Gmb ({}) exceeds Gmm ({}); air voids will be negative",
                            labels[row], b, m
                        ));
                    }
                }
            }
        }
        if result.stats.gmb_exceeds_gmm > MAX_LISTED {
            result.add_warning(format!(
                "Total samples with Gmb above Gmm: {} (showing first {})",
                result.stats.gmb_exceeds_gmm, MAX_LISTED
            ));
        }

        result
    }

    /// Float64 values of the numeric input columns with their original null
    /// counts.
    fn numeric_view(df: &DataFrame) -> PolarsResult<Vec<(String, Vec<Option<f64>>, usize)>> {
        let mut view = df.select(NUMERIC_INPUT_COLUMNS)?;
        let nulls_before: Vec<usize> = view.get_columns().iter().map(|c| c.null_count()).collect();

        coerce_to_float(&mut view, &NUMERIC_INPUT_COLUMNS)
            .map_err(|e| PolarsError::ComputeError(e.to_string().into()))?;

        NUMERIC_INPUT_COLUMNS
            .iter()
            .zip(nulls_before)
            .map(|(name, nulls)| {
                let values = view.column(name)?.f64()?.into_iter().collect();
                Ok((name.to_string(), values, nulls))
            })
            .collect()
    }
}

fn values_of<'a>(numeric: &'a [(String, Vec<Option<f64>>, usize)], wanted: &str) -> &'a [Option<f64>] {
    numeric
        .iter()
        .find(|(name, _, _)| name == wanted)
        .map(|(_, values, _)| values.as_slice())
        .unwrap_or(&[])
}

/// Display labels for every row: the sample identifier when present,
/// otherwise the 1-based row number.
fn sample_labels(df: &DataFrame) -> Vec<String> {
    let fallback = |row: usize| format!("row {}", row + 1);
    let column = match df.column(SAMPLE_COL) {
        Ok(column) => column,
        Err(_) => return (0..df.height()).map(fallback).collect(),
    };

    if let Ok(values) = column.str() {
        return values
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.map(str::to_string).unwrap_or_else(|| fallback(row)))
            .collect();
    }
    if let Ok(values) = column.f64() {
        return values
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.map(format_number).unwrap_or_else(|| fallback(row)))
            .collect();
    }
    (0..df.height()).map(fallback).collect()
}
