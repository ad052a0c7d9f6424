//! Error types for mix analysis operations.

/// Result type for mix analysis operations
pub type MixResult<T> = Result<T, MixError>;

/// Error type for mix analysis operations
#[derive(Debug, thiserror::Error)]
pub enum MixError {
    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Invalid constant {name}: {value} (must be a positive number)")]
    InvalidConstant { name: &'static str, value: f64 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Chart rendering error: {0}")]
    Chart(String),

    #[error("Report error: {0}")]
    Report(#[from] rust_xlsxwriter::XlsxError),

    #[error("Workbook read error: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Data frame error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MixError {
    /// `true` for errors caused by user input rather than by the system.
    ///
    /// Validation errors block the pipeline before any computation and are
    /// meant to be shown to the user verbatim.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MixError::MissingColumns(_)
                | MixError::InvalidConstant { .. }
                | MixError::Configuration(_)
                | MixError::Input(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_all() {
        let err = MixError::MissingColumns(vec!["Gmb".to_string(), "Gmm".to_string()]);
        assert_eq!(err.to_string(), "Missing required column(s): Gmb, Gmm");
        assert!(err.is_validation());
    }

    #[test]
    fn test_chart_error_is_not_validation() {
        let err = MixError::Chart("backend failure".to_string());
        assert!(!err.is_validation());
    }
}
