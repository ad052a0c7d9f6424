//! End-to-end mix analysis.
//!
//! [`MixAnalyzer`] runs the whole pipeline for one input table: constants
//! check, preprocessing, volumetric calculation, spec evaluation, ordering
//! by bitumen content, chart rendering and report generation. It holds no
//! state between runs besides its configuration.

use chrono::Utc;
use polars::prelude::*;
use serde_json::{Map, Value};

use crate::algorithms::specs::{evaluate_specs, summarize, SpecSummary};
use crate::algorithms::volumetrics::compute_properties;
use crate::config::{AnalysisConfig, DEFAULT_PROFILE};
use crate::core::domain::{MixConstants, BITUMEN_COL, NUMERIC_INPUT_COLUMNS};
use crate::core::error::{MixError, MixResult};
use crate::io::loaders::TableLoadResult;
use crate::parsing::raw_table::RawTable;
use crate::preprocessing::pipeline::PreprocessPipeline;
use crate::preprocessing::validator::ValidationResult;
use crate::services::charts::{ChartImage, TrendRenderer};
use crate::services::report::{non_finite_text, ReportArtifact, ReportBuilder, RunInfo};
use crate::transformations::cleaning::{coerce_to_float, sort_by_column, validate_schema};

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Input columns followed by the derived values and verdicts, sorted by
    /// bitumen content
    pub table: DataFrame,
    pub charts: Vec<ChartImage>,
    pub report: ReportArtifact,
    pub summary: SpecSummary,
    pub validation: ValidationResult,
}

impl RunOutput {
    pub fn columns(&self) -> Vec<String> {
        self.table
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// The result table as a JSON array of row objects.
    pub fn table_records(&self) -> MixResult<Value> {
        table_records(&self.table)
    }
}

/// Where the input came from, recorded in the report.
#[derive(Debug, Clone, Default)]
pub struct RunSource {
    pub name: Option<String>,
    pub checksum: Option<String>,
}

impl From<&TableLoadResult> for RunSource {
    fn from(loaded: &TableLoadResult) -> Self {
        Self {
            name: Some(loaded.source_name.clone()),
            checksum: Some(loaded.checksum.clone()),
        }
    }
}

/// Configurable analysis pipeline.
///
/// # Examples
///
/// ```
/// use mixvol::parsing::{Cell, RawTable};
/// use mixvol::services::analysis::MixAnalyzer;
///
/// let table = RawTable::from_rows(
///     &["Sample", "Bitumen Content (%)", "Gmb", "Gmm"],
///     vec![
///         vec![Cell::Text("S1".into()), Cell::Number(4.5), Cell::Number(2.35), Cell::Number(2.45)],
///         vec![Cell::Text("S2".into()), Cell::Number(5.0), Cell::Number(2.37), Cell::Number(2.44)],
///     ],
/// );
///
/// let output = MixAnalyzer::default().run(table, 1.03, 2.60).unwrap();
/// assert_eq!(output.table.width(), 10);
/// assert!(!output.report.bytes.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct MixAnalyzer {
    config: AnalysisConfig,
    profile: Option<String>,
}

impl Default for MixAnalyzer {
    fn default() -> Self {
        Self {
            config: AnalysisConfig::default(),
            profile: Some(DEFAULT_PROFILE.to_string()),
        }
    }
}

impl MixAnalyzer {
    /// Analyzer with an explicit configuration.
    pub fn new(config: AnalysisConfig) -> MixResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            profile: None,
        })
    }

    /// Analyzer for a built-in profile.
    pub fn with_profile(name: &str) -> MixResult<Self> {
        let config = AnalysisConfig::preset(name).ok_or_else(|| {
            let available: Vec<&str> = AnalysisConfig::profiles()
                .into_iter()
                .map(|(name, _)| name)
                .collect();
            MixError::Configuration(format!(
                "Unknown profile '{}'. Available profiles: {}",
                name,
                available.join(", ")
            ))
        })?;
        Ok(Self {
            config,
            profile: Some(name.trim().to_lowercase()),
        })
    }

    /// Override the file name offered for the generated workbook.
    pub fn with_report_file_name(mut self, file_name: &str) -> MixResult<Self> {
        self.config.report.file_name = file_name.to_string();
        self.config.validate()?;
        Ok(self)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Derived properties and verdicts for a typed mix table, sorted by
    /// bitumen content. Pure: no charts, no report.
    pub fn analyze(&self, df: &DataFrame, constants: &MixConstants) -> MixResult<DataFrame> {
        constants.validate()?;
        validate_schema(df, &crate::core::domain::REQUIRED_COLUMNS)?;

        let mut typed = df.clone();
        coerce_to_float(&mut typed, &NUMERIC_INPUT_COLUMNS)?;

        let computed = compute_properties(&typed, constants, &self.config.volumetrics)?;
        let evaluated = evaluate_specs(&computed, &self.config.limits)?;
        sort_by_column(&evaluated, BITUMEN_COL)
    }

    /// Run the full pipeline on a raw table.
    pub fn run(&self, table: RawTable, gb: f64, gsb: f64) -> MixResult<RunOutput> {
        self.run_with_source(table, gb, gsb, RunSource::default())
    }

    /// Run the full pipeline on a loaded table, recording its provenance.
    pub fn run_loaded(&self, loaded: TableLoadResult, gb: f64, gsb: f64) -> MixResult<RunOutput> {
        let source = RunSource::from(&loaded);
        self.run_with_source(loaded.table, gb, gsb, source)
    }

    pub fn run_with_source(
        &self,
        table: RawTable,
        gb: f64,
        gsb: f64,
        source: RunSource,
    ) -> MixResult<RunOutput> {
        // Step 1: Constants are checked before any data is touched
        let constants = MixConstants::new(gb, gsb)?;

        // Step 2: Clean, type and validate the input
        let preprocessed = PreprocessPipeline::new().process(table)?;

        // Step 3: Calculate, evaluate, order
        let result = self.analyze(&preprocessed.dataframe, &constants)?;
        let summary = summarize(&result, &self.config.limits)?;

        // Step 4: Charts
        let charts = TrendRenderer::from_config(&self.config).render_all(&result);

        // Step 5: Report
        let run_info = RunInfo {
            constants,
            profile: self.profile.clone(),
            source: source.name,
            checksum: source.checksum,
            summary: summary.clone(),
            generated_at: Utc::now(),
        };
        let report = ReportBuilder::new(self.config.clone()).build(&result, &charts, Some(&run_info))?;

        log::info!(
            "Analyzed {} sample(s): {} pass all limits, {} chart(s), report {} bytes",
            summary.total_samples,
            summary.all_pass,
            charts.len(),
            report.bytes.len()
        );

        Ok(RunOutput {
            table: result,
            charts,
            report,
            summary,
            validation: preprocessed.validation,
        })
    }
}

/// Convert a table to JSON row objects.
///
/// Non-finite floats become the strings `NaN`, `inf` or `-inf`; nulls
/// become JSON null.
pub fn table_records(df: &DataFrame) -> MixResult<Value> {
    let mut records = vec![Map::new(); df.height()];

    for column in df.get_columns() {
        let name = column.name().to_string();
        match column.dtype() {
            DataType::Float64
            | DataType::Float32
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt32
            | DataType::UInt64 => {
                let values = column.cast(&DataType::Float64)?;
                for (record, value) in records.iter_mut().zip(values.f64()?) {
                    let json = match value {
                        Some(v) if v.is_finite() => {
                            serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
                        }
                        Some(v) => Value::String(non_finite_text(v).to_string()),
                        None => Value::Null,
                    };
                    record.insert(name.clone(), json);
                }
            }
            DataType::Boolean => {
                for (record, value) in records.iter_mut().zip(column.bool()?) {
                    record.insert(name.clone(), value.map_or(Value::Null, Value::Bool));
                }
            }
            _ => {
                let values = column.cast(&DataType::String)?;
                for (record, value) in records.iter_mut().zip(values.str()?) {
                    let json = value.map_or(Value::Null, |s| Value::String(s.to_string()));
                    record.insert(name.clone(), json);
                }
            }
        }
    }

    Ok(Value::Array(records.into_iter().map(Value::Object).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::raw_table::Cell;

    fn table() -> RawTable {
        RawTable::from_rows(
            &["Sample", "Bitumen Content (%)", "Gmb", "Gmm"],
            vec![
                vec![Cell::Text("S2".into()), Cell::Number(5.5), Cell::Number(2.38), Cell::Number(2.43)],
                vec![Cell::Text("S1".into()), Cell::Number(4.5), Cell::Number(2.35), Cell::Number(2.45)],
                vec![Cell::Text("S3".into()), Cell::Empty, Cell::Number(2.36), Cell::Number(0.0)],
            ],
        )
    }

    #[test]
    fn test_run_sorts_and_appends_columns() {
        let output = MixAnalyzer::default().run(table(), 1.03, 2.60).unwrap();

        assert_eq!(output.table.height(), 3);
        assert_eq!(
            output.columns(),
            vec![
                "Sample",
                "Bitumen Content (%)",
                "Gmb",
                "Gmm",
                "Va (%)",
                "VMA (%)",
                "VFB (%)",
                "Va Status",
                "VMA Status",
                "VFB Status"
            ]
        );

        let samples: Vec<Option<&str>> = output
            .table
            .column("Sample")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(samples, vec![Some("S1"), Some("S2"), Some("S3")]);

        let va = output.summary.property(crate::core::domain::VolumetricProperty::AirVoids).unwrap();
        assert_eq!(va.undefined, 1);
        assert_eq!(output.charts.len(), 3);
    }

    #[test]
    fn test_invalid_constants_fail_before_processing() {
        let err = MixAnalyzer::default().run(RawTable::default(), 0.0, 2.6).unwrap_err();
        assert!(matches!(err, MixError::InvalidConstant { name: "Gb", .. }));

        let err = MixAnalyzer::default().run(table(), 1.03, f64::INFINITY).unwrap_err();
        assert!(matches!(err, MixError::InvalidConstant { name: "Gsb", .. }));
    }

    #[test]
    fn test_unknown_profile() {
        let err = MixAnalyzer::with_profile("superpave").unwrap_err();
        assert!(err.to_string().contains("gsb-only"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_analyze_accepts_integer_columns() {
        let df = df!(
            "Sample" => &[1i64, 2],
            "Bitumen Content (%)" => &[5i64, 4],
            "Gmb" => &[2.35, 2.36],
            "Gmm" => &[2.45, 2.44],
        )
        .unwrap();
        let constants = MixConstants::new(1.03, 2.6).unwrap();
        let result = MixAnalyzer::default().analyze(&df, &constants).unwrap();
        assert_eq!(result.width(), 10);
        let bitumen = result.column("Bitumen Content (%)").unwrap().f64().unwrap();
        assert_eq!(bitumen.get(0), Some(4.0));
    }

    #[test]
    fn test_table_records() {
        let df = df!(
            "Sample" => &["S1"],
            "Va (%)" => &[f64::NAN],
            "VMA (%)" => &[15.5],
            "Flag" => &[true],
        )
        .unwrap();

        let records = table_records(&df).unwrap();
        assert_eq!(records[0]["Sample"], "S1");
        assert_eq!(records[0]["Va (%)"], "NaN");
        assert_eq!(records[0]["VMA (%)"], 15.5);
        assert_eq!(records[0]["Flag"], true);
    }
}
