//! Spreadsheet report generation.
//!
//! The annotated table is written to one sheet with a bold header row and
//! no index column. Charts are placed to the right of the table, one column
//! after the last data column, at rows 2, 20 and 38 (and 56 for the overview
//! chart): as pictures in `embedded_images` mode, or as spreadsheet charts
//! bound to the result columns in `native_charts` mode.

use chrono::{DateTime, Utc};
use polars::prelude::*;
use rust_xlsxwriter::{Chart, ChartType, Color, Format, Image, Workbook, Worksheet};
use serde::Serialize;

use crate::algorithms::specs::{rules_from_limits, SpecSummary};
use crate::config::{AnalysisConfig, ReportMode, RUN_INFO_SHEET};
use crate::core::domain::{MixConstants, Verdict, VolumetricProperty, BITUMEN_COL};
use crate::core::error::{MixError, MixResult};
use crate::services::charts::ChartImage;

/// MIME type of the generated workbook.
pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const FIRST_ANCHOR_ROW: u32 = 1;
const ANCHOR_ROW_STEP: u32 = 18;

/// Text written in place of a non-finite number.
pub fn non_finite_text(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value.is_sign_positive() {
        "inf"
    } else {
        "-inf"
    }
}

/// Top-left cell (row, column) of the `index`-th chart for a table with
/// `num_columns` columns.
pub fn chart_anchor(num_columns: usize, index: usize) -> (u32, u16) {
    let row = FIRST_ANCHOR_ROW + ANCHOR_ROW_STEP * index as u32;
    let col = (num_columns + 1).min(u16::MAX as usize) as u16;
    (row, col)
}

/// Generated workbook ready for download.
#[derive(Debug, Clone, Serialize)]
pub struct ReportArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Provenance and settings recorded in the run-info sheet.
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub constants: MixConstants,
    pub profile: Option<String>,
    pub source: Option<String>,
    pub checksum: Option<String>,
    pub summary: SpecSummary,
    pub generated_at: DateTime<Utc>,
}

/// Serializes analysis results into an xlsx workbook held in memory.
pub struct ReportBuilder {
    config: AnalysisConfig,
}

impl ReportBuilder {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Build the workbook.
    ///
    /// `charts` are only used in `embedded_images` mode. `run_info` adds the
    /// run-info sheet when the report settings ask for it.
    pub fn build(
        &self,
        df: &DataFrame,
        charts: &[ChartImage],
        run_info: Option<&RunInfo>,
    ) -> MixResult<ReportArtifact> {
        let settings = &self.config.report;
        let mut workbook = Workbook::new();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&settings.sheet_name)?;
        write_table(worksheet, df)?;

        let placed = match settings.mode {
            ReportMode::EmbeddedImages => self.insert_images(worksheet, df.width(), charts),
            ReportMode::NativeCharts => self.insert_native_charts(worksheet, df),
        };

        if settings.include_run_info {
            if let Some(info) = run_info {
                let info_sheet = workbook.add_worksheet();
                info_sheet.set_name(RUN_INFO_SHEET)?;
                self.write_run_info(info_sheet, info)?;
            }
        }

        let bytes = workbook.save_to_buffer()?;
        log::info!(
            "Built report {} ({} bytes, {} chart(s), {} mode)",
            settings.file_name,
            bytes.len(),
            placed,
            settings.mode.as_str()
        );

        Ok(ReportArtifact {
            file_name: settings.file_name.clone(),
            mime_type: XLSX_MIME_TYPE,
            bytes,
        })
    }

    /// Place chart PNGs next to the table. A chart that cannot be placed
    /// is logged and skipped; returns the number placed.
    fn insert_images(
        &self,
        worksheet: &mut Worksheet,
        num_columns: usize,
        charts: &[ChartImage],
    ) -> usize {
        let scale = self.config.report.image_scale;
        let mut placed = 0;
        for chart in charts {
            let image = match Image::new_from_buffer(&chart.png) {
                Ok(image) => image
                    .set_scale_width(scale)
                    .set_scale_height(scale)
                    .set_alt_text(&chart.title),
                Err(e) => {
                    log::warn!("Skipping image for '{}': {}", chart.title, e);
                    continue;
                }
            };
            let (row, col) = chart_anchor(num_columns, placed);
            if let Err(e) = worksheet.insert_image(row, col, &image) {
                log::warn!("Skipping image for '{}': {}", chart.title, e);
                continue;
            }
            placed += 1;
        }
        placed
    }

    /// Spreadsheet charts bound to the result columns. Charts whose
    /// columns are missing or that cannot be placed are logged and skipped;
    /// returns the number placed.
    fn insert_native_charts(&self, worksheet: &mut Worksheet, df: &DataFrame) -> usize {
        let sheet_name = self.config.report.sheet_name.as_str();
        if df.height() == 0 {
            log::warn!("No rows to chart; native charts skipped");
            return 0;
        }
        let last_row = df.height() as u32;

        let x_col = match df.get_column_index(BITUMEN_COL) {
            Some(idx) => idx as u16,
            None => {
                log::warn!("Column '{}' not found; native charts skipped", BITUMEN_COL);
                return 0;
            }
        };

        let mut placed = 0;
        for property in VolumetricProperty::ALL {
            let y_col = match df.get_column_index(property.column_name()) {
                Some(idx) => idx as u16,
                None => {
                    log::warn!(
                        "Column '{}' not found; {} chart skipped",
                        property.column_name(),
                        property
                    );
                    continue;
                }
            };

            let mut chart = Chart::new(ChartType::ScatterStraightWithMarkers);
            chart
                .add_series()
                .set_categories((sheet_name, 1, x_col, last_row, x_col))
                .set_values((sheet_name, 1, y_col, last_row, y_col))
                .set_name(property.chart_title());
            chart.title().set_name(property.chart_title());
            chart.x_axis().set_name(BITUMEN_COL);
            chart.y_axis().set_name(property.column_name());

            let (row, col) = chart_anchor(df.width(), placed);
            if let Err(e) = worksheet.insert_chart(row, col, &chart) {
                log::warn!("Skipping {} chart: {}", property, e);
                continue;
            }
            placed += 1;
        }

        if self.config.charts.overview && placed == VolumetricProperty::ALL.len() {
            let mut chart = Chart::new(ChartType::ScatterStraightWithMarkers);
            for property in VolumetricProperty::ALL {
                if let Some(idx) = df.get_column_index(property.column_name()) {
                    let y_col = idx as u16;
                    chart
                        .add_series()
                        .set_categories((sheet_name, 1, x_col, last_row, x_col))
                        .set_values((sheet_name, 1, y_col, last_row, y_col))
                        .set_name(property.column_name());
                }
            }
            chart.title().set_name("Volumetric Properties vs. Bitumen Content");
            chart.x_axis().set_name(BITUMEN_COL);
            chart.y_axis().set_name("% Value");
            let (row, col) = chart_anchor(df.width(), placed);
            match worksheet.insert_chart(row, col, &chart) {
                Ok(_) => placed += 1,
                Err(e) => log::warn!("Skipping overview chart: {}", e),
            }
        }

        placed
    }

    fn write_run_info(&self, worksheet: &mut Worksheet, info: &RunInfo) -> MixResult<()> {
        let bold = Format::new().set_bold();
        let config = &self.config;

        let mut rows: Vec<(String, String)> = vec![
            (
                "Generated (UTC)".to_string(),
                info.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
            (
                "Profile".to_string(),
                info.profile.clone().unwrap_or_else(|| "custom".to_string()),
            ),
            (
                "Source".to_string(),
                info.source.clone().unwrap_or_else(|| "-".to_string()),
            ),
            (
                "Input SHA-256".to_string(),
                info.checksum.clone().unwrap_or_else(|| "-".to_string()),
            ),
            ("Gb".to_string(), info.constants.gb.to_string()),
            ("Gsb".to_string(), info.constants.gsb.to_string()),
            (
                "VMA formula".to_string(),
                config.volumetrics.vma_formula.to_string(),
            ),
            (
                "Binder absorption".to_string(),
                config.volumetrics.binder_absorption.to_string(),
            ),
            (
                "Trend".to_string(),
                if config.trend.enabled {
                    format!("polynomial, degree {}", config.trend.degree)
                } else {
                    "disabled".to_string()
                },
            ),
            ("Samples".to_string(), info.summary.total_samples.to_string()),
            (
                "All properties pass".to_string(),
                info.summary.all_pass.to_string(),
            ),
        ];

        for rule in rules_from_limits(&config.limits) {
            rows.push((format!("{} limits", rule.property.symbol()), rule.describe()));
        }
        for property in &info.summary.properties {
            rows.push((
                format!("{} pass / fail / undefined", property.property.symbol()),
                format!("{} / {} / {}", property.pass, property.fail, property.undefined),
            ));
        }

        worksheet.write_string_with_format(0, 0, "Setting", &bold)?;
        worksheet.write_string_with_format(0, 1, "Value", &bold)?;
        for (idx, (key, value)) in rows.iter().enumerate() {
            let row = idx as u32 + 1;
            worksheet.write_string(row, 0, key)?;
            worksheet.write_string(row, 1, value)?;
        }
        worksheet.autofit();
        Ok(())
    }
}

fn status_format(verdict: Verdict) -> Format {
    let (fill, font) = match verdict {
        Verdict::Pass => (0xC6EFCE, 0x006100),
        Verdict::Fail => (0xFFC7CE, 0x9C0006),
        Verdict::Undefined => (0xEDEDED, 0x595959),
    };
    Format::new()
        .set_background_color(Color::RGB(fill))
        .set_font_color(Color::RGB(font))
}

/// Write the header row and every column of `df`.
///
/// Non-finite floats are written as text, nulls are left blank and status
/// columns get a fill color per verdict.
fn write_table(worksheet: &mut Worksheet, df: &DataFrame) -> MixResult<()> {
    if df.width() > u16::MAX as usize || df.height() >= u32::MAX as usize {
        return Err(MixError::Input(format!(
            "Table of {} x {} does not fit in a worksheet",
            df.height(),
            df.width()
        )));
    }

    let header = Format::new().set_bold();
    let status_columns: Vec<&str> = VolumetricProperty::ALL
        .iter()
        .map(|p| p.status_column())
        .collect();

    for (col_idx, column) in df.get_columns().iter().enumerate() {
        let col = col_idx as u16;
        let name = column.name().as_str();
        worksheet.write_string_with_format(0, col, name, &header)?;

        match column.dtype() {
            DataType::Float64
            | DataType::Float32
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt32
            | DataType::UInt64 => {
                let values = column.cast(&DataType::Float64)?;
                for (row_idx, value) in values.f64()?.into_iter().enumerate() {
                    let row = row_idx as u32 + 1;
                    match value {
                        Some(v) if v.is_finite() => {
                            worksheet.write_number(row, col, v)?;
                        }
                        Some(v) => {
                            worksheet.write_string(row, col, non_finite_text(v))?;
                        }
                        None => {}
                    }
                }
            }
            DataType::Boolean => {
                for (row_idx, value) in column.bool()?.into_iter().enumerate() {
                    if let Some(v) = value {
                        worksheet.write_boolean(row_idx as u32 + 1, col, v)?;
                    }
                }
            }
            _ => {
                let is_status = status_columns.contains(&name);
                let values = column.cast(&DataType::String)?;
                for (row_idx, value) in values.str()?.into_iter().enumerate() {
                    let row = row_idx as u32 + 1;
                    let Some(text) = value else { continue };
                    match text.parse::<Verdict>() {
                        Ok(verdict) if is_status => {
                            worksheet.write_string_with_format(row, col, text, &status_format(verdict))?;
                        }
                        _ => {
                            worksheet.write_string(row, col, text)?;
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::specs::summarize;
    use crate::config::SpecLimits;
    use crate::parsing::workbook::read_workbook_bytes;

    fn results_frame() -> DataFrame {
        df!(
            "Sample" => &["S1", "S2"],
            "Bitumen Content (%)" => &[4.5, 5.0],
            "Va (%)" => &[4.0, f64::NAN],
            "VMA (%)" => &[15.0, 14.5],
            "VFB (%)" => &[f64::INFINITY, 70.0],
            "Va Status" => &["PASS", "UNDEFINED"],
            "VMA Status" => &["PASS", "PASS"],
            "VFB Status" => &["UNDEFINED", "PASS"],
        )
        .unwrap()
    }

    #[test]
    fn test_chart_anchor_follows_table_width() {
        assert_eq!(chart_anchor(10, 0), (1, 11));
        assert_eq!(chart_anchor(10, 1), (19, 11));
        assert_eq!(chart_anchor(10, 2), (37, 11));
        assert_eq!(chart_anchor(12, 0), (1, 13));
    }

    #[test]
    fn test_non_finite_text() {
        assert_eq!(non_finite_text(f64::NAN), "NaN");
        assert_eq!(non_finite_text(f64::INFINITY), "inf");
        assert_eq!(non_finite_text(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_table_round_trip_with_non_finite_values() {
        let df = results_frame();
        let report = ReportBuilder::new(AnalysisConfig::default())
            .build(&df, &[], None)
            .unwrap();

        assert_eq!(report.file_name, "bitumen_mix_analysis.xlsx");
        assert_eq!(report.mime_type, XLSX_MIME_TYPE);

        let table = read_workbook_bytes(&report.bytes, Some("Results")).unwrap();
        assert_eq!(table.num_columns(), 8);
        assert_eq!(table.headers[2], "Va (%)");
        assert!(table.rows[1][2].as_f64().unwrap().is_nan());
        assert_eq!(table.rows[0][4].as_f64(), Some(f64::INFINITY));
        assert_eq!(table.rows[0][3].as_f64(), Some(15.0));
    }

    #[test]
    fn test_native_charts_and_run_info() {
        let df = results_frame();
        let mut config = AnalysisConfig::preset("gsb-bitumen").unwrap();
        config.charts.overview = true;

        let info = RunInfo {
            constants: MixConstants::new(1.03, 2.6).unwrap(),
            profile: Some("gsb-bitumen".to_string()),
            source: Some("mix.xlsx".to_string()),
            checksum: None,
            summary: summarize(&df, &SpecLimits::default()).unwrap(),
            generated_at: Utc::now(),
        };

        let report = ReportBuilder::new(config).build(&df, &[], Some(&info)).unwrap();
        assert!(!report.bytes.is_empty());

        let run_info = read_workbook_bytes(&report.bytes, Some("Run Info")).unwrap();
        assert_eq!(run_info.headers, vec!["Setting", "Value"]);
        assert!(run_info
            .rows
            .iter()
            .any(|row| row[0].as_text().as_deref() == Some("Gsb")));
    }

    fn zip_has_entry(bytes: &[u8], name: &str) -> bool {
        bytes.windows(name.len()).any(|window| window == name.as_bytes())
    }

    #[test]
    fn test_unreadable_image_is_skipped() {
        use crate::services::charts::TrendRenderer;

        let df = results_frame();
        let renderer = TrendRenderer::from_config(&AnalysisConfig::default());
        let va = renderer
            .render_series(VolumetricProperty::AirVoids, &[4.5, 5.0], &[4.0, 3.5])
            .unwrap();
        let vma = renderer
            .render_series(VolumetricProperty::Vma, &[4.5, 5.0], &[15.0, 14.5])
            .unwrap();
        let mut broken = va.clone();
        broken.png = b"not a png".to_vec();
        broken.title = "broken".to_string();
        let charts = vec![va, broken, vma];

        let builder = ReportBuilder::new(AnalysisConfig::default());
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        assert_eq!(builder.insert_images(worksheet, df.width(), &charts), 2);

        let report = builder.build(&df, &charts, None).unwrap();
        assert!(zip_has_entry(&report.bytes, "xl/media/image2.png"));
        assert!(!zip_has_entry(&report.bytes, "xl/media/image3.png"));

        let table = read_workbook_bytes(&report.bytes, Some("Results")).unwrap();
        assert_eq!(table.num_rows(), 2);
    }

    #[test]
    fn test_charts_beyond_last_column_are_skipped() {
        let mut columns = vec![
            Column::new("Bitumen Content (%)".into(), &[4.5, 5.0]),
            Column::new("Va (%)".into(), &[4.0, 3.5]),
            Column::new("VMA (%)".into(), &[15.0, 14.5]),
            Column::new("VFB (%)".into(), &[73.0, 76.0]),
        ];
        for i in columns.len()..16_383 {
            columns.push(Column::new(format!("Extra {}", i).into(), &[0.0, 1.0]));
        }
        let df = DataFrame::new(columns).unwrap();
        // One past the last worksheet column
        assert_eq!(chart_anchor(df.width(), 0).1, 16_384);

        let mut config = AnalysisConfig::preset("gsb-bitumen").unwrap();
        config.report.mode = ReportMode::NativeCharts;
        config.charts.overview = true;
        let builder = ReportBuilder::new(config);

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        assert_eq!(builder.insert_native_charts(worksheet, &df), 0);

        let report = builder.build(&df, &[], None).unwrap();
        assert!(!zip_has_entry(&report.bytes, "xl/charts/chart1.xml"));
        let table = read_workbook_bytes(&report.bytes, Some("Results")).unwrap();
        assert_eq!(table.num_columns(), 16_383);
    }

    #[test]
    fn test_native_charts_skip_missing_columns() {
        let df = df!("Sample" => &["S1"], "Va (%)" => &[4.0]).unwrap();
        let config = AnalysisConfig::preset("gsb-bitumen").unwrap();
        let report = ReportBuilder::new(config).build(&df, &[], None);
        assert!(report.is_ok());
    }
}
