//! End-to-end tests for the mix analysis pipeline: loading, calculation,
//! charts and the xlsx report read back through the workbook parser.

mod support;

use approx::assert_relative_eq;
use mixvol::config::{AnalysisConfig, ReportMode, VmaFormula};
use mixvol::io::loaders::MixTableLoader;
use mixvol::parsing::workbook::read_workbook_bytes;
use mixvol::parsing::{Cell, RawTable};
use mixvol::services::analysis::MixAnalyzer;
use mixvol::services::charts::TrendRenderer;
use mixvol::services::report::XLSX_MIME_TYPE;
use mixvol::{MixError, VolumetricProperty};

use support::{has_zip_entry, sample_csv, sample_table, sample_workbook, GB, GSB};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn column_f64(output: &mixvol::RunOutput, name: &str) -> Vec<f64> {
    output
        .table
        .column(name)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect()
}

// ==================== End-to-end ====================

#[test]
fn test_five_samples_end_to_end() {
    let output = mixvol::run(sample_table(), GB, GSB).unwrap();

    assert_eq!(output.table.height(), 5);
    assert_eq!(output.table.width(), 10);
    assert!(!output.report.bytes.is_empty());
    assert_eq!(output.report.file_name, "bitumen_mix_analysis.xlsx");
    assert_eq!(output.report.mime_type, XLSX_MIME_TYPE);
    assert_eq!(output.charts.len(), 3);

    let bitumen = column_f64(&output, "Bitumen Content (%)");
    assert_eq!(bitumen, vec![4.5, 5.0, 5.5, 6.0, 6.5]);

    let va = column_f64(&output, "Va (%)");
    assert_relative_eq!(va[0], 4.0816326530612, epsilon = 1e-9);
}

#[test]
fn test_report_round_trip() {
    let output = mixvol::run(sample_table(), GB, GSB).unwrap();
    let results = read_workbook_bytes(&output.report.bytes, Some("Results")).unwrap();

    // Input columns + 3 values + 3 verdicts
    assert_eq!(results.num_columns(), 4 + 6);
    assert_eq!(results.headers, output.columns());
    assert_eq!(results.num_rows(), 5);

    for name in ["Bitumen Content (%)", "Gmb", "Gmm", "Va (%)", "VMA (%)", "VFB (%)"] {
        let index = results.headers.iter().position(|h| h == name).unwrap();
        let expected = column_f64(&output, name);
        for (row, value) in results.rows.iter().zip(expected) {
            let read = row[index].as_f64().unwrap();
            assert!((read - value).abs() < 1e-9, "{}: {} != {}", name, read, value);
        }
    }

    let status_index = results.headers.iter().position(|h| h == "Va Status").unwrap();
    for row in &results.rows {
        let status = row[status_index].as_text().unwrap();
        assert!(["PASS", "FAIL", "UNDEFINED"].contains(&status.as_str()));
    }
}

#[test]
fn test_nan_round_trips_as_text() {
    let table = RawTable::from_rows(
        &support::HEADERS,
        vec![
            vec![Cell::Text("Z".into()), Cell::Number(5.0), Cell::Number(2.3), Cell::Number(0.0)],
            vec![Cell::Text("A".into()), Cell::Number(4.5), Cell::Number(2.35), Cell::Number(2.45)],
        ],
    );
    let output = mixvol::run(table, GB, GSB).unwrap();
    let results = read_workbook_bytes(&output.report.bytes, Some("Results")).unwrap();

    let va_index = results.headers.iter().position(|h| h == "Va (%)").unwrap();
    let status_index = results.headers.iter().position(|h| h == "Va Status").unwrap();

    // Z (5.0 %) sorts after A (4.5 %)
    let degenerate = &results.rows[1];
    assert_eq!(degenerate[va_index], Cell::Text("NaN".into()));
    assert!(degenerate[va_index].as_f64().unwrap().is_nan());
    assert_eq!(degenerate[status_index].as_text().unwrap(), "UNDEFINED");

    let summary = output.summary.property(VolumetricProperty::AirVoids).unwrap();
    assert_eq!(summary.undefined, 1);
}

#[test]
fn test_run_info_sheet() {
    let output = mixvol::run(sample_table(), GB, GSB).unwrap();
    let info = read_workbook_bytes(&output.report.bytes, Some("Run Info")).unwrap();

    assert_eq!(info.headers, vec!["Setting", "Value"]);
    let gb_row = info
        .rows
        .iter()
        .find(|row| row[0].as_text().as_deref() == Some("Gb"))
        .unwrap();
    assert_eq!(gb_row[1].as_f64(), Some(GB));
}

// ==================== Loading ====================

#[test]
fn test_xlsx_and_csv_inputs_agree() {
    let analyzer = MixAnalyzer::default();

    let xlsx = MixTableLoader::load_from_bytes(&sample_workbook(), "lab.xlsx", Some("Lab Data")).unwrap();
    let csv = MixTableLoader::load_from_bytes(sample_csv().as_bytes(), "lab.csv", None).unwrap();
    assert_ne!(xlsx.checksum, csv.checksum);

    let from_xlsx = analyzer.run_loaded(xlsx, GB, GSB).unwrap();
    let from_csv = analyzer.run_loaded(csv, GB, GSB).unwrap();

    assert_eq!(from_xlsx.columns(), from_csv.columns());
    for name in ["Va (%)", "VMA (%)", "VFB (%)"] {
        let a = column_f64(&from_xlsx, name);
        let b = column_f64(&from_csv, name);
        for (x, y) in a.iter().zip(&b) {
            assert_relative_eq!(*x, *y, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_duplicate_and_padded_columns() {
    let table = RawTable::new(
        vec![
            " Sample ".into(),
            "Bitumen Content (%)".into(),
            "Gmb".into(),
            "Gmm".into(),
            "Gmb".into(),
        ],
        vec![vec![
            Cell::Text("S1".into()),
            Cell::Number(5.0),
            Cell::Number(2.35),
            Cell::Number(2.45),
            Cell::Number(9.99),
        ]],
    );

    let output = mixvol::run(table, GB, GSB).unwrap();
    let columns = output.columns();
    assert_eq!(columns.iter().filter(|c| *c == "Gmb").count(), 1);
    assert_eq!(columns[0], "Sample");
    assert_eq!(column_f64(&output, "Gmb"), vec![2.35]);
}

// ==================== Errors ====================

#[test]
fn test_missing_required_column() {
    let table = RawTable::from_rows(
        &["Sample", "Bitumen Content (%)", "Gmb"],
        vec![vec![Cell::Text("S1".into()), Cell::Number(5.0), Cell::Number(2.35)]],
    );
    let err = mixvol::run(table, GB, GSB).unwrap_err();
    match err {
        MixError::MissingColumns(columns) => assert_eq!(columns, vec!["Gmm".to_string()]),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_non_positive_constants() {
    for (gb, gsb) in [(0.0, GSB), (-1.0, GSB), (GB, 0.0), (GB, f64::NAN)] {
        let err = mixvol::run(sample_table(), gb, gsb).unwrap_err();
        assert!(matches!(err, MixError::InvalidConstant { .. }));
        assert!(err.is_validation());
    }
}

// ==================== Profiles and modes ====================

#[test]
fn test_native_chart_profile() {
    let analyzer = MixAnalyzer::with_profile("gsb-bitumen").unwrap();
    assert_eq!(analyzer.config().volumetrics.vma_formula, VmaFormula::GsbAndBitumen);

    let output = analyzer.run(sample_table(), GB, GSB).unwrap();
    assert!(has_zip_entry(&output.report.bytes, "xl/charts/chart3.xml"));
    assert!(!has_zip_entry(&output.report.bytes, "xl/media/image1.png"));

    // VMA = 100 - (2.35 / 2.60) x (100 - 4.5)
    let vma = column_f64(&output, "VMA (%)");
    assert_relative_eq!(vma[0], 100.0 - (2.35 / 2.60) * 95.5, epsilon = 1e-9);
}

#[test]
fn test_embedded_images_mode() {
    let output = MixAnalyzer::default().run(sample_table(), GB, GSB).unwrap();
    assert!(has_zip_entry(&output.report.bytes, "xl/media/image3.png"));
    assert!(!has_zip_entry(&output.report.bytes, "xl/charts/chart1.xml"));
}

#[test]
fn test_binder_absorption_columns() {
    let mut config = AnalysisConfig::default();
    config.volumetrics.binder_absorption = true;
    config.report.mode = ReportMode::NativeCharts;

    let output = MixAnalyzer::new(config).unwrap().run(sample_table(), GB, GSB).unwrap();
    let columns = output.columns();
    assert_eq!(columns.len(), 12);
    assert!(columns.contains(&"Gse".to_string()));
    assert!(columns.contains(&"Pba (%)".to_string()));
}

// ==================== Charts ====================

#[test]
fn test_repeated_renders_are_identical() {
    let output = mixvol::run(sample_table(), GB, GSB).unwrap();
    let renderer = TrendRenderer::from_config(&AnalysisConfig::default());

    let first = renderer.render_all(&output.table);
    let second = renderer.render_all(&output.table);
    assert_eq!(first.len(), 3);
    for (a, b) in first.iter().zip(&second) {
        assert!(a.png.starts_with(&PNG_SIGNATURE));
        assert_eq!(a.png, b.png);
    }
}

#[test]
fn test_trend_omitted_with_too_few_points() {
    let table = RawTable::from_rows(
        &support::HEADERS,
        vec![
            vec![Cell::Text("S1".into()), Cell::Number(4.5), Cell::Number(2.35), Cell::Number(2.45)],
            vec![Cell::Text("S2".into()), Cell::Number(5.0), Cell::Number(2.37), Cell::Number(2.44)],
        ],
    );
    let output = mixvol::run(table, GB, GSB).unwrap();

    assert_eq!(output.charts.len(), 3);
    for chart in &output.charts {
        assert!(!chart.has_trend);
        assert!(chart.png.starts_with(&PNG_SIGNATURE));
    }
}

#[test]
fn test_overview_chart() {
    let mut config = AnalysisConfig::default();
    config.charts.overview = true;

    let output = MixAnalyzer::new(config).unwrap().run(sample_table(), GB, GSB).unwrap();
    assert_eq!(output.charts.len(), 4);
    assert!(output.charts[3].property.is_none());
    assert_eq!(output.charts[3].file_name(), "overview.png");
}

#[test]
fn test_extreme_air_voids_still_chart() {
    // Gmm near the smallest normal float drives Va towards -f64::MAX
    let table = RawTable::from_rows(
        &support::HEADERS,
        vec![
            vec![Cell::Text("S1".into()), Cell::Number(4.5), Cell::Number(1.75), Cell::Number(1e-306)],
            vec![Cell::Text("S2".into()), Cell::Number(5.0), Cell::Number(2.37), Cell::Number(2.44)],
        ],
    );
    let output = mixvol::run(table, GB, GSB).unwrap();

    let va = column_f64(&output, "Va (%)");
    assert!(va[0] < -1e307);
    assert_eq!(output.charts.len(), 3);
    for chart in &output.charts {
        assert!(chart.png.starts_with(&PNG_SIGNATURE));
    }
    assert!(has_zip_entry(&output.report.bytes, "xl/media/image3.png"));
}
