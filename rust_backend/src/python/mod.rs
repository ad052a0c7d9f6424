//! Python bindings for the mix analyzer.
//!
//! A display shell (Streamlit or similar) hands over the uploaded table as
//! plain Python containers and gets back everything it needs to render the
//! results page: the result records, chart PNGs and the workbook bytes.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyBytes, PyDict, PyList};

use crate::core::error::MixError;
use crate::parsing::raw_table::{Cell, RawTable};
use crate::services::analysis::MixAnalyzer;

fn to_py_err(err: MixError) -> PyErr {
    if err.is_validation() {
        PyValueError::new_err(err.to_string())
    } else {
        PyRuntimeError::new_err(err.to_string())
    }
}

fn cell_from_py(value: &Bound<'_, PyAny>) -> PyResult<Cell> {
    if value.is_none() {
        return Ok(Cell::Empty);
    }
    // bool is a subclass of int in Python
    if value.is_instance_of::<PyBool>() {
        return Ok(Cell::Bool(value.extract::<bool>()?));
    }
    if let Ok(number) = value.extract::<f64>() {
        return Ok(Cell::Number(number));
    }
    if let Ok(text) = value.extract::<String>() {
        return Ok(Cell::Text(text));
    }
    Ok(Cell::Text(value.str()?.to_string()))
}

fn key_to_header(key: &Bound<'_, PyAny>) -> PyResult<String> {
    Ok(key.str()?.to_string())
}

/// Columnar input: `{"Sample": [...], "Gmb": [...], ...}`.
fn table_from_columns(columns: &Bound<'_, PyDict>) -> PyResult<RawTable> {
    let mut headers = Vec::with_capacity(columns.len());
    let mut values: Vec<Vec<Cell>> = Vec::with_capacity(columns.len());

    for (key, column) in columns.iter() {
        headers.push(key_to_header(&key)?);
        let mut cells = Vec::new();
        for item in column.try_iter()? {
            cells.push(cell_from_py(&item?)?);
        }
        values.push(cells);
    }

    let num_rows = values.iter().map(Vec::len).max().unwrap_or(0);
    let rows = (0..num_rows)
        .map(|row| {
            values
                .iter()
                .map(|column| column.get(row).cloned().unwrap_or(Cell::Empty))
                .collect()
        })
        .collect();

    Ok(RawTable::new(headers, rows))
}

/// Record input: `[{"Sample": "S1", "Gmb": 2.35, ...}, ...]`.
fn table_from_records(records: &Bound<'_, PyAny>) -> PyResult<RawTable> {
    let mut headers: Vec<String> = Vec::new();
    let mut parsed: Vec<Vec<(usize, Cell)>> = Vec::new();

    for item in records.try_iter()? {
        let item = item?;
        if !item.is_instance_of::<PyDict>() {
            return Err(PyValueError::new_err(
                "Expected a list of dicts or a dict of lists",
            ));
        }
        let record = item.extract::<Bound<'_, PyDict>>()?;

        let mut row = Vec::with_capacity(record.len());
        for (key, value) in record.iter() {
            let header = key_to_header(&key)?;
            let index = match headers.iter().position(|h| *h == header) {
                Some(index) => index,
                None => {
                    headers.push(header);
                    headers.len() - 1
                }
            };
            row.push((index, cell_from_py(&value)?));
        }
        parsed.push(row);
    }

    let rows = parsed
        .into_iter()
        .map(|row| {
            let mut cells = vec![Cell::Empty; headers.len()];
            for (index, cell) in row {
                cells[index] = cell;
            }
            cells
        })
        .collect();

    Ok(RawTable::new(headers, rows))
}

/// Run the full analysis on an uploaded table.
///
/// Args:
///     data: list of row dicts, or a dict of column lists
///     gb: binder specific gravity
///     gsb: bulk specific gravity of the aggregate
///     file_name: optional workbook file name (default: bitumen_mix_analysis.xlsx)
///     profile: optional built-in profile name (default: gsb-only)
///
/// Returns:
///     dict with keys `columns`, `records` (JSON text), `summary` (JSON text),
///     `warnings`, `charts` (file name -> PNG bytes), `workbook` (bytes),
///     `file_name` and `mime_type`
///
/// Example:
///     >>> import mixvol
///     >>> out = mixvol.analyze_mix(df.to_dict("list"), gb=1.03, gsb=2.65)
///     >>> st.download_button("Download", out["workbook"], out["file_name"], out["mime_type"])
#[pyfunction]
#[pyo3(signature = (data, gb, gsb, file_name=None, profile=None))]
pub fn analyze_mix<'py>(
    py: Python<'py>,
    data: &Bound<'py, PyAny>,
    gb: f64,
    gsb: f64,
    file_name: Option<&str>,
    profile: Option<&str>,
) -> PyResult<Bound<'py, PyDict>> {
    let table = if data.is_instance_of::<PyDict>() {
        table_from_columns(&data.extract::<Bound<'py, PyDict>>()?)?
    } else {
        table_from_records(data)?
    };

    let mut analyzer = match profile {
        Some(name) => MixAnalyzer::with_profile(name).map_err(to_py_err)?,
        None => MixAnalyzer::default(),
    };
    if let Some(name) = file_name {
        analyzer = analyzer.with_report_file_name(name).map_err(to_py_err)?;
    }

    let output = analyzer.run(table, gb, gsb).map_err(to_py_err)?;

    let records = output.table_records().map_err(to_py_err)?;
    let records_json = serde_json::to_string(&records)
        .map_err(|e| PyRuntimeError::new_err(format!("Failed to serialize records: {}", e)))?;
    let summary_json = serde_json::to_string(&output.summary)
        .map_err(|e| PyRuntimeError::new_err(format!("Failed to serialize summary: {}", e)))?;

    let charts = PyDict::new(py);
    for chart in &output.charts {
        charts.set_item(chart.file_name(), PyBytes::new(py, &chart.png))?;
    }

    let dict = PyDict::new(py);
    dict.set_item("columns", PyList::new(py, output.columns())?)?;
    dict.set_item("records", records_json)?;
    dict.set_item("summary", summary_json)?;
    dict.set_item("warnings", output.validation.warnings.clone())?;
    dict.set_item("charts", charts)?;
    dict.set_item("workbook", PyBytes::new(py, &output.report.bytes))?;
    dict.set_item("file_name", output.report.file_name.clone())?;
    dict.set_item("mime_type", output.report.mime_type)?;
    Ok(dict)
}

/// Built-in analysis profiles as `(name, description)` pairs.
#[pyfunction]
pub fn list_profiles() -> Vec<(&'static str, &'static str)> {
    crate::config::AnalysisConfig::profiles()
}
