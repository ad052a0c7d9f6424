use polars::prelude::*;
use std::collections::HashSet;

use crate::core::error::MixResult;

/// One cell of an input table before column types are decided.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// `true` for missing cells and whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric reading of the cell.
    ///
    /// Text is accepted when it parses as a float, which includes the
    /// `NaN`, `inf` and `-inf` markers written by the report builder, and
    /// spreadsheet error codes such as `#DIV/0!` read as NaN.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => parse_numeric_text(s),
            Cell::Empty | Cell::Bool(_) => None,
        }
    }

    /// Text rendering used when a column ends up holding strings.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(v) => Some(format_number(*v)),
            Cell::Bool(b) => Some(b.to_string()),
        }
    }
}

pub(crate) fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    match trimmed {
        "#NUM!" | "#DIV/0!" | "#VALUE!" | "#N/A" => Some(f64::NAN),
        _ => trimmed.parse::<f64>().ok(),
    }
}

/// Integral floats print without a trailing `.0` so that sample ids read
/// back from a spreadsheet stay recognisable.
pub(crate) fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

/// Untyped input table: a header row and data rows of cells.
///
/// This is the boundary type between file readers (xlsx, CSV, Python
/// bindings) and the DataFrame based pipeline. Headers are trimmed on
/// construction and blank headers get positional names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let headers = headers
            .into_iter()
            .enumerate()
            .map(|(idx, header)| {
                let trimmed = header.trim();
                if trimmed.is_empty() {
                    format!("Unnamed: {}", idx)
                } else {
                    trimmed.to_string()
                }
            })
            .collect();
        Self { headers, rows }
    }

    /// Convenience constructor for tables assembled in code.
    ///
    /// # Examples
    ///
    /// ```
    /// use mixvol::parsing::{Cell, RawTable};
    ///
    /// let table = RawTable::from_rows(
    ///     &["Sample", "Gmb"],
    ///     vec![vec![Cell::Text("S1".into()), Cell::Number(2.35)]],
    /// );
    /// assert_eq!(table.num_columns(), 2);
    /// assert_eq!(table.num_rows(), 1);
    /// ```
    pub fn from_rows(headers: &[&str], rows: Vec<Vec<Cell>>) -> Self {
        Self::new(headers.iter().map(|h| h.to_string()).collect(), rows)
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Removes rows where every cell is empty. Returns the number removed.
    pub fn drop_empty_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| !row.iter().all(Cell::is_empty));
        before - self.rows.len()
    }

    /// Collapses duplicate column names, keeping the first occurrence.
    ///
    /// Returns the names of the dropped columns in input order.
    pub fn dedup_columns(&mut self) -> Vec<String> {
        let mut seen = HashSet::new();
        let keep: Vec<bool> = self
            .headers
            .iter()
            .map(|header| seen.insert(header.clone()))
            .collect();

        if keep.iter().all(|k| *k) {
            return Vec::new();
        }

        let dropped = self
            .headers
            .iter()
            .zip(&keep)
            .filter(|(_, k)| !**k)
            .map(|(h, _)| h.clone())
            .collect();

        self.headers = self
            .headers
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(h, _)| h.clone())
            .collect();

        for row in &mut self.rows {
            let cells = std::mem::take(row);
            *row = cells
                .into_iter()
                .enumerate()
                .filter(|(idx, _)| keep.get(*idx).copied().unwrap_or(false))
                .map(|(_, cell)| cell)
                .collect();
        }

        dropped
    }

    /// Builds a DataFrame, inferring one dtype per column.
    ///
    /// A column is `Float64` when every non-empty cell reads as a number,
    /// `Boolean` when every non-empty cell is a boolean, and `String`
    /// otherwise. Empty cells become nulls. Column names must be unique,
    /// see [`RawTable::dedup_columns`].
    pub fn to_dataframe(&self) -> MixResult<DataFrame> {
        let columns = (0..self.num_columns())
            .map(|idx| self.build_column(idx))
            .collect::<Vec<_>>();
        Ok(DataFrame::new(columns)?)
    }

    fn build_column(&self, idx: usize) -> Column {
        let name = self.headers[idx].as_str();
        let cells: Vec<&Cell> = (0..self.num_rows()).map(|row| self.cell(row, idx)).collect();
        let mut filled = cells.iter().filter(|c| !c.is_empty());

        if filled.clone().all(|c| c.as_f64().is_some()) {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|c| if c.is_empty() { None } else { c.as_f64() })
                .collect();
            return Column::new(name.into(), values);
        }

        if filled.all(|c| matches!(c, Cell::Bool(_))) {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Cell::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            return Column::new(name.into(), values);
        }

        let values: Vec<Option<String>> = cells
            .iter()
            .map(|c| if c.is_empty() { None } else { c.as_text() })
            .collect();
        Column::new(name.into(), values)
    }
}
