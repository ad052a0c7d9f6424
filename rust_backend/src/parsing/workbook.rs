use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use std::io::Cursor;

use crate::core::error::{MixError, MixResult};
use crate::parsing::raw_table::{Cell, RawTable};

/// Read one worksheet of an xlsx workbook held in memory.
///
/// The first row of the sheet's used range is the header row. When `sheet`
/// is `None` the first sheet in workbook order is read.
pub fn read_workbook_bytes(bytes: &[u8], sheet: Option<&str>) -> MixResult<RawTable> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let sheet_names = workbook.sheet_names();

    let sheet_name = match sheet {
        Some(requested) => sheet_names
            .iter()
            .find(|name| name.as_str() == requested)
            .cloned()
            .ok_or_else(|| {
                MixError::Input(format!(
                    "Sheet '{}' not found. Available sheets: {}",
                    requested,
                    sheet_names.join(", ")
                ))
            })?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| MixError::Input("Workbook contains no sheets".to_string()))?,
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let headers = match rows.next() {
        Some(header_row) => header_row.iter().map(header_text).collect(),
        None => {
            return Err(MixError::Input(format!(
                "Sheet '{}' is empty",
                sheet_name
            )))
        }
    };

    let data = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    log::debug!("Read sheet '{}' ({} data rows)", sheet_name, range.height().saturating_sub(1));

    Ok(RawTable::new(headers, data))
}

fn header_text(data: &Data) -> String {
    match cell_from_data(data) {
        Cell::Empty => String::new(),
        cell => cell.as_text().unwrap_or_default(),
    }
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::Error(e) => Cell::Text(e.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

