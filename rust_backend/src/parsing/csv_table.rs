use polars::prelude::*;
use std::io::Cursor;

use crate::core::error::{MixError, MixResult};
use crate::parsing::raw_table::{Cell, RawTable};

/// Read CSV text held in memory into a [`RawTable`].
///
/// Every field is read as a string and the first record is used as the
/// header row, so header handling and type inference match the xlsx path.
/// Fields beyond the header width (a trailing comma, say) are dropped.
pub fn read_csv_bytes(bytes: &[u8]) -> MixResult<RawTable> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(MixError::Input("CSV input is empty".to_string()));
    }

    let df = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_truncate_ragged_lines(true))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;

    let height = df.height();
    let columns = df
        .get_columns()
        .iter()
        .map(|column| {
            let values = column.str()?;
            Ok(values.into_iter().map(|v| v.map(str::to_string)).collect::<Vec<_>>())
        })
        .collect::<PolarsResult<Vec<Vec<Option<String>>>>>()?;

    let headers = columns
        .iter()
        .map(|values| values.first().cloned().flatten().unwrap_or_default())
        .collect();

    let rows = (1..height)
        .map(|row| {
            columns
                .iter()
                .map(|values| match values.get(row) {
                    Some(Some(text)) => Cell::Text(text.clone()),
                    _ => Cell::Empty,
                })
                .collect()
        })
        .collect();

    Ok(RawTable::new(headers, rows))
}
