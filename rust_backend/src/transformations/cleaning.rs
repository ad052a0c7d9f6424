use polars::prelude::*;

use crate::core::error::{MixError, MixResult};
use crate::parsing::raw_table::parse_numeric_text;

/// Names from `required_columns` that are absent from the DataFrame, in the
/// order they were requested.
pub fn missing_columns(df: &DataFrame, required_columns: &[&str]) -> Vec<String> {
    required_columns
        .iter()
        .filter(|name| df.get_column_index(name).is_none())
        .map(|name| name.to_string())
        .collect()
}

/// Validate that every required column is present.
///
/// All missing columns are reported together in one
/// [`MixError::MissingColumns`].
pub fn validate_schema(df: &DataFrame, required_columns: &[&str]) -> MixResult<()> {
    let missing = missing_columns(df, required_columns);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MixError::MissingColumns(missing))
    }
}

/// Convert the named columns to `Float64` in place.
///
/// Text values are parsed with the same rules as input cells; anything that
/// does not read as a number becomes null. Columns that are already
/// `Float64` or absent are left alone. Returns the names of the columns that
/// were converted.
pub fn coerce_to_float(df: &mut DataFrame, columns: &[&str]) -> MixResult<Vec<String>> {
    let height = df.height();
    let mut converted = Vec::new();

    for name in columns {
        let coerced = match df.column(name) {
            Err(_) => continue,
            Ok(column) => match column.dtype() {
                DataType::Float64 => continue,
                DataType::String => {
                    let values: Vec<Option<f64>> = column
                        .str()?
                        .into_iter()
                        .map(|v| v.and_then(parse_numeric_text))
                        .collect();
                    Column::new((*name).into(), values)
                }
                DataType::Float32
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt32
                | DataType::UInt64 => column.cast(&DataType::Float64)?,
                _ => Column::full_null((*name).into(), height, &DataType::Float64),
            },
        };
        df.with_column(coerced)?;
        converted.push(name.to_string());
    }

    Ok(converted)
}

/// Append a column at the end of the frame, replacing any column of the same
/// name. Returns `true` when an existing column was replaced.
pub fn put_column(df: &mut DataFrame, column: Column) -> MixResult<bool> {
    let replaced = df.drop_in_place(column.name().as_str()).is_ok();
    df.with_column(column)?;
    Ok(replaced)
}

/// Stable ascending sort by one column with nulls placed last.
pub fn sort_by_column(df: &DataFrame, column: &str) -> MixResult<DataFrame> {
    let sorted = df.sort(
        [column],
        SortMultipleOptions::default()
            .with_maintain_order(true)
            .with_nulls_last(true),
    )?;
    Ok(sorted)
}
