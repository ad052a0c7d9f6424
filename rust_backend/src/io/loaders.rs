use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::parsing::csv_table::read_csv_bytes;
use crate::parsing::raw_table::RawTable;
use crate::parsing::workbook::read_workbook_bytes;

/// Represents the source format of a mix table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableSourceType {
    Xlsx,
    Csv,
}

impl TableSourceType {
    /// Detects the format from a file name extension.
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .context("File has no extension")?;

        match extension.to_lowercase().as_str() {
            "xlsx" | "xlsm" => Ok(TableSourceType::Xlsx),
            "csv" => Ok(TableSourceType::Csv),
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        }
    }
}

/// Result of loading a mix table
#[derive(Debug, Clone)]
pub struct TableLoadResult {
    pub table: RawTable,
    pub source_type: TableSourceType,
    /// File name the table was read from
    pub source_name: String,
    pub num_rows: usize,
    /// SHA-256 of the input bytes, hex encoded
    pub checksum: String,
}

impl TableLoadResult {
    pub fn new(table: RawTable, source_type: TableSourceType, source_name: &str, bytes: &[u8]) -> Self {
        let num_rows = table.num_rows();
        Self {
            table,
            source_type,
            source_name: source_name.to_string(),
            num_rows,
            checksum: calculate_checksum(bytes),
        }
    }
}

/// Unified interface for loading mix tables from xlsx or CSV
pub struct MixTableLoader;

impl MixTableLoader {
    /// Load a mix table from a file (auto-detects xlsx or CSV)
    ///
    /// `sheet` selects a worksheet by name; it is ignored for CSV input.
    pub fn load_from_file(path: &Path, sheet: Option<&str>) -> Result<TableLoadResult> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .context("Input path has no file name")?;
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?;

        Self::load_from_bytes(&bytes, file_name, sheet)
    }

    /// Load a mix table from uploaded bytes, using `file_name` to pick the format
    pub fn load_from_bytes(bytes: &[u8], file_name: &str, sheet: Option<&str>) -> Result<TableLoadResult> {
        match TableSourceType::from_file_name(file_name)? {
            TableSourceType::Xlsx => Self::load_from_xlsx_bytes(bytes, file_name, sheet),
            TableSourceType::Csv => Self::load_from_csv_bytes(bytes, file_name),
        }
    }

    /// Load a mix table from xlsx bytes
    pub fn load_from_xlsx_bytes(
        bytes: &[u8],
        file_name: &str,
        sheet: Option<&str>,
    ) -> Result<TableLoadResult> {
        let table = read_workbook_bytes(bytes, sheet)
            .with_context(|| format!("Failed to parse workbook {}", file_name))?;

        log::info!("Loaded {} row(s) from {}", table.num_rows(), file_name);
        Ok(TableLoadResult::new(table, TableSourceType::Xlsx, file_name, bytes))
    }

    /// Load a mix table from CSV bytes
    pub fn load_from_csv_bytes(bytes: &[u8], file_name: &str) -> Result<TableLoadResult> {
        let table = read_csv_bytes(bytes)
            .with_context(|| format!("Failed to parse CSV file {}", file_name))?;

        log::info!("Loaded {} row(s) from {}", table.num_rows(), file_name);
        Ok(TableLoadResult::new(table, TableSourceType::Csv, file_name, bytes))
    }
}

/// Calculate SHA-256 checksum of input bytes.
///
/// # Returns
/// Hexadecimal string representation of the SHA-256 hash.
pub fn calculate_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    hex::encode(result)
}
