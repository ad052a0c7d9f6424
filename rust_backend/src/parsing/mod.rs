//! Readers for laboratory mix tables.
//!
//! Input files are first read into an untyped [`RawTable`] so that header
//! clean-up, duplicate handling and column typing behave the same whatever
//! the source format.
//!
//! # Readers
//!
//! - [`workbook`]: xlsx workbooks (first sheet or a named sheet)
//! - [`csv_table`]: comma-separated text with a header row
//! - [`raw_table`]: the shared cell/table model and DataFrame conversion
//!
//! # Example
//!
//! ```no_run
//! use mixvol::parsing::workbook::read_workbook_bytes;
//!
//! let bytes = std::fs::read("mix.xlsx").expect("Failed to read workbook");
//! let table = read_workbook_bytes(&bytes, None).expect("Failed to parse workbook");
//! println!("{} samples", table.num_rows());
//! ```

pub mod csv_table;
pub mod raw_table;
pub mod workbook;


pub use raw_table::{Cell, RawTable};
