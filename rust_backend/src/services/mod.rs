//! Service layer for chart rendering, report generation and orchestration.
//!
//! Services sit between the pure calculations in [`crate::algorithms`] and
//! the outer shells (CLI, Python bindings). They produce the artifacts of a
//! run: PNG charts and the xlsx workbook.

pub mod analysis;
pub mod charts;
pub mod report;

pub use analysis::{table_records, MixAnalyzer, RunOutput, RunSource};
pub use charts::{ChartImage, TrendRenderer};
pub use report::{ReportArtifact, ReportBuilder, RunInfo, XLSX_MIME_TYPE};
