//! Bitumen mix volumetric analysis.
//!
//! Takes a table of laboratory measurements (sample id, bitumen content,
//! bulk and maximum specific gravity) plus the binder and aggregate
//! specific gravities, derives air voids, VMA and VFB for every sample,
//! checks them against acceptance limits, renders trend charts and
//! produces an xlsx report.
//!
//! # Modules
//!
//! - [`core`]: domain constants, constants validation and the error type
//! - [`config`]: analysis profiles and TOML configuration
//! - [`parsing`]: xlsx and CSV decoding into an untyped table
//! - [`preprocessing`]: cleaning, typing and input validation
//! - [`transformations`]: DataFrame helpers
//! - [`algorithms`]: volumetric formulas, spec evaluation, trend fitting
//! - [`services`]: charts, report builder and the analyzer itself
//! - [`io`]: file loading with format detection

pub mod algorithms;
pub mod config;
pub mod core;
pub mod io;
pub mod parsing;
pub mod preprocessing;
pub mod services;
pub mod transformations;

#[cfg(feature = "python")]
pub mod python;

pub use crate::config::AnalysisConfig;
pub use crate::core::domain::{MixConstants, VolumetricProperty, Verdict};
pub use crate::core::error::{MixError, MixResult};
pub use crate::parsing::{Cell, RawTable};
pub use crate::services::analysis::{MixAnalyzer, RunOutput};

/// Run the full analysis with the default profile.
pub fn run(table: RawTable, gb: f64, gsb: f64) -> MixResult<RunOutput> {
    MixAnalyzer::default().run(table, gb, gsb)
}

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Bitumen mix analysis for Python display shells
#[cfg(feature = "python")]
#[pymodule]
fn mixvol(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(python::analyze_mix, m)?)?;
    m.add_function(wrap_pyfunction!(python::list_profiles, m)?)?;
    Ok(())
}
