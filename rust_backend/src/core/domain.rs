//! Domain models for asphalt-mix volumetric analysis.
//!
//! This module provides the core vocabulary shared by every stage of the
//! pipeline: the input column names, the mix constants supplied once per run,
//! the three derived volumetric properties and the tri-state spec verdict.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{MixError, MixResult};

/// Sample identifier column.
pub const SAMPLE_COL: &str = "Sample";
/// Bitumen (binder) content by total mix mass, in percent.
pub const BITUMEN_COL: &str = "Bitumen Content (%)";
/// Bulk specific gravity of the compacted mix.
pub const GMB_COL: &str = "Gmb";
/// Theoretical maximum specific gravity of the mix.
pub const GMM_COL: &str = "Gmm";

/// Columns every input table must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = [SAMPLE_COL, BITUMEN_COL, GMB_COL, GMM_COL];

/// Input columns that must be numeric for the calculation to run.
pub const NUMERIC_INPUT_COLUMNS: [&str; 3] = [BITUMEN_COL, GMB_COL, GMM_COL];

/// Effective specific gravity of the aggregate (binder absorption extension).
pub const GSE_COL: &str = "Gse";
/// Absorbed binder by aggregate mass, in percent (binder absorption extension).
pub const PBA_COL: &str = "Pba (%)";

/// The three volumetric properties derived for every sample.
///
/// Each property owns its column names and display labels so that every
/// stage (calculation, evaluation, charts, report) resolves them the same way.
///
/// # Examples
///
/// ```
/// use mixvol::core::domain::VolumetricProperty;
///
/// assert_eq!(VolumetricProperty::AirVoids.column_name(), "Va (%)");
/// assert_eq!(VolumetricProperty::Vfb.status_column(), "VFB Status");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumetricProperty {
    /// Air voids in the compacted mix (Va).
    AirVoids,
    /// Voids in the mineral aggregate (VMA).
    Vma,
    /// Voids filled with binder (VFB).
    Vfb,
}

impl VolumetricProperty {
    /// All properties in calculation order.
    pub const ALL: [VolumetricProperty; 3] = [
        VolumetricProperty::AirVoids,
        VolumetricProperty::Vma,
        VolumetricProperty::Vfb,
    ];

    /// Name of the derived value column.
    pub fn column_name(&self) -> &'static str {
        match self {
            VolumetricProperty::AirVoids => "Va (%)",
            VolumetricProperty::Vma => "VMA (%)",
            VolumetricProperty::Vfb => "VFB (%)",
        }
    }

    /// Name of the verdict column.
    pub fn status_column(&self) -> &'static str {
        match self {
            VolumetricProperty::AirVoids => "Va Status",
            VolumetricProperty::Vma => "VMA Status",
            VolumetricProperty::Vfb => "VFB Status",
        }
    }

    /// Short symbol used in summaries.
    pub fn symbol(&self) -> &'static str {
        match self {
            VolumetricProperty::AirVoids => "Va",
            VolumetricProperty::Vma => "VMA",
            VolumetricProperty::Vfb => "VFB",
        }
    }

    /// Legend label for charts.
    pub fn label(&self) -> &'static str {
        match self {
            VolumetricProperty::AirVoids => "Air Voids (Va)",
            VolumetricProperty::Vma => "VMA",
            VolumetricProperty::Vfb => "VFB",
        }
    }

    /// Chart title, e.g. "Air Voids vs. Bitumen Content".
    pub fn chart_title(&self) -> &'static str {
        match self {
            VolumetricProperty::AirVoids => "Air Voids vs. Bitumen Content",
            VolumetricProperty::Vma => "VMA vs. Bitumen Content",
            VolumetricProperty::Vfb => "VFB vs. Bitumen Content",
        }
    }
}

impl fmt::Display for VolumetricProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Outcome of checking one derived value against its acceptance range.
///
/// `Undefined` is produced for NaN or infinite values and never counts as a
/// pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
    Undefined,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Undefined => "UNDEFINED",
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PASS" => Ok(Verdict::Pass),
            "FAIL" => Ok(Verdict::Fail),
            "UNDEFINED" => Ok(Verdict::Undefined),
            other => Err(format!("Unknown verdict: {}", other)),
        }
    }
}

/// Scalar constants supplied once per analysis run.
///
/// # Fields
///
/// * `gb` - Specific gravity of the binder
/// * `gsb` - Bulk specific gravity of the combined aggregate
///
/// # Examples
///
/// ```
/// use mixvol::core::domain::MixConstants;
///
/// let constants = MixConstants::new(1.03, 2.60).unwrap();
/// assert_eq!(constants.gsb, 2.60);
///
/// assert!(MixConstants::new(0.0, 2.60).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixConstants {
    pub gb: f64,
    pub gsb: f64,
}

impl MixConstants {
    /// Creates validated constants; both values must be finite and > 0.
    pub fn new(gb: f64, gsb: f64) -> MixResult<Self> {
        let constants = Self { gb, gsb };
        constants.validate()?;
        Ok(constants)
    }

    pub fn validate(&self) -> MixResult<()> {
        for (name, value) in [("Gb", self.gb), ("Gsb", self.gsb)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MixError::InvalidConstant { name, value });
            }
        }
        Ok(())
    }
}
