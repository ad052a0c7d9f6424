//! Analysis configuration and built-in profiles.
//!
//! The source analyzers disagreed on the VMA formula and on the VFB upper
//! bound. Both choices are explicit settings here, bundled into named
//! profiles so that a run is reproducible from its configuration alone.
//! Settings are read from TOML files; every section is optional.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::error::{MixError, MixResult};

/// Name of the default configuration file.
pub const CONFIG_FILE_NAME: &str = "mixvol.toml";

/// Profile used when nothing else is requested.
pub const DEFAULT_PROFILE: &str = "gsb-only";

/// Name of the sheet holding provenance and settings in the report.
pub const RUN_INFO_SHEET: &str = "Run Info";

/// Formula used to derive voids in the mineral aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmaFormula {
    /// VMA = (1 - Gmb/Gsb) x 100
    #[default]
    GsbOnly,
    /// VMA = 100 - (Gmb/Gsb) x (100 - Pb)
    GsbAndBitumen,
}

impl VmaFormula {
    pub fn as_str(&self) -> &'static str {
        match self {
            VmaFormula::GsbOnly => "gsb_only",
            VmaFormula::GsbAndBitumen => "gsb_and_bitumen",
        }
    }
}

impl fmt::Display for VmaFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VmaFormula {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "gsb_only" => Ok(VmaFormula::GsbOnly),
            "gsb_and_bitumen" => Ok(VmaFormula::GsbAndBitumen),
            other => Err(format!(
                "Unknown VMA formula: {}. Use 'gsb_only' or 'gsb_and_bitumen'",
                other
            )),
        }
    }
}

/// How charts are placed in the exported workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Rendered PNG charts inserted as pictures.
    #[default]
    EmbeddedImages,
    /// Spreadsheet-native charts bound to the result columns.
    NativeCharts,
}

impl ReportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportMode::EmbeddedImages => "embedded_images",
            ReportMode::NativeCharts => "native_charts",
        }
    }
}

/// Volumetric calculation settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VolumetricsSettings {
    #[serde(default)]
    pub vma_formula: VmaFormula,
    /// Append `Gse` and `Pba (%)` columns computed from Gb.
    #[serde(default)]
    pub binder_absorption: bool,
}

/// Inclusive acceptance limits for the derived properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecLimits {
    #[serde(default = "default_va_min")]
    pub va_min: f64,
    #[serde(default = "default_va_max")]
    pub va_max: f64,
    #[serde(default = "default_vma_min")]
    pub vma_min: f64,
    #[serde(default = "default_vfb_min")]
    pub vfb_min: f64,
    #[serde(default = "default_vfb_max")]
    pub vfb_max: f64,
}

fn default_va_min() -> f64 {
    3.0
}

fn default_va_max() -> f64 {
    5.0
}

fn default_vma_min() -> f64 {
    14.0
}

fn default_vfb_min() -> f64 {
    65.0
}

fn default_vfb_max() -> f64 {
    75.0
}

impl Default for SpecLimits {
    fn default() -> Self {
        Self {
            va_min: default_va_min(),
            va_max: default_va_max(),
            vma_min: default_vma_min(),
            vfb_min: default_vfb_min(),
            vfb_max: default_vfb_max(),
        }
    }
}

/// Trend curve settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_degree")]
    pub degree: usize,
    /// Number of points used to draw the fitted curve.
    #[serde(default = "default_curve_samples")]
    pub samples: usize,
}

fn default_true() -> bool {
    true
}

fn default_degree() -> usize {
    2
}

fn default_curve_samples() -> usize {
    100
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            degree: default_degree(),
            samples: default_curve_samples(),
        }
    }
}

/// Chart image settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSettings {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Also render one chart with all three properties.
    #[serde(default)]
    pub overview: bool,
    /// Join the data points with a line in addition to the markers.
    #[serde(default)]
    pub connect_points: bool,
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    400
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            overview: false,
            connect_points: false,
        }
    }
}

/// Workbook export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default)]
    pub mode: ReportMode,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_image_scale")]
    pub image_scale: f64,
    #[serde(default = "default_true")]
    pub include_run_info: bool,
}

fn default_sheet_name() -> String {
    "Results".to_string()
}

fn default_file_name() -> String {
    "bitumen_mix_analysis.xlsx".to_string()
}

fn default_image_scale() -> f64 {
    0.7
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            mode: ReportMode::default(),
            sheet_name: default_sheet_name(),
            file_name: default_file_name(),
            image_scale: default_image_scale(),
            include_run_info: true,
        }
    }
}

/// Complete analysis configuration.
///
/// # Examples
///
/// ```
/// use mixvol::config::{AnalysisConfig, VmaFormula};
///
/// let config = AnalysisConfig::from_toml_str(r#"
/// [volumetrics]
/// vma_formula = "gsb_and_bitumen"
///
/// [limits]
/// vfb_max = 82.0
/// "#).unwrap();
///
/// assert_eq!(config.volumetrics.vma_formula, VmaFormula::GsbAndBitumen);
/// assert_eq!(config.limits.vfb_max, 82.0);
/// assert_eq!(config.trend.degree, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub volumetrics: VolumetricsSettings,
    #[serde(default)]
    pub limits: SpecLimits,
    #[serde(default)]
    pub trend: TrendSettings,
    #[serde(default)]
    pub charts: ChartSettings,
    #[serde(default)]
    pub report: ReportSettings,
}

static PROFILES: Lazy<Vec<(&'static str, &'static str, AnalysisConfig)>> = Lazy::new(|| {
    let gsb_only = AnalysisConfig::default();

    let mut gsb_bitumen = AnalysisConfig::default();
    gsb_bitumen.volumetrics.vma_formula = VmaFormula::GsbAndBitumen;
    gsb_bitumen.limits.vfb_max = 82.0;
    gsb_bitumen.report.mode = ReportMode::NativeCharts;

    vec![
        (
            "gsb-only",
            "VMA = (1 - Gmb/Gsb) x 100, VFB 65-75, charts embedded as images",
            gsb_only,
        ),
        (
            "gsb-bitumen",
            "VMA = 100 - (Gmb/Gsb) x (100 - Pb), VFB 65-82, native workbook charts",
            gsb_bitumen,
        ),
    ]
});

impl AnalysisConfig {
    /// Returns a built-in profile by name.
    pub fn preset(name: &str) -> Option<Self> {
        PROFILES
            .iter()
            .find(|(profile, _, _)| profile.eq_ignore_ascii_case(name.trim()))
            .map(|(_, _, config)| config.clone())
    }

    /// Names and descriptions of the built-in profiles.
    pub fn profiles() -> Vec<(&'static str, &'static str)> {
        PROFILES
            .iter()
            .map(|(name, description, _)| (*name, *description))
            .collect()
    }

    /// Parse configuration from TOML text and validate it.
    pub fn from_toml_str(content: &str) -> MixResult<Self> {
        let deserializer = toml::Deserializer::new(content);
        let config: AnalysisConfig = serde_path_to_error::deserialize(deserializer)
            .map_err(|e| {
                MixError::Configuration(format!(
                    "Failed to parse config at '{}': {}",
                    e.path(),
                    e.inner()
                ))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Returns
    /// * `Ok(AnalysisConfig)` if the file is readable, parseable and valid
    /// * `Err(MixError::Configuration)` otherwise
    pub fn from_file<P: AsRef<Path>>(path: P) -> MixResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            MixError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `mixvol.toml` in:
    /// 1. Current directory
    /// 2. `rust_backend/` directory
    /// 3. Parent directory
    ///
    /// Returns `Ok(None)` when no file exists.
    pub fn from_default_location() -> MixResult<Option<Self>> {
        let search_paths = [
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("rust_backend").join(CONFIG_FILE_NAME),
            PathBuf::from("..").join(CONFIG_FILE_NAME),
        ];

        for path in search_paths {
            if path.exists() {
                log::debug!("Loading configuration from {}", path.display());
                return Self::from_file(&path).map(Some);
            }
        }

        Ok(None)
    }

    /// Checks that every setting is usable.
    pub fn validate(&self) -> MixResult<()> {
        let limits = &self.limits;
        let all_limits = [
            ("va_min", limits.va_min),
            ("va_max", limits.va_max),
            ("vma_min", limits.vma_min),
            ("vfb_min", limits.vfb_min),
            ("vfb_max", limits.vfb_max),
        ];
        for (name, value) in all_limits {
            if !value.is_finite() {
                return Err(MixError::Configuration(format!(
                    "limits.{} must be a finite number, got {}",
                    name, value
                )));
            }
        }
        if limits.va_min > limits.va_max {
            return Err(MixError::Configuration(format!(
                "limits.va_min ({}) must not exceed limits.va_max ({})",
                limits.va_min, limits.va_max
            )));
        }
        if limits.vfb_min > limits.vfb_max {
            return Err(MixError::Configuration(format!(
                "limits.vfb_min ({}) must not exceed limits.vfb_max ({})",
                limits.vfb_min, limits.vfb_max
            )));
        }

        if !(1..=6).contains(&self.trend.degree) {
            return Err(MixError::Configuration(format!(
                "trend.degree must be between 1 and 6, got {}",
                self.trend.degree
            )));
        }
        if self.trend.samples < 2 {
            return Err(MixError::Configuration(
                "trend.samples must be at least 2".to_string(),
            ));
        }

        for (name, value) in [("width", self.charts.width), ("height", self.charts.height)] {
            if !(200..=4000).contains(&value) {
                return Err(MixError::Configuration(format!(
                    "charts.{} must be between 200 and 4000 pixels, got {}",
                    name, value
                )));
            }
        }

        let sheet = &self.report.sheet_name;
        if sheet.is_empty() || sheet.chars().count() > 31 {
            return Err(MixError::Configuration(
                "report.sheet_name must be 1 to 31 characters".to_string(),
            ));
        }
        if sheet.contains(['[', ']', ':', '*', '?', '/', '\\']) {
            return Err(MixError::Configuration(format!(
                "report.sheet_name contains a character not allowed in sheet names: {}",
                sheet
            )));
        }
        if sheet.starts_with('\'') || sheet.ends_with('\'') {
            return Err(MixError::Configuration(format!(
                "report.sheet_name must not start or end with an apostrophe: {}",
                sheet
            )));
        }
        if sheet.eq_ignore_ascii_case("History") {
            return Err(MixError::Configuration(
                "report.sheet_name 'History' is reserved by Excel".to_string(),
            ));
        }
        if sheet.eq_ignore_ascii_case(RUN_INFO_SHEET) {
            return Err(MixError::Configuration(format!(
                "report.sheet_name must differ from the '{}' sheet",
                RUN_INFO_SHEET
            )));
        }
        if !self.report.file_name.to_lowercase().ends_with(".xlsx") {
            return Err(MixError::Configuration(format!(
                "report.file_name must end with .xlsx, got {}",
                self.report.file_name
            )));
        }
        if !(self.report.image_scale > 0.0 && self.report.image_scale <= 4.0) {
            return Err(MixError::Configuration(format!(
                "report.image_scale must be in (0, 4], got {}",
                self.report.image_scale
            )));
        }

        Ok(())
    }
}
