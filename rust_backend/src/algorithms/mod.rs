//! Volumetric calculations, spec evaluation and trend fitting.
//!
//! # Components
//!
//! - [`volumetrics`]: Va, VMA, VFB and the binder absorption extension
//! - [`specs`]: acceptance ranges, per-sample verdicts and verdict counts
//! - [`trend`]: least-squares polynomial trend curves
//!
//! # Example
//!
//! ```
//! use mixvol::algorithms::volumetrics::{air_voids, voids_filled_with_binder, voids_in_mineral_aggregate};
//! use mixvol::config::VmaFormula;
//!
//! let va = air_voids(2.35, 2.45);
//! let vma = voids_in_mineral_aggregate(2.35, 2.60, 5.0, VmaFormula::GsbOnly);
//! let vfb = voids_filled_with_binder(vma, va);
//! println!("Va {:.2}%  VMA {:.2}%  VFB {:.2}%", va, vma, vfb);
//! ```

pub mod specs;
pub mod trend;
pub mod volumetrics;

pub use specs::{evaluate_specs, rules_from_limits, summarize, SpecRule, SpecSummary};
pub use trend::{fit_polynomial, PolynomialFit};
pub use volumetrics::compute_properties;
