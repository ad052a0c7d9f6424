//! Core domain models for mix volumetric analysis.
//!
//! This module defines the fundamental data structures used throughout the
//! system: column vocabulary, mix constants, volumetric properties, verdicts
//! and the shared error type.

pub mod domain;
pub mod error;

pub use domain::{MixConstants, Verdict, VolumetricProperty};
pub use error::{MixError, MixResult};
