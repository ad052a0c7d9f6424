//! High-level data loading utilities.
//!
//! Loaders combine format detection, parsing and provenance (a checksum of
//! the input bytes) into one call.
//!
//! # Example
//!
//! ```no_run
//! use mixvol::io::loaders::MixTableLoader;
//! use std::path::Path;
//!
//! let result = MixTableLoader::load_from_file(Path::new("mix.xlsx"), None)
//!     .expect("Failed to load");
//! println!("Loaded {} samples ({})", result.num_rows, result.checksum);
//! ```

pub mod loaders;


pub use loaders::{calculate_checksum, MixTableLoader, TableLoadResult, TableSourceType};
