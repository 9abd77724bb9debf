//! hashpack-lib: the hashpack asset build pipeline
//!
//! A build walks the module graph from an entry file, routes every module
//! through its matching rules, decides how each asset is emitted, and writes
//! content-addressed output plus an HTML entry document:
//! - `graph`: module discovery and reference resolution
//! - `rules`: pattern-to-transform-chain matching
//! - `transform`: transform chain execution
//! - `asset`: inline versus separate emission
//! - `address`: content-addressed file naming
//! - `bundle`: linking code modules into one script
//! - `output`: writing files and rendering the entry document
//! - `build`: the orchestrating entry point

pub mod address;
pub mod asset;
pub mod build;
pub mod bundle;
pub mod config;
pub mod consts;
pub mod graph;
pub mod init;
pub mod manifest;
pub mod output;
pub mod plugins;
pub mod report;
pub mod rules;
pub mod transform;
pub mod util;

pub use build::{BuildError, build};
pub use config::{BuildConfig, ConfigError, ConfigOverrides, Mode};
pub use report::{BuildReport, BuildWarning};
