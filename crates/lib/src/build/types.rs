//! Build error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::asset::AssetError;
use crate::bundle::BundleError;
use crate::graph::GraphError;
use crate::output::WriteError;
use crate::rules::RuleError;
use crate::transform::TransformError;
use crate::util::hash::DirHashError;

/// Any fatal build failure. Every variant carries the offending path, rule, or
/// step needed to locate the cause.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  Rule(#[from] RuleError),

  #[error("no rule matches {}; add a rule whose `test` pattern covers it", module.display())]
  NoMatchingRule { module: PathBuf },

  #[error(transparent)]
  Transform(#[from] TransformError),

  #[error(transparent)]
  Asset(#[from] AssetError),

  #[error(transparent)]
  Bundle(#[from] BundleError),

  #[error(transparent)]
  Write(#[from] WriteError),

  #[error("failed to fingerprint output: {0}")]
  OutputHash(#[from] DirHashError),

  #[error("build task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}
