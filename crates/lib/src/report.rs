//! Build report types.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::config::Mode;
use crate::manifest::{FileKind, Manifest};

/// A non-fatal problem noticed during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildWarning {
  /// An `asset` module exceeded its inline threshold and became a separate file.
  AssetAboveInlineLimit { module: PathBuf, bytes: u64, limit: u64 },
  /// An asset is large enough to hurt page load.
  LargeAsset { module: PathBuf, bytes: u64 },
  /// The script bundle contains no module code.
  EmptyBundle,
}

impl std::fmt::Display for BuildWarning {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      BuildWarning::AssetAboveInlineLimit { module, bytes, limit } => write!(
        f,
        "{} ({} bytes) is above the inline limit of {} bytes and was emitted as a separate file",
        module.display(),
        bytes,
        limit
      ),
      BuildWarning::LargeAsset { module, bytes } => {
        write!(f, "{} is {} bytes, which may impact page load", module.display(), bytes)
      }
      BuildWarning::EmptyBundle => write!(f, "the script bundle contains no module code"),
    }
  }
}

/// One file in the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedSummary {
  pub name: String,
  pub kind: FileKind,
  pub bytes: u64,
  pub source: Option<PathBuf>,
}

/// Outcome of a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
  pub mode: Mode,
  pub entry: PathBuf,
  pub out_dir: PathBuf,
  /// Absolute paths of every module in the graph, sorted.
  pub modules: Vec<PathBuf>,
  pub emitted: Vec<EmittedSummary>,
  pub manifest: Manifest,
  /// Name of the rendered entry document, if HTML generation is enabled.
  pub entry_document: Option<String>,
  pub warnings: Vec<BuildWarning>,
  /// Digest over the whole output directory.
  pub output_hash: String,
  #[serde(with = "duration_millis")]
  pub duration: Duration,
}

impl BuildReport {
  pub fn total_bytes(&self) -> u64 {
    self.emitted.iter().map(|f| f.bytes).sum()
  }
}

mod duration_millis {
  use std::time::Duration;

  use serde::Serializer;

  pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn warning_serializes_with_kind_tag() {
    let warning = BuildWarning::AssetAboveInlineLimit {
      module: PathBuf::from("/src/logo.png"),
      bytes: 10240,
      limit: 3072,
    };
    let json = serde_json::to_value(&warning).unwrap();
    assert_eq!(json["kind"], "asset_above_inline_limit");
    assert_eq!(json["limit"], 3072);
  }

  #[test]
  fn warning_display_names_module() {
    let warning = BuildWarning::LargeAsset {
      module: PathBuf::from("/src/hero.png"),
      bytes: 300_000,
    };
    assert!(warning.to_string().contains("/src/hero.png"));
  }
}
