//! Asset emission decisions.
//!
//! An asset payload is either baked into the importing code as a data URI or
//! written as its own content-addressed file. The choice is a pure function of
//! the payload length and the rule's [`EmitPolicy`]:
//! `len <= max_size` inlines, anything larger is emitted separately.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::address::{FilenameTemplate, Naming};
use crate::consts::ASSET_SIZE_HINT;
use crate::manifest::{EmittedFile, FileKind};
use crate::report::BuildWarning;

/// Errors raised while emitting assets.
#[derive(Debug, Error)]
pub enum AssetError {
  #[error("{} has an asset module type but its transform chain produced {produced}", module.display())]
  NotAnAsset { module: PathBuf, produced: &'static str },
}

/// How a rule wants its assets emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitPolicy {
  /// Inline up to `max_size` bytes, separate above.
  Auto { max_size: u64 },
  Inline,
  Separate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
  Inline,
  Separate,
}

/// Where an asset ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetDecision {
  Inline { data_uri: String },
  Separate { final_name: String },
}

impl AssetDecision {
  pub fn strategy(&self) -> Strategy {
    match self {
      AssetDecision::Inline { .. } => Strategy::Inline,
      AssetDecision::Separate { .. } => Strategy::Separate,
    }
  }

  pub fn final_name(&self) -> Option<&str> {
    match self {
      AssetDecision::Inline { .. } => None,
      AssetDecision::Separate { final_name } => Some(final_name),
    }
  }
}

/// Decision plus its side effects: a queued file and any warnings.
#[derive(Debug)]
pub struct AssetOutcome {
  pub decision: AssetDecision,
  pub file: Option<EmittedFile>,
  pub warnings: Vec<BuildWarning>,
}

/// Pick a strategy for a payload of `len` bytes.
pub fn strategy_for(len: u64, policy: EmitPolicy) -> Strategy {
  match policy {
    EmitPolicy::Auto { max_size } if len <= max_size => Strategy::Inline,
    EmitPolicy::Auto { .. } => Strategy::Separate,
    EmitPolicy::Inline => Strategy::Inline,
    EmitPolicy::Separate => Strategy::Separate,
  }
}

/// Decide how the asset from `module` is emitted.
///
/// Inline assets are base64 encoded into a data URI and queue nothing.
/// Separate assets are named by `template` and returned as an [`EmittedFile`].
pub fn decide(module: &Path, bytes: Vec<u8>, mime: &str, policy: EmitPolicy, template: &FilenameTemplate) -> AssetOutcome {
  let len = bytes.len() as u64;
  let mut warnings = Vec::new();

  if len > ASSET_SIZE_HINT {
    warn!(module = %module.display(), bytes = len, "large asset");
    warnings.push(BuildWarning::LargeAsset {
      module: module.to_path_buf(),
      bytes: len,
    });
  }

  match strategy_for(len, policy) {
    Strategy::Inline => {
      debug!(module = %module.display(), bytes = len, "inlining asset");
      AssetOutcome {
        decision: AssetDecision::Inline {
          data_uri: data_uri(mime, &bytes),
        },
        file: None,
        warnings,
      }
    }
    Strategy::Separate => {
      if let EmitPolicy::Auto { max_size } = policy {
        warn!(module = %module.display(), bytes = len, limit = max_size, "asset above inline limit");
        warnings.push(BuildWarning::AssetAboveInlineLimit {
          module: module.to_path_buf(),
          bytes: len,
          limit: max_size,
        });
      }

      let naming = Naming::for_source(template.clone(), module);
      let file = EmittedFile::new(FileKind::Asset, naming, bytes, Some(module.to_path_buf()));
      debug!(module = %module.display(), name = %file.name, "emitting asset");

      AssetOutcome {
        decision: AssetDecision::Separate {
          final_name: file.name.clone(),
        },
        file: Some(file),
        warnings,
      }
    }
  }
}

/// `data:<mime>;base64,<payload>`
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
  format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// MIME type inferred from a file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
  let ext = path
    .extension()
    .map(|e| e.to_string_lossy().to_ascii_lowercase())
    .unwrap_or_default();

  match ext.as_str() {
    "jpg" | "jpeg" => "image/jpeg",
    "png" => "image/png",
    "gif" => "image/gif",
    "svg" => "image/svg+xml",
    "webp" => "image/webp",
    "avif" => "image/avif",
    "ico" => "image/x-icon",
    "woff" => "font/woff",
    "woff2" => "font/woff2",
    "ttf" => "font/ttf",
    "otf" => "font/otf",
    "txt" => "text/plain",
    "css" => "text/css",
    "html" | "htm" => "text/html",
    "json" => "application/json",
    "js" | "mjs" => "text/javascript",
    "wasm" => "application/wasm",
    "pdf" => "application/pdf",
    "mp4" => "video/mp4",
    "mp3" => "audio/mpeg",
    _ => "application/octet-stream",
  }
}
