//! Emit hooks.
//!
//! Plugins are an ordered list of [`EmitHook`] objects the output writer calls
//! at two fixed points: [`EmitHook::before_emit`] may rewrite queued files
//! before anything touches disk, and [`EmitHook::after_emit`] observes the
//! finished output. Built-in hooks are selected by name in the config file.

mod manifest_json;
mod minify;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manifest::EmittedFile;
use crate::output::WriteReport;

pub use manifest_json::{MANIFEST_FILENAME, ManifestJson};
pub use minify::{Minify, minify_css, minify_js};

/// Errors raised by an emit hook.
#[derive(Debug, Error)]
pub enum HookError {
  #[error("hook `{hook}` changed {name} without re-addressing it")]
  Unaddressed { hook: &'static str, name: String },

  #[error("hook `{hook}` failed to write {}: {source}", path.display())]
  Io {
    hook: &'static str,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("hook `{hook}` failed: {message}")]
  Failed { hook: &'static str, message: String },
}

/// A narrow extension point invoked by the output writer.
pub trait EmitHook: Send + Sync {
  fn name(&self) -> &'static str;

  /// Called once with every queued file before any is written. Hooks that
  /// change bytes must keep names content-addressed, e.g. with
  /// [`EmittedFile::replace_bytes`].
  fn before_emit(&self, _files: &mut [EmittedFile]) -> Result<(), HookError> {
    Ok(())
  }

  /// Called after every file and the entry document are on disk.
  fn after_emit(&self, _report: &WriteReport) -> Result<(), HookError> {
    Ok(())
  }
}

/// Built-in hooks selectable from `hashpack.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plugin {
  /// Strip comments and whitespace from scripts and stylesheets.
  Minify,
  /// Write `manifest.json` mapping logical names to emitted names.
  Manifest,
}

impl Plugin {
  pub fn hook(self) -> Box<dyn EmitHook> {
    match self {
      Plugin::Minify => Box::new(Minify),
      Plugin::Manifest => Box::new(ManifestJson),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plugins_parse_by_name() {
    #[derive(Deserialize)]
    struct Wrapper {
      plugins: Vec<Plugin>,
    }
    let parsed: Wrapper = toml::from_str(r#"plugins = ["minify", "manifest"]"#).unwrap();
    assert_eq!(parsed.plugins, vec![Plugin::Minify, Plugin::Manifest]);
    assert_eq!(Plugin::Manifest.hook().name(), "manifest");
  }
}
