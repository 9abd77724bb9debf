//! Scaffold a new hashpack project.
//!
//! `hashpack init` writes:
//! - `hashpack.toml` with the default rules spelled out
//! - `src/index.js` entry module
//! - `src/index.hbs` entry document template

mod templates;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::consts::CONFIG_FILENAME;

pub use templates::{CONFIG_TEMPLATE, INDEX_HBS_TEMPLATE, INDEX_JS_TEMPLATE};

/// Errors that can occur during initialization.
#[derive(Debug, Error)]
pub enum InitError {
  #[error("file already exists: {}", path.display())]
  PathExists { path: PathBuf },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write file {}: {source}", path.display())]
  WriteFile { path: PathBuf, source: std::io::Error },

  #[error("failed to canonicalize path {}: {source}", path.display())]
  Canonicalize { path: PathBuf, source: std::io::Error },
}

/// Options for scaffolding a project.
pub struct InitOptions {
  /// Project directory; created if missing.
  pub dir: PathBuf,
  /// Overwrite existing files instead of failing.
  pub force: bool,
}

/// Result of a successful initialization.
#[derive(Debug)]
pub struct InitResult {
  /// The project directory (canonicalized)
  pub project_dir: PathBuf,
  pub config: PathBuf,
  pub entry: PathBuf,
  pub template: PathBuf,
}

/// Scaffold a project in `options.dir`.
///
/// # Errors
///
/// Returns an error if:
/// - any scaffold file already exists and `force` is not set
/// - directory creation fails
/// - file writing fails
pub fn init(options: &InitOptions) -> Result<InitResult, InitError> {
  fs::create_dir_all(&options.dir).map_err(|e| InitError::CreateDir {
    path: options.dir.clone(),
    source: e,
  })?;

  let project_dir = dunce::canonicalize(&options.dir).map_err(|e| InitError::Canonicalize {
    path: options.dir.clone(),
    source: e,
  })?;

  let config = project_dir.join(CONFIG_FILENAME);
  let src = project_dir.join("src");
  let entry = src.join("index.js");
  let template = src.join("index.hbs");

  // Check every target first so a refusal writes nothing.
  if !options.force {
    for path in [&config, &entry, &template] {
      if path.exists() {
        return Err(InitError::PathExists { path: path.clone() });
      }
    }
  }

  fs::create_dir_all(&src).map_err(|e| InitError::CreateDir {
    path: src.clone(),
    source: e,
  })?;

  write(&config, CONFIG_TEMPLATE)?;
  write(&entry, INDEX_JS_TEMPLATE)?;
  write(&template, INDEX_HBS_TEMPLATE)?;

  info!(dir = %project_dir.display(), "initialized project");

  Ok(InitResult {
    project_dir,
    config,
    entry,
    template,
  })
}

fn write(path: &Path, content: &str) -> Result<(), InitError> {
  fs::write(path, content).map_err(|e| InitError::WriteFile {
    path: path.to_path_buf(),
    source: e,
  })
}
