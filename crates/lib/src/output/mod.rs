//! Output writing.
//!
//! The writer runs `before_emit` hooks, prepares the output directory, and
//! writes every queued file concurrently. Only once all writes have completed
//! is the [`Manifest`] built and the entry document rendered from it, so the
//! document never references a file that is not on disk. `after_emit` hooks
//! run last.
//!
//! A failure part way through leaves whatever was already written in place.

pub mod html;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::HtmlConfig;
use crate::manifest::{EmittedFile, FileKind, Manifest};
use crate::plugins::{EmitHook, HookError};

pub use html::{DEFAULT_TEMPLATE, TemplateError, render_document};

#[derive(Debug, Error)]
pub enum WriteError {
  #[error("I/O error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("two different files would both be written as {name}")]
  NameCollision { name: String },

  #[error("failed to render entry document: {0}")]
  Template(#[from] TemplateError),

  #[error(transparent)]
  Hook(#[from] HookError),

  #[error("writer task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

/// Where and how to write.
#[derive(Debug, Clone)]
pub struct WriteOptions {
  pub out_dir: PathBuf,
  pub clean: bool,
  pub public_path: String,
  pub html: Option<HtmlConfig>,
  pub parallelism: usize,
}

/// A file confirmed on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
  pub name: String,
  pub logical_name: String,
  pub kind: FileKind,
  pub bytes: u64,
  pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteReport {
  pub out_dir: PathBuf,
  pub files: Vec<WrittenFile>,
  pub manifest: Manifest,
  /// Name of the rendered entry document, relative to `out_dir`.
  pub entry_document: Option<String>,
}

/// Write `files` and the entry document under `options.out_dir`.
pub async fn write_output(
  mut files: Vec<EmittedFile>,
  hooks: &[Box<dyn EmitHook>],
  options: &WriteOptions,
) -> Result<WriteReport, WriteError> {
  for hook in hooks {
    debug!(hook = hook.name(), "before_emit");
    hook.before_emit(&mut files)?;
    if let Some(file) = files.iter().find(|f| !f.is_addressed()) {
      return Err(HookError::Unaddressed {
        hook: hook.name(),
        name: file.name.clone(),
      }
      .into());
    }
  }

  let files = dedupe(files)?;
  prepare_dir(&options.out_dir, options.clean).await?;

  let semaphore = Arc::new(Semaphore::new(options.parallelism.max(1)));
  let mut join_set = JoinSet::new();
  for file in &files {
    let path = options.out_dir.join(&file.name);
    let bytes = file.bytes.clone();
    let semaphore = semaphore.clone();
    join_set.spawn(async move {
      let _permit = semaphore.acquire_owned().await;
      write_file(&path, &bytes).await
    });
  }
  while let Some(joined) = join_set.join_next().await {
    joined??;
  }

  // Join point: every file is on disk.
  let manifest = Manifest::from_files(&files);
  info!(files = files.len(), out_dir = %options.out_dir.display(), "wrote output files");

  let entry_document = match &options.html {
    Some(config) => {
      let template = match &config.template {
        Some(path) => tokio::fs::read_to_string(path).await.map_err(|source| WriteError::Io {
          path: path.clone(),
          source,
        })?,
        None => DEFAULT_TEMPLATE.to_string(),
      };
      let document = render_document(&template, config, &manifest, &options.public_path)?;
      write_file(&options.out_dir.join(&config.filename), document.as_bytes()).await?;
      info!(document = %config.filename, "rendered entry document");
      Some(config.filename.clone())
    }
    None => None,
  };

  let report = WriteReport {
    out_dir: options.out_dir.clone(),
    files: files
      .iter()
      .map(|f| WrittenFile {
        name: f.name.clone(),
        logical_name: f.logical_name(),
        kind: f.kind,
        bytes: f.bytes.len() as u64,
        source: f.source.clone(),
      })
      .collect(),
    manifest,
    entry_document,
  };

  for hook in hooks {
    debug!(hook = hook.name(), "after_emit");
    hook.after_emit(&report)?;
  }

  Ok(report)
}

/// Drop exact duplicates; identical content from two modules is one file.
fn dedupe(files: Vec<EmittedFile>) -> Result<Vec<EmittedFile>, WriteError> {
  let mut seen: HashMap<String, usize> = HashMap::new();
  let mut unique: Vec<EmittedFile> = Vec::with_capacity(files.len());
  for file in files {
    match seen.get(&file.name) {
      Some(&i) if unique[i].bytes == file.bytes => {
        debug!(name = %file.name, "skipping duplicate file");
      }
      Some(_) => return Err(WriteError::NameCollision { name: file.name }),
      None => {
        seen.insert(file.name.clone(), unique.len());
        unique.push(file);
      }
    }
  }
  Ok(unique)
}

async fn prepare_dir(dir: &Path, clean: bool) -> Result<(), WriteError> {
  if clean && tokio::fs::try_exists(dir).await.unwrap_or(false) {
    debug!(dir = %dir.display(), "cleaning output directory");
    tokio::fs::remove_dir_all(dir).await.map_err(|source| WriteError::Io {
      path: dir.to_path_buf(),
      source,
    })?;
  }
  tokio::fs::create_dir_all(dir).await.map_err(|source| WriteError::Io {
    path: dir.to_path_buf(),
    source,
  })
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent).await.map_err(|source| WriteError::Io {
      path: parent.to_path_buf(),
      source,
    })?;
  }
  tokio::fs::write(path, bytes).await.map_err(|source| WriteError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
  Ok(())
}
