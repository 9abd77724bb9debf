//! Reference resolution.
//!
//! A reference resolves against a base path chosen by its shape:
//! `./x` and `../x` against the importing module's directory, `/x` against the
//! project root, and bare specifiers against each configured modules
//! directory in turn. For every base the search order is fixed:
//!
//! 1. the exact path, if it is a file
//! 2. the path with each configured extension appended
//! 3. for a directory, `package.json` `main` (bare specifiers only), then each
//!    index file

use std::path::{Path, PathBuf};

use tracing::trace;

use super::GraphError;
use crate::config::ResolveConfig;

/// Resolve `reference` as written in `from`.
pub async fn resolve(reference: &str, from: &Path, root: &Path, config: &ResolveConfig) -> Result<PathBuf, GraphError> {
  let unresolved = || GraphError::UnresolvedReference {
    from: from.to_path_buf(),
    reference: reference.to_string(),
  };

  let bases: Vec<PathBuf> = if is_relative(reference) {
    let dir = from.parent().ok_or_else(unresolved)?;
    vec![dir.join(reference)]
  } else if let Some(rooted) = reference.strip_prefix('/') {
    vec![root.join(rooted)]
  } else {
    config.modules.iter().map(|dir| dir.join(reference)).collect()
  };

  let bare = !is_relative(reference) && !reference.starts_with('/');
  for base in &bases {
    if let Some(found) = lookup(base, config, bare).await {
      let found = dunce::canonicalize(&found).map_err(|source| GraphError::Io { path: found, source })?;
      trace!(reference, from = %from.display(), resolved = %found.display(), "resolved reference");
      return Ok(found);
    }
  }

  Err(unresolved())
}

fn is_relative(reference: &str) -> bool {
  reference == "." || reference == ".." || reference.starts_with("./") || reference.starts_with("../")
}

async fn lookup(base: &Path, config: &ResolveConfig, bare: bool) -> Option<PathBuf> {
  if is_file(base).await {
    return Some(base.to_path_buf());
  }

  for ext in &config.extensions {
    let mut candidate = base.as_os_str().to_owned();
    candidate.push(ext);
    let candidate = PathBuf::from(candidate);
    if is_file(&candidate).await {
      return Some(candidate);
    }
  }

  if !is_dir(base).await {
    return None;
  }

  if bare && let Some(main) = package_main(base).await {
    let candidate = base.join(main);
    if is_file(&candidate).await {
      return Some(candidate);
    }
  }

  for index in &config.index_files {
    let candidate = base.join(index);
    if is_file(&candidate).await {
      return Some(candidate);
    }
  }

  None
}

async fn package_main(dir: &Path) -> Option<String> {
  let content = tokio::fs::read_to_string(dir.join("package.json")).await.ok()?;
  let manifest: serde_json::Value = serde_json::from_str(&content).ok()?;
  manifest.get("main")?.as_str().map(str::to_string)
}

async fn is_file(path: &Path) -> bool {
  tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
  tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}
