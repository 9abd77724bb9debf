//! Content addressing.
//!
//! Output filenames embed a digest of the file's final bytes so that browsers
//! can cache them forever. The digest depends only on content: renaming a
//! source module without touching its bytes leaves the digest unchanged.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::util::hash::content_digest;

/// A filename pattern with `[name]`, `[contenthash]`, and `[ext]` placeholders.
///
/// `[ext]` expands without a leading dot, e.g. `[name].[contenthash].[ext]`
/// renders as `jungle.0f3a9c2b1d4e5f607182.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilenameTemplate(String);

impl FilenameTemplate {
  pub fn new(pattern: impl Into<String>) -> Self {
    Self(pattern.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Whether rendered names depend on content.
  pub fn is_hashed(&self) -> bool {
    self.0.contains("[contenthash]")
  }

  pub fn render(&self, name: &str, ext: &str, bytes: &[u8]) -> String {
    let mut rendered = if ext.is_empty() {
      self.0.replace(".[ext]", "").replace("[ext]", "")
    } else {
      self.0.replace("[ext]", ext)
    };
    rendered = rendered.replace("[name]", name);
    if rendered.contains("[contenthash]") {
      rendered = rendered.replace("[contenthash]", &content_digest(bytes));
    }
    rendered
  }
}

impl std::fmt::Display for FilenameTemplate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// Everything needed to (re)compute a file's final name from its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
  pub template: FilenameTemplate,
  pub name: String,
  pub ext: String,
}

impl Naming {
  pub fn new(template: FilenameTemplate, name: impl Into<String>, ext: impl Into<String>) -> Self {
    Self {
      template,
      name: name.into(),
      ext: ext.into(),
    }
  }

  /// Naming for a source file: its stem and extension.
  pub fn for_source(template: FilenameTemplate, path: &Path) -> Self {
    let name = path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "asset".to_string());
    let ext = path
      .extension()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_default();
    Self::new(template, name, ext)
  }

  pub fn render(&self, bytes: &[u8]) -> String {
    self.template.render(&self.name, &self.ext, bytes)
  }

  /// `<name>.<ext>`, the name before content addressing.
  pub fn logical_name(&self) -> String {
    if self.ext.is_empty() {
      self.name.clone()
    } else {
      format!("{}.{}", self.name, self.ext)
    }
  }
}

/// `<baseName>.<digestHex>.<ext>` for the given bytes.
pub fn address_of(bytes: &[u8], base_name: &str, ext: &str) -> String {
  FilenameTemplate::new("[name].[contenthash].[ext]").render(base_name, ext, bytes)
}
