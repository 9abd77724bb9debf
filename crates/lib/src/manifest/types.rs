//! Manifest types for hashpack.
//!
//! # Determinism
//!
//! Slots are kept in a [`BTreeMap`] and filenames in insertion order, so a
//! manifest built from the same emitted files always serializes identically.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::address::Naming;
use crate::consts::{SLOT_SCRIPT, SLOT_STYLESHEET};

/// What an emitted file is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
  Script,
  Stylesheet,
  Asset,
}

impl FileKind {
  /// Manifest slot filled by files of this kind, if any.
  pub fn slot(self) -> Option<&'static str> {
    match self {
      FileKind::Script => Some(SLOT_SCRIPT),
      FileKind::Stylesheet => Some(SLOT_STYLESHEET),
      FileKind::Asset => None,
    }
  }
}

/// A file queued for the output directory.
///
/// `name` is always `naming.render(&bytes)`; [`EmittedFile::replace_bytes`]
/// keeps the two in step when a hook rewrites content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFile {
  pub name: String,
  pub bytes: Vec<u8>,
  pub kind: FileKind,
  /// The module this file came from; `None` for bundles.
  pub source: Option<PathBuf>,
  naming: Naming,
}

impl EmittedFile {
  pub fn new(kind: FileKind, naming: Naming, bytes: Vec<u8>, source: Option<PathBuf>) -> Self {
    Self {
      name: naming.render(&bytes),
      bytes,
      kind,
      source,
      naming,
    }
  }

  /// Name before content addressing, e.g. `jungle.jpg`.
  pub fn logical_name(&self) -> String {
    self.naming.logical_name()
  }

  /// Swap in new content and recompute the name.
  pub fn replace_bytes(&mut self, bytes: Vec<u8>) {
    self.name = self.naming.render(&bytes);
    self.bytes = bytes;
  }

  /// Whether `name` still matches the current bytes.
  pub fn is_addressed(&self) -> bool {
    self.name == self.naming.render(&self.bytes)
  }
}

/// Mapping from logical entry-point slot to emitted filenames.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
  slots: BTreeMap<String, Vec<String>>,
}

impl Manifest {
  /// Collect slot entries from emitted files, in the given order.
  pub fn from_files(files: &[EmittedFile]) -> Self {
    let mut manifest = Self::default();
    for file in files {
      if let Some(slot) = file.kind.slot() {
        manifest.insert(slot, &file.name);
      }
    }
    manifest
  }

  pub fn insert(&mut self, slot: &str, name: &str) {
    self.slots.entry(slot.to_string()).or_default().push(name.to_string());
  }

  pub fn get(&self, slot: &str) -> Option<&[String]> {
    self.slots.get(slot).map(Vec::as_slice)
  }
}
