use std::collections::BTreeMap;

use tracing::info;

use super::{EmitHook, HookError};
use crate::output::WriteReport;

pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Writes `manifest.json`: logical file name to emitted file name.
pub struct ManifestJson;

impl EmitHook for ManifestJson {
  fn name(&self) -> &'static str {
    "manifest"
  }

  fn after_emit(&self, report: &WriteReport) -> Result<(), HookError> {
    let mut entries: BTreeMap<String, String> = BTreeMap::new();
    let documents = report.entry_document.iter().map(|d| (d, d));
    for (logical, name) in report.files.iter().map(|f| (&f.logical_name, &f.name)).chain(documents) {
      match entries.get(logical) {
        Some(existing) if existing != name => {
          return Err(HookError::Failed {
            hook: self.name(),
            message: format!("{logical} would map to both {existing} and {name}"),
          });
        }
        Some(_) => {}
        None => {
          entries.insert(logical.clone(), name.clone());
        }
      }
    }

    let mut json = serde_json::to_string_pretty(&entries).map_err(|e| HookError::Failed {
      hook: self.name(),
      message: e.to_string(),
    })?;
    json.push('\n');

    let path = report.out_dir.join(MANIFEST_FILENAME);
    std::fs::write(&path, json).map_err(|source| HookError::Io {
      hook: self.name(),
      path: path.clone(),
      source,
    })?;
    info!(path = %path.display(), entries = entries.len(), "wrote manifest");
    Ok(())
  }
}
