//! Reference extraction.
//!
//! Code modules declare their dependencies with `import`/`export ... from`
//! statements, `require(..)` calls, and dynamic `import(..)`. Non-code modules
//! have no references.

use std::path::Path;

use crate::consts::SCRIPT_EXTENSIONS;
use crate::util::syntax::{
  CALL_SOURCE, DYNAMIC_IMPORT, EXPORT_FROM, IMPORT, REQUIRE, STATEMENT_SOURCE, comment_spans, in_comment,
};

/// Pulls reference strings out of a module's source text.
pub trait ReferenceExtractor: Send + Sync {
  /// Reference strings in source order, without duplicates.
  fn extract(&self, source: &str) -> Vec<String>;
}

/// ES module and CommonJS references.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptReferences;

impl ReferenceExtractor for ScriptReferences {
  fn extract(&self, source: &str) -> Vec<String> {
    let comments = comment_spans(source);
    let mut found: Vec<(usize, &str)> = [
      (&*IMPORT, STATEMENT_SOURCE),
      (&*EXPORT_FROM, STATEMENT_SOURCE),
      (&*REQUIRE, CALL_SOURCE),
      (&*DYNAMIC_IMPORT, CALL_SOURCE),
    ]
    .into_iter()
    .flat_map(|(re, group)| re.captures_iter(source).map(move |caps| (caps, group)))
    .filter(|(caps, _)| caps.get(0).is_some_and(|m| !in_comment(&comments, m.start())))
    .filter_map(|(caps, group)| caps.get(group))
    .map(|m| (m.start(), m.as_str()))
    .collect();
    found.sort_by_key(|(offset, _)| *offset);

    let mut references: Vec<String> = Vec::with_capacity(found.len());
    for (_, reference) in found {
      if !references.iter().any(|r| r == reference) {
        references.push(reference.to_string());
      }
    }
    references
  }
}

/// The extractor for `path`, or `None` for modules that cannot reference others.
pub fn extractor_for(path: &Path) -> Option<&'static dyn ReferenceExtractor> {
  static SCRIPT: ScriptReferences = ScriptReferences;

  let ext = path.extension()?.to_str()?;
  SCRIPT_EXTENSIONS
    .contains(&ext)
    .then_some(&SCRIPT as &'static dyn ReferenceExtractor)
}
