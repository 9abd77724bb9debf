//! Bundle linking.
//!
//! Every module's transformed output becomes one entry in a registry keyed by
//! module id. Modules are emitted sorted by id so the bundle text depends only
//! on the module set, never on discovery or transform completion order.
//! Extracted stylesheet text is collected in the same order.

pub mod rewrite;
pub mod runtime;

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::config::Mode;
use crate::graph::ModuleId;
use crate::util::text::js_string;

pub use rewrite::{UnknownReference, rewrite_module};

#[derive(Debug, Error)]
pub enum BundleError {
  #[error("{} references '{reference}', which did not resolve to a bundled module", module.display())]
  UnmappedReference { module: PathBuf, reference: String },

  #[error("entry module {entry} is not part of the bundle")]
  MissingEntry { entry: ModuleId },
}

/// What a module contributes to the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOutput {
  /// Module code, rewritten for the registry.
  Code(String),
  /// An asset embedded as a data URI.
  InlineAsset { data_uri: String },
  /// An asset emitted as its own file; the module exports its URL.
  SeparateAsset { name: String },
  /// Stylesheet text moved to the stylesheet file; the module body is empty.
  Stylesheet(String),
}

/// One module ready for linking.
#[derive(Debug, Clone)]
pub struct LinkModule {
  pub id: ModuleId,
  pub path: PathBuf,
  pub output: ModuleOutput,
  /// Reference strings mapped to the ids they resolved to.
  pub references: BTreeMap<String, ModuleId>,
}

#[derive(Debug, Clone)]
pub struct LinkOptions {
  pub mode: Mode,
  pub public_path: String,
}

/// Result of linking.
#[derive(Debug, Clone)]
pub struct Bundle {
  pub script: String,
  /// Concatenated extracted stylesheets, if any module produced one.
  pub stylesheet: Option<String>,
  /// Modules that contributed non-empty code.
  pub code_modules: usize,
}

impl Bundle {
  pub fn is_empty(&self) -> bool {
    self.code_modules == 0
  }
}

/// Link `modules` into a single script rooted at `entry`.
pub fn link(entry: &ModuleId, modules: &[LinkModule], options: &LinkOptions) -> Result<Bundle, BundleError> {
  if !modules.iter().any(|m| &m.id == entry) {
    return Err(BundleError::MissingEntry { entry: entry.clone() });
  }

  let mut ordered: Vec<&LinkModule> = modules.iter().collect();
  ordered.sort_by(|a, b| a.id.cmp(&b.id));

  let mut bodies = Vec::with_capacity(ordered.len());
  let mut stylesheets = Vec::new();
  let mut code_modules = 0;

  for module in ordered {
    let body = match &module.output {
      ModuleOutput::Code(code) => {
        if !code.trim().is_empty() {
          code_modules += 1;
        }
        rewrite_module(code, options.mode, |r| module.references.get(r)).map_err(|UnknownReference(reference)| {
          BundleError::UnmappedReference {
            module: module.path.clone(),
            reference,
          }
        })?
      }
      ModuleOutput::InlineAsset { data_uri } => {
        format!("__hashpack_esm(exports, {{}});\nexports.default = {};", js_string(data_uri))
      }
      ModuleOutput::SeparateAsset { name } => format!(
        "__hashpack_esm(exports, {{}});\nexports.default = __hashpack_public_path + {};",
        js_string(name)
      ),
      ModuleOutput::Stylesheet(text) => {
        stylesheets.push(text.trim_end());
        String::new()
      }
    };
    debug!(module = %module.id, bytes = body.len(), "linked module");
    bodies.push((module.id.clone(), body));
  }

  let stylesheet = (!stylesheets.is_empty()).then(|| {
    let mut css = stylesheets.join("\n");
    css.push('\n');
    css
  });

  Ok(Bundle {
    script: runtime::render(entry, &options.public_path, &bodies),
    stylesheet,
    code_modules,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn id(s: &str) -> ModuleId {
    ModuleId(s.to_string())
  }

  fn module(name: &str, output: ModuleOutput, refs: &[(&str, &str)]) -> LinkModule {
    LinkModule {
      id: id(name),
      path: PathBuf::from(name.trim_start_matches('.')),
      output,
      references: refs.iter().map(|(r, target)| (r.to_string(), id(target))).collect(),
    }
  }

  fn options() -> LinkOptions {
    LinkOptions {
      mode: Mode::Production,
      public_path: String::new(),
    }
  }

  fn demo() -> Vec<LinkModule> {
    vec![
      module(
        "./src/index.js",
        ModuleOutput::Code("import jungle from './jungle.jpg';\nimport './heading.css';\nimport logo from './logo.png';\n".into()),
        &[
          ("./jungle.jpg", "./src/jungle.jpg"),
          ("./heading.css", "./src/heading.css"),
          ("./logo.png", "./src/logo.png"),
        ],
      ),
      module(
        "./src/jungle.jpg",
        ModuleOutput::InlineAsset {
          data_uri: "data:image/jpeg;base64,AAAA".into(),
        },
        &[],
      ),
      module(
        "./src/logo.png",
        ModuleOutput::SeparateAsset {
          name: "logo.0123456789abcdef0123.png".into(),
        },
        &[],
      ),
      module("./src/heading.css", ModuleOutput::Stylesheet("h1 { color: red; }\n".into()), &[]),
    ]
  }

  #[test]
  fn links_assets_and_collects_stylesheets() {
    let bundle = link(&id("./src/index.js"), &demo(), &options()).unwrap();

    assert!(bundle.script.contains(r#"exports.default = "data:image/jpeg;base64,AAAA";"#));
    assert!(bundle.script.contains(r#"exports.default = __hashpack_public_path + "logo.0123456789abcdef0123.png";"#));
    assert_eq!(bundle.stylesheet.as_deref(), Some("h1 { color: red; }\n"));
    assert_eq!(bundle.code_modules, 1);
  }

  #[test]
  fn input_order_does_not_change_output() {
    let mut reversed = demo();
    reversed.reverse();
    let a = link(&id("./src/index.js"), &demo(), &options()).unwrap();
    let b = link(&id("./src/index.js"), &reversed, &options()).unwrap();
    assert_eq!(a.script, b.script);
  }

  #[test]
  fn unmapped_reference_names_module() {
    let modules = vec![module("./src/index.js", ModuleOutput::Code("require('./ghost.js');".into()), &[])];
    let err = link(&id("./src/index.js"), &modules, &options()).unwrap_err();
    assert!(matches!(err, BundleError::UnmappedReference { reference, .. } if reference == "./ghost.js"));
  }

  #[test]
  fn bundle_without_code_is_empty() {
    let modules = vec![module("./src/index.js", ModuleOutput::Stylesheet("a{}".into()), &[])];
    let bundle = link(&id("./src/index.js"), &modules, &options()).unwrap();
    assert!(bundle.is_empty());
  }
}
