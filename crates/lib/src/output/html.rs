//! Entry document rendering.
//!
//! Placeholders are `{{title}}`, `{{description}}`, `{{script}}`,
//! `{{stylesheet}}`, and `{{meta.<key>}}`. `{{script}}` and `{{stylesheet}}`
//! expand to the URL of the emitted file; page values are HTML-escaped.
//!
//! With `inject` enabled, files whose slot the template does not mention are
//! linked automatically: stylesheets and scripts before `</head>`, along with
//! any `meta` entries the template does not reference.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use crate::config::HtmlConfig;
use crate::consts::{SLOT_SCRIPT, SLOT_STYLESHEET};
use crate::manifest::Manifest;

#[derive(Debug, Error)]
pub enum TemplateError {
  #[error("template references {{{{{slot}}}}} but the build produced nothing for it")]
  MissingSlot { slot: String },

  #[error("template references unknown placeholder {{{{{name}}}}}")]
  UnknownPlaceholder { name: String },
}

/// Used when `[html]` names no template.
pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <meta name="description" content="{{description}}" />
    <title>{{title}}</title>
  </head>
  <body></body>
</html>
"#;

/// Render `template` with page values from `config` and URLs from `manifest`.
pub fn render_document(
  template: &str,
  config: &HtmlConfig,
  manifest: &Manifest,
  public_path: &str,
) -> Result<String, TemplateError> {
  let mut out = String::with_capacity(template.len() + 256);
  let mut used_slots = BTreeSet::new();
  let mut used_meta = BTreeSet::new();
  let mut rest = template;

  while let Some(start) = rest.find("{{") {
    let Some(len) = rest[start + 2..].find("}}") else {
      break;
    };
    out.push_str(&rest[..start]);
    let name = rest[start + 2..start + 2 + len].trim();

    let value = match name {
      "title" => escape(&config.title),
      "description" => escape(&config.description),
      SLOT_SCRIPT | SLOT_STYLESHEET => {
        used_slots.insert(name);
        let names = manifest.get(name).filter(|n| !n.is_empty()).ok_or_else(|| TemplateError::MissingSlot {
          slot: name.to_string(),
        })?;
        names
          .iter()
          .map(|n| escape(&format!("{}{}", public_path, n)))
          .collect::<Vec<_>>()
          .join(" ")
      }
      _ => match name.strip_prefix("meta.") {
        Some(key) => {
          used_meta.insert(key.to_string());
          let value = config.meta.get(key).ok_or_else(|| TemplateError::MissingSlot {
            slot: name.to_string(),
          })?;
          escape(value)
        }
        None => {
          return Err(TemplateError::UnknownPlaceholder { name: name.to_string() });
        }
      },
    };

    out.push_str(&value);
    rest = &rest[start + 2 + len + 2..];
  }
  out.push_str(rest);

  if config.inject {
    let mut tags = Vec::new();
    for (key, value) in &config.meta {
      if !used_meta.contains(key) {
        tags.push(format!(r#"<meta name="{}" content="{}" />"#, escape(key), escape(value)));
      }
    }
    if !used_slots.contains(SLOT_STYLESHEET) {
      for name in manifest.get(SLOT_STYLESHEET).unwrap_or_default() {
        tags.push(format!(
          r#"<link rel="stylesheet" href="{}" />"#,
          escape(&format!("{}{}", public_path, name))
        ));
      }
    }
    if !used_slots.contains(SLOT_SCRIPT) {
      for name in manifest.get(SLOT_SCRIPT).unwrap_or_default() {
        tags.push(format!(
          r#"<script defer src="{}"></script>"#,
          escape(&format!("{}{}", public_path, name))
        ));
      }
    }
    if !tags.is_empty() {
      debug!(tags = tags.len(), "injecting tags into entry document");
      out = inject(&out, &tags);
    }
  }

  Ok(out)
}

/// Insert `tags` before `</head>`, else before `</body>`, else at the end.
fn inject(document: &str, tags: &[String]) -> String {
  let lower = document.to_ascii_lowercase();
  let at = lower.find("</head>").or_else(|| lower.find("</body>"));

  match at {
    Some(at) => {
      let mut out = String::with_capacity(document.len() + tags.len() * 64);
      out.push_str(&document[..at]);
      for tag in tags {
        out.push_str("  ");
        out.push_str(tag);
        out.push_str("\n  ");
      }
      out.push_str(&document[at..]);
      out
    }
    None => {
      let mut out = document.to_string();
      if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
      }
      for tag in tags {
        out.push_str(tag);
        out.push('\n');
      }
      out
    }
  }
}

fn escape(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  for c in value.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      c => out.push(c),
    }
  }
  out
}
