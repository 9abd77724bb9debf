//! Built-in transform steps.
//!
//! Steps form a closed set. Each is parsed once from its configured name and
//! options map, and later applied to one module's content at a time.

use std::path::Path;

use thiserror::Error;
use toml::Table;
use tracing::trace;

use super::StepFailure;
use super::command::run_command;
use super::payload::{Content, TextRole, TransformedPayload};
use crate::asset::mime_for_path;
use crate::config::Mode;
use crate::util::text::{js_string, strip_bom};

/// Where injected `<style>` elements are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleTarget {
  Head,
  Body,
}

/// One stage of content conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformStep {
  /// Decode source text into a code module.
  Script,
  /// Validate JSON and export it as the module default.
  Json,
  /// Read stylesheet text.
  Css,
  /// Pull stylesheet text out of the bundle into its own file.
  ExtractCss,
  /// Wrap stylesheet text in code that injects a `<style>` element.
  Style { insert: StyleTarget },
  /// Export the content as a string literal.
  Source,
  /// Turn the content into an asset payload.
  Asset { mime: Option<String> },
  /// Export a render function for a `{{placeholder}}` template.
  Template,
  /// Pipe the content through an external program.
  Command { program: String, args: Vec<String> },
}

/// Invalid step configuration.
#[derive(Debug, Error)]
pub enum StepError {
  #[error("unknown transform step `{name}`")]
  UnknownStep { name: String },

  #[error("step `{step}` does not accept option `{option}`")]
  UnknownOption { step: String, option: String },

  #[error("step `{step}` requires option `{option}`")]
  MissingOption { step: String, option: String },

  #[error("option `{option}` of step `{step}` must be {expected}")]
  InvalidOption {
    step: String,
    option: String,
    expected: &'static str,
  },
}

/// Per-module inputs shared by every step of a chain.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
  pub module: &'a Path,
  pub root: &'a Path,
  pub mode: Mode,
}

impl TransformStep {
  /// Parse a step from its configured name and options.
  pub fn from_parts(name: &str, options: &Table) -> Result<Self, StepError> {
    let step = match name {
      "script" => TransformStep::Script,
      "json" => TransformStep::Json,
      "css" => TransformStep::Css,
      "extract-css" => TransformStep::ExtractCss,
      "source" => TransformStep::Source,
      "template" => TransformStep::Template,
      "style" => {
        let insert = match string_option(name, options, "insert")?.as_deref() {
          None | Some("head") => StyleTarget::Head,
          Some("body") => StyleTarget::Body,
          Some(_) => {
            return Err(StepError::InvalidOption {
              step: name.to_string(),
              option: "insert".to_string(),
              expected: "\"head\" or \"body\"",
            });
          }
        };
        TransformStep::Style { insert }
      }
      "asset" => TransformStep::Asset {
        mime: string_option(name, options, "mime")?,
      },
      "command" => {
        let program = string_option(name, options, "program")?.ok_or_else(|| StepError::MissingOption {
          step: name.to_string(),
          option: "program".to_string(),
        })?;
        let args = match options.get("args") {
          None => Vec::new(),
          Some(value) => value
            .as_array()
            .and_then(|items| items.iter().map(|v| v.as_str().map(str::to_string)).collect())
            .ok_or_else(|| StepError::InvalidOption {
              step: name.to_string(),
              option: "args".to_string(),
              expected: "an array of strings",
            })?,
        };
        TransformStep::Command { program, args }
      }
      _ => return Err(StepError::UnknownStep { name: name.to_string() }),
    };

    let allowed = step.accepted_options();
    if let Some(option) = options.keys().find(|k| !allowed.contains(&k.as_str())) {
      return Err(StepError::UnknownOption {
        step: name.to_string(),
        option: option.clone(),
      });
    }

    Ok(step)
  }

  fn accepted_options(&self) -> &'static [&'static str] {
    match self {
      TransformStep::Style { .. } => &["insert"],
      TransformStep::Asset { .. } => &["mime"],
      TransformStep::Command { .. } => &["program", "args"],
      _ => &[],
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      TransformStep::Script => "script",
      TransformStep::Json => "json",
      TransformStep::Css => "css",
      TransformStep::ExtractCss => "extract-css",
      TransformStep::Style { .. } => "style",
      TransformStep::Source => "source",
      TransformStep::Asset { .. } => "asset",
      TransformStep::Template => "template",
      TransformStep::Command { .. } => "command",
    }
  }

  /// Apply this step to the previous step's output.
  pub async fn apply(&self, input: Content, ctx: &StepContext<'_>) -> Result<Content, StepFailure> {
    trace!(step = self.name(), input = input.kind(), "applying step");

    let output = match self {
      TransformStep::Script => match input {
        Content::Payload(TransformedPayload::Code { text }) => code(text),
        other => code(strip_bom(&into_text(other, "text")?).to_string()),
      },
      TransformStep::Json => {
        let text = into_text(input, "text")?;
        let text = strip_bom(&text).trim();
        serde_json::from_str::<serde::de::IgnoredAny>(text)?;
        code(format!("export default {};\n", text))
      }
      TransformStep::Css => Content::Text(strip_bom(&into_text(input, "text")?).to_string()),
      TransformStep::ExtractCss => Content::Payload(TransformedPayload::ExtractedText {
        text: into_text(input, "stylesheet text")?,
        role: TextRole::Stylesheet,
      }),
      TransformStep::Style { insert } => {
        let css = into_text(input, "stylesheet text")?;
        let parent = match insert {
          StyleTarget::Head => "head",
          StyleTarget::Body => "body",
        };
        code(format!(
          "var __style = document.createElement(\"style\");\n__style.textContent = {};\ndocument.{}.appendChild(__style);\n",
          js_string(&css),
          parent
        ))
      }
      TransformStep::Source => code(format!("export default {};\n", js_string(&into_text(input, "text")?))),
      TransformStep::Template => code(format!(
        "var __template = {};\n{}",
        js_string(&into_text(input, "template text")?),
        TEMPLATE_RENDERER
      )),
      TransformStep::Asset { mime } => {
        let bytes = into_bytes(input, "raw bytes")?;
        let mime = mime.clone().unwrap_or_else(|| mime_for_path(ctx.module).to_string());
        Content::Payload(TransformedPayload::Asset { bytes, mime })
      }
      TransformStep::Command { program, args } => {
        let bytes = into_bytes(input, "content")?;
        Content::Raw(run_command(program, args, &bytes, ctx).await?)
      }
    };

    Ok(output)
  }
}

const TEMPLATE_RENDERER: &str = r#"export default function (context) {
  return __template.replace(/\{\{\s*([\w.]+)\s*\}\}/g, function (_, key) {
    var value = key.split(".").reduce(function (obj, part) {
      return obj == null ? undefined : obj[part];
    }, context);
    return value == null ? "" : String(value);
  });
}
"#;

fn code(text: String) -> Content {
  Content::Payload(TransformedPayload::Code { text })
}

fn string_option(step: &str, options: &Table, option: &str) -> Result<Option<String>, StepError> {
  match options.get(option) {
    None => Ok(None),
    Some(value) => value
      .as_str()
      .map(|s| Some(s.to_string()))
      .ok_or_else(|| StepError::InvalidOption {
        step: step.to_string(),
        option: option.to_string(),
        expected: "a string",
      }),
  }
}

/// Text-like content, decoding raw bytes as UTF-8.
fn into_text(input: Content, expected: &'static str) -> Result<String, StepFailure> {
  match input {
    Content::Raw(bytes) => Ok(String::from_utf8(bytes)?),
    Content::Text(text) => Ok(text),
    other => Err(StepFailure::UnexpectedInput {
      expected,
      actual: other.kind(),
    }),
  }
}

/// Byte view of any content.
fn into_bytes(input: Content, expected: &'static str) -> Result<Vec<u8>, StepFailure> {
  match input {
    Content::Raw(bytes) => Ok(bytes),
    Content::Text(text) => Ok(text.into_bytes()),
    Content::Payload(TransformedPayload::Code { text }) => Ok(text.into_bytes()),
    Content::Payload(TransformedPayload::ExtractedText { text, .. }) => Ok(text.into_bytes()),
    Content::Payload(TransformedPayload::Asset { .. }) => Err(StepFailure::UnexpectedInput {
      expected,
      actual: "asset",
    }),
  }
}
