//! Values flowing through a transform chain.

use serde::{Deserialize, Serialize};

/// What a side-output is used for once extracted from a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextRole {
  Stylesheet,
}

impl std::fmt::Display for TextRole {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      TextRole::Stylesheet => write!(f, "stylesheet"),
    }
  }
}

/// The typed result of running a module's full transform chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformedPayload {
  /// JavaScript that becomes a module function in the bundle.
  Code { text: String },
  /// Binary content awaiting an emission decision.
  Asset { bytes: Vec<u8>, mime: String },
  /// Text pulled out of the module graph into its own output file.
  ExtractedText { text: String, role: TextRole },
}

impl TransformedPayload {
  pub fn kind(&self) -> &'static str {
    match self {
      TransformedPayload::Code { .. } => "code",
      TransformedPayload::Asset { .. } => "asset",
      TransformedPayload::ExtractedText { .. } => "extracted text",
    }
  }
}

/// Intermediate content between two steps.
///
/// A chain starts from `Raw` file bytes and must end in `Payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
  Raw(Vec<u8>),
  Text(String),
  Payload(TransformedPayload),
}

impl Content {
  pub fn kind(&self) -> &'static str {
    match self {
      Content::Raw(_) => "raw bytes",
      Content::Text(_) => "text",
      Content::Payload(p) => p.kind(),
    }
  }
}
