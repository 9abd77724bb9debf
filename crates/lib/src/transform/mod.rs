//! Transform chain execution.
//!
//! A module's matched rules yield an ordered list of [`PlannedStep`]s. The
//! executor threads the module's raw bytes through them strictly in that order,
//! each step consuming the previous step's output. The first failing step aborts
//! the chain; partial results are never surfaced.

pub mod command;
pub mod payload;
pub mod steps;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::Mode;

pub use payload::{Content, TextRole, TransformedPayload};
pub use steps::{StepContext, StepError, StyleTarget, TransformStep};

/// A step together with the rule that contributed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
  pub rule: String,
  pub step: TransformStep,
}

/// Why a single step failed.
#[derive(Debug, Error)]
pub enum StepFailure {
  #[error("expected {expected} input, got {actual}")]
  UnexpectedInput {
    expected: &'static str,
    actual: &'static str,
  },

  #[error("content is not valid UTF-8: {0}")]
  Utf8(#[from] std::string::FromUtf8Error),

  #[error("invalid JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("failed to run `{program}`: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("`{program}` exited with code {code:?}: {stderr}")]
  CommandFailed {
    program: String,
    code: Option<i32>,
    stderr: String,
  },
}

/// Errors raised while transforming a module.
#[derive(Debug, Error)]
pub enum TransformError {
  #[error("step `{step}` of rule `{rule}` failed for {}: {cause}", module.display())]
  Step {
    module: PathBuf,
    rule: String,
    step: &'static str,
    #[source]
    cause: StepFailure,
  },

  #[error("transform chain for {} ended with {produced}; add a step that yields code, an asset, or extracted text", module.display())]
  Unfinished { module: PathBuf, produced: &'static str },
}

/// Build-wide inputs to every chain.
#[derive(Debug, Clone)]
pub struct TransformContext {
  pub root: PathBuf,
  pub mode: Mode,
}

/// Run `chain` over `raw`, returning the module's final payload.
pub async fn execute(
  module: &Path,
  raw: Vec<u8>,
  chain: &[PlannedStep],
  ctx: &TransformContext,
) -> Result<TransformedPayload, TransformError> {
  let step_ctx = StepContext {
    module,
    root: &ctx.root,
    mode: ctx.mode,
  };

  let mut content = Content::Raw(raw);
  for planned in chain {
    debug!(module = %module.display(), rule = %planned.rule, step = planned.step.name(), "transform step");
    content = planned
      .step
      .apply(content, &step_ctx)
      .await
      .map_err(|cause| TransformError::Step {
        module: module.to_path_buf(),
        rule: planned.rule.clone(),
        step: planned.step.name(),
        cause,
      })?;
  }

  match content {
    Content::Payload(payload) => Ok(payload),
    other => Err(TransformError::Unfinished {
      module: module.to_path_buf(),
      produced: other.kind(),
    }),
  }
}
