//! The build pipeline.
//!
//! ```text
//! entry -> graph -> rule plans -> transforms (parallel) -> asset decisions
//!       -> link -> content-addressed files -> write -> entry document
//! ```
//!
//! Transforms are independent per module and run on a [`JoinSet`] bounded by
//! the configured parallelism. Everything after them iterates modules in path
//! order, so output bytes and names never depend on scheduling.
//!
//! Dropping the returned future aborts the build: outstanding tasks are
//! cancelled with their `JoinSet`, and files already written stay in place.

mod types;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::address::Naming;
use crate::asset::{AssetDecision, AssetError, EmitPolicy, decide};
use crate::bundle::{LinkModule, LinkOptions, ModuleOutput, link};
use crate::config::BuildConfig;
use crate::consts::DEFAULT_INLINE_LIMIT;
use crate::graph::{GraphOptions, ModuleGraph, build_graph};
use crate::manifest::{EmittedFile, FileKind};
use crate::output::{WriteOptions, write_output};
use crate::plugins::EmitHook;
use crate::report::{BuildReport, BuildWarning, EmittedSummary};
use crate::rules::ModulePlan;
use crate::transform::{TextRole, TransformContext, TransformedPayload, execute};
use crate::util::hash::hash_directory;

pub use types::BuildError;

/// Run the whole pipeline once.
pub async fn build(config: &BuildConfig) -> Result<BuildReport, BuildError> {
  let started = Instant::now();
  info!(entry = %config.entry.display(), mode = %config.mode, "starting build");

  let graph = build_graph(
    &config.entry,
    &GraphOptions {
      root: config.root.clone(),
      resolve: config.resolve.clone(),
      parallelism: config.parallelism,
    },
  )
  .await?;

  let plans = plan_modules(&graph, config)?;
  let mut payloads = transform_modules(&graph, &plans, config).await?;

  let mut warnings = Vec::new();
  let mut assets = Vec::new();
  let mut linked = Vec::with_capacity(graph.len());

  for module in graph.modules() {
    let plan = &plans[&module.path];
    let Some(payload) = payloads.remove(&module.path) else {
      continue;
    };

    let output = match (payload, plan.emit) {
      (TransformedPayload::Asset { bytes, mime }, policy) => {
        let policy = policy.unwrap_or(EmitPolicy::Auto {
          max_size: DEFAULT_INLINE_LIMIT,
        });
        let outcome = decide(&module.path, bytes, &mime, policy, &config.output.asset_filename);
        warnings.extend(outcome.warnings);
        assets.extend(outcome.file);
        match outcome.decision {
          AssetDecision::Inline { data_uri } => ModuleOutput::InlineAsset { data_uri },
          AssetDecision::Separate { final_name } => ModuleOutput::SeparateAsset { name: final_name },
        }
      }
      (other, Some(_)) => {
        return Err(
          AssetError::NotAnAsset {
            module: module.path.clone(),
            produced: other.kind(),
          }
          .into(),
        );
      }
      (TransformedPayload::Code { text }, None) => ModuleOutput::Code(text),
      (
        TransformedPayload::ExtractedText {
          text,
          role: TextRole::Stylesheet,
        },
        None,
      ) => ModuleOutput::Stylesheet(text),
    };

    let references = module
      .resolved
      .iter()
      .filter_map(|(reference, path)| graph.get(path).map(|m| (reference.clone(), m.id.clone())))
      .collect();

    linked.push(LinkModule {
      id: module.id.clone(),
      path: module.path.clone(),
      output,
      references,
    });
  }

  let bundle = link(
    &graph.entry().id,
    &linked,
    &LinkOptions {
      mode: config.mode,
      public_path: config.output.public_path.clone(),
    },
  )?;
  if bundle.is_empty() {
    warn!("script bundle contains no module code");
    warnings.push(BuildWarning::EmptyBundle);
  }

  let mut files = vec![EmittedFile::new(
    FileKind::Script,
    Naming::new(config.output.filename.clone(), "main", "js"),
    bundle.script.into_bytes(),
    None,
  )];
  if let Some(stylesheet) = bundle.stylesheet {
    files.push(EmittedFile::new(
      FileKind::Stylesheet,
      Naming::new(config.output.css_filename.clone(), "styles", "css"),
      stylesheet.into_bytes(),
      None,
    ));
  }
  files.extend(assets);

  let hooks: Vec<Box<dyn EmitHook>> = config.plugins.iter().map(|p| p.hook()).collect();
  let written = write_output(
    files,
    &hooks,
    &WriteOptions {
      out_dir: config.output.dir.clone(),
      clean: config.output.clean,
      public_path: config.output.public_path.clone(),
      html: config.html.clone(),
      parallelism: config.parallelism,
    },
  )
  .await?;

  let out_dir = written.out_dir.clone();
  let output_hash = tokio::task::spawn_blocking(move || hash_directory(&out_dir)).await??;

  let report = BuildReport {
    mode: config.mode,
    entry: config.entry.clone(),
    out_dir: written.out_dir,
    modules: graph.modules().map(|m| m.path.clone()).collect(),
    emitted: written
      .files
      .into_iter()
      .map(|f| EmittedSummary {
        name: f.name,
        kind: f.kind,
        bytes: f.bytes,
        source: f.source,
      })
      .collect(),
    manifest: written.manifest,
    entry_document: written.entry_document,
    warnings,
    output_hash: output_hash.0,
    duration: started.elapsed(),
  };

  info!(
    modules = report.modules.len(),
    files = report.emitted.len(),
    warnings = report.warnings.len(),
    elapsed_ms = report.duration.as_millis() as u64,
    "build complete"
  );
  Ok(report)
}

/// Every module must match at least one rule.
fn plan_modules(graph: &ModuleGraph, config: &BuildConfig) -> Result<BTreeMap<PathBuf, ModulePlan>, BuildError> {
  let mut plans = BTreeMap::new();
  for module in graph.modules() {
    let plan = config
      .rules
      .plan(&module.path)?
      .ok_or_else(|| BuildError::NoMatchingRule {
        module: module.path.clone(),
      })?;
    debug!(module = %module.id, rules = ?plan.rules, module_type = plan.module_type.as_str(), "planned module");
    plans.insert(module.path.clone(), plan);
  }
  Ok(plans)
}

async fn transform_modules(
  graph: &ModuleGraph,
  plans: &BTreeMap<PathBuf, ModulePlan>,
  config: &BuildConfig,
) -> Result<BTreeMap<PathBuf, TransformedPayload>, BuildError> {
  let ctx = Arc::new(TransformContext {
    root: config.root.clone(),
    mode: config.mode,
  });
  let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));
  let mut join_set = JoinSet::new();

  for module in graph.modules() {
    let path = module.path.clone();
    let raw = module.raw.clone();
    let chain = plans[&module.path].chain.clone();
    let ctx = ctx.clone();
    let semaphore = semaphore.clone();

    join_set.spawn(async move {
      let _permit = semaphore.acquire_owned().await;
      let payload = execute(&path, raw, &chain, &ctx).await?;
      Ok::<_, BuildError>((path, payload))
    });
  }

  let mut payloads = BTreeMap::new();
  while let Some(joined) = join_set.join_next().await {
    let (path, payload) = joined??;
    payloads.insert(path, payload);
  }

  info!(modules = payloads.len(), "transformed modules");
  Ok(payloads)
}
