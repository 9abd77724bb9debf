//! Implementation of the `hashpack build` command.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::debug;

use hashpack_lib::consts::CONFIG_FILENAME;
use hashpack_lib::manifest::FileKind;
use hashpack_lib::{BuildConfig, BuildError, BuildReport, ConfigOverrides, Mode, build};

use crate::output::{
  OutputFormat, format_bytes, format_duration, print_error, print_file, print_info, print_json, print_stat, print_success,
  print_warning, short_hash,
};

#[derive(Debug, Args)]
pub struct BuildArgs {
  /// Path to the config file (default: ./hashpack.toml if present)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// Build mode: development, production, or none
  #[arg(short, long)]
  pub mode: Option<Mode>,

  /// Entry module, overriding the config
  #[arg(short, long)]
  pub entry: Option<PathBuf>,

  /// Output directory, overriding the config
  #[arg(short, long)]
  pub output_dir: Option<PathBuf>,

  /// Rebuild whenever a module of the last build changes
  #[arg(short, long)]
  pub watch: bool,

  /// How often watch mode checks for changes
  #[arg(long, default_value = "500ms")]
  pub poll_interval: humantime::Duration,

  /// Output format
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  pub format: OutputFormat,
}

enum Outcome {
  Finished(Result<BuildReport, BuildError>),
  Interrupted,
}

/// Execute the build command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the build fails, or the
/// build is interrupted.
pub fn cmd_build(args: &BuildArgs) -> Result<()> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  if args.watch {
    rt.block_on(watch(args))
  } else {
    let config = load_config(args)?;
    match rt.block_on(run_build(&config)) {
      Outcome::Finished(Ok(report)) => print_report(&report, args.format),
      Outcome::Finished(Err(err)) => Err(err).context("Build failed"),
      Outcome::Interrupted => interrupted(&config),
    }
  }
}

fn load_config(args: &BuildArgs) -> Result<BuildConfig> {
  let cwd = std::env::current_dir().context("Failed to read current directory")?;
  let overrides = ConfigOverrides {
    mode: args.mode,
    entry: args.entry.as_ref().map(|p| cwd.join(p)),
    output_dir: args.output_dir.as_ref().map(|p| cwd.join(p)),
  };

  match &args.config {
    Some(path) => BuildConfig::load(&cwd.join(path), &overrides),
    None => BuildConfig::discover(&cwd, &overrides),
  }
  .context("Failed to load configuration")
}

async fn run_build(config: &BuildConfig) -> Outcome {
  // Dropping the build future aborts its in-flight tasks.
  tokio::select! {
    result = build(config) => Outcome::Finished(result),
    _ = tokio::signal::ctrl_c() => Outcome::Interrupted,
  }
}

fn interrupted(config: &BuildConfig) -> Result<()> {
  bail!(
    "Build interrupted; {} may be incomplete and must not be deployed",
    config.output.dir.display()
  )
}

async fn watch(args: &BuildArgs) -> Result<()> {
  let interval: std::time::Duration = args.poll_interval.into();
  let mut watched: Vec<PathBuf> = Vec::new();

  loop {
    let config = load_config(args)?;

    match run_build(&config).await {
      Outcome::Finished(Ok(report)) => {
        print_report(&report, args.format)?;
        watched = watch_list(&config, &report.modules);
      }
      Outcome::Finished(Err(err)) => {
        print_error(&format!("Build failed: {:#}", anyhow::Error::new(err)));
        // Keep watching what the last good build saw, plus the entry.
        let mut paths = watched.clone();
        paths.push(config.entry.clone());
        watched = watch_list(&config, &paths);
      }
      Outcome::Interrupted => return interrupted(&config),
    }

    if !args.format.is_json() {
      print_info(&format!("Watching {} files for changes...", watched.len()));
    }

    let before = snapshot(&watched);
    loop {
      tokio::select! {
        _ = tokio::time::sleep(interval) => {}
        _ = tokio::signal::ctrl_c() => return Ok(()),
      }
      if snapshot(&watched) != before {
        debug!("change detected, rebuilding");
        break;
      }
    }
  }
}

/// Modules, their directories (so new files are noticed), the config file,
/// and the HTML template.
fn watch_list(config: &BuildConfig, modules: &[PathBuf]) -> Vec<PathBuf> {
  let mut paths: Vec<PathBuf> = modules.to_vec();
  paths.extend(modules.iter().filter_map(|m| m.parent().map(Path::to_path_buf)));
  paths.push(config.root.join(CONFIG_FILENAME));
  if let Some(template) = config.html.as_ref().and_then(|html| html.template.clone()) {
    paths.push(template);
  }
  paths.sort();
  paths.dedup();
  paths
}

fn snapshot(paths: &[PathBuf]) -> BTreeMap<PathBuf, Option<SystemTime>> {
  paths
    .iter()
    .map(|path| {
      let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
      (path.clone(), modified)
    })
    .collect()
}

fn print_report(report: &BuildReport, format: OutputFormat) -> Result<()> {
  if format.is_json() {
    return print_json(report);
  }

  print_success(&format!(
    "Built {} modules in {} ({})",
    report.modules.len(),
    format_duration(report.duration),
    report.mode
  ));
  println!();

  for file in &report.emitted {
    let origin = match (file.kind, &file.source) {
      (FileKind::Script, _) => "bundle".to_string(),
      (FileKind::Stylesheet, _) => "stylesheet".to_string(),
      (FileKind::Asset, Some(source)) => source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string()),
      (FileKind::Asset, None) => "asset".to_string(),
    };
    print_file(&file.name, file.bytes, &origin);
  }
  println!();

  for warning in &report.warnings {
    print_warning(&warning.to_string());
  }

  print_stat("Output", &report.out_dir.display().to_string());
  if let Some(document) = &report.entry_document {
    print_stat("Document", document);
  }
  print_stat("Total", &format_bytes(report.total_bytes()));
  print_stat("Hash", short_hash(&report.output_hash));

  Ok(())
}
