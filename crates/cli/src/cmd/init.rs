//! Implementation of the `hashpack init` command.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use hashpack_lib::init::{InitOptions, init};

use crate::output::symbols;

/// Execute the init command.
///
/// Scaffolds `hashpack.toml`, `src/index.js`, and `src/index.hbs` in `dir`.
///
/// # Errors
///
/// Returns an error if files already exist (without `force`) or cannot be written.
pub fn cmd_init(dir: &Path, force: bool) -> Result<()> {
  let options = InitOptions {
    dir: dir.to_path_buf(),
    force,
  };

  let result = init(&options).context("Failed to initialize project")?;

  println!(
    "{} {}",
    symbols::SUCCESS.green(),
    "Initialized hashpack project!".green().bold()
  );
  println!();
  println!("  {} Project:  {}", symbols::INFO.cyan(), result.project_dir.display());
  println!("  {} Config:   {}", symbols::INFO.cyan(), result.config.display());
  println!("  {} Entry:    {}", symbols::INFO.cyan(), result.entry.display());
  println!("  {} Template: {}", symbols::INFO.cyan(), result.template.display());
  println!();
  println!("{}", "Next steps:".bold());
  println!("  1. Edit {} to add your code", result.entry.display().to_string().cyan());
  println!(
    "  2. Run: {}",
    format!("cd {} && hashpack build", result.project_dir.display()).cyan()
  );

  Ok(())
}
