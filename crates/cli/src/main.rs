mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::BuildArgs;

/// hashpack - content-addressed asset bundler
#[derive(Parser)]
#[command(name = "hashpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose (debug) logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the project
  Build(BuildArgs),

  /// Scaffold a new project
  Init {
    /// Project directory
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Overwrite existing files
    #[arg(short, long)]
    force: bool,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_filter = if cli.verbose { "debug" } else { "warn" };
  let filter = if cli.verbose {
    EnvFilter::new(default_filter)
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match &cli.command {
    Commands::Build(args) => cmd::cmd_build(args),
    Commands::Init { dir, force } => cmd::cmd_init(dir, *force),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      output::print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
