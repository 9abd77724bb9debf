//! Terminal output for `hashpack build` and `hashpack init`.
//!
//! Status lines go to stdout except errors and warnings, which go to stderr so
//! `--format json` output stays parseable. Colors are only applied when the
//! target stream supports them.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

/// How `hashpack build` reports its result.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  /// The full build report as pretty-printed JSON on stdout.
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

/// Digits of the output hash shown in the build summary.
const HASH_DISPLAY_LEN: usize = 12;

#[derive(Clone, Copy)]
enum Level {
  Success,
  Error,
  Warning,
  Info,
}

impl Level {
  fn symbol(self) -> &'static str {
    match self {
      Level::Success => symbols::SUCCESS,
      Level::Error => symbols::ERROR,
      Level::Warning => symbols::WARNING,
      Level::Info => symbols::INFO,
    }
  }

  fn to_stderr(self) -> bool {
    matches!(self, Level::Error | Level::Warning)
  }

  fn stream(self) -> Stream {
    if self.to_stderr() { Stream::Stderr } else { Stream::Stdout }
  }
}

fn status(level: Level, message: &str) {
  let symbol = level.symbol();
  let line = match level {
    Level::Success => format!("{} {}", symbol.if_supports_color(level.stream(), |s| s.green()), message),
    Level::Info => format!("{} {}", symbol.if_supports_color(level.stream(), |s| s.blue()), message),
    Level::Error => format!(
      "{} {}",
      symbol.if_supports_color(level.stream(), |s| s.red()),
      message.if_supports_color(level.stream(), |s| s.red())
    ),
    Level::Warning => format!(
      "{} {}",
      symbol.if_supports_color(level.stream(), |s| s.yellow()),
      message.if_supports_color(level.stream(), |s| s.yellow())
    ),
  };
  if level.to_stderr() {
    eprintln!("{line}");
  } else {
    println!("{line}");
  }
}

/// Leading digits of a hex output hash.
pub fn short_hash(hash: &str) -> &str {
  hash.get(..HASH_DISPLAY_LEN).unwrap_or(hash)
}

/// Binary units; bundles and assets rarely reach megabytes.
pub fn format_bytes(bytes: u64) -> String {
  const KIB: u64 = 1024;
  const MIB: u64 = KIB * 1024;

  match bytes {
    b if b >= MIB => format!("{:.1} MB", b as f64 / MIB as f64),
    b if b >= KIB => format!("{:.1} KB", b as f64 / KIB as f64),
    b => format!("{b} B"),
  }
}

/// Build time: milliseconds under a second, else seconds with two decimals.
pub fn format_duration(duration: Duration) -> String {
  if duration < Duration::from_secs(1) {
    format!("{}ms", duration.as_millis())
  } else if duration < Duration::from_secs(60) {
    format!("{:.2}s", duration.as_secs_f64())
  } else {
    let secs = duration.as_secs();
    format!("{}m {}s", secs / 60, secs % 60)
  }
}

pub fn print_success(message: &str) {
  status(Level::Success, message);
}

pub fn print_error(message: &str) {
  status(Level::Error, message);
}

pub fn print_warning(message: &str) {
  status(Level::Warning, message);
}

pub fn print_info(message: &str) {
  status(Level::Info, message);
}

/// An indented `label: value` line of the build summary.
pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// One emitted file: name, size, and the module it came from.
pub fn print_file(name: &str, bytes: u64, origin: &str) {
  println!(
    "  {} {:<40} {:>10}  {}",
    symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.cyan()),
    name,
    format_bytes(bytes),
    origin.if_supports_color(Stream::Stdout, |s| s.dimmed())
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize build report")?;
  println!("{json}");
  Ok(())
}
