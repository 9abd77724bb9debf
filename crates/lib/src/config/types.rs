//! Raw configuration as written in `hashpack.toml`.
//!
//! These structs mirror the file layout one to one. They are validated and
//! compiled into a [`BuildConfig`](super::BuildConfig) before a build starts.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use toml::Table;

use crate::plugins::Plugin;
use crate::rules::{ChainOrder, ModuleType};

/// Build profile.
///
/// Development and production differ in the value of `process.env.NODE_ENV`,
/// default filenames (hashed or human-readable), default plugins, and how
/// stylesheets reach the page (extracted file or injected `<style>`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  Development,
  #[default]
  Production,
  /// No defines and no optimizations.
  None,
}

impl Mode {
  pub fn as_str(self) -> &'static str {
    match self {
      Mode::Development => "development",
      Mode::Production => "production",
      Mode::None => "none",
    }
  }

  /// Value substituted for `process.env.NODE_ENV`, if any.
  pub fn node_env(self) -> Option<&'static str> {
    match self {
      Mode::Development => Some("development"),
      Mode::Production => Some("production"),
      Mode::None => None,
    }
  }
}

impl std::fmt::Display for Mode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Mode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "development" | "dev" => Ok(Mode::Development),
      "production" | "prod" => Ok(Mode::Production),
      "none" => Ok(Mode::None),
      other => Err(format!(
        "unknown mode '{}': expected development, production, or none",
        other
      )),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
  pub entry: Option<PathBuf>,
  pub mode: Option<Mode>,
  pub output: RawOutput,
  pub resolve: RawResolve,
  pub rules: Option<Vec<RawRule>>,
  pub html: Option<RawHtml>,
  pub css: RawCss,
  pub plugins: Option<Vec<Plugin>>,
  pub parallelism: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawOutput {
  pub dir: PathBuf,
  pub filename: Option<String>,
  pub asset_filename: Option<String>,
  pub public_path: String,
  pub clean: bool,
}

impl Default for RawOutput {
  fn default() -> Self {
    Self {
      dir: PathBuf::from("dist"),
      filename: None,
      asset_filename: None,
      public_path: String::new(),
      clean: true,
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawResolve {
  pub extensions: Option<Vec<String>>,
  pub index_files: Option<Vec<String>>,
  pub modules: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRule {
  pub name: Option<String>,
  /// Regular expression tested against the module's absolute path.
  pub test: String,
  #[serde(rename = "type", default)]
  pub module_type: ModuleType,
  #[serde(rename = "use", default)]
  pub uses: Vec<RawStep>,
  #[serde(default)]
  pub order: ChainOrder,
  /// Inline threshold in bytes for `type = "asset"`.
  pub max_size: Option<u64>,
}

/// A `use` entry: either a bare step name or a step with options.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawStep {
  Name(String),
  Detailed {
    step: String,
    #[serde(default)]
    options: Table,
  },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawHtml {
  pub enabled: bool,
  pub template: Option<PathBuf>,
  pub filename: String,
  pub title: String,
  pub description: String,
  pub inject: bool,
  pub meta: BTreeMap<String, String>,
}

impl Default for RawHtml {
  fn default() -> Self {
    Self {
      enabled: true,
      template: None,
      filename: "index.html".to_string(),
      title: "hashpack".to_string(),
      description: String::new(),
      inject: true,
      meta: BTreeMap::new(),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawCss {
  pub filename: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mode_parses_aliases() {
    assert_eq!("dev".parse::<Mode>().unwrap(), Mode::Development);
    assert_eq!("Production".parse::<Mode>().unwrap(), Mode::Production);
    assert_eq!("none".parse::<Mode>().unwrap(), Mode::None);
    assert!("staging".parse::<Mode>().is_err());
  }

  #[test]
  fn none_mode_defines_nothing() {
    assert_eq!(Mode::None.node_env(), None);
    assert_eq!(Mode::Production.node_env(), Some("production"));
  }

  #[test]
  fn raw_steps_accept_both_forms() {
    let rule: RawRule = toml::from_str(
      r#"
        test = '\.scss$'
        use = ["extract-css", "css", { step = "command", options = { program = "sass", args = ["--stdin"] } }]
      "#,
    )
    .unwrap();
    assert_eq!(rule.uses.len(), 3);
    assert!(matches!(&rule.uses[0], RawStep::Name(n) if n == "extract-css"));
    assert!(matches!(&rule.uses[2], RawStep::Detailed { step, .. } if step == "command"));
    assert_eq!(rule.module_type, ModuleType::JavaScript);
    assert_eq!(rule.order, ChainOrder::Layered);
  }

  #[test]
  fn unknown_fields_are_rejected() {
    let err = toml::from_str::<RawConfig>("entyr = \"src/index.js\"").unwrap_err();
    assert!(err.to_string().contains("entyr"));
  }
}
