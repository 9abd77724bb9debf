//! Build configuration.
//!
//! `hashpack.toml` is parsed into the raw structs in [`types`], then validated
//! and compiled once into an immutable [`BuildConfig`] that every pipeline stage
//! borrows. Relative paths are resolved against the directory holding the
//! config file.
//!
//! # Mode precedence
//!
//! 1. `--mode` on the command line ([`ConfigOverrides::mode`])
//! 2. the `HASHPACK_MODE` environment variable
//! 3. `mode` in the config file
//! 4. [`Mode::Production`]

pub mod types;

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::address::FilenameTemplate;
use crate::consts::{CONFIG_FILENAME, DEFAULT_EXTENSIONS, DEFAULT_INDEX_FILES, MODE_ENV_VAR};
use crate::plugins::Plugin;
use crate::rules::{ChainOrder, ModuleType, RuleError, RuleSet};

pub use types::{Mode, RawConfig, RawHtml, RawRule, RawStep};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("project root {} is not accessible: {source}", path.display())]
  Root {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid HASHPACK_MODE: {message}")]
  InvalidMode { message: String },

  #[error("parallelism must be at least 1")]
  ZeroParallelism,

  #[error("output directory {} would contain the project sources at {}; use a dedicated directory such as `dist`", dir.display(), sources.display())]
  OutputContainsSources { dir: PathBuf, sources: PathBuf },

  #[error(transparent)]
  Rule(#[from] RuleError),
}

/// Values supplied on the command line, taking precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
  pub mode: Option<Mode>,
  pub entry: Option<PathBuf>,
  pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
  pub dir: PathBuf,
  pub filename: FilenameTemplate,
  pub asset_filename: FilenameTemplate,
  pub css_filename: FilenameTemplate,
  /// Prefix for every reference to an emitted file.
  pub public_path: String,
  /// Empty the output directory before writing.
  pub clean: bool,
}

#[derive(Debug, Clone)]
pub struct ResolveConfig {
  /// Tried in order when a reference has no exact match, e.g. `.js`.
  pub extensions: Vec<String>,
  /// Looked up inside a directory reference.
  pub index_files: Vec<String>,
  /// Search roots for bare specifiers.
  pub modules: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct HtmlConfig {
  pub template: Option<PathBuf>,
  pub filename: String,
  pub title: String,
  pub description: String,
  pub inject: bool,
  pub meta: BTreeMap<String, String>,
}

/// Immutable, validated configuration for one build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
  /// Project root; module ids are relative to it.
  pub root: PathBuf,
  pub entry: PathBuf,
  pub mode: Mode,
  pub output: OutputConfig,
  pub resolve: ResolveConfig,
  pub rules: RuleSet,
  pub html: Option<HtmlConfig>,
  pub plugins: Vec<Plugin>,
  /// Upper bound on concurrent reads, transforms, and subprocesses.
  pub parallelism: usize,
}

impl BuildConfig {
  /// Load `path` and compile it.
  pub fn load(path: &Path, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let raw: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    let root = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    info!(path = %path.display(), "loaded config");
    Self::from_raw(raw, root, overrides)
  }

  /// Load `dir/hashpack.toml` if present, otherwise use defaults rooted at `dir`.
  pub fn discover(dir: &Path, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
    let path = dir.join(CONFIG_FILENAME);
    if path.is_file() {
      Self::load(&path, overrides)
    } else {
      debug!(dir = %dir.display(), "no config file, using defaults");
      Self::from_raw(RawConfig::default(), dir, overrides)
    }
  }

  /// Validate `raw` and resolve its paths against `root`.
  pub fn from_raw(raw: RawConfig, root: &Path, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
    let root = dunce::canonicalize(root).map_err(|source| ConfigError::Root {
      path: root.to_path_buf(),
      source,
    })?;
    let mode = resolve_mode(overrides.mode, raw.mode)?;

    let entry = overrides
      .entry
      .clone()
      .or(raw.entry)
      .unwrap_or_else(|| PathBuf::from("src/index.js"));

    let rules = match &raw.rules {
      Some(rules) => RuleSet::compile(rules)?,
      None => RuleSet::compile(&default_rules(mode))?,
    };

    let hashed = mode != Mode::Development;
    let output = OutputConfig {
      dir: root.join(overrides.output_dir.clone().unwrap_or(raw.output.dir)),
      filename: FilenameTemplate::new(raw.output.filename.unwrap_or_else(|| {
        (if hashed { "bundle.[contenthash].js" } else { "bundle.js" }).to_string()
      })),
      asset_filename: FilenameTemplate::new(raw.output.asset_filename.unwrap_or_else(|| {
        (if hashed { "[name].[contenthash].[ext]" } else { "[name].[ext]" }).to_string()
      })),
      css_filename: FilenameTemplate::new(raw.css.filename.unwrap_or_else(|| {
        (if hashed { "styles.[contenthash].css" } else { "styles.css" }).to_string()
      })),
      public_path: raw.output.public_path,
      clean: raw.output.clean,
    };

    let resolve = ResolveConfig {
      extensions: raw
        .resolve
        .extensions
        .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect())
        .into_iter()
        .map(|ext| if ext.starts_with('.') { ext } else { format!(".{}", ext) })
        .collect(),
      index_files: raw
        .resolve
        .index_files
        .unwrap_or_else(|| DEFAULT_INDEX_FILES.iter().map(|s| s.to_string()).collect()),
      modules: raw
        .resolve
        .modules
        .unwrap_or_else(|| vec![PathBuf::from("node_modules")])
        .into_iter()
        .map(|dir| root.join(dir))
        .collect(),
    };

    let html = raw.html.unwrap_or_default();
    let html = html.enabled.then(|| HtmlConfig {
      template: html.template.map(|t| root.join(t)),
      filename: html.filename,
      title: html.title,
      description: html.description,
      inject: html.inject,
      meta: html.meta,
    });

    let plugins = raw.plugins.unwrap_or_else(|| match mode {
      Mode::Production => vec![Plugin::Minify],
      Mode::Development | Mode::None => Vec::new(),
    });

    let parallelism = match raw.parallelism {
      Some(0) => return Err(ConfigError::ZeroParallelism),
      Some(n) => n,
      None => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
    };

    let entry = root.join(entry);
    check_output_dir(&output.dir, &root, &entry)?;

    let config = Self {
      entry,
      root,
      mode,
      output,
      resolve,
      rules,
      html,
      plugins,
      parallelism,
    };

    debug!(
      root = %config.root.display(),
      mode = %config.mode,
      rules = config.rules.len(),
      parallelism = config.parallelism,
      "compiled config"
    );
    Ok(config)
  }
}

/// The output directory is emptied before every build, so it must never be or
/// enclose the project root or the entry module.
fn check_output_dir(dir: &Path, root: &Path, entry: &Path) -> Result<(), ConfigError> {
  let dir = normalize(dir);
  for sources in [root, entry] {
    let normalized = normalize(sources);
    if normalized.starts_with(&dir) {
      return Err(ConfigError::OutputContainsSources {
        dir,
        sources: sources.to_path_buf(),
      });
    }
  }
  Ok(())
}

/// `.` and `..` resolved lexically, then the longest existing prefix
/// canonicalized so symlinked roots compare equal.
fn normalize(path: &Path) -> PathBuf {
  let mut lexical = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        lexical.pop();
      }
      other => lexical.push(other),
    }
  }

  let mut rest = Vec::new();
  let mut existing = lexical.as_path();
  loop {
    if let Ok(mut canonical) = dunce::canonicalize(existing) {
      canonical.extend(rest.iter().rev());
      return canonical;
    }
    match (existing.parent(), existing.file_name()) {
      (Some(parent), Some(name)) => {
        rest.push(name.to_os_string());
        existing = parent;
      }
      _ => return lexical,
    }
  }
}

fn resolve_mode(flag: Option<Mode>, file: Option<Mode>) -> Result<Mode, ConfigError> {
  if let Some(mode) = flag {
    return Ok(mode);
  }
  if let Ok(value) = std::env::var(MODE_ENV_VAR)
    && !value.trim().is_empty()
  {
    return value.parse().map_err(|message| ConfigError::InvalidMode { message });
  }
  Ok(file.unwrap_or_default())
}

fn rule(name: &str, test: &str, module_type: ModuleType, uses: Vec<RawStep>) -> RawRule {
  RawRule {
    name: Some(name.to_string()),
    test: test.to_string(),
    module_type,
    uses,
    order: ChainOrder::Layered,
    max_size: None,
  }
}

fn step(name: &str) -> RawStep {
  RawStep::Name(name.to_string())
}

/// Rules used when the config file declares none.
///
/// Development injects stylesheets with `<style>` elements; other modes
/// extract them into a separate file.
pub fn default_rules(mode: Mode) -> Vec<RawRule> {
  let stylesheet = match mode {
    Mode::Development => "style",
    Mode::Production | Mode::None => "extract-css",
  };

  let mut sass_options = toml::Table::new();
  sass_options.insert("program".to_string(), toml::Value::String("sass".to_string()));
  sass_options.insert(
    "args".to_string(),
    toml::Value::Array(vec![toml::Value::String("--stdin".to_string())]),
  );

  vec![
    rule("scripts", r"\.(m|c)?jsx?$", ModuleType::JavaScript, vec![step("script")]),
    rule("json", r"\.json$", ModuleType::JavaScript, vec![step("json")]),
    rule(
      "images",
      r"(?i)\.(jpe?g|png|gif|svg|webp)$",
      ModuleType::Asset,
      Vec::new(),
    ),
    rule("text", r"\.txt$", ModuleType::AssetSource, Vec::new()),
    rule("css", r"\.css$", ModuleType::JavaScript, vec![step(stylesheet), step("css")]),
    rule(
      "sass",
      r"\.s[ac]ss$",
      ModuleType::JavaScript,
      vec![
        step(stylesheet),
        step("css"),
        RawStep::Detailed {
          step: "command".to_string(),
          options: sass_options,
        },
      ],
    ),
    rule("templates", r"\.(hbs|handlebars)$", ModuleType::JavaScript, vec![step("template")]),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use tempfile::TempDir;

  fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join(CONFIG_FILENAME);
    std::fs::write(&path, content).unwrap();
    path
  }

  #[test]
  #[serial]
  fn defaults_without_config_file() {
    temp_env::with_var_unset(MODE_ENV_VAR, || {
      let dir = TempDir::new().unwrap();
      let config = BuildConfig::discover(dir.path(), &ConfigOverrides::default()).unwrap();

      assert_eq!(config.mode, Mode::Production);
      assert!(config.entry.ends_with("src/index.js"));
      assert!(config.output.dir.ends_with("dist"));
      assert!(config.output.filename.is_hashed());
      assert_eq!(config.plugins, vec![Plugin::Minify]);
      assert!(config.html.is_some());
      assert!(!config.rules.is_empty());
    });
  }

  #[test]
  #[serial]
  fn development_uses_readable_names() {
    temp_env::with_var_unset(MODE_ENV_VAR, || {
      let dir = TempDir::new().unwrap();
      let path = write_config(&dir, "mode = \"development\"\n");
      let config = BuildConfig::load(&path, &ConfigOverrides::default()).unwrap();

      assert_eq!(config.mode, Mode::Development);
      assert_eq!(config.output.filename.as_str(), "bundle.js");
      assert_eq!(config.output.asset_filename.as_str(), "[name].[ext]");
      assert!(config.plugins.is_empty());
    });
  }

  #[test]
  #[serial]
  fn env_overrides_file_and_flag_overrides_env() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "mode = \"production\"\n");

    temp_env::with_var(MODE_ENV_VAR, Some("development"), || {
      let config = BuildConfig::load(&path, &ConfigOverrides::default()).unwrap();
      assert_eq!(config.mode, Mode::Development);

      let overrides = ConfigOverrides {
        mode: Some(Mode::None),
        ..Default::default()
      };
      let config = BuildConfig::load(&path, &overrides).unwrap();
      assert_eq!(config.mode, Mode::None);
    });
  }

  #[test]
  #[serial]
  fn invalid_env_mode_is_rejected() {
    temp_env::with_var(MODE_ENV_VAR, Some("staging"), || {
      let dir = TempDir::new().unwrap();
      let err = BuildConfig::discover(dir.path(), &ConfigOverrides::default()).unwrap_err();
      assert!(matches!(err, ConfigError::InvalidMode { .. }));
    });
  }

  #[test]
  #[serial]
  fn paths_resolve_against_config_dir() {
    temp_env::with_var_unset(MODE_ENV_VAR, || {
      let dir = TempDir::new().unwrap();
      let path = write_config(
        &dir,
        r#"
          entry = "app/main.js"

          [output]
          dir = "public"
          public_path = "/static/"

          [resolve]
          extensions = ["js", ".ts"]

          [html]
          template = "app/page.html"
        "#,
      );
      let config = BuildConfig::load(&path, &ConfigOverrides::default()).unwrap();
      let root = dunce::canonicalize(dir.path()).unwrap();

      assert_eq!(config.entry, root.join("app/main.js"));
      assert_eq!(config.output.dir, root.join("public"));
      assert_eq!(config.output.public_path, "/static/");
      assert_eq!(config.resolve.extensions, vec![".js", ".ts"]);
      assert_eq!(config.html.unwrap().template, Some(root.join("app/page.html")));
    });
  }

  #[test]
  #[serial]
  fn explicit_rules_replace_defaults() {
    temp_env::with_var_unset(MODE_ENV_VAR, || {
      let dir = TempDir::new().unwrap();
      let path = write_config(
        &dir,
        r#"
          [[rules]]
          name = "scripts"
          test = '\.js$'
          use = ["script"]
        "#,
      );
      let config = BuildConfig::load(&path, &ConfigOverrides::default()).unwrap();
      assert_eq!(config.rules.len(), 1);
      assert!(config.rules.plan(Path::new("/a/logo.png")).unwrap().is_none());
    });
  }

  #[test]
  #[serial]
  fn bad_rule_surfaces_rule_error() {
    temp_env::with_var_unset(MODE_ENV_VAR, || {
      let dir = TempDir::new().unwrap();
      let path = write_config(
        &dir,
        r#"
          [[rules]]
          test = '\.js$'
          use = ["babel"]
        "#,
      );
      let err = BuildConfig::load(&path, &ConfigOverrides::default()).unwrap_err();
      assert!(matches!(err, ConfigError::Rule(RuleError::Step { .. })));
    });
  }

  #[test]
  #[serial]
  fn html_can_be_disabled() {
    temp_env::with_var_unset(MODE_ENV_VAR, || {
      let dir = TempDir::new().unwrap();
      let path = write_config(&dir, "[html]\nenabled = false\n");
      let config = BuildConfig::load(&path, &ConfigOverrides::default()).unwrap();
      assert!(config.html.is_none());
    });
  }

  #[test]
  fn default_stylesheet_handling_depends_on_mode() {
    let dev = RuleSet::compile(&default_rules(Mode::Development)).unwrap();
    let prod = RuleSet::compile(&default_rules(Mode::Production)).unwrap();
    let css = Path::new("/app/src/heading.css");

    let names = |rules: &RuleSet| -> Vec<&'static str> {
      rules.plan(css).unwrap().unwrap().chain.iter().map(|p| p.step.name()).collect()
    };
    assert_eq!(names(&dev), vec!["css", "style"]);
    assert_eq!(names(&prod), vec!["css", "extract-css"]);
  }

  fn with_output(root: &Path, output_dir: &str) -> Result<BuildConfig, ConfigError> {
    let overrides = ConfigOverrides {
      mode: Some(Mode::Production),
      output_dir: Some(PathBuf::from(output_dir)),
      ..Default::default()
    };
    BuildConfig::from_raw(RawConfig::default(), root, &overrides)
  }

  #[test]
  fn output_dir_may_not_hold_sources() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("app");
    std::fs::create_dir_all(root.join("src")).unwrap();

    for output_dir in [".", "..", "./", "src", "src/../.."] {
      let err = with_output(&root, output_dir).unwrap_err();
      assert!(
        matches!(err, ConfigError::OutputContainsSources { .. }),
        "{output_dir}: {err}"
      );
    }
  }

  #[test]
  fn dedicated_output_dirs_are_accepted() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("app");
    std::fs::create_dir_all(root.join("src")).unwrap();

    for output_dir in ["dist", "build/site", "../app-dist", "src/../public"] {
      assert!(with_output(&root, output_dir).is_ok(), "{output_dir}");
    }
  }
}
