//! Rule matching.
//!
//! A rule pairs a path pattern with a module type and a chain of transform
//! steps. All rules are compiled once into a [`RuleSet`], whose patterns live in
//! a single [`RegexSet`] so a module path is tested against every rule in one
//! pass. Every matching rule contributes, in declaration order.
//!
//! # Step order
//!
//! Each rule declares how its `use` list runs:
//! - [`ChainOrder::Layered`] (default): right to left, so the step closest to the
//!   source runs first (`["extract-css", "css", "sass"]` runs sass first).
//! - [`ChainOrder::Sequential`]: left to right, for independent passes over
//!   already-resolved content.
//!
//! Asset module types append their terminal step (`asset` or `source`) after
//! the rule's own steps.

use std::path::Path;

use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::asset::EmitPolicy;
use crate::config::types::{RawRule, RawStep};
use crate::consts::DEFAULT_INLINE_LIMIT;
use crate::transform::{PlannedStep, StepError, TransformStep};

/// How a module's content is interpreted once its `use` chain has run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleType {
  /// Code; the `use` chain must produce code or extracted text.
  #[default]
  #[serde(rename = "javascript")]
  JavaScript,
  /// Inline or separate file, decided by size.
  #[serde(rename = "asset")]
  Asset,
  /// Always a data URI.
  #[serde(rename = "asset/inline")]
  AssetInline,
  /// Always a separate content-addressed file.
  #[serde(rename = "asset/resource")]
  AssetResource,
  /// Content exported as a string.
  #[serde(rename = "asset/source")]
  AssetSource,
}

impl ModuleType {
  pub fn as_str(self) -> &'static str {
    match self {
      ModuleType::JavaScript => "javascript",
      ModuleType::Asset => "asset",
      ModuleType::AssetInline => "asset/inline",
      ModuleType::AssetResource => "asset/resource",
      ModuleType::AssetSource => "asset/source",
    }
  }
}

/// Execution order of a rule's `use` list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainOrder {
  #[default]
  Layered,
  Sequential,
}

/// Invalid rule configuration.
#[derive(Debug, Error)]
pub enum RuleError {
  #[error("rule `{rule}` has an invalid pattern: {source}")]
  Pattern {
    rule: String,
    #[source]
    source: regex::Error,
  },

  #[error("rule `{rule}`: {source}")]
  Step {
    rule: String,
    #[source]
    source: StepError,
  },

  #[error("rule `{rule}` sets max_size but its type is `{module_type}`, not `asset`")]
  MaxSizeWithoutAsset { rule: String, module_type: &'static str },

  #[error("rules `{first}` and `{second}` both set an asset type for {module}")]
  ConflictingTypes {
    module: String,
    first: String,
    second: String,
  },
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
  pub name: String,
  pub pattern: Regex,
  pub module_type: ModuleType,
  pub steps: Vec<TransformStep>,
  pub order: ChainOrder,
  pub max_size: u64,
}

impl Rule {
  /// Compile a raw rule. `index` names anonymous rules.
  pub fn compile(raw: &RawRule, index: usize) -> Result<Self, RuleError> {
    let name = raw.name.clone().unwrap_or_else(|| format!("rule{}", index));

    let pattern = Regex::new(&raw.test).map_err(|source| RuleError::Pattern {
      rule: name.clone(),
      source,
    })?;

    if raw.max_size.is_some() && raw.module_type != ModuleType::Asset {
      return Err(RuleError::MaxSizeWithoutAsset {
        rule: name,
        module_type: raw.module_type.as_str(),
      });
    }

    let steps = raw
      .uses
      .iter()
      .map(|step| match step {
        RawStep::Name(step) => TransformStep::from_parts(step, &toml::Table::new()),
        RawStep::Detailed { step, options } => TransformStep::from_parts(step, options),
      })
      .collect::<Result<Vec<_>, _>>()
      .map_err(|source| RuleError::Step {
        rule: name.clone(),
        source,
      })?;

    Ok(Self {
      name,
      pattern,
      module_type: raw.module_type,
      steps,
      order: raw.order,
      max_size: raw.max_size.unwrap_or(DEFAULT_INLINE_LIMIT),
    })
  }

  /// This rule's steps in execution order, including any implied terminal step.
  pub fn execution_steps(&self) -> Vec<PlannedStep> {
    let mut ordered: Vec<&TransformStep> = self.steps.iter().collect();
    if self.order == ChainOrder::Layered {
      ordered.reverse();
    }

    let terminal = match self.module_type {
      ModuleType::JavaScript => None,
      ModuleType::AssetSource => Some(TransformStep::Source),
      ModuleType::Asset | ModuleType::AssetInline | ModuleType::AssetResource => {
        Some(TransformStep::Asset { mime: None })
      }
    };

    ordered
      .into_iter()
      .cloned()
      .chain(terminal)
      .map(|step| PlannedStep {
        rule: self.name.clone(),
        step,
      })
      .collect()
  }

  fn emit_policy(&self) -> Option<EmitPolicy> {
    match self.module_type {
      ModuleType::Asset => Some(EmitPolicy::Auto {
        max_size: self.max_size,
      }),
      ModuleType::AssetInline => Some(EmitPolicy::Inline),
      ModuleType::AssetResource => Some(EmitPolicy::Separate),
      ModuleType::JavaScript | ModuleType::AssetSource => None,
    }
  }
}

/// Everything the pipeline needs to process one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePlan {
  /// Names of the matching rules, in declaration order.
  pub rules: Vec<String>,
  pub module_type: ModuleType,
  pub chain: Vec<PlannedStep>,
  /// Set for asset types that need an emission decision.
  pub emit: Option<EmitPolicy>,
}

/// All configured rules, compiled.
#[derive(Debug, Clone)]
pub struct RuleSet {
  rules: Vec<Rule>,
  patterns: RegexSet,
}

impl RuleSet {
  pub fn compile(raw: &[RawRule]) -> Result<Self, RuleError> {
    let rules = raw
      .iter()
      .enumerate()
      .map(|(i, r)| Rule::compile(r, i))
      .collect::<Result<Vec<_>, _>>()?;
    Self::from_rules(rules)
  }

  pub fn from_rules(rules: Vec<Rule>) -> Result<Self, RuleError> {
    let patterns = RegexSet::new(rules.iter().map(|r| r.pattern.as_str())).map_err(|source| RuleError::Pattern {
      rule: "<set>".to_string(),
      source,
    })?;
    Ok(Self { rules, patterns })
  }

  pub fn rules(&self) -> &[Rule] {
    &self.rules
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// Rules whose pattern matches `path`, in declaration order.
  ///
  /// An empty result is not an error here; the caller decides.
  pub fn matching(&self, path: &Path) -> Vec<&Rule> {
    let subject = match_subject(path);
    let matched: Vec<&Rule> = self.patterns.matches(&subject).iter().map(|i| &self.rules[i]).collect();
    trace!(path = %subject, matched = matched.len(), "matched rules");
    matched
  }

  /// Combine every matching rule into one plan, or `None` if nothing matches.
  pub fn plan(&self, path: &Path) -> Result<Option<ModulePlan>, RuleError> {
    let matched = self.matching(path);
    if matched.is_empty() {
      return Ok(None);
    }

    let mut typed: Option<&Rule> = None;
    for rule in &matched {
      if rule.module_type == ModuleType::JavaScript {
        continue;
      }
      if let Some(first) = typed {
        return Err(RuleError::ConflictingTypes {
          module: match_subject(path),
          first: first.name.clone(),
          second: rule.name.clone(),
        });
      }
      typed = Some(rule);
    }

    Ok(Some(ModulePlan {
      rules: matched.iter().map(|r| r.name.clone()).collect(),
      module_type: typed.map(|r| r.module_type).unwrap_or_default(),
      chain: matched.iter().flat_map(|r| r.execution_steps()).collect(),
      emit: typed.and_then(Rule::emit_policy),
    }))
  }
}

/// The string patterns are tested against: the path with `/` separators.
fn match_subject(path: &Path) -> String {
  path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw(name: &str, test: &str, module_type: ModuleType, uses: &[&str]) -> RawRule {
    RawRule {
      name: Some(name.to_string()),
      test: test.to_string(),
      module_type,
      uses: uses.iter().map(|s| RawStep::Name(s.to_string())).collect(),
      order: ChainOrder::Layered,
      max_size: None,
    }
  }

  fn demo_rules() -> RuleSet {
    RuleSet::compile(&[
      raw("images", r"\.(jpg|png)$", ModuleType::Asset, &[]),
      raw("text", r"\.txt$", ModuleType::AssetSource, &[]),
      raw("css", r"\.css$", ModuleType::JavaScript, &["extract-css", "css"]),
      raw("scripts", r"\.js$", ModuleType::JavaScript, &["script"]),
    ])
    .unwrap()
  }

  fn step_names(plan: &ModulePlan) -> Vec<&'static str> {
    plan.chain.iter().map(|p| p.step.name()).collect()
  }

  #[test]
  fn layered_rules_run_right_to_left() {
    let plan = demo_rules().plan(Path::new("/app/src/heading.css")).unwrap().unwrap();
    assert_eq!(step_names(&plan), vec!["css", "extract-css"]);
    assert_eq!(plan.rules, vec!["css"]);
  }

  #[test]
  fn sequential_rules_run_left_to_right() {
    let mut rule = raw("css", r"\.css$", ModuleType::JavaScript, &["css", "extract-css"]);
    rule.order = ChainOrder::Sequential;
    let rules = RuleSet::compile(&[rule]).unwrap();
    let plan = rules.plan(Path::new("/a.css")).unwrap().unwrap();
    assert_eq!(step_names(&plan), vec!["css", "extract-css"]);
  }

  #[test]
  fn asset_types_append_terminal_step() {
    let rules = demo_rules();
    let image = rules.plan(Path::new("/src/jungle.jpg")).unwrap().unwrap();
    assert_eq!(step_names(&image), vec!["asset"]);
    assert_eq!(
      image.emit,
      Some(EmitPolicy::Auto {
        max_size: DEFAULT_INLINE_LIMIT
      })
    );

    let text = rules.plan(Path::new("/src/altText.txt")).unwrap().unwrap();
    assert_eq!(step_names(&text), vec!["source"]);
    assert_eq!(text.emit, None);
  }

  #[test]
  fn unmatched_path_yields_none() {
    assert!(demo_rules().plan(Path::new("/src/readme.md")).unwrap().is_none());
  }

  #[test]
  fn all_matching_rules_contribute_in_declaration_order() {
    let rules = RuleSet::compile(&[
      raw("lint", r"\.js$", ModuleType::JavaScript, &["script"]),
      raw("scripts", r"src/.*\.js$", ModuleType::JavaScript, &["script"]),
    ])
    .unwrap();
    let plan = rules.plan(Path::new("/app/src/index.js")).unwrap().unwrap();
    assert_eq!(plan.rules, vec!["lint", "scripts"]);
    assert_eq!(plan.chain.len(), 2);
    assert_eq!(plan.chain[0].rule, "lint");
  }

  #[test]
  fn two_asset_types_conflict() {
    let rules = RuleSet::compile(&[
      raw("inline", r"\.png$", ModuleType::AssetInline, &[]),
      raw("resource", r"\.png$", ModuleType::AssetResource, &[]),
    ])
    .unwrap();
    let err = rules.plan(Path::new("/logo.png")).unwrap_err();
    assert!(matches!(err, RuleError::ConflictingTypes { .. }));
  }

  #[test]
  fn invalid_pattern_names_rule() {
    let err = RuleSet::compile(&[raw("broken", r"\.(jpg$", ModuleType::Asset, &[])]).unwrap_err();
    assert!(matches!(err, RuleError::Pattern { rule, .. } if rule == "broken"));
  }

  #[test]
  fn max_size_requires_asset_type() {
    let mut rule = raw("text", r"\.txt$", ModuleType::AssetSource, &[]);
    rule.max_size = Some(10);
    let err = RuleSet::compile(&[rule]).unwrap_err();
    assert!(matches!(err, RuleError::MaxSizeWithoutAsset { .. }));
  }

  #[test]
  fn anonymous_rules_get_index_names() {
    let mut rule = raw("", r"\.js$", ModuleType::JavaScript, &["script"]);
    rule.name = None;
    let rules = RuleSet::compile(&[rule]).unwrap();
    assert_eq!(rules.rules()[0].name, "rule0");
  }
}
