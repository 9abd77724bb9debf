//! Rewrites module syntax into registry calls.
//!
//! Statements are matched line-anchored, so only top-level style
//! `import`/`export` statements are rewritten. Exports become getters installed
//! at the top of the module body, which keeps bindings live across reference
//! cycles.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::Mode;
use crate::graph::ModuleId;
use crate::util::syntax::{DYNAMIC_IMPORT, EXPORT_FROM, IMPORT, REQUIRE, comment_spans, in_comment};
use crate::util::text::js_string;

static EXPORT_LIST: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"(?m)^([ \t]*)export\s*\{([^}]*)\}[ \t]*;?"#).expect("valid regex"));

static EXPORT_DEFAULT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"(?m)^([ \t]*)export\s+default\s+"#).expect("valid regex"));

static EXPORT_DECL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r#"(?m)^([ \t]*)export\s+((?:async\s+)?function\s*\*?\s*([\w$]+)|class\s+([\w$]+)|(?:const|let|var)\s+([\w$]+))"#,
  )
  .expect("valid regex")
});

static NODE_ENV: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"\bprocess\.env\.NODE_ENV\b"#).expect("valid regex"));

/// A reference with no resolved module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReference(pub String);

/// Rewrite one module's code for the registry runtime.
///
/// `lookup` maps a reference string to the id of the module it resolved to.
pub fn rewrite_module<'a, F>(source: &str, mode: Mode, lookup: F) -> Result<String, UnknownReference>
where
  F: Fn(&str) -> Option<&'a ModuleId>,
{
  let mut state = Rewriter {
    lookup,
    getters: Vec::new(),
    esm: false,
    next_binding: 0,
  };

  let code = state.export_from(source)?;
  let code = state.imports(&code)?;
  let code = state.export_lists(&code);
  let code = state.export_default(&code);
  let code = state.export_declarations(&code);
  let code = state.requires(&code)?;
  let mut code = state.node_env(&code, mode);

  if state.esm {
    let getters = state
      .getters
      .iter()
      .map(|(name, expr)| format!("{}: function () {{ return {}; }}", js_string(name), expr))
      .collect::<Vec<_>>()
      .join(", ");
    code = format!("__hashpack_esm(exports, {{ {} }});\n{}", getters, code);
  }

  Ok(code)
}

struct Rewriter<F> {
  lookup: F,
  /// `(exported name, expression)` in declaration order.
  getters: Vec<(String, String)>,
  esm: bool,
  next_binding: usize,
}

impl<'a, F> Rewriter<F>
where
  F: Fn(&str) -> Option<&'a ModuleId>,
{
  fn require_call(&self, reference: &str) -> Result<String, UnknownReference> {
    let id = (self.lookup)(reference).ok_or_else(|| UnknownReference(reference.to_string()))?;
    Ok(format!("__hashpack_require({})", js_string(id.as_str())))
  }

  fn binding(&mut self) -> String {
    let name = format!("__hp_{}", self.next_binding);
    self.next_binding += 1;
    name
  }

  fn imports(&mut self, code: &str) -> Result<String, UnknownReference> {
    try_replace(&IMPORT, code, |caps| {
      self.esm = true;
      let indent = &caps[1];
      let call = self.require_call(&caps[5])?;

      let default = caps.get(2).map(|m| m.as_str());
      let namespace = caps.get(3).map(|m| m.as_str());
      let named = caps.get(4).map(|m| specifiers(m.as_str())).unwrap_or_default();

      if default.is_none() && namespace.is_none() && named.is_empty() {
        return Ok(format!("{}{};", indent, call));
      }

      let binding = self.binding();
      let mut lines = vec![format!("{}var {} = {};", indent, binding, call)];
      if let Some(default) = default {
        lines.push(format!("{}var {} = __hashpack_default({});", indent, default, binding));
      }
      if let Some(namespace) = namespace {
        lines.push(format!("{}var {} = {};", indent, namespace, binding));
      }
      for (imported, local) in named {
        lines.push(format!("{}var {} = {}.{};", indent, local, binding, imported));
      }
      Ok(lines.join("\n"))
    })
  }

  fn export_from(&mut self, code: &str) -> Result<String, UnknownReference> {
    try_replace(&EXPORT_FROM, code, |caps| {
      self.esm = true;
      let indent = &caps[1];
      let call = self.require_call(&caps[5])?;

      if caps.get(3).is_some() {
        return Ok(format!("{}__hashpack_reexport(exports, {});", indent, call));
      }

      let binding = self.binding();
      if let Some(namespace) = caps.get(2) {
        self.getters.push((namespace.as_str().to_string(), binding.clone()));
      }
      if let Some(list) = caps.get(4) {
        for (imported, exported) in specifiers(list.as_str()) {
          self.getters.push((exported, format!("{}.{}", binding, imported)));
        }
      }
      Ok(format!("{}var {} = {};", indent, binding, call))
    })
  }

  fn export_lists(&mut self, code: &str) -> String {
    EXPORT_LIST
      .replace_all(code, |caps: &Captures| {
        self.esm = true;
        for (local, exported) in specifiers(&caps[2]) {
          self.getters.push((exported, local));
        }
        String::new()
      })
      .into_owned()
  }

  fn export_default(&mut self, code: &str) -> String {
    EXPORT_DEFAULT
      .replace_all(code, |caps: &Captures| {
        self.esm = true;
        format!("{}exports.default = ", &caps[1])
      })
      .into_owned()
  }

  fn export_declarations(&mut self, code: &str) -> String {
    EXPORT_DECL
      .replace_all(code, |caps: &Captures| {
        self.esm = true;
        let name = caps.get(3).or(caps.get(4)).or(caps.get(5)).map(|m| m.as_str());
        if let Some(name) = name {
          self.getters.push((name.to_string(), name.to_string()));
        }
        format!("{}{}", &caps[1], &caps[2])
      })
      .into_owned()
  }

  fn requires(&self, code: &str) -> Result<String, UnknownReference> {
    let code = try_replace(&REQUIRE, code, |caps| self.require_call(&caps[1]))?;
    try_replace(&DYNAMIC_IMPORT, &code, |caps| {
      Ok(format!(
        "Promise.resolve().then(function () {{ return {}; }})",
        self.require_call(&caps[1])?
      ))
    })
  }

  fn node_env(&self, code: &str, mode: Mode) -> String {
    match mode.node_env() {
      Some(value) => NODE_ENV.replace_all(code, js_string(value).as_str()).into_owned(),
      None => code.to_string(),
    }
  }
}

/// `a, b as c` into `[(a, a), (b, c)]`.
fn specifiers(list: &str) -> Vec<(String, String)> {
  list
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|spec| match spec.split_once(" as ") {
      Some((from, to)) => (from.trim().to_string(), to.trim().to_string()),
      None => (spec.to_string(), spec.to_string()),
    })
    .collect()
}

/// Like [`Regex::replace_all`] with a fallible replacement. Matches starting
/// inside a comment are left as they are.
fn try_replace<E>(
  re: &Regex,
  text: &str,
  mut replace: impl FnMut(&Captures) -> Result<String, E>,
) -> Result<String, E> {
  let comments = comment_spans(text);
  let mut out = String::with_capacity(text.len());
  let mut last = 0;
  for caps in re.captures_iter(text) {
    let Some(whole) = caps.get(0) else { continue };
    if in_comment(&comments, whole.start()) {
      continue;
    }
    out.push_str(&text[last..whole.start()]);
    out.push_str(&replace(&caps)?);
    last = whole.end();
  }
  out.push_str(&text[last..]);
  Ok(out)
}
