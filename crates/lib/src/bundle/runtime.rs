//! The module registry runtime wrapped around every bundle.

use std::fmt::Write;

use crate::consts::BUNDLE_BANNER;
use crate::graph::ModuleId;
use crate::util::text::js_string;

const HELPERS: &str = r#"  function __hashpack_default(m) {
    return m && m.__esModule ? m.default : m;
  }
  function __hashpack_esm(exports, getters) {
    Object.defineProperty(exports, "__esModule", { value: true });
    for (var name in getters) {
      Object.defineProperty(exports, name, { enumerable: true, get: getters[name] });
    }
  }
  function __hashpack_reexport(exports, from) {
    Object.keys(from).forEach(function (name) {
      if (name !== "default" && !Object.prototype.hasOwnProperty.call(exports, name)) {
        Object.defineProperty(exports, name, {
          enumerable: true,
          get: function () {
            return from[name];
          },
        });
      }
    });
  }
"#;

const REGISTRY: &str = r#"  var __hashpack_cache = {};
  function __hashpack_require(id) {
    var cached = __hashpack_cache[id];
    if (cached !== undefined) {
      return cached.exports;
    }
    var module = (__hashpack_cache[id] = { id: id, exports: {} });
    __hashpack_modules[id].call(module.exports, module, module.exports, __hashpack_require);
    return module.exports;
  }
"#;

/// Assemble the bundle: helpers, module table in the given order, then a
/// call requiring `entry`.
pub fn render(entry: &ModuleId, public_path: &str, modules: &[(ModuleId, String)]) -> String {
  let mut out = String::new();
  out.push_str(BUNDLE_BANNER);
  out.push_str("\n(function () {\n");
  let _ = writeln!(out, "  var __hashpack_public_path = {};", js_string(public_path));
  out.push_str(HELPERS);

  out.push_str("  var __hashpack_modules = {\n");
  for (id, body) in modules {
    let _ = writeln!(
      out,
      "    {}: function (module, exports, __hashpack_require) {{",
      js_string(id.as_str())
    );
    // Verbatim: multi-line template literals must keep their exact content.
    out.push_str(body);
    if !body.ends_with('\n') {
      out.push('\n');
    }
    out.push_str("    },\n");
  }
  out.push_str("  };\n");

  out.push_str(REGISTRY);
  let _ = writeln!(out, "  __hashpack_require({});", js_string(entry.as_str()));
  out.push_str("})();\n");
  out
}
