//! Text helpers for generated JavaScript.

/// Strips the UTF-8 byte order mark from the beginning of text if present.
pub fn strip_bom(text: &str) -> &str {
  text.strip_prefix('\u{FEFF}').unwrap_or(text)
}

/// Quote `s` as a double-quoted JavaScript string literal.
///
/// JSON string escaping, plus U+2028 and U+2029 which JSON allows raw but
/// older engines reject inside string literals.
pub fn js_string(s: &str) -> String {
  serde_json::Value::String(s.to_owned())
    .to_string()
    .replace('\u{2028}', "\\u2028")
    .replace('\u{2029}', "\\u2029")
}
