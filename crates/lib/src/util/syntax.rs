//! Module syntax shared by reference extraction and bundle rewriting.
//!
//! The graph builder and the linker must agree on what counts as a reference,
//! otherwise a module the linker rewrites may never have been loaded. Both
//! read the patterns here and both skip matches that start inside a comment.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Static `import` statements.
///
/// Groups: 1 indent, 2 default binding, 3 namespace binding, 4 named list,
/// 5 source.
pub static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r#"(?m)^([ \t]*)import(?:\s+|(?=[{*"']))(?:([\w$]+)\s*,?\s*)?(?:\*\s*as\s+([\w$]+)|\{([^}]*)\})?\s*(?:from\s*)?["']([^"'\n]+)["'][ \t]*;?"#,
  )
  .expect("valid regex")
});

/// `export ... from` statements.
///
/// Groups: 1 indent, 2 namespace name, 3 bare `*`, 4 named list, 5 source.
pub static EXPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r#"(?m)^([ \t]*)export\s*(?:\*\s*as\s+([\w$]+)|(\*)|\{([^}]*)\})\s*from\s*["']([^"'\n]+)["'][ \t]*;?"#,
  )
  .expect("valid regex")
});

/// `require("..")`; group 1 is the source.
pub static REQUIRE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"\brequire\s*\(\s*["']([^"'\n]+)["']\s*\)"#).expect("valid regex"));

/// `import("..")`; group 1 is the source.
pub static DYNAMIC_IMPORT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"\bimport\s*\(\s*["']([^"'\n]+)["']\s*\)"#).expect("valid regex"));

/// Capture group holding the referenced module in [`IMPORT`] and [`EXPORT_FROM`].
pub const STATEMENT_SOURCE: usize = 5;

/// Capture group holding the referenced module in [`REQUIRE`] and [`DYNAMIC_IMPORT`].
pub const CALL_SOURCE: usize = 1;

/// Byte ranges of `//` and `/* */` comments in `source`, in order.
///
/// String and template literals are skipped so `"//"` inside them is not a
/// comment. Regex literals are not recognised; an escaped slash is never the
/// start of a comment.
pub fn comment_spans(source: &str) -> Vec<Range<usize>> {
  let bytes = source.as_bytes();
  let mut spans = Vec::new();
  let mut i = 0;

  while i < bytes.len() {
    match bytes[i] {
      b'\\' => i += 2,
      b'/' if bytes.get(i + 1) == Some(&b'/') => {
        let end = source[i..].find('\n').map_or(bytes.len(), |n| i + n);
        spans.push(i..end);
        i = end;
      }
      b'/' if bytes.get(i + 1) == Some(&b'*') => {
        let end = source[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
        spans.push(i..end);
        i = end;
      }
      quote @ (b'"' | b'\'' | b'`') => i = skip_literal(bytes, i + 1, quote),
      _ => i += 1,
    }
  }
  spans
}

/// Index just past the literal opened before `start`. Plain strings also end
/// at a newline, which keeps an unbalanced quote from swallowing the file.
fn skip_literal(bytes: &[u8], start: usize, quote: u8) -> usize {
  let mut i = start;
  while i < bytes.len() {
    match bytes[i] {
      b'\\' => i += 2,
      b'\n' if quote != b'`' => return i + 1,
      c if c == quote => return i + 1,
      _ => i += 1,
    }
  }
  bytes.len()
}

/// Whether `offset` lies inside one of `spans`.
pub fn in_comment(spans: &[Range<usize>], offset: usize) -> bool {
  let idx = spans.partition_point(|span| span.end <= offset);
  spans.get(idx).is_some_and(|span| span.contains(&offset))
}
