//! Whitespace and comment stripping.
//!
//! Deliberately conservative: scripts are processed line by line and only
//! whole-line comments are dropped, so string and regex literals are never
//! touched. Lines inside multi-line template literals are kept verbatim.

use tracing::debug;

use super::{EmitHook, HookError};
use crate::manifest::{EmittedFile, FileKind};

pub struct Minify;

impl EmitHook for Minify {
  fn name(&self) -> &'static str {
    "minify"
  }

  fn before_emit(&self, files: &mut [EmittedFile]) -> Result<(), HookError> {
    for file in files.iter_mut() {
      let minify: fn(&str) -> String = match file.kind {
        FileKind::Script => minify_js,
        FileKind::Stylesheet => minify_css,
        FileKind::Asset => continue,
      };
      let Ok(text) = std::str::from_utf8(&file.bytes) else {
        continue;
      };

      let minified = minify(text);
      let before = file.bytes.len();
      file.replace_bytes(minified.into_bytes());
      debug!(file = %file.name, before, after = file.bytes.len(), "minified");
    }
    Ok(())
  }
}

pub fn minify_js(source: &str) -> String {
  let mut out = String::with_capacity(source.len());
  let mut in_template = false;
  let mut in_comment = false;

  for line in source.lines() {
    if in_template {
      out.push_str(line);
      out.push('\n');
      if unescaped_backticks(line) % 2 == 1 {
        in_template = false;
      }
      continue;
    }

    if in_comment {
      if line.contains("*/") {
        in_comment = false;
      }
      continue;
    }

    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with("//") {
      continue;
    }
    if trimmed.starts_with("/*") && !trimmed.starts_with("/*!") {
      let body = trimmed.trim_end();
      if !body.contains("*/") {
        in_comment = true;
        continue;
      }
      if body.ends_with("*/") && body.find("*/") == Some(body.len() - 2) {
        continue;
      }
    }

    if unescaped_backticks(trimmed) % 2 == 1 {
      in_template = true;
      out.push_str(trimmed);
    } else {
      out.push_str(trimmed.trim_end());
    }
    out.push('\n');
  }

  out
}

fn unescaped_backticks(line: &str) -> usize {
  let mut count = 0;
  let mut escaped = false;
  for c in line.chars() {
    match c {
      '\\' if !escaped => escaped = true,
      '`' if !escaped => count += 1,
      _ => escaped = false,
    }
    if c != '\\' {
      escaped = false;
    }
  }
  count
}

pub fn minify_css(source: &str) -> String {
  let mut out = String::with_capacity(source.len());
  let mut chars = source.chars().peekable();
  let mut quote: Option<char> = None;
  let mut pending_space = false;

  while let Some(c) = chars.next() {
    if let Some(q) = quote {
      out.push(c);
      if c == '\\' {
        if let Some(next) = chars.next() {
          out.push(next);
        }
      } else if c == q {
        quote = None;
      }
      continue;
    }

    match c {
      '/' if chars.peek() == Some(&'*') => {
        chars.next();
        let mut prev = '\0';
        for next in chars.by_ref() {
          if prev == '*' && next == '/' {
            break;
          }
          prev = next;
        }
        pending_space = true;
      }
      c if c.is_whitespace() => pending_space = true,
      c => {
        let last = out.chars().last();
        if pending_space && last.is_some_and(|l| !is_css_punct(l)) && !is_css_punct(c) {
          out.push(' ');
        }
        pending_space = false;
        if c == '}' && out.ends_with(';') {
          out.pop();
        }
        out.push(c);
        if c == '"' || c == '\'' {
          quote = Some(c);
        }
      }
    }
  }

  if !out.is_empty() {
    out.push('\n');
  }
  out
}

fn is_css_punct(c: char) -> bool {
  matches!(c, '{' | '}' | ';' | ',' | '>')
}
