//! Display-title inference from raw video URLs.
//!
//! The cleanup after the filename is extracted is an ordered list of
//! pattern/replacement rewrites. Vocabulary (extensions, release tags) comes
//! from `constants.ron` plus any user-supplied tags in `prefs.toml`, so new
//! tags never touch the control flow below.

use anyhow::{Context, Result};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::constants::constants;

/// One step of the cleanup pipeline.
struct Rewrite {
  pattern: Regex,
  replacement: &'static str,
}

impl Rewrite {
  fn new(pattern: &str, replacement: &'static str) -> Result<Self> {
    let pattern = Regex::new(pattern).with_context(|| format!("Invalid title rewrite pattern: {}", pattern))?;
    Ok(Self { pattern, replacement })
  }

  fn apply(&self, input: &str) -> String {
    self.pattern.replace_all(input, self.replacement).into_owned()
  }
}

pub struct TitleNormalizer {
  rewrites: Vec<Rewrite>,
  untitled: String,
}

impl TitleNormalizer {
  /// Build a normalizer from extension names and tag patterns (regex fragments).
  pub fn new(extensions: &[String], tag_patterns: &[String], untitled: &str) -> Result<Self> {
    let extensions = extensions.join("|");
    let tags = tag_patterns.join("|");

    let mut rewrites = Vec::new();
    if !extensions.is_empty() {
      rewrites.push(Rewrite::new(&format!(r"(?i)\.(?:{})$", extensions), "")?);
    }
    if !tags.is_empty() {
      rewrites.push(Rewrite::new(&format!("(?i)(?:{})", tags), "")?);
    }
    // Separators first, so bracket contents never leave stray spaces behind.
    rewrites.push(Rewrite::new(r"[._-]+", " ")?);
    rewrites.push(Rewrite::new(r"\s+", " ")?);
    rewrites.push(Rewrite::new(r"^\s+|\s+$", "")?);
    rewrites.push(Rewrite::new(r"\[[^\]]*\]|\([^)]*\)", "")?);
    rewrites.push(Rewrite::new(r"\s+", " ")?);
    rewrites.push(Rewrite::new(r"^\s+|\s+$", "")?);

    Ok(Self { rewrites, untitled: untitled.to_string() })
  }

  /// Built-in vocabulary plus literal tags from user config.
  pub fn with_extra_tags(extra_tags: &[String]) -> Result<Self> {
    let c = constants();
    let mut tags = c.release_tags.clone();
    tags.extend(extra_tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).map(regex::escape));
    Self::new(&c.video_extensions, &tags, &c.untitled_title)
  }

  /// Derive a display title from `url`. Never fails and never returns an empty string.
  pub fn normalize(&self, url: &str) -> String {
    let decoded = decode_component(url).unwrap_or_else(|| url.to_string());

    let segment = match decoded.rsplit('/').next() {
      Some(last) if !last.is_empty() => last,
      _ => decoded.as_str(),
    };
    let base = segment.split('?').next().unwrap_or_default().to_string();

    let cleaned = self.rewrites.iter().fold(base, |acc, rewrite| rewrite.apply(&acc));
    if cleaned.is_empty() { self.untitled.clone() } else { cleaned }
  }
}

static DEFAULT_NORMALIZER: LazyLock<TitleNormalizer> = LazyLock::new(|| {
  // Safety: the vocabulary is embedded at compile time; a bad pattern fails every title test.
  TitleNormalizer::with_extra_tags(&[]).expect("built-in title vocabulary must compile")
});

/// Normalize with the built-in vocabulary only.
pub fn normalize_title(url: &str) -> String {
  DEFAULT_NORMALIZER.normalize(url)
}

/// Percent-decode with `decodeURIComponent` strictness: a stray `%` or a
/// non-UTF-8 byte sequence is a failure rather than being passed through.
fn decode_component(raw: &str) -> Option<String> {
  let bytes = raw.as_bytes();
  let mut i = 0;
  while i < bytes.len() {
    if bytes[i] == b'%' {
      let valid = bytes.get(i + 1..i + 3).is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
      if !valid {
        return None;
      }
      i += 3;
    } else {
      i += 1;
    }
  }
  urlencoding::decode(raw).ok().map(Cow::into_owned)
}
