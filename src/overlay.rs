//! Idempotent line-oriented patching of key/value configuration files
//!
//! An overlay rule replaces the first line carrying its key, or appends a new
//! line when the key is absent. Re-applying the same rule set to the engine's
//! own output is byte-identical: no duplicate keys accumulate and line order
//! is preserved.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConvergeError, Result};

/// One key-scoped replace-or-append instruction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverlayRule {
    /// Key on the left-hand side of the assignment
    pub key: String,
    /// Replacement value for the right-hand side
    pub value: String,
}

impl OverlayRule {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Canonical rendered line for this rule
    fn line(&self) -> String {
        format!("{}={}", self.key, self.value)
    }

    /// Whether a line carries this rule's key
    ///
    /// Matches `KEY=...` and `KEY = ...` forms, ignoring leading whitespace.
    /// A key that is a strict prefix of a longer key does not match.
    fn matches(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        match trimmed.strip_prefix(self.key.as_str()) {
            Some(rest) => rest.trim_start().starts_with('='),
            None => false,
        }
    }
}

/// Apply rules to text, returning the patched text.
///
/// Each rule replaces the first matching line in place (first match wins) or
/// appends `KEY=VALUE` at end of input when no line matches.
pub fn overlay_text(text: &str, rules: &[OverlayRule]) -> String {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();

    for rule in rules {
        match lines.iter().position(|l| rule.matches(l)) {
            Some(idx) => lines[idx] = rule.line(),
            None => lines.push(rule.line()),
        }
    }

    if lines.is_empty() {
        String::new()
    } else {
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

/// Apply rules to a file on disk.
///
/// A missing file is treated as empty, so every rule becomes an append and
/// the file is created. Returns whether the file content changed.
pub fn apply_overlay(path: &Path, rules: &[OverlayRule]) -> Result<bool> {
    let original = read_or_empty(path)?;
    let patched = overlay_text(&original, rules);

    if patched == original {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConvergeError::FileWriteFailed {
            path: parent.display().to_string(),
            reason: e.to_string(),
        })?;
    }
    std::fs::write(path, &patched).map_err(|e| ConvergeError::FileWriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(true)
}

/// Whether applying the rules would change the file (no side effects)
pub fn overlay_pending(path: &Path, rules: &[OverlayRule]) -> Result<bool> {
    let original = read_or_empty(path)?;
    Ok(overlay_text(&original, rules) != original)
}

fn read_or_empty(path: &Path) -> Result<String> {
    if !path.exists() {
        return Ok(String::new());
    }
    std::fs::read_to_string(path).map_err(|e| ConvergeError::FileReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Replace placeholder tokens with resolved environment values.
///
/// Substitution is whole-token: a match is rejected when the adjacent
/// character would extend the token into a longer word or path segment, so a
/// short home path never corrupts a longer path sharing it as a prefix, and
/// an account name never matches inside a longer identifier. Longer tokens
/// are tried before shorter ones, and replacements are never re-scanned.
pub fn substitute_tokens(text: &str, substitutions: &[(String, String)]) -> String {
    let mut tokens: Vec<&(String, String)> = substitutions
        .iter()
        .filter(|(from, _)| !from.is_empty())
        .collect();
    tokens.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    'outer: while i < chars.len() {
        for (from, to) in tokens.iter().map(|t| (&t.0, &t.1)) {
            if let Some(end) = token_match_at(&chars, i, from) {
                out.push_str(to);
                i = end;
                continue 'outer;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Check a whole-token match of `token` at position `i`; returns end index
fn token_match_at(chars: &[char], i: usize, token: &str) -> Option<usize> {
    let token_chars: Vec<char> = token.chars().collect();
    let end = i + token_chars.len();
    if end > chars.len() || chars[i..end] != token_chars[..] {
        return None;
    }

    // Boundary checks apply only where the token edge is itself a word
    // character; a token ending in '/' already separates.
    let first = token_chars[0];
    let last = token_chars[token_chars.len() - 1];
    if is_word_char(first) && i > 0 && is_word_char(chars[i - 1]) {
        return None;
    }
    if is_word_char(last) && end < chars.len() && is_word_char(chars[end]) {
        return None;
    }
    Some(end)
}
