//! Translates a `|`-joined alternation of shell-style glob patterns (`*` as
//! the only metacharacter) into one anchored regex union, the way
//! spec.md §4.1 rule 6 describes.

use super::Glob;
use crate::error::Result;
use regex::Regex;

/// Escapes every regex metacharacter except `*`, then maps `*` to `.*`.
fn translate_one(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '.' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '\\' | '|' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Compiles a glob/alternation key field (e.g. `"F140W"`, `"F1*W"`,
/// `"F140W|F160W"`) into a [`Glob`] matcher anchored to the full value.
///
/// # Errors
/// Returns `Error::Regex` if the translated pattern fails to compile (only
/// possible for pathological unicode input; well-formed glob fields never
/// fail).
pub fn compile(raw: &str) -> Result<Glob> {
    let branches: Vec<String> = raw.split('|').map(translate_one).collect();
    let pattern = format!("^(?:{})$", branches.join("|"));
    Ok(Glob { regex: Regex::new(&pattern)?, original: raw.to_string() })
}
