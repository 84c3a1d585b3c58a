//! `literal_eval`: safe evaluation of a version literal out of a raw rule
//! string. Accepts a plain number (`"5"`, `"5.1"`), a parenthesised tuple of
//! numbers (`"(5, 1, 2)"`), or falls back to treating the string as an
//! opaque text literal.

use crate::error::{Error, Result};
use crate::version::VersionLiteral;

/// Parses a raw version literal string.
///
/// # Errors
/// Returns `Error::InvalidVersion` if a tuple literal contains a
/// non-numeric component.
pub fn literal_eval(raw: &str) -> Result<VersionLiteral> {
    let trimmed = raw.trim();

    if let Some(inner) = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        let mut parts = Vec::new();
        for part in inner.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let n: f64 = part
                .parse()
                .map_err(|_| Error::InvalidVersion(raw.to_string()))?;
            parts.push(n);
        }
        return Ok(VersionLiteral::Tuple(parts));
    }

    if let Ok(n) = trimmed.parse::<f64>() {
        return Ok(VersionLiteral::Number(n));
    }

    Ok(VersionLiteral::Text(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_number() {
        assert_eq!(literal_eval("5.1").unwrap(), VersionLiteral::Number(5.1));
    }

    #[test]
    fn parses_tuple() {
        assert_eq!(
            literal_eval("(5, 1, 2)").unwrap(),
            VersionLiteral::Tuple(vec![5.0, 1.0, 2.0])
        );
    }

    #[test]
    fn parses_text() {
        assert_eq!(
            literal_eval("unknown").unwrap(),
            VersionLiteral::Text("unknown".to_string())
        );
    }

    #[test]
    fn rejects_bad_tuple() {
        assert!(literal_eval("(1, x)").is_err());
    }
}
