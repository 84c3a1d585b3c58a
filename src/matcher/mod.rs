//! Matcher primitives: one tester per Match-selection field (spec.md §4.1).
//!
//! Modeled as a closed sum type dispatched through `enum_dispatch`, the same
//! pattern the teacher crate uses for its own closed node hierarchies
//! (`AnyTree`, `BlockIndexImpl`).

mod glob;

use crate::error::{Error, Result};
use enum_dispatch::enum_dispatch;
use regex::Regex;

/// Outcome of testing a header value against a matcher.
pub type Outcome = i32;

const FULL: Outcome = 1;
const DONT_CARE: Outcome = 0;
const MISS: Outcome = -1;

/// A matcher primitive tests one header value and returns `+1` (full
/// match), `0` (don't-care), or `-1` (miss).
#[enum_dispatch]
pub trait Matcher {
    /// Tests `value` against this matcher.
    fn test(&self, value: &str) -> Outcome;
}

/// Values every matcher (except [`Wildcard`]) treats specially before
/// falling through to its own logic: a header value of `"N/A"` is always a
/// don't-care, and a bare `"*"` is always a full match — this is what lets
/// a caller pass the wildcard sentinel through any matcher and "refactor"
/// a key without breaking existing headers.
fn common_case(value: &str) -> Option<Outcome> {
    match value {
        "N/A" => Some(DONT_CARE),
        "*" => Some(FULL),
        _ => None,
    }
}

/// Literal equality matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    key: String,
}

impl Matcher for Literal {
    fn test(&self, value: &str) -> Outcome {
        if let Some(o) = common_case(value) {
            return o;
        }
        if value == self.key {
            FULL
        } else {
            MISS
        }
    }
}

/// Always don't-care, regardless of input. Used for the `"N/A"` key field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wildcard;

impl Matcher for Wildcard {
    fn test(&self, _value: &str) -> Outcome {
        DONT_CARE
    }
}

/// Inequality operator parsed from a `<`, `>`, `<=`, `>=` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneqOp {
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
}

/// Numeric inequality matcher, e.g. `">=1.2"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Inequality {
    op: IneqOp,
    threshold: f64,
}

impl Inequality {
    fn holds(&self, x: f64) -> bool {
        match self.op {
            IneqOp::Lt => x < self.threshold,
            IneqOp::Gt => x > self.threshold,
            IneqOp::Le => x <= self.threshold,
            IneqOp::Ge => x >= self.threshold,
        }
    }
}

impl Matcher for Inequality {
    fn test(&self, value: &str) -> Outcome {
        if let Some(o) = common_case(value) {
            return o;
        }
        match value.parse::<f64>() {
            Ok(x) if self.holds(x) => FULL,
            _ => MISS,
        }
    }
}

/// Glob matcher: translated to an anchored regex union, with an exceptional
/// table that also accepts the literal `"*"` and the original, untranslated
/// key text as full matches (spec.md §4.1).
#[derive(Debug, Clone)]
pub struct Glob {
    regex: Regex,
    original: String,
}

impl Matcher for Glob {
    fn test(&self, value: &str) -> Outcome {
        if let Some(o) = common_case(value) {
            return o;
        }
        if value == self.original || self.regex.is_match(value) {
            FULL
        } else {
            MISS
        }
    }
}

/// Raw regular-expression matcher, from a `"(R)"` key.
#[derive(Debug, Clone)]
pub struct RegexMatch {
    regex: Regex,
}

impl Matcher for RegexMatch {
    fn test(&self, value: &str) -> Outcome {
        if let Some(o) = common_case(value) {
            return o;
        }
        if self.regex.is_match(value) {
            FULL
        } else {
            MISS
        }
    }
}

/// `left and right`: full match only when both sides are.
#[derive(Debug, Clone)]
pub struct BinaryAnd {
    left: Box<MatcherImpl>,
    right: Box<MatcherImpl>,
}

impl Matcher for BinaryAnd {
    fn test(&self, value: &str) -> Outcome {
        if self.left.test(value) == FULL && self.right.test(value) == FULL {
            FULL
        } else {
            MISS
        }
    }
}

/// `left or right`: full match when either side is.
#[derive(Debug, Clone)]
pub struct BinaryOr {
    left: Box<MatcherImpl>,
    right: Box<MatcherImpl>,
}

impl Matcher for BinaryOr {
    fn test(&self, value: &str) -> Outcome {
        if self.left.test(value) == FULL || self.right.test(value) == FULL {
            FULL
        } else {
            MISS
        }
    }
}

/// The closed set of matcher primitives.
#[enum_dispatch(Matcher)]
#[derive(Debug, Clone)]
pub enum MatcherImpl {
    /// See [`Literal`]
    Literal(Literal),
    /// See [`Wildcard`]
    Wildcard(Wildcard),
    /// See [`Inequality`]
    Inequality(Inequality),
    /// See [`Glob`]
    Glob(Glob),
    /// See [`RegexMatch`]
    Regex(RegexMatch),
    /// See [`BinaryAnd`]
    BinaryAnd(BinaryAnd),
    /// See [`BinaryOr`]
    BinaryOr(BinaryOr),
}

/// Builds a matcher from a raw (already key-conditioned, where applicable)
/// key field, applying the factory rules in spec.md §4.1 in order.
///
/// # Errors
/// Returns `Error::Regex` for malformed `(...)` / glob patterns, and
/// `Error::InvalidNumber` / a `Modification`-shaped error for a malformed
/// `between`/inequality bound.
pub fn build(raw: &str) -> Result<MatcherImpl> {
    let raw = raw.trim();

    if let Some(inner) = raw.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        return Ok(MatcherImpl::Regex(RegexMatch { regex: Regex::new(inner)? }));
    }

    if let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        return Ok(MatcherImpl::Literal(Literal { key: inner.to_string() }));
    }

    if let Some(inner) = raw.strip_prefix('#').and_then(|s| s.strip_suffix('#')) {
        let inner = inner.trim();
        if let Some((l, r)) = inner.split_once(" and ") {
            return Ok(MatcherImpl::BinaryAnd(BinaryAnd {
                left: Box::new(build(l.trim())?),
                right: Box::new(build(r.trim())?),
            }));
        }
        if let Some((l, r)) = inner.split_once(" or ") {
            return Ok(MatcherImpl::BinaryOr(BinaryOr {
                left: Box::new(build(l.trim())?),
                right: Box::new(build(r.trim())?),
            }));
        }
        return build(inner);
    }

    if let Some(rest) = raw.strip_prefix("between ") {
        let mut parts = rest.split_whitespace();
        let lo_str = parts.next().ok_or_else(|| Error::InvalidNumber(raw.to_string()))?;
        let hi_str = parts.next().ok_or_else(|| Error::InvalidNumber(raw.to_string()))?;
        let lo: f64 = lo_str.parse().map_err(|_| Error::InvalidNumber(raw.to_string()))?;
        let hi: f64 = hi_str.parse().map_err(|_| Error::InvalidNumber(raw.to_string()))?;
        if lo > hi {
            return Err(Error::InvalidNumber(raw.to_string()));
        }
        return Ok(MatcherImpl::BinaryAnd(BinaryAnd {
            left: Box::new(MatcherImpl::Inequality(Inequality { op: IneqOp::Ge, threshold: lo })),
            right: Box::new(MatcherImpl::Inequality(Inequality { op: IneqOp::Lt, threshold: hi })),
        }));
    }

    if raw.contains('|') || raw.contains('*') {
        return Ok(MatcherImpl::Glob(glob::compile(raw)?));
    }

    if raw == "N/A" {
        return Ok(MatcherImpl::Wildcard(Wildcard));
    }

    for (prefix, op) in [("<=", IneqOp::Le), (">=", IneqOp::Ge), ("<", IneqOp::Lt), (">", IneqOp::Gt)] {
        if let Some(rest) = raw.strip_prefix(prefix) {
            let threshold: f64 = rest
                .trim()
                .parse()
                .map_err(|_| Error::InvalidNumber(raw.to_string()))?;
            return Ok(MatcherImpl::Inequality(Inequality { op, threshold }));
        }
    }

    Ok(MatcherImpl::Literal(Literal { key: raw.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_semantics() {
        let m = build("F140W").unwrap();
        assert_eq!(m.test("F140W"), FULL);
        assert_eq!(m.test("*"), FULL);
        assert_eq!(m.test("N/A"), DONT_CARE);
        assert_eq!(m.test("F140X"), MISS);
    }

    #[test]
    fn na_key_always_dont_care() {
        let m = build("N/A").unwrap();
        assert_eq!(m.test("anything"), DONT_CARE);
        assert_eq!(m.test("*"), DONT_CARE);
    }

    #[test]
    fn braced_literal_is_verbatim() {
        let m = build("{a.b*c}").unwrap();
        assert_eq!(m.test("a.b*c"), FULL);
        assert_eq!(m.test("axbyc"), MISS);
    }

    #[test]
    fn raw_regex() {
        let m = build("(^F1[0-9]+W$)").unwrap();
        assert_eq!(m.test("F140W"), FULL);
        assert_eq!(m.test("G141"), MISS);
    }

    #[test]
    fn inequality() {
        let m = build(">=1.2").unwrap();
        assert_eq!(m.test("1.2"), FULL);
        assert_eq!(m.test("1.1"), MISS);
    }

    #[test]
    fn between_requires_lo_le_hi() {
        assert!(build("between 5 1").is_err());
        let m = build("between 1 5").unwrap();
        assert_eq!(m.test("1"), FULL);
        assert_eq!(m.test("4.9"), FULL);
        assert_eq!(m.test("5"), MISS);
    }

    #[test]
    fn hashed_and_or() {
        let and_m = build("#>=1 and <5#").unwrap();
        assert_eq!(and_m.test("3"), FULL);
        assert_eq!(and_m.test("5"), MISS);

        let or_m = build("#<1 or >5#").unwrap();
        assert_eq!(or_m.test("0"), FULL);
        assert_eq!(or_m.test("3"), MISS);
    }

    #[test]
    fn glob_alternation() {
        let m = build("F140W|F160W").unwrap();
        assert_eq!(m.test("F140W"), FULL);
        assert_eq!(m.test("F160W"), FULL);
        assert_eq!(m.test("F999W"), MISS);
    }

    #[test]
    fn glob_wildcard() {
        let m = build("F1*W").unwrap();
        assert_eq!(m.test("F140W"), FULL);
        assert_eq!(m.test("F1*W"), FULL, "original pattern text is itself a full match");
        assert_eq!(m.test("G141"), MISS);
    }
}
