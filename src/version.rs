//! Version literals and the total order `SelectVersion` keys off of.
//!
//! A version key is either a bare scalar (`5.1`), a tuple (`(5, 1, 2)`), an
//! opaque text literal, or the sentinel `default`, which orders strictly
//! above every concrete version so it acts as an always-reachable fallback
//! when placed last in a selection list.

use crate::error::{Error, Result};
use std::cmp::Ordering;

/// A parsed version literal (§6 `literal_eval`).
#[derive(Debug, Clone, PartialEq)]
pub enum VersionLiteral {
    /// A plain numeric version, e.g. `5.1`
    Number(f64),
    /// A dotted/tuple version, e.g. `(5, 1, 2)`
    Tuple(Vec<f64>),
    /// An opaque text version that didn't parse as numeric
    Text(String),
}

impl VersionLiteral {
    fn try_cmp(&self, other: &Self) -> Result<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => {
                a.partial_cmp(b).ok_or_else(|| Error::InvalidVersion(format!("{a} vs {b}")))
            }
            (Self::Tuple(a), Self::Tuple(b)) => Ok(a
                .iter()
                .map(|x| (*x, false))
                .chain(std::iter::repeat((0.0, true)))
                .zip(
                    b.iter()
                        .map(|x| (*x, false))
                        .chain(std::iter::repeat((0.0, true))),
                )
                .take(a.len().max(b.len()))
                .map(|((x, x_pad), (y, y_pad))| match (x_pad, y_pad) {
                    (true, true) => Ordering::Equal,
                    _ => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                })
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)),
            (Self::Text(a), Self::Text(b)) => Ok(a.cmp(b)),
            _ => Err(Error::IncompatibleVersion(self.clone(), other.clone())),
        }
    }
}

/// `Concrete(v)` orders by `v`; `Default` orders strictly above every
/// concrete version.
#[derive(Debug, Clone, PartialEq)]
pub enum Version {
    /// A real, comparable version literal
    Concrete(VersionLiteral),
    /// The `default` sentinel, always the greatest
    Default,
}

impl Version {
    fn try_cmp(&self, other: &Self) -> Result<Ordering> {
        match (self, other) {
            (Self::Default, Self::Default) => Ok(Ordering::Equal),
            (Self::Default, Self::Concrete(_)) => Ok(Ordering::Greater),
            (Self::Concrete(_), Self::Default) => Ok(Ordering::Less),
            (Self::Concrete(a), Self::Concrete(b)) => a.try_cmp(b),
        }
    }
}

/// Comparison operator a `VersionRelation` tests the lookup version against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    /// Relation matches when `lookup < relation.version`
    Lt,
    /// Relation matches when `lookup == relation.version`
    Eq,
}

/// One `SelectVersion` key: an operator plus the version it compares against.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionRelation {
    op: RelOp,
    version: Version,
}

impl VersionRelation {
    /// Parses a raw `SelectVersion` key: `"default"`, `"<5"`, `"=5"`, or a
    /// bare version string (implicitly `=`).
    ///
    /// # Errors
    /// Returns `Error::InvalidVersion` if the version portion can't be parsed.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();

        if trimmed.eq_ignore_ascii_case("default") {
            return Ok(Self { op: RelOp::Lt, version: Version::Default });
        }

        if let Some(rest) = trimmed.strip_prefix("<=") {
            // `<=` isn't part of the declared operator set; fold into `<`
            // against the literal successor isn't representable, so treat
            // as `=` or `<` is ambiguous -- reject explicitly.
            let _ = rest;
            return Err(Error::InvalidVersion(raw.to_string()));
        }

        if let Some(rest) = trimmed.strip_prefix('<') {
            let lit = crate::boundary::version_literal::literal_eval(rest)?;
            return Ok(Self { op: RelOp::Lt, version: Version::Concrete(lit) });
        }

        if let Some(rest) = trimmed.strip_prefix('=') {
            let lit = crate::boundary::version_literal::literal_eval(rest)?;
            return Ok(Self { op: RelOp::Eq, version: Version::Concrete(lit) });
        }

        let lit = crate::boundary::version_literal::literal_eval(trimmed)?;
        Ok(Self { op: RelOp::Eq, version: Version::Concrete(lit) })
    }

    /// The relation's own version, used to keep a `SelectVersion` selection
    /// list in ascending order (`default` sorts last).
    pub(crate) fn ordering_key(&self) -> &Version {
        &self.version
    }

    pub(crate) fn try_cmp(&self, other: &Self) -> Result<Ordering> {
        self.version.try_cmp(&other.version)
    }

    /// Does this relation admit `lookup`?
    ///
    /// Implements the worked example in spec.md §8 scenario 5 literally:
    /// `"<5"` only admits versions strictly less than 5 (so a lookup of
    /// exactly `"5"` falls through to `default`), and `default`'s `Lt`
    /// encoding against the `Version::Default` sentinel is unconditionally
    /// true, making it the catch-all when listed last.
    pub(crate) fn admits(&self, lookup: &VersionLiteral) -> Result<bool> {
        let lookup_version = Version::Concrete(lookup.clone());
        let cmp = lookup_version.try_cmp(&self.version)?;
        Ok(match self.op {
            RelOp::Lt => cmp == Ordering::Less,
            RelOp::Eq => cmp == Ordering::Equal,
        })
    }
}
