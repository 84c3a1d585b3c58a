//! Lookup headers, legal-value maps, and the shared per-tree header
//! (spec.md §3, §6).

use rustc_hash::FxHashMap;

/// A runtime observation header: instrument/observation parameter name to
/// string value.
pub type Header = FxHashMap<String, String>;

/// The set of legal values per parameter name, used by [`validate`] and by
/// `Match::choose`'s header-value check.
///
/// [`validate`]: crate::selector::Selector::validate
pub type LegalValues = FxHashMap<String, Vec<String>>;

/// Per-parameter value rewrites applied to keys before conditioning.
pub type Substitutions = FxHashMap<String, FxHashMap<String, String>>;

/// Metadata shared across every node of one tree (spec.md §3 `tree_header`).
#[derive(Debug, Clone, Default)]
pub struct TreeHeader {
    /// Per-level parameter-name lists, consumed by `modify` to build missing
    /// intermediate layers.
    pub parkey: Vec<Vec<String>>,

    /// Per-level Selector variant short names (`"Match"`, `"UseAfter"`, ...),
    /// used by `modify` when no branch exists yet for a key.
    pub classes: Option<Vec<String>>,

    /// Per-parameter value rewrites applied to keys at construction.
    pub substitutions: Option<Substitutions>,

    /// Fallback used only to pick a default class list when `classes` is
    /// absent: HST-family observatories default to `["Match", "UseAfter"]`,
    /// JWST-family ones to `["Match"]`.
    pub observatory: Option<String>,
}

impl TreeHeader {
    /// Returns the effective class list for `modify`: the explicit
    /// `classes` if set, otherwise the observatory-based default from
    /// spec.md §4.8.
    #[must_use]
    pub fn effective_classes(&self) -> Vec<String> {
        if let Some(classes) = &self.classes {
            return classes.clone();
        }
        let is_jwst = self
            .observatory
            .as_deref()
            .is_some_and(|o| o.to_lowercase().contains("jwst"));
        if is_jwst {
            vec!["Match".to_string()]
        } else {
            vec!["Match".to_string(), "UseAfter".to_string()]
        }
    }
}
