//! Two-phase construction: stash raw selections before the tree-wide header
//! is known, then `instantiate` a real [`SelectorImpl`] bottom-up once it is
//! (spec.md §4.9).
//!
//! Front-end parsers (syntactic front-ends are out of scope for this crate,
//! per spec.md §1) build a tree of [`Parameters`] shells level by level as
//! they read a rule file, before they've seen the tree-wide `parkey`/
//! `classes` header that names each level's parameter list and Selector
//! variant. Once the header is available, a single post-pass ([`instantiate`])
//! resolves each level and constructs the final selectors. No
//! self-referential references exist in the finished tree (spec.md §9).
//!
//! [`instantiate`]: Parameters::instantiate

use crate::error::Result;
use crate::header::TreeHeader;
use crate::selector::{Child, SelectorImpl};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// A selection's value before instantiation: either a terminal filename or
/// another unresolved level.
#[derive(Debug, Clone)]
pub enum ParamChild {
    /// A reference filename
    Terminal(String),
    /// A nested, not-yet-instantiated level
    Nested(Parameters),
}

/// One level's raw selections, collected before the tree-wide header is
/// known.
///
/// Keys are stored uniformly as a field vector: a single-element vector for
/// every variant but `Match`, which carries one field per parameter.
#[derive(Debug, Clone)]
pub struct Parameters {
    selections: Vec<(Vec<String>, ParamChild)>,
    duplicate_checkable: bool,
}

impl Parameters {
    /// Builds a shell from an ordered list of `(key_fields, child)` pairs.
    /// Order is preserved, and duplicate keys are detectable at
    /// [`instantiate`](Self::instantiate) time (spec.md §4.9: "list-of-pairs
    /// inputs can" be duplicate-checked).
    #[must_use]
    pub fn from_pairs(selections: Vec<(Vec<String>, ParamChild)>) -> Self {
        Self { selections, duplicate_checkable: true }
    }

    /// Builds a shell from a mapping literal. A map has already collapsed
    /// any duplicate keys by the time it reaches here, so duplicates cannot
    /// be detected or warned about (spec.md §4.9: "mapping-literal inputs
    /// cannot be duplicate-checked").
    #[must_use]
    pub fn from_map(selections: FxHashMap<Vec<String>, ParamChild>) -> Self {
        Self { selections: selections.into_iter().collect(), duplicate_checkable: false }
    }

    /// Number of selections this shell carries, before instantiation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selections.len()
    }

    /// Is this shell empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Walks this shell bottom-up, popping one `parkey`/`classes` entry per
    /// level from `tree_header` and constructing the matching
    /// [`SelectorImpl`] variant (spec.md §4.9, §6 registry).
    ///
    /// Duplicate keys within a level that came from [`from_pairs`] produce a
    /// `log::warn!`; the later occurrence in the input order wins, matching
    /// the behavior a plain overriding map-insert would have produced
    /// silently otherwise.
    ///
    /// [`from_pairs`]: Self::from_pairs
    ///
    /// # Errors
    /// Returns `Error::Modification` if `tree_header.classes` (or its
    /// observatory-derived default) doesn't name a level for this depth, or
    /// any construction error the target variant raises (`KeyArity`,
    /// `InvalidDateTime`, `InvalidNumber`, `InvalidVersion`).
    pub fn instantiate(self, tree_header: &Rc<TreeHeader>, level: usize) -> Result<SelectorImpl> {
        self.warn_duplicates(level);

        let params = tree_header.parkey.get(level).cloned().unwrap_or_default();
        let classes = tree_header.effective_classes();
        let class_name = classes.get(level).cloned().unwrap_or_else(|| "Match".to_string());

        let mut built = Vec::with_capacity(self.selections.len());
        for (key, child) in self.selections {
            let child = match child {
                ParamChild::Terminal(name) => Child::Terminal(name),
                ParamChild::Nested(inner) => {
                    Child::Node(Box::new(inner.instantiate(tree_header, level + 1)?))
                }
            };
            built.push((key, child));
        }

        crate::registry::build(&class_name, params, built, tree_header.clone())
    }

    fn warn_duplicates(&self, level: usize) {
        if !self.duplicate_checkable {
            return;
        }
        let mut seen: std::collections::HashSet<&[String]> = std::collections::HashSet::new();
        for (key, _) in &self.selections {
            if !seen.insert(key.as_slice()) {
                log::warn!(
                    "duplicate selection key at level {level}: {key:?} (last occurrence wins)"
                );
            }
        }
    }
}
