//! The Selector tree: a closed sum type over the six decision-node variants
//! (spec.md §4), plus the generic walk/format/diff/modify operations shared
//! across all of them (spec.md §4.8).
//!
//! The per-variant divergent behavior (`choose`, key construction, merge)
//! is captured by the [`Selector`] trait, dispatched through `enum_dispatch`
//! over [`SelectorImpl`] — the same closed-sum-type pattern the teacher
//! crate uses for `AnyTree` and `BlockIndexImpl`. The operations that are
//! genuinely variant-agnostic (`reference_names`, `format`, `file_matches`,
//! `difference`, `modify`) are implemented once, directly on `SelectorImpl`,
//! built only out of the trait's dispatched primitives.

pub mod bracket;
pub mod closest_time;
pub mod match_selector;
pub mod nearest;
pub mod select_version;
pub mod use_after;

use crate::error::{Error, Result};
use crate::header::{Header, LegalValues, TreeHeader};
use enum_dispatch::enum_dispatch;
use std::rc::Rc;

pub use bracket::BracketNode;
pub use closest_time::ClosestTimeNode;
pub use match_selector::MatchNode;
pub use nearest::NearestNode;
pub use select_version::SelectVersionNode;
pub use use_after::UseAfterNode;

/// A leaf value or a nested decision node.
#[derive(Debug, Clone)]
pub enum Child {
    /// A reference filename
    Terminal(String),
    /// A nested Selector
    Node(Box<SelectorImpl>),
}

impl Child {
    /// A short, stable representation used in `format()` and diff messages.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Terminal(name) => name.clone(),
            Self::Node(node) => format!("<{}>", node.class_name()),
        }
    }
}

/// The result of a top-level `choose`: a single file, a bracketing pair, or
/// (for an unresolved-but-terminal Match ambiguity) every tied candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// A single resolved reference file
    One(String),
    /// A `Bracket` result: the keys below and at-or-above the lookup value
    Pair(String, String),
    /// Multiple equal-weight Match survivors that are all terminal values
    Many(Vec<String>),
}

impl Choice {
    /// Unwraps a `One`, or fails for any other shape. Convenience for
    /// callers that know their tree never produces brackets/ambiguity.
    ///
    /// # Errors
    /// Returns `Error::AmbiguousMatch` if this isn't a `One`.
    pub fn into_single(self) -> Result<String> {
        match self {
            Self::One(name) => Ok(name),
            Self::Pair(a, b) => Err(Error::AmbiguousMatch(vec![a, b])),
            Self::Many(names) => Err(Error::AmbiguousMatch(names)),
        }
    }
}

/// Severity of a validation finding (spec.md §7: raise / collect-and-log).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Logged via `log::warn!` in default mode, collected in trap mode
    Warning,
    /// Always collected/raised
    Error,
}

/// One validation finding against a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Where in the tree this was found (dotted parameter path)
    pub path: Vec<String>,
    /// Human-readable finding
    pub message: String,
    /// Warning vs. error
    pub severity: Severity,
}

/// One structural diff finding between two trees (spec.md §4.8
/// `difference`). `message` is drawn from a stable, client-facing
/// vocabulary that must not be paraphrased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecord {
    /// Path from the tree root to this finding
    pub path: Vec<String>,
    /// One of: "different classes", "different parameter lists", "deleted",
    /// "added", or "replaced X with Y"
    pub message: String,
}

/// Per-variant capability set (spec.md §9: "A capability set `{choose,
/// merge?, validate_key, validate_value, make_key}`").
#[enum_dispatch]
pub trait Selector {
    /// Resolves a lookup header to a filename, bracket pair, or ambiguous
    /// group (spec.md §6 `choose`).
    fn choose(&self, header: &Header) -> Result<Choice>;

    /// This node's ordered, non-empty parameter list (empty only for the
    /// degenerate zero-key Match case).
    fn parameters(&self) -> &[String];

    /// Short variant name, used by `modify`'s class list and by
    /// `difference`'s "different classes" check.
    fn class_name(&self) -> &'static str;

    /// Number of selections at this node.
    fn len(&self) -> usize;

    /// `(parameter_name, key_field)` pairs this node contributes to a
    /// `file_matches` path for selection `index`.
    fn path_segment(&self, index: usize) -> Vec<(String, String)>;

    /// Pre-conditioning key text for selection `index`, used by `format`.
    fn raw_key_repr(&self, index: usize) -> String;

    /// The child at selection `index`.
    fn child(&self, index: usize) -> &Child;

    /// Mutable access to the child at selection `index`.
    fn child_mut(&mut self, index: usize) -> &mut Child;

    /// Does this variant support `merge`? Only `UseAfter` does (spec.md
    /// §4.2); every other variant answers `false`.
    fn can_merge(&self) -> bool;

    /// Unions `self` with `other`, keeping the lexicographically greater
    /// child on a key collision.
    ///
    /// # Errors
    /// Returns `Error::AmbiguousMerge` unless both sides are mergeable
    /// nodes of the same variant and parameter list.
    fn merge_with(&self, other: &SelectorImpl) -> Result<SelectorImpl>;

    /// Builds this node's raw key text from a lookup/edit header, and
    /// validates header fields against `legal` along the way.
    ///
    /// # Errors
    /// Returns `Error::MissingParameter` / `Error::BadValue` on a bad header.
    fn make_key(&self, header: &Header, legal: &LegalValues) -> Result<String>;

    /// Index of the selection whose (conditioned) key equals `raw_key`, if
    /// any.
    fn find_index(&self, raw_key: &str) -> Option<usize>;

    /// Inserts a new selection, keeping the selection list in the order
    /// this variant requires (time/version/numeric/lexicographic).
    ///
    /// # Errors
    /// Returns an error if `raw_key` fails this variant's own key
    /// validation (e.g. an unparsable date or number).
    fn insert_sorted(&mut self, raw_key: &str, child: Child) -> Result<()>;

    /// Variant-specific validation findings beyond the generic key/value
    /// checks `SelectorImpl::validate` already performs (only `Match`
    /// currently reports anything: special-case ambiguity warnings).
    fn validate_self(&self, legal: &LegalValues) -> Vec<ValidationIssue>;

    /// The tree-wide header shared by every node in this tree.
    fn tree_header(&self) -> &Rc<TreeHeader>;
}

/// The closed set of Selector variants (spec.md §2, §6 registry).
#[enum_dispatch(Selector)]
#[derive(Debug, Clone)]
pub enum SelectorImpl {
    /// Multi-field weighted winnowing match (spec.md §4.6)
    Match(MatchNode),
    /// Binary search over a time-sorted keyset (spec.md §4.2)
    UseAfter(UseAfterNode),
    /// Nearest-in-time picker (spec.md §4.3)
    ClosestTime(ClosestTimeNode),
    /// Nearest-in-value picker (spec.md §4.4)
    GeometricallyNearest(NearestNode),
    /// Bracketing pair picker (spec.md §4.5)
    Bracket(BracketNode),
    /// Version-relation picker (spec.md §4.7)
    SelectVersion(SelectVersionNode),
}

impl SelectorImpl {
    /// Deep walk returning the sorted, de-duplicated set of terminal values
    /// reachable from this node (spec.md §4.8 `reference_names`).
    #[must_use]
    pub fn reference_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out.sort();
        out.dedup();
        out
    }

    fn collect_names(&self, out: &mut Vec<String>) {
        for i in 0..self.len() {
            match self.child(i) {
                Child::Terminal(name) => out.push(name.clone()),
                Child::Node(node) => node.collect_names(out),
            }
        }
    }

    /// Pretty-prints this node over its raw (pre-conditioning) keys,
    /// indenting nested selectors one level further (spec.md §4.8 `format`).
    #[must_use]
    pub fn format(&self, indent: usize) -> String {
        let pad = "  ".repeat(indent);
        let mut out = format!("{pad}{}({:?}):\n", self.class_name(), self.parameters());
        for i in 0..self.len() {
            let key = self.raw_key_repr(i);
            match self.child(i) {
                Child::Terminal(name) => {
                    out.push_str(&format!("{pad}  {key} -> {name}\n"));
                }
                Child::Node(node) => {
                    out.push_str(&format!("{pad}  {key} ->\n"));
                    out.push_str(&node.format(indent + 2));
                }
            }
        }
        out
    }

    /// Enumerates every root-to-leaf path whose terminal equals `name`
    /// (spec.md §4.8 `file_matches`). Each path is a sequence of
    /// `(parameter_name, key_field)` pairs, one segment per level.
    #[must_use]
    pub fn file_matches(&self, name: &str) -> Vec<Vec<(String, String)>> {
        let mut out = Vec::new();
        self.collect_matches(name, &mut Vec::new(), &mut out);
        out
    }

    fn collect_matches(
        &self,
        name: &str,
        prefix: &mut Vec<(String, String)>,
        out: &mut Vec<Vec<(String, String)>>,
    ) {
        for i in 0..self.len() {
            let segment = self.path_segment(i);
            prefix.extend(segment.iter().cloned());
            match self.child(i) {
                Child::Terminal(candidate) if candidate == name => {
                    out.push(prefix.clone());
                }
                Child::Terminal(_) => {}
                Child::Node(node) => node.collect_matches(name, prefix, out),
            }
            for _ in 0..segment.len() {
                prefix.pop();
            }
        }
    }

    /// Structural diff against `other` (spec.md §4.8 `difference`).
    #[must_use]
    pub fn difference(&self, other: &SelectorImpl) -> Vec<DiffRecord> {
        self.difference_at(other, &[])
    }

    fn difference_at(&self, other: &SelectorImpl, path: &[String]) -> Vec<DiffRecord> {
        let mut out = Vec::new();

        if self.class_name() != other.class_name() {
            out.push(DiffRecord { path: path.to_vec(), message: "different classes".to_string() });
            return out;
        }
        if self.parameters() != other.parameters() {
            out.push(DiffRecord {
                path: path.to_vec(),
                message: "different parameter lists".to_string(),
            });
            return out;
        }

        let self_keys: Vec<String> = (0..self.len()).map(|i| self.raw_key_repr(i)).collect();
        let other_keys: Vec<String> = (0..other.len()).map(|i| other.raw_key_repr(i)).collect();

        for (i, key) in self_keys.iter().enumerate() {
            if !other_keys.contains(key) {
                let mut p = path.to_vec();
                p.push(key.clone());
                out.push(DiffRecord { path: p, message: "deleted".to_string() });
                continue;
            }
            let j = other_keys.iter().position(|k| k == key).unwrap_or(0);
            match (self.child(i), other.child(j)) {
                (Child::Node(a), Child::Node(b)) => {
                    let mut p = path.to_vec();
                    p.push(key.clone());
                    out.extend(a.difference_at(b, &p));
                }
                (a, b) => {
                    let a_label = a.label();
                    let b_label = b.label();
                    if a_label != b_label {
                        let mut p = path.to_vec();
                        p.push(key.clone());
                        out.push(DiffRecord {
                            path: p,
                            message: format!("replaced {a_label} with {b_label}"),
                        });
                    }
                }
            }
        }

        for key in &other_keys {
            if !self_keys.contains(key) {
                let mut p = path.to_vec();
                p.push(key.clone());
                out.push(DiffRecord { path: p, message: "added".to_string() });
            }
        }

        out
    }

    /// Validates this tree's keys (and, recursively, every nested tree's
    /// keys) against `legal`, collecting warnings and errors rather than
    /// raising (spec.md §7 "collect and log" disposition).
    #[must_use]
    pub fn validate(&self, legal: &LegalValues) -> Vec<ValidationIssue> {
        let mut out = self.validate_self(legal);
        for i in 0..self.len() {
            if let Child::Node(node) = self.child(i) {
                out.extend(node.validate(legal));
            }
        }
        out
    }

    /// Inserts or replaces a leaf addressed by `header`, creating missing
    /// intermediate selector layers per this tree's class list (spec.md
    /// §4.8 `modify`).
    ///
    /// When the addressed key already exists but its current child is a
    /// terminal value while classes remain, the existing value is replaced
    /// outright (see DESIGN.md: this is an explicitly undefined case in the
    /// spec, and "replace" was chosen over "extend").
    ///
    /// # Errors
    /// Returns `Error::BadValue` / `Error::MissingParameter` for a header
    /// that doesn't validate, or `Error::Modification` if the class list is
    /// exhausted while a new branch still needs to be created.
    pub fn modify(&mut self, header: &Header, value: String, legal: &LegalValues) -> Result<()> {
        self.modify_at(header, value, legal, 0)
    }

    fn modify_at(
        &mut self,
        header: &Header,
        value: String,
        legal: &LegalValues,
        level: usize,
    ) -> Result<()> {
        let classes = self.tree_header().effective_classes();
        let raw_key = self.make_key(header, legal)?;

        if let Some(idx) = self.find_index(&raw_key) {
            match self.child_mut(idx) {
                Child::Node(inner) => return inner.modify_at(header, value, legal, level + 1),
                Child::Terminal(slot) => {
                    *slot = value;
                    return Ok(());
                }
            }
        }

        let remaining = classes.get(level + 1..).unwrap_or(&[]).to_vec();
        let tree_header = self.tree_header().clone();
        let new_child = build_tail(&remaining, header, value, legal, level + 1, &tree_header)?;
        self.insert_sorted(&raw_key, new_child)
    }
}

/// Recursively builds a chain of fresh selectors for a missing tail,
/// bottoming out in a `Terminal` once `remaining_classes` is exhausted
/// (spec.md §4.8 step 5).
fn build_tail(
    remaining_classes: &[String],
    header: &Header,
    value: String,
    legal: &LegalValues,
    level: usize,
    tree_header: &Rc<TreeHeader>,
) -> Result<Child> {
    let Some((class_name, rest)) = remaining_classes.split_first() else {
        return Ok(Child::Terminal(value));
    };

    let params = tree_header.parkey.get(level).cloned().unwrap_or_default();
    let inner_child = build_tail(rest, header, value, legal, level + 1, tree_header)?;
    let node = crate::registry::build_single(class_name, params, header, legal, inner_child, tree_header.clone())?;
    Ok(Child::Node(Box::new(node)))
}
