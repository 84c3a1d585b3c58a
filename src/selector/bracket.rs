//! `Bracket`: one numeric parameter, lookup returns the pair of keys
//! straddling the lookup value (spec.md §4.5).

use super::{Child, Selector, SelectorImpl, Severity, ValidationIssue};
use crate::error::{Error, Result};
use crate::header::{Header, LegalValues, TreeHeader};
use std::rc::Rc;

/// Bracketing-pair selector.
#[derive(Debug, Clone)]
pub struct BracketNode {
    parameter: String,
    keys: Vec<f64>,
    raw_keys: Vec<String>,
    children: Vec<Child>,
    tree_header: Rc<TreeHeader>,
}

impl BracketNode {
    /// Builds a node from unsorted `(number_text, child)` selections.
    ///
    /// # Errors
    /// Returns `Error::InvalidNumber` if any key fails to parse.
    pub fn new(
        parameter: String,
        selections: Vec<(String, Child)>,
        tree_header: Rc<TreeHeader>,
    ) -> Result<Self> {
        let mut parsed = Vec::with_capacity(selections.len());
        for (raw, child) in selections {
            let key: f64 = raw
                .trim()
                .parse()
                .map_err(|_| Error::InvalidNumber(raw.clone()))?;
            parsed.push((key, raw, child));
        }
        parsed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut keys = Vec::with_capacity(parsed.len());
        let mut raw_keys = Vec::with_capacity(parsed.len());
        let mut children = Vec::with_capacity(parsed.len());
        for (key, raw, child) in parsed {
            keys.push(key);
            raw_keys.push(raw);
            children.push(child);
        }

        Ok(Self { parameter, keys, raw_keys, children, tree_header })
    }

    /// Returns the `(below, at-or-above)` index pair for `value` per
    /// spec.md §4.5's four cases.
    fn bracket_indices(&self, value: f64) -> Option<(usize, usize)> {
        if self.keys.is_empty() {
            return None;
        }
        let n = self.keys.len();
        if value < self.keys[0] {
            return Some((0, 0));
        }
        if value > self.keys[n - 1] {
            return Some((n - 1, n - 1));
        }
        if let Some(i) = self.keys.iter().position(|k| (*k - value).abs() < f64::EPSILON) {
            return Some((i, i));
        }
        for i in 0..n - 1 {
            if self.keys[i] < value && value < self.keys[i + 1] {
                return Some((i, i + 1));
            }
        }
        None
    }

    fn resolve(&self, index: usize, header: &Header) -> Result<String> {
        match &self.children[index] {
            Child::Terminal(name) => Ok(name.clone()),
            Child::Node(node) => node.choose(header)?.into_single(),
        }
    }
}

impl Selector for BracketNode {
    fn choose(&self, header: &Header) -> Result<super::Choice> {
        let raw = header
            .get(&self.parameter)
            .ok_or_else(|| Error::MissingParameter(self.parameter.clone()))?;
        let value: f64 = raw.trim().parse().map_err(|_| Error::InvalidNumber(raw.clone()))?;
        let (lo, hi) = self
            .bracket_indices(value)
            .ok_or_else(|| Error::InvalidNumber(self.parameter.clone()))?;

        if lo == hi {
            let resolved = self.resolve(lo, header)?;
            return Ok(super::Choice::Pair(resolved.clone(), resolved));
        }
        Ok(super::Choice::Pair(self.resolve(lo, header)?, self.resolve(hi, header)?))
    }

    fn parameters(&self) -> &[String] {
        std::slice::from_ref(&self.parameter)
    }

    fn class_name(&self) -> &'static str {
        "Bracket"
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn path_segment(&self, index: usize) -> Vec<(String, String)> {
        vec![(self.parameter.clone(), self.raw_keys[index].clone())]
    }

    fn raw_key_repr(&self, index: usize) -> String {
        self.raw_keys[index].clone()
    }

    fn child(&self, index: usize) -> &Child {
        &self.children[index]
    }

    fn child_mut(&mut self, index: usize) -> &mut Child {
        &mut self.children[index]
    }

    fn can_merge(&self) -> bool {
        false
    }

    fn merge_with(&self, _other: &SelectorImpl) -> Result<SelectorImpl> {
        Err(Error::AmbiguousMerge)
    }

    fn make_key(&self, header: &Header, _legal: &LegalValues) -> Result<String> {
        let raw = header
            .get(&self.parameter)
            .ok_or_else(|| Error::MissingParameter(self.parameter.clone()))?;
        let _: f64 = raw.trim().parse().map_err(|_| Error::InvalidNumber(raw.clone()))?;
        Ok(raw.trim().to_string())
    }

    fn find_index(&self, raw_key: &str) -> Option<usize> {
        let key: f64 = raw_key.trim().parse().ok()?;
        self.keys.iter().position(|k| (*k - key).abs() < f64::EPSILON)
    }

    fn insert_sorted(&mut self, raw_key: &str, child: Child) -> Result<()> {
        let key: f64 = raw_key
            .trim()
            .parse()
            .map_err(|_| Error::InvalidNumber(raw_key.to_string()))?;
        let pos = self.keys.partition_point(|k| *k < key);
        self.keys.insert(pos, key);
        self.raw_keys.insert(pos, raw_key.to_string());
        self.children.insert(pos, child);
        Ok(())
    }

    fn validate_self(&self, _legal: &LegalValues) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for raw in &self.raw_keys {
            if raw.trim().parse::<f64>().is_err() {
                issues.push(ValidationIssue {
                    path: vec![self.parameter.clone()],
                    message: format!("unparsable Bracket key: {raw}"),
                    severity: Severity::Error,
                });
            }
        }
        issues
    }

    fn tree_header(&self) -> &Rc<TreeHeader> {
        &self.tree_header
    }
}
