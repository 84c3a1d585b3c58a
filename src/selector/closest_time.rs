//! `ClosestTime`: same keys and validation as `UseAfter`, but lookup picks
//! the selection with minimum absolute time delta rather than the floor
//! (spec.md §4.3).

use super::{Child, Selector, SelectorImpl, Severity, ValidationIssue};
use crate::boundary::timestamp::{self, Instant};
use crate::error::{Error, Result};
use crate::header::{Header, LegalValues, TreeHeader};
use std::rc::Rc;

/// Nearest-in-time selector.
#[derive(Debug, Clone)]
pub struct ClosestTimeNode {
    parameters: Vec<String>,
    keys: Vec<Instant>,
    raw_keys: Vec<String>,
    children: Vec<Child>,
    tree_header: Rc<TreeHeader>,
}

impl ClosestTimeNode {
    /// Builds a node from unsorted `(date_text, child)` selections.
    ///
    /// # Errors
    /// Returns `Error::InvalidDateTime` if any key fails to parse.
    pub fn new(
        parameters: Vec<String>,
        selections: Vec<(String, Child)>,
        tree_header: Rc<TreeHeader>,
    ) -> Result<Self> {
        let mut parsed = Vec::with_capacity(selections.len());
        for (raw, child) in selections {
            let instant = timestamp::parse_date(&raw)?;
            parsed.push((instant, raw, child));
        }
        parsed.sort_by(|a, b| a.0.cmp(&b.0));

        let mut keys = Vec::with_capacity(parsed.len());
        let mut raw_keys = Vec::with_capacity(parsed.len());
        let mut children = Vec::with_capacity(parsed.len());
        for (instant, raw, child) in parsed {
            keys.push(instant);
            raw_keys.push(raw);
            children.push(child);
        }

        Ok(Self { parameters, keys, raw_keys, children, tree_header })
    }

    fn lookup_text(&self, header: &Header) -> Result<String> {
        let mut parts = Vec::with_capacity(self.parameters.len());
        for param in &self.parameters {
            let value = header
                .get(param)
                .ok_or_else(|| Error::MissingParameter(param.clone()))?;
            parts.push(value.clone());
        }
        Ok(parts.join(" "))
    }

    /// Index of the key with minimum absolute delta to `lookup`, ties
    /// broken by first occurrence in ascending order.
    fn nearest_index(&self, lookup: &Instant) -> Option<usize> {
        let mut best: Option<(usize, i64)> = None;
        for (i, key) in self.keys.iter().enumerate() {
            let delta = key.abs_delta_seconds(lookup);
            match best {
                Some((_, best_delta)) if delta >= best_delta => {}
                _ => best = Some((i, delta)),
            }
        }
        best.map(|(i, _)| i)
    }
}

impl Selector for ClosestTimeNode {
    fn choose(&self, header: &Header) -> Result<super::Choice> {
        let text = self.lookup_text(header)?;
        let lookup = timestamp::parse_date(&text)?;
        let idx = self.nearest_index(&lookup).ok_or(Error::NoUseAfter)?;
        match &self.children[idx] {
            Child::Terminal(name) => Ok(super::Choice::One(name.clone())),
            Child::Node(node) => node.choose(header),
        }
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn class_name(&self) -> &'static str {
        "ClosestTime"
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn path_segment(&self, index: usize) -> Vec<(String, String)> {
        vec![(self.parameters.join(","), self.raw_keys[index].clone())]
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
        let text = self.lookup_text(header)?;
        timestamp::reformat_date(&text)
    }

    fn find_index(&self, raw_key: &str) -> Option<usize> {
        let instant = timestamp::parse_date(raw_key).ok()?;
        self.keys.iter().position(|k| *k == instant)
    }

    fn insert_sorted(&mut self, raw_key: &str, child: Child) -> Result<()> {
        let instant = timestamp::parse_date(raw_key)?;
        let pos = crate::binary_search::partition_point(&self.keys, |k| *k <= instant);
        self.keys.insert(pos, instant);
        self.raw_keys.insert(pos, raw_key.to_string());
        self.children.insert(pos, child);
        Ok(())
    }

    fn validate_self(&self, _legal: &LegalValues) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for raw in &self.raw_keys {
            if timestamp::parse_date(raw).is_err() {
                issues.push(ValidationIssue {
                    path: self.parameters.clone(),
                    message: format!("unparsable ClosestTime key: {raw}"),
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
