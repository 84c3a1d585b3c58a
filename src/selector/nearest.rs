//! `GeometricallyNearest`: one numeric parameter, lookup returns the
//! selection whose key minimizes `|key - value|`, ties broken by lowest key
//! (spec.md §4.4).

use super::{Child, Selector, SelectorImpl, Severity, ValidationIssue};
use crate::error::{Error, Result};
use crate::header::{Header, LegalValues, TreeHeader};
use std::rc::Rc;

/// Nearest-in-value selector.
#[derive(Debug, Clone)]
pub struct NearestNode {
    parameter: String,
    keys: Vec<f64>,
    raw_keys: Vec<String>,
    children: Vec<Child>,
    tree_header: Rc<TreeHeader>,
}

impl NearestNode {
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

    fn lookup_value(&self, header: &Header) -> Result<f64> {
        let raw = header
            .get(&self.parameter)
            .ok_or_else(|| Error::MissingParameter(self.parameter.clone()))?;
        raw.trim()
            .parse()
            .map_err(|_| Error::InvalidNumber(raw.clone()))
    }

    fn nearest_index(&self, value: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, key) in self.keys.iter().enumerate() {
            let delta = (key - value).abs();
            match best {
                Some((_, best_delta)) if delta >= best_delta => {}
                _ => best = Some((i, delta)),
            }
        }
        best.map(|(i, _)| i)
    }
}

impl Selector for NearestNode {
    fn choose(&self, header: &Header) -> Result<super::Choice> {
        let value = self.lookup_value(header)?;
        for key in &self.keys {
            if !key.is_finite() {
                return Err(Error::InvalidNumber(key.to_string()));
            }
        }
        let idx = self
            .nearest_index(value)
            .ok_or_else(|| Error::InvalidNumber(self.parameter.clone()))?;
        match &self.children[idx] {
            Child::Terminal(name) => Ok(super::Choice::One(name.clone())),
            Child::Node(node) => node.choose(header),
        }
    }

    fn parameters(&self) -> &[String] {
        std::slice::from_ref(&self.parameter)
    }

    fn class_name(&self) -> &'static str {
        "GeometricallyNearest"
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
                    message: format!("unparsable GeometricallyNearest key: {raw}"),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_nearest_value() {
        let node = NearestNode::new(
            "effective_wavelength".to_string(),
            vec![
                ("1.2".to_string(), Child::Terminal("A".to_string())),
                ("1.5".to_string(), Child::Terminal("B".to_string())),
                ("5.0".to_string(), Child::Terminal("C".to_string())),
            ],
            Rc::new(TreeHeader::default()),
        )
        .unwrap();
        let mut h = Header::default();
        h.insert("effective_wavelength".to_string(), "1.4".to_string());
        assert_eq!(node.choose(&h).unwrap(), super::super::Choice::One("B".to_string()));
    }
}
