//! `SelectVersion`: picks the first relation, in ascending order, that
//! admits the lookup version (spec.md §4.7).

use super::{Child, Selector, SelectorImpl, Severity, ValidationIssue};
use crate::error::{Error, Result};
use crate::header::{Header, LegalValues, TreeHeader};
use crate::version::VersionRelation;
use std::rc::Rc;

/// Version-relation selector.
#[derive(Debug, Clone)]
pub struct SelectVersionNode {
    parameter: String,
    relations: Vec<VersionRelation>,
    raw_keys: Vec<String>,
    children: Vec<Child>,
    tree_header: Rc<TreeHeader>,
}

impl SelectVersionNode {
    /// Builds a node from unsorted `(relation_text, child)` selections.
    ///
    /// # Errors
    /// Returns `Error::InvalidVersion` if any key fails to parse.
    pub fn new(
        parameter: String,
        selections: Vec<(String, Child)>,
        tree_header: Rc<TreeHeader>,
    ) -> Result<Self> {
        let mut parsed = Vec::with_capacity(selections.len());
        for (raw, child) in selections {
            let rel = VersionRelation::parse(&raw)?;
            parsed.push((rel, raw, child));
        }
        parsed.sort_by(|a, b| a.0.try_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut relations = Vec::with_capacity(parsed.len());
        let mut raw_keys = Vec::with_capacity(parsed.len());
        let mut children = Vec::with_capacity(parsed.len());
        for (rel, raw, child) in parsed {
            relations.push(rel);
            raw_keys.push(raw);
            children.push(child);
        }

        Ok(Self { parameter, relations, raw_keys, children, tree_header })
    }
}

impl Selector for SelectVersionNode {
    fn choose(&self, header: &Header) -> Result<super::Choice> {
        let raw = header
            .get(&self.parameter)
            .ok_or_else(|| Error::MissingParameter(self.parameter.clone()))?;
        let lookup = crate::boundary::version_literal::literal_eval(raw)?;

        for (i, rel) in self.relations.iter().enumerate() {
            if rel.admits(&lookup)? {
                return match &self.children[i] {
                    Child::Terminal(name) => Ok(super::Choice::One(name.clone())),
                    Child::Node(node) => node.choose(header),
                };
            }
        }
        Err(Error::NoMatch)
    }

    fn parameters(&self) -> &[String] {
        std::slice::from_ref(&self.parameter)
    }

    fn class_name(&self) -> &'static str {
        "SelectVersion"
    }

    fn len(&self) -> usize {
        self.relations.len()
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
        Ok(raw.trim().to_string())
    }

    fn find_index(&self, raw_key: &str) -> Option<usize> {
        self.raw_keys.iter().position(|k| k.trim() == raw_key.trim())
    }

    fn insert_sorted(&mut self, raw_key: &str, child: Child) -> Result<()> {
        let rel = VersionRelation::parse(raw_key)?;
        let pos = self
            .relations
            .iter()
            .position(|r| rel.try_cmp(r).map(|o| o != std::cmp::Ordering::Greater).unwrap_or(false))
            .unwrap_or(self.relations.len());
        self.relations.insert(pos, rel);
        self.raw_keys.insert(pos, raw_key.to_string());
        self.children.insert(pos, child);
        Ok(())
    }

    fn validate_self(&self, _legal: &LegalValues) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for raw in &self.raw_keys {
            if VersionRelation::parse(raw).is_err() {
                issues.push(ValidationIssue {
                    path: vec![self.parameter.clone()],
                    message: format!("unparsable SelectVersion key: {raw}"),
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

    fn build() -> SelectVersionNode {
        SelectVersionNode::new(
            "sw_version".to_string(),
            vec![
                ("<3.1".to_string(), Child::Terminal("X".to_string())),
                ("<5".to_string(), Child::Terminal("Y".to_string())),
                ("default".to_string(), Child::Terminal("Z".to_string())),
            ],
            Rc::new(TreeHeader::default()),
        )
        .unwrap()
    }

    fn lookup(node: &SelectVersionNode, version: &str) -> super::super::Choice {
        let mut h = Header::default();
        h.insert("sw_version".to_string(), version.to_string());
        node.choose(&h).unwrap()
    }

    #[test]
    fn scenario_5() {
        assert_eq!(lookup(&build(), "2.0"), super::super::Choice::One("X".to_string()));
        assert_eq!(lookup(&build(), "4.5"), super::super::Choice::One("Y".to_string()));
        assert_eq!(lookup(&build(), "5"), super::super::Choice::One("Z".to_string()));
    }
}
