//! `UseAfter`: binary search over a time-sorted keyset, returning the
//! greatest key not exceeding the lookup time (spec.md §4.2).

use super::{Child, Selector, SelectorImpl, Severity, ValidationIssue};
use crate::binary_search::partition_point;
use crate::boundary::timestamp::{self, Instant};
use crate::error::{Error, Result};
use crate::header::{Header, LegalValues, TreeHeader};
use std::rc::Rc;

/// Binary-search-by-time selector.
#[derive(Debug, Clone)]
pub struct UseAfterNode {
    parameters: Vec<String>,
    keys: Vec<Instant>,
    raw_keys: Vec<String>,
    children: Vec<Child>,
    tree_header: Rc<TreeHeader>,
}

impl UseAfterNode {
    /// Builds a node from unsorted `(date_text, child)` selections,
    /// canonicalizing and sorting every key ascending.
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

    /// Concatenates this node's configured date/time fields out of `header`
    /// with single spaces, the form every key is canonicalized from.
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

    /// Index of the greatest key `<=` `lookup`, or `None` if every key
    /// exceeds it.
    fn floor_index(&self, lookup: &Instant) -> Option<usize> {
        let count = partition_point(&self.keys, |k| k <= lookup);
        if count == 0 {
            None
        } else {
            Some(count - 1)
        }
    }
}

impl Selector for UseAfterNode {
    fn choose(&self, header: &Header) -> Result<super::Choice> {
        let text = self.lookup_text(header)?;
        let lookup = timestamp::parse_date(&text)?;
        let idx = self.floor_index(&lookup).ok_or(Error::NoUseAfter)?;
        match &self.children[idx] {
            Child::Terminal(name) => Ok(super::Choice::One(name.clone())),
            Child::Node(node) => node.choose(header),
        }
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn class_name(&self) -> &'static str {
        "UseAfter"
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
        true
    }

    fn merge_with(&self, other: &SelectorImpl) -> Result<SelectorImpl> {
        let SelectorImpl::UseAfter(other) = other else {
            return Err(Error::AmbiguousMerge);
        };
        if self.parameters != other.parameters {
            return Err(Error::AmbiguousMerge);
        }

        let mut merged: Vec<(Instant, String, Child)> = self
            .keys
            .iter()
            .zip(self.raw_keys.iter())
            .zip(self.children.iter())
            .map(|((k, r), c)| (*k, r.clone(), c.clone()))
            .collect();

        for ((key, raw), child) in
            other.keys.iter().zip(other.raw_keys.iter()).zip(other.children.iter())
        {
            if let Some(slot) = merged.iter_mut().find(|(k, _, _)| k == key) {
                match (&slot.2, child) {
                    (Child::Terminal(existing), Child::Terminal(incoming)) => {
                        // Keep the lexicographically greater child; naming
                        // convention encodes recency in reference filenames.
                        if incoming > existing {
                            slot.2 = child.clone();
                        }
                    }
                    // Neither side is a terminal collision the "greater
                    // filename" rule can settle; the spec only defines
                    // recency-by-filename for terminal collisions.
                    _ => return Err(Error::AmbiguousMerge),
                }
            } else {
                merged.push((*key, raw.clone(), child.clone()));
            }
        }

        merged.sort_by(|a, b| a.0.cmp(&b.0));

        let (keys, raw_keys, children) = merged.into_iter().fold(
            (Vec::new(), Vec::new(), Vec::new()),
            |(mut ks, mut rs, mut cs), (k, r, c)| {
                ks.push(k);
                rs.push(r);
                cs.push(c);
                (ks, rs, cs)
            },
        );

        Ok(SelectorImpl::UseAfter(Self {
            parameters: self.parameters.clone(),
            keys,
            raw_keys,
            children,
            tree_header: self.tree_header.clone(),
        }))
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
        let pos = partition_point(&self.keys, |k| *k <= instant);
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
                    message: format!("unparsable UseAfter key: {raw}"),
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

    fn header(date: &str, time: &str) -> Header {
        let mut h = Header::default();
        h.insert("DATE-OBS".to_string(), date.to_string());
        h.insert("TIME-OBS".to_string(), time.to_string());
        h
    }

    fn build() -> UseAfterNode {
        UseAfterNode::new(
            vec!["DATE-OBS".to_string(), "TIME-OBS".to_string()],
            vec![
                ("2003-09-26 01:00:00".to_string(), Child::Terminal("o9s16388j_bia.fits".to_string())),
                ("2004-07-02 08:09:00".to_string(), Child::Terminal("o9t1525sj_bia.fits".to_string())),
            ],
            Rc::new(TreeHeader::default()),
        )
        .unwrap()
    }

    #[test]
    fn returns_greatest_key_leq_lookup() {
        let node = build();
        let h = header("2004-07-02", "08:08:59");
        assert_eq!(
            node.choose(&h).unwrap(),
            super::super::Choice::One("o9s16388j_bia.fits".to_string())
        );
    }

    #[test]
    fn fails_before_all_keys() {
        let node = build();
        let h = header("2000-07-02", "08:08:59");
        assert!(matches!(node.choose(&h), Err(Error::NoUseAfter)));
    }

    #[test]
    fn merge_keeps_greater_on_collision() {
        let a = UseAfterNode::new(
            vec!["DATE-OBS".to_string(), "TIME-OBS".to_string()],
            vec![("2004-07-02 08:09:00".to_string(), Child::Terminal("aaa.fits".to_string()))],
            Rc::new(TreeHeader::default()),
        )
        .unwrap();
        let b = UseAfterNode::new(
            vec!["DATE-OBS".to_string(), "TIME-OBS".to_string()],
            vec![("2004-07-02 08:09:00".to_string(), Child::Terminal("zzz.fits".to_string()))],
            Rc::new(TreeHeader::default()),
        )
        .unwrap();

        let merged = a.merge_with(&SelectorImpl::UseAfter(b)).unwrap();
        let SelectorImpl::UseAfter(merged) = merged else { panic!("expected UseAfter") };
        assert_eq!(merged.raw_key_repr(0), "2004-07-02 08:09:00");
        assert!(matches!(&merged.children[0], Child::Terminal(n) if n == "zzz.fits"));
    }

    #[test]
    fn merge_rejects_collision_between_two_nested_selectors() {
        // Both sides collide on the same key with a nested selector child;
        // there's no terminal filename to compare, so this can't be settled
        // by the "greater filename wins" rule and must raise AmbiguousMerge.
        let nested = |name: &str| {
            SelectorImpl::UseAfter(
                UseAfterNode::new(
                    vec!["DATE-OBS".to_string(), "TIME-OBS".to_string()],
                    vec![(
                        "2000-01-01 00:00:00".to_string(),
                        Child::Terminal(name.to_string()),
                    )],
                    Rc::new(TreeHeader::default()),
                )
                .unwrap(),
            )
        };

        let a = UseAfterNode::new(
            vec!["DATE-OBS".to_string(), "TIME-OBS".to_string()],
            vec![(
                "2004-07-02 08:09:00".to_string(),
                Child::Node(Box::new(nested("aaa.fits"))),
            )],
            Rc::new(TreeHeader::default()),
        )
        .unwrap();
        let b = UseAfterNode::new(
            vec!["DATE-OBS".to_string(), "TIME-OBS".to_string()],
            vec![(
                "2004-07-02 08:09:00".to_string(),
                Child::Node(Box::new(nested("zzz.fits"))),
            )],
            Rc::new(TreeHeader::default()),
        )
        .unwrap();

        assert!(matches!(
            a.merge_with(&SelectorImpl::UseAfter(b)),
            Err(Error::AmbiguousMerge)
        ));
    }
}
