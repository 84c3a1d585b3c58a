//! `Match`: the algorithmic centerpiece — multi-field weighted winnowing
//! match with ambiguity handling and dynamic sibling merge (spec.md §4.6).

use super::{Child, Selector, SelectorImpl, Severity, ValidationIssue};
use crate::boundary::value::condition_value;
use crate::error::{Error, Result};
use crate::header::{Header, LegalValues, TreeHeader};
use crate::matcher::{self, Matcher, MatcherImpl};
use std::rc::Rc;

const FIELD_SEP: char = '\u{1}';

/// One Match selection: the raw (pre-conditioning) fields, the conditioned
/// fields used for addressing, and the compiled matchers used at lookup.
#[derive(Debug, Clone)]
struct Key {
    raw: Vec<String>,
    canonical: Vec<String>,
    matchers: Vec<MatcherImpl>,
}

/// Multi-field weighted winnowing match selector.
#[derive(Debug, Clone)]
pub struct MatchNode {
    parameters: Vec<String>,
    keys: Vec<Key>,
    children: Vec<Child>,
    tree_header: Rc<TreeHeader>,
}

/// Conditions one raw key field: substitutions first, then pass braced /
/// parenthesised / hashed / between / inequality / wildcard syntax through
/// verbatim, splitting and re-joining `|` alternations, and running plain
/// literal fragments through `condition_value` (spec.md §4.6).
fn condition_field(raw: &str, substitution: Option<&str>) -> String {
    let raw = substitution.unwrap_or(raw);

    if raw == "N/A" || raw == "*" {
        return raw.to_string();
    }
    if raw.starts_with('{') || raw.starts_with('(') || raw.starts_with('#') {
        return raw.to_string();
    }
    if raw.starts_with("between ") {
        return raw.to_string();
    }
    if raw.starts_with('<') || raw.starts_with('>') {
        return raw.to_string();
    }
    if raw.contains('|') {
        return raw
            .split('|')
            .map(|part| condition_field(part.trim(), None))
            .collect::<Vec<_>>()
            .join("|");
    }

    condition_value(raw)
}

fn format_tuple(fields: &[String]) -> String {
    format!("({})", fields.join(", "))
}

/// Counts the positions where exactly one of `a`, `b` is `"N/A"`.
fn diverging_na_positions(a: &[String], b: &[String]) -> usize {
    a.iter()
        .zip(b.iter())
        .filter(|(x, y)| (*x == "N/A") != (*y == "N/A"))
        .count()
}

/// `match_superset(a, b)`: does `a` match every header `b` matches
/// (spec.md §4.6)?
fn match_superset(a: &[String], b: &[String]) -> bool {
    a.iter().zip(b.iter()).all(|(af, bf)| {
        if af == bf {
            return true;
        }
        if af == "*" {
            return true;
        }
        if bf == "N/A" {
            return true;
        }
        if af == "N/A" && bf == "*" {
            return true;
        }
        if bf == "*" {
            // af != "*" here (handled above), so a cannot match everything b does
            return false;
        }
        let a_set: std::collections::BTreeSet<&str> = af.split('|').collect();
        let b_set: std::collections::BTreeSet<&str> = bf.split('|').collect();
        a_set.is_superset(&b_set) && a_set != b_set
    })
}

impl MatchNode {
    /// Builds a node from unsorted `(raw_fields, child)` selections.
    ///
    /// # Errors
    /// Returns `Error::KeyArity` if a key's field count doesn't match
    /// `parameters.len()`, or a matcher-factory error for a malformed field.
    pub fn new(
        parameters: Vec<String>,
        selections: Vec<(Vec<String>, Child)>,
        tree_header: Rc<TreeHeader>,
    ) -> Result<Self> {
        let mut keys = Vec::with_capacity(selections.len());
        let mut children = Vec::with_capacity(selections.len());

        for (raw, child) in selections {
            if raw.len() != parameters.len() {
                return Err(Error::KeyArity { expected: parameters.len(), got: raw.len() });
            }
            let mut canonical = Vec::with_capacity(raw.len());
            let mut matchers = Vec::with_capacity(raw.len());
            for (i, field) in raw.iter().enumerate() {
                let substitution = tree_header
                    .substitutions
                    .as_ref()
                    .and_then(|s| s.get(&parameters[i]))
                    .and_then(|m| m.get(field))
                    .map(String::as_str);
                let cond = condition_field(field, substitution);
                matchers.push(matcher::build(&cond)?);
                canonical.push(cond);
            }
            keys.push(Key { raw, canonical, matchers });
            children.push(child);
        }

        let mut order: Vec<usize> = (0..keys.len()).collect();
        order.sort_by(|&a, &b| keys[a].canonical.cmp(&keys[b].canonical));
        let keys = order.iter().map(|&i| keys[i].clone()).collect::<Vec<_>>();
        let children = order.iter().map(|&i| children[i].clone()).collect::<Vec<_>>();

        Ok(Self { parameters, keys, children, tree_header })
    }

    fn na_allowed(&self, param_index: usize) -> bool {
        self.keys
            .iter()
            .any(|k| k.raw[param_index].split('|').any(|f| f.trim() == "N/A"))
    }

    /// A header value is legal for parameter `param_index` if any declared
    /// selection's compiled matcher for that parameter doesn't miss on it —
    /// the same test `choose`'s winnowing pass runs, so a pattern field
    /// (glob, regex, between, hashed, wildcard/don't-care, or an embedded-`*`
    /// glob like `"F1*W"`) is recognized as legal exactly when it would also
    /// survive winnowing, rather than by re-deriving its syntax here.
    fn value_is_legal(&self, param_index: usize, value: &str) -> bool {
        let conditioned = condition_value(value);
        self.keys.iter().any(|key| key.matchers[param_index].test(&conditioned) >= 0)
    }

    /// Resolves one weight-tied survivor group (spec.md §4.6 step 5): a
    /// singleton recurses into its child; multiple terminal survivors return
    /// `Many`; multiple mergeable (`UseAfter`) survivors merge and recurse;
    /// anything else is `AmbiguousMatch`.
    fn resolve_group(&self, group: &[usize], header: &Header) -> Result<super::Choice> {
        if group.len() == 1 {
            return match &self.children[group[0]] {
                Child::Terminal(name) => Ok(super::Choice::One(name.clone())),
                Child::Node(node) => node.choose(header),
            };
        }

        if group.iter().all(|&i| matches!(self.children[i], Child::Terminal(_))) {
            let names = group
                .iter()
                .map(|&i| match &self.children[i] {
                    Child::Terminal(name) => name.clone(),
                    Child::Node(_) => unreachable!(),
                })
                .collect();
            return Ok(super::Choice::Many(names));
        }

        let all_use_after = group.iter().all(|&i| {
            matches!(&self.children[i], Child::Node(n) if matches!(**n, SelectorImpl::UseAfter(_)))
        });

        if all_use_after {
            let mut iter = group.iter();
            let first = iter.next().expect("group is non-empty");
            let Child::Node(first_node) = &self.children[*first] else {
                unreachable!()
            };
            let mut merged = (**first_node).clone();
            for &i in iter {
                let Child::Node(node) = &self.children[i] else { unreachable!() };
                merged = merged.merge_with(node)?;
            }
            return merged.choose(header);
        }

        let conflicting = group.iter().map(|&i| format_tuple(&self.keys[i].raw)).collect();
        Err(Error::AmbiguousMatch(conflicting))
    }
}

impl Selector for MatchNode {
    fn choose(&self, header: &Header) -> Result<super::Choice> {
        for (i, param) in self.parameters.iter().enumerate() {
            match header.get(param) {
                None => {
                    if !self.na_allowed(i) {
                        return Err(Error::MissingParameter(param.clone()));
                    }
                }
                Some(value) => {
                    if !self.value_is_legal(i, value) {
                        return Err(Error::BadValue {
                            parameter: param.clone(),
                            value: value.clone(),
                        });
                    }
                }
            }
        }

        let mut survivors: Vec<(usize, i32)> = (0..self.keys.len()).map(|i| (i, 0)).collect();
        for (i, param) in self.parameters.iter().enumerate() {
            let value = header
                .get(param)
                .map(|v| condition_value(v))
                .unwrap_or_else(|| "N/A".to_string());
            survivors.retain_mut(|(idx, weight)| {
                let outcome = self.keys[*idx].matchers[i].test(&value);
                if outcome < 0 {
                    false
                } else {
                    *weight -= outcome;
                    true
                }
            });
        }

        if survivors.is_empty() {
            return Err(Error::NoMatch);
        }

        survivors.sort_by_key(|(_, w)| *w);
        let mut groups: Vec<(i32, Vec<usize>)> = Vec::new();
        for (idx, weight) in survivors {
            match groups.last_mut() {
                Some((w, indices)) if *w == weight => indices.push(idx),
                _ => groups.push((weight, vec![idx])),
            }
        }

        // spec.md §4.6 step 5: resolve from best group toward worst, returning
        // the first group that resolves successfully (spec.md §9: "produce
        // ranked groups eagerly, iterate").
        let mut last_err = Error::NoMatch;
        for (_, group) in &groups {
            match self.resolve_group(group, header) {
                Ok(choice) => return Ok(choice),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn class_name(&self) -> &'static str {
        "Match"
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn path_segment(&self, index: usize) -> Vec<(String, String)> {
        self.parameters
            .iter()
            .cloned()
            .zip(self.keys[index].raw.iter().cloned())
            .collect()
    }

    fn raw_key_repr(&self, index: usize) -> String {
        format_tuple(&self.keys[index].raw)
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

    fn make_key(&self, header: &Header, legal: &LegalValues) -> Result<String> {
        let mut fields = Vec::with_capacity(self.parameters.len());
        for param in &self.parameters {
            let value = header
                .get(param)
                .ok_or_else(|| Error::MissingParameter(param.clone()))?;
            if let Some(values) = legal.get(param) {
                if !crate::boundary::value::matches_legal_with_float_drift(
                    &condition_value(value),
                    values,
                ) {
                    return Err(Error::BadValue { parameter: param.clone(), value: value.clone() });
                }
            }
            fields.push(condition_value(value));
        }
        Ok(fields.join(&FIELD_SEP.to_string()))
    }

    fn find_index(&self, raw_key: &str) -> Option<usize> {
        let fields: Vec<String> = raw_key.split(FIELD_SEP).map(str::to_string).collect();
        self.keys.iter().position(|k| k.canonical == fields)
    }

    fn insert_sorted(&mut self, raw_key: &str, child: Child) -> Result<()> {
        let fields: Vec<String> = raw_key.split(FIELD_SEP).map(str::to_string).collect();
        if fields.len() != self.parameters.len() {
            return Err(Error::KeyArity { expected: self.parameters.len(), got: fields.len() });
        }
        let mut matchers = Vec::with_capacity(fields.len());
        for field in &fields {
            matchers.push(matcher::build(field)?);
        }
        let pos = self.keys.partition_point(|k| k.canonical < fields);
        self.keys.insert(pos, Key { raw: fields.clone(), canonical: fields, matchers });
        self.children.insert(pos, child);
        Ok(())
    }

    fn validate_self(&self, _legal: &LegalValues) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for i in 0..self.keys.len() {
            for j in 0..self.keys.len() {
                if i == j {
                    continue;
                }
                // j is a strict superset of i: j would win any header i also
                // admits, unless their weights actually diverge (spec.md §9:
                // an `N/A` on exactly one side changes the weight, so e.g.
                // `(*, 2)` vs `(N/A, 2)` are NOT ambiguous despite (*) being
                // a superset of (N/A) position-wise).
                if match_superset(&self.keys[j].canonical, &self.keys[i].canonical)
                    && diverging_na_positions(&self.keys[i].canonical, &self.keys[j].canonical) == 0
                {
                    issues.push(ValidationIssue {
                        path: self.parameters.clone(),
                        message: format!(
                            "special case: {} is shadowed by {}",
                            format_tuple(&self.keys[i].raw),
                            format_tuple(&self.keys[j].raw)
                        ),
                        severity: Severity::Warning,
                    });
                }
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

    fn header(pairs: &[(&str, &str)]) -> Header {
        let mut h = Header::default();
        for (k, v) in pairs {
            h.insert((*k).to_string(), (*v).to_string());
        }
        h
    }

    #[test]
    fn na_row_loses_to_exact_match() {
        let node = MatchNode::new(
            vec!["foo".to_string(), "bar".to_string()],
            vec![
                (vec!["1.0".to_string(), "N/A".to_string()], Child::Terminal("100".to_string())),
                (vec!["1.0".to_string(), "2.0".to_string()], Child::Terminal("200".to_string())),
                (vec!["4.0".to_string(), "*".to_string()], Child::Terminal("300".to_string())),
            ],
            Rc::new(TreeHeader::default()),
        )
        .unwrap();

        let h = header(&[("foo", "1.0"), ("bar", "2.0")]);
        assert_eq!(node.choose(&h).unwrap(), super::super::Choice::One("200".to_string()));
    }

    #[test]
    fn missing_parameter_errors_without_na() {
        let node = MatchNode::new(
            vec!["foo".to_string()],
            vec![(vec!["1.0".to_string()], Child::Terminal("100".to_string()))],
            Rc::new(TreeHeader::default()),
        )
        .unwrap();
        let h = Header::default();
        assert!(matches!(node.choose(&h), Err(Error::MissingParameter(_))));
    }

    #[test]
    fn star_and_na_do_not_collide_on_weight() {
        // (*, 2) and (N/A, 2): a = * is a position-wise superset of a = N/A,
        // but position 0 diverges on N/A-ness, so this must NOT be flagged
        // as a special case (spec.md §9 open question, preserved exactly).
        let node = MatchNode::new(
            vec!["foo".to_string(), "bar".to_string()],
            vec![
                (vec!["*".to_string(), "2.0".to_string()], Child::Terminal("A".to_string())),
                (vec!["N/A".to_string(), "2.0".to_string()], Child::Terminal("B".to_string())),
            ],
            Rc::new(TreeHeader::default()),
        )
        .unwrap();
        let issues = node.validate_self(&LegalValues::default());
        assert!(issues.is_empty());
    }

    #[test]
    fn embedded_glob_key_is_legal() {
        // "F1*W" has its `*` embedded, not a bare wildcard field -- it must
        // still be recognized as a pattern during legality checking, not
        // rejected as a literal that doesn't equal the header value.
        let node = MatchNode::new(
            vec!["FILTER".to_string()],
            vec![(vec!["F1*W".to_string()], Child::Terminal("flat.fits".to_string()))],
            Rc::new(TreeHeader::default()),
        )
        .unwrap();
        let h = header(&[("FILTER", "F140W")]);
        assert_eq!(node.choose(&h).unwrap(), super::super::Choice::One("flat.fits".to_string()));
    }

    #[test]
    fn falls_through_to_next_group_when_best_group_fails() {
        use crate::selector::UseAfterNode;

        let best = UseAfterNode::new(
            vec!["DATE-OBS".to_string()],
            vec![("2099-01-01".to_string(), Child::Terminal("from_best.fits".to_string()))],
            Rc::new(TreeHeader::default()),
        )
        .unwrap();

        let node = MatchNode::new(
            vec!["foo".to_string()],
            vec![
                (vec!["A".to_string()], Child::Node(Box::new(SelectorImpl::UseAfter(best)))),
                (vec!["N/A".to_string()], Child::Terminal("fallback.fits".to_string())),
            ],
            Rc::new(TreeHeader::default()),
        )
        .unwrap();

        // foo="A" wins the best (most negative) weight group, but its
        // UseAfter child can't resolve for this DATE-OBS, so choose must
        // fall through to the next-worse group's terminal instead of
        // propagating the inner NoUseAfter.
        let h = header(&[("foo", "A"), ("DATE-OBS", "2000-01-01")]);
        assert_eq!(
            node.choose(&h).unwrap(),
            super::super::Choice::One("fallback.fits".to_string())
        );
    }

    #[test]
    fn ambiguous_terminal_survivors_return_many() {
        let node = MatchNode::new(
            vec!["foo".to_string()],
            vec![
                (vec!["A|B".to_string()], Child::Terminal("one".to_string())),
                (vec!["A|B".to_string()], Child::Terminal("two".to_string())),
            ],
            Rc::new(TreeHeader::default()),
        )
        .unwrap();
        let h = header(&[("foo", "A")]);
        match node.choose(&h).unwrap() {
            super::super::Choice::Many(mut names) => {
                names.sort();
                assert_eq!(names, vec!["one".to_string(), "two".to_string()]);
            }
            other => panic!("expected Many, got {other:?}"),
        }
    }
}
