//! Variant registry keyed by short name (spec.md §6: "Variant registry keyed
//! by short name: `Match`, `UseAfter`, `SelectVersion`, `ClosestTime`,
//! `GeometricallyNearest`, `Bracket`").
//!
//! Mirrors the teacher's `compaction::{Fifo, Leveled, SizeTiered}`
//! re-export-by-name pattern (`compaction/mod.rs`): a flat list of short
//! names, each naming exactly one concrete node constructor, consulted by
//! [`crate::parameters::Parameters::instantiate`] and by `Selector::modify`
//! when a class list names the node to build for a missing branch.

use crate::error::{Error, Result};
use crate::header::{Header, LegalValues, TreeHeader};
use crate::selector::{
    BracketNode, Child, ClosestTimeNode, MatchNode, NearestNode, SelectVersionNode, SelectorImpl,
    UseAfterNode,
};
use std::rc::Rc;

/// Every short name the registry recognizes, in no particular order.
pub const VARIANTS: &[&str] =
    &["Match", "UseAfter", "SelectVersion", "ClosestTime", "GeometricallyNearest", "Bracket"];

/// Is `name` a recognized Selector variant short name?
#[must_use]
pub fn is_known(name: &str) -> bool {
    VARIANTS.contains(&name)
}

fn single_param(params: &[String], class_name: &str) -> Result<String> {
    params
        .first()
        .cloned()
        .ok_or_else(|| Error::Modification(format!("{class_name} requires one parameter")))
}

fn single_field(fields: Vec<String>, class_name: &str) -> Result<String> {
    if fields.len() != 1 {
        return Err(Error::Modification(format!(
            "{class_name} key must have exactly one field, got {}",
            fields.len()
        )));
    }
    Ok(fields.into_iter().next().unwrap_or_default())
}

/// Builds a node of variant `class_name` from a complete set of selections,
/// used by [`crate::parameters::Parameters::instantiate`] to assemble one
/// tree level bottom-up.
///
/// # Errors
/// Returns `Error::Modification` for an unrecognized `class_name`, or the
/// variant's own construction error (`KeyArity`, `InvalidDateTime`, ...).
pub fn build(
    class_name: &str,
    params: Vec<String>,
    selections: Vec<(Vec<String>, Child)>,
    tree_header: Rc<TreeHeader>,
) -> Result<SelectorImpl> {
    match class_name {
        "Match" => Ok(SelectorImpl::Match(MatchNode::new(params, selections, tree_header)?)),
        "UseAfter" => {
            let sel = selections
                .into_iter()
                .map(|(fields, child)| Ok((single_field(fields, "UseAfter")?, child)))
                .collect::<Result<Vec<_>>>()?;
            Ok(SelectorImpl::UseAfter(UseAfterNode::new(params, sel, tree_header)?))
        }
        "ClosestTime" => {
            let sel = selections
                .into_iter()
                .map(|(fields, child)| Ok((single_field(fields, "ClosestTime")?, child)))
                .collect::<Result<Vec<_>>>()?;
            Ok(SelectorImpl::ClosestTime(ClosestTimeNode::new(params, sel, tree_header)?))
        }
        "GeometricallyNearest" => {
            let param = single_param(&params, "GeometricallyNearest")?;
            let sel = selections
                .into_iter()
                .map(|(fields, child)| Ok((single_field(fields, "GeometricallyNearest")?, child)))
                .collect::<Result<Vec<_>>>()?;
            Ok(SelectorImpl::GeometricallyNearest(NearestNode::new(param, sel, tree_header)?))
        }
        "Bracket" => {
            let param = single_param(&params, "Bracket")?;
            let sel = selections
                .into_iter()
                .map(|(fields, child)| Ok((single_field(fields, "Bracket")?, child)))
                .collect::<Result<Vec<_>>>()?;
            Ok(SelectorImpl::Bracket(BracketNode::new(param, sel, tree_header)?))
        }
        "SelectVersion" => {
            let param = single_param(&params, "SelectVersion")?;
            let sel = selections
                .into_iter()
                .map(|(fields, child)| Ok((single_field(fields, "SelectVersion")?, child)))
                .collect::<Result<Vec<_>>>()?;
            Ok(SelectorImpl::SelectVersion(SelectVersionNode::new(param, sel, tree_header)?))
        }
        other => Err(Error::Modification(format!("unknown selector variant {other}"))),
    }
}

/// Builds a fresh single-selection node of variant `class_name` directly out
/// of a lookup/edit header, used by `Selector::modify` to create a missing
/// intermediate layer (spec.md §4.8 step 5). The single selection's key is
/// derived from `header` the same way `make_key` would derive it for an
/// existing node of that variant.
///
/// # Errors
/// Returns `Error::MissingParameter` if `header` lacks a field `params`
/// names, `Error::BadValue` if a Match field fails legality, or
/// `Error::Modification` for an unrecognized `class_name`.
pub fn build_single(
    class_name: &str,
    params: Vec<String>,
    header: &Header,
    legal: &LegalValues,
    child: Child,
    tree_header: Rc<TreeHeader>,
) -> Result<SelectorImpl> {
    match class_name {
        "Match" => {
            let mut fields = Vec::with_capacity(params.len());
            for param in &params {
                let value = header
                    .get(param)
                    .ok_or_else(|| Error::MissingParameter(param.clone()))?;
                let conditioned = crate::boundary::value::condition_value(value);
                if let Some(legal_values) = legal.get(param) {
                    if !crate::boundary::value::matches_legal_with_float_drift(
                        &conditioned,
                        legal_values,
                    ) {
                        return Err(Error::BadValue {
                            parameter: param.clone(),
                            value: value.clone(),
                        });
                    }
                }
                fields.push(conditioned);
            }
            Ok(SelectorImpl::Match(MatchNode::new(params, vec![(fields, child)], tree_header)?))
        }
        "UseAfter" | "ClosestTime" => {
            let mut parts = Vec::with_capacity(params.len());
            for param in &params {
                parts.push(
                    header
                        .get(param)
                        .cloned()
                        .ok_or_else(|| Error::MissingParameter(param.clone()))?,
                );
            }
            let text = parts.join(" ");
            if class_name == "UseAfter" {
                Ok(SelectorImpl::UseAfter(UseAfterNode::new(params, vec![(text, child)], tree_header)?))
            } else {
                Ok(SelectorImpl::ClosestTime(ClosestTimeNode::new(
                    params,
                    vec![(text, child)],
                    tree_header,
                )?))
            }
        }
        "GeometricallyNearest" | "Bracket" | "SelectVersion" => {
            let param = single_param(&params, class_name)?;
            let value = header
                .get(&param)
                .cloned()
                .ok_or_else(|| Error::MissingParameter(param.clone()))?;
            match class_name {
                "GeometricallyNearest" => Ok(SelectorImpl::GeometricallyNearest(NearestNode::new(
                    param,
                    vec![(value, child)],
                    tree_header,
                )?)),
                "Bracket" => Ok(SelectorImpl::Bracket(BracketNode::new(
                    param,
                    vec![(value, child)],
                    tree_header,
                )?)),
                _ => Ok(SelectorImpl::SelectVersion(SelectVersionNode::new(
                    param,
                    vec![(value, child)],
                    tree_header,
                )?)),
            }
        }
        other => Err(Error::Modification(format!("unknown selector variant {other}"))),
    }
}
