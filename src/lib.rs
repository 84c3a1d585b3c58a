// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A reference-file selection engine for calibration rule trees.
//!
//! ##### NOTE
//!
//! > This crate is the decision core only: it resolves an observation
//! > header against a pre-built rule tree to a reference filename (or a
//! > bracketing pair, or an ambiguous group). It does not parse rule files,
//! > fetch reference artifacts, or manage a local cache — those are
//! > separate front-end and retrieval concerns that consume this crate.
//!
//! ##### About
//!
//! The engine is a closed family of six [`Selector`] node variants —
//! [`selector::MatchNode`], [`selector::UseAfterNode`],
//! [`selector::ClosestTimeNode`], [`selector::NearestNode`],
//! [`selector::BracketNode`], [`selector::SelectVersionNode`] — each
//! implementing a different matching discipline. Selectors nest inside one
//! another to arbitrary depth; a tree's root is resolved against a runtime
//! [`Header`] by calling [`Selector::choose`].
//!
//! # Example usage
//!
//! ```
//! use refselect::header::{Header, TreeHeader};
//! use refselect::selector::{Child, Selector, SelectVersionNode};
//! use std::rc::Rc;
//!
//! let node = SelectVersionNode::new(
//!     "sw_version".to_string(),
//!     vec![
//!         ("<5".to_string(), Child::Terminal("cref_flatfield_73.fits".to_string())),
//!         ("default".to_string(), Child::Terminal("cref_flatfield_123.fits".to_string())),
//!     ],
//!     Rc::new(TreeHeader::default()),
//! )?;
//!
//! let mut header = Header::default();
//! header.insert("sw_version".to_string(), "6.0".to_string());
//!
//! assert_eq!(node.choose(&header)?.into_single()?, "cref_flatfield_123.fits");
//! #
//! # Ok::<(), refselect::Error>(())
//! ```
//!
//! Selectors are designed to be nestable and can describe rules of arbitrary
//! type and complexity; see `tests/scenarios.rs` for a worked three-level
//! example (`GeometricallyNearest` over `ClosestTime` over `SelectVersion`).

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

mod binary_search;
pub mod boundary;
mod error;
pub mod header;
pub mod matcher;
pub mod parameters;
pub mod registry;
pub mod selector;
pub mod version;

pub use error::{Error, Result};
pub use header::{Header, LegalValues, Substitutions, TreeHeader};
pub use parameters::{ParamChild, Parameters};
pub use selector::{Child, Choice, Selector, SelectorImpl};
