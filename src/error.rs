// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::version::VersionLiteral;

/// Represents errors that can occur while building or evaluating a selector tree
#[derive(Debug)]
pub enum Error {
    /// A lookup header is missing a field a node requires
    MissingParameter(String),

    /// A header field's value is not among the legal values for that parameter
    BadValue {
        /// Parameter name
        parameter: String,
        /// Offending value
        value: String,
    },

    /// A Match selector winnowed every selection away
    NoMatch,

    /// A UseAfter lookup time precedes every key
    NoUseAfter,

    /// Two or more equal-weight Match survivors could not be merged
    AmbiguousMatch(Vec<String>),

    /// `merge` was attempted on a Selector variant that does not support it
    AmbiguousMerge,

    /// A key or header value could not be parsed as a date/time
    InvalidDateTime(String),

    /// A key or header value could not be parsed as a number
    InvalidNumber(String),

    /// A version literal could not be parsed, or two incompatible version
    /// literal shapes were compared
    InvalidVersion(String),

    /// Two version literals could not be ordered against each other
    IncompatibleVersion(VersionLiteral, VersionLiteral),

    /// A Match key's field count does not match its selector's parameter count
    KeyArity {
        /// Number of declared parameters
        expected: usize,
        /// Number of fields the key provided
        got: usize,
    },

    /// A collected-errors bucket from `validate` (trap mode)
    ValidationFailure(Vec<String>),

    /// A `modify` call violated the edit contract (e.g. empty class list
    /// while trying to create a missing branch)
    Modification(String),

    /// A regular expression failed to compile
    Regex(regex::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SelectorError: {self:?}")
    }
}

impl std::error::Error for Error {}

impl From<regex::Error> for Error {
    fn from(value: regex::Error) -> Self {
        Self::Regex(value)
    }
}

/// Selector engine result
pub type Result<T> = std::result::Result<T, Error>;
