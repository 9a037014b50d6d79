//! Reconstruction errors.
//!
//! Every variant except the ones surfaced as [`crate::ir::builder::Diagnostic`]s
//! is fatal: the run stops at the first one and nothing is registered under the
//! offending alias.

use thiserror::Error;

/// Which alias table a lookup went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasTable {
    Types,
    Defs,
}

impl std::fmt::Display for AliasTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AliasTable::Types => write!(f, "type"),
            AliasTable::Defs => write!(f, "def"),
        }
    }
}

/// Fatal reconstruction error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconstructError {
    /// Unknown tag, missing required field, or a value that does not fit its field.
    #[error("malformed descriptor `{alias}`: {reason}")]
    MalformedDescriptor { alias: String, reason: String },

    /// Reference to an alias that was never registered.
    #[error("unresolved {table} alias `{alias}`")]
    UnresolvedAlias { table: AliasTable, alias: String },

    /// Wrong operand count for a fixed-arity operator.
    #[error("`{alias}`: {kind} expects {expected} operand(s), found {found}")]
    ArityMismatch {
        alias: String,
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    /// A referenced node exists but is not of the kind the descriptor requires.
    #[error("`{alias}` does not name a {expected}")]
    KindMismatch {
        alias: String,
        expected: &'static str,
    },
}

impl ReconstructError {
    pub(crate) fn malformed(alias: impl Into<String>, reason: impl Into<String>) -> Self {
        ReconstructError::MalformedDescriptor {
            alias: alias.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconstructError>;
