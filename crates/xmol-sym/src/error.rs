//! Error types for symmetry operations

use thiserror::Error;

/// Errors from operator parsing and symmetry application
#[derive(Error, Debug, Clone)]
pub enum SymError {
    /// A Jones-Faithful operator string could not be parsed
    #[error("Invalid symmetry operator {0:?}: {1}")]
    InvalidOperator(String, String),

    /// Space group name not in the built-in table
    #[error("Unknown space group: {0:?}")]
    UnknownSpaceGroup(String),

    /// Unknown lattice centering code
    #[error("Unknown lattice centering code: {0}")]
    UnknownLatticeCode(i8),

    /// Symmetry application needs a unit cell
    #[error("No unit cell available")]
    NoUnitCell,

    /// Symmetry application needs at least one frame
    #[error("Collection has no atom sets")]
    NoAtomSets,
}

impl SymError {
    pub fn invalid_operator(op: &str, why: &str) -> Self {
        SymError::InvalidOperator(op.to_string(), why.to_string())
    }
}

/// Result type for symmetry operations
pub type SymResult<T> = Result<T, SymError>;
