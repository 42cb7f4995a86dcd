//! Error types for model mutation

use thiserror::Error;

/// Errors that can occur when mutating the molecular model
#[derive(Error, Debug, Clone)]
pub enum MolError {
    /// Atom index is out of bounds
    #[error("Atom index {0} is out of bounds (max: {1})")]
    AtomIndexOutOfBounds(u32, usize),

    /// Bond index is out of bounds
    #[error("Bond index {0} is out of bounds (max: {1})")]
    BondIndexOutOfBounds(u32, usize),

    /// Frame index is out of bounds
    #[error("Frame index {0} is out of bounds (max: {1})")]
    FrameIndexOutOfBounds(usize, usize),

    /// Invalid element symbol
    #[error("Invalid element symbol: {0}")]
    InvalidElement(String),

    /// Invalid bond (self-loop, bad order, or out-of-range endpoint)
    #[error("Invalid bond: atom1={0}, atom2={1}")]
    InvalidBond(u32, u32),

    /// Operation requires at least one frame
    #[error("Collection has no atom sets")]
    NoAtomSets,

    /// Symbolic atom lookup failed
    #[error("Unknown atom name in current frame: {0}")]
    UnknownAtomName(String),
}

impl MolError {
    /// Create an atom out of bounds error
    pub fn atom_out_of_bounds(index: u32, max: usize) -> Self {
        MolError::AtomIndexOutOfBounds(index, max)
    }

    /// Create a frame out of bounds error
    pub fn frame_out_of_bounds(index: usize, max: usize) -> Self {
        MolError::FrameIndexOutOfBounds(index, max)
    }
}

/// Result type for model operations
pub type MolResult<T> = Result<T, MolError>;
