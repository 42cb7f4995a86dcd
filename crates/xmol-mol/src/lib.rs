//! xmol molecular data structures
//!
//! The unified intermediate model that every format reader populates:
//!
//! - [`Atom`] - per-atom properties, coordinates, symmetry membership
//! - [`Bond`] - connectivity with order sentinels
//! - [`Structure`] - helix/sheet/turn annotations
//! - [`AtomSetCollection`] - the frame-partitioned container
//!
//! Atoms and bonds live in flat append-only arrays; atom sets (frames)
//! partition the atom array by `atom_set_index`. Collections are built by
//! exactly one reader and frozen with [`AtomSetCollection::finish`].
//!
//! # Example
//!
//! ```rust
//! use xmol_mol::{AtomSetCollection, AtomBuilder, BondOrder};
//!
//! let mut col = AtomSetCollection::new("xyz");
//! col.new_atom_set();
//! let o = col.add_atom(AtomBuilder::new().name("O").element_symbol("O").position(0.0, 0.0, 0.0).build());
//! let h = col.add_atom(AtomBuilder::new().name("H").element_symbol("H").position(0.96, 0.0, 0.0).build());
//! col.add_bond(o, h, BondOrder::Single);
//! col.finish();
//! assert_eq!(col.atom_count(), 2);
//! ```

mod atom;
mod bitset;
mod bond;
mod collection;
pub mod element;
mod error;
mod index;
mod structure;

pub use atom::{Atom, AtomBuilder};
pub use bitset::BitSet;
pub use bond::{Bond, BondOrder};
pub use collection::{AtomSetCollection, AtomSetInfo};
pub use error::{MolError, MolResult};
pub use index::{AtomIndex, BondIndex, FrameIndex, INVALID_INDEX};
pub use structure::{Structure, StructureKind};

/// Commonly used types
pub mod prelude {
    pub use crate::atom::{Atom, AtomBuilder};
    pub use crate::bond::{Bond, BondOrder};
    pub use crate::collection::AtomSetCollection;
    pub use crate::error::{MolError, MolResult};
    pub use crate::index::{AtomIndex, BondIndex, FrameIndex};
    pub use crate::structure::{Structure, StructureKind};
}
