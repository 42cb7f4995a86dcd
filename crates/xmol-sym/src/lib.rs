//! xmol crystallographic symmetry
//!
//! Everything between a file's symmetry header records and a fully
//! expanded frame:
//!
//! - [`SymOp`] - Jones-Faithful operator parsing and application
//! - [`UnitCell`] - fractional/Cartesian conversion
//! - [`SpaceGroup`] - operator accumulation, centering, name lookup
//! - [`CellRange`] / [`PackMode`] - lattice descriptors
//! - [`apply_symmetry`] - the expansion engine
//!
//! # Example
//!
//! ```rust
//! use xmol_sym::{SymOp, UnitCell};
//! use lin_alg::f32::Vec3;
//!
//! let op = SymOp::parse("-x+1/2,-y+1/2,z").unwrap();
//! let cell = UnitCell::from_parameters([10.0, 10.0, 10.0, 90.0, 90.0, 90.0]).unwrap();
//! let image = cell.to_real(op.apply(Vec3::new(0.1, 0.1, 0.1)));
//! assert!((image.x - 4.0).abs() < 1e-4);
//! ```

mod error;
mod expand;
mod grid;
mod lattice;
mod linalg;
mod ops;
mod spacegroup;
mod unitcell;

pub use error::{SymError, SymResult};
pub use expand::{
    apply_symmetry, DedupePolicy, SpaceGroupSource, SymmetryOutcome, SymmetryRequest,
    DUPLICATE_TOLERANCE, PACKING_TOLERANCE,
};
pub use lattice::{CellRange, PackMode};
pub use ops::SymOp;
pub use spacegroup::{canonicalize, SpaceGroup};
pub use unitcell::UnitCell;
