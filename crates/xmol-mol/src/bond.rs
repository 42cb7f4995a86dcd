//! Bond connectivity

use crate::index::AtomIndex;

/// Bond order, including the sentinel orders used by 2-D and biological
/// formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondOrder {
    #[default]
    Unknown,
    Single,
    Double,
    Triple,
    /// Aromatic/partial order (MDL code 4, mol2 "ar")
    Aromatic,
    /// Hydrogen bond annotation
    HydrogenBond,
    /// 2-D stereo wedge toward the viewer
    StereoNear,
    /// 2-D stereo wedge away from the viewer
    StereoFar,
}

impl BondOrder {
    /// Map an MDL V2000 bond-type code
    pub fn from_mdl_code(code: i32) -> BondOrder {
        match code {
            1 => BondOrder::Single,
            2 => BondOrder::Double,
            3 => BondOrder::Triple,
            4 => BondOrder::Aromatic,
            _ => BondOrder::Unknown,
        }
    }

    /// Integer encoding for the external iterator surface
    pub fn encoded(&self) -> i32 {
        match self {
            BondOrder::Unknown => 0,
            BondOrder::Single => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Aromatic => 4,
            BondOrder::HydrogenBond => -1,
            BondOrder::StereoNear => -2,
            BondOrder::StereoFar => -3,
        }
    }

    /// True for orders that contribute to the covalent graph
    pub fn is_covalent(&self) -> bool {
        matches!(
            self,
            BondOrder::Single | BondOrder::Double | BondOrder::Triple | BondOrder::Aromatic
        )
    }
}

/// A bond between two atoms in the collection-wide atom array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bond {
    pub atom1: AtomIndex,
    pub atom2: AtomIndex,
    pub order: BondOrder,
}

impl Bond {
    pub fn new(atom1: AtomIndex, atom2: AtomIndex, order: BondOrder) -> Self {
        Bond {
            atom1,
            atom2,
            order,
        }
    }

    /// True if either endpoint matches the given atom
    pub fn involves(&self, atom: AtomIndex) -> bool {
        self.atom1 == atom || self.atom2 == atom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mdl_codes() {
        assert_eq!(BondOrder::from_mdl_code(1), BondOrder::Single);
        assert_eq!(BondOrder::from_mdl_code(4), BondOrder::Aromatic);
        assert_eq!(BondOrder::from_mdl_code(9), BondOrder::Unknown);
    }

    #[test]
    fn test_covalent() {
        assert!(BondOrder::Aromatic.is_covalent());
        assert!(!BondOrder::HydrogenBond.is_covalent());
        assert!(!BondOrder::StereoNear.is_covalent());
    }

    #[test]
    fn test_involves() {
        let b = Bond::new(AtomIndex::new(2), AtomIndex::new(5), BondOrder::Single);
        assert!(b.involves(AtomIndex::new(5)));
        assert!(!b.involves(AtomIndex::new(3)));
    }
}
