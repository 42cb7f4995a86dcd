//! Atom properties
//!
//! Atoms store coordinates inline as a `Vec3` where NaN components mean
//! "not yet set" (readers may emit an atom before its coordinate record
//! arrives); `position()` is the checked accessor. Everything optional at
//! the API level is an `Option`, never a magic sentinel.

use crate::bitset::BitSet;
use crate::element;
use crate::index::FrameIndex;
use lin_alg::f32::Vec3;
use smallvec::SmallVec;

/// A single atom in the collection-wide atom array.
#[derive(Debug, Clone)]
pub struct Atom {
    /// Atom name as given by the file ("CA", "O5'"), if any
    pub name: Option<String>,
    /// Atomic number, 0 = unknown
    pub element: u8,
    /// Coordinates; NaN components mean unset
    pub xyz: Vec3,
    /// Formal charge
    pub formal_charge: i8,
    /// Partial charge, if the format carries one
    pub partial_charge: Option<f32>,
    /// Occupancy as an integer percentage 0..=100
    pub occupancy: u8,
    /// Isotropic temperature factor
    pub b_factor: Option<f32>,
    /// Anisotropic displacement tensor, 6 or 8 elements as provided
    pub anisou: Option<SmallVec<[f32; 8]>>,
    /// Vibration / displacement vector (one mode per cloned frame)
    pub vibration: Option<Vec3>,
    /// True for HETATM-style records
    pub hetero: bool,
    /// Chain identifier
    pub chain: Option<char>,
    /// Alternate-location indicator
    pub alt_loc: Option<char>,
    /// Residue name (group of 3)
    pub group3: Option<String>,
    /// Residue sequence number
    pub sequence_number: Option<i32>,
    /// Insertion code
    pub insertion_code: Option<char>,
    /// Owning frame
    pub atom_set_index: FrameIndex,
    /// Position within the owning frame, assigned on append.
    /// Symmetry bond remapping keys on this.
    pub atom_site: u32,
    /// Which symmetry operations/cells produced or coincide with this atom
    pub bs_symmetry: BitSet,
    /// Skip this atom during symmetry expansion
    pub ignore_symmetry: bool,
}

impl Default for Atom {
    fn default() -> Self {
        Atom {
            name: None,
            element: 0,
            xyz: Vec3::new(f32::NAN, f32::NAN, f32::NAN),
            formal_charge: 0,
            partial_charge: None,
            occupancy: 100,
            b_factor: None,
            anisou: None,
            vibration: None,
            hetero: false,
            chain: None,
            alt_loc: None,
            group3: None,
            sequence_number: None,
            insertion_code: None,
            atom_set_index: FrameIndex::invalid(),
            atom_site: 0,
            bs_symmetry: BitSet::new(),
            ignore_symmetry: false,
        }
    }
}

impl Atom {
    /// Create an atom from an element symbol; unknown symbols get element 0.
    pub fn new(name: &str, element_symbol: &str) -> Self {
        Atom {
            name: Some(name.to_string()),
            element: element::number_for_symbol(element_symbol).unwrap_or(0),
            ..Atom::default()
        }
    }

    /// Coordinates, or `None` while unset
    pub fn position(&self) -> Option<Vec3> {
        if self.xyz.x.is_nan() || self.xyz.y.is_nan() || self.xyz.z.is_nan() {
            None
        } else {
            Some(self.xyz)
        }
    }

    /// Set coordinates
    pub fn set_position(&mut self, xyz: Vec3) {
        self.xyz = xyz;
    }

    /// Canonical element symbol
    pub fn symbol(&self) -> &'static str {
        element::symbol_for(self.element)
    }

    /// True if this atom matches another on the identity fields used for
    /// special-position folding (name and alternate location)
    pub fn same_site_identity(&self, other: &Atom) -> bool {
        self.name == other.name && self.alt_loc == other.alt_loc
    }
}

/// Builder for atoms with many optional fields.
#[derive(Debug, Default)]
pub struct AtomBuilder {
    atom: Atom,
}

impl AtomBuilder {
    pub fn new() -> Self {
        AtomBuilder {
            atom: Atom::default(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.atom.name = Some(name.to_string());
        self
    }

    pub fn element(mut self, atomic_number: u8) -> Self {
        self.atom.element = atomic_number;
        self
    }

    pub fn element_symbol(mut self, symbol: &str) -> Self {
        self.atom.element = element::number_for_symbol(symbol).unwrap_or(0);
        self
    }

    pub fn position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.atom.xyz = Vec3::new(x, y, z);
        self
    }

    pub fn formal_charge(mut self, charge: i8) -> Self {
        self.atom.formal_charge = charge;
        self
    }

    pub fn partial_charge(mut self, charge: f32) -> Self {
        self.atom.partial_charge = Some(charge);
        self
    }

    pub fn occupancy(mut self, percent: u8) -> Self {
        self.atom.occupancy = percent.min(100);
        self
    }

    pub fn b_factor(mut self, b: f32) -> Self {
        self.atom.b_factor = Some(b);
        self
    }

    pub fn hetero(mut self, hetero: bool) -> Self {
        self.atom.hetero = hetero;
        self
    }

    pub fn chain(mut self, chain: char) -> Self {
        self.atom.chain = Some(chain);
        self
    }

    pub fn alt_loc(mut self, alt: char) -> Self {
        self.atom.alt_loc = Some(alt);
        self
    }

    pub fn residue(mut self, group3: &str, sequence_number: i32) -> Self {
        self.atom.group3 = Some(group3.to_string());
        self.atom.sequence_number = Some(sequence_number);
        self
    }

    pub fn insertion_code(mut self, code: char) -> Self {
        self.atom.insertion_code = Some(code);
        self
    }

    pub fn build(self) -> Atom {
        self.atom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_position_unset() {
        let atom = Atom::default();
        assert!(atom.position().is_none());
    }

    #[test]
    fn test_builder() {
        let atom = AtomBuilder::new()
            .name("CA")
            .element_symbol("C")
            .position(1.0, 2.0, 3.0)
            .chain('A')
            .residue("ALA", 12)
            .occupancy(100)
            .b_factor(15.5)
            .build();
        assert_eq!(atom.element, 6);
        assert_eq!(atom.symbol(), "C");
        let pos = atom.position().unwrap();
        assert_eq!(pos.y, 2.0);
        assert_eq!(atom.sequence_number, Some(12));
    }

    #[test]
    fn test_site_identity() {
        let a = AtomBuilder::new().name("O1").alt_loc('A').build();
        let mut b = a.clone();
        assert!(a.same_site_identity(&b));
        b.alt_loc = Some('B');
        assert!(!a.same_site_identity(&b));
    }
}
