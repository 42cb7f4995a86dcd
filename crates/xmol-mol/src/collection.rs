//! The intermediate molecular model
//!
//! `AtomSetCollection` is the single mutable structure every format reader
//! populates: a flat append-only atom array partitioned into ordered atom
//! sets (frames/models), a flat bond array, structure annotations, and
//! per-frame plus collection-wide metadata. Exactly one reader writes to a
//! collection during a parse; `finish()` freezes it for consumers.

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::error::{MolError, MolResult};
use crate::index::{AtomIndex, FrameIndex};
use crate::structure::Structure;
use ahash::AHashMap;

/// Per-frame metadata.
#[derive(Debug, Clone, Default)]
pub struct AtomSetInfo {
    /// Frame title (defaults to the collection name)
    pub name: String,
    /// Frame number as declared by the file (PDB MODEL serial, SDF record
    /// ordinal), not necessarily contiguous
    pub number: i32,
    /// Arbitrary string properties
    pub properties: AHashMap<String, String>,
    /// Opaque side-channel payload (MO coefficients, frequency labels, ...)
    pub aux: AHashMap<String, String>,
    /// Distinct alternate-location ids seen in this frame, derived at finish
    pub alt_locs: Vec<char>,
    /// Distinct insertion codes seen in this frame, derived at finish
    pub insertion_codes: Vec<char>,
}

/// The unified intermediate model built by one reader during one parse.
#[derive(Debug, Default)]
pub struct AtomSetCollection {
    /// Format tag the collection was built from ("pdb", "cif", ...)
    pub collection_type: String,
    /// Collection-level name (file title or first frame title)
    pub collection_name: String,

    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    structures: Vec<Structure>,
    atom_sets: Vec<AtomSetInfo>,

    /// Collection-wide string properties
    pub properties: AHashMap<String, String>,
    /// Collection-wide auxiliary info
    pub aux: AHashMap<String, String>,

    /// Symbolic atom key (name or serial) to global index, valid for the
    /// current frame only. Reset by `new_atom_set`.
    symbolic: AHashMap<String, AtomIndex>,
    /// Next `atom_site` to hand out in the current frame
    next_atom_site: u32,

    /// Unit cell a,b,c,alpha,beta,gamma as declared by the file
    pub cell_params: Option<[f32; 6]>,
    /// Explicit Cartesian-to-fractional matrix override (row-major 4x4)
    pub cell_matrix: Option<[f32; 16]>,
    /// Accumulated raw Jones-Faithful operator strings for the current frame
    pub symmetry_ops: Vec<String>,
    /// Space group name declared by the file
    pub space_group_name: Option<String>,

    /// Atom coordinates are fractional rather than Cartesian
    pub coordinates_are_fractional: bool,
    /// Frames are time-series snapshots rather than independent models
    pub is_trajectory: bool,

    /// Human-readable diagnostic when parsing degraded or failed
    pub error_message: Option<String>,

    frozen: bool,
}

impl AtomSetCollection {
    pub fn new(collection_type: &str) -> Self {
        AtomSetCollection {
            collection_type: collection_type.to_string(),
            ..AtomSetCollection::default()
        }
    }

    // Counts and accessors

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn structure_count(&self) -> usize {
        self.structures.len()
    }

    pub fn atom_set_count(&self) -> usize {
        self.atom_sets.len()
    }

    pub fn atom(&self, index: AtomIndex) -> Option<&Atom> {
        self.atoms.get(index.as_usize())
    }

    pub fn atom_mut(&mut self, index: AtomIndex) -> Option<&mut Atom> {
        self.atoms.get_mut(index.as_usize())
    }

    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter()
    }

    pub fn atoms_mut(&mut self) -> impl Iterator<Item = &mut Atom> {
        self.atoms.iter_mut()
    }

    pub fn bonds(&self) -> impl Iterator<Item = &Bond> {
        self.bonds.iter()
    }

    pub fn structures(&self) -> impl Iterator<Item = &Structure> {
        self.structures.iter()
    }

    pub fn atom_set_info(&self, frame: FrameIndex) -> Option<&AtomSetInfo> {
        self.atom_sets.get(frame.as_usize())
    }

    /// The frame currently being appended to, if any
    pub fn current_atom_set(&self) -> Option<FrameIndex> {
        if self.atom_sets.is_empty() {
            None
        } else {
            Some(FrameIndex::from(self.atom_sets.len() - 1))
        }
    }

    /// Indices of the atoms belonging to one frame, in append order
    pub fn atom_indices_in_set(&self, frame: FrameIndex) -> Vec<AtomIndex> {
        self.atoms
            .iter()
            .enumerate()
            .filter(|(_, a)| a.atom_set_index == frame)
            .map(|(i, _)| AtomIndex::from(i))
            .collect()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    // Frame lifecycle

    /// Start a new frame. Resets the symbolic name map (names and serials
    /// are only unique within one frame) and the per-frame site counter,
    /// and carries the collection name forward as the frame title.
    pub fn new_atom_set(&mut self) -> FrameIndex {
        self.symbolic.clear();
        self.next_atom_site = 0;
        let number = self.atom_sets.len() as i32 + 1;
        self.atom_sets.push(AtomSetInfo {
            name: self.collection_name.clone(),
            number,
            ..AtomSetInfo::default()
        });
        FrameIndex::from(self.atom_sets.len() - 1)
    }

    pub fn set_atom_set_name(&mut self, name: &str) {
        if self.atom_sets.is_empty() && self.collection_name.is_empty() {
            self.collection_name = name.to_string();
        }
        if let Some(info) = self.atom_sets.last_mut() {
            info.name = name.to_string();
        }
    }

    pub fn set_atom_set_number(&mut self, number: i32) {
        if let Some(info) = self.atom_sets.last_mut() {
            info.number = number;
        }
    }

    pub fn set_atom_set_property(&mut self, key: &str, value: &str) {
        if let Some(info) = self.atom_sets.last_mut() {
            info.properties.insert(key.to_string(), value.to_string());
        }
    }

    pub fn set_atom_set_aux(&mut self, key: &str, value: &str) {
        if let Some(info) = self.atom_sets.last_mut() {
            info.aux.insert(key.to_string(), value.to_string());
        }
    }

    /// Drop the current frame and every atom/bond/structure it owns.
    /// Used when a reader restarts a multi-frame scan or skips an
    /// undesired model after having opened it.
    pub fn discard_current_atom_set(&mut self) {
        let Some(frame) = self.current_atom_set() else {
            return;
        };
        // Atoms of the current frame are always the array tail
        let first = self
            .atoms
            .iter()
            .position(|a| a.atom_set_index == frame)
            .unwrap_or(self.atoms.len());
        self.atoms.truncate(first);
        let count = self.atoms.len() as u32;
        self.bonds
            .retain(|b| b.atom1.as_u32() < count && b.atom2.as_u32() < count);
        self.structures.retain(|s| s.atom_set_index != frame);
        self.atom_sets.pop();
        self.symbolic.clear();
        self.next_atom_site = 0;
    }

    // Atom mutation

    /// Append a new atom to the current frame, opening a first frame if
    /// none exists. Assigns the owning frame and a monotonically
    /// increasing site index, and registers the atom name in the symbolic
    /// map.
    pub fn add_atom(&mut self, mut atom: Atom) -> AtomIndex {
        let frame = match self.current_atom_set() {
            Some(f) => f,
            None => self.new_atom_set(),
        };
        atom.atom_set_index = frame;
        atom.atom_site = self.next_atom_site;
        self.next_atom_site += 1;
        let index = AtomIndex::from(self.atoms.len());
        if let Some(name) = &atom.name {
            self.symbolic.insert(name.clone(), index);
        }
        self.atoms.push(atom);
        index
    }

    /// Register an extra symbolic key (e.g. a PDB serial number) for the
    /// given atom, scoped to the current frame.
    pub fn register_atom_key(&mut self, key: &str, index: AtomIndex) {
        self.symbolic.insert(key.to_string(), index);
    }

    /// Resolve a symbolic key in the current frame
    pub fn atom_index_for_key(&self, key: &str) -> Option<AtomIndex> {
        self.symbolic.get(key).copied()
    }

    /// Clone an existing atom into the current frame. The clone gets a
    /// fresh site index and frame assignment; everything else is carried
    /// over. Used by the symmetry engine and by per-property frame clones.
    pub fn new_clone_atom(&mut self, source: &Atom) -> AtomIndex {
        let mut clone = source.clone();
        clone.bs_symmetry = crate::bitset::BitSet::new();
        self.add_atom(clone)
    }

    /// Duplicate the first frame as a new frame at the end.
    /// Returns the number of atoms cloned.
    pub fn clone_first_atom_set(&mut self) -> MolResult<usize> {
        self.clone_atom_set(FrameIndex::new(0))
    }

    /// Duplicate the most recent frame as a new frame at the end.
    pub fn clone_last_atom_set(&mut self) -> MolResult<usize> {
        match self.current_atom_set() {
            Some(frame) => self.clone_atom_set(frame),
            None => Err(MolError::NoAtomSets),
        }
    }

    fn clone_atom_set(&mut self, frame: FrameIndex) -> MolResult<usize> {
        if frame.as_usize() >= self.atom_sets.len() {
            return Err(MolError::frame_out_of_bounds(
                frame.as_usize(),
                self.atom_sets.len(),
            ));
        }
        let sources: Vec<Atom> = self
            .atoms
            .iter()
            .filter(|a| a.atom_set_index == frame)
            .cloned()
            .collect();
        self.new_atom_set();
        let count = sources.len();
        for atom in sources {
            self.new_clone_atom(&atom);
        }
        Ok(count)
    }

    // Bond mutation

    /// Append a bond. Out-of-range endpoints or self-loops are logged and
    /// dropped, never fatal. Returns true if the bond was kept.
    pub fn add_bond(&mut self, atom1: AtomIndex, atom2: AtomIndex, order: BondOrder) -> bool {
        let count = self.atoms.len() as u32;
        if atom1.as_u32() >= count || atom2.as_u32() >= count || atom1 == atom2 {
            log::warn!(
                "dropping invalid bond {}-{} (atom count {})",
                atom1.as_u32(),
                atom2.as_u32(),
                count
            );
            return false;
        }
        self.bonds.push(Bond::new(atom1, atom2, order));
        true
    }

    /// Append a bond resolving both endpoints through the current frame's
    /// symbolic map.
    pub fn add_bond_by_keys(&mut self, key1: &str, key2: &str, order: BondOrder) -> bool {
        match (self.atom_index_for_key(key1), self.atom_index_for_key(key2)) {
            (Some(a1), Some(a2)) => self.add_bond(a1, a2, order),
            _ => {
                log::warn!("dropping bond with unresolved atom keys {key1:?}/{key2:?}");
                false
            }
        }
    }

    // Structures

    pub fn add_structure(&mut self, mut structure: Structure) {
        structure.atom_set_index = self.current_atom_set().unwrap_or(FrameIndex::invalid());
        self.structures.push(structure);
    }

    // Symmetry state hand-off

    /// Record one raw Jones-Faithful operator string from a file header
    pub fn add_symmetry_operator(&mut self, op: &str) {
        self.symmetry_ops.push(op.to_string());
    }

    pub fn set_cell_parameters(&mut self, params: [f32; 6]) {
        self.cell_params = Some(params);
    }

    pub fn set_space_group_name(&mut self, name: &str) {
        self.space_group_name = Some(name.trim().to_string());
    }

    /// Clear per-frame symmetry inputs so the next frame starts clean.
    /// Called by the symmetry engine after it applies (or declines to
    /// apply) the accumulated state.
    pub fn clear_symmetry(&mut self) {
        self.symmetry_ops.clear();
        self.cell_params = None;
        self.cell_matrix = None;
        self.space_group_name = None;
    }

    // Multi-file aggregation

    /// Merge another fully parsed collection into this one, remapping atom
    /// indices and frame numbers by offset. Sub-collections keep their
    /// frame ordering; frame numbers continue after this collection's.
    pub fn append(&mut self, other: AtomSetCollection) {
        let atom_offset = self.atoms.len() as u32;
        let frame_offset = self.atom_sets.len() as u32;
        let number_offset = self.atom_sets.len() as i32;

        for mut atom in other.atoms {
            atom.atom_set_index = FrameIndex::new(atom.atom_set_index.as_u32() + frame_offset);
            self.atoms.push(atom);
        }
        for bond in other.bonds {
            self.bonds.push(Bond::new(
                AtomIndex::new(bond.atom1.as_u32() + atom_offset),
                AtomIndex::new(bond.atom2.as_u32() + atom_offset),
                bond.order,
            ));
        }
        for mut structure in other.structures {
            if structure.atom_set_index.is_valid() {
                structure.atom_set_index =
                    FrameIndex::new(structure.atom_set_index.as_u32() + frame_offset);
            }
            self.structures.push(structure);
        }
        for mut info in other.atom_sets {
            info.number += number_offset;
            self.atom_sets.push(info);
        }
        if self.error_message.is_none() {
            self.error_message = other.error_message;
        }
        // The appended collection's symbolic map is stale by construction
        self.symbolic.clear();
    }

    // Freezing

    /// Freeze the collection: compute derived per-frame info. Idempotent.
    pub fn finish(&mut self) {
        if self.frozen {
            return;
        }
        for (i, info) in self.atom_sets.iter_mut().enumerate() {
            let frame = FrameIndex::from(i);
            let mut alt_locs: Vec<char> = Vec::new();
            let mut icodes: Vec<char> = Vec::new();
            for atom in self.atoms.iter().filter(|a| a.atom_set_index == frame) {
                if let Some(al) = atom.alt_loc {
                    if !alt_locs.contains(&al) {
                        alt_locs.push(al);
                    }
                }
                if let Some(ic) = atom.insertion_code {
                    if !icodes.contains(&ic) {
                        icodes.push(ic);
                    }
                }
            }
            alt_locs.sort_unstable();
            icodes.sort_unstable();
            info.alt_locs = alt_locs;
            info.insertion_codes = icodes;
        }
        if self.collection_name.is_empty() {
            if let Some(first) = self.atom_sets.first() {
                self.collection_name = first.name.clone();
            }
        }
        self.frozen = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::AtomBuilder;
    use crate::structure::{Structure, StructureKind};

    fn carbon(name: &str, x: f32) -> Atom {
        AtomBuilder::new()
            .name(name)
            .element_symbol("C")
            .position(x, 0.0, 0.0)
            .build()
    }

    #[test]
    fn test_add_atoms_assigns_sites() {
        let mut col = AtomSetCollection::new("xyz");
        col.new_atom_set();
        let a = col.add_atom(carbon("C1", 0.0));
        let b = col.add_atom(carbon("C2", 1.5));
        assert_eq!(col.atom(a).unwrap().atom_site, 0);
        assert_eq!(col.atom(b).unwrap().atom_site, 1);
        assert_eq!(col.atom(a).unwrap().atom_set_index, FrameIndex::new(0));
    }

    #[test]
    fn test_symbolic_map_resets_per_frame() {
        let mut col = AtomSetCollection::new("sdf");
        col.new_atom_set();
        let a1 = col.add_atom(carbon("C1", 0.0));
        assert_eq!(col.atom_index_for_key("C1"), Some(a1));
        col.new_atom_set();
        assert_eq!(col.atom_index_for_key("C1"), None);
        let a2 = col.add_atom(carbon("C1", 0.0));
        assert_eq!(col.atom_index_for_key("C1"), Some(a2));
        // Site numbering restarts with the frame
        assert_eq!(col.atom(a2).unwrap().atom_site, 0);
    }

    #[test]
    fn test_invalid_bond_dropped() {
        let mut col = AtomSetCollection::new("pdb");
        col.new_atom_set();
        let a = col.add_atom(carbon("C1", 0.0));
        assert!(!col.add_bond(a, AtomIndex::new(99), BondOrder::Single));
        assert!(!col.add_bond(a, a, BondOrder::Single));
        assert_eq!(col.bond_count(), 0);
        let b = col.add_atom(carbon("C2", 1.5));
        assert!(col.add_bond(a, b, BondOrder::Single));
        assert_eq!(col.bond_count(), 1);
    }

    #[test]
    fn test_clone_last_atom_set() {
        let mut col = AtomSetCollection::new("gaussian");
        col.new_atom_set();
        col.add_atom(carbon("C1", 0.0));
        col.add_atom(carbon("C2", 1.5));
        let cloned = col.clone_last_atom_set().unwrap();
        assert_eq!(cloned, 2);
        assert_eq!(col.atom_set_count(), 2);
        assert_eq!(col.atom_count(), 4);
        let second: Vec<_> = col.atom_indices_in_set(FrameIndex::new(1));
        assert_eq!(second.len(), 2);
        assert_eq!(col.atom(second[0]).unwrap().atom_site, 0);
    }

    #[test]
    fn test_discard_current_atom_set() {
        let mut col = AtomSetCollection::new("pdb");
        col.new_atom_set();
        col.add_atom(carbon("C1", 0.0));
        col.new_atom_set();
        col.add_atom(carbon("C2", 0.0));
        col.add_atom(carbon("C3", 0.0));
        col.discard_current_atom_set();
        assert_eq!(col.atom_set_count(), 1);
        assert_eq!(col.atom_count(), 1);
    }

    #[test]
    fn test_append_remaps_indices() {
        let mut a = AtomSetCollection::new("xyz");
        a.new_atom_set();
        let a1 = a.add_atom(carbon("C1", 0.0));
        let a2 = a.add_atom(carbon("C2", 1.5));
        a.add_bond(a1, a2, BondOrder::Single);

        let mut b = AtomSetCollection::new("xyz");
        b.new_atom_set();
        let b1 = b.add_atom(carbon("C1", 0.0));
        let b2 = b.add_atom(carbon("C2", 1.5));
        b.add_bond(b1, b2, BondOrder::Single);

        a.append(b);
        assert_eq!(a.atom_count(), 4);
        assert_eq!(a.bond_count(), 2);
        let bonds: Vec<_> = a.bonds().collect();
        assert_eq!(bonds[1].atom1, AtomIndex::new(2));
        assert_eq!(bonds[1].atom2, AtomIndex::new(3));
        assert_eq!(a.atom_set_count(), 2);
        assert_eq!(a.atom_set_info(FrameIndex::new(1)).unwrap().number, 2);
    }

    #[test]
    fn test_finish_derives_alt_locs() {
        let mut col = AtomSetCollection::new("pdb");
        col.new_atom_set();
        col.add_atom(AtomBuilder::new().name("CB").alt_loc('B').build());
        col.add_atom(AtomBuilder::new().name("CA").alt_loc('A').build());
        col.add_atom(AtomBuilder::new().name("CG").build());
        col.finish();
        let info = col.atom_set_info(FrameIndex::new(0)).unwrap();
        assert_eq!(info.alt_locs, vec!['A', 'B']);
        assert!(col.is_frozen());
    }

    #[test]
    fn test_structure_gets_current_frame() {
        let mut col = AtomSetCollection::new("pdb");
        col.new_atom_set();
        col.add_structure(Structure::new(
            StructureKind::Helix,
            Some('A'),
            1,
            Some('A'),
            10,
        ));
        let s: Vec<_> = col.structures().collect();
        assert_eq!(s[0].atom_set_index, FrameIndex::new(0));
    }
}
