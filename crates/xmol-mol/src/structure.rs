//! Secondary-structure annotations
//!
//! Purely descriptive ranges (helix/sheet/turn) attached by PDB and CIF
//! readers. Never mutated after creation; consumed by external viewers.

use crate::index::FrameIndex;

/// Kind of secondary-structure element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StructureKind {
    #[default]
    None,
    Helix,
    Sheet,
    Turn,
}

impl StructureKind {
    pub fn from_record_name(name: &str) -> StructureKind {
        match name.trim() {
            "HELIX" => StructureKind::Helix,
            "SHEET" => StructureKind::Sheet,
            "TURN" => StructureKind::Turn,
            _ => StructureKind::None,
        }
    }
}

/// One annotated residue range.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub kind: StructureKind,
    pub start_chain: Option<char>,
    pub start_sequence_number: i32,
    pub start_insertion_code: Option<char>,
    pub end_chain: Option<char>,
    pub end_sequence_number: i32,
    pub end_insertion_code: Option<char>,
    /// Frame the annotation belongs to
    pub atom_set_index: FrameIndex,
}

impl Structure {
    pub fn new(
        kind: StructureKind,
        start_chain: Option<char>,
        start_sequence_number: i32,
        end_chain: Option<char>,
        end_sequence_number: i32,
    ) -> Self {
        Structure {
            kind,
            start_chain,
            start_sequence_number,
            start_insertion_code: None,
            end_chain,
            end_sequence_number,
            end_insertion_code: None,
            atom_set_index: FrameIndex::invalid(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_record() {
        assert_eq!(StructureKind::from_record_name("HELIX "), StructureKind::Helix);
        assert_eq!(StructureKind::from_record_name("SHEET"), StructureKind::Sheet);
        assert_eq!(StructureKind::from_record_name("ATOM"), StructureKind::None);
    }
}
