//! Space group operator accumulation and lookup
//!
//! Readers feed operators in one at a time as they walk file headers
//! (CIF symop loops, PDB REMARK 290, SHELX SYMM). `finalize` turns the
//! accumulated state into the closed operator list the expansion engine
//! consumes: identity first, lattice-centering translations expanded,
//! inversion applied for centrosymmetric SHELX lattices, duplicates folded.
//!
//! A small built-in table covers the space-group names seen most often in
//! PDB and SHELX practice; everything else falls back to identity with a
//! warning rather than failing the load.

use crate::error::{SymError, SymResult};
use crate::ops::SymOp;
use phf::phf_map;

/// Operator lists for common space groups, canonical Hermann-Mauguin keys.
static SYM_OPS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "P 1" => &["x,y,z"],
    "P -1" => &["x,y,z", "-x,-y,-z"],
    "P 2" => &["x,y,z", "-x,y,-z"],
    "P 21" => &["x,y,z", "-x,y+1/2,-z"],
    "C 2" => &["x,y,z", "-x,y,-z", "x+1/2,y+1/2,z", "-x+1/2,y+1/2,-z"],
    "P 21/C" => &["x,y,z", "-x,y+1/2,-z+1/2", "-x,-y,-z", "x,-y+1/2,z+1/2"],
    "C 2/C" => &[
        "x,y,z", "-x,y,-z+1/2", "-x,-y,-z", "x,-y,z+1/2",
        "x+1/2,y+1/2,z", "-x+1/2,y+1/2,-z+1/2", "-x+1/2,-y+1/2,-z", "x+1/2,-y+1/2,z+1/2",
    ],
    "P 2 2 2" => &["x,y,z", "-x,-y,z", "-x,y,-z", "x,-y,-z"],
    "P 21 21 21" => &[
        "x,y,z", "-x+1/2,-y,z+1/2", "-x,y+1/2,-z+1/2", "x+1/2,-y+1/2,-z",
    ],
    "P 43 21 2" => &[
        "x,y,z", "-x,-y,z+1/2", "-y+1/2,x+1/2,z+3/4", "y+1/2,-x+1/2,z+1/4",
        "-x+1/2,y+1/2,-z+3/4", "x+1/2,-y+1/2,-z+1/4", "y,x,-z", "-y,-x,-z+1/2",
    ],
    "R 3" => &[
        "x,y,z", "-y,x-y,z", "-x+y,-x,z",
        "x+2/3,y+1/3,z+1/3", "-y+2/3,x-y+1/3,z+1/3", "-x+y+2/3,-x+1/3,z+1/3",
        "x+1/3,y+2/3,z+2/3", "-y+1/3,x-y+2/3,z+2/3", "-x+y+1/3,-x+2/3,z+2/3",
    ],
};

/// Compressed-name aliases resolved before table lookup
static ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    "P1" => "P 1",
    "P-1" => "P -1",
    "P2" => "P 2",
    "P21" => "P 21",
    "C2" => "C 2",
    "P21/C" => "P 21/C",
    "C2/C" => "C 2/C",
    "P222" => "P 2 2 2",
    "P212121" => "P 21 21 21",
    "P43212" => "P 43 21 2",
    "R3" => "R 3",
};

/// Canonicalize a space group name: collapse whitespace, uppercase, resolve
/// compressed aliases.
pub fn canonicalize(name: &str) -> String {
    let normalized: String = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();

    if SYM_OPS.contains_key(normalized.as_str()) {
        return normalized;
    }
    let no_spaces: String = normalized.chars().filter(|c| *c != ' ').collect();
    if let Some(canonical) = ALIASES.get(no_spaces.as_str()) {
        return canonical.to_string();
    }
    normalized
}

/// SHELX-style lattice centering translations for |LATT| codes 1..=7.
fn centering_translations(code: i8) -> SymResult<&'static [[f32; 3]]> {
    match code.abs() {
        1 => Ok(&[]),
        2 => Ok(&[[0.5, 0.5, 0.5]]),
        3 => Ok(&[
            [2.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
            [1.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0],
        ]),
        4 => Ok(&[[0.0, 0.5, 0.5], [0.5, 0.0, 0.5], [0.5, 0.5, 0.0]]),
        5 => Ok(&[[0.0, 0.5, 0.5]]),
        6 => Ok(&[[0.5, 0.0, 0.5]]),
        7 => Ok(&[[0.5, 0.5, 0.0]]),
        _ => Err(SymError::UnknownLatticeCode(code)),
    }
}

/// Accumulated space-group state for one frame.
#[derive(Debug, Clone, Default)]
pub struct SpaceGroup {
    /// Declared Hermann-Mauguin name, if any
    pub name: Option<String>,
    ops: Vec<SymOp>,
    /// SHELX LATT code; positive adds an inversion center
    latt: Option<i8>,
    finalized: bool,
}

impl SpaceGroup {
    pub fn new() -> Self {
        SpaceGroup::default()
    }

    /// Look up a group by name in the built-in table.
    pub fn from_name(name: &str) -> SymResult<SpaceGroup> {
        let canonical = canonicalize(name);
        let op_strings = SYM_OPS
            .get(canonical.as_str())
            .ok_or_else(|| SymError::UnknownSpaceGroup(name.to_string()))?;
        let mut group = SpaceGroup {
            name: Some(canonical),
            ..SpaceGroup::default()
        };
        for text in op_strings.iter() {
            // Table entries are known-good
            if let Ok(op) = SymOp::parse(text) {
                group.ops.push(op);
            }
        }
        group.finalize();
        Ok(group)
    }

    /// Accumulate one operator from a file header. Malformed strings are
    /// logged and skipped. Returns whether the operator was accepted.
    pub fn add_operator(&mut self, text: &str) -> bool {
        match SymOp::parse(text) {
            Ok(op) => {
                self.ops.push(op);
                self.finalized = false;
                true
            }
            Err(err) => {
                log::warn!("skipping symmetry operator: {err}");
                false
            }
        }
    }

    /// Record the SHELX LATT centering code (negative = non-centrosymmetric)
    pub fn set_lattice_centering(&mut self, code: i8) -> SymResult<()> {
        centering_translations(code)?;
        self.latt = Some(code);
        self.finalized = false;
        Ok(())
    }

    pub fn operator_count(&self) -> usize {
        self.ops.len()
    }

    pub fn operators(&self) -> &[SymOp] {
        &self.ops
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Close the operator list: expand inversion and centering, fold
    /// duplicates, and put the identity at position 0. Idempotent.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        let mut ops: Vec<SymOp> = Vec::with_capacity(self.ops.len() * 4 + 1);
        ops.push(SymOp::identity());
        for op in &self.ops {
            push_unique(&mut ops, *op);
        }

        if let Some(code) = self.latt {
            if code > 0 {
                // Centrosymmetric lattice: add the inverse of every operator
                let current = ops.clone();
                for op in current {
                    let mut inv = op;
                    for v in inv.mat.iter_mut() {
                        *v = -*v;
                    }
                    push_unique(&mut ops, inv);
                }
            }
            if let Ok(translations) = centering_translations(code) {
                let current = ops.clone();
                for t in translations {
                    for op in &current {
                        let mut shifted = *op;
                        shifted.mat[3] += t[0];
                        shifted.mat[7] += t[1];
                        shifted.mat[11] += t[2];
                        push_unique(&mut ops, shifted);
                    }
                }
            }
        }

        self.ops = ops;
        self.finalized = true;
    }
}

/// Append an operator unless an equivalent one (translations compared
/// modulo 1) is already present.
fn push_unique(ops: &mut Vec<SymOp>, mut op: SymOp) {
    for col in [3, 7, 11] {
        op.mat[col] = op.mat[col].rem_euclid(1.0);
        if (op.mat[col] - 1.0).abs() < 1e-5 {
            op.mat[col] = 0.0;
        }
    }
    let exists = ops.iter().any(|existing| {
        existing
            .mat
            .iter()
            .zip(op.mat.iter())
            .all(|(a, b)| (a - b).abs() < 1e-5)
    });
    if !exists {
        ops.push(op);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize("P212121"), "P 21 21 21");
        assert_eq!(canonicalize("p 1"), "P 1");
        assert_eq!(canonicalize("  P  21  21  21 "), "P 21 21 21");
        assert_eq!(canonicalize("p21/c"), "P 21/C");
    }

    #[test]
    fn test_from_name_p1() {
        let group = SpaceGroup::from_name("P 1").unwrap();
        assert_eq!(group.operator_count(), 1);
        assert!(group.operators()[0].is_identity());
    }

    #[test]
    fn test_from_name_p212121() {
        let group = SpaceGroup::from_name("P212121").unwrap();
        assert_eq!(group.operator_count(), 4);
        assert!(group.operators()[0].is_identity());
    }

    #[test]
    fn test_from_name_unknown() {
        assert!(SpaceGroup::from_name("Z 99").is_err());
    }

    #[test]
    fn test_accumulate_and_finalize_identity_first() {
        let mut group = SpaceGroup::new();
        assert!(group.add_operator("-x,-y,z"));
        assert!(group.add_operator("x,y,z"));
        group.finalize();
        assert_eq!(group.operator_count(), 2);
        assert!(group.operators()[0].is_identity());
    }

    #[test]
    fn test_malformed_operator_skipped() {
        let mut group = SpaceGroup::new();
        assert!(!group.add_operator("bogus"));
        group.finalize();
        assert_eq!(group.operator_count(), 1);
    }

    #[test]
    fn test_latt_centrosymmetric_i_centered() {
        // LATT 2: I-centered, centrosymmetric -> 1 op becomes 4
        let mut group = SpaceGroup::new();
        group.set_lattice_centering(2).unwrap();
        group.finalize();
        assert_eq!(group.operator_count(), 4);
    }

    #[test]
    fn test_latt_noncentrosymmetric_primitive() {
        let mut group = SpaceGroup::new();
        group.set_lattice_centering(-1).unwrap();
        group.finalize();
        assert_eq!(group.operator_count(), 1);
    }

    #[test]
    fn test_bad_latt_code() {
        let mut group = SpaceGroup::new();
        assert!(group.set_lattice_centering(9).is_err());
    }
}
