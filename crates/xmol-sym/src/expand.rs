//! Symmetry expansion
//!
//! Post-processes the current frame of an `AtomSetCollection`: resolves the
//! accumulated operator list and unit cell, applies every operator over the
//! requested lattice-cell range, folds coincident images onto existing
//! atoms, remaps bonds through the generated images, and leaves the frame
//! in Cartesian coordinates with per-atom symmetry-membership bits.
//!
//! The engine never fails a load for symmetry reasons: a missing unit cell
//! or unresolvable space group logs a warning and leaves the frame
//! unexpanded.

use crate::error::{SymError, SymResult};
use crate::grid::ImageFold;
use crate::lattice::{CellRange, PackMode};
use crate::spacegroup::SpaceGroup;
use crate::unitcell::UnitCell;
use ahash::AHashMap;
use lin_alg::f32::Vec3;
use xmol_mol::{Atom, AtomIndex, AtomSetCollection, Bond};

/// Two images closer than this (Cartesian Angstroms) are the same atom
pub const DUPLICATE_TOLERANCE: f32 = 0.01;
/// Fractional slack allowed around the cell boundary when packing
pub const PACKING_TOLERANCE: f32 = 0.02;

/// How coincident images are detected. The three policies are mutually
/// exclusive; the request selects exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DedupePolicy {
    /// Distance plus atom name/alt-loc identity, compared within each
    /// lattice cell separately. The default when real operators apply.
    #[default]
    SpecialPositions,
    /// Distance-only folding; generated images are kept only within this
    /// many Angstroms of a base-cell atom.
    Range111(f32),
    /// Distance-only folding across all processed cells, for lattice-only
    /// loads. An optional margin clips images to a box around the base
    /// cell's atoms.
    NoSymmetry(Option<f32>),
}

/// Where the operator list comes from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SpaceGroupSource {
    /// File-declared operators, falling back to the declared name
    #[default]
    FromFile,
    /// Ignore file operators, use only the declared name
    IgnoreFileOperators,
    /// Force a specific group by name
    Name(String),
}

/// One symmetry application request, assembled by the reader from its load
/// options plus the collection's accumulated header state.
#[derive(Debug, Clone, Default)]
pub struct SymmetryRequest {
    /// Lattice descriptor (see `CellRange::from_descriptor`); None = base cell
    pub lattice: Option<[i32; 3]>,
    /// Wrapping mode override; None = take it from the descriptor
    pub pack_mode: Option<PackMode>,
    pub space_group: SpaceGroupSource,
    /// Unit cell override (a,b,c,alpha,beta,gamma)
    pub unit_cell: Option<[f32; 6]>,
    /// Re-derive bonds for generated images
    pub apply_to_bonds: bool,
    /// Signed distance filter: positive selects `Range111`, negative a
    /// box margin with `NoSymmetry`
    pub symmetry_range: Option<f32>,
}

/// What the engine did, recorded into the frame's auxiliary info as well.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryOutcome {
    pub applied: bool,
    pub operator_count: usize,
    pub pre_symmetry_atom_count: usize,
    pub atoms_added: usize,
    pub bonds_added: usize,
    pub range: CellRange,
}

impl SymmetryOutcome {
    fn unapplied(pre_count: usize) -> Self {
        SymmetryOutcome {
            applied: false,
            operator_count: 0,
            pre_symmetry_atom_count: pre_count,
            atoms_added: 0,
            bonds_added: 0,
            range: CellRange::base(),
        }
    }
}

/// Apply space-group symmetry to the collection's current frame.
///
/// Always clears the collection's accumulated symmetry state before
/// returning so the next frame starts from a blank slate.
pub fn apply_symmetry(
    col: &mut AtomSetCollection,
    req: &SymmetryRequest,
) -> SymResult<SymmetryOutcome> {
    let frame = col.current_atom_set().ok_or(SymError::NoAtomSets)?;
    let pre_indices = col.atom_indices_in_set(frame);
    let pre_count = pre_indices.len();

    let cell = match resolve_cell(col, req) {
        Some(cell) => cell,
        None => {
            if col.coordinates_are_fractional {
                log::warn!("fractional coordinates but no unit cell; frame left unexpanded");
            }
            col.clear_symmetry();
            return Ok(SymmetryOutcome::unapplied(pre_count));
        }
    };

    let group = resolve_group(col, req);
    let n_ops = group.operator_count();

    let (range, descriptor_mode) = match req.lattice {
        Some(descriptor) => CellRange::from_descriptor(descriptor),
        None => (CellRange::base(), PackMode::Normalize),
    };
    let mode = req.pack_mode.unwrap_or(descriptor_mode);
    let policy = select_policy(req, n_ops);

    // Owned snapshot of the asymmetric unit
    let base_atoms: Vec<(AtomIndex, Atom)> = pre_indices
        .iter()
        .filter_map(|i| col.atom(*i).map(|a| (*i, a.clone())))
        .collect();

    // Base positions in both coordinate systems
    let mut base_frac: Vec<Option<Vec3>> = Vec::with_capacity(base_atoms.len());
    let mut base_cart: Vec<Option<Vec3>> = Vec::with_capacity(base_atoms.len());
    for (_, atom) in &base_atoms {
        match atom.position() {
            Some(p) => {
                let mut frac = if col.coordinates_are_fractional {
                    p
                } else {
                    cell.to_fractional(p)
                };
                if mode == PackMode::Pack {
                    frac = wrap_pack(frac);
                }
                base_frac.push(Some(frac));
                base_cart.push(Some(cell.to_real(frac)));
            }
            None => {
                base_frac.push(None);
                base_cart.push(None);
            }
        }
    }

    let mut fold = ImageFold::with_capacity(base_atoms.len() * range.cell_count());
    for (slot, (idx, _)) in base_atoms.iter().enumerate() {
        if let Some(cart) = base_cart[slot] {
            fold.place(*idx, cart, 0);
        }
    }

    // Base atoms carry the identity bit
    for (idx, _) in &base_atoms {
        if let Some(atom) = col.atom_mut(*idx) {
            atom.bs_symmetry.set(0);
        }
    }

    let first_new_index = col.atom_count();
    let base_box = bounding_box(&base_cart);

    // Site maps per (cell ordinal, operator): base site -> image atom index
    let mut image_maps: Vec<((usize, usize), AHashMap<u32, AtomIndex>)> = Vec::new();
    let mut atoms_added = 0usize;

    for (cell_ordinal, cell_t) in range.cells().iter().enumerate() {
        let translation = Vec3::new(cell_t[0] as f32, cell_t[1] as f32, cell_t[2] as f32);
        for (op_index, op) in group.operators().iter().enumerate() {
            if cell_ordinal == 0 && op_index == 0 {
                continue; // the originals
            }
            let bit = cell_ordinal * n_ops + op_index;
            let mut map: AHashMap<u32, AtomIndex> = AHashMap::new();

            for (slot, (_, source)) in base_atoms.iter().enumerate() {
                if source.ignore_symmetry {
                    continue;
                }
                let Some(frac) = base_frac[slot] else {
                    continue;
                };
                // Wrap the operator result into the base cell first, then
                // shift by the lattice translation so every requested cell
                // gets a full copy
                let mut image_frac = op.apply(frac);
                match mode {
                    PackMode::Normalize => image_frac = wrap_normalize(image_frac),
                    PackMode::Pack => image_frac = wrap_pack(image_frac),
                    PackMode::Raw => {}
                }
                image_frac = image_frac + translation;
                let image_cart = cell.to_real(image_frac);

                match policy {
                    DedupePolicy::Range111(range_limit) => {
                        if !within_range_of_base(&base_cart, image_cart, range_limit) {
                            continue;
                        }
                    }
                    DedupePolicy::NoSymmetry(Some(margin)) => {
                        if let Some((lo, hi)) = base_box {
                            if !inside_box(image_cart, lo, hi, margin) {
                                continue;
                            }
                        }
                    }
                    _ => {}
                }

                // Fold onto an already placed atom when coincident
                let scan_all = matches!(policy, DedupePolicy::NoSymmetry(_));
                let folded = fold.fold(image_cart, cell_ordinal, scan_all, |existing| {
                    policy != DedupePolicy::SpecialPositions
                        || col
                            .atom(existing)
                            .map(|a| a.same_site_identity(source))
                            .unwrap_or(false)
                });

                let image_index = match folded {
                    Some(existing) => {
                        if let Some(atom) = col.atom_mut(existing) {
                            atom.bs_symmetry.set(bit);
                        }
                        existing
                    }
                    None => {
                        let new_index = col.new_clone_atom(source);
                        if let Some(atom) = col.atom_mut(new_index) {
                            atom.set_position(image_cart);
                            atom.bs_symmetry.set(bit);
                        }
                        fold.place(new_index, image_cart, cell_ordinal);
                        atoms_added += 1;
                        new_index
                    }
                };
                map.insert(source.atom_site, image_index);
            }

            image_maps.push(((cell_ordinal, op_index), map));
        }
    }

    // Rewrite base atoms to Cartesian (packed where requested)
    for (slot, (idx, _)) in base_atoms.iter().enumerate() {
        if let (Some(cart), Some(atom)) = (base_cart[slot], col.atom_mut(*idx)) {
            atom.set_position(cart);
        }
    }
    col.coordinates_are_fractional = false;

    let bonds_added = if req.apply_to_bonds {
        let original = frame_bonds(col, &pre_indices);
        remap_bonds(col, original, &image_maps, first_new_index)
    } else {
        0
    };

    record_outcome(col, &cell, n_ops, first_new_index, pre_count, range);
    col.clear_symmetry();

    Ok(SymmetryOutcome {
        applied: true,
        operator_count: n_ops,
        pre_symmetry_atom_count: pre_count,
        atoms_added,
        bonds_added,
        range,
    })
}

fn resolve_cell(col: &AtomSetCollection, req: &SymmetryRequest) -> Option<UnitCell> {
    let params = req.unit_cell.or(col.cell_params)?;
    let built = match col.cell_matrix {
        Some(matrix) if req.unit_cell.is_none() => {
            UnitCell::from_parameters_and_matrix(params, matrix)
        }
        _ => UnitCell::from_parameters(params),
    };
    match built {
        Ok(cell) => Some(cell),
        Err(err) => {
            log::warn!("unusable unit cell {params:?}: {err}");
            None
        }
    }
}

fn resolve_group(col: &AtomSetCollection, req: &SymmetryRequest) -> SpaceGroup {
    let from_name = |name: &str| match SpaceGroup::from_name(name) {
        Ok(group) => Some(group),
        Err(err) => {
            log::warn!("{err}; falling back to identity");
            None
        }
    };

    let resolved = match &req.space_group {
        SpaceGroupSource::Name(name) => from_name(name),
        SpaceGroupSource::IgnoreFileOperators => {
            col.space_group_name.as_deref().and_then(from_name)
        }
        SpaceGroupSource::FromFile => {
            if col.symmetry_ops.is_empty() {
                col.space_group_name.as_deref().and_then(from_name)
            } else {
                let mut group = SpaceGroup::new();
                for op in &col.symmetry_ops {
                    group.add_operator(op);
                }
                group.name = col.space_group_name.clone();
                group.finalize();
                Some(group)
            }
        }
    };

    resolved.unwrap_or_else(|| {
        let mut identity_only = SpaceGroup::new();
        identity_only.finalize();
        identity_only
    })
}

fn select_policy(req: &SymmetryRequest, n_ops: usize) -> DedupePolicy {
    match req.symmetry_range {
        Some(r) if r > 0.0 => DedupePolicy::Range111(r),
        Some(r) if r < 0.0 => DedupePolicy::NoSymmetry(Some(-r)),
        _ => {
            if n_ops <= 1 {
                DedupePolicy::NoSymmetry(None)
            } else {
                DedupePolicy::SpecialPositions
            }
        }
    }
}

fn wrap_normalize(v: Vec3) -> Vec3 {
    Vec3::new(
        v.x.rem_euclid(1.0),
        v.y.rem_euclid(1.0),
        v.z.rem_euclid(1.0),
    )
}

fn wrap_pack(v: Vec3) -> Vec3 {
    let wrap = |x: f32| {
        let w = x.rem_euclid(1.0);
        if w >= 1.0 - PACKING_TOLERANCE {
            w - 1.0
        } else {
            w
        }
    };
    Vec3::new(wrap(v.x), wrap(v.y), wrap(v.z))
}

fn within_range_of_base(base_cart: &[Option<Vec3>], pos: Vec3, limit: f32) -> bool {
    let limit2 = limit * limit;
    base_cart.iter().flatten().any(|b| {
        let d = pos - *b;
        d.magnitude_squared() <= limit2
    })
}

fn bounding_box(base_cart: &[Option<Vec3>]) -> Option<(Vec3, Vec3)> {
    let mut iter = base_cart.iter().flatten();
    let first = *iter.next()?;
    let mut lo = first;
    let mut hi = first;
    for p in iter {
        lo = Vec3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z));
        hi = Vec3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z));
    }
    Some((lo, hi))
}

fn inside_box(pos: Vec3, lo: Vec3, hi: Vec3, margin: f32) -> bool {
    pos.x >= lo.x - margin
        && pos.x <= hi.x + margin
        && pos.y >= lo.y - margin
        && pos.y <= hi.y + margin
        && pos.z >= lo.z - margin
        && pos.z <= hi.z + margin
}

/// Bonds whose endpoints both lie in the pre-symmetry frame
fn frame_bonds(col: &AtomSetCollection, pre_indices: &[AtomIndex]) -> Vec<(u32, u32, Bond)> {
    let site_of = |idx: AtomIndex| col.atom(idx).map(|a| (a.atom_set_index, a.atom_site));
    let frame = pre_indices
        .first()
        .and_then(|i| col.atom(*i))
        .map(|a| a.atom_set_index);
    let Some(frame) = frame else {
        return Vec::new();
    };
    col.bonds()
        .filter_map(|bond| {
            let (f1, s1) = site_of(bond.atom1)?;
            let (f2, s2) = site_of(bond.atom2)?;
            if f1 == frame && f2 == frame {
                Some((s1, s2, *bond))
            } else {
                None
            }
        })
        .collect()
}

/// Add image bonds: for every generated (cell, operator) image, remap each
/// original bond through the site map and keep it only when at least one
/// endpoint is a newly generated atom.
fn remap_bonds(
    col: &mut AtomSetCollection,
    original: Vec<(u32, u32, Bond)>,
    image_maps: &[((usize, usize), AHashMap<u32, AtomIndex>)],
    first_new_index: usize,
) -> usize {
    let mut added = 0;
    for (_, map) in image_maps {
        for (site1, site2, bond) in &original {
            let (Some(&a1), Some(&a2)) = (map.get(site1), map.get(site2)) else {
                continue;
            };
            if a1.as_usize() < first_new_index && a2.as_usize() < first_new_index {
                continue; // both endpoints folded onto base-cell atoms
            }
            if col.add_bond(a1, a2, bond.order) {
                added += 1;
            }
        }
    }
    added
}

fn record_outcome(
    col: &mut AtomSetCollection,
    cell: &UnitCell,
    n_ops: usize,
    first_new_index: usize,
    pre_count: usize,
    range: CellRange,
) {
    col.set_atom_set_aux("symmetryOperations", &n_ops.to_string());
    col.set_atom_set_aux("presymmetryAtomIndex", &first_new_index.to_string());
    col.set_atom_set_aux("presymmetryAtomCount", &pre_count.to_string());
    col.set_atom_set_aux(
        "latticeRange",
        &format!(
            "{},{},{}..{},{},{}",
            range.min[0], range.min[1], range.min[2], range.max[0], range.max[1], range.max[2]
        ),
    );
    let notional: Vec<String> = cell.notional().iter().map(|v| v.to_string()).collect();
    col.aux
        .insert("notionalUnitCell".to_string(), notional.join(","));
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmol_mol::{AtomBuilder, BondOrder};

    fn fractional_collection(positions: &[(f32, f32, f32)]) -> AtomSetCollection {
        let mut col = AtomSetCollection::new("test");
        col.new_atom_set();
        col.coordinates_are_fractional = true;
        col.set_cell_parameters([10.0, 10.0, 10.0, 90.0, 90.0, 90.0]);
        for (i, (x, y, z)) in positions.iter().enumerate() {
            col.add_atom(
                AtomBuilder::new()
                    .name(&format!("C{}", i + 1))
                    .element_symbol("C")
                    .position(*x, *y, *z)
                    .build(),
            );
        }
        col
    }

    #[test]
    fn test_identity_only_expansion_is_a_noop() {
        let mut col = fractional_collection(&[(0.1, 0.2, 0.3), (0.4, 0.5, 0.6)]);
        let a1 = AtomIndex::new(0);
        let a2 = AtomIndex::new(1);
        col.add_bond(a1, a2, BondOrder::Single);
        col.add_symmetry_operator("x,y,z");

        let outcome = apply_symmetry(
            &mut col,
            &SymmetryRequest {
                apply_to_bonds: true,
                ..SymmetryRequest::default()
            },
        )
        .unwrap();

        assert!(outcome.applied);
        assert_eq!(outcome.operator_count, 1);
        assert_eq!(outcome.atoms_added, 0);
        assert_eq!(outcome.bonds_added, 0);
        assert_eq!(col.atom_count(), 2);
        assert_eq!(col.bond_count(), 1);
        // Positions are now Cartesian
        let p = col.atom(a1).unwrap().position().unwrap();
        assert!((p.x - 1.0).abs() < 1e-4);
        assert!(!col.coordinates_are_fractional);
    }

    #[test]
    fn test_two_fold_generates_image() {
        let mut col = fractional_collection(&[(0.25, 0.25, 0.1)]);
        col.add_symmetry_operator("x,y,z");
        col.add_symmetry_operator("-x,-y,z");

        let outcome = apply_symmetry(&mut col, &SymmetryRequest::default()).unwrap();

        assert_eq!(outcome.operator_count, 2);
        assert_eq!(outcome.atoms_added, 1);
        assert_eq!(col.atom_count(), 2);

        let original = col.atom(AtomIndex::new(0)).unwrap();
        assert!(original.bs_symmetry.get(0));
        assert!(!original.bs_symmetry.get(1));

        let image = col.atom(AtomIndex::new(1)).unwrap();
        assert!(image.bs_symmetry.get(1));
        // (-0.25,-0.25,0.1) normalizes to (0.75,0.75,0.1), Cartesian x10
        let p = image.position().unwrap();
        assert!((p.x - 7.5).abs() < 1e-3);
        assert!((p.y - 7.5).abs() < 1e-3);
        assert!((p.z - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_special_position_folds_with_both_bits() {
        // On the 2-fold axis: the image coincides with the original
        let mut col = fractional_collection(&[(0.0, 0.0, 0.3)]);
        col.add_symmetry_operator("x,y,z");
        col.add_symmetry_operator("-x,-y,z");

        let outcome = apply_symmetry(&mut col, &SymmetryRequest::default()).unwrap();

        assert_eq!(outcome.atoms_added, 0);
        assert_eq!(col.atom_count(), 1);
        let atom = col.atom(AtomIndex::new(0)).unwrap();
        assert!(atom.bs_symmetry.get(0));
        assert!(atom.bs_symmetry.get(1));
        assert_eq!(atom.bs_symmetry.cardinality(), 2);
    }

    #[test]
    fn test_lattice_translation_clones_cells() {
        let mut col = fractional_collection(&[(0.5, 0.5, 0.5)]);
        col.add_symmetry_operator("x,y,z");

        let outcome = apply_symmetry(
            &mut col,
            &SymmetryRequest {
                lattice: Some([2, 1, 1]),
                ..SymmetryRequest::default()
            },
        )
        .unwrap();

        // Base cell plus one +a translation
        assert_eq!(outcome.range.max, [1, 0, 0]);
        assert_eq!(outcome.atoms_added, 1);
        assert_eq!(col.atom_count(), 2);
        let image = col.atom(AtomIndex::new(1)).unwrap();
        // Bit index = cell_ordinal * n_ops + op_index = 1 * 1 + 0
        assert!(image.bs_symmetry.get(1));
        let p = image.position().unwrap();
        assert!((p.x - 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_bond_remap_across_images() {
        let mut col = fractional_collection(&[(0.1, 0.1, 0.1), (0.15, 0.1, 0.1)]);
        col.add_bond(AtomIndex::new(0), AtomIndex::new(1), BondOrder::Single);
        col.add_symmetry_operator("x,y,z");
        col.add_symmetry_operator("-x,-y,z");

        let outcome = apply_symmetry(
            &mut col,
            &SymmetryRequest {
                apply_to_bonds: true,
                pack_mode: Some(PackMode::Raw),
                ..SymmetryRequest::default()
            },
        )
        .unwrap();

        assert_eq!(outcome.atoms_added, 2);
        assert_eq!(outcome.bonds_added, 1);
        assert_eq!(col.bond_count(), 2);
        let image_bond = col.bonds().nth(1).unwrap();
        assert!(image_bond.atom1.as_usize() >= 2);
        assert!(image_bond.atom2.as_usize() >= 2);
    }

    #[test]
    fn test_space_group_by_name() {
        let mut col = fractional_collection(&[(0.1, 0.2, 0.3)]);
        col.set_space_group_name("P -1");

        let outcome = apply_symmetry(&mut col, &SymmetryRequest::default()).unwrap();
        assert_eq!(outcome.operator_count, 2);
        assert_eq!(col.atom_count(), 2);
    }

    #[test]
    fn test_unknown_space_group_leaves_frame_unexpanded() {
        let mut col = fractional_collection(&[(0.1, 0.2, 0.3)]);
        col.set_space_group_name("Q 999");

        let outcome = apply_symmetry(&mut col, &SymmetryRequest::default()).unwrap();
        assert_eq!(outcome.operator_count, 1);
        assert_eq!(outcome.atoms_added, 0);
        assert_eq!(col.atom_count(), 1);
        // Coordinates were still converted to Cartesian
        assert!(!col.coordinates_are_fractional);
    }

    #[test]
    fn test_no_unit_cell_bails_out() {
        let mut col = AtomSetCollection::new("test");
        col.new_atom_set();
        col.coordinates_are_fractional = true;
        col.add_atom(AtomBuilder::new().name("C1").position(0.1, 0.1, 0.1).build());

        let outcome = apply_symmetry(&mut col, &SymmetryRequest::default()).unwrap();
        assert!(!outcome.applied);
        // Still fractional: nothing to convert with
        assert!(col.coordinates_are_fractional);
    }

    #[test]
    fn test_state_cleared_after_apply() {
        let mut col = fractional_collection(&[(0.1, 0.2, 0.3)]);
        col.add_symmetry_operator("x,y,z");
        col.set_space_group_name("P 1");
        apply_symmetry(&mut col, &SymmetryRequest::default()).unwrap();
        assert!(col.symmetry_ops.is_empty());
        assert!(col.cell_params.is_none());
        assert!(col.space_group_name.is_none());
    }

    #[test]
    fn test_range_filter_drops_distant_images() {
        // One atom near the origin; +a translation puts the image 10 A away
        let mut col = fractional_collection(&[(0.05, 0.05, 0.05)]);
        col.add_symmetry_operator("x,y,z");

        let outcome = apply_symmetry(
            &mut col,
            &SymmetryRequest {
                lattice: Some([2, 1, 1]),
                pack_mode: Some(PackMode::Raw),
                symmetry_range: Some(5.0),
                ..SymmetryRequest::default()
            },
        )
        .unwrap();

        assert_eq!(outcome.atoms_added, 0);
        assert_eq!(col.atom_count(), 1);
    }
}
