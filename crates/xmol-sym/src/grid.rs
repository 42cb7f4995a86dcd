//! Duplicate-image folding for symmetry expansion
//!
//! Expansion generates one candidate position per (operator, cell) pair
//! and must fold candidates that land on an already placed atom within
//! the duplicate tolerance. Placed images are bucketed on quantized
//! Cartesian coordinates so a candidate only compares against nearby
//! images; a 3x3x3 bucket walk covers every point within one bucket
//! width, far above the tolerance.

use ahash::AHashMap;
use lin_alg::f32::Vec3;
use xmol_mol::AtomIndex;

use crate::expand::DUPLICATE_TOLERANCE;

/// Bucket width in Angstroms. Must exceed `DUPLICATE_TOLERANCE`.
const BUCKET_SIZE: f32 = 1.0;

struct PlacedImage {
    atom: AtomIndex,
    cart: Vec3,
    cell_ordinal: usize,
}

/// All images placed so far, queryable by position.
pub(crate) struct ImageFold {
    buckets: AHashMap<(i32, i32, i32), Vec<u32>>,
    placed: Vec<PlacedImage>,
}

impl ImageFold {
    pub fn with_capacity(expected: usize) -> Self {
        ImageFold {
            buckets: AHashMap::with_capacity(expected),
            placed: Vec::with_capacity(expected),
        }
    }

    fn bucket(pos: Vec3) -> (i32, i32, i32) {
        (
            (pos.x / BUCKET_SIZE).floor() as i32,
            (pos.y / BUCKET_SIZE).floor() as i32,
            (pos.z / BUCKET_SIZE).floor() as i32,
        )
    }

    /// Record a placed image. Base atoms are placed with cell ordinal 0.
    pub fn place(&mut self, atom: AtomIndex, cart: Vec3, cell_ordinal: usize) {
        let slot = self.placed.len() as u32;
        self.buckets
            .entry(Self::bucket(cart))
            .or_default()
            .push(slot);
        self.placed.push(PlacedImage {
            atom,
            cart,
            cell_ordinal,
        });
    }

    /// Find a placed image within the duplicate tolerance of the
    /// candidate position that the caller's predicate accepts. Unless
    /// `any_cell` is set, only images from the base cell or the
    /// candidate's own lattice cell count as coincident.
    pub fn fold(
        &self,
        cart: Vec3,
        cell_ordinal: usize,
        any_cell: bool,
        mut accept: impl FnMut(AtomIndex) -> bool,
    ) -> Option<AtomIndex> {
        let tol2 = DUPLICATE_TOLERANCE * DUPLICATE_TOLERANCE;
        let (cx, cy, cz) = Self::bucket(cart);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.buckets.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &slot in bucket {
                        let image = &self.placed[slot as usize];
                        if !any_cell
                            && image.cell_ordinal != cell_ordinal
                            && image.cell_ordinal != 0
                        {
                            continue;
                        }
                        let d = cart - image.cart;
                        if d.magnitude_squared() > tol2 {
                            continue;
                        }
                        if accept(image.atom) {
                            return Some(image.atom);
                        }
                    }
                }
            }
        }
        None
    }
}
