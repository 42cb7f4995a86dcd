//! Lattice cell ranges
//!
//! Load requests describe which unit-cell translations to generate as a
//! 3-integer descriptor. Two encodings are accepted:
//!
//! - plain counts `[na, nb, nc]`: cells `0..na` x `0..nb` x `0..nc`,
//!   so `[1,1,1]` is the base cell only;
//! - 555-packed bounds `[lo, hi, flag]` where each digit minus 5 is a
//!   signed cell offset, so `[444, 666, f]` spans (-1,-1,-1)..(1,1,1)
//!   and `[555, 555, f]` is the base cell only. The flag selects the
//!   coordinate wrapping mode.

/// What to do with fractional coordinates of generated atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackMode {
    /// Wrap every generated position into [0,1)
    #[default]
    Normalize,
    /// Wrap into [-packing tolerance, 1 + packing tolerance)
    Pack,
    /// Leave positions where the operators put them
    Raw,
}

impl PackMode {
    /// Descriptor flag values: 0 raw, 1 normalize, 2 pack
    pub fn from_flag(flag: i32) -> PackMode {
        match flag {
            1 => PackMode::Normalize,
            2 => PackMode::Pack,
            _ => PackMode::Raw,
        }
    }
}

/// Inclusive range of unit-cell translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub min: [i32; 3],
    pub max: [i32; 3],
}

impl CellRange {
    /// The base cell only
    pub fn base() -> CellRange {
        CellRange {
            min: [0, 0, 0],
            max: [0, 0, 0],
        }
    }

    /// Decode a lattice descriptor. Returns the range and the wrapping
    /// mode (plain-count descriptors default to Normalize).
    pub fn from_descriptor(desc: [i32; 3]) -> (CellRange, PackMode) {
        if is_packed(desc[0]) && is_packed(desc[1]) {
            let mut min = unpack_555(desc[0]);
            let mut max = unpack_555(desc[1]);
            for axis in 0..3 {
                if min[axis] > max[axis] {
                    std::mem::swap(&mut min[axis], &mut max[axis]);
                }
            }
            return (CellRange { min, max }, PackMode::from_flag(desc[2]));
        }
        let mut max = [0i32; 3];
        for axis in 0..3 {
            max[axis] = desc[axis].max(1) - 1;
        }
        (
            CellRange {
                min: [0, 0, 0],
                max,
            },
            PackMode::Normalize,
        )
    }

    pub fn cell_count(&self) -> usize {
        (0..3)
            .map(|axis| (self.max[axis] - self.min[axis] + 1) as usize)
            .product()
    }

    /// Translations in iteration order: the base cell (0,0,0) first when it
    /// is inside the range, then the rest lexicographically.
    pub fn cells(&self) -> Vec<[i32; 3]> {
        let mut cells = Vec::with_capacity(self.cell_count());
        let base_inside = (0..3).all(|axis| self.min[axis] <= 0 && 0 <= self.max[axis]);
        if base_inside {
            cells.push([0, 0, 0]);
        }
        for i in self.min[0]..=self.max[0] {
            for j in self.min[1]..=self.max[1] {
                for k in self.min[2]..=self.max[2] {
                    if base_inside && i == 0 && j == 0 && k == 0 {
                        continue;
                    }
                    cells.push([i, j, k]);
                }
            }
        }
        cells
    }
}

fn is_packed(value: i32) -> bool {
    (100..=999).contains(&value)
}

fn unpack_555(value: i32) -> [i32; 3] {
    [
        value / 100 % 10 - 5,
        value / 10 % 10 - 5,
        value % 10 - 5,
    ]
}
