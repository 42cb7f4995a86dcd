//! Load-time configuration
//!
//! Built by the caller, handed to a reader through
//! `FormatReader::initialize` before parsing starts. Symmetry-related
//! fields are converted to a `SymmetryRequest` when the reader hands a
//! finished frame to the expansion engine.

use xmol_sym::{PackMode, SpaceGroupSource, SymmetryRequest};

/// Options applied to one parse.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Load only this model/frame number; None = all frames
    pub desired_model: Option<i32>,
    /// Lattice cell descriptor (see `CellRange::from_descriptor`)
    pub lattice_cells: Option<[i32; 3]>,
    /// Coordinate wrapping override
    pub pack_mode: Option<PackMode>,
    /// Where symmetry operators come from
    pub space_group: SpaceGroupSource,
    /// Unit cell override (a,b,c,alpha,beta,gamma)
    pub unit_cell: Option<[f32; 6]>,
    /// Re-derive bonds for symmetry-generated atoms
    pub symmetry_bonds: bool,
    /// Treat multi-frame input as a trajectory rather than separate models
    pub trajectory: bool,
    /// Signed symmetry distance filter (positive: keep images within this
    /// range of the base cell; negative: box filter)
    pub symmetry_range: Option<f32>,
}

impl LoadOptions {
    pub fn new() -> Self {
        LoadOptions::default()
    }

    pub fn desired_model(mut self, model: i32) -> Self {
        self.desired_model = Some(model);
        self
    }

    pub fn lattice_cells(mut self, descriptor: [i32; 3]) -> Self {
        self.lattice_cells = Some(descriptor);
        self
    }

    pub fn pack_mode(mut self, mode: PackMode) -> Self {
        self.pack_mode = Some(mode);
        self
    }

    pub fn space_group(mut self, source: SpaceGroupSource) -> Self {
        self.space_group = source;
        self
    }

    pub fn unit_cell(mut self, cell: [f32; 6]) -> Self {
        self.unit_cell = Some(cell);
        self
    }

    pub fn symmetry_bonds(mut self, apply: bool) -> Self {
        self.symmetry_bonds = apply;
        self
    }

    pub fn trajectory(mut self, trajectory: bool) -> Self {
        self.trajectory = trajectory;
        self
    }

    pub fn symmetry_range(mut self, range: f32) -> Self {
        self.symmetry_range = Some(range);
        self
    }

    /// The expansion request derived from these options
    pub fn symmetry_request(&self) -> SymmetryRequest {
        SymmetryRequest {
            lattice: self.lattice_cells,
            pack_mode: self.pack_mode,
            space_group: self.space_group.clone(),
            unit_cell: self.unit_cell,
            apply_to_bonds: self.symmetry_bonds,
            symmetry_range: self.symmetry_range,
        }
    }

    /// True when the caller explicitly asked for expansion regardless of
    /// what the file declares
    pub fn requests_symmetry(&self) -> bool {
        self.lattice_cells.is_some() || self.space_group != SpaceGroupSource::FromFile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = LoadOptions::new()
            .desired_model(2)
            .lattice_cells([555, 555, 1])
            .symmetry_bonds(true);
        assert_eq!(options.desired_model, Some(2));
        assert!(options.requests_symmetry());
        let req = options.symmetry_request();
        assert!(req.apply_to_bonds);
        assert_eq!(req.lattice, Some([555, 555, 1]));
    }

    #[test]
    fn test_default_does_not_request_symmetry() {
        assert!(!LoadOptions::new().requests_symmetry());
    }
}
