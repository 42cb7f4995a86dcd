//! Crystallographic unit cell math
//!
//! Converts Cartesian (real-space) coordinates to and from fractional
//! coordinates. The fractional-to-real matrix is derived from the six cell
//! parameters; files that declare explicit SCALE/matrix records can
//! override it.

use crate::error::{SymError, SymResult};
use crate::linalg::{invert_3x3, split_4x4, transform_3x3};
use lin_alg::f32::Vec3;

/// Unit cell with precomputed transformation matrices.
#[derive(Debug, Clone)]
pub struct UnitCell {
    /// Cell edge lengths (a, b, c) in Angstroms
    pub lengths: [f32; 3],
    /// Cell angles (alpha, beta, gamma) in degrees
    pub angles: [f32; 3],
    /// 3x3 fractional-to-real matrix (row-major)
    frac_to_real: [f32; 9],
    /// 3x3 real-to-fractional matrix (row-major)
    real_to_frac: [f32; 9],
    /// Translation applied after the real-to-frac rotation (matrix override)
    frac_offset: Vec3,
}

impl UnitCell {
    /// Build a cell from the six parameters a,b,c,alpha,beta,gamma.
    pub fn from_parameters(params: [f32; 6]) -> SymResult<UnitCell> {
        let lengths = [params[0], params[1], params[2]];
        let angles = [params[3], params[4], params[5]];
        if lengths.iter().any(|v| *v <= 0.0) || angles.iter().any(|v| *v <= 0.0 || *v >= 180.0) {
            return Err(SymError::NoUnitCell);
        }
        let frac_to_real = compute_frac_to_real(&lengths, &angles);
        let real_to_frac = invert_3x3(&frac_to_real);
        Ok(UnitCell {
            lengths,
            angles,
            frac_to_real,
            real_to_frac,
            frac_offset: Vec3::new(0.0, 0.0, 0.0),
        })
    }

    /// Build a cell from parameters but take the Cartesian-to-fractional
    /// transform from an explicit row-major 4x4 matrix (PDB SCALE records).
    pub fn from_parameters_and_matrix(params: [f32; 6], cart_to_frac: [f32; 16]) -> SymResult<UnitCell> {
        let mut cell = UnitCell::from_parameters(params)?;
        let (rot, offset) = split_4x4(&cart_to_frac);
        cell.real_to_frac = rot;
        cell.frac_to_real = invert_3x3(&rot);
        cell.frac_offset = offset;
        Ok(cell)
    }

    /// Transform a real-space position to fractional coordinates
    pub fn to_fractional(&self, v: Vec3) -> Vec3 {
        transform_3x3(&self.real_to_frac, v) + self.frac_offset
    }

    /// Transform fractional coordinates to real space
    pub fn to_real(&self, v: Vec3) -> Vec3 {
        transform_3x3(&self.frac_to_real, v - self.frac_offset)
    }

    /// Get the 3x3 fractional-to-real matrix (row-major)
    pub fn frac_to_real(&self) -> &[f32; 9] {
        &self.frac_to_real
    }

    /// Get the 3x3 real-to-fractional matrix (row-major)
    pub fn real_to_frac(&self) -> &[f32; 9] {
        &self.real_to_frac
    }

    /// The six cell parameters followed by the 16 elements of the
    /// homogeneous frac-to-real matrix, the "notional cell" array handed
    /// to viewers.
    pub fn notional(&self) -> [f32; 22] {
        let m = &self.frac_to_real;
        [
            self.lengths[0],
            self.lengths[1],
            self.lengths[2],
            self.angles[0],
            self.angles[1],
            self.angles[2],
            m[0], m[1], m[2], 0.0, //
            m[3], m[4], m[5], 0.0, //
            m[6], m[7], m[8], 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]
    }
}

/// Compute the frac-to-real 3x3 matrix from cell parameters.
/// Row-major: `[row0_col0, row0_col1, row0_col2, row1_col0, ...]`
fn compute_frac_to_real(lengths: &[f32; 3], angles: &[f32; 3]) -> [f32; 9] {
    let [a, b, c] = *lengths;
    let [alpha_deg, beta_deg, gamma_deg] = *angles;

    let alpha = alpha_deg.to_radians();
    let beta = beta_deg.to_radians();
    let gamma = gamma_deg.to_radians();

    let ca = alpha.cos();
    let cb = beta.cos();
    let cg = gamma.cos();
    let sb = beta.sin();
    let sg = gamma.sin();

    // cos(alpha*) = (cos(beta)*cos(gamma) - cos(alpha)) / (sin(beta)*sin(gamma))
    let cabgs = (cb * cg - ca) / (sb * sg);
    let sabgs = (1.0 - cabgs * cabgs).max(0.0).sqrt();

    [
        a,
        cg * b,
        cb * c,
        0.0,
        sg * b,
        -sb * cabgs * c,
        0.0,
        0.0,
        sb * sabgs * c,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orthogonal_cell() {
        let cell = UnitCell::from_parameters([10.0, 20.0, 30.0, 90.0, 90.0, 90.0]).unwrap();
        let real = cell.to_real(Vec3::new(0.5, 0.5, 0.5));
        assert!((real.x - 5.0).abs() < 1e-4);
        assert!((real.y - 10.0).abs() < 1e-4);
        assert!((real.z - 15.0).abs() < 1e-4);

        let back = cell.to_fractional(real);
        assert!((back.x - 0.5).abs() < 1e-4);
        assert!((back.y - 0.5).abs() < 1e-4);
        assert!((back.z - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_monoclinic_round_trip() {
        let cell = UnitCell::from_parameters([10.0, 20.0, 30.0, 90.0, 100.0, 90.0]).unwrap();
        let v = Vec3::new(5.0, 10.0, 15.0);
        let back = cell.to_real(cell.to_fractional(v));
        assert!((back.x - v.x).abs() < 1e-3);
        assert!((back.y - v.y).abs() < 1e-3);
        assert!((back.z - v.z).abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_cell_rejected() {
        assert!(UnitCell::from_parameters([0.0, 1.0, 1.0, 90.0, 90.0, 90.0]).is_err());
        assert!(UnitCell::from_parameters([1.0, 1.0, 1.0, 0.0, 90.0, 90.0]).is_err());
    }

    #[test]
    fn test_matrix_override() {
        // SCALE-style matrix for a 10x10x10 orthogonal cell
        let scale = [
            0.1, 0.0, 0.0, 0.0, //
            0.0, 0.1, 0.0, 0.0, //
            0.0, 0.0, 0.1, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let cell =
            UnitCell::from_parameters_and_matrix([10.0, 10.0, 10.0, 90.0, 90.0, 90.0], scale)
                .unwrap();
        let frac = cell.to_fractional(Vec3::new(5.0, 0.0, 0.0));
        assert!((frac.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_notional_layout() {
        let cell = UnitCell::from_parameters([10.0, 20.0, 30.0, 90.0, 90.0, 90.0]).unwrap();
        let n = cell.notional();
        assert_eq!(n[0], 10.0);
        assert_eq!(n[5], 90.0);
        assert_eq!(n[21], 1.0);
    }
}
