//! Small row-major matrix helpers shared by the unit cell and operator code

use lin_alg::f32::Vec3;

/// Transform a Vec3 by a 3×3 row-major matrix
pub fn transform_3x3(m: &[f32; 9], v: Vec3) -> Vec3 {
    Vec3::new(
        m[0] * v.x + m[1] * v.y + m[2] * v.z,
        m[3] * v.x + m[4] * v.y + m[5] * v.z,
        m[6] * v.x + m[7] * v.y + m[8] * v.z,
    )
}

/// Invert a 3×3 row-major matrix using Cramer's rule.
/// Returns identity if the matrix is singular.
pub fn invert_3x3(m: &[f32; 9]) -> [f32; 9] {
    let a = m[0];
    let b = m[1];
    let c = m[2];
    let d = m[3];
    let e = m[4];
    let f = m[5];
    let g = m[6];
    let h = m[7];
    let i = m[8];

    let det = a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g);

    if det.abs() < 1e-30 {
        return [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
    }

    let inv_det = 1.0 / det;

    [
        (e * i - f * h) * inv_det,
        (c * h - b * i) * inv_det,
        (b * f - c * e) * inv_det,
        (f * g - d * i) * inv_det,
        (a * i - c * g) * inv_det,
        (c * d - a * f) * inv_det,
        (d * h - e * g) * inv_det,
        (b * g - a * h) * inv_det,
        (a * e - b * d) * inv_det,
    ]
}

/// Extract the top-left 3×3 and translation column from a row-major 4×4
pub fn split_4x4(m: &[f32; 16]) -> ([f32; 9], Vec3) {
    (
        [m[0], m[1], m[2], m[4], m[5], m[6], m[8], m[9], m[10]],
        Vec3::new(m[3], m[7], m[11]),
    )
}
