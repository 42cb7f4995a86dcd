//! Jones-Faithful symmetry operators
//!
//! A symmetry operation is an affine map over fractional coordinates,
//! stored as a row-major 3×4 matrix (rotation columns x,y,z plus a
//! translation). Operators parse from the textual notation used by CIF,
//! PDB REMARK 290, and SHELX SYMM records, e.g. `"-y,x-y,z+1/3"`.

use crate::error::{SymError, SymResult};
use lin_alg::f32::Vec3;

/// One symmetry operation: rows of `[cx, cy, cz, t]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymOp {
    pub mat: [f32; 12],
}

impl SymOp {
    /// The identity operation `x,y,z`
    pub fn identity() -> SymOp {
        SymOp {
            mat: [
                1.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0,
            ],
        }
    }

    /// Parse a Jones-Faithful string into an operator.
    ///
    /// Exactly three comma-separated components, each a sum of signed
    /// `x`/`y`/`z` terms and integer or fractional constants. Axis terms
    /// may carry a fractional coefficient (`1/2*x`), the form the
    /// serializer emits for non-unit matrix entries. Anything else is an
    /// error; callers accumulating operators from file headers log and
    /// skip it.
    pub fn parse(text: &str) -> SymResult<SymOp> {
        let components: Vec<&str> = text.split(',').collect();
        if components.len() != 3 {
            return Err(SymError::invalid_operator(text, "expected 3 components"));
        }
        let mut mat = [0.0f32; 12];
        for (row, expr) in components.iter().enumerate() {
            let (coeffs, trans) = parse_expr(expr.trim())
                .map_err(|why| SymError::invalid_operator(text, &why))?;
            if coeffs == [0.0, 0.0, 0.0] {
                return Err(SymError::invalid_operator(text, "row has no x/y/z term"));
            }
            mat[row * 4] = coeffs[0];
            mat[row * 4 + 1] = coeffs[1];
            mat[row * 4 + 2] = coeffs[2];
            mat[row * 4 + 3] = trans;
        }
        Ok(SymOp { mat })
    }

    /// Apply the operation to a fractional point
    pub fn apply(&self, frac: Vec3) -> Vec3 {
        let m = &self.mat;
        Vec3::new(
            m[0] * frac.x + m[1] * frac.y + m[2] * frac.z + m[3],
            m[4] * frac.x + m[5] * frac.y + m[6] * frac.z + m[7],
            m[8] * frac.x + m[9] * frac.y + m[10] * frac.z + m[11],
        )
    }

    /// The translation column
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.mat[3], self.mat[7], self.mat[11])
    }

    pub fn is_identity(&self) -> bool {
        let id = SymOp::identity();
        self.mat
            .iter()
            .zip(id.mat.iter())
            .all(|(a, b)| (a - b).abs() < 1e-5)
    }

    /// Serialize back to canonical Jones-Faithful text.
    ///
    /// Coefficients are emitted in x,y,z order; translations as reduced
    /// twelfths (every crystallographic translation is a multiple of 1/12).
    pub fn to_jones_faithful(&self) -> String {
        let vars = ['x', 'y', 'z'];
        let mut rows = Vec::with_capacity(3);
        for row in 0..3 {
            let mut s = String::new();
            for (col, var) in vars.iter().enumerate() {
                let c = self.mat[row * 4 + col];
                if c.abs() < 1e-5 {
                    continue;
                }
                if c > 0.0 {
                    if !s.is_empty() {
                        s.push('+');
                    }
                } else {
                    s.push('-');
                }
                let mag = c.abs();
                if (mag - 1.0).abs() > 1e-5 {
                    s.push_str(&format_fraction(mag));
                    s.push('*');
                }
                s.push(*var);
            }
            let t = self.mat[row * 4 + 3];
            if t.abs() > 1e-5 {
                if t > 0.0 && !s.is_empty() {
                    s.push('+');
                } else if t < 0.0 {
                    s.push('-');
                }
                s.push_str(&format_fraction(t.abs()));
            }
            if s.is_empty() {
                s.push('0');
            }
            rows.push(s);
        }
        rows.join(",")
    }
}

/// Render a positive value as a reduced fraction over 12, or a bare
/// integer when whole
fn format_fraction(value: f32) -> String {
    let twelfths = (value * 12.0).round() as i64;
    if twelfths % 12 == 0 {
        return format!("{}", twelfths / 12);
    }
    let g = gcd(twelfths, 12);
    format!("{}/{}", twelfths / g, 12 / g)
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Parse one component like `-x+1/2` or `y-z`.
/// Returns ([coeff_x, coeff_y, coeff_z], translation).
fn parse_expr(expr: &str) -> Result<([f32; 3], f32), String> {
    let mut coeffs = [0.0f32; 3];
    let mut trans = 0.0f32;

    let chars: Vec<char> = expr.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        let c = chars[i];

        let sign = if c == '-' {
            i += 1;
            -1.0
        } else if c == '+' {
            i += 1;
            1.0
        } else {
            1.0
        };

        if i >= len {
            return Err("dangling sign".to_string());
        }

        let c = chars[i];
        match c {
            'x' | 'X' => {
                coeffs[0] += sign;
                i += 1;
            }
            'y' | 'Y' => {
                coeffs[1] += sign;
                i += 1;
            }
            'z' | 'Z' => {
                coeffs[2] += sign;
                i += 1;
            }
            '0'..='9' => {
                let (val, consumed) = parse_number(&chars[i..]);
                i += consumed;
                // A number followed by an axis is a coefficient
                // ("1/2*x", "2y"), otherwise a translation term.
                let mut j = i;
                if j < len && chars[j] == '*' {
                    j += 1;
                }
                match chars.get(j) {
                    Some('x' | 'X') => {
                        coeffs[0] += sign * val;
                        i = j + 1;
                    }
                    Some('y' | 'Y') => {
                        coeffs[1] += sign * val;
                        i = j + 1;
                    }
                    Some('z' | 'Z') => {
                        coeffs[2] += sign * val;
                        i = j + 1;
                    }
                    _ => trans += sign * val,
                }
            }
            ' ' => {
                i += 1;
            }
            other => {
                return Err(format!("unexpected character {other:?}"));
            }
        }
    }

    Ok((coeffs, trans))
}

/// Parse an integer or a fraction like "1/2". Returns (value, chars consumed).
fn parse_number(chars: &[char]) -> (f32, usize) {
    let mut i = 0;
    let mut numerator = 0.0f32;

    while i < chars.len() && chars[i].is_ascii_digit() {
        numerator = numerator * 10.0 + (chars[i] as u32 - '0' as u32) as f32;
        i += 1;
    }

    if i < chars.len() && chars[i] == '/' {
        i += 1;
        let mut denominator = 0.0f32;
        while i < chars.len() && chars[i].is_ascii_digit() {
            denominator = denominator * 10.0 + (chars[i] as u32 - '0' as u32) as f32;
            i += 1;
        }
        if denominator != 0.0 {
            return (numerator / denominator, i);
        }
    }

    (numerator, i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identity() {
        let op = SymOp::parse("x,y,z").unwrap();
        assert!(op.is_identity());
        let p = Vec3::new(0.2, -0.7, 1.3);
        let q = op.apply(p);
        assert!((q.x - p.x).abs() < 1e-6);
        assert!((q.y - p.y).abs() < 1e-6);
        assert!((q.z - p.z).abs() < 1e-6);
    }

    #[test]
    fn test_parse_negative_with_translation() {
        let op = SymOp::parse("-x+1/2,-y+1/2,z").unwrap();
        assert_eq!(op.mat[0], -1.0);
        assert_eq!(op.mat[3], 0.5);
        assert_eq!(op.mat[5], -1.0);
        assert_eq!(op.mat[7], 0.5);
        assert_eq!(op.mat[10], 1.0);
    }

    #[test]
    fn test_parse_third_fraction() {
        let op = SymOp::parse("-y,x-y,z+1/3").unwrap();
        assert_eq!(op.mat[1], -1.0);
        assert_eq!(op.mat[4], 1.0);
        assert_eq!(op.mat[5], -1.0);
        assert!((op.mat[11] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_origin_maps_to_translation() {
        for text in ["x,y,z", "-x+1/2,-y+1/2,z", "-y,x-y,z+1/3", "x+1/4,y-1/6,z+5/6"] {
            let op = SymOp::parse(text).unwrap();
            let at_origin = op.apply(Vec3::new(0.0, 0.0, 0.0));
            let t = op.translation();
            assert!((at_origin.x - t.x).abs() < 1e-6, "{text}");
            assert!((at_origin.y - t.y).abs() < 1e-6, "{text}");
            assert!((at_origin.z - t.z).abs() < 1e-6, "{text}");
        }
    }

    #[test]
    fn test_round_trip_through_serializer() {
        for text in ["x,y,z", "-x+1/2,-y+1/2,z", "-y,x-y,z+1/3", "-x,-y,-z"] {
            let op = SymOp::parse(text).unwrap();
            let reparsed = SymOp::parse(&op.to_jones_faithful()).unwrap();
            for (a, b) in op.mat.iter().zip(reparsed.mat.iter()) {
                assert!((a - b).abs() < 1e-5, "{text}");
            }
        }
    }

    #[test]
    fn test_fractional_coefficients_round_trip() {
        let op = SymOp {
            mat: [
                0.5, 0.0, 0.0, 0.25, //
                0.0, -0.5, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0,
            ],
        };
        let text = op.to_jones_faithful();
        assert_eq!(text, "1/2*x+1/4,-1/2*y,z");
        let reparsed = SymOp::parse(&text).unwrap();
        for (a, b) in op.mat.iter().zip(reparsed.mat.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_malformed_operators_rejected() {
        assert!(SymOp::parse("x,y").is_err());
        assert!(SymOp::parse("x,y,q").is_err());
        assert!(SymOp::parse("1/2,y,z").is_err());
        assert!(SymOp::parse("x,y,z-").is_err());
    }
}
