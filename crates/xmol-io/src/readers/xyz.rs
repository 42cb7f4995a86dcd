//! XYZ format reader
//!
//! Handles plain multi-frame XYZ and the Tinker-style variant where the
//! count line carries trailing text and every atom line opens with a
//! serial number. Extra columns after the coordinates are read as an
//! optional charge (integer = formal, real = partial) and an optional
//! vibration vector.

use std::io::BufRead;

use lin_alg::f32::Vec3;

use xmol_mol::{element, Atom, AtomSetCollection};

use crate::error::IoResult;
use crate::options::LoadOptions;
use crate::scan::LineScanner;
use crate::traits::FormatReader;

pub struct XyzReader {
    options: LoadOptions,
    /// Tinker-style input: trailing text on the count line, serial
    /// numbers on atom lines, no comment line
    folding: bool,
}

impl XyzReader {
    pub fn new(folding: bool) -> Self {
        XyzReader {
            options: LoadOptions::default(),
            folding,
        }
    }
}

impl FormatReader for XyzReader {
    fn initialize(&mut self, options: &LoadOptions) {
        self.options = options.clone();
    }

    fn read(&mut self, input: &mut dyn BufRead) -> IoResult<AtomSetCollection> {
        let mut col = AtomSetCollection::new("xyz");
        col.is_trajectory = self.options.trajectory;

        let mut frame_number = 0;
        let mut line = String::new();
        loop {
            // Count line; a missing or non-numeric one ends the stream.
            let Some(count_line) = next_content_line(input, &mut line, &mut col) else {
                break;
            };
            let mut scanner = LineScanner::new(&count_line);
            let Some(count) = scanner.next_int().filter(|&n| n >= 0) else {
                break;
            };
            let count = count as usize;
            let tail = scanner.rest().trim().to_string();

            let comment = if self.folding {
                tail
            } else {
                if super::read_line_or_flag(input, &mut line, &mut col) == 0 {
                    break;
                }
                line.trim().to_string()
            };

            frame_number += 1;
            let wanted = self
                .options
                .desired_model
                .map_or(true, |m| m == frame_number);

            if wanted {
                col.new_atom_set();
                col.set_atom_set_number(frame_number);
                if !comment.is_empty() {
                    col.set_atom_set_name(&comment);
                }
            }

            for _ in 0..count {
                if super::read_line_or_flag(input, &mut line, &mut col) == 0 {
                    break;
                }
                if wanted {
                    read_atom_line(&mut col, line.trim_end(), self.folding);
                }
            }
            if wanted && col.collection_name.is_empty() && !comment.is_empty() {
                col.collection_name = comment;
            }
        }

        if col.atom_count() == 0 && col.error_message.is_none() {
            col.error_message = Some("no atom records found".to_string());
        }
        col.finish();
        Ok(col)
    }
}

fn read_atom_line(col: &mut AtomSetCollection, line: &str, folding: bool) {
    let mut scanner = LineScanner::new(line);
    if folding {
        // Leading serial number, ignored.
        if scanner.next_int().is_none() {
            return;
        }
    }
    let Some(symbol) = scanner.next_token() else {
        return;
    };
    let (Some(x), Some(y), Some(z)) =
        (scanner.next_float(), scanner.next_float(), scanner.next_float())
    else {
        return;
    };

    let mut atom = Atom::new(symbol, "");
    atom.element = element::number_for_symbol(symbol).unwrap_or(0);
    atom.set_position(Vec3::new(x, y, z));

    if let Some(token) = scanner.next_token() {
        if let Ok(charge) = token.parse::<i32>() {
            atom.formal_charge = charge.clamp(i8::MIN as i32, i8::MAX as i32) as i8;
        } else if let Ok(charge) = token.parse::<f32>() {
            atom.partial_charge = Some(charge);
        }
    }
    if let (Some(vx), Some(vy), Some(vz)) =
        (scanner.next_float(), scanner.next_float(), scanner.next_float())
    {
        atom.vibration = Some(Vec3::new(vx, vy, vz));
    }

    col.add_atom(atom);
}

/// Next non-blank line, or `None` at end of stream.
fn next_content_line(
    input: &mut dyn BufRead,
    buf: &mut String,
    col: &mut AtomSetCollection,
) -> Option<String> {
    loop {
        if super::read_line_or_flag(input, buf, col) == 0 {
            return None;
        }
        let trimmed = buf.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(content: &str, folding: bool) -> AtomSetCollection {
        let mut reader = XyzReader::new(folding);
        reader.initialize(&LoadOptions::default());
        reader.read(&mut content.as_bytes()).unwrap()
    }

    #[test]
    fn test_read_water() {
        let xyz = "3\nwater\nO 0.000 0.000 0.000\nH 0.757 0.586 0.000\nH -0.757 0.586 0.000\n";
        let col = read(xyz, false);
        assert_eq!(col.atom_count(), 3);
        assert_eq!(col.atom_set_count(), 1);
        assert_eq!(col.collection_name, "water");
        let o = col.atom(0u32.into()).unwrap();
        assert_eq!(o.element, 8);
        assert!((col.atom(1u32.into()).unwrap().position().unwrap().x - 0.757).abs() < 1e-6);
    }

    #[test]
    fn test_multi_frame() {
        let xyz = "1\nframe one\nC 0.0 0.0 0.0\n1\nframe two\nC 1.0 0.0 0.0\n";
        let col = read(xyz, false);
        assert_eq!(col.atom_set_count(), 2);
        assert_eq!(col.atom_count(), 2);
    }

    #[test]
    fn test_desired_frame_only() {
        let xyz = "1\none\nC 0.0 0.0 0.0\n1\ntwo\nC 1.0 0.0 0.0\n";
        let mut reader = XyzReader::new(false);
        reader.initialize(&LoadOptions::new().desired_model(2));
        let col = reader.read(&mut xyz.as_bytes()).unwrap();
        assert_eq!(col.atom_count(), 1);
        assert!((col.atom(0u32.into()).unwrap().position().unwrap().x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_charge_and_vibration_columns() {
        let xyz = "1\nextended\nO 0.0 0.0 0.0 -2 0.1 0.2 0.3\n";
        let col = read(xyz, false);
        let atom = col.atom(0u32.into()).unwrap();
        assert_eq!(atom.formal_charge, -2);
        let v = atom.vibration.unwrap();
        assert!((v.z - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_partial_charge_column() {
        let xyz = "1\n\nO 0.0 0.0 0.0 -0.834\n";
        let col = read(xyz, false);
        assert_eq!(col.atom(0u32.into()).unwrap().partial_charge, Some(-0.834));
    }

    #[test]
    fn test_folding_variant() {
        let xyz = "2 energy -12.4\n1 C 0.000 0.000 0.000\n2 O 1.220 0.000 0.000\n";
        let col = read(xyz, true);
        assert_eq!(col.atom_count(), 2);
        assert_eq!(col.atom(1u32.into()).unwrap().element, 8);
        assert_eq!(col.collection_name, "energy -12.4");
    }

    #[test]
    fn test_trajectory_flag() {
        let xyz = "1\nt0\nC 0.0 0.0 0.0\n1\nt1\nC 0.1 0.0 0.0\n";
        let mut reader = XyzReader::new(false);
        reader.initialize(&LoadOptions::new().trajectory(true));
        let col = reader.read(&mut xyz.as_bytes()).unwrap();
        assert!(col.is_trajectory);
        assert_eq!(col.atom_set_count(), 2);
    }
}
