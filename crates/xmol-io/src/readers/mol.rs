//! MDL Molfile / SD file reader
//!
//! V2000 connection tables. Multi-record SD files become one frame per
//! record, with the data items between `M  END` and `$$$$` attached to
//! the frame as auxiliary key/value pairs. An `M  CHG` property block
//! supersedes the atom-block charge column for the whole record.

use std::io::BufRead;

use lin_alg::f32::Vec3;

use xmol_mol::{element, Atom, AtomIndex, AtomSetCollection, BondOrder};

use crate::error::IoResult;
use crate::options::LoadOptions;
use crate::traits::FormatReader;

pub struct MolReader {
    options: LoadOptions,
}

impl MolReader {
    pub fn new() -> Self {
        MolReader {
            options: LoadOptions::default(),
        }
    }
}

impl Default for MolReader {
    fn default() -> Self {
        MolReader::new()
    }
}

impl FormatReader for MolReader {
    fn initialize(&mut self, options: &LoadOptions) {
        self.options = options.clone();
    }

    fn read(&mut self, input: &mut dyn BufRead) -> IoResult<AtomSetCollection> {
        let mut col = AtomSetCollection::new("mol");
        col.is_trajectory = self.options.trajectory;

        let mut record_number = 0;
        loop {
            record_number += 1;
            let wanted = self
                .options
                .desired_model
                .map_or(true, |m| m == record_number);
            match read_record(&mut col, input, record_number, wanted) {
                RecordEnd::MoreRecords => continue,
                RecordEnd::EndOfStream => break,
            }
        }

        if col.atom_count() == 0 && col.error_message.is_none() {
            col.error_message = Some("no connection table found".to_string());
        }
        col.finish();
        Ok(col)
    }
}

enum RecordEnd {
    MoreRecords,
    EndOfStream,
}

fn read_record(
    col: &mut AtomSetCollection,
    input: &mut dyn BufRead,
    record_number: i32,
    wanted: bool,
) -> RecordEnd {
    let mut line = String::new();

    // Header block: name, program line, comment.
    let Some(name) = read_line(input, col, &mut line) else {
        return RecordEnd::EndOfStream;
    };
    let name = name.trim().to_string();
    if read_line(input, col, &mut line).is_none() || read_line(input, col, &mut line).is_none() {
        return RecordEnd::EndOfStream;
    }

    let Some(counts) = read_line(input, col, &mut line) else {
        return RecordEnd::EndOfStream;
    };
    // Trailing blank lines after the last record are not a new header.
    if counts.trim().is_empty() {
        return RecordEnd::EndOfStream;
    }
    let n_atoms = field_int(&counts, 0, 3).unwrap_or(0).max(0) as usize;
    let n_bonds = field_int(&counts, 3, 6).unwrap_or(0).max(0) as usize;

    let base = col.atom_count() as u32;
    if wanted {
        col.new_atom_set();
        col.set_atom_set_number(record_number);
        if !name.is_empty() {
            col.set_atom_set_name(&name);
        }
    }

    for _ in 0..n_atoms {
        let Some(atom_line) = read_line(input, col, &mut line) else {
            return RecordEnd::EndOfStream;
        };
        if wanted {
            read_atom_line(col, &atom_line);
        }
    }
    for _ in 0..n_bonds {
        let Some(bond_line) = read_line(input, col, &mut line) else {
            return RecordEnd::EndOfStream;
        };
        if wanted {
            read_bond_line(col, &bond_line, base);
        }
    }

    // Properties block up to M  END, then data items up to $$$$.
    let mut charges_reset = false;
    loop {
        let Some(text) = read_line(input, col, &mut line) else {
            return RecordEnd::EndOfStream;
        };
        if text.starts_with("M  END") {
            break;
        }
        if wanted && text.starts_with("M  CHG") {
            read_charge_property(col, &text, base, &mut charges_reset);
        }
        if text.starts_with("$$$$") {
            return RecordEnd::MoreRecords;
        }
    }

    let mut data_tag: Option<String> = None;
    loop {
        let Some(text) = read_line(input, col, &mut line) else {
            return RecordEnd::EndOfStream;
        };
        if text.starts_with("$$$$") {
            return RecordEnd::MoreRecords;
        }
        if let Some(rest) = text.trim().strip_prefix('>') {
            data_tag = rest
                .find('<')
                .and_then(|open| rest[open + 1..].find('>').map(|close| (open, close)))
                .map(|(open, close)| rest[open + 1..open + 1 + close].to_string());
            continue;
        }
        if let Some(tag) = &data_tag {
            let value = text.trim();
            if !value.is_empty() && wanted {
                col.set_atom_set_aux(tag, value);
            }
        }
    }
}

/// x, y, z in three 10-column fields, symbol at 31..34, charge code at
/// 36..39.
fn read_atom_line(col: &mut AtomSetCollection, line: &str) {
    let float = |start: usize, end: usize| {
        line.get(start..end).and_then(|s| s.trim().parse::<f32>().ok())
    };
    let (Some(x), Some(y), Some(z)) = (float(0, 10), float(10, 20), float(20, 30)) else {
        return;
    };
    let symbol = line.get(31..34).map(str::trim).unwrap_or("");

    let mut atom = Atom::new(symbol, "");
    atom.element = element::number_for_symbol(symbol).unwrap_or(0);
    atom.set_position(Vec3::new(x, y, z));
    atom.formal_charge = match field_int(line, 36, 39).unwrap_or(0) {
        1 => 3,
        2 => 2,
        3 => 1,
        5 => -1,
        6 => -2,
        7 => -3,
        _ => 0,
    };
    col.add_atom(atom);
}

fn read_bond_line(col: &mut AtomSetCollection, line: &str, base: u32) {
    let (Some(a1), Some(a2)) = (field_int(line, 0, 3), field_int(line, 3, 6)) else {
        return;
    };
    if a1 < 1 || a2 < 1 {
        return;
    }
    let code = field_int(line, 6, 9).unwrap_or(1) as i32;
    let stereo = field_int(line, 9, 12).unwrap_or(0);
    let order = match (code, stereo) {
        (1, 1) => BondOrder::StereoNear,
        (1, 6) => BondOrder::StereoFar,
        _ => BondOrder::from_mdl_code(code),
    };
    col.add_bond(
        AtomIndex::new(base + a1 as u32 - 1),
        AtomIndex::new(base + a2 as u32 - 1),
        order,
    );
}

/// `M  CHG  n aaa vvv ...`; the first such line zeroes every charge in
/// the record before applying its pairs.
fn read_charge_property(
    col: &mut AtomSetCollection,
    line: &str,
    base: u32,
    charges_reset: &mut bool,
) {
    if !*charges_reset {
        for index in base..col.atom_count() as u32 {
            if let Some(atom) = col.atom_mut(AtomIndex::new(index)) {
                atom.formal_charge = 0;
            }
        }
        *charges_reset = true;
    }
    let mut tokens = line.split_whitespace().skip(2);
    let Some(n) = tokens.next().and_then(|t| t.parse::<usize>().ok()) else {
        return;
    };
    for _ in 0..n {
        let (Some(number), Some(charge)) = (
            tokens.next().and_then(|t| t.parse::<u32>().ok()),
            tokens.next().and_then(|t| t.parse::<i8>().ok()),
        ) else {
            return;
        };
        if number < 1 {
            continue;
        }
        if let Some(atom) = col.atom_mut(AtomIndex::new(base + number - 1)) {
            atom.formal_charge = charge;
        }
    }
}

fn field_int(line: &str, start: usize, end: usize) -> Option<i64> {
    line.get(start..end)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}

fn read_line(
    input: &mut dyn BufRead,
    col: &mut AtomSetCollection,
    buf: &mut String,
) -> Option<String> {
    if super::read_line_or_flag(input, buf, col) == 0 {
        return None;
    }
    Some(buf.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const METHANE: &str = "\
methane
  xmol
comment
  5  4  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    0.6300    0.6300    0.6300 H   0  0  0  0  0  0  0  0  0  0  0  0
   -0.6300   -0.6300    0.6300 H   0  0  0  0  0  0  0  0  0  0  0  0
   -0.6300    0.6300   -0.6300 H   0  0  0  0  0  0  0  0  0  0  0  0
    0.6300   -0.6300   -0.6300 H   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0
  1  3  1  0
  1  4  1  0
  1  5  1  0
M  END
";

    fn read(content: &str) -> AtomSetCollection {
        let mut reader = MolReader::new();
        reader.initialize(&LoadOptions::default());
        reader.read(&mut content.as_bytes()).unwrap()
    }

    #[test]
    fn test_read_methane() {
        let col = read(METHANE);
        assert_eq!(col.atom_count(), 5);
        assert_eq!(col.bond_count(), 4);
        assert_eq!(col.atom(0u32.into()).unwrap().element, 6);
        assert_eq!(col.collection_name, "methane");
        let bond = col.bonds().next().unwrap();
        assert_eq!(bond.order, BondOrder::Single);
    }

    #[test]
    fn test_charge_property_supersedes_column() {
        let mol = "\
acetate fragment
  xmol
comment
  2  1  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  3  0  0  0  0  0  0  0  0  0  0
    1.2500    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0
M  CHG  1   2  -1
M  END
";
        let col = read(mol);
        // The carbon's charge-column value is wiped by the CHG block.
        assert_eq!(col.atom(0u32.into()).unwrap().formal_charge, 0);
        assert_eq!(col.atom(1u32.into()).unwrap().formal_charge, -1);
    }

    #[test]
    fn test_stereo_bond_codes() {
        let mol = "\
stereo
  xmol
comment
  2  1  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.5000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  6
M  END
";
        let col = read(mol);
        assert_eq!(col.bonds().next().unwrap().order, BondOrder::StereoFar);
    }

    #[test]
    fn test_sd_file_two_records_two_frames() {
        let sdf = format!(
            "{METHANE}>  <melting.point>\n-182.5\n\n$$$$\n{METHANE}$$$$\n"
        );
        let col = read(&sdf);
        assert_eq!(col.atom_set_count(), 2);
        assert_eq!(col.atom_count(), 10);
        assert_eq!(col.bond_count(), 8);
        // Second frame's bonds reference second-frame atoms.
        let last = col.bonds().last().unwrap();
        assert_eq!(last.atom1.as_usize(), 5);
        let info = col.atom_set_info(0u32.into()).unwrap();
        assert_eq!(
            info.aux.get("melting.point").map(String::as_str),
            Some("-182.5")
        );
    }

    #[test]
    fn test_trailing_blank_lines_add_no_frame() {
        let sdf = format!("{METHANE}$$$$\n\n\n\n\n\n");
        let col = read(&sdf);
        assert_eq!(col.atom_set_count(), 1);
        assert_eq!(col.atom_count(), 5);
    }

    #[test]
    fn test_desired_record_only() {
        let sdf = format!("{METHANE}$$$$\n{METHANE}$$$$\n");
        let mut reader = MolReader::new();
        reader.initialize(&LoadOptions::new().desired_model(2));
        let col = reader.read(&mut sdf.as_bytes()).unwrap();
        assert_eq!(col.atom_set_count(), 1);
        assert_eq!(col.atom_count(), 5);
    }
}
