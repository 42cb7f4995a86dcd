//! PDB format reader
//!
//! Fixed-column records parsed with tolerant slicing: a field that is
//! absent or malformed falls back to its default instead of failing the
//! line. Operators declared in REMARK 290 SMTRY rows are Cartesian and
//! are conjugated into fractional form once the CRYST1 cell is known.

use std::io::BufRead;

use ahash::AHashMap;
use lin_alg::f32::Vec3;
use smallvec::SmallVec;

use xmol_mol::{element, Atom, AtomIndex, AtomSetCollection, BondOrder, Structure, StructureKind};
use xmol_sym::{SymOp, UnitCell};

use crate::error::IoResult;
use crate::options::LoadOptions;
use crate::traits::FormatReader;

/// Reader for PDB-format files.
pub struct PdbReader {
    options: LoadOptions,
}

impl PdbReader {
    pub fn new() -> Self {
        PdbReader {
            options: LoadOptions::default(),
        }
    }
}

impl Default for PdbReader {
    fn default() -> Self {
        PdbReader::new()
    }
}

/// One partially accumulated Cartesian symmetry operator from
/// REMARK 290 SMTRY rows.
#[derive(Default, Clone)]
struct SmtryRows {
    rows: [[f32; 4]; 3],
    seen: [bool; 3],
}

struct Parse {
    col: AtomSetCollection,
    title: String,
    model_number: i32,
    frame_open: bool,
    need_new_frame: bool,
    scale_rows: [[f32; 4]; 3],
    scale_seen: [bool; 3],
    smtry: AHashMap<i32, SmtryRows>,
    structures: Vec<Structure>,
    /// Serial-to-index map per frame, for CONECT replay
    frame_serials: Vec<AHashMap<i32, AtomIndex>>,
    /// Buffered CONECT pairs, applied to every frame once the stream ends
    conect: Vec<(i32, i32)>,
}

impl Parse {
    fn new() -> Self {
        Parse {
            col: AtomSetCollection::new("pdb"),
            title: String::new(),
            model_number: 1,
            frame_open: false,
            need_new_frame: false,
            scale_rows: [[0.0; 4]; 3],
            scale_seen: [false; 3],
            smtry: AHashMap::new(),
            structures: Vec::new(),
            frame_serials: Vec::new(),
            conect: Vec::new(),
        }
    }

    fn model_wanted(&self, options: &LoadOptions) -> bool {
        options
            .desired_model
            .map_or(true, |m| m == self.model_number)
    }
}

impl FormatReader for PdbReader {
    fn initialize(&mut self, options: &LoadOptions) {
        self.options = options.clone();
    }

    fn read(&mut self, input: &mut dyn BufRead) -> IoResult<AtomSetCollection> {
        let mut p = Parse::new();
        p.col.is_trajectory = self.options.trajectory;

        let mut line = String::new();
        loop {
            if super::read_line_or_flag(input, &mut line, &mut p.col) == 0 {
                break;
            }
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let record = if line.len() >= 6 { &line[0..6] } else { line };
            match record {
                "ATOM  " | "HETATM" => {
                    if p.model_wanted(&self.options) {
                        read_atom(&mut p, line);
                    }
                }
                "ANISOU" => {
                    if p.model_wanted(&self.options) {
                        read_anisou(&mut p, line);
                    }
                }
                "CONECT" => read_conect(&mut p, line),
                "CRYST1" => read_cryst1(&mut p, line),
                "SCALE1" | "SCALE2" | "SCALE3" => read_scale(&mut p, line),
                "REMARK" => read_remark(&mut p, line),
                "HELIX " | "SHEET " | "TURN  " => read_structure(&mut p, line),
                "MODEL " => {
                    let number = line
                        .get(10..14)
                        .and_then(|s| s.trim().parse::<i32>().ok())
                        .unwrap_or(p.model_number + 1);
                    if p.frame_open {
                        close_frame(&mut p, &self.options);
                        p.need_new_frame = true;
                    }
                    p.model_number = number;
                }
                "ENDMDL" => {}
                "TITLE " => {
                    if let Some(text) = line.get(10..) {
                        if !p.title.is_empty() {
                            p.title.push(' ');
                        }
                        p.title.push_str(text.trim());
                    }
                }
                "TER   " | "TER" => {}
                "END   " | "END" => break,
                _ => {}
            }
        }

        if p.frame_open {
            close_frame(&mut p, &self.options);
        }
        apply_conect(&mut p);

        let mut col = p.col;
        col.collection_name = p.title;
        if col.atom_count() == 0 && col.error_message.is_none() {
            col.error_message = Some("no atom records found".to_string());
        }
        col.finish();
        Ok(col)
    }
}

fn read_atom(p: &mut Parse, line: &str) {
    let float = |range: std::ops::Range<usize>| {
        line.get(range).and_then(|s| s.trim().parse::<f32>().ok())
    };

    let serial = line.get(6..11).map(str::trim).unwrap_or("");
    let raw_name = line.get(12..16).unwrap_or("");
    let hetero = line.starts_with("HETATM");

    let mut atom = Atom::new(raw_name.trim(), "");
    if raw_name.trim().is_empty() {
        atom.name = None;
    }
    atom.hetero = hetero;
    atom.alt_loc = line.chars().nth(16).filter(|c| !c.is_whitespace());
    atom.group3 = line
        .get(17..20)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    atom.chain = line.chars().nth(21).filter(|c| !c.is_whitespace());
    atom.sequence_number = line.get(22..26).and_then(|s| s.trim().parse().ok());
    atom.insertion_code = line.chars().nth(26).filter(|c| !c.is_whitespace());

    if let (Some(x), Some(y), Some(z)) = (float(30..38), float(38..46), float(46..54)) {
        atom.set_position(Vec3::new(x, y, z));
    }
    if let Some(occ) = float(54..60) {
        atom.occupancy = (occ * 100.0).round().clamp(0.0, 100.0) as u8;
    }
    atom.b_factor = float(60..66);

    let symbol = line.get(76..78).map(str::trim).unwrap_or("");
    atom.element = element::number_for_symbol(symbol)
        .unwrap_or_else(|| element::infer_from_name(raw_name, hetero));
    atom.formal_charge = read_charge_column(line.get(78..80).unwrap_or(""));

    if p.need_new_frame {
        p.col.new_atom_set();
        p.need_new_frame = false;
        p.frame_serials.push(AHashMap::new());
    } else if !p.frame_open {
        p.frame_serials.push(AHashMap::new());
    }
    let index = p.col.add_atom(atom);
    p.frame_open = true;
    if !serial.is_empty() {
        p.col.register_atom_key(serial, index);
        if let Ok(number) = serial.parse::<i32>() {
            if let Some(map) = p.frame_serials.last_mut() {
                map.insert(number, index);
            }
        }
    }
}

/// PDB charge column is digit-then-sign ("2+", "1-").
fn read_charge_column(field: &str) -> i8 {
    let field = field.trim();
    let mut chars = field.chars();
    match (chars.next(), chars.next()) {
        (Some(d), Some('+')) if d.is_ascii_digit() => (d as u8 - b'0') as i8,
        (Some(d), Some('-')) if d.is_ascii_digit() => -((d as u8 - b'0') as i8),
        _ => 0,
    }
}

fn read_anisou(p: &mut Parse, line: &str) {
    let serial = line.get(6..11).map(str::trim).unwrap_or("");
    let Some(index) = p.col.atom_index_for_key(serial) else {
        return;
    };
    let mut tensor: SmallVec<[f32; 8]> = SmallVec::new();
    for i in 0..6 {
        let start = 28 + i * 7;
        let value = line
            .get(start..start + 7)
            .and_then(|s| s.trim().parse::<f32>().ok())
            .unwrap_or(0.0);
        tensor.push(value / 10_000.0);
    }
    if let Some(atom) = p.col.atom_mut(index) {
        atom.anisou = Some(tensor);
    }
}

fn read_conect(p: &mut Parse, line: &str) {
    let Some(base) = line.get(6..11).and_then(|s| s.trim().parse::<i32>().ok()) else {
        return;
    };
    for start in [11, 16, 21, 26] {
        let Some(other) = line
            .get(start..start + 5)
            .and_then(|s| s.trim().parse::<i32>().ok())
        else {
            continue;
        };
        // CONECT records are symmetric; keep one direction only.
        if base < other {
            p.conect.push((base, other));
        }
    }
}

/// CONECT records bind serial numbers, not frames; the same pair bonds
/// every model that has both serials.
fn apply_conect(p: &mut Parse) {
    for map in &p.frame_serials {
        for &(a, b) in &p.conect {
            if let (Some(&i), Some(&j)) = (map.get(&a), map.get(&b)) {
                p.col.add_bond(i, j, BondOrder::Single);
            }
        }
    }
}

fn read_cryst1(p: &mut Parse, line: &str) {
    let float = |range: std::ops::Range<usize>| {
        line.get(range).and_then(|s| s.trim().parse::<f32>().ok())
    };
    let (Some(a), Some(b), Some(c)) = (float(6..15), float(15..24), float(24..33)) else {
        return;
    };
    let alpha = float(33..40).unwrap_or(90.0);
    let beta = float(40..47).unwrap_or(90.0);
    let gamma = float(47..54).unwrap_or(90.0);
    p.col.set_cell_parameters([a, b, c, alpha, beta, gamma]);
    if let Some(group) = line.get(55..66).map(str::trim).filter(|s| !s.is_empty()) {
        p.col.set_space_group_name(group);
    }
}

fn read_scale(p: &mut Parse, line: &str) {
    let Some(row) = line
        .chars()
        .nth(5)
        .and_then(|c| c.to_digit(10))
        .map(|d| d as usize - 1)
    else {
        return;
    };
    let float = |range: std::ops::Range<usize>| {
        line.get(range).and_then(|s| s.trim().parse::<f32>().ok())
    };
    let (Some(m1), Some(m2), Some(m3)) = (float(10..20), float(20..30), float(30..40)) else {
        return;
    };
    p.scale_rows[row] = [m1, m2, m3, float(45..55).unwrap_or(0.0)];
    p.scale_seen[row] = true;
    if p.scale_seen == [true; 3] {
        let mut m = [0.0f32; 16];
        for (i, r) in p.scale_rows.iter().enumerate() {
            m[i * 4..i * 4 + 4].copy_from_slice(r);
        }
        m[15] = 1.0;
        p.col.cell_matrix = Some(m);
    }
}

fn read_remark(p: &mut Parse, line: &str) {
    // REMARK 290   SMTRY1   2 -1.000000  0.000000  0.000000       0.00000
    if line.get(7..10) != Some("290") {
        return;
    }
    let mut tokens = line.split_whitespace().skip(2);
    let Some(tag) = tokens.next() else {
        return;
    };
    let Some(row) = tag
        .strip_prefix("SMTRY")
        .and_then(|d| d.parse::<usize>().ok())
        .filter(|d| (1..=3).contains(d))
    else {
        return;
    };
    let Some(op_number) = tokens.next().and_then(|t| t.parse::<i32>().ok()) else {
        return;
    };
    let mut values = [0.0f32; 4];
    for v in values.iter_mut() {
        match tokens.next().and_then(|t| t.parse::<f32>().ok()) {
            Some(parsed) => *v = parsed,
            None => return,
        }
    }
    let entry = p.smtry.entry(op_number).or_default();
    entry.rows[row - 1] = values;
    entry.seen[row - 1] = true;
}

fn read_structure(p: &mut Parse, line: &str) {
    let record = &line[0..6];
    let kind = StructureKind::from_record_name(record.trim());
    let int = |range: std::ops::Range<usize>| {
        line.get(range).and_then(|s| s.trim().parse::<i32>().ok())
    };
    let chain_at =
        |index: usize| line.chars().nth(index).filter(|c| !c.is_whitespace());

    // Column layout differs per record family.
    let (start_chain, start_seq, end_chain, end_seq) = match record {
        "HELIX " => (chain_at(19), int(21..25), chain_at(31), int(33..37)),
        "SHEET " => (chain_at(21), int(22..26), chain_at(32), int(33..37)),
        _ => (chain_at(19), int(20..24), chain_at(31), int(32..36)),
    };
    let (Some(start), Some(end)) = (start_seq, end_seq) else {
        return;
    };
    p.structures
        .push(Structure::new(kind, start_chain, start, end_chain, end));
}

/// Finalize the open frame: attach header annotations, emit any
/// REMARK 290 operators, and hand the frame to the symmetry engine.
fn close_frame(p: &mut Parse, options: &LoadOptions) {
    for structure in p.structures.clone() {
        p.col.add_structure(structure);
    }
    if p.col.symmetry_ops.is_empty() {
        emit_smtry_operators(p);
    }
    p.col.set_atom_set_number(p.model_number);
    p.col.set_atom_set_name(&p.model_number.to_string());
    super::apply_frame_symmetry(&mut p.col, options);
    p.frame_open = false;
}

/// Convert accumulated Cartesian SMTRY matrices to fractional
/// Jones-Faithful operators. Skipped when no cell was declared; the
/// matrices are meaningless without one.
fn emit_smtry_operators(p: &mut Parse) {
    if p.smtry.is_empty() {
        return;
    }
    let Some(params) = p.col.cell_params else {
        return;
    };
    let Ok(cell) = UnitCell::from_parameters(params) else {
        return;
    };
    let f = cell.real_to_frac();
    let f_inv = cell.frac_to_real();

    let mut numbers: Vec<i32> = p.smtry.keys().copied().collect();
    numbers.sort_unstable();
    for number in numbers {
        let entry = &p.smtry[&number];
        if entry.seen != [true; 3] {
            log::warn!("REMARK 290 operator {number} is missing rows; skipped");
            continue;
        }
        let mut rot = [0.0f32; 9];
        for r in 0..3 {
            rot[r * 3..r * 3 + 3].copy_from_slice(&entry.rows[r][0..3]);
        }
        let t_cart = Vec3::new(entry.rows[0][3], entry.rows[1][3], entry.rows[2][3]);

        // R_frac = F * R_cart * F^-1, t_frac = F * t_cart
        let rot_frac = mat3_mul(f, &mat3_mul(&rot, f_inv));
        let t_frac = transform_3x3(f, t_cart);

        let mut mat = [0.0f32; 12];
        for r in 0..3 {
            mat[r * 4..r * 4 + 3].copy_from_slice(&rot_frac[r * 3..r * 3 + 3]);
        }
        mat[3] = t_frac.x;
        mat[7] = t_frac.y;
        mat[11] = t_frac.z;
        let op = SymOp { mat };
        let jones = op.to_jones_faithful();
        p.col.add_symmetry_operator(&jones);
    }
    p.smtry.clear();
}

fn mat3_mul(a: &[f32; 9], b: &[f32; 9]) -> [f32; 9] {
    let mut out = [0.0f32; 9];
    for r in 0..3 {
        for c in 0..3 {
            out[r * 3 + c] =
                a[r * 3] * b[c] + a[r * 3 + 1] * b[3 + c] + a[r * 3 + 2] * b[6 + c];
        }
    }
    out
}

fn transform_3x3(m: &[f32; 9], v: Vec3) -> Vec3 {
    Vec3::new(
        m[0] * v.x + m[1] * v.y + m[2] * v.z,
        m[3] * v.x + m[4] * v.y + m[5] * v.z,
        m[6] * v.x + m[7] * v.y + m[8] * v.z,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmol_mol::FrameIndex;

    fn read(content: &str) -> AtomSetCollection {
        let mut reader = PdbReader::new();
        reader.initialize(&LoadOptions::default());
        reader.read(&mut content.as_bytes()).unwrap()
    }

    #[test]
    fn test_read_simple_pdb() {
        let pdb = "\
ATOM      1  N   ALA A   1       0.000   0.000   0.000  1.00 20.00           N
ATOM      2  CA  ALA A   1       1.458   0.000   0.000  1.00 20.00           C
ATOM      3  C   ALA A   1       2.009   1.420   0.000  1.00 20.00           C
ATOM      4  O   ALA A   1       1.251   2.390   0.000  1.00 20.00           O
END
";
        let col = read(pdb);
        assert_eq!(col.atom_count(), 4);
        assert_eq!(col.atom_set_count(), 1);
        let ca = col.atom(1u32.into()).unwrap();
        assert_eq!(ca.name.as_deref(), Some("CA"));
        assert_eq!(ca.element, 6);
        assert_eq!(ca.chain, Some('A'));
        assert_eq!(ca.sequence_number, Some(1));
        assert_eq!(ca.occupancy, 100);
        assert_eq!(ca.b_factor, Some(20.0));
    }

    #[test]
    fn test_element_inferred_without_element_column() {
        let pdb = "ATOM      1  CA  ALA A   1       0.000   0.000   0.000\nEND\n";
        let col = read(pdb);
        // " CA " in a standard residue is an alpha carbon, not calcium.
        assert_eq!(col.atom(0u32.into()).unwrap().element, 6);
    }

    #[test]
    fn test_hetatm_and_charge() {
        let pdb =
            "HETATM    1 FE   HEM A   1       0.000   0.000   0.000  1.00  0.00          FE2+\n";
        let col = read(pdb);
        let fe = col.atom(0u32.into()).unwrap();
        assert!(fe.hetero);
        assert_eq!(fe.element, 26);
        assert_eq!(fe.formal_charge, 2);
    }

    #[test]
    fn test_conect_bonds() {
        let pdb = "\
HETATM    1  S1  CYS A   1       0.000   0.000   0.000  1.00  0.00           S
HETATM    2  S2  CYS A   2       2.050   0.000   0.000  1.00  0.00           S
CONECT    1    2
CONECT    2    1
END
";
        let col = read(pdb);
        assert_eq!(col.bond_count(), 1);
    }

    #[test]
    fn test_multi_model() {
        let pdb = "\
MODEL        1
ATOM      1  N   ALA A   1       0.000   0.000   0.000  1.00  0.00           N
ENDMDL
MODEL        2
ATOM      1  N   ALA A   1       1.000   0.000   0.000  1.00  0.00           N
ENDMDL
END
";
        let col = read(pdb);
        assert_eq!(col.atom_set_count(), 2);
        assert_eq!(col.atom_count(), 2);
        assert_eq!(col.atom_set_info(FrameIndex::new(1)).unwrap().number, 2);
    }

    #[test]
    fn test_desired_model_filter() {
        let pdb = "\
MODEL        1
ATOM      1  N   ALA A   1       0.000   0.000   0.000  1.00  0.00           N
ENDMDL
MODEL        2
ATOM      1  N   ALA A   1       1.000   0.000   0.000  1.00  0.00           N
ENDMDL
END
";
        let mut reader = PdbReader::new();
        reader.initialize(&LoadOptions::new().desired_model(2));
        let col = reader.read(&mut pdb.as_bytes()).unwrap();
        assert_eq!(col.atom_count(), 1);
        let atom = col.atom(0u32.into()).unwrap();
        assert!((atom.position().unwrap().x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_conect_after_endmdl_bonds_every_model() {
        let pdb = "\
MODEL        1
HETATM    1  S1  CYS A   1       0.000   0.000   0.000  1.00  0.00           S
HETATM    2  S2  CYS A   2       2.050   0.000   0.000  1.00  0.00           S
ENDMDL
MODEL        2
HETATM    1  S1  CYS A   1       0.100   0.000   0.000  1.00  0.00           S
HETATM    2  S2  CYS A   2       2.150   0.000   0.000  1.00  0.00           S
ENDMDL
CONECT    1    2
END
";
        let col = read(pdb);
        assert_eq!(col.atom_set_count(), 2);
        assert_eq!(col.bond_count(), 2);
        let bonds: Vec<_> = col.bonds().collect();
        assert_eq!(bonds[0].atom1.as_usize(), 0);
        assert_eq!(bonds[0].atom2.as_usize(), 1);
        assert_eq!(bonds[1].atom1.as_usize(), 2);
        assert_eq!(bonds[1].atom2.as_usize(), 3);
    }

    #[test]
    fn test_cryst1_and_anisou() {
        let pdb = "\
CRYST1   10.000   10.000   10.000  90.00  90.00  90.00 P 1           1
ATOM      1  N   ALA A   1       1.000   1.000   1.000  1.00 20.00           N
ANISOU    1  N   ALA A   1     1000   2000   3000      0      0      0       N
END
";
        let col = read(pdb);
        assert_eq!(col.cell_params, Some([10.0, 10.0, 10.0, 90.0, 90.0, 90.0]));
        let tensor = col.atom(0u32.into()).unwrap().anisou.as_ref().unwrap();
        assert!((tensor[0] - 0.1).abs() < 1e-6);
        assert!((tensor[2] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_helix_annotation() {
        let pdb = "\
HELIX    1   1 ALA A    2  ALA A    8  1
ATOM      1  N   ALA A   2       0.000   0.000   0.000  1.00  0.00           N
END
";
        let col = read(pdb);
        assert_eq!(col.structure_count(), 1);
        let s = col.structures().next().unwrap();
        assert_eq!(s.kind, StructureKind::Helix);
        assert_eq!(s.start_chain, Some('A'));
        assert_eq!(s.start_sequence_number, 2);
        assert_eq!(s.end_sequence_number, 8);
    }

    #[test]
    fn test_smtry_operators_become_fractional() {
        // P 2-like Cartesian operator in a 10 A orthogonal cell.
        let pdb = "\
REMARK 290   SMTRY1   1  1.000000  0.000000  0.000000        0.00000
REMARK 290   SMTRY2   1  0.000000  1.000000  0.000000        0.00000
REMARK 290   SMTRY3   1  0.000000  0.000000  1.000000        0.00000
REMARK 290   SMTRY1   2 -1.000000  0.000000  0.000000        0.00000
REMARK 290   SMTRY2   2  0.000000  1.000000  0.000000        5.00000
REMARK 290   SMTRY3   2  0.000000  0.000000 -1.000000        0.00000
CRYST1   10.000   10.000   10.000  90.00  90.00  90.00 P 1 21 1      2
ATOM      1  N   ALA A   1       1.000   1.000   1.000  1.00  0.00           N
END
";
        let col = read(pdb);
        assert_eq!(col.symmetry_ops.len(), 2);
        assert_eq!(col.symmetry_ops[0], "x,y,z");
        assert_eq!(col.symmetry_ops[1], "-x,y+1/2,-z");
    }

    #[test]
    fn test_no_atoms_sets_error_message() {
        let col = read("HEADER    EMPTY\nEND\n");
        assert!(col.error_message.is_some());
        assert_eq!(col.atom_count(), 0);
    }
}
