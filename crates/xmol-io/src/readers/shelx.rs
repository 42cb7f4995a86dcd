//! SHELX .ins/.res reader
//!
//! Card-oriented crystallographic format. Coordinates are fractional;
//! LATT and SYMM cards are expanded into an explicit operator list so
//! downstream symmetry handling never needs SHELX-specific knowledge.
//! Parameters coded as `10m + q` (fixed-parameter convention) are
//! decoded back to `q`.

use std::io::BufRead;

use lin_alg::f32::Vec3;

use xmol_mol::{element, Atom, AtomSetCollection};
use xmol_sym::SpaceGroup;

use crate::error::IoResult;
use crate::options::LoadOptions;
use crate::scan::LineScanner;
use crate::traits::FormatReader;

pub struct ShelxReader {
    options: LoadOptions,
}

impl ShelxReader {
    pub fn new() -> Self {
        ShelxReader {
            options: LoadOptions::default(),
        }
    }
}

impl Default for ShelxReader {
    fn default() -> Self {
        ShelxReader::new()
    }
}

/// Instruction cards that are recognized and deliberately skipped.
/// Anything else that does not parse as an atom line is ignored too;
/// this list keeps card names whose payload can look like an atom line
/// (`REM 1 0.5 0.5 0.5`, restraints, `MOLE`, `DISP`) from being misread
/// as atoms.
const SKIPPED_CARDS: &[&str] = &[
    "REM", "ZERR", "UNIT", "TEMP", "SIZE", "FVAR", "WGHT", "L.S.", "FMAP", "PLAN", "ACTA",
    "BOND", "CONF", "HTAB", "LIST", "MOLE", "DISP", "EQIV", "ANIS", "AFIX", "PART", "MORE",
    "OMIT", "TWIN", "BASF", "EXTI", "SWAT", "HOPE", "MERG", "SUMP", "DFIX", "DANG", "SADI",
    "SAME", "FLAT", "DELU", "SIMU", "ISOR", "SHEL", "STIR",
];

impl FormatReader for ShelxReader {
    fn initialize(&mut self, options: &LoadOptions) {
        self.options = options.clone();
    }

    fn read(&mut self, input: &mut dyn BufRead) -> IoResult<AtomSetCollection> {
        let mut col = AtomSetCollection::new("shelx");
        col.coordinates_are_fractional = true;

        let mut sfac: Vec<String> = Vec::new();
        let mut latt: i8 = 1;
        let mut symm_ops: Vec<String> = Vec::new();

        let mut line = String::new();
        loop {
            if super::read_line_or_flag(input, &mut line, &mut col) == 0 {
                break;
            }
            let text = line.trim_end();
            if text.trim().is_empty() {
                continue;
            }
            let card = text
                .split_whitespace()
                .next()
                .map(|t| t.to_ascii_uppercase())
                .unwrap_or_default();

            match card.as_str() {
                "TITL" => {
                    let title = text.get(4..).map(str::trim).unwrap_or("");
                    col.collection_name = title.to_string();
                }
                "CELL" => {
                    // CELL wavelength a b c alpha beta gamma
                    let mut scanner = LineScanner::new(text);
                    scanner.next_token();
                    let _wavelength = scanner.next_float();
                    let mut params = [0.0f32; 6];
                    let mut complete = true;
                    for p in params.iter_mut() {
                        match scanner.next_float() {
                            Some(v) => *p = v,
                            None => {
                                complete = false;
                                break;
                            }
                        }
                    }
                    if complete {
                        col.set_cell_parameters(params);
                    }
                }
                "LATT" => {
                    if let Some(code) = text
                        .get(4..)
                        .and_then(|s| s.trim().parse::<i8>().ok())
                    {
                        latt = code;
                    }
                }
                "SYMM" => {
                    if let Some(op) = text.get(4..).map(str::trim).filter(|s| !s.is_empty()) {
                        symm_ops.push(op.to_string());
                    }
                }
                "SPGR" => {
                    if let Some(name) = text.get(4..).map(str::trim).filter(|s| !s.is_empty()) {
                        col.set_space_group_name(name);
                    }
                }
                "SFAC" => {
                    for symbol in text.split_whitespace().skip(1) {
                        sfac.push(symbol.to_string());
                    }
                }
                "HKLF" | "END" => break,
                _ if SKIPPED_CARDS.contains(&card.as_str()) => {}
                _ => read_atom_line(&mut col, text, &sfac),
            }
        }

        emit_operators(&mut col, latt, &symm_ops);
        super::apply_frame_symmetry(&mut col, &self.options);
        if col.atom_count() == 0 && col.error_message.is_none() {
            col.error_message = Some("no atom records found".to_string());
        }
        col.finish();
        Ok(col)
    }
}

/// `NAME sfac x y z [occupancy [U or U11..U23]]`
fn read_atom_line(col: &mut AtomSetCollection, line: &str, sfac: &[String]) {
    let mut scanner = LineScanner::new(line);
    let Some(name) = scanner.next_token() else {
        return;
    };
    if !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return;
    }
    let Some(sfac_index) = scanner.next_int().filter(|&n| n >= 1) else {
        return;
    };
    let (Some(x), Some(y), Some(z)) =
        (scanner.next_float(), scanner.next_float(), scanner.next_float())
    else {
        return;
    };

    let mut atom = Atom::new(name, "");
    let symbol = sfac.get(sfac_index as usize - 1).map(String::as_str);
    atom.element = symbol
        .and_then(element::number_for_symbol)
        .unwrap_or_else(|| element::infer_from_name(name, false));
    atom.set_position(Vec3::new(decode_fixed(x), decode_fixed(y), decode_fixed(z)));
    if let Some(occ) = scanner.next_float() {
        let occ = decode_fixed(occ);
        atom.occupancy = (occ * 100.0).round().clamp(0.0, 100.0) as u8;
    }
    col.add_atom(atom);
}

/// SHELX fixes a parameter q by writing 10m + q; values outside (-5, 5)
/// carry such a flag.
fn decode_fixed(value: f32) -> f32 {
    if value.abs() < 5.0 {
        value
    } else {
        value - 10.0 * (value / 10.0).round()
    }
}

/// Expand LATT and SYMM cards to an explicit operator list on the
/// collection. LATT defaults to 1 (centrosymmetric primitive); SHELX
/// implies the identity, never writes it.
fn emit_operators(col: &mut AtomSetCollection, latt: i8, symm_ops: &[String]) {
    let mut group = SpaceGroup::new();
    for op in symm_ops {
        group.add_operator(op);
    }
    if let Err(err) = group.set_lattice_centering(latt) {
        log::warn!("{err}; treating lattice as primitive");
    }
    group.finalize();
    for op in group.operators() {
        col.add_symmetry_operator(&op.to_jones_faithful());
    }
}
