//! Tripos Mol2 reader
//!
//! Section-keyed text format. Each `@<TRIPOS>MOLECULE` opens a new
//! frame; ATOM and BOND sections fill it; a CRYSIN section declares the
//! unit cell and the space-group number for optional expansion.

use std::io::BufRead;

use lin_alg::f32::Vec3;

use xmol_mol::{element, Atom, AtomIndex, AtomSetCollection, BondOrder};

use crate::error::IoResult;
use crate::options::LoadOptions;
use crate::scan::LineScanner;
use crate::traits::FormatReader;

pub struct Mol2Reader {
    options: LoadOptions,
}

impl Mol2Reader {
    pub fn new() -> Self {
        Mol2Reader {
            options: LoadOptions::default(),
        }
    }
}

impl Default for Mol2Reader {
    fn default() -> Self {
        Mol2Reader::new()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Molecule,
    Atom,
    Bond,
    Crysin,
    Other,
}

impl FormatReader for Mol2Reader {
    fn initialize(&mut self, options: &LoadOptions) {
        self.options = options.clone();
    }

    fn read(&mut self, input: &mut dyn BufRead) -> IoResult<AtomSetCollection> {
        let mut col = AtomSetCollection::new("mol2");
        col.is_trajectory = self.options.trajectory;

        let mut section = Section::None;
        let mut molecule_line = 0;
        let mut molecule_number = 0;
        let mut wanted = true;
        let mut base = 0u32;
        let mut frame_open = false;

        let mut line = String::new();
        loop {
            if super::read_line_or_flag(input, &mut line, &mut col) == 0 {
                break;
            }
            let text = line.trim_end();
            if text.starts_with('#') || text.is_empty() {
                continue;
            }

            if let Some(name) = text.strip_prefix("@<TRIPOS>") {
                section = match name.trim() {
                    "MOLECULE" => Section::Molecule,
                    "ATOM" => Section::Atom,
                    "BOND" => Section::Bond,
                    "CRYSIN" => Section::Crysin,
                    _ => Section::Other,
                };
                if section == Section::Molecule {
                    if frame_open && wanted {
                        super::apply_frame_symmetry(&mut col, &self.options);
                    }
                    molecule_line = 0;
                    molecule_number += 1;
                    wanted = self
                        .options
                        .desired_model
                        .map_or(true, |m| m == molecule_number);
                    base = col.atom_count() as u32;
                    if wanted {
                        col.new_atom_set();
                        col.set_atom_set_number(molecule_number);
                        frame_open = true;
                    }
                }
                continue;
            }

            if !wanted {
                continue;
            }
            match section {
                Section::Molecule => {
                    molecule_line += 1;
                    // Line 1 of the section is the molecule name.
                    if molecule_line == 1 && !text.trim().is_empty() {
                        col.set_atom_set_name(text.trim());
                        if col.collection_name.is_empty() {
                            col.collection_name = text.trim().to_string();
                        }
                    }
                }
                Section::Atom => read_atom_line(&mut col, text),
                Section::Bond => read_bond_line(&mut col, text, base),
                Section::Crysin => read_crysin_line(&mut col, text),
                Section::None | Section::Other => {}
            }
        }

        if frame_open && wanted {
            super::apply_frame_symmetry(&mut col, &self.options);
        }
        if col.atom_count() == 0 && col.error_message.is_none() {
            col.error_message = Some("no atom records found".to_string());
        }
        col.finish();
        Ok(col)
    }
}

/// `id name x y z type [subst_id subst_name charge]`
fn read_atom_line(col: &mut AtomSetCollection, line: &str) {
    let mut scanner = LineScanner::new(line);
    let Some(_id) = scanner.next_int() else {
        return;
    };
    let Some(name) = scanner.next_token() else {
        return;
    };
    let (Some(x), Some(y), Some(z)) =
        (scanner.next_float(), scanner.next_float(), scanner.next_float())
    else {
        return;
    };
    let atom_type = scanner.next_token().unwrap_or("");

    let mut atom = Atom::new(name, "");
    // SYBYL types are "element.hybridization".
    let symbol = atom_type.split('.').next().unwrap_or("");
    atom.element = element::number_for_symbol(symbol)
        .or_else(|| element::number_for_symbol(name))
        .unwrap_or(0);
    atom.set_position(Vec3::new(x, y, z));

    let _subst_id = scanner.next_int();
    if let Some(group) = scanner.next_token() {
        atom.group3 = Some(group.to_string());
    }
    if let Some(charge) = scanner.next_float() {
        atom.partial_charge = Some(charge);
    }
    col.add_atom(atom);
}

/// `id atom1 atom2 order` where order is 1/2/3/am/ar/du/un/nc
fn read_bond_line(col: &mut AtomSetCollection, line: &str, base: u32) {
    let mut scanner = LineScanner::new(line);
    let Some(_id) = scanner.next_int() else {
        return;
    };
    let (Some(a1), Some(a2)) = (scanner.next_int(), scanner.next_int()) else {
        return;
    };
    if a1 < 1 || a2 < 1 {
        return;
    }
    let order = match scanner.next_token().unwrap_or("1") {
        "2" => BondOrder::Double,
        "3" => BondOrder::Triple,
        "ar" | "am" => BondOrder::Aromatic,
        "nc" => return,
        "1" => BondOrder::Single,
        _ => BondOrder::Unknown,
    };
    col.add_bond(
        AtomIndex::new(base + a1 as u32 - 1),
        AtomIndex::new(base + a2 as u32 - 1),
        order,
    );
}

/// `a b c alpha beta gamma space_group_number setting`
fn read_crysin_line(col: &mut AtomSetCollection, line: &str) {
    let mut scanner = LineScanner::new(line);
    let mut params = [0.0f32; 6];
    for p in params.iter_mut() {
        match scanner.next_float() {
            Some(v) => *p = v,
            None => return,
        }
    }
    col.set_cell_parameters(params);
    if let Some(number) = scanner.next_int() {
        if let Some(name) = space_group_for_number(number) {
            col.set_space_group_name(name);
        } else {
            col.set_space_group_name(&number.to_string());
        }
    }
}

/// International Tables numbers for the groups the expansion engine
/// knows by name.
fn space_group_for_number(number: i64) -> Option<&'static str> {
    match number {
        1 => Some("P 1"),
        2 => Some("P -1"),
        3 => Some("P 2"),
        4 => Some("P 21"),
        5 => Some("C 2"),
        14 => Some("P 21/c"),
        15 => Some("C 2/c"),
        16 => Some("P 2 2 2"),
        19 => Some("P 21 21 21"),
        96 => Some("P 43 21 2"),
        146 => Some("R 3"),
        _ => None,
    }
}
