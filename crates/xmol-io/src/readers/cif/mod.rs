//! CIF / mmCIF reader
//!
//! Tokenizes the whole document, then walks tokens once. Loop tables
//! are dispatched on their category: atom sites, symmetry operators,
//! anisotropic tensors, geometry bonds, and secondary-structure ranges.
//! Both the small-molecule underscore style (`_atom_site_fract_x`) and
//! the mmCIF dotted style (`_atom_site.Cartn_x`) arrive here in one
//! normalized spelling.

mod lexer;

use std::io::{BufRead, Read};

use lin_alg::f32::Vec3;
use smallvec::SmallVec;

use xmol_mol::{element, Atom, AtomSetCollection, BondOrder, Structure, StructureKind};

use crate::error::IoResult;
use crate::options::LoadOptions;
use crate::scan::parse_float_prefix;
use crate::traits::FormatReader;

use lexer::{tokenize, Token};

pub struct CifReader {
    options: LoadOptions,
}

impl CifReader {
    pub fn new() -> Self {
        CifReader {
            options: LoadOptions::default(),
        }
    }
}

impl Default for CifReader {
    fn default() -> Self {
        CifReader::new()
    }
}

impl FormatReader for CifReader {
    fn initialize(&mut self, options: &LoadOptions) {
        self.options = options.clone();
    }

    fn read(&mut self, input: &mut dyn BufRead) -> IoResult<AtomSetCollection> {
        // A mid-stream failure still leaves whatever arrived in the
        // buffer; parse that and carry the failure as the error message.
        let mut text = String::new();
        let stream_error = input.read_to_string(&mut text).err();
        let tokens = tokenize(&text);

        let mut parser = Parser {
            tokens,
            pos: 0,
            col: AtomSetCollection::new("cif"),
            options: self.options.clone(),
            cell: [None; 6],
            frame_open: false,
            frame_number: 0,
            model_tag: None,
        };
        parser.col.is_trajectory = self.options.trajectory;
        parser.run();

        let mut col = parser.col;
        if let Some(err) = stream_error {
            col.error_message = Some(format!("read interrupted: {err}"));
        } else if col.atom_count() == 0 && col.error_message.is_none() {
            col.error_message = Some("no atom records found".to_string());
        }
        col.finish();
        Ok(col)
    }
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    col: AtomSetCollection,
    options: LoadOptions,
    cell: [Option<f32>; 6],
    frame_open: bool,
    frame_number: i32,
    /// `_atom_site.pdbx_PDB_model_num` value of the open frame
    model_tag: Option<String>,
}

impl<'a> Parser<'a> {
    fn run(&mut self) {
        while self.pos < self.tokens.len() {
            match self.tokens[self.pos].clone() {
                Token::DataBlock(name) => {
                    self.pos += 1;
                    self.close_frame();
                    if self.col.collection_name.is_empty() {
                        self.col.collection_name = name.to_string();
                    }
                }
                Token::Loop => {
                    self.pos += 1;
                    self.read_loop();
                }
                Token::DataName(name) => {
                    self.pos += 1;
                    let value = self.take_value();
                    self.handle_item(&name, value.as_deref());
                }
                _ => self.pos += 1,
            }
        }
        self.close_frame();
    }

    fn take_value(&mut self) -> Option<String> {
        let token = self.tokens.get(self.pos)?;
        if !token.is_loop_value() {
            return None;
        }
        let value = token.as_value().map(str::to_string);
        self.pos += 1;
        value
    }

    fn handle_item(&mut self, name: &str, value: Option<&str>) {
        let Some(value) = value else {
            return;
        };
        match name {
            "_cell_length_a" => self.set_cell_component(0, value),
            "_cell_length_b" => self.set_cell_component(1, value),
            "_cell_length_c" => self.set_cell_component(2, value),
            "_cell_angle_alpha" => self.set_cell_component(3, value),
            "_cell_angle_beta" => self.set_cell_component(4, value),
            "_cell_angle_gamma" => self.set_cell_component(5, value),
            "_symmetry_space_group_name_h-m" | "_space_group_name_h-m_alt" => {
                self.col.set_space_group_name(value);
            }
            "_symmetry_equiv_pos_as_xyz" | "_space_group_symop_operation_xyz" => {
                self.col.add_symmetry_operator(value);
            }
            // A title is better than the data-block tag used as a default.
            "_struct_title" => {
                self.col.collection_name = value.trim().to_string();
            }
            _ => {}
        }
    }

    fn set_cell_component(&mut self, index: usize, value: &str) {
        self.cell[index] = parse_float_prefix(value);
        if let [Some(a), Some(b), Some(c), Some(alpha), Some(beta), Some(gamma)] = self.cell {
            self.col
                .set_cell_parameters([a, b, c, alpha, beta, gamma]);
        }
    }

    /// Column headers, then rows of values until a non-value token.
    fn read_loop(&mut self) {
        let mut names: Vec<String> = Vec::new();
        while let Some(Token::DataName(name)) = self.tokens.get(self.pos) {
            names.push(name.clone());
            self.pos += 1;
        }
        if names.is_empty() {
            return;
        }

        let category = names[0].as_str();
        if category.starts_with("_atom_site_aniso") {
            let columns = AnisoColumns::resolve(&names);
            while let Some(row) = self.take_row(names.len()) {
                self.read_aniso_row(&columns, &row);
            }
        } else if category.starts_with("_atom_site") {
            let columns = AtomColumns::resolve(&names);
            while let Some(row) = self.take_row(names.len()) {
                self.read_atom_row(&columns, &row);
            }
        } else if category.starts_with("_symmetry_equiv_pos")
            || category.starts_with("_space_group_symop")
        {
            let op_column = position(&names, &[
                "_symmetry_equiv_pos_as_xyz",
                "_space_group_symop_operation_xyz",
            ]);
            while let Some(row) = self.take_row(names.len()) {
                if let Some(op) = op_column.and_then(|i| row[i].clone()) {
                    self.col.add_symmetry_operator(&op);
                }
            }
        } else if category.starts_with("_geom_bond") {
            let a1 = position(&names, &["_geom_bond_atom_site_label_1"]);
            let a2 = position(&names, &["_geom_bond_atom_site_label_2"]);
            while let Some(row) = self.take_row(names.len()) {
                if let (Some(k1), Some(k2)) = (
                    a1.and_then(|i| row[i].clone()),
                    a2.and_then(|i| row[i].clone()),
                ) {
                    self.col.add_bond_by_keys(&k1, &k2, BondOrder::Single);
                }
            }
        } else if category.starts_with("_struct_conf") {
            let columns = RangeColumns::resolve(&names, "_struct_conf");
            let kind_column = position(&names, &["_struct_conf_conf_type_id"]);
            while let Some(row) = self.take_row(names.len()) {
                let kind = match kind_column.and_then(|i| row[i].as_deref()) {
                    Some(id) if id.starts_with("TURN") => StructureKind::Turn,
                    _ => StructureKind::Helix,
                };
                self.read_range_row(kind, &columns, &row);
            }
        } else if category.starts_with("_struct_sheet_range") {
            let columns = RangeColumns::resolve(&names, "_struct_sheet_range");
            while let Some(row) = self.take_row(names.len()) {
                self.read_range_row(StructureKind::Sheet, &columns, &row);
            }
        } else {
            // Unhandled category; drain its rows.
            while self.take_row(names.len()).is_some() {}
        }
    }

    fn take_row(&mut self, width: usize) -> Option<Vec<Option<String>>> {
        if !self
            .tokens
            .get(self.pos)
            .is_some_and(Token::is_loop_value)
        {
            return None;
        }
        let mut row = Vec::with_capacity(width);
        for _ in 0..width {
            match self.tokens.get(self.pos) {
                Some(token) if token.is_loop_value() => {
                    row.push(token.as_value().map(str::to_string));
                    self.pos += 1;
                }
                // Short row at end of table; pad it out.
                _ => row.push(None),
            }
        }
        Some(row)
    }

    fn read_atom_row(&mut self, columns: &AtomColumns, row: &[Option<String>]) {
        let get = |index: Option<usize>| index.and_then(|i| row.get(i)).and_then(Clone::clone);
        let get_float = |index: Option<usize>| get(index).as_deref().and_then(parse_float_prefix);

        // A model-number change closes the frame.
        let model = get(columns.model_num);
        if model != self.model_tag && self.frame_open {
            self.close_frame();
        }

        let wanted = match (&model, self.options.desired_model) {
            (Some(tag), Some(desired)) => tag.parse::<i32>().ok() == Some(desired),
            _ => true,
        };
        self.model_tag = model;
        if !wanted {
            return;
        }
        if !self.frame_open {
            self.open_frame();
        }

        let label = get(columns.label);
        let mut atom = Atom::new(label.as_deref().unwrap_or(""), "");
        if label.is_none() {
            atom.name = None;
        }

        let symbol = get(columns.type_symbol);
        atom.hetero = get(columns.group_pdb).as_deref() == Some("HETATM");
        atom.element = symbol
            .as_deref()
            .and_then(element::number_for_symbol)
            .unwrap_or_else(|| {
                element::infer_from_name(label.as_deref().unwrap_or(""), atom.hetero)
            });

        if let (Some(x), Some(y), Some(z)) = (
            get_float(columns.fract_x),
            get_float(columns.fract_y),
            get_float(columns.fract_z),
        ) {
            atom.set_position(Vec3::new(x, y, z));
            self.col.coordinates_are_fractional = true;
        } else if let (Some(x), Some(y), Some(z)) = (
            get_float(columns.cartn_x),
            get_float(columns.cartn_y),
            get_float(columns.cartn_z),
        ) {
            atom.set_position(Vec3::new(x, y, z));
        }

        if let Some(occ) = get_float(columns.occupancy) {
            atom.occupancy = (occ * 100.0).round().clamp(0.0, 100.0) as u8;
        }
        atom.b_factor = get_float(columns.b_iso);
        atom.chain = get(columns.chain).and_then(|s| s.chars().next());
        atom.group3 = get(columns.comp_id);
        atom.sequence_number = get(columns.seq_id).and_then(|s| s.parse().ok());
        atom.insertion_code = get(columns.ins_code).and_then(|s| s.chars().next());
        atom.alt_loc = get(columns.alt_id).and_then(|s| s.chars().next());
        if let Some(charge) = get(columns.formal_charge).and_then(|s| s.parse::<i8>().ok()) {
            atom.formal_charge = charge;
        }

        let index = self.col.add_atom(atom);
        if let Some(id) = get(columns.id) {
            self.col.register_atom_key(&id, index);
        }
    }

    fn read_aniso_row(&mut self, columns: &AnisoColumns, row: &[Option<String>]) {
        let get_float = |index: Option<usize>| {
            index
                .and_then(|i| row.get(i))
                .and_then(|v| v.as_deref())
                .and_then(parse_float_prefix)
        };
        let Some(label) = columns.label.and_then(|i| row.get(i)).and_then(Clone::clone)
        else {
            return;
        };
        let Some(index) = self.col.atom_index_for_key(&label) else {
            return;
        };
        let mut tensor: SmallVec<[f32; 8]> = SmallVec::new();
        for component in columns.tensor {
            tensor.push(get_float(component).unwrap_or(0.0));
        }
        if let Some(atom) = self.col.atom_mut(index) {
            atom.anisou = Some(tensor);
        }
    }

    fn read_range_row(
        &mut self,
        kind: StructureKind,
        columns: &RangeColumns,
        row: &[Option<String>],
    ) {
        let get = |index: Option<usize>| index.and_then(|i| row.get(i)).and_then(Clone::clone);
        let (Some(start), Some(end)) = (
            get(columns.beg_seq).and_then(|s| s.parse().ok()),
            get(columns.end_seq).and_then(|s| s.parse().ok()),
        ) else {
            return;
        };
        let start_chain = get(columns.beg_chain).and_then(|s| s.chars().next());
        let end_chain = get(columns.end_chain).and_then(|s| s.chars().next());
        if !self.frame_open {
            self.open_frame();
        }
        self.col
            .add_structure(Structure::new(kind, start_chain, start, end_chain, end));
    }

    fn open_frame(&mut self) {
        self.col.new_atom_set();
        self.frame_number += 1;
        self.col.set_atom_set_number(self.frame_number);
        self.frame_open = true;
    }

    fn close_frame(&mut self) {
        if !self.frame_open {
            return;
        }
        super::apply_frame_symmetry(&mut self.col, &self.options);
        self.frame_open = false;
        self.model_tag = None;
        self.cell = [None; 6];
    }
}

fn position(names: &[String], wanted: &[&str]) -> Option<usize> {
    names
        .iter()
        .position(|name| wanted.contains(&name.as_str()))
}

/// Resolved `_atom_site` loop columns, both naming styles.
struct AtomColumns {
    id: Option<usize>,
    label: Option<usize>,
    type_symbol: Option<usize>,
    group_pdb: Option<usize>,
    fract_x: Option<usize>,
    fract_y: Option<usize>,
    fract_z: Option<usize>,
    cartn_x: Option<usize>,
    cartn_y: Option<usize>,
    cartn_z: Option<usize>,
    occupancy: Option<usize>,
    b_iso: Option<usize>,
    chain: Option<usize>,
    comp_id: Option<usize>,
    seq_id: Option<usize>,
    ins_code: Option<usize>,
    alt_id: Option<usize>,
    formal_charge: Option<usize>,
    model_num: Option<usize>,
}

impl AtomColumns {
    fn resolve(names: &[String]) -> AtomColumns {
        AtomColumns {
            id: position(names, &["_atom_site_id"]),
            label: position(names, &["_atom_site_label", "_atom_site_label_atom_id"]),
            type_symbol: position(names, &["_atom_site_type_symbol"]),
            group_pdb: position(names, &["_atom_site_group_pdb"]),
            fract_x: position(names, &["_atom_site_fract_x"]),
            fract_y: position(names, &["_atom_site_fract_y"]),
            fract_z: position(names, &["_atom_site_fract_z"]),
            cartn_x: position(names, &["_atom_site_cartn_x"]),
            cartn_y: position(names, &["_atom_site_cartn_y"]),
            cartn_z: position(names, &["_atom_site_cartn_z"]),
            occupancy: position(names, &["_atom_site_occupancy"]),
            b_iso: position(names, &["_atom_site_b_iso_or_equiv"]),
            chain: position(
                names,
                &["_atom_site_auth_asym_id", "_atom_site_label_asym_id"],
            ),
            comp_id: position(
                names,
                &["_atom_site_auth_comp_id", "_atom_site_label_comp_id"],
            ),
            seq_id: position(
                names,
                &["_atom_site_auth_seq_id", "_atom_site_label_seq_id"],
            ),
            ins_code: position(names, &["_atom_site_pdbx_pdb_ins_code"]),
            alt_id: position(names, &["_atom_site_label_alt_id"]),
            formal_charge: position(names, &["_atom_site_pdbx_formal_charge"]),
            model_num: position(names, &["_atom_site_pdbx_pdb_model_num"]),
        }
    }
}

struct AnisoColumns {
    label: Option<usize>,
    tensor: [Option<usize>; 6],
}

impl AnisoColumns {
    fn resolve(names: &[String]) -> AnisoColumns {
        let component = |suffix: &str| {
            position(
                names,
                &[
                    &format!("_atom_site_aniso_u_{suffix}") as &str,
                    &format!("_atom_site_aniso_b_{suffix}") as &str,
                ],
            )
        };
        AnisoColumns {
            label: position(names, &["_atom_site_aniso_label"]),
            tensor: [
                component("11"),
                component("22"),
                component("33"),
                component("12"),
                component("13"),
                component("23"),
            ],
        }
    }
}

struct RangeColumns {
    beg_chain: Option<usize>,
    beg_seq: Option<usize>,
    end_chain: Option<usize>,
    end_seq: Option<usize>,
}

impl RangeColumns {
    fn resolve(names: &[String], prefix: &str) -> RangeColumns {
        let find = |suffix: &str| {
            position(
                names,
                &[
                    &format!("{prefix}_beg_auth_{suffix}") as &str,
                    &format!("{prefix}_beg_label_{suffix}") as &str,
                ],
            )
        };
        let find_end = |suffix: &str| {
            position(
                names,
                &[
                    &format!("{prefix}_end_auth_{suffix}") as &str,
                    &format!("{prefix}_end_label_{suffix}") as &str,
                ],
            )
        };
        RangeColumns {
            beg_chain: find("asym_id"),
            beg_seq: find("seq_id"),
            end_chain: find_end("asym_id"),
            end_seq: find_end("seq_id"),
        }
    }
}
