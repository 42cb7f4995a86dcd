//! Element symbol tables
//!
//! Atoms carry their element as an atomic number (`u8`, 0 = unknown). This
//! module provides the symbol lookup in both directions plus the PDB-style
//! atom-name heuristic used when a record has no explicit element field.

use phf::phf_map;

/// Symbols indexed by atomic number; index 0 is the unknown pseudo-element.
pub const SYMBOLS: [&str; 104] = [
    "X", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge",
    "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd",
    "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm",
    "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr",
];

static SYMBOL_TO_NUMBER: phf::Map<&'static str, u8> = phf_map! {
    "H" => 1, "He" => 2, "Li" => 3, "Be" => 4, "B" => 5, "C" => 6, "N" => 7,
    "O" => 8, "F" => 9, "Ne" => 10, "Na" => 11, "Mg" => 12, "Al" => 13,
    "Si" => 14, "P" => 15, "S" => 16, "Cl" => 17, "Ar" => 18, "K" => 19,
    "Ca" => 20, "Sc" => 21, "Ti" => 22, "V" => 23, "Cr" => 24, "Mn" => 25,
    "Fe" => 26, "Co" => 27, "Ni" => 28, "Cu" => 29, "Zn" => 30, "Ga" => 31,
    "Ge" => 32, "As" => 33, "Se" => 34, "Br" => 35, "Kr" => 36, "Rb" => 37,
    "Sr" => 38, "Y" => 39, "Zr" => 40, "Nb" => 41, "Mo" => 42, "Tc" => 43,
    "Ru" => 44, "Rh" => 45, "Pd" => 46, "Ag" => 47, "Cd" => 48, "In" => 49,
    "Sn" => 50, "Sb" => 51, "Te" => 52, "I" => 53, "Xe" => 54, "Cs" => 55,
    "Ba" => 56, "La" => 57, "Ce" => 58, "Pr" => 59, "Nd" => 60, "Pm" => 61,
    "Sm" => 62, "Eu" => 63, "Gd" => 64, "Tb" => 65, "Dy" => 66, "Ho" => 67,
    "Er" => 68, "Tm" => 69, "Yb" => 70, "Lu" => 71, "Hf" => 72, "Ta" => 73,
    "W" => 74, "Re" => 75, "Os" => 76, "Ir" => 77, "Pt" => 78, "Au" => 79,
    "Hg" => 80, "Tl" => 81, "Pb" => 82, "Bi" => 83, "Po" => 84, "At" => 85,
    "Rn" => 86, "Fr" => 87, "Ra" => 88, "Ac" => 89, "Th" => 90, "Pa" => 91,
    "U" => 92, "Np" => 93, "Pu" => 94, "Am" => 95, "Cm" => 96, "Bk" => 97,
    "Cf" => 98, "Es" => 99, "Fm" => 100, "Md" => 101, "No" => 102, "Lr" => 103,
};

/// Look up an atomic number by symbol, case-insensitively.
///
/// Accepts "FE", "fe", "Fe". Trailing charge decorations ("O1-", "Ca2+")
/// and digits are stripped before lookup.
pub fn number_for_symbol(symbol: &str) -> Option<u8> {
    let bare: String = symbol
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if bare.is_empty() || bare.len() > 2 {
        return None;
    }
    let mut canonical = String::with_capacity(2);
    let mut chars = bare.chars();
    if let Some(first) = chars.next() {
        canonical.push(first.to_ascii_uppercase());
    }
    for c in chars {
        canonical.push(c.to_ascii_lowercase());
    }
    SYMBOL_TO_NUMBER.get(canonical.as_str()).copied()
}

/// Canonical symbol for an atomic number; unknown numbers map to "X".
pub fn symbol_for(number: u8) -> &'static str {
    SYMBOLS.get(number as usize).copied().unwrap_or("X")
}

/// Infer an element from a PDB-style atom name.
///
/// The PDB name field is four columns where a leading non-blank pair can be
/// a two-letter element ("FE", "CL") while names like " CA " mean an alpha
/// carbon, not calcium. Hetero records trust the two-letter reading; polymer
/// records prefer the single-letter one.
pub fn infer_from_name(name: &str, hetero: bool) -> u8 {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return 0;
    }

    // Names starting with a digit ("1HB2") are hydrogens with position prefixes
    let stripped = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
    if stripped.is_empty() {
        return 0;
    }

    let two_letter_slot = name.len() >= 2 && !name.starts_with(' ');
    if (hetero || two_letter_slot) && stripped.len() >= 2 {
        if let Some(n) = number_for_symbol(&stripped[..2]) {
            return n;
        }
    }
    number_for_symbol(&stripped[..1]).unwrap_or(0)
}
