//! Content-based format sniffing
//!
//! Detection looks at a bounded prefix of the input: at most
//! [`SNIFF_PREFIX_LEN`] bytes, and within that the first four logical
//! lines (lines starting with `#` are treated as comments and skipped).
//! Rules run in a fixed order and the first match wins, so the function
//! is a pure, deterministic map from prefix to [`FileFormat`].

use crate::traits::FileFormat;

/// Maximum number of bytes of content a sniff will consider.
pub const SNIFF_PREFIX_LEN: usize = 16 * 1024;

/// Number of logical lines the line-oriented rules look at.
const SNIFF_LINES: usize = 4;

/// Tags compared against the start of a line. Tables run in
/// declaration order; within a table, tags in declaration order;
/// for each tag, lines in order.
const LINE_START_TAGS: &[(&str, FileFormat)] = &[
    // PDB record names
    ("HEADER", FileFormat::Pdb),
    ("OBSLTE", FileFormat::Pdb),
    ("TITLE ", FileFormat::Pdb),
    ("COMPND", FileFormat::Pdb),
    ("SOURCE", FileFormat::Pdb),
    ("EXPDTA", FileFormat::Pdb),
    ("AUTHOR", FileFormat::Pdb),
    ("REMARK", FileFormat::Pdb),
    ("SEQRES", FileFormat::Pdb),
    ("HELIX ", FileFormat::Pdb),
    ("SHEET ", FileFormat::Pdb),
    ("TURN  ", FileFormat::Pdb),
    ("CRYST1", FileFormat::Pdb),
    ("SCALE1", FileFormat::Pdb),
    ("MODEL ", FileFormat::Pdb),
    ("ATOM  ", FileFormat::Pdb),
    ("HETATM", FileFormat::Pdb),
    // SHELX instruction cards
    ("TITL ", FileFormat::Shelx),
    ("ZERR ", FileFormat::Shelx),
    ("LATT ", FileFormat::Shelx),
    ("SYMM ", FileFormat::Shelx),
    ("CELL ", FileFormat::Shelx),
    // CIF blocks
    ("data_", FileFormat::Cif),
    ("loop_", FileFormat::Cif),
    // Ghemical project headers
    ("!Header mm1gp", FileFormat::Ghemical),
    ("!Header gpr", FileFormat::Ghemical),
    // Jaguar output banner
    ("  |  Jaguar version", FileFormat::Jaguar),
    // HyperChem
    ("mol ", FileFormat::Hin),
    // MDL marker line
    ("$MDL", FileFormat::Mol),
    // NWChem echo of its argument list
    (" argument  1 = ", FileFormat::NWChem),
    // Spartan SMOL input echo
    ("INPUT=", FileFormat::SpartanSmol),
];

/// Tags searched anywhere within a line. Molpro's URL marker is
/// declared before the CML markers so Molpro XML output is not
/// misread as plain CML.
const CONTAINS_TAGS: &[(&str, FileFormat)] = &[
    ("http://www.molpro.net", FileFormat::Molpro),
    ("<molecule", FileFormat::Cml),
    ("<cml", FileFormat::Cml),
    ("xml-cml.org", FileFormat::Cml),
    ("Entering Gaussian System", FileFormat::Gaussian),
    ("MOPAC", FileFormat::Mopac),
    ("Welcome to Q-Chem", FileFormat::QChem),
    ("GAMESS", FileFormat::Gamess),
    ("|  Spartan", FileFormat::Spartan),
];

/// Sniff a format from a content prefix.
///
/// Callers should pass at most the first [`SNIFF_PREFIX_LEN`] bytes;
/// anything beyond that is ignored here as well, so repeated calls on
/// the same content always agree.
pub fn detect_format(content: &str) -> FileFormat {
    let prefix = truncate_to_char_boundary(content, SNIFF_PREFIX_LEN);

    // First four logical lines, comment lines skipped, missing lines
    // read as empty.
    let mut lines = [""; SNIFF_LINES];
    let mut n = 0;
    for line in prefix.lines() {
        if line.starts_with('#') {
            continue;
        }
        lines[n] = line;
        n += 1;
        if n == SNIFF_LINES {
            break;
        }
    }

    // MDL Molfile: the counts line is line 4.
    if is_mol_counts_line(lines[3]) {
        return FileFormat::Mol;
    }

    // XYZ: line 1 is nothing but an atom count.
    let first = lines[0].trim();
    if !first.is_empty() && first.parse::<i32>().is_ok() {
        return FileFormat::Xyz;
    }

    // Tinker-style XYZ: the count is followed by more content.
    if let Some(token) = first.split_whitespace().next() {
        if token.parse::<i32>().is_ok() {
            return FileFormat::FoldingXyz;
        }
    }

    for &(tag, format) in LINE_START_TAGS {
        for line in &lines[..n] {
            if line.starts_with(tag) {
                return format;
            }
        }
    }

    for &(tag, format) in CONTAINS_TAGS {
        for line in &lines[..n] {
            if line.contains(tag) {
                return format;
            }
        }
    }

    // JME strings carry their bond table on line 1 and leave line 2
    // blank.
    if n >= 2 && lines[1].trim().is_empty() && !lines[0].trim().is_empty() {
        return FileFormat::Jme;
    }

    FileFormat::Unknown
}

/// MDL counts line: ends in a version marker, or opens with two
/// three-column integer fields (atom and bond counts).
fn is_mol_counts_line(line: &str) -> bool {
    let trimmed = line.trim_end();
    if trimmed.ends_with("V2000") || trimmed.ends_with("v2000") || trimmed.ends_with("V3000") {
        return true;
    }
    let field_int = |range: std::ops::Range<usize>| {
        line.get(range)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<i32>().ok())
    };
    field_int(0..3).is_some() && field_int(3..6).is_some()
}

fn truncate_to_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_pdb() {
        let content = "HEADER    HYDROLASE               12-JAN-98   1ABC\n\
                       ATOM      1  N   ALA A   1      11.104   6.134  -6.504\n";
        assert_eq!(detect_format(content), FileFormat::Pdb);
    }

    #[test]
    fn test_detect_pdb_without_header() {
        let content = "ATOM      1  N   ALA A   1      11.104   6.134  -6.504\n";
        assert_eq!(detect_format(content), FileFormat::Pdb);
    }

    #[test]
    fn test_detect_mol_by_version_marker() {
        let content = "benzene\n  program\ncomment\n  6  6  0  0  0  0  0  0  0  0999 V2000\n";
        assert_eq!(detect_format(content), FileFormat::Mol);
    }

    #[test]
    fn test_detect_mol_by_counts_columns() {
        // No version marker, counts columns alone decide it.
        let content = "name\n\n\n  6  6\n";
        assert_eq!(detect_format(content), FileFormat::Mol);
    }

    #[test]
    fn test_detect_xyz() {
        let content = "3\nwater\nO 0.0 0.0 0.0\nH 0.9 0.0 0.0\n";
        assert_eq!(detect_format(content), FileFormat::Xyz);
    }

    #[test]
    fn test_detect_folding_xyz() {
        let content = "3 molden generated\n1 O 0.0 0.0 0.0 8 2\n";
        assert_eq!(detect_format(content), FileFormat::FoldingXyz);
    }

    #[test]
    fn test_detect_cif() {
        let content = "data_global\n_cell_length_a 10.0\n";
        assert_eq!(detect_format(content), FileFormat::Cif);
    }

    #[test]
    fn test_detect_shelx() {
        let content = "TITL quartz in P 32 2 1\nCELL 0.71073 4.913 4.913 5.405 90 90 120\n";
        assert_eq!(detect_format(content), FileFormat::Shelx);
    }

    #[test]
    fn test_comment_lines_skipped() {
        let content = "# produced by a script\n3\nwater\nO 0.0 0.0 0.0\n";
        assert_eq!(detect_format(content), FileFormat::Xyz);
    }

    #[test]
    fn test_molpro_beats_cml() {
        // Molpro output is XML; its URL marker must win over the CML
        // markers on the same lines.
        let content = "<?xml version=\"1.0\"?>\n\
                       <molpro xmlns=\"http://www.molpro.net/schema/molpro-output\">\n\
                       <molecule>\n<atom/>\n";
        assert_eq!(detect_format(content), FileFormat::Molpro);
    }

    #[test]
    fn test_detect_cml() {
        let content = "<?xml version=\"1.0\"?>\n<molecule id=\"m1\">\n<atomArray>\n</atomArray>\n";
        assert_eq!(detect_format(content), FileFormat::Cml);
    }

    #[test]
    fn test_detect_jme_fallback() {
        // A free-form header line followed by a blank line falls
        // through every other rule.
        let content = "benzene sketch C 1.4 0.0 C 0.7 1.2\n\n";
        assert_eq!(detect_format(content), FileFormat::Jme);
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect_format(""), FileFormat::Unknown);
        assert_eq!(detect_format("random words here\nmore words\n"), FileFormat::Unknown);
    }

    #[test]
    fn test_detect_is_idempotent() {
        let content = "HEADER    TEST\nATOM      1  N   ALA A   1       0.0 0.0 0.0\n";
        let first = detect_format(content);
        assert_eq!(detect_format(content), first);
        assert_eq!(detect_format(content), first);
    }
}
