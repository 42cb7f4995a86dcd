//! Molecular file format ingestion
//!
//! Reads molecular structure files into the unified
//! [`AtomSetCollection`] model:
//!
//! - **PDB** - fixed-column protein structures
//! - **CIF/mmCIF** - STAR-syntax crystallographic data
//! - **MOL/SDF** - MDL connection tables, multi-record
//! - **XYZ** - plain and Tinker-style coordinate lists
//! - **MOL2** - TRIPOS molecule sections
//! - **SHELX** - .ins/.res instruction cards
//!
//! Formats are identified by content, never by extension alone: a
//! bounded prefix of the input is run through an ordered rule list (see
//! [`detect`]). Gzip input is inflated transparently. Readers that see
//! fractional coordinates or an explicit request hand each finished
//! frame to the `xmol-sym` expansion engine, so returned collections
//! are always Cartesian.
//!
//! ```
//! use xmol_io::{parse_str, FileFormat, LoadOptions};
//!
//! let xyz = "3\nwater\nO 0.0 0.0 0.0\nH 0.757 0.586 0.0\nH -0.757 0.586 0.0\n";
//! let col = parse_str(xyz, FileFormat::Xyz, &LoadOptions::default()).unwrap();
//! assert_eq!(col.atom_count(), 3);
//! ```

pub mod compress;
pub mod detect;
pub mod error;
pub mod options;
pub mod readers;
pub mod scan;
pub mod traits;

pub use detect::detect_format;
pub use error::{IoError, IoResult};
pub use options::LoadOptions;
pub use traits::{create_reader, FileFormat, FormatReader};
pub use xmol_sym::{PackMode, SpaceGroupSource};

use std::io::Read;
use std::path::Path;

use xmol_mol::AtomSetCollection;

/// Read from a file, sniffing the format from content with the file
/// extension as the fallback.
pub fn read_file(path: &Path, options: &LoadOptions) -> IoResult<AtomSetCollection> {
    let bytes = std::fs::read(path)?;
    read_bytes(&bytes, Some(path), options)
}

/// Read from a file with a caller-chosen format, bypassing detection.
pub fn read_file_format(
    path: &Path,
    format: FileFormat,
    options: &LoadOptions,
) -> IoResult<AtomSetCollection> {
    let bytes = std::fs::read(path)?;
    let text = to_text(&bytes)?;
    parse_str(&text, format, options)
}

/// Read from any stream, sniffing the format from content.
pub fn read_any(mut input: impl Read, options: &LoadOptions) -> IoResult<AtomSetCollection> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    read_bytes(&bytes, None, options)
}

/// Parse a string known to be in the given format.
pub fn parse_str(
    content: &str,
    format: FileFormat,
    options: &LoadOptions,
) -> IoResult<AtomSetCollection> {
    let mut reader = create_reader(format)?;
    reader.initialize(options);
    reader.read(&mut content.as_bytes())
}

fn read_bytes(
    bytes: &[u8],
    path_hint: Option<&Path>,
    options: &LoadOptions,
) -> IoResult<AtomSetCollection> {
    let text = to_text(bytes)?;
    let mut format = detect_format(&text);
    if format == FileFormat::Unknown {
        if let Some(path) = path_hint {
            format = FileFormat::from_path(path);
        }
    }
    parse_str(&text, format, options)
}

fn to_text(bytes: &[u8]) -> IoResult<String> {
    if compress::is_gzip_prefix(bytes) {
        compress::inflate_to_string(bytes)
    } else {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_any_sniffs_pdb() {
        let pdb = "ATOM      1  N   ALA A   1       0.000   0.000   0.000  1.00  0.00           N\n";
        let col = read_any(pdb.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(col.collection_type, "pdb");
        assert_eq!(col.atom_count(), 1);
    }

    #[test]
    fn test_read_any_inflates_gzip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let xyz = "1\ngzip test\nC 0.0 0.0 0.0\n";
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(xyz.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let col = read_any(&compressed[..], &LoadOptions::default()).unwrap();
        assert_eq!(col.collection_type, "xyz");
        assert_eq!(col.atom_count(), 1);
    }

    #[test]
    fn test_unrecognized_content_is_an_error() {
        let result = read_any("nothing molecular here\nat all, kept going\n".as_bytes(), &LoadOptions::default());
        assert!(matches!(result, Err(IoError::UnknownFormat(_))));
    }

    #[test]
    fn test_recognized_but_unbundled_format() {
        let log = " Entering Gaussian System, Link 0=g raw\nmore output\nlines here\nand here\n";
        let result = read_any(log.as_bytes(), &LoadOptions::default());
        assert!(matches!(result, Err(IoError::Unsupported(_))));
    }
}
