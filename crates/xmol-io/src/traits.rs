//! Format identities, the reader contract, and dispatch
//!
//! Formats are a closed enum; the dispatch table maps each to a reader
//! constructor. Adding a format means adding an enum variant and a table
//! arm. Formats the sniffer can recognize but for which no reader is
//! bundled (quantum-chemistry logs and XML variants) dispatch to an
//! `Unsupported` error, which the facade converts into the returned
//! collection's error message.

use std::io::BufRead;
use std::path::Path;

use crate::error::{IoError, IoResult};
use crate::options::LoadOptions;
use crate::readers::{
    cif::CifReader, mol::MolReader, mol2::Mol2Reader, pdb::PdbReader, shelx::ShelxReader,
    xyz::XyzReader,
};
use xmol_mol::AtomSetCollection;

/// All formats the sniffer can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Pdb,
    Cif,
    /// MDL Molfile / SDF
    Mol,
    Xyz,
    /// Tinker-style XYZ with trailing content on the count line
    FoldingXyz,
    Mol2,
    Shelx,
    Ghemical,
    Jaguar,
    Hin,
    NWChem,
    SpartanSmol,
    Molpro,
    Cml,
    Gaussian,
    Mopac,
    QChem,
    Gamess,
    Spartan,
    Jme,
    Unknown,
}

impl FileFormat {
    /// Canonical format name
    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::Pdb => "pdb",
            FileFormat::Cif => "cif",
            FileFormat::Mol => "mol",
            FileFormat::Xyz => "xyz",
            FileFormat::FoldingXyz => "foldingxyz",
            FileFormat::Mol2 => "mol2",
            FileFormat::Shelx => "shelx",
            FileFormat::Ghemical => "ghemical",
            FileFormat::Jaguar => "jaguar",
            FileFormat::Hin => "hin",
            FileFormat::NWChem => "nwchem",
            FileFormat::SpartanSmol => "spartansmol",
            FileFormat::Molpro => "molpro",
            FileFormat::Cml => "cml",
            FileFormat::Gaussian => "gaussian",
            FileFormat::Mopac => "mopac",
            FileFormat::QChem => "qchem",
            FileFormat::Gamess => "gamess",
            FileFormat::Spartan => "spartan",
            FileFormat::Jme => "jme",
            FileFormat::Unknown => "unknown",
        }
    }

    /// Guess a format from a file extension (fallback when content
    /// sniffing is inconclusive)
    pub fn from_extension(ext: &str) -> FileFormat {
        match ext.to_ascii_lowercase().as_str() {
            "pdb" | "ent" => FileFormat::Pdb,
            "cif" | "mmcif" | "mcif" => FileFormat::Cif,
            "mol" | "sdf" | "sd" | "mdl" => FileFormat::Mol,
            "xyz" => FileFormat::Xyz,
            "mol2" => FileFormat::Mol2,
            "res" | "ins" => FileFormat::Shelx,
            "hin" => FileFormat::Hin,
            "cml" => FileFormat::Cml,
            _ => FileFormat::Unknown,
        }
    }

    /// Guess a format from a path, looking through a `.gz` suffix
    pub fn from_path(path: &Path) -> FileFormat {
        let mut path = path.to_path_buf();
        if crate::compress::is_gzip_path(&path) {
            path.set_extension("");
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(FileFormat::from_extension)
            .unwrap_or(FileFormat::Unknown)
    }

    /// True when a reader is bundled for this format
    pub fn has_reader(&self) -> bool {
        matches!(
            self,
            FileFormat::Pdb
                | FileFormat::Cif
                | FileFormat::Mol
                | FileFormat::Xyz
                | FileFormat::FoldingXyz
                | FileFormat::Mol2
                | FileFormat::Shelx
        )
    }
}

/// The contract every format reader implements.
///
/// Readers never let ordinary malformed input escape `read`: recoverable
/// problems end up in the collection's error message and a partial (maybe
/// empty) collection is returned. Only stream failures and programming
/// errors surface as `Err`.
pub trait FormatReader {
    /// Reset per-parse state from the load options
    fn initialize(&mut self, options: &LoadOptions);

    /// Parse one stream end-to-end into a collection
    fn read(&mut self, input: &mut dyn BufRead) -> IoResult<AtomSetCollection>;
}

/// Instantiate the reader for a format.
pub fn create_reader(format: FileFormat) -> IoResult<Box<dyn FormatReader>> {
    match format {
        FileFormat::Pdb => Ok(Box::new(PdbReader::new())),
        FileFormat::Cif => Ok(Box::new(CifReader::new())),
        FileFormat::Mol => Ok(Box::new(MolReader::new())),
        FileFormat::Xyz => Ok(Box::new(XyzReader::new(false))),
        FileFormat::FoldingXyz => Ok(Box::new(XyzReader::new(true))),
        FileFormat::Mol2 => Ok(Box::new(Mol2Reader::new())),
        FileFormat::Shelx => Ok(Box::new(ShelxReader::new())),
        FileFormat::Unknown => Err(IoError::UnknownFormat("unrecognized content".to_string())),
        other => Err(IoError::unsupported(other.name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(FileFormat::from_extension("PDB"), FileFormat::Pdb);
        assert_eq!(FileFormat::from_extension("sdf"), FileFormat::Mol);
        assert_eq!(FileFormat::from_extension("zzz"), FileFormat::Unknown);
    }

    #[test]
    fn test_from_path_sees_through_gz() {
        assert_eq!(
            FileFormat::from_path(Path::new("structure.cif.gz")),
            FileFormat::Cif
        );
    }

    #[test]
    fn test_dispatch_table() {
        assert!(create_reader(FileFormat::Pdb).is_ok());
        assert!(create_reader(FileFormat::FoldingXyz).is_ok());
        assert!(matches!(
            create_reader(FileFormat::Gaussian),
            Err(IoError::Unsupported(_))
        ));
        assert!(matches!(
            create_reader(FileFormat::Unknown),
            Err(IoError::UnknownFormat(_))
        ));
    }
}
