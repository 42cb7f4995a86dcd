//! Transparent gzip handling
//!
//! Sniffing and reading both work on possibly gzip-compressed input; the
//! magic-byte check happens on the buffered prefix so the stream never has
//! to be reopened.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::IoResult;

/// Gzip magic bytes `1f 8b`
pub fn is_gzip_prefix(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Check if a path indicates a gzip file (by extension)
pub fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Open a file for reading, decoding gzip when the extension asks for it
pub fn open_file(path: &Path) -> IoResult<Box<dyn Read>> {
    let file = File::open(path)?;
    if is_gzip_path(path) {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Inflate a gzip byte buffer to text
pub fn inflate_to_string(bytes: &[u8]) -> IoResult<String> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = String::new();
    decoder
        .read_to_string(&mut out)
        .map_err(|e| crate::error::IoError::Decompression(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_is_gzip_path() {
        assert!(is_gzip_path(Path::new("file.pdb.gz")));
        assert!(is_gzip_path(Path::new("file.GZ")));
        assert!(!is_gzip_path(Path::new("file.pdb")));
    }

    #[test]
    fn test_magic_and_inflate() {
        let original = b"3\nwater\nO 0.0 0.0 0.0\n";
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();

        assert!(is_gzip_prefix(&compressed));
        assert!(!is_gzip_prefix(original));
        let text = inflate_to_string(&compressed).unwrap();
        assert_eq!(text.as_bytes(), original);
    }
}
