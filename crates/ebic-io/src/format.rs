//! Image format detection
//!
//! Formats are detected from the magic number at the start of the file;
//! output formats are chosen from the file extension.

use crate::{IoError, IoResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Portable Network Graphics
    Png,
    /// Portable Graymap (P2 ASCII or P5 binary)
    Pnm,
}

impl ImageFormat {
    /// Canonical file extension
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Pnm => "pgm",
        }
    }

    /// Format implied by a file extension (case-insensitive)
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "pgm" | "pnm" => Some(Self::Pnm),
            _ => None,
        }
    }
}

/// Magic numbers for format detection
mod magic {
    /// PNG: 89 50 4E 47 0D 0A 1A 0A
    pub const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    /// PGM ASCII
    pub const PGM_ASCII: &[u8] = b"P2";

    /// PGM binary
    pub const PGM_BINARY: &[u8] = b"P5";
}

/// Detect the format of a file from its header
pub fn detect_format<P: AsRef<Path>>(path: P) -> IoResult<ImageFormat> {
    let mut file = File::open(path)?;
    let mut header = [0u8; 8];
    let mut filled = 0;
    while filled < header.len() {
        let n = file.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    detect_format_from_bytes(&header[..filled])
}

/// Detect the format of in-memory data
pub fn detect_format_from_bytes(data: &[u8]) -> IoResult<ImageFormat> {
    if data.len() < 2 {
        return Err(IoError::InvalidData(
            "not enough data to detect format".to_string(),
        ));
    }
    if data.starts_with(magic::PNG) {
        return Ok(ImageFormat::Png);
    }
    if data.starts_with(magic::PGM_ASCII) || data.starts_with(magic::PGM_BINARY) {
        return Ok(ImageFormat::Pnm);
    }
    Err(IoError::UnsupportedFormat(
        "unknown image format".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_png() {
        let data = [
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(detect_format_from_bytes(&data).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_detect_pgm() {
        assert_eq!(
            detect_format_from_bytes(b"P5\n100 100\n255\n").unwrap(),
            ImageFormat::Pnm
        );
        assert_eq!(
            detect_format_from_bytes(b"P2\n2 2\n15\n").unwrap(),
            ImageFormat::Pnm
        );
    }

    #[test]
    fn test_detect_unsupported() {
        // PPM is not a grayscale format
        assert!(detect_format_from_bytes(b"P6\n1 1\n255\n").is_err());
        assert!(detect_format_from_bytes(b"BM\x00\x00").is_err());
        assert!(detect_format_from_bytes(b"P").is_err());
    }

    #[test]
    fn test_from_path() {
        assert_eq!(ImageFormat::from_path("a/b.PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_path("scan.pgm"), Some(ImageFormat::Pnm));
        assert_eq!(ImageFormat::from_path("scan.tif"), None);
        assert_eq!(ImageFormat::from_path("noext"), None);
    }
}
