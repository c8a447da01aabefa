//! PGM (Portable Graymap) format support
//!
//! Reads P5 (binary) and P2 (ASCII) graymaps with a maximum value up to
//! 65535, and writes P5. Two-byte samples are big-endian.

use crate::{DecodedImage, IoError, IoResult, SampleDepth, WriteOptions, quantize};
use ebic_core::Image;
use std::io::{Read, Write};

/// Header tokenizer over the raw file bytes
struct Header<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Header<'a> {
    fn skip_whitespace_and_comments(&mut self) {
        while self.pos < self.data.len() {
            match self.data[self.pos] {
                b'#' => {
                    while self.pos < self.data.len() && self.data[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                c if c.is_ascii_whitespace() => self.pos += 1,
                _ => break,
            }
        }
    }

    fn token(&mut self) -> IoResult<&'a [u8]> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        while self.pos < self.data.len() && !self.data[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(IoError::InvalidData("unexpected end of PGM header".to_string()));
        }
        let data = self.data;
        Ok(&data[start..self.pos])
    }

    fn number(&mut self) -> IoResult<u32> {
        let token = self.token()?;
        std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                IoError::InvalidData(format!(
                    "invalid PGM number '{}'",
                    String::from_utf8_lossy(token)
                ))
            })
    }
}

/// Read a PGM image (P2 or P5)
pub fn read_pnm<R: Read>(mut reader: R) -> IoResult<DecodedImage> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    let mut header = Header { data: &data, pos: 0 };
    let magic = header.token()?;
    let binary = match magic {
        b"P5" => true,
        b"P2" => false,
        other => {
            return Err(IoError::UnsupportedFormat(format!(
                "unsupported PNM type {}",
                String::from_utf8_lossy(other)
            )));
        }
    };
    let width = header.number()? as usize;
    let height = header.number()? as usize;
    let max_value = header.number()?;
    if width == 0 || height == 0 {
        return Err(IoError::InvalidData(format!("invalid PGM size {}x{}", width, height)));
    }
    if max_value == 0 || max_value > u16::MAX as u32 {
        return Err(IoError::InvalidData(format!("invalid PGM maxval {}", max_value)));
    }
    let depth = SampleDepth::for_max_value(max_value);
    let count = width * height;

    let values: Vec<f64> = if binary {
        // Exactly one whitespace byte separates the header from the raster
        let start = header.pos + 1;
        let bytes_per_sample = if depth == SampleDepth::Eight { 1 } else { 2 };
        let raster = data
            .get(start..start + count * bytes_per_sample)
            .ok_or_else(|| IoError::InvalidData("truncated PGM raster".to_string()))?;
        match depth {
            SampleDepth::Eight => raster.iter().map(|&b| f64::from(b)).collect(),
            SampleDepth::Sixteen => raster
                .chunks_exact(2)
                .map(|c| f64::from(u16::from_be_bytes([c[0], c[1]])))
                .collect(),
        }
    } else {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(f64::from(header.number()?));
        }
        values
    };

    Ok(DecodedImage {
        image: Image::from_data(&[width, height], values)?,
        depth,
    })
}

/// Write a 2-D image as binary PGM (P5)
pub fn write_pnm<W: Write>(image: &Image, mut writer: W, options: &WriteOptions) -> IoResult<()> {
    let max = options.depth.max_value();
    write!(writer, "P5\n{} {}\n{}\n", image.width(), image.height(), max)?;
    let data: Vec<u8> = match options.depth {
        SampleDepth::Eight => image.data().iter().map(|&v| quantize(v, max) as u8).collect(),
        SampleDepth::Sixteen => image
            .data()
            .iter()
            .flat_map(|&v| quantize(v, max).to_be_bytes())
            .collect(),
    };
    writer.write_all(&data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_pgm_roundtrip_8bit() {
        let image = Image::from_fn(&[5, 3], |c| (c[0] * 50 + c[1]) as f64).unwrap();
        let mut buffer = Vec::new();
        write_pnm(&image, &mut buffer, &WriteOptions::default()).unwrap();
        assert!(buffer.starts_with(b"P5\n5 3\n255\n"));
        let decoded = read_pnm(Cursor::new(buffer)).unwrap();
        assert_eq!(decoded.depth, SampleDepth::Eight);
        assert_eq!(decoded.image.data(), image.data());
    }

    #[test]
    fn test_pgm_roundtrip_16bit() {
        let image = Image::from_data(&[2, 2], vec![0.0, 256.0, 4095.0, 65535.0]).unwrap();
        let options = WriteOptions {
            depth: SampleDepth::Sixteen,
            ..Default::default()
        };
        let mut buffer = Vec::new();
        write_pnm(&image, &mut buffer, &options).unwrap();
        let decoded = read_pnm(Cursor::new(buffer)).unwrap();
        assert_eq!(decoded.depth, SampleDepth::Sixteen);
        assert_eq!(decoded.image.data(), image.data());
    }

    #[test]
    fn test_ascii_pgm_with_comments() {
        let text = b"P2\n# a comment\n3 2\n# another\n15\n0 1 2\n13 14 15\n";
        let decoded = read_pnm(Cursor::new(&text[..])).unwrap();
        assert_eq!(decoded.image.dims(), &[3, 2]);
        assert_eq!(decoded.image.get_pixel(2, 1).unwrap(), 15.0);
        assert_eq!(decoded.depth, SampleDepth::Eight);
    }

    #[test]
    fn test_truncated_raster() {
        let data = b"P5\n4 4\n255\n\x00\x01";
        assert!(matches!(
            read_pnm(Cursor::new(&data[..])),
            Err(IoError::InvalidData(_))
        ));
    }

    #[test]
    fn test_rejects_ppm() {
        assert!(matches!(
            read_pnm(Cursor::new(&b"P6\n1 1\n255\n\x00\x00\x00"[..])),
            Err(IoError::UnsupportedFormat(_))
        ));
    }
}
