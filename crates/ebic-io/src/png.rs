//! PNG image format support
//!
//! Palette and low-depth images are expanded by the decoder; color
//! channels are combined into luma and alpha is dropped. Output is always
//! single-channel grayscale.

use crate::{DecodedImage, IoError, IoResult, SampleDepth, WriteOptions, quantize};
use ebic_core::Image;
use png::{BitDepth, ColorType, Compression, Decoder, Encoder, Transformations};
use std::io::{BufRead, Seek, Write};

/// Rec. 601 luma of an RGB triple
#[inline]
pub(crate) fn luma(r: f64, g: f64, b: f64) -> f64 {
    0.299 * r + 0.587 * g + 0.114 * b
}

/// Read a PNG image
pub fn read_png<R: BufRead + Seek>(reader: R) -> IoResult<DecodedImage> {
    let mut decoder = Decoder::new(reader);
    decoder.set_transformations(Transformations::EXPAND);
    let mut reader = decoder
        .read_info()
        .map_err(|e| IoError::DecodeError(format!("PNG decode error: {}", e)))?;

    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| IoError::DecodeError("failed to get output buffer size".to_string()))?;
    let mut buf = vec![0; buf_size];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| IoError::DecodeError(format!("PNG frame error: {}", e)))?;

    let channels = match info.color_type {
        ColorType::Grayscale => 1,
        ColorType::GrayscaleAlpha => 2,
        ColorType::Rgb => 3,
        ColorType::Rgba => 4,
        ColorType::Indexed => {
            return Err(IoError::UnsupportedFormat(
                "palette was not expanded".to_string(),
            ));
        }
    };
    let depth = match info.bit_depth {
        BitDepth::Eight => SampleDepth::Eight,
        BitDepth::Sixteen => SampleDepth::Sixteen,
        other => {
            return Err(IoError::UnsupportedFormat(format!(
                "unexpected PNG bit depth after expansion: {:?}",
                other
            )));
        }
    };

    let width = info.width as usize;
    let height = info.height as usize;
    let data = &buf[..info.buffer_size()];
    let sample = |row: &[u8], i: usize| -> f64 {
        match depth {
            SampleDepth::Eight => f64::from(row[i]),
            SampleDepth::Sixteen => f64::from(u16::from_be_bytes([row[2 * i], row[2 * i + 1]])),
        }
    };

    let mut values = Vec::with_capacity(width * height);
    for y in 0..height {
        let row = &data[y * info.line_size..];
        for x in 0..width {
            let base = x * channels;
            let v = if channels >= 3 {
                luma(sample(row, base), sample(row, base + 1), sample(row, base + 2))
            } else {
                sample(row, base)
            };
            values.push(v);
        }
    }

    Ok(DecodedImage {
        image: Image::from_data(&[width, height], values)?,
        depth,
    })
}

/// Write a 2-D image as single-channel grayscale PNG
pub fn write_png<W: Write>(image: &Image, writer: W, options: &WriteOptions) -> IoResult<()> {
    let width = u32::try_from(image.width())
        .map_err(|_| IoError::InvalidData("image too wide for PNG".to_string()))?;
    let height = u32::try_from(image.height())
        .map_err(|_| IoError::InvalidData("image too tall for PNG".to_string()))?;

    let mut encoder = Encoder::new(writer, width, height);
    encoder.set_color(ColorType::Grayscale);
    encoder.set_depth(match options.depth {
        SampleDepth::Eight => BitDepth::Eight,
        SampleDepth::Sixteen => BitDepth::Sixteen,
    });
    encoder.set_compression(if options.compress {
        Compression::High
    } else {
        Compression::NoCompression
    });

    let mut writer = encoder
        .write_header()
        .map_err(|e| IoError::EncodeError(format!("PNG header error: {}", e)))?;

    let max = options.depth.max_value();
    let data: Vec<u8> = match options.depth {
        SampleDepth::Eight => image.data().iter().map(|&v| quantize(v, max) as u8).collect(),
        SampleDepth::Sixteen => image
            .data()
            .iter()
            .flat_map(|&v| quantize(v, max).to_be_bytes())
            .collect(),
    };

    writer
        .write_image_data(&data)
        .map_err(|e| IoError::EncodeError(format!("PNG write error: {}", e)))?;
    writer
        .finish()
        .map_err(|e| IoError::EncodeError(format!("PNG finish error: {}", e)))?;

    Ok(())
}
