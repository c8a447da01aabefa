//! ebic-io - Grayscale image I/O
//!
//! Reads PNG and PGM files into floating-point [`Image`]s and writes
//! corrected images back at 8 or 16 bits per sample.
//!
//! Color inputs are converted to luma on read; palette images are
//! expanded first. Written values are rounded and clamped to the range of
//! the output depth.

mod error;
pub mod format;
pub mod png;
pub mod pnm;

pub use error::{IoError, IoResult};
pub use format::{ImageFormat, detect_format, detect_format_from_bytes};

use ebic_core::{Image, Mask};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::path::Path;

/// Bits per stored sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleDepth {
    /// 8 bits per sample
    #[default]
    Eight,
    /// 16 bits per sample
    Sixteen,
}

impl SampleDepth {
    /// Largest representable sample value
    pub fn max_value(self) -> u16 {
        match self {
            Self::Eight => u8::MAX as u16,
            Self::Sixteen => u16::MAX,
        }
    }

    /// Smallest depth that holds `max_value`
    pub fn for_max_value(max_value: u32) -> Self {
        if max_value <= u8::MAX as u32 {
            Self::Eight
        } else {
            Self::Sixteen
        }
    }
}

/// A decoded image together with the depth it was stored at
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    /// Sample values
    pub image: Image,
    /// Depth of the stored samples
    pub depth: SampleDepth,
}

/// Options for writing images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Output depth
    pub depth: SampleDepth,
    /// Compress the output (PNG only)
    pub compress: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            depth: SampleDepth::Eight,
            compress: true,
        }
    }
}

/// Round and clamp a value into `0..=max`; NaN maps to 0
#[inline]
pub fn quantize(value: f64, max: u16) -> u16 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, f64::from(max)) as u16
}

/// Read an image, detecting the format from its magic number
pub fn read_image<P: AsRef<Path>>(path: P) -> IoResult<DecodedImage> {
    let path = path.as_ref();
    let format = detect_format(path)?;
    let reader = BufReader::new(File::open(path)?);
    let decoded = match format {
        ImageFormat::Png => png::read_png(reader)?,
        ImageFormat::Pnm => pnm::read_pnm(reader)?,
    };
    tracing::debug!(
        path = %path.display(),
        ?format,
        dims = ?decoded.image.dims(),
        depth = ?decoded.depth,
        "read image"
    );
    Ok(decoded)
}

/// Read an image from memory
pub fn read_image_from_bytes(data: &[u8]) -> IoResult<DecodedImage> {
    match detect_format_from_bytes(data)? {
        ImageFormat::Png => png::read_png(Cursor::new(data)),
        ImageFormat::Pnm => pnm::read_pnm(Cursor::new(data)),
    }
}

/// Read a label mask; sample values are rounded to labels
pub fn read_mask<P: AsRef<Path>>(path: P) -> IoResult<Mask> {
    let decoded = read_image(path)?;
    Ok(Mask::from_image(&decoded.image))
}

/// Write a 2-D image; the format follows the file extension
pub fn write_image<P: AsRef<Path>>(image: &Image, path: P, options: &WriteOptions) -> IoResult<()> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path).ok_or_else(|| {
        IoError::UnsupportedFormat(format!("cannot infer output format of {}", path.display()))
    })?;
    let mut writer = BufWriter::new(File::create(path)?);
    write_image_format(image, &mut writer, format, options)?;
    writer.flush()?;
    tracing::debug!(path = %path.display(), ?format, depth = ?options.depth, "wrote image");
    Ok(())
}

/// Encode a 2-D image in `format` to `writer`
pub fn write_image_format<W: Write>(
    image: &Image,
    writer: W,
    format: ImageFormat,
    options: &WriteOptions,
) -> IoResult<()> {
    if image.ndim() != 2 {
        return Err(IoError::InvalidData(format!(
            "only 2-D images can be written, got {} axes",
            image.ndim()
        )));
    }
    match format {
        ImageFormat::Png => png::write_png(image, writer, options),
        ImageFormat::Pnm => pnm::write_pnm(image, writer, options),
    }
}
