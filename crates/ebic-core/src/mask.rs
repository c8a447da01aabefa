//! Label mask restricting which samples contribute to a histogram

use crate::error::{Error, Result};
use crate::image::{IndexCursor, Image};

/// Same-shape `u8` label array
///
/// A sample is inside the mask when its label is non-zero, or, when a
/// specific label is selected, when its label equals that label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    dims: Vec<usize>,
    labels: Vec<u8>,
}

impl Mask {
    /// Create a mask with every label set to `label`
    pub fn filled(dims: &[usize], label: u8) -> Result<Self> {
        let len = Image::new(dims)?.len();
        Ok(Mask {
            dims: dims.to_vec(),
            labels: vec![label; len],
        })
    }

    /// Create a mask from raw labels (axis 0 fastest)
    pub fn from_data(dims: &[usize], labels: Vec<u8>) -> Result<Self> {
        let len = Image::new(dims)?.len();
        if labels.len() != len {
            return Err(Error::InvalidParameter(format!(
                "label count {} doesn't match extent {:?} = {}",
                labels.len(),
                dims,
                len
            )));
        }
        Ok(Mask {
            dims: dims.to_vec(),
            labels,
        })
    }

    /// Create a mask by evaluating `f` at every coordinate
    pub fn from_fn(dims: &[usize], mut f: impl FnMut(&[usize]) -> u8) -> Result<Self> {
        let mut mask = Self::filled(dims, 0)?;
        let mut cursor = IndexCursor::new(dims);
        let mut idx = 0;
        loop {
            mask.labels[idx] = f(cursor.coord());
            idx += 1;
            if !cursor.advance() {
                break;
            }
        }
        Ok(mask)
    }

    /// Build a label mask from an image, rounding and clamping to `0..=255`
    pub fn from_image(image: &Image) -> Self {
        let labels = image
            .data()
            .iter()
            .map(|&v| if v.is_finite() { v.round().clamp(0.0, 255.0) as u8 } else { 0 })
            .collect();
        Mask {
            dims: image.dims().to_vec(),
            labels,
        }
    }

    /// Extent along each axis
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Raw labels
    #[inline]
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Whether the sample at linear index `idx` is inside the mask
    ///
    /// `label == None` accepts any non-zero label.
    #[inline]
    pub fn is_inside(&self, idx: usize, label: Option<u8>) -> bool {
        let value = self.labels[idx];
        match label {
            Some(l) => value == l,
            None => value != 0,
        }
    }

    /// Number of samples inside the mask
    pub fn count(&self, label: Option<u8>) -> usize {
        (0..self.labels.len())
            .filter(|&i| self.is_inside(i, label))
            .count()
    }

    /// Check that the mask covers exactly the region of `image`
    ///
    /// # Errors
    ///
    /// Returns `Error::RegionMismatch` if the extents differ.
    pub fn check_region(&self, image: &Image) -> Result<()> {
        image.check_region(&self.dims)
    }
}
