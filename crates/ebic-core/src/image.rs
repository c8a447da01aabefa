//! Image - n-dimensional floating-point image
//!
//! `Image` is a regular grid of `f64` intensity samples with any number of
//! axes. Axis 0 varies fastest, so for a 2D image axis 0 is the column (x)
//! and axis 1 is the row (y).
//!
//! The extent of an image (its `dims()`) doubles as its region: two images
//! are compatible for pixel-wise operations only when their extents are
//! identical.
//!
//! # Examples
//!
//! ```
//! use ebic_core::Image;
//!
//! let mut image = Image::new_2d(100, 80).unwrap();
//! image.set_pixel(10, 20, 0.5).unwrap();
//! assert_eq!(image.get_pixel(10, 20).unwrap(), 0.5);
//! assert_eq!(image.dims(), &[100, 80]);
//! ```

use crate::error::{Error, Result};

/// n-dimensional floating-point image
///
/// # Memory Layout
///
/// Data is stored with no padding, axis 0 fastest. The sample at
/// coordinate `c` is at index `c[0] + d[0] * (c[1] + d[1] * (c[2] + ...))`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Extent along each axis
    dims: Vec<usize>,
    /// Sample data
    data: Vec<f64>,
    /// Physical spacing along each axis (informational only)
    spacing: Vec<f64>,
}

impl Image {
    /// Create a new image with all samples set to zero
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if `dims` is empty or any extent is 0.
    pub fn new(dims: &[usize]) -> Result<Self> {
        Self::new_with_value(dims, 0.0)
    }

    /// Create a new image with all samples set to `value`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if `dims` is empty or any extent is 0.
    pub fn new_with_value(dims: &[usize], value: f64) -> Result<Self> {
        let len = checked_len(dims)?;
        Ok(Image {
            dims: dims.to_vec(),
            data: vec![value; len],
            spacing: vec![1.0; dims.len()],
        })
    }

    /// Create a new 2D image of `width` x `height` zero samples
    pub fn new_2d(width: usize, height: usize) -> Result<Self> {
        Self::new(&[width, height])
    }

    /// Create an image from raw data
    ///
    /// # Errors
    ///
    /// Returns an error if the extent is invalid or the data length does
    /// not match the product of the extents.
    pub fn from_data(dims: &[usize], data: Vec<f64>) -> Result<Self> {
        let len = checked_len(dims)?;
        if data.len() != len {
            return Err(Error::InvalidParameter(format!(
                "data length {} doesn't match extent {:?} = {}",
                data.len(),
                dims,
                len
            )));
        }
        Ok(Image {
            dims: dims.to_vec(),
            data,
            spacing: vec![1.0; dims.len()],
        })
    }

    /// Create an image by evaluating `f` at every coordinate
    pub fn from_fn(dims: &[usize], mut f: impl FnMut(&[usize]) -> f64) -> Result<Self> {
        let mut image = Self::new(dims)?;
        let mut cursor = IndexCursor::new(dims);
        let mut idx = 0;
        loop {
            image.data[idx] = f(cursor.coord());
            idx += 1;
            if !cursor.advance() {
                break;
            }
        }
        Ok(image)
    }

    /// Extent along each axis
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of axes
    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of samples
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: an image has at least one sample
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Extent along axis 0
    #[inline]
    pub fn width(&self) -> usize {
        self.dims[0]
    }

    /// Extent along axis 1, or 1 for a 1D image
    #[inline]
    pub fn height(&self) -> usize {
        self.dims.get(1).copied().unwrap_or(1)
    }

    /// Physical spacing along each axis
    #[inline]
    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    /// Set the physical spacing
    ///
    /// # Errors
    ///
    /// Returns an error if the number of entries differs from `ndim()` or
    /// any spacing is not strictly positive.
    pub fn set_spacing(&mut self, spacing: &[f64]) -> Result<()> {
        if spacing.len() != self.dims.len() {
            return Err(Error::InvalidParameter(format!(
                "spacing has {} entries for a {}-dimensional image",
                spacing.len(),
                self.dims.len()
            )));
        }
        if spacing.iter().any(|&s| !(s > 0.0 && s.is_finite())) {
            return Err(Error::InvalidParameter(
                "spacing must be positive and finite".to_string(),
            ));
        }
        self.spacing = spacing.to_vec();
        Ok(())
    }

    /// Linear index of a coordinate
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if the coordinate has the wrong
    /// number of axes and `Error::IndexOutOfBounds` if it lies outside the
    /// extent.
    pub fn linear_index(&self, coord: &[usize]) -> Result<usize> {
        if coord.len() != self.dims.len() {
            return Err(Error::InvalidParameter(format!(
                "coordinate has {} axes, image has {}",
                coord.len(),
                self.dims.len()
            )));
        }
        let mut idx = 0;
        for axis in (0..self.dims.len()).rev() {
            if coord[axis] >= self.dims[axis] {
                return Err(Error::IndexOutOfBounds {
                    index: coord[axis],
                    len: self.dims[axis],
                });
            }
            idx = idx * self.dims[axis] + coord[axis];
        }
        Ok(idx)
    }

    /// Get the sample at `coord`
    pub fn get(&self, coord: &[usize]) -> Result<f64> {
        let idx = self.linear_index(coord)?;
        Ok(self.data[idx])
    }

    /// Set the sample at `coord`
    pub fn set(&mut self, coord: &[usize], value: f64) -> Result<()> {
        let idx = self.linear_index(coord)?;
        self.data[idx] = value;
        Ok(())
    }

    /// Get the sample at (x, y) of a 2D image
    pub fn get_pixel(&self, x: usize, y: usize) -> Result<f64> {
        self.get(&[x, y])
    }

    /// Set the sample at (x, y) of a 2D image
    pub fn set_pixel(&mut self, x: usize, y: usize, value: f64) -> Result<()> {
        self.set(&[x, y], value)
    }

    /// Raw sample data
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable raw sample data
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Minimum and maximum over the finite samples, or `None` if there are none
    pub fn min_max(&self) -> Option<(f64, f64)> {
        finite_min_max(self.data.iter().copied())
    }

    /// Create a zero image with the same extent and spacing
    pub fn create_template(&self) -> Image {
        Image {
            dims: self.dims.clone(),
            data: vec![0.0; self.data.len()],
            spacing: self.spacing.clone(),
        }
    }

    /// Check that `dims` equals this image's extent
    ///
    /// # Errors
    ///
    /// Returns `Error::RegionMismatch` otherwise.
    pub fn check_region(&self, dims: &[usize]) -> Result<()> {
        if self.dims != dims {
            return Err(Error::RegionMismatch {
                expected: self.dims.clone(),
                actual: dims.to_vec(),
            });
        }
        Ok(())
    }

    /// Cursor over all coordinates in storage order
    pub fn cursor(&self) -> IndexCursor {
        IndexCursor::new(&self.dims)
    }
}

/// Odometer-style walk over the coordinates of an extent
///
/// Starts at the origin; `advance()` moves to the next coordinate in
/// storage order and returns false once the walk is exhausted.
///
/// ```
/// use ebic_core::IndexCursor;
///
/// let mut cursor = IndexCursor::new(&[2, 2]);
/// let mut seen = vec![cursor.coord().to_vec()];
/// while cursor.advance() {
///     seen.push(cursor.coord().to_vec());
/// }
/// assert_eq!(seen, vec![vec![0, 0], vec![1, 0], vec![0, 1], vec![1, 1]]);
/// ```
#[derive(Debug, Clone)]
pub struct IndexCursor {
    dims: Vec<usize>,
    coord: Vec<usize>,
}

impl IndexCursor {
    /// Create a cursor at the origin of `dims`
    pub fn new(dims: &[usize]) -> Self {
        IndexCursor {
            dims: dims.to_vec(),
            coord: vec![0; dims.len()],
        }
    }

    /// Current coordinate
    #[inline]
    pub fn coord(&self) -> &[usize] {
        &self.coord
    }

    /// Step to the next coordinate; false when the walk wraps around
    pub fn advance(&mut self) -> bool {
        for axis in 0..self.dims.len() {
            self.coord[axis] += 1;
            if self.coord[axis] < self.dims[axis] {
                return true;
            }
            self.coord[axis] = 0;
        }
        false
    }
}

/// Minimum and maximum over the finite values of an iterator
pub(crate) fn finite_min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn checked_len(dims: &[usize]) -> Result<usize> {
    if dims.is_empty() || dims.contains(&0) {
        return Err(Error::InvalidDimension(dims.to_vec()));
    }
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| Error::InvalidDimension(dims.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_zero_extent() {
        assert!(matches!(
            Image::new(&[4, 0]),
            Err(Error::InvalidDimension(_))
        ));
        assert!(matches!(Image::new(&[]), Err(Error::InvalidDimension(_))));
    }

    #[test]
    fn test_linear_index_axis0_fastest() {
        let image = Image::new(&[3, 4, 5]).unwrap();
        assert_eq!(image.linear_index(&[0, 0, 0]).unwrap(), 0);
        assert_eq!(image.linear_index(&[1, 0, 0]).unwrap(), 1);
        assert_eq!(image.linear_index(&[0, 1, 0]).unwrap(), 3);
        assert_eq!(image.linear_index(&[0, 0, 1]).unwrap(), 12);
        assert_eq!(image.linear_index(&[2, 3, 4]).unwrap(), 59);
        assert!(matches!(
            image.linear_index(&[3, 0, 0]),
            Err(Error::IndexOutOfBounds { index: 3, len: 3 })
        ));
        assert!(matches!(
            image.linear_index(&[1, 1]),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            image.get(&[0, 0, 0, 0]),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_spacing_carried_by_template() {
        let mut image = Image::new(&[4, 3]).unwrap();
        assert_eq!(image.spacing(), &[1.0, 1.0]);
        image.set_spacing(&[0.5, 2.0]).unwrap();
        assert_eq!(image.create_template().spacing(), &[0.5, 2.0]);

        assert!(image.set_spacing(&[1.0]).is_err());
        assert!(image.set_spacing(&[1.0, 0.0]).is_err());
        assert!(image.set_spacing(&[f64::NAN, 1.0]).is_err());
        assert_eq!(image.spacing(), &[0.5, 2.0]);
    }

    #[test]
    fn test_from_fn_matches_get() {
        let image = Image::from_fn(&[4, 3], |c| (c[0] * 10 + c[1]) as f64).unwrap();
        assert_eq!(image.get_pixel(2, 1).unwrap(), 21.0);
        assert_eq!(image.get_pixel(3, 2).unwrap(), 32.0);
    }

    #[test]
    fn test_min_max_skips_nan() {
        let image = Image::from_data(&[4], vec![3.0, f64::NAN, -1.0, 7.0]).unwrap();
        assert_eq!(image.min_max(), Some((-1.0, 7.0)));
    }

    #[test]
    fn test_check_region() {
        let image = Image::new_2d(8, 8).unwrap();
        assert!(image.check_region(&[8, 8]).is_ok());
        match image.check_region(&[8, 7]) {
            Err(Error::RegionMismatch { expected, actual }) => {
                assert_eq!(expected, vec![8, 8]);
                assert_eq!(actual, vec![8, 7]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_cursor_visits_every_coordinate_once() {
        let mut cursor = IndexCursor::new(&[3, 2, 2]);
        let mut count = 1;
        while cursor.advance() {
            count += 1;
        }
        assert_eq!(count, 12);
        assert_eq!(cursor.coord(), &[0, 0, 0]);
    }
}
