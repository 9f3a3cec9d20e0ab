//! Typed 2-D pixel grids and the elementwise operations images expose.
//!
//! Grids are row-major: `rows` is NAXIS2, `cols` is NAXIS1, and the column
//! index varies fastest, matching the FITS data segment layout.

use alloc::vec::Vec;

use crate::error::{Error, Result};

/// Pixel storage typed by BITPIX.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl PixelData {
    /// Number of stored pixels.
    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::I16(v) => v.len(),
            PixelData::I32(v) => v.len(),
            PixelData::I64(v) => v.len(),
            PixelData::F32(v) => v.len(),
            PixelData::F64(v) => v.len(),
        }
    }

    /// Returns `true` if no pixels are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The BITPIX value for this storage type.
    pub fn bitpix(&self) -> i64 {
        match self {
            PixelData::U8(_) => 8,
            PixelData::I16(_) => 16,
            PixelData::I32(_) => 32,
            PixelData::I64(_) => 64,
            PixelData::F32(_) => -32,
            PixelData::F64(_) => -64,
        }
    }
}

/// A 2-D pixel grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Pixels {
    rows: usize,
    cols: usize,
    data: PixelData,
}

/// Round a float to the nearest integer and clamp it into `[lo, hi]`.
fn round_clamp(v: f64, lo: f64, hi: f64) -> f64 {
    let r = libm::round(v);
    if r < lo {
        lo
    } else if r > hi {
        hi
    } else {
        r
    }
}

impl Pixels {
    /// Create a grid from typed storage, checking the element count.
    pub fn new(rows: usize, cols: usize, data: PixelData) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidConstructionArguments(
                "data length does not match rows * cols",
            ));
        }
        Ok(Self { rows, cols, data })
    }

    /// Create an f64 grid from a flat row-major vector.
    pub fn from_f64(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        Self::new(rows, cols, PixelData::F64(data))
    }

    /// Grid dimensions as `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Returns `true` if the grid holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The BITPIX value for the stored type.
    pub fn bitpix(&self) -> i64 {
        self.data.bitpix()
    }

    /// Returns `true` for storage types that cannot represent negatives.
    pub fn is_unsigned_int(&self) -> bool {
        matches!(self.data, PixelData::U8(_))
    }

    /// Borrow the typed storage.
    pub fn data(&self) -> &PixelData {
        &self.data
    }

    /// Read one pixel as `f64`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= rows` or `col >= cols`, like slice indexing.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols, "pixel index out of range");
        let i = row * self.cols + col;
        match &self.data {
            PixelData::U8(v) => v[i] as f64,
            PixelData::I16(v) => v[i] as f64,
            PixelData::I32(v) => v[i] as f64,
            PixelData::I64(v) => v[i] as f64,
            PixelData::F32(v) => v[i] as f64,
            PixelData::F64(v) => v[i],
        }
    }

    /// Write one pixel; integer storage rounds and clamps the value.
    ///
    /// # Panics
    ///
    /// Panics if `row >= rows` or `col >= cols`, like slice indexing.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.rows && col < self.cols, "pixel index out of range");
        let i = row * self.cols + col;
        match &mut self.data {
            PixelData::U8(v) => v[i] = round_clamp(value, 0.0, 255.0) as u8,
            PixelData::I16(v) => {
                v[i] = round_clamp(value, i16::MIN as f64, i16::MAX as f64) as i16
            }
            PixelData::I32(v) => {
                v[i] = round_clamp(value, i32::MIN as f64, i32::MAX as f64) as i32
            }
            PixelData::I64(v) => {
                v[i] = round_clamp(value, i64::MIN as f64, i64::MAX as f64) as i64
            }
            PixelData::F32(v) => v[i] = value as f32,
            PixelData::F64(v) => v[i] = value,
        }
    }

    /// Set every pixel where `mask` is true. The mask is flat row-major and
    /// must cover the whole grid; nothing is written on a length mismatch.
    pub fn set_where(&mut self, mask: &[bool], value: f64) -> Result<()> {
        if mask.len() != self.len() {
            return Err(Error::InvalidIndexType(
                "mask length does not match pixel count",
            ));
        }
        for (i, &selected) in mask.iter().enumerate() {
            if selected {
                self.set(i / self.cols, i % self.cols, value);
            }
        }
        Ok(())
    }

    /// All pixels as a flat row-major `f64` vector.
    pub fn to_f64(&self) -> Vec<f64> {
        match &self.data {
            PixelData::U8(v) => v.iter().map(|&p| p as f64).collect(),
            PixelData::I16(v) => v.iter().map(|&p| p as f64).collect(),
            PixelData::I32(v) => v.iter().map(|&p| p as f64).collect(),
            PixelData::I64(v) => v.iter().map(|&p| p as f64).collect(),
            PixelData::F32(v) => v.iter().map(|&p| p as f64).collect(),
            PixelData::F64(v) => v.clone(),
        }
    }

    fn compare(&self, value: f64, op: impl Fn(f64, f64) -> bool) -> Vec<bool> {
        self.to_f64().into_iter().map(|p| op(p, value)).collect()
    }

    /// Elementwise `pixel == value` as a flat row-major mask.
    pub fn equals(&self, value: f64) -> Vec<bool> {
        self.compare(value, |p, v| p == v)
    }

    /// Elementwise `pixel != value`.
    pub fn not_equals(&self, value: f64) -> Vec<bool> {
        self.compare(value, |p, v| p != v)
    }

    /// Elementwise `pixel < value`.
    pub fn less_than(&self, value: f64) -> Vec<bool> {
        self.compare(value, |p, v| p < v)
    }

    /// Elementwise `pixel <= value`.
    pub fn less_equal(&self, value: f64) -> Vec<bool> {
        self.compare(value, |p, v| p <= v)
    }

    /// Elementwise `pixel > value`.
    pub fn greater_than(&self, value: f64) -> Vec<bool> {
        self.compare(value, |p, v| p > v)
    }

    /// Elementwise `pixel >= value`.
    pub fn greater_equal(&self, value: f64) -> Vec<bool> {
        self.compare(value, |p, v| p >= v)
    }

    /// Elementwise `pixel - value` as a flat row-major vector.
    pub fn subtract(&self, value: f64) -> Vec<f64> {
        self.to_f64().into_iter().map(|p| p - value).collect()
    }

    /// Elementwise `value - pixel`.
    pub fn subtract_from(&self, value: f64) -> Vec<f64> {
        self.to_f64().into_iter().map(|p| value - p).collect()
    }

    fn compare_with(
        &self,
        other: &Pixels,
        op: impl Fn(f64, f64) -> bool,
    ) -> Result<Vec<bool>> {
        if other.shape() != self.shape() {
            return Err(Error::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        Ok(self
            .to_f64()
            .into_iter()
            .zip(other.to_f64())
            .map(|(a, b)| op(a, b))
            .collect())
    }

    /// Elementwise `self == other` against a same-shaped grid.
    pub fn equals_pixels(&self, other: &Pixels) -> Result<Vec<bool>> {
        self.compare_with(other, |a, b| a == b)
    }

    /// Elementwise `self < other` against a same-shaped grid.
    pub fn less_than_pixels(&self, other: &Pixels) -> Result<Vec<bool>> {
        self.compare_with(other, |a, b| a < b)
    }

    /// Elementwise `self > other` against a same-shaped grid.
    pub fn greater_than_pixels(&self, other: &Pixels) -> Result<Vec<bool>> {
        self.compare_with(other, |a, b| a > b)
    }

    /// Elementwise `self - other` against a same-shaped grid.
    pub fn subtract_pixels(&self, other: &Pixels) -> Result<Vec<f64>> {
        if other.shape() != self.shape() {
            return Err(Error::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        Ok(self
            .to_f64()
            .into_iter()
            .zip(other.to_f64())
            .map(|(a, b)| a - b)
            .collect())
    }

    /// Extract a `shape = (height, width)` sub-grid centered at
    /// `center = (cy, cx)` in pixel coordinates.
    ///
    /// The implied origin `center - shape / 2` must land exactly on a pixel
    /// and the whole target rectangle must lie inside the grid; there is no
    /// clipping or padding.
    pub fn extract_centered(&self, shape: (usize, usize), center: (f64, f64)) -> Result<Pixels> {
        let (height, width) = shape;
        let (cy, cx) = center;
        if height == 0 || width == 0 {
            return Err(Error::InvalidConstructionArguments(
                "extraction shape must be non-empty",
            ));
        }

        let oy = cy - height as f64 / 2.0;
        let ox = cx - width as f64 / 2.0;

        let out_of_bounds = || {
            let x0 = if ox < 0.0 { 0 } else { ox as usize };
            let y0 = if oy < 0.0 { 0 } else { oy as usize };
            Error::ExtractionOutOfBounds {
                x0,
                x1: x0 + width - 1,
                y0,
                y1: y0 + height - 1,
            }
        };

        if ox < 0.0 || oy < 0.0 || libm::floor(ox) != ox || libm::floor(oy) != oy {
            return Err(out_of_bounds());
        }
        let (y0, x0) = (oy as usize, ox as usize);
        if y0 + height > self.rows || x0 + width > self.cols {
            return Err(out_of_bounds());
        }

        let data = match &self.data {
            PixelData::U8(v) => PixelData::U8(copy_rect(v, self.cols, y0, x0, height, width)),
            PixelData::I16(v) => PixelData::I16(copy_rect(v, self.cols, y0, x0, height, width)),
            PixelData::I32(v) => PixelData::I32(copy_rect(v, self.cols, y0, x0, height, width)),
            PixelData::I64(v) => PixelData::I64(copy_rect(v, self.cols, y0, x0, height, width)),
            PixelData::F32(v) => PixelData::F32(copy_rect(v, self.cols, y0, x0, height, width)),
            PixelData::F64(v) => PixelData::F64(copy_rect(v, self.cols, y0, x0, height, width)),
        };

        Pixels::new(height, width, data)
    }

    /// Average non-overlapping `ybin x xbin` tiles into one pixel each.
    ///
    /// `xbin` bins columns (NAXIS1), `ybin` bins rows (NAXIS2). Both axes
    /// must divide exactly; callers trim first. The result is always `F64`.
    pub fn block_mean(&self, xbin: usize, ybin: usize) -> Result<Pixels> {
        if xbin == 0 || ybin == 0 {
            return Err(Error::InvalidConstructionArguments(
                "bin factors must be at least 1",
            ));
        }
        if self.rows % ybin != 0 || self.cols % xbin != 0 {
            return Err(Error::ShapeMismatch {
                expected: (self.rows - self.rows % ybin, self.cols - self.cols % xbin),
                actual: (self.rows, self.cols),
            });
        }

        let out_rows = self.rows / ybin;
        let out_cols = self.cols / xbin;
        let tile = (xbin * ybin) as f64;
        let src = self.to_f64();

        let mut out = Vec::with_capacity(out_rows * out_cols);
        for by in 0..out_rows {
            for bx in 0..out_cols {
                let mut sum = 0.0;
                for dy in 0..ybin {
                    let row_start = (by * ybin + dy) * self.cols + bx * xbin;
                    for dx in 0..xbin {
                        sum += src[row_start + dx];
                    }
                }
                out.push(sum / tile);
            }
        }

        Pixels::from_f64(out_rows, out_cols, out)
    }
}

/// Copy a `height x width` rectangle starting at `(y0, x0)` out of a
/// row-major slice with row stride `cols`.
fn copy_rect<T: Copy>(
    src: &[T],
    cols: usize,
    y0: usize,
    x0: usize,
    height: usize,
    width: usize,
) -> Vec<T> {
    let mut out = Vec::with_capacity(height * width);
    for row in 0..height {
        let start = (y0 + row) * cols + x0;
        out.extend_from_slice(&src[start..start + width]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    /// Helper: rows x cols grid filled with 0, 1, 2, ... in row-major order.
    fn ramp(rows: usize, cols: usize) -> Pixels {
        let data: Vec<f64> = (0..rows * cols).map(|i| i as f64).collect();
        Pixels::from_f64(rows, cols, data).unwrap()
    }

    #[test]
    fn new_checks_length() {
        let err = Pixels::new(2, 3, PixelData::F64(vec![0.0; 5]));
        assert!(matches!(err, Err(Error::InvalidConstructionArguments(_))));
        assert!(Pixels::new(2, 3, PixelData::F64(vec![0.0; 6])).is_ok());
    }

    #[test]
    fn bitpix_per_storage_type() {
        assert_eq!(Pixels::new(1, 2, PixelData::U8(vec![0; 2])).unwrap().bitpix(), 8);
        assert_eq!(Pixels::new(1, 2, PixelData::I16(vec![0; 2])).unwrap().bitpix(), 16);
        assert_eq!(Pixels::new(1, 2, PixelData::I32(vec![0; 2])).unwrap().bitpix(), 32);
        assert_eq!(Pixels::new(1, 2, PixelData::I64(vec![0; 2])).unwrap().bitpix(), 64);
        assert_eq!(Pixels::new(1, 2, PixelData::F32(vec![0.0; 2])).unwrap().bitpix(), -32);
        assert_eq!(Pixels::new(1, 2, PixelData::F64(vec![0.0; 2])).unwrap().bitpix(), -64);
    }

    #[test]
    fn get_set_roundtrip() {
        let mut p = ramp(3, 4);
        assert_eq!(p.get(0, 0), 0.0);
        assert_eq!(p.get(1, 0), 4.0);
        assert_eq!(p.get(2, 3), 11.0);

        p.set(1, 2, 99.5);
        assert_eq!(p.get(1, 2), 99.5);
    }

    #[test]
    fn set_rounds_and_clamps_integers() {
        let mut p = Pixels::new(1, 3, PixelData::I16(vec![0; 3])).unwrap();
        p.set(0, 0, 2.6);
        p.set(0, 1, -1e9);
        p.set(0, 2, 1e9);
        assert_eq!(p.get(0, 0), 3.0);
        assert_eq!(p.get(0, 1), i16::MIN as f64);
        assert_eq!(p.get(0, 2), i16::MAX as f64);
    }

    #[test]
    #[should_panic(expected = "pixel index out of range")]
    fn get_out_of_range_panics() {
        ramp(2, 2).get(2, 0);
    }

    #[test]
    fn set_where_writes_selected() {
        let mut p = ramp(2, 2);
        p.set_where(&[true, false, false, true], -1.0).unwrap();
        assert_eq!(p.to_f64(), vec![-1.0, 1.0, 2.0, -1.0]);
    }

    #[test]
    fn set_where_bad_mask_leaves_grid_untouched() {
        let mut p = ramp(2, 2);
        let err = p.set_where(&[true, false, true], -1.0);
        assert!(matches!(err, Err(Error::InvalidIndexType(_))));
        assert_eq!(p.to_f64(), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn comparisons_match_elementwise_semantics() {
        let p = ramp(2, 2); // 0 1 / 2 3
        assert_eq!(p.equals(2.0), vec![false, false, true, false]);
        assert_eq!(p.not_equals(2.0), vec![true, true, false, true]);
        assert_eq!(p.less_than(2.0), vec![true, true, false, false]);
        assert_eq!(p.less_equal(2.0), vec![true, true, true, false]);
        assert_eq!(p.greater_than(2.0), vec![false, false, false, true]);
        assert_eq!(p.greater_equal(2.0), vec![false, false, true, true]);
    }

    #[test]
    fn comparisons_do_not_mutate() {
        let p = ramp(2, 2);
        let before = p.clone();
        let _ = p.greater_than(1.0);
        let _ = p.subtract(5.0);
        assert_eq!(p, before);
    }

    #[test]
    fn subtract_both_directions() {
        let p = ramp(1, 3); // 0 1 2
        assert_eq!(p.subtract(1.0), vec![-1.0, 0.0, 1.0]);
        assert_eq!(p.subtract_from(1.0), vec![1.0, 0.0, -1.0]);
    }

    #[test]
    fn extract_centered_interior() {
        let p = ramp(4, 4);
        // Shape 2x2 centered at (2, 2) => origin (1, 1).
        let sub = p.extract_centered((2, 2), (2.0, 2.0)).unwrap();
        assert_eq!(sub.shape(), (2, 2));
        assert_eq!(sub.to_f64(), vec![5.0, 6.0, 9.0, 10.0]);
    }

    #[test]
    fn extract_centered_full_grid() {
        let p = ramp(3, 5);
        let sub = p.extract_centered((3, 5), (1.5, 2.5)).unwrap();
        assert_eq!(sub, p);
    }

    #[test]
    fn extract_centered_rejects_overhang() {
        let p = ramp(4, 4);
        assert!(matches!(
            p.extract_centered((2, 2), (0.0, 0.0)),
            Err(Error::ExtractionOutOfBounds { .. })
        ));
        assert!(matches!(
            p.extract_centered((2, 2), (4.0, 4.0)),
            Err(Error::ExtractionOutOfBounds { .. })
        ));
    }

    #[test]
    fn extract_centered_rejects_fractional_origin() {
        let p = ramp(4, 4);
        assert!(matches!(
            p.extract_centered((2, 2), (2.25, 2.0)),
            Err(Error::ExtractionOutOfBounds { .. })
        ));
    }

    #[test]
    fn extract_centered_preserves_dtype() {
        let p = Pixels::new(2, 2, PixelData::I16(vec![1, 2, 3, 4])).unwrap();
        let sub = p.extract_centered((1, 1), (0.5, 0.5)).unwrap();
        assert_eq!(sub.bitpix(), 16);
        assert_eq!(sub.get(0, 0), 1.0);
    }

    #[test]
    fn block_mean_square() {
        let p = ramp(4, 4);
        let binned = p.block_mean(2, 2).unwrap();
        assert_eq!(binned.shape(), (2, 2));
        // Top-left tile: 0 1 / 4 5 -> 2.5
        assert_eq!(binned.to_f64(), vec![2.5, 4.5, 10.5, 12.5]);
    }

    #[test]
    fn block_mean_rectangular_factors() {
        // 2 rows x 4 cols, xbin=2 (cols), ybin=1 (rows) -> 2x2.
        let p = Pixels::from_f64(2, 4, vec![0.0, 2.0, 4.0, 6.0, 1.0, 3.0, 5.0, 7.0]).unwrap();
        let binned = p.block_mean(2, 1).unwrap();
        assert_eq!(binned.shape(), (2, 2));
        assert_eq!(binned.to_f64(), vec![1.0, 5.0, 2.0, 6.0]);
    }

    #[test]
    fn block_mean_identity() {
        let p = ramp(3, 3);
        let binned = p.block_mean(1, 1).unwrap();
        assert_eq!(binned.shape(), (3, 3));
        assert_eq!(binned.to_f64(), p.to_f64());
    }

    #[test]
    fn block_mean_requires_exact_division() {
        let p = ramp(5, 4);
        match p.block_mean(2, 2) {
            Err(Error::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, (4, 4));
                assert_eq!(actual, (5, 4));
            }
            other => panic!("Expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn block_mean_result_is_f64() {
        let p = Pixels::new(2, 2, PixelData::I16(vec![1, 2, 3, 4])).unwrap();
        let binned = p.block_mean(2, 2).unwrap();
        assert_eq!(binned.bitpix(), -64);
        assert_eq!(binned.get(0, 0), 2.5);
    }

    #[test]
    fn unsigned_detection() {
        assert!(Pixels::new(1, 1, PixelData::U8(vec![0])).unwrap().is_unsigned_int());
        assert!(!Pixels::new(1, 1, PixelData::I16(vec![0])).unwrap().is_unsigned_int());
        assert!(!ramp(1, 1).is_unsigned_int());
    }

    #[test]
    fn grid_operands() {
        let a = ramp(2, 2);
        let b = Pixels::from_f64(2, 2, vec![0.0, 2.0, 2.0, 2.0]).unwrap();

        assert_eq!(a.equals_pixels(&b).unwrap(), vec![true, false, true, false]);
        assert_eq!(a.less_than_pixels(&b).unwrap(), vec![false, true, false, false]);
        assert_eq!(a.greater_than_pixels(&b).unwrap(), vec![false, false, false, true]);
        assert_eq!(a.subtract_pixels(&b).unwrap(), vec![0.0, -1.0, 0.0, 1.0]);
    }

    #[test]
    fn grid_operand_shape_checked() {
        let a = ramp(2, 2);
        let b = ramp(2, 3);
        assert!(matches!(
            a.equals_pixels(&b),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            a.subtract_pixels(&b),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
