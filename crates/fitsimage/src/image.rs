//! The image entity: a pixel grid, its header, and an optional sky mapping.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::header::Header;
use crate::pixels::Pixels;
use crate::value::Value;
use crate::wcs::Wcs;
use crate::{extract, rebin};

/// An image-like value the geometry engines can derive new instances of.
///
/// `rebuild` is the clone-with-new-data factory: given fresh pixels and a
/// fresh header it returns a new instance of the same concrete type, so
/// specialized image types survive extraction and rebinning as themselves.
pub trait ImageEntity: Sized {
    /// The pixel grid.
    fn pixels(&self) -> &Pixels;
    /// The header.
    fn header(&self) -> &Header;
    /// Construct a new instance of this type around derived state.
    fn rebuild(&self, pixels: Pixels, header: Header) -> Result<Self>;
}

/// A 2-D FITS image with exclusive ownership of its pixels and header.
///
/// The header's NAXIS1/NAXIS2 keywords always match the grid shape: every
/// state-replacing operation re-synchronizes them. The sky mapping is built
/// once from the header at that point and is immutable afterwards; header
/// edits never retro-affect it.
#[derive(Debug, Clone)]
pub struct FitsImage {
    pixels: Pixels,
    header: Header,
    wcs: Option<Wcs>,
}

impl FitsImage {
    /// Build an image from a pixel grid and header.
    pub fn from_parts(pixels: Pixels, header: Header) -> Result<Self> {
        let mut image = FitsImage {
            pixels: Pixels::from_f64(0, 0, Vec::new())?,
            header: Header::new(),
            wcs: None,
        };
        image.load(pixels, header)?;
        Ok(image)
    }

    /// Deep-copy construction from any image entity.
    pub fn from_entity<T: ImageEntity>(other: &T) -> Result<Self> {
        Self::from_parts(other.pixels().clone(), other.header().clone())
    }

    /// Build an image from a container unit.
    #[cfg(feature = "std")]
    pub fn from_unit(unit: crate::file::Unit) -> Result<Self> {
        Self::from_parts(unit.pixels, unit.header)
    }

    /// Read unit `index` of the container at `path`.
    #[cfg(feature = "std")]
    pub fn from_file(path: impl AsRef<std::path::Path>, index: usize) -> Result<Self> {
        Self::from_unit(crate::file::read_unit(path, index)?)
    }

    /// Replace the image state, re-synchronizing NAXIS1/NAXIS2 and rebuilding
    /// the sky mapping from the new header snapshot. A header without usable
    /// WCS keywords leaves the image without a mapping.
    pub fn load(&mut self, pixels: Pixels, mut header: Header) -> Result<()> {
        let (rows, cols) = pixels.shape();
        header.set("NAXIS1", Value::Integer(cols as i64))?;
        header.set("NAXIS2", Value::Integer(rows as i64))?;

        self.wcs = Wcs::from_header(&header).ok();
        self.pixels = pixels;
        self.header = header;
        Ok(())
    }

    /// Grid dimensions as `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        self.pixels.shape()
    }

    /// The BITPIX value of the pixel storage.
    pub fn bitpix(&self) -> i64 {
        self.pixels.bitpix()
    }

    /// The sky mapping, if the header carried one.
    pub fn wcs(&self) -> Option<&Wcs> {
        self.wcs.as_ref()
    }

    /// Mutable header access for direct metadata edits.
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    // ---- keyword access ----

    /// Header value for `key`.
    pub fn value(&self, key: &str) -> Result<&Value> {
        self.header.get(key)
    }

    /// Numeric header value for `key`.
    pub fn value_f64(&self, key: &str) -> Result<f64> {
        self.header.get_f64(key)
    }

    /// Set a header value.
    pub fn set_value(&mut self, key: &str, value: Value) -> Result<()> {
        self.header.set(key, value)
    }

    /// Returns `true` if the header carries `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.header.contains(key)
    }

    /// Append a history line.
    pub fn add_history(&mut self, text: impl Into<String>) {
        self.header.add_history(text);
    }

    /// The history trail, oldest first.
    pub fn history(&self) -> &[String] {
        self.header.history()
    }

    // ---- pixel access ----

    /// Read the pixel at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range, like slice indexing.
    pub fn pixel(&self, row: usize, col: usize) -> f64 {
        self.pixels.get(row, col)
    }

    /// Write the pixel at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range, like slice indexing.
    pub fn set_pixel(&mut self, row: usize, col: usize, value: f64) {
        self.pixels.set(row, col, value);
    }

    /// Set every pixel selected by a flat row-major mask. A wrong-length mask
    /// fails without touching the image.
    pub fn set_where(&mut self, mask: &[bool], value: f64) -> Result<()> {
        self.pixels.set_where(mask, value)
    }

    /// Elementwise `pixel == value`, as a flat row-major mask.
    pub fn equals(&self, value: f64) -> Vec<bool> {
        self.pixels.equals(value)
    }

    /// Elementwise `pixel != value`.
    pub fn not_equals(&self, value: f64) -> Vec<bool> {
        self.pixels.not_equals(value)
    }

    /// Elementwise `pixel < value`.
    pub fn less_than(&self, value: f64) -> Vec<bool> {
        self.pixels.less_than(value)
    }

    /// Elementwise `pixel <= value`.
    pub fn less_equal(&self, value: f64) -> Vec<bool> {
        self.pixels.less_equal(value)
    }

    /// Elementwise `pixel > value`.
    pub fn greater_than(&self, value: f64) -> Vec<bool> {
        self.pixels.greater_than(value)
    }

    /// Elementwise `pixel >= value`.
    pub fn greater_equal(&self, value: f64) -> Vec<bool> {
        self.pixels.greater_equal(value)
    }

    /// Elementwise `pixel - value`, as a flat row-major vector.
    pub fn subtract(&self, value: f64) -> Vec<f64> {
        self.pixels.subtract(value)
    }

    /// Elementwise `value - pixel`.
    pub fn subtract_from(&self, value: f64) -> Vec<f64> {
        self.pixels.subtract_from(value)
    }

    /// Elementwise equality against a same-shaped image.
    pub fn equals_image<T: ImageEntity>(&self, other: &T) -> Result<Vec<bool>> {
        self.pixels.equals_pixels(other.pixels())
    }

    /// Elementwise `self - other` against a same-shaped image.
    pub fn subtract_image<T: ImageEntity>(&self, other: &T) -> Result<Vec<f64>> {
        self.pixels.subtract_pixels(other.pixels())
    }

    // ---- sky coordinates ----

    /// Map a zero-based pixel position to (RA, Dec) in degrees.
    ///
    /// The caller convention is fixed at zero-based; the +1 offset into the
    /// mapping's native FITS convention is applied here.
    pub fn pixel_to_sky(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let wcs = self.wcs.as_ref().ok_or(Error::NoWcs)?;
        Ok(wcs.forward(x + 1.0, y + 1.0))
    }

    /// Map (RA, Dec) in degrees to a zero-based pixel position.
    pub fn sky_to_pixel(&self, ra_deg: f64, dec_deg: f64) -> Result<(f64, f64)> {
        let wcs = self.wcs.as_ref().ok_or(Error::NoWcs)?;
        let (px, py) = wcs
            .inverse(ra_deg, dec_deg)
            .ok_or(Error::OutsideProjection)?;
        Ok((px - 1.0, py - 1.0))
    }

    // ---- derived images ----

    /// Extract the inclusive zero-based region `[x0..=x1] x [y0..=y1]` as a
    /// new image; see [`extract::extract`].
    pub fn extract(&self, x0: usize, x1: usize, y0: usize, y1: usize) -> Result<Self> {
        extract::extract(self, extract::Bounds::new(x0, x1, y0, y1)?)
    }

    /// Block-average by `(xbin, ybin)` under [`rebin::RebinMode::Strict`];
    /// see [`rebin::rebin`].
    pub fn rebin(&self, xbin: usize, ybin: usize) -> Result<Self> {
        rebin::rebin(self, xbin, ybin, rebin::RebinMode::Strict)
    }

    /// Block-average with an explicit handling mode for linear offset terms.
    pub fn rebin_with(&self, xbin: usize, ybin: usize, mode: rebin::RebinMode) -> Result<Self> {
        rebin::rebin(self, xbin, ybin, mode)
    }

    // ---- container I/O ----

    /// Package the image as a container unit without touching the filesystem.
    #[cfg(feature = "std")]
    pub fn to_unit(&self) -> crate::file::Unit {
        crate::file::Unit {
            header: self.header.clone(),
            pixels: self.pixels.clone(),
        }
    }

    /// Write the image as a single-unit container file.
    ///
    /// Fails with [`Error::FileExists`] when the target exists and
    /// `overwrite` is false.
    #[cfg(feature = "std")]
    pub fn write_to_file(&self, path: impl AsRef<std::path::Path>, overwrite: bool) -> Result<()> {
        crate::file::write_unit(path, &self.pixels, &self.header, overwrite)
    }
}

impl ImageEntity for FitsImage {
    fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn rebuild(&self, pixels: Pixels, header: Header) -> Result<Self> {
        Self::from_parts(pixels, header)
    }
}
