//! Sub-image extraction with reference-point and provenance bookkeeping.

use alloc::format;

use crate::error::{Error, Result};
use crate::image::ImageEntity;
use crate::value::Value;

/// An inclusive, zero-based rectangular region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x0: usize,
    pub x1: usize,
    pub y0: usize,
    pub y1: usize,
}

impl Bounds {
    /// Build a region from inclusive corner coordinates. Inverted bounds
    /// are rejected up front.
    pub fn new(x0: usize, x1: usize, y0: usize, y1: usize) -> Result<Self> {
        if x1 < x0 || y1 < y0 {
            return Err(Error::ExtractionOutOfBounds { x0, x1, y0, y1 });
        }
        Ok(Bounds { x0, x1, y0, y1 })
    }

    /// Region width in columns.
    pub fn width(&self) -> usize {
        self.x1 - self.x0 + 1
    }

    /// Region height in rows.
    pub fn height(&self) -> usize {
        self.y1 - self.y0 + 1
    }

    /// The center passed to the pixel-level copy, as `(cy, cx)`. Chosen so
    /// that `center - shape/2` lands exactly on the region origin.
    fn center(&self) -> (f64, f64) {
        (
            (self.y0 + self.y1 + 1) as f64 / 2.0,
            (self.x0 + self.x1 + 1) as f64 / 2.0,
        )
    }
}

/// Extract `bounds` from `src` as a new entity of the same type.
///
/// The source is never mutated. The result's header is a deep copy with the
/// reference pixel shifted by the region origin, the accumulated physical
/// offsets LTV1/LTV2 updated, XMIN/XMAX/YMIN/YMAX recording the region in
/// source coordinates, and a history line describing the operation.
pub fn extract<T: ImageEntity>(src: &T, bounds: Bounds) -> Result<T> {
    let (rows, cols) = src.pixels().shape();
    if bounds.x1 >= cols || bounds.y1 >= rows {
        return Err(Error::ExtractionOutOfBounds {
            x0: bounds.x0,
            x1: bounds.x1,
            y0: bounds.y0,
            y1: bounds.y1,
        });
    }

    let pixels = src
        .pixels()
        .extract_centered((bounds.height(), bounds.width()), bounds.center())?;

    let mut header = src.header().clone();
    header.set("NAXIS1", Value::Integer(bounds.width() as i64))?;
    header.set("NAXIS2", Value::Integer(bounds.height() as i64))?;

    if let Some(crpix1) = header.opt_f64("CRPIX1")? {
        header.set("CRPIX1", Value::Float(crpix1 - bounds.x0 as f64))?;
    }
    if let Some(crpix2) = header.opt_f64("CRPIX2")? {
        header.set("CRPIX2", Value::Float(crpix2 - bounds.y0 as f64))?;
    }

    let ltv1 = header.opt_f64("LTV1")?.unwrap_or(0.0);
    let ltv2 = header.opt_f64("LTV2")?.unwrap_or(0.0);
    header.set("LTV1", Value::Float(ltv1 - bounds.x0 as f64))?;
    header.set("LTV2", Value::Float(ltv2 - bounds.y0 as f64))?;

    header.set_with_comment("XMIN", Value::Integer(bounds.x0 as i64), "lower x-bound")?;
    header.set_with_comment("XMAX", Value::Integer(bounds.x1 as i64), "upper x-bound")?;
    header.set_with_comment("YMIN", Value::Integer(bounds.y0 as i64), "lower y-bound")?;
    header.set_with_comment("YMAX", Value::Integer(bounds.y1 as i64), "upper y-bound")?;

    header.add_history(format!(
        "Extracted from region (x,y)=[{}:{},{}:{}]",
        bounds.x0, bounds.x1, bounds.y0, bounds.y1
    ));

    src.rebuild(pixels, header)
}
