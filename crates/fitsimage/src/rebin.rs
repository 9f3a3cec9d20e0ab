//! Block-average rebinning with plate-scale and calibration rescaling.

use alloc::format;

use crate::error::{Error, Result};
use crate::extract::{self, Bounds};
use crate::header::Header;
use crate::image::ImageEntity;
use crate::value::Value;
use crate::wcs;

/// How to treat accumulated linear pixel offsets (LTV1/LTV2) when rebinning.
///
/// There is no exact rescaling for offsets recorded against the original
/// full frame once pixels are averaged, so nonzero offsets either abort the
/// operation or are rescaled approximately on explicit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebinMode {
    /// Fail with [`Error::DistortionRescaleUnsupported`] on nonzero offsets.
    Strict,
    /// Divide the offsets by the bin factor and record a history note.
    BestEffort,
}

fn scale_if_present(header: &mut Header, key: &str, factor: f64) -> Result<()> {
    if let Some(v) = header.opt_f64(key)? {
        header.set(key, Value::Float(v * factor))?;
    }
    Ok(())
}

/// Block-average `src` by integer factors, `xbin` along columns and `ybin`
/// along rows, returning a new entity of the same type.
///
/// Trailing pixels that cannot fill a whole bin are trimmed off first by
/// delegating to [`extract::extract`], so the trimmed header (reference
/// pixel, offsets, provenance) is consistent before averaging. The derived
/// header then rescales the reference pixel about index 1, the plate-scale
/// terms by the per-axis factor, and the calibration terms by the number of
/// source pixels per output pixel.
///
/// Images carrying SIP distortion terms are refused outright; rescaling a
/// distortion polynomial is not supported.
pub fn rebin<T: ImageEntity>(src: &T, xbin: usize, ybin: usize, mode: RebinMode) -> Result<T> {
    if xbin == 0 || ybin == 0 {
        return Err(Error::InvalidConstructionArguments(
            "bin factors must be at least 1",
        ));
    }
    let (rows, cols) = src.pixels().shape();
    if cols < xbin || rows < ybin {
        return Err(Error::InvalidConstructionArguments(
            "bin factor exceeds image dimension",
        ));
    }
    if wcs::has_sip(src.header()) {
        return Err(Error::DistortionRescaleUnsupported("SIP distortion terms"));
    }

    let ltv1 = src.header().opt_f64("LTV1")?.unwrap_or(0.0);
    let ltv2 = src.header().opt_f64("LTV2")?.unwrap_or(0.0);
    if (ltv1 != 0.0 || ltv2 != 0.0) && mode == RebinMode::Strict {
        return Err(Error::DistortionRescaleUnsupported(
            "nonzero LTV pixel offsets",
        ));
    }

    let trimmed = extract::extract(
        src,
        Bounds::new(0, xbin * (cols / xbin) - 1, 0, ybin * (rows / ybin) - 1)?,
    )?;

    let pixels = trimmed.pixels().block_mean(xbin, ybin)?;

    let mut header = trimmed.header().clone();
    let (out_rows, out_cols) = pixels.shape();
    header.set("NAXIS1", Value::Integer(out_cols as i64))?;
    header.set("NAXIS2", Value::Integer(out_rows as i64))?;

    // Reference pixel rescales about index 1 in the 1-based convention.
    if let Some(crpix1) = header.opt_f64("CRPIX1")? {
        header.set("CRPIX1", Value::Float((crpix1 - 1.0) / xbin as f64 + 1.0))?;
    }
    if let Some(crpix2) = header.opt_f64("CRPIX2")? {
        header.set("CRPIX2", Value::Float((crpix2 - 1.0) / ybin as f64 + 1.0))?;
    }

    scale_if_present(&mut header, "CDELT1", xbin as f64)?;
    scale_if_present(&mut header, "CDELT2", ybin as f64)?;
    scale_if_present(&mut header, "CD1_1", xbin as f64)?;
    scale_if_present(&mut header, "CD1_2", xbin as f64)?;
    scale_if_present(&mut header, "CD2_1", ybin as f64)?;
    scale_if_present(&mut header, "CD2_2", ybin as f64)?;

    if ltv1 != 0.0 || ltv2 != 0.0 {
        header.set("LTV1", Value::Float(ltv1 / xbin as f64))?;
        header.set("LTV2", Value::Float(ltv2 / ybin as f64))?;
        header.add_history(format!(
            "Rescaled LTV offsets by 1/({}, {}) on a best-effort basis",
            xbin, ybin
        ));
    }

    // Averaging spreads one output pixel over xbin*ybin source pixels, so
    // the calibration terms grow by the same ratio.
    let pix_ratio = (xbin * ybin) as f64;
    if !pixels.is_unsigned_int() {
        if let Some(bscale) = header.opt_f64("BSCALE")? {
            if bscale != 0.0 && bscale != 1.0 {
                header.set("BSCALE", Value::Float(bscale * pix_ratio))?;
            }
        }
        if let Some(bzero) = header.opt_f64("BZERO")? {
            if bzero != 0.0 {
                header.set("BZERO", Value::Float(bzero * pix_ratio))?;
            }
        }
    }

    header.add_history(format!(
        "Block averaged with factors (x,y)=({}, {})",
        xbin, ybin
    ));

    src.rebuild(pixels, header)
}
