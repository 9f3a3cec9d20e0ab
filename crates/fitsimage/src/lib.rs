//! FITS image cutouts and block-average rebinning with WCS bookkeeping.
//!
//! The crate centers on [`FitsImage`], a 2-D pixel grid paired with an
//! ordered keyword header. Extraction derives sub-images with the reference
//! pixel, accumulated offsets, and provenance keywords kept consistent;
//! rebinning block-averages and rescales the plate-scale and calibration
//! terms. Single-image containers read and write through [`file`] when the
//! `std` feature (default) is enabled.
//!
//! ```no_run
//! use fitsimage::FitsImage;
//!
//! # fn run() -> fitsimage::Result<()> {
//! let img = FitsImage::from_file("frame.fits", 1)?;
//! let cut = img.extract(100, 355, 100, 355)?;
//! let binned = cut.rebin(2, 2)?;
//! binned.write_to_file("binned.fits", false)?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod block;
pub mod error;
pub mod extract;
#[cfg(feature = "std")]
pub mod file;
pub mod header;
pub mod image;
pub mod pixels;
pub mod rebin;
pub mod sphere;
pub mod value;
pub mod wcs;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use error::{Error, Result};
pub use extract::Bounds;
#[cfg(feature = "std")]
pub use file::{read_unit, write_unit, Unit};
pub use header::{Card, Header};
pub use image::{FitsImage, ImageEntity};
pub use pixels::{PixelData, Pixels};
pub use rebin::RebinMode;
pub use value::Value;
pub use wcs::Wcs;
