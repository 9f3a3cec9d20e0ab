//! TAN (gnomonic) sky mapping built from header keywords.

use crate::error::{Error, Result};
use crate::header::Header;
use crate::sphere;

/// TAN projection between pixel coordinates and celestial positions.
///
/// All angles are held in radians internally. A `Wcs` copies every keyword it
/// needs at construction; editing the header afterwards never changes an
/// existing mapping.
#[derive(Debug, Clone)]
pub struct Wcs {
    /// Reference point on sky (RA, Dec) in radians.
    pub crval: [f64; 2],
    /// Reference point in pixel coordinates (FITS 1-based).
    pub crpix: [f64; 2],
    /// CD matrix mapping pixel offsets to intermediate world coordinates
    /// (radians). `cd[0] = [cd1_1, cd1_2]`, `cd[1] = [cd2_1, cd2_2]`.
    pub cd: [[f64; 2]; 2],
}

impl Wcs {
    /// Build a mapping from a header snapshot.
    ///
    /// CRVAL1/2 and CRPIX1/2 are required. The linear term comes from the CD
    /// matrix when `CD1_1` is present (absent off-diagonal terms default to
    /// zero), falling back to a diagonal built from CDELT1/CDELT2.
    pub fn from_header(header: &Header) -> Result<Self> {
        let crval = [
            header.get_f64("CRVAL1").map_err(|_| Error::MissingKeyword("CRVAL1"))?,
            header.get_f64("CRVAL2").map_err(|_| Error::MissingKeyword("CRVAL2"))?,
        ];
        let crpix = [
            header.get_f64("CRPIX1").map_err(|_| Error::MissingKeyword("CRPIX1"))?,
            header.get_f64("CRPIX2").map_err(|_| Error::MissingKeyword("CRPIX2"))?,
        ];

        let cd_deg = if header.contains("CD1_1") {
            [
                [
                    header.get_f64("CD1_1")?,
                    header.opt_f64("CD1_2")?.unwrap_or(0.0),
                ],
                [
                    header.opt_f64("CD2_1")?.unwrap_or(0.0),
                    header.get_f64("CD2_2")?,
                ],
            ]
        } else {
            let cdelt1 = header
                .opt_f64("CDELT1")?
                .ok_or(Error::MissingKeyword("CD1_1"))?;
            let cdelt2 = header
                .opt_f64("CDELT2")?
                .ok_or(Error::MissingKeyword("CDELT2"))?;
            [[cdelt1, 0.0], [0.0, cdelt2]]
        };

        Ok(Wcs {
            crval: [crval[0].to_radians(), crval[1].to_radians()],
            crpix,
            cd: [
                [cd_deg[0][0].to_radians(), cd_deg[0][1].to_radians()],
                [cd_deg[1][0].to_radians(), cd_deg[1][1].to_radians()],
            ],
        })
    }

    /// Convert 1-based pixel coordinates to (RA, Dec) in degrees.
    pub fn forward(&self, px: f64, py: f64) -> (f64, f64) {
        let u = px - self.crpix[0];
        let v = py - self.crpix[1];
        let x = self.cd[0][0] * u + self.cd[0][1] * v;
        let y = self.cd[1][0] * u + self.cd[1][1] * v;

        let reference = sphere::radec_to_xyz(self.crval[0], self.crval[1]);
        let (ra, dec) = sphere::xyz_to_radec(sphere::tangent_to_xyz(x, y, reference));
        (ra.to_degrees(), dec.to_degrees())
    }

    /// Convert (RA, Dec) in degrees to 1-based pixel coordinates.
    ///
    /// Returns `None` if the position is behind the tangent plane.
    pub fn inverse(&self, ra_deg: f64, dec_deg: f64) -> Option<(f64, f64)> {
        let s = sphere::radec_to_xyz(ra_deg.to_radians(), dec_deg.to_radians());
        let reference = sphere::radec_to_xyz(self.crval[0], self.crval[1]);
        let (x, y) = sphere::tangent_plane_coords(s, reference)?;

        let det = self.cd[0][0] * self.cd[1][1] - self.cd[0][1] * self.cd[1][0];
        let inv_det = 1.0 / det;

        let u = inv_det * (self.cd[1][1] * x - self.cd[0][1] * y);
        let v = inv_det * (-self.cd[1][0] * x + self.cd[0][0] * y);

        Some((u + self.crpix[0], v + self.crpix[1]))
    }

    /// Approximate pixel scale in degrees per pixel from the CD determinant.
    pub fn pixel_scale(&self) -> f64 {
        let det = self.cd[0][0] * self.cd[1][1] - self.cd[0][1] * self.cd[1][0];
        libm::sqrt(libm::fabs(det)).to_degrees()
    }
}

/// Returns `true` if the header carries SIP distortion terms.
///
/// Detected from a CTYPEn algorithm suffix of `-SIP` or the presence of the
/// polynomial order keywords A_ORDER/B_ORDER.
pub fn has_sip(header: &Header) -> bool {
    for key in ["CTYPE1", "CTYPE2"] {
        if let Ok(ctype) = header.get_str(key) {
            if ctype.trim_end().ends_with("-SIP") {
                return true;
            }
        }
    }
    header.contains("A_ORDER") || header.contains("B_ORDER")
}
