//! Unit-sphere and tangent-plane math backing the sky coordinate mapping.

use core::f64::consts::TAU;

/// Convert (RA, Dec) in radians to a unit vector.
pub fn radec_to_xyz(ra: f64, dec: f64) -> [f64; 3] {
    let cos_dec = libm::cos(dec);
    [
        cos_dec * libm::cos(ra),
        cos_dec * libm::sin(ra),
        libm::sin(dec),
    ]
}

/// Convert a unit vector to (RA, Dec) in radians, RA wrapped to `[0, 2pi)`.
pub fn xyz_to_radec(xyz: [f64; 3]) -> (f64, f64) {
    let mut ra = libm::atan2(xyz[1], xyz[0]);
    if ra < 0.0 {
        ra += TAU;
    }
    let dec = libm::asin(xyz[2].clamp(-1.0, 1.0));
    (ra, dec)
}

/// Project the unit vector `s` onto the tangent plane touching the sphere at
/// the unit vector `r`, returning intermediate world coordinates in radians.
///
/// The plane basis matches the astrometry.net deprojection (east-negated x),
/// so this is the exact inverse of [`tangent_to_xyz`]. Returns `None` when
/// `s` lies on or behind the plane through the origin.
pub fn tangent_plane_coords(s: [f64; 3], r: [f64; 3]) -> Option<(f64, f64)> {
    let sr = dot(s, r);
    if sr <= 0.0 {
        return None;
    }

    let (i, j) = plane_basis(r);
    let x = -dot(s, i) / sr;
    let y = dot(s, j) / sr;
    Some((x, y))
}

/// Deproject intermediate world coordinates (radians) from the tangent plane
/// at `r` back to a unit vector.
///
/// Follows the astrometry.net `tan_iwc2xyzarr` algorithm.
pub fn tangent_to_xyz(x: f64, y: f64, r: [f64; 3]) -> [f64; 3] {
    let x = -x;
    let (i, j) = plane_basis(r);

    let px = i[0] * x + j[0] * y + r[0];
    let py = i[1] * x + j[1] * y + r[1];
    let pz = j[2] * y + r[2];
    let norm = libm::sqrt(px * px + py * py + pz * pz);

    [px / norm, py / norm, pz / norm]
}

/// Angular separation of two unit vectors in radians.
pub fn angular_distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    let cross = [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ];
    let cross_norm = libm::sqrt(cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]);
    libm::atan2(cross_norm, dot(a, b))
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Orthonormal basis `(i, j)` of the tangent plane at `r`; `i` lies in the
/// equatorial plane (or is pinned to `(-1, 0, 0)` at the poles).
fn plane_basis(r: [f64; 3]) -> ([f64; 3], [f64; 3]) {
    let (rx, ry, rz) = (r[0], r[1], r[2]);

    let (ix, iy) = if rz == 1.0 || rz == -1.0 {
        (-1.0, 0.0)
    } else {
        let ix = ry;
        let iy = -rx;
        let norm = libm::hypot(ix, iy);
        (ix / norm, iy / norm)
    };

    let mut j = [iy * rz, -ix * rz, ix * ry - iy * rx];
    let jnorm = libm::sqrt(j[0] * j[0] + j[1] * j[1] + j[2] * j[2]);
    j[0] /= jnorm;
    j[1] /= jnorm;
    j[2] /= jnorm;

    ([ix, iy, 0.0], j)
}
