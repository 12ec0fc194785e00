//! Points on the unit sphere.

use harp_core::error::{HarpError, Result};
use std::f64::consts::{FRAC_PI_2, PI};

/// `(lat, lon)` in radians. Canonical form: `lat ∈ [-π/2, π/2]`,
/// `lon ∈ [-π, π]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalPoint {
    pub lat: f64,
    pub lon: f64,
}

impl SphericalPoint {
    pub fn new(lat: f64, lon: f64) -> SphericalPoint {
        SphericalPoint { lat, lon }
    }

    pub fn from_degrees(lat_deg: f64, lon_deg: f64) -> SphericalPoint {
        SphericalPoint {
            lat: lat_deg.to_radians(),
            lon: lon_deg.to_radians(),
        }
    }

    pub fn to_degrees(self) -> (f64, f64) {
        (self.lat.to_degrees(), self.lon.to_degrees())
    }

    /// Rejects values outside the canonical ranges or non-finite.
    pub fn check(&self) -> Result<()> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(HarpError::invalid_argument(
                "spherical point has a non-finite coordinate",
            ));
        }
        if !(-FRAC_PI_2..=FRAC_PI_2).contains(&self.lat) {
            return Err(HarpError::invalid_argument(format!(
                "latitude {} rad is outside the canonical range [-pi/2, pi/2]",
                self.lat
            )));
        }
        if !(-PI..=PI).contains(&self.lon) {
            return Err(HarpError::invalid_argument(format!(
                "longitude {} rad is outside the canonical range [-pi, pi]",
                self.lon
            )));
        }
        Ok(())
    }

    /// Unit vector in 3-D Cartesian coordinates (x toward lon=0, z toward the north pole).
    pub fn to_cartesian(self) -> [f64; 3] {
        let (sin_lat, cos_lat) = self.lat.sin_cos();
        let (sin_lon, cos_lon) = self.lon.sin_cos();
        [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat]
    }

    pub fn from_cartesian(v: [f64; 3]) -> SphericalPoint {
        let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        let v = if norm > 0.0 {
            [v[0] / norm, v[1] / norm, v[2] / norm]
        } else {
            v
        };
        let lat = v[2].clamp(-1.0, 1.0).asin();
        let lon = v[1].atan2(v[0]);
        SphericalPoint { lat, lon }
    }

    /// Central angle (great-circle distance in radians) to another point.
    pub fn central_angle(self, other: SphericalPoint) -> f64 {
        let a = self.to_cartesian();
        let b = other.to_cartesian();
        let dot = (dot(a, b)).clamp(-1.0, 1.0);
        dot.acos()
    }

    pub fn approx_eq(self, other: SphericalPoint, epsilon: f64) -> bool {
        self.central_angle(other) < epsilon
    }
}

pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

pub fn normalize(a: [f64; 3]) -> Option<[f64; 3]> {
    let n = norm(a);
    if n < 1e-15 {
        None
    } else {
        Some([a[0] / n, a[1] / n, a[2] / n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees_round_trip() {
        let p = SphericalPoint::from_degrees(12.5, -45.0);
        let (lat, lon) = p.to_degrees();
        assert!((lat - 12.5).abs() < 1e-9);
        assert!((lon + 45.0).abs() < 1e-9);
    }

    #[test]
    fn check_rejects_out_of_range_latitude() {
        let p = SphericalPoint::new(2.0, 0.0);
        assert!(p.check().is_err());
    }

    #[test]
    fn check_rejects_non_finite() {
        let p = SphericalPoint::new(f64::NAN, 0.0);
        assert!(p.check().is_err());
    }

    #[test]
    fn central_angle_antipodal_is_pi() {
        let a = SphericalPoint::from_degrees(0.0, 0.0);
        let b = SphericalPoint::from_degrees(0.0, 180.0);
        assert!((a.central_angle(b) - PI).abs() < 1e-9);
    }
}
