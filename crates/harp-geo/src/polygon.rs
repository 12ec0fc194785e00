//! Spherical polygons: construction, containment, relationship and
//! overlap-fraction predicates.

use crate::point::{cross, dot, normalize, SphericalPoint};
use harp_core::error::{HarpError, Result};
use std::f64::consts::PI;

const EPS: f64 = 1e-9;

/// Ordered sequence of ≥3 canonical spherical points forming a simple
/// loop on the unit sphere; implicitly closed. Only reachable through
/// `SphericalPolygonBuilder::build`, so every live value has already
/// been validated: no self-intersecting edges, no degenerate runs of
/// collinear points.
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalPolygon {
    points: Vec<SphericalPoint>,
}

impl SphericalPolygon {
    pub fn points(&self) -> &[SphericalPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        false // a validated polygon always has >= 3 points
    }

    fn cartesian(&self) -> Vec<[f64; 3]> {
        self.points.iter().map(|p| p.to_cartesian()).collect()
    }

    /// Closed-polygon, winding-parity point-in-polygon test. A point
    /// exactly on an edge counts as inside.
    pub fn contains_point(&self, point: SphericalPoint) -> bool {
        let p = point.to_cartesian();
        let verts = self.cartesian();
        let n = verts.len();

        for i in 0..n {
            let a = verts[i];
            let b = verts[(i + 1) % n];
            if distance_to_arc(p, a, b) < EPS {
                return true;
            }
        }

        let (east, north) = local_basis(p);
        let bearings: Vec<f64> = verts
            .iter()
            .map(|&v| bearing_from(p, east, north, v))
            .collect();

        let mut total = 0.0;
        for i in 0..n {
            let mut d = bearings[(i + 1) % n] - bearings[i];
            while d > PI {
                d -= 2.0 * PI;
            }
            while d <= -PI {
                d += 2.0 * PI;
            }
            total += d;
        }
        total.abs() > PI
    }

    /// Point containment is independent of the polygon's starting vertex.
    pub fn rotated(&self, k: usize) -> SphericalPolygon {
        let n = self.points.len();
        let k = k % n;
        let mut points = self.points[k..].to_vec();
        points.extend_from_slice(&self.points[..k]);
        SphericalPolygon { points }
    }

    /// Spherical surface area via fan-triangulated L'Huilier's theorem
    /// (Gauss-Bonnet for the whole polygon is equivalent for a simple
    /// polygon; fan triangulation from vertex 0 is exact for convex
    /// polygons and a documented approximation for concave ones).
    pub fn area(&self) -> f64 {
        let v = &self.points;
        let mut total = 0.0;
        for i in 1..v.len() - 1 {
            total += spherical_triangle_area(v[0], v[i], v[i + 1]);
        }
        total
    }

    /// Relationship between two polygons.
    pub fn relationship(&self, other: &SphericalPolygon) -> Relationship {
        let (center_a, radius_a) = bounding_cap(self);
        let (center_b, radius_b) = bounding_cap(other);
        if center_a.central_angle(center_b) > radius_a + radius_b {
            return Relationship::Disjoint;
        }

        if edges_cross(self, other) {
            return Relationship::Overlap;
        }

        let b_in_a = other.points.iter().all(|&p| self.contains_point(p));
        let a_in_b = self.points.iter().all(|&p| other.contains_point(p));

        match (a_in_b, b_in_a) {
            (true, true) => Relationship::Equal,
            (true, false) => Relationship::AContainedInB,
            (false, true) => Relationship::AContainsB,
            (false, false) => Relationship::Disjoint,
        }
    }

    /// `overlapping(A, B)` — true iff `relationship` is anything but disjoint.
    pub fn overlapping(&self, other: &SphericalPolygon) -> bool {
        !matches!(self.relationship(other), Relationship::Disjoint)
    }

    /// `|A ∩ B| / |A|` on the sphere. The intersection is built by
    /// great-circle Sutherland-Hodgman clipping of `self` against each
    /// edge half-space of `other`; exact for a convex `other`, a
    /// best-effort approximation otherwise.
    pub fn overlapping_fraction(&self, other: &SphericalPolygon) -> f64 {
        let self_area = self.area();
        if self_area <= 0.0 {
            return 0.0;
        }
        let clipped = clip_polygon_against_polygon(self, other);
        if clipped.len() < 3 {
            return 0.0;
        }
        let points: Vec<SphericalPoint> = clipped.into_iter().map(SphericalPoint::from_cartesian).collect();
        let intersection = SphericalPolygon { points };
        (intersection.area() / self_area).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Disjoint,
    AContainsB,
    AContainedInB,
    Equal,
    Overlap,
}

impl Relationship {
    /// `relationship(A, B)` reversed equals `relationship(B, A)` under
    /// the mapping contains <-> contained.
    pub fn reversed(self) -> Relationship {
        match self {
            Relationship::AContainsB => Relationship::AContainedInB,
            Relationship::AContainedInB => Relationship::AContainsB,
            other => other,
        }
    }
}

/// Builder that validates raw points into a `SphericalPolygon`.
pub struct SphericalPolygonBuilder {
    points: Vec<SphericalPoint>,
}

impl SphericalPolygonBuilder {
    pub fn new(points: Vec<SphericalPoint>) -> SphericalPolygonBuilder {
        SphericalPolygonBuilder { points }
    }

    pub fn build(mut self) -> Result<SphericalPolygon> {
        for p in &self.points {
            p.check()?;
        }

        // Discard the last point if it duplicates the first.
        if self.points.len() > 1 {
            let first = self.points[0];
            let last = *self.points.last().unwrap();
            if first.approx_eq(last, EPS) {
                self.points.pop();
            }
        }

        if self.points.len() < 3 {
            return Err(HarpError::invalid_format(
                "a spherical polygon needs at least 3 distinct points",
            ));
        }

        let n = self.points.len();
        for i in 0..n {
            let a = self.points[i].to_cartesian();
            let b = self.points[(i + 1) % n].to_cartesian();
            let c = self.points[(i + 2) % n].to_cartesian();
            let normal_ab = cross(a, b);
            if normalize(normal_ab).is_none() {
                return Err(HarpError::invalid_format(
                    "a spherical polygon cannot have two coincident consecutive vertices",
                ));
            }
            if dot(normal_ab, c).abs() < EPS && dot(cross(b, c), a).abs() < EPS {
                return Err(HarpError::invalid_format(
                    "a spherical polygon cannot have three consecutive collinear points",
                ));
            }
        }

        let polygon = SphericalPolygon { points: self.points };
        if self_intersects(&polygon) {
            return Err(HarpError::invalid_format(
                "a spherical polygon's edges must not self-intersect",
            ));
        }
        Ok(polygon)
    }
}

fn local_basis(p: [f64; 3]) -> ([f64; 3], [f64; 3]) {
    let north_pole = [0.0, 0.0, 1.0];
    let mut east = cross(north_pole, p);
    if normalize(east).is_none() {
        east = cross([1.0, 0.0, 0.0], p);
    }
    let east = normalize(east).unwrap_or([1.0, 0.0, 0.0]);
    let north = cross(p, east);
    (east, north)
}

fn bearing_from(p: [f64; 3], east: [f64; 3], north: [f64; 3], v: [f64; 3]) -> f64 {
    let d = dot(p, v);
    let tangent = [v[0] - p[0] * d, v[1] - p[1] * d, v[2] - p[2] * d];
    match normalize(tangent) {
        Some(t) => dot(t, east).atan2(dot(t, north)),
        None => 0.0, // v coincides with p; contributes no turning
    }
}

fn spherical_triangle_area(a: SphericalPoint, b: SphericalPoint, c: SphericalPoint) -> f64 {
    let side_a = b.central_angle(c);
    let side_b = a.central_angle(c);
    let side_c = a.central_angle(b);
    let s = (side_a + side_b + side_c) / 2.0;
    let product = ((s / 2.0).tan() * ((s - side_a) / 2.0).tan() * ((s - side_b) / 2.0).tan()
        * ((s - side_c) / 2.0).tan())
    .max(0.0);
    4.0 * product.sqrt().atan()
}

/// Angular distance from `p` to the nearest point on the minor arc `a`-`b`.
fn distance_to_arc(p: [f64; 3], a: [f64; 3], b: [f64; 3]) -> f64 {
    let normal = cross(a, b);
    match normalize(normal) {
        None => {
            // degenerate (a == b or antipodal): distance to the point.
            return dot(p, a).clamp(-1.0, 1.0).acos();
        }
        Some(n) => {
            let to_plane = dot(p, n).clamp(-1.0, 1.0).asin().abs();
            // project p onto the great circle through a,b, then check it's
            // between a and b (otherwise nearest point is an endpoint).
            let proj = {
                let d = dot(p, n);
                let v = [p[0] - n[0] * d, p[1] - n[1] * d, p[2] - n[2] * d];
                normalize(v)
            };
            let ab = a_to_b_angle(a, b);
            if let Some(proj) = proj {
                let angle_a = dot(a, proj).clamp(-1.0, 1.0).acos();
                let angle_b = dot(b, proj).clamp(-1.0, 1.0).acos();
                if (angle_a + angle_b - ab).abs() < 1e-6 {
                    return to_plane;
                }
            }
            let dist_a = dot(p, a).clamp(-1.0, 1.0).acos();
            let dist_b = dot(p, b).clamp(-1.0, 1.0).acos();
            dist_a.min(dist_b)
        }
    }
}

fn a_to_b_angle(a: [f64; 3], b: [f64; 3]) -> f64 {
    dot(a, b).clamp(-1.0, 1.0).acos()
}

fn bounding_cap(polygon: &SphericalPolygon) -> (SphericalPoint, f64) {
    let verts = polygon.cartesian();
    let mut sum = [0.0, 0.0, 0.0];
    for v in &verts {
        sum[0] += v[0];
        sum[1] += v[1];
        sum[2] += v[2];
    }
    let center = normalize(sum).unwrap_or(verts[0]);
    let center_point = SphericalPoint::from_cartesian(center);
    let radius = polygon
        .points
        .iter()
        .map(|&p| center_point.central_angle(p))
        .fold(0.0, f64::max);
    (center_point, radius)
}

/// Whether any two non-adjacent edges of `a` and `b` cross. Valid for
/// arcs shorter than a hemisphere, which covers all realistic inputs.
fn edges_cross(a: &SphericalPolygon, b: &SphericalPolygon) -> bool {
    let av = a.cartesian();
    let bv = b.cartesian();
    for i in 0..av.len() {
        let p1 = av[i];
        let p2 = av[(i + 1) % av.len()];
        for j in 0..bv.len() {
            let p3 = bv[j];
            let p4 = bv[(j + 1) % bv.len()];
            if arcs_cross(p1, p2, p3, p4) {
                return true;
            }
        }
    }
    false
}

fn self_intersects(polygon: &SphericalPolygon) -> bool {
    let v = polygon.cartesian();
    let n = v.len();
    for i in 0..n {
        let p1 = v[i];
        let p2 = v[(i + 1) % n];
        for j in (i + 1)..n {
            if j == i || (j + 1) % n == i || j == (i + 1) % n {
                continue;
            }
            let p3 = v[j];
            let p4 = v[(j + 1) % n];
            if arcs_cross(p1, p2, p3, p4) {
                return true;
            }
        }
    }
    false
}

fn arcs_cross(p1: [f64; 3], p2: [f64; 3], p3: [f64; 3], p4: [f64; 3]) -> bool {
    let n1 = cross(p1, p2);
    let n2 = cross(p3, p4);
    if normalize(n1).is_none() || normalize(n2).is_none() {
        return false;
    }
    let d1a = dot(n1, p3);
    let d1b = dot(n1, p4);
    let d2a = dot(n2, p1);
    let d2b = dot(n2, p2);
    d1a.signum() != d1b.signum() && d2a.signum() != d2b.signum()
}

/// Sutherland-Hodgman clip of `subject` against one great-circle
/// half-space (the side of the plane through `a`,`b` where
/// `dot(p, cross(a,b)) >= 0`, i.e. the interior side for a
/// counter-clockwise-ordered clip polygon).
fn clip_against_edge(subject: &[[f64; 3]], a: [f64; 3], b: [f64; 3]) -> Vec<[f64; 3]> {
    let normal = match normalize(cross(a, b)) {
        Some(n) => n,
        None => return subject.to_vec(),
    };
    let n = subject.len();
    if n == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(n + 1);
    for i in 0..n {
        let cur = subject[i];
        let prev = subject[(i + n - 1) % n];
        let cur_in = dot(cur, normal) >= -EPS;
        let prev_in = dot(prev, normal) >= -EPS;
        if cur_in {
            if !prev_in {
                if let Some(ix) = intersect_with_plane(prev, cur, normal) {
                    out.push(ix);
                }
            }
            out.push(cur);
        } else if prev_in {
            if let Some(ix) = intersect_with_plane(prev, cur, normal) {
                out.push(ix);
            }
        }
    }
    out
}

fn intersect_with_plane(p1: [f64; 3], p2: [f64; 3], normal: [f64; 3]) -> Option<[f64; 3]> {
    let d1 = dot(p1, normal);
    let d2 = dot(p2, normal);
    if (d1 - d2).abs() < 1e-15 {
        return None;
    }
    let t = d1 / (d1 - d2);
    let v = [
        p1[0] + t * (p2[0] - p1[0]),
        p1[1] + t * (p2[1] - p1[1]),
        p1[2] + t * (p2[2] - p1[2]),
    ];
    normalize(v)
}

fn clip_polygon_against_polygon(subject: &SphericalPolygon, clip: &SphericalPolygon) -> Vec<[f64; 3]> {
    let mut poly = subject.cartesian();
    let clip_pts = clip.cartesian();
    let m = clip_pts.len();
    for i in 0..m {
        if poly.is_empty() {
            break;
        }
        poly = clip_against_edge(&poly, clip_pts[i], clip_pts[(i + 1) % m]);
    }
    poly
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(lat0: f64, lon0: f64, lat1: f64, lon1: f64) -> SphericalPolygon {
        SphericalPolygonBuilder::new(vec![
            SphericalPoint::from_degrees(lat0, lon0),
            SphericalPoint::from_degrees(lat1, lon0),
            SphericalPoint::from_degrees(lat1, lon1),
            SphericalPoint::from_degrees(lat0, lon1),
        ])
        .build()
        .unwrap()
    }

    #[test]
    fn builder_strips_duplicate_closing_vertex() {
        let pts = vec![
            SphericalPoint::from_degrees(0.0, 0.0),
            SphericalPoint::from_degrees(0.0, 10.0),
            SphericalPoint::from_degrees(10.0, 10.0),
            SphericalPoint::from_degrees(10.0, 0.0),
            SphericalPoint::from_degrees(0.0, 0.0),
        ];
        let polygon = SphericalPolygonBuilder::new(pts).build().unwrap();
        assert_eq!(polygon.len(), 4);
    }

    #[test]
    fn builder_rejects_fewer_than_three_points() {
        let pts = vec![
            SphericalPoint::from_degrees(0.0, 0.0),
            SphericalPoint::from_degrees(0.0, 10.0),
        ];
        assert!(SphericalPolygonBuilder::new(pts).build().is_err());
    }

    #[test]
    fn contains_point_scenario_3() {
        let mask = square(0.0, 0.0, 10.0, 10.0);
        assert!(mask.contains_point(SphericalPoint::from_degrees(5.0, 5.0)));
        assert!(!mask.contains_point(SphericalPoint::from_degrees(20.0, 20.0)));
    }

    #[test]
    fn contains_point_is_rotation_invariant() {
        let polygon = square(0.0, 0.0, 10.0, 10.0);
        let point = SphericalPoint::from_degrees(5.0, 5.0);
        for k in 0..polygon.len() {
            assert_eq!(polygon.rotated(k).contains_point(point), true);
        }
    }

    #[test]
    fn relationship_is_reversible() {
        let a = square(0.0, 0.0, 10.0, 10.0);
        let b = square(2.0, 2.0, 4.0, 4.0);
        assert_eq!(a.relationship(&b), Relationship::AContainsB);
        assert_eq!(b.relationship(&a), Relationship::AContainedInB);
        assert_eq!(a.relationship(&b).reversed(), b.relationship(&a));
    }

    #[test]
    fn disjoint_polygons() {
        let a = square(0.0, 0.0, 10.0, 10.0);
        let b = square(50.0, 50.0, 60.0, 60.0);
        assert_eq!(a.relationship(&b), Relationship::Disjoint);
        assert!(!a.overlapping(&b));
    }

    #[test]
    fn overlap_fraction_quarter_scenario_4() {
        let mask = square(0.0, 0.0, 10.0, 10.0);
        let sample = square(5.0, 5.0, 15.0, 15.0);
        let fraction = mask.overlapping_fraction(&sample);
        assert!((fraction - 0.25).abs() < 0.02, "fraction was {fraction}");
    }

    #[test]
    fn overlap_fraction_is_within_unit_interval() {
        let a = square(0.0, 0.0, 10.0, 10.0);
        let b = square(5.0, 5.0, 15.0, 15.0);
        let f = a.overlapping_fraction(&b);
        assert!((0.0..=1.0).contains(&f));
    }
}
