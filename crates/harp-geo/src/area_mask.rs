//! Plain-text area-mask files: a header line followed by one polygon
//! per non-blank line, `lat,lon,lat,lon,...` with optional whitespace
//! around the commas and an optional trailing comma.

use crate::point::SphericalPoint;
use crate::polygon::{Relationship, SphericalPolygon, SphericalPolygonBuilder};
use harp_core::error::{HarpError, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct AreaMask {
    polygons: Vec<SphericalPolygon>,
}

impl AreaMask {
    pub fn new() -> AreaMask {
        AreaMask::default()
    }

    pub fn polygons(&self) -> &[SphericalPolygon] {
        &self.polygons
    }

    pub fn add_polygon(&mut self, polygon: SphericalPolygon) {
        self.polygons.push(polygon);
    }

    pub fn covers_point(&self, point: SphericalPoint) -> bool {
        self.polygons.iter().any(|p| p.contains_point(point))
    }

    pub fn covers_area(&self, area: &SphericalPolygon) -> bool {
        self.polygons
            .iter()
            .any(|p| p.relationship(area) == Relationship::AContainsB)
    }

    pub fn inside_area(&self, area: &SphericalPolygon) -> bool {
        self.polygons
            .iter()
            .any(|p| p.relationship(area) == Relationship::AContainedInB)
    }

    pub fn intersects_area(&self, area: &SphericalPolygon) -> bool {
        self.polygons.iter().any(|p| p.overlapping(area))
    }

    pub fn intersects_area_with_fraction(&self, area: &SphericalPolygon, min_fraction: f64) -> bool {
        self.polygons
            .iter()
            .any(|p| p.overlapping(area) && p.overlapping_fraction(area) >= min_fraction)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<AreaMask> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| HarpError::FileOpen {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        parse_reader(file).map_err(|e| match e {
            HarpError::InvalidFormat(message) => HarpError::InvalidFormat(format!(
                "{message} (while reading area mask file '{}')",
                path.display()
            )),
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<AreaMask> {
        parse_reader(text.as_bytes())
    }
}

fn parse_reader(reader: impl Read) -> Result<AreaMask> {
    let reader = BufReader::new(reader);
    let mut mask = AreaMask::new();
    let mut header_seen = false;

    for (i, line) in reader.lines().enumerate() {
        let line_number = i + 1;
        let line = line.map_err(|e| HarpError::FileRead {
            path: String::new(),
            message: e.to_string(),
        })?;

        if is_blank_line(&line) {
            continue;
        }
        if !header_seen {
            header_seen = true;
            continue;
        }

        let polygon = parse_polygon_line(&line)
            .map_err(|message| HarpError::invalid_format(format!("{message} (line {line_number})")))?;
        mask.add_polygon(polygon);
    }

    Ok(mask)
}

fn is_blank_line(line: &str) -> bool {
    line.chars().all(|c| c.is_whitespace())
}

/// Parses one `lat,lon,lat,lon,...` line into a polygon. A trailing
/// comma is tolerated; the closing vertex is stripped if it duplicates
/// the first.
fn parse_polygon_line(line: &str) -> std::result::Result<SphericalPolygon, String> {
    let tokens: Vec<&str> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();

    if tokens.len() % 2 != 0 {
        return Err(format!(
            "area mask line has an odd number of coordinate values ({})",
            tokens.len()
        ));
    }

    let mut points = Vec::with_capacity(tokens.len() / 2);
    for pair in tokens.chunks(2) {
        let lat: f64 = pair[0]
            .parse()
            .map_err(|_| format!("invalid latitude '{}'", pair[0]))?;
        let lon: f64 = pair[1]
            .parse()
            .map_err(|_| format!("invalid longitude '{}'", pair[1]))?;
        if !lat.is_finite() || !lon.is_finite() {
            return Err(format!("non-finite coordinate ({lat}, {lon})"));
        }
        points.push(SphericalPoint::from_degrees(lat, lon));
    }

    SphericalPolygonBuilder::new(points)
        .build()
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_one_polygon() {
        let text = "lat,lon\n0,0,0,10,10,10,10,0\n";
        let mask = AreaMask::parse(text).unwrap();
        assert_eq!(mask.polygons().len(), 1);
        assert!(mask.covers_point(SphericalPoint::from_degrees(5.0, 5.0)));
    }

    #[test]
    fn skips_blank_lines_between_polygons() {
        let text = "lat,lon\n\n0,0,0,10,10,10,10,0\n\n20,20,20,30,30,30,30,20\n";
        let mask = AreaMask::parse(text).unwrap();
        assert_eq!(mask.polygons().len(), 2);
    }

    #[test]
    fn tolerates_trailing_comma_and_whitespace() {
        let text = "lat,lon\n 0, 0, 0,10, 10, 10, 10, 0,\n";
        let mask = AreaMask::parse(text).unwrap();
        assert_eq!(mask.polygons().len(), 1);
    }

    #[test]
    fn strips_duplicate_closing_vertex() {
        let text = "lat,lon\n0,0,0,10,10,10,10,0,0,0\n";
        let mask = AreaMask::parse(text).unwrap();
        assert_eq!(mask.polygons()[0].len(), 4);
    }

    #[test]
    fn rejects_malformed_latitude() {
        let text = "lat,lon\nabc,0,0,10,10,10,10,0\n";
        assert!(AreaMask::parse(text).is_err());
    }

    #[test]
    fn covers_area_uses_contains_relationship() {
        let text = "lat,lon\n0,0,0,10,10,10,10,0\n";
        let mask = AreaMask::parse(text).unwrap();
        let small = SphericalPolygonBuilder::new(vec![
            SphericalPoint::from_degrees(2.0, 2.0),
            SphericalPoint::from_degrees(2.0, 4.0),
            SphericalPoint::from_degrees(4.0, 4.0),
            SphericalPoint::from_degrees(4.0, 2.0),
        ])
        .build()
        .unwrap();
        assert!(mask.covers_area(&small));
    }
}
