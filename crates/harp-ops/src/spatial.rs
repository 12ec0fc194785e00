//! `point_distance`/`point_in_area`/`area_*` row filters: each builds a
//! spherical point or polygon per row from fixed product variables
//! (`latitude`/`longitude`, or `latitude_bounds`/`longitude_bounds`)
//! and tests it against a literal argument.

use harp_core::dimension::DimensionKind;
use harp_core::error::{HarpError, Result};
use harp_core::product::Product;
use harp_geo::{AreaMask, SphericalPoint, SphericalPolygonBuilder};

pub fn point_distance(product: &mut Product, reference: &str, max_distance_km: f64) -> Result<()> {
    let (ref_lat, ref_lon) = parse_lat_lon(reference)?;
    let reference = SphericalPoint::from_degrees(ref_lat, ref_lon);
    const EARTH_RADIUS_KM: f64 = 6371.0;

    filter_time_rows(product, |row| {
        let point = row_point(product, row)?;
        let distance_km = point.central_angle(reference) * EARTH_RADIUS_KM;
        Ok(distance_km <= max_distance_km)
    })
}

pub fn point_in_area(product: &mut Product, area_mask_path: &str) -> Result<()> {
    let mask = AreaMask::read(area_mask_path)
        .map_err(|e| HarpError::operation(format!("point_in_area: {e}")))?;
    filter_time_rows(product, |row| Ok(mask.covers_point(row_point(product, row)?)))
}

pub fn area_covers_point(product: &mut Product, area_mask_path: &str) -> Result<()> {
    point_in_area(product, area_mask_path)
}

pub fn area_covers_area(product: &mut Product, area_mask_path: &str) -> Result<()> {
    area_relationship_filter(product, area_mask_path, |mask, polygon| mask.covers_area(&polygon))
}

pub fn area_inside_area(product: &mut Product, area_mask_path: &str) -> Result<()> {
    area_relationship_filter(product, area_mask_path, |mask, polygon| mask.inside_area(&polygon))
}

pub fn area_intersects_area(product: &mut Product, area_mask_path: &str) -> Result<()> {
    area_relationship_filter(product, area_mask_path, |mask, polygon| mask.intersects_area(&polygon))
}

pub fn area_mask_covers_area(product: &mut Product, area_mask_path: &str, min_fraction: f64) -> Result<()> {
    area_relationship_filter(product, area_mask_path, |mask, polygon| {
        mask.intersects_area_with_fraction(&polygon, min_fraction)
    })
}

fn area_relationship_filter(
    product: &mut Product,
    area_mask_path: &str,
    test: impl Fn(&AreaMask, harp_geo::SphericalPolygon) -> bool,
) -> Result<()> {
    let mask = AreaMask::read(area_mask_path)
        .map_err(|e| HarpError::operation(format!("area predicate: {e}")))?;
    filter_time_rows_lenient(product, |row| Ok(test(&mask, row_polygon(product, row)?)))
}

fn parse_lat_lon(reference: &str) -> Result<(f64, f64)> {
    let (lat, lon) = reference
        .split_once(',')
        .ok_or_else(|| HarpError::invalid_argument("point_distance reference must be 'lat,lon'"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| HarpError::invalid_argument("point_distance reference latitude is not a number"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| HarpError::invalid_argument("point_distance reference longitude is not a number"))?;
    Ok((lat, lon))
}

fn row_point(product: &Product, row: usize) -> Result<SphericalPoint> {
    let lat = product.get("latitude").ok_or_else(|| HarpError::variable_not_found("latitude"))?;
    let lon = product.get("longitude").ok_or_else(|| HarpError::variable_not_found("longitude"))?;
    let lat = lat.data().get(row).expect("row in range").as_f64()?;
    let lon = lon.data().get(row).expect("row in range").as_f64()?;
    Ok(SphericalPoint::from_degrees(lat, lon))
}

fn row_polygon(product: &Product, row: usize) -> Result<harp_geo::SphericalPolygon> {
    let lat_bounds = product
        .get("latitude_bounds")
        .ok_or_else(|| HarpError::variable_not_found("latitude_bounds"))?;
    let lon_bounds = product
        .get("longitude_bounds")
        .ok_or_else(|| HarpError::variable_not_found("longitude_bounds"))?;

    let (start, inner) = if lat_bounds.rank() == 2 {
        let inner = lat_bounds.dimension_lengths()[1];
        (row * inner, inner)
    } else {
        (0, lat_bounds.dimension_lengths()[0])
    };

    let mut points = Vec::with_capacity(inner);
    for i in 0..inner {
        let lat = lat_bounds.data().get(start + i).expect("index in range").as_f64()?;
        let lon = lon_bounds.data().get(start + i).expect("index in range").as_f64()?;
        points.push(SphericalPoint::from_degrees(lat, lon));
    }

    SphericalPolygonBuilder::new(points)
        .build()
        .map_err(|e| HarpError::operation(format!("row polygon: {e}")))
}

fn filter_time_rows(product: &mut Product, predicate: impl Fn(usize) -> Result<bool>) -> Result<()> {
    let time_len = product.dimension_length(DimensionKind::Time)?;
    let mut indices = Vec::with_capacity(time_len);
    for row in 0..time_len {
        if predicate(row)? {
            indices.push(row);
        }
    }
    product.filter_rows(DimensionKind::Time, &indices)
}

/// Like [`filter_time_rows`], but a per-row geometry failure drops that
/// row instead of aborting the operation: the area-relationship
/// predicates' documented exception to abort-on-error.
fn filter_time_rows_lenient(product: &mut Product, predicate: impl Fn(usize) -> Result<bool>) -> Result<()> {
    let time_len = product.dimension_length(DimensionKind::Time)?;
    let mut indices = Vec::with_capacity(time_len);
    for row in 0..time_len {
        match predicate(row) {
            Ok(true) => indices.push(row),
            Ok(false) | Err(_) => {}
        }
    }
    product.filter_rows(DimensionKind::Time, &indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use harp_core::array::TypedArray;
    use harp_core::scalar::ElementType;
    use harp_core::variable::Variable;
    use std::io::Write;

    fn product_with_points(lat: &[f64], lon: &[f64]) -> Product {
        let mut p = Product::new();
        let mut lat_v = Variable::new("latitude", ElementType::F64, vec![DimensionKind::Time], vec![lat.len()]).unwrap();
        if let TypedArray::F64(buf) = lat_v.data_mut() {
            *buf = lat.to_vec();
        }
        p.add_variable(lat_v).unwrap();
        let mut lon_v = Variable::new("longitude", ElementType::F64, vec![DimensionKind::Time], vec![lon.len()]).unwrap();
        if let TypedArray::F64(buf) = lon_v.data_mut() {
            *buf = lon.to_vec();
        }
        p.add_variable(lon_v).unwrap();
        p
    }

    #[test]
    fn point_distance_keeps_nearby_rows() {
        let mut p = product_with_points(&[0.0, 0.0, 60.0], &[0.0, 1.0, 0.0]);
        point_distance(&mut p, "0,0", 200.0).unwrap();
        assert_eq!(p.dimension_length(DimensionKind::Time).unwrap(), 2);
    }

    #[test]
    fn point_in_area_uses_mask_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# header").unwrap();
        writeln!(file, "-10,-10,-10,10,10,10,10,-10").unwrap();
        file.flush().unwrap();

        let mut p = product_with_points(&[0.0, 50.0], &[0.0, 50.0]);
        point_in_area(&mut p, file.path().to_str().unwrap()).unwrap();
        assert_eq!(p.dimension_length(DimensionKind::Time).unwrap(), 1);
    }
}
