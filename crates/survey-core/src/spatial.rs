//! Spherical-Earth geometry primitives shared by every planning stage.
//!
//! All functions are pure. Distances are meters, bearings are compass
//! degrees (0 = north, increasing clockwise) unless noted.

use crate::models::{Coordinate, SurveyPolygon};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters (Haversine).
///
/// Symmetric: `haversine_distance(a, b) == haversine_distance(b, a)`.
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial great-circle bearing from `a` to `b` in degrees `[0, 360)`.
///
/// Coincident points return 0 by convention.
pub fn initial_bearing_deg(a: &Coordinate, b: &Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_lambda = (b.lon - a.lon).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    if x == 0.0 && y == 0.0 {
        return 0.0;
    }
    normalize_bearing_deg(x.atan2(y).to_degrees())
}

/// Normalize a bearing into `[0, 360)`.
pub fn normalize_bearing_deg(bearing_deg: f64) -> f64 {
    bearing_deg.rem_euclid(360.0)
}

/// Minimum angular difference between two bearings, degrees in `[0, 180]`.
pub fn bearing_delta_deg(b1_deg: f64, b2_deg: f64) -> f64 {
    let diff = (normalize_bearing_deg(b2_deg) - normalize_bearing_deg(b1_deg)).abs();
    diff.min(360.0 - diff)
}

/// Forward great-circle projection: the point `distance_m` meters from
/// `origin` along `bearing_deg`. Altitude is carried through unchanged.
pub fn destination(origin: &Coordinate, distance_m: f64, bearing_deg: f64) -> Coordinate {
    if distance_m.abs() <= f64::EPSILON {
        return *origin;
    }

    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();
    let bearing_rad = bearing_deg.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    Coordinate::new(lat2.to_degrees(), lon2.to_degrees(), origin.altitude_m)
}

/// Project a coordinate onto the local tangent plane at `origin`.
///
/// Returns `(x, y)` meters with x east and y north. Valid for the
/// mission-scale distances this engine works at (tens of km), where the
/// flat-plane approximation holds.
pub fn to_local_xy(coord: &Coordinate, origin: &Coordinate) -> (f64, f64) {
    let d = haversine_distance(origin, coord);
    if d <= f64::EPSILON {
        return (0.0, 0.0);
    }
    let theta = initial_bearing_deg(origin, coord).to_radians();
    (d * theta.sin(), d * theta.cos())
}

/// Inverse of [`to_local_xy`]: geographic coordinate for a local `(x, y)`
/// offset from `origin`, at the given altitude.
pub fn from_local_xy(x: f64, y: f64, origin: &Coordinate, altitude_m: f64) -> Coordinate {
    let d = (x * x + y * y).sqrt();
    if d <= f64::EPSILON {
        return origin.at_altitude(altitude_m);
    }
    let bearing_deg = normalize_bearing_deg(x.atan2(y).to_degrees());
    destination(origin, d, bearing_deg).at_altitude(altitude_m)
}

/// Planar polygon area in square meters (shoelace over the local
/// projection at the vertex centroid).
///
/// Not area-accurate near the poles or for very large polygons; fine for
/// survey-mission scale. Fewer than 3 vertices yields 0.
pub fn polygon_area_m2(polygon: &SurveyPolygon) -> f64 {
    let vertices = &polygon.vertices;
    if vertices.len() < 3 {
        return 0.0;
    }

    let origin = polygon_centroid(polygon);
    let local: Vec<(f64, f64)> = vertices.iter().map(|v| to_local_xy(v, &origin)).collect();

    let mut twice_area = 0.0;
    for i in 0..local.len() {
        let (x1, y1) = local[i];
        let (x2, y2) = local[(i + 1) % local.len()];
        twice_area += x1 * y2 - x2 * y1;
    }
    (twice_area / 2.0).abs()
}

/// Planar centroid of the polygon's vertices.
///
/// Used only as a local-projection origin, not a true spherical centroid.
/// Fewer than 3 vertices yields the first vertex, or (0, 0) when empty.
pub fn polygon_centroid(polygon: &SurveyPolygon) -> Coordinate {
    let vertices = &polygon.vertices;
    if vertices.is_empty() {
        return Coordinate::new(0.0, 0.0, 0.0);
    }
    if vertices.len() < 3 {
        return vertices[0];
    }

    let n = vertices.len() as f64;
    let lat = vertices.iter().map(|v| v.lat).sum::<f64>() / n;
    let lon = vertices.iter().map(|v| v.lon).sum::<f64>() / n;
    Coordinate::new(lat, lon, 0.0)
}
