//! Coverage pattern generation over survey polygons.
//!
//! Converts a survey area into an ordered waypoint list: boustrophedon
//! ("lawnmower") sweeps, perpendicular grid passes, or circular orbits.
//! All geometry runs on a local tangent plane at the polygon centroid.

use crate::models::{Coordinate, HeadingMode, SurveyPolygon, Waypoint, WaypointAction};
use crate::spatial::{
    destination, from_local_xy, initial_bearing_deg, polygon_centroid, to_local_xy,
};

/// Across-track line spacing for a target side overlap, meters.
///
/// Pinhole camera model: the ground footprint width is
/// `sensor_width * altitude / focal_length`, and consecutive lines are
/// spaced so that footprints overlap by `side_overlap_pct`.
pub fn optimal_line_spacing(
    altitude_m: f64,
    side_overlap_pct: f64,
    sensor_width_mm: f64,
    focal_length_mm: f64,
) -> f64 {
    if focal_length_mm <= 0.0 {
        return 0.0;
    }
    let footprint_width_m = sensor_width_mm * altitude_m / focal_length_mm;
    footprint_width_m * (1.0 - side_overlap_pct.clamp(0.0, 100.0) / 100.0)
}

/// Ground sampling distance in cm per pixel for the given camera geometry.
pub fn ground_sample_distance_cm(
    altitude_m: f64,
    sensor_width_mm: f64,
    focal_length_mm: f64,
    image_width_px: u32,
) -> f64 {
    if focal_length_mm <= 0.0 || image_width_px == 0 {
        return 0.0;
    }
    sensor_width_mm * altitude_m * 100.0 / (focal_length_mm * f64::from(image_width_px))
}

/// Generate a boustrophedon sweep over `polygon`.
///
/// Flight lines run along `direction_deg` (compass), spaced `spacing_m`
/// apart, and alternate traversal direction between consecutive lines to
/// minimize end-of-line repositioning. Each waypoint carries a
/// `TakePhoto` action and a sequential index.
///
/// Polygons with fewer than 3 vertices produce an empty route. On
/// degenerate or self-intersecting polygons a scan line can cross an odd
/// number of edges; the trailing unpaired intersection is dropped, which
/// can leave a coverage gap on such inputs (known limitation).
pub fn generate_lawnmower(
    polygon: &SurveyPolygon,
    altitude_m: f64,
    direction_deg: f64,
    spacing_m: f64,
    speed_mps: f64,
) -> Vec<Waypoint> {
    let points = lawnmower_points(polygon, direction_deg, spacing_m);
    emit_waypoints(points, altitude_m, speed_mps)
}

/// Generate two perpendicular lawnmower passes (cross-hatch grid).
///
/// The second pass runs at `direction_deg + 90`; waypoints are
/// renumbered across the union.
pub fn generate_grid(
    polygon: &SurveyPolygon,
    altitude_m: f64,
    direction_deg: f64,
    spacing_m: f64,
    speed_mps: f64,
) -> Vec<Waypoint> {
    let mut points = lawnmower_points(polygon, direction_deg, spacing_m);
    points.extend(lawnmower_points(polygon, direction_deg + 90.0, spacing_m));
    emit_waypoints(points, altitude_m, speed_mps)
}

/// Generate `count` waypoints evenly spaced around `center` at
/// `radius_m`, each facing the center (`PointOfInterest` heading).
pub fn generate_circular(
    center: &Coordinate,
    radius_m: f64,
    count: usize,
    altitude_m: f64,
    speed_mps: f64,
) -> Vec<Waypoint> {
    if count == 0 || radius_m <= 0.0 {
        return Vec::new();
    }

    let mut waypoints = Vec::with_capacity(count);
    for i in 0..count {
        let angle_deg = 360.0 * i as f64 / count as f64;
        let position = destination(center, radius_m, angle_deg).at_altitude(altitude_m);
        let heading = initial_bearing_deg(&position, center);
        waypoints.push(
            Waypoint::new(position, i as i32, speed_mps)
                .with_heading(HeadingMode::PointOfInterest, heading)
                .with_action(WaypointAction::TakePhoto),
        );
    }
    waypoints
}

/// Ordered local-plane points of a lawnmower sweep, geographic output.
fn lawnmower_points(
    polygon: &SurveyPolygon,
    direction_deg: f64,
    spacing_m: f64,
) -> Vec<Coordinate> {
    if polygon.vertices.len() < 3 || spacing_m <= 0.0 {
        return Vec::new();
    }

    let origin = polygon_centroid(polygon);
    let local: Vec<(f64, f64)> = polygon
        .vertices
        .iter()
        .map(|v| to_local_xy(v, &origin))
        .collect();

    // Rotate so flight lines become horizontal scan lines. A flight line
    // along compass bearing D has local direction (sin D, cos D), i.e.
    // math angle 90 - D from the +x axis.
    let alpha = (90.0 - direction_deg).to_radians();
    let rotated: Vec<(f64, f64)> = local.iter().map(|&p| rotate(p, -alpha)).collect();

    let min_y = rotated.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_y = rotated
        .iter()
        .map(|p| p.1)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut points = Vec::new();
    let mut line_index = 0usize;
    let mut y = min_y + spacing_m / 2.0;
    while y <= max_y {
        let mut crossings = scan_line_crossings(&rotated, y);
        crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        // Crossings pair up as enter/exit spans; an odd count means the
        // polygon is degenerate there and the trailing crossing is dropped.
        let mut line_points = Vec::new();
        for pair in crossings.chunks_exact(2) {
            line_points.push((pair[0], y));
            line_points.push((pair[1], y));
        }

        if line_index % 2 == 1 {
            line_points.reverse();
        }
        points.extend(line_points);

        line_index += 1;
        y += spacing_m;
    }

    points
        .into_iter()
        .map(|p| {
            let (x, y) = rotate(p, alpha);
            from_local_xy(x, y, &origin, 0.0)
        })
        .collect()
}

/// X-coordinates where the horizontal line at `y` crosses polygon edges.
fn scan_line_crossings(vertices: &[(f64, f64)], y: f64) -> Vec<f64> {
    let mut crossings = Vec::new();
    for i in 0..vertices.len() {
        let (x1, y1) = vertices[i];
        let (x2, y2) = vertices[(i + 1) % vertices.len()];
        if (y1 > y) != (y2 > y) {
            crossings.push(x1 + (y - y1) * (x2 - x1) / (y2 - y1));
        }
    }
    crossings
}

fn rotate((x, y): (f64, f64), angle_rad: f64) -> (f64, f64) {
    let (sin_a, cos_a) = angle_rad.sin_cos();
    (x * cos_a - y * sin_a, x * sin_a + y * cos_a)
}

fn emit_waypoints(points: Vec<Coordinate>, altitude_m: f64, speed_mps: f64) -> Vec<Waypoint> {
    points
        .into_iter()
        .enumerate()
        .map(|(i, position)| {
            Waypoint::new(position.at_altitude(altitude_m), i as i32, speed_mps)
                .with_action(WaypointAction::TakePhoto)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::haversine_distance;

    fn square_100m() -> (Coordinate, SurveyPolygon) {
        let origin = Coordinate::new(33.0, -117.0, 0.0);
        let v1 = origin;
        let v2 = destination(&origin, 100.0, 90.0);
        let v3 = destination(&v2, 100.0, 0.0);
        let v4 = destination(&origin, 100.0, 0.0);
        (origin, SurveyPolygon::new(vec![v1, v2, v3, v4]))
    }

    #[test]
    fn optimal_spacing_matches_pinhole_model() {
        // 13.2 mm sensor, 8.8 mm lens at 80 m: footprint 120 m; 70% overlap -> 36 m
        let spacing = optimal_line_spacing(80.0, 70.0, 13.2, 8.8);
        assert!((spacing - 36.0).abs() < 1e-9, "got {spacing}");
    }

    #[test]
    fn gsd_for_one_inch_sensor() {
        // Well-known mapping rule of thumb: ~2.2 cm/px at 80 m
        let gsd = ground_sample_distance_cm(80.0, 13.2, 8.8, 5472);
        assert!((gsd - 2.193).abs() < 0.01, "got {gsd}");
    }

    #[test]
    fn square_field_yields_five_alternating_lines() {
        let (_, polygon) = square_100m();
        let waypoints = generate_lawnmower(&polygon, 80.0, 90.0, 20.0, 10.0);

        // Scan lines at 10, 30, 50, 70, 90 m: 5 lines x 2 endpoints
        assert_eq!(waypoints.len(), 10);

        // Consecutive lines alternate traversal direction: the end of one
        // line is close to the start of the next (short repositioning hop).
        for line in 0..4 {
            let end_of_line = &waypoints[line * 2 + 1].coordinate;
            let start_of_next = &waypoints[line * 2 + 2].coordinate;
            let hop = haversine_distance(end_of_line, start_of_next);
            assert!(hop < 30.0, "line {line} repositioning hop was {hop} m");
        }

        // Every waypoint takes a photo and indices are sequential
        for (i, wp) in waypoints.iter().enumerate() {
            assert_eq!(wp.index, i as i32);
            assert_eq!(wp.actions, vec![WaypointAction::TakePhoto]);
            assert!((wp.coordinate.altitude_m - 80.0).abs() < 1e-9);
        }
    }

    #[test]
    fn lawnmower_direction_rotates_lines() {
        let (_, polygon) = square_100m();
        // North-south lines: first two waypoints should be ~100 m apart
        // along a near-0/180 bearing.
        let waypoints = generate_lawnmower(&polygon, 80.0, 0.0, 20.0, 10.0);
        assert!(waypoints.len() >= 2);
        let b = initial_bearing_deg(&waypoints[0].coordinate, &waypoints[1].coordinate);
        let along_meridian = b < 5.0 || (b - 180.0).abs() < 5.0 || b > 355.0;
        assert!(along_meridian, "bearing {b}");
    }

    #[test]
    fn degenerate_polygon_yields_empty_route() {
        let polygon = SurveyPolygon::new(vec![
            Coordinate::new(33.0, -117.0, 0.0),
            Coordinate::new(33.001, -117.0, 0.0),
        ]);
        assert!(generate_lawnmower(&polygon, 80.0, 90.0, 20.0, 10.0).is_empty());
    }

    #[test]
    fn self_intersecting_polygon_does_not_panic() {
        // Bowtie: scan lines can hit an odd number of edges at the pinch
        let origin = Coordinate::new(33.0, -117.0, 0.0);
        let v1 = origin;
        let v2 = destination(&origin, 100.0, 90.0);
        let v3 = destination(&origin, 100.0, 0.0);
        let v4 = destination(&v2, 100.0, 0.0);
        let bowtie = SurveyPolygon::new(vec![v1, v2, v3, v4]);

        let waypoints = generate_lawnmower(&bowtie, 80.0, 90.0, 20.0, 10.0);
        // Pairs only: always an even number of points per line
        assert_eq!(waypoints.len() % 2, 0);
    }

    #[test]
    fn grid_is_union_of_two_passes() {
        let (_, polygon) = square_100m();
        let single = generate_lawnmower(&polygon, 80.0, 90.0, 20.0, 10.0);
        let cross = generate_lawnmower(&polygon, 80.0, 180.0, 20.0, 10.0);
        let grid = generate_grid(&polygon, 80.0, 90.0, 20.0, 10.0);

        assert_eq!(grid.len(), single.len() + cross.len());
        for (i, wp) in grid.iter().enumerate() {
            assert_eq!(wp.index, i as i32);
        }
    }

    #[test]
    fn circular_pattern_faces_center() {
        let center = Coordinate::new(33.0, -117.0, 0.0);
        let waypoints = generate_circular(&center, 50.0, 12, 40.0, 5.0);

        assert_eq!(waypoints.len(), 12);
        for wp in &waypoints {
            let r = haversine_distance(&wp.coordinate, &center);
            assert!((r - 50.0).abs() < 1.0, "radius {r}");
            assert_eq!(wp.heading_mode, HeadingMode::PointOfInterest);
            let toward_center = initial_bearing_deg(&wp.coordinate, &center);
            assert!(crate::spatial::bearing_delta_deg(wp.heading_deg, toward_center) < 1.0);
        }
    }

    #[test]
    fn circular_pattern_handles_zero_count() {
        let center = Coordinate::new(33.0, -117.0, 0.0);
        assert!(generate_circular(&center, 50.0, 0, 40.0, 5.0).is_empty());
        assert!(generate_circular(&center, 0.0, 8, 40.0, 5.0).is_empty());
    }
}
