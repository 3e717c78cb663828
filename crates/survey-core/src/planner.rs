//! End-to-end planning pipeline: pattern generation, route
//! optimization, and battery partitioning wired together.

use crate::coverage::{
    generate_circular, generate_grid, generate_lawnmower, ground_sample_distance_cm,
    optimal_line_spacing,
};
use crate::models::{Coordinate, MissionPlan, MissionRequest, PatternType, Waypoint};
use crate::optimizer::optimize;
use crate::partition::partition_route;
use crate::spatial::{haversine_distance, polygon_area_m2, polygon_centroid};
use chrono::Utc;
use thiserror::Error;

/// Contract violations a caller must handle before planning can run.
///
/// Degraded-but-valid situations (odd scan intersections, clamped
/// speeds, infeasible legs) are reported as warnings on the plan, not
/// as errors.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("survey polygon needs at least 3 vertices, got {0}")]
    PolygonTooSmall(usize),
    #[error("polygon vertex {index} is not a valid coordinate: lat={lat}, lon={lon}")]
    InvalidVertex { index: usize, lat: f64, lon: f64 },
    #[error("battery profile has no usable flight time")]
    NoUsableFlightTime,
    #[error("camera parameters produce a non-positive line spacing")]
    InvalidCameraGeometry,
}

/// Plan a complete survey mission from a request.
///
/// Pure function of its input: generates the coverage pattern, optimizes
/// the waypoint order, and partitions the result across batteries.
pub fn plan_survey_mission(request: &MissionRequest) -> Result<MissionPlan, PlanError> {
    validate(request)?;

    let params = &request.parameters;
    let centroid = polygon_centroid(&request.polygon);
    let launch = request.launch_point.unwrap_or(centroid);

    let spacing_m = optimal_line_spacing(
        params.altitude_m,
        params.side_overlap_pct,
        params.sensor_width_mm,
        params.focal_length_mm,
    );
    if spacing_m <= 0.0 || !spacing_m.is_finite() {
        return Err(PlanError::InvalidCameraGeometry);
    }

    let mut warnings = Vec::new();
    let route = generate_pattern(request, &centroid, spacing_m);
    if route.is_empty() {
        warnings.push("coverage pattern produced no waypoints".to_string());
    }

    let optimization = optimize(&route, &launch, &request.optimization);
    let partition = partition_route(&optimization.waypoints, &launch, &request.battery);
    if partition.infeasible_legs > 0 {
        warnings.push(format!(
            "{} waypoint(s) exceed the battery safety margin and were isolated",
            partition.infeasible_legs
        ));
    }

    let total_distance_m: f64 = partition
        .sub_missions
        .iter()
        .map(|sm| sm.estimated_distance_m)
        .sum();
    let total_flight_time_min: f64 = partition
        .sub_missions
        .iter()
        .map(|sm| sm.estimated_flight_time_min)
        .sum();

    Ok(MissionPlan {
        planned_at: Utc::now(),
        area_m2: polygon_area_m2(&request.polygon),
        line_spacing_m: spacing_m,
        ground_sample_distance_cm: ground_sample_distance_cm(
            params.altitude_m,
            params.sensor_width_mm,
            params.focal_length_mm,
            params.image_width_px,
        ),
        launch_point: launch,
        total_batteries: partition.total_batteries,
        sub_missions: partition.sub_missions,
        optimization,
        total_distance_m,
        total_flight_time_min,
        warnings,
    })
}

fn validate(request: &MissionRequest) -> Result<(), PlanError> {
    let vertices = &request.polygon.vertices;
    if vertices.len() < 3 {
        return Err(PlanError::PolygonTooSmall(vertices.len()));
    }
    for (index, v) in vertices.iter().enumerate() {
        let in_range =
            v.lat.is_finite() && v.lon.is_finite() && v.lat.abs() <= 90.0 && v.lon.abs() <= 180.0;
        if !in_range {
            return Err(PlanError::InvalidVertex {
                index,
                lat: v.lat,
                lon: v.lon,
            });
        }
    }
    if request.battery.usable_flight_time_min() <= 0.0 {
        return Err(PlanError::NoUsableFlightTime);
    }
    Ok(())
}

fn generate_pattern(
    request: &MissionRequest,
    centroid: &Coordinate,
    spacing_m: f64,
) -> Vec<Waypoint> {
    let params = &request.parameters;
    match params.pattern {
        PatternType::Lawnmower => generate_lawnmower(
            &request.polygon,
            params.altitude_m,
            params.flight_direction_deg,
            spacing_m,
            params.speed_mps,
        ),
        PatternType::Grid => generate_grid(
            &request.polygon,
            params.altitude_m,
            params.flight_direction_deg,
            spacing_m,
            params.speed_mps,
        ),
        PatternType::Circular => {
            let radius_m = request
                .polygon
                .vertices
                .iter()
                .map(|v| haversine_distance(centroid, v))
                .fold(0.0, f64::max);
            let circumference = 2.0 * std::f64::consts::PI * radius_m;
            let count = ((circumference / spacing_m).ceil() as usize).max(8);
            generate_circular(centroid, radius_m, count, params.altitude_m, params.speed_mps)
        }
    }
}
