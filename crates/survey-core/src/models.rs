//! Core data models for survey mission planning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A geographic position in degrees, with altitude in meters.
///
/// Whether altitude is AGL or MSL is fixed by the caller; the engine
/// carries it through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub altitude_m: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64, altitude_m: f64) -> Self {
        Self {
            lat,
            lon,
            altitude_m,
        }
    }

    /// Same position at a different altitude.
    pub fn at_altitude(&self, altitude_m: f64) -> Self {
        Self {
            altitude_m,
            ..*self
        }
    }
}

/// How the aircraft should orient itself at a waypoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingMode {
    /// Follow the direction of travel
    #[default]
    Auto,
    /// Hold a fixed heading
    Fixed,
    /// Face a point of interest
    PointOfInterest,
    /// Operator-controlled
    Manual,
}

/// Action executed on arrival at a waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointAction {
    None,
    TakePhoto,
    StartVideo,
    StopVideo,
    Hover,
    RotateAircraft,
}

/// A single mission waypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub coordinate: Coordinate,
    /// Position in the route, assigned sequentially from 0
    pub index: i32,
    pub speed_mps: f64,
    #[serde(default)]
    pub heading_mode: HeadingMode,
    #[serde(default)]
    pub heading_deg: f64,
    #[serde(default)]
    pub actions: Vec<WaypointAction>,
    /// Time to hold position at this waypoint, seconds
    #[serde(default)]
    pub hover_time_s: i32,
}

impl Waypoint {
    /// Create a waypoint with auto heading and no actions.
    pub fn new(coordinate: Coordinate, index: i32, speed_mps: f64) -> Self {
        Self {
            coordinate,
            index,
            speed_mps,
            heading_mode: HeadingMode::Auto,
            heading_deg: 0.0,
            actions: Vec::new(),
            hover_time_s: 0,
        }
    }

    pub fn with_action(mut self, action: WaypointAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_heading(mut self, mode: HeadingMode, heading_deg: f64) -> Self {
        self.heading_mode = mode;
        self.heading_deg = heading_deg;
        self
    }
}

/// Survey area boundary: ordered vertices, implicitly closed.
///
/// At least 3 vertices are needed for a meaningful area; fewer degrade
/// gracefully (empty pattern, zero area) rather than erroring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyPolygon {
    pub vertices: Vec<Coordinate>,
}

impl SurveyPolygon {
    pub fn new(vertices: Vec<Coordinate>) -> Self {
        Self { vertices }
    }
}

/// Coverage pattern to generate over the survey area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    #[default]
    Lawnmower,
    Grid,
    Circular,
}

/// Camera and flight parameters for a survey mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionParameters {
    pub altitude_m: f64,
    pub speed_mps: f64,
    /// Along-track photo overlap, percent
    pub front_overlap_pct: f64,
    /// Across-track photo overlap, percent
    pub side_overlap_pct: f64,
    pub sensor_width_mm: f64,
    pub focal_length_mm: f64,
    pub image_width_px: u32,
    /// Flight line direction, compass degrees (0 = north)
    pub flight_direction_deg: f64,
    pub pattern: PatternType,
}

impl Default for MissionParameters {
    fn default() -> Self {
        // 1-inch mapping sensor (13.2 x 8.8 mm, 8.8 mm lens, 5472 px wide)
        Self {
            altitude_m: 80.0,
            speed_mps: 10.0,
            front_overlap_pct: 80.0,
            side_overlap_pct: 70.0,
            sensor_width_mm: 13.2,
            focal_length_mm: 8.8,
            image_width_px: 5472,
            flight_direction_deg: 0.0,
            pattern: PatternType::Lawnmower,
        }
    }
}

/// Route optimization strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationStrategy {
    /// Pick a strategy from route shape and wind
    #[default]
    Auto,
    /// Nearest-neighbor construction only
    Greedy,
    /// 2-opt local search on the given order
    TwoOpt,
    /// Preserve grid structure (2-opt with endpoints pinned)
    GridAware,
    /// Nearest-cost construction weighted by wind
    WindAware,
}

/// Configuration for the flight path optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationConfig {
    pub preserve_first: bool,
    pub preserve_last: bool,
    /// Carried in mission configs for boundary compatibility. Turn
    /// reduction is inherent to the 2-opt based strategies; no strategy
    /// consults this flag directly.
    pub minimize_turns: bool,
    pub optimize_for_wind: bool,
    /// Direction the wind is blowing toward, compass degrees
    pub wind_direction_deg: f64,
    pub wind_speed_mps: f64,
    /// Maximum 2-opt improvement passes
    pub max_iterations: i32,
    pub strategy: OptimizationStrategy,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            preserve_first: true,
            preserve_last: false,
            minimize_turns: true,
            optimize_for_wind: false,
            wind_direction_deg: 0.0,
            wind_speed_mps: 0.0,
            max_iterations: 100,
            strategy: OptimizationStrategy::Auto,
        }
    }
}

/// Battery characteristics used for mission partitioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryProfile {
    /// Manufacturer-rated flight time, minutes
    pub rated_flight_time_min: f64,
    /// Fraction of rated time held in reserve, 0.0..1.0
    pub safety_margin: f64,
    pub cruise_current_a: f64,
    pub hover_current_a: f64,
    pub capacity_mah: f64,
    pub voltage_v: f64,
}

impl BatteryProfile {
    /// Flight time available for planning: rated time minus the safety
    /// margin. Recomputed on every call, never cached.
    pub fn usable_flight_time_min(&self) -> f64 {
        self.rated_flight_time_min * (1.0 - self.safety_margin.clamp(0.0, 1.0))
    }
}

impl Default for BatteryProfile {
    fn default() -> Self {
        Self {
            rated_flight_time_min: 30.0,
            safety_margin: 0.2,
            cruise_current_a: 15.0,
            hover_current_a: 12.0,
            capacity_mah: 5000.0,
            voltage_v: 15.4,
        }
    }
}

/// One battery's worth of the route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubMission {
    /// 1-based battery number
    pub battery_number: i32,
    /// Contiguous slice of the route, in original order
    pub waypoints: Vec<Waypoint>,
    pub estimated_flight_time_min: f64,
    pub estimated_distance_m: f64,
    pub launch_point: Coordinate,
    pub landing_point: Coordinate,
    /// Set when this sub-mission could not satisfy the nominal safety
    /// margin (single-leg escape valve)
    #[serde(default)]
    pub exceeds_safety_margin: bool,
}

/// Everything needed to plan one survey mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionRequest {
    pub polygon: SurveyPolygon,
    /// Takeoff/landing position; defaults to the polygon centroid
    #[serde(default)]
    pub launch_point: Option<Coordinate>,
    #[serde(default)]
    pub parameters: MissionParameters,
    #[serde(default)]
    pub optimization: OptimizationConfig,
    #[serde(default)]
    pub battery: BatteryProfile,
}

/// Full output of the planning pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionPlan {
    pub planned_at: DateTime<Utc>,
    pub area_m2: f64,
    pub line_spacing_m: f64,
    pub ground_sample_distance_cm: f64,
    pub launch_point: Coordinate,
    pub optimization: crate::optimizer::OptimizationResult,
    pub sub_missions: Vec<SubMission>,
    pub total_batteries: usize,
    pub total_distance_m: f64,
    pub total_flight_time_min: f64,
    /// Degraded-but-valid conditions encountered while planning
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usable_flight_time_applies_safety_margin() {
        let profile = BatteryProfile {
            rated_flight_time_min: 25.0,
            safety_margin: 0.2,
            ..BatteryProfile::default()
        };
        assert!((profile.usable_flight_time_min() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn usable_flight_time_tracks_field_changes() {
        let mut profile = BatteryProfile::default();
        let before = profile.usable_flight_time_min();
        profile.safety_margin = 0.5;
        let after = profile.usable_flight_time_min();
        assert!(after < before);
        assert!((after - profile.rated_flight_time_min * 0.5).abs() < 1e-9);
    }

    #[test]
    fn waypoint_serializes_with_snake_case_actions() {
        let wp = Waypoint::new(Coordinate::new(33.0, -117.0, 80.0), 0, 10.0)
            .with_action(WaypointAction::TakePhoto);
        let json = serde_json::to_string(&wp).unwrap();
        assert!(json.contains("take_photo"));
        let back: Waypoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wp);
    }
}
