pub mod coverage;
pub mod models;
pub mod optimizer;
pub mod partition;
pub mod planner;
pub mod spatial;

pub use coverage::{
    generate_circular, generate_grid, generate_lawnmower, ground_sample_distance_cm,
    optimal_line_spacing,
};
pub use models::{
    BatteryProfile, Coordinate, HeadingMode, MissionParameters, MissionPlan, MissionRequest,
    OptimizationConfig, OptimizationStrategy, PatternType, SubMission, SurveyPolygon, Waypoint,
    WaypointAction,
};
pub use optimizer::{
    count_direction_changes, is_grid_pattern, optimize, total_distance_m, validate_coverage,
    OptimizationResult,
};
pub use partition::{partition_route, required_batteries, PartitionOutcome};
pub use planner::{plan_survey_mission, PlanError};
pub use spatial::haversine_distance;
