//! Flight path optimization: route metrics, nearest-neighbor
//! construction, 2-opt local search, and wind-weighted ordering.
//!
//! Every strategy reorders waypoints only. The waypoint set itself is
//! never changed; [`validate_coverage`] is the contract check for that.

use crate::models::{Coordinate, OptimizationConfig, OptimizationStrategy, Waypoint};
use crate::spatial::{bearing_delta_deg, haversine_distance, initial_bearing_deg};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bearing change that counts as a turn, degrees.
pub const DEFAULT_TURN_THRESHOLD_DEG: f64 = 30.0;

/// Fallback cruise speed for waypoints with non-positive speed, m/s.
pub const DEFAULT_SPEED_MPS: f64 = 10.0;

/// Seconds saved per eliminated turn, used in time estimates.
const TURN_TIME_COST_S: f64 = 5.0;

/// Weight of the wind penalty against raw distance in wind-aware costs.
const WIND_PENALTY_WEIGHT: f64 = 10.0;

/// Wind speed above which auto-selection switches to the wind-aware
/// strategy, m/s.
const WIND_AUTO_THRESHOLD_MPS: f64 = 3.0;

/// Outcome of an optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Strategy that ran. `Auto` means the default pipeline: greedy
    /// construction refined by 2-opt.
    pub strategy: OptimizationStrategy,
    pub original_distance_m: f64,
    pub optimized_distance_m: f64,
    pub distance_saved_m: f64,
    pub improvement_pct: f64,
    /// Positions whose waypoint differs from the input route
    pub waypoint_changes: usize,
    pub direction_changes: usize,
    pub estimated_time_saved_min: f64,
    /// 2-opt improvement passes executed
    pub iterations_run: usize,
    pub waypoints: Vec<Waypoint>,
}

/// Sum of consecutive great-circle leg distances, meters.
pub fn total_distance_m(route: &[Waypoint]) -> f64 {
    route
        .windows(2)
        .map(|pair| haversine_distance(&pair[0].coordinate, &pair[1].coordinate))
        .sum()
}

/// Number of turns sharper than `threshold_deg` along the route.
pub fn count_direction_changes(route: &[Waypoint], threshold_deg: f64) -> usize {
    let bearings = leg_bearings(route);
    bearings
        .windows(2)
        .filter(|pair| bearing_delta_deg(pair[0], pair[1]) > threshold_deg)
        .count()
}

/// Heuristic check for parallel-line (grid/lawnmower) structure.
///
/// Samples up to the first 10 leg bearings and counts near-reversals
/// (150°..=180° turns). More than 30% reversals classifies the route as
/// a grid, which auto-selects the grid-preserving strategy.
pub fn is_grid_pattern(route: &[Waypoint]) -> bool {
    let bearings: Vec<f64> = leg_bearings(route).into_iter().take(10).collect();
    if bearings.len() < 2 {
        return false;
    }

    let turns = bearings.len() - 1;
    let reversals = bearings
        .windows(2)
        .filter(|pair| bearing_delta_deg(pair[0], pair[1]) >= 150.0)
        .count();

    reversals as f64 > 0.3 * turns as f64
}

/// Initial bearing of every consecutive leg, degrees.
fn leg_bearings(route: &[Waypoint]) -> Vec<f64> {
    route
        .windows(2)
        .map(|pair| initial_bearing_deg(&pair[0].coordinate, &pair[1].coordinate))
        .collect()
}

/// True iff both routes visit the same multiset of (lat, lon) positions.
///
/// Positions are keyed at 8-decimal precision (integer nano-degrees), so
/// reordering passes and any waypoint loss, duplication, or displacement
/// fails.
pub fn validate_coverage(original: &[Waypoint], optimized: &[Waypoint]) -> bool {
    if original.len() != optimized.len() {
        return false;
    }

    let mut counts: HashMap<(i64, i64), i64> = HashMap::new();
    for wp in original {
        *counts.entry(position_key(&wp.coordinate)).or_insert(0) += 1;
    }
    for wp in optimized {
        match counts.get_mut(&position_key(&wp.coordinate)) {
            Some(count) => *count -= 1,
            None => return false,
        }
    }
    counts.values().all(|&count| count == 0)
}

fn position_key(coordinate: &Coordinate) -> (i64, i64) {
    (
        (coordinate.lat * 1e8).round() as i64,
        (coordinate.lon * 1e8).round() as i64,
    )
}

/// Reorder `route` to reduce travel distance and turning.
///
/// `start` is the position the aircraft approaches the route from
/// (normally the launch point); it anchors nearest-neighbor construction
/// unless `preserve_first` pins the existing first waypoint.
pub fn optimize(
    route: &[Waypoint],
    start: &Coordinate,
    config: &OptimizationConfig,
) -> OptimizationResult {
    let original_distance = total_distance_m(route);

    // 0 or 1 waypoints cannot be reordered
    if route.len() < 2 {
        return finish(
            route.to_vec(),
            route,
            config.strategy,
            original_distance,
            0,
        );
    }

    let strategy = resolve_strategy(route, config);
    let mut iterations = 0usize;

    let waypoints = match strategy {
        OptimizationStrategy::Greedy => greedy_order(route, start, config, nearest_by_distance),
        OptimizationStrategy::WindAware => greedy_order(route, start, config, nearest_by_wind_cost),
        OptimizationStrategy::TwoOpt | OptimizationStrategy::GridAware => {
            let mut ordered = route.to_vec();
            iterations = two_opt(&mut ordered, config.max_iterations);
            ordered
        }
        // Auto that fell through to the default pipeline: greedy
        // construction refined by 2-opt
        OptimizationStrategy::Auto => {
            let mut ordered = greedy_order(route, start, config, nearest_by_distance);
            iterations = two_opt(&mut ordered, config.max_iterations);
            ordered
        }
    };

    finish(waypoints, route, strategy, original_distance, iterations)
}

/// Resolve `Auto` into a concrete strategy; explicit choices pass through.
fn resolve_strategy(route: &[Waypoint], config: &OptimizationConfig) -> OptimizationStrategy {
    if config.strategy != OptimizationStrategy::Auto {
        return config.strategy;
    }
    if is_grid_pattern(route) {
        OptimizationStrategy::GridAware
    } else if config.optimize_for_wind && config.wind_speed_mps > WIND_AUTO_THRESHOLD_MPS {
        OptimizationStrategy::WindAware
    } else {
        OptimizationStrategy::Auto
    }
}

fn finish(
    mut waypoints: Vec<Waypoint>,
    original: &[Waypoint],
    strategy: OptimizationStrategy,
    original_distance: f64,
    iterations_run: usize,
) -> OptimizationResult {
    for (i, wp) in waypoints.iter_mut().enumerate() {
        wp.index = i as i32;
    }

    let optimized_distance = total_distance_m(&waypoints);
    let distance_saved = original_distance - optimized_distance;
    let improvement_pct = if original_distance > 0.0 {
        distance_saved / original_distance * 100.0
    } else {
        0.0
    };

    let waypoint_changes = original
        .iter()
        .zip(&waypoints)
        .filter(|(a, b)| position_key(&a.coordinate) != position_key(&b.coordinate))
        .count();

    let turns_before = count_direction_changes(original, DEFAULT_TURN_THRESHOLD_DEG);
    let turns_after = count_direction_changes(&waypoints, DEFAULT_TURN_THRESHOLD_DEG);
    let turns_reduced = turns_before.saturating_sub(turns_after);

    let speed = waypoints
        .first()
        .map(|wp| wp.speed_mps)
        .filter(|&s| s > 0.0)
        .unwrap_or(DEFAULT_SPEED_MPS);
    let estimated_time_saved_min =
        (distance_saved / speed + turns_reduced as f64 * TURN_TIME_COST_S) / 60.0;

    OptimizationResult {
        strategy,
        original_distance_m: original_distance,
        optimized_distance_m: optimized_distance,
        distance_saved_m: distance_saved,
        improvement_pct,
        waypoint_changes,
        direction_changes: turns_after,
        estimated_time_saved_min,
        iterations_run,
        waypoints,
    }
}

/// Greedy construction: repeatedly append the best unvisited waypoint
/// under `select`, starting from `start` (or the pinned first waypoint).
fn greedy_order<F>(
    route: &[Waypoint],
    start: &Coordinate,
    config: &OptimizationConfig,
    select: F,
) -> Vec<Waypoint>
where
    F: Fn(&Coordinate, &[Waypoint], &OptimizationConfig) -> usize,
{
    let mut remaining: Vec<Waypoint> = route.to_vec();
    let mut ordered = Vec::with_capacity(route.len());

    let pinned_last = if config.preserve_last && remaining.len() > 1 {
        remaining.pop()
    } else {
        None
    };

    let mut current = if config.preserve_first && !remaining.is_empty() {
        let first = remaining.remove(0);
        let position = first.coordinate;
        ordered.push(first);
        position
    } else {
        *start
    };

    while !remaining.is_empty() {
        let next_idx = select(&current, &remaining, config);
        let next = remaining.swap_remove(next_idx);
        current = next.coordinate;
        ordered.push(next);
    }

    if let Some(last) = pinned_last {
        ordered.push(last);
    }
    ordered
}

fn nearest_by_distance(
    from: &Coordinate,
    candidates: &[Waypoint],
    _config: &OptimizationConfig,
) -> usize {
    best_index(candidates, |wp| haversine_distance(from, &wp.coordinate))
}

/// Wind-aware edge cost: raw distance plus a weighted penalty that is
/// negative on tailwind legs and positive on headwind legs.
/// `wind_direction_deg` is the direction the wind blows toward.
fn nearest_by_wind_cost(
    from: &Coordinate,
    candidates: &[Waypoint],
    config: &OptimizationConfig,
) -> usize {
    best_index(candidates, |wp| {
        let distance = haversine_distance(from, &wp.coordinate);
        let path_bearing = initial_bearing_deg(from, &wp.coordinate);
        let offset = bearing_delta_deg(path_bearing, config.wind_direction_deg + 180.0);
        let wind_penalty = offset.to_radians().cos() * config.wind_speed_mps;
        distance + WIND_PENALTY_WEIGHT * wind_penalty
    })
}

fn best_index<F: Fn(&Waypoint) -> f64>(candidates: &[Waypoint], cost: F) -> usize {
    let mut best = 0usize;
    let mut best_cost = f64::INFINITY;
    for (i, wp) in candidates.iter().enumerate() {
        let c = cost(wp);
        if c < best_cost {
            best_cost = c;
            best = i;
        }
    }
    best
}

/// 2-opt local search. Reverses sub-routes whose boundary edges cross,
/// repeating full passes until none improves or the pass budget runs
/// out. Total distance is non-increasing after every reversal.
///
/// Endpoints stay fixed (the scan range excludes them), so pinned
/// first/last waypoints survive refinement.
fn two_opt(route: &mut [Waypoint], max_iterations: i32) -> usize {
    let n = route.len();
    if n < 4 {
        return 0;
    }

    let max_passes = max_iterations.max(0) as usize;
    let mut passes = 0usize;

    while passes < max_passes {
        let mut improved = false;
        for i in 1..n - 1 {
            for j in i + 1..n - 1 {
                let before = haversine_distance(&route[i - 1].coordinate, &route[i].coordinate)
                    + haversine_distance(&route[j].coordinate, &route[j + 1].coordinate);
                let after = haversine_distance(&route[i - 1].coordinate, &route[j].coordinate)
                    + haversine_distance(&route[i].coordinate, &route[j + 1].coordinate);
                if after + 1e-9 < before {
                    route[i..=j].reverse();
                    improved = true;
                }
            }
        }
        passes += 1;
        if !improved {
            break;
        }
    }
    passes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OptimizationStrategy;
    use crate::spatial::destination;

    fn wp(lat: f64, lon: f64, index: i32) -> Waypoint {
        Waypoint::new(Coordinate::new(lat, lon, 80.0), index, 10.0)
    }

    fn offset_wp(origin: &Coordinate, north_m: f64, east_m: f64, index: i32) -> Waypoint {
        let north_bearing = if north_m >= 0.0 { 0.0 } else { 180.0 };
        let east_bearing = if east_m >= 0.0 { 90.0 } else { 270.0 };
        let p = destination(
            &destination(origin, north_m.abs(), north_bearing),
            east_m.abs(),
            east_bearing,
        );
        Waypoint::new(p.at_altitude(80.0), index, 10.0)
    }

    fn origin() -> Coordinate {
        Coordinate::new(33.0, -117.0, 0.0)
    }

    #[test]
    fn total_distance_sums_legs() {
        let o = origin();
        let route = vec![
            offset_wp(&o, 0.0, 0.0, 0),
            offset_wp(&o, 0.0, 100.0, 1),
            offset_wp(&o, 0.0, 200.0, 2),
        ];
        let d = total_distance_m(&route);
        assert!((d - 200.0).abs() < 1.0, "got {d}");
    }

    /// 6 parallel north-south lines, all flown south to north. Line
    /// legs bear ~0 and each connecting leg runs back south-southeast
    /// (~171), so consecutive bearings reverse on every transition.
    fn parallel_line_route(o: &Coordinate) -> Vec<Waypoint> {
        let mut route = Vec::new();
        for line in 0..6 {
            let east = line as f64 * 30.0;
            route.push(offset_wp(o, 0.0, east, route.len() as i32));
            route.push(offset_wp(o, 200.0, east, route.len() as i32));
        }
        route
    }

    #[test]
    fn grid_pattern_detected_on_parallel_lines() {
        let o = origin();
        let route = parallel_line_route(&o);

        // Every sampled turn is a near-reversal (>= 150 degrees)
        for pair in route.windows(3) {
            let b1 = crate::spatial::initial_bearing_deg(&pair[0].coordinate, &pair[1].coordinate);
            let b2 = crate::spatial::initial_bearing_deg(&pair[1].coordinate, &pair[2].coordinate);
            assert!(
                bearing_delta_deg(b1, b2) >= 150.0,
                "expected reversal, got {b1} -> {b2}"
            );
        }

        assert!(is_grid_pattern(&route));
    }

    #[test]
    fn grid_pattern_rejected_on_circular_route() {
        let o = origin();
        let route: Vec<Waypoint> = (0..12)
            .map(|i| {
                let angle = 360.0 * f64::from(i) / 12.0;
                Waypoint::new(destination(&o, 100.0, angle).at_altitude(80.0), i, 10.0)
            })
            .collect();
        assert!(!is_grid_pattern(&route));
    }

    #[test]
    fn two_opt_straightens_z_route() {
        let o = origin();
        // "Z" shape: one sharp reversal in the middle
        let route = vec![
            offset_wp(&o, 0.0, 0.0, 0),
            offset_wp(&o, 0.0, 300.0, 1),
            offset_wp(&o, 0.0, 100.0, 2),
            offset_wp(&o, 0.0, 400.0, 3),
            offset_wp(&o, 0.0, 500.0, 4),
        ];
        let before = total_distance_m(&route);

        let config = OptimizationConfig {
            strategy: OptimizationStrategy::TwoOpt,
            ..OptimizationConfig::default()
        };
        let result = optimize(&route, &o, &config);

        assert!(result.optimized_distance_m < before);
        assert!(result.waypoint_changes > 0);
        assert!(result.distance_saved_m > 0.0);
        assert!(validate_coverage(&route, &result.waypoints));
        // Near-optimal ordering for colinear points is the sweep: 500 m
        assert!(
            (result.optimized_distance_m - 500.0).abs() < 5.0,
            "got {}",
            result.optimized_distance_m
        );
    }

    #[test]
    fn two_opt_is_monotonic() {
        let o = origin();
        let route = vec![
            offset_wp(&o, 0.0, 0.0, 0),
            offset_wp(&o, 180.0, 40.0, 1),
            offset_wp(&o, 20.0, 90.0, 2),
            offset_wp(&o, 160.0, 130.0, 3),
            offset_wp(&o, 10.0, 200.0, 4),
            offset_wp(&o, 150.0, 260.0, 5),
        ];
        let before = total_distance_m(&route);
        let config = OptimizationConfig {
            strategy: OptimizationStrategy::TwoOpt,
            max_iterations: 50,
            ..OptimizationConfig::default()
        };
        let result = optimize(&route, &o, &config);
        assert!(result.optimized_distance_m <= before + 1e-6);
        assert!(result.iterations_run >= 1);
    }

    #[test]
    fn every_strategy_preserves_coverage() {
        let o = origin();
        let route = vec![
            offset_wp(&o, 0.0, 0.0, 0),
            offset_wp(&o, 120.0, 30.0, 1),
            offset_wp(&o, 40.0, 90.0, 2),
            offset_wp(&o, 200.0, 150.0, 3),
            offset_wp(&o, 80.0, 210.0, 4),
            offset_wp(&o, 160.0, 270.0, 5),
        ];

        for strategy in [
            OptimizationStrategy::Auto,
            OptimizationStrategy::Greedy,
            OptimizationStrategy::TwoOpt,
            OptimizationStrategy::GridAware,
            OptimizationStrategy::WindAware,
        ] {
            let config = OptimizationConfig {
                strategy,
                optimize_for_wind: strategy == OptimizationStrategy::WindAware,
                wind_direction_deg: 90.0,
                wind_speed_mps: 6.0,
                ..OptimizationConfig::default()
            };
            let result = optimize(&route, &o, &config);
            assert!(
                validate_coverage(&route, &result.waypoints),
                "strategy {strategy:?} changed the waypoint set"
            );
        }
    }

    #[test]
    fn greedy_respects_preserved_endpoints() {
        let o = origin();
        let route = vec![
            offset_wp(&o, 0.0, 0.0, 0),
            offset_wp(&o, 0.0, 300.0, 1),
            offset_wp(&o, 0.0, 100.0, 2),
            offset_wp(&o, 0.0, 200.0, 3),
            offset_wp(&o, 0.0, 400.0, 4),
        ];
        let config = OptimizationConfig {
            strategy: OptimizationStrategy::Greedy,
            preserve_first: true,
            preserve_last: true,
            ..OptimizationConfig::default()
        };
        let result = optimize(&route, &o, &config);

        let first_key = position_key(&route[0].coordinate);
        let last_key = position_key(&route[4].coordinate);
        assert_eq!(position_key(&result.waypoints[0].coordinate), first_key);
        assert_eq!(position_key(&result.waypoints[4].coordinate), last_key);
        assert!(validate_coverage(&route, &result.waypoints));
    }

    #[test]
    fn wind_aware_prefers_tailwind_legs() {
        let o = origin();
        // Two equidistant candidates east and west; wind blowing toward
        // the east should make the eastbound leg cheaper.
        let east = offset_wp(&o, 0.0, 100.0, 0);
        let west = offset_wp(&o, 0.0, -100.0, 1);
        let config = OptimizationConfig {
            wind_direction_deg: 90.0,
            wind_speed_mps: 8.0,
            ..OptimizationConfig::default()
        };

        let candidates = vec![west.clone(), east.clone()];
        let pick = nearest_by_wind_cost(&o, &candidates, &config);
        assert_eq!(
            position_key(&candidates[pick].coordinate),
            position_key(&east.coordinate)
        );
    }

    #[test]
    fn auto_selects_grid_aware_for_grid_routes() {
        let o = origin();
        let route = parallel_line_route(&o);
        let result = optimize(&route, &o, &OptimizationConfig::default());
        assert_eq!(result.strategy, OptimizationStrategy::GridAware);
    }

    #[test]
    fn empty_and_singleton_routes_pass_through() {
        let o = origin();
        let config = OptimizationConfig::default();

        let empty = optimize(&[], &o, &config);
        assert!(empty.waypoints.is_empty());
        assert_eq!(empty.distance_saved_m, 0.0);

        let single = vec![wp(33.0, -117.0, 0)];
        let result = optimize(&single, &o, &config);
        assert_eq!(result.waypoints.len(), 1);
        assert_eq!(result.optimized_distance_m, 0.0);
    }

    #[test]
    fn coverage_validation_rejects_mutation() {
        let o = origin();
        let route = vec![offset_wp(&o, 0.0, 0.0, 0), offset_wp(&o, 0.0, 100.0, 1)];

        let mut displaced = route.clone();
        displaced[1].coordinate.lat += 0.001;
        assert!(!validate_coverage(&route, &displaced));

        let mut duplicated = route.clone();
        duplicated[1] = duplicated[0].clone();
        assert!(!validate_coverage(&route, &duplicated));

        let truncated = vec![route[0].clone()];
        assert!(!validate_coverage(&route, &truncated));

        let mut reordered = route.clone();
        reordered.reverse();
        assert!(validate_coverage(&route, &reordered));
    }
}
