//! Battery-constrained route partitioning.
//!
//! Splits an ordered route into sub-missions, each of which can fly its
//! assigned waypoints and return to the launch point within the
//! battery's usable capacity.

use crate::models::{BatteryProfile, Coordinate, SubMission, Waypoint};
use crate::optimizer::DEFAULT_SPEED_MPS;
use crate::spatial::haversine_distance;
use serde::{Deserialize, Serialize};

/// Handling/repositioning overhead charged to every battery after the
/// first, minutes.
pub const RTH_BUFFER_MIN: f64 = 2.5;

/// Fixed safety buffer kept in reserve on every battery, minutes.
pub const SAFETY_BUFFER_MIN: f64 = 1.0;

/// Landing allowance added to every return-to-home estimate, minutes.
pub const LANDING_TIME_MIN: f64 = 0.5;

/// Result of partitioning a route across batteries.
///
/// `infeasible_legs > 0` means at least one waypoint could not satisfy
/// the nominal safety margin and was isolated into its own flagged
/// sub-mission rather than dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionOutcome {
    pub sub_missions: Vec<SubMission>,
    pub total_batteries: usize,
    pub infeasible_legs: usize,
}

#[derive(Debug, Clone)]
struct BatterySegment {
    start: usize,
    /// exclusive
    end: usize,
    flight_time_min: f64,
    distance_m: f64,
    infeasible: bool,
}

/// Split `route` into battery-feasible sub-missions.
///
/// Greedy accumulation: a waypoint is accepted only while the segment
/// time so far, the next leg, the return-to-home time from that
/// waypoint, and the safety buffer all fit in the battery's available
/// time. Sub-missions cover contiguous slices of the route in order;
/// their concatenation reproduces the route exactly.
///
/// A waypoint that does not fit even as the sole member of a fresh
/// battery is isolated into its own sub-mission with
/// `exceeds_safety_margin` set, so partitioning always terminates and
/// never silently drops coverage.
pub fn partition_route(
    route: &[Waypoint],
    launch: &Coordinate,
    profile: &BatteryProfile,
) -> PartitionOutcome {
    let segments = plan_batteries(route, launch, profile);

    let mut sub_missions = Vec::with_capacity(segments.len());
    let mut infeasible_legs = 0usize;
    for (i, segment) in segments.iter().enumerate() {
        if segment.infeasible {
            infeasible_legs += 1;
        }
        sub_missions.push(SubMission {
            battery_number: i as i32 + 1,
            waypoints: route[segment.start..segment.end].to_vec(),
            estimated_flight_time_min: segment.flight_time_min,
            estimated_distance_m: segment.distance_m,
            launch_point: *launch,
            landing_point: *launch,
            exceeds_safety_margin: segment.infeasible,
        });
    }

    PartitionOutcome {
        total_batteries: sub_missions.len(),
        sub_missions,
        infeasible_legs,
    }
}

/// Number of batteries [`partition_route`] would produce, without
/// materializing the sub-missions.
pub fn required_batteries(
    route: &[Waypoint],
    launch: &Coordinate,
    profile: &BatteryProfile,
) -> usize {
    plan_batteries(route, launch, profile).len()
}

/// Shared accumulation loop behind both public entry points, so the
/// battery count and the materialized partition always agree.
fn plan_batteries(
    route: &[Waypoint],
    launch: &Coordinate,
    profile: &BatteryProfile,
) -> Vec<BatterySegment> {
    let usable_min = profile.usable_flight_time_min();
    let mut segments = Vec::new();
    let mut idx = 0usize;

    while idx < route.len() {
        let battery_number = segments.len() + 1;
        let available_min = if battery_number > 1 {
            usable_min - RTH_BUFFER_MIN
        } else {
            usable_min
        };

        let start = idx;
        let mut segment_time = 0.0;
        let mut segment_distance = 0.0;
        let mut position = *launch;
        let mut last_rth_time = 0.0;
        let mut last_rth_distance = 0.0;

        while idx < route.len() {
            let candidate = &route[idx];
            let leg = leg_cost(&position, candidate, launch);

            let fits = segment_time + leg.travel_time_min + leg.rth_time_min + SAFETY_BUFFER_MIN
                <= available_min;
            if !fits {
                break;
            }

            segment_time += leg.travel_time_min;
            segment_distance += leg.distance_m;
            last_rth_time = leg.rth_time_min;
            last_rth_distance = leg.rth_distance_m;
            position = candidate.coordinate;
            idx += 1;
        }

        let infeasible = idx == start;
        if infeasible {
            // Escape valve: this waypoint alone exceeds the battery's
            // capacity. Fly it anyway as its own flagged sub-mission.
            let candidate = &route[idx];
            let leg = leg_cost(launch, candidate, launch);
            segment_time = leg.travel_time_min;
            segment_distance = leg.distance_m;
            last_rth_time = leg.rth_time_min;
            last_rth_distance = leg.rth_distance_m;
            idx += 1;
        }

        segments.push(BatterySegment {
            start,
            end: idx,
            flight_time_min: segment_time + last_rth_time,
            distance_m: segment_distance + last_rth_distance,
            infeasible,
        });
    }

    segments
}

struct LegCost {
    distance_m: f64,
    /// Travel to the waypoint plus hover there, minutes
    travel_time_min: f64,
    rth_distance_m: f64,
    /// Return to launch plus landing allowance, minutes
    rth_time_min: f64,
}

fn leg_cost(from: &Coordinate, to: &Waypoint, launch: &Coordinate) -> LegCost {
    let speed = if to.speed_mps > 0.0 {
        to.speed_mps
    } else {
        DEFAULT_SPEED_MPS
    };

    let distance_m = haversine_distance(from, &to.coordinate);
    let hover_min = f64::from(to.hover_time_s.max(0)) / 60.0;
    let rth_distance_m = haversine_distance(&to.coordinate, launch);

    LegCost {
        distance_m,
        travel_time_min: distance_m / speed / 60.0 + hover_min,
        rth_distance_m,
        rth_time_min: rth_distance_m / speed / 60.0 + LANDING_TIME_MIN,
    }
}
