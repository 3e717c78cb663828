//! Survey mission planner CLI.
//!
//! Reads a JSON `MissionRequest` (polygon, camera/flight parameters,
//! battery profile), runs the planning pipeline, and writes the
//! resulting `MissionPlan` as JSON with an optional human summary.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use survey_core::planner::plan_survey_mission;
use survey_core::MissionRequest;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Plan an aerial survey mission from a JSON request
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the MissionRequest JSON file
    #[arg(long)]
    request: PathBuf,

    /// Write the MissionPlan JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print the plan JSON
    #[arg(long, default_value_t = false)]
    pretty: bool,

    /// Print a human-readable summary to stderr
    #[arg(long, default_value_t = false)]
    summary: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let raw = fs::read_to_string(&args.request)
        .with_context(|| format!("reading request file {}", args.request.display()))?;
    let request: MissionRequest =
        serde_json::from_str(&raw).context("parsing MissionRequest JSON")?;

    tracing::info!(
        vertices = request.polygon.vertices.len(),
        pattern = ?request.parameters.pattern,
        "planning survey mission"
    );

    let plan = plan_survey_mission(&request).context("planning failed")?;

    tracing::info!(
        waypoints = plan.optimization.waypoints.len(),
        batteries = plan.total_batteries,
        distance_m = plan.total_distance_m,
        "plan complete"
    );
    for warning in &plan.warnings {
        tracing::warn!("{warning}");
    }

    if args.summary {
        print_summary(&plan);
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&plan)?
    } else {
        serde_json::to_string(&plan)?
    };

    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("writing plan to {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}

fn print_summary(plan: &survey_core::MissionPlan) {
    eprintln!("Survey plan ({})", plan.planned_at.to_rfc3339());
    eprintln!("  area:          {:.2} ha", plan.area_m2 / 10_000.0);
    eprintln!("  line spacing:  {:.1} m", plan.line_spacing_m);
    eprintln!("  GSD:           {:.2} cm/px", plan.ground_sample_distance_cm);
    eprintln!("  waypoints:     {}", plan.optimization.waypoints.len());
    eprintln!(
        "  route:         {:.2} km ({:.1}% shorter than raw)",
        plan.total_distance_m / 1000.0,
        plan.optimization.improvement_pct
    );
    eprintln!("  flight time:   {:.1} min", plan.total_flight_time_min);
    eprintln!("  batteries:     {}", plan.total_batteries);
    for sm in &plan.sub_missions {
        let flag = if sm.exceeds_safety_margin {
            "  [EXCEEDS SAFETY MARGIN]"
        } else {
            ""
        };
        eprintln!(
            "    battery {}: {} waypoints, {:.1} min, {:.2} km{}",
            sm.battery_number,
            sm.waypoints.len(),
            sm.estimated_flight_time_min,
            sm.estimated_distance_m / 1000.0,
            flag
        );
    }
    if !plan.warnings.is_empty() {
        eprintln!("  warnings:");
        for warning in &plan.warnings {
            eprintln!("    - {warning}");
        }
    }
}
