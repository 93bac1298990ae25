use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Timelike};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

use spaceprop::propagation::state::MASS;
use spaceprop::propagation::time::{format_instant, offset_by};
use spaceprop::propagation::{
    Frame, Instant, Orbit, Pass, Propagated, PropagationSettings, State, TrajectoryModel, Vector3,
};

/// Seed state and models for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// RFC 3339 epoch, e.g. "2026-01-29T12:00:00Z"
    pub epoch: String,
    #[serde(default = "default_frame")]
    pub frame: Frame,
    /// Position in meters
    pub position: [f64; 3],
    /// Velocity in meters per second
    pub velocity: [f64; 3],
    #[serde(default)]
    pub settings: PropagationSettings,
    #[serde(default)]
    pub initial_revolution_number: Option<i64>,
}

fn default_frame() -> Frame {
    Frame::Gcrf
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    pub fn epoch(&self) -> Result<Instant> {
        parse_epoch(&self.epoch)
    }

    pub fn seed_state(&self) -> Result<State> {
        Ok(self.settings.build_state(
            self.epoch()?,
            Vector3::from(self.position),
            Vector3::from(self.velocity),
            self.frame,
        )?)
    }

    pub fn trajectory(&self) -> Result<Propagated> {
        let propagator = self.settings.build_propagator()?;
        log::info!("{}", propagator);
        Ok(Propagated::new(propagator, self.seed_state()?))
    }
}

/// Model preset replacing the scenario's own settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    PointMass,
    LeoBasic,
    LeoHighFidelity,
}

impl Preset {
    fn settings(&self) -> PropagationSettings {
        match self {
            Self::PointMass => PropagationSettings::point_mass(),
            Self::LeoBasic => PropagationSettings::leo_basic(),
            Self::LeoHighFidelity => PropagationSettings::leo_high_fidelity(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PropagateArgs {
    /// Scenario JSON file
    #[arg(long)]
    pub scenario: PathBuf,
    /// Override the scenario's model settings
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,
    /// Span to cover in hours (negative propagates backward)
    #[arg(long, default_value_t = 24.0, allow_negative_numbers = true)]
    pub hours: f64,
    /// Output cadence in seconds
    #[arg(long, default_value_t = 60.0)]
    pub step_seconds: f64,
    /// Output JSON file path (stdout when omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PassesArgs {
    /// Scenario JSON file
    #[arg(long)]
    pub scenario: PathBuf,
    /// Override the scenario's model settings
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,
    /// Number of passes from the epoch revolution on
    #[arg(long, default_value_t = 5)]
    pub count: usize,
    /// Output JSON file path (stdout when omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct StateRecord {
    epoch: String,
    frame: Frame,
    position: [f64; 3],
    velocity: [f64; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    mass: Option<f64>,
}

impl StateRecord {
    fn from_state(state: &State) -> Result<Self> {
        let position = state.position()?;
        let velocity = state.velocity()?;
        let mass = if state.has_subset(MASS) {
            Some(state.extract(MASS)?[0])
        } else {
            None
        };

        Ok(Self {
            epoch: format_instant(&state.instant()),
            frame: state.frame(),
            position: [position.x, position.y, position.z],
            velocity: [velocity.x, velocity.y, velocity.z],
            mass,
        })
    }
}

#[derive(Debug, Serialize)]
struct PassRecord {
    revolution_number: i64,
    complete: bool,
    start: Option<String>,
    end: Option<String>,
    descending_node: Option<String>,
    duration_seconds: Option<f64>,
}

impl From<&Pass> for PassRecord {
    fn from(pass: &Pass) -> Self {
        Self {
            revolution_number: pass.revolution_number,
            complete: pass.is_complete(),
            start: pass.start.as_ref().map(format_instant),
            end: pass.end.as_ref().map(format_instant),
            descending_node: pass.descending_node.as_ref().map(format_instant),
            duration_seconds: pass.duration(),
        }
    }
}

fn load(path: &Path, preset: Option<Preset>) -> Result<Scenario> {
    let mut scenario = Scenario::load(path)?;
    if let Some(preset) = preset {
        log::info!("Using preset {:?}", preset);
        scenario.settings = preset.settings();
    }
    Ok(scenario)
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub fn run_propagate(args: PropagateArgs) -> Result<()> {
    if !(args.step_seconds > 0.0) {
        return Err(anyhow!("step-seconds must be > 0"));
    }

    let scenario = load(&args.scenario, args.preset)?;
    let epoch = scenario.epoch()?;
    let mut trajectory = scenario.trajectory()?;

    let steps = (args.hours.abs() * 3600.0 / args.step_seconds).floor() as usize;
    let direction = if args.hours < 0.0 { -1.0 } else { 1.0 };
    let instants: Vec<Instant> = (0..=steps)
        .map(|step| offset_by(&epoch, direction * step as f64 * args.step_seconds))
        .collect();

    log::info!(
        "Propagating {} sample(s) over {} h from {}",
        instants.len(),
        args.hours,
        format_instant(&epoch)
    );

    let states = trajectory.calculate_states_at(&instants)?;
    let records = states
        .iter()
        .map(StateRecord::from_state)
        .collect::<Result<Vec<_>>>()?;

    write_json(&records, args.output.as_deref())
}

pub fn run_passes(args: PassesArgs) -> Result<()> {
    let scenario = load(&args.scenario, args.preset)?;
    let mut orbit = Orbit::new(scenario.trajectory()?);
    if let Some(number) = scenario.initial_revolution_number {
        orbit = orbit.with_initial_revolution_number(number)?;
    }

    let first = orbit.initial_revolution_number();
    let mut passes = Vec::with_capacity(args.count);
    let mut number = first;
    for _ in 0..args.count {
        let pass = orbit.pass_with_revolution_number(number)?;
        log::info!("{}", pass);
        passes.push(PassRecord::from(&pass));
        number = if number == -1 { 1 } else { number + 1 };
    }

    log::info!(
        "Resolved {} pass(es) with {} cached state(s)",
        passes.len(),
        orbit.model().cached_states().len()
    );

    write_json(&passes, args.output.as_deref())
}

/// RFC 3339 text to a satkit instant (UTC)
pub fn parse_epoch(text: &str) -> Result<Instant> {
    let datetime = chrono::DateTime::parse_from_rfc3339(text)
        .with_context(|| format!("invalid epoch '{}'", text))?
        .with_timezone(&chrono::Utc);
    let seconds = datetime.second() as f64 + datetime.nanosecond() as f64 * 1e-9;

    Instant::from_datetime(
        datetime.year(),
        datetime.month() as i32,
        datetime.day() as i32,
        datetime.hour() as i32,
        datetime.minute() as i32,
        seconds,
    )
    .map_err(|e| anyhow!("epoch '{}' out of range: {}", text, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spaceprop::propagation::PassPhase;

    const SCENARIO: &str = r#"{
        "epoch": "2026-01-29T12:00:00Z",
        "position": [7000000.0, 0.0, 0.0],
        "velocity": [0.0, 5335.865450622126, 5335.865450622126]
    }"#;

    #[test]
    fn test_parse_epoch() {
        let instant = parse_epoch("2026-01-29T13:30:15.5+01:00").unwrap();
        assert_eq!(format_instant(&instant), "2026-01-29 12:30:15.500 UTC");
        assert!(parse_epoch("yesterday").is_err());
    }

    #[test]
    fn test_scenario_defaults() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        assert_eq!(scenario.frame, Frame::Gcrf);
        assert_eq!(scenario.settings, PropagationSettings::point_mass());

        let seed = scenario.seed_state().unwrap();
        assert_eq!(seed.size(), 6);
        assert!((seed.radius().unwrap() - 7_000_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_pass_record_from_partial_pass() {
        let pass = Pass {
            revolution_number: -2,
            start: None,
            end: None,
            descending_node: None,
            phase: PassPhase::Partial,
        };
        let record = PassRecord::from(&pass);
        assert!(!record.complete);
        assert!(record.duration_seconds.is_none());
    }
}
