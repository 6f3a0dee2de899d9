//! Headless shot analysis.
//!
//! Runs a single shot on a fresh table to completion and reports what
//! happened: sampled trajectories, pocketed balls, contacts and the time the
//! table came to rest. [`sweep`] repeats the same shot across values of one
//! configuration constant, which is what tuning dashboards plot.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SimulationConfig;
use crate::error::BatchError;
use crate::rack::Rack;
use crate::simulation::{ContactTally, PocketedBall, Simulation, Snapshot};
use crate::state::BallStatus;
use crate::table::TableSpec;
use crate::types::{BallId, Vec2, Vec3};

fn cue_ball() -> BallId {
    BallId::CUE
}

/// One strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    #[serde(default = "cue_ball")]
    pub ball: BallId,
    /// Cue impulse (N·s)
    pub impulse: Vec2,
    #[serde(default)]
    pub spin: Vec3,
}

impl Shot {
    /// Strike the cue ball.
    pub fn cue(impulse: Vec2, spin: Vec3) -> Self {
        Self {
            ball: BallId::CUE,
            impulse,
            spin,
        }
    }
}

/// How long to run and how often to sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchRun {
    /// Tick length (s)
    pub tick: f64,
    /// Give up after this long (s)
    pub duration: f64,
    /// Record trajectories every this many ticks
    pub sample_every: u64,
}

impl Default for BatchRun {
    fn default() -> Self {
        Self {
            tick: 1.0 / 120.0,
            duration: 30.0,
            sample_every: 4,
        }
    }
}

impl BatchRun {
    fn validate(&self) -> Result<(), BatchError> {
        if !self.tick.is_finite() || self.tick <= 0.0 {
            return Err(BatchError::Run("tick must be a positive duration"));
        }
        if !self.duration.is_finite() || self.duration < self.tick {
            return Err(BatchError::Run("duration must cover at least one tick"));
        }
        if self.sample_every == 0 {
            return Err(BatchError::Run("sample_every must be at least one"));
        }
        Ok(())
    }
}

/// A ball's sampled position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub time: f64,
    pub position: Vec2,
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub ball: BallId,
    pub points: Vec<TrajectoryPoint>,
}

/// Everything recorded for one shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotReport {
    pub config: SimulationConfig,
    pub shot: Shot,
    pub trajectories: Vec<Trajectory>,
    pub pocketed: Vec<PocketedBall>,
    pub contacts: ContactTally,
    /// When the table came to rest, if it did within the run
    pub settle_time: Option<f64>,
    pub final_state: Snapshot,
}

impl ShotReport {
    pub fn trajectory(&self, ball: BallId) -> Option<&Trajectory> {
        self.trajectories.iter().find(|t| t.ball == ball)
    }

    pub fn was_pocketed(&self, ball: BallId) -> bool {
        self.pocketed.iter().any(|p| p.ball == ball)
    }
}

/// Rack a fresh table, play `shot`, and run until still or out of time.
pub fn run_shot(
    config: &SimulationConfig,
    table: &TableSpec,
    rack: &Rack,
    shot: &Shot,
    run: &BatchRun,
) -> Result<ShotReport, BatchError> {
    run.validate()?;
    let mut sim = Simulation::new(config.clone(), table)?;
    sim.reset_table(rack)?;

    let mut trajectories: Vec<Trajectory> = sim
        .balls()
        .iter()
        .map(|b| Trajectory {
            ball: b.id,
            points: Vec::new(),
        })
        .collect();
    sample(&mut trajectories, &sim.snapshot());

    sim.apply_shot(shot.ball, shot.impulse, shot.spin)?;

    let max_ticks = (run.duration / run.tick).ceil() as u64;
    let mut settle_time = None;
    for tick in 1..=max_ticks {
        let snapshot = sim.advance(run.tick);
        let still = sim.is_still();
        if tick % run.sample_every == 0 || still {
            sample(&mut trajectories, &snapshot);
        }
        if still {
            settle_time = Some(sim.time());
            break;
        }
    }

    info!(
        pocketed = sim.pocketed().len(),
        contacts = sim.contacts().total(),
        settle_time,
        "shot finished"
    );

    Ok(ShotReport {
        config: config.clone(),
        shot: *shot,
        trajectories,
        pocketed: sim.pocketed().to_vec(),
        contacts: sim.contacts(),
        settle_time,
        final_state: sim.snapshot(),
    })
}

/// Append the position of every ball still in play.
fn sample(trajectories: &mut [Trajectory], snapshot: &Snapshot) {
    for trajectory in trajectories.iter_mut() {
        if let Some(ball) = snapshot.ball(trajectory.ball) {
            if ball.status == BallStatus::Active {
                trajectory.points.push(TrajectoryPoint {
                    time: snapshot.time,
                    position: ball.position,
                    speed: ball.velocity.magnitude(),
                });
            }
        }
    }
}

/// Report for one value of a swept constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub value: f64,
    pub report: ShotReport,
}

/// Play the same shot once per value of `parameter`.
///
/// Fails on the first value the configuration rejects.
pub fn sweep(
    base: &SimulationConfig,
    parameter: &str,
    values: &[f64],
    table: &TableSpec,
    rack: &Rack,
    shot: &Shot,
    run: &BatchRun,
) -> Result<Vec<SweepPoint>, BatchError> {
    values
        .iter()
        .map(|&value| {
            let config = base.with_parameter(parameter, value)?;
            let report = run_shot(&config, table, rack, shot, run)?;
            Ok(SweepPoint { value, report })
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
