//! Simulation session: the step driver and the interface front ends use.
//!
//! ## Event-Driven Stepping
//!
//! ```text
//! advance(tick):
//!   remaining = tick
//!   loop:
//!     span  = min(remaining, prediction horizon)
//!     event = earliest contact within span          (detector)
//!     no event: integrate span, remaining -= span
//!     else:
//!       integrate every ball up to event.time        (friction integrator)
//!       enforce the cushion boundary
//!       resolve event                                (resolver)
//!       remaining -= event.time
//!   until remaining is used up
//! ```
//!
//! Contacts are predicted along straight lines, so the span searched at once
//! is capped where friction or English could have bent some ball's path by
//! more than `PREDICTION_DRIFT`. Regime changes happen inside the
//! integrator, so the driver only deals in contacts. A session owns all of its state; there are no globals, and two
//! sessions given the same configuration, rack and tick sequence produce
//! identical snapshots.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collision::{CollisionDetector, CollisionResolver, ContactOutcome};
use crate::config::SimulationConfig;
use crate::error::{ConfigError, InvariantViolation, ShotError};
use crate::friction::{ClothFriction, FrictionModel};
use crate::integrator::FrictionIntegrator;
use crate::rack::Rack;
use crate::state::{Ball, BallStatus, BallStore, MotionState};
use crate::table::{TableGeometry, TableSpec};
use crate::types::{constants, BallId, PocketId, Vec2, Vec3};

// =============================================================================
// Snapshots and bookkeeping
// =============================================================================

/// One ball as seen by a front end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub id: BallId,
    pub status: BallStatus,
    pub motion: MotionState,
    pub position: Vec2,
    pub velocity: Vec2,
    pub spin: Vec3,
}

impl From<&Ball> for BallSnapshot {
    fn from(ball: &Ball) -> Self {
        Self {
            id: ball.id,
            status: ball.status,
            motion: ball.motion,
            position: ball.position,
            velocity: ball.velocity,
            spin: ball.spin,
        }
    }
}

/// Settled state after a tick, in ball insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: f64,
    pub ticks: u64,
    pub balls: Vec<BallSnapshot>,
}

impl Snapshot {
    pub fn ball(&self, id: BallId) -> Option<&BallSnapshot> {
        self.balls.iter().find(|b| b.id == id)
    }
}

/// A ball that dropped, and when.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PocketedBall {
    pub ball: BallId,
    pub pocket: PocketId,
    /// Session time of the capture (s)
    pub time: f64,
}

/// Contacts resolved since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactTally {
    pub ball_ball: u64,
    pub ball_cushion: u64,
    pub pocketed: u64,
    /// Ticks that hit `max_events_per_tick`
    pub capped_ticks: u64,
}

impl ContactTally {
    pub fn record(&mut self, outcome: &ContactOutcome) {
        match outcome {
            ContactOutcome::BallImpact { .. } => self.ball_ball += 1,
            ContactOutcome::CushionImpact { .. } => self.ball_cushion += 1,
            ContactOutcome::Pocketed { .. } => self.pocketed += 1,
            ContactOutcome::Skipped => {}
        }
    }

    pub fn total(&self) -> u64 {
        self.ball_ball + self.ball_cushion + self.pocketed
    }
}

// =============================================================================
// Simulation
// =============================================================================

/// A billiard session: table, balls, configuration and clock.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    table: TableGeometry,
    balls: BallStore,
    friction: ClothFriction,
    detector: CollisionDetector,
    time: f64,
    ticks: u64,
    pocketed: Vec<PocketedBall>,
    contacts: ContactTally,
}

impl Simulation {
    /// Empty rectangular table. Call [`Simulation::reset_table`] to rack.
    pub fn new(config: SimulationConfig, spec: &TableSpec) -> Result<Self, ConfigError> {
        config.validate()?;
        let table = TableGeometry::from_spec(spec, config.cushion_restitution)?;
        Ok(Self::assemble(config, table))
    }

    /// Empty session on an arbitrary boundary.
    ///
    /// Cushion restitution is taken from the configuration.
    pub fn with_table(config: SimulationConfig, table: TableGeometry) -> Result<Self, ConfigError> {
        config.validate()?;
        let table = table.with_restitution(config.cushion_restitution)?;
        Ok(Self::assemble(config, table))
    }

    fn assemble(config: SimulationConfig, table: TableGeometry) -> Self {
        Self {
            friction: ClothFriction::new(&config),
            config,
            table,
            balls: BallStore::new(),
            detector: CollisionDetector::new(),
            time: 0.0,
            ticks: 0,
            pocketed: Vec::new(),
            contacts: ContactTally::default(),
        }
    }

    // -------------------------------------------------------------------------
    // Stepping
    // -------------------------------------------------------------------------

    /// Advance the session by `tick` seconds and return the settled state.
    ///
    /// Non-positive or non-finite ticks leave the session untouched.
    pub fn advance(&mut self, tick: f64) -> Snapshot {
        if !tick.is_finite() || tick <= 0.0 {
            warn!(tick, "ignoring invalid tick");
            return self.snapshot();
        }

        let mut elapsed = 0.0;
        let mut events = 0usize;
        while elapsed < tick {
            let remaining = tick - elapsed;
            if self.is_still() {
                break;
            }

            if events >= self.config.max_events_per_tick {
                warn!(
                    limit = self.config.max_events_per_tick,
                    remaining, "event limit reached, integrating the rest of the tick"
                );
                self.contacts.capped_ticks += 1;
                self.integrate(remaining);
                break;
            }

            // Straight-line prediction only holds while friction has not
            // bent any path by more than the drift allowance
            let span = remaining.min(self.prediction_horizon());
            let event = match self
                .detector
                .earliest(&self.balls, &self.table, &self.config, span)
            {
                Some(event) => event,
                None => {
                    self.integrate(span);
                    if span >= remaining {
                        break;
                    }
                    elapsed += span;
                    continue;
                }
            };

            self.integrate(event.time);
            elapsed += event.time;
            events += 1;

            let outcome = CollisionResolver::resolve(&mut self.balls, &self.table, &self.config, &event);
            self.contacts.record(&outcome);
            if let ContactOutcome::Pocketed { ball, pocket } = outcome {
                let time = self.time + elapsed;
                info!(%ball, pocket = pocket.0, time, "ball pocketed");
                self.pocketed.push(PocketedBall { ball, pocket, time });
            }
        }

        self.time += tick;
        self.ticks += 1;
        debug!(time = self.time, events, "tick complete");
        self.snapshot()
    }

    /// Span over which every active ball stays close to its predicted line.
    fn prediction_horizon(&self) -> f64 {
        self.balls
            .active()
            .map(|b| {
                FrictionIntegrator::straight_line_horizon(b, &self.friction, constants::PREDICTION_DRIFT)
            })
            .fold(f64::INFINITY, f64::min)
            .max(constants::TIME_EPSILON)
    }

    /// Integrate every active ball by `dt` and enforce the boundary.
    fn integrate(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let ids: Vec<BallId> = self.balls.active().map(|b| b.id).collect();
        for id in ids {
            let delta = match self.balls.get(id) {
                Some(ball) => FrictionIntegrator::advance(ball, &self.friction, dt),
                None => continue,
            };
            self.balls.apply_delta(id, &delta);
            self.enforce_boundary(id);
        }
    }

    /// Clamp a ball that drifted through a cushion back onto the table.
    ///
    /// Balls crossing a pocket zone are exempt.
    fn enforce_boundary(&mut self, id: BallId) {
        let ball = match self.balls.get(id) {
            Some(ball) => *ball,
            None => return,
        };
        if self.table.pocket_containing(ball.position).is_some() {
            return;
        }
        if let Some((corrected, overshoot)) = self.table.containment_correction(
            ball.position,
            ball.radius(),
            self.config.boundary_tolerance,
        ) {
            let violation = InvariantViolation::EscapedBoundary { ball: id, overshoot };
            warn!(%violation, "clamping ball back inside the cushions");
            self.balls.apply_position_delta(id, corrected - ball.position);
        }
    }

    // -------------------------------------------------------------------------
    // Shots and placement
    // -------------------------------------------------------------------------

    /// Strike a ball: velocity becomes `impulse / mass`, spin becomes `spin`.
    pub fn apply_shot(&mut self, id: BallId, impulse: Vec2, spin: Vec3) -> Result<(), ShotError> {
        if !impulse.is_finite() || !spin.is_finite() {
            return Err(ShotError::NonFinite);
        }
        let ball = *self.balls.get(id).ok_or(ShotError::UnknownBall(id))?;
        if !ball.is_active() {
            return Err(ShotError::NotActive(id, ball.status));
        }

        let velocity = impulse / ball.mass();
        self.balls.set_kinematics(id, ball.position, velocity, spin);
        if let Some(struck) = self.balls.get(id) {
            let motion = self.friction.classify(struck);
            self.balls.set_motion(id, motion);
        }
        info!(ball = %id, vx = velocity.x, vy = velocity.y, "shot applied");
        Ok(())
    }

    /// Put the cue ball down at `position` (ball in hand).
    ///
    /// Brings a pocketed cue ball back into play. The spot must be on the
    /// table, outside every pocket zone and clear of other balls.
    pub fn place_cue_ball(&mut self, position: Vec2) -> Result<(), ShotError> {
        let cue = BallId::CUE;
        if !position.is_finite() {
            return Err(ShotError::NonFinite);
        }
        let ball = *self.balls.get(cue).ok_or(ShotError::UnknownBall(cue))?;
        if ball.status == BallStatus::Removed {
            return Err(ShotError::NotActive(cue, ball.status));
        }
        if !self.table.fits(position, ball.radius()) {
            return Err(ShotError::BadPlacement(cue, "outside the cushions"));
        }
        if self.table.pocket_containing(position).is_some() {
            return Err(ShotError::BadPlacement(cue, "inside a pocket"));
        }
        let blocked = self.balls.active().any(|other| {
            other.id != cue
                && (other.position - position).magnitude()
                    < other.radius() + ball.radius() - constants::EPSILON
        });
        if blocked {
            return Err(ShotError::BadPlacement(cue, "overlaps another ball"));
        }

        self.balls.set_kinematics(cue, position, Vec2::ZERO, Vec3::ZERO);
        self.balls.set_status(cue, BallStatus::Active);
        self.balls.set_motion(cue, MotionState::Resting);
        info!(x = position.x, y = position.y, "cue ball placed");
        Ok(())
    }

    /// Take a pocketed object ball out of the session for good.
    pub fn remove_ball(&mut self, id: BallId) -> Result<(), ShotError> {
        let ball = *self.balls.get(id).ok_or(ShotError::UnknownBall(id))?;
        if id == BallId::CUE {
            return Err(ShotError::BadPlacement(id, "the cue ball cannot be removed"));
        }
        if ball.status != BallStatus::Pocketed {
            return Err(ShotError::NotPocketed(id, ball.status));
        }
        self.balls.set_kinematics(id, ball.position, Vec2::ZERO, Vec3::ZERO);
        self.balls.set_status(id, BallStatus::Removed);
        self.balls.set_motion(id, MotionState::Resting);
        Ok(())
    }

    /// Replace every ball with a fresh rack and restart the clock.
    pub fn reset_table(&mut self, rack: &Rack) -> Result<(), ConfigError> {
        let placements = rack.layout(&self.table)?;
        let mut balls = BallStore::new();
        for p in placements {
            balls.insert(Ball::new(p.id, p.position, p.radius, p.mass)?)?;
        }
        balls.refresh_friction(&self.config);

        self.balls = balls;
        self.time = 0.0;
        self.ticks = 0;
        self.pocketed.clear();
        self.contacts = ContactTally::default();
        info!(balls = self.balls.len(), "table racked");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    pub fn configuration(&self) -> &SimulationConfig {
        &self.config
    }

    /// Replace the configuration.
    ///
    /// A configuration that fails validation is rejected and the session
    /// keeps the previous one.
    pub fn set_configuration(&mut self, config: SimulationConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if config.cushion_restitution != self.config.cushion_restitution {
            self.table = self.table.with_restitution(config.cushion_restitution)?;
        }
        self.friction = ClothFriction::new(&config);
        self.balls.refresh_friction(&config);
        info!(?config, "configuration applied");
        self.config = config;
        Ok(())
    }

    /// Change one constant by name.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), ConfigError> {
        let next = self.config.with_parameter(name, value)?;
        self.set_configuration(next)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            time: self.time,
            ticks: self.ticks,
            balls: self.balls.iter().map(BallSnapshot::from).collect(),
        }
    }

    /// True when nothing on the table will move again without a shot.
    ///
    /// Balls left overlapping still have to be pushed apart.
    pub fn is_still(&self) -> bool {
        let resting = self.balls.active().all(|b| {
            b.velocity == Vec2::ZERO
                && b.spin.truncate() == Vec2::ZERO
                && b.spin.z.abs() < constants::ENGLISH_REST
        });
        resting && !self.has_overlap()
    }

    fn has_overlap(&self) -> bool {
        let active: Vec<&Ball> = self.balls.active().collect();
        active.iter().enumerate().any(|(i, a)| {
            active[i + 1..].iter().any(|b| {
                let depth = a.radius() + b.radius() - (a.position - b.position).magnitude();
                depth > constants::OVERLAP_SLOP
            })
        })
    }

    pub fn ball(&self, id: BallId) -> Option<&Ball> {
        self.balls.get(id)
    }

    pub fn balls(&self) -> &BallStore {
        &self.balls
    }

    pub fn table(&self) -> &TableGeometry {
        &self.table
    }

    /// Captures since the last reset, in order.
    pub fn pocketed(&self) -> &[PocketedBall] {
        &self.pocketed
    }

    pub fn contacts(&self) -> ContactTally {
        self.contacts
    }

    /// Session time (s).
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rack::BallPlacement;
    use approx::assert_relative_eq;

    const R: f64 = constants::STANDARD_BALL_RADIUS;

    fn session(rack: Rack) -> Simulation {
        let mut sim = Simulation::new(SimulationConfig::default(), &TableSpec::nine_foot()).unwrap();
        sim.reset_table(&rack).unwrap();
        sim
    }

    fn two_balls(cue: Vec2, object: Vec2) -> Rack {
        Rack::Custom {
            balls: vec![
                BallPlacement::standard(BallId::CUE, cue),
                BallPlacement::standard(BallId(1), object),
            ],
        }
    }

    #[test]
    fn test_invalid_tick_ignored() {
        let mut sim = session(Rack::eight_ball());
        let before = sim.snapshot();
        assert_eq!(sim.advance(0.0), before);
        assert_eq!(sim.advance(-1.0), before);
        assert_eq!(sim.advance(f64::NAN), before);
        assert_eq!(sim.ticks(), 0);
    }

    #[test]
    fn test_still_table_only_advances_clock() {
        let mut sim = session(Rack::eight_ball());
        let before = sim.snapshot();
        let after = sim.advance(0.5);
        assert_eq!(after.balls, before.balls);
        assert_relative_eq!(after.time, 0.5);
        assert_eq!(after.ticks, 1);
    }

    #[test]
    fn test_apply_shot_sets_velocity() {
        let mut sim = session(Rack::eight_ball());
        sim.apply_shot(BallId::CUE, Vec2::new(0.34, 0.0), Vec3::ZERO).unwrap();

        let cue = sim.ball(BallId::CUE).unwrap();
        assert_relative_eq!(cue.velocity.x, 2.0, epsilon = 1e-12);
        assert_eq!(cue.motion, MotionState::Sliding);
        assert!(!sim.is_still());
    }

    #[test]
    fn test_apply_shot_rejections() {
        let mut sim = session(Rack::eight_ball());
        assert_eq!(
            sim.apply_shot(BallId(99), Vec2::new(1.0, 0.0), Vec3::ZERO),
            Err(ShotError::UnknownBall(BallId(99)))
        );
        assert_eq!(
            sim.apply_shot(BallId::CUE, Vec2::new(f64::INFINITY, 0.0), Vec3::ZERO),
            Err(ShotError::NonFinite)
        );
        sim.balls.set_status(BallId(5), BallStatus::Pocketed);
        sim.remove_ball(BallId(5)).unwrap();
        assert_eq!(
            sim.apply_shot(BallId(5), Vec2::new(0.1, 0.0), Vec3::ZERO),
            Err(ShotError::NotActive(BallId(5), BallStatus::Removed))
        );
        assert!(sim.remove_ball(BallId::CUE).is_err());
    }

    #[test]
    fn test_place_cue_ball() {
        let mut sim = session(Rack::eight_ball());
        sim.place_cue_ball(Vec2::new(0.5, 0.3)).unwrap();
        assert_eq!(sim.ball(BallId::CUE).unwrap().position, Vec2::new(0.5, 0.3));

        assert!(matches!(
            sim.place_cue_ball(Vec2::new(-0.1, 0.3)),
            Err(ShotError::BadPlacement(_, _))
        ));
        assert!(matches!(
            sim.place_cue_ball(Vec2::new(1.35, 0.03)),
            Err(ShotError::BadPlacement(_, _))
        ));
        // On top of the apex ball
        assert!(matches!(
            sim.place_cue_ball(Vec2::new(2.025, 0.675)),
            Err(ShotError::BadPlacement(_, _))
        ));
    }

    #[test]
    fn test_set_parameter_rebuilds_cushions() {
        let mut sim = session(Rack::eight_ball());
        sim.set_parameter("cushion_restitution", 0.9).unwrap();
        assert!(sim.table().cushions().iter().all(|c| c.restitution == 0.9));

        sim.set_parameter("sliding_friction", 0.1).unwrap();
        let forces = sim.ball(BallId::CUE).unwrap().friction();
        assert_relative_eq!(forces.sliding, 0.1 * 0.17 * 9.81, epsilon = 1e-12);
    }

    #[test]
    fn test_rejected_configuration_not_applied() {
        let mut sim = session(Rack::eight_ball());
        let before = sim.configuration().clone();
        assert!(sim.set_parameter("ball_restitution", 1.5).is_err());
        assert!(sim.set_parameter("no_such_constant", 1.0).is_err());
        assert_eq!(sim.configuration(), &before);
    }

    #[test]
    fn test_cushion_bounce_keeps_ball_on_table() {
        let mut sim = session(two_balls(Vec2::new(1.0, 0.675), Vec2::new(0.3, 0.3)));
        sim.apply_shot(BallId::CUE, Vec2::new(0.17 * 3.0, 0.0), Vec3::ZERO).unwrap();
        sim.advance(1.0);

        let cue = sim.ball(BallId::CUE).unwrap();
        assert!(cue.velocity.x < 0.0, "Cue ball should be coming back off the rail");
        assert!(sim.table().fits(cue.position, cue.radius()));
        assert_eq!(sim.contacts().ball_cushion, 1);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut sim = session(two_balls(Vec2::new(1.0, 0.675), Vec2::new(0.3, 0.3)));
        sim.apply_shot(BallId::CUE, Vec2::new(0.5, 0.0), Vec3::ZERO).unwrap();
        sim.advance(1.0);
        sim.reset_table(&Rack::nine_ball()).unwrap();

        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.ticks(), 0);
        assert_eq!(sim.contacts(), ContactTally::default());
        assert_eq!(sim.balls().len(), 10);
        assert!(sim.is_still());
    }

    #[test]
    fn test_remove_requires_pocketed_ball() {
        let mut sim = session(Rack::eight_ball());
        assert_eq!(
            sim.remove_ball(BallId(3)),
            Err(ShotError::NotPocketed(BallId(3), BallStatus::Active))
        );
        assert_eq!(sim.ball(BallId(3)).unwrap().status, BallStatus::Active);
        assert_eq!(sim.remove_ball(BallId(99)), Err(ShotError::UnknownBall(BallId(99))));
    }

    #[test]
    fn test_resting_overlap_pushed_apart() {
        let a = Vec2::new(1.0, 0.675);
        let mut sim = session(two_balls(a, Vec2::new(1.2, 0.675)));
        // Leave ball 1 sinking 0.1mm into the cue ball, nothing moving
        let shift = Vec2::new(a.x + 2.0 * R - 1e-4 - 1.2, 0.0);
        sim.balls.apply_position_delta(BallId(1), shift);
        assert!(!sim.is_still());

        sim.advance(1.0 / 120.0);

        let cue = sim.ball(BallId::CUE).unwrap();
        let object = sim.ball(BallId(1)).unwrap();
        let gap = (object.position - cue.position).magnitude() - 2.0 * R;
        assert!(gap > -constants::OVERLAP_SLOP, "Still overlapping by {}", -gap);
        // Equal masses share the correction
        assert_relative_eq!(a.x - cue.position.x, 5e-5, epsilon = 1e-9);
        assert_eq!(cue.velocity, Vec2::ZERO);
        assert_eq!(sim.contacts().ball_ball, 0);
        assert!(sim.is_still());
    }

    #[test]
    fn test_escaped_ball_clamped_inside_cushion() {
        let mut sim = session(two_balls(Vec2::new(2.5, 0.675), Vec2::new(0.3, 0.3)));
        sim.apply_shot(BallId::CUE, Vec2::new(0.0, 0.17 * 0.3), Vec3::ZERO).unwrap();
        // Centre 2mm past the line it may reach on the right rail, running
        // parallel to it so no contact is ever predicted
        let rail = 2.7 - R;
        sim.balls.apply_position_delta(BallId::CUE, Vec2::new(rail + 0.002 - 2.5, 0.0));

        sim.advance(1.0 / 120.0);

        let cue = sim.ball(BallId::CUE).unwrap();
        assert_relative_eq!(cue.position.x, rail, epsilon = 1e-9);
        assert!(sim.table().fits(cue.position, cue.radius()));
        assert!(cue.velocity.y > 0.0);
        assert_eq!(sim.contacts().ball_cushion, 0);
    }
}
