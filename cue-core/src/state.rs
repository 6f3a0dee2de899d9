//! Ball records and the ball state store.
//!
//! The store owns every ball for the session. Reads are public; all mutation
//! goes through a handful of crate-private entry points used by the step
//! driver, the integrator and the resolver during a tick.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::ConfigError;
use crate::types::{constants, BallId, Vec2, Vec3};

/// Whether a ball still takes part in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallStatus {
    Active,
    /// Dropped into a pocket; kept for scoring and statistics
    Pocketed,
    /// Permanently out of the session
    Removed,
}

/// Friction regime of an active ball.
///
/// ```text
/// SLIDING ──(slip reaches zero)──> ROLLING ──(speed < rest)──> RESTING
///    ^                                │                           │
///    └────────────(collision)─────────┴───────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    Sliding,
    Rolling,
    Resting,
}

/// Friction force magnitudes for one ball (N), derived from its mass and the
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrictionForces {
    pub sliding: f64,
    pub rolling: f64,
}

impl FrictionForces {
    pub fn derive(mass: f64, config: &SimulationConfig) -> Self {
        let weight = mass * config.gravity;
        Self {
            sliding: config.sliding_friction * weight,
            rolling: config.rolling_friction * weight,
        }
    }
}

// =============================================================================
// Ball
// =============================================================================

/// A billiard ball.
///
/// Radius and mass are fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub id: BallId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub spin: Vec3,
    pub status: BallStatus,
    pub motion: MotionState,
    radius: f64,
    mass: f64,
    inertia: f64,
    friction: FrictionForces,
}

impl Ball {
    /// A ball at rest. Fails on a non-positive or non-finite radius or mass.
    pub fn new(id: BallId, position: Vec2, radius: f64, mass: f64) -> Result<Self, ConfigError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "ball radius",
                value: radius,
                reason: "must be greater than zero",
            });
        }
        if !mass.is_finite() || mass <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "ball mass",
                value: mass,
                reason: "must be greater than zero",
            });
        }
        if !position.is_finite() {
            return Err(ConfigError::Rack(format!("{} has a non-finite position", id)));
        }
        Ok(Self {
            id,
            position,
            velocity: Vec2::ZERO,
            spin: Vec3::ZERO,
            status: BallStatus::Active,
            motion: MotionState::Resting,
            radius,
            mass,
            inertia: constants::SOLID_SPHERE_INERTIA * mass * radius * radius,
            friction: FrictionForces::derive(mass, &SimulationConfig::default()),
        })
    }

    /// Regulation-size ball.
    pub fn standard(id: BallId, position: Vec2) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            spin: Vec3::ZERO,
            status: BallStatus::Active,
            motion: MotionState::Resting,
            radius: constants::STANDARD_BALL_RADIUS,
            mass: constants::STANDARD_BALL_MASS,
            inertia: constants::SOLID_SPHERE_INERTIA
                * constants::STANDARD_BALL_MASS
                * constants::STANDARD_BALL_RADIUS
                * constants::STANDARD_BALL_RADIUS,
            friction: FrictionForces::derive(
                constants::STANDARD_BALL_MASS,
                &SimulationConfig::default(),
            ),
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Moment of inertia of a uniform solid sphere
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Cached friction force magnitudes
    pub fn friction(&self) -> FrictionForces {
        self.friction
    }

    pub fn is_active(&self) -> bool {
        self.status == BallStatus::Active
    }

    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }

    /// Velocity of the cloth contact point: v + ω × (0, 0, -r).
    pub fn contact_velocity(&self) -> Vec2 {
        Vec2::new(
            self.velocity.x - self.radius * self.spin.y,
            self.velocity.y + self.radius * self.spin.x,
        )
    }

    /// Horizontal spin that makes `velocity` a pure roll.
    pub fn rolling_spin(&self, velocity: Vec2) -> Vec2 {
        Vec2::new(-velocity.y / self.radius, velocity.x / self.radius)
    }

    /// Translational plus rotational kinetic energy (J).
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.magnitude_squared()
            + 0.5 * self.inertia * self.spin.magnitude_squared()
    }

    /// Linear momentum (kg·m/s).
    pub fn momentum(&self) -> Vec2 {
        self.velocity * self.mass
    }
}

/// Change to one ball's kinematics, produced by the integrator or resolver.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BallDelta {
    pub position: Vec2,
    pub velocity: Vec2,
    pub spin: Vec3,
    pub motion: Option<MotionState>,
}

// =============================================================================
// Ball Store
// =============================================================================

/// Every ball in the session, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct BallStore {
    balls: Vec<Ball>,
    index: HashMap<BallId, usize>,
}

impl BallStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ball. Ids must be unique.
    pub fn insert(&mut self, ball: Ball) -> Result<(), ConfigError> {
        if self.index.contains_key(&ball.id) {
            return Err(ConfigError::Rack(format!("duplicate {}", ball.id)));
        }
        self.index.insert(ball.id, self.balls.len());
        self.balls.push(ball);
        Ok(())
    }

    pub fn get(&self, id: BallId) -> Option<&Ball> {
        self.index.get(&id).map(|&i| &self.balls[i])
    }

    /// All balls in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Ball> {
        self.balls.iter()
    }

    /// Balls still in play, in insertion order.
    pub fn active(&self) -> impl Iterator<Item = &Ball> {
        self.balls.iter().filter(|b| b.is_active())
    }

    pub fn ids(&self) -> Vec<BallId> {
        self.balls.iter().map(|b| b.id).collect()
    }

    pub fn len(&self) -> usize {
        self.balls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }

    fn ball_mut(&mut self, id: BallId) -> Option<&mut Ball> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.balls[i]),
            None => None,
        }
    }

    pub(crate) fn apply_velocity_delta(&mut self, id: BallId, delta: Vec2) {
        if let Some(ball) = self.ball_mut(id) {
            ball.velocity += delta;
        }
    }

    pub(crate) fn apply_spin_delta(&mut self, id: BallId, delta: Vec3) {
        if let Some(ball) = self.ball_mut(id) {
            ball.spin += delta;
        }
    }

    pub(crate) fn apply_position_delta(&mut self, id: BallId, delta: Vec2) {
        if let Some(ball) = self.ball_mut(id) {
            ball.position += delta;
        }
    }

    pub(crate) fn apply_delta(&mut self, id: BallId, delta: &BallDelta) {
        self.apply_position_delta(id, delta.position);
        self.apply_velocity_delta(id, delta.velocity);
        self.apply_spin_delta(id, delta.spin);
        if let Some(motion) = delta.motion {
            self.set_motion(id, motion);
        }
    }

    pub(crate) fn set_status(&mut self, id: BallId, status: BallStatus) {
        if let Some(ball) = self.ball_mut(id) {
            ball.status = status;
        }
    }

    pub(crate) fn set_motion(&mut self, id: BallId, motion: MotionState) {
        if let Some(ball) = self.ball_mut(id) {
            ball.motion = motion;
        }
    }

    /// Overwrite kinematics outright (shot setup, cue ball placement).
    pub(crate) fn set_kinematics(&mut self, id: BallId, position: Vec2, velocity: Vec2, spin: Vec3) {
        if let Some(ball) = self.ball_mut(id) {
            ball.position = position;
            ball.velocity = velocity;
            ball.spin = spin;
        }
    }

    /// Re-derive every ball's cached friction forces.
    pub(crate) fn refresh_friction(&mut self, config: &SimulationConfig) {
        for ball in &mut self.balls {
            ball.friction = FrictionForces::derive(ball.mass, config);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
