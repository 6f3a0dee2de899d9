//! Physical constants for a simulation session.
//!
//! `SimulationConfig` enumerates every tunable constant with its valid range.
//! It is validated once, when it is loaded or applied; a configuration that
//! fails validation is rejected whole.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunable physical constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Gravitational acceleration (m/s²)
    pub gravity: f64,
    /// Rolling friction coefficient between ball and cloth
    pub rolling_friction: f64,
    /// Sliding (kinetic) friction coefficient between ball and cloth
    pub sliding_friction: f64,
    /// Ball-ball coefficient of restitution
    pub ball_restitution: f64,
    /// Ball-cushion coefficient of restitution
    pub cushion_restitution: f64,
    /// Exponential decay rate of vertical spin (1/s)
    pub spin_decay_rate: f64,
    /// Below this speed a rolling ball comes to rest (m/s)
    pub rest_speed: f64,
    /// Contact-point speed above which a ball is sliding (m/s)
    pub slip_threshold: f64,
    /// Fastest speed at which a pocket still captures a ball (m/s)
    pub pocket_capture_speed: f64,
    /// Ball-ball contact friction, scales the spin-only throw impulse
    pub ball_friction: f64,
    /// Cap on the ball-ball tangential impulse (N·s)
    pub max_tangential_impulse: f64,
    /// Fraction of spin lost per m/s of cushion impact speed
    pub cushion_spin_loss: f64,
    /// Heading change (rad) per radian of vertical spin
    pub curve_coefficient: f64,
    /// Upper bound on resolved contacts within one tick
    pub max_events_per_tick: usize,
    /// How far a centre may cross a cushion line before it is clamped back (m)
    pub boundary_tolerance: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            rolling_friction: 0.03,
            sliding_friction: 0.2,
            ball_restitution: 0.95,
            cushion_restitution: 0.7,
            spin_decay_rate: 0.8,
            rest_speed: 0.01,
            slip_threshold: 0.005,
            pocket_capture_speed: 4.0,
            ball_friction: 0.06,
            max_tangential_impulse: 0.05,
            cushion_spin_loss: 0.1,
            curve_coefficient: 0.002,
            max_events_per_tick: 10_000,
            boundary_tolerance: 1e-6,
        }
    }
}

/// Names accepted by [`SimulationConfig::set_parameter`].
pub const PARAMETER_NAMES: &[&str] = &[
    "gravity",
    "rolling_friction",
    "sliding_friction",
    "ball_restitution",
    "cushion_restitution",
    "spin_decay_rate",
    "rest_speed",
    "slip_threshold",
    "pocket_capture_speed",
    "ball_friction",
    "max_tangential_impulse",
    "cushion_spin_loss",
    "curve_coefficient",
    "max_events_per_tick",
    "boundary_tolerance",
];

enum Range {
    Positive,
    NonNegative,
    Unit,
}

fn check(field: &'static str, value: f64, range: Range) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::Invalid {
            field,
            value,
            reason: "must be finite",
        });
    }
    let (ok, reason) = match range {
        Range::Positive => (value > 0.0, "must be greater than zero"),
        Range::NonNegative => (value >= 0.0, "must not be negative"),
        Range::Unit => ((0.0..=1.0).contains(&value), "must lie in [0, 1]"),
    };
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            value,
            reason,
        })
    }
}

impl SimulationConfig {
    /// Check every constant against its valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check("gravity", self.gravity, Range::Positive)?;
        check("rolling_friction", self.rolling_friction, Range::Unit)?;
        check("sliding_friction", self.sliding_friction, Range::Unit)?;
        check("ball_restitution", self.ball_restitution, Range::Unit)?;
        check("cushion_restitution", self.cushion_restitution, Range::Unit)?;
        check("spin_decay_rate", self.spin_decay_rate, Range::NonNegative)?;
        check("rest_speed", self.rest_speed, Range::Positive)?;
        check("slip_threshold", self.slip_threshold, Range::Positive)?;
        check("pocket_capture_speed", self.pocket_capture_speed, Range::Positive)?;
        check("ball_friction", self.ball_friction, Range::Unit)?;
        check(
            "max_tangential_impulse",
            self.max_tangential_impulse,
            Range::NonNegative,
        )?;
        check("cushion_spin_loss", self.cushion_spin_loss, Range::NonNegative)?;
        check("curve_coefficient", self.curve_coefficient, Range::NonNegative)?;
        check("boundary_tolerance", self.boundary_tolerance, Range::NonNegative)?;
        if self.max_events_per_tick == 0 {
            return Err(ConfigError::Invalid {
                field: "max_events_per_tick",
                value: 0.0,
                reason: "must be at least one",
            });
        }
        Ok(())
    }

    /// Read a constant by name.
    pub fn parameter(&self, name: &str) -> Option<f64> {
        let value = match name {
            "gravity" => self.gravity,
            "rolling_friction" => self.rolling_friction,
            "sliding_friction" => self.sliding_friction,
            "ball_restitution" => self.ball_restitution,
            "cushion_restitution" => self.cushion_restitution,
            "spin_decay_rate" => self.spin_decay_rate,
            "rest_speed" => self.rest_speed,
            "slip_threshold" => self.slip_threshold,
            "pocket_capture_speed" => self.pocket_capture_speed,
            "ball_friction" => self.ball_friction,
            "max_tangential_impulse" => self.max_tangential_impulse,
            "cushion_spin_loss" => self.cushion_spin_loss,
            "curve_coefficient" => self.curve_coefficient,
            "max_events_per_tick" => self.max_events_per_tick as f64,
            "boundary_tolerance" => self.boundary_tolerance,
            _ => return None,
        };
        Some(value)
    }

    /// Copy of this configuration with one constant replaced, validated.
    ///
    /// Used by parameter-tuning front ends that address constants by name.
    pub fn with_parameter(&self, name: &str, value: f64) -> Result<Self, ConfigError> {
        let mut next = self.clone();
        match name {
            "gravity" => next.gravity = value,
            "rolling_friction" => next.rolling_friction = value,
            "sliding_friction" => next.sliding_friction = value,
            "ball_restitution" => next.ball_restitution = value,
            "cushion_restitution" => next.cushion_restitution = value,
            "spin_decay_rate" => next.spin_decay_rate = value,
            "rest_speed" => next.rest_speed = value,
            "slip_threshold" => next.slip_threshold = value,
            "pocket_capture_speed" => next.pocket_capture_speed = value,
            "ball_friction" => next.ball_friction = value,
            "max_tangential_impulse" => next.max_tangential_impulse = value,
            "cushion_spin_loss" => next.cushion_spin_loss = value,
            "curve_coefficient" => next.curve_coefficient = value,
            "boundary_tolerance" => next.boundary_tolerance = value,
            "max_events_per_tick" => {
                if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
                    return Err(ConfigError::Invalid {
                        field: "max_events_per_tick",
                        value,
                        reason: "must be a whole number of at least one",
                    });
                }
                next.max_events_per_tick = value as usize;
            }
            _ => return Err(ConfigError::UnknownParameter(name.to_string())),
        }
        next.validate()?;
        Ok(next)
    }
}

// =============================================================================
// Tests
// =============================================================================
