//! Cloth friction acting on the balls.
//!
//! This module implements the `FrictionModel` trait for a ball on billiard cloth:
//!
//! - **Sliding**: kinetic friction opposing the contact-point velocity
//! - **Rolling**: a much smaller rolling resistance opposing the centre velocity
//! - **English**: vertical spin decays on its own and bends the path
//!
//! ## Contact-Point Velocity
//!
//! The cloth touches the ball at r = (0, 0, -R) from its centre, so the
//! contact point moves at u = v + ω × r:
//!
//! ```text
//!   u.x = v.x - R ω.y
//!   u.y = v.y + R ω.x
//! ```
//!
//! u = 0 is pure rolling. Otherwise the ball slides, and friction drives u
//! to zero at 1 + mR²/I times the linear deceleration (7/2 for a solid
//! sphere).

use crate::config::SimulationConfig;
use crate::state::{Ball, MotionState};
use crate::types::constants;

/// Source of the friction laws the integrator applies between collisions.
pub trait FrictionModel {
    /// Linear deceleration magnitude while sliding (m/s²).
    fn sliding_deceleration(&self, ball: &Ball) -> f64;

    /// Linear deceleration magnitude while rolling (m/s²).
    fn rolling_deceleration(&self, ball: &Ball) -> f64;

    /// Exponential decay rate of vertical spin (1/s).
    fn english_decay_rate(&self, _ball: &Ball) -> f64 {
        0.0
    }

    /// Heading change per radian of vertical spin.
    fn curve_coefficient(&self, _ball: &Ball) -> f64 {
        0.0
    }

    /// Contact-point speed above which the ball counts as sliding (m/s).
    fn slip_threshold(&self) -> f64;

    /// Centre speed below which a rolling ball comes to rest (m/s).
    fn rest_speed(&self) -> f64;

    /// Friction regime the ball is currently in.
    fn classify(&self, ball: &Ball) -> MotionState {
        let slip = ball.contact_velocity().magnitude();
        if slip > self.slip_threshold() {
            MotionState::Sliding
        } else if ball.speed() < self.rest_speed() {
            MotionState::Resting
        } else {
            MotionState::Rolling
        }
    }
}

/// Billiard cloth friction built from a validated configuration.
///
/// Decelerations come from each ball's cached friction forces, so a change of
/// configuration must be followed by `BallStore::refresh_friction`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClothFriction {
    spin_decay_rate: f64,
    curve_coefficient: f64,
    slip_threshold: f64,
    rest_speed: f64,
}

impl ClothFriction {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            spin_decay_rate: config.spin_decay_rate,
            curve_coefficient: config.curve_coefficient,
            slip_threshold: config.slip_threshold,
            rest_speed: config.rest_speed,
        }
    }
}

impl Default for ClothFriction {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}

impl FrictionModel for ClothFriction {
    fn sliding_deceleration(&self, ball: &Ball) -> f64 {
        ball.friction().sliding / ball.mass()
    }

    fn rolling_deceleration(&self, ball: &Ball) -> f64 {
        ball.friction().rolling / ball.mass()
    }

    fn english_decay_rate(&self, _ball: &Ball) -> f64 {
        self.spin_decay_rate
    }

    fn curve_coefficient(&self, _ball: &Ball) -> f64 {
        self.curve_coefficient
    }

    fn slip_threshold(&self) -> f64 {
        self.slip_threshold
    }

    fn rest_speed(&self) -> f64 {
        self.rest_speed
    }
}

/// Seconds until a sliding ball starts to roll under deceleration `a`.
pub fn time_to_roll(ball: &Ball, deceleration: f64) -> f64 {
    if deceleration <= constants::EPSILON {
        return f64::INFINITY;
    }
    let k = ball.mass() * ball.radius() * ball.radius() / ball.inertia();
    ball.contact_velocity().magnitude() / ((1.0 + k) * deceleration)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BallId, Vec2, Vec3};
    use approx::assert_relative_eq;

    fn ball_with(velocity: Vec2, spin: Vec3) -> Ball {
        let mut ball = Ball::standard(BallId(0), Vec2::new(1.0, 0.5));
        ball.velocity = velocity;
        ball.spin = spin;
        ball
    }

    #[test]
    fn test_decelerations_follow_coefficients() {
        let friction = ClothFriction::default();
        let ball = ball_with(Vec2::new(1.0, 0.0), Vec3::ZERO);
        assert_relative_eq!(friction.sliding_deceleration(&ball), 0.2 * 9.81, epsilon = 1e-12);
        assert_relative_eq!(friction.rolling_deceleration(&ball), 0.03 * 9.81, epsilon = 1e-12);
    }

    #[test]
    fn test_classify_regimes() {
        let friction = ClothFriction::default();

        // Stun shot: moving, no spin
        let stun = ball_with(Vec2::new(2.0, 0.0), Vec3::ZERO);
        assert_eq!(friction.classify(&stun), MotionState::Sliding);

        // Natural roll
        let mut rolling = ball_with(Vec2::new(2.0, 0.0), Vec3::ZERO);
        rolling.spin = rolling.rolling_spin(rolling.velocity).extend(0.0);
        assert_eq!(friction.classify(&rolling), MotionState::Rolling);

        // Stationary, only English
        let english = ball_with(Vec2::ZERO, Vec3::new(0.0, 0.0, 30.0));
        assert_eq!(friction.classify(&english), MotionState::Resting);

        // Stationary with backspin still slides
        let spinning = ball_with(Vec2::ZERO, Vec3::new(0.0, -20.0, 0.0));
        assert_eq!(friction.classify(&spinning), MotionState::Sliding);
    }

    #[test]
    fn test_time_to_roll_solid_sphere() {
        let friction = ClothFriction::default();
        let ball = ball_with(Vec2::new(2.0, 0.0), Vec3::ZERO);
        let a = friction.sliding_deceleration(&ball);
        // Classic result: t = 2 v0 / (7 μ g)
        assert_relative_eq!(time_to_roll(&ball, a), 2.0 * 2.0 / (7.0 * a), epsilon = 1e-12);
        assert!(time_to_roll(&ball, 0.0).is_infinite());
    }
}
