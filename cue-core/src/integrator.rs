//! Friction/spin integrator for advancing balls between collisions.
//!
//! Between contacts every force on a ball is constant within its regime, so
//! the motion is integrated in closed form, one regime segment at a time:
//!
//! ```text
//! 1. classify the ball (sliding / rolling / resting)
//! 2. advance analytically until the regime ends or the time runs out
//!      sliding: a = -μs g û, spin driven by the friction torque,
//!               ends when the contact point stops slipping
//!      rolling: a = -μr g v̂, spin kept at the rolling condition,
//!               ends when the centre speed reaches the rest threshold
//! 3. repeat with the time left
//! ```
//!
//! Regime transitions therefore happen at their exact time inside a
//! sub-step rather than at the next collision. Vertical spin decays
//! exponentially over the whole interval and bends the heading as it goes.

use tracing::trace;

use crate::friction::{time_to_roll, FrictionModel};
use crate::state::{Ball, BallDelta, MotionState};
use crate::types::{constants, Vec2, Vec3};

/// Sliding, rolling and resting cover every path through one interval;
/// the extra allowance absorbs round-off at the boundaries.
const MAX_SEGMENTS: usize = 6;

/// Result of advancing one regime segment.
#[derive(Debug, Clone, Copy)]
struct Segment {
    duration: f64,
    position: Vec2,
    velocity: Vec2,
    spin: Vec3,
}

impl Segment {
    fn apply(&self, ball: &mut Ball, delta: &mut BallDelta) {
        ball.position += self.position;
        ball.velocity += self.velocity;
        ball.spin += self.spin;
        delta.position += self.position;
        delta.velocity += self.velocity;
        delta.spin += self.spin;
    }
}

/// Closed-form integrator for cloth friction.
pub struct FrictionIntegrator;

impl FrictionIntegrator {
    /// Advance one ball by `dt` seconds.
    ///
    /// # Returns
    /// The change to apply to the ball, including its regime at the end of
    /// the interval. Inactive balls and non-positive intervals produce no
    /// change.
    pub fn advance<F: FrictionModel>(ball: &Ball, model: &F, dt: f64) -> BallDelta {
        let mut delta = BallDelta::default();
        if !ball.is_active() || !(dt > 0.0) {
            return delta;
        }

        let mut current = *ball;
        let mut remaining = dt;

        for _ in 0..MAX_SEGMENTS {
            if remaining <= 0.0 {
                break;
            }
            let regime = model.classify(&current);
            let segment = match regime {
                MotionState::Sliding => Self::slide(&current, model, remaining),
                MotionState::Rolling => Self::roll(&current, model, remaining),
                MotionState::Resting => Self::rest(&current, remaining),
            };
            segment.apply(&mut current, &mut delta);
            remaining -= segment.duration;

            if regime == MotionState::Resting {
                break;
            }
        }

        let english = Self::decay_english(&current, model, dt);
        current.spin.z += english;
        delta.spin.z += english;

        let motion = model.classify(&current);
        if motion != ball.motion {
            trace!(ball = %ball.id, from = ?ball.motion, to = ?motion, "regime change");
        }
        delta.motion = Some(motion);
        delta
    }

    /// Longest interval over which `ball` stays within `drift` of the straight
    /// line through its current velocity.
    ///
    /// Bounded by ½·a·t² with `a` the friction deceleration of the current
    /// regime plus the sideways pull English puts on the heading. Resting
    /// balls never stray.
    pub fn straight_line_horizon<F: FrictionModel>(ball: &Ball, model: &F, drift: f64) -> f64 {
        if !ball.is_active() {
            return f64::INFINITY;
        }
        let deceleration = match model.classify(ball) {
            MotionState::Sliding => model.sliding_deceleration(ball),
            MotionState::Rolling => model.rolling_deceleration(ball),
            MotionState::Resting => return f64::INFINITY,
        };
        let bend = (model.curve_coefficient(ball) * ball.spin.z).abs() * ball.speed();
        let acceleration = deceleration + bend;
        if acceleration <= constants::EPSILON {
            f64::INFINITY
        } else {
            (2.0 * drift / acceleration).sqrt()
        }
    }

    fn slide<F: FrictionModel>(ball: &Ball, model: &F, remaining: f64) -> Segment {
        let slip_dir = match ball.contact_velocity().try_normalized() {
            Ok(dir) => dir,
            // No slip left to oppose
            Err(_) => return Self::roll(ball, model, remaining),
        };

        let deceleration = model.sliding_deceleration(ball);
        let t_roll = time_to_roll(ball, deceleration);
        let h = remaining.min(t_roll);

        let acc = slip_dir * (-deceleration);
        let new_velocity = Self::curve(ball, model, ball.velocity + acc * h, h);

        // Friction at r = (0, 0, -R): α = (r × F) / I
        let k = ball.mass() * ball.radius() / ball.inertia();
        let mut spin = Vec3::new(k * acc.y * h, -k * acc.x * h, 0.0);
        if h >= t_roll {
            let rolling = ball.rolling_spin(new_velocity);
            spin.x = rolling.x - ball.spin.x;
            spin.y = rolling.y - ball.spin.y;
        }

        Segment {
            duration: h,
            position: ball.velocity * h + acc * (0.5 * h * h),
            velocity: new_velocity - ball.velocity,
            spin,
        }
    }

    fn roll<F: FrictionModel>(ball: &Ball, model: &F, remaining: f64) -> Segment {
        let speed = ball.speed();
        let dir = match ball.velocity.try_normalized() {
            Ok(dir) => dir,
            Err(_) => return Self::rest(ball, remaining),
        };

        let deceleration = model.rolling_deceleration(ball);
        let to_rest = (speed - model.rest_speed()).max(0.0);
        let t_rest = if deceleration > constants::EPSILON {
            to_rest / deceleration
        } else {
            f64::INFINITY
        };
        let h = remaining.min(t_rest);
        let position = dir * (speed * h - 0.5 * deceleration * h * h);

        if h >= t_rest {
            // Snap to rest: no velocity, no rolling spin
            return Segment {
                duration: h,
                position,
                velocity: -ball.velocity,
                spin: Vec3::new(-ball.spin.x, -ball.spin.y, 0.0),
            };
        }

        let new_velocity = Self::curve(ball, model, dir * (speed - deceleration * h), h);
        let rolling = ball.rolling_spin(new_velocity);
        Segment {
            duration: h,
            position,
            velocity: new_velocity - ball.velocity,
            spin: Vec3::new(rolling.x - ball.spin.x, rolling.y - ball.spin.y, 0.0),
        }
    }

    /// Consume the rest of the interval, clearing any leftover motion.
    fn rest(ball: &Ball, remaining: f64) -> Segment {
        Segment {
            duration: remaining,
            position: Vec2::ZERO,
            velocity: -ball.velocity,
            spin: Vec3::new(-ball.spin.x, -ball.spin.y, 0.0),
        }
    }

    /// Turn `velocity` by the heading change English produces over `h`.
    fn curve<F: FrictionModel>(ball: &Ball, model: &F, velocity: Vec2, h: f64) -> Vec2 {
        let angle = model.curve_coefficient(ball) * ball.spin.z * h;
        if angle == 0.0 {
            velocity
        } else {
            velocity.rotated(angle)
        }
    }

    /// Change in vertical spin over `dt`.
    fn decay_english<F: FrictionModel>(ball: &Ball, model: &F, dt: f64) -> f64 {
        let z = ball.spin.z;
        if z == 0.0 {
            return 0.0;
        }
        let decayed = z * (-model.english_decay_rate(ball) * dt).exp();
        if decayed.abs() < constants::ENGLISH_REST {
            -z
        } else {
            decayed - z
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
