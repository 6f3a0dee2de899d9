//! Core types for the billiard simulation.
//!
//! All units are SI:
//! - Position: meters (m), table-plane coordinates
//! - Velocity: meters per second (m/s)
//! - Angular velocity (spin): radians per second (rad/s)
//! - Mass: kilograms (kg)
//! - Impulse: newton-seconds (N·s)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use crate::error::DegenerateVector;

// =============================================================================
// Vec2 - table-plane vector
// =============================================================================

/// A 2D vector in the table plane, used for positions, velocities and impulses.
///
/// Coordinate system:
/// - X: along the table length, from the foot rail (x = 0)
/// - Y: along the table width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared magnitude (avoids sqrt for comparisons)
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Unit vector in the same direction.
    ///
    /// Fails on a zero (or numerically zero) vector; callers substitute a
    /// zero-effect default instead of propagating.
    pub fn try_normalized(&self) -> Result<Self, DegenerateVector> {
        let mag = self.magnitude();
        if mag < constants::EPSILON {
            Err(DegenerateVector)
        } else {
            Ok(*self / mag)
        }
    }

    /// Returns a unit vector in the same direction, or zero if magnitude is zero
    pub fn normalized(&self) -> Self {
        self.try_normalized().unwrap_or(Self::ZERO)
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product of two plane vectors.
    pub fn cross(&self, other: &Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Counter-clockwise perpendicular (rotation by +90°).
    pub fn perp(&self) -> Self {
        Self {
            x: -self.y,
            y: self.x,
        }
    }

    /// Rotate counter-clockwise by `angle` radians.
    pub fn rotated(&self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Lift into 3D with the given vertical component.
    pub fn extend(&self, z: f64) -> Vec3 {
        Vec3::new(self.x, self.y, z)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

impl Div<f64> for Vec2 {
    type Output = Self;
    fn div(self, scalar: f64) -> Self {
        Self {
            x: self.x / scalar,
            y: self.y / scalar,
        }
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl Default for Vec2 {
    fn default() -> Self {
        Self::ZERO
    }
}

// =============================================================================
// Vec3 - spin vector
// =============================================================================

/// A 3D vector, used for angular velocity.
///
/// X and Y are the horizontal spin axes (they drive rolling and sliding);
/// Z is the vertical axis ("English", drives curve and throw).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    pub fn try_normalized(&self) -> Result<Self, DegenerateVector> {
        let mag = self.magnitude();
        if mag < constants::EPSILON {
            Err(DegenerateVector)
        } else {
            Ok(*self / mag)
        }
    }

    pub fn normalized(&self) -> Self {
        self.try_normalized().unwrap_or(Self::ZERO)
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Horizontal (table-plane) part, dropping Z.
    pub fn truncate(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
        self.z -= other.z;
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, scalar: f64) -> Self {
        Self {
            x: self.x / scalar,
            y: self.y / scalar,
            z: self.z / scalar,
        }
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Ball identifier. The cue ball is always `BallId::CUE`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BallId(pub u32);

impl BallId {
    pub const CUE: BallId = BallId(0);
}

impl fmt::Display for BallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ball#{}", self.0)
    }
}

/// Index of a cushion segment in the table's boundary chain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CushionId(pub usize);

/// Index of a pocket zone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PocketId(pub usize);

// =============================================================================
// Contact Events
// =============================================================================

/// What a contact event involves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    /// Two balls, stored with `a < b`.
    BallBall { a: BallId, b: BallId },
    BallCushion { ball: BallId, cushion: CushionId },
    BallPocket { ball: BallId, pocket: PocketId },
}

impl ContactKind {
    /// Builds a ball-ball contact with the pair in canonical order.
    pub fn ball_pair(first: BallId, second: BallId) -> Self {
        if first <= second {
            ContactKind::BallBall {
                a: first,
                b: second,
            }
        } else {
            ContactKind::BallBall {
                a: second,
                b: first,
            }
        }
    }

    /// Resolution priority among simultaneous events (lower goes first).
    pub fn rank(&self) -> u8 {
        match self {
            ContactKind::BallBall { .. } => 0,
            ContactKind::BallCushion { .. } => 1,
            ContactKind::BallPocket { .. } => 2,
        }
    }

    /// Identifier key used to order equal-rank ties.
    pub fn key(&self) -> (u32, u64) {
        match *self {
            ContactKind::BallBall { a, b } => (a.0, u64::from(b.0)),
            ContactKind::BallCushion { ball, cushion } => (ball.0, cushion.0 as u64),
            ContactKind::BallPocket { ball, pocket } => (ball.0, pocket.0 as u64),
        }
    }
}

/// A predicted contact within the current sub-step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    /// Time to contact in seconds, relative to the start of the sub-step.
    pub time: f64,
    pub kind: ContactKind,
}

impl ContactEvent {
    pub fn new(time: f64, kind: ContactKind) -> Self {
        Self { time, kind }
    }
}

// =============================================================================
// Physical Constants
// =============================================================================

pub mod constants {
    /// Small value for floating-point comparisons
    pub const EPSILON: f64 = 1e-10;

    /// Events closer than this (seconds) are treated as simultaneous.
    pub const TIME_EPSILON: f64 = 1e-9;

    /// Surfaces closer than this (m) are in contact.
    pub const CONTACT_TOLERANCE: f64 = 1e-6;

    /// Ball overlap (m) deep enough to be pushed apart even when the balls
    /// are not approaching.
    pub const OVERLAP_SLOP: f64 = 1e-9;

    /// Furthest a ball may stray (m) from the straight line contacts are
    /// predicted along before the prediction is redone.
    pub const PREDICTION_DRIFT: f64 = 5e-4;

    /// English below this (rad/s) is snapped to zero.
    pub const ENGLISH_REST: f64 = 1e-3;

    /// I = k * m * r² for a uniform solid sphere.
    pub const SOLID_SPHERE_INERTIA: f64 = 2.0 / 5.0;

    /// Regulation pool ball: 57.2 mm diameter.
    pub const STANDARD_BALL_RADIUS: f64 = 0.0286;

    /// Regulation pool ball mass (kg).
    pub const STANDARD_BALL_MASS: f64 = 0.17;
}

// =============================================================================
// Tests
// =============================================================================
