//! Swept collision detection.
//!
//! Predicts ball-ball, ball-cushion and ball-pocket contacts assuming every
//! ball moves in a straight line at its current velocity for the rest of the
//! sub-step, and picks the earliest one with a deterministic tie-break.

use tracing::warn;

use crate::config::SimulationConfig;
use crate::error::InvariantViolation;
use crate::state::{Ball, BallStore};
use crate::table::{Cushion, Pocket, TableGeometry};
use crate::types::{constants, ContactEvent, ContactKind};

/// Collision detector for billiard simulation.
#[derive(Debug, Clone)]
pub struct CollisionDetector {
    /// Events closer together than this (seconds) count as simultaneous
    pub time_epsilon: f64,
}

impl Default for CollisionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionDetector {
    pub fn new() -> Self {
        Self {
            time_epsilon: constants::TIME_EPSILON,
        }
    }

    /// Detect the first contact during a sub-step.
    ///
    /// # Arguments
    /// * `balls` - Ball store; only active balls take part
    /// * `table` - Cushions and pockets
    /// * `config` - Supplies the pocket capture speed
    /// * `dt` - Sub-step budget in seconds
    ///
    /// # Returns
    /// The earliest event with `0 <= time <= dt`, or None.
    pub fn earliest(
        &self,
        balls: &BallStore,
        table: &TableGeometry,
        config: &SimulationConfig,
        dt: f64,
    ) -> Option<ContactEvent> {
        merge_earliest(self.candidates(balls, table, config, dt), self.time_epsilon)
    }

    /// Every contact predicted within `dt`, in a fixed order.
    pub fn candidates(
        &self,
        balls: &BallStore,
        table: &TableGeometry,
        config: &SimulationConfig,
        dt: f64,
    ) -> Vec<ContactEvent> {
        let active: Vec<&Ball> = balls.active().collect();
        let mut events = Vec::new();
        let mut keep = |event: ContactEvent| {
            if event.time <= dt {
                events.push(event);
            }
        };

        for (i, a) in active.iter().enumerate() {
            for b in &active[i + 1..] {
                if let Some(time) = ball_ball_time(a, b) {
                    keep(ContactEvent::new(time, ContactKind::ball_pair(a.id, b.id)));
                }
            }
        }

        for ball in &active {
            for cushion in table.cushions() {
                if let Some(time) = ball_cushion_time(ball, cushion) {
                    keep(ContactEvent::new(
                        time,
                        ContactKind::BallCushion {
                            ball: ball.id,
                            cushion: cushion.id,
                        },
                    ));
                }
            }
            for pocket in table.pockets() {
                if let Some(time) = ball_pocket_time(ball, pocket, config.pocket_capture_speed) {
                    keep(ContactEvent::new(
                        time,
                        ContactKind::BallPocket {
                            ball: ball.id,
                            pocket: pocket.id,
                        },
                    ));
                }
            }
        }

        events
    }
}

/// Pick the event to resolve next.
///
/// Among events within `epsilon` of the earliest time, ball-ball contacts
/// go before cushion contacts, which go before pocket captures; equal kinds
/// go in identifier order. The result does not depend on the order of
/// `events`, so partial results computed separately can be merged here.
pub fn merge_earliest<I>(events: I, epsilon: f64) -> Option<ContactEvent>
where
    I: IntoIterator<Item = ContactEvent>,
{
    let events: Vec<ContactEvent> = events
        .into_iter()
        .map(|mut event| {
            if event.time < 0.0 {
                let violation = InvariantViolation::NegativeContactTime {
                    ball: primary_ball(&event.kind),
                    time: event.time,
                };
                warn!(%violation, "clamping contact time to zero");
                event.time = 0.0;
            }
            event
        })
        .collect();

    let first = events.iter().map(|e| e.time).fold(f64::INFINITY, f64::min);
    events
        .into_iter()
        .filter(|e| e.time <= first + epsilon)
        .min_by(|x, y| {
            x.kind
                .rank()
                .cmp(&y.kind.rank())
                .then_with(|| x.kind.key().cmp(&y.kind.key()))
        })
}

fn primary_ball(kind: &ContactKind) -> crate::types::BallId {
    match *kind {
        ContactKind::BallBall { a, .. } => a,
        ContactKind::BallCushion { ball, .. } => ball,
        ContactKind::BallPocket { ball, .. } => ball,
    }
}

/// Time until two balls touch, if they are closing on each other.
///
/// Solves |Δp + Δv·t| = r₁ + r₂ for the smaller root. Balls that already
/// overlap report zero whatever their motion, so the overlap gets corrected.
pub fn ball_ball_time(a: &Ball, b: &Ball) -> Option<f64> {
    let dp = b.position - a.position;
    let dv = b.velocity - a.velocity;
    let reach = a.radius() + b.radius();

    let half_b = dp.dot(&dv);
    if half_b >= 0.0 {
        // Separating or moving in parallel: only a real overlap matters
        let depth = reach - dp.magnitude();
        return (depth > constants::OVERLAP_SLOP).then_some(0.0);
    }

    let c = dp.magnitude_squared() - reach * reach;
    if c <= 0.0 {
        return Some(0.0);
    }

    let a_coef = dv.magnitude_squared();
    let discriminant = half_b * half_b - a_coef * c;
    if discriminant < 0.0 {
        // Closest approach is wider than the contact distance
        return None;
    }

    // c / (-b/2 + √disc) equals the smaller root without cancellation
    Some(c / (-half_b + discriminant.sqrt()))
}

/// Time until a ball reaches a cushion, if it is heading into it.
pub fn ball_cushion_time(ball: &Ball, cushion: &Cushion) -> Option<f64> {
    let approach = -ball.velocity.dot(&cushion.normal);
    if approach <= 0.0 {
        return None;
    }

    let gap = cushion.signed_distance(ball.position) - ball.radius();
    let time = if gap <= 0.0 { 0.0 } else { gap / approach };

    // Contact must land on this segment (padded so corners are not missed)
    let at_contact = ball.position + ball.velocity * time;
    let along = cushion.along(at_contact);
    if along < -ball.radius() || along > cushion.length() + ball.radius() {
        return None;
    }
    Some(time)
}

/// Time until a ball's centre enters a pocket's capture zone.
///
/// Only slow enough balls are captured; faster ones ride over the zone
/// and meet the cushion instead.
pub fn ball_pocket_time(ball: &Ball, pocket: &Pocket, capture_speed: f64) -> Option<f64> {
    if ball.speed() > capture_speed {
        return None;
    }

    let offset = ball.position - pocket.center;
    let c = offset.magnitude_squared() - pocket.capture_radius * pocket.capture_radius;
    if c < 0.0 {
        return Some(0.0);
    }

    let half_b = offset.dot(&ball.velocity);
    if half_b >= 0.0 {
        return None;
    }
    let discriminant = half_b * half_b - ball.velocity.magnitude_squared() * c;
    if discriminant < 0.0 {
        return None;
    }
    Some(c / (-half_b + discriminant.sqrt()))
}

// =============================================================================
// Tests
// =============================================================================
