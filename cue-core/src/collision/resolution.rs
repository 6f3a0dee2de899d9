//! Collision resolution for billiard physics.
//!
//! Computes post-contact velocity and spin based on:
//! - Coefficient of restitution (ball-ball and per cushion)
//! - Ball-ball contact friction (throw, applied to spin only)
//! - Cushion spin loss proportional to impact speed
//!
//! ## Model Assumptions
//!
//! - **Instantaneous contact**: impulses, no deformation over time.
//! - **Cushions are immovable**: infinite mass, flat, vertical.
//! - **Frictionless normal impact**: the tangential linear velocity of both
//!   balls is unchanged; contact friction only exchanges spin.
//!
//! ## Ball-Ball Impulse
//!
//! ```text
//!         n
//!    ●────────→●
//!    a         b
//!
//!  v_n = (v_b - v_a)·n          (< 0 when closing)
//!  J   = -(1 + e) v_n / (1/m_a + 1/m_b)
//!  v_a -= J n / m_a,  v_b += J n / m_b
//! ```
//!
//! Contacts are predicted along straight lines while friction slows the
//! balls, so a predicted contact may arrive with the surfaces still apart.
//! Such events are skipped and the step driver predicts again from the new
//! state. Every resolution finishes with a post-check so the pair (or ball
//! and cushion) is never left approaching, and with a position correction
//! that removes any overlap.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SimulationConfig;
use crate::state::{Ball, BallStatus, BallStore, MotionState};
use crate::table::TableGeometry;
use crate::types::{
    constants, BallId, ContactEvent, ContactKind, CushionId, PocketId, Vec2, Vec3,
};

/// What resolving a contact did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContactOutcome {
    /// Normal impulse magnitude (N·s) and throw impulse (N·s).
    BallImpact { a: BallId, b: BallId, impulse: f64, throw: f64 },
    CushionImpact { ball: BallId, cushion: CushionId, impact_speed: f64 },
    Pocketed { ball: BallId, pocket: PocketId },
    /// Nothing to do: not touching yet, separating, degenerate, or a ball
    /// no longer in play.
    Skipped,
}

/// Collision resolver for billiards.
pub struct CollisionResolver;

impl CollisionResolver {
    /// Resolve one contact in place.
    ///
    /// # Arguments
    /// * `balls` - Ball store, mutated through its delta entry points
    /// * `table` - Cushions and pockets the event refers to
    /// * `config` - Restitution and friction constants
    /// * `event` - The contact, already integrated up to its time
    pub fn resolve(
        balls: &mut BallStore,
        table: &TableGeometry,
        config: &SimulationConfig,
        event: &ContactEvent,
    ) -> ContactOutcome {
        let outcome = match event.kind {
            ContactKind::BallBall { a, b } => Self::resolve_ball_ball(balls, config, a, b),
            ContactKind::BallCushion { ball, cushion } => {
                Self::resolve_ball_cushion(balls, table, config, ball, cushion)
            }
            ContactKind::BallPocket { ball, pocket } => {
                Self::resolve_pocket(balls, table, ball, pocket)
            }
        };
        debug!(time = event.time, ?outcome, "resolved contact");
        outcome
    }

    fn active_ball(balls: &BallStore, id: BallId) -> Option<Ball> {
        balls.get(id).filter(|b| b.is_active()).copied()
    }

    /// Resolve a ball-ball contact.
    fn resolve_ball_ball(
        balls: &mut BallStore,
        config: &SimulationConfig,
        a_id: BallId,
        b_id: BallId,
    ) -> ContactOutcome {
        let (a, b) = match (Self::active_ball(balls, a_id), Self::active_ball(balls, b_id)) {
            (Some(a), Some(b)) => (a, b),
            _ => return ContactOutcome::Skipped,
        };

        let distance = (b.position - a.position).magnitude();
        if distance - (a.radius() + b.radius()) > constants::CONTACT_TOLERANCE {
            return ContactOutcome::Skipped;
        }

        let normal = match (b.position - a.position).try_normalized() {
            Ok(n) => n,
            Err(e) => {
                debug!(%a_id, %b_id, error = %e, "coincident centres, contact ignored");
                return ContactOutcome::Skipped;
            }
        };

        let inv_a = 1.0 / a.mass();
        let inv_b = 1.0 / b.mass();
        let inv_sum = inv_a + inv_b;

        let mut va = a.velocity;
        let mut vb = b.velocity;
        let closing = (vb - va).dot(&normal);

        let mut impulse = 0.0;
        let mut throw = 0.0;
        if closing < 0.0 {
            // === Normal impulse ===
            impulse = -(1.0 + config.ball_restitution) * closing / inv_sum;
            va -= normal * (impulse * inv_a);
            vb += normal * (impulse * inv_b);

            // === Throw: contact friction on spin only ===
            let (spin_a, spin_b, j_t) = Self::throw_spin(&a, &b, normal, config);
            balls.apply_spin_delta(a_id, spin_a);
            balls.apply_spin_delta(b_id, spin_b);
            throw = j_t;

            // === Post-check ===
            let residual = (vb - va).dot(&normal);
            if residual < 0.0 {
                let fix = -residual / inv_sum;
                va -= normal * (fix * inv_a);
                vb += normal * (fix * inv_b);
            }
        }

        balls.apply_velocity_delta(a_id, va - a.velocity);
        balls.apply_velocity_delta(b_id, vb - b.velocity);

        // === Overlap: heavier ball moves less ===
        let overlap = a.radius() + b.radius() - distance;
        if overlap > 0.0 {
            let total = a.mass() + b.mass();
            balls.apply_position_delta(a_id, normal * (-overlap * b.mass() / total));
            balls.apply_position_delta(b_id, normal * (overlap * a.mass() / total));
        }

        if impulse == 0.0 {
            return ContactOutcome::Skipped;
        }
        balls.set_motion(a_id, MotionState::Sliding);
        balls.set_motion(b_id, MotionState::Sliding);

        ContactOutcome::BallImpact {
            a: a_id,
            b: b_id,
            impulse,
            throw,
        }
    }

    /// Spin changes from ball-ball contact friction.
    ///
    /// Returns the spin deltas for a and b and the tangential impulse.
    fn throw_spin(a: &Ball, b: &Ball, normal: Vec2, config: &SimulationConfig) -> (Vec3, Vec3, f64) {
        let r_a = (normal * a.radius()).extend(0.0);
        let r_b = (normal * -b.radius()).extend(0.0);

        // Surface velocities at the contact point
        let surface_a = a.velocity + a.spin.cross(&r_a).truncate();
        let surface_b = b.velocity + b.spin.cross(&r_b).truncate();
        let slip = surface_b - surface_a;
        let slip_t = slip - normal * slip.dot(&normal);

        let direction = match slip_t.try_normalized() {
            Ok(t) => t,
            Err(_) => return (Vec3::ZERO, Vec3::ZERO, 0.0),
        };

        let reduced_mass = a.mass() * b.mass() / (a.mass() + b.mass());
        let j_t = (config.ball_friction * reduced_mass * slip_t.magnitude())
            .min(config.max_tangential_impulse);

        // Friction drags a along the slip and b against it
        let force = (direction * j_t).extend(0.0);
        let spin_a = r_a.cross(&force) / a.inertia();
        let spin_b = r_b.cross(&-force) / b.inertia();
        (spin_a, spin_b, j_t)
    }

    /// Resolve a ball-cushion contact.
    fn resolve_ball_cushion(
        balls: &mut BallStore,
        table: &TableGeometry,
        config: &SimulationConfig,
        id: BallId,
        cushion_id: CushionId,
    ) -> ContactOutcome {
        let (ball, cushion) = match (Self::active_ball(balls, id), table.cushion(cushion_id)) {
            (Some(ball), Some(cushion)) => (ball, cushion),
            _ => return ContactOutcome::Skipped,
        };
        let normal = cushion.normal;

        let depth = ball.radius() - cushion.signed_distance(ball.position);
        if depth < -constants::CONTACT_TOLERANCE {
            return ContactOutcome::Skipped;
        }
        // Push out of the cushion first
        if depth > 0.0 {
            balls.apply_position_delta(id, normal * depth);
        }

        let v_n = ball.velocity.dot(&normal);
        if v_n >= 0.0 {
            return ContactOutcome::Skipped;
        }
        let impact_speed = -v_n;

        // Reflect the normal component with energy loss; tangent unchanged
        let mut velocity = ball.velocity - normal * (v_n * (1.0 + cushion.restitution));
        let residual = velocity.dot(&normal);
        if residual < 0.0 {
            velocity -= normal * residual;
        }

        let keep = (1.0 - config.cushion_spin_loss * impact_speed).clamp(0.0, 1.0);

        balls.apply_velocity_delta(id, velocity - ball.velocity);
        balls.apply_spin_delta(id, ball.spin * (keep - 1.0));
        balls.set_motion(id, MotionState::Sliding);

        ContactOutcome::CushionImpact {
            ball: id,
            cushion: cushion_id,
            impact_speed,
        }
    }

    /// Drop a ball into a pocket.
    fn resolve_pocket(
        balls: &mut BallStore,
        table: &TableGeometry,
        id: BallId,
        pocket_id: PocketId,
    ) -> ContactOutcome {
        let (ball, pocket) = match (Self::active_ball(balls, id), table.pocket(pocket_id)) {
            (Some(ball), Some(pocket)) => (ball, pocket),
            _ => return ContactOutcome::Skipped,
        };
        let reach = pocket.capture_radius + constants::CONTACT_TOLERANCE;
        if (ball.position - pocket.center).magnitude() > reach {
            return ContactOutcome::Skipped;
        }
        balls.set_kinematics(id, ball.position, Vec2::ZERO, Vec3::ZERO);
        balls.set_status(id, BallStatus::Pocketed);
        balls.set_motion(id, MotionState::Resting);
        ContactOutcome::Pocketed {
            ball: id,
            pocket: pocket_id,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
