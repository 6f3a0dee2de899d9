//! Rack layouts: where the balls start.
//!
//! Standard racks are laid out relative to the table bounds, with the apex
//! ball on the foot spot (three quarters of the way down the table) and rows
//! extending away from the cue ball:
//!
//! ```text
//!  cue                    apex
//!   ○                       ●  ●  ●
//!                             ●  ●  ●
//!   ↑ head spot (L/4)       ●  ●  ●
//!                             ●  ●
//!                               ●
//! ```
//!
//! Racks deserialize from YAML with a `kind` tag, so custom layouts can be
//! kept as presets.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::table::TableGeometry;
use crate::types::{constants, BallId, Vec2};

/// Gap between racked balls, as a fraction of the diameter
const RACK_CLEARANCE: f64 = 1.01;

/// Object balls in eight-ball order, row by row from the apex.
const EIGHT_BALL_ORDER: [u32; 15] = [1, 9, 2, 10, 8, 3, 11, 7, 14, 4, 5, 13, 15, 6, 12];
const EIGHT_BALL_ROWS: [usize; 5] = [1, 2, 3, 4, 5];

/// Nine-ball diamond: 1 on the apex, 9 in the middle.
const NINE_BALL_ORDER: [u32; 9] = [1, 2, 3, 4, 9, 5, 6, 7, 8];
const NINE_BALL_ROWS: [usize; 5] = [1, 2, 3, 2, 1];

fn default_radius() -> f64 {
    constants::STANDARD_BALL_RADIUS
}

fn default_mass() -> f64 {
    constants::STANDARD_BALL_MASS
}

/// One ball's starting position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BallPlacement {
    pub id: BallId,
    pub position: Vec2,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_mass")]
    pub mass: f64,
}

impl BallPlacement {
    /// Regulation ball at `position`.
    pub fn standard(id: BallId, position: Vec2) -> Self {
        Self {
            id,
            position,
            radius: default_radius(),
            mass: default_mass(),
        }
    }
}

/// A starting layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rack {
    /// Fifteen-ball triangle. The cue ball defaults to the head spot.
    EightBall {
        #[serde(default)]
        cue_position: Option<Vec2>,
    },
    /// Nine-ball diamond.
    NineBall {
        #[serde(default)]
        cue_position: Option<Vec2>,
    },
    /// Explicit placements. Must include the cue ball.
    Custom { balls: Vec<BallPlacement> },
}

impl Default for Rack {
    fn default() -> Self {
        Rack::EightBall { cue_position: None }
    }
}

impl Rack {
    pub fn eight_ball() -> Self {
        Rack::EightBall { cue_position: None }
    }

    pub fn nine_ball() -> Self {
        Rack::NineBall { cue_position: None }
    }

    /// Placements on `table`, cue ball first.
    ///
    /// Fails if a ball would start off the table, inside a pocket zone, or
    /// overlapping another ball, or if ids repeat or the cue ball is missing.
    pub fn layout(&self, table: &TableGeometry) -> Result<Vec<BallPlacement>, ConfigError> {
        let placements = match self {
            Rack::EightBall { cue_position } => {
                Self::triangle(table, *cue_position, &EIGHT_BALL_ROWS, &EIGHT_BALL_ORDER)
            }
            Rack::NineBall { cue_position } => {
                Self::triangle(table, *cue_position, &NINE_BALL_ROWS, &NINE_BALL_ORDER)
            }
            Rack::Custom { balls } => balls.clone(),
        };
        validate(&placements, table)?;
        Ok(placements)
    }

    fn triangle(
        table: &TableGeometry,
        cue_position: Option<Vec2>,
        rows: &[usize],
        order: &[u32],
    ) -> Vec<BallPlacement> {
        let bounds = table.bounds();
        let size = bounds.size();
        let head_spot = bounds.min + Vec2::new(0.25 * size.x, 0.5 * size.y);
        let foot_spot = bounds.min + Vec2::new(0.75 * size.x, 0.5 * size.y);

        let mut placements = vec![BallPlacement::standard(
            BallId::CUE,
            cue_position.unwrap_or(head_spot),
        )];

        let spacing = 2.0 * default_radius() * RACK_CLEARANCE;
        let row_step = spacing * 3.0_f64.sqrt() / 2.0;
        let mut ids = order.iter();
        for (row, &count) in rows.iter().enumerate() {
            let x = foot_spot.x + row as f64 * row_step;
            for slot in 0..count {
                let offset = (slot as f64 - (count as f64 - 1.0) / 2.0) * spacing;
                if let Some(&id) = ids.next() {
                    placements.push(BallPlacement::standard(
                        BallId(id),
                        Vec2::new(x, foot_spot.y + offset),
                    ));
                }
            }
        }
        placements
    }
}

fn validate(placements: &[BallPlacement], table: &TableGeometry) -> Result<(), ConfigError> {
    if !placements.iter().any(|p| p.id == BallId::CUE) {
        return Err(ConfigError::Rack("no cue ball".to_string()));
    }
    for (i, p) in placements.iter().enumerate() {
        if !p.position.is_finite() || !table.fits(p.position, p.radius) {
            return Err(ConfigError::Rack(format!("{} is off the table", p.id)));
        }
        if table.pocket_containing(p.position).is_some() {
            return Err(ConfigError::Rack(format!("{} starts in a pocket", p.id)));
        }
        for q in &placements[i + 1..] {
            if q.id == p.id {
                return Err(ConfigError::Rack(format!("duplicate {}", p.id)));
            }
            if (q.position - p.position).magnitude() < p.radius + q.radius - constants::EPSILON {
                return Err(ConfigError::Rack(format!("{} overlaps {}", p.id, q.id)));
            }
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
