//! Error types.
//!
//! Only configuration problems and bad shot requests are surfaced to callers.
//! Degenerate geometry and invariant violations are handled inside the engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::state::BallStatus;
use crate::types::BallId;

/// Rejection of a configuration, table description, rack or preset file.
///
/// A rejected configuration is never applied; the caller must supply a
/// corrected one.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("preset not found: {0}")]
    NotFound(String),

    #[error("invalid {field} = {value}: {reason}")]
    Invalid {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("unknown configuration parameter: {0}")]
    UnknownParameter(String),

    #[error("table boundary is not closed: {0}")]
    OpenBoundary(String),

    #[error("invalid rack: {0}")]
    Rack(String),
}

/// A direction was requested from a zero-length vector.
///
/// Arises from exact-zero relative positions or velocities, which are valid
/// physical states; always replaced by a zero-effect default.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot normalize a zero-length vector")]
pub struct DegenerateVector;

/// Numerical drift detected during a tick. Logged and corrected, never returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("negative time-to-contact {time:e}s for {ball}")]
    NegativeContactTime { ball: BallId, time: f64 },

    #[error("{ball} crossed the cushion boundary by {overshoot:e}m")]
    EscapedBoundary { ball: BallId, overshoot: f64 },
}

/// Rejection of a shot or ball placement request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShotError {
    #[error("unknown ball {0}")]
    UnknownBall(BallId),

    #[error("{0} is not on the table ({1:?})")]
    NotActive(BallId, BallStatus),

    #[error("shot parameters must be finite")]
    NonFinite,

    #[error("{0} must be pocketed before it can be removed ({1:?})")]
    NotPocketed(BallId, BallStatus),

    #[error("{0} cannot be placed there: {1}")]
    BadPlacement(BallId, &'static str),
}

/// Failure of a headless batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Shot(#[from] ShotError),

    #[error("invalid run parameters: {0}")]
    Run(&'static str),
}
