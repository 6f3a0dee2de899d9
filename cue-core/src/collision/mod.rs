//! Collision detection and resolution for billiard physics.
//!
//! This module handles:
//! - **Detection**: predicting the earliest contact within a sub-step
//! - **Resolution**: impulse response at the contact, including spin
//!
//! ## Swept Detection
//!
//! Instead of checking whether balls overlap at the end of a step (which
//! misses fast balls entirely), we solve for the time at which their paths
//! first touch during the step.
//!
//! ```text
//! t=0                 t=dt
//!  ●───────────────────●      cue ball
//!            ╲
//!             ●  object ball
//!             └─ first contact at |Δp + Δv·t| = r₁ + r₂
//! ```
//!
//! The step driver then advances everything to that instant, resolves the
//! contact, and asks again with the time left.

pub mod detection;
pub mod resolution;

pub use detection::*;
pub use resolution::*;
