//! # Cue Core
//!
//! A physics engine for pocket billiards.
//!
//! ## Architecture
//!
//! - `types`: Core data structures (Vec2, Vec3, identifiers, contact events)
//! - `table`: Cushion segments, pocket zones and table validation
//! - `state`: Ball records and the ball store
//! - `friction`: Cloth friction model (sliding, rolling, English)
//! - `integrator`: Closed-form motion between contacts
//! - `collision`: Swept detection and impulse resolution
//! - `simulation`: Event-driven step driver and session API
//! - `rack`: Starting layouts
//! - `presets`: YAML-based configuration loader
//! - `batch`: Headless shot runs and parameter sweeps
//!
//! ## Example
//!
//! ```
//! use cue_core::{Rack, Simulation, SimulationConfig, TableSpec, BallId, Vec2, Vec3};
//!
//! let mut sim = Simulation::new(SimulationConfig::default(), &TableSpec::nine_foot())?;
//! sim.reset_table(&Rack::eight_ball())?;
//! sim.apply_shot(BallId::CUE, Vec2::new(0.6, 0.0), Vec3::ZERO)?;
//!
//! while !sim.is_still() && sim.time() < 30.0 {
//!     sim.advance(1.0 / 60.0);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod batch;
pub mod collision;
pub mod config;
pub mod error;
pub mod friction;
pub mod integrator;
pub mod presets;
pub mod rack;
pub mod simulation;
pub mod state;
pub mod table;
pub mod types;

pub use config::SimulationConfig;
pub use error::{BatchError, ConfigError, ShotError};
pub use rack::Rack;
pub use simulation::{Simulation, Snapshot};
pub use table::{TableGeometry, TableSpec};
pub use types::{BallId, Vec2, Vec3};
