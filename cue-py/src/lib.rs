//! Python bindings for the cue-core billiard physics engine.
//!
//! Provides a simple Python API for renderers and dashboards:
//!
//! ```python
//! from cue_physics import Simulation
//!
//! sim = Simulation()
//! sim.apply_shot(0, 0.6, 0.0, spin_z=20.0)
//!
//! while not sim.is_still():
//!     sim.advance(1 / 60)
//!     for ball in sim.ball_states():
//!         print(ball["id"], ball["x"], ball["y"])
//! ```

use std::fmt::Display;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use cue_core::config::PARAMETER_NAMES;
use cue_core::presets::PresetLoader;
use cue_core::state::{BallStatus, MotionState};
use cue_core::{BallId, Rack, Simulation as CoreSimulation, SimulationConfig, TableSpec, Vec2, Vec3};

fn value_error<E: Display>(err: E) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn status_name(status: BallStatus) -> &'static str {
    match status {
        BallStatus::Active => "active",
        BallStatus::Pocketed => "pocketed",
        BallStatus::Removed => "removed",
    }
}

fn motion_name(motion: MotionState) -> &'static str {
    match motion {
        MotionState::Sliding => "sliding",
        MotionState::Rolling => "rolling",
        MotionState::Resting => "resting",
    }
}

/// Main simulation class.
///
/// Owns one table session: balls, configuration and clock.
#[pyclass]
pub struct Simulation {
    inner: CoreSimulation,
}

#[pymethods]
impl Simulation {
    /// Create a nine-foot table with default physics and an eight-ball rack.
    #[new]
    fn new() -> PyResult<Self> {
        let mut inner = CoreSimulation::new(SimulationConfig::default(), &TableSpec::nine_foot())
            .map_err(value_error)?;
        inner.reset_table(&Rack::eight_ball()).map_err(value_error)?;
        Ok(Self { inner })
    }

    /// Create a session from YAML presets.
    ///
    /// `path` holds `physics/`, `tables/` and `racks/` subdirectories.
    #[staticmethod]
    #[pyo3(signature = (path, physics="standard", table="nine_foot", rack="eight_ball"))]
    fn from_presets(path: &str, physics: &str, table: &str, rack: &str) -> PyResult<Self> {
        let loader = PresetLoader::new(path);
        let config = loader.load_config(physics).map_err(value_error)?;
        let spec = loader.load_table(table).map_err(value_error)?;
        let rack = loader.load_rack(rack).map_err(value_error)?;

        let mut inner = CoreSimulation::new(config, &spec).map_err(value_error)?;
        inner.reset_table(&rack).map_err(value_error)?;
        Ok(Self { inner })
    }

    /// Current simulation time in seconds.
    #[getter]
    fn time(&self) -> f64 {
        self.inner.time()
    }

    /// Advance simulation by dt seconds. Returns the new time.
    fn advance(&mut self, dt: f64) -> f64 {
        self.inner.advance(dt).time
    }

    /// Strike a ball with an impulse (N·s) and spin (rad/s).
    #[pyo3(signature = (ball, impulse_x, impulse_y, spin_x=0.0, spin_y=0.0, spin_z=0.0))]
    fn apply_shot(
        &mut self,
        ball: u32,
        impulse_x: f64,
        impulse_y: f64,
        spin_x: f64,
        spin_y: f64,
        spin_z: f64,
    ) -> PyResult<()> {
        self.inner
            .apply_shot(
                BallId(ball),
                Vec2::new(impulse_x, impulse_y),
                Vec3::new(spin_x, spin_y, spin_z),
            )
            .map_err(value_error)
    }

    /// Re-rack for eight-ball.
    fn reset_eight_ball(&mut self) -> PyResult<()> {
        self.inner.reset_table(&Rack::eight_ball()).map_err(value_error)
    }

    /// Re-rack for nine-ball.
    fn reset_nine_ball(&mut self) -> PyResult<()> {
        self.inner.reset_table(&Rack::nine_ball()).map_err(value_error)
    }

    /// Ball in hand.
    fn place_cue_ball(&mut self, x: f64, y: f64) -> PyResult<()> {
        self.inner
            .place_cue_ball(Vec2::new(x, y))
            .map_err(value_error)
    }

    /// Current physics constants as a dict.
    fn configuration(&self, py: Python<'_>) -> PyResult<PyObject> {
        let config = self.inner.configuration();
        let dict = PyDict::new(py);
        for &name in PARAMETER_NAMES {
            if let Some(value) = config.parameter(name) {
                dict.set_item(name, value)?;
            }
        }
        Ok(dict.into_any().unbind())
    }

    /// Change one physics constant. Raises ValueError if it is rejected.
    fn set_parameter(&mut self, name: &str, value: f64) -> PyResult<()> {
        self.inner.set_parameter(name, value).map_err(value_error)
    }

    /// Every ball as a dict, in rack order.
    fn ball_states(&self, py: Python<'_>) -> PyResult<Vec<PyObject>> {
        let snapshot = self.inner.snapshot();
        let mut states = Vec::with_capacity(snapshot.balls.len());
        for ball in &snapshot.balls {
            let dict = PyDict::new(py);
            dict.set_item("id", ball.id.0)?;
            dict.set_item("status", status_name(ball.status))?;
            dict.set_item("motion", motion_name(ball.motion))?;
            dict.set_item("x", ball.position.x)?;
            dict.set_item("y", ball.position.y)?;
            dict.set_item("vx", ball.velocity.x)?;
            dict.set_item("vy", ball.velocity.y)?;
            dict.set_item("spin", (ball.spin.x, ball.spin.y, ball.spin.z))?;
            states.push(dict.into_any().unbind());
        }
        Ok(states)
    }

    /// True when no ball will move again without a shot.
    fn is_still(&self) -> bool {
        self.inner.is_still()
    }

    /// Pocketed balls as (ball, pocket, time) tuples.
    fn pocketed(&self) -> Vec<(u32, usize, f64)> {
        self.inner
            .pocketed()
            .iter()
            .map(|p| (p.ball.0, p.pocket.0, p.time))
            .collect()
    }

    /// Table size as (length, width) in meters.
    fn table_size(&self) -> (f64, f64) {
        let size = self.inner.table().bounds().size();
        (size.x, size.y)
    }
}

/// Python module definition.
#[pymodule]
fn cue_physics(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Simulation>()?;
    Ok(())
}
