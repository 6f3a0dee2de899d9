//! End-to-end behaviour of the step driver.

use approx::assert_relative_eq;
use cue_core::rack::BallPlacement;
use cue_core::state::{BallStatus, MotionState};
use cue_core::types::constants::{PREDICTION_DRIFT, STANDARD_BALL_RADIUS as R};
use cue_core::types::PocketId;
use cue_core::{BallId, Rack, Simulation, SimulationConfig, TableSpec, Vec2, Vec3};

const MASS: f64 = 0.17;
const TICK: f64 = 1.0 / 120.0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn session(config: SimulationConfig, balls: &[(u32, Vec2)]) -> Simulation {
    init_tracing();
    let mut sim = Simulation::new(config, &TableSpec::nine_foot()).unwrap();
    let rack = Rack::Custom {
        balls: balls
            .iter()
            .map(|&(id, position)| BallPlacement::standard(BallId(id), position))
            .collect(),
    };
    sim.reset_table(&rack).unwrap();
    sim
}

fn total_energy(sim: &Simulation) -> f64 {
    sim.balls().active().map(|b| b.kinetic_energy()).sum()
}

/// Inside every cushion line, up to the clamping tolerance.
fn on_table(sim: &Simulation, position: Vec2, radius: f64) -> bool {
    let tolerance = sim.configuration().boundary_tolerance;
    sim.table()
        .containment_correction(position, radius, tolerance)
        .is_none()
}

fn run_until_still(sim: &mut Simulation, limit: f64) {
    while !sim.is_still() && sim.time() < limit {
        sim.advance(TICK);
    }
}

#[test]
fn head_on_equal_mass_exchange() {
    let config = SimulationConfig {
        ball_restitution: 1.0,
        sliding_friction: 0.0,
        rolling_friction: 0.0,
        ..SimulationConfig::default()
    };
    let mut sim = session(
        config,
        &[(0, Vec2::new(1.0, 0.675)), (1, Vec2::new(1.5, 0.675))],
    );
    sim.apply_shot(BallId::CUE, Vec2::new(2.0 * MASS, 0.0), Vec3::ZERO)
        .unwrap();

    let snapshot = sim.advance(0.3);

    let cue = snapshot.ball(BallId::CUE).unwrap();
    let object = snapshot.ball(BallId(1)).unwrap();
    assert_relative_eq!(cue.velocity.x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(object.velocity.x, 2.0, epsilon = 1e-9);
    assert_relative_eq!(object.velocity.y, 0.0, epsilon = 1e-12);
    assert_eq!(sim.contacts().ball_ball, 1);
}

#[test]
fn fast_ball_does_not_tunnel_through_cushion() {
    let mut sim = session(SimulationConfig::default(), &[(0, Vec2::new(1.35, 0.675))]);
    // 50 m/s crosses the whole table several times over in one tick
    sim.apply_shot(BallId::CUE, Vec2::new(50.0 * MASS, 0.0), Vec3::ZERO)
        .unwrap();

    sim.advance(0.1);

    let cue = sim.ball(BallId::CUE).unwrap();
    assert_eq!(cue.status, BallStatus::Active);
    assert!(
        on_table(&sim, cue.position, cue.radius()),
        "Cue ball escaped to {:?}",
        cue.position
    );
    assert!(sim.contacts().ball_cushion >= 1);
}

#[test]
fn identical_runs_are_identical() {
    let run = || {
        init_tracing();
        let mut sim = Simulation::new(SimulationConfig::default(), &TableSpec::nine_foot()).unwrap();
        sim.reset_table(&Rack::eight_ball()).unwrap();
        sim.apply_shot(BallId::CUE, Vec2::new(1.2, 0.01), Vec3::new(0.0, 0.0, 25.0))
            .unwrap();
        (0..240).map(|_| sim.advance(TICK)).collect::<Vec<_>>()
    };

    assert_eq!(run(), run());
}

#[test]
fn rolling_ball_comes_to_rest_in_bounded_time() {
    let config = SimulationConfig::default();
    let v0 = 1.0;
    let bound = v0 / (config.rolling_friction * config.gravity) + TICK;
    let mut sim = session(config, &[(0, Vec2::new(0.5, 0.675))]);
    sim.apply_shot(BallId::CUE, Vec2::new(v0 * MASS, 0.0), Vec3::ZERO)
        .unwrap();

    run_until_still(&mut sim, 10.0);

    assert!(sim.is_still());
    assert!(sim.time() <= bound, "Took {}s, bound {}s", sim.time(), bound);
    let cue = sim.ball(BallId::CUE).unwrap();
    assert_eq!(cue.motion, MotionState::Resting);
    assert_eq!(cue.velocity, Vec2::ZERO);
}

#[test]
fn stun_shot_starts_rolling_on_time() {
    let config = SimulationConfig::default();
    let expected = 2.0 * 2.0 / (7.0 * config.sliding_friction * config.gravity);
    let mut sim = session(config, &[(0, Vec2::new(0.5, 0.675))]);
    sim.apply_shot(BallId::CUE, Vec2::new(2.0 * MASS, 0.0), Vec3::ZERO)
        .unwrap();

    sim.advance(expected - 0.002);
    assert_eq!(sim.ball(BallId::CUE).unwrap().motion, MotionState::Sliding);

    sim.advance(0.004);
    let cue = sim.ball(BallId::CUE).unwrap();
    assert_eq!(cue.motion, MotionState::Rolling);
    assert!(cue.speed() < 2.0 * 5.0 / 7.0);
}

#[test]
fn slow_ball_is_captured_within_the_tick() {
    let mut sim = session(SimulationConfig::default(), &[(0, Vec2::new(0.5, 0.5))]);
    let toward_corner = Vec2::new(-1.0, -1.0).normalized();
    sim.apply_shot(BallId::CUE, toward_corner * (2.0 * MASS), Vec3::ZERO)
        .unwrap();

    sim.advance(1.0);

    let pocketed = sim.pocketed();
    assert_eq!(pocketed.len(), 1);
    assert_eq!(pocketed[0].ball, BallId::CUE);
    assert_eq!(pocketed[0].pocket, PocketId(0));
    assert!(pocketed[0].time < 1.0);

    // Out of play from then on
    let resting = *sim.ball(BallId::CUE).unwrap();
    assert_eq!(resting.status, BallStatus::Pocketed);
    for _ in 0..10 {
        sim.advance(TICK);
    }
    assert_eq!(sim.ball(BallId::CUE).unwrap().position, resting.position);
    assert!(sim.is_still());
    assert!(sim.apply_shot(BallId::CUE, Vec2::new(0.1, 0.0), Vec3::ZERO).is_err());

    // Ball in hand brings it back
    sim.place_cue_ball(Vec2::new(0.675, 0.675)).unwrap();
    assert_eq!(sim.ball(BallId::CUE).unwrap().status, BallStatus::Active);
}

#[test]
fn pocketed_ball_takes_no_contacts() {
    // Ball 1 sits in the jaws of the corner; the cue ball runs through
    // the spot it occupied
    let mut sim = session(
        SimulationConfig::default(),
        &[(0, Vec2::new(0.5, 0.5)), (1, Vec2::new(0.2, 0.2))],
    );
    sim.apply_shot(BallId(1), Vec2::new(-0.5, -0.5) * MASS, Vec3::ZERO)
        .unwrap();
    run_until_still(&mut sim, 5.0);
    assert_eq!(sim.ball(BallId(1)).unwrap().status, BallStatus::Pocketed);

    let before = sim.contacts().ball_ball;
    sim.apply_shot(BallId::CUE, Vec2::new(-1.0, -1.0).normalized() * (1.5 * MASS), Vec3::ZERO)
        .unwrap();
    sim.advance(1.0);
    assert_eq!(sim.contacts().ball_ball, before);
}

#[test]
fn english_curves_the_path() {
    let start = Vec2::new(0.5, 0.675);
    let mut plain = session(SimulationConfig::default(), &[(0, start)]);
    let mut curved = session(SimulationConfig::default(), &[(0, start)]);

    plain
        .apply_shot(BallId::CUE, Vec2::new(1.5 * MASS, 0.0), Vec3::ZERO)
        .unwrap();
    curved
        .apply_shot(BallId::CUE, Vec2::new(1.5 * MASS, 0.0), Vec3::new(0.0, 0.0, 100.0))
        .unwrap();
    plain.advance(0.5);
    curved.advance(0.5);

    let straight = plain.ball(BallId::CUE).unwrap();
    let bent = curved.ball(BallId::CUE).unwrap();
    assert_relative_eq!(straight.position.y, start.y, epsilon = 1e-12);
    assert!(bent.position.y > start.y + 1e-3, "English should bend the path: {:?}", bent.position);
    // English itself decays
    assert!(bent.spin.z < 100.0);
}

#[test]
fn break_shot_never_gains_energy() {
    init_tracing();
    let mut sim = Simulation::new(SimulationConfig::default(), &TableSpec::nine_foot()).unwrap();
    sim.reset_table(&Rack::eight_ball()).unwrap();
    sim.apply_shot(BallId::CUE, Vec2::new(1.4, 0.0), Vec3::ZERO).unwrap();

    let initial = total_energy(&sim);
    run_until_still(&mut sim, 30.0);

    assert!(total_energy(&sim) <= initial);
    for ball in sim.balls().active() {
        assert!(on_table(&sim, ball.position, ball.radius()), "{} off the table", ball.id);
    }
    // No two balls left overlapping
    let active: Vec<_> = sim.balls().active().collect();
    for (i, a) in active.iter().enumerate() {
        for b in &active[i + 1..] {
            let gap = (a.position - b.position).magnitude() - 2.0 * R;
            assert!(gap > -1e-6, "{} and {} overlap by {}", a.id, b.id, -gap);
        }
    }
}

/// Smallest surface gap between any two balls in play (negative when overlapping).
fn tightest_gap(sim: &Simulation) -> f64 {
    let active: Vec<_> = sim.balls().active().collect();
    let mut tightest = f64::INFINITY;
    for (i, a) in active.iter().enumerate() {
        for b in &active[i + 1..] {
            let gap = (a.position - b.position).magnitude() - a.radius() - b.radius();
            tightest = tightest.min(gap);
        }
    }
    tightest
}

#[test]
fn spin_driven_ball_does_not_pass_through_another() {
    // Topspin on a ball at rest: it starts from zero velocity, so nothing
    // ahead of it is on a collision course when the tick begins
    let mut sim = session(
        SimulationConfig::default(),
        &[(0, Vec2::new(1.0, 0.675)), (1, Vec2::new(1.1, 0.675))],
    );
    sim.apply_shot(BallId::CUE, Vec2::ZERO, Vec3::new(0.0, 200.0, 0.0))
        .unwrap();

    sim.advance(1.0);

    let cue = sim.ball(BallId::CUE).unwrap();
    let object = sim.ball(BallId(1)).unwrap();
    assert!(sim.contacts().ball_ball >= 1);
    assert!(object.position.x > 1.1, "Object ball never moved");
    assert!(
        cue.position.x < object.position.x,
        "Cue ball ended up at {:?}, past the object ball at {:?}",
        cue.position,
        object.position
    );
}

#[test]
fn coarse_ticks_keep_balls_apart() {
    init_tracing();
    let mut sim = Simulation::new(SimulationConfig::default(), &TableSpec::nine_foot()).unwrap();
    sim.reset_table(&Rack::eight_ball()).unwrap();
    let impulse = Vec2::new(5.0 * MASS, 0.0).rotated(-0.01);
    sim.apply_shot(BallId::CUE, impulse, Vec3::new(0.0, 300.0, 60.0))
        .unwrap();

    // Pairs may end a tick a little short of a contact that friction
    // brought forward, never deeper than the drift of both balls
    let allowance = 3.0 * PREDICTION_DRIFT;
    while !sim.is_still() && sim.time() < 30.0 {
        sim.advance(0.25);
        let gap = tightest_gap(&sim);
        assert!(gap > -allowance, "Overlap of {}m at t = {}", -gap, sim.time());
    }

    assert!(sim.is_still());
    assert!(tightest_gap(&sim) > -1e-9, "Balls settled overlapping");
}
