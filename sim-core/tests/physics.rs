use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use sim_core::{
    Simulation,
    config::Config,
    error::{ConfigError, SimError},
    force::ForceModel,
    force_buffer::ForceBuffer,
    grid::SpatialGrid,
    matrix::InteractionMatrix,
    particle::ParticleState,
    phases::{self, ForceContext},
    space::Bounds,
};

fn base_config(types: usize, matrix: Vec<Vec<f64>>) -> Config {
    Config {
        particle_count: 1,
        particle_types: types,
        interaction_matrix: matrix,
        interaction_radius_min: 1.0,
        interaction_radius_max: 10.0,
        repulsion_strength: 1.0,
        friction: 0.0,
        world_width: 100.0,
        world_height: 100.0,
        dt: 1.0,
        jitter_threshold: 0.0,
        ..Config::default()
    }
}

fn at_rest(positions: Vec<DVec2>, types: Vec<usize>, config: &Config) -> ParticleState {
    let velocities = vec![DVec2::ZERO; positions.len()];
    ParticleState::from_parts(
        positions,
        velocities,
        types,
        config.particle_types,
        config.bounds(),
    )
    .unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

#[test]
fn same_seed_gives_identical_runs() {
    let config = Config {
        particle_count: 300,
        world_width: 400.0,
        world_height: 300.0,
        ..Config::default()
    };
    let mut a = Simulation::new(config.clone()).unwrap();
    let mut b = Simulation::new(config.clone()).unwrap();
    a.run(30, 10).unwrap();
    b.run(30, 10).unwrap();
    assert_eq!(a.particles(), b.particles());

    let mut other = Simulation::new(Config {
        seed: 43,
        ..config
    })
    .unwrap();
    other.run(30, 10).unwrap();
    assert_ne!(a.particles(), other.particles());
}

#[test]
fn parallel_and_serial_runs_are_bit_identical() {
    let config = Config {
        particle_count: 400,
        world_width: 500.0,
        world_height: 350.0,
        initial_speed: 1.0,
        ..Config::default()
    };
    let mut parallel = Simulation::new(Config {
        parallel: true,
        ..config.clone()
    })
    .unwrap();
    let mut serial = Simulation::new(Config {
        parallel: false,
        ..config
    })
    .unwrap();
    for _ in 0..20 {
        parallel.step().unwrap();
        serial.step().unwrap();
    }
    assert_eq!(parallel.particles(), serial.particles());
}

#[test]
fn positions_stay_inside_the_torus() {
    let config = Config {
        particle_count: 500,
        world_width: 120.0,
        world_height: 80.0,
        initial_speed: 5.0,
        friction: 0.0,
        ..Config::default()
    };
    let mut sim = Simulation::new(config).unwrap();
    for _ in 0..50 {
        let snap = sim.step().unwrap();
        let bounds = Bounds { size: snap.world };
        assert!(snap.positions.iter().all(|p| bounds.contains(*p)));
    }
}

#[test]
fn particle_crossing_an_edge_reappears_on_the_other_side() {
    let config = base_config(1, vec![vec![0.0]]);
    let particles = ParticleState::from_parts(
        vec![DVec2::new(99.5, 50.0)],
        vec![DVec2::new(1.0, -0.25)],
        vec![0],
        1,
        config.bounds(),
    )
    .unwrap();
    let mut sim = Simulation::with_particles(config, particles).unwrap();

    let snap = sim.step().unwrap();
    let p = snap.positions[0];
    assert!(close(p.x, 0.5), "{p:?}");
    assert!(close(p.y, 49.75), "{p:?}");
}

#[test]
fn particles_interact_across_the_boundary() {
    let config = base_config(1, vec![vec![1.0]]);
    let particles = at_rest(
        vec![DVec2::new(1.0, 50.0), DVec2::new(99.0, 50.0)],
        vec![0, 0],
        &config,
    );
    let mut sim = Simulation::with_particles(config, particles).unwrap();
    sim.step().unwrap();

    // Wrapped distance 2 on a ramp from 1 to 10 peaking at 5.5.
    let expected = 1.0 - 3.5 / 4.5;
    let forces = sim.forces();
    assert_eq!(forces.count[0], 1);
    assert_eq!(forces.count[1], 1);
    assert!(close(forces.net(0).x, -expected), "{:?}", forces.net(0));
    assert!(close(forces.net(1).x, expected), "{:?}", forces.net(1));
    assert!(close(forces.net(0).y, 0.0));
}

#[test]
fn asymmetric_matrix_changes_total_momentum() {
    let mut matrix = vec![vec![0.0; 2]; 2];
    matrix[0][1] = 5.0;
    let config = base_config(2, matrix);
    let particles = at_rest(
        vec![DVec2::new(40.0, 50.0), DVec2::new(45.0, 50.0)],
        vec![0, 1],
        &config,
    );
    let mut sim = Simulation::with_particles(config, particles).unwrap();
    sim.step().unwrap();

    let v = sim.particles().velocities();
    // Type 1 is pulled toward type 0; type 0 feels nothing back.
    assert_eq!(v[0], DVec2::ZERO);
    let pull = 5.0 * (1.0 - 0.5 / 4.5);
    assert!(close(v[1].x, -pull), "{:?}", v[1]);
    assert!(sim.particles().total_momentum().length() > 1.0);
}

#[test]
fn small_velocities_are_zeroed() {
    let config = Config {
        jitter_threshold: 0.01,
        ..base_config(1, vec![vec![0.0]])
    };
    let start = DVec2::new(20.0, 20.0);
    let particles = ParticleState::from_parts(
        vec![start],
        vec![DVec2::new(0.005, 0.005)],
        vec![0],
        1,
        config.bounds(),
    )
    .unwrap();
    let mut sim = Simulation::with_particles(config, particles).unwrap();
    let snap = sim.step().unwrap();
    assert_eq!(snap.velocities[0], DVec2::ZERO);
    assert_eq!(snap.positions[0], start);
}

#[test]
fn close_particles_repel_whatever_the_matrix_says() {
    for value in [-1.0, 0.0, 1.0] {
        let config = Config {
            interaction_radius_min: 10.0,
            interaction_radius_max: 20.0,
            repulsion_strength: 2.0,
            ..base_config(1, vec![vec![value]])
        };
        let particles = at_rest(
            vec![DVec2::new(50.0, 50.0), DVec2::new(51.0, 50.0)],
            vec![0, 0],
            &config,
        );
        let mut sim = Simulation::with_particles(config, particles).unwrap();
        sim.step().unwrap();

        // 2 * (1 - 1 / 10), pushing the pair apart.
        assert!(close(sim.forces().net(0).x, -1.8), "matrix {value}");
        assert!(close(sim.forces().net(1).x, 1.8), "matrix {value}");
    }
}

#[test]
fn grid_forces_match_brute_force() {
    let cases = [
        (97.0, 53.0, 10.0, 300),
        (1500.0, 900.0, 60.0, 500),
        // 2x2 and 1x1 grids, where neighbour offsets collapse.
        (15.0, 15.0, 6.0, 40),
        (10.0, 10.0, 20.0, 25),
    ];
    let matrix = InteractionMatrix::from_rows(&[
        vec![0.6, -0.4, 1.0],
        vec![0.2, -1.0, 0.3],
        vec![-0.7, 0.9, 0.0],
    ])
    .unwrap();

    for (w, h, r_max, n) in cases {
        let bounds = Bounds::new(w, h);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let positions = (0..n)
            .map(|_| DVec2::new(rng.random_range(0.0..w), rng.random_range(0.0..h)))
            .collect::<Vec<_>>();
        let types = (0..n).map(|_| rng.random_range(0..3)).collect();
        let velocities = vec![DVec2::ZERO; n];
        let particles = ParticleState::from_parts(positions, velocities, types, 3, bounds).unwrap();

        let model = ForceModel {
            radius_min: r_max / 4.0,
            radius_max: r_max,
            repulsion_strength: 1.5,
        };
        let ctx = ForceContext {
            particles: &particles,
            model: &model,
            matrix: &matrix,
            bounds: &bounds,
        };
        let mut grid = SpatialGrid::new();
        grid.rebuild(particles.positions(), model.radius_max, &bounds);

        let mut via_grid = ForceBuffer::default();
        let mut brute = ForceBuffer::default();
        phases::force_phase(ctx, &grid, &mut via_grid, true);
        phases::pairwise_phase(ctx, &mut brute);

        for i in 0..n {
            let (a, b) = (via_grid.net(i), brute.net(i));
            assert!(
                (a - b).length() <= 1e-6 * b.length().max(1.0),
                "{w}x{h} particle {i}: {a:?} vs {b:?}"
            );
            assert_eq!(via_grid.count[i], brute.count[i], "{w}x{h} particle {i}");
        }
    }
}

#[test]
fn sparse_world_far_larger_than_the_radius_runs() {
    let config = Config {
        particle_count: 10,
        world_width: 1e6,
        world_height: 1e6,
        interaction_radius_min: 0.1,
        interaction_radius_max: 1.0,
        ..Config::default()
    };
    config.validate().unwrap();

    let mut sim = Simulation::new(config).unwrap();
    sim.run(3, 1).unwrap();
    assert_eq!(sim.step_count(), 3);
}

#[test]
fn invalid_configs_are_rejected_before_construction() {
    let cases: [(Config, fn(&ConfigError) -> bool); 4] = [
        (
            Config {
                particle_count: 0,
                ..Config::default()
            },
            |e| matches!(e, ConfigError::NoParticles),
        ),
        (
            Config {
                interaction_radius_min: 60.0,
                interaction_radius_max: 60.0,
                ..Config::default()
            },
            |e| matches!(e, ConfigError::RadiusOrder { .. }),
        ),
        (
            Config {
                friction: 1.5,
                ..Config::default()
            },
            |e| matches!(e, ConfigError::OutOfRange { name: "friction", .. }),
        ),
        (
            Config {
                interaction_matrix: vec![vec![0.0; 6]; 5],
                ..Config::default()
            },
            |e| matches!(e, ConfigError::MatrixRows { expected: 6, rows: 5 }),
        ),
    ];

    for (config, expected) in cases {
        match Simulation::new(config) {
            Err(SimError::Config(e)) => assert!(expected(&e), "unexpected error {e}"),
            Err(e) => panic!("wrong error kind: {e}"),
            Ok(_) => panic!("config accepted"),
        }
    }
}

#[test]
fn staged_edit_takes_effect_in_the_next_step() {
    let config = base_config(1, vec![vec![0.0]]);
    let particles = at_rest(
        vec![DVec2::new(40.0, 50.0), DVec2::new(45.5, 50.0)],
        vec![0, 0],
        &config,
    );
    let mut sim = Simulation::with_particles(config, particles).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.forces().net(0), DVec2::ZERO);

    let editor = sim.edit_handle();
    std::thread::spawn(move || {
        assert!(editor.set_interaction(0, 0, 1.0));
    })
    .join()
    .unwrap();

    // Distance 5.5 sits on the ramp peak.
    sim.step().unwrap();
    assert!(close(sim.forces().net(0).x, 1.0), "{:?}", sim.forces().net(0));
}

#[test]
fn divergence_halts_without_touching_state() {
    let config = Config {
        dt: 2.0,
        ..base_config(1, vec![vec![0.0]])
    };
    let particles = ParticleState::from_parts(
        vec![DVec2::new(10.0, 10.0), DVec2::new(60.0, 60.0)],
        vec![DVec2::ZERO, DVec2::new(f64::MAX, 0.0)],
        vec![0, 0],
        1,
        config.bounds(),
    )
    .unwrap();
    let mut sim = Simulation::with_particles(config, particles).unwrap();
    let before = sim.particles().clone();

    let err = sim.step().unwrap_err();
    assert!(matches!(
        err,
        SimError::NumericDivergence { step: 1, index: 1 }
    ));
    assert_eq!(sim.particles(), &before);
    assert_eq!(sim.step_count(), 0);
}
