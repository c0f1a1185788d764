//! The step-driven simulation loop.

use std::sync::mpsc::{self, Receiver, Sender};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    config::Config,
    error::{Result, SimError},
    force::ForceModel,
    force_buffer::ForceBuffer,
    grid::SpatialGrid,
    integrator::Integrator,
    matrix::{InteractionMatrix, MatrixEdit, MatrixEditor},
    particle::ParticleState,
    phases::{self, ForceContext},
    snapshot::Snapshot,
    space::Bounds,
    types::TypeId,
};

/// Owns all simulation state and advances it one tick at a time.
///
/// A call to [`Simulation::step`] runs, in this fixed order:
/// 1. Apply matrix edits staged through a [`MatrixEditor`].
/// 2. Rebuild the [`SpatialGrid`] from current positions.
/// 3. Accumulate per-particle net force with [`phases::force_phase`].
/// 4. Update velocities and wrap positions with [`Integrator::step`].
///
/// and then exposes a [`Snapshot`]. Stopping between two calls never leaves
/// partial state behind.
pub struct Simulation {
    config: Config,
    bounds: Bounds,
    model: ForceModel,
    integrator: Integrator,
    particles: ParticleState,
    matrix: InteractionMatrix,
    grid: SpatialGrid,
    acc: ForceBuffer,
    edits_tx: Sender<MatrixEdit>,
    edits_rx: Receiver<MatrixEdit>,
    step_count: u64,
    time: f64,
}

impl Simulation {
    /// Validates `config` and seeds the particles from `config.seed`.
    ///
    /// Nothing is allocated if the config is rejected.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let particles = ParticleState::initialize(&config, config.seed)?;
        Self::assemble(config, particles)
    }

    /// Starts from explicit particle state.
    ///
    /// `config.particle_count` is replaced by the number of particles given.
    /// Every type must be valid for `config.particle_types`, which also
    /// becomes the state's type count. Positions are wrapped into the
    /// configured world.
    ///
    /// The explicit state is not remembered: [`Simulation::reset`] re-seeds
    /// from `config.seed` like a simulation built with [`Simulation::new`].
    pub fn with_particles(mut config: Config, mut particles: ParticleState) -> Result<Self> {
        config.particle_count = particles.len();
        config.validate()?;

        if let Some((index, &type_id)) = particles
            .types()
            .iter()
            .enumerate()
            .find(|&(_, &t)| t >= config.particle_types)
        {
            return Err(SimError::OutOfRangeType {
                index,
                type_id,
                particle_types: config.particle_types,
            });
        }

        particles.particle_types = config.particle_types;
        let bounds = config.bounds();
        for p in &mut particles.positions {
            *p = bounds.wrap(*p);
        }
        Self::assemble(config, particles)
    }

    fn assemble(config: Config, particles: ParticleState) -> Result<Self> {
        let bounds = config.bounds();
        let model = ForceModel::from_config(&config);
        let matrix = InteractionMatrix::from_rows(&config.interaction_matrix)?;

        let mut grid = SpatialGrid::new();
        grid.rebuild(particles.positions(), model.radius_max, &bounds);
        let (cols, rows) = grid.dims();
        log::info!(
            "spatial grid {}x{} cells of {:.2}x{:.2}",
            cols,
            rows,
            grid.cell_size().x,
            grid.cell_size().y
        );

        let (edits_tx, edits_rx) = mpsc::channel();
        Ok(Self {
            integrator: Integrator::from_config(&config),
            acc: ForceBuffer::with_len(particles.len()),
            config,
            bounds,
            model,
            particles,
            matrix,
            grid,
            edits_tx,
            edits_rx,
            step_count: 0,
            time: 0.0,
        })
    }

    /// Advances the simulation by exactly one tick.
    ///
    /// On [`SimError::NumericDivergence`] the particles are left as they were
    /// before the call, the step counter does not advance, and the caller is
    /// expected to halt.
    pub fn step(&mut self) -> Result<Snapshot<'_>> {
        self.apply_staged_edits();

        let r_max = self.model.radius_max;
        self.grid.rebuild(self.particles.positions(), r_max, &self.bounds);

        let ctx = ForceContext {
            particles: &self.particles,
            model: &self.model,
            matrix: &self.matrix,
            bounds: &self.bounds,
        };
        phases::force_phase(ctx, &self.grid, &mut self.acc, self.config.parallel);

        let next = self.step_count + 1;
        self.integrator
            .step(&mut self.particles, self.acc.forces(), &self.bounds, next)
            .inspect_err(|e| log::error!("{e}"))?;

        self.step_count = next;
        self.time += self.config.dt;
        Ok(self.snapshot())
    }

    /// Runs `steps` ticks, logging progress every `log_every` steps.
    pub fn run(&mut self, steps: u64, log_every: u64) -> Result<()> {
        let log_every = log_every.max(1);
        for _ in 0..steps {
            self.step()?;
            if self.step_count % log_every == 0 {
                log::info!("simulation step {}", self.step_count);
                log::debug!(
                    "step {} | mean speed {:.4} | max speed {:.4} | momentum {:?}",
                    self.step_count,
                    self.particles.mean_speed(),
                    self.particles.max_speed(),
                    self.particles.total_momentum()
                );
            }
        }
        Ok(())
    }

    /// Re-seeds the particles from the config and rewinds time to zero.
    ///
    /// The interaction matrix, including any edits, is kept. State passed to
    /// [`Simulation::with_particles`] is replaced by a seeded one.
    pub fn reset(&mut self) -> Result<()> {
        self.particles = ParticleState::initialize(&self.config, self.config.seed)?;
        self.acc.ensure_len(self.particles.len());
        self.step_count = 0;
        self.time = 0.0;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            step: self.step_count,
            time: self.time,
            world: self.bounds.size,
            positions: self.particles.positions(),
            velocities: self.particles.velocities(),
            types: self.particles.types(),
        }
    }

    /// Sets `matrix[source][target]`. Takes effect from the next step.
    pub fn set_interaction(&mut self, source: TypeId, target: TypeId, value: f64) -> Result<()> {
        self.matrix.set(source, target, value)?;
        log::debug!("interaction ({source}, {target}) set to {value:.3}");
        Ok(())
    }

    /// Redraws the matrix from a generator seeded with `seed`.
    pub fn randomize_matrix(&mut self, seed: u64) {
        self.matrix.randomize(&mut ChaCha8Rng::seed_from_u64(seed));
        log::info!("interaction matrix randomized (seed {seed})");
    }

    /// Zeroes the matrix.
    pub fn reset_matrix(&mut self) {
        self.matrix.reset();
        log::info!("interaction matrix reset to all zeros");
    }

    /// Handle for staging matrix edits from elsewhere, possibly another
    /// thread. Edits are applied at the start of the next step.
    pub fn edit_handle(&self) -> MatrixEditor {
        MatrixEditor::new(self.edits_tx.clone())
    }

    fn apply_staged_edits(&mut self) {
        while let Ok(edit) = self.edits_rx.try_recv() {
            match edit.apply(&mut self.matrix) {
                Ok(()) => log::debug!("applied staged matrix edit {edit:?}"),
                Err(e) => log::warn!("rejected staged matrix edit {edit:?}: {e}"),
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn particles(&self) -> &ParticleState {
        &self.particles
    }

    pub fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    /// Forces computed during the last step.
    pub fn forces(&self) -> &ForceBuffer {
        &self.acc
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn time(&self) -> f64 {
        self.time
    }
}
