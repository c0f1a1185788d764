//! Force-accumulation phases of a simulation step.
//!
//! A step runs:
//! 1. [`crate::grid::SpatialGrid::rebuild`] buckets particles into cells.
//! 2. [`force_phase`] sums the force every grid neighbour exerts on each
//!    particle into a [`ForceBuffer`].
//! 3. [`crate::integrator::Integrator::step`] turns forces into motion.
//!
//! [`pairwise_phase`] computes the same forces by brute force over all
//! pairs. It is quadratic and exists to check the grid.

use glam::DVec2;
use rayon::prelude::*;

use crate::{
    force::ForceModel, force_buffer::ForceBuffer, grid::SpatialGrid,
    matrix::InteractionMatrix, particle::ParticleState, space::Bounds, types::ParticleId,
};

/// Read-only inputs shared by every particle during the force phase.
#[derive(Clone, Copy)]
pub struct ForceContext<'a> {
    pub particles: &'a ParticleState,
    pub model: &'a ForceModel,
    pub matrix: &'a InteractionMatrix,
    pub bounds: &'a Bounds,
}

impl ForceContext<'_> {
    #[inline]
    fn contribution(&self, target: ParticleId, source: ParticleId) -> Option<DVec2> {
        let pos = self.particles.positions();
        let types = self.particles.types();
        self.model.force_on(
            self.bounds,
            (pos[target], types[target]),
            (pos[source], types[source]),
            self.matrix,
        )
    }
}

/// Accumulates the net force on every particle from its grid neighbours.
///
/// For each particle `i`:
///
/// 1. Enumerate candidates with [`SpatialGrid::neighbors_of`] for the
///    particle's cell.
/// 2. Skip `i` itself and anything beyond `radius_max` (toroidal distance).
/// 3. Add `ForceModel::force_on(i, j)` and count the neighbour.
///
/// Each particle only writes its own slot and sums neighbours in grid order,
/// so the parallel and serial paths produce bit-identical results.
///
/// The buffer is resized (and cleared) to the particle count first via
/// [`ForceBuffer::ensure_len`]. The grid must have been rebuilt from the
/// current positions.
pub fn force_phase(
    ctx: ForceContext<'_>,
    grid: &SpatialGrid,
    acc: &mut ForceBuffer,
    parallel: bool,
) {
    acc.ensure_len(ctx.particles.len());
    let positions = ctx.particles.positions();

    let net_force = |i: ParticleId| -> (DVec2, u32) {
        let mut f = DVec2::ZERO;
        let mut n = 0;
        for j in grid.neighbors_of(grid.cell_of(positions[i])) {
            if j == i {
                continue;
            }
            if let Some(df) = ctx.contribution(i, j) {
                f += df;
                n += 1;
            }
        }
        (f, n)
    };

    let (forces, counts) = acc.slots_mut();
    if parallel {
        forces
            .par_iter_mut()
            .zip(counts.par_iter_mut())
            .enumerate()
            .for_each(|(i, (f, c))| (*f, *c) = net_force(i));
    } else {
        for (i, (f, c)) in forces.iter_mut().zip(counts.iter_mut()).enumerate() {
            (*f, *c) = net_force(i);
        }
    }
}

/// Brute-force O(n²) version of [`force_phase`].
pub fn pairwise_phase(ctx: ForceContext<'_>, acc: &mut ForceBuffer) {
    let n = ctx.particles.len();
    acc.ensure_len(n);
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if let Some(df) = ctx.contribution(i, j) {
                acc.add(i, df);
            }
        }
    }
}
