use crate::types::ParticleId;
use glam::DVec2;

/// Per-particle accumulator for net force during one step.
///
/// For each `ParticleId`, this buffer stores:
///
/// - The sum of all force vectors acting on the particle.
/// - The number of neighbours that were close enough to contribute.
///
/// The buffer is sized once and cleared at the start of every force phase,
/// so no allocation happens at step rate.
#[derive(Debug, Default)]
pub struct ForceBuffer {
    /// Accumulated force for each particle.
    force: Vec<DVec2>,
    /// Number of contributing neighbours for each particle.
    pub count: Vec<u32>,
}

impl ForceBuffer {
    /// Creates a zeroed [`ForceBuffer`] for `len` particles.
    pub fn with_len(len: usize) -> Self {
        Self {
            force: vec![DVec2::ZERO; len],
            count: vec![0; len],
        }
    }

    /// Resizes to exactly `len` entries and clears everything.
    ///
    /// Entries are zeroed even if the length was already correct.
    pub fn ensure_len(&mut self, len: usize) {
        if self.force.len() != len {
            self.force.resize(len, DVec2::ZERO);
            self.count.resize(len, 0);
        }
        self.clear();
    }

    pub fn clear(&mut self) {
        self.force.fill(DVec2::ZERO);
        self.count.fill(0);
    }

    pub fn len(&self) -> usize {
        self.force.len()
    }

    pub fn is_empty(&self) -> bool {
        self.force.is_empty()
    }

    /// Adds one contribution to the particle's net force.
    ///
    /// ### Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    pub fn add(&mut self, id: ParticleId, f: DVec2) {
        self.force[id] += f;
        self.count[id] += 1;
    }

    #[inline]
    pub fn net(&self, id: ParticleId) -> DVec2 {
        self.force[id]
    }

    pub fn forces(&self) -> &[DVec2] {
        &self.force
    }

    /// Mutable views of both arrays, for writers that own disjoint entries.
    pub(crate) fn slots_mut(&mut self) -> (&mut [DVec2], &mut [u32]) {
        (&mut self.force, &mut self.count)
    }
}
