/// Identifier for a particle in a [`crate::particle::ParticleState`].
///
/// This is an index into the state arrays. Particles are never created or
/// destroyed after initialization, so an id stays valid for the whole run.
pub type ParticleId = usize;

/// Particle type (species), an index in `[0, particle_types)`.
pub type TypeId = usize;
