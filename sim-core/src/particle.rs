use glam::DVec2;
use rand::distr::{Distribution, weighted::WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::Config;
use crate::error::{ConfigError, Result, SimError};
use crate::space::Bounds;
use crate::types::TypeId;

/// Canonical particle state, stored as parallel arrays.
///
/// Index `i` in every array belongs to the same particle. The arrays are
/// allocated once and only ever mutated in place.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleState {
    pub(crate) positions: Vec<DVec2>,
    pub(crate) velocities: Vec<DVec2>,
    types: Vec<TypeId>,
    pub(crate) particle_types: usize,
}

impl ParticleState {
    /// Populates `config.particle_count` particles from a ChaCha8 generator
    /// seeded once with `seed`.
    ///
    /// Draw order per particle: position x, position y, velocity x and y
    /// (only when `initial_speed > 0`), then type. The same seed and config
    /// always produce bit-identical state.
    pub fn initialize(config: &Config, seed: u64) -> Result<Self> {
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n = config.particle_count;
        let bounds = config.bounds();
        let types = TypePicker::new(config)?;

        let mut positions = Vec::with_capacity(n);
        let mut velocities = Vec::with_capacity(n);
        let mut type_ids = Vec::with_capacity(n);

        for _ in 0..n {
            let x = rng.random_range(0.0..bounds.size.x);
            let y = rng.random_range(0.0..bounds.size.y);
            positions.push(DVec2::new(x, y));

            let v = if config.initial_speed > 0.0 {
                let s = config.initial_speed;
                DVec2::new(rng.random_range(-s..=s), rng.random_range(-s..=s))
            } else {
                DVec2::ZERO
            };
            velocities.push(v);

            type_ids.push(types.pick(&mut rng));
        }

        log::info!(
            "initialized {} particles of {} types (seed {})",
            n,
            config.particle_types,
            seed
        );

        Ok(Self {
            positions,
            velocities,
            types: type_ids,
            particle_types: config.particle_types,
        })
    }

    /// Builds state from explicit arrays.
    ///
    /// Positions are wrapped into `bounds`. Every type must be below
    /// `particle_types`.
    pub fn from_parts(
        positions: Vec<DVec2>,
        velocities: Vec<DVec2>,
        types: Vec<TypeId>,
        particle_types: usize,
        bounds: Bounds,
    ) -> Result<Self> {
        if positions.len() != velocities.len() || positions.len() != types.len() {
            return Err(ConfigError::StateLength {
                positions: positions.len(),
                velocities: velocities.len(),
                types: types.len(),
            }
            .into());
        }
        if positions.is_empty() {
            return Err(ConfigError::NoParticles.into());
        }
        if let Some((index, &type_id)) = types
            .iter()
            .enumerate()
            .find(|&(_, &t)| t >= particle_types)
        {
            return Err(SimError::OutOfRangeType {
                index,
                type_id,
                particle_types,
            });
        }

        let positions = positions.into_iter().map(|p| bounds.wrap(p)).collect();
        Ok(Self {
            positions,
            velocities,
            types,
            particle_types,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn particle_types(&self) -> usize {
        self.particle_types
    }

    #[inline]
    pub fn positions(&self) -> &[DVec2] {
        &self.positions
    }

    #[inline]
    pub fn velocities(&self) -> &[DVec2] {
        &self.velocities
    }

    #[inline]
    pub fn types(&self) -> &[TypeId] {
        &self.types
    }

    /// Sum of all velocities (every particle has unit mass).
    pub fn total_momentum(&self) -> DVec2 {
        self.velocities.iter().copied().sum()
    }

    pub fn mean_speed(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.velocities.iter().map(|v| v.length()).sum::<f64>() / self.len() as f64
    }

    pub fn max_speed(&self) -> f64 {
        self.velocities
            .iter()
            .map(|v| v.length())
            .fold(0.0, f64::max)
    }
}

/// Draws types either uniformly or from `Config::type_weights`.
enum TypePicker {
    Uniform(usize),
    Weighted(WeightedIndex<f64>),
}

impl TypePicker {
    fn new(config: &Config) -> Result<Self> {
        match &config.type_weights {
            None => Ok(TypePicker::Uniform(config.particle_types)),
            Some(weights) => WeightedIndex::new(weights)
                .map(TypePicker::Weighted)
                .map_err(|_| ConfigError::Weights.into()),
        }
    }

    fn pick(&self, rng: &mut impl Rng) -> TypeId {
        match self {
            TypePicker::Uniform(n) => rng.random_range(0..*n),
            TypePicker::Weighted(dist) => dist.sample(rng),
        }
    }
}
