use thiserror::Error;

use crate::types::{ParticleId, TypeId};

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, SimError>;

/// Problems found while loading or validating a [`crate::config::Config`].
///
/// All of these are reported before any particle array is allocated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("particle_count must be > 0")]
    NoParticles,

    #[error("particle_types must be > 0")]
    NoTypes,

    #[error("interaction matrix must be {expected}x{expected}, got {rows} rows")]
    MatrixRows { expected: usize, rows: usize },

    #[error("interaction matrix row {row} has {len} entries, expected {expected}")]
    MatrixColumns {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[error("interaction matrix entry [{row}][{col}] is not finite")]
    NonFiniteMatrix { row: usize, col: usize },

    #[error("interaction_radius_min must be > 0, got {0}")]
    RadiusMin(f64),

    #[error("interaction_radius_min ({min}) must be < interaction_radius_max ({max})")]
    RadiusOrder { min: f64, max: f64 },

    /// A scalar parameter is outside its allowed range.
    #[error("{name} = {value} is out of range: {expected}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("type_weights must have {expected} entries, got {len}")]
    WeightsLen { expected: usize, len: usize },

    #[error("type_weights must be finite, non-negative and not all zero")]
    Weights,

    #[error("particle arrays disagree in length: {positions} positions, {velocities} velocities, {types} types")]
    StateLength {
        positions: usize,
        velocities: usize,
        types: usize,
    },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Fatal simulation errors.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A position or velocity became NaN or infinite during integration.
    #[error("numeric divergence at step {step}: particle {index} has a non-finite position or velocity")]
    NumericDivergence { step: u64, index: ParticleId },

    #[error("particle {index} has type {type_id}, but only {particle_types} types exist")]
    OutOfRangeType {
        index: ParticleId,
        type_id: TypeId,
        particle_types: usize,
    },

    /// A matrix edit addressed a type outside the matrix.
    #[error("matrix cell ({row}, {col}) is outside a {size}x{size} interaction matrix")]
    MatrixIndex { row: TypeId, col: TypeId, size: usize },

    #[error("interaction value {0} is not finite")]
    NonFiniteInteraction(f64),
}
