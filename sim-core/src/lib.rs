//! Core particle-life physics on a 2-D torus.
//!
//! Main components:
//! - [`config`]: run parameters, validation and the JSON config file.
//! - [`space`]: the periodic world and its minimum-image distance.
//! - [`particle`]: particle arrays and seeded initialization.
//! - [`matrix`]: the asymmetric type-to-type interaction matrix.
//! - [`grid`]: uniform spatial hash for neighbour search.
//! - [`force`]: the piecewise-linear force law.
//! - [`force_buffer`]: per-particle force accumulation.
//! - [`phases`]: the force phase of a step.
//! - [`integrator`]: velocity and position update.
//! - [`simulation`]: the step loop tying it all together.
//! - [`snapshot`]: read-only views of the state for renderers.

pub mod config;
pub mod error;
pub mod force;
pub mod force_buffer;
pub mod grid;
pub mod integrator;
pub mod matrix;
pub mod particle;
pub mod phases;
pub mod simulation;
pub mod snapshot;
pub mod space;
pub mod types;

pub use config::{Config, ConfigFile, LoggingConfig, VisualizationConfig};
pub use error::{ConfigError, Result, SimError};
pub use matrix::{InteractionMatrix, MatrixEdit, MatrixEditor};
pub use simulation::Simulation;
pub use snapshot::{Frame, Snapshot};
