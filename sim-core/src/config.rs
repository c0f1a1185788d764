//! Run configuration and its JSON file format.
//!
//! A config file has four sections, each optional:
//!
//! ```json
//! {
//!   "simulation_parameters": {
//!     "particle_count": 1500,
//!     "particle_types": 3,
//!     "interaction_matrix": [[0.5, 0.2, -0.3], [-0.1, 0.4, 0.6], [0.3, -0.5, 0.1]],
//!     "interaction_radius_min": 10.0,
//!     "interaction_radius_max": 60.0,
//!     "friction": 0.1,
//!     "seed": 42
//!   },
//!   "run_control": { "log_throttle_steps": 100 },
//!   "logging": { "level": "info", "log_file": "logs/simulation.log" },
//!   "visualization": { "colors": [[255, 0, 0], [0, 255, 0], [0, 0, 255]] }
//! }
//! ```
//!
//! Missing fields fall back to [`Config::default`]. The default matrix is
//! sized for the default type count, so a file that changes
//! `particle_types` must also supply `interaction_matrix`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::space::Bounds;

/// Physics parameters for one run.
///
/// Everything here is fixed once a [`crate::simulation::Simulation`] is
/// built, except the interaction matrix, which is copied into an
/// [`crate::matrix::InteractionMatrix`] that may be edited between steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub particle_count: usize,
    pub particle_types: usize,
    /// `interaction_matrix[a][b]` is the force type `a` exerts on type `b`.
    pub interaction_matrix: Vec<Vec<f64>>,
    pub interaction_radius_min: f64,
    pub interaction_radius_max: f64,
    /// Magnitude of the universal short-range repulsion at zero distance.
    pub repulsion_strength: f64,
    /// Fraction of velocity removed each step, in `[0, 1]`.
    pub friction: f64,
    pub world_width: f64,
    pub world_height: f64,
    pub seed: u64,
    pub dt: f64,
    /// Speeds below this are snapped to zero after friction.
    pub jitter_threshold: f64,
    /// Initial velocity components are drawn from `[-initial_speed, initial_speed]`.
    pub initial_speed: f64,
    /// Relative frequency of each type at initialization; uniform when absent.
    pub type_weights: Option<Vec<f64>>,
    /// Evaluate forces on the rayon thread pool.
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        let particle_types = 6;
        Self {
            particle_count: 1500,
            particle_types,
            interaction_matrix: preset_matrix(particle_types),
            interaction_radius_min: 10.0,
            interaction_radius_max: 60.0,
            repulsion_strength: 1.0,
            friction: 0.1,
            world_width: 1500.0,
            world_height: 900.0,
            seed: 42,
            dt: 1.0,
            jitter_threshold: 0.01,
            initial_speed: 0.0,
            type_weights: None,
            parallel: true,
        }
    }
}

/// A "chase" pattern: every type likes its own kind, is drawn to the next
/// type and pushed away from the previous one. Produces moving clusters
/// without needing a random draw.
pub fn preset_matrix(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|a| {
            (0..n)
                .map(|b| {
                    if a == b {
                        0.6
                    } else if b == (a + 1) % n {
                        0.4
                    } else if (b + 1) % n == a {
                        -0.3
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

impl Config {
    /// Checks every constraint on the parameters.
    ///
    /// This must pass before any simulation state is constructed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::NoParticles);
        }
        if self.particle_types == 0 {
            return Err(ConfigError::NoTypes);
        }

        let n = self.particle_types;
        if self.interaction_matrix.len() != n {
            return Err(ConfigError::MatrixRows {
                expected: n,
                rows: self.interaction_matrix.len(),
            });
        }
        for (row, values) in self.interaction_matrix.iter().enumerate() {
            if values.len() != n {
                return Err(ConfigError::MatrixColumns {
                    row,
                    len: values.len(),
                    expected: n,
                });
            }
            if let Some(col) = values.iter().position(|v| !v.is_finite()) {
                return Err(ConfigError::NonFiniteMatrix { row, col });
            }
        }

        let (r_min, r_max) = (self.interaction_radius_min, self.interaction_radius_max);
        if !(r_min.is_finite() && r_min > 0.0) {
            return Err(ConfigError::RadiusMin(r_min));
        }
        // Written so that a NaN maximum is rejected too.
        if !(r_max.is_finite() && r_min < r_max) {
            return Err(ConfigError::RadiusOrder {
                min: r_min,
                max: r_max,
            });
        }

        positive("world_width", self.world_width)?;
        positive("world_height", self.world_height)?;
        positive("dt", self.dt)?;
        non_negative("repulsion_strength", self.repulsion_strength)?;
        non_negative("jitter_threshold", self.jitter_threshold)?;
        non_negative("initial_speed", self.initial_speed)?;
        if !(0.0..=1.0).contains(&self.friction) {
            return Err(ConfigError::OutOfRange {
                name: "friction",
                value: self.friction,
                expected: "in [0, 1]",
            });
        }

        if let Some(weights) = &self.type_weights {
            if weights.len() != n {
                return Err(ConfigError::WeightsLen {
                    expected: n,
                    len: weights.len(),
                });
            }
            let valid = weights.iter().all(|w| w.is_finite() && *w >= 0.0);
            if !valid || weights.iter().sum::<f64>() <= 0.0 {
                return Err(ConfigError::Weights);
            }
        }

        Ok(())
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.world_width, self.world_height)
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            expected: "finite and > 0",
        })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            expected: "finite and >= 0",
        })
    }
}

/// Settings for the outer run loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunControl {
    /// Progress is logged once every this many steps.
    pub log_throttle_steps: u64,
    /// Stop after this many steps; run until closed when absent.
    pub max_steps: Option<u64>,
}

impl Default for RunControl {
    fn default() -> Self {
        Self {
            log_throttle_steps: 100,
            max_steps: None,
        }
    }
}

/// Default line layout for log records.
pub const DEFAULT_LOG_FORMAT: &str = "{time} - {level} - {message}";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `env_logger` filter string such as `"info"` or `"sim_core=debug"`.
    pub level: String,
    /// Record layout. `{time}`, `{level}`, `{target}` and `{message}` are
    /// replaced; anything else is copied through.
    pub format: String,
    /// Records are also appended here, rotating at 1 MiB with five backups.
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: DEFAULT_LOG_FORMAT.to_owned(),
            log_file: None,
        }
    }
}

/// Display settings read by the viewer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    /// One RGB colour per particle type. Padded from the built-in palette
    /// when short and truncated when long.
    pub colors: Option<Vec<[u8; 3]>>,
}

/// Top-level layout of a JSON config file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub simulation_parameters: Config,
    pub run_control: RunControl,
    pub logging: LoggingConfig,
    pub visualization: VisualizationConfig,
}

impl ConfigFile {
    /// Parses a config file from JSON text and validates the physics section.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(text)?;
        file.simulation_parameters.validate()?;
        Ok(file)
    }

    /// Reads and validates a config file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::info!("loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let file = Self::from_json_str(&text)?;
        log::info!("configuration loaded");
        Ok(file)
    }
}
