//! The asymmetric type-interaction matrix and the edits a UI may stage on it.

use std::sync::mpsc::Sender;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{ConfigError, Result, SimError};
use crate::types::TypeId;

/// Square matrix of signed force coefficients, stored row-major.
///
/// `get(a, b)` is the force type `a` exerts on type `b`. Nothing requires
/// `get(a, b) == get(b, a)`.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionMatrix {
    size: usize,
    values: Vec<f64>,
}

impl InteractionMatrix {
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    /// Builds a matrix from nested rows.
    ///
    /// Rows are expected to have passed [`crate::config::Config::validate`];
    /// a ragged or non-square input is rejected anyway.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let size = rows.len();
        let mut values = Vec::with_capacity(size * size);
        for (row, entries) in rows.iter().enumerate() {
            if entries.len() != size {
                return Err(ConfigError::MatrixColumns {
                    row,
                    len: entries.len(),
                    expected: size,
                }
                .into());
            }
            values.extend_from_slice(entries);
        }
        Ok(Self { size, values })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Force coefficient of `source` acting on `target`.
    ///
    /// ### Panics
    /// Panics if either type is out of range.
    #[inline]
    pub fn get(&self, source: TypeId, target: TypeId) -> f64 {
        debug_assert!(source < self.size && target < self.size);
        self.values[source * self.size + target]
    }

    /// Sets one coefficient.
    ///
    /// Out-of-range indices and non-finite values are rejected and leave
    /// the matrix unchanged.
    pub fn set(&mut self, source: TypeId, target: TypeId, value: f64) -> Result<()> {
        if source >= self.size || target >= self.size {
            return Err(SimError::MatrixIndex {
                row: source,
                col: target,
                size: self.size,
            });
        }
        if !value.is_finite() {
            return Err(SimError::NonFiniteInteraction(value));
        }
        self.values[source * self.size + target] = value;
        Ok(())
    }

    /// Fills every entry with a uniform draw from `[-1, 1]`, row by row.
    pub fn randomize(&mut self, rng: &mut impl Rng) {
        for v in &mut self.values {
            *v = rng.random_range(-1.0..=1.0);
        }
    }

    /// Sets every entry to zero.
    pub fn reset(&mut self) {
        self.values.fill(0.0);
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.values
            .chunks(self.size.max(1))
            .map(<[f64]>::to_vec)
            .collect()
    }
}

/// A change to the interaction matrix requested from outside the loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatrixEdit {
    Set {
        source: TypeId,
        target: TypeId,
        value: f64,
    },
    /// Re-draw every entry from a generator seeded with `seed`.
    Randomize { seed: u64 },
    Reset,
}

impl MatrixEdit {
    pub fn apply(self, matrix: &mut InteractionMatrix) -> Result<()> {
        match self {
            MatrixEdit::Set {
                source,
                target,
                value,
            } => matrix.set(source, target, value),
            MatrixEdit::Randomize { seed } => {
                matrix.randomize(&mut ChaCha8Rng::seed_from_u64(seed));
                Ok(())
            }
            MatrixEdit::Reset => {
                matrix.reset();
                Ok(())
            }
        }
    }
}

/// Cloneable handle for staging matrix edits from another thread.
///
/// Staged edits are applied, in the order they were sent, at the start of
/// the next [`crate::simulation::Simulation::step`]. A step never observes a
/// partially applied edit.
///
/// Each method returns `false` if the simulation has been dropped.
#[derive(Clone, Debug)]
pub struct MatrixEditor {
    tx: Sender<MatrixEdit>,
}

impl MatrixEditor {
    pub(crate) fn new(tx: Sender<MatrixEdit>) -> Self {
        Self { tx }
    }

    pub fn stage(&self, edit: MatrixEdit) -> bool {
        self.tx.send(edit).is_ok()
    }

    pub fn set_interaction(&self, source: TypeId, target: TypeId, value: f64) -> bool {
        self.stage(MatrixEdit::Set {
            source,
            target,
            value,
        })
    }

    pub fn randomize_matrix(&self, seed: u64) -> bool {
        self.stage(MatrixEdit::Randomize { seed })
    }

    pub fn reset_matrix(&self) -> bool {
        self.stage(MatrixEdit::Reset)
    }
}
