use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::types::TypeId;

/// Read-only view of the particle arrays after a step.
///
/// Borrowing the simulation guarantees that nothing advances it while a
/// renderer holds the view.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot<'a> {
    pub step: u64,
    pub time: f64,
    pub world: DVec2,
    pub positions: &'a [DVec2],
    pub velocities: &'a [DVec2],
    pub types: &'a [TypeId],
}

impl Snapshot<'_> {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Copies the view into an owned [`Frame`] that can cross threads or be
    /// written to disk.
    pub fn to_frame(&self) -> Frame {
        Frame {
            step: self.step,
            time: self.time,
            world: self.world,
            positions: self.positions.to_vec(),
            velocities: self.velocities.to_vec(),
            types: self.types.to_vec(),
        }
    }
}

/// Owned copy of a [`Snapshot`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub step: u64,
    pub time: f64,
    pub world: DVec2,
    pub positions: Vec<DVec2>,
    pub velocities: Vec<DVec2>,
    pub types: Vec<TypeId>,
}
