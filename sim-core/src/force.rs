use glam::DVec2;

use crate::config::Config;
use crate::matrix::InteractionMatrix;
use crate::space::Bounds;
use crate::types::TypeId;

/// Piecewise-linear, type-dependent force law.
///
/// ```text
///  force
///    ^            matrix[source][target]
///    |               /\
///    |              /  \
///  0 +-------------/----\---------> distance
///    |    /     r_min  mid  r_max
///    |  /   universal repulsion
///    |/
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceModel {
    pub radius_min: f64,
    pub radius_max: f64,
    pub repulsion_strength: f64,
}

impl ForceModel {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            radius_min: cfg.interaction_radius_min,
            radius_max: cfg.interaction_radius_max,
            repulsion_strength: cfg.repulsion_strength,
        }
    }

    /// Signed force magnitude that `source_type` exerts on `target_type` at
    /// `distance`. Positive values attract the target toward the source,
    /// negative values push it away.
    ///
    /// Below `radius_min` the matrix is ignored and every pair repels with
    /// `repulsion_strength * (1 - distance / radius_min)`. Beyond
    /// `radius_max` the force is zero.
    #[inline]
    pub fn force(
        &self,
        distance: f64,
        source_type: TypeId,
        target_type: TypeId,
        matrix: &InteractionMatrix,
    ) -> f64 {
        if distance < self.radius_min {
            -self.repulsion_strength * (1.0 - distance / self.radius_min)
        } else if distance <= self.radius_max {
            matrix.get(source_type, target_type) * self.ramp(distance)
        } else {
            0.0
        }
    }

    /// Triangular weight: 0 at `radius_min`, 1 at the midpoint, 0 at
    /// `radius_max`, and 0 outside that band.
    #[inline]
    pub fn ramp(&self, distance: f64) -> f64 {
        let mid = 0.5 * (self.radius_min + self.radius_max);
        let half_width = 0.5 * (self.radius_max - self.radius_min);
        (1.0 - (distance - mid).abs() / half_width).max(0.0)
    }

    /// Force vector felt by a target particle from one source particle.
    ///
    /// Uses the toroidal displacement from target to source and the matrix
    /// entry `[source_type][target_type]`. Returns `None` when the pair is
    /// out of range or the two particles coincide (no direction is defined).
    #[inline]
    pub fn force_on(
        &self,
        bounds: &Bounds,
        target: (DVec2, TypeId),
        source: (DVec2, TypeId),
        matrix: &InteractionMatrix,
    ) -> Option<DVec2> {
        let delta = bounds.delta(target.0, source.0);
        let d2 = delta.length_squared();
        if d2 == 0.0 || d2 > self.radius_max * self.radius_max {
            return None;
        }
        let d = d2.sqrt();
        let magnitude = self.force(d, source.1, target.1, matrix);
        Some(delta * (magnitude / d))
    }
}
