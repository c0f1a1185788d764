//! Semi-implicit Euler step with friction and a jitter cutoff.

use glam::DVec2;

use crate::config::Config;
use crate::error::{Result, SimError};
use crate::particle::ParticleState;
use crate::space::Bounds;

#[derive(Clone, Debug, PartialEq)]
pub struct Integrator {
    pub dt: f64,
    pub friction: f64,
    pub jitter_threshold: f64,
    /// Next velocities, staged until every particle has been checked.
    next: Vec<DVec2>,
}

impl Integrator {
    pub fn new(dt: f64, friction: f64, jitter_threshold: f64) -> Self {
        Self {
            dt,
            friction,
            jitter_threshold,
            next: Vec::new(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.dt, cfg.friction, cfg.jitter_threshold)
    }

    /// New velocity for one particle (unit mass).
    #[inline]
    fn velocity(&self, v: DVec2, force: DVec2) -> DVec2 {
        let v = (v + force * self.dt) * (1.0 - self.friction);
        if v.length() < self.jitter_threshold {
            DVec2::ZERO
        } else {
            v
        }
    }

    /// Advances every particle by one tick.
    ///
    /// Per particle: `v += F * dt`, `v *= 1 - friction`, `v = 0` if
    /// `|v| < jitter_threshold`, then `x = wrap(x + v * dt)`.
    ///
    /// Every particle is checked before any is written back: if one would
    /// end up with a non-finite velocity or position,
    /// [`SimError::NumericDivergence`] is returned (tagged with `step`) and
    /// `particles` is left untouched.
    pub fn step(
        &mut self,
        particles: &mut ParticleState,
        net_forces: &[DVec2],
        bounds: &Bounds,
        step: u64,
    ) -> Result<()> {
        debug_assert_eq!(net_forces.len(), particles.len());

        self.next.clear();
        for (index, (&f, (&v, &x))) in net_forces
            .iter()
            .zip(particles.velocities.iter().zip(&particles.positions))
            .enumerate()
        {
            let v = self.velocity(v, f);
            if !v.is_finite() || !(x + v * self.dt).is_finite() {
                return Err(SimError::NumericDivergence { step, index });
            }
            self.next.push(v);
        }

        for ((v, x), &next) in particles
            .velocities
            .iter_mut()
            .zip(particles.positions.iter_mut())
            .zip(&self.next)
        {
            *v = next;
            *x = bounds.wrap(*x + next * self.dt);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_particle(pos: DVec2, vel: DVec2, bounds: Bounds) -> ParticleState {
        ParticleState::from_parts(vec![pos], vec![vel], vec![0], 1, bounds).unwrap()
    }

    #[test]
    fn applies_force_then_friction_then_moves() {
        let bounds = Bounds::new(100.0, 100.0);
        let mut p = one_particle(DVec2::new(10.0, 10.0), DVec2::new(1.0, 0.0), bounds);
        let forces = vec![DVec2::new(1.0, 2.0)];

        let mut integrator = Integrator::new(0.5, 0.5, 0.0);
        integrator.step(&mut p, &forces, &bounds, 1).unwrap();

        // v = ((1, 0) + (1, 2) * 0.5) * 0.5 = (0.75, 0.5)
        assert_eq!(p.velocities()[0], DVec2::new(0.75, 0.5));
        assert_eq!(p.positions()[0], DVec2::new(10.375, 10.25));
    }

    #[test]
    fn suppresses_jitter_below_threshold() {
        let bounds = Bounds::new(100.0, 100.0);
        let start = DVec2::new(5.0, 5.0);
        let mut p = one_particle(start, DVec2::new(0.003, -0.004), bounds);
        let forces = vec![DVec2::ZERO];

        let mut integrator = Integrator::new(1.0, 0.0, 0.01);
        integrator.step(&mut p, &forces, &bounds, 1).unwrap();

        assert_eq!(p.velocities()[0], DVec2::ZERO);
        assert_eq!(p.positions()[0], start);
    }

    #[test]
    fn wraps_across_the_right_edge() {
        let bounds = Bounds::new(100.0, 50.0);
        let mut p = one_particle(DVec2::new(99.99, 20.0), DVec2::new(1.0, 0.0), bounds);
        let forces = vec![DVec2::ZERO];

        let mut integrator = Integrator::new(0.5, 0.0, 0.0);
        integrator.step(&mut p, &forces, &bounds, 1).unwrap();

        let x = p.positions()[0].x;
        assert!((x - 0.49).abs() < 1e-9, "x = {x}");
        assert!(bounds.contains(p.positions()[0]));
    }

    #[test]
    fn full_friction_stops_everything() {
        let bounds = Bounds::new(10.0, 10.0);
        let mut p = one_particle(DVec2::new(1.0, 1.0), DVec2::new(3.0, 3.0), bounds);
        let forces = vec![DVec2::new(5.0, -5.0)];

        let mut integrator = Integrator::new(1.0, 1.0, 0.0);
        integrator.step(&mut p, &forces, &bounds, 1).unwrap();

        assert_eq!(p.velocities()[0], DVec2::ZERO);
        assert_eq!(p.positions()[0], DVec2::new(1.0, 1.0));
    }

    #[test]
    fn divergence_is_reported_and_state_is_untouched() {
        let bounds = Bounds::new(10.0, 10.0);
        let mut p = ParticleState::from_parts(
            vec![DVec2::new(1.0, 1.0), DVec2::new(2.0, 2.0)],
            vec![DVec2::new(0.5, 0.0), DVec2::ZERO],
            vec![0, 0],
            1,
            bounds,
        )
        .unwrap();
        let before = p.clone();
        let forces = vec![DVec2::new(1.0, 0.0), DVec2::new(f64::NAN, 0.0)];

        let mut integrator = Integrator::new(1.0, 0.1, 0.0);
        let err = integrator.step(&mut p, &forces, &bounds, 12).unwrap_err();

        assert!(matches!(
            err,
            SimError::NumericDivergence { step: 12, index: 1 }
        ));
        assert_eq!(p, before);
    }

    #[test]
    fn overflowing_position_is_divergence() {
        let bounds = Bounds::new(10.0, 10.0);
        let mut p = one_particle(DVec2::new(1.0, 1.0), DVec2::ZERO, bounds);
        let forces = vec![DVec2::new(f64::MAX, 0.0)];

        let mut integrator = Integrator::new(4.0, 0.0, 0.0);
        let err = integrator.step(&mut p, &forces, &bounds, 1).unwrap_err();
        assert!(matches!(err, SimError::NumericDivergence { index: 0, .. }));
    }
}
