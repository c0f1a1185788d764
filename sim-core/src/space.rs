//! Toroidal world geometry.

use glam::DVec2;

/// Extents of the wrap-around world `[0, width) x [0, height)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub size: DVec2,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: DVec2::new(width, height),
        }
    }

    /// Wraps a position back into `[0, size)` on each axis independently.
    #[inline]
    pub fn wrap(&self, p: DVec2) -> DVec2 {
        DVec2::new(wrap_axis(p.x, self.size.x), wrap_axis(p.y, self.size.y))
    }

    /// Shortest displacement from `from` to `to` on the torus.
    ///
    /// Each axis independently picks the smaller of the direct and the
    /// wrapped-around delta.
    #[inline]
    pub fn delta(&self, from: DVec2, to: DVec2) -> DVec2 {
        DVec2::new(
            min_image(to.x - from.x, self.size.x),
            min_image(to.y - from.y, self.size.y),
        )
    }

    #[inline]
    pub fn distance(&self, a: DVec2, b: DVec2) -> f64 {
        self.delta(a, b).length()
    }

    #[inline]
    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= 0.0 && p.x < self.size.x && p.y >= 0.0 && p.y < self.size.y
    }
}

#[inline]
fn wrap_axis(x: f64, len: f64) -> f64 {
    let w = x.rem_euclid(len);
    // rem_euclid of a tiny negative value can round up to exactly `len`.
    if w >= len { 0.0 } else { w }
}

#[inline]
fn min_image(d: f64, len: f64) -> f64 {
    let half = 0.5 * len;
    if d > half {
        d - len
    } else if d < -half {
        d + len
    } else {
        d
    }
}
