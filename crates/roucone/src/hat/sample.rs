//! Drawing from a constructed hat.
//!
//! One trial: pick a cone with probability proportional to its volume, draw a
//! uniform point of its simplex `conv(0, lengths[i]·r_i)` via normalized
//! exponential spacings, map `(u, v)` to `x = u/v + center`, and accept iff
//! `v^(dim+1) <= pdf(x)`.

use std::sync::atomic::Ordering;

use nalgebra::DVector;
use rand::Rng;
use tracing::warn;

use crate::cfg::VERIFY_EPS;
use crate::density::Density;
use crate::error::HatViolation;

use super::cone::ConeId;
use super::Hat;

/// Standard exponential variate via `-ln(1 - U)`, `U ∈ (0, 1)`.
fn std_exp<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let u: f64 = rng.gen();
        if u > 0.0 {
            return -(1.0 - u).ln();
        }
    }
}

/// `n` uniform spacings of `[0, 1]` (non-negative, summing to one).
pub(crate) fn spacings<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<f64> {
    let mut e: Vec<f64> = (0..n).map(|_| std_exp(rng)).collect();
    let sum: f64 = e.iter().sum();
    for x in &mut e {
        *x /= sum;
    }
    e
}

impl Hat {
    /// Uniform point in the hat: `(cone, (u, v))`.
    pub(crate) fn propose<R: Rng + ?Sized>(&self, rng: &mut R) -> (ConeId, DVector<f64>) {
        let target = rng.gen::<f64>() * self.volume;
        let id = self.cones.locate(target);
        let cone = self.cones.get(id);

        // dim+2 spacings; the last weights the apex at the origin
        let w = spacings(rng, self.dim + 2);
        let mut y = DVector::<f64>::zeros(self.dim + 1);
        for (slot, &ray) in cone.rays.iter().enumerate() {
            y.axpy(w[slot] * cone.lengths[slot], self.vertices.get(ray), 1.0);
        }
        (id, y)
    }

    /// Map a hat point `(u, v)` to density coordinates `u/v + center`.
    pub fn to_density_coords(&self, y: &DVector<f64>) -> DVector<f64> {
        let v = y[self.dim];
        y.rows(0, self.dim) / v + &self.center
    }

    /// Draw one variate distributed according to `density`.
    ///
    /// Contract: retries until a candidate is accepted. The number of trials is
    /// unbounded but geometric with success probability `expected_acceptance`,
    /// so the expected cost is O(1). Callers needing a hard cap should use
    /// `try_sample`.
    pub fn sample<D: Density, R: Rng + ?Sized>(&self, density: &D, rng: &mut R) -> DVector<f64> {
        loop {
            if let Some(x) = self.try_sample(density, rng) {
                return x;
            }
        }
    }

    /// Single trial; `None` when the candidate is rejected.
    pub fn try_sample<D: Density, R: Rng + ?Sized>(
        &self,
        density: &D,
        rng: &mut R,
    ) -> Option<DVector<f64>> {
        let (id, y) = self.propose(rng);
        let v = y[self.dim];
        if v.is_nan() || v <= 0.0 {
            return None;
        }
        let x = self.to_density_coords(&y);
        let bound = density.pdf(&x);
        if bound.is_nan() || v.powi(self.dim as i32 + 1) > bound {
            return None;
        }
        if self.verify {
            if let Some(violation) = self.check(id, &y) {
                self.violations.fetch_add(1, Ordering::Relaxed);
                warn!(cone = violation.cone, ratio = violation.ratio, "{violation}");
            }
        }
        Some(x)
    }

    /// Verify-mode check that `y` is on the origin side of its cone's plane.
    pub fn check(&self, id: ConeId, y: &DVector<f64>) -> Option<HatViolation> {
        let cone = self.cones.get(id);
        let ratio = cone.normal.dot(&cone.support) / cone.normal.dot(y);
        if ratio < 1.0 - VERIFY_EPS {
            Some(HatViolation { cone: id.0, ratio })
        } else {
            None
        }
    }
}
