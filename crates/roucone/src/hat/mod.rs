//! Piecewise-conical hat for multivariate ratio-of-uniforms sampling.
//!
//! Purpose
//! - Cover the region `A = {(u, v) : 0 < v <= pdf(u/v + center)^(1/(dim+1))}`
//!   by simplicial cones truncated at tangent planes, then sample uniformly in
//!   the cover and accept points that fall in `A`. Accepted points map to
//!   `x = u/v + center`, which is distributed with density proportional to `pdf`.
//!
//! Pipeline
//! - `triangulate`: seed vertices and `2^dim` orthant cones, each fitted by
//!   `tangent::fit_cone`.
//! - `split`: adaptive bisection until the cone or vertex budget is used up.
//! - `Hat::build` accumulates cone volumes; `sample` draws by cone selection,
//!   uniform simplex sampling and rejection.
//!
//! Assumptions
//! - `A` is convex (the density is T-concave for `T(f) = -f^(-1/(dim+1))`),
//!   so every tangent plane bounds all of `A`. Densities violating this may
//!   produce a hat that misses parts of `A`; verify mode detects points that
//!   land outside their cone's plane.
//!
//! Code cross-refs: `HatCfg`, `Density`, `crate::generator::ConeRou`

mod cone;
mod sample;
mod split;
mod tangent;
mod triangulate;
mod vertex;

use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::DVector;
use rand::Rng;
use tracing::debug;

use crate::cfg::HatCfg;
use crate::density::Density;
use crate::error::SetupError;

pub use cone::{Cone, ConeArena, ConeId};
pub use split::{Refinement, Termination};
pub use vertex::{VertexId, VertexStore};

use split::Splitter;
use triangulate::triangulate;

/// Constructed hat: vertex and cone arenas plus the cumulative volume table.
///
/// Invariants:
/// - `cones.len() <= max_cones`, `vertices.len() <= max_cones + 1`.
/// - `volume` is finite, positive and equals the last `cum_volume`.
/// - Arenas are read-only after `build`; `Clone` deep-copies them.
#[derive(Debug)]
pub struct Hat {
    dim: usize,
    center: DVector<f64>,
    vertices: VertexStore,
    cones: ConeArena,
    volume: f64,
    verify: bool,
    refinement: Refinement,
    violations: AtomicU64,
}

impl Clone for Hat {
    fn clone(&self) -> Self {
        Self {
            dim: self.dim,
            center: self.center.clone(),
            vertices: self.vertices.clone(),
            cones: self.cones.clone(),
            volume: self.volume,
            verify: self.verify,
            refinement: self.refinement,
            violations: AtomicU64::new(self.violations()),
        }
    }
}

impl Hat {
    /// Triangulate, refine and tabulate the hat for `density`.
    ///
    /// `rng` drives the random edge choice during refinement; a fixed seed makes
    /// construction deterministic.
    ///
    /// Errors
    /// - `SetupError::Configuration` for invalid parameters or a missing gradient.
    /// - `SetupError::Unbounded` if the refined hat still has infinite (or no) volume.
    pub fn build<D: Density, R: Rng + ?Sized>(
        density: &D,
        cfg: &HatCfg,
        rng: &mut R,
    ) -> Result<Self, SetupError> {
        let dim = density.dim();
        cfg.validate(dim)?;
        let center = cfg
            .center
            .clone()
            .or_else(|| density.center())
            .unwrap_or_else(|| DVector::zeros(dim));
        if center.len() != dim {
            return Err(SetupError::configuration(format!(
                "density center has {} components, expected {dim}",
                center.len()
            )));
        }
        if density.dpdf(&center).is_none() {
            return Err(SetupError::configuration("density gradient is missing"));
        }

        let (mut vertices, mut cones) = triangulate(density, &center, cfg)
            .map_err(|e| SetupError::configuration(e.to_string()))?;
        let refinement = Splitter {
            vertices: &mut vertices,
            cones: &mut cones,
            density,
            center: &center,
            cfg,
            rng,
        }
        .run();

        let volume = cones.accumulate();
        if !(volume.is_finite() && volume > 0.0) {
            return Err(SetupError::Unbounded {
                cones: cones.len(),
                vertices: vertices.len(),
            });
        }
        debug!(
            dim,
            cones = cones.len(),
            vertices = vertices.len(),
            volume,
            "hat ready"
        );
        Ok(Self {
            dim,
            center,
            vertices,
            cones,
            volume,
            verify: cfg.verify,
            refinement,
            violations: AtomicU64::new(0),
        })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn center(&self) -> &DVector<f64> {
        &self.center
    }

    /// Total hat volume (sum of cone volumes).
    #[inline]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn cones(&self) -> &ConeArena {
        &self.cones
    }

    pub fn vertices(&self) -> &VertexStore {
        &self.vertices
    }

    #[inline]
    pub fn cone_count(&self) -> usize {
        self.cones.len()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// How refinement went (passes, splits, stop reason).
    pub fn refinement(&self) -> Refinement {
        self.refinement
    }

    #[inline]
    pub fn verify(&self) -> bool {
        self.verify
    }

    pub fn set_verify(&mut self, verify: bool) {
        self.verify = verify;
    }

    /// Number of hat violations detected so far (verify mode only).
    pub fn violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    /// Acceptance probability `|A| / volume`, with `|A| = ∫pdf / (dim+1)`,
    /// when the density reports its integral. A valid hat gives a value `<= 1`.
    pub fn expected_acceptance<D: Density>(&self, density: &D) -> Option<f64> {
        density
            .volume()
            .map(|v| v / ((self.dim as f64 + 1.0) * self.volume))
    }
}

#[cfg(test)]
mod tests;
