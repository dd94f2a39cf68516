//! Construction parameters and internal tolerances.
//!
//! - `HatCfg`: everything the caller controls about hat construction (cone and
//!   vertex budgets, center shift, verify mode, tangent-fit resolution).
//! - Constants below are fixed numeric guards used across the `hat` modules.
//!
//! Code cross-refs: `hat::Hat::build`, `hat::tangent::fit_cone`

use nalgebra::DVector;

use crate::error::SetupError;

/// Scale coordinate below which a direction is treated as lying in the `v = 0` plane.
pub(crate) const SCALE_EPS: f64 = 1e-12;
/// Relative slack for the verify-mode hat check `(n·p)/(n·y) >= 1`.
pub(crate) const VERIFY_EPS: f64 = 100.0 * f64::EPSILON;
/// Norm below which a vector is considered degenerate (no direction).
pub(crate) const NORM_EPS: f64 = 1e-300;

/// Hat construction configuration.
///
/// Invariants (checked by `validate`):
/// - `max_cones >= 2^dim` (the seed triangulation must fit).
/// - `max_vertices`, if set, is at least the seed vertex count `2·dim + 1`;
///   it is clamped to `max_cones + 1`.
/// - `center`, if set, has `dim` finite components.
#[derive(Clone, Debug)]
pub struct HatCfg {
    /// Upper bound on the number of cones in the final mesh.
    pub max_cones: usize,
    /// Upper bound on the number of vertices; `None` means `max_cones + 1`.
    pub max_vertices: Option<usize>,
    /// Shift applied when mapping hat points back to density coordinates.
    /// `None` falls back to `Density::center`, then to the origin.
    pub center: Option<DVector<f64>>,
    /// Check every accepted sample against the hat (diagnostic only).
    pub verify: bool,
    /// Number of equally spaced tangent parameters scanned before the 1-D search.
    pub bracket_steps: usize,
    /// Absolute tolerance handed to the bounded 1-D minimizer.
    pub min_tol: f64,
}

impl Default for HatCfg {
    fn default() -> Self {
        Self {
            max_cones: 100,
            max_vertices: None,
            center: None,
            verify: false,
            bracket_steps: 100,
            min_tol: 1e-4,
        }
    }
}

impl HatCfg {
    /// Config with a given cone budget and defaults elsewhere.
    pub fn with_max_cones(max_cones: usize) -> Self {
        Self {
            max_cones,
            ..Self::default()
        }
    }

    /// Number of seed cones for `dim`, or `None` when `2^dim` overflows.
    pub fn seed_cones(dim: usize) -> Option<usize> {
        u32::try_from(dim)
            .ok()
            .and_then(|d| 1usize.checked_shl(d))
            .filter(|&n| n > 0)
    }

    /// Effective vertex budget after defaulting and clamping.
    pub fn vertex_budget(&self) -> usize {
        let cap = self.max_cones.saturating_add(1);
        self.max_vertices.map_or(cap, |v| v.min(cap))
    }

    /// Reject inconsistent parameters before any geometry work.
    pub fn validate(&self, dim: usize) -> Result<(), SetupError> {
        if dim == 0 {
            return Err(SetupError::configuration("dimension must be >= 1"));
        }
        let seeds = Self::seed_cones(dim)
            .ok_or_else(|| SetupError::configuration(format!("2^{dim} seed cones overflow")))?;
        if self.max_cones < seeds {
            return Err(SetupError::configuration(format!(
                "max_cones = {} is below 2^dim = {seeds}",
                self.max_cones
            )));
        }
        let seed_vertices = 2 * dim + 1;
        if self.vertex_budget() < seed_vertices {
            return Err(SetupError::configuration(format!(
                "vertex budget {} is below the {seed_vertices} seed vertices",
                self.vertex_budget()
            )));
        }
        if let Some(c) = &self.center {
            if c.len() != dim {
                return Err(SetupError::configuration(format!(
                    "center has {} components, density has dimension {dim}",
                    c.len()
                )));
            }
            if c.iter().any(|x| !x.is_finite()) {
                return Err(SetupError::configuration("center must be finite"));
            }
        }
        if self.bracket_steps == 0 {
            return Err(SetupError::configuration("bracket_steps must be > 0"));
        }
        if !(self.min_tol.is_finite() && self.min_tol > 0.0) {
            return Err(SetupError::configuration(
                "min_tol must be finite and positive",
            ));
        }
        Ok(())
    }
}
