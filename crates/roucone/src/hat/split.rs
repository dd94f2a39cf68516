//! Adaptive refinement of the cone mesh by edge bisection.
//!
//! Model
//! - Each outer pass computes a threshold (mean bounded volume, or `+inf` as
//!   soon as any cone is unbounded) and walks a snapshot of the cone list,
//!   splitting every cone whose volume reaches it. Cones appended during a pass
//!   wait for the next pass.
//! - A split bisects the edge between two random rays: the normalized midpoint
//!   becomes a new vertex, each child replaces one endpoint with it, and both
//!   children are refitted. If the children together are larger than a bounded
//!   parent, both inherit the parent's plane instead (they then partition the
//!   parent exactly).
//! - Refinement ends when the cone budget is reached or the vertex store is full.
//!
//! Code cross-refs: `ConeArena::replace_and_append`, `tangent::fit_cone`

use nalgebra::DVector;
use rand::Rng;
use tracing::{debug, trace, warn};

use crate::cfg::HatCfg;
use crate::density::Density;
use crate::error::BudgetExceeded;

use super::cone::{Cone, ConeArena, ConeId};
use super::tangent::fit_cone;
use super::vertex::VertexStore;

/// Why refinement stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    ConeBudget,
    VertexBudget,
}

/// Summary of a refinement run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Refinement {
    pub passes: usize,
    pub splits: usize,
    pub stop: Termination,
}

/// Split threshold: mean volume if every cone is bounded, `+inf` otherwise.
///
/// The mean is capped at the largest volume so that rounding never leaves a
/// pass without an eligible cone.
pub(crate) fn split_threshold(cones: &ConeArena) -> f64 {
    let (count, sum, max) = cones
        .iter()
        .filter(|c| c.is_bounded())
        .fold((0usize, 0.0, 0.0f64), |(n, s, m), c| {
            (n + 1, s + c.volume, m.max(c.volume))
        });
    if count == cones.len() && count > 0 {
        (sum / count as f64).min(max)
    } else {
        f64::INFINITY
    }
}

/// Shared state for one refinement run.
pub(crate) struct Splitter<'a, D, R: ?Sized> {
    pub vertices: &'a mut VertexStore,
    pub cones: &'a mut ConeArena,
    pub density: &'a D,
    pub center: &'a DVector<f64>,
    pub cfg: &'a HatCfg,
    pub rng: &'a mut R,
}

impl<D: Density, R: Rng + ?Sized> Splitter<'_, D, R> {
    /// Refine until a budget is exhausted.
    pub(crate) fn run(&mut self) -> Refinement {
        let mut passes = 0;
        let mut splits = 0;
        let mut parent = Cone::new(Vec::new(), 0.0);
        let stop = loop {
            if self.cones.len() >= self.cfg.max_cones {
                break Termination::ConeBudget;
            }
            passes += 1;
            let (done, stop) = self.pass(&mut parent);
            splits += done;
            debug!(
                pass = passes,
                splits = done,
                cones = self.cones.len(),
                volume = self.cones.total_volume(),
                "refinement pass"
            );
            if let Some(stop) = stop {
                break stop;
            }
        };
        debug!(passes, splits, ?stop, "refinement finished");
        Refinement {
            passes,
            splits,
            stop,
        }
    }

    /// One pass over the cones present when it starts; returns the number of
    /// splits and the stop reason if a budget ran out. `parent` is scratch.
    pub(crate) fn pass(&mut self, parent: &mut Cone) -> (usize, Option<Termination>) {
        let threshold = split_threshold(self.cones);
        let snapshot = self.cones.len();
        let mut splits = 0;
        for i in 0..snapshot {
            if self.cones.len() >= self.cfg.max_cones {
                return (splits, Some(Termination::ConeBudget));
            }
            let id = ConeId(i);
            if self.cones.get(id).volume < threshold {
                continue;
            }
            self.cones.get(id).copy_into(parent);
            if let Err(e) = self.split(id, parent) {
                warn!(cones = self.cones.len(), "{e}; refinement stops early");
                return (splits, Some(Termination::VertexBudget));
            }
            splits += 1;
        }
        trace!(threshold, snapshot, splits, "pass walked");
        (splits, None)
    }

    /// Two distinct ray slots; for an unbounded parent (with at least three
    /// rays) neither slot is the top ray.
    fn pick_slots(&mut self, parent: &Cone) -> (usize, usize) {
        let n = parent.rays.len();
        let top = parent.top_slot(self.vertices);
        let avoid_top = !parent.is_bounded() && n >= 3;
        loop {
            let a = self.rng.gen_range(0..n);
            let mut b = self.rng.gen_range(0..n - 1);
            if b >= a {
                b += 1;
            }
            if !avoid_top || (a != top && b != top) {
                return (a, b);
            }
        }
    }

    /// Bisect cone `id` (whose current value is `parent`).
    fn split(&mut self, id: ConeId, parent: &Cone) -> Result<(ConeId, ConeId), BudgetExceeded> {
        let (a, b) = self.pick_slots(parent);
        let mid = (self.vertices.get(parent.rays[a]) + self.vertices.get(parent.rays[b])) * 0.5;
        let mid_norm = mid.norm();
        let vertex = self.vertices.append(mid / mid_norm)?;
        let unit_volume = parent.unit_volume / (2.0 * mid_norm);

        let mut first = parent.clone();
        first.rays[a] = vertex;
        first.unit_volume = unit_volume;
        let mut second = parent.clone();
        second.rays[b] = vertex;
        second.unit_volume = unit_volume;

        fit_cone(&mut first, self.vertices, self.density, self.center, self.cfg);
        fit_cone(&mut second, self.vertices, self.density, self.center, self.cfg);

        if parent.is_bounded() && parent.volume < first.volume + second.volume {
            first.set_plane(self.vertices, &parent.support, &parent.normal);
            second.set_plane(self.vertices, &parent.support, &parent.normal);
        }
        Ok(self.cones.replace_and_append(id, first, second))
    }
}
