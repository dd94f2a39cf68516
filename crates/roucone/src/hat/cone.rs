//! Simplicial cones truncated by a tangent plane, and the arena holding them.
//!
//! A cone is spanned by the origin and `dim + 1` unit rays. The tangent plane
//! `{y : n·y = n·p}` cuts every ray at distance `lengths[i]`, so the truncated
//! cone is the simplex `conv(0, lengths[i]·r_i)` with volume
//! `unit_volume · ∏ lengths[i]`, where `unit_volume = |det(r)| / (dim+1)!`.

use nalgebra::DVector;

use super::vertex::{VertexId, VertexStore};

/// Index of a cone in its `ConeArena`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConeId(pub usize);

/// Truncated simplicial cone.
///
/// Invariants:
/// - `rays` are pairwise distinct and `rays.len() == lengths.len() == dim + 1`.
/// - `lengths[i]` is positive and finite, or `+inf` when ray `i` misses the plane.
/// - `volume >= 0`; `volume` is `+inf` iff some length is infinite.
/// - `cum_volume` is only meaningful after `ConeArena::accumulate`.
#[derive(Clone, Debug, PartialEq)]
pub struct Cone {
    pub rays: Vec<VertexId>,
    pub lengths: Vec<f64>,
    pub support: DVector<f64>,
    pub normal: DVector<f64>,
    pub unit_volume: f64,
    pub volume: f64,
    pub cum_volume: f64,
}

impl Cone {
    /// Untruncated cone (no plane yet, infinite volume).
    pub fn new(rays: Vec<VertexId>, unit_volume: f64) -> Self {
        let n = rays.len();
        Self {
            rays,
            lengths: vec![f64::INFINITY; n],
            support: DVector::zeros(n),
            normal: DVector::zeros(n),
            unit_volume,
            volume: f64::INFINITY,
            cum_volume: 0.0,
        }
    }

    /// Truncate by the plane through `support` with normal `normal`.
    ///
    /// `lengths[i] = (n·p) / (n·r_i)`, replaced by `+inf` unless the quotient is
    /// finite and positive; then `volume = unit_volume · ∏ lengths[i]`.
    pub fn set_plane(
        &mut self,
        vertices: &VertexStore,
        support: &DVector<f64>,
        normal: &DVector<f64>,
    ) {
        self.support.copy_from(support);
        self.normal.copy_from(normal);
        let np = normal.dot(support);
        let mut volume = self.unit_volume;
        for (len, &ray) in self.lengths.iter_mut().zip(&self.rays) {
            let q = np / normal.dot(vertices.get(ray));
            *len = if q.is_finite() && q > 0.0 {
                q
            } else {
                f64::INFINITY
            };
            volume *= *len;
        }
        self.volume = if volume.is_nan() { f64::INFINITY } else { volume };
    }

    /// Drop the plane: every ray is unbounded.
    pub fn unbound(&mut self) {
        self.lengths.fill(f64::INFINITY);
        self.volume = f64::INFINITY;
    }

    /// Full value copy into `dest`, reusing its allocations.
    pub fn copy_into(&self, dest: &mut Cone) {
        dest.clone_from(self);
    }

    #[inline]
    pub fn is_bounded(&self) -> bool {
        self.volume.is_finite()
    }

    /// Slot of the ray with the largest last (scale) coordinate.
    pub fn top_slot(&self, vertices: &VertexStore) -> usize {
        let last = vertices.dim();
        let mut best = 0;
        let mut best_v = f64::NEG_INFINITY;
        for (slot, &ray) in self.rays.iter().enumerate() {
            let v = vertices.get(ray)[last];
            if v > best_v {
                best_v = v;
                best = slot;
            }
        }
        best
    }

    /// Endpoint of ray `slot` on the tangent plane (`lengths[slot] · r`).
    pub fn endpoint(&self, vertices: &VertexStore, slot: usize) -> DVector<f64> {
        vertices.get(self.rays[slot]) * self.lengths[slot]
    }
}

/// Contiguous cone storage addressed by `ConeId`.
#[derive(Clone, Debug, Default)]
pub struct ConeArena {
    cones: Vec<Cone>,
}

impl ConeArena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cones: Vec::with_capacity(capacity.min(1 << 16)),
        }
    }

    pub fn push(&mut self, cone: Cone) -> ConeId {
        self.cones.push(cone);
        ConeId(self.cones.len() - 1)
    }

    /// Overwrite `id` with `first` and append `second`; returns both handles.
    pub fn replace_and_append(&mut self, id: ConeId, first: Cone, second: Cone) -> (ConeId, ConeId) {
        self.cones[id.0] = first;
        let appended = self.push(second);
        (id, appended)
    }

    #[inline]
    pub fn get(&self, id: ConeId) -> &Cone {
        &self.cones[id.0]
    }

    #[inline]
    pub fn get_mut(&mut self, id: ConeId) -> &mut Cone {
        &mut self.cones[id.0]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cones.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cone> {
        self.cones.iter()
    }

    pub fn as_slice(&self) -> &[Cone] {
        &self.cones
    }

    /// Sum of all cone volumes (`+inf` if any cone is unbounded).
    pub fn total_volume(&self) -> f64 {
        self.cones.iter().map(|c| c.volume).sum()
    }

    /// Fill `cum_volume` with the running sum; returns the total.
    pub fn accumulate(&mut self) -> f64 {
        let mut sum = 0.0;
        for c in &mut self.cones {
            sum += c.volume;
            c.cum_volume = sum;
        }
        sum
    }

    /// Smallest id with `cum_volume >= target` (requires `accumulate`).
    pub fn locate(&self, target: f64) -> ConeId {
        let idx = self.cones.partition_point(|c| c.cum_volume < target);
        ConeId(idx.min(self.cones.len().saturating_sub(1)))
    }
}
