//! Append-only store of ray directions in `(u, v)` space.

use nalgebra::DVector;

use crate::error::BudgetExceeded;

/// Index of a vertex in its `VertexStore`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub usize);

/// Fixed-capacity arena of `dim + 1`-component directions.
///
/// Invariants:
/// - Every stored vector has `dim + 1` components.
/// - `len() <= capacity()`; vertices are never removed or mutated.
#[derive(Clone, Debug)]
pub struct VertexStore {
    dim: usize,
    capacity: usize,
    coords: Vec<DVector<f64>>,
}

impl VertexStore {
    pub fn new(dim: usize, capacity: usize) -> Self {
        Self {
            dim,
            capacity,
            coords: Vec::with_capacity(capacity.min(1 << 16)),
        }
    }

    /// Append a direction; fails once `capacity` vertices are stored.
    pub fn append(&mut self, vertex: DVector<f64>) -> Result<VertexId, BudgetExceeded> {
        debug_assert_eq!(vertex.len(), self.dim + 1, "vertex has wrong dimension");
        if self.coords.len() >= self.capacity {
            return Err(BudgetExceeded {
                capacity: self.capacity,
            });
        }
        self.coords.push(vertex);
        Ok(VertexId(self.coords.len() - 1))
    }

    #[inline]
    pub fn get(&self, id: VertexId) -> &DVector<f64> {
        &self.coords[id.0]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Dimension of the density (vertices carry one more component).
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn iter(&self) -> impl Iterator<Item = &DVector<f64>> {
        self.coords.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    #[test]
    fn append_until_full() {
        let mut store = VertexStore::new(1, 2);
        assert_eq!(store.append(dvector![0.0, 1.0]), Ok(VertexId(0)));
        assert_eq!(store.append(dvector![1.0, 0.0]), Ok(VertexId(1)));
        assert_eq!(
            store.append(dvector![-1.0, 0.0]),
            Err(BudgetExceeded { capacity: 2 })
        );
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(VertexId(1)), &dvector![1.0, 0.0]);
    }

    #[test]
    fn clone_is_independent() {
        let mut a = VertexStore::new(1, 4);
        a.append(dvector![0.0, 1.0]).unwrap();
        let mut b = a.clone();
        b.append(dvector![1.0, 0.0]).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 2);
    }
}
