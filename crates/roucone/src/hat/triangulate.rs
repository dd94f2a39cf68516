//! Initial coarse mesh of the upper half hypersphere.
//!
//! Seeds `2·dim + 1` vertices (north pole, then `+e_i`, `-e_i` per axis) and
//! `2^dim` cones, one per orthant of the `u` coordinates. Cone `k` takes the
//! `+` vertex on axis `i` iff bit `i` of `(2^dim − k − 1)` is set, so cone 0 is
//! the all-positive orthant.

use nalgebra::DVector;
use tracing::debug;

use crate::cfg::HatCfg;
use crate::density::Density;
use crate::error::BudgetExceeded;

use super::cone::{Cone, ConeArena};
use super::tangent::fit_cone;
use super::vertex::{VertexId, VertexStore};

/// `1 / ∏_{i<dim} (2 + i) = 1 / (dim+1)!`, the unit-simplex volume of a seed cone.
pub(crate) fn seed_unit_volume(dim: usize) -> f64 {
    1.0 / (0..dim).map(|i| (2 + i) as f64).product::<f64>()
}

/// Append the seed vertices; returns `(north, [(plus_i, minus_i)])`.
pub(crate) fn seed_vertices(
    store: &mut VertexStore,
) -> Result<(VertexId, Vec<(VertexId, VertexId)>), BudgetExceeded> {
    let dim = store.dim();
    let mut north = DVector::<f64>::zeros(dim + 1);
    north[dim] = 1.0;
    let north = store.append(north)?;
    let mut axes = Vec::with_capacity(dim);
    for i in 0..dim {
        let mut plus = DVector::<f64>::zeros(dim + 1);
        plus[i] = 1.0;
        let minus = -plus.clone();
        axes.push((store.append(plus)?, store.append(minus)?));
    }
    Ok((north, axes))
}

/// Seed cones (unfitted). Rays are ordered axis 0..dim, then the north pole.
pub(crate) fn seed_cones(north: VertexId, axes: &[(VertexId, VertexId)]) -> Vec<Cone> {
    let dim = axes.len();
    let count = 1usize << dim;
    let unit = seed_unit_volume(dim);
    (0..count)
        .map(|k| {
            let bits = count - k - 1;
            let mut rays: Vec<VertexId> = axes
                .iter()
                .enumerate()
                .map(|(i, &(plus, minus))| if (bits >> i) & 1 == 1 { plus } else { minus })
                .collect();
            rays.push(north);
            Cone::new(rays, unit)
        })
        .collect()
}

/// Build and fit the seed mesh.
pub(crate) fn triangulate<D: Density>(
    density: &D,
    center: &DVector<f64>,
    cfg: &HatCfg,
) -> Result<(VertexStore, ConeArena), BudgetExceeded> {
    let dim = center.len();
    let mut vertices = VertexStore::new(dim, cfg.vertex_budget());
    let (north, axes) = seed_vertices(&mut vertices)?;
    let mut cones = ConeArena::with_capacity(cfg.max_cones);
    let mut bounded = 0usize;
    for mut cone in seed_cones(north, &axes) {
        if fit_cone(&mut cone, &vertices, density, center, cfg) {
            bounded += 1;
        }
        cones.push(cone);
    }
    debug!(
        dim,
        cones = cones.len(),
        bounded,
        volume = cones.total_volume(),
        "seed mesh fitted"
    );
    Ok((vertices, cones))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::StdNormal;
    use crate::hat::cone::ConeId;

    #[test]
    fn unit_volume_is_inverse_factorial() {
        assert_eq!(seed_unit_volume(1), 0.5);
        assert!((seed_unit_volume(3) - 1.0 / 24.0).abs() < 1e-15);
    }

    #[test]
    fn seed_mesh_counts() {
        for dim in 1..=4 {
            let mut store = VertexStore::new(dim, 2 * dim + 1);
            let (north, axes) = seed_vertices(&mut store).unwrap();
            assert_eq!(store.len(), 2 * dim + 1);
            assert_eq!(store.get(north)[dim], 1.0);
            let cones = seed_cones(north, &axes);
            assert_eq!(cones.len(), 1 << dim);
            for c in &cones {
                assert_eq!(c.rays.len(), dim + 1);
                let mut ids = c.rays.clone();
                ids.sort();
                ids.dedup();
                assert_eq!(ids.len(), dim + 1);
            }
        }
    }

    #[test]
    fn seed_cones_cover_every_orthant_once() {
        let dim = 3;
        let mut store = VertexStore::new(dim, 7);
        let (north, axes) = seed_vertices(&mut store).unwrap();
        let cones = seed_cones(north, &axes);
        let mut signs: Vec<Vec<i8>> = cones
            .iter()
            .map(|c| {
                (0..dim)
                    .map(|i| store.get(c.rays[i])[i].signum() as i8)
                    .collect()
            })
            .collect();
        assert_eq!(signs[0], vec![1, 1, 1]);
        assert_eq!(signs[7], vec![-1, -1, -1]);
        signs.sort();
        signs.dedup();
        assert_eq!(signs.len(), 8);
    }

    #[test]
    fn normal_seed_mesh_is_bounded() {
        let d = StdNormal::new(2);
        let cfg = HatCfg::with_max_cones(4);
        let (vertices, cones) = triangulate(&d, &DVector::zeros(2), &cfg).unwrap();
        assert_eq!(vertices.len(), 5);
        assert_eq!(cones.len(), 4);
        // the four orthant cones are mirror images of each other
        let v0 = cones.get(ConeId(0)).volume;
        assert!(v0.is_finite() && v0 > 0.0);
        for c in cones.iter() {
            assert!((c.volume - v0).abs() < 1e-6 * v0);
        }
    }
}
