//! Tangent-plane fit for a single cone.
//!
//! Purpose
//! - Pick the point on the ratio-of-uniforms boundary surface
//!   `v = pdf(u/v + center)^(1/(dim+1))` whose tangent plane minimizes the
//!   truncated cone volume.
//!
//! Model
//! - Candidates lie on the segment from the cone's top ray (largest scale
//!   coordinate) to the centroid of the opposite face, parametrized by
//!   `alpha ∈ [0, 1)`. The candidate direction is projected radially onto the
//!   surface; the plane normal is the gradient of `v^(dim+1) - pdf(u/v + center)`.
//! - A fixed scan brackets the finite-volume part of the segment, then
//!   `solvers::minimize_bounded` refines inside the bracket.
//!
//! Code cross-refs: `Cone::set_plane`, `solvers::minimize_bounded`, `HatCfg::bracket_steps`

use nalgebra::DVector;

use crate::cfg::{HatCfg, NORM_EPS, SCALE_EPS};
use crate::density::Density;
use crate::solvers::minimize_bounded;

use super::cone::Cone;
use super::vertex::VertexStore;

/// Tangent plane of the boundary surface along direction `dir`.
///
/// Returns `(support_point, unit_normal)`, or `None` when the direction is
/// (nearly) in the `v = 0` plane, the density vanishes there, or the normal
/// degenerates.
pub(crate) fn surface_plane<D: Density>(
    density: &D,
    center: &DVector<f64>,
    dir: &DVector<f64>,
) -> Option<(DVector<f64>, DVector<f64>)> {
    let dim = center.len();
    let s = dir[dim];
    if !s.is_finite() || s <= SCALE_EPS {
        return None;
    }
    let offset = dir.rows(0, dim) / s;
    let x = &offset + center;
    let fx = density.pdf(&x);
    if !(fx.is_finite() && fx > 0.0) {
        return None;
    }
    let grad = density.dpdf(&x)?;

    let exponent = 1.0 / (dim as f64 + 1.0);
    let v = fx.powf(exponent);
    let support = dir * (v / s);

    // ∇_u = -∇pdf / v ; ∂_v = (dim+1) v^dim + ∇pdf · (u/v) / v
    let mut normal = DVector::<f64>::zeros(dim + 1);
    for j in 0..dim {
        normal[j] = -grad[j] / v;
    }
    normal[dim] = (dim as f64 + 1.0) * v.powi(dim as i32) + grad.dot(&offset) / v;

    let norm = normal.norm();
    if !(norm.is_finite() && norm > NORM_EPS) {
        return None;
    }
    normal /= norm;
    Some((support, normal))
}

/// Fit the tangent plane of `cone`; returns whether the fitted volume is finite.
///
/// When no scanned parameter yields a finite volume the cone is left
/// untruncated (`volume = +inf`).
pub(crate) fn fit_cone<D: Density>(
    cone: &mut Cone,
    vertices: &VertexStore,
    density: &D,
    center: &DVector<f64>,
    cfg: &HatCfg,
) -> bool {
    let dim = vertices.dim();
    let top = cone.top_slot(vertices);
    let apex = vertices.get(cone.rays[top]).clone();
    let mut face = DVector::<f64>::zeros(dim + 1);
    for (slot, &ray) in cone.rays.iter().enumerate() {
        if slot != top {
            face += vertices.get(ray);
        }
    }
    face /= (cone.rays.len() - 1) as f64;
    let step = face - &apex;

    let plane_at = |alpha: f64| {
        let p = &apex + &step * alpha;
        let norm = p.norm();
        if norm <= NORM_EPS {
            return None;
        }
        surface_plane(density, center, &(p / norm))
    };
    let volume_at = |cone: &mut Cone, alpha: f64| match plane_at(alpha) {
        Some((support, normal)) => {
            cone.set_plane(vertices, &support, &normal);
            cone.volume
        }
        None => f64::INFINITY,
    };

    let steps = cfg.bracket_steps;
    let mut bracket: Option<(f64, f64)> = None;
    let mut best = (f64::INFINITY, 0.0);
    for k in 0..steps {
        let alpha = k as f64 / steps as f64;
        let vol = volume_at(cone, alpha);
        if vol.is_finite() {
            bracket = Some(match bracket {
                None => (alpha, alpha),
                Some((lo, _)) => (lo, alpha),
            });
            if vol < best.0 {
                best = (vol, alpha);
            }
        }
    }

    let Some((lo, hi)) = bracket else {
        cone.unbound();
        return false;
    };

    let alpha = if lo == hi {
        lo
    } else {
        let found = minimize_bounded(|a| volume_at(cone, a), lo, hi, best.1, cfg.min_tol)
            .clamp(lo, hi);
        if volume_at(cone, found) <= best.0 {
            found
        } else {
            best.1
        }
    };

    match plane_at(alpha) {
        Some((support, normal)) => {
            cone.set_plane(vertices, &support, &normal);
            cone.is_bounded()
        }
        None => {
            cone.unbound();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::StdNormal;
    use crate::hat::vertex::VertexId;
    use nalgebra::dvector;

    #[test]
    fn north_pole_plane_is_horizontal_at_mode() {
        let d = StdNormal::new(2);
        let (p, n) = surface_plane(&d, &DVector::zeros(2), &dvector![0.0, 0.0, 1.0]).unwrap();
        assert!((p - dvector![0.0, 0.0, 1.0]).norm() < 1e-12);
        assert!((n - dvector![0.0, 0.0, 1.0]).norm() < 1e-12);
    }

    #[test]
    fn horizontal_direction_has_no_plane() {
        let d = StdNormal::new(1);
        assert!(surface_plane(&d, &DVector::zeros(1), &dvector![1.0, 0.0]).is_none());
    }

    #[test]
    fn support_point_lies_on_surface() {
        let d = StdNormal::new(1);
        let dir = dvector![1.0, 1.0].normalize();
        let (p, n) = surface_plane(&d, &DVector::zeros(1), &dir).unwrap();
        // v² = pdf(u/v)
        let x = dvector![p[0] / p[1]];
        assert!((p[1] * p[1] - d.pdf(&x)).abs() < 1e-12);
        assert!((n.norm() - 1.0).abs() < 1e-12);
        // outward normal points away from the origin
        assert!(n.dot(&p) > 0.0);
    }

    #[test]
    fn fitted_one_dim_cone_bounds_region() {
        // region v² <= exp(-(u/v)²/2); a seed cone covers its u >= 0 half
        let d = StdNormal::new(1);
        let mut store = VertexStore::new(1, 3);
        let north = store.append(dvector![0.0, 1.0]).unwrap();
        let east = store.append(dvector![1.0, 0.0]).unwrap();
        let mut cone = Cone::new(vec![north, east], 0.5);
        let ok = fit_cone(&mut cone, &store, &d, &DVector::zeros(1), &HatCfg::default());
        assert!(ok);
        assert!(cone.volume.is_finite() && cone.volume > 0.0);
        // |region| = ∫pdf / 2, halved again for u >= 0
        let half_region = (2.0 * std::f64::consts::PI).sqrt() / 4.0;
        assert!(cone.volume >= half_region);
        assert_eq!(cone.rays, vec![VertexId(0), VertexId(1)]);
    }

    #[test]
    fn vanishing_density_leaves_cone_unbounded() {
        let d = crate::density::FnDensity::new(1, |_| 0.0).with_gradient(|_| dvector![0.0]);
        let mut store = VertexStore::new(1, 3);
        let north = store.append(dvector![0.0, 1.0]).unwrap();
        let east = store.append(dvector![1.0, 0.0]).unwrap();
        let mut cone = Cone::new(vec![north, east], 0.5);
        assert!(!fit_cone(&mut cone, &store, &d, &DVector::zeros(1), &HatCfg::default()));
        assert!(cone.volume.is_infinite());
    }
}
