//! Construction and sampling tests across the hat pipeline.

use super::triangulate::triangulate;
use super::*;
use crate::density::{FnDensity, MultiNormal, StdNormal};
use nalgebra::{dvector, DMatrix};
use rand::{rngs::StdRng, SeedableRng};

fn build(dim: usize, max_cones: usize, seed: u64) -> Hat {
    let mut rng = StdRng::seed_from_u64(seed);
    Hat::build(&StdNormal::new(dim), &HatCfg::with_max_cones(max_cones), &mut rng).unwrap()
}

#[test]
fn cumulative_volume_is_monotone_and_totals() {
    let hat = build(2, 50, 1);
    let mut prev = 0.0;
    let mut sum = 0.0;
    for c in hat.cones().iter() {
        assert!(c.volume >= 0.0 && c.volume.is_finite());
        assert!(c.cum_volume >= prev);
        prev = c.cum_volume;
        sum += c.volume;
    }
    assert_eq!(prev, hat.volume());
    assert!((sum - hat.volume()).abs() < 1e-12 * sum);
}

#[test]
fn construction_is_deterministic_for_fixed_seed() {
    let a = build(3, 60, 99);
    let b = build(3, 60, 99);
    assert_eq!(a.vertex_count(), b.vertex_count());
    for (va, vb) in a.vertices().iter().zip(b.vertices().iter()) {
        assert_eq!(va, vb);
    }
    assert_eq!(a.cones().as_slice(), b.cones().as_slice());
    assert_eq!(a.volume(), b.volume());
}

#[test]
fn minimum_budget_keeps_seed_mesh() {
    for dim in 1..=3 {
        let seeds = 1usize << dim;
        let hat = build(dim, seeds, 5);
        assert_eq!(hat.refinement().splits, 0);
        assert_eq!(hat.cone_count(), seeds);
        assert_eq!(hat.vertex_count(), 2 * dim + 1);
        let cfg = HatCfg::with_max_cones(seeds);
        let (_, cones) = triangulate(&StdNormal::new(dim), &DVector::zeros(dim), &cfg).unwrap();
        assert_eq!(hat.volume(), cones.total_volume());
    }
}

#[test]
fn one_over_minimum_budget_splits_once() {
    for dim in 1..=3 {
        let seeds = 1usize << dim;
        let hat = build(dim, seeds + 1, 5);
        assert_eq!(hat.refinement().splits, 1);
        assert_eq!(hat.refinement().stop, Termination::ConeBudget);
        assert_eq!(hat.cone_count(), seeds + 1);
        assert_eq!(hat.vertex_count(), 2 * dim + 2);
    }
}

#[test]
fn one_dimension_is_classical_rou() {
    let hat = build(1, 2, 0);
    assert_eq!(hat.vertex_count(), 3);
    assert_eq!(hat.cone_count(), 2);
    // both halves are mirror images
    let c0 = hat.cones().get(ConeId(0)).volume;
    let c1 = hat.cones().get(ConeId(1)).volume;
    assert!((c0 - c1).abs() < 1e-9 * c0);
    let acc = hat.expected_acceptance(&StdNormal::new(1)).unwrap();
    assert!(acc > 0.45 && acc <= 1.0);
}

#[test]
fn refinement_never_grows_the_hat() {
    let coarse = build(2, 4, 3);
    let fine = build(2, 64, 3);
    assert!(fine.volume() <= coarse.volume() * (1.0 + 1e-9));
    let d = StdNormal::new(2);
    let acc = fine.expected_acceptance(&d).unwrap();
    assert!(acc <= 1.0 + 1e-9);
    assert!(acc > coarse.expected_acceptance(&d).unwrap() - 1e-9);
}

#[test]
fn vertex_and_cone_budgets_hold() {
    let hat = build(3, 37, 8);
    assert!(hat.cone_count() <= 37);
    assert!(hat.vertex_count() <= 38);
    for c in hat.cones().iter() {
        let mut ids = c.rays.clone();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}

#[test]
fn soft_vertex_budget_still_builds() {
    let mut cfg = HatCfg::with_max_cones(50);
    cfg.max_vertices = Some(7);
    let mut rng = StdRng::seed_from_u64(2);
    let hat = Hat::build(&StdNormal::new(2), &cfg, &mut rng).unwrap();
    assert_eq!(hat.refinement().stop, Termination::VertexBudget);
    assert_eq!(hat.vertex_count(), 7);
    assert_eq!(hat.cone_count(), 6);
}

#[test]
fn rejects_budget_below_seed_count() {
    let mut rng = StdRng::seed_from_u64(0);
    let err = Hat::build(&StdNormal::new(3), &HatCfg::with_max_cones(7), &mut rng).unwrap_err();
    assert!(matches!(err, SetupError::Configuration { .. }));
}

#[test]
fn rejects_missing_gradient() {
    let d = FnDensity::new(2, |x| (-0.5 * x.norm_squared()).exp());
    let mut rng = StdRng::seed_from_u64(0);
    let err = Hat::build(&d, &HatCfg::default(), &mut rng).unwrap_err();
    assert!(matches!(err, SetupError::Configuration { .. }));
}

#[test]
fn flat_density_is_unbounded() {
    let d = FnDensity::new(2, |_| 1.0).with_gradient(|_| DVector::zeros(2));
    let mut rng = StdRng::seed_from_u64(0);
    let err = Hat::build(&d, &HatCfg::with_max_cones(12), &mut rng).unwrap_err();
    assert!(matches!(err, SetupError::Unbounded { .. }));
}

#[test]
fn verify_mode_reports_no_violation_for_log_concave_density() {
    let d = MultiNormal::correlated2(0.7).unwrap();
    let mut cfg = HatCfg::with_max_cones(40);
    cfg.verify = true;
    let mut rng = StdRng::seed_from_u64(17);
    let hat = Hat::build(&d, &cfg, &mut rng).unwrap();
    for _ in 0..5_000 {
        let x = hat.sample(&d, &mut rng);
        assert!(x.iter().all(|v| v.is_finite()));
    }
    assert_eq!(hat.violations(), 0);
}

#[test]
fn check_flags_points_beyond_the_plane() {
    let hat = build(2, 4, 0);
    let cone = hat.cones().get(ConeId(0));
    let far = &cone.support * 2.0;
    let v = hat.check(ConeId(0), &far).unwrap();
    assert!((v.ratio - 0.5).abs() < 1e-12);
    assert!(hat.check(ConeId(0), &(&cone.support * 0.5)).is_none());
}

#[test]
fn proposals_stay_inside_their_cone() {
    let hat = build(3, 30, 4);
    let mut rng = StdRng::seed_from_u64(12);
    for _ in 0..2_000 {
        let (id, y) = hat.propose(&mut rng);
        assert!(hat.check(id, &y).is_none());
        assert!(y[3] >= 0.0);
    }
}

#[test]
fn shifted_center_is_respected() {
    let mean = dvector![1.5, -2.0];
    let d = MultiNormal::new(mean.clone(), DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 0.5]))
        .unwrap();
    let mut rng = StdRng::seed_from_u64(21);
    let hat = Hat::build(&d, &HatCfg::with_max_cones(40), &mut rng).unwrap();
    assert_eq!(hat.center(), &mean);
    let n = 20_000;
    let mut acc = DVector::<f64>::zeros(2);
    for _ in 0..n {
        acc += hat.sample(&d, &mut rng);
    }
    acc /= n as f64;
    assert!((acc - mean).amax() < 0.05);
}

#[test]
fn clone_is_deep() {
    let hat = build(2, 20, 6);
    let mut copy = hat.clone();
    copy.set_verify(true);
    assert!(!hat.verify());
    assert_eq!(copy.cones().as_slice(), hat.cones().as_slice());
    assert_eq!(copy.vertex_count(), hat.vertex_count());
    let _ = copy.sample(&StdNormal::new(2), &mut StdRng::seed_from_u64(1));
    assert_eq!(hat.violations(), 0);
}

#[test]
fn equal_seed_volumes_still_refine() {
    // scaled normal: the eight seed cones have bitwise-equal volumes
    let d = FnDensity::new(3, |x| 1.1507 * (-0.5 * x.norm_squared()).exp())
        .with_gradient(|x| x * (-1.1507 * (-0.5 * x.norm_squared()).exp()));
    let mut rng = StdRng::seed_from_u64(0);
    let hat = Hat::build(&d, &HatCfg::with_max_cones(9), &mut rng).unwrap();
    assert_eq!(hat.refinement().splits, 1);
    assert_eq!(hat.cone_count(), 9);

    let hat = Hat::build(&d, &HatCfg::with_max_cones(40), &mut rng).unwrap();
    assert_eq!(hat.cone_count(), 40);
}

#[test]
fn nan_density_rejects_every_candidate() {
    let hat = build(2, 12, 1);
    let nan = FnDensity::new(2, |_| f64::NAN);
    let mut rng = StdRng::seed_from_u64(2);
    assert!((0..500).all(|_| hat.try_sample(&nan, &mut rng).is_none()));
}
