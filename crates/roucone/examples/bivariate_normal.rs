//! Acceptance and timing report for a correlated bivariate normal.
//!
//! Purpose
//! - Show how the expected acceptance rate improves with the cone budget and
//!   what construction costs, for a correlation strong enough that the seed
//!   triangulation alone is a poor fit.
//! - Cross-check the analytic acceptance against an observed trial count.
//!
//! Code: crates/roucone/src/hat/mod.rs::Hat::build

use std::time::Instant;

use rand::{rngs::StdRng, SeedableRng};
use roucone::prelude::*;

fn main() {
    let rho = 0.9;
    let density = MultiNormal::correlated2(rho).expect("valid covariance");
    println!("rho={rho}");
    println!("{:>8} {:>8} {:>10} {:>10} {:>10}", "cones", "verts", "build_ms", "accept", "observed");
    for max_cones in [4usize, 10, 30, 100, 300, 1000] {
        let mut rng = StdRng::seed_from_u64(1);
        let start = Instant::now();
        let hat = Hat::build(&density, &HatCfg::with_max_cones(max_cones), &mut rng)
            .expect("hat construction");
        let build_ms = start.elapsed().as_secs_f64() * 1e3;
        let expected = hat.expected_acceptance(&density).unwrap_or(f64::NAN);

        let trials = 20_000;
        let accepted = (0..trials)
            .filter(|_| hat.try_sample(&density, &mut rng).is_some())
            .count();
        println!(
            "{:>8} {:>8} {:>10.3} {:>10.4} {:>10.4}",
            hat.cone_count(),
            hat.vertex_count(),
            build_ms,
            expected,
            accepted as f64 / trials as f64
        );
    }
}
