//! Seeded multivariate ratio-of-uniforms generator.
//!
//! Purpose
//! - Bundle a density, its constructed `Hat` and a `StdRng` into one value that
//!   streams variates (`sample`, `sample_n`), mirroring the seed-in-constructor
//!   convention of the other generators in this workspace.
//! - `HatSampler` exposes the same draw as a `rand` `Distribution` for callers
//!   that bring their own RNG.
//!
//! Cloning deep-copies the hat arenas and the RNG state: a clone replays the
//! same stream as its source from the point of cloning.

use nalgebra::DVector;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cfg::HatCfg;
use crate::density::Density;
use crate::error::SetupError;
use crate::hat::Hat;

/// Generator owning its density, hat and RNG.
#[derive(Clone, Debug)]
pub struct ConeRou<D> {
    density: D,
    hat: Hat,
    rng: StdRng,
}

impl<D: Density> ConeRou<D> {
    /// Build the hat with an RNG seeded from `seed`; the same RNG then drives sampling.
    pub fn new(density: D, cfg: &HatCfg, seed: u64) -> Result<Self, SetupError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let hat = Hat::build(&density, cfg, &mut rng)?;
        Ok(Self { density, hat, rng })
    }

    pub fn density(&self) -> &D {
        &self.density
    }

    pub fn hat(&self) -> &Hat {
        &self.hat
    }

    pub fn set_verify(&mut self, verify: bool) {
        self.hat.set_verify(verify);
    }

    /// Next variate (retry-until-accept; see `Hat::sample`).
    pub fn sample(&mut self) -> DVector<f64> {
        self.hat.sample(&self.density, &mut self.rng)
    }

    /// At most `max_trials` trials; `None` if all were rejected.
    pub fn sample_bounded(&mut self, max_trials: usize) -> Option<DVector<f64>> {
        (0..max_trials).find_map(|_| self.hat.try_sample(&self.density, &mut self.rng))
    }

    pub fn sample_n(&mut self, n: usize) -> Vec<DVector<f64>> {
        (0..n).map(|_| self.sample()).collect()
    }

    /// Borrowing sampler for an external RNG.
    pub fn sampler(&self) -> HatSampler<'_, D> {
        HatSampler {
            hat: &self.hat,
            density: &self.density,
        }
    }

    pub fn expected_acceptance(&self) -> Option<f64> {
        self.hat.expected_acceptance(&self.density)
    }
}

/// `Distribution` view of a hat and its density.
#[derive(Clone, Copy, Debug)]
pub struct HatSampler<'a, D> {
    pub hat: &'a Hat,
    pub density: &'a D,
}

impl<D: Density> Distribution<DVector<f64>> for HatSampler<'_, D> {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        self.hat.sample(self.density, rng)
    }
}
