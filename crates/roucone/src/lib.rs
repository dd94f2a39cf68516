//! Multivariate ratio-of-uniforms sampling with a piecewise-conical hat.
//!
//! Layout
//! - `hat`: vertex/cone arenas, tangent fitting, triangulation, refinement and
//!   the rejection sampler.
//! - `generator`: `ConeRou`, a seeded generator bundling density, hat and RNG.
//! - `density`: the `Density` callback trait and built-in densities.
//! - `cfg`, `error`, `solvers`: parameters, error types, 1-D minimization.
//!
//! API Policy
//! - This crate is project-internal. There is no stable public API; `api`
//!   collects the names callers are expected to reach for.

pub mod api;
pub mod cfg;
pub mod density;
pub mod error;
pub mod generator;
pub mod hat;
pub mod solvers;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use cfg::HatCfg;
pub use density::Density;
pub use generator::ConeRou;
pub use hat::Hat;

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::cfg::HatCfg;
    pub use crate::density::{Density, FnDensity, MultiNormal, StdNormal};
    pub use crate::error::SetupError;
    pub use crate::generator::{ConeRou, HatSampler};
    pub use crate::hat::Hat;
    pub use nalgebra::DVector;
}
