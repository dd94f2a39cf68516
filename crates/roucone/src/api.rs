//! Curated internal API (UNSTABLE).
//!
//! Important
//! - This is not a public API. It is a convenience surface for project-internal
//!   code (the CLI, benches, experiments). Breaking changes are allowed.

// Configuration and errors
pub use crate::cfg::HatCfg;
pub use crate::error::{BudgetExceeded, HatViolation, SetupError};
// Densities
pub use crate::density::{Density, FnDensity, InvalidCovariance, MultiNormal, StdNormal};
// Hat construction and sampling
pub use crate::hat::{
    Cone, ConeArena, ConeId, Hat, Refinement, Termination, VertexId, VertexStore,
};
// Seeded generator
pub use crate::generator::{ConeRou, HatSampler};
// Numerics
pub use crate::solvers::minimize_bounded;
