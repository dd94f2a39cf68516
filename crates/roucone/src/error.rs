//! Errors and diagnostics surfaced by hat construction and sampling.

use std::fmt;

/// Construction failures. No generator is produced when one of these is returned.
#[derive(Debug)]
pub enum SetupError {
    /// Parameters or callbacks are unusable (checked before any geometry work).
    Configuration { reason: String },
    /// Refinement finished but the hat does not have a finite, positive volume.
    Unbounded { cones: usize, vertices: usize },
}

impl SetupError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => write!(f, "invalid hat configuration: {reason}"),
            Self::Unbounded { cones, vertices } => write!(
                f,
                "hat volume is not finite after refinement ({cones} cones, {vertices} vertices)"
            ),
        }
    }
}

impl std::error::Error for SetupError {}

/// The vertex store is full. Soft: refinement stops with the mesh built so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BudgetExceeded {
    pub capacity: usize,
}

impl fmt::Display for BudgetExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vertex budget of {} exhausted", self.capacity)
    }
}

impl std::error::Error for BudgetExceeded {}

/// An accepted sample was found outside its cone's tangent plane (verify mode).
///
/// `ratio` is `(n·p)/(n·y)`; a valid hat keeps it `>= 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HatViolation {
    pub cone: usize,
    pub ratio: f64,
}

impl fmt::Display for HatViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sample lies outside hat in cone {} (ratio {:.3e} < 1)",
            self.cone, self.ratio
        )
    }
}
