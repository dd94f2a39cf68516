//! Density callbacks consumed by hat construction and sampling.
//!
//! Purpose
//! - `Density` is the boundary between the generator and whatever produces
//!   `pdf`/`dpdf` values. Densities need not be normalized.
//! - Built-ins cover the test and CLI needs: `StdNormal`, `MultiNormal` and
//!   the closure adapter `FnDensity`.
//!
//! Conventions
//! - `dpdf` returning `None` means the gradient callback is unavailable;
//!   construction rejects such densities with a configuration error.
//! - `volume` is the integral of `pdf` over R^dim when known.

use std::f64::consts::PI;
use std::fmt;

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

/// Multivariate density with (optional) gradient.
pub trait Density {
    /// Number of coordinates of `x`.
    fn dim(&self) -> usize;

    /// Density value at `x` (`>= 0`, unnormalized allowed).
    fn pdf(&self, x: &DVector<f64>) -> f64;

    /// Gradient of `pdf` at `x`.
    fn dpdf(&self, x: &DVector<f64>) -> Option<DVector<f64>>;

    /// Preferred center (mode or similar); used when the config sets none.
    fn center(&self) -> Option<DVector<f64>> {
        None
    }

    /// Integral of `pdf`, if known.
    fn volume(&self) -> Option<f64> {
        None
    }
}

impl<D: Density + ?Sized> Density for &D {
    fn dim(&self) -> usize {
        (**self).dim()
    }
    fn pdf(&self, x: &DVector<f64>) -> f64 {
        (**self).pdf(x)
    }
    fn dpdf(&self, x: &DVector<f64>) -> Option<DVector<f64>> {
        (**self).dpdf(x)
    }
    fn center(&self) -> Option<DVector<f64>> {
        (**self).center()
    }
    fn volume(&self) -> Option<f64> {
        (**self).volume()
    }
}

/// Standard normal in R^dim, unnormalized: `exp(-|x|²/2)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StdNormal {
    pub dim: usize,
}

impl StdNormal {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Density for StdNormal {
    fn dim(&self) -> usize {
        self.dim
    }

    fn pdf(&self, x: &DVector<f64>) -> f64 {
        (-0.5 * x.norm_squared()).exp()
    }

    fn dpdf(&self, x: &DVector<f64>) -> Option<DVector<f64>> {
        Some(x * -self.pdf(x))
    }

    fn center(&self) -> Option<DVector<f64>> {
        Some(DVector::zeros(self.dim))
    }

    fn volume(&self) -> Option<f64> {
        Some((2.0 * PI).powf(0.5 * self.dim as f64))
    }
}

/// Normal with mean `mu` and covariance `sigma`, unnormalized:
/// `exp(-(x-mu)ᵀ sigma⁻¹ (x-mu) / 2)`.
///
/// Invariants: `sigma` is symmetric positive definite (checked in `new`).
#[derive(Clone, Debug)]
pub struct MultiNormal {
    mean: DVector<f64>,
    chol: Cholesky<f64, Dyn>,
    precision: DMatrix<f64>,
}

/// `MultiNormal::new` rejected its inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidCovariance {
    pub reason: String,
}

impl fmt::Display for InvalidCovariance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid covariance: {}", self.reason)
    }
}

impl std::error::Error for InvalidCovariance {}

impl MultiNormal {
    pub fn new(mean: DVector<f64>, sigma: DMatrix<f64>) -> Result<Self, InvalidCovariance> {
        let d = mean.len();
        if sigma.nrows() != d || sigma.ncols() != d {
            return Err(InvalidCovariance {
                reason: format!(
                    "expected {d}x{d}, got {}x{}",
                    sigma.nrows(),
                    sigma.ncols()
                ),
            });
        }
        if (&sigma - sigma.transpose()).amax() > 1e-12 * sigma.amax().max(1.0) {
            return Err(InvalidCovariance {
                reason: "matrix is not symmetric".into(),
            });
        }
        let chol = Cholesky::new(sigma).ok_or_else(|| InvalidCovariance {
            reason: "matrix is not positive definite".into(),
        })?;
        let precision = chol.inverse();
        Ok(Self {
            mean,
            chol,
            precision,
        })
    }

    /// Bivariate normal with unit variances and correlation `rho`.
    pub fn correlated2(rho: f64) -> Result<Self, InvalidCovariance> {
        let sigma = DMatrix::from_row_slice(2, 2, &[1.0, rho, rho, 1.0]);
        Self::new(DVector::zeros(2), sigma)
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    fn quad(&self, x: &DVector<f64>) -> (DVector<f64>, f64) {
        let g = &self.precision * (x - &self.mean);
        let q = g.dot(&(x - &self.mean));
        (g, q)
    }
}

impl Density for MultiNormal {
    fn dim(&self) -> usize {
        self.mean.len()
    }

    fn pdf(&self, x: &DVector<f64>) -> f64 {
        (-0.5 * self.quad(x).1).exp()
    }

    fn dpdf(&self, x: &DVector<f64>) -> Option<DVector<f64>> {
        let (g, q) = self.quad(x);
        Some(g * -(-0.5 * q).exp())
    }

    fn center(&self) -> Option<DVector<f64>> {
        Some(self.mean.clone())
    }

    fn volume(&self) -> Option<f64> {
        // det(sigma) = prod(diag(L))^2
        let sqrt_det: f64 = self.chol.l_dirty().diagonal().iter().product();
        Some((2.0 * PI).powf(0.5 * self.dim() as f64) * sqrt_det.abs())
    }
}

type PdfFn = Box<dyn Fn(&DVector<f64>) -> f64 + Send + Sync>;
type GradFn = Box<dyn Fn(&DVector<f64>) -> DVector<f64> + Send + Sync>;

/// Closure-backed density.
pub struct FnDensity {
    dim: usize,
    pdf: PdfFn,
    dpdf: Option<GradFn>,
    center: Option<DVector<f64>>,
    volume: Option<f64>,
}

impl FnDensity {
    pub fn new(dim: usize, pdf: impl Fn(&DVector<f64>) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            dim,
            pdf: Box::new(pdf),
            dpdf: None,
            center: None,
            volume: None,
        }
    }

    pub fn with_gradient(
        mut self,
        dpdf: impl Fn(&DVector<f64>) -> DVector<f64> + Send + Sync + 'static,
    ) -> Self {
        self.dpdf = Some(Box::new(dpdf));
        self
    }

    pub fn with_center(mut self, center: DVector<f64>) -> Self {
        self.center = Some(center);
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }
}

impl fmt::Debug for FnDensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDensity")
            .field("dim", &self.dim)
            .field("has_gradient", &self.dpdf.is_some())
            .field("center", &self.center)
            .field("volume", &self.volume)
            .finish()
    }
}

impl Density for FnDensity {
    fn dim(&self) -> usize {
        self.dim
    }
    fn pdf(&self, x: &DVector<f64>) -> f64 {
        (self.pdf)(x)
    }
    fn dpdf(&self, x: &DVector<f64>) -> Option<DVector<f64>> {
        self.dpdf.as_ref().map(|g| g(x))
    }
    fn center(&self) -> Option<DVector<f64>> {
        self.center.clone()
    }
    fn volume(&self) -> Option<f64> {
        self.volume
    }
}
