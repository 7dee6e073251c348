//! Multivariate normal densities that tolerate singular covariance.
//!
//! The density is defined on the support subspace of the covariance: with
//! eigenpairs `(λ_k, v_k)` above the cutoff and rank `r`,
//!
//! ```text
//! log p(x) = -0.5 * (r ln 2π + Σ ln λ_k + Σ (v_kᵀ (x-μ))² / λ_k)
//! ```
//!
//! for `x` on the affine support `μ + span(v_k)`. Points off the support have
//! density zero, so their log-density is `-inf`. A point counts as off the
//! support when the residual `(I - V Vᵀ)(x - μ)` is larger than
//! [`support_tolerance`]. A rank-0 covariance therefore gives 0 at the mean
//! and `-inf` everywhere else.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use super::error::{LinalgError, LinalgResult};
use super::spectral::Spectrum;
use super::stable::LN_2PI;

/// A Gaussian restricted to the numerical support of its covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct DegenerateGaussian {
    mean: DVector<f64>,
    support: Spectrum,
    log_pdet: f64,
    rcond: f64,
}

/// Relative residual above which a point is treated as off the support.
///
/// Scales with the eigenvalue cutoff: eigenvalues are variances, residuals
/// are distances, hence the square root.
pub fn support_tolerance(rcond: f64) -> f64 {
    rcond.max(0.0).sqrt()
}

fn mahalanobis_of(coords: &DVector<f64>, values: &[f64]) -> f64 {
    coords
        .iter()
        .zip(values)
        .map(|(c, lambda)| c * c / lambda)
        .sum()
}

impl DegenerateGaussian {
    /// Prepare a density from an explicit covariance matrix.
    pub fn from_covariance(
        mean: DVector<f64>,
        covariance: &DMatrix<f64>,
        rcond: f64,
    ) -> LinalgResult<Self> {
        if covariance.nrows() != mean.len() {
            return Err(LinalgError::DimensionMismatch {
                expected: mean.len(),
                found: covariance.nrows(),
            });
        }
        let spectrum = Spectrum::of_symmetric(covariance)?;
        Self::from_spectrum(mean, &spectrum, rcond)
    }

    /// Prepare a density from an already decomposed covariance.
    pub fn from_spectrum(mean: DVector<f64>, spectrum: &Spectrum, rcond: f64) -> LinalgResult<Self> {
        if spectrum.dim() != mean.len() {
            return Err(LinalgError::DimensionMismatch {
                expected: mean.len(),
                found: spectrum.dim(),
            });
        }
        if mean.iter().any(|v| !v.is_finite()) {
            return Err(LinalgError::NotFinite("mean"));
        }
        let support = spectrum.support(rcond);
        let log_pdet = support.values().iter().map(|v| v.ln()).sum();
        Ok(Self {
            mean,
            support,
            log_pdet,
            rcond,
        })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Dimension of the support subspace.
    pub fn rank(&self) -> usize {
        self.support.len()
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn log_pseudo_determinant(&self) -> f64 {
        self.log_pdet
    }

    /// Eigenpairs spanning the support.
    pub fn support(&self) -> &Spectrum {
        &self.support
    }

    /// Covariance restricted to the support (zero off it).
    pub fn covariance(&self) -> DMatrix<f64> {
        self.support.reconstruct()
    }

    /// Support coordinates of `x - μ`, the residual norm off the support, and
    /// whether `x` counts as on it.
    fn project(&self, x: &[f64]) -> LinalgResult<(DVector<f64>, f64, bool)> {
        if x.len() != self.dim() {
            return Err(LinalgError::DimensionMismatch {
                expected: self.dim(),
                found: x.len(),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(LinalgError::NotFinite("sample"));
        }
        let diff = DVector::from_column_slice(x) - &self.mean;
        let coords = self.support.coordinates(&diff)?;
        let residual = (&diff - self.support.vectors() * &coords).norm();
        let inside = residual <= self.tolerance(diff.norm());
        Ok((coords, residual, inside))
    }

    /// Squared Mahalanobis distance through the pseudo-inverse.
    ///
    /// Only the part of `x - μ` inside the support is measured; see
    /// [`DegenerateGaussian::support_residual`] for the rest.
    pub fn mahalanobis_sq(&self, x: &[f64]) -> LinalgResult<f64> {
        let (coords, _, _) = self.project(x)?;
        Ok(mahalanobis_of(&coords, self.support.values()))
    }

    /// Norm of the component of `x - μ` orthogonal to the support.
    pub fn support_residual(&self, x: &[f64]) -> LinalgResult<f64> {
        Ok(self.project(x)?.1)
    }

    /// Whether `x` lies on the affine support `μ + span(V)`.
    pub fn contains(&self, x: &[f64]) -> LinalgResult<bool> {
        Ok(self.project(x)?.2)
    }

    /// Natural-log density at `x`; `-inf` off the support.
    pub fn log_pdf(&self, x: &[f64]) -> LinalgResult<f64> {
        let (coords, _, inside) = self.project(x)?;
        if !inside {
            return Ok(f64::NEG_INFINITY);
        }
        let maha = mahalanobis_of(&coords, self.support.values());
        Ok(-0.5 * (self.rank() as f64 * LN_2PI + self.log_pdet + maha))
    }

    fn tolerance(&self, offset_norm: f64) -> f64 {
        let spread = self.support.values().first().map_or(0.0, |v| v.sqrt());
        support_tolerance(self.rcond) * (offset_norm + spread)
    }

    /// Draw `μ + Σ_k sqrt(λ_k) z_k v_k` with `z ~ N(0, I_r)`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let mut draw = self.mean.clone();
        for (k, &lambda) in self.support.values().iter().enumerate() {
            let z: f64 = StandardNormal.sample(rng);
            draw.axpy(lambda.sqrt() * z, &self.support.vectors().column(k), 1.0);
        }
        draw
    }
}

/// A Gaussian with a positive-definite covariance, factored once by Cholesky.
///
/// Used where the covariance is regularized and therefore never singular.
#[derive(Debug, Clone)]
pub struct FullGaussian {
    mean: DVector<f64>,
    chol: Cholesky<f64, Dyn>,
    log_det: f64,
}

impl FullGaussian {
    pub fn new(mean: DVector<f64>, covariance: DMatrix<f64>) -> LinalgResult<Self> {
        if covariance.nrows() != mean.len() || covariance.ncols() != mean.len() {
            return Err(LinalgError::DimensionMismatch {
                expected: mean.len(),
                found: covariance.nrows(),
            });
        }
        if covariance.iter().chain(mean.iter()).any(|v| !v.is_finite()) {
            return Err(LinalgError::NotFinite("covariance"));
        }
        let chol = Cholesky::new(covariance).ok_or(LinalgError::NotPositiveDefinite)?;
        let log_det = 2.0 * chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum::<f64>();
        Ok(Self {
            mean,
            chol,
            log_det,
        })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn covariance(&self) -> DMatrix<f64> {
        let l = self.chol.l();
        &l * l.transpose()
    }

    pub fn log_determinant(&self) -> f64 {
        self.log_det
    }

    /// Natural-log density at `x`.
    pub fn log_pdf(&self, x: &DVector<f64>) -> LinalgResult<f64> {
        if x.len() != self.dim() {
            return Err(LinalgError::DimensionMismatch {
                expected: self.dim(),
                found: x.len(),
            });
        }
        let diff = x - &self.mean;
        // L y = diff, so |y|² = diffᵀ Σ⁻¹ diff.
        let y = self
            .chol
            .l_dirty()
            .solve_lower_triangular(&diff)
            .ok_or(LinalgError::NotPositiveDefinite)?;
        Ok(-0.5 * (self.dim() as f64 * LN_2PI + self.log_det + y.norm_squared()))
    }

    /// Draw `μ + L z` with `z ~ N(0, I)`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let z: DVector<f64> = DVector::from_fn(self.dim(), |_, _| StandardNormal.sample(&mut *rng));
        &self.mean + self.chol.l() * z
    }
}

/// One-shot log-density of `x` under `N(mean, covariance)`.
///
/// Decomposes the covariance on every call; prepare a [`DegenerateGaussian`]
/// when evaluating many points against the same parameters.
pub fn mvn_log_pdf(x: &[f64], mean: &[f64], covariance: &DMatrix<f64>, rcond: f64) -> LinalgResult<f64> {
    DegenerateGaussian::from_covariance(DVector::from_column_slice(mean), covariance, rcond)?
        .log_pdf(x)
}
