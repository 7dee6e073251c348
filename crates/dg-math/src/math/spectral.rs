//! Spectral decomposition of symmetric positive semi-definite matrices.
//!
//! A [`Spectrum`] holds eigenpairs sorted by descending eigenvalue. It is the
//! single primitive behind the pseudo-inverse, the pseudo-determinant, the
//! support subspace of a singular covariance, and the principal axes used for
//! projection.
//!
//! When a covariance is built from fewer rows than it has columns, its rank is
//! bounded by the row count. [`Spectrum::of_scatter`] then decomposes the small
//! Gram matrix `X Xᵀ` instead of `Xᵀ X` and lifts the eigenvectors back, which
//! turns a 784×784 decomposition into an n×n one.

use nalgebra::{DMatrix, DVector, SymmetricEigen};

use super::error::{LinalgError, LinalgResult};

/// Relative eigenvalue cutoff separating the numerical support from the null
/// space: eigenvalues at or below `DEFAULT_RCOND * max|λ|` count as zero.
pub const DEFAULT_RCOND: f64 = 1e6 * f64::EPSILON;

/// Eigenpairs of a symmetric matrix, sorted by descending eigenvalue.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    values: Vec<f64>,
    /// `dim × values.len()`, orthonormal columns.
    vectors: DMatrix<f64>,
}

impl Spectrum {
    /// Decompose a symmetric matrix. The input is symmetrized first so tiny
    /// asymmetries from accumulated rounding do not matter.
    pub fn of_symmetric(matrix: &DMatrix<f64>) -> LinalgResult<Self> {
        if matrix.nrows() != matrix.ncols() {
            return Err(LinalgError::DimensionMismatch {
                expected: matrix.nrows(),
                found: matrix.ncols(),
            });
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(LinalgError::NotFinite("symmetric matrix"));
        }
        let dim = matrix.nrows();
        if dim == 0 {
            return Ok(Self::zeros(0));
        }

        let symmetric = (matrix + matrix.transpose()) * 0.5;
        let eigen = SymmetricEigen::try_new(symmetric, f64::EPSILON, max_sweeps(dim))
            .ok_or(LinalgError::NoConvergence { dim })?;

        let mut order: Vec<usize> = (0..dim).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let mut vectors = DMatrix::zeros(dim, dim);
        for (col, &idx) in order.iter().enumerate() {
            vectors.set_column(col, &eigen.eigenvectors.column(idx));
        }
        Ok(Self {
            values: order.iter().map(|&idx| eigen.eigenvalues[idx]).collect(),
            vectors,
        })
    }

    /// Spectrum of `Xᵀ X / divisor` for a row-major data matrix `X`
    /// (typically centered rows, with `divisor = n - 1`).
    ///
    /// Only eigenpairs above the `rcond` cutoff are returned when the Gram
    /// path is taken, since null-space eigenvectors cannot be recovered from
    /// the Gram matrix.
    pub fn of_scatter(rows: &DMatrix<f64>, divisor: f64, rcond: f64) -> LinalgResult<Self> {
        if !divisor.is_finite() || divisor <= 0.0 {
            return Err(LinalgError::NotFinite("scatter divisor"));
        }
        let (n, dim) = rows.shape();
        if n >= dim {
            let covariance = (rows.transpose() * rows) / divisor;
            return Self::of_symmetric(&covariance);
        }

        let gram = (rows * rows.transpose()) / divisor;
        let small = Self::of_symmetric(&gram)?;
        let cutoff = small.cutoff(rcond);

        let mut values = Vec::new();
        let mut columns: Vec<DVector<f64>> = Vec::new();
        for (k, &lambda) in small.values.iter().enumerate() {
            if lambda <= cutoff {
                break;
            }
            // Xᵀu has squared norm uᵀ X Xᵀ u = divisor * λ.
            let lifted = rows.transpose() * small.vectors.column(k);
            columns.push(lifted / (divisor * lambda).sqrt());
            values.push(lambda);
        }

        let vectors = if columns.is_empty() {
            DMatrix::zeros(dim, 0)
        } else {
            DMatrix::from_columns(&columns)
        };
        Ok(Self { values, vectors })
    }

    /// The spectrum of a `dim × dim` zero matrix: no eigenpairs at all.
    pub fn zeros(dim: usize) -> Self {
        Self {
            values: Vec::new(),
            vectors: DMatrix::zeros(dim, 0),
        }
    }

    /// Ambient dimension of the eigenvectors.
    pub fn dim(&self) -> usize {
        self.vectors.nrows()
    }

    /// Number of stored eigenpairs.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Eigenvectors as columns, in the same order as [`Spectrum::values`].
    pub fn vectors(&self) -> &DMatrix<f64> {
        &self.vectors
    }

    /// Absolute cutoff below which an eigenvalue is treated as zero.
    pub fn cutoff(&self, rcond: f64) -> f64 {
        let largest = self
            .values
            .iter()
            .fold(0.0f64, |acc, v| acc.max(v.abs()));
        rcond * largest
    }

    /// Keep only eigenpairs strictly above the cutoff (the numerical support).
    pub fn support(&self, rcond: f64) -> Self {
        let cutoff = self.cutoff(rcond);
        let rank = self.values.iter().take_while(|&&v| v > cutoff).count();
        self.leading(rank)
    }

    /// Keep the `k` largest eigenpairs (fewer if not available).
    pub fn leading(&self, k: usize) -> Self {
        let k = k.min(self.values.len());
        Self {
            values: self.values[..k].to_vec(),
            vectors: self.vectors.columns(0, k).into_owned(),
        }
    }

    /// Sum of log eigenvalues over the support: the log pseudo-determinant.
    pub fn log_pseudo_determinant(&self, rcond: f64) -> f64 {
        let cutoff = self.cutoff(rcond);
        self.values
            .iter()
            .filter(|&&v| v > cutoff)
            .map(|v| v.ln())
            .sum()
    }

    /// Moore–Penrose pseudo-inverse `V diag(1/λ) Vᵀ` over the support.
    pub fn pseudo_inverse(&self, rcond: f64) -> DMatrix<f64> {
        let support = self.support(rcond);
        let mut scaled = support.vectors.clone();
        for (col, &lambda) in support.values.iter().enumerate() {
            scaled.column_mut(col).scale_mut(1.0 / lambda);
        }
        scaled * support.vectors.transpose()
    }

    /// Rebuild `V diag(λ) Vᵀ` from the stored eigenpairs.
    pub fn reconstruct(&self) -> DMatrix<f64> {
        let mut scaled = self.vectors.clone();
        for (col, &lambda) in self.values.iter().enumerate() {
            scaled.column_mut(col).scale_mut(lambda);
        }
        scaled * self.vectors.transpose()
    }

    /// Coordinates of `x` along each stored eigenvector (`Vᵀ x`).
    pub fn coordinates(&self, x: &DVector<f64>) -> LinalgResult<DVector<f64>> {
        if x.len() != self.dim() {
            return Err(LinalgError::DimensionMismatch {
                expected: self.dim(),
                found: x.len(),
            });
        }
        Ok(self.vectors.tr_mul(x))
    }
}

/// Generous cap on QR sweeps so a pathological input fails instead of spinning.
fn max_sweeps(dim: usize) -> usize {
    1_000 * dim.max(1)
}
