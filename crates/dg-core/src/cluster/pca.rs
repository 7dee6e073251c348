//! Variance-maximizing linear projection (principal axes).
//!
//! The projection is fitted once on a set of rows and reused for any later
//! vector: `y = Wᵀ (x - μ)`, with `W` holding the leading eigenvectors of
//! the sample covariance as columns. Only axes with non-zero variance are
//! kept, so a table of identical rows projects to zero dimensions.

use dg_common::{Error, Result};
use dg_math::Spectrum;
use nalgebra::{DMatrix, DVector};

use crate::inference::computation_error;

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    mean: DVector<f64>,
    /// `dim × components`, orthonormal columns.
    axes: DMatrix<f64>,
    explained_variance: Vec<f64>,
}

impl Projection {
    /// Fit up to `components` principal axes on the rows of `data`.
    pub fn fit(data: &DMatrix<f64>, components: usize, rcond: f64) -> Result<Self> {
        let (n, dim) = data.shape();
        if n == 0 {
            return Err(Error::EmptyTrainingTable);
        }
        if components == 0 {
            return Err(Error::InvalidParameter {
                name: "components",
                message: "must be at least 1".to_string(),
            });
        }

        let mean = DVector::from_fn(dim, |j, _| data.column(j).sum() / n as f64);
        let mean_t = mean.transpose();
        let mut centered = data.clone();
        for mut row in centered.row_iter_mut() {
            row -= &mean_t;
        }

        let divisor = n.saturating_sub(1).max(1) as f64;
        let spectrum = Spectrum::of_scatter(&centered, divisor, rcond)
            .map_err(|e| computation_error("projection", e))?
            .support(rcond)
            .leading(components);

        Ok(Self {
            mean,
            axes: spectrum.vectors().clone(),
            explained_variance: spectrum.values().to_vec(),
        })
    }

    /// Number of retained axes (at most the requested count).
    pub fn components(&self) -> usize {
        self.axes.ncols()
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Variance captured along each retained axis, descending.
    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    /// Project one vector.
    pub fn transform(&self, x: &[f64]) -> Result<DVector<f64>> {
        if x.len() != self.dim() {
            return Err(Error::InvalidParameter {
                name: "x",
                message: format!("expected length {}, got {}", self.dim(), x.len()),
            });
        }
        let centered = DVector::from_column_slice(x) - &self.mean;
        Ok(self.axes.tr_mul(&centered))
    }

    /// Project every row: `(X - 1μᵀ) W`, shape `n × components`.
    pub fn transform_rows(&self, data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if data.ncols() != self.dim() {
            return Err(Error::InvalidParameter {
                name: "data",
                message: format!("expected {} columns, got {}", self.dim(), data.ncols()),
            });
        }
        let mean_t = self.mean.transpose();
        let mut centered = data.clone();
        for mut row in centered.row_iter_mut() {
            row -= &mean_t;
        }
        Ok(centered * &self.axes)
    }

    /// Map projected coordinates back: `μ + W y`.
    pub fn inverse_transform(&self, y: &DVector<f64>) -> Result<DVector<f64>> {
        if y.len() != self.components() {
            return Err(Error::InvalidParameter {
                name: "y",
                message: format!("expected length {}, got {}", self.components(), y.len()),
            });
        }
        Ok(&self.mean + &self.axes * y)
    }
}
