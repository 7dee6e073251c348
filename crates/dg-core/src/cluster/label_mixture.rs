//! Per-label mixture generator.
//!
//! Every label gets its own projection (`pca_components` axes fitted on that
//! label's rows) and its own `gmm_components`-component mixture in the
//! projected space. Generating a digit draws from the mixture, maps the draw
//! back to pixel space through the inverse projection and rescales it.
//!
//! Component counts are capped at the label's row count. A label whose rows
//! are all identical has no projected dimensions; it keeps no mixture and
//! always generates its (rescaled) mean.

use std::collections::BTreeMap;

use dg_common::{Label, LabelTable, Result, Sample, TrainingTable};
use dg_config::EngineConfig;
use nalgebra::{DMatrix, DVector};
use rand::Rng;

use super::evaluate::table_matrix;
use super::gmm::GaussianMixture;
use super::pca::Projection;
use crate::generate::rescale;

#[derive(Debug, Clone)]
pub struct LabelMixture {
    pub label: Label,
    /// Training rows the generator was fitted on.
    pub rows: usize,
    projection: Projection,
    mixture: Option<GaussianMixture>,
}

impl LabelMixture {
    /// Fit the projection and mixture on one label's rows.
    pub fn fit(label: Label, data: &DMatrix<f64>, config: &EngineConfig) -> Result<Self> {
        let projection = Projection::fit(data, config.pca_components, config.support_rcond)?;
        let mixture = if projection.components() == 0 {
            None
        } else {
            let k = config.gmm_components.min(data.nrows());
            let projected = projection.transform_rows(data)?;
            Some(GaussianMixture::fit(&projected, k, &config.mixture)?)
        };
        Ok(Self {
            label,
            rows: data.nrows(),
            projection,
            mixture,
        })
    }

    /// Projected dimensions actually retained.
    pub fn dims(&self) -> usize {
        self.projection.components()
    }

    /// Mixture components (0 for a constant label).
    pub fn components(&self) -> usize {
        self.mixture.as_ref().map_or(0, GaussianMixture::n_components)
    }

    pub fn mixture(&self) -> Option<&GaussianMixture> {
        self.mixture.as_ref()
    }

    /// Draw one digit image.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Sample> {
        let y = match &self.mixture {
            Some(mixture) => mixture.sample(rng),
            None => DVector::zeros(0),
        };
        let x = self.projection.inverse_transform(&y)?;
        rescale(x.as_slice())
    }

    /// Project `data` and group the points by most probable component.
    ///
    /// Every component id appears in the result, even with no members. A
    /// label without a mixture reports a single group 0.
    pub fn clusters(&self, data: &DMatrix<f64>) -> Result<BTreeMap<usize, Vec<Vec<f64>>>> {
        let projected = self.projection.transform_rows(data)?;
        let mut groups: BTreeMap<usize, Vec<Vec<f64>>> =
            (0..self.components().max(1)).map(|k| (k, Vec::new())).collect();

        let assignments = match &self.mixture {
            Some(mixture) => mixture.predict_rows(&projected)?,
            None => vec![0; projected.nrows()],
        };
        for (i, k) in assignments.into_iter().enumerate() {
            let point: Vec<f64> = projected.row(i).iter().copied().collect();
            groups.entry(k).or_default().push(point);
        }
        Ok(groups)
    }
}

/// Fit one generator per label observed in `table`.
pub fn fit_label_mixtures(
    table: &TrainingTable,
    config: &EngineConfig,
) -> Result<LabelTable<LabelMixture>> {
    if table.is_empty() {
        return Err(dg_common::Error::EmptyTrainingTable);
    }
    let mut out = LabelTable::new();
    for label in table.labels() {
        let data = label_matrix(table, label);
        out.insert(label, LabelMixture::fit(label, &data, config)?);
    }
    Ok(out)
}

/// `n × 784` matrix of the rows carrying `label`.
pub(crate) fn label_matrix(table: &TrainingTable, label: Label) -> DMatrix<f64> {
    let subset: TrainingTable = table
        .iter()
        .filter(|(_, l)| *l == label)
        .map(|(s, l)| (s.clone(), l))
        .collect();
    table_matrix(&subset)
}
