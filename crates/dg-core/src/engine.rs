//! Engine state: the fitted models shared by every operation.
//!
//! The engine owns three independently cached models:
//! - class statistics (classification and sampling)
//! - the cluster model (projection + mixture over the whole table)
//! - per-label mixtures (generation)
//!
//! Each lives in a slot that is `Uninitialized`, `Initializing` or
//! `Ready`. Fitting marks the slot `Initializing`, builds the model without
//! holding the lock, then publishes it (or resets the slot on failure).
//! Readers never wait for a fit: any slot that is not `Ready` fails with
//! `ModelNotInitialized`. A published model is immutable and shared through
//! an `Arc`, so a later re-fit never disturbs a call already using it.
//!
//! Every fill and teardown bumps the slot's generation. A fill publishes only
//! if no later fill or teardown has touched the slot since it started, so an
//! overlapping older fill can never expose its model over a newer one.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dg_common::{Error, Label, LabelTable, ModelKind, Result, Sample, TrainingTable};
use dg_config::EngineConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::cluster::label_mixture::label_matrix;
use crate::cluster::{fit_label_mixtures, ClusterEvaluation, ClusterModel, LabelMixture};
use crate::decision::{decide, Decision};
use crate::generate::{mean_image, sample_class};
use crate::inference::{compute_posterior, estimate, rank_zero_labels, ClassStatistics, PosteriorResult};
use crate::log_event;
use crate::logging::{event_names, generate_run_id, LogContext, Stage};

/// Lifecycle state of one cached model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Uninitialized,
    Initializing,
    Ready,
}

enum Slot<T> {
    Uninitialized,
    Initializing,
    Ready(Arc<T>),
}

impl<T> Slot<T> {
    fn state(&self) -> SlotState {
        match self {
            Slot::Uninitialized => SlotState::Uninitialized,
            Slot::Initializing => SlotState::Initializing,
            Slot::Ready(_) => SlotState::Ready,
        }
    }
}

struct SlotCell<T> {
    slot: Slot<T>,
    generation: u64,
}

impl<T> SlotCell<T> {
    fn new() -> Self {
        Self {
            slot: Slot::Uninitialized,
            generation: 0,
        }
    }

    /// Move to `next` under a fresh generation and return it.
    fn advance(&mut self, next: Slot<T>) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.slot = next;
        self.generation
    }
}

/// Per-class summary of fitted statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassSummary {
    pub label: Label,
    pub count: usize,
    pub prior: f64,
    /// Dimension of the covariance support.
    pub rank: usize,
    pub degenerate: bool,
}

/// What `estimate` produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModelSummary {
    pub rows: usize,
    /// SHA-256 of the training table the statistics were fitted on.
    pub fingerprint: String,
    pub classes: Vec<ClassSummary>,
}

/// What `fit_clusters` produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClusterSummary {
    /// Projected dimensions actually retained.
    pub dims: usize,
    pub clusters: usize,
    /// Mean per-row log-likelihood of the fitted mixture.
    pub log_likelihood: f64,
    pub converged: bool,
    pub iterations: usize,
}

/// One fitted per-label generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeneratorSummary {
    pub label: Label,
    pub rows: usize,
    pub dims: usize,
    pub components: usize,
}

/// Decision plus the posterior it was taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Classification {
    pub decision: Decision,
    pub posterior: PosteriorResult,
}

/// Snapshot of every slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EngineStatus {
    pub class_statistics: SlotState,
    pub cluster_model: SlotState,
    pub label_mixtures: SlotState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ModelSummary>,
}

struct ClassModel {
    stats: LabelTable<ClassStatistics>,
    summary: ModelSummary,
}

impl ClassModel {
    fn model_id(&self) -> &str {
        &self.summary.fingerprint[..12.min(self.summary.fingerprint.len())]
    }
}

/// The inference engine and its cached models.
pub struct Engine {
    config: EngineConfig,
    ctx: LogContext,
    statistics: RwLock<SlotCell<ClassModel>>,
    clusters: RwLock<SlotCell<ClusterModel>>,
    mixtures: RwLock<SlotCell<LabelTable<LabelMixture>>>,
    rng: Mutex<StdRng>,
}

impl Engine {
    /// Create an engine with every slot uninitialized and a fresh run id.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_context(config, LogContext::new(generate_run_id()))
    }

    pub fn with_context(config: EngineConfig, ctx: LogContext) -> Self {
        let rng = match config.sample_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            ctx,
            statistics: RwLock::new(SlotCell::new()),
            clusters: RwLock::new(SlotCell::new()),
            mixtures: RwLock::new(SlotCell::new()),
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &LogContext {
        &self.ctx
    }

    // ------------------------------------------------------------------
    // Classification path
    // ------------------------------------------------------------------

    /// (Re)build class statistics from `table`.
    pub fn estimate(&self, table: &TrainingTable) -> Result<ModelSummary> {
        let rcond = self.config.support_rcond;
        let model = self.fill(&self.statistics, ModelKind::ClassStatistics, Stage::Estimate, || {
            let stats = estimate(table, rcond)?;
            let summary = summarize(table, &stats);
            Ok(ClassModel { stats, summary })
        })?;

        let ctx = self.ctx.clone().with_model_id(model.model_id());
        for class in &model.summary.classes {
            if class.degenerate {
                log_event!(
                    ctx,
                    WARN,
                    event_names::CLASS_DEGENERATE,
                    Stage::Estimate,
                    "class has fewer than two rows; covariance is singular",
                    label = class.label.value(),
                    count = class.count
                );
            }
        }
        let rank_zero = rank_zero_labels(&model.stats).len();
        log_event!(
            ctx,
            INFO,
            event_names::MODEL_ESTIMATED,
            Stage::Estimate,
            "class statistics estimated",
            rows = model.summary.rows,
            classes = model.summary.classes.len(),
            rank_zero_classes = rank_zero
        );
        Ok(model.summary.clone())
    }

    /// Most probable label for `sample`.
    pub fn classify(&self, sample: &Sample) -> Result<Label> {
        Ok(self.classify_detailed(sample)?.decision.label)
    }

    /// Validate raw pixel values, then classify.
    pub fn classify_values(&self, values: &[i64]) -> Result<Label> {
        let sample = Sample::from_values(values)?;
        self.classify(&sample)
    }

    /// Decision together with the full posterior.
    pub fn classify_detailed(&self, sample: &Sample) -> Result<Classification> {
        let model = self.read_ready(&self.statistics, ModelKind::ClassStatistics)?;
        let posterior = compute_posterior(&model.stats, sample)?;
        let decision = decide(&posterior.posterior)?;

        let ctx = self.ctx.clone().with_model_id(model.model_id());
        log_event!(
            ctx,
            DEBUG,
            event_names::CLASSIFY_DONE,
            Stage::Classify,
            "sample classified",
            label = decision.label.value(),
            probability = decision.probability,
            log_evidence = posterior.log_evidence
        );
        Ok(Classification {
            decision,
            posterior,
        })
    }

    /// Draw a digit image from the class Gaussian of `label`.
    pub fn sample(&self, label: i64) -> Result<Sample> {
        let label = Label::new(label)?;
        let model = self.read_ready(&self.statistics, ModelKind::ClassStatistics)?;
        let class = class_of(&model, label)?;
        let image = {
            let mut rng = self.lock_rng()?;
            sample_class(class, &mut *rng)?
        };
        log_event!(
            self.ctx,
            DEBUG,
            event_names::SAMPLE_DONE,
            Stage::Sample,
            "class sample drawn",
            label = label.value(),
            rank = class.rank()
        );
        Ok(image)
    }

    /// The rescaled class mean of `label`.
    pub fn sample_mean(&self, label: i64) -> Result<Sample> {
        let label = Label::new(label)?;
        let model = self.read_ready(&self.statistics, ModelKind::ClassStatistics)?;
        mean_image(class_of(&model, label)?)
    }

    // ------------------------------------------------------------------
    // Clustering evaluator
    // ------------------------------------------------------------------

    /// Fit the projection + mixture used by [`Engine::evaluate_clusters`].
    pub fn fit_clusters(
        &self,
        table: &TrainingTable,
        dims: usize,
        clusters: usize,
    ) -> Result<ClusterSummary> {
        let config = &self.config;
        let model = self.fill(&self.clusters, ModelKind::ClusterModel, Stage::Cluster, || {
            ClusterModel::fit(table, dims, clusters, &config.mixture, config.support_rcond)
        })?;
        let summary = ClusterSummary {
            dims: model.dims(),
            clusters: model.clusters(),
            log_likelihood: model.mixture.log_likelihood(),
            converged: model.mixture.converged(),
            iterations: model.mixture.iterations(),
        };
        log_event!(
            self.ctx,
            INFO,
            event_names::CLUSTER_FITTED,
            Stage::Cluster,
            "cluster model fitted",
            dims = summary.dims,
            clusters = summary.clusters,
            log_likelihood = summary.log_likelihood,
            converged = summary.converged,
            iterations = summary.iterations
        );
        Ok(summary)
    }

    /// Score the fitted clusters against the labels of `table`.
    pub fn evaluate_clusters(&self, table: &TrainingTable) -> Result<ClusterEvaluation> {
        let model = self.read_ready(&self.clusters, ModelKind::ClusterModel)?;
        let evaluation = model.evaluate(table)?;
        log_event!(
            self.ctx,
            INFO,
            event_names::EVALUATE_DONE,
            Stage::Evaluate,
            "clusters evaluated",
            rows = evaluation.assignments.len(),
            accuracy = evaluation.accuracy
        );
        Ok(evaluation)
    }

    /// Fit the cluster model on `table`, then evaluate it on the same table.
    pub fn fit_and_evaluate_clusters(
        &self,
        table: &TrainingTable,
        dims: usize,
        clusters: usize,
    ) -> Result<ClusterEvaluation> {
        self.fit_clusters(table, dims, clusters)?;
        self.evaluate_clusters(table)
    }

    // ------------------------------------------------------------------
    // Per-label generator
    // ------------------------------------------------------------------

    /// Fit one projection + mixture generator per observed label.
    pub fn fit_label_mixtures(&self, table: &TrainingTable) -> Result<Vec<GeneratorSummary>> {
        let config = &self.config;
        let model = self.fill(&self.mixtures, ModelKind::LabelMixtures, Stage::Project, || {
            fit_label_mixtures(table, config)
        })?;
        let summaries: Vec<GeneratorSummary> = model
            .iter()
            .map(|(label, gen)| GeneratorSummary {
                label,
                rows: gen.rows,
                dims: gen.dims(),
                components: gen.components(),
            })
            .collect();
        log_event!(
            self.ctx,
            INFO,
            event_names::PROJECT_DONE,
            Stage::Project,
            "per-label generators fitted",
            labels = summaries.len(),
            pca_components = config.pca_components,
            gmm_components = config.gmm_components
        );
        Ok(summaries)
    }

    /// Draw a digit image from the per-label mixture of `label`.
    pub fn generate(&self, label: i64) -> Result<Sample> {
        let label = Label::new(label)?;
        let model = self.read_ready(&self.mixtures, ModelKind::LabelMixtures)?;
        let gen = model.get(label).ok_or(Error::ModelNotInitialized {
            model: ModelKind::LabelMixtures,
        })?;
        let mut rng = self.lock_rng()?;
        gen.generate(&mut *rng)
    }

    /// Project the rows of `table` labeled `label` and group them by
    /// mixture component.
    pub fn label_clusters(
        &self,
        label: i64,
        table: &TrainingTable,
    ) -> Result<BTreeMap<usize, Vec<Vec<f64>>>> {
        let label = Label::new(label)?;
        let model = self.read_ready(&self.mixtures, ModelKind::LabelMixtures)?;
        let gen = model.get(label).ok_or(Error::ModelNotInitialized {
            model: ModelKind::LabelMixtures,
        })?;
        gen.clusters(&label_matrix(table, label))
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Drop every cached model.
    pub fn teardown(&self) -> Result<()> {
        write(&self.statistics)?.advance(Slot::Uninitialized);
        write(&self.clusters)?.advance(Slot::Uninitialized);
        write(&self.mixtures)?.advance(Slot::Uninitialized);
        log_event!(
            self.ctx,
            INFO,
            event_names::MODEL_TORN_DOWN,
            Stage::Init,
            "all models torn down"
        );
        Ok(())
    }

    pub fn status(&self) -> Result<EngineStatus> {
        let stats = read(&self.statistics)?;
        let summary = match &stats.slot {
            Slot::Ready(model) => Some(model.summary.clone()),
            _ => None,
        };
        Ok(EngineStatus {
            class_statistics: stats.slot.state(),
            cluster_model: read(&self.clusters)?.slot.state(),
            label_mixtures: read(&self.mixtures)?.slot.state(),
            summary,
        })
    }

    /// Run `build` and publish its result into `slot`.
    ///
    /// A build that finishes after a newer fill (or a teardown) started on
    /// the same slot leaves the slot alone; its model is still returned to
    /// the caller.
    fn fill<T, F>(
        &self,
        slot: &RwLock<SlotCell<T>>,
        kind: ModelKind,
        stage: Stage,
        build: F,
    ) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let model_name = kind.to_string();
        let ticket = write(slot)?.advance(Slot::Initializing);
        log_event!(
            self.ctx,
            INFO,
            event_names::MODEL_INITIALIZING,
            stage,
            "model initializing",
            model = model_name.as_str()
        );

        let outcome = build();
        let mut cell = write(slot)?;
        if cell.generation != ticket {
            drop(cell);
            log_event!(
                self.ctx,
                WARN,
                event_names::MODEL_SUPERSEDED,
                stage,
                "model fit superseded by a newer fill",
                model = model_name.as_str()
            );
            return outcome.map(Arc::new);
        }

        match outcome {
            Ok(model) => {
                let model = Arc::new(model);
                cell.slot = Slot::Ready(Arc::clone(&model));
                drop(cell);
                log_event!(
                    self.ctx,
                    INFO,
                    event_names::MODEL_READY,
                    stage,
                    "model ready",
                    model = model_name.as_str()
                );
                Ok(model)
            }
            Err(err) => {
                cell.slot = Slot::Uninitialized;
                drop(cell);
                let reason = err.to_string();
                log_event!(
                    self.ctx,
                    WARN,
                    event_names::MODEL_FAILED,
                    stage,
                    "model initialization failed",
                    model = model_name.as_str(),
                    error = reason.as_str()
                );
                Err(err)
            }
        }
    }

    fn read_ready<T>(&self, slot: &RwLock<SlotCell<T>>, kind: ModelKind) -> Result<Arc<T>> {
        match &read(slot)?.slot {
            Slot::Ready(model) => Ok(Arc::clone(model)),
            Slot::Uninitialized | Slot::Initializing => {
                Err(Error::ModelNotInitialized { model: kind })
            }
        }
    }

    fn lock_rng(&self) -> Result<std::sync::MutexGuard<'_, StdRng>> {
        self.rng
            .lock()
            .map_err(|_| Error::InternalComputation("sampling RNG lock poisoned".to_string()))
    }
}

fn class_of(model: &ClassModel, label: Label) -> Result<&ClassStatistics> {
    model.stats.get(label).ok_or(Error::ModelNotInitialized {
        model: ModelKind::ClassStatistics,
    })
}

fn summarize(table: &TrainingTable, stats: &LabelTable<ClassStatistics>) -> ModelSummary {
    ModelSummary {
        rows: table.len(),
        fingerprint: table.fingerprint(),
        classes: stats
            .iter()
            .map(|(label, class)| ClassSummary {
                label,
                count: class.count,
                prior: class.prior,
                rank: class.rank(),
                degenerate: class.is_degenerate(),
            })
            .collect(),
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| Error::InternalComputation("engine state lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| Error::InternalComputation("engine state lock poisoned".to_string()))
}
