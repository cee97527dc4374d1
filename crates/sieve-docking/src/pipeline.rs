//! Ordered execution of the configured stages over one base directory.
//!
//! Stage names from the configuration resolve first to the built-in
//! [`Stage`] variants, then to registered [`StageHandler`] plugins. A name
//! that resolves to neither is logged and skipped; the remaining stages
//! still run. A stage that returns an error stops the run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

use sieve_common::{Result, RunConfig, SieveError};

use crate::layout::ProjectLayout;
use crate::stages;
use crate::tools::SharedRunner;

// ── Stages ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PrepareLigand,
    PrepareReceptor,
    PrepareGrid,
    PerformDocking,
    AnalyseDocking,
    FilterResults,
    CleanupFiles,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::PrepareLigand,
        Stage::PrepareReceptor,
        Stage::PrepareGrid,
        Stage::PerformDocking,
        Stage::AnalyseDocking,
        Stage::FilterResults,
        Stage::CleanupFiles,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::PrepareLigand => "prepare_ligand",
            Stage::PrepareReceptor => "prepare_receptor",
            Stage::PrepareGrid => "prepare_grid",
            Stage::PerformDocking => "perform_docking",
            Stage::AnalyseDocking => "analyse_docking",
            Stage::FilterResults => "filter_results",
            Stage::CleanupFiles => "cleanup_files",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| SieveError::Pipeline(format!("unknown stage {s:?}")))
    }
}

// ── Context and reports ───────────────────────────────────────────────────────

/// Everything a stage may use. Paths are derived on demand through
/// [`StageContext::layout`], never carried between stages.
#[derive(Clone)]
pub struct StageContext {
    pub config: Arc<RunConfig>,
    pub base: PathBuf,
    pub runner: SharedRunner,
}

impl StageContext {
    pub fn new(config: Arc<RunConfig>, base: impl Into<PathBuf>, runner: SharedRunner) -> Self {
        Self { config, base: base.into(), runner }
    }

    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::resolve(&self.config, &self.base)
    }
}

/// Summary returned by a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: String,
    /// Items the stage did work for
    pub processed: usize,
    /// Items skipped: already done, excluded, or missing a prerequisite
    pub skipped: usize,
    pub duration_ms: u64,
}

impl StageReport {
    pub fn new(stage: impl Into<String>) -> Self {
        Self { stage: stage.into(), ..Default::default() }
    }
}

/// A stage supplied from outside the built-in set.
#[async_trait]
pub trait StageHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &StageContext) -> Result<Option<StageReport>>;
}

async fn run_builtin(stage: Stage, ctx: &StageContext) -> Result<Option<StageReport>> {
    match stage {
        Stage::PrepareLigand => stages::prepare_ligand(ctx).await.map(Some),
        Stage::PrepareReceptor => stages::prepare_receptor(ctx).await.map(Some),
        Stage::PrepareGrid => stages::prepare_grid(ctx).await.map(Some),
        Stage::PerformDocking => stages::perform_docking(ctx).await.map(Some),
        Stage::AnalyseDocking => stages::analyse_docking(ctx).await.map(Some),
        Stage::FilterResults => stages::filter_results(ctx).await,
        Stage::CleanupFiles => stages::cleanup_files(ctx).await.map(Some),
    }
}

// ── Runner ────────────────────────────────────────────────────────────────────

pub type StageResults = BTreeMap<String, Option<StageReport>>;

pub struct Pipeline {
    ctx: StageContext,
    plugins: HashMap<String, Arc<dyn StageHandler>>,
}

impl Pipeline {
    pub fn new(config: Arc<RunConfig>, base: &Path, runner: SharedRunner) -> Self {
        Self {
            ctx: StageContext::new(config, base, runner),
            plugins: HashMap::new(),
        }
    }

    /// Register a plugin stage, addressable by its name in the stage list.
    pub fn with_stage(mut self, handler: Arc<dyn StageHandler>) -> Self {
        self.plugins.insert(handler.name().to_string(), handler);
        self
    }

    pub fn context(&self) -> &StageContext {
        &self.ctx
    }

    /// Run every configured stage in order. Results are keyed by stage name;
    /// unresolvable stages have no entry.
    #[instrument(skip(self), fields(base = ?self.ctx.base))]
    pub async fn run(&self) -> Result<StageResults> {
        let t0 = Instant::now();
        let mut results = StageResults::new();
        let names = &self.ctx.config.stages;
        info!(stages = ?names, "Starting pipeline");

        for name in names {
            let started = Instant::now();
            info!(stage = %name, "Running stage");

            let outcome = match name.parse::<Stage>() {
                Ok(stage) => run_builtin(stage, &self.ctx).await,
                Err(_) => match self.plugins.get(name) {
                    Some(handler) => handler.run(&self.ctx).await,
                    None => {
                        error!(stage = %name, "Stage is not defined; skipping");
                        continue;
                    }
                },
            };

            let report = match outcome {
                Ok(report) => report,
                Err(e) => {
                    error!(stage = %name, error = %e, "Stage failed; stopping the run");
                    return Err(e);
                }
            };
            let elapsed = started.elapsed();
            let report = report.map(|mut r| {
                r.duration_ms = elapsed.as_millis() as u64;
                r
            });
            info!(stage = %name, took = ?elapsed, "Stage finished");
            results.insert(name.clone(), report);
        }

        info!(took = ?t0.elapsed(), "Pipeline finished");
        Ok(results)
    }
}
