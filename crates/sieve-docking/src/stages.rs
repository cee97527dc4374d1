//! Built-in stage handlers.
//!
//! Each handler resolves its paths fresh from the context, schedules only the
//! work whose output artifacts are missing, and logs progress per item.
//! Per-item failures are logged and skipped; only a missing input directory
//! (or a failure to reach the filesystem at all) aborts a stage.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use sieve_common::{Result, SieveError};

use crate::archive::{self, archive_and_remove, remove_dir_if_empty};
use crate::chimerax::{self, parse_contacts, parse_hbonds, read_report, ResidueSummary};
use crate::complex::enumerate_complexes;
use crate::grid::grid_for_structure;
use crate::layout::{ensure_dir, file_id, find_files, ProjectLayout};
use crate::pipeline::{Stage, StageContext, StageReport};
use crate::prepare::{convert_molecules, ligand_to_pdbqt, prepare_receptor as run_receptor_preparation, ReceptorTargets};
use crate::rescoring::AnnapurnaRunner;
use crate::resume::{pending_by, unfinished, ArtifactIndex};
use crate::table::{RowKey, ScoreTable};
use crate::vina::{read_score_log, DockingJob, VinaRunner};

/// Score column written by the docking stage.
pub const CONFORMER_SCORE: &str = "conformer_score";
pub const CONTACTS_COUNT: &str = "contacts_count";
pub const HBONDS_COUNT: &str = "hbonds_count";
pub const CONTACTS: &str = "contacts";
pub const HBONDS: &str = "hbonds";

fn require_dir(dir: &std::path::Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(SieveError::missing(dir))
    }
}

fn with_suffix(path: &std::path::Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn analysis_archive(layout: &ProjectLayout) -> PathBuf {
    with_suffix(&layout.analysis, ".tgz")
}

fn log_archive(layout: &ProjectLayout) -> PathBuf {
    with_suffix(&layout.docking, ".log.tgz")
}

/// Names already moved into `archive`; an unreadable archive counts as empty.
fn archived_names(path: &std::path::Path) -> BTreeSet<String> {
    if !path.exists() {
        return BTreeSet::new();
    }
    archive::list(path).unwrap_or_else(|e| {
        warn!("Could not list {:?}: {}", path, e);
        BTreeSet::new()
    })
}

// ── Preparation ───────────────────────────────────────────────────────────────

#[instrument(skip(ctx), fields(base = ?ctx.base))]
pub async fn prepare_ligand(ctx: &StageContext) -> Result<StageReport> {
    let t0 = Instant::now();
    let layout = ctx.layout();
    let mut report = StageReport::new(Stage::PrepareLigand.name());

    require_dir(&layout.ligand)?;
    ensure_dir(&layout.ligand_pdbqt)?;

    let sources = find_files(&layout.ligand, &layout.patterns.ligand)?;
    convert_molecules(ctx.runner.as_ref(), &ctx.config.tools.obabel, &sources, "pdb").await?;

    let pdb = find_files(&layout.ligand, &["*.pdb"])?;
    let prepared = find_files(&layout.ligand_pdbqt, &["*.pdbqt"])?;
    let pending = unfinished(&pdb, &prepared);
    if pending.is_empty() {
        warn!("All {} ligands are already prepared.", pdb.len());
        report.skipped = pdb.len();
        return Ok(report);
    }

    info!("{} ligands to be prepared.", pending.len());
    for id in pending {
        if ctx.config.skip.ligands.contains(&id) {
            warn!(ligand = %id, "Ligand is in the skip list.");
            report.skipped += 1;
            continue;
        }
        let source = layout.ligand.join(format!("{id}.pdb"));
        ligand_to_pdbqt(ctx.runner.as_ref(), &ctx.config.tools.obabel, &source, &layout.ligand_pdbqt_file(&id)).await?;
        report.processed += 1;
    }

    info!(processed = report.processed, skipped = report.skipped, "Ligands prepared. Took {:?}.", t0.elapsed());
    Ok(report)
}

#[instrument(skip(ctx), fields(base = ?ctx.base))]
pub async fn prepare_receptor(ctx: &StageContext) -> Result<StageReport> {
    let t0 = Instant::now();
    let layout = ctx.layout();
    let mut report = StageReport::new(Stage::PrepareReceptor.name());

    require_dir(&layout.receptor)?;
    for dir in [&layout.receptor_pdbqt, &layout.receptor_clean, &layout.receptor_summary, &layout.receptor_config] {
        ensure_dir(dir)?;
    }

    let sources = find_files(&layout.receptor, &layout.patterns.receptor)?;
    let prepared = find_files(&layout.receptor_pdbqt, &["*.pdbqt"])?;
    let pending = unfinished(&sources, &prepared);
    if pending.is_empty() {
        warn!("All {} receptors are already prepared.", sources.len());
        report.skipped = sources.len();
        return Ok(report);
    }

    let by_id: BTreeMap<String, PathBuf> = sources.iter().map(|p| (file_id(p), p.clone())).collect();
    info!("{} receptors to be prepared.", pending.len());
    for id in pending {
        if ctx.config.skip.receptors.contains(&id) {
            warn!(receptor = %id, "Receptor is in the skip list.");
            report.skipped += 1;
            continue;
        }
        let Some(source) = by_id.get(&id) else {
            continue;
        };
        let targets = ReceptorTargets {
            clean: layout.receptor_clean.join(format!("{id}.pdb")),
            pdbqt: layout.receptor_pdbqt_file(&id),
            summary: layout.receptor_summary.join(format!("{id}.summary.log")),
        };
        if let Err(e) = run_receptor_preparation(ctx.runner.as_ref(), &ctx.config.tools, source, &targets).await {
            match e {
                SieveError::Spawn { .. } => return Err(e),
                other => {
                    warn!(receptor = %id, error = %other, "Receptor preparation failed");
                    report.skipped += 1;
                    continue;
                }
            }
        }
        report.processed += 1;
    }

    info!(processed = report.processed, skipped = report.skipped, "Receptors prepared. Took {:?}.", t0.elapsed());
    Ok(report)
}

#[instrument(skip(ctx), fields(base = ?ctx.base))]
pub async fn prepare_grid(ctx: &StageContext) -> Result<StageReport> {
    let t0 = Instant::now();
    let layout = ctx.layout();
    let mut report = StageReport::new(Stage::PrepareGrid.name());
    ensure_dir(&layout.receptor_config)?;

    let receptors = find_files(&layout.receptor_pdbqt, &["*.pdbqt"])?;
    let configs = find_files(&layout.receptor_config, &["*.config"])?;
    let pending = unfinished(&receptors, &configs);
    if pending.is_empty() {
        warn!("Grid configs exist for all {} receptors.", receptors.len());
        report.skipped = receptors.len();
        return Ok(report);
    }

    for id in pending {
        let grid = match grid_for_structure(&layout.receptor_pdbqt_file(&id), &ctx.config.grid) {
            Ok(grid) => grid,
            Err(e) => {
                warn!(receptor = %id, error = %e, "Could not read receptor for grid");
                report.skipped += 1;
                continue;
            }
        };
        if grid.is_degenerate() {
            warn!(receptor = %id, "No atoms selected; writing an all-zero grid");
        }
        grid.write_config(&ctx.config.grid, Some(&layout.receptor_config_file(&id)))?;
        report.processed += 1;
    }

    info!(processed = report.processed, "Grid configs written. Took {:?}.", t0.elapsed());
    Ok(report)
}

// ── Docking ───────────────────────────────────────────────────────────────────

#[instrument(skip(ctx), fields(base = ?ctx.base))]
pub async fn perform_docking(ctx: &StageContext) -> Result<StageReport> {
    let t0 = Instant::now();
    let layout = ctx.layout();
    let mut report = StageReport::new(Stage::PerformDocking.name());
    ensure_dir(&layout.docking)?;

    let receptors = find_files(&layout.receptor_pdbqt, &["*.pdbqt"])?;
    let ligands = find_files(&layout.ligand_pdbqt, &["*.pdbqt"])?;
    let complexes = enumerate_complexes(&receptors, &ligands);
    let total = complexes.len();

    let mut index = ArtifactIndex::scan(&layout.docking)?;
    index.extend(archived_names(&log_archive(&layout)));
    let pending = pending_by(complexes, &index, |c| {
        let name = c.name();
        vec![layout.dock_result(&name), layout.dock_log(&name)]
    });
    report.skipped = total - pending.len();
    if pending.is_empty() {
        info!("All {} complexes are already docked.", total);
        return Ok(report);
    }

    let mut jobs = Vec::with_capacity(pending.len());
    for complex in pending {
        let name = complex.name();
        let config = layout.receptor_config_file(&complex.receptor_id);
        if !config.exists() {
            warn!(complex = %name, "{:?} does not exist; skipping.", config);
            report.skipped += 1;
            continue;
        }
        jobs.push(DockingJob {
            out: layout.dock_result(&name),
            log: layout.dock_log(&name),
            name,
            receptor: complex.receptor,
            ligand: complex.ligand,
            config,
        });
    }
    info!("{} of {} complexes to be docked.", jobs.len(), total);

    let vina = Arc::new(VinaRunner::new(ctx.config.tools.vina.clone(), ctx.config.docking.clone()));
    let mut failed = 0;

    if ctx.config.docking.multiprocess {
        let semaphore = Arc::new(Semaphore::new(ctx.config.docking.workers));
        let mut set = JoinSet::new();
        for job in jobs {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| SieveError::Pipeline(e.to_string()))?;
            let runner = ctx.runner.clone();
            let vina = vina.clone();
            set.spawn(async move {
                let _permit = permit;
                let result = vina.dock(runner.as_ref(), &job).await;
                (job.name, result)
            });
        }
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => report.processed += 1,
                Ok((name, Err(e))) => {
                    warn!(complex = %name, error = %e, "Docking failed");
                    failed += 1;
                }
                Err(e) => {
                    error!(error = %e, "Docking task did not complete");
                    failed += 1;
                }
            }
        }
    } else {
        for job in jobs {
            match vina.dock(ctx.runner.as_ref(), &job).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    warn!(complex = %job.name, error = %e, "Docking failed");
                    failed += 1;
                }
            }
        }
    }
    report.skipped += failed;

    info!(processed = report.processed, failed, "Docking finished. Took {:?}.", t0.elapsed());
    Ok(report)
}

// ── Analysis ──────────────────────────────────────────────────────────────────

/// Scores of every docked complex, and the analysis scripts not written yet.
/// Returns the score rows and how many scripts were written.
async fn generate_scripts(ctx: &StageContext) -> Result<(ScoreTable, usize)> {
    let layout = ctx.layout();
    let receptors = find_files(&layout.receptor_pdbqt, &["*.pdbqt"])?;
    let ligands = find_files(&layout.ligand_pdbqt, &["*.pdbqt"])?;

    let archived = archived_names(&analysis_archive(&layout));
    let mut scores = ScoreTable::new();
    let mut written = 0;
    for complex in enumerate_complexes(&receptors, &ligands) {
        let name = complex.name();
        let log = layout.dock_log(&name);
        if !log.exists() {
            continue;
        }
        let poses = match read_score_log(&log) {
            Ok(poses) => poses,
            Err(e) => {
                warn!(complex = %name, error = %e, "Could not read docking log");
                continue;
            }
        };

        let docked = layout.dock_result(&name);
        if !docked.exists() {
            error!(complex = %name, "{:?} doesn't exist.", docked);
            scores.push_row(
                RowKey::new(&complex.receptor_id, &complex.ligand_id, 0),
                [(CONFORMER_SCORE, "0")],
            );
            continue;
        }

        for pose in &poses {
            scores.push_row(
                RowKey::new(&complex.receptor_id, &complex.ligand_id, pose.mode),
                [(CONFORMER_SCORE, pose.affinity.to_string())],
            );
        }

        let script = layout.analysis_script(&name);
        let script_name = script.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        if !script.exists() && !archived.contains(&script_name) {
            let text = chimerax::render_script(&layout, &name, &complex.receptor, &docked, &poses);
            tokio::fs::write(&script, text).await?;
            debug!(complex = %name, poses = poses.len(), "Wrote analysis script");
            written += 1;
        }
    }
    Ok((scores, written))
}

/// Run each complex's script unless its last pose already has an H-bond report.
async fn run_scripts(ctx: &StageContext, table: &ScoreTable) -> Result<usize> {
    let layout = ctx.layout();
    let complexes = table.last_conformers();
    let total = complexes.len();
    let mut ran = 0;

    for (n, key) in complexes.iter().enumerate() {
        let name = key.complex_name();
        let script = layout.analysis_script(&name);
        if !script.exists() {
            debug!("File {:?} not found. Continuing...", script);
            continue;
        }
        if layout.hbonds_file(&name, &key.conformer_id).exists() {
            info!("{} is already processed by ChimeraX.", key.uid());
            continue;
        }
        info!("Processing {} with ChimeraX {}/{} having {} conformers.", name, n + 1, total, key.conformer_id);
        chimerax::run_script(ctx.runner.as_ref(), &ctx.config.tools.chimerax, &script).await?;
        ran += 1;
    }
    Ok(ran)
}

/// Contact and H-bond summaries for every row with analysis reports on disk.
fn collect_interactions(ctx: &StageContext, table: &ScoreTable) -> Result<ScoreTable> {
    let layout = ctx.layout();
    let mut interactions = ScoreTable::new();

    for row in table.rows() {
        let name = row.key.complex_name();
        let contacts_path = layout.contacts_file(&name, &row.key.conformer_id);
        let hbonds_path = layout.hbonds_file(&name, &row.key.conformer_id);

        if !contacts_path.exists() && !hbonds_path.exists() {
            // Reports already archived: keep what the table has.
            if !row.values.contains_key(CONTACTS_COUNT) {
                interactions.push_row(
                    row.key.clone(),
                    [(CONTACTS_COUNT, "0"), (HBONDS_COUNT, "0"), (CONTACTS, ""), (HBONDS, "")],
                );
            }
            continue;
        }

        let contacts = ResidueSummary::of_contacts(&read_report(&contacts_path, parse_contacts)?);
        let hbonds = ResidueSummary::of_hbonds(&read_report(&hbonds_path, parse_hbonds)?);
        interactions.push_row(
            row.key.clone(),
            [
                (CONTACTS_COUNT, contacts.count.to_string()),
                (HBONDS_COUNT, hbonds.count.to_string()),
                (CONTACTS, contacts.residues),
                (HBONDS, hbonds.residues),
            ],
        );
        debug!("Processed {}.", row.key.uid());
    }
    Ok(interactions)
}

#[instrument(skip(ctx), fields(base = ?ctx.base))]
pub async fn analyse_docking(ctx: &StageContext) -> Result<StageReport> {
    let t0 = Instant::now();
    let layout = ctx.layout();
    let mut report = StageReport::new(Stage::AnalyseDocking.name());
    ensure_dir(&layout.analysis)?;

    let (scores, written) = generate_scripts(ctx).await?;
    let mut table = ScoreTable::read_or_default(&layout.score_file)?;
    if scores.is_empty() {
        warn!("No docking scores found; score table not updated.");
    } else {
        info!(rows = scores.len(), scripts = written, "Docking scores collected.");
        table.upsert(scores);
        table.write(&layout.score_file)?;
    }

    if table.is_empty() {
        warn!("Score table {:?} is empty. Skipping analysis.", layout.score_file);
        return Ok(report);
    }

    let ran = run_scripts(ctx, &table).await?;
    info!("ChimeraX scripts execution is completed ({} run).", ran);

    let interactions = collect_interactions(ctx, &table)?;
    report.processed = interactions.len();
    report.skipped = table.len() - interactions.len();
    table.upsert(interactions);
    table.write(&layout.score_file)?;

    info!(rows = table.len(), "Processed ChimeraX results. Took {:?}.", t0.elapsed());
    Ok(report)
}

// ── Rescoring ─────────────────────────────────────────────────────────────────

/// Rescore every docked complex and merge the model scores into the table.
#[instrument(skip(ctx), fields(base = ?ctx.base))]
pub async fn rescore(ctx: &StageContext) -> Result<StageReport> {
    let t0 = Instant::now();
    let layout = ctx.layout();
    let mut report = StageReport::new(Stage::FilterResults.name());

    if !layout.score_file.exists() {
        warn!("Score file {:?} does not exist. Skipping rescoring.", layout.score_file);
        return Ok(report);
    }
    let mut table = ScoreTable::read(&layout.score_file)?;
    ensure_dir(&layout.rescoring)?;

    let annapurna = AnnapurnaRunner::new(ctx.config.tools.conda.clone(), ctx.config.rescoring.clone());
    report.processed = annapurna.rescore(ctx.runner.as_ref(), &layout, &table).await?;

    let scores = annapurna.collect_scores(&layout, &table)?;
    if scores.is_empty() {
        warn!("No rescoring results to merge.");
    } else {
        table.merge(scores);
        table.write(&layout.score_file)?;
    }

    info!(rows = table.len(), "Rescoring merged. Took {:?}.", t0.elapsed());
    Ok(report)
}

pub async fn filter_results(ctx: &StageContext) -> Result<Option<StageReport>> {
    if !ctx.config.rescoring.enabled {
        info!("Rescoring is disabled; nothing to filter.");
        return Ok(None);
    }
    rescore(ctx).await.map(Some)
}

// ── Cleanup ───────────────────────────────────────────────────────────────────

#[instrument(skip(ctx), fields(base = ?ctx.base))]
pub async fn cleanup_files(ctx: &StageContext) -> Result<StageReport> {
    let layout = ctx.layout();
    let mut report = StageReport::new(Stage::CleanupFiles.name());
    info!("Cleaning up the files.");

    let patterns = &layout.patterns;
    let analysis_files = find_files(
        &layout.analysis,
        &[&patterns.contacts, &patterns.hbonds, &patterns.analysis_script],
    )?;
    let analysis_tgz = analysis_archive(&layout);
    let outcome = archive_and_remove(&analysis_tgz, &analysis_files)?;
    report.processed += outcome.deleted;
    report.skipped += outcome.kept;
    if outcome.archive_present {
        remove_dir_if_empty(&layout.analysis)?;
    }

    let logs = find_files(&layout.docking, &[&patterns.dock_log])?;
    let logs_tgz = log_archive(&layout);
    let outcome = archive_and_remove(&logs_tgz, &logs)?;
    report.processed += outcome.deleted;
    report.skipped += outcome.kept;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{CommandOutput, CommandRunner};
    use async_trait::async_trait;
    use sieve_common::RunConfig;
    use std::ffi::OsString;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Records invocations; writes the output file named after `-o`/`-O`.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl CommandRunner for Recorder {
        async fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput> {
            let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().to_string()).collect();
            if let Some(i) = args.iter().position(|a| a == "-O" || a == "-o") {
                std::fs::write(&args[i + 1], "ATOM      1  C   LIG A   1       1.000   2.000   3.000  1.00  0.00\n").unwrap();
            }
            self.calls.lock().unwrap().push((program.to_string(), args));
            Ok(CommandOutput { success: true, ..Default::default() })
        }
    }

    fn context(base: &std::path::Path, runner: Arc<Recorder>) -> StageContext {
        StageContext::new(Arc::new(RunConfig::default()), base, runner)
    }

    #[tokio::test]
    async fn test_prepare_ligand_skips_listed_and_prepared() {
        let dir = tempdir().unwrap();
        let ligand = dir.path().join("ligand");
        std::fs::create_dir(&ligand).unwrap();
        for name in ["a.pdb", "b.pdb", "c.pdb"] {
            std::fs::write(ligand.join(name), "ATOM").unwrap();
        }
        std::fs::create_dir(dir.path().join("ligand-pdbqt")).unwrap();
        std::fs::write(dir.path().join("ligand-pdbqt/a.pdbqt"), "").unwrap();

        let runner = Arc::new(Recorder::default());
        let mut config = RunConfig::default();
        config.skip.ligands = vec!["c".to_string()];
        let ctx = StageContext::new(Arc::new(config), dir.path(), runner.clone());

        let report = prepare_ligand(&ctx).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped, 1);
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "obabel");
        assert!(calls[0].1.contains(&"-h".to_string()));

        drop(calls);
        let again = prepare_ligand(&ctx).await.unwrap();
        assert_eq!(again.processed, 0);
    }

    #[tokio::test]
    async fn test_prepare_receptor_cleans_and_converts() {
        let dir = tempdir().unwrap();
        let receptor = dir.path().join("receptor");
        std::fs::create_dir(&receptor).unwrap();
        std::fs::write(
            receptor.join("rna.pdb"),
            "ATOM      1  P     G A   1      10.000  10.000  10.000  1.00  0.00\nHETATM    2  O   HOH A 101       0.000   0.000   0.000  1.00  0.00\n",
        )
        .unwrap();

        let runner = Arc::new(Recorder::default());
        let ctx = context(dir.path(), runner.clone());
        let report = prepare_receptor(&ctx).await.unwrap();
        assert_eq!(report.processed, 1);

        let clean = std::fs::read_to_string(dir.path().join("receptor-clean/rna.pdb")).unwrap();
        assert!(!clean.contains("HETATM"));
        assert!(dir.path().join("receptor-pdbqt/rna.pdbqt").exists());
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].0, "prepare_receptor");
        assert!(calls[0].1.windows(2).any(|w| w == ["-U", "waters"]));
    }

    #[tokio::test]
    async fn test_prepare_grid_writes_one_config_per_receptor() {
        let dir = tempdir().unwrap();
        let pdbqt = dir.path().join("receptor-pdbqt");
        std::fs::create_dir(&pdbqt).unwrap();
        std::fs::write(
            pdbqt.join("r.pdbqt"),
            "ATOM      1  C   SER A   1       0.000   0.000   0.000  1.00  0.00     0.000 C\n\
             ATOM      2  C   SER A   1      10.000   4.000   2.000  1.00  0.00     0.000 C\n",
        )
        .unwrap();

        let ctx = context(dir.path(), Arc::new(Recorder::default()));
        let report = prepare_grid(&ctx).await.unwrap();
        assert_eq!(report.processed, 1);
        let config = std::fs::read_to_string(dir.path().join("receptor-config/r.config")).unwrap();
        assert!(config.contains("center_x = 5\n"));
        assert!(config.contains("size_x = 11\n"));

        let again = prepare_grid(&ctx).await.unwrap();
        assert_eq!(again.processed, 0);
        assert_eq!(again.skipped, 1);
    }

    #[tokio::test]
    async fn test_docking_skips_receptor_without_config() {
        let dir = tempdir().unwrap();
        for d in ["receptor-pdbqt", "ligand-pdbqt", "receptor-config"] {
            std::fs::create_dir(dir.path().join(d)).unwrap();
        }
        std::fs::write(dir.path().join("receptor-pdbqt/r1.pdbqt"), "").unwrap();
        std::fs::write(dir.path().join("receptor-pdbqt/r2.pdbqt"), "").unwrap();
        std::fs::write(dir.path().join("ligand-pdbqt/l.pdbqt"), "").unwrap();
        std::fs::write(dir.path().join("receptor-config/r1.config"), "").unwrap();

        let runner = Arc::new(Recorder::default());
        let ctx = context(dir.path(), runner.clone());
        let report = perform_docking(&ctx).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.skipped, 1);
        assert!(dir.path().join("docking/r1--l.result.log").exists());
        assert_eq!(runner.calls.lock().unwrap()[0].0, "vina");
    }

    #[tokio::test]
    async fn test_cleanup_without_artifacts_deletes_nothing() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path(), Arc::new(Recorder::default()));
        let report = cleanup_files(&ctx).await.unwrap();
        assert_eq!(report.processed, 0);
        assert!(!dir.path().join("vina-analysis.tgz").exists());
    }
}
