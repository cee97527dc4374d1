//! Rescoring of docked poses with AnnapuRNA.
//!
//! Each complex is scored once (all its conformers in one call); the
//! per-model tab-separated outputs are folded back into the score table.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use sieve_common::{RescoringConfig, Result};

use crate::args;
use crate::layout::{strip_extensions, ProjectLayout};
use crate::table::{RowKey, ScoreTable};
use crate::tools::CommandRunner;

/// Metric columns of an AnnapuRNA result, after `conformer_id, complex_id`.
pub const MODEL_METRICS: [&str; 6] = ["im", "iu", "score_RNA-Ligand", "E_ligand", "score_ligand", "score"];

/// `<model>__<metric>`
pub fn model_column(model: &str, metric: &str) -> String {
    format!("{model}__{metric}")
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}

#[derive(Debug, Clone)]
pub struct AnnapurnaRunner {
    conda: String,
    config: RescoringConfig,
}

impl AnnapurnaRunner {
    pub fn new(conda: impl Into<String>, config: RescoringConfig) -> Self {
        Self { conda: conda.into(), config }
    }

    /// Output directory of one complex.
    pub fn output_dir(&self, layout: &ProjectLayout, complex_name: &str) -> PathBuf {
        layout.rescoring.join(complex_name)
    }

    /// Model result file of one complex.
    pub fn result_file(&self, layout: &ProjectLayout, complex_name: &str, model: &str) -> PathBuf {
        self.output_dir(layout, complex_name)
            .join(format!("{complex_name}.{model}.csv"))
    }

    pub fn arguments(&self, receptor: &Path, docked: &Path, output_prefix: &Path) -> Vec<OsString> {
        let mut args = args![
            "run", "-n", &self.config.conda_env,
            "python", expand_home(&self.config.annapurna_path),
            "-r", receptor,
            "-l", docked,
        ];
        for model in &self.config.models {
            args.push("-m".into());
            args.push(model.into());
        }
        args.extend(args!["-o", output_prefix, "-s", "--overwrite"]);
        args
    }

    /// Score every complex of the table that has no output directory yet.
    /// Returns the number of complexes sent to the model.
    pub async fn rescore(&self, runner: &dyn CommandRunner, layout: &ProjectLayout, table: &ScoreTable) -> Result<usize> {
        let complexes = table.last_conformers();
        let total = complexes.len();
        let mut processed = 0;

        for (n, key) in complexes.iter().enumerate() {
            let name = key.complex_name();
            let output_dir = self.output_dir(layout, &name);
            if output_dir.exists() {
                info!("{} already analysed.", name);
                continue;
            }
            let receptor = layout.receptor_pdbqt_file(&key.receptor);
            let docked = layout.dock_result(&name);
            if !docked.exists() {
                warn!("{:?} does not exist. Not rescoring {}.", docked, name);
                continue;
            }
            let output = runner
                .run(&self.conda, &self.arguments(&receptor, &docked, &output_dir.join(&name)))
                .await?;
            debug!(complex = %name, output = %output.combined(), "AnnapuRNA output");
            info!("Rescoring processed {} ({}/{}).", name, n + 1, total);
            processed += 1;
        }
        Ok(processed)
    }

    /// Scores of every model for every complex in `table`, keyed by `complex_uid`.
    pub fn collect_scores(&self, layout: &ProjectLayout, table: &ScoreTable) -> Result<ScoreTable> {
        let mut all = ScoreTable::new();
        for key in table.last_conformers() {
            let name = key.complex_name();
            let mut complex = ScoreTable::new();
            for model in &self.config.models {
                let path = self.result_file(layout, &name, model);
                if !path.exists() {
                    error!("{:?} file doesn't exist.", path);
                    continue;
                }
                complex.merge(read_model_scores(&path, model)?);
            }
            // complexes share the model columns; merging would drop earlier ones
            all.upsert(complex);
            debug!("Merge processed {}.", name);
        }
        Ok(all)
    }
}

/// Read one model's tab-separated result. Columns are taken by position:
/// `conformer_id, complex_id` and then [`MODEL_METRICS`].
pub fn read_model_scores(path: &Path, model: &str) -> Result<ScoreTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)?;

    let mut table = ScoreTable::new();
    for record in reader.records() {
        let record = record?;
        if record.len() < 2 + MODEL_METRICS.len() {
            warn!(file = ?path, fields = record.len(), "Dropping short rescoring row");
            continue;
        }
        let conformer_id = record.get(0).unwrap_or("").trim();
        let complex_id = strip_extensions(record.get(1).unwrap_or("").trim(), 2);
        let Some(key) = RowKey::from_complex(&complex_id, conformer_id) else {
            warn!(file = ?path, complex_id = %complex_id, "Dropping rescoring row with unreadable complex id");
            continue;
        };
        let values = MODEL_METRICS
            .iter()
            .enumerate()
            .map(|(i, metric)| (model_column(model, metric), record.get(2 + i).unwrap_or("").to_string()))
            .filter(|(_, v)| !v.is_empty());
        table.push_row(key, values);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_common::RunConfig;
    use tempfile::tempdir;

    const KNN: &str = "pose\tligand\tim\tiu\tscore_RNA-Ligand\tE_ligand\tscore_ligand\tscore
1\tdocking/r--l.result.pdbqt\t1\t0\t-120.5\t3.2\t-1.0\t-118.3
2\tdocking/r--l.result.pdbqt\t1\t0\t-99.1\t2.7\t-0.8\t-97.2
";

    fn layout(base: &Path) -> ProjectLayout {
        ProjectLayout::resolve(&RunConfig::default(), base)
    }

    #[test]
    fn test_read_model_scores() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r--l.kNN_modern.csv");
        std::fs::write(&path, KNN).unwrap();

        let table = read_model_scores(&path, "kNN_modern").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("r--l--1", "kNN_modern__score"), Some("-118.3"));
        assert_eq!(table.get("r--l--2", "kNN_modern__score_RNA-Ligand"), Some("-99.1"));
        assert_eq!(table.columns().len(), MODEL_METRICS.len());
    }

    #[test]
    fn test_collect_scores_merges_into_existing_rows() {
        let dir = tempdir().unwrap();
        let layout = layout(dir.path());
        let runner = AnnapurnaRunner::new("conda", RescoringConfig::default());
        let out = runner.result_file(&layout, "r--l", "kNN_modern");
        std::fs::create_dir_all(out.parent().unwrap()).unwrap();
        std::fs::write(&out, KNN).unwrap();

        let mut table = ScoreTable::new();
        table.set(&RowKey::new("r", "l", 1), "conformer_score", "-7.4");
        table.set(&RowKey::new("r", "l", 2), "conformer_score", "-7.1");
        table.set(&RowKey::new("r", "m", 1), "conformer_score", "-5.0");

        let scores = runner.collect_scores(&layout, &table).unwrap();
        table.merge(scores);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("r--l--2", "kNN_modern__score"), Some("-97.2"));
        assert_eq!(table.get("r--l--2", "conformer_score"), Some("-7.1"));
        assert_eq!(table.get("r--m--1", "kNN_modern__score"), None);
    }

    #[test]
    fn test_collect_scores_keeps_every_complex() {
        let dir = tempdir().unwrap();
        let layout = layout(dir.path());
        let runner = AnnapurnaRunner::new("conda", RescoringConfig::default());
        for (name, score) in [("r--a", "-11.0"), ("r--b", "-22.0")] {
            let out = runner.result_file(&layout, name, "kNN_modern");
            std::fs::create_dir_all(out.parent().unwrap()).unwrap();
            std::fs::write(
                &out,
                format!("pose\tligand\tim\tiu\ts\te\tsl\tscore\n1\t{name}.result.pdbqt\t1\t0\t-1\t0\t0\t{score}\n"),
            )
            .unwrap();
        }

        let mut table = ScoreTable::new();
        table.set(&RowKey::new("r", "a", 1), "conformer_score", "-7.4");
        table.set(&RowKey::new("r", "b", 1), "conformer_score", "-6.9");

        let scores = runner.collect_scores(&layout, &table).unwrap();
        assert_eq!(scores.get("r--a--1", "kNN_modern__score"), Some("-11.0"));
        assert_eq!(scores.get("r--b--1", "kNN_modern__score"), Some("-22.0"));

        table.merge(scores);
        assert_eq!(table.get("r--a--1", "kNN_modern__score"), Some("-11.0"));
        assert_eq!(table.get("r--b--1", "kNN_modern__score"), Some("-22.0"));
        assert_eq!(table.get("r--a--1", "conformer_score"), Some("-7.4"));
    }

    #[test]
    fn test_arguments() {
        let config = RescoringConfig {
            annapurna_path: "/opt/annapurna.py".to_string(),
            models: vec!["kNN_modern".to_string(), "DL_basic".to_string()],
            ..Default::default()
        };
        let runner = AnnapurnaRunner::new("conda", config);
        let args: Vec<String> = runner
            .arguments(Path::new("rec.pdbqt"), Path::new("r--l.result.pdbqt"), Path::new("out/r--l/r--l"))
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args.join(" "),
            "run -n annapurna python /opt/annapurna.py -r rec.pdbqt -l r--l.result.pdbqt \
             -m kNN_modern -m DL_basic -o out/r--l/r--l -s --overwrite"
        );
    }
}
