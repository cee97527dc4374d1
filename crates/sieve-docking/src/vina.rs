//! Molecular docking using AutoDock Vina.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use sieve_common::{DockingSettings, Result};

use crate::args;
use crate::tools::CommandRunner;

/// Line that opens the pose table in a Vina log.
pub const SCORE_TABLE_SEPARATOR: &str = "-----+------------+----------+----------";

/// One docked conformer as ranked by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// 1-based mode index
    pub mode: u32,
    /// Estimated binding affinity (kcal/mol)
    pub affinity: f64,
    pub rmsd_lb: Option<f64>,
    pub rmsd_ub: Option<f64>,
}

fn parse_score_line(line: &str) -> Option<Pose> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 2 {
        return None;
    }
    Some(Pose {
        mode: fields[0].parse().ok()?,
        affinity: fields[1].parse().ok()?,
        rmsd_lb: fields.get(2).and_then(|v| v.parse().ok()),
        rmsd_ub: fields.get(3).and_then(|v| v.parse().ok()),
    })
}

/// Parse the pose table of a Vina log.
///
/// Rows are the whitespace-indented lines after the separator, up to the
/// first line that is not one. A log without a separator has no poses.
pub fn parse_score_log(content: &str) -> Vec<Pose> {
    let mut poses = Vec::new();
    let mut in_table = false;
    for line in content.lines() {
        if !in_table {
            in_table = line.starts_with(SCORE_TABLE_SEPARATOR);
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        match parse_score_line(line) {
            Some(pose) => poses.push(pose),
            None => warn!(line = %line.trim(), "Dropping unreadable score row"),
        }
    }
    poses
}

pub fn read_score_log(path: &Path) -> Result<Vec<Pose>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_score_log(&content))
}

/// Inputs for one docking run.
#[derive(Debug, Clone)]
pub struct DockingJob {
    pub name: String,
    pub receptor: PathBuf,
    pub ligand: PathBuf,
    pub config: PathBuf,
    pub out: PathBuf,
    pub log: PathBuf,
}

/// Wrapper for AutoDock Vina execution.
#[derive(Debug, Clone)]
pub struct VinaRunner {
    executable: String,
    settings: DockingSettings,
}

impl VinaRunner {
    pub fn new(executable: impl Into<String>, settings: DockingSettings) -> Self {
        Self { executable: executable.into(), settings }
    }

    pub fn arguments(&self, job: &DockingJob) -> Vec<std::ffi::OsString> {
        args![
            "--cpu", self.settings.cpu.to_string(),
            "--receptor", &job.receptor,
            "--config", &job.config,
            "--ligand", &job.ligand,
            "--exhaustiveness", self.settings.exhaustiveness.to_string(),
            "--out", &job.out,
            "--verbosity", self.settings.verbosity.to_string(),
        ]
    }

    /// Run Vina for one complex and write whatever it printed to the job's log.
    pub async fn dock(&self, runner: &dyn CommandRunner, job: &DockingJob) -> Result<()> {
        info!(complex = %job.name, "Running AutoDock Vina");
        let output = runner.run(&self.executable, &self.arguments(job)).await?;
        tokio::fs::write(&job.log, output.combined()).await?;
        debug!(complex = %job.name, log = ?job.log, success = output.success, "AutoDock Vina finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
AutoDock Vina v1.2.5
Performing docking (random seed: 41103333) ... done.

mode |   affinity | dist from best mode
     | (kcal/mol) | rmsd l.b.| rmsd u.b.
-----+------------+----------+----------
   1       -7.412          0          0
   2       -7.1        1.804      2.515
   3       -6.95       2.113      7.031
Writing output ... done.
";

    #[test]
    fn test_parse_three_poses_in_order() {
        let poses = parse_score_log(LOG);
        assert_eq!(poses.len(), 3);
        assert_eq!(poses.iter().map(|p| p.mode).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(poses[0].affinity, -7.412);
        assert_eq!(poses[1].rmsd_ub, Some(2.515));
    }

    #[test]
    fn test_no_separator_is_empty() {
        assert!(parse_score_log("mode | affinity\n   1  -7.0  0  0\n").is_empty());
        assert!(parse_score_log("").is_empty());
    }

    #[test]
    fn test_mode_one_without_rmsd() {
        let poses = parse_score_log(&format!("{SCORE_TABLE_SEPARATOR}\n   1   -5.5\n"));
        assert_eq!(poses[0].rmsd_lb, None);
        assert_eq!(poses[0].rmsd_ub, None);
    }

    #[test]
    fn test_unreadable_row_skipped() {
        let log = format!("{SCORE_TABLE_SEPARATOR}\n   x   -5.5 0 0\n   2  -5.0 1 2\n");
        let poses = parse_score_log(&log);
        assert_eq!(poses.len(), 1);
        assert_eq!(poses[0].mode, 2);
    }

    #[test]
    fn test_arguments() {
        let vina = VinaRunner::new("vina", DockingSettings::default());
        let job = DockingJob {
            name: "r--l".into(),
            receptor: "r.pdbqt".into(),
            ligand: "l.pdbqt".into(),
            config: "r.config".into(),
            out: "r--l.result.pdbqt".into(),
            log: "r--l.result.log".into(),
        };
        let args: Vec<String> = vina.arguments(&job).iter().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(args[0..2], ["--cpu", "4"]);
        assert!(args.windows(2).any(|w| w == ["--exhaustiveness", "32"]));
        assert!(args.windows(2).any(|w| w == ["--out", "r--l.result.pdbqt"]));
    }
}
