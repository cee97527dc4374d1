//! Run configuration for docking campaigns.
//!
//! Every field has a declared default so a partial `sieve.toml` (or no file
//! at all) produces a complete configuration. Paths inside a base directory
//! are resolved per invocation by the docking crate, never cached here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SieveError};

/// Complete configuration for one `sieve` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory names and base paths
    #[serde(default)]
    pub layout: LayoutConfig,

    /// File patterns for input pools and artifact suffixes
    #[serde(default)]
    pub patterns: PatternConfig,

    /// Ordered stage names executed by the pipeline runner
    #[serde(default = "default_stages")]
    pub stages: Vec<String>,

    /// Identifiers excluded from preparation
    #[serde(default)]
    pub skip: SkipConfig,

    /// Search box settings written into each receptor config
    #[serde(default)]
    pub grid: GridSettings,

    /// Docking engine invocation settings
    #[serde(default)]
    pub docking: DockingSettings,

    /// External executables
    #[serde(default)]
    pub tools: ToolPaths,

    /// External rescoring model
    #[serde(default)]
    pub rescoring: RescoringConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            patterns: PatternConfig::default(),
            stages: default_stages(),
            skip: SkipConfig::default(),
            grid: GridSettings::default(),
            docking: DockingSettings::default(),
            tools: ToolPaths::default(),
            rescoring: RescoringConfig::default(),
        }
    }
}

pub const DEFAULT_STAGES: &[&str] = &[
    "prepare_ligand",
    "prepare_receptor",
    "prepare_grid",
    "perform_docking",
    "analyse_docking",
    "filter_results",
    "cleanup_files",
];

fn default_stages() -> Vec<String> {
    DEFAULT_STAGES.iter().map(|s| s.to_string()).collect()
}

// ── Layout ────────────────────────────────────────────────────────────────────

/// Directory layout under each base path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Base directories; the pipeline runs once per entry
    #[serde(default = "default_base_paths")]
    pub base_paths: Vec<PathBuf>,

    /// Receptor source directory override (defaults to `<base>/<dir_receptor>`)
    pub receptor_path: Option<PathBuf>,

    /// Ligand source directory override (defaults to `<base>/<dir_ligand>`)
    pub ligand_path: Option<PathBuf>,

    #[serde(default = "default_dir_receptor")]
    pub dir_receptor: String,
    #[serde(default = "default_dir_ligand")]
    pub dir_ligand: String,
    #[serde(default = "default_dir_docking")]
    pub dir_docking: String,
    #[serde(default = "default_dir_receptor_pdbqt")]
    pub dir_receptor_pdbqt: String,
    #[serde(default = "default_dir_receptor_clean")]
    pub dir_receptor_clean: String,
    #[serde(default = "default_dir_receptor_summary")]
    pub dir_receptor_summary: String,
    #[serde(default = "default_dir_receptor_config")]
    pub dir_receptor_config: String,
    #[serde(default = "default_dir_ligand_pdbqt")]
    pub dir_ligand_pdbqt: String,
    #[serde(default = "default_dir_analysis")]
    pub dir_analysis: String,

    /// Canonical score table, relative to the base path
    #[serde(default = "default_score_file")]
    pub score_file: String,
}

fn default_base_paths() -> Vec<PathBuf> { vec![PathBuf::from(".")] }
fn default_dir_receptor() -> String { "receptor".to_string() }
fn default_dir_ligand() -> String { "ligand".to_string() }
fn default_dir_docking() -> String { "docking".to_string() }
fn default_dir_receptor_pdbqt() -> String { "receptor-pdbqt".to_string() }
fn default_dir_receptor_clean() -> String { "receptor-clean".to_string() }
fn default_dir_receptor_summary() -> String { "receptor-summary".to_string() }
fn default_dir_receptor_config() -> String { "receptor-config".to_string() }
fn default_dir_ligand_pdbqt() -> String { "ligand-pdbqt".to_string() }
fn default_dir_analysis() -> String { "vina-analysis".to_string() }
fn default_score_file() -> String { "result.score.csv".to_string() }

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            base_paths: default_base_paths(),
            receptor_path: None,
            ligand_path: None,
            dir_receptor: default_dir_receptor(),
            dir_ligand: default_dir_ligand(),
            dir_docking: default_dir_docking(),
            dir_receptor_pdbqt: default_dir_receptor_pdbqt(),
            dir_receptor_clean: default_dir_receptor_clean(),
            dir_receptor_summary: default_dir_receptor_summary(),
            dir_receptor_config: default_dir_receptor_config(),
            dir_ligand_pdbqt: default_dir_ligand_pdbqt(),
            dir_analysis: default_dir_analysis(),
            score_file: default_score_file(),
        }
    }
}

// ── Patterns ──────────────────────────────────────────────────────────────────

/// Input globs and artifact suffixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    #[serde(default = "default_receptor_patterns")]
    pub receptor: Vec<String>,
    #[serde(default = "default_ligand_patterns")]
    pub ligand: Vec<String>,
    #[serde(default = "default_ext_contacts")]
    pub contacts: String,
    #[serde(default = "default_ext_hbonds")]
    pub hbonds: String,
    #[serde(default = "default_ext_script")]
    pub analysis_script: String,
    #[serde(default = "default_ext_dock_result")]
    pub dock_result: String,
    #[serde(default = "default_ext_dock_log")]
    pub dock_log: String,
}

fn default_receptor_patterns() -> Vec<String> { vec!["*.pdb".to_string()] }
fn default_ligand_patterns() -> Vec<String> {
    vec!["*.pdb".to_string(), "*.sdf".to_string(), "*.mol2".to_string()]
}
fn default_ext_contacts() -> String { "contacts.txt".to_string() }
fn default_ext_hbonds() -> String { "hbonds.txt".to_string() }
fn default_ext_script() -> String { "cxc".to_string() }
fn default_ext_dock_result() -> String { "result.pdbqt".to_string() }
fn default_ext_dock_log() -> String { "result.log".to_string() }

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            receptor: default_receptor_patterns(),
            ligand: default_ligand_patterns(),
            contacts: default_ext_contacts(),
            hbonds: default_ext_hbonds(),
            analysis_script: default_ext_script(),
            dock_result: default_ext_dock_result(),
            dock_log: default_ext_dock_log(),
        }
    }
}

// ── Skip lists ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkipConfig {
    #[serde(default)]
    pub receptors: Vec<String>,
    #[serde(default)]
    pub ligands: Vec<String>,
}

// ── Grid ──────────────────────────────────────────────────────────────────────

/// Search box settings. `None` values are left out of the written config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSettings {
    /// Added to every (capped) box edge
    #[serde(default = "default_spacing")]
    pub spacing: f64,

    /// Restrict the box to atoms of these residue names
    #[serde(default)]
    pub residues: Vec<String>,

    #[serde(default = "default_energy_range")]
    pub energy_range: Option<f64>,
    #[serde(default = "default_seed")]
    pub seed: Option<i64>,
    #[serde(default = "default_num_modes")]
    pub num_modes: Option<u32>,
    #[serde(default = "default_grid_exhaustiveness")]
    pub exhaustiveness: Option<u32>,
    pub cpu: Option<u32>,
    pub flex: Option<String>,
}

fn default_spacing() -> f64 { 1.0 }
fn default_energy_range() -> Option<f64> { Some(3.0) }
fn default_seed() -> Option<i64> { Some(41103333) }
fn default_num_modes() -> Option<u32> { Some(10) }
fn default_grid_exhaustiveness() -> Option<u32> { Some(16) }

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            spacing: default_spacing(),
            residues: vec![],
            energy_range: default_energy_range(),
            seed: default_seed(),
            num_modes: default_num_modes(),
            exhaustiveness: default_grid_exhaustiveness(),
            cpu: None,
            flex: None,
        }
    }
}

// ── Docking ───────────────────────────────────────────────────────────────────

/// Per-complex docking invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockingSettings {
    /// Run complexes concurrently
    #[serde(default)]
    pub multiprocess: bool,

    /// Concurrent docking tasks when `multiprocess` is set
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_cpu")]
    pub cpu: u32,
    #[serde(default = "default_exhaustiveness")]
    pub exhaustiveness: u32,
    #[serde(default = "default_verbosity")]
    pub verbosity: u32,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
fn default_cpu() -> u32 { 4 }
fn default_exhaustiveness() -> u32 { 32 }
fn default_verbosity() -> u32 { 2 }

impl Default for DockingSettings {
    fn default() -> Self {
        Self {
            multiprocess: false,
            workers: default_workers(),
            cpu: default_cpu(),
            exhaustiveness: default_exhaustiveness(),
            verbosity: default_verbosity(),
        }
    }
}

// ── Tools ─────────────────────────────────────────────────────────────────────

/// Executable names or absolute paths of the wrapped tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPaths {
    #[serde(default = "default_vina")]
    pub vina: String,
    #[serde(default = "default_obabel")]
    pub obabel: String,
    #[serde(default = "default_prepare_receptor")]
    pub prepare_receptor: String,
    #[serde(default = "default_chimerax")]
    pub chimerax: String,
    #[serde(default = "default_conda")]
    pub conda: String,
}

fn default_vina() -> String { "vina".to_string() }
fn default_obabel() -> String { "obabel".to_string() }
fn default_prepare_receptor() -> String { "prepare_receptor".to_string() }
fn default_chimerax() -> String { "chimerax".to_string() }
fn default_conda() -> String { "conda".to_string() }

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            vina: default_vina(),
            obabel: default_obabel(),
            prepare_receptor: default_prepare_receptor(),
            chimerax: default_chimerax(),
            conda: default_conda(),
        }
    }
}

// ── Rescoring ─────────────────────────────────────────────────────────────────

/// AnnapuRNA rescoring of docked poses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescoringConfig {
    /// Run rescoring as part of the `filter_results` stage
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_annapurna_path")]
    pub annapurna_path: String,
    #[serde(default = "default_conda_env")]
    pub conda_env: String,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    /// Output directory name under the base path
    #[serde(default = "default_rescoring_dir")]
    pub dir_rescoring: String,
}

fn default_annapurna_path() -> String { "~/annapurna/annapurna.py".to_string() }
fn default_conda_env() -> String { "annapurna".to_string() }
fn default_models() -> Vec<String> { vec!["kNN_modern".to_string()] }
fn default_rescoring_dir() -> String { "rescoring-dl-modern-2".to_string() }

impl Default for RescoringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            annapurna_path: default_annapurna_path(),
            conda_env: default_conda_env(),
            models: default_models(),
            dir_rescoring: default_rescoring_dir(),
        }
    }
}

// ── Helper Methods ─────────────────────────────────────────────────────────────

impl RunConfig {
    /// Load from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reject settings no stage can run with.
    pub fn validate(&self) -> Result<()> {
        if self.layout.base_paths.is_empty() {
            return Err(SieveError::Config("at least one base path is required".to_string()));
        }
        if !(self.grid.spacing > 0.0) {
            return Err(SieveError::Config(format!(
                "grid spacing must be positive, got {}",
                self.grid.spacing
            )));
        }
        if self.docking.workers == 0 {
            return Err(SieveError::Config("docking.workers must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml_str = r#"
            stages = ["prepare_grid", "perform_docking"]

            [grid]
            spacing = 2.0
            residues = ["HEM"]

            [docking]
            multiprocess = true
            workers = 3
        "#;
        let config: RunConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.stages, vec!["prepare_grid", "perform_docking"]);
        assert_eq!(config.grid.spacing, 2.0);
        assert_eq!(config.grid.seed, Some(41103333));
        assert_eq!(config.docking.workers, 3);
        assert_eq!(config.docking.exhaustiveness, 32);
        assert_eq!(config.layout.dir_analysis, "vina-analysis");
        assert_eq!(config.patterns.ligand.len(), 3);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: RunConfig = toml::from_str("").unwrap();
        assert_eq!(config.stages.len(), DEFAULT_STAGES.len());
        assert_eq!(config.stages[0], "prepare_ligand");
        assert_eq!(config.stages[6], "cleanup_files");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RunConfig::default();
        config.grid.spacing = 0.0;
        assert!(matches!(config.validate(), Err(SieveError::Config(_))));

        let mut config = RunConfig::default();
        config.layout.base_paths.clear();
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.docking.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sieve.toml");
        std::fs::write(&path, "[rescoring]\nenabled = true\nmodels = [\"DL_basic\", \"kNN_modern\"]\n").unwrap();
        let config = RunConfig::from_toml_file(&path).unwrap();
        assert!(config.rescoring.enabled);
        assert_eq!(config.rescoring.models, vec!["DL_basic", "kNN_modern"]);
        assert_eq!(config.rescoring.conda_env, "annapurna");
    }
}
