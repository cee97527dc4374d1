//! Directory layout of a base path and artifact discovery.
//!
//! A `ProjectLayout` is resolved fresh for every stage invocation from the
//! immutable `RunConfig`; nothing here is cached between stages.

use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::debug;

use sieve_common::config::PatternConfig;
use sieve_common::{Result, RunConfig, SieveError};

/// Separator between receptor, ligand and conformer parts of an identity.
pub const COMPLEX_SEPARATOR: &str = "--";

/// Resolved paths for one base directory.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub base: PathBuf,
    pub receptor: PathBuf,
    pub ligand: PathBuf,
    pub docking: PathBuf,
    pub receptor_pdbqt: PathBuf,
    pub receptor_clean: PathBuf,
    pub receptor_summary: PathBuf,
    pub receptor_config: PathBuf,
    pub ligand_pdbqt: PathBuf,
    pub analysis: PathBuf,
    pub rescoring: PathBuf,
    pub score_file: PathBuf,
    pub patterns: PatternConfig,
}

impl ProjectLayout {
    pub fn resolve(config: &RunConfig, base: &Path) -> Self {
        let l = &config.layout;
        Self {
            base: base.to_path_buf(),
            receptor: l.receptor_path.clone().unwrap_or_else(|| base.join(&l.dir_receptor)),
            ligand: l.ligand_path.clone().unwrap_or_else(|| base.join(&l.dir_ligand)),
            docking: base.join(&l.dir_docking),
            receptor_pdbqt: base.join(&l.dir_receptor_pdbqt),
            receptor_clean: base.join(&l.dir_receptor_clean),
            receptor_summary: base.join(&l.dir_receptor_summary),
            receptor_config: base.join(&l.dir_receptor_config),
            ligand_pdbqt: base.join(&l.dir_ligand_pdbqt),
            analysis: base.join(&l.dir_analysis),
            rescoring: base.join(&config.rescoring.dir_rescoring),
            score_file: base.join(&l.score_file),
            patterns: config.patterns.clone(),
        }
    }

    pub fn receptor_pdbqt_file(&self, receptor_id: &str) -> PathBuf {
        self.receptor_pdbqt.join(format!("{receptor_id}.pdbqt"))
    }

    pub fn ligand_pdbqt_file(&self, ligand_id: &str) -> PathBuf {
        self.ligand_pdbqt.join(format!("{ligand_id}.pdbqt"))
    }

    pub fn receptor_config_file(&self, receptor_id: &str) -> PathBuf {
        self.receptor_config.join(format!("{receptor_id}.config"))
    }

    pub fn dock_result(&self, complex_name: &str) -> PathBuf {
        self.docking.join(format!("{complex_name}.{}", self.patterns.dock_result))
    }

    pub fn dock_log(&self, complex_name: &str) -> PathBuf {
        self.docking.join(format!("{complex_name}.{}", self.patterns.dock_log))
    }

    pub fn analysis_script(&self, complex_name: &str) -> PathBuf {
        self.analysis.join(format!("{complex_name}.{}", self.patterns.analysis_script))
    }

    pub fn contacts_file(&self, complex_name: &str, conformer_id: &str) -> PathBuf {
        self.analysis.join(format!(
            "{complex_name}{COMPLEX_SEPARATOR}{conformer_id}.{}",
            self.patterns.contacts
        ))
    }

    pub fn hbonds_file(&self, complex_name: &str, conformer_id: &str) -> PathBuf {
        self.analysis.join(format!(
            "{complex_name}{COMPLEX_SEPARATOR}{conformer_id}.{}",
            self.patterns.hbonds
        ))
    }
}

/// Create `dir` (and parents) if needed and return it.
pub fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    Ok(dir.to_path_buf())
}

/// File name without directory and without its last extension.
pub fn file_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .unwrap_or_default()
}

/// Strip up to `count` trailing extensions from a file name.
pub fn strip_extensions(name: &str, count: usize) -> String {
    let file_name = Path::new(name)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    let mut stem = file_name.as_str();
    for _ in 0..count {
        match stem.rfind('.') {
            Some(idx) if idx > 0 => stem = &stem[..idx],
            _ => break,
        }
    }
    stem.to_string()
}

/// Compile a shell-style pattern (`*`, `?`, `[...]`).
/// A pattern without wildcards matches as a file name suffix.
fn compile_pattern(pattern: &str) -> Result<Pattern> {
    let pattern = if pattern.contains(['*', '?', '[']) {
        pattern.to_string()
    } else {
        format!("*{}", Pattern::escape(pattern))
    };
    Pattern::new(&pattern).map_err(|e| SieveError::Config(format!("bad file pattern {pattern:?}: {e}")))
}

/// List regular files directly under `dir` whose name matches any pattern.
/// A missing directory yields an empty list. Output is sorted.
pub fn find_files<S: AsRef<str>>(dir: &Path, patterns: &[S]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        debug!("{:?} does not exist; no files", dir);
        return Ok(Vec::new());
    }
    let matchers = patterns
        .iter()
        .map(|p| compile_pattern(p.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if matchers.iter().any(|m| m.matches(&name)) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
