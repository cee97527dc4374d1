//! Receptor x ligand work universe.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

use crate::layout::{file_id, COMPLEX_SEPARATOR};

/// One receptor/ligand pair. Identity is `(receptor_id, ligand_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Complex {
    pub receptor_id: String,
    pub ligand_id: String,
    pub receptor: PathBuf,
    pub ligand: PathBuf,
}

impl Complex {
    /// `receptor--ligand`, the stem of every per-complex artifact.
    pub fn name(&self) -> String {
        complex_id(&self.receptor_id, &self.ligand_id)
    }
}

pub fn complex_id(receptor_id: &str, ligand_id: &str) -> String {
    format!("{receptor_id}{COMPLEX_SEPARATOR}{ligand_id}")
}

/// `receptor--ligand--conformer`, the row key of the score table.
pub fn complex_uid(receptor_id: &str, ligand_id: &str, conformer_id: &str) -> String {
    format!(
        "{}{COMPLEX_SEPARATOR}{conformer_id}",
        complex_id(receptor_id, ligand_id)
    )
}

/// Map each path to its identifier. When two files share an identifier the
/// first (in sorted path order) wins.
fn pool_by_id(paths: &[PathBuf]) -> BTreeMap<String, PathBuf> {
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();

    let mut pool = BTreeMap::new();
    for path in sorted {
        let id = file_id(path);
        if id.is_empty() {
            continue;
        }
        if let Some(existing) = pool.get(&id) {
            warn!(id = %id, kept = ?existing, dropped = ?path, "Duplicate identifier in pool");
            continue;
        }
        pool.insert(id, path.clone());
    }
    pool
}

/// Full cross product of the two pools. Nothing is excluded here.
pub fn enumerate_complexes(receptors: &[PathBuf], ligands: &[PathBuf]) -> Vec<Complex> {
    let receptors = pool_by_id(receptors);
    let ligands = pool_by_id(ligands);

    let mut complexes = Vec::with_capacity(receptors.len() * ligands.len());
    for (receptor_id, receptor) in &receptors {
        for (ligand_id, ligand) in &ligands {
            complexes.push(Complex {
                receptor_id: receptor_id.clone(),
                ligand_id: ligand_id.clone(),
                receptor: receptor.clone(),
                ligand: ligand.clone(),
            });
        }
    }
    complexes
}
