//! Resumability: presence of an output artifact means the work is done.
//!
//! Every decision here is a set difference over extension-stripped,
//! case-sensitive identifiers or file names. Timestamps and file contents
//! are never consulted.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use sieve_common::Result;

use crate::layout::file_id;

/// Identifiers of a set of paths.
pub fn identifiers<P: AsRef<Path>>(paths: &[P]) -> BTreeSet<String> {
    paths.iter().map(|p| file_id(p.as_ref())).collect()
}

/// Identifiers present among `inputs` but absent among `outputs`.
pub fn unfinished<P: AsRef<Path>, Q: AsRef<Path>>(inputs: &[P], outputs: &[Q]) -> BTreeSet<String> {
    let done = identifiers(outputs);
    identifiers(inputs)
        .into_iter()
        .filter(|id| !done.contains(id))
        .collect()
}

/// One-shot snapshot of the file names inside a directory.
///
/// Taken once per stage so thousands of presence checks don't each hit the
/// filesystem.
#[derive(Debug, Clone, Default)]
pub struct ArtifactIndex {
    dir: PathBuf,
    names: BTreeSet<String>,
}

impl ArtifactIndex {
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut names = BTreeSet::new();
        if dir.is_dir() {
            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                names.insert(entry.file_name().to_string_lossy().to_string());
            }
        }
        Ok(Self { dir: dir.to_path_buf(), names })
    }

    /// True if `path` lives in the scanned directory and was present at scan time.
    pub fn contains(&self, path: &Path) -> bool {
        if path.parent() != Some(self.dir.as_path()) {
            return path.exists();
        }
        path.file_name()
            .map(|n| self.names.contains(n.to_string_lossy().as_ref()))
            .unwrap_or(false)
    }

    /// Treat `names` (e.g. an archive listing) as present in the directory.
    pub fn extend<I: IntoIterator<Item = String>>(&mut self, names: I) {
        self.names.extend(names);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Items for which at least one required artifact is missing.
pub fn pending_by<T, F>(items: Vec<T>, index: &ArtifactIndex, required: F) -> Vec<T>
where
    F: Fn(&T) -> Vec<PathBuf>,
{
    items
        .into_iter()
        .filter(|item| !required(item).iter().all(|p| index.contains(p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_unfinished_is_set_difference() {
        let inputs = vec!["r/a.pdb", "r/b.pdb", "r/c.pdb"];
        let outputs = vec!["q/b.pdbqt"];
        let todo = unfinished(&inputs, &outputs);
        assert_eq!(todo.into_iter().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn test_unfinished_is_case_sensitive() {
        let todo = unfinished(&["A.pdb"], &["a.pdbqt"]);
        assert!(todo.contains("A"));
    }

    #[test]
    fn test_second_pass_is_empty() {
        let dir = tempdir().unwrap();
        let inputs: Vec<PathBuf> = ["x", "y"].iter().map(|n| dir.path().join(format!("{n}.pdb"))).collect();
        let mut outputs: Vec<PathBuf> = Vec::new();

        let first = unfinished(&inputs, &outputs);
        assert_eq!(first.len(), 2);
        for id in &first {
            let out = dir.path().join(format!("{id}.pdbqt"));
            std::fs::write(&out, "").unwrap();
            outputs.push(out);
        }
        assert!(unfinished(&inputs, &outputs).is_empty());
    }

    #[test]
    fn test_pending_by_requires_all_artifacts() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.result.pdbqt"), "").unwrap();
        std::fs::write(dir.path().join("a.result.log"), "").unwrap();
        std::fs::write(dir.path().join("b.result.pdbqt"), "").unwrap();
        let index = ArtifactIndex::scan(dir.path()).unwrap();
        assert_eq!(index.len(), 3);

        let base = dir.path().to_path_buf();
        let pending = pending_by(vec!["a", "b", "c"], &index, |name| {
            vec![
                base.join(format!("{name}.result.pdbqt")),
                base.join(format!("{name}.result.log")),
            ]
        });
        assert_eq!(pending, vec!["b", "c"]);
    }

    #[test]
    fn test_index_of_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let index = ArtifactIndex::scan(&dir.path().join("absent")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_archived_names_count_as_present() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.result.pdbqt"), "").unwrap();
        let mut index = ArtifactIndex::scan(dir.path()).unwrap();
        let log = dir.path().join("a.result.log");
        assert!(!index.contains(&log));
        index.extend(["a.result.log".to_string()]);
        assert!(index.contains(&log));
    }
}
