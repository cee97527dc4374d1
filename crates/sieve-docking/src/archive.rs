//! Gzip tarballs of intermediate artifacts.
//!
//! Originals are deleted only after their names have been read back from the
//! persisted archive. No archive on disk means nothing is deleted.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use sieve_common::{Result, SieveError};

fn base_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| SieveError::Archive(format!("{path:?} has no file name")))
}

/// File names contained in an archive.
pub fn list(archive: &Path) -> Result<BTreeSet<String>> {
    let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive)?));
    let mut names = BTreeSet::new();
    for entry in tar.entries()? {
        let entry = entry?;
        if let Some(name) = entry.path()?.file_name() {
            names.insert(name.to_string_lossy().to_string());
        }
    }
    Ok(names)
}

/// Add `files` (stored by base name) to `archive`, creating it if needed.
/// An existing archive is rewritten with its old entries first; an old entry
/// with the same name as a new file is replaced.
pub fn add_files(archive: &Path, files: &[PathBuf]) -> Result<()> {
    let incoming = files.iter().map(|f| base_name(f)).collect::<Result<BTreeSet<_>>>()?;
    let dir = archive.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut builder = tar::Builder::new(GzEncoder::new(&mut tmp, Compression::default()));

        if archive.exists() {
            let mut old = tar::Archive::new(GzDecoder::new(File::open(archive)?));
            for entry in old.entries()? {
                let mut entry = entry?;
                let path = entry.path()?.to_path_buf();
                let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                if incoming.contains(&name) {
                    debug!("Replacing {} in {:?}", name, archive);
                    continue;
                }
                let mut data = Vec::new();
                entry.read_to_end(&mut data)?;
                let mut header = entry.header().clone();
                builder.append_data(&mut header, &path, data.as_slice())?;
            }
        }

        for file in files {
            builder.append_path_with_name(file, base_name(file)?)?;
        }
        builder.into_inner()?.finish()?;
    }
    tmp.persist(archive).map_err(|e| SieveError::Io(e.error))?;
    Ok(())
}

/// What an archive-then-delete pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub archive_present: bool,
    pub deleted: usize,
    pub kept: usize,
}

/// Archive `files`, then delete the ones the archive listing confirms.
pub fn archive_and_remove(archive: &Path, files: &[PathBuf]) -> Result<ArchiveOutcome> {
    if !files.is_empty() {
        info!("{} files to be compressed into {:?}.", files.len(), archive);
        if let Err(e) = add_files(archive, files) {
            // an older archive may list these names with stale content
            error!("Compressing into {:?} failed: {}", archive, e);
            return Ok(ArchiveOutcome { archive_present: archive.exists(), deleted: 0, kept: files.len() });
        }
    }

    if !archive.exists() {
        error!("{:?} file is not present.", archive);
        return Ok(ArchiveOutcome { archive_present: false, deleted: 0, kept: files.len() });
    }

    let archived = list(archive)?;
    let mut outcome = ArchiveOutcome { archive_present: true, ..Default::default() };
    for file in files {
        if archived.contains(&base_name(file)?) {
            std::fs::remove_file(file)?;
            outcome.deleted += 1;
        } else {
            warn!("{:?} is not in {:?}; keeping it.", file, archive);
            outcome.kept += 1;
        }
    }
    info!("{} files deleted after archiving to {:?}.", outcome.deleted, archive);
    Ok(outcome)
}

/// Remove a directory once it is empty. Returns whether it was removed.
pub fn remove_dir_if_empty(dir: &Path) -> Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    if std::fs::read_dir(dir)?.next().is_some() {
        warn!("{:?} is not empty; leaving it in place.", dir);
        return Ok(false);
    }
    std::fs::remove_dir(dir)?;
    debug!("Removed {:?}", dir);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_archive_then_delete() {
        let root = tempdir().unwrap();
        let analysis = root.path().join("vina-analysis");
        std::fs::create_dir(&analysis).unwrap();
        let files = vec![
            touch(&analysis, "r--l--1.contacts.txt", "0 contacts"),
            touch(&analysis, "r--l--1.hbonds.txt", "0 H-bonds"),
        ];
        let tgz = root.path().join("vina-analysis.tgz");

        let outcome = archive_and_remove(&tgz, &files).unwrap();
        assert_eq!(outcome, ArchiveOutcome { archive_present: true, deleted: 2, kept: 0 });
        assert!(files.iter().all(|f| !f.exists()));
        assert_eq!(list(&tgz).unwrap().len(), 2);
        assert!(remove_dir_if_empty(&analysis).unwrap());
        assert!(!analysis.exists());
    }

    #[test]
    fn test_append_keeps_old_entries() {
        let root = tempdir().unwrap();
        let tgz = root.path().join("docking.log.tgz");
        let first = touch(root.path(), "a.result.log", "one");
        add_files(&tgz, &[first]).unwrap();
        let second = touch(root.path(), "b.result.log", "two");
        let again = touch(root.path(), "a.result.log", "one, rerun");
        add_files(&tgz, &[second, again]).unwrap();

        let names: Vec<String> = list(&tgz).unwrap().into_iter().collect();
        assert_eq!(names, vec!["a.result.log", "b.result.log"]);
    }

    #[test]
    fn test_failed_compression_deletes_nothing() {
        let root = tempdir().unwrap();
        let file = touch(root.path(), "r--l.cxc", "exit;");
        let tgz = root.path().join("missing-dir").join("vina-analysis.tgz");

        let outcome = archive_and_remove(&tgz, &[file.clone()]).unwrap();
        assert!(!outcome.archive_present);
        assert_eq!(outcome.deleted, 0);
        assert!(file.exists());
    }

    #[test]
    fn test_failed_append_keeps_files_listed_in_old_archive() {
        let root = tempdir().unwrap();
        let tgz = root.path().join("vina-analysis.tgz");
        let file = touch(root.path(), "r--l--1.contacts.txt", "old");
        add_files(&tgz, &[file.clone()]).unwrap();

        std::fs::write(&file, "new").unwrap();
        let missing = root.path().join("r--l--1.hbonds.txt");
        let outcome = archive_and_remove(&tgz, &[file.clone(), missing]).unwrap();
        assert_eq!(outcome, ArchiveOutcome { archive_present: true, deleted: 0, kept: 2 });
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "new");
        assert_eq!(list(&tgz).unwrap().len(), 1);
    }

    #[test]
    fn test_non_empty_dir_kept() {
        let root = tempdir().unwrap();
        touch(root.path(), "left.txt", "x");
        assert!(!remove_dir_if_empty(root.path()).unwrap());
        assert!(!remove_dir_if_empty(&root.path().join("nope")).unwrap());
    }
}
