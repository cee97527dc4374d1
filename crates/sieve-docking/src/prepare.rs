//! Receptor cleaning and ligand conversion.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use sieve_common::{Result, ToolPaths};

use crate::args;
use crate::layout::file_id;
use crate::structure::parse_atom_line;
use crate::tools::CommandRunner;

// ── Receptors ─────────────────────────────────────────────────────────────────

/// Receptor text reduced to what the preparation tool should see.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedReceptor {
    /// Every non-HETATM line, alternate locations resolved.
    pub lines: Vec<String>,
    /// Records that are neither ATOM nor TER.
    pub non_atom_records: usize,
}

impl CleanedReceptor {
    pub fn atom_records(&self) -> usize {
        self.lines.iter().filter(|l| l.starts_with("ATOM")).count()
    }

    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// Keep one alternate location per atom: the one with the highest occupancy
/// (first seen on ties). The altLoc column of kept records is blanked.
pub fn select_alt_locations(content: &str) -> Vec<String> {
    let key = |line: &str| {
        parse_atom_line(line).and_then(|a| {
            a.alt_loc.map(|alt| ((a.chain, a.residue_seq, a.name), alt, a.occupancy.unwrap_or(0.0)))
        })
    };

    let mut best: HashMap<(String, String, String), (char, f64)> = HashMap::new();
    for line in content.lines() {
        if let Some((k, alt, occupancy)) = key(line) {
            match best.get(&k) {
                Some((_, top)) if *top >= occupancy => {}
                _ => {
                    best.insert(k, (alt, occupancy));
                }
            }
        }
    }

    let mut kept: Vec<String> = Vec::new();
    for line in content.lines() {
        match key(line) {
            Some((k, alt, _)) => {
                if best.get(&k).map(|(a, _)| *a) == Some(alt) {
                    let mut record = line.to_string();
                    // altLoc is byte column 16
                    if line.is_char_boundary(16) && line.is_char_boundary(17) {
                        record.replace_range(16..17, " ");
                    }
                    kept.push(record);
                }
            }
            None => kept.push(line.to_string()),
        }
    }
    kept
}

pub fn clean_receptor(content: &str) -> CleanedReceptor {
    let lines = select_alt_locations(content);
    let non_atom_records = lines
        .iter()
        .filter(|l| !l.starts_with("ATOM") && !l.starts_with("TER"))
        .count();
    let lines = lines.into_iter().filter(|l| !l.starts_with("HETATM")).collect();
    CleanedReceptor { lines, non_atom_records }
}

/// Output locations for one receptor preparation.
#[derive(Debug, Clone)]
pub struct ReceptorTargets {
    pub clean: PathBuf,
    pub pdbqt: PathBuf,
    pub summary: PathBuf,
}

/// Clean a receptor and convert it with the receptor preparation tool.
pub async fn prepare_receptor(
    runner: &dyn CommandRunner,
    tools: &ToolPaths,
    source: &Path,
    targets: &ReceptorTargets,
) -> Result<()> {
    let content = tokio::fs::read_to_string(source).await?;
    let cleaned = clean_receptor(&content);
    tokio::fs::write(&targets.clean, cleaned.to_text()).await?;
    info!(
        receptor = %file_id(source),
        atom = cleaned.atom_records(),
        non_atom = cleaned.non_atom_records,
        "Cleaned receptor"
    );

    let output = runner
        .run(
            &tools.prepare_receptor,
            &args![
                "-r", &targets.clean,
                "-o", &targets.pdbqt,
                "-A", "bonds_hydrogens",
                "-U", "waters",
                "-v",
                "-d", &targets.summary,
            ],
        )
        .await?;
    debug!(receptor = %file_id(source), output = %output.combined(), "prepare_receptor output");
    Ok(())
}

// ── Ligands ───────────────────────────────────────────────────────────────────

const SDF_NAME_TAG: &str = "> <SYBYL.NAME>";
const SDF_RECORD_END: &str = "$$$$";

/// One record of a multi-record SDF file.
#[derive(Debug, Clone, PartialEq)]
pub struct SdfRecord {
    pub name: String,
    pub body: String,
}

/// Split SDF text into records. The name is the value under the
/// `> <SYBYL.NAME>` tag, else the title line, else `<fallback>_<n>`.
pub fn split_sdf(content: &str, fallback: &str) -> Vec<SdfRecord> {
    let mut records = Vec::new();
    let mut lines: Vec<&str> = Vec::new();
    let mut name: Option<String> = None;
    let mut previous = "";

    for line in content.lines() {
        if line.starts_with(SDF_RECORD_END) {
            let title = lines.first().map(|l| l.trim()).filter(|l| !l.is_empty());
            let record_name = name
                .take()
                .or_else(|| title.map(str::to_string))
                .unwrap_or_else(|| format!("{fallback}_{}", records.len() + 1));
            let mut body = lines.join("\n");
            body.push('\n');
            body.push_str(SDF_RECORD_END);
            body.push('\n');
            records.push(SdfRecord { name: record_name, body });
            lines.clear();
            previous = line;
            continue;
        }
        if previous.starts_with(SDF_NAME_TAG) && !line.trim().is_empty() {
            name = Some(line.trim().to_string());
        }
        lines.push(line);
        previous = line;
    }
    records
}

/// Split a multi-record SDF into sibling files. Single-record files are
/// returned as-is; existing split files are never overwritten.
pub fn expand_sdf(path: &Path) -> Result<Vec<PathBuf>> {
    let content = std::fs::read_to_string(path)?;
    let records = split_sdf(&content, &file_id(path));
    if records.len() <= 1 {
        return Ok(vec![path.to_path_buf()]);
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut written = Vec::with_capacity(records.len());
    for record in records {
        let target = dir.join(format!("{}.sdf", record.name));
        if target.exists() {
            warn!("{:?} already exists. Skipping writing.", target);
        } else {
            std::fs::write(&target, &record.body)?;
            info!("{:?} split from {:?}", target, path);
        }
        written.push(target);
    }
    Ok(written)
}

fn extension(path: &Path) -> String {
    path.extension().map(|e| e.to_string_lossy().to_lowercase()).unwrap_or_default()
}

/// Convert each molecule to `ext_to` next to its source, splitting multi-record
/// SDF files first. Returns the converted paths.
pub async fn convert_molecules(
    runner: &dyn CommandRunner,
    obabel: &str,
    sources: &[PathBuf],
    ext_to: &str,
) -> Result<Vec<PathBuf>> {
    info!("Processing {} molecules for conversion to {}", sources.len(), ext_to);

    let mut to_convert = Vec::new();
    for source in sources {
        if extension(source) == "sdf" {
            to_convert.extend(expand_sdf(source)?);
        } else {
            to_convert.push(source.clone());
        }
    }

    let mut converted = Vec::with_capacity(to_convert.len());
    for source in to_convert {
        let target = source.with_extension(ext_to);
        if !target.exists() {
            info!("Writing conversion to {:?}", target);
            let mut input_format = OsString::from("-i");
            input_format.push(extension(&source));
            let mut output_format = OsString::from("-o");
            output_format.push(ext_to);
            runner
                .run(obabel, &[input_format, source.clone().into(), output_format, "-O".into(), target.clone().into()])
                .await?;
        }
        converted.push(target);
    }
    Ok(converted)
}

/// PDB to PDBQT with hydrogens added.
pub async fn ligand_to_pdbqt(runner: &dyn CommandRunner, obabel: &str, source: &Path, target: &Path) -> Result<()> {
    let output = runner.run(obabel, &args![source, "-O", target, "-h", "--quiet"]).await?;
    info!(ligand = %file_id(source), "Converted ligand. {}", output.combined().trim());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const RECEPTOR: &str = "\
HEADER    TEST
ATOM      1  N   SER A   1      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  CA ASER A   1      11.639   6.071  -5.147  0.40  0.00           C
ATOM      3  CA BSER A   1      11.700   6.000  -5.100  0.60  0.00           C
TER
HETATM    4  O   HOH A 201       1.000   2.000   3.000  1.00  0.00           O
END";

    #[test]
    fn test_alt_location_highest_occupancy_kept() {
        let lines = select_alt_locations(RECEPTOR);
        let ca: Vec<&String> = lines.iter().filter(|l| l.contains(" CA ")).collect();
        assert_eq!(ca.len(), 1);
        assert!(ca[0].contains("11.700"));
        assert_eq!(ca[0].chars().nth(16), Some(' '));
    }

    #[test]
    fn test_alt_location_blanks_byte_column() {
        // two-byte char in the serial field keeps byte columns aligned
        let content: String = RECEPTOR
            .lines()
            .map(|l| if l.contains("CA BSER") { l.replacen("ATOM  ", "ATOM\u{e9}", 1) } else { l.to_string() })
            .collect::<Vec<_>>()
            .join("\n");
        let original = content.lines().find(|l| l.contains("CA BSER")).unwrap();

        let lines = select_alt_locations(&content);
        let kept = lines.iter().find(|l| l.contains("11.700")).unwrap();
        assert_eq!(&kept[16..17], " ");
        assert_eq!(&kept[..16], &original[..16]);
        assert_eq!(&kept[17..], &original[17..]);
    }

    #[test]
    fn test_clean_receptor_drops_hetatm() {
        let cleaned = clean_receptor(RECEPTOR);
        assert!(cleaned.lines.iter().all(|l| !l.starts_with("HETATM")));
        assert_eq!(cleaned.atom_records(), 2);
        // HEADER, HETATM, END
        assert_eq!(cleaned.non_atom_records, 3);
        assert!(cleaned.to_text().ends_with("END\n"));
    }

    const SDF: &str = "\
aspirin
  header

> <SYBYL.NAME>
ASA
$$$$
ibuprofen
  header
$$$$

  header
$$$$
";

    #[test]
    fn test_split_sdf_names() {
        let records = split_sdf(SDF, "lib");
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["ASA", "ibuprofen", "lib_3"]);
        assert!(records[0].body.ends_with("$$$$\n"));
    }

    #[test]
    fn test_expand_sdf_writes_siblings_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lib.sdf");
        std::fs::write(&path, SDF).unwrap();
        std::fs::write(dir.path().join("ASA.sdf"), "keep").unwrap();

        let files = expand_sdf(&path).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(std::fs::read_to_string(dir.path().join("ASA.sdf")).unwrap(), "keep");
        assert!(dir.path().join("ibuprofen.sdf").exists());
    }

    #[test]
    fn test_single_record_sdf_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("one.sdf");
        std::fs::write(&path, "one\n$$$$\n").unwrap();
        assert_eq!(expand_sdf(&path).unwrap(), vec![path]);
    }
}
