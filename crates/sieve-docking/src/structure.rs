//! Minimal fixed-column reader for PDB / PDBQT coordinate records.

use std::path::Path;
use tracing::debug;

use sieve_common::Result;

/// One ATOM/HETATM record.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    pub name: String,
    pub alt_loc: Option<char>,
    pub residue_name: String,
    pub chain: String,
    pub residue_seq: String,
    pub position: [f64; 3],
    pub occupancy: Option<f64>,
}

/// Column slice that tolerates short lines.
fn column(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or("")
}

pub fn is_coordinate_record(line: &str) -> bool {
    line.starts_with("ATOM") || line.starts_with("HETATM")
}

/// Parse one ATOM/HETATM line; `None` for other records or unreadable coordinates.
pub fn parse_atom_line(line: &str) -> Option<AtomRecord> {
    if !is_coordinate_record(line) {
        return None;
    }
    let coord = |start, end| column(line, start, end).trim().parse::<f64>().ok();
    let position = [coord(30, 38)?, coord(38, 46)?, coord(46, 54)?];
    let alt_loc = column(line, 16, 17).chars().next().filter(|c| !c.is_whitespace());

    Some(AtomRecord {
        name: column(line, 12, 16).trim().to_string(),
        alt_loc,
        residue_name: column(line, 17, 21).trim().to_string(),
        chain: column(line, 21, 22).trim().to_string(),
        residue_seq: column(line, 22, 27).trim().to_string(),
        position,
        occupancy: coord(54, 60),
    })
}

/// Every coordinate record of a structure text, in file order.
/// Lines with unreadable coordinates are skipped.
pub fn parse_atoms(content: &str) -> Vec<AtomRecord> {
    let mut atoms = Vec::new();
    for (n, line) in content.lines().enumerate() {
        if !is_coordinate_record(line) {
            continue;
        }
        match parse_atom_line(line) {
            Some(atom) => atoms.push(atom),
            None => debug!(line = n + 1, "Skipping coordinate record with unreadable position"),
        }
    }
    atoms
}

pub fn read_atoms(path: &Path) -> Result<Vec<AtomRecord>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_atoms(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDBQT: &str = "\
REMARK  test
ATOM      1  N   SER A   1      11.104   6.134  -6.504  1.00  0.00    -0.066 N
ATOM      2  CA ASER A   1      11.639   6.071  -5.147  0.60  0.00     0.093 C
HETATM    3  FE  HEM A 101      -1.000   2.500   3.250  1.00  0.00     0.000 Fe
TER
ATOM      4  C   GLY A   2        bad    6.071  -5.147  1.00  0.00     0.093 C
";

    #[test]
    fn test_parse_atoms_reads_columns() {
        let atoms = parse_atoms(PDBQT);
        assert_eq!(atoms.len(), 3);
        assert_eq!(atoms[0].name, "N");
        assert_eq!(atoms[0].residue_name, "SER");
        assert_eq!(atoms[0].chain, "A");
        assert_eq!(atoms[0].residue_seq, "1");
        assert_eq!(atoms[0].position, [11.104, 6.134, -6.504]);
        assert_eq!(atoms[1].alt_loc, Some('A'));
        assert_eq!(atoms[1].occupancy, Some(0.6));
        assert_eq!(atoms[2].residue_name, "HEM");
    }

    #[test]
    fn test_non_coordinate_lines_ignored() {
        assert!(parse_atom_line("TER").is_none());
        assert!(parse_atom_line("REMARK ATOM").is_none());
        assert!(parse_atom_line("ATOM short").is_none());
    }
}
