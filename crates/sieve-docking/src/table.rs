//! The canonical score table and its outer-join merge.
//!
//! Rows are keyed by `complex_uid` (`receptor--ligand--conformer_id`). The
//! three identity columns live in the row key, so a merge can never drop them.
//! Every other column is optional per row; an absent value is written as an
//! empty cell.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use sieve_common::{Result, SieveError};

use crate::complex::complex_uid;
use crate::layout::COMPLEX_SEPARATOR;

/// Identity columns, always first in the persisted header.
pub const KEY_COLUMNS: [&str; 3] = ["receptor", "ligand", "conformer_id"];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RowKey {
    pub receptor: String,
    pub ligand: String,
    pub conformer_id: String,
}

impl RowKey {
    pub fn new(receptor: impl Into<String>, ligand: impl Into<String>, conformer_id: impl ToString) -> Self {
        Self {
            receptor: receptor.into(),
            ligand: ligand.into(),
            conformer_id: conformer_id.to_string(),
        }
    }

    pub fn uid(&self) -> String {
        complex_uid(&self.receptor, &self.ligand, &self.conformer_id)
    }

    /// Recover a key from `receptor--ligand--conformer_id`.
    pub fn from_uid(uid: &str) -> Option<Self> {
        let (complex, conformer) = uid.rsplit_once(COMPLEX_SEPARATOR)?;
        Self::from_complex(complex, conformer)
    }

    /// Key from a `receptor--ligand` complex id and a conformer.
    pub fn from_complex(complex_id: &str, conformer_id: impl ToString) -> Option<Self> {
        let (receptor, ligand) = complex_id.split_once(COMPLEX_SEPARATOR)?;
        if receptor.is_empty() || ligand.is_empty() {
            return None;
        }
        Some(Self::new(receptor, ligand, conformer_id))
    }

    pub fn complex_name(&self) -> String {
        crate::complex::complex_id(&self.receptor, &self.ligand)
    }

    fn conformer_rank(&self) -> (u64, String) {
        (self.conformer_id.parse().unwrap_or(0), self.conformer_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: RowKey,
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTable {
    columns: Vec<String>,
    rows: BTreeMap<String, Row>,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.rows.contains_key(uid)
    }

    pub fn get(&self, uid: &str, column: &str) -> Option<&str> {
        self.rows.get(uid)?.values.get(column).map(String::as_str)
    }

    fn add_column(&mut self, column: &str) {
        if KEY_COLUMNS.contains(&column) {
            return;
        }
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
    }

    /// Set one cell, creating the row and column as needed.
    pub fn set(&mut self, key: &RowKey, column: &str, value: impl Into<String>) {
        self.add_column(column);
        let row = self.rows.entry(key.uid()).or_insert_with(|| Row {
            key: key.clone(),
            values: BTreeMap::new(),
        });
        row.values.insert(column.to_string(), value.into());
    }

    /// Insert a whole row. A key already present is replaced (last wins).
    pub fn push_row<I, K, V>(&mut self, key: RowKey, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let uid = key.uid();
        if self.rows.contains_key(&uid) {
            warn!(complex_uid = %uid, "Duplicate row; keeping the last one");
        }
        let mut row = Row { key, values: BTreeMap::new() };
        for (column, value) in values {
            let column = column.into();
            self.add_column(&column);
            if !KEY_COLUMNS.contains(&column.as_str()) {
                row.values.insert(column, value.into());
            }
        }
        self.rows.insert(uid, row);
    }

    /// Outer join on `complex_uid`. Columns of `self` that also appear in
    /// `other` are dropped from `self` first, so `other`'s values win; rows
    /// only present on one side keep nulls for the other side's columns.
    pub fn merge(&mut self, other: ScoreTable) {
        let incoming: BTreeSet<&String> = other.columns.iter().collect();
        let dropped: Vec<String> = self
            .columns
            .iter()
            .filter(|c| incoming.contains(c))
            .cloned()
            .collect();
        if !dropped.is_empty() {
            debug!(columns = ?dropped, "Replacing columns on merge");
            self.columns.retain(|c| !incoming.contains(c));
            for row in self.rows.values_mut() {
                row.values.retain(|c, _| !incoming.contains(c));
            }
        }

        for column in &other.columns {
            self.add_column(column);
        }
        for (uid, row) in other.rows {
            match self.rows.get_mut(&uid) {
                Some(existing) => existing.values.extend(row.values),
                None => {
                    self.rows.insert(uid, row);
                }
            }
        }
    }

    /// Cell-wise update: `other`'s cells overwrite, everything else is kept.
    pub fn upsert(&mut self, other: ScoreTable) {
        for column in &other.columns {
            self.add_column(column);
        }
        for (uid, row) in other.rows {
            match self.rows.get_mut(&uid) {
                Some(existing) => existing.values.extend(row.values),
                None => {
                    self.rows.insert(uid, row);
                }
            }
        }
    }

    /// One key per complex: the row with the highest conformer id.
    pub fn last_conformers(&self) -> Vec<RowKey> {
        let mut last: BTreeMap<String, &RowKey> = BTreeMap::new();
        for row in self.rows.values() {
            let name = row.key.complex_name();
            match last.get(&name) {
                Some(existing) if existing.conformer_rank() >= row.key.conformer_rank() => {}
                _ => {
                    last.insert(name, &row.key);
                }
            }
        }
        last.into_values().cloned().collect()
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    pub fn from_csv<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let position = |name: &str| headers.iter().position(|h| h == name);
        let (Some(r), Some(l), Some(c)) = (position("receptor"), position("ligand"), position("conformer_id")) else {
            return Err(SieveError::Table(format!(
                "score table header must contain {:?}, got {:?}",
                KEY_COLUMNS, headers
            )));
        };

        let mut table = ScoreTable::new();
        for header in &headers {
            table.add_column(header);
        }
        for record in reader.records() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or("").to_string();
            let key = RowKey::new(field(r), field(l), field(c));
            let values: Vec<(String, String)> = headers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != r && *i != l && *i != c)
                .filter_map(|(i, h)| {
                    let value = record.get(i).unwrap_or("");
                    (!value.is_empty()).then(|| (h.clone(), value.to_string()))
                })
                .collect();
            table.push_row(key, values);
        }
        Ok(table)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SieveError::missing(path),
            _ => SieveError::Io(e),
        })?;
        let table = Self::from_csv(file)?;
        debug!(rows = table.len(), "Read score table {:?}", path);
        Ok(table)
    }

    /// Read `path`, or start an empty table when it does not exist yet.
    pub fn read_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::read(path)
        } else {
            Ok(Self::new())
        }
    }

    pub fn to_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        let header: Vec<&str> = KEY_COLUMNS
            .iter()
            .copied()
            .chain(self.columns.iter().map(String::as_str))
            .collect();
        writer.write_record(&header)?;

        for row in self.rows.values() {
            let mut record: Vec<&str> = vec![row.key.receptor.as_str(), row.key.ligand.as_str(), row.key.conformer_id.as_str()];
            record.extend(
                self.columns
                    .iter()
                    .map(|c| row.values.get(c).map(String::as_str).unwrap_or("")),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write through a temp file in the destination directory, then rename.
    pub fn write(&self, path: &Path) -> Result<()> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        self.to_csv(&mut tmp)?;
        tmp.persist(path).map_err(|e| SieveError::Io(e.error))?;
        info!(rows = self.len(), columns = self.columns.len() + KEY_COLUMNS.len(), "Score table written to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn key(uid: &str) -> RowKey {
        RowKey::from_uid(uid).unwrap()
    }

    fn table(rows: &[(&str, &[(&str, &str)])]) -> ScoreTable {
        let mut t = ScoreTable::new();
        for (uid, values) in rows {
            t.push_row(key(uid), values.iter().map(|(c, v)| (c.to_string(), v.to_string())));
        }
        t
    }

    #[test]
    fn test_uid_round_trip() {
        let k = RowKey::new("rec", "lig", 3);
        assert_eq!(k.uid(), "rec--lig--3");
        assert_eq!(RowKey::from_uid("rec--lig--3"), Some(k));
        assert_eq!(RowKey::from_uid("rec--3"), None);
        assert_eq!(RowKey::from_complex("rec--lig", 0).unwrap().uid(), "rec--lig--0");
    }

    #[test]
    fn test_outer_join_keeps_every_key() {
        let mut a = table(&[("r--a--1", &[("x", "1")]), ("r--b--1", &[("x", "2")])]);
        let b = table(&[("r--b--1", &[("y", "3")]), ("r--c--1", &[("y", "4")])]);
        a.merge(b);

        assert_eq!(a.len(), 3);
        assert_eq!(a.columns(), &["x".to_string(), "y".to_string()]);
        assert_eq!(a.get("r--a--1", "x"), Some("1"));
        assert_eq!(a.get("r--a--1", "y"), None);
        assert_eq!(a.get("r--b--1", "x"), Some("2"));
        assert_eq!(a.get("r--b--1", "y"), Some("3"));
        assert_eq!(a.get("r--c--1", "x"), None);
        assert_eq!(a.get("r--c--1", "y"), Some("4"));
    }

    #[test]
    fn test_collision_drops_old_column() {
        let mut a = table(&[("r--a--1", &[("score", "-5"), ("keep", "k")]), ("r--b--1", &[("score", "-6")])]);
        let b = table(&[("r--b--1", &[("score", "-9")])]);
        a.merge(b);

        assert_eq!(a.get("r--b--1", "score"), Some("-9"));
        // a's score column was replaced wholesale
        assert_eq!(a.get("r--a--1", "score"), None);
        assert_eq!(a.get("r--a--1", "keep"), Some("k"));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_key_columns_survive_merge() {
        let mut a = table(&[("r--a--1", &[("receptor", "ignored"), ("x", "1")])]);
        a.merge(table(&[("r--a--1", &[("receptor", "also ignored")])]));
        let row = a.rows().next().unwrap();
        assert_eq!(row.key.receptor, "r");
        assert!(a.columns().iter().all(|c| c != "receptor"));
    }

    #[test]
    fn test_upsert_keeps_untouched_cells() {
        let mut a = table(&[("r--a--1", &[("score", "-5")]), ("r--b--1", &[("score", "-6")])]);
        a.upsert(table(&[("r--b--1", &[("score", "-9")])]));
        assert_eq!(a.get("r--a--1", "score"), Some("-5"));
        assert_eq!(a.get("r--b--1", "score"), Some("-9"));
    }

    #[test]
    fn test_last_conformers_numeric() {
        let t = table(&[
            ("r--a--2", &[]),
            ("r--a--10", &[]),
            ("r--a--9", &[]),
            ("r--b--1", &[]),
        ]);
        let last: Vec<String> = t.last_conformers().iter().map(RowKey::uid).collect();
        assert_eq!(last, vec!["r--a--10", "r--b--1"]);
    }

    #[test]
    fn test_csv_round_trip_with_nulls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("result.score.csv");
        let mut t = table(&[("r--a--1", &[("conformer_score", "-7.1")])]);
        t.set(&key("r--b--2"), "contacts", "ARG:12,SER:15");
        t.write(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next().unwrap(), "receptor,ligand,conformer_id,conformer_score,contacts");
        assert!(text.contains("r,b,2,,\"ARG:12,SER:15\""));

        let back = ScoreTable::read(&path).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_header_without_keys_is_error() {
        let err = ScoreTable::from_csv("a,b\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, SieveError::Table(_)));
    }

    #[test]
    fn test_missing_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("none.csv");
        assert!(matches!(ScoreTable::read(&path), Err(SieveError::MissingInput(_))));
        assert!(ScoreTable::read_or_default(&path).unwrap().is_empty());
    }
}
