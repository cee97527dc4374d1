//! ChimeraX analysis scripts and parsing of their contact / H-bond output.
//!
//! A script is generated per complex. It isolates every docked pose in turn,
//! runs a contact search and an H-bond search restricted to that pose, and
//! saves each search's text report next to the script.
//!
//! Report lines name atoms as `#model[.sub]/chain resname resid atom`. When a
//! structure is the only one open ChimeraX drops the `#model` part, so
//! participant specs starting with `/` are read as model 1. Both parsers share
//! that normalization; a record whose participants cannot be read is dropped
//! with a warning.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

use sieve_common::Result;

use crate::layout::ProjectLayout;
use crate::tools::{CommandOutput, CommandRunner};
use crate::vina::Pose;

// ── Records ───────────────────────────────────────────────────────────────────

/// One atom as named in a ChimeraX report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomIdentity {
    pub model_id: String,
    pub sub_model_id: Option<String>,
    pub chain: String,
    pub residue_name: String,
    pub residue_id: String,
    pub atom: String,
}

impl AtomIdentity {
    /// Parse the leading `model/chain resname resid atom` tokens of a participant.
    pub fn from_tokens(tokens: &[&str]) -> Option<Self> {
        if tokens.len() < 4 {
            return None;
        }
        let (model, chain) = tokens[0].split_once('/')?;
        let (model_id, sub_model_id) = match model.split_once('.') {
            Some((m, sub)) => (m.to_string(), Some(sub.to_string())),
            None => (model.to_string(), None),
        };
        Some(Self {
            model_id,
            sub_model_id,
            chain: chain.to_string(),
            residue_name: tokens[1].to_string(),
            residue_id: tokens[2].to_string(),
            atom: tokens[3].to_string(),
        })
    }

    /// `resname:resid`
    pub fn residue(&self) -> String {
        format!("{}:{}", self.residue_name, self.residue_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub atom1: AtomIdentity,
    pub atom2: AtomIdentity,
    pub overlap: f64,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HBond {
    pub donor: AtomIdentity,
    pub acceptor: AtomIdentity,
    pub hydrogen: AtomIdentity,
    /// Donor-acceptor and hydrogen-acceptor distances
    pub length: (f64, f64),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

fn contacts_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+) contacts").expect("valid regex"))
}

fn hbonds_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+) H-bonds").expect("valid regex"))
}

/// Lines after the `<N> <term>` header. Empty when the header is missing or N is 0.
fn data_lines<'a>(content: &'a str, header: &Regex) -> Vec<&'a str> {
    let mut lines = content.lines();
    while let Some(line) = lines.next() {
        if let Some(caps) = header.captures(line) {
            let count: usize = caps[1].parse().unwrap_or(0);
            if count == 0 {
                return Vec::new();
            }
            return lines.collect();
        }
    }
    Vec::new()
}

/// Split a report line into participant columns, each a list of tokens.
/// `None` when the line names no atoms at all.
fn participants(line: &str) -> Option<Vec<Vec<&str>>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if !tokens.iter().any(|t| t.contains('#') || t.contains('/')) {
        return None;
    }

    let mut columns: Vec<Vec<&str>> = Vec::new();
    for token in tokens {
        if let Some(spec) = token.strip_prefix('#') {
            columns.push(vec![spec]);
        } else if token.starts_with('/') {
            // "/A" is "#1/A"
            columns.push(vec![token]);
        } else if let Some(column) = columns.last_mut() {
            column.push(token);
        }
    }
    Some(columns)
}

fn normalized_spec(spec: &str) -> String {
    if spec.starts_with('/') {
        format!("1{spec}")
    } else {
        spec.to_string()
    }
}

fn atom(column: &[&str]) -> Option<AtomIdentity> {
    let spec = normalized_spec(column.first()?);
    let mut tokens: Vec<&str> = vec![spec.as_str()];
    tokens.extend(column.iter().skip(1).take(3));
    AtomIdentity::from_tokens(&tokens)
}

/// Trailing `n` tokens of a column parsed as floats.
fn trailing_metrics(column: &[&str], n: usize) -> Option<Vec<f64>> {
    if column.len() < 4 + n {
        return None;
    }
    column[column.len() - n..].iter().map(|v| v.parse().ok()).collect()
}

fn parse_contact_line(line: &str) -> Option<Contact> {
    let columns = participants(line)?;
    if columns.len() < 2 {
        return None;
    }
    let metrics = trailing_metrics(&columns[1], 2)?;
    Some(Contact {
        atom1: atom(&columns[0])?,
        atom2: atom(&columns[1])?,
        overlap: metrics[0],
        distance: metrics[1],
    })
}

fn parse_hbond_line(line: &str) -> Option<HBond> {
    let columns = participants(line)?;
    if columns.len() < 3 {
        return None;
    }
    let metrics = trailing_metrics(&columns[2], 2)?;
    Some(HBond {
        donor: atom(&columns[0])?,
        acceptor: atom(&columns[1])?,
        hydrogen: atom(&columns[2])?,
        length: (metrics[0], metrics[1]),
    })
}

fn is_atom_line(line: &str) -> bool {
    line.contains('#') || line.contains('/')
}

/// Contact records of a ChimeraX `contacts ... log t saveFile` report.
pub fn parse_contacts(content: &str) -> Vec<Contact> {
    let mut contacts = Vec::new();
    for line in data_lines(content, contacts_header()) {
        let is_column_header = line.split_whitespace().any(|t| t == "atom1" || t == "atom2");
        if is_column_header || !is_atom_line(line) {
            continue;
        }
        match parse_contact_line(line) {
            Some(contact) => contacts.push(contact),
            None => warn!(line = %line.trim(), "Dropping unreadable contact record"),
        }
    }
    contacts
}

/// H-bond records of a ChimeraX `hbonds ... log t saveFile` report.
pub fn parse_hbonds(content: &str) -> Vec<HBond> {
    let mut hbonds = Vec::new();
    for line in data_lines(content, hbonds_header()) {
        if line.starts_with("H-bond") || !is_atom_line(line) {
            continue;
        }
        match parse_hbond_line(line) {
            Some(hbond) => hbonds.push(hbond),
            None => warn!(line = %line.trim(), "Dropping unreadable H-bond record"),
        }
    }
    hbonds
}

/// Parse a report file; a missing file has no records.
pub fn read_report<T>(path: &Path, parse: fn(&str) -> Vec<T>) -> Result<Vec<T>> {
    if !path.exists() {
        debug!("No report at {:?}", path);
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(parse(&content))
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Count and comma-joined `resname:resid` list for one pose and one search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResidueSummary {
    pub count: usize,
    pub residues: String,
}

impl ResidueSummary {
    pub fn from_atoms<'a>(atoms: impl IntoIterator<Item = &'a AtomIdentity>) -> Self {
        let residues: Vec<String> = atoms.into_iter().map(AtomIdentity::residue).collect();
        Self { count: residues.len(), residues: residues.join(",") }
    }

    /// Summarised by the receptor side of each contact.
    pub fn of_contacts(contacts: &[Contact]) -> Self {
        Self::from_atoms(contacts.iter().map(|c| &c.atom1))
    }

    /// Summarised by donor.
    pub fn of_hbonds(hbonds: &[HBond]) -> Self {
        Self::from_atoms(hbonds.iter().map(|h| &h.donor))
    }
}

// ── Scripts ───────────────────────────────────────────────────────────────────

/// Render the analysis script of one complex.
pub fn render_script(
    layout: &ProjectLayout,
    complex_name: &str,
    receptor: &Path,
    docked: &Path,
    poses: &[Pose],
) -> String {
    let mut commands = vec![
        "close;".to_string(),
        "set bgColor white;".to_string(),
        format!("open {};", receptor.display()),
        "wait;".to_string(),
        "hide surfaces; hide atoms; show cartoons;".to_string(),
        "wait;".to_string(),
        "addh;".to_string(),
        "~sel;".to_string(),
        "wait;".to_string(),
        format!("open {};", docked.display()),
        "wait;".to_string(),
    ];

    let total = poses.len();
    for pose in poses {
        let mode = pose.mode;
        let conformer = mode.to_string();
        let contacts = layout.contacts_file(complex_name, &conformer);
        let hbonds = layout.hbonds_file(complex_name, &conformer);
        commands.extend([
            format!("# MODEL-NO-{mode}"),
            format!("hide #!2.1-{total} target m;"),
            format!("show #!2.{mode} models;"),
            "view;".to_string(),
            format!("sel #!2.{mode};"),
            format!(
                "contacts (#1 & ~hbonds) restrict sel radius 0.05 log t saveFile {};",
                contacts.display()
            ),
            "wait;".to_string(),
            format!(
                "hb #1 restrict sel reveal t show t select t radius 0.05 log t saveFile {};",
                hbonds.display()
            ),
            "wait;".to_string(),
            "label sel residues text {0.name}-{0.number} height 1.5 offset -2,0.25,0.25 bgColor #00000099 color white;"
                .to_string(),
            "~sel;".to_string(),
            format!("sel #!2.{mode};"),
            "view sel;".to_string(),
            "~sel;".to_string(),
            "turn x 45;".to_string(),
            String::new(),
        ]);
    }
    commands.push("exit;".to_string());

    let mut script = commands.join("\n");
    script.push('\n');
    script
}

/// Arguments for a headless ChimeraX run of `script`.
pub fn script_arguments(script: &Path) -> Vec<OsString> {
    let mut open = OsString::from("open ");
    open.push(script);
    vec!["--cmd".into(), open, "--silent".into(), "--offscreen".into()]
}

pub async fn run_script(runner: &dyn CommandRunner, chimerax: &str, script: &Path) -> Result<CommandOutput> {
    runner.run(chimerax, &script_arguments(script)).await
}
