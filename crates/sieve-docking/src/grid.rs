//! Docking search box derived from atomic coordinates.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use sieve_common::{GridSettings, Result};

use crate::structure::{read_atoms, AtomRecord};

/// Largest box edge (Angstrom) the docking engine supports.
pub const MAX_BOX_EDGE: f64 = 126.0;

/// Keys the docking engine accepts in a config file, in write order.
pub const VINA_CONFIG_KEYS: &[&str] = &[
    "center_x", "center_y", "center_z",
    "size_x", "size_y", "size_z",
    "exhaustiveness", "seed", "num_modes", "energy_range",
    "cpu", "out", "log", "flex",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridBox {
    pub center: [f64; 3],
    pub size: [f64; 3],
    pub spacing: f64,
    /// Root-mean-square distance of the selected atoms from `center`.
    pub distance: f64,
}

impl GridBox {
    pub fn zero(spacing: f64) -> Self {
        Self { center: [0.0; 3], size: [0.0; 3], spacing, distance: 0.0 }
    }

    pub fn is_degenerate(&self) -> bool {
        self.center == [0.0; 3] && self.size == [0.0; 3] && self.distance == 0.0
    }

    /// Allow-listed `key = value` pairs for the engine config, `None` settings dropped.
    pub fn config_entries(&self, settings: &GridSettings) -> Vec<(String, String)> {
        let residues = if settings.residues.is_empty() {
            None
        } else {
            Some(settings.residues.join(","))
        };
        let candidates: Vec<(&str, Option<String>)> = vec![
            ("spacing", Some(settings.spacing.to_string())),
            ("residues", residues),
            ("center_x", Some(self.center[0].to_string())),
            ("center_y", Some(self.center[1].to_string())),
            ("center_z", Some(self.center[2].to_string())),
            ("size_x", Some(self.size[0].to_string())),
            ("size_y", Some(self.size[1].to_string())),
            ("size_z", Some(self.size[2].to_string())),
            ("exhaustiveness", settings.exhaustiveness.map(|v| v.to_string())),
            ("seed", settings.seed.map(|v| v.to_string())),
            ("num_modes", settings.num_modes.map(|v| v.to_string())),
            ("energy_range", settings.energy_range.map(|v| v.to_string())),
            ("cpu", settings.cpu.map(|v| v.to_string())),
            ("flex", settings.flex.clone()),
        ];

        let mut entries: Vec<(String, String)> = candidates
            .into_iter()
            .filter(|(key, _)| VINA_CONFIG_KEYS.contains(key))
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
            .collect();
        entries.sort_by_key(|(key, _)| {
            VINA_CONFIG_KEYS.iter().position(|k| k == key).unwrap_or(usize::MAX)
        });
        entries
    }

    /// Config file text, one `key = value` line per entry.
    pub fn render_config(&self, settings: &GridSettings) -> String {
        self.config_entries(settings)
            .iter()
            .map(|(k, v)| format!("{k} = {v}\n"))
            .collect()
    }

    /// Write the config when a destination is given; returns whether a file was written.
    pub fn write_config(&self, settings: &GridSettings, destination: Option<&Path>) -> Result<bool> {
        let Some(path) = destination else {
            return Ok(false);
        };
        std::fs::write(path, self.render_config(settings))?;
        debug!("Wrote grid config {:?}", path);
        Ok(true)
    }
}

/// Coordinates of atoms in the filtered residues, or of every atom when the
/// filter is empty or matches nothing.
pub fn select_coordinates(atoms: &[AtomRecord], residues: &[String]) -> Vec<[f64; 3]> {
    if !residues.is_empty() {
        let selected: Vec<[f64; 3]> = atoms
            .iter()
            .filter(|a| residues.iter().any(|r| r == &a.residue_name))
            .map(|a| a.position)
            .collect();
        if !selected.is_empty() {
            return selected;
        }
        debug!("No atoms in residues {:?}; using the whole structure", residues);
    }
    atoms.iter().map(|a| a.position).collect()
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Box around `points`. An empty point set gives an all-zero box.
pub fn compute_grid(points: &[[f64; 3]], spacing: f64) -> GridBox {
    if points.is_empty() {
        return GridBox::zero(spacing);
    }
    let n = points.len() as f64;

    let mut sum = [0.0f64; 3];
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for p in points {
        for axis in 0..3 {
            sum[axis] += p[axis];
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }
    let center = [sum[0] / n, sum[1] / n, sum[2] / n];

    let squared: f64 = points
        .iter()
        .map(|p| (0..3).map(|axis| (p[axis] - center[axis]).powi(2)).sum::<f64>())
        .sum();
    let distance = (squared / n).sqrt();

    // Whole-Angstrom extent, capped at the engine limit, then widened by spacing.
    let size = [0, 1, 2].map(|axis| (max[axis] - min[axis]).trunc().min(MAX_BOX_EDGE) + spacing);

    GridBox {
        center: center.map(round4),
        size,
        spacing,
        distance,
    }
}

/// Read a prepared receptor and compute its search box.
pub fn grid_for_structure(path: &Path, settings: &GridSettings) -> Result<GridBox> {
    let atoms = read_atoms(path)?;
    let points = select_coordinates(&atoms, &settings.residues);
    let grid = compute_grid(&points, settings.spacing);
    info!(
        structure = ?path,
        atoms = points.len(),
        center = ?grid.center,
        size = ?grid.size,
        distance = grid.distance,
        "Computed search box"
    );
    Ok(grid)
}
