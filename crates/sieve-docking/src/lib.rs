//! Sieve Docking - receptor/ligand docking campaigns over a base directory.
//!
//! Stages, in their default order:
//! 1. Preparing ligands (SDF splitting, conversion to PDBQT)
//! 2. Preparing receptors (cleaning, conversion to PDBQT)
//! 3. Writing one search-box config per receptor
//! 4. Molecular docking (AutoDock Vina) over receptor x ligand
//! 5. Pose analysis (ChimeraX contacts and H-bonds)
//! 6. Rescoring with external models (AnnapuRNA)
//! 7. Archiving intermediate artifacts
//!
//! Every stage is resumable: work already present on disk is never redone.

pub mod layout;
pub mod complex;
pub mod resume;
pub mod structure;
pub mod grid;
pub mod tools;
pub mod vina;
pub mod prepare;
pub mod chimerax;
pub mod table;
pub mod rescoring;
pub mod archive;
pub mod stages;
pub mod pipeline;

pub use sieve_common::{Result, RunConfig, SieveError};
