//! sieve-common: shared errors and run configuration used across all Sieve crates.

pub mod error;
pub mod config;

// Re-export commonly used types
pub use config::{
    RunConfig, LayoutConfig, PatternConfig, SkipConfig, GridSettings, DockingSettings, ToolPaths,
    RescoringConfig, DEFAULT_STAGES,
};
pub use error::{Result, SieveError};
