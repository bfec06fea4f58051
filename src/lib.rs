//! distclean - Product Output Cleaner
//!
//! distclean removes the outputs a multi-product build produced: per-target
//! binaries laid out as `<output-dir>/<tag>/<os-arch>/<product>`, and
//! distribution artifacts named after the product in each dist output
//! directory. After removing a path it walks upward and removes every parent
//! directory that became empty, never going past the output directory the
//! path was found in.
//!
//! ## Architecture
//!
//! - [`classify`] finds product binaries under a binary output root
//! - [`dist`] matches distribution artifacts and hosts the manual dist type
//! - [`plan`] merges both into a [`RemovalPlan`] keyed by path
//! - [`remover`] executes the plan, or simulates it for a dry run
//! - [`clean`] ties a [`ProjectConfig`] to the steps above per product

pub mod classify;
pub mod clean;
pub mod config;
pub mod dist;
pub mod error;
pub mod osarch;
pub mod plan;
pub mod remover;

// Re-export commonly used items
pub use classify::{classify_binaries, ProductTargets};
pub use clean::{clean_product, clean_products, verify_dists, ProductReport};
pub use config::{DistConfig, ProductConfig, ProjectConfig, CONFIG_FILE_NAME};
pub use dist::{match_artifacts, ArtifactPattern, DistType, ManualDist, MatchedArtifact};
pub use error::{CleanError, DistError};
pub use osarch::OsArch;
pub use plan::{build_plan, BinTargets, DistCandidate, RemovalEntry, RemovalPlan};
pub use remover::{
    execute, execute_with, CascadeStop, CascadingRemover, VirtualRemovedSet, DRY_RUN_PREFIX,
};
