//! Error types for planning and executing a cleanup.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanError {
    /// A planned path does not lie under the root it was tagged with.
    /// Always a planner defect; never recoverable.
    #[error("root dir path {} does not contain {}", root.display(), path.display())]
    Consistency { root: PathBuf, path: PathBuf },

    #[error("conflicting removal entries for {}", path.display())]
    ConflictingEntry { path: PathBuf },

    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("failed to remove file {}: {source}", path.display())]
    RemoveFile { path: PathBuf, source: io::Error },

    #[error("failed to remove directory {}: {source}", path.display())]
    RemoveDir { path: PathBuf, source: io::Error },

    #[error("failed to write dry run report: {0}")]
    Report(#[source] io::Error),

    #[error("failed to clean {product}: {source}")]
    Product {
        product: String,
        source: Box<CleanError>,
    },
}

impl CleanError {
    pub fn for_product(self, product: impl Into<String>) -> Self {
        Self::Product {
            product: product.into(),
            source: Box::new(self),
        }
    }
}

/// Failures of the manual distribution's post-build verification
#[derive(Error, Debug)]
pub enum DistError {
    #[error("manual distribution must produce a single artifact, found {count}")]
    ArtifactCount { count: usize },

    #[error("expected output does not exist at {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("output at {} is a directory", path.display())]
    ArtifactIsDirectory { path: PathBuf },

    #[error("failed to inspect {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}
