//! Merging binary and distribution outputs into one removal plan.

use crate::classify::{classify_binaries, ProductTargets};
use crate::dist::{match_artifacts, MatchedArtifact};
use crate::error::CleanError;
use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Binary output roots and the products/targets to clean under each
pub type BinTargets = BTreeMap<PathBuf, ProductTargets>;

/// Where to look for a product's distribution artifacts, and what they are called
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistCandidate {
    pub product: String,
    pub output_dir: PathBuf,
    /// Rendered artifact names; `*` stands for any version
    pub artifact_names: Vec<String>,
}

/// A single path to remove, tagged with the output root it may cascade up to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalEntry {
    pub path: PathBuf,
    pub root: PathBuf,
    pub is_dir: bool,
}

/// The set of paths to remove, keyed by path.
///
/// Entries are ordered by the full path string, not component by component,
/// so `out/v1.0` sorts before `out/v1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalPlan {
    entries: BTreeMap<OsString, RemovalEntry>,
}

impl RemovalPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Re-adding an identical entry is a no-op; adding the same
    /// path with a different root or kind is a planner error.
    pub fn insert(&mut self, entry: RemovalEntry) -> Result<(), CleanError> {
        match self.entries.entry(entry.path.clone().into_os_string()) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
            Entry::Occupied(existing) if *existing.get() == entry => Ok(()),
            Entry::Occupied(_) => Err(CleanError::ConflictingEntry { path: entry.path }),
        }
    }

    /// Add binaries found under `root`; binaries are always files
    pub fn add_binaries(
        &mut self,
        root: &Path,
        binaries: impl IntoIterator<Item = PathBuf>,
    ) -> Result<(), CleanError> {
        for path in binaries {
            self.insert(RemovalEntry {
                path,
                root: root.to_path_buf(),
                is_dir: false,
            })?;
        }
        Ok(())
    }

    /// Add distribution artifacts found directly in `dist_dir`
    pub fn add_dist_artifacts(
        &mut self,
        dist_dir: &Path,
        artifacts: impl IntoIterator<Item = MatchedArtifact>,
    ) -> Result<(), CleanError> {
        for artifact in artifacts {
            self.insert(RemovalEntry {
                path: artifact.path,
                root: dist_dir.to_path_buf(),
                is_dir: artifact.is_dir,
            })?;
        }
        Ok(())
    }

    /// Entries in ascending path order
    pub fn iter(&self) -> btree_map::Values<'_, OsString, RemovalEntry> {
        self.entries.values()
    }

    #[cfg(test)]
    pub fn get(&self, path: &Path) -> Option<&RemovalEntry> {
        self.entries.get(path.as_os_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a RemovalPlan {
    type Item = &'a RemovalEntry;
    type IntoIter = btree_map::Values<'a, OsString, RemovalEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Find everything to remove for the given binary targets and dist candidates
pub fn build_plan(bins: &BinTargets, dists: &[DistCandidate]) -> Result<RemovalPlan, CleanError> {
    let mut plan = RemovalPlan::new();

    for (root, targets) in bins {
        let binaries = classify_binaries(root, targets)?;
        plan.add_binaries(root, binaries)?;
    }

    for dist in dists {
        let artifacts = match_artifacts(&dist.output_dir, &dist.product, &dist.artifact_names)?;
        plan.add_dist_artifacts(&dist.output_dir, artifacts)?;
    }

    tracing::debug!("Planned removal of {} paths", plan.len());
    Ok(plan)
}
