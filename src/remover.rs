//! Executing a removal plan, cascading up through emptied directories.
//!
//! ## Dry runs
//!
//! A dry run never touches the filesystem, but it has to report exactly what a
//! real run would delete, including parent directories that only become empty
//! because of earlier (simulated) removals. Every removal, real or simulated,
//! is recorded in a [`VirtualRemovedSet`], and all existence and emptiness
//! checks consult it. A real run records the same way, so both modes walk the
//! plan identically and produce the same list of affected paths.
//!
//! ## Cascade
//!
//! After each planned path is removed, its ancestors are visited from the
//! bottom up. The walk stops at the entry's output root, at a directory that
//! no longer exists, or at the first directory that still has content. The
//! root itself is then checked separately and removed once it is empty.

use crate::error::CleanError;
use crate::plan::{RemovalEntry, RemovalPlan};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::mem;
use std::path::{Path, PathBuf};

/// Prefix of every line of a dry run report
pub const DRY_RUN_PREFIX: &str = "[DRY RUN]";

/// Paths removed, really or virtually, during one clean.
///
/// When several plans are executed in sequence, the same set must be carried
/// through all of them so later plans see the earlier simulated removals.
#[derive(Debug, Default)]
pub struct VirtualRemovedSet {
    paths: HashSet<PathBuf>,
}

impl VirtualRemovedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &Path) {
        self.paths.insert(path.to_path_buf());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Whether `path` or one of its ancestors has been removed
    pub fn covers(&self, path: &Path) -> bool {
        path.ancestors().any(|p| self.paths.contains(p))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Why an upward cascade stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStop {
    /// Reached the entry's output root
    AtRoot,
    /// A directory on the way up still has content
    NonEmpty,
    /// A directory on the way up does not exist
    MissingParent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CascadeState {
    Cascading(PathBuf),
    Stopped(CascadeStop),
}

/// One execution of a removal plan.
///
/// Owns a [`VirtualRemovedSet`] for its lifetime; the plan itself is only
/// borrowed. [`CascadingRemover::into_parts`] hands the set back for the next plan.
pub struct CascadingRemover<'w, W: Write> {
    dry_run: bool,
    removed: VirtualRemovedSet,
    affected: Vec<PathBuf>,
    report: &'w mut W,
}

impl<'w, W: Write> CascadingRemover<'w, W> {
    pub fn new(dry_run: bool, report: &'w mut W) -> Self {
        Self::with_removed(dry_run, VirtualRemovedSet::new(), report)
    }

    /// Continue from the removals of earlier executions
    pub fn with_removed(dry_run: bool, removed: VirtualRemovedSet, report: &'w mut W) -> Self {
        Self {
            dry_run,
            removed,
            affected: Vec::new(),
            report,
        }
    }

    #[cfg(test)]
    pub fn removed(&self) -> &VirtualRemovedSet {
        &self.removed
    }

    /// Paths removed (or that would be removed) so far, in removal order
    #[cfg(test)]
    pub fn affected(&self) -> &[PathBuf] {
        &self.affected
    }

    /// The affected paths and the removed set, for the next execution
    pub fn into_parts(self) -> (Vec<PathBuf>, VirtualRemovedSet) {
        (self.affected, self.removed)
    }

    /// Process every entry of the plan in ascending path order.
    /// The first failure aborts; paths already deleted stay deleted.
    pub fn execute(&mut self, plan: &RemovalPlan) -> Result<(), CleanError> {
        for entry in plan {
            self.process(entry)?;
        }
        Ok(())
    }

    fn process(&mut self, entry: &RemovalEntry) -> Result<(), CleanError> {
        let RemovalEntry { path, root, is_dir } = entry;

        if path == root || !path.starts_with(root) {
            return Err(CleanError::Consistency {
                root: root.clone(),
                path: path.clone(),
            });
        }

        self.remove_leaf(path, *is_dir)?;
        self.removed.insert(path);

        let stop = self.cascade(path, root)?;
        tracing::trace!("Cascade from {} stopped: {:?}", path.display(), stop);

        self.remove_dir_if_empty(root)?;
        Ok(())
    }

    /// Whether `path` exists in the world this execution sees
    fn present(&self, path: &Path) -> bool {
        if self.dry_run && self.removed.covers(path) {
            return false;
        }
        fs::symlink_metadata(path).is_ok()
    }

    fn remove_leaf(&mut self, path: &Path, is_dir: bool) -> Result<(), CleanError> {
        if !self.present(path) {
            return Ok(());
        }

        if !self.dry_run {
            if is_dir {
                fs::remove_dir_all(path).map_err(|source| CleanError::RemoveDir {
                    path: path.to_path_buf(),
                    source,
                })?;
            } else {
                fs::remove_file(path).map_err(|source| CleanError::RemoveFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            tracing::debug!("Removed {}", path.display());
        }
        self.record(path)
    }

    /// Walk up from the parent of `path`, removing directories that are now empty
    pub fn cascade(&mut self, path: &Path, root: &Path) -> Result<CascadeStop, CleanError> {
        let mut state = match path.parent() {
            Some(parent) => CascadeState::Cascading(parent.to_path_buf()),
            None => CascadeState::Stopped(CascadeStop::AtRoot),
        };

        loop {
            state = match state {
                CascadeState::Stopped(stop) => return Ok(stop),
                CascadeState::Cascading(dir) => self.step(&dir, root)?,
            };
        }
    }

    fn step(&mut self, dir: &Path, root: &Path) -> Result<CascadeState, CleanError> {
        if dir == root {
            return Ok(CascadeState::Stopped(CascadeStop::AtRoot));
        }
        if !self.present(dir) {
            return Ok(CascadeState::Stopped(CascadeStop::MissingParent));
        }
        if !self.remove_dir_if_empty(dir)? {
            return Ok(CascadeState::Stopped(CascadeStop::NonEmpty));
        }
        Ok(match dir.parent() {
            Some(parent) => CascadeState::Cascading(parent.to_path_buf()),
            // Unreachable while `dir` lies under `root`
            None => CascadeState::Stopped(CascadeStop::AtRoot),
        })
    }

    /// Remove `dir` if it exists and has no remaining entries.
    /// In a dry run, entries already marked removed do not count.
    pub fn remove_dir_if_empty(&mut self, dir: &Path) -> Result<bool, CleanError> {
        if !self.present(dir) {
            return Ok(false);
        }

        let entries = fs::read_dir(dir).map_err(|source| CleanError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| CleanError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;
            if !(self.dry_run && self.removed.contains(&entry.path())) {
                return Ok(false);
            }
        }

        if !self.dry_run {
            fs::remove_dir_all(dir).map_err(|source| CleanError::RemoveDir {
                path: dir.to_path_buf(),
                source,
            })?;
            tracing::debug!("Removed empty directory {}", dir.display());
        }
        self.removed.insert(dir);
        self.record(dir)?;
        Ok(true)
    }

    fn record(&mut self, path: &Path) -> Result<(), CleanError> {
        if self.dry_run {
            writeln!(self.report, "{}     {}", DRY_RUN_PREFIX, path.display())
                .map_err(CleanError::Report)?;
        }
        self.affected.push(path.to_path_buf());
        Ok(())
    }
}

/// Execute `plan`, writing dry run lines to `report`.
/// Returns the affected paths in processing order.
pub fn execute<W: Write>(
    plan: &RemovalPlan,
    dry_run: bool,
    report: &mut W,
) -> Result<Vec<PathBuf>, CleanError> {
    execute_with(plan, dry_run, &mut VirtualRemovedSet::new(), report)
}

/// Execute `plan` on top of the removals already recorded in `removed`,
/// adding its own. Use one set for every plan of the same clean.
pub fn execute_with<W: Write>(
    plan: &RemovalPlan,
    dry_run: bool,
    removed: &mut VirtualRemovedSet,
    report: &mut W,
) -> Result<Vec<PathBuf>, CleanError> {
    let mut remover = CascadingRemover::with_removed(dry_run, mem::take(removed), report);
    let result = remover.execute(plan);
    let (affected, set) = remover.into_parts();
    *removed = set;
    result.map(|()| affected)
}
