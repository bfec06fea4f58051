//! Locating built product binaries under an output root.
//!
//! Binaries are laid out as `<root>/<tag-dir>/<os-arch>/<product>`. The tag
//! directory (usually a version) is not inspected; only the os-arch directory
//! and the binary name decide whether a file belongs to a requested product.

use crate::error::CleanError;
use crate::osarch::OsArch;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Products expected under one output root, with the targets to clean for each
pub type ProductTargets = BTreeMap<String, Vec<OsArch>>;

/// Invert `product -> os-archs` into `os-arch dir name -> products`
fn index_by_osarch(targets: &ProductTargets) -> HashMap<String, HashSet<&str>> {
    let mut index: HashMap<String, HashSet<&str>> = HashMap::new();
    for (product, osarchs) in targets {
        for osarch in osarchs {
            index
                .entry(osarch.to_string())
                .or_default()
                .insert(product.as_str());
        }
    }
    index
}

/// List the immediate subdirectories of `dir` as `(name, path)` pairs.
/// Symlinks are not followed.
fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>, CleanError> {
    let entries = fs::read_dir(dir).map_err(|source| CleanError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CleanError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_ok_and(|ft| ft.is_dir()) {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    Ok(dirs)
}

/// Find the binaries under `root` that belong to the given products and targets.
///
/// A missing or unreadable `root` yields an empty set: nothing has been built yet.
pub fn classify_binaries(
    root: &Path,
    targets: &ProductTargets,
) -> Result<BTreeSet<PathBuf>, CleanError> {
    let mut binaries = BTreeSet::new();
    let index = index_by_osarch(targets);

    let tag_dirs = match subdirectories(root) {
        Ok(dirs) => dirs,
        Err(err) => {
            tracing::trace!("Skipping unreadable output root {}: {}", root.display(), err);
            return Ok(binaries);
        }
    };

    for (_tag, tag_path) in tag_dirs {
        for (osarch_name, osarch_path) in subdirectories(&tag_path)? {
            let Some(products) = index.get(&osarch_name) else {
                continue;
            };

            let entries = fs::read_dir(&osarch_path).map_err(|source| CleanError::ReadDir {
                path: osarch_path.clone(),
                source,
            })?;
            for entry in entries {
                let entry = entry.map_err(|source| CleanError::ReadDir {
                    path: osarch_path.clone(),
                    source,
                })?;
                let name = entry.file_name();
                if products.contains(&*name.to_string_lossy()) {
                    tracing::trace!("Matched binary {}", entry.path().display());
                    binaries.insert(entry.path());
                }
            }
        }
    }

    Ok(binaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn targets(entries: &[(&str, &str)]) -> ProductTargets {
        let mut targets = ProductTargets::new();
        for (product, osarch) in entries {
            targets
                .entry(product.to_string())
                .or_default()
                .push(osarch.parse().unwrap());
        }
        targets
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        let result = classify_binaries(
            &dir.path().join("does-not-exist"),
            &targets(&[("app", "linux-amd64")]),
        )
        .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_selects_only_requested_products_and_targets() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("1.0.0/linux-amd64")).unwrap();
        fs::create_dir_all(root.join("1.0.0/darwin-amd64")).unwrap();
        fs::create_dir_all(root.join("snapshot/linux-amd64")).unwrap();
        fs::write(root.join("1.0.0/linux-amd64/app"), "bin").unwrap();
        fs::write(root.join("1.0.0/linux-amd64/other"), "bin").unwrap();
        fs::write(root.join("1.0.0/darwin-amd64/app"), "bin").unwrap();
        fs::write(root.join("snapshot/linux-amd64/app"), "bin").unwrap();

        let result = classify_binaries(root, &targets(&[("app", "linux-amd64")])).unwrap();

        let expected: BTreeSet<PathBuf> = [
            root.join("1.0.0/linux-amd64/app"),
            root.join("snapshot/linux-amd64/app"),
        ]
        .into_iter()
        .collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_ignores_files_at_top_and_tag_level() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("1.0.0")).unwrap();
        // Files named like the product or os-arch at the wrong depth are not binaries
        fs::write(root.join("app"), "stray").unwrap();
        fs::write(root.join("1.0.0/linux-amd64"), "not a dir").unwrap();

        let result = classify_binaries(root, &targets(&[("app", "linux-amd64")])).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_multiple_products_share_osarch_dir() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("v1/linux-arm64")).unwrap();
        fs::write(root.join("v1/linux-arm64/server"), "bin").unwrap();
        fs::write(root.join("v1/linux-arm64/client"), "bin").unwrap();

        let result = classify_binaries(
            root,
            &targets(&[("server", "linux-arm64"), ("client", "linux-arm64")]),
        )
        .unwrap();
        assert_eq!(result.len(), 2);
    }
}
