//! Distribution artifacts: name templates, matching and the manual dist type.

use crate::error::{CleanError, DistError};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Placeholder for the product name in a dist name template
pub const PRODUCT_PLACEHOLDER: &str = "{{Product}}";
/// Placeholder for the product version in a dist name template
pub const VERSION_PLACEHOLDER: &str = "{{Version}}";
/// Name template used when a dist does not declare one
pub const DEFAULT_NAME_TEMPLATE: &str = "{{Product}}-{{Version}}";
/// Rendered in place of the version when matching artifacts of any version
pub const VERSION_WILDCARD: &str = "*";

/// Render a dist name template for a product and version
pub fn render_name_template(template: &str, product: &str, version: &str) -> String {
    template
        .replace(PRODUCT_PLACEHOLDER, product)
        .replace(VERSION_PLACEHOLDER, version)
}

/// A file name matcher for entries of a dist output directory.
///
/// Matching is always against the whole file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactPattern {
    /// `<product>-` followed by at least one character
    ProductPrefix(String),
    /// The exact file name
    Exact(String),
    /// Literal parts separated by wildcards that each match one or more characters
    Glob(Vec<String>),
}

impl ArtifactPattern {
    pub fn product_prefix(product: &str) -> Self {
        Self::ProductPrefix(format!("{product}-"))
    }

    /// Build a matcher for a rendered artifact name, treating `*` as a wildcard
    pub fn from_name(name: &str) -> Self {
        if name.contains(VERSION_WILDCARD) {
            Self::Glob(name.split(VERSION_WILDCARD).map(str::to_string).collect())
        } else {
            Self::Exact(name.to_string())
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            Self::ProductPrefix(prefix) => {
                file_name.len() > prefix.len() && file_name.starts_with(prefix.as_str())
            }
            Self::Exact(name) => file_name == name,
            Self::Glob(parts) => matches_glob(file_name, parts),
        }
    }
}

/// Match `name` against literal `parts` joined by non-empty wildcards.
/// Each middle part is placed at its leftmost position, which is enough to
/// decide a match when every gap only needs to be non-empty.
fn matches_glob(name: &str, parts: &[String]) -> bool {
    let (Some(first), Some(last)) = (parts.first(), parts.last()) else {
        return false;
    };
    if parts.len() == 1 {
        return name == first;
    }
    if !name.starts_with(first.as_str()) {
        return false;
    }

    let mut pos = first.len();
    for part in &parts[1..parts.len() - 1] {
        // Wildcard needs at least one character
        let search_from = pos + 1;
        if search_from > name.len() {
            return false;
        }
        match name.get(search_from..).and_then(|rest| rest.find(part.as_str())) {
            Some(offset) => pos = search_from + offset + part.len(),
            None => return false,
        }
    }

    name.len() >= pos + 1 + last.len() && name.ends_with(last.as_str())
}

/// An entry of a dist output directory selected for removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedArtifact {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// The ordered matchers used to find a product's artifacts in a dist output directory
pub fn artifact_patterns(product: &str, artifact_names: &[String]) -> Vec<ArtifactPattern> {
    let mut patterns = vec![ArtifactPattern::product_prefix(product)];
    patterns.extend(artifact_names.iter().map(|name| {
        let base = Path::new(name)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.clone());
        ArtifactPattern::from_name(&base)
    }));
    patterns
}

/// Find the entries of `dir` that are distribution artifacts of `product`.
///
/// Patterns are tried in order and the first one that matches an entry wins.
/// A missing or unreadable `dir` means nothing has been distributed yet; a
/// failure while listing its entries is an error.
pub fn match_artifacts(
    dir: &Path,
    product: &str,
    artifact_names: &[String],
) -> Result<Vec<MatchedArtifact>, CleanError> {
    let patterns = artifact_patterns(product, artifact_names);

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::trace!("Skipping unreadable dist directory {}: {}", dir.display(), err);
            return Ok(Vec::new());
        }
    };

    let mut matched = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CleanError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(pattern) = patterns.iter().find(|p| p.matches(&name)) {
            tracing::trace!("{} matched {:?}", entry.path().display(), pattern);
            matched.push(MatchedArtifact {
                path: entry.path(),
                is_dir: entry.file_type().is_ok_and(|ft| ft.is_dir()),
            });
        }
    }
    matched.sort_by(|a, b| a.path.as_os_str().cmp(b.path.as_os_str()));
    Ok(matched)
}

/// Configuration of a distribution whose output is produced by an external script
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManualDist {
    /// Extension of the script's output, e.g. `tgz`. Without one the output
    /// is expected to be named exactly after the rendered name template.
    #[serde(default)]
    pub extension: Option<String>,
}

impl ManualDist {
    pub const TYPE_NAME: &'static str = "manual";

    /// The artifact file names produced for a rendered name template
    pub fn artifacts(&self, rendered_name: &str) -> Vec<String> {
        match self.extension.as_deref() {
            Some(ext) if !ext.is_empty() => vec![format!("{rendered_name}.{ext}")],
            _ => vec![rendered_name.to_string()],
        }
    }

    /// The script produces the output, so there is nothing to run
    pub fn run_dist(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Check that the script produced exactly one regular artifact
    pub fn verify_artifacts(&self, artifact_paths: &[PathBuf]) -> Result<(), DistError> {
        let [path] = artifact_paths else {
            return Err(DistError::ArtifactCount {
                count: artifact_paths.len(),
            });
        };

        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(DistError::MissingArtifact { path: path.clone() });
            }
            Err(source) => {
                return Err(DistError::Io {
                    path: path.clone(),
                    source,
                })
            }
        };

        if metadata.is_dir() {
            return Err(DistError::ArtifactIsDirectory { path: path.clone() });
        }
        Ok(())
    }
}

/// Supported distribution types, selected by the `type` key in config
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DistType {
    Manual(ManualDist),
}

impl DistType {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Manual(_) => ManualDist::TYPE_NAME,
        }
    }

    pub fn artifacts(&self, rendered_name: &str) -> Vec<String> {
        match self {
            Self::Manual(manual) => manual.artifacts(rendered_name),
        }
    }

    pub fn verify_artifacts(&self, artifact_paths: &[PathBuf]) -> Result<(), DistError> {
        match self {
            Self::Manual(manual) => manual.verify_artifacts(artifact_paths),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_render_name_template() {
        assert_eq!(
            render_name_template(DEFAULT_NAME_TEMPLATE, "app", "1.2.3"),
            "app-1.2.3"
        );
        assert_eq!(
            render_name_template("{{Product}}_{{Version}}_dist", "app", VERSION_WILDCARD),
            "app_*_dist"
        );
    }

    #[test]
    fn test_product_prefix_requires_suffix() {
        let pattern = ArtifactPattern::product_prefix("app");
        assert!(pattern.matches("app-1.0.0.tgz"));
        assert!(pattern.matches("app-x"));
        assert!(!pattern.matches("app-"));
        assert!(!pattern.matches("app"));
        assert!(!pattern.matches("myapp-1.0.0"));
    }

    #[test]
    fn test_glob_wildcard_is_non_empty() {
        let pattern = ArtifactPattern::from_name("app_*_dist.tgz");
        assert!(pattern.matches("app_1.0_dist.tgz"));
        assert!(!pattern.matches("app__dist.tgz"));
        assert!(!pattern.matches("app_1.0_dist.zip"));
        assert!(!pattern.matches("xapp_1.0_dist.tgz"));
    }

    #[test]
    fn test_glob_with_two_wildcards() {
        let pattern = ArtifactPattern::from_name("*-bundle-*.zip");
        assert!(pattern.matches("a-bundle-1.zip"));
        assert!(!pattern.matches("-bundle-1.zip"));
        assert!(!pattern.matches("a-bundle-.zip"));
    }

    #[test]
    fn test_exact_name() {
        assert_eq!(
            ArtifactPattern::from_name("release.tgz"),
            ArtifactPattern::Exact("release.tgz".to_string())
        );
    }

    #[test]
    fn test_match_artifacts_first_match_wins_and_records_dirs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("app-1.0.0.tgz"), "dist").unwrap();
        fs::create_dir(dir.path().join("app-1.0.0")).unwrap();
        fs::write(dir.path().join("bundle.zip"), "dist").unwrap();
        fs::write(dir.path().join("unrelated.txt"), "keep").unwrap();

        let matched = match_artifacts(dir.path(), "app", &["bundle.zip".to_string()]).unwrap();

        assert_eq!(
            matched,
            vec![
                MatchedArtifact {
                    path: dir.path().join("app-1.0.0"),
                    is_dir: true
                },
                MatchedArtifact {
                    path: dir.path().join("app-1.0.0.tgz"),
                    is_dir: false
                },
                MatchedArtifact {
                    path: dir.path().join("bundle.zip"),
                    is_dir: false
                },
            ]
        );
    }

    #[test]
    fn test_match_artifacts_missing_dir() {
        let dir = tempdir().unwrap();
        assert!(match_artifacts(&dir.path().join("dist"), "app", &[])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_match_artifacts_file_in_place_of_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("dist"), "not a directory").unwrap();
        assert!(match_artifacts(&dir.path().join("dist"), "app", &[])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_match_artifacts_sorts_by_full_name() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("app-1")).unwrap();
        fs::write(dir.path().join("app-1.tgz"), "dist").unwrap();
        fs::write(dir.path().join("app-1-linux.tgz"), "dist").unwrap();

        let names: Vec<_> = match_artifacts(dir.path(), "app", &[])
            .unwrap()
            .into_iter()
            .map(|m| m.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["app-1", "app-1-linux.tgz", "app-1.tgz"]);
    }

    #[test]
    fn test_manual_artifacts_extension() {
        let manual = ManualDist {
            extension: Some("tgz".to_string()),
        };
        assert_eq!(manual.artifacts("app-1.0"), vec!["app-1.0.tgz".to_string()]);
        assert_eq!(ManualDist::default().artifacts("app-1.0"), vec!["app-1.0".to_string()]);
        assert!(manual.run_dist().is_empty());
    }

    #[test]
    fn test_manual_verify() {
        let dir = tempdir().unwrap();
        let manual = ManualDist::default();
        let output = dir.path().join("app-1.0");

        assert!(matches!(
            manual.verify_artifacts(&[output.clone()]),
            Err(DistError::MissingArtifact { .. })
        ));

        fs::create_dir(&output).unwrap();
        assert!(matches!(
            manual.verify_artifacts(&[output.clone()]),
            Err(DistError::ArtifactIsDirectory { .. })
        ));

        fs::remove_dir(&output).unwrap();
        fs::write(&output, "archive").unwrap();
        assert!(manual.verify_artifacts(&[output.clone()]).is_ok());

        assert!(matches!(
            manual.verify_artifacts(&[output.clone(), output]),
            Err(DistError::ArtifactCount { count: 2 })
        ));
    }
}
