//! Project configuration loaded from `distclean.toml`.

use crate::classify::ProductTargets;
use crate::dist::{render_name_template, DistType, DEFAULT_NAME_TEMPLATE, VERSION_WILDCARD};
use crate::osarch::OsArch;
use crate::plan::{BinTargets, DistCandidate};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "distclean.toml";

fn default_build_output_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_dist_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_name_template() -> String {
    DEFAULT_NAME_TEMPLATE.to_string()
}

fn default_os_archs() -> Vec<OsArch> {
    vec![OsArch::host()]
}

/// Structure to deserialize the whole configuration file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    products: BTreeMap<String, ProductConfig>,
}

/// How one product is built and distributed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProductConfig {
    /// Binary output directory, relative to the project directory
    #[serde(default = "default_build_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_os_archs")]
    pub os_archs: Vec<OsArch>,
    #[serde(default)]
    pub dist: Vec<DistConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DistConfig {
    #[serde(default = "default_dist_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_name_template")]
    pub name_template: String,
    #[serde(flatten)]
    pub dist_type: DistType,
}

impl DistConfig {
    /// Artifact names for a concrete version of the product
    pub fn artifact_names(&self, product: &str, version: &str) -> Vec<String> {
        self.dist_type
            .artifacts(&render_name_template(&self.name_template, product, version))
    }
}

/// A loaded project: its directory and the products it defines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub project_dir: PathBuf,
    pub products: BTreeMap<String, ProductConfig>,
}

impl ProjectConfig {
    /// Load a config file; relative output directories resolve against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let project_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let project_dir = project_dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve project directory {}", project_dir.display()))?;

        Self::from_toml(&content, project_dir)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str, project_dir: PathBuf) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).context("Failed to parse config TOML")?;
        Ok(Self {
            project_dir,
            products: file.products,
        })
    }

    /// Look up products by name; an empty selection means every product
    pub fn select<'a>(&'a self, names: &[String]) -> Result<Vec<(&'a str, &'a ProductConfig)>> {
        if names.is_empty() {
            return Ok(self
                .products
                .iter()
                .map(|(name, product)| (name.as_str(), product))
                .collect());
        }

        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            match self.products.get_key_value(name) {
                Some((name, product)) => selected.push((name.as_str(), product)),
                None => bail!(
                    "Unknown product '{}'. Known products: {}",
                    name,
                    self.products.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
            }
        }
        Ok(selected)
    }

    pub fn resolve(&self, dir: &Path) -> PathBuf {
        self.project_dir.join(dir)
    }

    /// Binary output root and targets for one product
    pub fn bin_targets(&self, name: &str, product: &ProductConfig) -> BinTargets {
        let targets: ProductTargets = [(name.to_string(), product.os_archs.clone())]
            .into_iter()
            .collect();
        [(self.resolve(&product.output_dir), targets)]
            .into_iter()
            .collect()
    }

    /// Dist directories and version-agnostic artifact names for one product
    pub fn dist_candidates(&self, name: &str, product: &ProductConfig) -> Vec<DistCandidate> {
        product
            .dist
            .iter()
            .map(|dist| DistCandidate {
                product: name.to_string(),
                output_dir: self.resolve(&dist.output_dir),
                artifact_names: dist.artifact_names(name, VERSION_WILDCARD),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::ManualDist;

    const SAMPLE: &str = r#"
[products.app]
output-dir = "out/build"
os-archs = ["linux-amd64", "darwin-arm64"]

[[products.app.dist]]
output-dir = "out/dist"
type = "manual"
extension = "tgz"

[products.tool]
"#;

    fn sample() -> ProjectConfig {
        ProjectConfig::from_toml(SAMPLE, PathBuf::from("/project")).unwrap()
    }

    #[test]
    fn test_parse_products() {
        let config = sample();
        let app = &config.products["app"];
        assert_eq!(app.output_dir, PathBuf::from("out/build"));
        assert_eq!(
            app.os_archs,
            vec![OsArch::new("linux", "amd64"), OsArch::new("darwin", "arm64")]
        );
        assert_eq!(app.dist.len(), 1);
        assert_eq!(app.dist[0].name_template, DEFAULT_NAME_TEMPLATE);
        assert_eq!(
            app.dist[0].dist_type,
            DistType::Manual(ManualDist {
                extension: Some("tgz".to_string())
            })
        );
    }

    #[test]
    fn test_defaults() {
        let config = sample();
        let tool = &config.products["tool"];
        assert_eq!(tool.output_dir, PathBuf::from("build"));
        assert_eq!(tool.os_archs, vec![OsArch::host()]);
        assert!(tool.dist.is_empty());
    }

    #[test]
    fn test_invalid_osarch_is_rejected() {
        let result = ProjectConfig::from_toml(
            "[products.app]\nos-archs = [\"linux\"]\n",
            PathBuf::from("/project"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_dist_type_is_rejected() {
        let result = ProjectConfig::from_toml(
            "[[products.app.dist]]\ntype = \"docker\"\n",
            PathBuf::from("/project"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_misspelled_dist_key_is_rejected() {
        let result = ProjectConfig::from_toml(
            "[[products.app.dist]]\ntype = \"manual\"\nextention = \"tgz\"\n",
            PathBuf::from("/project"),
        );
        let err = format!("{:#}", result.unwrap_err());
        assert!(err.contains("extention"), "{err}");
    }

    #[test]
    fn test_select_unknown_product() {
        let config = sample();
        let err = config.select(&["nope".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Unknown product 'nope'"));
    }

    #[test]
    fn test_select_all_in_name_order() {
        let config = sample();
        let names: Vec<_> = config.select(&[]).unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["app", "tool"]);
    }

    #[test]
    fn test_candidates_resolve_against_project_dir() {
        let config = sample();
        let app = &config.products["app"];

        let bins = config.bin_targets("app", app);
        assert!(bins.contains_key(Path::new("/project/out/build")));

        let dists = config.dist_candidates("app", app);
        assert_eq!(
            dists,
            vec![DistCandidate {
                product: "app".to_string(),
                output_dir: PathBuf::from("/project/out/dist"),
                artifact_names: vec!["app-*.tgz".to_string()],
            }]
        );
        assert_eq!(app.dist[0].artifact_names("app", "1.0"), vec!["app-1.0.tgz"]);
    }
}
