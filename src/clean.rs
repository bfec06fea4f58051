//! Cleaning configured products.

use crate::config::{ProductConfig, ProjectConfig};
use crate::error::{CleanError, DistError};
use crate::plan::build_plan;
use crate::remover::{execute_with, VirtualRemovedSet, DRY_RUN_PREFIX};
use std::io::Write;
use std::path::PathBuf;

/// Outcome of cleaning one product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductReport {
    pub product: String,
    /// Paths removed, or that would be removed in a dry run
    pub removed: Vec<PathBuf>,
}

fn clean_one<W: Write>(
    config: &ProjectConfig,
    name: &str,
    product: &ProductConfig,
    dry_run: bool,
    removed: &mut VirtualRemovedSet,
    out: &mut W,
) -> Result<Vec<PathBuf>, CleanError> {
    let bins = config.bin_targets(name, product);
    let dists = config.dist_candidates(name, product);
    let plan = build_plan(&bins, &dists)?;
    if plan.is_empty() {
        tracing::debug!("Nothing to clean for {}", name);
    }

    if dry_run {
        writeln!(out, "{} Clean {} will remove paths:", DRY_RUN_PREFIX, name)
            .map_err(CleanError::Report)?;
    }
    execute_with(&plan, dry_run, removed, out)
}

fn clean_product_with<W: Write>(
    config: &ProjectConfig,
    name: &str,
    product: &ProductConfig,
    dry_run: bool,
    removed: &mut VirtualRemovedSet,
    out: &mut W,
) -> Result<ProductReport, CleanError> {
    tracing::debug!("Cleaning {} (dry run: {})", name, dry_run);
    let paths = clean_one(config, name, product, dry_run, removed, out)
        .map_err(|err| err.for_product(name))?;
    Ok(ProductReport {
        product: name.to_string(),
        removed: paths,
    })
}

/// Remove the build and distribution outputs of one product
pub fn clean_product<W: Write>(
    config: &ProjectConfig,
    name: &str,
    product: &ProductConfig,
    dry_run: bool,
    out: &mut W,
) -> Result<ProductReport, CleanError> {
    let mut removed = VirtualRemovedSet::new();
    clean_product_with(config, name, product, dry_run, &mut removed, out)
}

/// Clean each product in turn, stopping at the first failure.
///
/// Products may share output directories, so a dry run carries its simulated
/// removals from one product to the next.
pub fn clean_products<'a, W: Write>(
    config: &ProjectConfig,
    products: impl IntoIterator<Item = (&'a str, &'a ProductConfig)>,
    dry_run: bool,
    out: &mut W,
) -> Result<Vec<ProductReport>, CleanError> {
    let mut removed = VirtualRemovedSet::new();
    products
        .into_iter()
        .map(|(name, product)| {
            clean_product_with(config, name, product, dry_run, &mut removed, out)
        })
        .collect()
}

/// Check that every distribution of a product produced its declared artifact
pub fn verify_dists(
    config: &ProjectConfig,
    name: &str,
    product: &ProductConfig,
    version: &str,
) -> Result<Vec<PathBuf>, DistError> {
    let mut verified = Vec::new();
    for dist in &product.dist {
        let output_dir = config.resolve(&dist.output_dir);
        let paths: Vec<PathBuf> = dist
            .artifact_names(name, version)
            .into_iter()
            .map(|artifact| output_dir.join(artifact))
            .collect();
        tracing::debug!(
            "Verifying {} dist of {}: {:?}",
            dist.dist_type.type_name(),
            name,
            paths
        );
        dist.dist_type.verify_artifacts(&paths)?;
        verified.extend(paths);
    }
    Ok(verified)
}
