use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use distclean::{clean_products, verify_dists, ProjectConfig, CONFIG_FILE_NAME};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Remove the build and distribution outputs of configured products",
    long_about = None
)]
struct Args {
    /// Project configuration file
    #[arg(long, short, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Show detailed information about removed paths
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remove binaries and distribution artifacts of products
    Clean {
        /// Products to clean (defaults to every configured product)
        products: Vec<String>,

        /// Print the paths that would be removed, but don't remove them
        #[arg(long)]
        dry_run: bool,
    },
    /// Check that a product's manual distributions produced their artifact
    VerifyDist {
        product: String,

        /// Version the distribution script was run for
        #[arg(long)]
        product_version: String,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_clean(config: &ProjectConfig, products: &[String], dry_run: bool) -> Result<()> {
    let selected = config.select(products)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let reports = clean_products(config, selected, dry_run, &mut out)?;

    // Real runs keep stdout empty; the summary goes with the diagnostics
    if !dry_run {
        let total: usize = reports.iter().map(|r| r.removed.len()).sum();
        eprintln!(
            "{}",
            format!("Removed {} paths for {} products", total, reports.len()).green()
        );
    }
    Ok(())
}

fn run_verify(config: &ProjectConfig, product: &str, version: &str) -> Result<()> {
    let selected = config.select(&[product.to_string()])?;
    for (name, product) in selected {
        let verified = verify_dists(config, name, product, version)
            .with_context(|| format!("Distribution of {} failed verification", name))?;
        for path in verified {
            println!("{} {}", "ok".green().bold(), path.display());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = ProjectConfig::load(&args.config)?;

    match args.command {
        Command::Clean { products, dry_run } => run_clean(&config, &products, dry_run),
        Command::VerifyDist {
            product,
            product_version,
        } => run_verify(&config, &product, &product_version),
    }
}
