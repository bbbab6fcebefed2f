//! dengue-features: inspect the resolved dengue feature pipeline.

use anyhow::Context;
use clap::Parser;
use dengue_prediction::{
    DengueConfig, DengueContribLoader, feature_transformations, load_config,
    target_transformations,
};
use fhub_core::FeaturePlan;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Feature plans for weekly dengue incidence models
#[derive(Parser, Debug)]
#[command(name = "dengue-features", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds dengue.toml)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Contrib module to merge, overriding configuration
    #[arg(long)]
    contrib: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the resolved feature plan
    Plan {
        /// Emit JSON instead of one identity per line
        #[arg(long)]
        json: bool,
    },
    /// Print the target transformations
    Targets {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));
    tracing_subscriber::registry().with(stderr_layer).init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| cli.workspace.clone());

    let mut config = load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(module) = cli.contrib {
        config.contrib.module_name = module;
    }
    tracing::debug!(?config, "Loaded configuration");

    match cli.command {
        Commands::Plan { json } => {
            let plan = resolve_features(&config)?;
            print_plan(&plan, json)
        }
        Commands::Targets { json } => print_plan(&target_transformations()?, json),
    }
}

fn resolve_features(config: &DengueConfig) -> anyhow::Result<FeaturePlan> {
    let loader = DengueContribLoader::from_config(config);
    feature_transformations(&loader, config).context("Failed to resolve feature plan")
}

fn print_plan(plan: &FeaturePlan, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&plan.describe())?);
        return Ok(());
    }
    for description in plan.describe() {
        println!("{}", description.identity);
    }
    eprintln!(
        "{} features ({} static, {} contributed)",
        plan.len(),
        plan.static_count(),
        plan.contrib_count()
    );
    Ok(())
}
