use attribute_decomposition::config::DecompositionConfig;
use attribute_decomposition::core::{DecompositionEngine, FGenerator};
use attribute_decomposition::ingestion::PopulationModel;
use attribute_decomposition::report::DecompositionReport;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "decompose")]
#[command(about = "Decompose an f-inequality measure over attribute interactions")]
#[command(version)]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Population model CSV
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// CSV field delimiter
    #[arg(long)]
    delimiter: Option<char>,

    /// Indicator value column
    #[arg(long)]
    indicator: Option<String>,

    /// Number of individuals column
    #[arg(long)]
    count: Option<String>,

    /// Attribute column to decompose over (repeatable)
    #[arg(short, long = "attribute")]
    attributes: Vec<String>,

    /// Mixing parameter between population and indicator shares
    #[arg(short, long)]
    p: Option<f64>,

    /// f-generator: chi-squared, kl, reverse-kl, hellinger, tv, ge
    #[arg(short, long)]
    generator: Option<String>,

    /// Alpha of the generalized entropy generator
    #[arg(long)]
    alpha: Option<f64>,

    /// Also report the Atkinson transform with this epsilon
    #[arg(long)]
    atkinson: Option<f64>,

    /// Print the report as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    config.validate().context("Invalid decomposition configuration")?;

    let model = PopulationModel::from_csv(&config.model)
        .with_context(|| format!("Failed to load population model {:?}", config.model.path))?;
    info!("Population model has {} rows", model.height());

    let attributes = config.deduplicated_attributes();
    let generator = config.generator;
    let decomposition = DecompositionEngine::new(
        &model,
        |x: f64| generator.evaluate(x),
        config.p,
        &attributes,
    )?
    .with_partial_precision(config.partial_precision)
    .run()?;

    let report = DecompositionReport::new(attributes, config.p, generator.name(), decomposition);

    if args.json {
        match args.atkinson {
            Some(epsilon) => println!("{}", report.atkinson(epsilon)?.to_json()?),
            None => println!("{}", report.to_json()?),
        }
        return Ok(());
    }

    print!("{}", report.render_table());
    if let Some(epsilon) = args.atkinson {
        println!("\n-- Atkinson index({}) transformation --", epsilon);
        print!("{}", report.atkinson(epsilon)?.render_table());
        println!("Partial contributions of a transformation are additive under the transformed addition only.");
    }

    Ok(())
}

/// Configuration file, then environment overrides, then command-line flags
fn build_config(args: &Args) -> Result<DecompositionConfig> {
    let mut config = match &args.config {
        Some(path) => DecompositionConfig::load(path)
            .with_context(|| format!("Failed to read configuration {:?}", path))?,
        None => DecompositionConfig::default(),
    };
    config.apply_env_overrides()?;

    if let Some(model) = &args.model {
        config.model.path = model.clone();
    }
    if let Some(delimiter) = args.delimiter {
        config.model.delimiter = delimiter;
    }
    if let Some(indicator) = &args.indicator {
        config.model.indicator_column = indicator.clone();
    }
    if let Some(count) = &args.count {
        config.model.count_column = count.clone();
    }
    if !args.attributes.is_empty() {
        config.attributes = args.attributes.clone();
    }
    if let Some(p) = args.p {
        config.p = p;
    }

    match (&args.generator, args.alpha) {
        (Some(name), alpha) => config.generator = FGenerator::parse(name, alpha)?,
        (None, Some(alpha)) => config.generator = config.generator.with_alpha(alpha),
        (None, None) => {}
    }

    Ok(config)
}
