use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use survey_etl::{pipeline, PipelineConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "survey-etl")]
#[command(about = "Integrate the 2014, 2016 and 2025 mental health surveys into one table")]
struct Args {
    /// JSON pipeline config (default: built-in sources and data/ directories)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let output = pipeline::run(&config).context("ETL pipeline failed")?;

    println!("\n=== Integrated survey data ===");
    println!(
        "{} rows x {} columns",
        output.integrated.height(),
        output.integrated.width()
    );
    for (year, df) in &output.cleaned {
        println!("  survey {}: {} rows", year, df.height());
    }
    println!("Integrated table: {}", config.integrated_path().display());
    println!("Metadata:         {}", config.metadata_path().display());
    println!("\nPreview:\n{}", output.integrated.head(Some(5)));

    Ok(())
}
