// src/main.rs

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use cpconvert::{ContentPackageConverter, ConverterConfig};
use tracing::info;

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            packages,
            output,
            artifacts,
            filters,
            strict,
            config,
        } => {
            let mut settings = match &config {
                Some(path) => ConverterConfig::load(path)
                    .with_context(|| format!("Failed to load configuration {}", path.display()))?,
                None => ConverterConfig::new(),
            };

            if let Some(output) = output {
                settings.output_dir = output;
            }
            if let Some(artifacts) = artifacts {
                settings.artifacts_dir = Some(artifacts);
            }
            settings.filtering_patterns.extend(filters);
            settings.strict_validation |= strict;
            settings.validate()?;

            info!(
                "Converting {} content-package(s) into {}",
                packages.len(),
                settings.output_dir.display()
            );

            let mut converter = ContentPackageConverter::from_config(&settings)
                .context("Failed to set up the converter")?;
            converter
                .convert(&packages)
                .context("Content-package conversion failed")?;

            println!(
                "Converted {} content-package(s), feature models written to {}",
                packages.len(),
                settings.output_dir.display()
            );
            Ok(())
        }
    }
}
