// src/cli.rs
//! CLI definitions for cpconvert

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cpconvert")]
#[command(version)]
#[command(about = "Converts content packages into feature models with generated repoinit scripts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert content packages, ordered by their declared dependencies
    Convert {
        /// Content package files (tar or tar.gz)
        #[arg(required = true)]
        packages: Vec<PathBuf>,

        /// Directory receiving the feature model files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Local artifact repository for the converted packages
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// Reject entries whose path matches this regex (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Reject inputs that carry no vault properties
        #[arg(long)]
        strict: bool,

        /// TOML configuration file; command line options take precedence
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
