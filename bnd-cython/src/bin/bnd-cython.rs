//! CLI entry point for bnd-cython.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// Generate Cython bindings from C++ headers.
#[derive(Parser, Debug)]
#[command(name = "bnd-cython", version, about)]
struct Cli {
    /// Path to the bnd-cython.toml configuration file.
    #[arg(default_value = "bnd-cython.toml")]
    config: PathBuf,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Extension module name (overrides config).
    #[arg(short, long)]
    module: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bnd_cython=info")),
        )
        .init();

    let cli = Cli::parse();
    bnd_cython::run(&cli.config, cli.output.as_deref(), cli.module.as_deref())?;
    Ok(())
}
