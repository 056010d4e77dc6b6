//! Proxmox VE threshold guard
//!
//! Reads a list of VM thresholds, compares each VM's memory and storage
//! usage against them and adjusts memory allocations where needed.

mod config;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use guard_lib::{
    observability::init_tracing, ConfigLoader, ProxmoxClient, RecordSource, Reporter,
    RunLogger, RunOptions, Runner,
};
use tracing::info;

use output::LogFormat;

/// Proxmox VE memory and storage threshold guard
#[derive(Parser)]
#[command(name = "pve-guard")]
#[command(author, version, about = "Proxmox VE memory and storage threshold guard", long_about = None)]
pub struct Cli {
    /// Threshold file with `vmid,memory%,storage%` lines [default: item.csv next to the executable]
    #[arg(short = 'c', long = "csv", value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Env file overriding default.env next to the executable
    #[arg(short = 'e', long = "env", value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Shrink memory of VMs running below their threshold
    #[arg(short, long)]
    pub optimize: bool,

    /// Evaluate and report without changing any VM
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging on stderr
    #[arg(long, short)]
    pub verbose: bool,

    /// Log format on stderr
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Disable colored markers in the report
    #[arg(long)]
    pub no_color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format == LogFormat::Json);

    let proxmox = ConfigLoader::new()
        .default_file(config::default_env_path())
        .override_file(cli.env_file.clone())
        .load()
        .context("Failed to load configuration")?;
    info!(config = ?proxmox, "Configuration loaded");

    let input = config::input_path(cli.input.clone());
    let source = RecordSource::open(&input).context("Failed to open threshold file")?;

    let client = ProxmoxClient::new(&proxmox).context("Failed to create HTTP client")?;

    let logger = RunLogger::new(&proxmox.node);
    logger.log_run_started(&source.path().display().to_string(), cli.optimize, cli.dry_run);

    let options = RunOptions {
        optimize: cli.optimize,
        dry_run: cli.dry_run,
    };
    let reporter = Reporter::new(std::io::stdout().lock(), output::color_enabled(cli.no_color));
    let mut runner = Runner::new(client, reporter, options, logger);

    runner.run(source.entries()).await?;

    Ok(())
}
