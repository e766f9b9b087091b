//! # Powder CLI (`powder`)
//!
//! Reads chronograph exports and prints the series they contain.
//!
//! ## Usage
//!
//! ```bash
//! powder --config ./config/powder.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `powder extract <vendor> <path>` | Decode a vendor export |
//! | `powder manual <path\|->` | Build a series from typed velocities |
//! | `powder vendors` | List supported vendors and their inputs |
//!
//! Results go to stdout; logs go to stderr (`RUST_LOG` or `-v`).

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use powder_core::{manual, VelocityUnit};
use powder_ingest::config::{self, Config};
use powder_ingest::ingest::{self, Vendor};
use powder_ingest::output::{self, OutputFormat};
use powder_ingest::vendors;

/// Powder: chronograph export importer.
#[derive(Parser)]
#[command(
    name = "powder",
    about = "Import shot velocities from chronograph exports",
    version,
    long_about = "Decodes exports from LabRadar, MagnetoSpeed, ProChrono, Garmin and \
    ShotMarker chronographs into series of muzzle velocities, printed as a table or JSON."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/powder.toml`. A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/powder.toml")]
    config: PathBuf,

    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a vendor export.
    ///
    /// LabRadar accepts a device directory or a single report; Garmin
    /// accepts `.xlsx` or `.csv`; ShotMarker accepts a `.tar` bundle.
    Extract {
        vendor: Vendor,
        path: PathBuf,

        /// Output format. Defaults to `[output] format`, then to human on a
        /// terminal and JSON otherwise.
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Build one series from velocities typed one per line.
    ///
    /// Reads from `path`, or stdin when `path` is `-`.
    Manual {
        path: PathBuf,

        /// Velocity unit of the entered values (`fps` or `mps`).
        #[arg(long, default_value = "fps")]
        units: VelocityUnit,

        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// List supported vendors.
    Vendors,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "powder_ingest=debug,powder_core=debug"
    } else {
        "powder_ingest=info,powder_core=warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn resolve_format(flag: Option<OutputFormat>, cfg: &Config) -> OutputFormat {
    flag.or(cfg.output.format)
        .unwrap_or_else(OutputFormat::default_for_tty)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Vendors = cli.command {
        vendors::list_vendors(&mut std::io::stdout().lock())?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Extract {
            vendor,
            path,
            format,
        } => {
            let mut series = ingest::extract(vendor, &path, &cfg)?;
            if series.is_empty() {
                bail!("Unable to find {} data in '{}'", vendor, path.display());
            }
            let source = path.display().to_string();
            output::render(
                &mut stdout,
                resolve_format(format, &cfg),
                vendor.display_name(),
                &source,
                &mut series,
            )?;
        }
        Commands::Manual {
            path,
            units,
            format,
        } => {
            let text = if path.as_os_str() == "-" {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read velocities from stdin")?;
                buf
            } else {
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?
            };
            let Some(series) = manual::series_from_text(&text, units) else {
                bail!("No valid velocities entered");
            };
            output::render(
                &mut stdout,
                resolve_format(format, &cfg),
                "Manual",
                &path.display().to_string(),
                &mut [series],
            )?;
        }
        Commands::Vendors => {}
    }

    Ok(())
}
