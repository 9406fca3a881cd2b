//! ldapsync: keep the student directory in step with the student records.
//!
//! # Usage
//!
//! ```text
//! ldapsync [--config <file>] new       # create entries missing from the directory
//! ldapsync [--config <file>] update    # refresh entries whose content changed
//! ```
//!
//! Exit status is 0 on success, 2 when `update` refuses to run because
//! entries are missing, 1 on any fatal error. Log verbosity follows
//! `RUST_LOG` (default `info`).

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{new::NewArgs, update::UpdateArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "ldapsync",
    version,
    about = "Synchronise student records into the LDAP directory",
    long_about = None,
)]
struct Cli {
    /// Configuration file (default: ~/.ldapsync/config.yaml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a directory entry for every student that lacks one.
    New(NewArgs),

    /// Delete and recreate every entry whose record changed.
    Update(UpdateArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::New(args) => args.run(config),
        Commands::Update(args) => args.run(config),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
