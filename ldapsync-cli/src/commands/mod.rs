pub mod new;
pub mod update;

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use ldapsync_core::{config, Config};
use ldapsync_ldap::LdapDirectory;
use ldapsync_source::SqliteSource;
use ldapsync_sync::{
    driver::{self, Pass, PassOutcome, PassReport, RunOptions},
    WriteResult,
};

/// `--config` if given, else `~/.ldapsync/config.yaml`.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    config.context("could not load configuration")
}

/// Open both collaborators and run one pass against them.
pub(crate) fn run_pass(config_path: Option<&Path>, pass: Pass) -> Result<PassOutcome> {
    let config = load_config(config_path)?;

    let mut source = SqliteSource::open(&config.source).context("could not open record source")?;
    let mut directory =
        LdapDirectory::connect(&config.directory).context("could not reach the directory")?;

    let options = RunOptions {
        base_dn: config.directory.base_dn.clone(),
        staging_dir: config.staging.dir.clone(),
    };
    tracing::debug!(
        pass = %pass,
        database = %config.source.database.display(),
        url = %config.directory.url,
        "collaborators ready"
    );
    let outcome = driver::run(pass, &mut source, &mut directory, options)
        .with_context(|| format!("{pass} pass failed"));
    directory.close();

    match &outcome {
        Ok(PassOutcome::Aborted { missing }) => {
            tracing::warn!(pass = %pass, missing = missing.len(), "pass refused");
        }
        Err(err) => tracing::error!(pass = %pass, error = %err, "pass failed"),
        Ok(PassOutcome::Done(_)) => {}
    }
    outcome
}

pub(crate) fn print_report(report: &PassReport) {
    let failed = report.failed();
    if report.writes.is_empty() {
        println!(
            "{} {}: nothing to do ({} records, {} entries)",
            "✓".green().bold(),
            report.pass,
            report.source_records,
            report.directory_entries
        );
        return;
    }

    let mark = if failed == 0 {
        "✓".green().bold()
    } else {
        "!".yellow().bold()
    };
    println!(
        "{mark} {}: {} written, {} failed ({} records, {} entries)",
        report.pass,
        report.succeeded(),
        failed,
        report.source_records,
        report.directory_entries
    );

    for write in &report.writes {
        match write {
            WriteResult::Created { dn, .. } => println!("  +  {dn}"),
            WriteResult::Replaced { dn, .. } => println!("  ~  {dn}"),
            WriteResult::Failed {
                dn, code, message, ..
            } => {
                let code = code.map_or_else(|| "-".to_string(), |c| c.to_string());
                println!("  {}  {dn} (code {code}: {message})", "✗".red());
            }
        }
    }
}
