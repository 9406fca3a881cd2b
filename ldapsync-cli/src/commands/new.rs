//! `ldapsync new`: create the entries the directory lacks.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Args;
use ldapsync_sync::driver::{Pass, PassOutcome};

use super::{print_report, run_pass};

/// Arguments for `ldapsync new`.
#[derive(Args, Debug)]
pub struct NewArgs {}

impl NewArgs {
    pub fn run(self, config: Option<&Path>) -> Result<ExitCode> {
        match run_pass(config, Pass::New)? {
            PassOutcome::Done(report) => {
                print_report(&report);
                Ok(ExitCode::SUCCESS)
            }
            PassOutcome::Aborted { missing } => {
                bail!("new pass aborted with {} missing entries", missing.len())
            }
        }
    }
}
