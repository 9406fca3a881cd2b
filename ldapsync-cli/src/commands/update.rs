//! `ldapsync update`: refresh entries whose source record changed.
//!
//! Refuses to touch the directory while any student lacks an entry; the
//! `new` pass has to close that gap first.

use std::collections::BTreeSet;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use ldapsync_core::IdentityKey;
use ldapsync_sync::driver::{Pass, PassOutcome};

use super::{print_report, run_pass};

/// Exit status when the pass is refused.
pub(crate) const EXIT_ABORTED: u8 = 2;

/// Arguments for `ldapsync update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {}

impl UpdateArgs {
    pub fn run(self, config: Option<&Path>) -> Result<ExitCode> {
        let outcome = run_pass(config, Pass::Update)?;
        match &outcome {
            PassOutcome::Done(report) => print_report(report),
            PassOutcome::Aborted { missing } => eprint!("{}", abort_message(missing)),
        }
        Ok(ExitCode::from(exit_status(&outcome)))
    }
}

/// Process exit status for a finished `update` pass.
pub(crate) fn exit_status(outcome: &PassOutcome) -> u8 {
    match outcome {
        PassOutcome::Done(_) => 0,
        PassOutcome::Aborted { .. } => EXIT_ABORTED,
    }
}

/// What the operator sees when `update` is refused.
pub(crate) fn abort_message(missing: &BTreeSet<IdentityKey>) -> String {
    let mut message = format!(
        "{} update aborted: {} students have no directory entry\n",
        "✗".red().bold(),
        missing.len()
    );
    for identity in missing {
        message.push_str(&format!("  ?  {identity}\n"));
    }
    message.push_str("Run `ldapsync new` first.\n");
    message
}

#[cfg(test)]
mod tests {
    use ldapsync_sync::driver::PassReport;

    use super::*;

    fn missing(ids: &[&str]) -> BTreeSet<IdentityKey> {
        ids.iter().map(|id| IdentityKey::from(*id)).collect()
    }

    #[test]
    fn aborted_update_exits_with_two() {
        let outcome = PassOutcome::Aborted {
            missing: missing(&["lovelace"]),
        };
        assert_eq!(exit_status(&outcome), 2);
    }

    #[test]
    fn finished_update_exits_with_zero() {
        let outcome = PassOutcome::Done(PassReport {
            pass: Pass::Update,
            source_records: 1,
            directory_entries: 1,
            writes: vec![],
        });
        assert_eq!(exit_status(&outcome), 0);
    }

    #[test]
    fn abort_message_lists_missing_and_points_to_new() {
        colored::control::set_override(false);
        let message = abort_message(&missing(&["hopper", "lovelace"]));

        assert!(message.contains("2 students have no directory entry"));
        assert!(message.contains("  ?  hopper\n"));
        assert!(message.contains("  ?  lovelace\n"));
        assert!(message.ends_with("Run `ldapsync new` first.\n"));
    }
}
