//! Human-readable rendering of run outcomes (stderr) and JSON output.

use std::collections::BTreeSet;
use std::path::Path;

use drivercore_recon::model::{OutcomeKind, RowOutcome, RunReport, SkipReason};

use crate::exit_codes::EXIT_RUNTIME;
use crate::CliError;

/// One line per outcome, as the run progresses.
pub fn outcome_line(outcome: &RowOutcome) -> String {
    let uid = outcome.uid.as_deref().unwrap_or("-");
    match &outcome.kind {
        OutcomeKind::Created { id, releases } => match id {
            Some(id) => format!("created  {uid} (id {id}) [{}]", join(releases)),
            None => format!("created  {uid} [{}]", join(releases)),
        },
        OutcomeKind::Updated { id, releases } => {
            format!("updated  {uid} (id {id}) [{}]", join(releases))
        }
        OutcomeKind::Skipped { reason } => match reason {
            SkipReason::Ambiguous { matches } => format!(
                "skipped  {uid}: {} catalog records share this uid (ids {})",
                matches.len(),
                matches.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(", ")
            ),
            SkipReason::Malformed { error } => format!("skipped  {error}"),
            SkipReason::NoSupportedRelease => {
                format!("skipped  {uid}: no supported release (row {})", outcome.position)
            }
        },
        OutcomeKind::Failed { stage, error, .. } => {
            format!("failed   {uid}: {stage} failed: {error}")
        }
    }
}

fn join(releases: &BTreeSet<String>) -> String {
    releases.iter().cloned().collect::<Vec<_>>().join(", ")
}

pub fn summary_line(report: &RunReport) -> String {
    let s = &report.summary;
    format!(
        "{}: {} rows, {} candidates: {} created, {} updated, {} duplicate uids, {} malformed, {} without release, {} failed",
        report.meta.source,
        s.rows_read,
        s.candidates,
        s.created,
        s.updated,
        s.conflicts,
        s.malformed,
        s.no_release,
        s.failed,
    )
}

/// Pretty JSON for `--json` / `--output`.
pub fn to_json(report: &RunReport) -> Result<String, CliError> {
    serde_json::to_string_pretty(report)
        .map_err(|e| CliError::new(EXIT_RUNTIME, format!("JSON serialization error: {e}")))
}

pub fn write_json(path: &Path, json: &str) -> Result<(), CliError> {
    std::fs::write(path, json).map_err(|e| {
        CliError::new(EXIT_RUNTIME, format!("cannot write {}: {e}", path.display()))
    })
}
