use std::collections::BTreeMap;

use crate::model::{OutcomeKind, RowOutcome, RunSummary, SkipReason};

/// Count outcomes by kind.
pub fn compute_summary(rows_read: usize, outcomes: &[RowOutcome]) -> RunSummary {
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut summary = RunSummary {
        rows_read,
        ..RunSummary::default()
    };

    for o in outcomes {
        *outcome_counts.entry(o.kind.name().to_string()).or_insert(0) += 1;

        match &o.kind {
            OutcomeKind::Created { .. } => summary.created += 1,
            OutcomeKind::Updated { .. } => summary.updated += 1,
            OutcomeKind::Failed { .. } => summary.failed += 1,
            OutcomeKind::Skipped { reason } => match reason {
                SkipReason::Ambiguous { .. } => summary.conflicts += 1,
                SkipReason::Malformed { .. } => summary.malformed += 1,
                SkipReason::NoSupportedRelease => summary.no_release += 1,
            },
        }

        let from_candidate = match &o.kind {
            OutcomeKind::Skipped { reason } => matches!(reason, SkipReason::Ambiguous { .. }),
            _ => true,
        };
        if from_candidate {
            summary.candidates += 1;
        }
    }

    summary.outcome_counts = outcome_counts;
    summary
}
