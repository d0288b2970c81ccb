use std::thread;
use std::time::Duration;

use crate::client::CatalogClient;
use crate::config::{MalformedPolicy, RetryConfig, RunConfig};
use crate::error::{CatalogError, IngestError};
use crate::merge::decide;
use crate::model::{
    CatalogEntity, Decision, OutcomeKind, RawRow, RemoteStage, RowOutcome, RunMeta, RunReport,
    SkipReason,
};
use crate::summary::compute_summary;
use crate::synth::{row_uid, synthesize, SynthesisContext};

/// Drives lookup → decide → write for one candidate at a time.
pub struct MergeEngine<C> {
    client: C,
    retry: RetryConfig,
}

struct Failure {
    stage: RemoteStage,
    error: CatalogError,
    payload: CatalogEntity,
}

impl<C: CatalogClient> MergeEngine<C> {
    pub fn new(client: C, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Reconcile one candidate. Never fails: remote errors come back as a
    /// `Failed` outcome once retries (if any) are used up.
    pub fn reconcile(&self, position: u64, candidate: CatalogEntity) -> RowOutcome {
        let uid = candidate.uid.clone();
        let mut attempt = 0;

        let kind = loop {
            match self.attempt(&candidate) {
                Ok(kind) => break kind,
                Err(failure) => {
                    if attempt < self.retry.max_retries && failure.error.is_transient() {
                        attempt += 1;
                        log::warn!(
                            "{uid}: {} failed ({}), retry {attempt}/{}",
                            failure.stage,
                            failure.error,
                            self.retry.max_retries
                        );
                        if self.retry.backoff_ms > 0 {
                            thread::sleep(Duration::from_millis(self.retry.backoff_ms));
                        }
                        continue;
                    }

                    log::warn!(
                        "{uid}: {} failed: {}; payload {}",
                        failure.stage,
                        failure.error,
                        serde_json::to_string(&failure.payload).unwrap_or_default()
                    );
                    break OutcomeKind::Failed {
                        stage: failure.stage,
                        error: failure.error.to_string(),
                        payload: Some(failure.payload),
                    };
                }
            }
        };

        RowOutcome {
            position,
            uid: Some(uid),
            kind,
        }
    }

    // Each attempt starts from a fresh lookup, so a retried update merges
    // against whatever the catalog holds now.
    fn attempt(&self, candidate: &CatalogEntity) -> Result<OutcomeKind, Failure> {
        let lookup = self
            .client
            .lookup_by_uid(&candidate.uid)
            .map_err(|error| Failure {
                stage: RemoteStage::Lookup,
                error,
                payload: candidate.clone(),
            })?;

        match decide(candidate.clone(), lookup) {
            Decision::Create(entity) => {
                log::debug!("{}: not in catalog, creating", entity.uid);
                let id = self.client.create(&entity).map_err(|error| Failure {
                    stage: RemoteStage::Create,
                    error,
                    payload: entity.clone(),
                })?;
                Ok(OutcomeKind::Created {
                    id,
                    releases: entity.supported_releases,
                })
            }
            Decision::Update { id, entity } => {
                log::debug!("{}: merging into id {id}", entity.uid);
                self.client.update(id, &entity).map_err(|error| Failure {
                    stage: RemoteStage::Update,
                    error,
                    payload: entity.clone(),
                })?;
                Ok(OutcomeKind::Updated {
                    id,
                    releases: entity.supported_releases,
                })
            }
            Decision::Conflict { uid, matches } => {
                log::warn!("{uid}: {} catalog records share this uid, skipping", matches.len());
                Ok(OutcomeKind::Skipped {
                    reason: SkipReason::Ambiguous { matches },
                })
            }
        }
    }
}

/// Process every row of a source against the catalog.
///
/// Rows are handled strictly in order; a row's writes finish before the
/// next row is pulled from `rows`. Each outcome is handed to `on_outcome`
/// as soon as it exists and also collected into the report.
pub fn run<I, C>(
    rows: I,
    ctx: &SynthesisContext,
    client: C,
    config: &RunConfig,
    source: &str,
    mut on_outcome: impl FnMut(&RowOutcome),
) -> RunReport
where
    I: IntoIterator<Item = Result<RawRow, IngestError>>,
    C: CatalogClient,
{
    let engine = MergeEngine::new(client, config.retry.clone());
    let policy = config.ingest.on_malformed;

    let mut outcomes: Vec<RowOutcome> = Vec::new();
    let mut rows_read = 0;
    let mut aborted = None;

    let mut emit = |outcome: RowOutcome| {
        on_outcome(&outcome);
        outcomes.push(outcome);
    };

    for item in rows {
        let step = item.and_then(|raw| {
            let candidates = synthesize(&raw, ctx)?;
            Ok((raw, candidates))
        });

        let (raw, candidates) = match step {
            Ok(ok) => ok,
            Err(e) if e.is_row_level() && policy == MalformedPolicy::Skip => {
                rows_read += 1;
                log::warn!("skipping malformed input: {e}");
                emit(RowOutcome {
                    position: e.position().unwrap_or_default(),
                    uid: None,
                    kind: OutcomeKind::Skipped {
                        reason: SkipReason::Malformed { error: e.to_string() },
                    },
                });
                continue;
            }
            Err(e) => {
                if e.is_row_level() {
                    rows_read += 1;
                }
                log::error!("aborting run: {e}");
                aborted = Some(e.to_string());
                break;
            }
        };
        rows_read += 1;

        if candidates.is_empty() {
            let uid = row_uid(&raw, ctx);
            log::info!("{uid}: no supported release flagged, skipping");
            emit(RowOutcome {
                position: raw.position,
                uid: Some(uid),
                kind: OutcomeKind::Skipped {
                    reason: SkipReason::NoSupportedRelease,
                },
            });
            continue;
        }

        for candidate in candidates {
            emit(engine.reconcile(raw.position, candidate));
        }
    }

    let summary = compute_summary(rows_read, &outcomes);
    log::info!(
        "{source}: {} rows, {} created, {} updated, {} skipped, {} failed",
        summary.rows_read,
        summary.created,
        summary.updated,
        summary.conflicts + summary.malformed + summary.no_release,
        summary.failed
    );

    RunReport {
        meta: RunMeta {
            source: source.to_string(),
            oem: ctx.oem.clone(),
            inferred_release: ctx.inferred_release.label().to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        outcomes,
        aborted,
    }
}
