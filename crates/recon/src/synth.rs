use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::IngestError;
use crate::identity::normalize;
use crate::model::{CatalogEntity, RawRow, ReleaseSource};
use crate::release::Release;

/// Format of the explicit last-updated column.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Per-run defaults the synthesizer falls back on.
#[derive(Debug, Clone)]
pub struct SynthesisContext {
    /// Oem for rows whose layout has no oem column.
    pub oem: String,
    /// Release hinted by the source path.
    pub inferred_release: Release,
    /// Fixed processing time; `None` means "now" at synthesis.
    pub processed_at: Option<DateTime<Utc>>,
}

impl SynthesisContext {
    pub fn new(oem: impl Into<String>, source_path: &Path) -> Self {
        Self {
            oem: oem.into(),
            inferred_release: Release::infer_from_path(source_path),
            processed_at: None,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.processed_at.unwrap_or_else(Utc::now)
    }
}

/// Turn one raw row into candidate entities.
///
/// Flag rows produce one candidate per release marked "Yes" (possibly
/// none). Every other row produces exactly one candidate.
pub fn synthesize(raw: &RawRow, ctx: &SynthesisContext) -> Result<Vec<CatalogEntity>, IngestError> {
    let oem = resolve_oem(raw, ctx);

    let last_updated = match raw.updated.as_deref() {
        Some(value) => parse_updated(raw.position, value)?,
        None => ctx.now(),
    };

    let base = CatalogEntity {
        id: 0,
        uid: normalize(oem, &raw.family, &raw.model),
        oem: oem.to_string(),
        family: raw.family.clone(),
        model: raw.model.clone(),
        last_updated,
        supported_releases: BTreeSet::new(),
    };

    let release_sets: Vec<BTreeSet<String>> = match &raw.releases {
        ReleaseSource::Flags(flags) => flags
            .iter()
            .filter(|(_, value)| is_yes(value))
            .map(|(release, _)| BTreeSet::from([release.label().to_string()]))
            .collect(),
        ReleaseSource::Builds(builds) => {
            let mapped: BTreeSet<String> = builds
                .iter()
                .filter_map(|b| Release::from_build(b))
                .map(|r| r.label().to_string())
                .collect();
            if mapped.is_empty() {
                log::debug!(
                    "row {}: no known release in builds {:?}, using {}",
                    raw.position,
                    builds,
                    ctx.inferred_release
                );
                vec![BTreeSet::from([ctx.inferred_release.label().to_string()])]
            } else {
                vec![mapped]
            }
        }
        ReleaseSource::Inferred => vec![BTreeSet::from([ctx.inferred_release.label().to_string()])],
    };

    Ok(release_sets
        .into_iter()
        .map(|supported_releases| CatalogEntity {
            supported_releases,
            ..base.clone()
        })
        .collect())
}

/// The row's own oem when it has a non-blank one, else the run's.
pub fn resolve_oem<'a>(raw: &'a RawRow, ctx: &'a SynthesisContext) -> &'a str {
    raw.oem
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&ctx.oem)
}

/// Uid a row's candidates will carry.
pub fn row_uid(raw: &RawRow, ctx: &SynthesisContext) -> String {
    normalize(resolve_oem(raw, ctx), &raw.family, &raw.model)
}

/// Parse an MM/DD/YYYY column as midnight UTC.
pub fn parse_updated(position: u64, value: &str) -> Result<DateTime<Utc>, IngestError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| IngestError::DateParse {
            position,
            value: value.to_string(),
        })
}

fn is_yes(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}
