use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::release::Release;

// ---------------------------------------------------------------------------
// Catalog entity
// ---------------------------------------------------------------------------

/// One device model's OS-support record, as stored by the remote catalog.
///
/// Field names follow the catalog's JSON contract (`make` is the family,
/// `supportedWinRelease` the release set). PascalCase aliases are accepted
/// on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntity {
    /// Remote-assigned; `0` until created.
    #[serde(default, alias = "Id")]
    pub id: i64,
    #[serde(default, alias = "UID", alias = "Uid", deserialize_with = "null_as_default")]
    pub uid: String,
    #[serde(default, alias = "Oem", deserialize_with = "null_as_default")]
    pub oem: String,
    #[serde(rename = "make", default, alias = "Make", deserialize_with = "null_as_default")]
    pub family: String,
    #[serde(default, alias = "Model", deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(default, alias = "LastUpdated", with = "timestamp")]
    pub last_updated: DateTime<Utc>,
    #[serde(
        rename = "supportedWinRelease",
        default,
        alias = "SupportedWinRelease",
        deserialize_with = "null_as_default"
    )]
    pub supported_releases: BTreeSet<String>,
}

impl CatalogEntity {
    pub fn has_release(&self, release: Release) -> bool {
        self.supported_releases.contains(release.label())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `lastUpdated` wire format: RFC 3339 out; RFC 3339 or a naive ISO
/// date-time (taken as UTC) in.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

// ---------------------------------------------------------------------------
// Source rows
// ---------------------------------------------------------------------------

/// Where a row's supported releases come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseSource {
    /// Per-release yes/no columns, raw cell text.
    Flags(Vec<(Release, String)>),
    /// Supported-build identifiers from a markup feed.
    Builds(Vec<String>),
    /// Nothing in the row; use the release inferred from the file path.
    Inferred,
}

/// Format-independent row produced by a source adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based record (delimited) or element (markup) number.
    pub position: u64,
    /// Present only when the layout carries an oem column.
    pub oem: Option<String>,
    pub family: String,
    pub model: String,
    pub releases: ReleaseSource,
    /// Raw last-updated text, when the layout has a date column.
    pub updated: Option<String>,
}

// ---------------------------------------------------------------------------
// Lookup + decision
// ---------------------------------------------------------------------------

/// Result of looking a uid up in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    NotFound,
    FoundOne(CatalogEntity),
    FoundMany(Vec<CatalogEntity>),
}

impl Lookup {
    pub fn from_matches(mut matches: Vec<CatalogEntity>) -> Self {
        match matches.len() {
            0 => Self::NotFound,
            1 => Self::FoundOne(matches.remove(0)),
            _ => Self::FoundMany(matches),
        }
    }
}

/// What the merge engine will do with one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Create(CatalogEntity),
    Update { id: i64, entity: CatalogEntity },
    Conflict { uid: String, matches: Vec<i64> },
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStage {
    Lookup,
    Create,
    Update,
}

impl std::fmt::Display for RemoteStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lookup => write!(f, "lookup"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The catalog holds more than one record for the uid.
    Ambiguous { matches: Vec<i64> },
    /// Row-level ingest error under the `skip` policy.
    Malformed { error: String },
    /// Flag row with no "Yes" in any release column.
    NoSupportedRelease,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OutcomeKind {
    Created {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<i64>,
        releases: BTreeSet<String>,
    },
    Updated {
        id: i64,
        releases: BTreeSet<String>,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        stage: RemoteStage,
        error: String,
        /// The entity that was being written, for manual replay.
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<CatalogEntity>,
    },
}

impl OutcomeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Data-only result of processing one candidate (or one bad row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOutcome {
    pub position: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(flatten)]
    pub kind: OutcomeKind,
}

// ---------------------------------------------------------------------------
// Summary + report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Data rows read from the source (including malformed ones).
    pub rows_read: usize,
    /// Entities synthesized from well-formed rows.
    pub candidates: usize,
    pub created: usize,
    pub updated: usize,
    pub conflicts: usize,
    pub malformed: usize,
    pub no_release: usize,
    pub failed: usize,
    pub outcome_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub source: String,
    pub oem: String,
    pub inferred_release: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub meta: RunMeta,
    pub summary: RunSummary,
    pub outcomes: Vec<RowOutcome>,
    /// Set when the run stopped before the end of the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}
