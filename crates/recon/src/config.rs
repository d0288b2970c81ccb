use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration, read from `config.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub markup: MarkupConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ingest
// ---------------------------------------------------------------------------

/// What to do with a row that fails column-count or date checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Record the row as skipped and keep going.
    #[default]
    Skip,
    /// Stop the run at the first bad row.
    Abort,
}

impl std::fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// Column layout of a delimited feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelimitedLayout {
    /// Pick from the first record's column count.
    #[default]
    Auto,
    /// oem, family, model, win7, win8, win10, win11
    ReleaseFlags,
    /// family, model, last-updated (MM/DD/YYYY)
    Dated,
}

impl DelimitedLayout {
    /// Columns a row must have; `None` for `Auto` until resolved.
    pub fn required_columns(self) -> Option<usize> {
        match self {
            Self::Auto => None,
            Self::ReleaseFlags => Some(7),
            Self::Dated => Some(3),
        }
    }
}

impl std::fmt::Display for DelimitedLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::ReleaseFlags => write!(f, "release_flags"),
            Self::Dated => write!(f, "dated"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    #[serde(default)]
    pub on_malformed: MalformedPolicy,
    #[serde(default)]
    pub layout: DelimitedLayout,
}

// ---------------------------------------------------------------------------
// Markup feed schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkupConfig {
    #[serde(default = "default_element")]
    pub element: String,
    #[serde(default = "default_name_attr")]
    pub name_attr: String,
    #[serde(default = "default_builds_attr")]
    pub builds_attr: String,
    /// Markup feeds describe one platform vendor, so the family is fixed.
    #[serde(default = "default_family")]
    pub family: String,
}

fn default_element() -> String {
    "Model".into()
}

fn default_name_attr() -> String {
    "DisplayName".into()
}

fn default_builds_attr() -> String {
    "SupportedBuilds".into()
}

fn default_family() -> String {
    "Surface".into()
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            element: default_element(),
            name_attr: default_name_attr(),
            builds_attr: default_builds_attr(),
            family: default_family(),
        }
    }
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Bounded retry for failed remote calls. Off by default.
///
/// Every retry re-runs the lookup before writing again, so an update that
/// already landed is merged against fresh state instead of replayed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first call; a write is tried at most
    /// `max_retries + 1` times.
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_backoff_ms() -> u64 {
    500
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: default_backoff_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.catalog.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "catalog.endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }

        if self.catalog.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "catalog.timeout_secs must be greater than 0".into(),
            ));
        }

        let markup = &self.markup;
        for (key, value) in [
            ("markup.element", &markup.element),
            ("markup.name_attr", &markup.name_attr),
            ("markup.builds_attr", &markup.builds_attr),
            ("markup.family", &markup.family),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
