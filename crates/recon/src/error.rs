use std::fmt;

/// Problems turning source content into candidate entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// Row has fewer columns than the active layout requires.
    MalformedRow { position: u64, expected: usize, found: usize },
    /// Markup element is missing a required attribute.
    MissingAttribute { position: u64, attribute: String },
    /// Explicit last-updated column is not MM/DD/YYYY.
    DateParse { position: u64, value: String },
    /// The underlying reader failed (CSV framing, malformed XML, IO).
    Source(String),
}

impl IngestError {
    /// Source row/element number, when the error belongs to one row.
    pub fn position(&self) -> Option<u64> {
        match self {
            Self::MalformedRow { position, .. }
            | Self::MissingAttribute { position, .. }
            | Self::DateParse { position, .. } => Some(*position),
            Self::Source(_) => None,
        }
    }

    /// Row-level errors are governed by the malformed-row policy.
    /// Source errors end the input and always abort.
    pub fn is_row_level(&self) -> bool {
        !matches!(self, Self::Source(_))
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRow { position, expected, found } => {
                write!(f, "row {position}: expected {expected} columns, found {found}")
            }
            Self::MissingAttribute { position, attribute } => {
                write!(f, "element {position}: missing attribute '{attribute}'")
            }
            Self::DateParse { position, value } => {
                write!(f, "row {position}: cannot parse date '{value}' (expected MM/DD/YYYY)")
            }
            Self::Source(msg) => write!(f, "source read error: {msg}"),
        }
    }
}

impl std::error::Error for IngestError {}

/// Failures talking to the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Transport failure (connect, timeout, TLS).
    Network(String),
    /// Non-success HTTP status with the response body.
    Http(u16, String),
    /// Response body could not be decoded.
    Parse(String),
}

impl CatalogError {
    /// Worth another attempt: transport failures, 5xx and 429.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http(code, _) => *code >= 500 || *code == 429,
            Self::Parse(_) => false,
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Http(code, body) if body.is_empty() => write!(f, "HTTP {code}"),
            Self::Http(code, body) => write!(f, "HTTP {code}: {body}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Run configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// TOML parse / deserialization error.
    Parse(String),
    /// Parsed but semantically invalid.
    Validation(String),
    /// Config file could not be read.
    Io(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
