//! Canonical catalog identifiers.
//!
//! A uid is `oem::family::model` with spaces turned into underscores and
//! everything outside `[A-Za-z0-9_:]` removed. The same triple always yields
//! the same uid, whichever feed it came from.

pub const UID_SEPARATOR: &str = "::";

/// Build the canonical uid for an (oem, family, model) triple.
pub fn normalize(oem: &str, family: &str, model: &str) -> String {
    clean([oem, family, model].join(UID_SEPARATOR).as_str())
}

/// Apply the uid character rules to a single string.
///
/// Cleaning is per character, so `normalize(clean(a), clean(b), clean(c))`
/// equals `normalize(a, b, c)`.
pub fn clean(s: &str) -> String {
    s.chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == ':')
        .collect()
}
