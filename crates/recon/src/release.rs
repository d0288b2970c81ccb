use std::fmt;
use std::path::Path;

use serde::Serialize;

/// Operating-system releases the catalog tracks, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Release {
    #[serde(rename = "Windows 7")]
    Win7,
    #[serde(rename = "Windows 8")]
    Win8,
    #[serde(rename = "Windows 10")]
    Win10,
    #[serde(rename = "Windows 11")]
    Win11,
}

impl Release {
    pub const ALL: [Release; 4] = [Release::Win7, Release::Win8, Release::Win10, Release::Win11];

    /// Used when nothing in the source names a release.
    pub const NEWEST: Release = Release::Win11;

    /// Path hints are checked in this order; first substring hit wins.
    const HINT_ORDER: [Release; 4] = [Release::Win10, Release::Win11, Release::Win8, Release::Win7];

    /// Catalog label, e.g. "Windows 10".
    pub fn label(self) -> &'static str {
        match self {
            Self::Win7 => "Windows 7",
            Self::Win8 => "Windows 8",
            Self::Win10 => "Windows 10",
            Self::Win11 => "Windows 11",
        }
    }

    /// Token looked for in file names, e.g. "win10".
    pub fn hint_token(self) -> &'static str {
        match self {
            Self::Win7 => "win7",
            Self::Win8 => "win8",
            Self::Win10 => "win10",
            Self::Win11 => "win11",
        }
    }

    pub fn from_label(label: &str) -> Option<Release> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.label().eq_ignore_ascii_case(label) || r.hint_token().eq_ignore_ascii_case(label))
    }

    /// Infer the release a single-release feed describes from its path.
    ///
    /// `hp-win10-models.csv` → Windows 10. No hint → [`Release::NEWEST`].
    pub fn infer_from_path(path: &Path) -> Release {
        let lowered = path.to_string_lossy().to_ascii_lowercase();
        Self::HINT_ORDER
            .into_iter()
            .find(|r| lowered.contains(r.hint_token()))
            .unwrap_or(Self::NEWEST)
    }

    /// Map a supported-build token to a release.
    ///
    /// Accepts a release name ("Windows 11", "win10"), a full build
    /// ("10.0.22631", "10.0.19045.3803") or a bare build number ("19044").
    /// Feature-update names like "22H2" are ambiguous and map to nothing.
    pub fn from_build(token: &str) -> Option<Release> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        if let Some(release) = Self::from_label(token) {
            return Some(release);
        }

        let parts: Vec<&str> = token.split('.').collect();
        let build = if parts.len() >= 3 { parts[2] } else { parts[0] };
        let build: u32 = build.parse().ok()?;

        match build {
            22000.. => Some(Self::Win11),
            10240..=21999 => Some(Self::Win10),
            9200..=9600 => Some(Self::Win8),
            7600..=7601 => Some(Self::Win7),
            _ => None,
        }
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
