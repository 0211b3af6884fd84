//! Wire format of the published version feeds.
//!
//! Each installation source (snap, gemfile, homebrew, chocolatey, binary)
//! has its own `versions.yaml` feed: a `metadata` block plus a `versions`
//! list whose record shape differs per source. Only the fields this tool
//! acts on are modeled; unknown keys in the feeds are ignored so upstream
//! can add fields without breaking older releases of this action.

use crate::schemas::settings::SnapChannel;
use serde::Deserialize;
use std::fmt;

/// Feed-level metadata common to every source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedMetadata {
    #[serde(default)]
    pub generated_at: Option<String>,
    /// Number of records the generator saw. Informational; the `versions`
    /// list is authoritative.
    #[serde(default)]
    pub count: u32,
    /// Version the generator considers newest.
    #[serde(default)]
    pub latest_version: String,
}

/// A parsed feed: shared metadata plus source-specific records.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedDocument<R> {
    #[serde(default)]
    pub metadata: FeedMetadata,
    #[serde(default = "Vec::new")]
    pub versions: Vec<R>,
}

// Hand-written so the degraded empty document exists for every record type
// without requiring R: Default.
impl<R> Default for FeedDocument<R> {
    fn default() -> Self {
        FeedDocument {
            metadata: FeedMetadata::default(),
            versions: Vec::new(),
        }
    }
}

/// Architecture labels snapd understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapArchitecture {
    #[default]
    Amd64,
    Arm64,
}

impl fmt::Display for SnapArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapArchitecture::Amd64 => write!(f, "amd64"),
            SnapArchitecture::Arm64 => write!(f, "arm64"),
        }
    }
}

/// Snap feed record. One entry per (version, architecture) pair; the same
/// version commonly appears once for amd64 and once for arm64 with
/// different store revisions.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapVersionRecord {
    pub version: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Store revision to pin with `--revision`.
    pub revision: u32,
    #[serde(default)]
    pub channel: SnapChannel,
    #[serde(default)]
    pub architecture: SnapArchitecture,
}

/// Gemfile feed record.
#[derive(Debug, Clone, Deserialize)]
pub struct GemfileVersionRecord {
    pub version: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Whether the generator saw a pre-built Gemfile for this version.
    /// Informational only; availability is probed by fetching.
    #[serde(default)]
    pub gemfile_exists: bool,
}

/// Homebrew feed record.
#[derive(Debug, Clone, Deserialize)]
pub struct HomebrewVersionRecord {
    pub version: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub tag_name: Option<String>,
}

/// Chocolatey feed record.
#[derive(Debug, Clone, Deserialize)]
pub struct ChocolateyVersionRecord {
    pub version: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_pre_release: bool,
}

/// Binary release feed record, listing the downloadable artifacts for one
/// release.
#[derive(Debug, Clone, Deserialize)]
pub struct BinaryVersionRecord {
    pub version: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default = "Vec::new")]
    pub platforms: Vec<PlatformArtifact>,
}

/// One downloadable artifact of a binary release.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformArtifact {
    pub os: String,
    pub arch: String,
    pub format: ArtifactFormat,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
    /// Libc or packaging variant, e.g. `musl` for Alpine-compatible builds.
    #[serde(default)]
    pub variant: Option<String>,
}

/// Packaging of a binary artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Tgz,
    Zip,
    Exe,
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactFormat::Tgz => write!(f, "tgz"),
            ArtifactFormat::Zip => write!(f, "zip"),
            ArtifactFormat::Exe => write!(f, "exe"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_feed_parses_per_arch_records() {
        let yaml = r#"
metadata:
  generated_at: "2024-05-01T00:00:00Z"
  count: 2
  latest_version: "1.13.9"
versions:
  - version: "1.13.9"
    published_at: "2024-04-30T12:00:00Z"
    revision: 276
    channel: stable
    architecture: amd64
  - version: "1.13.9"
    revision: 277
    channel: stable
    architecture: arm64
"#;
        let doc: FeedDocument<SnapVersionRecord> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(doc.metadata.latest_version, "1.13.9");
        assert_eq!(doc.versions.len(), 2);
        assert_eq!(doc.versions[0].revision, 276);
        assert_eq!(doc.versions[1].architecture, SnapArchitecture::Arm64);
    }

    #[test]
    fn binary_feed_parses_artifacts_with_variants() {
        let yaml = r#"
metadata:
  count: 1
  latest_version: "1.13.9"
versions:
  - version: "1.13.9"
    tag_name: "v1.13.9"
    platforms:
      - os: linux
        arch: x86_64
        format: tgz
        filename: metanorma-linux-x86_64.tgz
        url: https://example.invalid/metanorma-linux-x86_64.tgz
        size: 123456
      - os: linux
        arch: x86_64
        format: tgz
        filename: metanorma-linux-musl-x86_64.tgz
        url: https://example.invalid/metanorma-linux-musl-x86_64.tgz
        variant: musl
      - os: windows
        arch: x86_64
        format: exe
        filename: metanorma.exe
        url: https://example.invalid/metanorma.exe
"#;
        let doc: FeedDocument<BinaryVersionRecord> = serde_yaml::from_str(yaml).unwrap();
        let record = &doc.versions[0];
        assert_eq!(record.platforms.len(), 3);
        assert_eq!(record.platforms[1].variant.as_deref(), Some("musl"));
        assert_eq!(record.platforms[2].format, ArtifactFormat::Exe);
    }

    #[test]
    fn missing_metadata_block_defaults_to_empty() {
        let yaml = "versions: []\n";
        let doc: FeedDocument<GemfileVersionRecord> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(doc.metadata.count, 0);
        assert!(doc.metadata.latest_version.is_empty());
        assert!(doc.versions.is_empty());
    }

    #[test]
    fn unknown_feed_keys_are_ignored() {
        let yaml = r#"
metadata:
  count: 1
  latest_version: "1.2.3"
  brand_new_field: true
versions:
  - version: "1.2.3"
    gemfile_exists: true
    another_new_field: "yes"
"#;
        let doc: FeedDocument<GemfileVersionRecord> = serde_yaml::from_str(yaml).unwrap();
        assert!(doc.versions[0].gemfile_exists);
    }
}
