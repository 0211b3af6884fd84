//! Typed access to one parsed version feed.
//!
//! A provider wraps a [`FeedDocument`] and answers the questions the
//! installation strategies ask: is this version available, what does
//! "latest" mean right now, which snap revision backs a version on this
//! architecture, which artifact fits this machine.

use crate::libs::utilities::platform::{arch_matches, os_matches};
use crate::schemas::versions::{
    BinaryVersionRecord, ChocolateyVersionRecord, FeedDocument, GemfileVersionRecord,
    HomebrewVersionRecord, PlatformArtifact, SnapArchitecture, SnapVersionRecord,
};
use std::collections::HashSet;

/// A feed record that knows which version it describes.
pub trait Versioned {
    fn version(&self) -> &str;
}

impl Versioned for SnapVersionRecord {
    fn version(&self) -> &str {
        &self.version
    }
}

impl Versioned for GemfileVersionRecord {
    fn version(&self) -> &str {
        &self.version
    }
}

impl Versioned for HomebrewVersionRecord {
    fn version(&self) -> &str {
        &self.version
    }
}

impl Versioned for ChocolateyVersionRecord {
    fn version(&self) -> &str {
        &self.version
    }
}

impl Versioned for BinaryVersionRecord {
    fn version(&self) -> &str {
        &self.version
    }
}

/// Query interface over a single feed.
///
/// Records keep feed order, which runs oldest to newest; feeds are
/// append-only files regenerated from release history.
#[derive(Debug, Clone)]
pub struct VersionProvider<R> {
    records: Vec<R>,
    latest: String,
}

impl<R: Versioned> VersionProvider<R> {
    pub fn new(doc: FeedDocument<R>) -> Self {
        // Trust the declared latest only when a record backs it, otherwise
        // fall back to the newest record present. Feeds occasionally declare
        // a version whose record was filtered out upstream.
        let declared = doc.metadata.latest_version;
        let latest = if !declared.is_empty()
            && doc.versions.iter().any(|r| r.version() == declared)
        {
            declared
        } else {
            doc.versions
                .last()
                .map(|r| r.version().to_string())
                .unwrap_or_default()
        };
        VersionProvider {
            records: doc.versions,
            latest,
        }
    }

    /// All records in feed order.
    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The version "latest" resolves to, empty when the feed has no usable
    /// records.
    pub fn latest(&self) -> &str {
        &self.latest
    }

    /// Whether any record carries exactly this version.
    pub fn is_available(&self, version: &str) -> bool {
        self.records.iter().any(|r| r.version() == version)
    }

    /// First record for a version.
    pub fn get(&self, version: &str) -> Option<&R> {
        self.records.iter().find(|r| r.version() == version)
    }

    /// Distinct versions in feed order.
    pub fn available_versions(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.version())
            .filter(|v| seen.insert(*v))
            .collect()
    }

    /// Up to `limit` distinct versions, newest first. Used to suggest
    /// alternatives when a requested version does not exist.
    pub fn recent_versions(&self, limit: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .rev()
            .map(|r| r.version())
            .filter(|v| seen.insert(*v))
            .take(limit)
            .map(|v| v.to_string())
            .collect()
    }
}

impl VersionProvider<SnapVersionRecord> {
    /// Record pinning `version` on the given architecture. The same version
    /// maps to different store revisions per architecture, so both keys are
    /// required.
    pub fn revision_for(
        &self,
        version: &str,
        arch: SnapArchitecture,
    ) -> Option<&SnapVersionRecord> {
        self.records
            .iter()
            .find(|r| r.version == version && r.architecture == arch)
    }
}

impl VersionProvider<BinaryVersionRecord> {
    /// Picks the artifact that fits the current machine best.
    ///
    /// Three tiers, first hit wins:
    /// 1. OS, architecture and variant all match (variant `None` matches an
    ///    artifact without variant);
    /// 2. OS and architecture match on an artifact without variant;
    /// 3. any artifact for the OS.
    pub fn best_artifact(
        &self,
        version: &str,
        os: &str,
        arch: &str,
        variant: Option<&str>,
    ) -> Option<&PlatformArtifact> {
        let record = self.get(version)?;
        let artifacts = &record.platforms;

        if let Some(exact) = artifacts.iter().find(|a| {
            os_matches(&a.os, os) && arch_matches(&a.arch, arch) && a.variant.as_deref() == variant
        }) {
            return Some(exact);
        }
        if let Some(no_variant) = artifacts
            .iter()
            .find(|a| os_matches(&a.os, os) && arch_matches(&a.arch, arch) && a.variant.is_none())
        {
            return Some(no_variant);
        }
        artifacts.iter().find(|a| os_matches(&a.os, os))
    }
}
