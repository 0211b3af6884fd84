//! Aggregated view over every version feed for one run.
//!
//! Fetched at most once per invocation, after the idempotency check has
//! decided an install is actually happening, and passed by reference to
//! whichever strategy runs. There is deliberately no global cache: a CI
//! step lives for seconds, so "once per process" and "once per run" are
//! the same thing, and threading the store explicitly keeps every consumer
//! honest about whether it can cope with the degraded `None` case.

use crate::log_info;
use crate::schemas::versions::{
    BinaryVersionRecord, ChocolateyVersionRecord, GemfileVersionRecord, HomebrewVersionRecord,
    SnapVersionRecord,
};
use crate::versions::fetcher::{self, PlatformVersionData};
use crate::versions::provider::VersionProvider;
use colored::Colorize;

pub struct VersionStore {
    snap: VersionProvider<SnapVersionRecord>,
    gemfile: VersionProvider<GemfileVersionRecord>,
    homebrew: VersionProvider<HomebrewVersionRecord>,
    chocolatey: VersionProvider<ChocolateyVersionRecord>,
    binary: VersionProvider<BinaryVersionRecord>,
}

impl VersionStore {
    /// Fetches the feeds and builds providers over them.
    ///
    /// `None` means no feed was reachable at all; callers continue in
    /// degraded mode (no revision pinning, no availability validation).
    pub fn initialize() -> Option<VersionStore> {
        let store = fetcher::fetch_all().map(VersionStore::from_data)?;
        log_info!(
            "[Versions] Metadata loaded (snap: {}, gemfile: {}, homebrew: {}, chocolatey: {}, binary: {})",
            store.snap.record_count().to_string().cyan(),
            store.gemfile.record_count().to_string().cyan(),
            store.homebrew.record_count().to_string().cyan(),
            store.chocolatey.record_count().to_string().cyan(),
            store.binary.record_count().to_string().cyan()
        );
        Some(store)
    }

    /// Builds a store from already-parsed feed data. This is the seam the
    /// tests use to exercise consumers without any network.
    pub fn from_data(data: PlatformVersionData) -> VersionStore {
        VersionStore {
            snap: VersionProvider::new(data.snap),
            gemfile: VersionProvider::new(data.gemfile),
            homebrew: VersionProvider::new(data.homebrew),
            chocolatey: VersionProvider::new(data.chocolatey),
            binary: VersionProvider::new(data.binary),
        }
    }

    pub fn snap(&self) -> &VersionProvider<SnapVersionRecord> {
        &self.snap
    }

    pub fn gemfile(&self) -> &VersionProvider<GemfileVersionRecord> {
        &self.gemfile
    }

    pub fn homebrew(&self) -> &VersionProvider<HomebrewVersionRecord> {
        &self.homebrew
    }

    pub fn chocolatey(&self) -> &VersionProvider<ChocolateyVersionRecord> {
        &self.chocolatey
    }

    pub fn binary(&self) -> &VersionProvider<BinaryVersionRecord> {
        &self.binary
    }
}
