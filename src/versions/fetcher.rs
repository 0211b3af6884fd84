//! Concurrent retrieval of the five version feeds.
//!
//! One fetch per installation source, all in flight at once on scoped
//! threads. A feed that 404s, times out or fails to parse degrades to an
//! empty document with a warning; the fetch as a whole only fails when
//! every single source is unreachable at the transport level, which almost
//! always means there is no network at all.

use crate::libs::utilities::assets::{fetch_text, http_agent, FetchOutcome};
use crate::schemas::versions::{
    BinaryVersionRecord, ChocolateyVersionRecord, FeedDocument, GemfileVersionRecord,
    HomebrewVersionRecord, SnapVersionRecord,
};
use crate::{log_debug, log_error, log_warn};
use colored::Colorize;
use serde::de::DeserializeOwned;
use std::env;
use std::thread;

/// Where the feeds live unless overridden.
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/metanorma/versions/main";

/// Environment override for the feed location, mainly for tests and
/// air-gapped mirrors.
pub const BASE_URL_ENV: &str = "METANORMA_VERSIONS_BASE_URL";

/// Everything the five feeds said, one document per installation source.
#[derive(Debug, Clone, Default)]
pub struct PlatformVersionData {
    pub snap: FeedDocument<SnapVersionRecord>,
    pub gemfile: FeedDocument<GemfileVersionRecord>,
    pub homebrew: FeedDocument<HomebrewVersionRecord>,
    pub chocolatey: FeedDocument<ChocolateyVersionRecord>,
    pub binary: FeedDocument<BinaryVersionRecord>,
}

/// Fetches all five feeds concurrently.
///
/// Returns `None` only when every feed failed at the transport level;
/// individual feed failures surface as empty documents.
pub fn fetch_all() -> Option<PlatformVersionData> {
    let agent = http_agent();
    let base = base_url();
    log_debug!("[Versions] Fetching feeds from {}", base.blue());

    let (snap, gemfile, homebrew, chocolatey, binary) = thread::scope(|scope| {
        let snap = scope.spawn(|| fetch_feed::<SnapVersionRecord>(&agent, &base, "snap"));
        let gemfile = scope.spawn(|| fetch_feed::<GemfileVersionRecord>(&agent, &base, "gemfile"));
        let homebrew =
            scope.spawn(|| fetch_feed::<HomebrewVersionRecord>(&agent, &base, "homebrew"));
        let chocolatey =
            scope.spawn(|| fetch_feed::<ChocolateyVersionRecord>(&agent, &base, "chocolatey"));
        let binary = scope.spawn(|| fetch_feed::<BinaryVersionRecord>(&agent, &base, "binary"));
        (
            join_or_degraded(snap),
            join_or_degraded(gemfile),
            join_or_degraded(homebrew),
            join_or_degraded(chocolatey),
            join_or_degraded(binary),
        )
    });

    let all_unreachable = snap.transport_failed
        && gemfile.transport_failed
        && homebrew.transport_failed
        && chocolatey.transport_failed
        && binary.transport_failed;
    if all_unreachable {
        log_error!(
            "[Versions] Could not reach any version feed at {}. Proceeding without version metadata.",
            base.red()
        );
        return None;
    }

    Some(PlatformVersionData {
        snap: snap.doc,
        gemfile: gemfile.doc,
        homebrew: homebrew.doc,
        chocolatey: chocolatey.doc,
        binary: binary.doc,
    })
}

/// Feed base URL, honoring the environment override.
pub fn base_url() -> String {
    match env::var(BASE_URL_ENV) {
        Ok(custom) if !custom.trim().is_empty() => normalize_base(&custom),
        _ => DEFAULT_BASE_URL.to_string(),
    }
}

pub(crate) fn normalize_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

struct FeedFetch<R> {
    doc: FeedDocument<R>,
    transport_failed: bool,
}

impl<R> FeedFetch<R> {
    fn degraded(transport_failed: bool) -> Self {
        FeedFetch {
            doc: FeedDocument::default(),
            transport_failed,
        }
    }
}

fn fetch_feed<R: DeserializeOwned>(
    agent: &ureq::Agent,
    base: &str,
    source: &str,
) -> FeedFetch<R> {
    let url = format!("{base}/{source}/versions.yaml");
    match fetch_text(agent, &url) {
        FetchOutcome::Body(body) => match serde_yaml::from_str::<FeedDocument<R>>(&body) {
            Ok(doc) => {
                log_debug!(
                    "[Versions] {} feed: {} records, latest '{}'",
                    source.cyan(),
                    doc.versions.len(),
                    doc.metadata.latest_version
                );
                FeedFetch {
                    doc,
                    transport_failed: false,
                }
            }
            Err(err) => {
                log_warn!(
                    "[Versions] {} feed did not parse ({}). Treating source as unavailable.",
                    source.yellow(),
                    err
                );
                FeedFetch::degraded(false)
            }
        },
        FetchOutcome::Status(code) => {
            log_warn!(
                "[Versions] {} feed answered HTTP {}. Treating source as unavailable.",
                source.yellow(),
                code
            );
            FeedFetch::degraded(false)
        }
        FetchOutcome::Transport(reason) => {
            log_warn!(
                "[Versions] {} feed unreachable: {}",
                source.yellow(),
                reason
            );
            FeedFetch::degraded(true)
        }
    }
}

fn join_or_degraded<R>(handle: thread::ScopedJoinHandle<'_, FeedFetch<R>>) -> FeedFetch<R> {
    handle
        .join()
        .unwrap_or_else(|_| FeedFetch::degraded(true))
}
