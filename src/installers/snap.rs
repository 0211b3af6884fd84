//! snapd strategy for Linux hosts.
//!
//! Exact versions install as revision pins: the snap store only serves
//! the newest revision per channel, so "install 1.13.9" really means
//! "install the store revision that carried 1.13.9 on this architecture,
//! then hold refreshes so snapd does not silently upgrade it away".

use crate::installers::InstallOutcome;
use crate::libs::utilities::command::run_checked;
use crate::libs::utilities::platform::snap_architecture;
use crate::schemas::errors::SetupError;
use crate::schemas::settings::{MetanormaSettings, SnapChannel};
use crate::schemas::versions::SnapArchitecture;
use crate::versions::store::VersionStore;
use crate::{log_info, log_warn};
use colored::Colorize;
use std::path::PathBuf;

const SNAP_PACKAGE: &str = "metanorma";
pub(crate) const SNAP_BIN_DIR: &str = "/snap/bin";

/// How many alternatives to list when a requested version does not exist.
const SUGGESTION_LIMIT: usize = 10;

/// How the snap gets installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SnapPlan {
    /// Plain channel install; snapd picks the newest revision there.
    Channel(SnapChannel),
    /// Exact store revision, held against refreshes afterwards.
    Revision { version: String, revision: u32 },
    /// No usable metadata: pass the raw version as a channel name. Works
    /// when the publisher maintains per-version tracks, degraded otherwise.
    VersionChannel(String),
}

pub fn install(
    settings: &MetanormaSettings,
    store: Option<&VersionStore>,
) -> Result<InstallOutcome, SetupError> {
    // 1. Decide between channel install, revision pin and raw fallback.
    let plan = plan(settings, store, snap_architecture())?;

    // 2. Run the install. Snapd requires root; hosted runners grant
    //    passwordless sudo.
    let args = build_install_args(&plan);
    let mut sudo_args: Vec<&str> = vec!["snap"];
    sudo_args.extend(args.iter().map(String::as_str));
    run_checked("Snap", "sudo", &sudo_args)?;

    // 3. Pinned revisions get a refresh hold so auto-refresh cannot undo
    //    the pin. Old snapd versions lack --hold; that is not worth
    //    failing an otherwise complete install over.
    if let SnapPlan::Revision { revision, .. } = &plan {
        let hold = hold_args();
        let mut sudo_hold: Vec<&str> = vec!["snap"];
        sudo_hold.extend(hold.iter().map(String::as_str));
        match run_checked("Snap", "sudo", &sudo_hold) {
            Ok(_) => log_info!(
                "[Snap] Revision {} installed and held against refreshes",
                revision.to_string().cyan()
            ),
            Err(err) => log_warn!(
                "[Snap] Installed revision {} but could not hold refreshes: {}",
                revision,
                err
            ),
        }
    }

    // 4. Report what ended up installed.
    let resolved_version = match &plan {
        SnapPlan::Revision { version, .. } => Some(version.clone()),
        SnapPlan::VersionChannel(version) => Some(version.clone()),
        SnapPlan::Channel(_) => store
            .map(|s| s.snap().latest())
            .filter(|latest| !latest.is_empty())
            .map(str::to_string),
    };
    log_info!(
        "[Snap] metanorma {} available under {}",
        resolved_version.as_deref().unwrap_or("(store latest)").green(),
        SNAP_BIN_DIR.cyan()
    );

    Ok(InstallOutcome {
        resolved_version,
        install_path: PathBuf::from(SNAP_BIN_DIR),
    })
}

/// Resolves settings plus feed data into a concrete plan.
pub(crate) fn plan(
    settings: &MetanormaSettings,
    store: Option<&VersionStore>,
    arch: SnapArchitecture,
) -> Result<SnapPlan, SetupError> {
    if !settings.wants_specific_version() {
        return Ok(SnapPlan::Channel(settings.snap_channel));
    }
    let requested = settings.version.as_str();

    let Some(store) = store else {
        log_warn!(
            "[Snap] No version metadata available; falling back to channel '{}'",
            requested.yellow()
        );
        return Ok(SnapPlan::VersionChannel(requested.to_string()));
    };

    let provider = store.snap();
    if provider.is_empty() {
        log_warn!(
            "[Snap] Snap feed is empty; falling back to channel '{}'",
            requested.yellow()
        );
        return Ok(SnapPlan::VersionChannel(requested.to_string()));
    }
    if !provider.is_available(requested) {
        return Err(SetupError::unknown_version(
            requested,
            "snap",
            provider.recent_versions(SUGGESTION_LIMIT),
        ));
    }
    match provider.revision_for(requested, arch) {
        Some(record) => Ok(SnapPlan::Revision {
            version: requested.to_string(),
            revision: record.revision,
        }),
        None => {
            // Version exists but not for this architecture; the raw
            // channel is the only remaining route.
            log_warn!(
                "[Snap] No {} revision recorded for {}; falling back to channel '{}'",
                arch,
                requested,
                requested.yellow()
            );
            Ok(SnapPlan::VersionChannel(requested.to_string()))
        }
    }
}

/// Arguments after `snap`, as the plan dictates.
pub(crate) fn build_install_args(plan: &SnapPlan) -> Vec<String> {
    let mut args = vec!["install".to_string(), SNAP_PACKAGE.to_string()];
    match plan {
        // Stable is snapd's default channel; passing it would be noise.
        SnapPlan::Channel(SnapChannel::Stable) => {}
        SnapPlan::Channel(channel) => args.push(format!("--channel={channel}")),
        SnapPlan::Revision { revision, .. } => {
            args.push(format!("--revision={revision}"));
            args.push("--classic".to_string());
        }
        SnapPlan::VersionChannel(version) => {
            args.push(format!("--channel={version}"));
            args.push("--classic".to_string());
        }
    }
    args
}

pub(crate) fn hold_args() -> Vec<String> {
    vec![
        "refresh".to_string(),
        "--hold".to_string(),
        SNAP_PACKAGE.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::settings::{InstallationMethod, Platform};
    use crate::schemas::versions::{FeedDocument, FeedMetadata, SnapVersionRecord};
    use crate::versions::fetcher::PlatformVersionData;

    fn settings(version: &str, channel: SnapChannel) -> MetanormaSettings {
        MetanormaSettings {
            version: version.to_string(),
            platform: Platform::Linux,
            installation_method: InstallationMethod::Native,
            snap_channel: channel,
            choco_prerelease: false,
            gemfile: None,
            bundler_version: None,
            fontist_update: false,
            bundle_update: false,
            use_prebuilt_locks: true,
            extra_flavors: Vec::new(),
            github_packages_token: None,
            check_idempotency: true,
            reinstall_on_config_change: true,
            workspace: PathBuf::from("/tmp"),
            install_path: PathBuf::from(SNAP_BIN_DIR),
        }
    }

    fn store_with(records: Vec<SnapVersionRecord>) -> VersionStore {
        let mut data = PlatformVersionData::default();
        data.snap = FeedDocument {
            metadata: FeedMetadata {
                generated_at: None,
                count: records.len() as u32,
                latest_version: records
                    .last()
                    .map(|r| r.version.clone())
                    .unwrap_or_default(),
            },
            versions: records,
        };
        VersionStore::from_data(data)
    }

    fn record(version: &str, revision: u32, arch: SnapArchitecture) -> SnapVersionRecord {
        SnapVersionRecord {
            version: version.to_string(),
            published_at: None,
            display_name: None,
            revision,
            channel: SnapChannel::Stable,
            architecture: arch,
        }
    }

    #[test]
    fn empty_version_installs_bare_from_stable() {
        let plan = plan(
            &settings("", SnapChannel::Stable),
            None,
            SnapArchitecture::Amd64,
        )
        .unwrap();
        assert_eq!(plan, SnapPlan::Channel(SnapChannel::Stable));
        assert_eq!(build_install_args(&plan), vec!["install", "metanorma"]);
    }

    #[test]
    fn non_default_channel_is_passed_through() {
        let plan = plan(
            &settings("latest", SnapChannel::Edge),
            None,
            SnapArchitecture::Amd64,
        )
        .unwrap();
        assert_eq!(
            build_install_args(&plan),
            vec!["install", "metanorma", "--channel=edge"]
        );
    }

    #[test]
    fn known_version_pins_the_revision_for_the_architecture() {
        let store = store_with(vec![
            record("1.13.9", 276, SnapArchitecture::Amd64),
            record("1.13.9", 277, SnapArchitecture::Arm64),
        ]);

        let amd = plan(
            &settings("1.13.9", SnapChannel::Stable),
            Some(&store),
            SnapArchitecture::Amd64,
        )
        .unwrap();
        assert_eq!(
            build_install_args(&amd),
            vec!["install", "metanorma", "--revision=276", "--classic"]
        );

        let arm = plan(
            &settings("1.13.9", SnapChannel::Stable),
            Some(&store),
            SnapArchitecture::Arm64,
        )
        .unwrap();
        assert_eq!(
            build_install_args(&arm),
            vec!["install", "metanorma", "--revision=277", "--classic"]
        );
    }

    #[test]
    fn pinned_installs_hold_refreshes() {
        assert_eq!(hold_args(), vec!["refresh", "--hold", "metanorma"]);
    }

    #[test]
    fn unknown_version_errors_with_recent_alternatives() {
        let store = store_with(vec![
            record("1.13.8", 270, SnapArchitecture::Amd64),
            record("1.13.9", 276, SnapArchitecture::Amd64),
        ]);

        let err = plan(
            &settings("9.9.9", SnapChannel::Stable),
            Some(&store),
            SnapArchitecture::Amd64,
        )
        .unwrap_err();
        match err {
            SetupError::UnsupportedConfiguration { available, .. } => {
                assert_eq!(available, vec!["1.13.9".to_string(), "1.13.8".to_string()]);
            }
            other => panic!("expected UnsupportedConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn missing_metadata_falls_back_to_raw_version_channel() {
        let plan = plan(
            &settings("1.13.9", SnapChannel::Stable),
            None,
            SnapArchitecture::Amd64,
        )
        .unwrap();
        assert_eq!(
            build_install_args(&plan),
            vec!["install", "metanorma", "--channel=1.13.9", "--classic"]
        );
    }

    #[test]
    fn version_without_this_arch_falls_back_to_raw_channel() {
        let store = store_with(vec![record("1.13.9", 276, SnapArchitecture::Amd64)]);
        let plan = plan(
            &settings("1.13.9", SnapChannel::Stable),
            Some(&store),
            SnapArchitecture::Arm64,
        )
        .unwrap();
        assert_eq!(plan, SnapPlan::VersionChannel("1.13.9".to_string()));
    }
}
