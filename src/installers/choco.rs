//! Chocolatey strategy for Windows hosts.

use crate::installers::InstallOutcome;
use crate::libs::utilities::command::{render_command, run_captured};
use crate::schemas::errors::SetupError;
use crate::schemas::settings::MetanormaSettings;
use crate::versions::store::VersionStore;
use crate::{log_info, log_warn};
use colored::Colorize;
use std::env;
use std::path::PathBuf;
use std::process::Output;

const PACKAGE: &str = "metanorma";

const SUGGESTION_LIMIT: usize = 10;

/// Output fragments that mark a failed-looking choco run as having installed
/// the package anyway. Chocolatey has a history of exiting non-zero from
/// post-install script noise after a successful install; the package summary
/// line is the reliable signal. Matched on output text, never on exit code
/// alone, so real failures stay fatal.
const BENIGN_FAILURE_MARKERS: &[&str] = &["Chocolatey installed 1/1 packages"];

pub fn install(
    settings: &MetanormaSettings,
    store: Option<&VersionStore>,
) -> Result<InstallOutcome, SetupError> {
    // 1. Versioned requests must exist in the chocolatey feed.
    validate_requested_version(settings, store)?;

    // 2. Run the install, tolerating the known-benign failure shape.
    let args = build_install_args(settings);
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = run_captured("Choco", "choco", &arg_refs)?;
    if !output.status.success() {
        let combined = combined_output(&output);
        if is_benign_failure(&combined) {
            log_warn!(
                "[Choco] choco exited with {} but reported a successful package install; continuing",
                output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string())
                    .yellow()
            );
        } else {
            return Err(SetupError::SubprocessFailure {
                command: render_command("choco", &arg_refs),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
    }

    // 3. Report the shim directory chocolatey links binaries into.
    let install_path = choco_bin_dir();
    let resolved_version = if settings.wants_specific_version() {
        Some(settings.version.clone())
    } else {
        store
            .map(|s| s.chocolatey().latest())
            .filter(|latest| !latest.is_empty())
            .map(str::to_string)
    };
    log_info!(
        "[Choco] metanorma {} available under {}",
        resolved_version.as_deref().unwrap_or("(feed latest)").green(),
        install_path.display().to_string().cyan()
    );

    Ok(InstallOutcome {
        resolved_version,
        install_path,
    })
}

fn validate_requested_version(
    settings: &MetanormaSettings,
    store: Option<&VersionStore>,
) -> Result<(), SetupError> {
    if !settings.wants_specific_version() {
        return Ok(());
    }
    let Some(store) = store else {
        log_warn!(
            "[Choco] No version metadata available; cannot validate requested version {}",
            settings.version.yellow()
        );
        return Ok(());
    };
    let provider = store.chocolatey();
    if provider.is_empty() {
        log_warn!("[Choco] Chocolatey feed is empty; skipping version validation");
        return Ok(());
    }
    match provider.get(&settings.version) {
        Some(record) => {
            if record.is_pre_release && !settings.choco_prerelease {
                log_warn!(
                    "[Choco] {} is a pre-release; pass choco-prerelease for chocolatey to find it",
                    settings.version.yellow()
                );
            }
            Ok(())
        }
        None => Err(SetupError::unknown_version(
            &settings.version,
            "chocolatey",
            provider.recent_versions(SUGGESTION_LIMIT),
        )),
    }
}

pub(crate) fn build_install_args(settings: &MetanormaSettings) -> Vec<String> {
    let mut args = vec![
        "install".to_string(),
        PACKAGE.to_string(),
        "-y".to_string(),
    ];
    if settings.wants_specific_version() {
        args.push(format!("--version={}", settings.version));
    }
    if settings.choco_prerelease {
        args.push("--pre".to_string());
    }
    args
}

pub(crate) fn is_benign_failure(combined_output: &str) -> bool {
    BENIGN_FAILURE_MARKERS
        .iter()
        .any(|marker| combined_output.contains(marker))
}

fn combined_output(output: &Output) -> String {
    format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

/// Chocolatey's shim directory, honoring a relocated install.
fn choco_bin_dir() -> PathBuf {
    match env::var("ChocolateyInstall") {
        Ok(root) if !root.trim().is_empty() => PathBuf::from(root).join("bin"),
        _ => PathBuf::from(r"C:\ProgramData\chocolatey\bin"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::settings::{InstallationMethod, Platform, SnapChannel};
    use crate::schemas::versions::{ChocolateyVersionRecord, FeedDocument, FeedMetadata};
    use crate::versions::fetcher::PlatformVersionData;

    fn settings(version: &str, prerelease: bool) -> MetanormaSettings {
        MetanormaSettings {
            version: version.to_string(),
            platform: Platform::Windows,
            installation_method: InstallationMethod::Native,
            snap_channel: SnapChannel::Stable,
            choco_prerelease: prerelease,
            gemfile: None,
            bundler_version: None,
            fontist_update: false,
            bundle_update: false,
            use_prebuilt_locks: true,
            extra_flavors: Vec::new(),
            github_packages_token: None,
            check_idempotency: true,
            reinstall_on_config_change: true,
            workspace: PathBuf::from(r"C:\work"),
            install_path: PathBuf::from(r"C:\ProgramData\chocolatey\bin"),
        }
    }

    fn store_with(versions: &[(&str, bool)]) -> VersionStore {
        let mut data = PlatformVersionData::default();
        data.chocolatey = FeedDocument {
            metadata: FeedMetadata {
                generated_at: None,
                count: versions.len() as u32,
                latest_version: versions
                    .last()
                    .map(|(v, _)| v.to_string())
                    .unwrap_or_default(),
            },
            versions: versions
                .iter()
                .map(|(v, pre)| ChocolateyVersionRecord {
                    version: v.to_string(),
                    published_at: None,
                    display_name: None,
                    is_pre_release: *pre,
                })
                .collect(),
        };
        VersionStore::from_data(data)
    }

    #[test]
    fn latest_request_installs_without_version_flag() {
        assert_eq!(
            build_install_args(&settings("", false)),
            vec!["install", "metanorma", "-y"]
        );
    }

    #[test]
    fn pinned_request_passes_version() {
        assert_eq!(
            build_install_args(&settings("1.13.9", false)),
            vec!["install", "metanorma", "-y", "--version=1.13.9"]
        );
    }

    #[test]
    fn prerelease_flag_adds_pre() {
        assert_eq!(
            build_install_args(&settings("1.14.0-pre1", true)),
            vec!["install", "metanorma", "-y", "--version=1.14.0-pre1", "--pre"]
        );
    }

    #[test]
    fn benign_marker_must_appear_in_output() {
        assert!(is_benign_failure(
            "Chocolatey installed 1/1 packages.\n Software installed as 'msi'"
        ));
        assert!(!is_benign_failure("Chocolatey installed 0/1 packages."));
        assert!(!is_benign_failure("The install of metanorma was NOT successful."));
        assert!(!is_benign_failure(""));
    }

    #[test]
    fn unknown_versions_fail_with_recent_alternatives() {
        let store = store_with(&[("1.13.8", false), ("1.13.9", false)]);
        let err = validate_requested_version(&settings("9.9.9", false), Some(&store)).unwrap_err();
        match err {
            SetupError::UnsupportedConfiguration { available, .. } => {
                assert_eq!(available, vec!["1.13.9".to_string(), "1.13.8".to_string()]);
            }
            other => panic!("expected UnsupportedConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn known_versions_pass_even_as_prerelease() {
        let store = store_with(&[("1.13.9", false), ("1.14.0-pre1", true)]);
        assert!(validate_requested_version(&settings("1.14.0-pre1", true), Some(&store)).is_ok());
        assert!(validate_requested_version(&settings("1.14.0-pre1", false), Some(&store)).is_ok());
    }
}
