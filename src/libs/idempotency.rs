//! Idempotency engine.
//!
//! Decides whether an installation run needs to do anything, based on the
//! persisted state file, a configuration checksum, and a probe for the tool
//! on `PATH`. The decision ladder, first match wins:
//!
//! 1. checking disabled → install;
//! 2. no usable prior state → install;
//! 3. prior state describes a different installation (platform, method, or
//!    an unrelated install path) → install;
//! 4. configuration checksum drifted → install, unless drift-reinstalls are
//!    disabled, in which case the drift is logged and the ladder continues;
//! 5. tool not actually on `PATH` → install (state said installed, reality
//!    disagrees);
//! 6. otherwise skip.

use crate::libs::state_management::{load_state, save_state};
use crate::libs::utilities::command::{parse_version_token, CommandProbe};
use crate::libs::utilities::path_helpers::state_file_path;
use crate::libs::utilities::timestamps::{current_timestamp, time_since};
use crate::schemas::settings::MetanormaSettings;
use crate::schemas::state_file::InstallationState;
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use md5::{Digest, Md5};
use serde_json::{Map, Value};
use std::fmt;
use std::io;
use std::path::Path;

/// Name of the executable to look for on `PATH`.
pub const TOOL_COMMAND: &str = "metanorma";

/// Outcome of the idempotency evaluation.
#[derive(Debug)]
pub enum InstallDecision {
    Proceed(ProceedReason),
    Skip(SkipDetails),
}

/// Why an installation goes ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProceedReason {
    CheckDisabled,
    NoPriorState,
    ConfigurationChanged,
    ToolMissing,
}

impl fmt::Display for ProceedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProceedReason::CheckDisabled => write!(f, "idempotency check disabled"),
            ProceedReason::NoPriorState => write!(f, "no prior installation recorded"),
            ProceedReason::ConfigurationChanged => write!(f, "configuration changed"),
            ProceedReason::ToolMissing => write!(f, "tool not found on PATH"),
        }
    }
}

/// What the skip path reports back to the workflow.
#[derive(Debug)]
pub struct SkipDetails {
    /// Version recorded at install time, when one was pinned.
    pub prior_version: Option<String>,
    /// Tool version as probed right now, when parseable.
    pub detected_version: Option<String>,
    pub installed_at: String,
}

/// Evaluates the decision ladder for this run.
pub fn evaluate(settings: &MetanormaSettings, probe: &dyn CommandProbe) -> InstallDecision {
    if !settings.check_idempotency {
        log_debug!("[Idempotency] Check disabled, installing unconditionally");
        return InstallDecision::Proceed(ProceedReason::CheckDisabled);
    }

    let state_path = state_file_path(&settings.workspace);
    let Some(prior) = load_state(&state_path) else {
        return InstallDecision::Proceed(ProceedReason::NoPriorState);
    };

    if !describes_same_installation(&prior, settings) {
        log_info!(
            "[Idempotency] Prior install was {} via {}, current run wants {} via {}",
            prior.platform,
            prior.installation_method,
            settings.platform,
            settings.installation_method
        );
        return InstallDecision::Proceed(ProceedReason::ConfigurationChanged);
    }

    let current_checksum = settings_checksum(settings);
    if prior.checksum != current_checksum {
        if settings.reinstall_on_config_change {
            log_info!("[Idempotency] Configuration changed since the last install, reinstalling");
            return InstallDecision::Proceed(ProceedReason::ConfigurationChanged);
        }
        log_warn!(
            "[Idempotency] Configuration changed since the last install, but reinstall-on-change is disabled. Keeping the existing installation."
        );
    }

    if !probe.command_exists(TOOL_COMMAND) {
        log_info!(
            "[Idempotency] State file says installed, but '{}' is not on PATH. Reinstalling.",
            TOOL_COMMAND.yellow()
        );
        return InstallDecision::Proceed(ProceedReason::ToolMissing);
    }

    let detected_version = probe
        .version_output(TOOL_COMMAND, "--version")
        .as_deref()
        .and_then(parse_version_token);
    let when = time_since(&prior.installed_at).unwrap_or_else(|| "at an unknown time".to_string());
    log_info!(
        "[Idempotency] Already installed ({}), skipping. Installed {}.",
        detected_version
            .as_deref()
            .or(prior.metanorma_version.as_deref())
            .unwrap_or("version unknown")
            .green(),
        when
    );
    InstallDecision::Skip(SkipDetails {
        prior_version: prior.version,
        detected_version,
        installed_at: prior.installed_at,
    })
}

/// Writes the state file after a successful installation.
///
/// Failure to persist is the caller's problem to downgrade: the install
/// itself already succeeded.
pub fn record_success(
    settings: &MetanormaSettings,
    resolved_version: Option<&str>,
    probe: &dyn CommandProbe,
) -> io::Result<()> {
    let probed = probe
        .version_output(TOOL_COMMAND, "--version")
        .as_deref()
        .and_then(parse_version_token);
    let state = InstallationState {
        platform: settings.platform,
        installation_method: settings.installation_method,
        version: if settings.wants_specific_version() {
            Some(settings.version.clone())
        } else {
            None
        },
        install_path: settings.install_path.to_string_lossy().into_owned(),
        installed_at: current_timestamp(),
        metanorma_version: probed.or_else(|| resolved_version.map(str::to_string)),
        checksum: settings_checksum(settings),
    };
    save_state(&state, &state_file_path(&settings.workspace))
}

/// MD5 digest over the configuration fields that determine what gets
/// installed. Keys are emitted in sorted order so the digest is stable
/// across runs and releases.
pub fn settings_checksum(settings: &MetanormaSettings) -> String {
    let canonical = canonical_settings_json(settings);
    let mut hasher = Md5::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn canonical_settings_json(settings: &MetanormaSettings) -> String {
    // Insertion order is alphabetical; serde_json::Map preserves it.
    let mut fields = Map::new();
    fields.insert(
        "bundler_version".to_string(),
        settings
            .bundler_version
            .as_deref()
            .map(Value::from)
            .unwrap_or(Value::Null),
    );
    fields.insert(
        "choco_prerelease".to_string(),
        Value::from(settings.choco_prerelease),
    );
    fields.insert(
        "gemfile".to_string(),
        settings
            .gemfile
            .as_ref()
            .map(|p| Value::from(p.to_string_lossy().into_owned()))
            .unwrap_or(Value::Null),
    );
    fields.insert(
        "installation_method".to_string(),
        Value::from(settings.installation_method.to_string()),
    );
    fields.insert("platform".to_string(), Value::from(settings.platform.to_string()));
    fields.insert(
        "snap_channel".to_string(),
        Value::from(settings.snap_channel.to_string()),
    );
    fields.insert("version".to_string(), Value::from(settings.version.clone()));
    Value::Object(fields).to_string()
}

fn describes_same_installation(prior: &InstallationState, settings: &MetanormaSettings) -> bool {
    if prior.platform != settings.platform
        || prior.installation_method != settings.installation_method
    {
        return false;
    }
    // An empty persisted path (older releases) never disqualifies.
    if prior.install_path.is_empty() {
        return true;
    }
    paths_related(Path::new(&prior.install_path), &settings.install_path)
}

/// Whether one path contains the other. `/snap/bin` and
/// `/snap/bin/metanorma` describe the same installation; `/snap/bin` and
/// `/opt/metanorma` do not.
fn paths_related(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::settings::{InstallationMethod, Platform, SnapChannel};
    use std::path::PathBuf;

    struct FakeProbe {
        has_tool: bool,
        version_line: Option<&'static str>,
    }

    impl CommandProbe for FakeProbe {
        fn command_exists(&self, command: &str) -> bool {
            command == TOOL_COMMAND && self.has_tool
        }

        fn version_output(&self, _command: &str, _flag: &str) -> Option<String> {
            self.version_line.map(|line| line.to_string())
        }
    }

    fn settings_in(workspace: &Path) -> MetanormaSettings {
        MetanormaSettings {
            version: "1.13.9".to_string(),
            platform: Platform::Linux,
            installation_method: InstallationMethod::Native,
            snap_channel: SnapChannel::Stable,
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
            workspace: workspace.to_path_buf(),
            install_path: PathBuf::from("/snap/bin"),
        }
    }

    fn present_probe() -> FakeProbe {
        FakeProbe {
            has_tool: true,
            version_line: Some("metanorma 1.13.9"),
        }
    }

    #[test]
    fn checksum_is_deterministic_and_md5_shaped() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        let first = settings_checksum(&settings);
        let second = settings_checksum(&settings.clone());
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn checksum_tracks_relevant_fields_only() {
        let tmp = tempfile::tempdir().unwrap();
        let base = settings_in(tmp.path());

        let mut changed = base.clone();
        changed.version = "1.13.8".to_string();
        assert_ne!(settings_checksum(&base), settings_checksum(&changed));

        let mut channel = base.clone();
        channel.snap_channel = SnapChannel::Edge;
        assert_ne!(settings_checksum(&base), settings_checksum(&channel));

        // fontist-update does not affect what is installed
        let mut irrelevant = base.clone();
        irrelevant.fontist_update = true;
        assert_eq!(settings_checksum(&base), settings_checksum(&irrelevant));
    }

    #[test]
    fn disabled_check_always_installs() {
        let tmp = tempfile::tempdir().unwrap();
        let mut settings = settings_in(tmp.path());
        record_success(&settings, Some("1.13.9"), &present_probe()).unwrap();

        settings.check_idempotency = false;
        match evaluate(&settings, &present_probe()) {
            InstallDecision::Proceed(ProceedReason::CheckDisabled) => {}
            other => panic!("expected CheckDisabled, got {other:?}"),
        }
    }

    #[test]
    fn missing_state_installs() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        match evaluate(&settings, &present_probe()) {
            InstallDecision::Proceed(ProceedReason::NoPriorState) => {}
            other => panic!("expected NoPriorState, got {other:?}"),
        }
    }

    #[test]
    fn unchanged_config_with_tool_present_skips() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        record_success(&settings, Some("1.13.9"), &present_probe()).unwrap();

        match evaluate(&settings, &present_probe()) {
            InstallDecision::Skip(details) => {
                assert_eq!(details.prior_version.as_deref(), Some("1.13.9"));
                assert_eq!(details.detected_version.as_deref(), Some("1.13.9"));
            }
            other => panic!("expected Skip, got {other:?}"),
        }
    }

    #[test]
    fn state_without_tool_on_path_reinstalls() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        record_success(&settings, Some("1.13.9"), &present_probe()).unwrap();

        let gone = FakeProbe {
            has_tool: false,
            version_line: None,
        };
        match evaluate(&settings, &gone) {
            InstallDecision::Proceed(ProceedReason::ToolMissing) => {}
            other => panic!("expected ToolMissing, got {other:?}"),
        }
    }

    #[test]
    fn version_change_reinstalls_when_drift_reinstall_enabled() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        record_success(&settings, Some("1.13.9"), &present_probe()).unwrap();

        let mut changed = settings.clone();
        changed.version = "1.13.8".to_string();
        match evaluate(&changed, &present_probe()) {
            InstallDecision::Proceed(ProceedReason::ConfigurationChanged) => {}
            other => panic!("expected ConfigurationChanged, got {other:?}"),
        }
    }

    #[test]
    fn drift_without_reinstall_flag_keeps_existing_install() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        record_success(&settings, Some("1.13.9"), &present_probe()).unwrap();

        let mut changed = settings.clone();
        changed.version = "1.13.8".to_string();
        changed.reinstall_on_config_change = false;
        match evaluate(&changed, &present_probe()) {
            InstallDecision::Skip(_) => {}
            other => panic!("expected Skip, got {other:?}"),
        }
    }

    #[test]
    fn method_mismatch_reinstalls_even_without_drift_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        record_success(&settings, Some("1.13.9"), &present_probe()).unwrap();

        let mut changed = settings.clone();
        changed.installation_method = InstallationMethod::Binary;
        changed.reinstall_on_config_change = false;
        match evaluate(&changed, &present_probe()) {
            InstallDecision::Proceed(ProceedReason::ConfigurationChanged) => {}
            other => panic!("expected ConfigurationChanged, got {other:?}"),
        }
    }

    #[test]
    fn nested_install_paths_count_as_the_same_installation() {
        assert!(paths_related(
            Path::new("/snap/bin"),
            Path::new("/snap/bin/metanorma")
        ));
        assert!(paths_related(
            Path::new("/snap/bin/metanorma"),
            Path::new("/snap/bin")
        ));
        assert!(!paths_related(
            Path::new("/snap/bin"),
            Path::new("/opt/metanorma")
        ));
    }

    #[test]
    fn unrelated_install_path_reinstalls() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings_in(tmp.path());
        record_success(&settings, Some("1.13.9"), &present_probe()).unwrap();

        let mut moved = settings.clone();
        moved.install_path = PathBuf::from("/opt/metanorma/bin");
        match evaluate(&moved, &present_probe()) {
            InstallDecision::Proceed(ProceedReason::ConfigurationChanged) => {}
            other => panic!("expected ConfigurationChanged, got {other:?}"),
        }
    }
}
