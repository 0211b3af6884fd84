// This file contains the primary logic for the `setup-metanorma install`
// command. It resolves the requested configuration against the detected
// environment, short-circuits when a matching installation already exists,
// and otherwise drives the selected installation strategy end to end.

use crate::cli::cmd_enums::InstallArgs;
use crate::detect::container::{detect_environment, resolve_installation_method};
use crate::installers::{self, InstallerKind};
use crate::libs::idempotency::{self, InstallDecision};
use crate::libs::outputs;
use crate::libs::utilities::command::SystemCommandProbe;
use crate::libs::utilities::path_helpers::{expand_tilde, workspace_root};
use crate::schemas::settings::{
    InstallationMethod, MetanormaSettings, Platform, validate_version_request,
};
use crate::versions::store::VersionStore;
use crate::{log_debug, log_info, log_warn};
use anyhow::anyhow;
use colored::Colorize;
use std::path::PathBuf;

/// Main entry point for the `install` command.
///
/// Orchestrates a full installation run:
/// 1. Validates the version request and detects the environment.
/// 2. Assembles the effective settings, resolving `auto` to a concrete
///    installation method and strategy.
/// 3. Consults the idempotency record and skips when nothing changed.
/// 4. Fetches version metadata and runs the selected strategy.
/// 5. Persists the new state and publishes the workflow outputs.
pub fn run(args: InstallArgs) -> anyhow::Result<()> {
    log_debug!("Entered install::run() function.");

    validate_version_request(args.version.trim())?;

    let platform = Platform::current().ok_or_else(|| {
        anyhow!(
            "unsupported operating system '{}'; linux, macos and windows are supported",
            std::env::consts::OS
        )
    })?;

    // Detect the environment and settle the `auto` preference before
    // settings are assembled: everything downstream sees a concrete method.
    let probe = SystemCommandProbe;
    let container = detect_environment(&probe);
    let requested_method = args.installation_method;
    let method = resolve_installation_method(requested_method, &container);
    if requested_method == InstallationMethod::Auto {
        log_info!(
            "[Install] Resolved installation method '{}' to '{}'",
            "auto".yellow(),
            method.to_string().green()
        );
    }

    let workspace_arg = args
        .workspace
        .as_deref()
        .map(str::trim)
        .filter(|dir| !dir.is_empty());
    let workspace = workspace_root(workspace_arg);
    let kind = installers::select_installer(platform, method, &container);
    let settings = build_settings(args, platform, method, kind, workspace);

    log_info!(
        "[Install] Target: metanorma {} on {} via {}",
        settings.version_label().green(),
        platform.to_string().cyan(),
        kind.to_string().cyan()
    );

    match idempotency::evaluate(&settings, &probe) {
        InstallDecision::Skip(details) => {
            let version = details
                .detected_version
                .or(details.prior_version)
                .unwrap_or_else(|| settings.version_label().to_string());
            publish_outputs(&settings, &version, true);
            return Ok(());
        }
        InstallDecision::Proceed(reason) => {
            log_info!("[Install] Proceeding with installation: {reason}");
        }
    }

    // A missing store is not fatal here; strategies that can work without
    // metadata degrade on their own, the one that cannot reports it.
    let store = VersionStore::initialize();
    let outcome = installers::run_installer(kind, &settings, store.as_ref(), &probe)?;

    if let Err(err) = idempotency::record_success(&settings, outcome.resolved_version.as_deref(), &probe)
    {
        log_warn!("[Install] Could not persist installation state: {err}");
    }

    let resolved = outcome
        .resolved_version
        .unwrap_or_else(|| settings.version_label().to_string());
    log_info!(
        "[Install] metanorma {} available under {}",
        resolved.green(),
        outcome.install_path.display().to_string().cyan()
    );
    publish_outputs(&settings, &resolved, false);
    log_info!("'setup-metanorma install' completed!!");
    Ok(())
}

/// Turns raw command-line arguments into the settings for this run.
///
/// CI workflows pass inputs through environment variables, where "unset"
/// arrives as an empty string; empty and blank values are normalized away
/// here so the rest of the crate only sees real ones.
fn build_settings(
    args: InstallArgs,
    platform: Platform,
    method: InstallationMethod,
    kind: InstallerKind,
    workspace: PathBuf,
) -> MetanormaSettings {
    let install_path = installers::default_install_path(kind, &workspace);
    MetanormaSettings {
        version: args.version.trim().to_string(),
        platform,
        installation_method: method,
        snap_channel: args.snap_channel,
        choco_prerelease: args.choco_prerelease,
        gemfile: non_empty(args.gemfile).map(|path| expand_tilde(&path)),
        bundler_version: non_empty(args.bundler_version),
        fontist_update: args.fontist_update,
        bundle_update: args.bundle_update,
        use_prebuilt_locks: !args.no_prebuilt_locks,
        extra_flavors: args
            .extra_flavors
            .map(|flavors| flavors.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        github_packages_token: non_empty(args.github_packages_token),
        check_idempotency: !args.no_idempotency_check,
        reinstall_on_config_change: !args.no_reinstall_on_config_change,
        workspace,
        install_path,
    }
}

/// Collapses empty and whitespace-only optional inputs to `None`.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Publishes the workflow outputs every run produces, skipped or not.
fn publish_outputs(settings: &MetanormaSettings, version: &str, skipped: bool) {
    outputs::set_output("version", version);
    outputs::set_output("platform", &settings.platform.to_string());
    outputs::set_output(
        "installation-method",
        &settings.installation_method.to_string(),
    );
    outputs::set_output("idempotent-skip", if skipped { "true" } else { "false" });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::settings::SnapChannel;

    fn args() -> InstallArgs {
        InstallArgs {
            version: String::new(),
            installation_method: InstallationMethod::Auto,
            snap_channel: SnapChannel::Stable,
            choco_prerelease: false,
            gemfile: None,
            bundler_version: None,
            fontist_update: false,
            bundle_update: false,
            no_prebuilt_locks: false,
            extra_flavors: None,
            github_packages_token: None,
            no_idempotency_check: false,
            no_reinstall_on_config_change: false,
            workspace: None,
        }
    }

    fn settings_from(args: InstallArgs) -> MetanormaSettings {
        build_settings(
            args,
            Platform::Linux,
            InstallationMethod::Gem,
            InstallerKind::HostGem,
            PathBuf::from("/work"),
        )
    }

    #[test]
    fn blank_optional_inputs_normalize_to_none() {
        let settings = settings_from(InstallArgs {
            gemfile: Some(String::new()),
            bundler_version: Some("   ".to_string()),
            github_packages_token: Some(String::new()),
            ..args()
        });
        assert_eq!(settings.gemfile, None);
        assert_eq!(settings.bundler_version, None);
        assert_eq!(settings.github_packages_token, None);
    }

    #[test]
    fn extra_flavors_split_on_whitespace() {
        let settings = settings_from(InstallArgs {
            extra_flavors: Some("ieee  itu\tnist".to_string()),
            ..args()
        });
        assert_eq!(settings.extra_flavors, vec!["ieee", "itu", "nist"]);

        let none = settings_from(args());
        assert!(none.extra_flavors.is_empty());
    }

    #[test]
    fn negative_flags_invert_into_positive_settings() {
        let settings = settings_from(InstallArgs {
            no_prebuilt_locks: true,
            no_idempotency_check: true,
            no_reinstall_on_config_change: true,
            ..args()
        });
        assert!(!settings.use_prebuilt_locks);
        assert!(!settings.check_idempotency);
        assert!(!settings.reinstall_on_config_change);
    }

    #[test]
    fn version_request_is_trimmed() {
        let settings = settings_from(InstallArgs {
            version: " 1.13.9 ".to_string(),
            ..args()
        });
        assert_eq!(settings.version, "1.13.9");
        assert!(settings.wants_specific_version());
    }

    #[test]
    fn gem_strategy_lands_in_the_workspace_binstub_dir() {
        let settings = settings_from(args());
        assert_eq!(settings.install_path, PathBuf::from("/work/.metanorma-bin"));
        assert_eq!(settings.workspace, PathBuf::from("/work"));
    }
}
