// This file implements the `setup-metanorma cleanup` command, the action's
// post-run step. It removes what a previous install run left in the
// workspace (state file, staging artifacts) without ever reversing the
// installation itself.

use crate::installers;
use crate::libs::state_management::{delete_state, load_state};
use crate::libs::utilities::path_helpers::{state_file_path, workspace_root};
use crate::schemas::container::ContainerInfo;
use crate::schemas::settings::{MetanormaSettings, SnapChannel};
use crate::schemas::state_file::InstallationState;
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::path::PathBuf;

/// Main entry point for the `cleanup` command.
///
/// Runs in a post step, so it must never fail the workflow: a cleanup
/// problem cannot be allowed to mask the result of the job itself.
/// Everything that goes wrong is logged and swallowed.
pub fn run(workspace: Option<String>) -> anyhow::Result<()> {
    log_debug!("Entered cleanup::run() function.");

    let workspace = workspace_root(
        workspace
            .as_deref()
            .map(str::trim)
            .filter(|dir| !dir.is_empty()),
    );
    let state_path = state_file_path(&workspace);

    match load_state(&state_path) {
        Some(state) => {
            log_info!(
                "[Cleanup] Prior installation: metanorma {} via {}",
                state
                    .metanorma_version
                    .as_deref()
                    .or(state.version.as_deref())
                    .unwrap_or("latest")
                    .green(),
                state.installation_method.to_string().cyan()
            );
            // The concrete gem variant does not matter here (all of them
            // share one cleanup path), so a synthetic host description is
            // enough to dispatch.
            let kind = installers::select_installer(
                state.platform,
                state.installation_method,
                &ContainerInfo::host(false, false),
            );
            let settings = settings_for_cleanup(&state, workspace);
            installers::run_cleanup(kind, &settings);
        }
        None => {
            log_info!(
                "[Cleanup] No installation recorded under {}, nothing to clean",
                workspace.display().to_string().cyan()
            );
        }
    }

    match delete_state(&state_path) {
        Ok(true) => log_info!(
            "[Cleanup] Removed state file {}",
            state_path.display().to_string().cyan()
        ),
        Ok(false) => log_debug!("[Cleanup] No state file to remove"),
        Err(err) => log_warn!(
            "[Cleanup] Could not remove state file {}: {err}",
            state_path.display()
        ),
    }

    Ok(())
}

/// Reconstructs just enough of a run's settings from its persisted state to
/// drive cleanup dispatch. Fields cleanup never reads take their defaults.
fn settings_for_cleanup(state: &InstallationState, workspace: PathBuf) -> MetanormaSettings {
    MetanormaSettings {
        version: state.version.clone().unwrap_or_default(),
        platform: state.platform,
        installation_method: state.installation_method,
        snap_channel: SnapChannel::default(),
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
        workspace,
        install_path: PathBuf::from(&state.install_path),
    }
}
