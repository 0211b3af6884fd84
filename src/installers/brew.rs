//! Homebrew strategy for macOS hosts.
//!
//! The formula lives in the `metanorma/metanorma` tap and always tracks the
//! newest release. Versioned requests are therefore validated against the
//! homebrew feed up front so a stale workflow fails with alternatives instead
//! of silently installing something else.

use crate::installers::InstallOutcome;
use crate::libs::utilities::command::{parse_version_token, run_captured, run_checked};
use crate::schemas::errors::SetupError;
use crate::schemas::settings::MetanormaSettings;
use crate::versions::store::VersionStore;
use crate::{log_info, log_warn};
use colored::Colorize;
use std::path::PathBuf;

const FORMULA: &str = "metanorma";
const TAP: &str = "metanorma/metanorma";

const SUGGESTION_LIMIT: usize = 10;

pub fn install(
    settings: &MetanormaSettings,
    store: Option<&VersionStore>,
) -> Result<InstallOutcome, SetupError> {
    // 1. Versioned requests must exist in the homebrew feed.
    validate_requested_version(settings, store)?;
    if settings.wants_specific_version() {
        let latest = store.map(|s| s.homebrew().latest()).unwrap_or_default();
        if !latest.is_empty() && latest != settings.version {
            // The tap carries a single formula revision; brew cannot
            // install historic versions from it.
            log_warn!(
                "[Brew] Homebrew installs the tap's current formula ({}); requested {} may not be what lands",
                latest.yellow(),
                settings.version.yellow()
            );
        }
    }

    // 2. Tap, then install.
    log_info!("[Brew] Tapping {}", TAP.cyan());
    run_checked("Brew", "brew", &["tap", TAP])?;
    log_info!("[Brew] Installing formula {}", FORMULA.bold());
    run_checked("Brew", "brew", &["install", FORMULA])?;

    // 3. Resolve where brew linked the binary.
    let install_path = brew_bin_dir();

    // 4. Ask brew what actually got installed; fall back to the request.
    let resolved_version = installed_formula_version()
        .or_else(|| settings.wants_specific_version().then(|| settings.version.clone()))
        .or_else(|| {
            store
                .map(|s| s.homebrew().latest())
                .filter(|latest| !latest.is_empty())
                .map(str::to_string)
        });
    log_info!(
        "[Brew] metanorma {} available under {}",
        resolved_version.as_deref().unwrap_or("(formula latest)").green(),
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
            "[Brew] No version metadata available; cannot validate requested version {}",
            settings.version.yellow()
        );
        return Ok(());
    };
    let provider = store.homebrew();
    if provider.is_empty() {
        log_warn!("[Brew] Homebrew feed is empty; skipping version validation");
        return Ok(());
    }
    if provider.is_available(&settings.version) {
        return Ok(());
    }
    Err(SetupError::unknown_version(
        &settings.version,
        "homebrew",
        provider.recent_versions(SUGGESTION_LIMIT),
    ))
}

/// Where brew links binaries: `brew --prefix`/bin, with the conventional
/// per-architecture locations as fallback when the query fails.
fn brew_bin_dir() -> PathBuf {
    if let Ok(output) = run_captured("Brew", "brew", &["--prefix"]) {
        if output.status.success() {
            let prefix = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !prefix.is_empty() {
                return bin_dir_from_prefix(&prefix);
            }
        }
    }
    log_warn!("[Brew] Could not query brew --prefix; using the conventional location");
    if cfg!(target_arch = "aarch64") {
        PathBuf::from("/opt/homebrew/bin")
    } else {
        PathBuf::from("/usr/local/bin")
    }
}

fn bin_dir_from_prefix(prefix: &str) -> PathBuf {
    PathBuf::from(prefix).join("bin")
}

/// First version token of `brew list --versions metanorma`, if queryable.
fn installed_formula_version() -> Option<String> {
    let output = run_captured("Brew", "brew", &["list", "--versions", FORMULA]).ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout.lines().next().and_then(parse_version_token)
}
