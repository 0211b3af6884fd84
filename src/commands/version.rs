// This file handles version reporting for the `setup-metanorma` tool.
// It prints the compiled-in crate version and compares it against the
// latest release available on GitHub, suggesting an upgrade when behind.

use crate::{log_info, log_warn};
use colored::Colorize;
use semver::Version;
use serde::Deserialize;
use std::time::Duration;

// GitHub repository details for the upgrade check.
const REPO_OWNER: &str = "metanorma";
const REPO_NAME: &str = "setup-metanorma";

/// Simplified GitHub Release API response; only the tag matters here.
#[derive(Deserialize)]
struct GitHubRelease {
    tag_name: String,
}

/// Fetches the latest release tag from the GitHub API.
fn get_latest_github_release() -> Result<String, Box<dyn std::error::Error>> {
    let url = format!("https://api.github.com/repos/{REPO_OWNER}/{REPO_NAME}/releases/latest");

    let agent = ureq::AgentBuilder::new()
        .user_agent("setup-metanorma-version-checker")
        .timeout(Duration::from_secs(10))
        .build();

    let response = agent.get(&url).call()?;
    if !response.content_type().contains("application/json") {
        return Err("GitHub returned unexpected content type, not JSON.".into());
    }

    let release: GitHubRelease = response.into_json()?;
    Ok(release.tag_name)
}

/// Compares the running version against a release tag, tolerating a leading
/// `v` and falling back to string comparison for non-semver tags.
fn report_upgrade_status(local: &str, tag: &str) {
    let latest = tag.trim().trim_start_matches('v');
    match (Version::parse(local), Version::parse(latest)) {
        (Ok(running), Ok(published)) => {
            if published > running {
                log_warn!(
                    "A newer release {} is available. Consider upgrading.",
                    latest.yellow()
                );
            } else {
                log_info!("You are running the latest version.");
            }
        }
        _ => {
            if latest == local {
                log_info!("You are running the latest version.");
            } else {
                log_warn!("Latest GitHub release is {latest}, running {local}.");
            }
        }
    }
}

/// Main entry point for the `version` command.
///
/// The upgrade check is informational only: network failures are logged
/// and never fail the command.
pub fn run() -> anyhow::Result<()> {
    let local_version = env!("CARGO_PKG_VERSION");
    log_info!("setup-metanorma {}", local_version.green());

    match get_latest_github_release() {
        Ok(tag) => report_upgrade_status(local_version, &tag),
        Err(e) => log_warn!("Could not check the latest GitHub release: {e}"),
    }

    Ok(())
}
