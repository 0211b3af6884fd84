// Our custom logging macros to give us nicely formatted (and colored!) output
// for debugging, general information, and errors.
use crate::{log_debug, log_warn};
// The 'colored' crate helps us make our console output look pretty and readable.
use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};

/// Name of the persisted installation state file, relative to the workspace.
pub const STATE_FILE_NAME: &str = ".setup-metanorma-state.json";

/// Resolves paths that start with a tilde `~` into absolute paths.
/// On Unix-like systems, `~` is a shortcut for the user's home directory,
/// and users frequently hand us Gemfile paths written that way.
///
/// # Arguments
/// * `path`: A string slice (`&str`) representing the path, which might start with `~`.
///
/// # Returns
/// * `PathBuf`: The path with a leading `~` resolved when the home directory
///   could be determined. Otherwise, the original path unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    // Only a leading `~` or `~/` is expanded; `~user` forms and a `~`
    // elsewhere in the path pass through untouched.
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Resolves the workspace root: an explicit override wins, then the
/// `GITHUB_WORKSPACE` variable the runner exports, then the current
/// directory as a last resort.
///
/// The workspace is where the state file lives and where Gemfile-based
/// installs run `bundle`, so every caller must agree on it.
pub fn workspace_root(explicit: Option<&str>) -> PathBuf {
    if let Some(dir) = explicit {
        let resolved = expand_tilde(dir);
        log_debug!(
            "[Paths] Workspace root from flag: {}",
            resolved.display().to_string().cyan()
        );
        return resolved;
    }
    if let Ok(dir) = env::var("GITHUB_WORKSPACE") {
        if !dir.trim().is_empty() {
            log_debug!("[Paths] Workspace root from GITHUB_WORKSPACE: {}", dir.cyan());
            return PathBuf::from(dir);
        }
    }
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    log_warn!(
        "[Paths] GITHUB_WORKSPACE not set, using current directory: {}",
        cwd.display().to_string().yellow()
    );
    cwd
}

/// Path of the installation state file inside the given workspace.
pub fn state_file_path(workspace: &Path) -> PathBuf {
    workspace.join(STATE_FILE_NAME)
}

/// Root directory for cached binary installs.
///
/// Prefers the runner's tool cache (`RUNNER_TOOL_CACHE`) so consecutive jobs
/// on the same machine reuse downloads; falls back to a dot-directory in the
/// user's home when running outside CI.
pub fn tool_cache_root() -> PathBuf {
    if let Ok(dir) = env::var("RUNNER_TOOL_CACHE") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".setup-metanorma").join("cache");
    }
    log_warn!("[Paths] Could not determine home directory, caching under the current directory");
    PathBuf::from(".setup-metanorma-cache")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_pass_through_untouched() {
        assert_eq!(expand_tilde("/opt/gemfiles"), PathBuf::from("/opt/gemfiles"));
    }

    #[test]
    fn tilde_prefix_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/Gemfile"), home.join("Gemfile"));
        }
    }

    #[test]
    fn named_user_tildes_pass_through() {
        assert_eq!(
            expand_tilde("~builder/Gemfile"),
            PathBuf::from("~builder/Gemfile")
        );
    }

    #[test]
    fn explicit_workspace_wins_over_environment() {
        let root = workspace_root(Some("/tmp/job"));
        assert_eq!(root, PathBuf::from("/tmp/job"));
    }

    #[test]
    fn state_file_lives_inside_workspace() {
        let path = state_file_path(Path::new("/work"));
        assert_eq!(path, PathBuf::from("/work/.setup-metanorma-state.json"));
    }
}
