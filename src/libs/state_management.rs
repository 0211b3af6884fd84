// Reads and writes the per-workspace installation state file. The file is
// an optimization, never a requirement: anything wrong with it (missing,
// unreadable, malformed JSON, bogus checksum) quietly collapses to "no
// prior state" and the run installs from scratch.

use crate::schemas::state_file::InstallationState;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::fs;
use std::io;
use std::path::Path;

/// Loads prior installation state, if a plausible one exists.
///
/// Validation is deliberately strict on the way in: a state whose required
/// fields are missing or whose checksum is not a 32-char hex digest is
/// discarded rather than trusted.
pub fn load_state(path: &Path) -> Option<InstallationState> {
    if !path.exists() {
        log_debug!("[State] No state file at {}", path.display());
        return None;
    }
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            log_debug!(
                "[State] Could not read {}: {}. Treating as absent.",
                path.display(),
                err
            );
            return None;
        }
    };
    let state: InstallationState = match serde_json::from_str(&contents) {
        Ok(state) => state,
        Err(err) => {
            log_debug!(
                "[State] {} did not parse ({}). Treating as absent.",
                path.display(),
                err
            );
            return None;
        }
    };
    if !state.has_valid_checksum() {
        log_debug!(
            "[State] {} carries a malformed checksum. Treating as absent.",
            path.display()
        );
        return None;
    }
    log_debug!(
        "[State] Loaded prior state from {}",
        path.display().to_string().cyan()
    );
    Some(state)
}

/// Persists the state file as pretty-printed JSON.
pub fn save_state(state: &InstallationState, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let serialized = serde_json::to_string_pretty(state)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    fs::write(path, serialized)?;
    log_info!(
        "[State] Installation state saved to {}",
        path.display().to_string().cyan()
    );
    Ok(())
}

/// Removes the state file. Returns whether a file was actually deleted;
/// a missing file is success, so cleanup can run unconditionally.
pub fn delete_state(path: &Path) -> io::Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path)?;
    log_info!("[State] Removed state file {}", path.display().to_string().cyan());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::settings::{InstallationMethod, Platform};

    fn sample_state() -> InstallationState {
        InstallationState {
            platform: Platform::Linux,
            installation_method: InstallationMethod::Native,
            version: Some("1.13.9".to_string()),
            install_path: "/snap/bin".to_string(),
            installed_at: "2024-05-01T10:30:45Z".to_string(),
            metanorma_version: Some("1.13.9".to_string()),
            checksum: "9e107d9d372bb6826bd81d3542a419d6".to_string(),
        }
    }

    #[test]
    fn state_survives_a_save_load_cycle() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".setup-metanorma-state.json");

        save_state(&sample_state(), &path).unwrap();
        let loaded = load_state(&path).unwrap();
        assert_eq!(loaded.version.as_deref(), Some("1.13.9"));
        assert_eq!(loaded.platform, Platform::Linux);
    }

    #[test]
    fn missing_file_is_no_state() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_state(&tmp.path().join("nope.json")).is_none());
    }

    #[test]
    fn corrupt_json_is_tolerated_as_no_state() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        fs::write(&path, "{ this is not json").unwrap();
        assert!(load_state(&path).is_none());
    }

    #[test]
    fn truncated_checksum_discards_the_state() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        let mut state = sample_state();
        state.checksum = "abc".to_string();
        fs::write(&path, serde_json::to_string(&state).unwrap()).unwrap();
        assert!(load_state(&path).is_none());
    }

    #[test]
    fn delete_reports_whether_something_was_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        assert!(!delete_state(&path).unwrap());

        save_state(&sample_state(), &path).unwrap();
        assert!(delete_state(&path).unwrap());
        assert!(!path.exists());
    }
}
