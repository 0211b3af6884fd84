// The 'colored' crate helps us make our console output look pretty and readable.
use colored::Colorize;
// Our custom logging macros to give us nicely formatted (and colored!) output
// for debugging, general information, and errors.
use crate::{log_debug, log_error, log_info, log_warn};
use std::fs;
use std::io;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Locates the tool executable inside an extracted artifact.
///
/// Release archives place the binary either at the archive root or inside a
/// single top-level directory, so the search stops two levels down instead
/// of walking the whole tree. A file wins if it is named after the tool
/// (`metanorma`, `metanorma.exe`) or, failing that, if it carries execute
/// permissions.
pub fn find_tool_executable(dir: &Path, tool: &str) -> Option<PathBuf> {
    log_debug!(
        "[Binary] Searching for '{}' in {}",
        tool,
        dir.to_string_lossy().yellow()
    );

    let exact_names = [tool.to_string(), format!("{tool}.exe")];
    let mut fallback: Option<PathBuf> = None;

    for entry in walkdir::WalkDir::new(dir)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_lowercase();

        if exact_names.iter().any(|name| file_name == *name) {
            log_debug!("[Binary] Found by name: {}", path.display());
            return Some(path.to_path_buf());
        }

        if fallback.is_none() && is_executable_candidate(path, &file_name) {
            fallback = Some(path.to_path_buf());
        }
    }

    match fallback {
        Some(path) => {
            log_debug!("[Binary] Falling back to executable candidate: {}", path.display());
            Some(path)
        }
        None => {
            log_warn!(
                "[Binary] No executable found within {}",
                dir.to_string_lossy().purple()
            );
            None
        }
    }
}

#[cfg(unix)]
fn is_executable_candidate(path: &Path, _file_name: &str) -> bool {
    fs::metadata(path)
        .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_candidate(_path: &Path, file_name: &str) -> bool {
    file_name.ends_with(".exe") || file_name.ends_with(".bat")
}

/// Moves a binary into place, creating parent directories as needed.
///
/// `fs::rename` fails across filesystems (a temp dir and the tool cache are
/// often on different mounts), so a copy-and-remove fallback covers that
/// case.
pub fn move_and_rename_binary(from: &Path, to: &Path) -> io::Result<()> {
    log_debug!(
        "[Binary] Moving {} to {}",
        from.to_string_lossy().yellow(),
        to.to_string_lossy().cyan()
    );

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(from, to) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)?;
            log_info!(
                "[Binary] Copied across filesystems to {}",
                to.to_string_lossy().green()
            );
            Ok(())
        }
        Err(e) => {
            log_error!(
                "[Binary] Failed to move {} to {}: {}",
                from.display(),
                to.display(),
                e
            );
            Err(e)
        }
    }
}

/// Makes a file executable, `chmod +x` style. Archives unpacked through the
/// zip path lose their mode bits, so this runs on every placed binary.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    log_debug!(
        "[Binary] {} is now executable",
        path.to_string_lossy().green()
    );
    Ok(())
}

// Windows derives executability from the extension, nothing to do.
#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn finds_binary_by_exact_name_at_root() {
        let tmp = tempfile::tempdir().unwrap();
        File::create(tmp.path().join("README.md")).unwrap();
        File::create(tmp.path().join("metanorma")).unwrap();

        let found = find_tool_executable(tmp.path(), "metanorma").unwrap();
        assert_eq!(found, tmp.path().join("metanorma"));
    }

    #[test]
    fn finds_binary_one_directory_down() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("metanorma-1.13.9");
        fs::create_dir(&nested).unwrap();
        File::create(nested.join("metanorma.exe"))
            .unwrap()
            .write_all(b"MZ")
            .unwrap();

        let found = find_tool_executable(tmp.path(), "metanorma").unwrap();
        assert_eq!(found, nested.join("metanorma.exe"));
    }

    #[test]
    fn reports_none_when_nothing_matches() {
        let tmp = tempfile::tempdir().unwrap();
        File::create(tmp.path().join("LICENSE")).unwrap();
        assert!(find_tool_executable(tmp.path(), "metanorma").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn falls_back_to_executable_permission_bits() {
        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("run-tool");
        File::create(&script).unwrap().write_all(b"#!/bin/sh\n").unwrap();
        make_executable(&script).unwrap();
        File::create(tmp.path().join("notes.txt")).unwrap();

        let found = find_tool_executable(tmp.path(), "metanorma").unwrap();
        assert_eq!(found, script);
    }
}
