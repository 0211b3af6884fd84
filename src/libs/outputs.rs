//! Workflow-facing side channels.
//!
//! GitHub Actions communicates through files named by environment
//! variables: appending `name=value` to `$GITHUB_OUTPUT` publishes a step
//! output, appending a directory to `$GITHUB_PATH` prepends it to `PATH`
//! for subsequent steps. Both are best-effort here: when the variables are
//! absent (local runs), the values are logged instead so nothing is lost.

use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Publishes a step output.
pub fn set_output(name: &str, value: &str) {
    let value = sanitize(value);
    match env::var("GITHUB_OUTPUT") {
        Ok(file) if !file.trim().is_empty() => {
            if let Err(err) = append_line(Path::new(&file), &format!("{name}={value}")) {
                log_warn!("[Outputs] Could not write output '{}': {}", name, err);
            } else {
                log_debug!("[Outputs] {}={}", name.cyan(), value);
            }
        }
        _ => log_info!("[Outputs] {}={} (GITHUB_OUTPUT not set)", name.cyan(), value),
    }
}

/// Prepends a directory to `PATH` for subsequent workflow steps.
pub fn add_to_path(dir: &Path) {
    match env::var("GITHUB_PATH") {
        Ok(file) if !file.trim().is_empty() => {
            if let Err(err) = append_line(Path::new(&file), &dir.to_string_lossy()) {
                log_warn!(
                    "[Outputs] Could not register {} on PATH: {}",
                    dir.display(),
                    err
                );
            } else {
                log_info!(
                    "[Outputs] {} will be on PATH for subsequent steps",
                    dir.display().to_string().cyan()
                );
            }
        }
        _ => log_warn!(
            "[Outputs] GITHUB_PATH not set. Add {} to PATH manually to use the tool.",
            dir.display().to_string().yellow()
        ),
    }
}

fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

// The name=value format is line-oriented; embedded newlines would corrupt
// the output file.
fn sanitize(value: &str) -> String {
    if value.contains('\n') || value.contains('\r') {
        value.replace(['\n', '\r'], " ")
    } else {
        value.to_string()
    }
}
