//! Subprocess plumbing shared by every installation strategy.
//!
//! Two concerns live here: probing whether a command exists on `PATH`
//! (injected as a trait so idempotency and container detection can be
//! unit-tested without a real shell), and running external commands with
//! captured output plus uniform error mapping.

use crate::log_debug;
use crate::schemas::errors::SetupError;
use colored::Colorize;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Capability to ask the system about commands on `PATH`.
///
/// Production code uses [`SystemCommandProbe`]; tests substitute a fixture
/// that answers from a fixed table.
pub trait CommandProbe {
    /// Whether `command` resolves on the current `PATH`.
    fn command_exists(&self, command: &str) -> bool;

    /// First line of `<command> <flag>` output, if the command runs at all.
    fn version_output(&self, command: &str, flag: &str) -> Option<String>;
}

/// Probes the real system shell.
pub struct SystemCommandProbe;

impl CommandProbe for SystemCommandProbe {
    fn command_exists(&self, command: &str) -> bool {
        // Two independent probes: the shell builtin first, then the external
        // `which`. Minimal container images sometimes ship one but not the
        // other.
        if probe_via_shell(command) {
            return true;
        }
        if probe_via_which(command) {
            return true;
        }
        log_debug!("[Command] '{}' not found on PATH", command.yellow());
        false
    }

    fn version_output(&self, command: &str, flag: &str) -> Option<String> {
        let output = Command::new(command)
            .arg(flag)
            .stdin(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout.lines().next().map(|line| line.trim().to_string())
    }
}

fn probe_via_shell(command: &str) -> bool {
    if cfg!(target_os = "windows") {
        return Command::new("where")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);
    }
    Command::new("sh")
        .args(["-c", &format!("command -v {command}")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn probe_via_which(command: &str) -> bool {
    Command::new("which")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Pull out the first token that looks like a version number (`X.Y.Z`,
/// optionally with a build suffix) from a `--version` line.
///
/// Tool output varies across releases (`metanorma 1.13.9`, `Metanorma CLI
/// v1.13.9+rev276`), so this scans tokens instead of fixing a format.
pub fn parse_version_token(line: &str) -> Option<String> {
    line.split_whitespace()
        .map(|token| token.trim_start_matches('v'))
        .find(|token| {
            let core = token.split('+').next().unwrap_or(token);
            let mut parts = 0;
            for part in core.split('.') {
                if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                    return false;
                }
                parts += 1;
            }
            parts >= 2
        })
        .map(|token| token.to_string())
}

/// Runs `program` with `args`, capturing output.
///
/// Spawn failures (binary missing, permission denied) map to a launch error
/// carrying the full command line; callers judge the exit status themselves
/// because some tools (chocolatey) signal success with non-zero codes.
pub fn run_captured(component: &str, program: &str, args: &[&str]) -> Result<Output, SetupError> {
    run_captured_env(component, program, args, None, &[])
}

/// Like [`run_captured`], with a working directory and extra environment
/// variables. Bundler invocations need both: they run inside the workspace
/// with `BUNDLE_GEMFILE` pointed at the resolved manifest.
pub fn run_captured_env(
    component: &str,
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    envs: &[(&str, String)],
) -> Result<Output, SetupError> {
    let rendered = render_command(program, args);
    log_debug!("[{}] Executing: {}", component, rendered.cyan());
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    for (key, value) in envs {
        command.env(key, value);
    }
    command
        .output()
        .map_err(|source| SetupError::CommandLaunch {
            command: rendered,
            source,
        })
}

/// Runs a command and requires a zero exit status.
pub fn run_checked(component: &str, program: &str, args: &[&str]) -> Result<Output, SetupError> {
    run_checked_env(component, program, args, None, &[])
}

/// [`run_checked`] with working directory and environment control.
pub fn run_checked_env(
    component: &str,
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    envs: &[(&str, String)],
) -> Result<Output, SetupError> {
    let output = run_captured_env(component, program, args, cwd, envs)?;
    if output.status.success() {
        return Ok(output);
    }
    Err(SetupError::SubprocessFailure {
        command: render_command(program, args),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Joins a program and its arguments for log and error messages.
pub fn render_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        return program.to_string();
    }
    format!("{} {}", program, args.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_version_line() {
        assert_eq!(
            parse_version_token("metanorma 1.13.9"),
            Some("1.13.9".to_string())
        );
    }

    #[test]
    fn parses_v_prefixed_version_with_build_suffix() {
        assert_eq!(
            parse_version_token("Metanorma CLI v1.13.9+rev276"),
            Some("1.13.9+rev276".to_string())
        );
    }

    #[test]
    fn rejects_lines_without_a_version() {
        assert_eq!(parse_version_token("command not found"), None);
        assert_eq!(parse_version_token(""), None);
    }

    #[test]
    fn renders_command_lines_for_errors() {
        assert_eq!(
            render_command("snap", &["install", "metanorma"]),
            "snap install metanorma"
        );
        assert_eq!(render_command("brew", &[]), "brew");
    }
}
