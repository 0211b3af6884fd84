//! Resolved run configuration.
//!
//! `MetanormaSettings` is the single source of truth the orchestrator hands
//! to detection, idempotency and the installation strategies. It is built
//! once per run from CLI flags and environment, with `auto` preferences
//! already resolved to a concrete installation method.

use crate::schemas::errors::SetupError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Operating system we are installing onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    MacOS,
    Linux,
    Windows,
}

impl Platform {
    /// Platform of the running process, `None` on operating systems this
    /// tool does not support.
    pub fn current() -> Option<Platform> {
        match std::env::consts::OS {
            "macos" => Some(Platform::MacOS),
            "linux" => Some(Platform::Linux),
            "windows" => Some(Platform::Windows),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::MacOS => write!(f, "macos"),
            Platform::Linux => write!(f, "linux"),
            Platform::Windows => write!(f, "windows"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "macos" | "darwin" | "osx" => Ok(Platform::MacOS),
            "linux" => Ok(Platform::Linux),
            "windows" | "win32" => Ok(Platform::Windows),
            other => Err(format!(
                "Invalid platform: '{other}'. Valid options are: macos, linux, windows"
            )),
        }
    }
}

/// How the tool should be installed.
///
/// `Auto` only exists as a user preference; by the time settings are
/// assembled it has been resolved to one of the concrete methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallationMethod {
    Auto,
    Native,
    Gem,
    Binary,
}

impl fmt::Display for InstallationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallationMethod::Auto => write!(f, "auto"),
            InstallationMethod::Native => write!(f, "native"),
            InstallationMethod::Gem => write!(f, "gem"),
            InstallationMethod::Binary => write!(f, "binary"),
        }
    }
}

impl FromStr for InstallationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(InstallationMethod::Auto),
            "native" => Ok(InstallationMethod::Native),
            "gem" | "gemfile" => Ok(InstallationMethod::Gem),
            "binary" => Ok(InstallationMethod::Binary),
            other => Err(format!(
                "Invalid installation method: '{other}'. Valid options are: auto, native, gem, binary"
            )),
        }
    }
}

/// Snap store channel to install from when no revision pin applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapChannel {
    #[default]
    Stable,
    Candidate,
    Beta,
    Edge,
}

impl fmt::Display for SnapChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapChannel::Stable => write!(f, "stable"),
            SnapChannel::Candidate => write!(f, "candidate"),
            SnapChannel::Beta => write!(f, "beta"),
            SnapChannel::Edge => write!(f, "edge"),
        }
    }
}

impl FromStr for SnapChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stable" => Ok(SnapChannel::Stable),
            "candidate" => Ok(SnapChannel::Candidate),
            "beta" => Ok(SnapChannel::Beta),
            "edge" => Ok(SnapChannel::Edge),
            other => Err(format!(
                "Invalid snap channel: '{other}'. Valid options are: stable, candidate, beta, edge"
            )),
        }
    }
}

/// Everything a single installation run needs to know.
#[derive(Debug, Clone)]
pub struct MetanormaSettings {
    /// Requested version: empty or `latest` for the newest, otherwise an
    /// exact version string.
    pub version: String,
    pub platform: Platform,
    /// Concrete method for this run, never `Auto`.
    pub installation_method: InstallationMethod,
    pub snap_channel: SnapChannel,
    pub choco_prerelease: bool,
    /// User-supplied Gemfile path, used verbatim when present.
    pub gemfile: Option<PathBuf>,
    pub bundler_version: Option<String>,
    pub fontist_update: bool,
    /// Refresh all dependencies except the tool itself after install.
    pub bundle_update: bool,
    /// Whether pre-built Gemfile.lock pairs may be fetched from upstream.
    pub use_prebuilt_locks: bool,
    /// Additional flavor gems (`ieee`, `itu`, ...) for synthesized Gemfiles.
    pub extra_flavors: Vec<String>,
    pub github_packages_token: Option<String>,
    /// When false, every run reinstalls unconditionally.
    pub check_idempotency: bool,
    /// When false, configuration drift is reported but does not trigger a
    /// reinstall.
    pub reinstall_on_config_change: bool,
    pub workspace: PathBuf,
    /// Where the executable is expected to land.
    pub install_path: PathBuf,
}

impl MetanormaSettings {
    /// True when an exact version was requested (not empty, not `latest`).
    pub fn wants_specific_version(&self) -> bool {
        !self.version.is_empty() && self.version != "latest"
    }

    /// Human-facing label for the version request.
    pub fn version_label(&self) -> &str {
        if self.version.is_empty() {
            "latest"
        } else {
            &self.version
        }
    }
}

/// Validates the raw version request before anything touches the network.
///
/// Accepts the empty string, the literal `latest`, or an exact semantic
/// version (build metadata like `+rev276` allowed).
pub fn validate_version_request(version: &str) -> Result<(), SetupError> {
    if version.is_empty() || version == "latest" {
        return Ok(());
    }
    semver::Version::parse(version)
        .map(|_| ())
        .map_err(|err| SetupError::UnsupportedConfiguration {
            message: format!(
                "invalid version '{version}': {err}. Expected 'latest' or an exact version like 1.13.9"
            ),
            available: Vec::new(),
        })
}
