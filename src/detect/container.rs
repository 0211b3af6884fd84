//! Container and distribution detection.
//!
//! Runs once at the start of every invocation. The answers drive two
//! decisions: whether `auto` resolves to the gem strategy (containers get
//! gems, hosts get native packages), and which gem variant handles the
//! distribution's package manager and musl quirks.

use crate::libs::utilities::command::CommandProbe;
use crate::log_debug;
use crate::schemas::container::{ContainerInfo, ContainerType, Distribution};
use crate::schemas::settings::InstallationMethod;
use colored::Colorize;
use std::fs;
use std::path::Path;

/// Inspects the current environment.
///
/// The command probe is injected so tests can simulate images with and
/// without a Ruby runtime.
pub fn detect_environment(probe: &dyn CommandProbe) -> ContainerInfo {
    let container_type = detect_container_type();
    let distribution = detect_distribution();
    let info = ContainerInfo {
        is_container: container_type != ContainerType::None,
        container_type,
        has_ruby: probe.command_exists("ruby"),
        has_metanorma: probe.command_exists("metanorma"),
        distribution,
    };
    log_debug!(
        "[Detect] container: {} ({}), distribution: {}, ruby: {}, metanorma: {}",
        info.is_container,
        info.container_type.to_string().cyan(),
        info.distribution.to_string().cyan(),
        info.has_ruby,
        info.has_metanorma
    );
    info
}

/// Resolves the user's installation method preference to a concrete one.
///
/// Explicit choices are honored as-is. `auto` picks gems inside containers,
/// where snapd does not run, and the platform's native package manager
/// everywhere else.
pub fn resolve_installation_method(
    requested: InstallationMethod,
    container: &ContainerInfo,
) -> InstallationMethod {
    match requested {
        InstallationMethod::Auto => {
            if container.is_container {
                InstallationMethod::Gem
            } else {
                InstallationMethod::Native
            }
        }
        concrete => concrete,
    }
}

fn detect_container_type() -> ContainerType {
    // Marker files first: docker writes /.dockerenv, podman writes
    // /run/.containerenv. Both are cheaper and more reliable than cgroup
    // text.
    if Path::new("/.dockerenv").exists() {
        return ContainerType::Docker;
    }
    if Path::new("/run/.containerenv").exists() {
        return ContainerType::Podman;
    }
    let cgroup = fs::read_to_string("/proc/1/cgroup").unwrap_or_default();
    classify_cgroup(&cgroup)
}

/// Classifies `/proc/1/cgroup` contents by runtime markers.
pub(crate) fn classify_cgroup(contents: &str) -> ContainerType {
    for line in contents.lines() {
        if line.contains("docker") || line.contains("containerd") {
            return ContainerType::Docker;
        }
        if line.contains("podman") || line.contains("libpod") {
            return ContainerType::Podman;
        }
        if line.contains("lxc") {
            return ContainerType::Lxc;
        }
    }
    ContainerType::None
}

fn detect_distribution() -> Distribution {
    if Path::new("/etc/alpine-release").exists() {
        return Distribution::Alpine;
    }
    if let Ok(os_release) = fs::read_to_string("/etc/os-release") {
        if let Some(distribution) = classify_os_release(&os_release) {
            return distribution;
        }
    }
    if Path::new("/etc/debian_version").exists() {
        return Distribution::Debian;
    }
    Distribution::Unknown
}

/// Reads the `ID` and `ID_LIKE` fields of an os-release file.
pub(crate) fn classify_os_release(contents: &str) -> Option<Distribution> {
    let mut id = None;
    let mut id_like = None;
    for line in contents.lines() {
        if let Some(value) = line.strip_prefix("ID=") {
            id = Some(value.trim().trim_matches('"').to_lowercase());
        } else if let Some(value) = line.strip_prefix("ID_LIKE=") {
            id_like = Some(value.trim().trim_matches('"').to_lowercase());
        }
    }

    match id.as_deref() {
        Some("ubuntu") => return Some(Distribution::Ubuntu),
        Some("debian") => return Some(Distribution::Debian),
        Some("alpine") => return Some(Distribution::Alpine),
        _ => {}
    }
    // Derivatives (linuxmint, pop, raspbian) mark their ancestry here.
    if let Some(like) = id_like {
        if like.contains("ubuntu") {
            return Some(Distribution::Ubuntu);
        }
        if like.contains("debian") {
            return Some(Distribution::Debian);
        }
    }
    None
}
