//! Platform normalization helpers.
//!
//! Every subsystem that cares about "where are we running" goes through this
//! module so the rest of the crate can talk in one vocabulary: snapd wants
//! `amd64`/`arm64`, release artifacts are published against `linux`/`darwin`/
//! `windows` plus `x86_64`/`aarch64`, and Alpine needs its musl builds.

use crate::log_debug;
use crate::schemas::versions::SnapArchitecture;
use colored::Colorize;
use std::path::Path;

/// Operating system name as release artifacts spell it.
///
/// Rust reports `macos`; the published archives say `darwin`.
pub fn release_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// CPU architecture as release artifacts spell it.
pub fn release_arch() -> &'static str {
    std::env::consts::ARCH
}

/// Architecture in snapd's vocabulary, derived from the running process.
pub fn snap_architecture() -> SnapArchitecture {
    normalize_snap_arch(std::env::consts::ARCH)
}

/// Map an architecture label onto snapd's naming.
///
/// Accepts both Rust-style (`x86_64`, `aarch64`) and Node-style (`x64`,
/// `arm64`) spellings since version feeds historically used the latter.
/// Anything unrecognized falls back to `amd64`, which matches the hosted
/// CI runners this tool targets.
pub fn normalize_snap_arch(arch: &str) -> SnapArchitecture {
    match arch {
        "x64" | "x86_64" | "amd64" => SnapArchitecture::Amd64,
        "arm64" | "aarch64" => SnapArchitecture::Arm64,
        other => {
            log_debug!(
                "[Platform] Unrecognized architecture '{}', assuming amd64",
                other.yellow()
            );
            SnapArchitecture::Amd64
        }
    }
}

/// True when the two OS labels name the same operating system.
pub fn os_matches(artifact_os: &str, runtime_os: &str) -> bool {
    canonical_index(artifact_os, OS_ALIASES)
        .zip(canonical_index(runtime_os, OS_ALIASES))
        .map(|(a, b)| a == b)
        .unwrap_or_else(|| artifact_os.eq_ignore_ascii_case(runtime_os))
}

/// True when the two architecture labels name the same CPU family.
pub fn arch_matches(artifact_arch: &str, runtime_arch: &str) -> bool {
    canonical_index(artifact_arch, ARCH_ALIASES)
        .zip(canonical_index(runtime_arch, ARCH_ALIASES))
        .map(|(a, b)| a == b)
        .unwrap_or_else(|| artifact_arch.eq_ignore_ascii_case(runtime_arch))
}

const OS_ALIASES: &[&[&str]] = &[
    &["linux"],
    &["darwin", "macos", "osx", "apple-darwin"],
    &["windows", "win32", "win64", "win"],
];

const ARCH_ALIASES: &[&[&str]] = &[
    &["x86_64", "amd64", "x64"],
    &["aarch64", "arm64"],
    &["x86", "i386", "i686", "386"],
];

fn canonical_index(name: &str, groups: &[&[&str]]) -> Option<usize> {
    let lower = name.to_lowercase();
    groups.iter().position(|group| group.contains(&lower.as_str()))
}

/// Libc variant tag for release artifact matching.
///
/// Returns `Some("musl")` on musl-based systems (Alpine), `None` elsewhere.
/// Detection is by filesystem probe rather than compile-time target so a
/// gnu-built binary running inside an Alpine container still picks the
/// right artifact.
pub fn libc_variant() -> Option<&'static str> {
    if std::env::consts::OS != "linux" {
        return None;
    }
    if Path::new("/etc/alpine-release").exists() {
        return Some("musl");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_style_x64_maps_to_amd64() {
        assert_eq!(normalize_snap_arch("x64"), SnapArchitecture::Amd64);
    }

    #[test]
    fn rust_style_x86_64_maps_to_amd64() {
        assert_eq!(normalize_snap_arch("x86_64"), SnapArchitecture::Amd64);
    }

    #[test]
    fn arm64_spellings_map_to_arm64() {
        assert_eq!(normalize_snap_arch("arm64"), SnapArchitecture::Arm64);
        assert_eq!(normalize_snap_arch("aarch64"), SnapArchitecture::Arm64);
    }

    #[test]
    fn unknown_arch_defaults_to_amd64() {
        assert_eq!(normalize_snap_arch("riscv64"), SnapArchitecture::Amd64);
    }

    #[test]
    fn os_aliases_line_up() {
        assert!(os_matches("darwin", "macos"));
        assert!(os_matches("Linux", "linux"));
        assert!(!os_matches("windows", "linux"));
    }

    #[test]
    fn arch_aliases_line_up() {
        assert!(arch_matches("amd64", "x86_64"));
        assert!(arch_matches("arm64", "aarch64"));
        assert!(!arch_matches("x86_64", "aarch64"));
    }
}
