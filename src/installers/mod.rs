// This module acts as the central hub for the installation strategies,
// exposing one submodule per strategy family and the factory that decides
// which of them handles a given run.
//
// Strategy selection is a pure function over (platform, installation
// method, container facts) so it can be tested exhaustively; only the
// dispatch at the bottom touches the outside world.

use crate::libs::utilities::command::CommandProbe;
use crate::libs::utilities::path_helpers::tool_cache_root;
use crate::log_info;
use crate::schemas::container::{ContainerInfo, Distribution};
use crate::schemas::errors::SetupError;
use crate::schemas::settings::{InstallationMethod, MetanormaSettings, Platform};
use crate::versions::store::VersionStore;
use colored::Colorize;
use std::fmt;
use std::path::{Path, PathBuf};

/// snapd installs on Linux hosts.
pub(crate) mod snap;

/// Homebrew installs on macOS hosts.
pub(crate) mod brew;

/// Chocolatey installs on Windows hosts.
pub(crate) mod choco;

/// Ruby-gem installs, host and container variants.
pub(crate) mod gem;

/// Standalone binary releases with a tool cache.
pub(crate) mod binary;

/// Concrete strategy chosen for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallerKind {
    /// snapd on Linux hosts.
    Snap,
    /// Homebrew on macOS hosts.
    Brew,
    /// Chocolatey on Windows hosts.
    Choco,
    /// Gems inside an Alpine (musl) container.
    AlpineGem,
    /// Gems inside a glibc container (Ubuntu, Debian, anything apt/yum-ish).
    ContainerGem,
    /// Gems on a host with an externally provisioned Ruby.
    HostGem,
    /// Downloaded release binary.
    Binary,
}

impl fmt::Display for InstallerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallerKind::Snap => write!(f, "snap"),
            InstallerKind::Brew => write!(f, "homebrew"),
            InstallerKind::Choco => write!(f, "chocolatey"),
            InstallerKind::AlpineGem => write!(f, "gem (alpine container)"),
            InstallerKind::ContainerGem => write!(f, "gem (container)"),
            InstallerKind::HostGem => write!(f, "gem (host)"),
            InstallerKind::Binary => write!(f, "binary release"),
        }
    }
}

impl InstallerKind {
    /// The installation method a strategy belongs to, as recorded in state
    /// and reported in outputs.
    pub fn method(&self) -> InstallationMethod {
        match self {
            InstallerKind::Snap | InstallerKind::Brew | InstallerKind::Choco => {
                InstallationMethod::Native
            }
            InstallerKind::AlpineGem | InstallerKind::ContainerGem | InstallerKind::HostGem => {
                InstallationMethod::Gem
            }
            InstallerKind::Binary => InstallationMethod::Binary,
        }
    }
}

/// What a successful installation reports back.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    /// Concrete version that ended up installed, when the strategy could
    /// determine one.
    pub resolved_version: Option<String>,
    /// Directory the executable landed in (or is served from).
    pub install_path: PathBuf,
}

/// Picks the strategy for a run.
///
/// `Auto` is normally resolved before settings are assembled, but the
/// table stays total: an unresolved `Auto` behaves exactly like the
/// resolver would have (containers get gems, hosts go native).
pub fn select_installer(
    platform: Platform,
    method: InstallationMethod,
    container: &ContainerInfo,
) -> InstallerKind {
    match method {
        InstallationMethod::Binary => InstallerKind::Binary,
        InstallationMethod::Native => native_for(platform),
        InstallationMethod::Gem => gem_for(container),
        InstallationMethod::Auto => {
            if container.is_container {
                gem_for(container)
            } else {
                native_for(platform)
            }
        }
    }
}

fn native_for(platform: Platform) -> InstallerKind {
    match platform {
        Platform::Linux => InstallerKind::Snap,
        Platform::MacOS => InstallerKind::Brew,
        Platform::Windows => InstallerKind::Choco,
    }
}

fn gem_for(container: &ContainerInfo) -> InstallerKind {
    if !container.is_container {
        return InstallerKind::HostGem;
    }
    match container.distribution {
        Distribution::Alpine => InstallerKind::AlpineGem,
        _ => InstallerKind::ContainerGem,
    }
}

/// Directory a strategy is expected to place the executable in.
///
/// Used when settings are assembled, before anything has run, so the
/// idempotency record always carries a plausible location. Strategies that
/// resolve the real directory at install time (Homebrew's prefix, the
/// Chocolatey root) overwrite it in their outcome.
pub fn default_install_path(kind: InstallerKind, workspace: &Path) -> PathBuf {
    match kind {
        InstallerKind::Snap => PathBuf::from(snap::SNAP_BIN_DIR),
        InstallerKind::Brew => {
            if cfg!(target_arch = "aarch64") {
                PathBuf::from("/opt/homebrew/bin")
            } else {
                PathBuf::from("/usr/local/bin")
            }
        }
        InstallerKind::Choco => PathBuf::from(r"C:\ProgramData\chocolatey\bin"),
        InstallerKind::AlpineGem | InstallerKind::ContainerGem | InstallerKind::HostGem => {
            workspace.join(gem::BINSTUB_DIR_NAME)
        }
        InstallerKind::Binary => tool_cache_root(),
    }
}

/// Runs the chosen strategy.
pub fn run_installer(
    kind: InstallerKind,
    settings: &MetanormaSettings,
    store: Option<&VersionStore>,
    probe: &dyn CommandProbe,
) -> Result<InstallOutcome, SetupError> {
    log_info!(
        "[Installer] Installing metanorma {} via {}",
        settings.version_label().green(),
        kind.to_string().cyan()
    );
    match kind {
        InstallerKind::Snap => snap::install(settings, store),
        InstallerKind::Brew => brew::install(settings, store),
        InstallerKind::Choco => choco::install(settings, store),
        InstallerKind::AlpineGem => gem::install(gem::GemVariant::Alpine, settings, store, probe),
        InstallerKind::ContainerGem => {
            gem::install(gem::GemVariant::Container, settings, store, probe)
        }
        InstallerKind::HostGem => gem::install(gem::GemVariant::Host, settings, store, probe),
        InstallerKind::Binary => binary::install(settings, store),
    }
}

/// Best-effort removal of anything a strategy left behind that is not the
/// installation itself (staging files, partial downloads). Never reverses
/// an install.
pub fn run_cleanup(kind: InstallerKind, settings: &MetanormaSettings) {
    match kind {
        InstallerKind::Binary => binary::cleanup(settings),
        InstallerKind::AlpineGem | InstallerKind::ContainerGem | InstallerKind::HostGem => {
            gem::cleanup(settings)
        }
        // Package managers manage their own staging.
        InstallerKind::Snap | InstallerKind::Brew | InstallerKind::Choco => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::container::ContainerType;

    fn container(distribution: Distribution) -> ContainerInfo {
        ContainerInfo {
            is_container: true,
            container_type: ContainerType::Docker,
            has_ruby: false,
            has_metanorma: false,
            distribution,
        }
    }

    #[test]
    fn native_maps_each_platform_to_its_package_manager() {
        let host = ContainerInfo::host(false, false);
        assert_eq!(
            select_installer(Platform::Linux, InstallationMethod::Native, &host),
            InstallerKind::Snap
        );
        assert_eq!(
            select_installer(Platform::MacOS, InstallationMethod::Native, &host),
            InstallerKind::Brew
        );
        assert_eq!(
            select_installer(Platform::Windows, InstallationMethod::Native, &host),
            InstallerKind::Choco
        );
    }

    #[test]
    fn auto_in_an_alpine_container_selects_alpine_gems() {
        assert_eq!(
            select_installer(
                Platform::Linux,
                InstallationMethod::Auto,
                &container(Distribution::Alpine)
            ),
            InstallerKind::AlpineGem
        );
    }

    #[test]
    fn auto_in_a_debian_container_selects_container_gems() {
        for distribution in [Distribution::Ubuntu, Distribution::Debian, Distribution::Unknown] {
            assert_eq!(
                select_installer(
                    Platform::Linux,
                    InstallationMethod::Auto,
                    &container(distribution)
                ),
                InstallerKind::ContainerGem
            );
        }
    }

    #[test]
    fn auto_on_a_host_selects_native() {
        assert_eq!(
            select_installer(
                Platform::Linux,
                InstallationMethod::Auto,
                &ContainerInfo::host(true, false)
            ),
            InstallerKind::Snap
        );
    }

    #[test]
    fn explicit_gem_on_a_host_selects_host_gems() {
        assert_eq!(
            select_installer(
                Platform::MacOS,
                InstallationMethod::Gem,
                &ContainerInfo::host(true, false)
            ),
            InstallerKind::HostGem
        );
    }

    #[test]
    fn explicit_binary_wins_everywhere() {
        assert_eq!(
            select_installer(
                Platform::Linux,
                InstallationMethod::Binary,
                &container(Distribution::Alpine)
            ),
            InstallerKind::Binary
        );
        assert_eq!(
            select_installer(
                Platform::Windows,
                InstallationMethod::Binary,
                &ContainerInfo::host(false, false)
            ),
            InstallerKind::Binary
        );
    }

    #[test]
    fn strategies_report_their_method() {
        assert_eq!(InstallerKind::Snap.method(), InstallationMethod::Native);
        assert_eq!(InstallerKind::AlpineGem.method(), InstallationMethod::Gem);
        assert_eq!(InstallerKind::Binary.method(), InstallationMethod::Binary);
    }

    #[test]
    fn gem_strategies_default_to_the_workspace_binstub_dir() {
        let workspace = Path::new("/work");
        for kind in [
            InstallerKind::AlpineGem,
            InstallerKind::ContainerGem,
            InstallerKind::HostGem,
        ] {
            assert_eq!(
                default_install_path(kind, workspace),
                PathBuf::from("/work/.metanorma-bin")
            );
        }
    }

    #[test]
    fn snap_defaults_to_the_system_snap_dir() {
        assert_eq!(
            default_install_path(InstallerKind::Snap, Path::new("/work")),
            PathBuf::from("/snap/bin")
        );
    }
}
