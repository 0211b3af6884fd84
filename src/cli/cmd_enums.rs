use crate::schemas::settings::{InstallationMethod, SnapChannel};
use clap::{Args, Parser, Subcommand};

/// Defines the command-line interface (CLI) for 'setup-metanorma'.
/// `#[derive(Parser)]` automatically generates argument parsing code via `clap`.
#[derive(Parser)]
#[command(name = "setup-metanorma")]
#[command(about = "Install and pin the Metanorma toolchain on CI hosts and containers", long_about = None)]
pub struct Cli {
    /// Enables detailed debug output for troubleshooting and development.
    #[arg(short, long, global = true)]
    pub(crate) debug: bool,

    /// Defines available subcommands for 'setup-metanorma'.
    #[command(subcommand)]
    pub(crate) command: Commands,
}

/// Enumerates all supported subcommands with their specific arguments and options.
/// Each variant represents a distinct responsibility of the setup-metanorma binary.
#[derive(Subcommand)]
pub enum Commands {
    /// Show the current version of the tool.
    Version,
    /// Installs Metanorma using the best strategy for the current environment.
    /// This is the primary command; its options map one-to-one onto the action's inputs.
    Install(InstallArgs),
    /// Removes recorded installation state and workspace artifacts from a previous run.
    Cleanup {
        /// Workspace directory whose installation state should be cleared.
        #[arg(long, env = "GITHUB_WORKSPACE")]
        workspace: Option<String>,
    },
    /// Lists the published Metanorma versions for every installation source.
    Versions {
        /// Restrict the listing to one source [possible values: snap, homebrew, chocolatey, gemfile, binary].
        #[arg(long)]
        platform: Option<String>,
    },
}

/// Arguments of the `install` subcommand.
///
/// Every option falls back to an environment variable, so a CI workflow can
/// drive the binary without assembling a command line: GitHub Actions exposes
/// action inputs as `INPUT_*` variables.
#[derive(Args)]
pub struct InstallArgs {
    /// Metanorma version to install (for example "1.13.9").
    /// Empty or "latest" installs the newest published release.
    #[arg(long, env = "INPUT_VERSION", default_value = "")]
    pub(crate) version: String,

    /// Installation method [possible values: auto, native, gem, binary].
    /// 'auto' resolves to gems inside containers and to the platform's
    /// native package manager on hosts.
    #[arg(long, env = "INPUT_INSTALLATION_METHOD", default_value = "auto")]
    pub(crate) installation_method: InstallationMethod,

    /// Snap channel to track when no exact version is requested
    /// [possible values: stable, candidate, beta, edge].
    #[arg(long, env = "INPUT_SNAP_CHANNEL", default_value = "stable")]
    pub(crate) snap_channel: SnapChannel,

    /// Allow pre-release packages when installing through Chocolatey.
    #[arg(long, env = "INPUT_CHOCO_PRERELEASE")]
    pub(crate) choco_prerelease: bool,

    /// Path to a custom Gemfile used instead of a synthesized one
    /// ('~' expands to the home directory).
    #[arg(long, env = "INPUT_GEMFILE")]
    pub(crate) gemfile: Option<String>,

    /// Exact Bundler version to install before 'bundle install' runs.
    #[arg(long, env = "INPUT_BUNDLER_VERSION")]
    pub(crate) bundler_version: Option<String>,

    /// Run 'fontist update' after a gem-based installation.
    #[arg(long, env = "INPUT_FONTIST_UPDATE")]
    pub(crate) fontist_update: bool,

    /// Refresh all bundled dependencies except metanorma-cli itself.
    #[arg(long, env = "INPUT_BUNDLE_UPDATE")]
    pub(crate) bundle_update: bool,

    /// Never fetch pre-built Gemfile.lock pairs; resolve dependencies locally.
    #[arg(long, env = "INPUT_NO_PREBUILT_LOCKS")]
    pub(crate) no_prebuilt_locks: bool,

    /// Additional flavor gems to install alongside metanorma-cli, separated
    /// by spaces (for example "ieee itu nist").
    #[arg(long, env = "INPUT_EXTRA_FLAVORS")]
    pub(crate) extra_flavors: Option<String>,

    /// Token for rubygems.pkg.github.com, enabling pre-release flavor gems.
    #[arg(long, env = "INPUT_GITHUB_PACKAGES_TOKEN")]
    pub(crate) github_packages_token: Option<String>,

    /// Skip the idempotency check and reinstall unconditionally.
    #[arg(long, env = "INPUT_NO_IDEMPOTENCY_CHECK")]
    pub(crate) no_idempotency_check: bool,

    /// Keep an existing installation even when its recorded configuration
    /// differs from the current inputs.
    #[arg(long, env = "INPUT_NO_REINSTALL_ON_CONFIG_CHANGE")]
    pub(crate) no_reinstall_on_config_change: bool,

    /// Workspace directory where installation state and Gemfiles live.
    #[arg(long, env = "GITHUB_WORKSPACE")]
    pub(crate) workspace: Option<String>,
}
