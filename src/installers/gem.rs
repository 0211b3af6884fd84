//! Gem-based strategies: bundler installs for containers and Ruby hosts.
//!
//! Three variants share this module: Alpine containers, other Linux
//! containers, and hosts with a user-provisioned Ruby. Most of the work is
//! Gemfile resolution, a strict priority chain in which user intent always
//! beats generated convenience: an explicit Gemfile wins outright, workspace
//! files are respected, and only then do pre-built manifests or synthesis
//! come into play.

use crate::installers::InstallOutcome;
use crate::libs::idempotency::TOOL_COMMAND;
use crate::libs::outputs;
use crate::libs::utilities::assets::{fetch_text, http_agent, FetchOutcome};
use crate::libs::utilities::command::{
    parse_version_token, run_checked, run_checked_env, CommandProbe,
};
use crate::schemas::errors::SetupError;
use crate::schemas::settings::MetanormaSettings;
use crate::versions::fetcher::normalize_base;
use crate::versions::store::VersionStore;
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const GEM_NAME: &str = "metanorma-cli";

/// Pre-baked metanorma container images ship their manifest here.
const CONTAINER_IMAGE_GEMFILE: &str = "/setup/Gemfile";

/// Binstubs land here so the executable resolves on PATH across steps.
pub(crate) const BINSTUB_DIR_NAME: &str = ".metanorma-bin";

const SUGGESTION_LIMIT: usize = 10;

/// Releases up to this version resolve a sassc that no longer compiles
/// against current toolchains; synthesized Gemfiles pin the fixed series.
const SASSC_PIN_CEILING: &str = "1.6.4";
const SASSC_PIN_LINE: &str = "gem \"sassc\", \"~> 2.4.0\"";

/// Where the pre-built, pre-tested Gemfile/lock pairs live.
pub const DEFAULT_PREBUILT_BASE_URL: &str =
    "https://raw.githubusercontent.com/metanorma/prebuilt-gemfiles/main";
pub const PREBUILT_BASE_URL_ENV: &str = "METANORMA_PREBUILT_GEMFILES_URL";

/// Which flavor of gem install is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GemVariant {
    Alpine,
    Container,
    Host,
}

impl fmt::Display for GemVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GemVariant::Alpine => write!(f, "alpine container"),
            GemVariant::Container => write!(f, "container"),
            GemVariant::Host => write!(f, "host"),
        }
    }
}

pub fn install(
    variant: GemVariant,
    settings: &MetanormaSettings,
    store: Option<&VersionStore>,
    probe: &dyn CommandProbe,
) -> Result<InstallOutcome, SetupError> {
    log_info!(
        "[Gem] Installing metanorma {} via bundler ({})",
        settings.version_label().bold(),
        variant
    );

    // 1. Ruby toolchain and native build dependencies.
    prepare_environment(variant, settings, probe)?;

    // 2. Versioned requests must exist in the gemfile feed.
    validate_requested_version(settings, store)?;

    // 3. Decide which Gemfile drives the install.
    let source = HttpPrebuiltLockSource::from_env();
    let resolution = resolve_gemfile(settings, container_image_gemfile(variant).as_deref(), &source)?;
    log_info!("[Gem] Using {}", resolution.description().cyan());

    // 4. Run bundler against it, from the workspace.
    let envs = bundle_env(settings, resolution.gemfile_path());
    let args = bundle_args(settings);
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    run_checked_env("Gem", "bundle", &arg_refs, Some(&settings.workspace), &envs)?;

    // 5. Binstubs make the executable PATH-visible for later workflow steps.
    let binstubs = binstub_dir(settings);
    let binstub_arg = binstubs.display().to_string();
    let binstub_result = run_checked_env(
        "Gem",
        "bundle",
        &["binstubs", GEM_NAME, "--force", "--path", &binstub_arg],
        Some(&settings.workspace),
        &envs,
    );
    match binstub_result {
        Ok(_) => outputs::add_to_path(&binstubs),
        Err(err) => log_warn!(
            "[Gem] Could not generate binstubs: {}. Use `bundle exec {}` instead.",
            err,
            TOOL_COMMAND
        ),
    }

    // 6. Verify the bundle resolves the CLI and read back its version.
    let verify = run_checked_env(
        "Gem",
        "bundle",
        &["exec", TOOL_COMMAND, "--version"],
        Some(&settings.workspace),
        &envs,
    )?;
    let resolved_version = String::from_utf8_lossy(&verify.stdout)
        .lines()
        .find_map(parse_version_token)
        .or_else(|| {
            settings
                .wants_specific_version()
                .then(|| settings.version.clone())
        });
    log_info!(
        "[Gem] metanorma {} ready",
        resolved_version.as_deref().unwrap_or("(unknown)").green()
    );

    // 7. Font refresh is opt-in, so a failure there is a real failure.
    if settings.fontist_update {
        log_info!("[Gem] Updating fontist fonts");
        run_checked_env(
            "Gem",
            "bundle",
            &["exec", "fontist", "update"],
            Some(&settings.workspace),
            &envs,
        )?;
    }

    Ok(InstallOutcome {
        resolved_version,
        install_path: binstubs,
    })
}

/// Removes the binstub directory. Gems themselves stay; reversing a bundler
/// install is not worth the risk of deleting user-managed gem homes.
pub fn cleanup(settings: &MetanormaSettings) {
    let binstubs = binstub_dir(settings);
    if !binstubs.is_dir() {
        return;
    }
    if let Err(err) = fs::remove_dir_all(&binstubs) {
        log_warn!(
            "[Gem] Could not remove binstub directory {}: {}",
            binstubs.display(),
            err
        );
    } else {
        log_debug!("[Gem] Removed binstub directory {}", binstubs.display());
    }
}

fn binstub_dir(settings: &MetanormaSettings) -> PathBuf {
    settings.workspace.join(BINSTUB_DIR_NAME)
}

fn container_image_gemfile(variant: GemVariant) -> Option<PathBuf> {
    if variant == GemVariant::Host {
        return None;
    }
    let path = PathBuf::from(CONTAINER_IMAGE_GEMFILE);
    path.is_file().then_some(path)
}

// ---------------------------------------------------------------------------
// Environment preparation
// ---------------------------------------------------------------------------

fn prepare_environment(
    variant: GemVariant,
    settings: &MetanormaSettings,
    probe: &dyn CommandProbe,
) -> Result<(), SetupError> {
    match variant {
        GemVariant::Host => {
            // Hosts bring their own Ruby; provisioning one here would fight
            // whatever version manager the workflow already uses.
            if !probe.command_exists("ruby") {
                return Err(SetupError::PrerequisiteMissing {
                    what: "Ruby".to_string(),
                    remediation:
                        "Add a Ruby setup step (for example ruby/setup-ruby) before this action."
                            .to_string(),
                });
            }
        }
        GemVariant::Alpine | GemVariant::Container => install_build_dependencies(probe)?,
    }
    ensure_bundler(settings, probe)
}

fn ensure_bundler(
    settings: &MetanormaSettings,
    probe: &dyn CommandProbe,
) -> Result<(), SetupError> {
    if let Some(version) = &settings.bundler_version {
        log_info!("[Gem] Pinning bundler {}", version.cyan());
        run_checked("Gem", "gem", &["install", "bundler", "-v", version])?;
    } else if !probe.command_exists("bundle") {
        log_info!("[Gem] Installing bundler");
        run_checked("Gem", "gem", &["install", "bundler"])?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PackageManager {
    Apt,
    Yum,
    Dnf,
    Apk,
}

impl PackageManager {
    fn binary(self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Yum => "yum",
            PackageManager::Dnf => "dnf",
            PackageManager::Apk => "apk",
        }
    }
}

const APT_PACKAGES: &[&str] = &[
    "ruby",
    "ruby-dev",
    "build-essential",
    "libxml2-dev",
    "libxslt1-dev",
    "librsvg2-bin",
    "default-jre-headless",
    "git",
];

const RPM_PACKAGES: &[&str] = &[
    "ruby",
    "ruby-devel",
    "gcc",
    "gcc-c++",
    "make",
    "redhat-rpm-config",
    "libxml2-devel",
    "libxslt-devel",
    "librsvg2-tools",
    "java-17-openjdk-headless",
    "git",
];

const APK_PACKAGES: &[&str] = &[
    "ruby",
    "ruby-dev",
    "build-base",
    "libxml2-dev",
    "libxslt-dev",
    "rsvg-convert",
    "openjdk17-jre-headless",
    "git",
];

/// Native compilers, dev headers and SVG/JRE tooling the gems build against.
/// Branches on which package manager binary exists rather than on
/// distribution name; distribution detection is unreliable in minimal images.
fn install_build_dependencies(probe: &dyn CommandProbe) -> Result<(), SetupError> {
    let Some(manager) = detect_package_manager(probe) else {
        log_warn!(
            "[Gem] No supported package manager found (apt-get, yum, dnf, apk); assuming build dependencies are present"
        );
        return Ok(());
    };
    log_info!(
        "[Gem] Installing native build dependencies via {}",
        manager.binary().cyan()
    );
    let noninteractive = [("DEBIAN_FRONTEND", "noninteractive".to_string())];
    match manager {
        PackageManager::Apt => {
            run_checked_env("Gem", "apt-get", &["update"], None, &noninteractive)?;
            let mut args = vec!["install", "-y"];
            args.extend_from_slice(APT_PACKAGES);
            run_checked_env("Gem", "apt-get", &args, None, &noninteractive)?;
        }
        PackageManager::Yum | PackageManager::Dnf => {
            let mut args = vec!["install", "-y"];
            args.extend_from_slice(RPM_PACKAGES);
            run_checked("Gem", manager.binary(), &args)?;
        }
        PackageManager::Apk => {
            let mut args = vec!["add", "--no-cache"];
            args.extend_from_slice(APK_PACKAGES);
            run_checked("Gem", "apk", &args)?;
        }
    }
    Ok(())
}

fn detect_package_manager(probe: &dyn CommandProbe) -> Option<PackageManager> {
    const CANDIDATES: &[(&str, PackageManager)] = &[
        ("apt-get", PackageManager::Apt),
        ("yum", PackageManager::Yum),
        ("dnf", PackageManager::Dnf),
        ("apk", PackageManager::Apk),
    ];
    CANDIDATES
        .iter()
        .find(|(binary, _)| probe.command_exists(binary))
        .map(|(_, manager)| *manager)
}

// ---------------------------------------------------------------------------
// Gemfile resolution
// ---------------------------------------------------------------------------

/// A pre-built Gemfile plus its tested lock.
#[derive(Debug, Clone)]
pub(crate) struct PrebuiltLockFiles {
    pub gemfile: String,
    pub lock: String,
}

/// Upstream source of pre-built pairs. Existence is probed by fetching;
/// feed metadata about which versions have pairs can be stale.
pub(crate) trait PrebuiltLockSource {
    fn fetch(&self, version: &str) -> Option<PrebuiltLockFiles>;
}

pub(crate) struct HttpPrebuiltLockSource {
    agent: ureq::Agent,
    base: String,
}

impl HttpPrebuiltLockSource {
    pub(crate) fn from_env() -> Self {
        let base = match env::var(PREBUILT_BASE_URL_ENV) {
            Ok(custom) if !custom.trim().is_empty() => normalize_base(&custom),
            _ => DEFAULT_PREBUILT_BASE_URL.to_string(),
        };
        HttpPrebuiltLockSource {
            agent: http_agent(),
            base,
        }
    }

    fn fetch_one(&self, url: &str) -> Option<String> {
        match fetch_text(&self.agent, url) {
            FetchOutcome::Body(body) => Some(body),
            FetchOutcome::Status(code) => {
                log_debug!("[Gem] {} answered HTTP {}", url, code);
                None
            }
            FetchOutcome::Transport(reason) => {
                log_warn!("[Gem] Could not reach {}: {}", url, reason);
                None
            }
        }
    }
}

impl PrebuiltLockSource for HttpPrebuiltLockSource {
    fn fetch(&self, version: &str) -> Option<PrebuiltLockFiles> {
        let gemfile = self.fetch_one(&format!("{}/v{}/Gemfile", self.base, version))?;
        let lock = self
            .fetch_one(&format!("{}/v{}/Gemfile.lock", self.base, version))
            .or_else(|| {
                self.fetch_one(&format!("{}/v{}/Gemfile.lock.archived", self.base, version))
            })?;
        Some(PrebuiltLockFiles { gemfile, lock })
    }
}

/// How the Gemfile for this run came to be.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum GemfileResolution {
    /// User-supplied path, taken verbatim.
    CustomPath(PathBuf),
    /// Fixed-path manifest baked into the container image.
    ContainerImage(PathBuf),
    /// Gemfile already present in the workspace.
    ExistingGemfile(PathBuf),
    /// Workspace lock already pins the requested version; a matching Gemfile
    /// is written next to it and the lock survives untouched.
    ReusedLock(PathBuf),
    /// Pre-built pair fetched from upstream.
    PrebuiltFetched {
        gemfile: PathBuf,
        replaced_lock: bool,
    },
    /// Nothing else applied; a minimal Gemfile was generated.
    Synthesized(PathBuf),
}

impl GemfileResolution {
    pub(crate) fn gemfile_path(&self) -> &Path {
        match self {
            GemfileResolution::CustomPath(path)
            | GemfileResolution::ContainerImage(path)
            | GemfileResolution::ExistingGemfile(path)
            | GemfileResolution::ReusedLock(path)
            | GemfileResolution::PrebuiltFetched { gemfile: path, .. }
            | GemfileResolution::Synthesized(path) => path,
        }
    }

    fn description(&self) -> String {
        match self {
            GemfileResolution::CustomPath(path) => format!("custom Gemfile {}", path.display()),
            GemfileResolution::ContainerImage(path) => {
                format!("container image Gemfile {}", path.display())
            }
            GemfileResolution::ExistingGemfile(path) => {
                format!("workspace Gemfile {}", path.display())
            }
            GemfileResolution::ReusedLock(_) => {
                "existing Gemfile.lock (already pinned to the requested version)".to_string()
            }
            GemfileResolution::PrebuiltFetched { .. } => {
                "pre-built Gemfile and lock from upstream".to_string()
            }
            GemfileResolution::Synthesized(_) => "synthesized Gemfile".to_string(),
        }
    }
}

/// The resolution chain, first match wins:
///
/// 1. explicit custom Gemfile path
/// 2. container image manifest
/// 3. prebuilt locks disabled: workspace Gemfile or synthesis, nothing else
/// 4. existing workspace Gemfile
/// 5. workspace lock already pinned to the requested version
/// 6. pre-built pair from upstream (replacing a stale lock, loudly)
/// 7. synthesis
pub(crate) fn resolve_gemfile(
    settings: &MetanormaSettings,
    image_gemfile: Option<&Path>,
    source: &dyn PrebuiltLockSource,
) -> Result<GemfileResolution, SetupError> {
    if let Some(custom) = &settings.gemfile {
        if !custom.is_file() {
            return Err(SetupError::PrerequisiteMissing {
                what: format!("custom Gemfile {}", custom.display()),
                remediation: "Check that the gemfile input points at a file inside the checkout."
                    .to_string(),
            });
        }
        return Ok(GemfileResolution::CustomPath(custom.clone()));
    }

    if let Some(image) = image_gemfile {
        return Ok(GemfileResolution::ContainerImage(image.to_path_buf()));
    }

    let workspace_gemfile = settings.workspace.join("Gemfile");
    let workspace_lock = settings.workspace.join("Gemfile.lock");

    if !settings.use_prebuilt_locks {
        if workspace_gemfile.is_file() {
            return Ok(GemfileResolution::ExistingGemfile(workspace_gemfile));
        }
        write_synthesized(settings, &workspace_gemfile)?;
        return Ok(GemfileResolution::Synthesized(workspace_gemfile));
    }

    if workspace_gemfile.is_file() {
        return Ok(GemfileResolution::ExistingGemfile(workspace_gemfile));
    }

    if settings.wants_specific_version() && workspace_lock.is_file() {
        if let Ok(lock_text) = fs::read_to_string(&workspace_lock) {
            if lock_pinned_version(&lock_text).as_deref() == Some(settings.version.as_str()) {
                log_info!(
                    "[Gem] Gemfile.lock already pins {}; reusing it",
                    settings.version.green()
                );
                write_synthesized(settings, &workspace_gemfile)?;
                return Ok(GemfileResolution::ReusedLock(workspace_gemfile));
            }
        }
    }

    if settings.wants_specific_version() {
        if let Some(files) = source.fetch(&settings.version) {
            let replaced_lock = workspace_lock.is_file();
            fs::write(&workspace_gemfile, files.gemfile)?;
            fs::write(&workspace_lock, files.lock)?;
            if replaced_lock {
                // Swapping the lock silently changes the user's dependency
                // resolution; this must never happen quietly.
                log_warn!(
                    "[Gem] Replaced the existing Gemfile.lock with the pre-built lock for {}. Dependency versions may differ from your previous lock.",
                    settings.version.yellow()
                );
            }
            return Ok(GemfileResolution::PrebuiltFetched {
                gemfile: workspace_gemfile,
                replaced_lock,
            });
        }
        log_debug!(
            "[Gem] No pre-built Gemfile pair for {}; synthesizing",
            settings.version
        );
    }

    write_synthesized(settings, &workspace_gemfile)?;
    Ok(GemfileResolution::Synthesized(workspace_gemfile))
}

/// Version a Gemfile.lock pins the CLI to, read from its GEM specs section.
/// Dependency constraint lines (`metanorma-cli (~> 1.14)`) do not count.
pub(crate) fn lock_pinned_version(lock_text: &str) -> Option<String> {
    let prefix = format!("{GEM_NAME} (");
    for line in lock_text.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix(&prefix) {
            if let Some(version) = rest.strip_suffix(')') {
                if semver::Version::parse(version).is_ok() {
                    return Some(version.to_string());
                }
            }
        }
    }
    None
}

fn write_synthesized(settings: &MetanormaSettings, path: &Path) -> Result<(), SetupError> {
    let content = synthesize_gemfile(
        &settings.version,
        &settings.extra_flavors,
        settings.github_packages_token.is_some(),
    );
    fs::write(path, content)?;
    log_debug!("[Gem] Wrote synthesized Gemfile to {}", path.display());
    Ok(())
}

pub(crate) fn synthesize_gemfile(
    version_request: &str,
    extra_flavors: &[String],
    use_github_packages: bool,
) -> String {
    let mut lines = vec!["source \"https://rubygems.org\"".to_string(), String::new()];

    let specific = !version_request.is_empty() && version_request != "latest";
    if specific && needs_sassc_pin(version_request) {
        // The pin must precede the CLI declaration or bundler resolves the
        // broken transitive sassc first.
        lines.push(SASSC_PIN_LINE.to_string());
    }
    if specific {
        lines.push(format!("gem \"{GEM_NAME}\", \"= {version_request}\""));
    } else {
        lines.push(format!("gem \"{GEM_NAME}\""));
    }

    if !extra_flavors.is_empty() {
        lines.push(String::new());
        if use_github_packages {
            lines.push("source \"https://rubygems.pkg.github.com/metanorma\" do".to_string());
            for flavor in extra_flavors {
                lines.push(format!("  gem \"metanorma-{flavor}\""));
            }
            lines.push("end".to_string());
        } else {
            for flavor in extra_flavors {
                lines.push(format!("gem \"metanorma-{flavor}\""));
            }
        }
    }

    let mut content = lines.join("\n");
    content.push('\n');
    content
}

fn needs_sassc_pin(version: &str) -> bool {
    match (
        semver::Version::parse(version),
        semver::Version::parse(SASSC_PIN_CEILING),
    ) {
        (Ok(requested), Ok(ceiling)) => requested <= ceiling,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Bundler invocation
// ---------------------------------------------------------------------------

pub(crate) fn bundle_args(settings: &MetanormaSettings) -> Vec<String> {
    if !settings.wants_specific_version() {
        vec!["update".to_string(), "--all".to_string()]
    } else if settings.bundle_update {
        vec![
            "update".to_string(),
            "--all".to_string(),
            "--except".to_string(),
            GEM_NAME.to_string(),
        ]
    } else {
        vec!["install".to_string()]
    }
}

pub(crate) fn bundle_env(
    settings: &MetanormaSettings,
    gemfile: &Path,
) -> Vec<(&'static str, String)> {
    let mut envs = vec![("BUNDLE_GEMFILE", gemfile.display().to_string())];
    if let Some(token) = &settings.github_packages_token {
        envs.push((
            "BUNDLE_RUBYGEMS__PKG__GITHUB__COM",
            format!("x-access-token:{token}"),
        ));
    }
    envs
}

fn validate_requested_version(
    settings: &MetanormaSettings,
    store: Option<&VersionStore>,
) -> Result<(), SetupError> {
    if !settings.wants_specific_version() {
        return Ok(());
    }
    let Some(store) = store else {
        log_warn!(
            "[Gem] No version metadata available; cannot validate requested version {}",
            settings.version.yellow()
        );
        return Ok(());
    };
    let provider = store.gemfile();
    if provider.is_empty() {
        log_warn!("[Gem] Gemfile feed is empty; skipping version validation");
        return Ok(());
    }
    if provider.is_available(&settings.version) {
        return Ok(());
    }
    Err(SetupError::unknown_version(
        &settings.version,
        "gem",
        provider.recent_versions(SUGGESTION_LIMIT),
    ))
}
