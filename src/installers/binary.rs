//! Binary release strategy: prebuilt executables from GitHub releases.
//!
//! Downloads the best-matching artifact for this OS/arch, extracts it, and
//! caches the executable in the runner tool cache keyed by version and
//! architecture. A cache hit skips the network entirely.

use crate::installers::InstallOutcome;
use crate::libs::idempotency::TOOL_COMMAND;
use crate::libs::outputs;
use crate::libs::utilities::assets::{download_file, http_agent};
use crate::libs::utilities::binary::{find_tool_executable, make_executable, move_and_rename_binary};
use crate::libs::utilities::compression::extract_artifact;
use crate::libs::utilities::path_helpers::tool_cache_root;
use crate::libs::utilities::platform::{libc_variant, release_arch, release_os};
use crate::schemas::errors::SetupError;
use crate::schemas::settings::MetanormaSettings;
use crate::schemas::versions::BinaryVersionRecord;
use crate::versions::provider::VersionProvider;
use crate::versions::store::VersionStore;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

const SUGGESTION_LIMIT: usize = 10;

pub fn install(
    settings: &MetanormaSettings,
    store: Option<&VersionStore>,
) -> Result<InstallOutcome, SetupError> {
    // 1. This strategy cannot run blind: artifact URLs come from the feed.
    let Some(store) = store else {
        return Err(SetupError::UnsupportedConfiguration {
            message:
                "version metadata is unavailable and the binary installation method requires it; \
                 retry later or choose another installation method"
                    .to_string(),
            available: Vec::new(),
        });
    };
    let provider = store.binary();

    // 2. Resolve the concrete version.
    let version = resolve_version(settings, provider)?;

    // 3. Pick the artifact for this OS, architecture and libc variant.
    let os = release_os();
    let arch = release_arch();
    let variant = libc_variant();
    let artifact = provider
        .best_artifact(&version, os, arch, variant)
        .ok_or_else(|| {
            let filenames: Vec<String> = provider
                .get(&version)
                .map(|record| record.platforms.iter().map(|p| p.filename.clone()).collect())
                .unwrap_or_default();
            SetupError::UnsupportedConfiguration {
                message: format!(
                    "no binary artifact of metanorma {version} matches {os}/{arch}"
                ),
                available: filenames,
            }
        })?;
    log_debug!(
        "[Binary] Selected artifact {} ({})",
        artifact.filename.cyan(),
        artifact.url
    );

    // 4. Cache hit short-circuits download and extraction.
    let cache_dir = cache_dir_for(&tool_cache_root(), &version, arch);
    let cached = cache_dir.join(tool_binary_name());
    if cached.is_file() {
        log_info!(
            "[Binary] metanorma {} already cached at {}",
            version.green(),
            cached.display().to_string().cyan()
        );
        outputs::add_to_path(&cache_dir);
        return Ok(InstallOutcome {
            resolved_version: Some(version),
            install_path: cache_dir,
        });
    }

    // 5. Download into a scratch directory that cleans itself up.
    log_info!(
        "[Binary] Downloading metanorma {} for {}/{}",
        version.green(),
        os,
        arch
    );
    let scratch = tempfile::tempdir()?;
    let downloaded = scratch.path().join(&artifact.filename);
    download_file(&http_agent(), &artifact.url, &downloaded)?;

    // 6. Extract and locate the executable.
    let extracted = extract_artifact(&downloaded, scratch.path(), artifact.format)?;
    let executable = find_tool_executable(&extracted, TOOL_COMMAND).ok_or_else(|| {
        SetupError::UnsupportedConfiguration {
            message: format!(
                "artifact {} does not contain a {} executable",
                artifact.filename, TOOL_COMMAND
            ),
            available: Vec::new(),
        }
    })?;

    // 7. Promote into the tool cache under the canonical name.
    fs::create_dir_all(&cache_dir)?;
    move_and_rename_binary(&executable, &cached)?;
    make_executable(&cached)?;

    // 8. Make it visible to the rest of the job.
    outputs::add_to_path(&cache_dir);
    log_info!(
        "[Binary] metanorma {} installed to {}",
        version.green(),
        cache_dir.display().to_string().cyan()
    );

    Ok(InstallOutcome {
        resolved_version: Some(version),
        install_path: cache_dir,
    })
}

/// Nothing to clean: downloads happen in self-removing scratch directories
/// and cached tools are meant to outlive the run.
pub fn cleanup(_settings: &MetanormaSettings) {
    log_debug!("[Binary] Cached tools persist in the tool cache; nothing to clean");
}

fn resolve_version(
    settings: &MetanormaSettings,
    provider: &VersionProvider<BinaryVersionRecord>,
) -> Result<String, SetupError> {
    if settings.wants_specific_version() {
        if !provider.is_available(&settings.version) {
            return Err(SetupError::unknown_version(
                &settings.version,
                "binary release",
                provider.recent_versions(SUGGESTION_LIMIT),
            ));
        }
        return Ok(settings.version.clone());
    }
    let latest = provider.latest();
    if latest.is_empty() {
        return Err(SetupError::UnsupportedConfiguration {
            message: "the binary release feed lists no versions; cannot resolve 'latest'"
                .to_string(),
            available: Vec::new(),
        });
    }
    Ok(latest.to_string())
}

fn cache_dir_for(cache_root: &Path, version: &str, arch: &str) -> PathBuf {
    cache_root.join(TOOL_COMMAND).join(version).join(arch)
}

fn tool_binary_name() -> String {
    if cfg!(target_os = "windows") {
        format!("{TOOL_COMMAND}.exe")
    } else {
        TOOL_COMMAND.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::settings::{InstallationMethod, Platform, SnapChannel};
    use crate::schemas::versions::{ArtifactFormat, FeedDocument, FeedMetadata, PlatformArtifact};
    use crate::versions::fetcher::PlatformVersionData;

    fn settings(version: &str) -> MetanormaSettings {
        MetanormaSettings {
            version: version.to_string(),
            platform: Platform::Linux,
            installation_method: InstallationMethod::Binary,
            snap_channel: SnapChannel::Stable,
            choco_prerelease: false,
            gemfile: None,
            bundler_version: None,
            fontist_update: false,
            bundle_update: false,
            use_prebuilt_locks: true,
            extra_flavors: Vec::new(),
            github_packages_token: None,
            check_idempotency: true,
            reinstall_on_config_change: true,
            workspace: PathBuf::from("/tmp"),
            install_path: PathBuf::from("/tmp/cache"),
        }
    }

    fn store_with(versions: &[&str]) -> VersionStore {
        let mut data = PlatformVersionData::default();
        data.binary = FeedDocument {
            metadata: FeedMetadata {
                generated_at: None,
                count: versions.len() as u32,
                latest_version: versions.last().copied().unwrap_or_default().to_string(),
            },
            versions: versions
                .iter()
                .map(|v| BinaryVersionRecord {
                    version: v.to_string(),
                    published_at: None,
                    display_name: None,
                    tag_name: Some(format!("v{v}")),
                    platforms: vec![PlatformArtifact {
                        os: "linux".to_string(),
                        arch: "x86_64".to_string(),
                        format: ArtifactFormat::Tgz,
                        filename: format!("metanorma-linux-x86_64-{v}.tgz"),
                        url: format!("https://example.invalid/{v}.tgz"),
                        size: None,
                        variant: None,
                    }],
                })
                .collect(),
        };
        VersionStore::from_data(data)
    }

    #[test]
    fn missing_metadata_is_fatal_for_binary_installs() {
        let err = install(&settings("1.13.9"), None).unwrap_err();
        match err {
            SetupError::UnsupportedConfiguration { message, .. } => {
                assert!(message.contains("binary installation method"));
            }
            other => panic!("expected UnsupportedConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn unknown_version_is_fatal_with_alternatives() {
        let store = store_with(&["1.13.8", "1.13.9"]);
        let err = resolve_version(&settings("9.9.9"), store.binary()).unwrap_err();
        match err {
            SetupError::UnsupportedConfiguration { available, .. } => {
                assert_eq!(available, vec!["1.13.9".to_string(), "1.13.8".to_string()]);
            }
            other => panic!("expected UnsupportedConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn latest_resolves_through_the_provider() {
        let store = store_with(&["1.13.8", "1.13.9"]);
        assert_eq!(
            resolve_version(&settings("latest"), store.binary()).unwrap(),
            "1.13.9"
        );
    }

    #[test]
    fn empty_feed_cannot_resolve_latest() {
        let store = store_with(&[]);
        assert!(resolve_version(&settings(""), store.binary()).is_err());
    }

    #[test]
    fn cache_layout_is_tool_version_arch() {
        assert_eq!(
            cache_dir_for(Path::new("/opt/hostedtoolcache"), "1.13.9", "x86_64"),
            PathBuf::from("/opt/hostedtoolcache/metanorma/1.13.9/x86_64")
        );
    }
}
