// This file implements the `setup-metanorma versions` command. It renders
// the published version feeds for inspection; the data shown is exactly
// what an install run would consume.

use crate::versions::store::VersionStore;
use crate::{log_info, log_warn};
use anyhow::bail;
use colored::Colorize;
use prettytable::{Table, format, row};

/// Feed names accepted by `--platform`.
const SOURCES: [&str; 5] = ["snap", "homebrew", "chocolatey", "gemfile", "binary"];

/// Main entry point for the `versions` command.
///
/// Prints one table per installation source, or only the requested one when
/// `--platform` narrows the listing. Unlike an install run, missing version
/// metadata is fatal here: an empty listing would only mislead.
pub fn run(platform: Option<String>) -> anyhow::Result<()> {
    let filter = parse_filter(platform)?;
    let wanted = |name: &str| filter.as_deref().map_or(true, |f| f == name);

    let Some(store) = VersionStore::initialize() else {
        bail!("version metadata is unavailable; check network access and retry");
    };

    if wanted("snap") {
        let provider = store.snap();
        if provider.is_empty() {
            log_warn!("[Versions] The snap feed is empty");
        } else {
            log_info!(
                "[Versions] snap: {} entries, latest {}",
                provider.record_count(),
                provider.latest().green()
            );
            let mut table = new_table(row![
                "Version",
                "Revision",
                "Architecture",
                "Channel",
                "Published"
            ]);
            for record in provider.records() {
                table.add_row(row![
                    record.version,
                    record.revision,
                    record.architecture,
                    record.channel,
                    record.published_at.as_deref().unwrap_or("-")
                ]);
            }
            table.printstd();
        }
    }

    if wanted("homebrew") {
        let provider = store.homebrew();
        if provider.is_empty() {
            log_warn!("[Versions] The homebrew feed is empty");
        } else {
            log_info!(
                "[Versions] homebrew: {} entries, latest {}",
                provider.record_count(),
                provider.latest().green()
            );
            let mut table = new_table(row!["Version", "Tag", "Published"]);
            for record in provider.records() {
                table.add_row(row![
                    record.version,
                    record.tag_name.as_deref().unwrap_or("-"),
                    record.published_at.as_deref().unwrap_or("-")
                ]);
            }
            table.printstd();
        }
    }

    if wanted("chocolatey") {
        let provider = store.chocolatey();
        if provider.is_empty() {
            log_warn!("[Versions] The chocolatey feed is empty");
        } else {
            log_info!(
                "[Versions] chocolatey: {} entries, latest {}",
                provider.record_count(),
                provider.latest().green()
            );
            let mut table = new_table(row!["Version", "Pre-release", "Published"]);
            for record in provider.records() {
                table.add_row(row![
                    record.version,
                    if record.is_pre_release { "yes" } else { "no" },
                    record.published_at.as_deref().unwrap_or("-")
                ]);
            }
            table.printstd();
        }
    }

    if wanted("gemfile") {
        let provider = store.gemfile();
        if provider.is_empty() {
            log_warn!("[Versions] The gemfile feed is empty");
        } else {
            log_info!(
                "[Versions] gemfile: {} entries, latest {}",
                provider.record_count(),
                provider.latest().green()
            );
            let mut table = new_table(row!["Version", "Prebuilt lock", "Published"]);
            for record in provider.records() {
                table.add_row(row![
                    record.version,
                    if record.gemfile_exists { "yes" } else { "no" },
                    record.published_at.as_deref().unwrap_or("-")
                ]);
            }
            table.printstd();
        }
    }

    if wanted("binary") {
        let provider = store.binary();
        if provider.is_empty() {
            log_warn!("[Versions] The binary feed is empty");
        } else {
            log_info!(
                "[Versions] binary: {} entries, latest {}",
                provider.record_count(),
                provider.latest().green()
            );
            let mut table = new_table(row!["Version", "Artifacts", "Published"]);
            for record in provider.records() {
                let artifacts = record
                    .platforms
                    .iter()
                    .map(|p| format!("{}/{}", p.os, p.arch))
                    .collect::<Vec<_>>()
                    .join(", ");
                table.add_row(row![
                    record.version,
                    artifacts,
                    record.published_at.as_deref().unwrap_or("-")
                ]);
            }
            table.printstd();
        }
    }

    Ok(())
}

/// Parses and validates the `--platform` filter.
fn parse_filter(platform: Option<String>) -> anyhow::Result<Option<String>> {
    match platform {
        Some(name) => {
            let name = name.trim().to_lowercase();
            if !SOURCES.contains(&name.as_str()) {
                bail!(
                    "unknown platform '{}'; valid options are: {}",
                    name,
                    SOURCES.join(", ")
                );
            }
            Ok(Some(name))
        }
        None => Ok(None),
    }
}

/// A table with the house format and the given title row.
fn new_table(titles: prettytable::Row) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(titles);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_feed_names_pass_in_any_case() {
        assert_eq!(
            parse_filter(Some(" Snap ".to_string())).unwrap(),
            Some("snap".to_string())
        );
        assert_eq!(
            parse_filter(Some("HOMEBREW".to_string())).unwrap(),
            Some("homebrew".to_string())
        );
        assert_eq!(parse_filter(None).unwrap(), None);
    }

    #[test]
    fn unknown_feed_names_are_rejected_with_the_valid_set() {
        let err = parse_filter(Some("apt".to_string())).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("apt"));
        assert!(message.contains("snap, homebrew, chocolatey, gemfile, binary"));
    }
}
