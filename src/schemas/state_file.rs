//! # Installation State File Schema (`.setup-metanorma-state.json`)
//!
//! This module defines the structure of the per-workspace state file that
//! makes repeated runs idempotent. After a successful installation the tool
//! writes one of these next to the checked-out sources; the next run reads
//! it back and decides whether anything actually needs to happen.
//!
//! ## File Location
//!
//! Always `<workspace>/.setup-metanorma-state.json`, where the workspace is
//! the explicit `--workspace` flag, `GITHUB_WORKSPACE`, or the current
//! directory.
//!
//! ## Automatic Management
//!
//! The file is written and deleted by this tool. A corrupt or manually
//! edited file is never an error: loading falls back to "no prior state",
//! which simply means the next run installs from scratch.
//!
//! ## Drift Detection
//!
//! The `checksum` field is an MD5 digest over the configuration fields that
//! affect what gets installed (version, method, platform, channel and
//! friends). Any change to those inputs produces a different digest, which
//! the idempotency check treats as "configuration changed, reinstall".
//!
//! ## Example State File
//! ```json
//! {
//!   "platform": "linux",
//!   "installation_method": "native",
//!   "version": "1.13.9",
//!   "install_path": "/snap/bin",
//!   "installed_at": "2024-05-01T10:30:45.123456789+00:00",
//!   "metanorma_version": "1.13.9",
//!   "checksum": "9e107d9d372bb6826bd81d3542a419d6"
//! }
//! ```

use crate::schemas::settings::{InstallationMethod, Platform};
use serde::{Deserialize, Serialize};

/// Length of a hex-encoded MD5 digest.
pub const CHECKSUM_HEX_LEN: usize = 32;

/// Persistent record of the last successful installation in a workspace.
///
/// `platform`, `installation_method` and `checksum` are required: a file
/// missing any of them fails deserialization and is treated as absent. The
/// remaining fields degrade gracefully because older releases of this tool
/// did not write all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationState {
    pub platform: Platform,
    pub installation_method: InstallationMethod,

    /// Exact version that was requested, `None` when the run asked for
    /// `latest`.
    #[serde(default)]
    pub version: Option<String>,

    /// Where the executable was expected to land.
    #[serde(default)]
    pub install_path: String,

    /// RFC 3339 timestamp of the successful install.
    #[serde(default)]
    pub installed_at: String,

    /// Tool version reported by `metanorma --version` right after install,
    /// when it was parseable.
    #[serde(default)]
    pub metanorma_version: Option<String>,

    /// MD5 digest of the checksum-relevant configuration fields.
    pub checksum: String,
}

impl InstallationState {
    /// Whether the checksum field has the shape an MD5 digest must have.
    /// Anything else means the file was truncated or hand-edited.
    pub fn has_valid_checksum(&self) -> bool {
        self.checksum.len() == CHECKSUM_HEX_LEN
            && self.checksum.chars().all(|c| c.is_ascii_hexdigit())
    }
}
