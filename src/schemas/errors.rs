//! Error taxonomy for installation runs.
//!
//! Strategies return these typed errors so the orchestrator can print
//! actionable guidance instead of a bare failure: unsupported requests list
//! what *is* available, missing prerequisites say how to provision them,
//! and subprocess failures carry the exact command line plus stderr.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    /// The request cannot be satisfied on this platform (unknown version,
    /// no matching artifact, no feed data). `available` holds nearby valid
    /// choices for the error message.
    #[error("{message}")]
    UnsupportedConfiguration {
        message: String,
        available: Vec<String>,
    },

    /// Something the strategy depends on is absent and we will not install
    /// it ourselves.
    #[error("{what} is not available. {remediation}")]
    PrerequisiteMissing { what: String, remediation: String },

    /// An external command ran but reported failure.
    #[error("`{command}` failed{}", format_exit(.code))]
    SubprocessFailure {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// An external command could not be started at all.
    #[error("failed to launch `{command}`: {source}")]
    CommandLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A download did not complete.
    #[error("download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SetupError {
    /// Builds the "version not available" error, folding the most recent
    /// valid versions into the message so users can correct their workflow
    /// without hunting through the feeds.
    pub fn unknown_version(requested: &str, source: &str, recent: Vec<String>) -> Self {
        let message = if recent.is_empty() {
            format!("version '{requested}' is not available via {source}")
        } else {
            format!(
                "version '{requested}' is not available via {source}. Recent versions: {}",
                recent.join(", ")
            )
        };
        SetupError::UnsupportedConfiguration {
            message,
            available: recent,
        }
    }
}

fn format_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => " (terminated by signal)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_version_lists_recent_choices() {
        let err = SetupError::unknown_version(
            "9.9.9",
            "snap",
            vec!["1.13.9".to_string(), "1.13.8".to_string()],
        );
        let text = err.to_string();
        assert!(text.contains("9.9.9"));
        assert!(text.contains("1.13.9, 1.13.8"));
    }

    #[test]
    fn subprocess_failures_name_the_command() {
        let err = SetupError::SubprocessFailure {
            command: "snap install metanorma".to_string(),
            code: Some(10),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "`snap install metanorma` failed with exit code 10");
    }
}
