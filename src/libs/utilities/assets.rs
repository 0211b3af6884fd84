//! HTTP plumbing: one shared agent, text fetches for version feeds and
//! Gemfiles, and streaming downloads for release archives.

use crate::schemas::errors::SetupError;
use crate::{log_debug, log_error};
use colored::Colorize;
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Identifies this tool in request headers.
const USER_AGENT: &str = concat!("setup-metanorma/", env!("CARGO_PKG_VERSION"));

/// How long any single request may take before we give up on that source.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the shared HTTP agent. All remote traffic goes through one of
/// these so timeout policy lives in a single place.
pub fn http_agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(HTTP_TIMEOUT)
        .build()
}

/// What came back from a text fetch.
///
/// Version feeds treat HTTP error statuses and transport failures very
/// differently (a 404 means "this feed does not exist", a timeout means
/// "the network is down"), so both are surfaced instead of collapsed into
/// one error type.
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx response with the body read to completion.
    Body(String),
    /// Server answered with a non-success status.
    Status(u16),
    /// The request never completed (DNS, connect, timeout, TLS).
    Transport(String),
}

/// Fetches a URL as text.
pub fn fetch_text(agent: &ureq::Agent, url: &str) -> FetchOutcome {
    log_debug!("[Http] GET {}", url.blue());
    match agent.get(url).set("User-Agent", USER_AGENT).call() {
        Ok(response) => match response.into_string() {
            Ok(body) => FetchOutcome::Body(body),
            Err(err) => FetchOutcome::Transport(format!("body read failed: {err}")),
        },
        Err(ureq::Error::Status(code, _)) => {
            log_debug!("[Http] {} answered {}", url.blue(), code.to_string().yellow());
            FetchOutcome::Status(code)
        }
        Err(err) => FetchOutcome::Transport(err.to_string()),
    }
}

/// Downloads a file from `url` into `dest`, streaming straight to disk so
/// large release archives never sit in memory.
pub fn download_file(agent: &ureq::Agent, url: &str, dest: &Path) -> Result<(), SetupError> {
    log_debug!("[Http] Downloading {} to {}", url.blue(), dest.display());
    let response = agent
        .get(url)
        .set("User-Agent", USER_AGENT)
        .call()
        .map_err(|err| SetupError::Download {
            url: url.to_string(),
            reason: err.to_string(),
        })?;

    let mut file = File::create(dest).map_err(|err| {
        log_error!("[Http] Could not create {}: {}", dest.display(), err);
        SetupError::Io(err)
    })?;
    let mut reader = response.into_reader();
    io::copy(&mut reader, &mut file).map_err(|err| SetupError::Download {
        url: url.to_string(),
        reason: format!("write failed: {err}"),
    })?;

    log_debug!(
        "[Http] Download complete: {}",
        dest.to_string_lossy().green()
    );
    Ok(())
}
