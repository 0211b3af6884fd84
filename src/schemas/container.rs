//! Container environment description.
//!
//! Computed fresh at the start of every run by the detection module and
//! never persisted: the same workspace state file may be reused across jobs
//! that run on different images.

use std::fmt;

/// Container runtime the process is executing under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerType {
    Docker,
    Podman,
    Lxc,
    None,
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerType::Docker => write!(f, "docker"),
            ContainerType::Podman => write!(f, "podman"),
            ContainerType::Lxc => write!(f, "lxc"),
            ContainerType::None => write!(f, "none"),
        }
    }
}

/// Linux distribution family, used to pick the gem strategy variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    Ubuntu,
    Debian,
    Alpine,
    Unknown,
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distribution::Ubuntu => write!(f, "ubuntu"),
            Distribution::Debian => write!(f, "debian"),
            Distribution::Alpine => write!(f, "alpine"),
            Distribution::Unknown => write!(f, "unknown"),
        }
    }
}

/// What detection learned about the current environment.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub is_container: bool,
    pub container_type: ContainerType,
    /// Whether a `ruby` command was found on `PATH`.
    pub has_ruby: bool,
    /// Whether the tool itself is already on `PATH`.
    pub has_metanorma: bool,
    pub distribution: Distribution,
}

impl ContainerInfo {
    /// Description of a bare-metal (or at least uncontained) host.
    pub fn host(has_ruby: bool, has_metanorma: bool) -> Self {
        ContainerInfo {
            is_container: false,
            container_type: ContainerType::None,
            has_ruby,
            has_metanorma,
            distribution: Distribution::Unknown,
        }
    }
}
