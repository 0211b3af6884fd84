// Data definitions shared across the crate: run settings, detection
// results, feed wire formats, the persisted state file, and the error
// taxonomy. Behavior lives elsewhere; these modules stay declarative.

pub mod container;
pub mod errors;
pub mod settings;
pub mod state_file;
pub mod versions;
