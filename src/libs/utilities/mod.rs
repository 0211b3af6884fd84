// This is the main module file for the `utilities` directory.
// It declares the helper submodules used across the installers and
// commands, accessible from `crate::libs::utilities::*`.

pub mod assets;
pub mod binary;
pub mod command;
pub mod compression;
pub mod path_helpers;
pub mod platform;
pub mod timestamps;
