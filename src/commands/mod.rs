// Register application subcommands.
// Each module corresponds to a specific `setup-metanorma` command-line action.

// Removes recorded installation state and workspace artifacts.
pub mod cleanup;
// Orchestrates the full installation process.
pub mod install;
// Displays the version of setup-metanorma and checks for newer releases.
pub mod version;
// Lists the published versions for every installation source.
pub mod versions;
