// Command-line surface of setup-metanorma.

// Clap parser and subcommand definitions.
pub mod cmd_enums;
