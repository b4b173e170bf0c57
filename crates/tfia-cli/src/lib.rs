//! CLI argument model and value parsers for the action server binary.

pub mod cli_args;

pub use cli_args::{Cli, CliLlmAuthScheme};
