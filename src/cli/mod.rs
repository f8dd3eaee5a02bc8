//! Command-line interface
//!
//! Argument parsing lives in the binary; the subcommands are implemented here.

pub mod commands;
