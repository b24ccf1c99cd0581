//! Command-line interface

mod commands;

pub use commands::{Cli, Commands, SigningArgs};
