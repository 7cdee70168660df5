//! Command-line interface
//!
//! Process arguments for the two roles, and the line-based console an
//! operator uses to drive a connected peer.

pub mod commands;
pub mod console;

pub use commands::{Command, OperatorCommand, Opt, CONSOLE_HELP};
pub use console::run_console;
