//! Command-line interface for agent-workers.
//!
//! Prints the supervisor's agent card and sends single turns through the
//! execution bridge, printing the committed task events.

mod commands;

pub use commands::{log_filter, parse_cli, run_with_cli, Cli, Commands};
