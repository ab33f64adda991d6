//! CLI command implementations for dte.
//!
//! Each module corresponds to a subcommand (`dte <command>`).

pub mod render;
pub mod script;
