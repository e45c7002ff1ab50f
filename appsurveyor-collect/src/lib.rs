//! Library module for appsurveyor-collect
//!
//! This module exposes the CLI building blocks for testing purposes.
//! The binary entry point is in main.rs.

pub mod cli;
pub mod output;
pub mod overrides;
pub mod render;
pub mod scan;
pub mod tokens;

pub use cli::{Cli, Command, GlobalArgs, ScanArgs, TablesArgs, TargetArgs, ViewArgs};
pub use overrides::{OverrideParseError, OverrideSpec};
pub use tokens::{TokenSource, resolve_tokens};
