//! API Module
//!
//! Command-line surface over the detection engine.
//!
//! Structure:
//! - commands.rs: argument definitions and command handlers

pub mod commands;

pub use commands::{run, Cli, Command};
