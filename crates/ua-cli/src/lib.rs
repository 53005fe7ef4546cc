//! Usage analytics CLI library.
//!
//! This crate provides the `ua` command: the HTTP server plus local tools for
//! importing events and inspecting inference latency.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
