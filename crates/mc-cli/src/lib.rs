//! Meeting cost calculator CLI library.
//!
//! This crate provides the `mcc` command-line interface on top of `mc-core`
//! and the `mc-store` database.

mod cli;
pub mod commands;
mod config;
pub mod render;

pub use cli::{Cli, Commands};
pub use config::Config;
