//! tw-cli: Command-line interface for tunwall
//!
//! Provides the `tunwall` CLI for starting and stopping the supervised
//! tunnel session and inspecting its state.

pub mod commands;
pub mod output;
