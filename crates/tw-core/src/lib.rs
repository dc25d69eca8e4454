//! tw-core: tunnel orchestration core for tunwall
//!
//! This crate provides the server catalog, server selection, firewall policy
//! engine, port-forward negotiation, and the connection orchestrator used by
//! the `tunwall` CLI.

pub mod catalog;
pub mod error;
pub mod firewall;
pub mod forward;
pub mod netinfo;
pub mod options;
pub mod orchestrator;
pub mod paths;
pub mod pidfile;
pub mod selector;
pub mod state;
pub mod tunnel;

pub use error::TwError;
pub use options::{Discipline, ServerOptionSet};
