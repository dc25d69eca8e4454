//! Stop command implementation

use anyhow::Result;

use crate::output::{print_error, print_success};
use tw_core::orchestrator::stop_tunnel;
use tw_core::paths::Paths;

/// Execute the stop command
pub fn stop_command(paths: &Paths) -> Result<()> {
    match stop_tunnel(paths) {
        Ok(pid) => {
            print_success(&format!("Stopped tunnel (PID: {})", pid));
            Ok(())
        }
        Err(e) => {
            print_error(&format!("{}", e));
            Err(e.into())
        }
    }
}
