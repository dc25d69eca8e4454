//! Log command implementation

use std::fs;

use anyhow::Result;

use crate::output::print_warning;
use tw_core::paths::Paths;

/// Execute the log command: print the tunnel process log
pub fn log_command(paths: &Paths) -> Result<()> {
    match fs::read_to_string(&paths.log_path) {
        Ok(log) => {
            print!("{}", log);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            print_warning(&format!("No tunnel log at {:?}", paths.log_path));
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
