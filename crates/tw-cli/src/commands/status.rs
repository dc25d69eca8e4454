//! Status command implementation

use std::fs;
use std::path::Path;

use anyhow::Result;

use crate::output::{format_file_statuses, print_info, print_success, print_warning, FileStatus};
use tw_core::paths::Paths;
use tw_core::pidfile;

/// Execute the status command
///
/// Shows whether a tunnel is running, the forwarded port if one is
/// recorded, and every notable file with a missing-file annotation.
pub fn status_command(paths: &Paths) -> Result<()> {
    match pidfile::read_running_pid(&paths.pid_path)? {
        Some(pid) => print_success(&format!("Tunnel is running (PID: {})", pid)),
        None => print_warning("Tunnel is not running"),
    }

    if let Ok(port) = fs::read_to_string(&paths.port_path) {
        print_info(&format!("Forwarded port: {}", port.trim()));
    }

    let files = [
        ("Config", &paths.config_path),
        ("Credentials", &paths.cred_path),
        ("State", &paths.state_path),
        ("PID marker", &paths.pid_path),
        ("Tunnel log", &paths.log_path),
        ("Port marker", &paths.port_path),
        ("Client identifier", &paths.client_id_path),
        ("Forwarding server list", &paths.forwarding_list_path),
    ];
    let rows: Vec<FileStatus> = files
        .iter()
        .map(|(label, path)| FileStatus {
            label: label.to_string(),
            path: display_path(path),
            present: path.exists(),
        })
        .collect();

    println!("{}", format_file_statuses(&rows));
    Ok(())
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
