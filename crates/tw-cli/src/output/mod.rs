//! Output formatting utilities for the CLI
//!
//! Table rendering for the server catalog and the status display, plus the
//! colored status-message helpers used by every command.

use tabled::{settings::Style, Table, Tabled};

use tw_core::catalog::ServerRecord;

/// One row of the `status` display: a notable file and whether it exists
pub struct FileStatus {
    pub label: String,
    pub path: String,
    pub present: bool,
}

/// Format the server catalog as an ASCII table
///
/// Shows each server's name, the protocols it is installed for, whether the
/// remote service forwards ports for it, and its recency rank.
pub fn format_servers(servers: &[ServerRecord]) -> String {
    if servers.is_empty() {
        return "No servers installed".to_string();
    }

    #[derive(Tabled)]
    struct ServerRow {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "PROTOCOLS")]
        protocols: String,
        #[tabled(rename = "FORWARDING")]
        forwarding: String,
        #[tabled(rename = "RECENT")]
        recent: usize,
    }

    let rows: Vec<ServerRow> = servers
        .iter()
        .map(|s| ServerRow {
            name: s.name.clone(),
            protocols: s
                .protocols
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            forwarding: if s.port_forwarding { "yes" } else { "-" }.to_string(),
            recent: s.recent_order,
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Format the notable-file table for the `status` display
pub fn format_file_statuses(files: &[FileStatus]) -> String {
    #[derive(Tabled)]
    struct FileRow {
        #[tabled(rename = "FILE")]
        label: String,
        #[tabled(rename = "PATH")]
        path: String,
        #[tabled(rename = "PRESENT")]
        present: String,
    }

    let rows: Vec<FileRow> = files
        .iter()
        .map(|f| FileRow {
            label: f.label.clone(),
            path: f.path.clone(),
            present: if f.present { "yes" } else { "missing" }.to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow with a warning symbol prefix
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan with an info symbol prefix
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tw_core::catalog::{Protocol, UNKNOWN_LATENCY_MS};

    #[test]
    fn test_format_servers_empty() {
        assert_eq!(format_servers(&[]), "No servers installed");
    }

    #[test]
    fn test_format_servers_columns() {
        let servers = vec![ServerRecord {
            name: "CA Toronto".to_string(),
            config_path: PathBuf::from("/c/CA Toronto.ovpn"),
            protocols: vec![Protocol::Udp, Protocol::StrongTcp],
            port_forwarding: true,
            recent_order: 2,
            latency_ms: UNKNOWN_LATENCY_MS,
        }];
        let table = format_servers(&servers);
        assert!(table.contains("CA Toronto"));
        assert!(table.contains("udp, strong-tcp"));
        assert!(table.contains("yes"));
    }

    #[test]
    fn test_format_file_statuses_marks_missing() {
        let table = format_file_statuses(&[FileStatus {
            label: "Log".to_string(),
            path: "/s/tunwall.log".to_string(),
            present: false,
        }]);
        assert!(table.contains("missing"));
    }
}
