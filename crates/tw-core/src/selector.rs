//! Server selection
//!
//! Ranks an option set's matched servers according to its discipline and
//! filters out servers that cannot satisfy a port-forwarding request. Only
//! the `fastest` discipline touches the network, through the
//! [`LatencyProber`] seam.

use std::process::Command;

use crate::catalog::{ServerRecord, UNKNOWN_LATENCY_MS};
use crate::options::{Discipline, ServerOptionSet};

/// Round-trip latency measurement against a server's declared remote address
pub trait LatencyProber {
    /// Measure latency in milliseconds; return [`UNKNOWN_LATENCY_MS`] when
    /// the address is unreachable or the measurement fails.
    fn probe(&self, addr: &str) -> u32;
}

/// Probes with 3 ICMP echo round trips via the system `ping`
pub struct PingProber;

impl LatencyProber for PingProber {
    fn probe(&self, addr: &str) -> u32 {
        let output = match Command::new("ping").args(["-c", "3", addr]).output() {
            Ok(output) => output,
            Err(_) => return UNKNOWN_LATENCY_MS,
        };
        if !output.status.success() {
            return UNKNOWN_LATENCY_MS;
        }
        parse_ping_latency(&String::from_utf8_lossy(&output.stdout)).unwrap_or(UNKNOWN_LATENCY_MS)
    }
}

/// Extract the minimum round-trip time from `ping` summary output
///
/// Looks for the `rtt min/avg/max/mdev = a/b/c/d ms` line and returns the
/// `min` field, rounded up to whole milliseconds.
pub fn parse_ping_latency(stdout: &str) -> Option<u32> {
    for line in stdout.lines() {
        if !line.starts_with("rtt ") && !line.starts_with("round-trip ") {
            continue;
        }
        let values = line.split(" = ").nth(1)?;
        let min = values.split('/').next()?;
        return min.trim().parse::<f64>().ok().map(|ms| ms.ceil() as u32);
    }
    None
}

/// Order and filter the option set's servers by its discipline
///
/// Returns `None` when no eligible server remains; the caller must abort
/// before touching the network stack or the firewall.
pub fn select_servers(
    option_set: &ServerOptionSet,
    prober: &dyn LatencyProber,
) -> Option<Vec<ServerRecord>> {
    let mut servers = option_set.servers.clone();
    match option_set.discipline {
        Discipline::First => {}
        Discipline::Fastest => {
            for server in &mut servers {
                // An unreadable config sorts last rather than aborting selection
                server.latency_ms = match server.remote() {
                    Ok(remote) => prober.probe(&remote.addr),
                    Err(_) => UNKNOWN_LATENCY_MS,
                };
                tracing::debug!(server = %server.name, latency_ms = server.latency_ms, "Probed");
            }
            servers.sort_by_key(|server| server.latency_ms);
        }
        Discipline::Recent => {
            servers.sort_by_key(|server| server.recent_order);
        }
        Discipline::Rotation => {
            servers.sort_by_key(|server| std::cmp::Reverse(server.recent_order));
        }
    }
    if option_set.port_forwarding {
        servers.retain(|server| server.port_forwarding);
    }
    if servers.is_empty() {
        None
    } else {
        Some(servers)
    }
}
