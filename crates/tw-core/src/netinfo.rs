//! Host routing information
//!
//! Discovers the default-route device and gateway address by parsing
//! `ip route show` output. Both are required before any firewall policy can
//! be derived.

use std::process::Command;

use crate::error::ConnectError;

/// The host's default route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultRoute {
    /// Gateway (LAN) address
    pub gateway: String,
    /// Device carrying the default route
    pub device: String,
}

/// Query the kernel routing table for the default route
pub fn default_route() -> Result<DefaultRoute, ConnectError> {
    let output = Command::new("ip")
        .args(["route", "show"])
        .output()
        .map_err(|_| ConnectError::MissingDefaultRoute)?;
    if !output.status.success() {
        return Err(ConnectError::MissingDefaultRoute);
    }
    parse_default_route(&String::from_utf8_lossy(&output.stdout))
        .ok_or(ConnectError::MissingDefaultRoute)
}

/// Parse the `default via <gateway> dev <device>` line
pub fn parse_default_route(stdout: &str) -> Option<DefaultRoute> {
    for line in stdout.lines() {
        let mut fields = line.split_whitespace();
        if fields.next() != Some("default") {
            continue;
        }
        if fields.next() != Some("via") {
            continue;
        }
        let gateway = fields.next()?;
        if fields.next() != Some("dev") {
            continue;
        }
        let device = fields.next()?;
        return Some(DefaultRoute {
            gateway: gateway.to_string(),
            device: device.to_string(),
        });
    }
    None
}
