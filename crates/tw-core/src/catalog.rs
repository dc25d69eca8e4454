//! Server catalog
//!
//! In-memory list of installed server records, built once per invocation by
//! scanning the per-protocol configuration bundle directories and merging in
//! the persisted recency ranking.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths::Paths;
use crate::state::SavedState;

/// Latency sentinel for "unknown / unreachable" (milliseconds)
pub const UNKNOWN_LATENCY_MS: u32 = 99_999_999;

/// Tunnel protocols a server bundle may be installed for
///
/// Variant names map to the bundle directory names under `configuration/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    Udp,
    Tcp,
    StrongUdp,
    StrongTcp,
    Ip,
}

impl Protocol {
    /// All protocols, in bundle-scan order
    pub const ALL: [Protocol; 5] = [
        Protocol::Udp,
        Protocol::Tcp,
        Protocol::StrongUdp,
        Protocol::StrongTcp,
        Protocol::Ip,
    ];

    /// Bundle directory name under the configuration directory
    pub fn dir_name(&self) -> &'static str {
        match self {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
            Protocol::StrongUdp => "strong-udp",
            Protocol::StrongTcp => "strong-tcp",
            Protocol::Ip => "ip",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Remote endpoint declared by a server configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    /// Remote host or address
    pub addr: String,
    /// Remote port
    pub port: u16,
    /// Wire protocol token from the `proto` line ("udp" when absent)
    pub protocol: String,
}

/// One discovered server
#[derive(Debug, Clone)]
pub struct ServerRecord {
    /// Unique name, derived from the bundle file name
    pub name: String,
    /// Path to the server's configuration file
    pub config_path: PathBuf,
    /// Protocols this server is installed for
    pub protocols: Vec<Protocol>,
    /// Whether the remote service forwards ports for this server
    pub port_forwarding: bool,
    /// Recency rank, lower = more recently used; assigned once per invocation
    pub recent_order: usize,
    /// Measured latency, overwritten only by an explicit probe
    pub latency_ms: u32,
}

impl ServerRecord {
    /// Parse the remote endpoint out of this server's configuration file
    pub fn remote(&self) -> Result<Remote, ConfigError> {
        let contents = fs::read_to_string(&self.config_path)
            .map_err(|_| ConfigError::MissingRemote(self.config_path.clone()))?;
        parse_remote(&contents, &self.config_path)
    }
}

/// Parse `remote <host> <port>` and `proto <p>` lines from configuration text
///
/// The first `remote` line wins; its absence is fatal.
pub fn parse_remote(contents: &str, config_path: &Path) -> Result<Remote, ConfigError> {
    let mut addr_port: Option<(String, u16)> = None;
    let mut protocol: Option<String> = None;
    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("remote") if addr_port.is_none() => {
                let addr = fields
                    .next()
                    .ok_or_else(|| ConfigError::MalformedRemote(config_path.to_path_buf()))?;
                let port = fields
                    .next()
                    .and_then(|p| p.parse::<u16>().ok())
                    .ok_or_else(|| ConfigError::MalformedRemote(config_path.to_path_buf()))?;
                addr_port = Some((addr.to_string(), port));
            }
            Some("proto") if protocol.is_none() => {
                protocol = fields.next().map(|p| p.to_string());
            }
            _ => {}
        }
    }
    let (addr, port) =
        addr_port.ok_or_else(|| ConfigError::MissingRemote(config_path.to_path_buf()))?;
    Ok(Remote {
        addr,
        port,
        protocol: protocol.unwrap_or_else(|| "udp".to_string()),
    })
}

/// Fall-back list of port-forwarding-capable server names, used until a
/// current list has been downloaded.
pub const PROVISIONAL_FORWARDING_SERVERS: [&str; 13] = [
    "CA Toronto",
    "CA Montreal",
    "CA Vancouver",
    "Czech Republic",
    "DE Berlin",
    "DE Frankfurt",
    "France",
    "Israel",
    "Netherlands",
    "Romania",
    "Spain",
    "Sweden",
    "Switzerland",
];

/// Load the port-forwarding server-name list, falling back to the built-in
/// provisional list when no downloaded list is present.
pub fn forwarding_server_names(paths: &Paths) -> Vec<String> {
    match fs::read_to_string(&paths.forwarding_list_path) {
        Ok(contents) => {
            let names: Vec<String> = contents
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            if !names.is_empty() {
                return names;
            }
            tracing::warn!("Downloaded forwarding server list is empty, using fall-back list");
            provisional_list()
        }
        Err(_) => {
            tracing::debug!("No downloaded forwarding server list, using fall-back list");
            provisional_list()
        }
    }
}

fn provisional_list() -> Vec<String> {
    PROVISIONAL_FORWARDING_SERVERS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Build the catalog by scanning installed bundles and merging recency ranks
///
/// Servers appearing in more than one protocol bundle yield a single record
/// listing every protocol. The result is sorted by name. An empty catalog is
/// a configuration error pointing at the install step.
pub fn build_catalog(paths: &Paths, state: &SavedState) -> Result<Vec<ServerRecord>, ConfigError> {
    let forwarding_names = forwarding_server_names(paths);
    let mut servers: Vec<ServerRecord> = Vec::new();

    for protocol in Protocol::ALL {
        let dir = paths.config_dir.join(protocol.dir_name());
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        let mut config_paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "ovpn").unwrap_or(false))
            .collect();
        config_paths.sort();

        for config_path in config_paths {
            let name = match config_path.file_stem() {
                Some(stem) => stem.to_string_lossy().into_owned(),
                None => continue,
            };
            if let Some(existing) = servers.iter_mut().find(|s| s.name == name) {
                if !existing.protocols.contains(&protocol) {
                    existing.protocols.push(protocol);
                }
                continue;
            }
            let port_forwarding = forwarding_names.iter().any(|n| n == &name);
            servers.push(ServerRecord {
                recent_order: state.recency_rank(&name),
                name,
                config_path,
                protocols: vec![protocol],
                port_forwarding,
                latency_ms: UNKNOWN_LATENCY_MS,
            });
        }
    }

    if servers.is_empty() {
        return Err(ConfigError::EmptyCatalog(paths.config_dir.clone()));
    }
    servers.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(servers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_bundle(paths: &Paths, protocol: Protocol, name: &str, contents: &str) {
        let dir = paths.config_dir.join(protocol.dir_name());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.ovpn", name)), contents).unwrap();
    }

    #[test]
    fn test_parse_remote_basic() {
        let remote = parse_remote(
            "client\ndev tun\nproto udp\nremote ca-toronto.example.net 1198\n",
            Path::new("x.ovpn"),
        )
        .unwrap();
        assert_eq!(remote.addr, "ca-toronto.example.net");
        assert_eq!(remote.port, 1198);
        assert_eq!(remote.protocol, "udp");
    }

    #[test]
    fn test_parse_remote_missing_is_error() {
        let err = parse_remote("client\ndev tun\n", Path::new("x.ovpn")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRemote(_)));
    }

    #[test]
    fn test_parse_remote_bad_port_is_error() {
        let err = parse_remote("remote host not-a-port\n", Path::new("x.ovpn")).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedRemote(_)));
    }

    #[test]
    fn test_build_catalog_merges_protocols() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::new(dir.path());
        write_bundle(&paths, Protocol::Udp, "CA Toronto", "remote a 1198\n");
        write_bundle(&paths, Protocol::Tcp, "CA Toronto", "remote a 502\n");
        write_bundle(&paths, Protocol::Udp, "France", "remote b 1198\n");

        let catalog = build_catalog(&paths, &SavedState::default()).unwrap();
        assert_eq!(catalog.len(), 2);
        let toronto = catalog.iter().find(|s| s.name == "CA Toronto").unwrap();
        assert_eq!(toronto.protocols, vec![Protocol::Udp, Protocol::Tcp]);
        // Config path comes from the first bundle that declared the server
        assert!(toronto.config_path.to_string_lossy().contains("udp"));
    }

    #[test]
    fn test_build_catalog_forwarding_capability() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::new(dir.path());
        write_bundle(&paths, Protocol::Udp, "CA Toronto", "remote a 1198\n");
        write_bundle(&paths, Protocol::Udp, "US East", "remote c 1198\n");

        let catalog = build_catalog(&paths, &SavedState::default()).unwrap();
        assert!(catalog.iter().find(|s| s.name == "CA Toronto").unwrap().port_forwarding);
        assert!(!catalog.iter().find(|s| s.name == "US East").unwrap().port_forwarding);
    }

    #[test]
    fn test_build_catalog_downloaded_list_overrides_fallback() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::new(dir.path());
        write_bundle(&paths, Protocol::Udp, "CA Toronto", "remote a 1198\n");
        write_bundle(&paths, Protocol::Udp, "US East", "remote c 1198\n");
        fs::create_dir_all(&paths.download_dir).unwrap();
        fs::write(&paths.forwarding_list_path, "US East\n").unwrap();

        let catalog = build_catalog(&paths, &SavedState::default()).unwrap();
        assert!(!catalog.iter().find(|s| s.name == "CA Toronto").unwrap().port_forwarding);
        assert!(catalog.iter().find(|s| s.name == "US East").unwrap().port_forwarding);
    }

    #[test]
    fn test_build_catalog_empty_is_error() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::new(dir.path());
        let err = build_catalog(&paths, &SavedState::default()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyCatalog(_)));
    }

    #[test]
    fn test_build_catalog_recency_ranks() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::new(dir.path());
        write_bundle(&paths, Protocol::Udp, "A", "remote a 1198\n");
        write_bundle(&paths, Protocol::Udp, "B", "remote b 1198\n");
        write_bundle(&paths, Protocol::Udp, "C", "remote c 1198\n");

        let mut state = SavedState::default();
        state.push_recent("B");
        state.push_recent("A"); // A most recent

        let catalog = build_catalog(&paths, &state).unwrap();
        let rank = |name: &str| catalog.iter().find(|s| s.name == name).unwrap().recent_order;
        assert_eq!(rank("A"), 1);
        assert_eq!(rank("B"), 2);
        assert_eq!(rank("C"), 3);
    }
}
