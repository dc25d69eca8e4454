//! On-disk layout for configuration, state, and marker files
//!
//! Everything lives under a single base directory (`~/.tunwall` by default)
//! with `configuration/`, `state/`, and `downloads/` subdirectories. Marker
//! files under `state/` are each the sole source of truth for one fact
//! across invocations.

use std::path::{Path, PathBuf};

/// Base directory name under the user's home
const BASE_DIR_NAME: &str = ".tunwall";

/// Resolved file-system layout for one invocation
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory
    pub base_dir: PathBuf,
    /// Installed server configuration bundles live here, one dir per protocol
    pub config_dir: PathBuf,
    /// Marker and log files
    pub state_dir: PathBuf,
    /// Downloaded artifacts (bundles, forwarding server-name list)
    pub download_dir: PathBuf,
    /// User configuration file (TOML)
    pub config_path: PathBuf,
    /// Credentials file passed to the tunnel process
    pub cred_path: PathBuf,
    /// Persisted recency state (JSON)
    pub state_path: PathBuf,
    /// PID marker for the running tunnel daemon
    pub pid_path: PathBuf,
    /// Tunnel process log file
    pub log_path: PathBuf,
    /// Forwarded-port marker
    pub port_path: PathBuf,
    /// Persisted port-forwarding client identifier
    pub client_id_path: PathBuf,
    /// Downloaded list of port-forwarding-capable server names
    pub forwarding_list_path: PathBuf,
}

impl Paths {
    /// Build the layout rooted at an explicit base directory
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let config_dir = base_dir.join("configuration");
        let state_dir = base_dir.join("state");
        let download_dir = base_dir.join("downloads");
        Self {
            config_path: config_dir.join("tunwall.toml"),
            cred_path: config_dir.join("tunwall.cred"),
            state_path: state_dir.join("tunwall.state.json"),
            pid_path: state_dir.join("tunwall.pid"),
            log_path: state_dir.join("tunwall.log"),
            port_path: state_dir.join("tunwall.port"),
            client_id_path: state_dir.join("tunwall.clientid.rnd"),
            forwarding_list_path: download_dir.join("forwarding.servers"),
            base_dir,
            config_dir,
            state_dir,
            download_dir,
        }
    }

    /// Layout rooted at the default base directory under the user's home
    pub fn default_layout() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(BASE_DIR_NAME))
    }

    /// Ensure the base, configuration, state, and download directories exist
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [&self.config_dir, &self.state_dir, &self.download_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Delete a marker file, treating "not found" as success
pub fn delete_marker(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
