//! Tunnel process launch and device discovery
//!
//! Launches the external OpenVPN executable and discovers the virtual
//! device it opens by polling its log. A zero exit status from the launcher
//! means the config was accepted, not that the tunnel is live; liveness is
//! confirmed separately via the PID marker and the log.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::catalog::ServerRecord;
use crate::error::ConnectError;
use crate::paths::Paths;

/// How a tunnel process should be launched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Detach and log to the log file
    Daemon,
    /// Run in the foreground for the lifetime of the tunnel
    Foreground,
}

/// Seam for launching the tunnel process
pub trait TunnelLauncher {
    /// Launch the tunnel for a server; `Ok(true)` means the launcher
    /// accepted the configuration (exit status zero).
    fn launch(&self, server: &ServerRecord, mode: LaunchMode) -> std::io::Result<bool>;

    /// Terminate a previously launched tunnel daemon
    fn terminate(&self, pid: u32) -> std::io::Result<()> {
        let status = Command::new("sudo")
            .args(["kill", &pid.to_string()])
            .status()?;
        if !status.success() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("kill {} exited with {:?}", pid, status.code()),
            ));
        }
        Ok(())
    }
}

impl<L: TunnelLauncher + ?Sized> TunnelLauncher for &L {
    fn launch(&self, server: &ServerRecord, mode: LaunchMode) -> std::io::Result<bool> {
        (**self).launch(server, mode)
    }

    fn terminate(&self, pid: u32) -> std::io::Result<()> {
        (**self).terminate(pid)
    }
}

/// Launches `sudo openvpn` with the server's configuration
pub struct OpenVpnLauncher {
    pub cred_path: PathBuf,
    pub log_path: PathBuf,
    pub pid_path: PathBuf,
}

impl OpenVpnLauncher {
    pub fn from_paths(paths: &Paths) -> Self {
        Self {
            cred_path: paths.cred_path.clone(),
            log_path: paths.log_path.clone(),
            pid_path: paths.pid_path.clone(),
        }
    }

    /// Command-line arguments for one launch
    pub fn build_args(&self, server: &ServerRecord, mode: LaunchMode) -> Vec<String> {
        let mut args = vec!["openvpn".to_string()];
        if mode == LaunchMode::Daemon {
            args.push("--daemon".to_string());
            args.push("--log".to_string());
            args.push(self.log_path.to_string_lossy().into_owned());
        }
        args.push("--config".to_string());
        args.push(server.config_path.to_string_lossy().into_owned());
        // --auth-user-pass must follow --config in order to override it
        args.push("--auth-user-pass".to_string());
        args.push(self.cred_path.to_string_lossy().into_owned());
        if mode == LaunchMode::Daemon {
            args.push("--writepid".to_string());
            args.push(self.pid_path.to_string_lossy().into_owned());
        }
        args
    }
}

impl TunnelLauncher for OpenVpnLauncher {
    fn launch(&self, server: &ServerRecord, mode: LaunchMode) -> std::io::Result<bool> {
        let args = self.build_args(server, mode);
        tracing::debug!("sudo {}", args.join(" "));
        let status = Command::new("sudo").args(&args).status()?;
        Ok(status.success())
    }
}

/// Device-wait retry budget
///
/// The tunnel process announces its device asynchronously, so the log is
/// re-read in full on every attempt with a fixed inter-attempt delay.
#[derive(Debug, Clone, Copy)]
pub struct DeviceWaitConfig {
    pub max_retries: u32,
    pub interval: Duration,
}

impl Default for DeviceWaitConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            interval: Duration::from_secs(1),
        }
    }
}

/// Extract the opened device name from tunnel log text
///
/// Matches the `TUN/TAP device <name> opened` announcement, tolerating
/// interleaved unrelated log lines. Safe to re-run on a growing log.
pub fn parse_tunnel_device(log_text: &str) -> Option<String> {
    const MARKER: &str = "TUN/TAP device ";
    for line in log_text.lines() {
        let Some(start) = line.find(MARKER) else {
            continue;
        };
        let rest = &line[start + MARKER.len()..];
        let mut fields = rest.split_whitespace();
        let device = fields.next()?;
        if fields.next() == Some("opened") {
            return Some(device.to_string());
        }
    }
    None
}

/// Poll the tunnel log until the device announcement appears
///
/// Each attempt re-reads the whole log (handles late writes). Exhausting the
/// retry budget is fatal for the current candidate.
pub async fn await_tunnel_device(
    log_path: &Path,
    config: DeviceWaitConfig,
) -> Result<String, ConnectError> {
    for retry in 0..=config.max_retries {
        if retry > 0 {
            tracing::info!(
                "Waiting for tunnel device -- retry {} of {}",
                retry,
                config.max_retries
            );
            tokio::time::sleep(config.interval).await;
        }
        let log_text = fs::read_to_string(log_path).unwrap_or_default();
        if let Some(device) = parse_tunnel_device(&log_text) {
            tracing::info!("Found tunnel device: {}", device);
            return Ok(device);
        }
    }
    Err(ConnectError::TunnelTimeout(log_path.to_path_buf()))
}
