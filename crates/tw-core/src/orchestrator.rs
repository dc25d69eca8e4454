//! Connection orchestrator
//!
//! Drives the connect state machine: pre-flight guards, candidate fallback,
//! tunnel launch, device discovery, firewall sequencing, and optional
//! port-forward negotiation. Strictly sequential: one tunnel process, one
//! firewall reconfiguration, and one forwarding request at most are ever in
//! flight. A session is never reported connected without a confirmed filter.

use std::process::Command;

use crate::catalog::ServerRecord;
use crate::error::{ConnectError, TwError};
use crate::firewall::{Firewall, FirewallPolicyParams, RuleRunner};
use crate::forward::PortForwarder;
use crate::netinfo::{self, DefaultRoute};
use crate::options::ServerOptionSet;
use crate::paths::{self, Paths};
use crate::pidfile;
use crate::state::SavedState;
use crate::tunnel::{await_tunnel_device, DeviceWaitConfig, LaunchMode, TunnelLauncher};

/// Immutable per-run options threaded through the connect flow
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectOptions {
    /// Run the tunnel in the foreground and block for its lifetime
    pub wait: bool,
    /// Request a fresh forwarding identity (and therefore a new port)
    pub new_port: bool,
}

/// Terminal state of a connect run
#[derive(Debug)]
pub enum ConnectOutcome {
    /// Daemonized tunnel is up with the filter confirmed
    Connected {
        server: String,
        device: String,
        pid: u32,
        forwarded_port: Option<u16>,
    },
    /// Foreground tunnel ran for its whole lifetime and exited
    Completed { server: String },
}

/// Source of the host's default route
pub trait RouteSource {
    fn default_route(&self) -> Result<DefaultRoute, ConnectError>;
}

/// Reads the default route from the kernel routing table
pub struct KernelRouteSource;

impl RouteSource for KernelRouteSource {
    fn default_route(&self) -> Result<DefaultRoute, ConnectError> {
        netinfo::default_route()
    }
}

/// The connection orchestrator
pub struct Orchestrator<L, R: RuleRunner, S> {
    paths: Paths,
    launcher: L,
    firewall: Firewall<R>,
    routes: S,
    device_wait: DeviceWaitConfig,
}

impl<L, R, S> Orchestrator<L, R, S>
where
    L: TunnelLauncher,
    R: RuleRunner,
    S: RouteSource,
{
    pub fn new(paths: Paths, launcher: L, firewall: Firewall<R>, routes: S) -> Self {
        Self {
            paths,
            launcher,
            firewall,
            routes,
            device_wait: DeviceWaitConfig::default(),
        }
    }

    pub fn with_device_wait(mut self, device_wait: DeviceWaitConfig) -> Self {
        self.device_wait = device_wait;
        self
    }

    /// Establish one tunnel session over the ordered candidate list
    ///
    /// Candidates are tried one at a time; launch failures fall through to
    /// the next candidate. Every attempt is recorded in the recency state,
    /// which the caller flushes on any outcome.
    pub async fn connect(
        &self,
        option_set: &ServerOptionSet,
        servers: &[ServerRecord],
        state: &mut SavedState,
        forwarder: &PortForwarder,
        opts: ConnectOptions,
    ) -> Result<ConnectOutcome, TwError> {
        if let Some(pid) = pidfile::read_running_pid(&self.paths.pid_path)? {
            return Err(ConnectError::AlreadyRunning(pid).into());
        }
        if servers.is_empty() {
            return Err(ConnectError::NoCandidates.into());
        }

        // Stale markers from a previous session must not leak into this one
        paths::delete_marker(&self.paths.pid_path)?;
        paths::delete_marker(&self.paths.port_path)?;

        let mode = if opts.wait {
            LaunchMode::Foreground
        } else {
            LaunchMode::Daemon
        };

        let mut last_error: Option<ConnectError> = None;
        for server in servers {
            // Failed attempts influence future recent/rotation ordering too
            state.push_recent(&server.name);
            tracing::info!("Connecting to: {}", server.name);

            match self.launcher.launch(server, mode) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!("Launcher rejected configuration for {}", server.name);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Failed to launch tunnel for {}: {}", server.name, e);
                    continue;
                }
            }

            if opts.wait {
                // Foreground mode blocked for the tunnel's lifetime; there is
                // no daemon to supervise and no filter sequencing to run.
                return Ok(ConnectOutcome::Completed {
                    server: server.name.clone(),
                });
            }

            // Exit code zero only means the config was accepted
            let Some(pid) = pidfile::read_running_pid(&self.paths.pid_path)? else {
                tracing::warn!("Tunnel daemon does not seem to be running for {}", server.name);
                last_error = Some(ConnectError::DaemonNotRunning(server.name.clone()));
                continue;
            };
            tracing::info!("Tunnel daemon is running with PID: {}", pid);

            let device = match await_tunnel_device(&self.paths.log_path, self.device_wait).await {
                Ok(device) => device,
                Err(e) => {
                    tracing::warn!("{}; abandoning {}", e, server.name);
                    self.launcher.terminate(pid)?;
                    paths::delete_marker(&self.paths.pid_path)?;
                    last_error = Some(e);
                    continue;
                }
            };

            let forwarded_port = self
                .finish_connection(option_set, server, &device, forwarder, opts)
                .await?;

            return Ok(ConnectOutcome::Connected {
                server: server.name.clone(),
                device,
                pid,
                forwarded_port,
            });
        }

        Err(last_error.unwrap_or(ConnectError::LaunchFailed).into())
    }

    /// Firewall sequencing and optional port forwarding for a live tunnel
    async fn finish_connection(
        &self,
        option_set: &ServerOptionSet,
        server: &ServerRecord,
        device: &str,
        forwarder: &PortForwarder,
        opts: ConnectOptions,
    ) -> Result<Option<u16>, TwError> {
        let route = self.routes.default_route()?;
        let remote = server.remote()?;
        let params = FirewallPolicyParams {
            default_device: route.device,
            gateway_addr: route.gateway,
            tunnel_device: device.to_string(),
            remote_addr: remote.addr,
            remote_port: remote.port,
            remote_protocol: remote.protocol,
            allow_lan: !option_set.block_lan,
            forwarded_port: None,
        };

        if option_set.disable_firewall {
            tracing::warn!("Firewall disabled by option set {}", option_set.name);
        } else {
            tracing::info!("Applying firewall policy ...");
            self.firewall.apply(&params)?;
            tracing::info!("Firewall enabled.");
        }

        if !option_set.port_forwarding {
            return Ok(None);
        }
        tracing::info!(
            "Determining{} forwarded port ...",
            if opts.new_port { " (new)" } else { "" }
        );
        match forwarder.forwarded_port(opts.new_port).await {
            Ok(port) => {
                if !option_set.disable_firewall {
                    self.firewall.allow_forwarded_port(device, port)?;
                }
                Ok(Some(port))
            }
            Err(e) => {
                // Forwarding is an enhancement; the session stays up without it
                tracing::warn!("Failed to establish port forwarding: {}", e);
                Ok(None)
            }
        }
    }
}

/// Terminate a running tunnel session and clear its markers
///
/// "Not running" is an error: there is nothing to stop.
pub fn stop_tunnel(paths: &Paths) -> Result<u32, TwError> {
    let pid = pidfile::read_running_pid(&paths.pid_path)?.ok_or(ConnectError::NotRunning)?;
    tracing::info!("Killing tunnel process PID: {}", pid);
    let status = Command::new("sudo")
        .args(["kill", &pid.to_string()])
        .status()?;
    if !status.success() {
        return Err(ConnectError::DaemonNotRunning(format!("PID {}", pid)).into());
    }
    paths::delete_marker(&paths.pid_path)?;
    paths::delete_marker(&paths.port_path)?;
    Ok(pid)
}
