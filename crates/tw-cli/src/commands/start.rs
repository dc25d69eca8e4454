//! Start command implementation

use std::path::Path;

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use tw_core::catalog::build_catalog;
use tw_core::error::{ConnectError, TwError};
use tw_core::firewall::{Firewall, IptablesRunner};
use tw_core::forward::PortForwarder;
use tw_core::options::ConfigFile;
use tw_core::orchestrator::{
    ConnectOptions, ConnectOutcome, KernelRouteSource, Orchestrator,
};
use tw_core::paths::Paths;
use tw_core::selector::{select_servers, PingProber};
use tw_core::state::SavedState;
use tw_core::tunnel::OpenVpnLauncher;

/// Execute the start command: select, connect, firewall, forward
pub async fn start_command(
    paths: &Paths,
    config_path: &Path,
    option_set_name: Option<&str>,
    wait: bool,
    new_port: bool,
) -> Result<()> {
    let config = ConfigFile::load(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    paths
        .ensure_directories()
        .context("Failed to create the tunwall directories")?;

    let mut state = SavedState::load(&paths.state_path).context("Failed to load saved state")?;
    let catalog = build_catalog(paths, &state)?;
    let option_set = config.resolve_option_set(option_set_name, &catalog)?;

    let Some(servers) = select_servers(&option_set, &PingProber) else {
        print_error(&format!(
            "Option set '{}' matched no eligible servers",
            option_set.name
        ));
        return Err(TwError::Connect(ConnectError::NoCandidates).into());
    };
    print_info(&format!(
        "Option set '{}': {} candidate server(s)",
        option_set.name,
        servers.len()
    ));

    let orchestrator = Orchestrator::new(
        paths.clone(),
        OpenVpnLauncher::from_paths(paths),
        Firewall::new(IptablesRunner),
        KernelRouteSource,
    );
    let forwarder = PortForwarder::from_paths(paths);
    let options = ConnectOptions { wait, new_port };

    let result = orchestrator
        .connect(&option_set, &servers, &mut state, &forwarder, options)
        .await;

    // The recent-server list reflects every attempt, failed runs included
    state.save().context("Failed to save state")?;

    match result {
        Ok(ConnectOutcome::Connected {
            server,
            device,
            pid,
            forwarded_port,
        }) => {
            print_success(&format!(
                "Connected to {} on {} (PID: {})",
                server, device, pid
            ));
            match forwarded_port {
                Some(port) => print_success(&format!("Forwarded port: {}", port)),
                None if option_set.port_forwarding => {
                    print_warning("Port forwarding was requested but not established")
                }
                None => {}
            }
            Ok(())
        }
        Ok(ConnectOutcome::Completed { server }) => {
            print_info(&format!("Tunnel to {} exited", server));
            Ok(())
        }
        Err(e) => {
            if matches!(e, TwError::Connect(ConnectError::LaunchFailed)) {
                dump_tunnel_log(paths);
            }
            Err(e.into())
        }
    }
}

/// Show the captured tunnel log after every candidate failed to launch
fn dump_tunnel_log(paths: &Paths) {
    match std::fs::read_to_string(&paths.log_path) {
        Ok(log) if !log.trim().is_empty() => {
            print_warning("Tunnel log from the failed attempt:");
            eprintln!("{}", log);
        }
        _ => {}
    }
}
