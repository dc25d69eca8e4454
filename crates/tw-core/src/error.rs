//! Core error types for tunwall

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the tunwall ecosystem
#[derive(Error, Debug)]
pub enum TwError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connection error
    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    /// Firewall error
    #[error("Firewall error: {0}")]
    Firewall(#[from] FirewallError),

    /// Port-forwarding error
    #[error("Port forwarding error: {0}")]
    Forward(#[from] ForwardError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Named option set does not exist
    #[error("Unknown option set: {0}")]
    UnknownOptionSet(String),

    /// No option set named and no unambiguous default
    #[error("No default option set; pass --option-set or add `default = \"<name>\"`")]
    NoDefaultOptionSet,

    /// No installed server configuration bundles were found
    #[error("No server configurations found under {0}; install OpenVPN bundles first")]
    EmptyCatalog(PathBuf),

    /// Server config is missing its "remote" line
    #[error("Server configuration is missing a \"remote\" line: {0}")]
    MissingRemote(PathBuf),

    /// Server config "remote" line could not be parsed
    #[error("Unable to parse \"remote\" line in server configuration: {0}")]
    MalformedRemote(PathBuf),
}

/// Connection orchestration errors
#[derive(Error, Debug)]
pub enum ConnectError {
    /// A tunnel process is already recorded as running
    #[error("Tunnel is already running (PID: {0})")]
    AlreadyRunning(u32),

    /// The option set matched no eligible servers
    #[error("No matching servers found")]
    NoCandidates,

    /// Every candidate server failed to launch
    #[error("Failed to start the tunnel for every candidate server")]
    LaunchFailed,

    /// The launcher accepted the config but no daemon PID appeared
    #[error("Tunnel daemon does not appear to be running for {0}")]
    DaemonNotRunning(String),

    /// No tunnel device announcement appeared in the log within the retry budget
    #[error("Timed out waiting for tunnel device in log: {0}")]
    TunnelTimeout(PathBuf),

    /// `ip route show` produced no default route
    #[error("Failed to find the default route via \"ip route show\"")]
    MissingDefaultRoute,

    /// No running tunnel to stop
    #[error("Tunnel does not appear to be running")]
    NotRunning,
}

/// Firewall rule application errors
#[derive(Error, Debug)]
pub enum FirewallError {
    /// A rule command exited non-zero
    #[error("iptables {args} failed with exit code {code:?}")]
    RuleFailed {
        args: String,
        code: Option<i32>,
    },

    /// The rule command could not be spawned at all
    #[error("Failed to run iptables: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Port-forward negotiation errors (soft failures at the orchestrator level)
#[derive(Error, Debug)]
pub enum ForwardError {
    /// Request failed or timed out
    #[error("Forwarding request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response port was zero, negative, or out of range
    #[error("Invalid returned port value \"{0}\"")]
    BadPort(String),

    /// Marker file I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
