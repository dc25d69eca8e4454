//! Firewall policy engine
//!
//! Translates a small set of policy parameters into an ordered sequence of
//! packet-filter rule invocations. The engine is stateless between
//! invocations: `apply` always resets the filter before building the new
//! policy, and default-deny is installed before any allow rule. Every rule
//! failure is fatal; a partially applied policy is never silently accepted.

use std::process::Command;

use crate::error::FirewallError;

/// Executes one rule-management command per call
pub trait RuleRunner {
    fn run(&self, args: &[&str]) -> Result<(), FirewallError>;
}

impl<R: RuleRunner + ?Sized> RuleRunner for &R {
    fn run(&self, args: &[&str]) -> Result<(), FirewallError> {
        (**self).run(args)
    }
}

/// Runs `sudo iptables <args>` and fails on non-zero exit
pub struct IptablesRunner;

impl RuleRunner for IptablesRunner {
    fn run(&self, args: &[&str]) -> Result<(), FirewallError> {
        tracing::debug!("iptables {}", args.join(" "));
        let status = Command::new("sudo").arg("iptables").args(args).status()?;
        if !status.success() {
            return Err(FirewallError::RuleFailed {
                args: args.join(" "),
                code: status.code(),
            });
        }
        Ok(())
    }
}

/// Policy parameters for one connection attempt; never persisted
#[derive(Debug, Clone)]
pub struct FirewallPolicyParams {
    /// Device carrying the default route
    pub default_device: String,
    /// LAN gateway address on the default route
    pub gateway_addr: String,
    /// Virtual device created by the tunnel process
    pub tunnel_device: String,
    /// Remote endpoint of the tunnel control channel
    pub remote_addr: String,
    pub remote_port: u16,
    pub remote_protocol: String,
    /// Bridge traffic between the default device and the LAN gateway
    pub allow_lan: bool,
    /// Open this port on the tunnel device during `apply`
    pub forwarded_port: Option<u16>,
}

/// The firewall policy engine
pub struct Firewall<R: RuleRunner> {
    runner: R,
}

impl<R: RuleRunner> Firewall<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Reset the filter to accept-all and clear every rule and counter
    pub fn reset(&self) -> Result<(), FirewallError> {
        self.runner.run(&["--policy", "INPUT", "ACCEPT"])?;
        self.runner.run(&["--policy", "OUTPUT", "ACCEPT"])?;
        self.runner.run(&["--policy", "FORWARD", "ACCEPT"])?;
        self.runner.run(&["-Z"])?;
        self.runner.run(&["-F"])?;
        self.runner.run(&["-X"])?;
        Ok(())
    }

    /// Build the restrictive policy for an active tunnel
    ///
    /// Always resets first. Rule order matters: default-deny precedes every
    /// allow rule, and the control-channel allow precedes general traffic.
    pub fn apply(&self, params: &FirewallPolicyParams) -> Result<(), FirewallError> {
        self.reset()?;

        // Lockdown
        self.runner.run(&["--policy", "OUTPUT", "DROP"])?;
        self.runner.run(&["--policy", "INPUT", "DROP"])?;
        self.runner.run(&["--policy", "FORWARD", "DROP"])?;

        // Outbound: loopback, everything via the tunnel, and the control channel
        self.enable_output_device("lo")?;
        self.enable_output_device(&params.tunnel_device)?;
        let port = params.remote_port.to_string();
        self.runner.run(&[
            "-A", "OUTPUT",
            "-o", &params.default_device,
            "-d", &params.remote_addr,
            "-p", &params.remote_protocol,
            "--dport", &port,
            "-j", "ACCEPT",
        ])?;

        // Inbound: loopback and stateful return traffic
        self.runner.run(&["-A", "INPUT", "-i", "lo", "-j", "ACCEPT"])?;
        self.runner.run(&[
            "-A", "INPUT",
            "-m", "state",
            "--state", "ESTABLISHED,RELATED",
            "-j", "ACCEPT",
        ])?;

        if let Some(port) = params.forwarded_port {
            self.allow_forwarded_port(&params.tunnel_device, port)?;
        }

        if params.allow_lan {
            self.allow_lan(&params.default_device, &params.gateway_addr)?;
        }

        Ok(())
    }

    /// Open inbound TCP and UDP for a forwarded port, scoped to the tunnel device
    pub fn allow_forwarded_port(&self, device: &str, port: u16) -> Result<(), FirewallError> {
        let port = port.to_string();
        for protocol in ["tcp", "udp"] {
            self.runner.run(&[
                "-A", "INPUT",
                "-i", device,
                "-p", protocol,
                "--dport", &port,
                "-j", "ACCEPT",
            ])?;
        }
        Ok(())
    }

    /// Bridge local-network reachability while the tunnel is active
    pub fn allow_lan(&self, device: &str, address: &str) -> Result<(), FirewallError> {
        self.runner.run(&[
            "-A", "OUTPUT", "-o", device, "-d", address, "-j", "ACCEPT",
        ])?;
        self.runner.run(&[
            "-A", "INPUT", "-i", device, "-s", address, "-j", "ACCEPT",
        ])?;
        Ok(())
    }

    fn enable_output_device(&self, device: &str) -> Result<(), FirewallError> {
        self.runner
            .run(&["-A", "OUTPUT", "-o", device, "-j", "ACCEPT"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every rule invocation; optionally fails on a chosen invocation
    struct RecordingRunner {
        calls: RefCell<Vec<Vec<String>>>,
        fail_at: Option<usize>,
    }

    impl RecordingRunner {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail_at: None,
            }
        }

        fn failing_at(index: usize) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail_at: Some(index),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().clone()
        }
    }

    impl RuleRunner for RecordingRunner {
        fn run(&self, args: &[&str]) -> Result<(), FirewallError> {
            let index = self.calls.borrow().len();
            self.calls
                .borrow_mut()
                .push(args.iter().map(|s| s.to_string()).collect());
            if self.fail_at == Some(index) {
                return Err(FirewallError::RuleFailed {
                    args: args.join(" "),
                    code: Some(1),
                });
            }
            Ok(())
        }
    }

    fn params() -> FirewallPolicyParams {
        FirewallPolicyParams {
            default_device: "eth0".to_string(),
            gateway_addr: "192.168.1.1".to_string(),
            tunnel_device: "tun0".to_string(),
            remote_addr: "10.9.8.7".to_string(),
            remote_port: 1198,
            remote_protocol: "udp".to_string(),
            allow_lan: true,
            forwarded_port: None,
        }
    }

    fn position(calls: &[Vec<String>], needle: &[&str]) -> Option<usize> {
        calls.iter().position(|call| call == needle)
    }

    #[test]
    fn test_reset_sequence() {
        let runner = RecordingRunner::new();
        Firewall::new(&runner).reset().unwrap();
        let calls = runner.calls();
        assert_eq!(calls[0], vec!["--policy", "INPUT", "ACCEPT"]);
        assert_eq!(calls[1], vec!["--policy", "OUTPUT", "ACCEPT"]);
        assert_eq!(calls[2], vec!["--policy", "FORWARD", "ACCEPT"]);
        assert_eq!(calls[3], vec!["-Z"]);
        assert_eq!(calls[4], vec!["-F"]);
        assert_eq!(calls[5], vec!["-X"]);
    }

    #[test]
    fn test_apply_resets_first_and_denies_before_allowing() {
        let runner = RecordingRunner::new();
        Firewall::new(&runner).apply(&params()).unwrap();
        let calls = runner.calls();

        // Reset comes first
        assert_eq!(calls[0], vec!["--policy", "INPUT", "ACCEPT"]);
        assert_eq!(calls[5], vec!["-X"]);

        // Every default-deny precedes every allow rule
        let last_deny = calls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.last().map(|s| s == "DROP").unwrap_or(false))
            .map(|(i, _)| i)
            .max()
            .unwrap();
        let first_allow = calls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.first().map(|s| s == "-A").unwrap_or(false))
            .map(|(i, _)| i)
            .min()
            .unwrap();
        assert!(last_deny < first_allow);
    }

    #[test]
    fn test_apply_includes_control_channel_rule() {
        let runner = RecordingRunner::new();
        Firewall::new(&runner).apply(&params()).unwrap();
        let calls = runner.calls();
        let control = position(
            &calls,
            &[
                "-A", "OUTPUT", "-o", "eth0", "-d", "10.9.8.7", "-p", "udp", "--dport",
                "1198", "-j", "ACCEPT",
            ],
        );
        assert!(control.is_some());
    }

    #[test]
    fn test_apply_lan_bridge_toggle() {
        let runner = RecordingRunner::new();
        let mut p = params();
        p.allow_lan = false;
        Firewall::new(&runner).apply(&p).unwrap();
        assert!(position(
            &runner.calls(),
            &["-A", "OUTPUT", "-o", "eth0", "-d", "192.168.1.1", "-j", "ACCEPT"],
        )
        .is_none());

        let runner = RecordingRunner::new();
        Firewall::new(&runner).apply(&params()).unwrap();
        let calls = runner.calls();
        assert!(position(
            &calls,
            &["-A", "OUTPUT", "-o", "eth0", "-d", "192.168.1.1", "-j", "ACCEPT"],
        )
        .is_some());
        assert!(position(
            &calls,
            &["-A", "INPUT", "-i", "eth0", "-s", "192.168.1.1", "-j", "ACCEPT"],
        )
        .is_some());
    }

    #[test]
    fn test_apply_forwarded_port_rules() {
        let runner = RecordingRunner::new();
        let mut p = params();
        p.forwarded_port = Some(54321);
        Firewall::new(&runner).apply(&p).unwrap();
        let calls = runner.calls();
        for protocol in ["tcp", "udp"] {
            assert!(position(
                &calls,
                &["-A", "INPUT", "-i", "tun0", "-p", protocol, "--dport", "54321", "-j", "ACCEPT"],
            )
            .is_some());
        }
    }

    #[test]
    fn test_rule_failure_is_fatal_and_stops_the_sequence() {
        let runner = RecordingRunner::failing_at(7);
        let result = Firewall::new(&runner).apply(&params());
        assert!(result.is_err());
        // Nothing ran past the failing invocation
        assert_eq!(runner.calls().len(), 8);
    }
}
