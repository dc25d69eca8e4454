//! User configuration and option sets
//!
//! The TOML config declares named option sets, each naming server patterns
//! and a selection discipline. Resolution against the catalog happens here;
//! the orchestrator only ever sees an already-resolved `ServerOptionSet`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::ServerRecord;
use crate::error::ConfigError;

/// Server selection discipline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    /// Candidate order is the pattern-matched order
    #[default]
    First,
    /// Most-recently-used first
    Recent,
    /// Lowest probed latency first
    Fastest,
    /// Least-recently-used first
    Rotation,
}

/// One named option set as written in the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionSetConfig {
    /// Server name patterns; `*` wildcards, matched case-insensitively
    pub servers: Vec<String>,
    pub discipline: Option<Discipline>,
    pub port_forwarding: Option<bool>,
    pub block_lan: Option<bool>,
    pub disable_firewall: Option<bool>,
}

/// Defaults applied to fields an option set leaves unset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionDefaults {
    pub discipline: Discipline,
    pub port_forwarding: bool,
    pub block_lan: bool,
    pub disable_firewall: bool,
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Name of the option set used when none is requested
    pub default: Option<String>,
    pub defaults: OptionDefaults,
    pub option_set: BTreeMap<String, OptionSetConfig>,
}

impl ConfigFile {
    /// Load and parse the configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;
        let config: ConfigFile = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Pick the requested or default option set and resolve it against the catalog
    pub fn resolve_option_set(
        &self,
        name: Option<&str>,
        catalog: &[ServerRecord],
    ) -> Result<ServerOptionSet, ConfigError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => match &self.default {
                Some(default) => default.clone(),
                None if self.option_set.len() == 1 => {
                    self.option_set.keys().next().cloned().unwrap_or_default()
                }
                None => return Err(ConfigError::NoDefaultOptionSet),
            },
        };
        let set = self
            .option_set
            .get(&name)
            .ok_or_else(|| ConfigError::UnknownOptionSet(name.clone()))?;

        Ok(ServerOptionSet {
            servers: match_servers(&set.servers, catalog),
            discipline: set.discipline.unwrap_or(self.defaults.discipline),
            port_forwarding: set.port_forwarding.unwrap_or(self.defaults.port_forwarding),
            block_lan: set.block_lan.unwrap_or(self.defaults.block_lan),
            disable_firewall: set
                .disable_firewall
                .unwrap_or(self.defaults.disable_firewall),
            name,
        })
    }

    /// Commented starter configuration written by `config init`
    pub fn starter_text() -> &'static str {
        r#"# tunwall configuration.
#
# Each [option_set.<name>] table names the servers it may connect to and how
# to pick among them. `servers` entries allow '*' wildcards and are matched
# case-insensitively. `default` names the set used when none is requested.

default = "primary"

[defaults]
# discipline choices: first, recent, fastest, rotation
discipline = "first"
port_forwarding = false
block_lan = false
disable_firewall = false

[option_set.primary]
servers = ["UK London"]

# Example with rotated wildcard servers and port forwarding. All disciplines
# fall back to the next sequential server when one is unavailable.
#[option_set.port-forward]
#servers = ["CA *", "France"]
#port_forwarding = true
#discipline = "rotation"
"#
    }
}

/// A resolved, read-only selection policy
#[derive(Debug, Clone)]
pub struct ServerOptionSet {
    /// Option set name from the config file
    pub name: String,
    /// Matched servers, de-duplicated, in pattern order
    pub servers: Vec<ServerRecord>,
    pub discipline: Discipline,
    pub port_forwarding: bool,
    pub block_lan: bool,
    pub disable_firewall: bool,
}

/// Match catalog entries against the pattern list
///
/// Patterns are tried in order; within one pattern, catalog order applies.
/// Matching is case-insensitive and each server appears at most once,
/// keeping its first-match position.
pub fn match_servers(patterns: &[String], catalog: &[ServerRecord]) -> Vec<ServerRecord> {
    let mut matched: Vec<ServerRecord> = Vec::new();
    for pattern in patterns {
        for server in catalog {
            if wildcard_match(pattern, &server.name)
                && !matched.iter().any(|s| s.name == server.name)
            {
                matched.push(server.clone());
            }
        }
    }
    matched
}

/// Case-insensitive `*`-wildcard match over the whole name
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    fn matches(pattern: &[char], name: &[char]) -> bool {
        match (pattern.first(), name.first()) {
            (None, None) => true,
            (Some('*'), _) => {
                matches(&pattern[1..], name)
                    || (!name.is_empty() && matches(pattern, &name[1..]))
            }
            (Some(p), Some(n)) if p == n => matches(&pattern[1..], &name[1..]),
            _ => false,
        }
    }
    let pattern: Vec<char> = pattern.trim().to_lowercase().chars().collect();
    let name: Vec<char> = name.trim().to_lowercase().chars().collect();
    matches(&pattern, &name)
}
