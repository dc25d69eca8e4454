//! Firewall command implementations

use anyhow::{Context, Result};

use crate::output::print_success;
use tw_core::firewall::{Firewall, IptablesRunner};

/// Reset the packet filter to accept-all
///
/// Recovery path for a lockdown left behind by a dead tunnel.
pub fn firewall_down() -> Result<()> {
    Firewall::new(IptablesRunner)
        .reset()
        .context("Failed to reset the packet filter")?;
    print_success("Firewall reset to accept-all");
    Ok(())
}
