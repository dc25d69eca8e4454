//! Servers command implementation

use anyhow::Result;

use crate::output::format_servers;
use tw_core::catalog::build_catalog;
use tw_core::paths::Paths;
use tw_core::state::SavedState;

/// Execute the servers command: print the installed server catalog
pub fn servers_command(paths: &Paths) -> Result<()> {
    let state = SavedState::load(&paths.state_path)?;
    let catalog = build_catalog(paths, &state)?;

    println!("Installed servers:");
    println!("{}", format_servers(&catalog));
    Ok(())
}
