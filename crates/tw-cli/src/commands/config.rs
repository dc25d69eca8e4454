//! Config command implementations

use std::path::Path;

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use tw_core::options::ConfigFile;

/// Write the commented starter configuration
pub fn config_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", config_path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }
    std::fs::write(config_path, ConfigFile::starter_text())
        .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

    print_success(&format!("Created configuration file: {:?}", config_path));
    print_info("Edit the [option_set] tables to match your installed servers");
    Ok(())
}

/// Show the current configuration file, validating that it parses
pub fn config_show(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        print_warning(&format!("No configuration file found at {:?}", config_path));
        print_info("Run 'tunwall config init' to create one");
        return Ok(());
    }

    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
    toml::from_str::<ConfigFile>(&content)
        .with_context(|| format!("Config file does not parse: {:?}", config_path))?;

    print_info(&format!("Configuration file: {:?}", config_path));
    println!();
    println!("{}", content);
    Ok(())
}

/// Print the config file path
pub fn config_path(config_path: &Path) -> Result<()> {
    println!("{}", config_path.display());
    Ok(())
}
