use granero_core::config::load_config;
use granero_core::error::GraneroError;
use std::path::Path;

use super::engine_config;
use crate::output;

pub fn show(config_file: Option<&Path>) -> Result<(), GraneroError> {
    let config = engine_config(config_file)?;
    output::json::print(&config)
}

pub fn validate(file: &Path) -> Result<(), GraneroError> {
    let config = load_config(file)?;
    println!("Valid config: {}", file.display());
    println!("  Silo prefix: {}", config.silo_prefix);
    println!("  Silo aliases: {}", config.silo_aliases.len());
    for (alias, silo) in &config.silo_aliases {
        println!("    {} -> {}", alias, silo);
    }
    println!("  Line gap: {} pt", config.line_gap);
    Ok(())
}
