//! Roster management commands.
//!
//! Each command follows the same load-mutate-save shape: read the
//! configuration file, apply the change to the roster, and write the
//! file back. Validation failures leave the file untouched.

use std::path::Path;

use buddywatch::config::ConfigFile;
use buddywatch::roster::{Buddy, BuddyId};

use crate::error::CliError;

fn load(config_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match config_path {
        Some(path) => ConfigFile::load_from(path),
        None => ConfigFile::load(),
    }
    .map_err(CliError::Config)
}

fn save(config: &ConfigFile, config_path: Option<&Path>) -> Result<(), CliError> {
    match config_path {
        Some(path) => config.save_to(path),
        None => config.save(),
    }
    .map_err(CliError::Config)
}

/// List the configured buddies.
pub fn list(config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load(config_path)?;

    if config.roster.is_empty() {
        println!("No buddies configured.");
        println!();
        println!("Add one with: buddywatch add <id> [--name <name>]");
        return Ok(());
    }

    println!("{} buddy(ies):", config.roster.len());
    for buddy in config.roster.buddies() {
        match &buddy.name {
            Some(name) => println!("  {}  ({})", buddy.id, name),
            None => println!("  {}", buddy.id),
        }
    }
    Ok(())
}

/// Add a buddy to the roster.
pub fn add(config_path: Option<&Path>, id: &str, name: Option<String>) -> Result<(), CliError> {
    let mut config = load(config_path)?;

    let buddy = match name {
        Some(name) => Buddy::named(id, name),
        None => Buddy::new(id),
    };
    config.roster.add(buddy)?;
    save(&config, config_path)?;

    println!("Added buddy {}", id);
    Ok(())
}

/// Remove a buddy from the roster.
pub fn remove(config_path: Option<&Path>, id: &str) -> Result<(), CliError> {
    let mut config = load(config_path)?;

    let removed = config.roster.remove(&BuddyId::from(id))?;
    save(&config, config_path)?;

    match removed.name {
        Some(name) => println!("Removed buddy {} ({})", removed.id, name),
        None => println!("Removed buddy {}", removed.id),
    }
    Ok(())
}

/// Change or clear a buddy's display name.
pub fn rename(config_path: Option<&Path>, id: &str, name: Option<String>) -> Result<(), CliError> {
    let mut config = load(config_path)?;

    config.roster.rename(&BuddyId::from(id), name.clone())?;
    save(&config, config_path)?;

    match name {
        Some(name) => println!("Renamed buddy {} to {}", id, name),
        None => println!("Cleared name of buddy {}", id),
    }
    Ok(())
}
