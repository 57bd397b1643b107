//! Configuration file handling for ~/.buddywatch/config.ini.
//!
//! Loads and saves user configuration with sensible defaults. A
//! missing file yields defaults; saving creates the directory. The
//! `[buddies]` section stores numbered pairs (`id1 = <urn>`,
//! `name1 = <name>`, the name key absent for unnamed buddies),
//! preserving roster order. Identifiers are always stored as values,
//! never as keys: URN-like ids contain `:`, which the INI parser
//! treats as a key/value delimiter.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::roster::{Buddy, Roster};

use super::settings::{AlertSettings, ConfigFile, WatchSettings};

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("failed to read config file: {0}")]
    Read(#[from] ini::Error),

    /// Failed to write config file
    #[error("failed to write config file: {0}")]
    Write(std::io::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("failed to create config directory: {0}")]
    Directory(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path
    /// (~/.buddywatch/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path, creating the parent
    /// directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::Directory)?;
        }

        to_ini(self)
            .write_to_file(path)
            .map_err(ConfigFileError::Write)
    }
}

/// Get the path to the config directory (~/.buddywatch).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".buddywatch")
}

/// Get the path to the config file (~/.buddywatch/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "expected true or false")),
    }
}

fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("alert")) {
        if let Some(value) = section.get("enabled") {
            config.alert.enabled = parse_bool("alert", "enabled", value)?;
        }
        if let Some(value) = section.get("distance_meters") {
            let distance: f64 = value
                .parse()
                .map_err(|_| invalid("alert", "distance_meters", value, "expected a number"))?;
            if distance <= 0.0 {
                return Err(invalid(
                    "alert",
                    "distance_meters",
                    value,
                    "must be positive",
                ));
            }
            config.alert.distance_meters = distance;
        }
    }

    if let Some(section) = ini.section(Some("watch")) {
        if let Some(value) = section.get("udp_port") {
            config.watch.udp_port = value
                .parse()
                .map_err(|_| invalid("watch", "udp_port", value, "expected a port number"))?;
        }
        if let Some(value) = section.get("self_id") {
            if !value.is_empty() {
                config.watch.self_id = Some(value.to_string());
            }
        }
    }

    if let Some(section) = ini.section(Some("buddies")) {
        let mut roster = Roster::new();
        for n in 1usize.. {
            let id_key = format!("id{n}");
            let Some(id) = section.get(&id_key) else {
                break;
            };
            let buddy = match section.get(format!("name{n}")) {
                Some(name) if !name.is_empty() => Buddy::named(id, name),
                _ => Buddy::new(id),
            };
            roster
                .add(buddy)
                .map_err(|e| invalid("buddies", &id_key, id, &e.to_string()))?;
        }
        config.roster = roster;
    }

    Ok(config)
}

fn to_ini(config: &ConfigFile) -> Ini {
    let mut ini = Ini::new();

    ini.with_section(Some("alert"))
        .set("enabled", config.alert.enabled.to_string())
        .set(
            "distance_meters",
            format_distance(config.alert.distance_meters),
        );

    let mut watch = ini.with_section(Some("watch"));
    watch.set("udp_port", config.watch.udp_port.to_string());
    if let Some(self_id) = &config.watch.self_id {
        watch.set("self_id", self_id.clone());
    }

    let mut buddies = ini.with_section(Some("buddies"));
    for (index, buddy) in config.roster.buddies().iter().enumerate() {
        let n = index + 1;
        buddies.set(format!("id{n}"), buddy.id.as_str());
        if let Some(name) = &buddy.name {
            buddies.set(format!("name{n}"), name.as_str());
        }
    }

    ini
}

/// Render the distance without a trailing `.0` for whole meters.
fn format_distance(meters: f64) -> String {
    if meters.fract() == 0.0 {
        format!("{}", meters as i64)
    } else {
        format!("{meters}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::BuddyId;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert!(config.alert.enabled);
        assert_eq!(config.alert.distance_meters, 1000.0);
        assert!(config.watch.self_id.is_none());
        assert!(config.roster.is_empty());
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_round_trip() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.alert.enabled = false;
        config.alert.distance_meters = 1852.0;
        config.watch.udp_port = 4242;
        config.watch.self_id = Some("urn:mrn:imo:mmsi:999999".to_string());
        config
            .roster
            .add(Buddy::named("urn:mrn:imo:mmsi:123456", "Sea Breeze"))
            .unwrap();
        config.roster.add(Buddy::new("urn:mrn:imo:mmsi:654321")).unwrap();

        config.save_to(&path).unwrap();
        let loaded = ConfigFile::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ids_with_delimiter_characters_survive_reload() {
        // URN-like ids are full of `:`, which the INI parser treats as
        // a key/value delimiter; they must never be written as keys.
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config
            .roster
            .add(Buddy::named("urn:mrn:imo:mmsi:123456", "Sea Breeze"))
            .unwrap();
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded.roster.len(), 1);
        let buddy = loaded
            .roster
            .get(&BuddyId::from("urn:mrn:imo:mmsi:123456"))
            .expect("id should survive a save/load cycle intact");
        assert_eq!(buddy.name.as_deref(), Some("Sea Breeze"));
    }

    #[test]
    fn test_unnamed_buddy_round_trips_as_unnamed() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.roster.add(Buddy::new("urn:x")).unwrap();
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert!(loaded
            .roster
            .get(&BuddyId::from("urn:x"))
            .unwrap()
            .name
            .is_none());
    }

    #[test]
    fn test_save_creates_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("config.ini");

        ConfigFile::default().save_to(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_invalid_distance_rejected() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(&path, "[alert]\ndistance_meters = -5\n").unwrap();

        let result = ConfigFile::load_from(&path);
        assert!(matches!(
            result,
            Err(ConfigFileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(&path, "[alert]\nenabled = maybe\n").unwrap();

        let result = ConfigFile::load_from(&path);
        assert!(matches!(
            result,
            Err(ConfigFileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(&path, "[alert]\nenabled = false\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert!(!config.alert.enabled);
        assert_eq!(config.alert.distance_meters, 1000.0);
        assert_eq!(config.watch, WatchSettings::default());
    }

    #[test]
    fn test_alert_settings_default() {
        let settings = AlertSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.distance_meters, 1000.0);
    }
}
