//! Configuration for BuddyWatch.
//!
//! Settings structs live in [`settings`]; INI persistence at
//! `~/.buddywatch/config.ini` lives in [`file`].

mod file;
mod settings;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{AlertSettings, ConfigFile, WatchSettings};
