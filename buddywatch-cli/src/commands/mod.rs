//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`roster`] - Roster management (list, add, remove, rename)
//! - [`watch`] - Run the proximity watch until interrupted

pub mod roster;
pub mod watch;
