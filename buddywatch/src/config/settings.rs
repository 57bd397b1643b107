//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! Pure data types; parsing and serialization live in [`super::file`].

use crate::feed::udp::DEFAULT_UDP_PORT;
use crate::roster::Roster;

/// Default alert distance in meters.
pub const DEFAULT_ALERT_DISTANCE_METERS: f64 = 1000.0;

/// Proximity alert configuration (`[alert]`).
#[derive(Debug, Clone, PartialEq)]
pub struct AlertSettings {
    /// Whether proximity notifications are emitted at all. Membership
    /// flagging happens regardless.
    pub enabled: bool,

    /// Distance below which a buddy is "near", in meters. Positive.
    pub distance_meters: f64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            distance_meters: DEFAULT_ALERT_DISTANCE_METERS,
        }
    }
}

/// Watch service configuration (`[watch]`).
#[derive(Debug, Clone, PartialEq)]
pub struct WatchSettings {
    /// UDP port for incoming delta datagrams.
    pub udp_port: u16,

    /// Identifier of the local vessel, used to recognize own-position
    /// deltas that carry a context.
    pub self_id: Option<String>,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            udp_port: DEFAULT_UDP_PORT,
            self_id: None,
        }
    }
}

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// Alert settings.
    pub alert: AlertSettings,
    /// Watch service settings.
    pub watch: WatchSettings,
    /// The persisted buddy roster (`[buddies]`).
    pub roster: Roster,
}
