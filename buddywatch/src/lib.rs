//! BuddyWatch - buddy-vessel proximity watching.
//!
//! Tracks a user-curated roster of "buddy" vessels and raises or
//! clears a proximity notification when a buddy comes within (or
//! leaves) a configured distance of the local vessel.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use buddywatch::alarm::TracingNotificationSink;
//! use buddywatch::config::ConfigFile;
//! use buddywatch::datamodel::SharedDataModel;
//! use buddywatch::feed::udp::{UdpDeltaFeed, UdpDeltaFeedConfig};
//! use buddywatch::feed::TracingErrorSink;
//! use buddywatch::service::BuddyWatchService;
//!
//! let config = ConfigFile::load()?;
//! let data_model = Arc::new(SharedDataModel::new());
//! let feed = Arc::new(
//!     UdpDeltaFeed::bind(UdpDeltaFeedConfig::default(), data_model.clone()).await?,
//! );
//!
//! let service = BuddyWatchService::start(
//!     feed,
//!     data_model,
//!     Arc::new(TracingNotificationSink),
//!     Arc::new(TracingErrorSink),
//!     config.roster,
//!     config.alert,
//! );
//!
//! // ... later
//! service.shutdown().await;
//! ```

pub mod alarm;
pub mod config;
pub mod datamodel;
pub mod evaluator;
pub mod feed;
pub mod geo;
pub mod logging;
pub mod membership;
pub mod roster;
pub mod service;

/// Version of the BuddyWatch library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
