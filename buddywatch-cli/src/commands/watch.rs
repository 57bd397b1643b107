//! The watch command - run the proximity watch until interrupted.
//!
//! While running, the configuration file is polled so roster mutations
//! made by `add`/`remove`/`rename` (or a hand-edited file) take effect
//! without restarting: every saved change resubscribes through
//! [`BuddyWatchService::reconfigure`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use buddywatch::alarm::TracingNotificationSink;
use buddywatch::config::{config_file_path, ConfigFile};
use buddywatch::datamodel::SharedDataModel;
use buddywatch::feed::udp::{UdpDeltaFeed, UdpDeltaFeedConfig};
use buddywatch::feed::TracingErrorSink;
use buddywatch::logging::{init_logging, DEFAULT_LOG_DIR, DEFAULT_LOG_FILE};
use buddywatch::service::BuddyWatchService;

use crate::error::CliError;

/// How often the configuration file is checked for changes.
const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Start watching and block until Ctrl+C.
pub async fn run(config_path: Option<&Path>, port: Option<u16>) -> Result<(), CliError> {
    let _logging =
        init_logging(DEFAULT_LOG_DIR, DEFAULT_LOG_FILE).map_err(CliError::LoggingInit)?;

    let path: PathBuf = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);
    let mut config = ConfigFile::load_from(&path).map_err(CliError::Config)?;

    let data_model = Arc::new(SharedDataModel::new());
    let feed_config = UdpDeltaFeedConfig {
        port: port.unwrap_or(config.watch.udp_port),
        self_id: config.watch.self_id.clone(),
    };
    let feed = Arc::new(
        UdpDeltaFeed::bind(feed_config, data_model.clone())
            .await
            .map_err(CliError::Feed)?,
    );

    println!("BuddyWatch v{}", buddywatch::VERSION);
    println!("Listening for deltas on UDP port {}", feed.local_port());
    println!(
        "Watching {} buddy(ies), alert distance {}m{}",
        config.roster.len(),
        config.alert.distance_meters,
        if config.alert.enabled {
            ""
        } else {
            " (alerts disabled)"
        }
    );
    println!("Configuration changes are picked up automatically.");
    println!("Press Ctrl+C to stop.");

    let mut service = BuddyWatchService::start(
        feed.clone(),
        data_model,
        Arc::new(TracingNotificationSink),
        Arc::new(TracingErrorSink),
        config.roster.clone(),
        config.alert.clone(),
    );

    let mut poll = tokio::time::interval(CONFIG_POLL_INTERVAL);
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.map_err(CliError::Signal)?;
                info!("interrupt received, shutting down");
                break;
            }
            _ = poll.tick() => {
                if let Some(latest) = reload_if_changed(&path, &config) {
                    info!(buddies = latest.roster.len(), "configuration changed, resubscribing");
                    service.reconfigure(latest.roster.clone(), latest.alert.clone());
                    config = latest;
                }
            }
        }
    }

    feed.shutdown();
    service.shutdown().await;

    println!();
    println!("Stopped.");
    Ok(())
}

/// Load the on-disk configuration if it differs from the running one.
///
/// An unreadable file is logged and ignored, keeping the running
/// configuration; a half-written save is picked up on a later poll.
fn reload_if_changed(path: &Path, current: &ConfigFile) -> Option<ConfigFile> {
    match ConfigFile::load_from(path) {
        Ok(latest) if &latest != current => Some(latest),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "ignoring unreadable configuration change");
            None
        }
    }
}
