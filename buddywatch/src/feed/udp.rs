//! UDP delta feed - position updates as Signal K style delta JSON.
//!
//! Listens on a UDP socket for delta datagrams of the form:
//!
//! ```json
//! {
//!   "context": "vessels.urn:mrn:imo:mmsi:123456",
//!   "updates": [{
//!     "values": [{
//!       "path": "navigation.position",
//!       "value": { "latitude": 53.5, "longitude": 10.0 }
//!     }]
//!   }]
//! }
//! ```
//!
//! Position values are routed to the per-context subscribers and
//! mirrored into the shared data model; `name` values (either at the
//! `name` path or inside a root-path object) update the vessel's
//! published name. Deltas for the configured local vessel - or with no
//! context at all - update the own-position entry instead.
//!
//! Malformed packets are counted and skipped; the only hard error is
//! failing to bind the socket.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::datamodel::{paths, AttributeValue, VesselContext, VesselDataModel};
use crate::geo::Position;

use super::{
    DeliveryPolicy, FeedError, FeedEvent, PositionFeed, PositionSubscription,
    SUBSCRIPTION_CHANNEL_CAPACITY,
};

/// Maximum datagram size we expect.
const MAX_PACKET_SIZE: usize = 2048;

/// Default UDP port for delta input.
pub const DEFAULT_UDP_PORT: u16 = 20220;

/// UDP delta feed configuration.
#[derive(Debug, Clone)]
pub struct UdpDeltaFeedConfig {
    /// UDP port to listen on. Port 0 binds an ephemeral port.
    pub port: u16,

    /// Identifier of the local vessel. Deltas carrying this vessel's
    /// context are stored as own position; deltas with no context are
    /// always treated as the local vessel's.
    pub self_id: Option<String>,
}

impl Default for UdpDeltaFeedConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_UDP_PORT,
            self_id: None,
        }
    }
}

/// One registered position subscriber.
struct Subscriber {
    events: mpsc::Sender<FeedEvent>,
    unsubscribe: CancellationToken,
}

type SubscriberMap = Arc<Mutex<HashMap<VesselContext, Vec<Subscriber>>>>;

/// UDP-backed [`PositionFeed`].
pub struct UdpDeltaFeed {
    subscribers: SubscriberMap,
    shutdown: CancellationToken,
    local_port: u16,
}

impl UdpDeltaFeed {
    /// Bind the socket and start the receive loop.
    pub async fn bind(
        config: UdpDeltaFeedConfig,
        data_model: Arc<dyn VesselDataModel>,
    ) -> Result<Self, FeedError> {
        let socket = UdpSocket::bind(("0.0.0.0", config.port))
            .await
            .map_err(|e| FeedError::Bind {
                port: config.port,
                source: e,
            })?;
        let local_port = socket
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or(config.port);

        let subscribers: SubscriberMap = Arc::new(Mutex::new(HashMap::new()));
        let shutdown = CancellationToken::new();
        let self_context = config.self_id.as_deref().map(VesselContext::vessel);

        tokio::spawn(Self::run(
            socket,
            subscribers.clone(),
            data_model,
            self_context,
            shutdown.clone(),
        ));

        Ok(Self {
            subscribers,
            shutdown,
            local_port,
        })
    }

    /// The port the socket is actually bound to.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Stop the receive loop. Existing subscriptions see their event
    /// stream end.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Receive loop: parse datagrams and route their values.
    async fn run(
        socket: UdpSocket,
        subscribers: SubscriberMap,
        data_model: Arc<dyn VesselDataModel>,
        self_context: Option<VesselContext>,
        shutdown: CancellationToken,
    ) {
        info!(port = socket.local_addr().map(|a| a.port()).unwrap_or(0), "UDP delta feed started");

        let mut buffer = [0u8; MAX_PACKET_SIZE];
        let mut packets: u64 = 0;
        let mut malformed: u64 = 0;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = socket.recv_from(&mut buffer) => match result {
                    Ok((len, _addr)) => {
                        packets += 1;
                        match serde_json::from_slice::<Delta>(&buffer[..len]) {
                            Ok(delta) => {
                                apply_delta(delta, &subscribers, data_model.as_ref(), self_context.as_ref());
                            }
                            Err(e) => {
                                malformed += 1;
                                trace!(error = %e, "skipping malformed delta");
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "UDP receive failed");
                    }
                },
            }
        }

        // Close all subscription streams
        subscribers.lock().unwrap().clear();
        debug!(packets, malformed, "UDP delta feed stopped");
    }
}

impl PositionFeed for UdpDeltaFeed {
    fn subscribe(&self, context: &VesselContext, _policy: DeliveryPolicy) -> PositionSubscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CHANNEL_CAPACITY);
        let unsubscribe = CancellationToken::new();

        self.subscribers
            .lock()
            .unwrap()
            .entry(context.clone())
            .or_default()
            .push(Subscriber {
                events: tx,
                unsubscribe: unsubscribe.clone(),
            });

        PositionSubscription {
            events: rx,
            unsubscribe,
        }
    }
}

/// An incoming delta datagram.
#[derive(Debug, Deserialize)]
struct Delta {
    context: Option<String>,
    #[serde(default)]
    updates: Vec<DeltaUpdate>,
}

#[derive(Debug, Deserialize)]
struct DeltaUpdate {
    #[serde(default)]
    values: Vec<DeltaValue>,
}

#[derive(Debug, Deserialize)]
struct DeltaValue {
    #[serde(default)]
    path: String,
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PositionValue {
    latitude: f64,
    longitude: f64,
}

/// Route one delta's values into the data model and to subscribers.
fn apply_delta(
    delta: Delta,
    subscribers: &SubscriberMap,
    data_model: &dyn VesselDataModel,
    self_context: Option<&VesselContext>,
) {
    // A delta without a context describes the local vessel.
    let context = delta
        .context
        .map(VesselContext::from_raw)
        .unwrap_or_else(VesselContext::own);
    let is_self = Some(&context) == self_context || context == VesselContext::own();

    for update in delta.updates {
        for pv in update.values {
            match pv.path.as_str() {
                paths::POSITION => {
                    let Ok(value) = serde_json::from_value::<PositionValue>(pv.value) else {
                        trace!(context = %context, "skipping unparseable position value");
                        continue;
                    };
                    let position = Position::new(value.latitude, value.longitude);

                    if is_self {
                        data_model.set(
                            &VesselContext::own(),
                            paths::POSITION,
                            AttributeValue::Position(position),
                        );
                    } else {
                        data_model.set(
                            &context,
                            paths::POSITION,
                            AttributeValue::Position(position),
                        );
                        deliver(subscribers, &context, position);
                    }
                }
                paths::NAME => {
                    if let serde_json::Value::String(name) = pv.value {
                        data_model.set(&context, paths::NAME, AttributeValue::Text(name));
                    }
                }
                // Root-path object values may carry the vessel name
                "" => {
                    if let Some(name) = pv.value.get("name").and_then(|n| n.as_str()) {
                        data_model.set(
                            &context,
                            paths::NAME,
                            AttributeValue::Text(name.to_string()),
                        );
                    }
                }
                _ => {}
            }
        }
    }
}

/// Hand a position to every live subscriber of a context, pruning
/// unsubscribed and closed ones.
fn deliver(subscribers: &SubscriberMap, context: &VesselContext, position: Position) {
    let mut map = subscribers.lock().unwrap();
    let Some(subs) = map.get_mut(context) else {
        return;
    };

    subs.retain(|sub| {
        if sub.unsubscribe.is_cancelled() {
            return false;
        }
        match sub.events.try_send(FeedEvent::Sample(position)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                // Instant policy: the consumer is lagging, drop this sample
                warn!(context = %context, "subscriber lagging, dropping position sample");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    });

    if subs.is_empty() {
        map.remove(context);
    }
}
