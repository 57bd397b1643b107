//! Position feeds and per-buddy subscription management.
//!
//! A [`PositionFeed`] hands out one [`PositionSubscription`] per vessel
//! context: a stream of [`FeedEvent`]s plus a cancellation token that
//! acts as the unsubscribe action. [`SubscriptionManager`] stands up
//! one subscription per roster buddy and forwards every sample, tagged
//! with its buddy id, into a single channel consumed by the watch
//! service's dispatch loop - per-buddy ordering is preserved because
//! each feed delivers in order and the dispatch loop is serialized.
//!
//! Any configuration change (buddy added/removed/renamed, settings
//! changed) tears down the whole [`SubscriptionHandle`] and builds a
//! new one; the manager holds no cross-call state beyond the handle.

pub mod udp;

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::datamodel::VesselContext;
use crate::geo::Position;
use crate::roster::{Buddy, BuddyId};

/// Buffer size for the per-subscription event channel.
const SUBSCRIPTION_CHANNEL_CAPACITY: usize = 16;

/// Delivery policy for a position subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Forward every update as soon as it arrives, no batching.
    #[default]
    Instant,
}

/// An incoming position observation for a tracked buddy.
///
/// Arrival order defines recency; only the latest sample per buddy
/// matters downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSample {
    /// The tracked buddy this sample belongs to.
    pub buddy: BuddyId,
    /// The observed position.
    pub position: Position,
}

/// Errors surfaced by position feeds.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Failed to bind the feed's UDP socket.
    #[error("failed to bind UDP socket on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Delivery on one subscription failed. Non-fatal: other
    /// subscriptions are unaffected.
    #[error("subscription delivery failed for {context}: {reason}")]
    Delivery { context: String, reason: String },
}

/// One event on a position subscription.
#[derive(Debug)]
pub enum FeedEvent {
    /// A position update for the subscribed vessel.
    Sample(Position),
    /// A delivery error; the subscription is considered inactive
    /// until explicitly re-established.
    Error(FeedError),
}

/// An active subscription to one vessel's position.
pub struct PositionSubscription {
    /// Stream of samples and delivery errors.
    pub events: mpsc::Receiver<FeedEvent>,
    /// Cancelling this token unsubscribes.
    pub unsubscribe: CancellationToken,
}

/// Source of per-vessel position streams.
pub trait PositionFeed: Send + Sync {
    /// Subscribe to a vessel's position updates.
    fn subscribe(&self, context: &VesselContext, policy: DeliveryPolicy) -> PositionSubscription;
}

/// Sink for non-fatal subscription delivery errors.
pub trait ErrorSink: Send + Sync {
    /// Report a delivery error to the operator.
    fn report(&self, message: &str);
}

/// Error sink that logs via `tracing`.
#[derive(Debug, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, message: &str) {
        tracing::warn!(message, "subscription error");
    }
}

/// Aggregated unsubscribe actions for one subscription generation.
///
/// Tearing down cancels every per-buddy subscription exactly once;
/// repeated teardown is a no-op, and teardown is safe to call at any
/// time, including while samples are in flight.
#[derive(Debug, Default)]
pub struct SubscriptionHandle {
    tokens: Mutex<Vec<CancellationToken>>,
}

impl SubscriptionHandle {
    fn new(tokens: Vec<CancellationToken>) -> Self {
        Self {
            tokens: Mutex::new(tokens),
        }
    }

    /// Number of subscriptions still held (0 after teardown).
    pub fn subscription_count(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    /// Cancel every aggregated unsubscribe action exactly once.
    pub fn teardown(&self) {
        let tokens: Vec<CancellationToken> = self.tokens.lock().unwrap().drain(..).collect();
        for token in tokens {
            token.cancel();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Establishes one position subscription per roster buddy.
pub struct SubscriptionManager;

impl SubscriptionManager {
    /// Subscribe to every buddy's position feed.
    ///
    /// Each subscription's samples are forwarded into `sample_tx`,
    /// tagged with the buddy id. Delivery errors are logged, reported
    /// to `errors`, and leave only the failing subscription inactive.
    pub fn resubscribe_all(
        feed: &dyn PositionFeed,
        buddies: &[Buddy],
        sample_tx: mpsc::Sender<PositionSample>,
        errors: Arc<dyn ErrorSink>,
    ) -> SubscriptionHandle {
        let mut tokens = Vec::with_capacity(buddies.len());

        for buddy in buddies {
            let context = VesselContext::vessel(buddy.id.as_str());
            let subscription = feed.subscribe(&context, DeliveryPolicy::Instant);
            tokens.push(subscription.unsubscribe.clone());

            tracing::debug!(context = %context, "subscribed to buddy position");
            tokio::spawn(Self::forward(
                buddy.id.clone(),
                context,
                subscription,
                sample_tx.clone(),
                errors.clone(),
            ));
        }

        SubscriptionHandle::new(tokens)
    }

    /// Forward one subscription's samples until unsubscribed, the feed
    /// closes, or a delivery error leaves the subscription inactive.
    async fn forward(
        buddy: BuddyId,
        context: VesselContext,
        mut subscription: PositionSubscription,
        sample_tx: mpsc::Sender<PositionSample>,
        errors: Arc<dyn ErrorSink>,
    ) {
        loop {
            tokio::select! {
                _ = subscription.unsubscribe.cancelled() => break,
                event = subscription.events.recv() => match event {
                    Some(FeedEvent::Sample(position)) => {
                        let sample = PositionSample {
                            buddy: buddy.clone(),
                            position,
                        };
                        if sample_tx.send(sample).await.is_err() {
                            break;
                        }
                    }
                    Some(FeedEvent::Error(error)) => {
                        tracing::warn!(context = %context, error = %error, "position delivery error");
                        errors.report(&error.to_string());
                        break;
                    }
                    None => break,
                },
            }
        }
        tracing::debug!(context = %context, "position forwarding stopped");
    }
}
