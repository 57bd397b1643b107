//! Watch service - owns the evaluator lifecycle and subscriptions.
//!
//! [`BuddyWatchService::start`] spawns a single dispatch loop that
//! consumes position samples in arrival order and feeds them to the
//! [`ProximityEvaluator`], then stands up one subscription per roster
//! buddy. Serializing evaluation in one task preserves per-buddy
//! ordering without locks around the notification map.
//!
//! Any configuration change goes through [`BuddyWatchService::reconfigure`],
//! which atomically swaps the subscription handle: the old handle is
//! torn down before the new one is created, so no duplicate or
//! orphaned subscriptions survive a roster update.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::alarm::NotificationSink;
use crate::config::AlertSettings;
use crate::datamodel::{paths, AttributeValue, VesselContext, VesselDataModel};
use crate::evaluator::ProximityEvaluator;
use crate::feed::{
    ErrorSink, PositionFeed, PositionSample, SubscriptionHandle, SubscriptionManager,
};
use crate::roster::Roster;

/// Buffer size for the dispatch sample channel.
const SAMPLE_CHANNEL_CAPACITY: usize = 64;

/// The running proximity watch.
///
/// # Lifecycle
///
/// 1. **start**: spawns the dispatch loop and subscribes to every buddy
/// 2. **reconfigure**: swaps subscriptions and the roster snapshot
/// 3. **shutdown**: tears down subscriptions and stops the loop
pub struct BuddyWatchService {
    feed: Arc<dyn PositionFeed>,
    data_model: Arc<dyn VesselDataModel>,
    errors: Arc<dyn ErrorSink>,
    evaluator: Arc<Mutex<ProximityEvaluator>>,
    roster: Roster,
    sample_tx: mpsc::Sender<PositionSample>,
    subscriptions: SubscriptionHandle,
    dispatch: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl BuddyWatchService {
    /// Start watching the given roster.
    pub fn start(
        feed: Arc<dyn PositionFeed>,
        data_model: Arc<dyn VesselDataModel>,
        sink: Arc<dyn NotificationSink>,
        errors: Arc<dyn ErrorSink>,
        roster: Roster,
        settings: AlertSettings,
    ) -> Self {
        let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        let evaluator = Arc::new(Mutex::new(ProximityEvaluator::new(
            roster.clone(),
            settings,
            data_model.clone(),
            sink,
        )));

        let shutdown = CancellationToken::new();
        let dispatch = tokio::spawn(Self::dispatch(
            sample_rx,
            evaluator.clone(),
            shutdown.clone(),
        ));

        let subscriptions = SubscriptionManager::resubscribe_all(
            feed.as_ref(),
            roster.buddies(),
            sample_tx.clone(),
            errors.clone(),
        );

        info!(buddies = roster.len(), "buddy watch started");
        Self {
            feed,
            data_model,
            errors,
            evaluator,
            roster,
            sample_tx,
            subscriptions,
            dispatch: Some(dispatch),
            shutdown,
        }
    }

    /// Apply a changed roster and settings.
    ///
    /// Tears down the old subscription handle, updates the evaluator's
    /// snapshot (pruning alarm records for removed buddies), clears
    /// the membership flag of vessels dropped from the roster, and
    /// stands up fresh subscriptions.
    pub fn reconfigure(&mut self, roster: Roster, settings: AlertSettings) {
        self.subscriptions.teardown();

        for buddy in self.roster.buddies() {
            if !roster.contains(&buddy.id) {
                let context = VesselContext::vessel(buddy.id.as_str());
                debug!(buddy = %buddy.id, "clearing membership flag for removed buddy");
                self.data_model
                    .set(&context, paths::BUDDY, AttributeValue::Bool(false));
            }
        }

        self.evaluator
            .lock()
            .unwrap()
            .reconfigure(roster.clone(), settings);
        self.subscriptions = SubscriptionManager::resubscribe_all(
            self.feed.as_ref(),
            roster.buddies(),
            self.sample_tx.clone(),
            self.errors.clone(),
        );
        self.roster = roster;
        info!(buddies = self.roster.len(), "buddy watch reconfigured");
    }

    /// Stop the watch: unsubscribe everything and wait for the
    /// dispatch loop to finish.
    pub async fn shutdown(mut self) {
        self.subscriptions.teardown();
        self.shutdown.cancel();
        if let Some(dispatch) = self.dispatch.take() {
            let _ = dispatch.await;
        }
        info!("buddy watch stopped");
    }

    /// Single dispatch loop: samples are evaluated strictly in arrival
    /// order.
    async fn dispatch(
        mut sample_rx: mpsc::Receiver<PositionSample>,
        evaluator: Arc<Mutex<ProximityEvaluator>>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                sample = sample_rx.recv() => match sample {
                    Some(sample) => {
                        evaluator.lock().unwrap().handle_sample(&sample);
                    }
                    None => break,
                },
            }
        }
        debug!("dispatch loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{AlarmState, Notification};
    use crate::datamodel::{paths, AttributeValue, SharedDataModel, VesselContext};
    use crate::feed::{DeliveryPolicy, FeedEvent, PositionSubscription, TracingErrorSink};
    use crate::geo::Position;
    use crate::roster::Buddy;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Feed the tests drive by hand.
    #[derive(Default)]
    struct ManualFeed {
        senders: Mutex<HashMap<VesselContext, mpsc::Sender<FeedEvent>>>,
    }

    impl ManualFeed {
        async fn push_position(&self, id: &str, position: Position) -> bool {
            let tx = self
                .senders
                .lock()
                .unwrap()
                .get(&VesselContext::vessel(id))
                .cloned();
            match tx {
                Some(tx) => tx.send(FeedEvent::Sample(position)).await.is_ok(),
                None => false,
            }
        }
    }

    impl PositionFeed for ManualFeed {
        fn subscribe(
            &self,
            context: &VesselContext,
            _policy: DeliveryPolicy,
        ) -> PositionSubscription {
            let (tx, rx) = mpsc::channel(16);
            self.senders.lock().unwrap().insert(context.clone(), tx);
            PositionSubscription {
                events: rx,
                unsubscribe: CancellationToken::new(),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<(String, Notification)>>,
    }

    impl NotificationSink for RecordingSink {
        fn publish(&self, path: &str, notification: Notification) {
            self.published
                .lock()
                .unwrap()
                .push((path.to_string(), notification));
        }
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met in time");
    }

    fn own_at_origin() -> Arc<SharedDataModel> {
        let model = Arc::new(SharedDataModel::new());
        model.set(
            &VesselContext::own(),
            paths::POSITION,
            AttributeValue::Position(Position::new(0.0, 0.0)),
        );
        model
    }

    fn north_of_own(meters: f64) -> Position {
        Position::new(meters / 111_195.0, 0.0)
    }

    #[tokio::test]
    async fn test_end_to_end_alert_and_clear() {
        let feed = Arc::new(ManualFeed::default());
        let model = own_at_origin();
        let sink = Arc::new(RecordingSink::default());
        let roster = Roster::from_buddies(vec![Buddy::named("b1", "B1")]);

        let service = BuddyWatchService::start(
            feed.clone(),
            model,
            sink.clone(),
            Arc::new(TracingErrorSink),
            roster,
            AlertSettings::default(),
        );

        // Subscriptions are set up synchronously in start()
        assert!(feed.push_position("b1", north_of_own(800.0)).await);
        wait_for(|| sink.published.lock().unwrap().len() == 1).await;

        assert!(feed.push_position("b1", north_of_own(1500.0)).await);
        wait_for(|| sink.published.lock().unwrap().len() == 2).await;

        {
            let published = sink.published.lock().unwrap();
            assert_eq!(published[0].1.state, AlarmState::Alert);
            assert_eq!(published[1].1.state, AlarmState::Normal);
        }

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconfigure_swaps_subscriptions() {
        let feed = Arc::new(ManualFeed::default());
        let model = own_at_origin();
        let sink = Arc::new(RecordingSink::default());
        let roster = Roster::from_buddies(vec![Buddy::new("b1")]);

        let mut service = BuddyWatchService::start(
            feed.clone(),
            model,
            sink.clone(),
            Arc::new(TracingErrorSink),
            roster,
            AlertSettings::default(),
        );
        assert_eq!(service.subscriptions.subscription_count(), 1);

        // Replace b1 with b2
        let new_roster = Roster::from_buddies(vec![Buddy::new("b2")]);
        service.reconfigure(new_roster, AlertSettings::default());
        assert_eq!(service.subscriptions.subscription_count(), 1);

        // b2 is live
        assert!(feed.push_position("b2", north_of_own(500.0)).await);
        wait_for(|| !sink.published.lock().unwrap().is_empty()).await;
        assert_eq!(
            sink.published.lock().unwrap()[0].0,
            "notifications.buddy.b2"
        );

        // The old b1 subscription no longer forwards anywhere; even if
        // the feed still accepts the push, no notification appears.
        let _ = feed.push_position("b1", north_of_own(500.0)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.published.lock().unwrap().len(), 1);

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconfigure_clears_flag_of_removed_buddy() {
        let feed = Arc::new(ManualFeed::default());
        let model = own_at_origin();
        let sink = Arc::new(RecordingSink::default());
        let roster = Roster::from_buddies(vec![Buddy::new("b1")]);

        let mut service = BuddyWatchService::start(
            feed.clone(),
            model.clone(),
            sink,
            Arc::new(TracingErrorSink),
            roster,
            AlertSettings::default(),
        );

        // Flag b1 by delivering a sample
        assert!(feed.push_position("b1", north_of_own(2000.0)).await);
        wait_for(|| {
            model.get(&VesselContext::vessel("b1"), paths::BUDDY)
                == Some(AttributeValue::Bool(true))
        })
        .await;

        service.reconfigure(Roster::new(), AlertSettings::default());
        assert_eq!(
            model.get(&VesselContext::vessel("b1"), paths::BUDDY),
            Some(AttributeValue::Bool(false))
        );

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_is_clean_and_teardown_idempotent() {
        let feed = Arc::new(ManualFeed::default());
        let model = own_at_origin();
        let sink = Arc::new(RecordingSink::default());
        let roster = Roster::from_buddies(vec![Buddy::new("b1")]);

        let service = BuddyWatchService::start(
            feed,
            model,
            sink,
            Arc::new(TracingErrorSink),
            roster,
            AlertSettings::default(),
        );

        // Tearing down before shutdown must be harmless
        service.subscriptions.teardown();
        service.subscriptions.teardown();

        tokio::time::timeout(Duration::from_secs(5), service.shutdown())
            .await
            .expect("shutdown should complete promptly");
    }
}
