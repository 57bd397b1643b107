//! Proximity evaluator - drives the whole pipeline for each sample.
//!
//! On every incoming [`PositionSample`] the evaluator resolves the
//! buddy from the current roster snapshot, flags membership, and -
//! when alerts are enabled and the own position is known - computes
//! the distance, resolves the display name, and drives the
//! notification state machine, publishing whatever it produces.
//!
//! Fire-and-forget per sample: nothing is returned to the caller, all
//! effects are attribute writes and notification emissions. A sample
//! for a buddy no longer on the roster (a race with a list update) is
//! silently discarded.

use std::sync::Arc;

use crate::alarm::{notification_path, NotificationSink, ProximityAlarm};
use crate::config::AlertSettings;
use crate::datamodel::{VesselContext, VesselDataModel};
use crate::feed::PositionSample;
use crate::geo;
use crate::membership::MembershipTracker;
use crate::roster::Roster;

/// Evaluates position samples against the roster and alert settings.
pub struct ProximityEvaluator {
    roster: Roster,
    settings: AlertSettings,
    data_model: Arc<dyn VesselDataModel>,
    sink: Arc<dyn NotificationSink>,
    membership: MembershipTracker,
    alarm: ProximityAlarm,
}

impl ProximityEvaluator {
    /// Create an evaluator over a roster snapshot.
    pub fn new(
        roster: Roster,
        settings: AlertSettings,
        data_model: Arc<dyn VesselDataModel>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let membership = MembershipTracker::new(data_model.clone());
        Self {
            roster,
            settings,
            data_model,
            sink,
            membership,
            alarm: ProximityAlarm::new(),
        }
    }

    /// Replace the roster snapshot and settings after a configuration
    /// change. Alarm records for removed buddies are dropped so stale
    /// ids cannot produce clearing notifications later.
    pub fn reconfigure(&mut self, roster: Roster, settings: AlertSettings) {
        self.alarm.retain(|id| roster.contains(id));
        self.roster = roster;
        self.settings = settings;
    }

    /// Process one position sample.
    pub fn handle_sample(&mut self, sample: &PositionSample) {
        let Some(buddy) = self.roster.get(&sample.buddy) else {
            tracing::debug!(buddy = %sample.buddy, "sample for unknown buddy discarded");
            return;
        };
        let context = VesselContext::vessel(buddy.id.as_str());

        // Membership flagging happens even when alerts are disabled.
        let already_buddy = self.membership.mark_if_new(&context);
        if !already_buddy {
            tracing::info!(buddy = %buddy.id, "new buddy flagged");
        }

        if !self.settings.enabled {
            return;
        }

        let Some(own_position) = self.data_model.own_position() else {
            tracing::debug!(buddy = %buddy.id, "own position unknown, skipping evaluation");
            return;
        };

        let distance = geo::distance_meters(own_position, sample.position);
        tracing::debug!(buddy = %buddy.id, distance_meters = distance, "buddy distance");

        // Name precedence: configured name, published vessel name, raw id
        let candidate_name = buddy
            .name
            .clone()
            .or_else(|| self.data_model.vessel_name(&context))
            .unwrap_or_else(|| buddy.id.to_string());

        let buddy_id = buddy.id.clone();
        if let Some(notification) = self.alarm.observe(
            &buddy_id,
            distance,
            self.settings.distance_meters,
            &candidate_name,
        ) {
            tracing::info!(
                buddy = %buddy_id,
                state = ?notification.state,
                "publishing notification"
            );
            self.sink
                .publish(&notification_path(&buddy_id), notification);
        }
    }
}
