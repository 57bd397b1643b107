//! Proximity notification state machine.
//!
//! Each buddy is in one of two states: NORMAL (no record) or ALERT
//! (a record holding the display name the alert was sent with). The
//! machine only produces a notification on a genuine edge crossing of
//! the distance threshold, or when the resolved display name changes
//! while still in range - position updates arrive continuously while a
//! buddy stays near, and re-emitting the identical alert on every
//! sample would flood the notification channel.
//!
//! [`ProximityAlarm`] is a pure in-memory structure; publishing the
//! returned [`Notification`] to a [`NotificationSink`] is the
//! evaluator's job.

use std::collections::HashMap;

use serde::Serialize;

use crate::roster::BuddyId;

/// Notification state published to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmState {
    /// A buddy is within the alert distance.
    Alert,
    /// A buddy has left the alert distance.
    Normal,
}

/// Delivery channel requested for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationMethod {
    Visual,
    Sound,
}

/// A notification payload, serializable as a Signal K style value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// Alert or normal.
    pub state: AlarmState,
    /// Requested delivery channels; empty for clearing notifications.
    pub method: Vec<NotificationMethod>,
    /// Human-readable message.
    pub message: String,
}

impl Notification {
    fn alert(name: &str) -> Self {
        Self {
            state: AlarmState::Alert,
            method: vec![NotificationMethod::Visual, NotificationMethod::Sound],
            message: format!("Your buddy {name} is near"),
        }
    }

    fn normal(name: &str) -> Self {
        Self {
            state: AlarmState::Normal,
            method: Vec::new(),
            message: format!("Your buddy {name} is away"),
        }
    }
}

/// The notification path for a buddy in the shared data model.
pub fn notification_path(id: &BuddyId) -> String {
    format!("notifications.buddy.{id}")
}

/// Outbound sink for notification state changes.
pub trait NotificationSink: Send + Sync {
    /// Publish a notification value at the given path.
    fn publish(&self, path: &str, notification: Notification);
}

/// Sink that logs published notifications via `tracing`.
///
/// Used by the CLI; deployments with a real data bus substitute their
/// own [`NotificationSink`].
#[derive(Debug, Default)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn publish(&self, path: &str, notification: Notification) {
        let payload = serde_json::to_string(&notification).unwrap_or_default();
        tracing::info!(path, payload = %payload, "notification");
    }
}

/// Per-buddy two-state notification machine with de-duplication memory.
#[derive(Debug, Default)]
pub struct ProximityAlarm {
    /// Display name used in the outstanding alert, per buddy.
    /// A buddy is in ALERT state iff it has an entry here.
    sent: HashMap<BuddyId, String>,
}

impl ProximityAlarm {
    /// Create a machine with all buddies in NORMAL state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the buddy currently has an outstanding alert.
    pub fn is_active(&self, id: &BuddyId) -> bool {
        self.sent.contains_key(id)
    }

    /// Drive the state machine with one distance observation.
    ///
    /// Returns the notification to emit, if any:
    ///
    /// - NORMAL, in range: alert with `candidate_name`, record it.
    /// - ALERT, in range, name changed: fresh alert with the new name.
    /// - ALERT, in range, same name: nothing (de-duplication).
    /// - ALERT, out of range: clearing notification, record dropped.
    /// - NORMAL, out of range: nothing.
    pub fn observe(
        &mut self,
        id: &BuddyId,
        distance_meters: f64,
        threshold_meters: f64,
        candidate_name: &str,
    ) -> Option<Notification> {
        if distance_meters < threshold_meters {
            match self.sent.get(id) {
                Some(sent_name) if sent_name == candidate_name => None,
                _ => {
                    self.sent.insert(id.clone(), candidate_name.to_string());
                    Some(Notification::alert(candidate_name))
                }
            }
        } else if self.sent.remove(id).is_some() {
            Some(Notification::normal(candidate_name))
        } else {
            None
        }
    }

    /// Drop a buddy's record without emitting anything.
    pub fn forget(&mut self, id: &BuddyId) {
        self.sent.remove(id);
    }

    /// Drop records for buddies no longer on the roster.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&BuddyId) -> bool,
    {
        self.sent.retain(|id, _| keep(id));
    }
}
