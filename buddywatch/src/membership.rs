//! Buddy membership flagging.
//!
//! The first time a position update is observed for a tracked vessel,
//! its `buddy` attribute in the shared data model is set true so that
//! downstream displays can mark it. The flag is never unset here -
//! removal is an external operation (see the CLI's remove command).

use std::sync::Arc;

use crate::datamodel::{paths, AttributeValue, VesselContext, VesselDataModel};

/// Flags tracked vessels as buddies in the shared data model.
pub struct MembershipTracker {
    data_model: Arc<dyn VesselDataModel>,
}

impl MembershipTracker {
    /// Create a tracker backed by the given data model.
    pub fn new(data_model: Arc<dyn VesselDataModel>) -> Self {
        Self { data_model }
    }

    /// Flag the vessel as a buddy if it isn't already.
    ///
    /// Returns `true` if the vessel was already flagged, `false` if it
    /// was newly discovered (and the flag was just written). Idempotent
    /// and safe to call on every position update.
    pub fn mark_if_new(&self, context: &VesselContext) -> bool {
        match self.data_model.get(context, paths::BUDDY) {
            Some(AttributeValue::Bool(true)) => true,
            _ => {
                tracing::debug!(context = %context, "found buddy");
                self.data_model
                    .set(context, paths::BUDDY, AttributeValue::Bool(true));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::SharedDataModel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Data model wrapper that counts attribute writes.
    struct CountingModel {
        inner: SharedDataModel,
        writes: AtomicUsize,
    }

    impl CountingModel {
        fn new() -> Self {
            Self {
                inner: SharedDataModel::new(),
                writes: AtomicUsize::new(0),
            }
        }
    }

    impl VesselDataModel for CountingModel {
        fn get(&self, context: &VesselContext, path: &str) -> Option<AttributeValue> {
            self.inner.get(context, path)
        }

        fn set(&self, context: &VesselContext, path: &str, value: AttributeValue) {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(context, path, value);
        }
    }

    #[test]
    fn test_first_call_flags_and_reports_new() {
        let model = Arc::new(SharedDataModel::new());
        let tracker = MembershipTracker::new(model.clone());
        let context = VesselContext::vessel("urn:x");

        assert!(!tracker.mark_if_new(&context));
        assert_eq!(
            model.get(&context, paths::BUDDY),
            Some(AttributeValue::Bool(true))
        );
    }

    #[test]
    fn test_repeated_calls_write_exactly_once() {
        let model = Arc::new(CountingModel::new());
        let tracker = MembershipTracker::new(model.clone());
        let context = VesselContext::vessel("urn:x");

        assert!(!tracker.mark_if_new(&context));
        for _ in 0..10 {
            assert!(tracker.mark_if_new(&context));
        }
        assert_eq!(model.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_false_flag_is_rewritten() {
        // An externally cleared flag (e.g. after a remove) is set again
        // on the next observed update.
        let model = Arc::new(SharedDataModel::new());
        let context = VesselContext::vessel("urn:x");
        model.set(&context, paths::BUDDY, AttributeValue::Bool(false));

        let tracker = MembershipTracker::new(model.clone());
        assert!(!tracker.mark_if_new(&context));
        assert_eq!(
            model.get(&context, paths::BUDDY),
            Some(AttributeValue::Bool(true))
        );
    }
}
