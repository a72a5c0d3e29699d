//! # Request Tracker
//!
//! Outstanding oracle requests and the ordered item batch each one will reveal.
//! A record is consumed exactly once; a replayed or forged request id is
//! rejected with `UnknownRequest`.

use crate::domain::value_objects::{ItemId, RequestId};
use crate::errors::TrackerError;
use std::collections::HashMap;

/// Request id → ordered batch of items awaiting that request's randomness.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    pending: HashMap<RequestId, Vec<ItemId>>,
}

impl RequestTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `request_id` is outstanding.
    #[must_use]
    pub fn contains(&self, request_id: RequestId) -> bool {
        self.pending.contains_key(&request_id)
    }

    /// Stores the ordered batch for `request_id`.
    ///
    /// # Errors
    ///
    /// `DuplicateRequest` if the id is already tracked.
    pub fn open(&mut self, request_id: RequestId, items: Vec<ItemId>) -> Result<(), TrackerError> {
        if self.contains(request_id) {
            return Err(TrackerError::DuplicateRequest(request_id));
        }
        self.pending.insert(request_id, items);
        Ok(())
    }

    /// Looks at the batch without consuming it.
    ///
    /// # Errors
    ///
    /// `UnknownRequest` if the id is not tracked.
    pub fn get(&self, request_id: RequestId) -> Result<&[ItemId], TrackerError> {
        self.pending
            .get(&request_id)
            .map(Vec::as_slice)
            .ok_or(TrackerError::UnknownRequest(request_id))
    }

    /// Removes and returns the batch (one-shot).
    ///
    /// # Errors
    ///
    /// `UnknownRequest` if the id is not tracked or was already consumed.
    pub fn consume(&mut self, request_id: RequestId) -> Result<Vec<ItemId>, TrackerError> {
        self.pending
            .remove(&request_id)
            .ok_or(TrackerError::UnknownRequest(request_id))
    }

    /// The outstanding request whose batch contains `item`.
    #[must_use]
    pub fn request_for(&self, item: ItemId) -> Option<RequestId> {
        self.pending
            .iter()
            .find(|(_, items)| items.contains(&item))
            .map(|(request_id, _)| *request_id)
    }

    /// Number of outstanding requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Outstanding request ids, in no particular order.
    pub fn pending_ids(&self) -> impl Iterator<Item = RequestId> + '_ {
        self.pending.keys().copied()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_consume() {
        let mut tracker = RequestTracker::new();
        let id = RequestId::from_u64(1);
        tracker.open(id, vec![ItemId(3), ItemId(1)]).unwrap();
        assert_eq!(tracker.pending_count(), 1);
        assert_eq!(tracker.get(id).unwrap(), &[ItemId(3), ItemId(1)]);

        let items = tracker.consume(id).unwrap();
        assert_eq!(items, vec![ItemId(3), ItemId(1)]);
        assert_eq!(tracker.pending_count(), 0);
    }

    #[test]
    fn test_consume_is_one_shot() {
        let mut tracker = RequestTracker::new();
        let id = RequestId::from_u64(5);
        tracker.open(id, vec![ItemId(1)]).unwrap();
        tracker.consume(id).unwrap();
        assert_eq!(tracker.consume(id), Err(TrackerError::UnknownRequest(id)));
    }

    #[test]
    fn test_duplicate_open_keeps_original() {
        let mut tracker = RequestTracker::new();
        let id = RequestId::from_u64(2);
        tracker.open(id, vec![ItemId(1)]).unwrap();
        assert_eq!(
            tracker.open(id, vec![ItemId(9)]),
            Err(TrackerError::DuplicateRequest(id))
        );
        assert_eq!(tracker.get(id).unwrap(), &[ItemId(1)]);
    }

    #[test]
    fn test_request_for_item() {
        let mut tracker = RequestTracker::new();
        tracker.open(RequestId::from_u64(1), vec![ItemId(1), ItemId(2)]).unwrap();
        tracker.open(RequestId::from_u64(2), vec![ItemId(3)]).unwrap();

        assert_eq!(tracker.request_for(ItemId(2)), Some(RequestId::from_u64(1)));
        assert_eq!(tracker.request_for(ItemId(3)), Some(RequestId::from_u64(2)));
        assert_eq!(tracker.request_for(ItemId(4)), None);
    }

    #[test]
    fn test_unknown_request() {
        let tracker = RequestTracker::new();
        let id = RequestId::from_u64(42);
        assert!(!tracker.contains(id));
        assert_eq!(tracker.get(id), Err(TrackerError::UnknownRequest(id)));
    }
}
