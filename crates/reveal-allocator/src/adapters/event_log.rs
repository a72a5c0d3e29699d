//! # Event Log Adapter
//!
//! Keeps every published event in memory and fans it out to live
//! subscribers over a broadcast channel.

use crate::events::EventEnvelope;
use crate::ports::outbound::EventPublisher;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the broadcast channel. Slow subscribers lag past this.
const BROADCAST_CAPACITY: usize = 1024;

/// In-memory event publisher.
#[derive(Debug)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<EventEnvelope>>,
    live: broadcast::Sender<EventEnvelope>,
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            events: Mutex::new(Vec::new()),
            live,
        }
    }

    /// Receives every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.live.subscribe()
    }

    /// All events so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events published on `topic`, oldest first.
    #[must_use]
    pub fn events_for(&self, topic: &str) -> Vec<EventEnvelope> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|envelope| envelope.event.topic() == topic)
            .cloned()
            .collect()
    }

    /// Number of events so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing was published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventPublisher for InMemoryEventLog {
    fn publish(&self, envelope: EventEnvelope) {
        trace!(topic = envelope.event.topic(), correlation_id = %envelope.correlation_id, "Event published");
        // No subscribers is fine.
        let _ = self.live.send(envelope.clone());
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{AssetIndex, ItemId, RequestId};
    use crate::events::{topics, RevealEvent, RevealSource};
    use uuid::Uuid;

    fn completed(item: u64) -> EventEnvelope {
        EventEnvelope::new(
            Uuid::new_v4(),
            RevealEvent::RevealCompleted {
                item_id: ItemId(item),
                index: AssetIndex(item),
                request_id: None,
                source: RevealSource::Owner,
            },
        )
    }

    #[test]
    fn test_log_records_in_order() {
        let log = InMemoryEventLog::new();
        assert!(log.is_empty());

        log.publish(completed(1));
        log.publish(EventEnvelope::new(
            Uuid::new_v4(),
            RevealEvent::RevealRequested {
                request_id: RequestId::from_u64(1),
                items: vec![ItemId(2)],
            },
        ));
        log.publish(completed(3));

        assert_eq!(log.len(), 3);
        let completed_events = log.events_for(topics::REVEAL_COMPLETED);
        assert_eq!(completed_events.len(), 2);
        assert!(matches!(
            completed_events[1].event,
            RevealEvent::RevealCompleted { item_id: ItemId(3), .. }
        ));
    }

    #[tokio::test]
    async fn test_subscribers_receive_live_events() {
        let log = InMemoryEventLog::new();
        log.publish(completed(1));

        let mut rx = log.subscribe();
        let envelope = completed(2);
        log.publish(envelope.clone());

        assert_eq!(rx.recv().await.unwrap(), envelope);
    }
}
