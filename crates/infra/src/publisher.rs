//! Best-effort domain event publication.
//!
//! Events are serialized into a JSON [`EventEnvelope`] and handed to the bus
//! after the state change they describe has been persisted. A failure to
//! serialize or publish is logged and swallowed; it never fails the mutation.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use stowage_events::{Event, EventBus, EventEnvelope};

pub type JsonEnvelope = EventEnvelope<Value>;

/// Object-safe view of any bus carrying JSON envelopes.
trait JsonBus: Send + Sync {
    fn publish_json(&self, envelope: JsonEnvelope) -> Result<(), String>;
}

impl<B> JsonBus for B
where
    B: EventBus<JsonEnvelope>,
{
    fn publish_json(&self, envelope: JsonEnvelope) -> Result<(), String> {
        self.publish(envelope).map_err(|e| e.to_string())
    }
}

#[derive(Clone, Default)]
pub struct EventPublisher {
    bus: Option<Arc<dyn JsonBus>>,
}

impl fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher")
            .field("enabled", &self.bus.is_some())
            .finish()
    }
}

impl EventPublisher {
    pub fn new<B>(bus: B) -> Self
    where
        B: EventBus<JsonEnvelope> + 'static,
    {
        Self {
            bus: Some(Arc::new(bus)),
        }
    }

    /// A publisher that drops every event.
    pub fn disabled() -> Self {
        Self { bus: None }
    }

    /// Publish `event`, logging instead of failing.
    ///
    /// Returns whether the bus accepted the event.
    pub fn publish<E>(&self, event: &E) -> bool
    where
        E: Event + Serialize,
    {
        let Some(bus) = &self.bus else {
            return false;
        };

        let envelope = match JsonEnvelope::to_json(event) {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::warn!(
                    operation = "publish_event",
                    event_type = event.event_type(),
                    tenant_id = %event.tenant_id(),
                    entity_id = %event.entity_id(),
                    %error,
                    "failed to serialize domain event"
                );
                return false;
            }
        };

        match bus.publish_json(envelope) {
            Ok(()) => {
                tracing::debug!(event_type = event.event_type(), "domain event published");
                true
            }
            Err(error) => {
                tracing::warn!(
                    operation = "publish_event",
                    event_type = event.event_type(),
                    tenant_id = %event.tenant_id(),
                    entity_id = %event.entity_id(),
                    %error,
                    "failed to publish domain event"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stowage_core::{InventoryId, TenantId};
    use stowage_events::{InMemoryEventBus, Subscription};
    use stowage_loans::LoanEvent;

    struct BrokenBus;

    impl EventBus<JsonEnvelope> for BrokenBus {
        type Error = String;

        fn publish(&self, _message: JsonEnvelope) -> Result<(), Self::Error> {
            Err("broker down".to_string())
        }

        fn subscribe(&self) -> Subscription<JsonEnvelope> {
            let (_tx, rx) = std::sync::mpsc::channel();
            Subscription::new(rx)
        }
    }

    fn returned_event() -> LoanEvent {
        LoanEvent::LoanReturned(stowage_loans::LoanReturned {
            tenant_id: TenantId::new(),
            loan_id: stowage_core::LoanId::new(),
            inventory_id: InventoryId::new(),
            quantity: 1,
            actor_id: None,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn envelopes_reach_subscribers() {
        let bus = Arc::new(InMemoryEventBus::<JsonEnvelope>::new());
        let subscription = bus.subscribe();
        let publisher = EventPublisher::new(bus.clone());

        let event = returned_event();
        assert!(publisher.publish(&event));

        let envelope = subscription.try_recv().unwrap();
        assert_eq!(envelope.event_type(), "loans.loan.returned");
        assert_eq!(envelope.tenant_id(), event.tenant_id());
        assert_eq!(
            envelope.payload()["LoanReturned"]["quantity"],
            serde_json::json!(1)
        );
    }

    #[test]
    fn bus_failure_is_swallowed() {
        let publisher = EventPublisher::new(BrokenBus);
        assert!(!publisher.publish(&returned_event()));
    }

    #[test]
    fn disabled_publisher_drops_events() {
        assert!(!EventPublisher::disabled().publish(&returned_event()));
    }
}
