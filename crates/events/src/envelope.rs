use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stowage_core::{TenantId, UserId};

use crate::event::Event;

/// Envelope for an event, containing tenant + subject metadata.
///
/// This is the unit handed to an [`EventBus`](crate::EventBus). `payload` carries
/// the snapshot of changed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    tenant_id: TenantId,

    entity_id: Uuid,
    entity_type: String,

    event_type: String,
    event_version: u32,
    actor_id: Option<UserId>,
    occurred_at: DateTime<Utc>,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn entity_id(&self) -> Uuid {
        self.entity_id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn actor_id(&self) -> Option<UserId> {
        self.actor_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl EventEnvelope<serde_json::Value> {
    /// Wrap a typed event with its payload serialized to JSON.
    ///
    /// This keeps the bus decoupled from the concrete domain event types.
    pub fn to_json<E>(event: &E) -> Result<Self, serde_json::Error>
    where
        E: Event + Serialize,
    {
        let payload = serde_json::to_value(event)?;
        Ok(Self {
            event_id: Uuid::now_v7(),
            tenant_id: event.tenant_id(),
            entity_id: event.entity_id(),
            entity_type: event.entity_type().to_string(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            actor_id: event.actor_id(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Pinged {
        tenant_id: TenantId,
        id: Uuid,
        at: DateTime<Utc>,
    }

    impl Event for Pinged {
        fn event_type(&self) -> &'static str {
            "test.pinged"
        }

        fn version(&self) -> u32 {
            2
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }

        fn tenant_id(&self) -> TenantId {
            self.tenant_id
        }

        fn entity_type(&self) -> &'static str {
            "test"
        }

        fn entity_id(&self) -> Uuid {
            self.id
        }

        fn actor_id(&self) -> Option<UserId> {
            None
        }
    }

    #[test]
    fn json_envelope_copies_event_metadata() {
        let event = Pinged {
            tenant_id: TenantId::new(),
            id: Uuid::now_v7(),
            at: Utc::now(),
        };

        let env = EventEnvelope::to_json(&event).unwrap();
        assert_eq!(env.tenant_id(), event.tenant_id);
        assert_eq!(env.entity_id(), event.id);
        assert_eq!(env.entity_type(), "test");
        assert_eq!(env.event_type(), "test.pinged");
        assert_eq!(env.event_version(), 2);
        assert_eq!(env.occurred_at(), event.at);
        assert_eq!(env.payload()["id"], serde_json::json!(event.id));
    }
}
