//! Process-local notification channel for inventory and loan events.

use std::sync::{Mutex, PoisonError, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error)]
pub enum InMemoryBusError {
    /// A publisher panicked while fanning out; the subscriber list may be
    /// incomplete.
    #[error("event bus lock poisoned")]
    Poisoned,
}

/// Fans each published envelope out to every live subscriber.
///
/// Services publish after their write has been persisted, so a subscriber
/// only ever sees events for state that exists. Delivery is synchronous and
/// unbounded: a slow consumer buffers, it does not slow down the publisher.
/// A subscriber whose `Subscription` was dropped is forgotten on the next
/// publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribers still registered. Dropped ones count until the next publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;

        let Some((last, rest)) = subscribers.split_last() else {
            return Ok(());
        };
        let mut dead = Vec::new();
        for (index, tx) in rest.iter().enumerate() {
            if tx.send(message.clone()).is_err() {
                dead.push(index);
            }
        }
        if last.send(message).is_err() {
            dead.push(rest.len());
        }

        for index in dead.into_iter().rev() {
            subscribers.swap_remove(index);
        }
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        Subscription::new(rx)
    }
}
