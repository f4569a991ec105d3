//! Event bus for game-wide state broadcasts.
//!
//! Dispatch is synchronous and in-process: [`EventBus::publish`] calls every
//! handler subscribed to the event's kind before it returns. The subscriber
//! list is snapshotted at the start of a publish, so handlers added or removed
//! during fan-out only see later events.
//!
//! Handlers are held weakly. Owners subscribe in their creation hook and
//! unsubscribe in their teardown hook; a handler dropped without
//! unsubscribing is skipped and pruned.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};
use warden_common::SubscriptionId;

/// Event bus error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventBusError {
    /// The bus has been shut down
    #[error("event bus is shut down")]
    Closed,
    /// No subscription with this id
    #[error("unknown subscription: {0:?}")]
    UnknownSubscription(SubscriptionId),
}

/// Discriminant of a [`GameEvent`], used for subscription filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Player stamina changes
    AffectStamina,
    /// Player health changes
    AffectHealth,
    /// An enemy hit the player
    AttackPlayer,
    /// All enemies must stop
    StopEnemies,
    /// Camera shake request
    ShakeCamera,
}

impl EventKind {
    /// Every event kind.
    pub const ALL: [Self; 5] = [
        Self::AffectStamina,
        Self::AffectHealth,
        Self::AttackPlayer,
        Self::StopEnemies,
        Self::ShakeCamera,
    ];
}

/// Game-state events broadcast through the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Change the player's stamina
    AffectStamina {
        /// Stamina delta
        stamina: f32,
    },
    /// Change the player's health
    AffectHealth {
        /// Health delta
        health: f32,
    },
    /// An enemy attack landed on the player
    AttackPlayer {
        /// Health delta applied to the player (negative hurts)
        damage: f32,
    },
    /// Stop every enemy
    StopEnemies {
        /// Whether the stop was caused by the player dying
        is_player_dead: bool,
    },
    /// Shake the camera
    ShakeCamera {
        /// Shake duration in seconds
        duration: f32,
        /// Shake intensity
        intensity: f32,
    },
}

impl GameEvent {
    /// Returns the kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::AffectStamina { .. } => EventKind::AffectStamina,
            Self::AffectHealth { .. } => EventKind::AffectHealth,
            Self::AttackPlayer { .. } => EventKind::AttackPlayer,
            Self::StopEnemies { .. } => EventKind::StopEnemies,
            Self::ShakeCamera { .. } => EventKind::ShakeCamera,
        }
    }
}

/// Receiver of bus events.
pub trait EventHandler {
    /// Handles an event.
    fn handle(&self, event: &GameEvent);
}

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    kinds: Vec<EventKind>,
    handler: Weak<dyn EventHandler>,
}

impl Subscriber {
    fn wants(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Synchronous fan-out event bus.
///
/// One instance is created at simulation start, shared by reference with
/// every agent, and shut down at simulation end.
pub struct EventBus {
    subscribers: RefCell<Vec<Subscriber>>,
    next_id: Cell<u64>,
    published: Cell<u64>,
    closed: Cell<bool>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("published", &self.published.get())
            .field("closed", &self.closed.get())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates an open bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            published: Cell::new(0),
            closed: Cell::new(false),
        }
    }

    /// Subscribes `handler` to the given event kinds.
    pub fn subscribe(
        &self,
        kinds: &[EventKind],
        handler: Weak<dyn EventHandler>,
    ) -> Result<SubscriptionId, EventBusError> {
        if self.closed.get() {
            return Err(EventBusError::Closed);
        }

        let id = SubscriptionId::from_raw(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);

        self.subscribers.borrow_mut().push(Subscriber {
            id,
            kinds: kinds.to_vec(),
            handler,
        });
        debug!("Subscription {} added for {:?}", id.raw(), kinds);
        Ok(id)
    }

    /// Removes a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<(), EventBusError> {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);

        if subscribers.len() == before {
            return Err(EventBusError::UnknownSubscription(id));
        }
        debug!("Subscription {} removed", id.raw());
        Ok(())
    }

    /// Publishes an event to every live subscriber interested in its kind.
    ///
    /// Returns the number of handlers invoked.
    pub fn publish(&self, event: &GameEvent) -> usize {
        if self.closed.get() {
            warn!("Dropping {:?}: event bus is shut down", event.kind());
            return 0;
        }

        self.published.set(self.published.get() + 1);

        let kind = event.kind();
        let snapshot: Vec<Subscriber> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|s| s.wants(kind))
            .cloned()
            .collect();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for subscriber in snapshot {
            match subscriber.handler.upgrade() {
                Some(handler) => {
                    handler.handle(event);
                    delivered += 1;
                },
                None => dead.push(subscriber.id),
            }
        }

        if !dead.is_empty() {
            debug!("Pruning {} dropped subscribers", dead.len());
            self.subscribers
                .borrow_mut()
                .retain(|s| !dead.contains(&s.id));
        }

        trace!("Published {:?} to {} handlers", kind, delivered);
        delivered
    }

    /// Returns the number of registered subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Returns the number of events published so far.
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.published.get()
    }

    /// Returns true once [`EventBus::shutdown`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Tears the bus down. Remaining subscriptions are dropped.
    pub fn shutdown(&self) {
        let leaked = self.subscriber_count();
        if leaked > 0 {
            warn!("Event bus shut down with {} live subscriptions", leaked);
        }
        self.subscribers.borrow_mut().clear();
        self.closed.set(true);
    }
}

/// Handler that queues matching events into a bounded channel for systems
/// that prefer to drain events on their own schedule.
#[derive(Debug)]
pub struct QueuedListener {
    sender: Sender<GameEvent>,
    receiver: Receiver<GameEvent>,
    capacity: usize,
}

impl QueuedListener {
    /// Creates a listener with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Rc<Self> {
        let (sender, receiver) = bounded(capacity);
        Rc::new(Self {
            sender,
            receiver,
            capacity,
        })
    }

    /// Subscribes this listener to `kinds` on `bus`.
    pub fn attach(
        self: &Rc<Self>,
        bus: &EventBus,
        kinds: &[EventKind],
    ) -> Result<SubscriptionId, EventBusError> {
        let weak: Weak<dyn EventHandler> = Rc::downgrade(self) as Weak<dyn EventHandler>;
        bus.subscribe(kinds, weak)
    }

    /// Drains all queued events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of queued events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl EventHandler for QueuedListener {
    fn handle(&self, event: &GameEvent) {
        // Non-blocking send - if full, event is dropped
        if self.sender.try_send(event.clone()).is_err() {
            warn!("Queued listener full, dropping {:?}", event.kind());
        }
    }
}
