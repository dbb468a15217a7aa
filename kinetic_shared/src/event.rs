//! Event and messaging system.
//!
//! A small publish/subscribe channel for gameplay events.
//! - Scenes publish (`player_death`, `level_complete`, ...).
//! - UI, audio and save collaborators subscribe without the simulation
//!   depending on them.
//!
//! The bus is owned by the application context and handed to scenes as a
//! cheap clone. `subscribe` returns a [`Subscription`]; dropping it (or calling
//! [`Subscription::unsubscribe`]) detaches the listener.
//!
//! Single-threaded: listeners run synchronously inside `publish`.
//! Events published from a listener are queued and delivered after the
//! current one, in order.

use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt,
    rc::{Rc, Weak},
};

use serde::Serialize;

use crate::entity::{EntityId, EntityKind};

/// Gameplay events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    PlayerDeath { level: u32 },
    LevelComplete { level: u32, score: u32 },
    ProjectileHit { target: EntityKind, points: u32 },
    EntityDestroyed { id: EntityId, kind: EntityKind },
    ObjectiveMet { level: u32, index: usize },
    SceneLoadFailed { level: u32, reason: String },
}

/// Event names, for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    PlayerDeath,
    LevelComplete,
    ProjectileHit,
    EntityDestroyed,
    ObjectiveMet,
    SceneLoadFailed,
}

impl EventName {
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::PlayerDeath => "player_death",
            EventName::LevelComplete => "level_complete",
            EventName::ProjectileHit => "projectile_hit",
            EventName::EntityDestroyed => "entity_destroyed",
            EventName::ObjectiveMet => "objective_met",
            EventName::SceneLoadFailed => "scene_load_failed",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GameEvent {
    pub fn name(&self) -> EventName {
        match self {
            GameEvent::PlayerDeath { .. } => EventName::PlayerDeath,
            GameEvent::LevelComplete { .. } => EventName::LevelComplete,
            GameEvent::ProjectileHit { .. } => EventName::ProjectileHit,
            GameEvent::EntityDestroyed { .. } => EventName::EntityDestroyed,
            GameEvent::ObjectiveMet { .. } => EventName::ObjectiveMet,
            GameEvent::SceneLoadFailed { .. } => EventName::SceneLoadFailed,
        }
    }
}

type Listener = Box<dyn FnMut(&GameEvent)>;

struct ListenerEntry {
    id: u64,
    filter: Option<EventName>,
    callback: Listener,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: Vec<ListenerEntry>,
    /// Ids unsubscribed while their entries were checked out for dispatch.
    detached: Vec<u64>,
    queue: VecDeque<GameEvent>,
    dispatching: bool,
    published: u64,
}

/// Shared handle to the event channel.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listens to every event.
    pub fn subscribe_all(&self, callback: impl FnMut(&GameEvent) + 'static) -> Subscription {
        self.add_listener(None, Box::new(callback))
    }

    /// Listens to one named event.
    pub fn subscribe(
        &self,
        name: EventName,
        callback: impl FnMut(&GameEvent) + 'static,
    ) -> Subscription {
        self.add_listener(Some(name), Box::new(callback))
    }

    fn add_listener(&self, filter: Option<EventName>, callback: Listener) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push(ListenerEntry {
            id,
            filter,
            callback,
        });
        Subscription {
            id,
            bus: Rc::downgrade(&self.inner),
        }
    }

    /// Delivers an event to every matching listener.
    pub fn publish(&self, event: GameEvent) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.published += 1;
            inner.queue.push_back(event);
            if inner.dispatching {
                return;
            }
            inner.dispatching = true;
        }

        loop {
            let (event, mut listeners) = {
                let mut inner = self.inner.borrow_mut();
                let Some(event) = inner.queue.pop_front() else {
                    inner.dispatching = false;
                    break;
                };
                (event, std::mem::take(&mut inner.listeners))
            };

            for entry in listeners.iter_mut() {
                if entry.filter.map_or(true, |name| name == event.name()) {
                    (entry.callback)(&event);
                }
            }

            let mut inner = self.inner.borrow_mut();
            // Listeners added during dispatch landed in the now-empty vec.
            listeners.append(&mut inner.listeners);
            let detached = std::mem::take(&mut inner.detached);
            listeners.retain(|entry| !detached.contains(&entry.id));
            inner.listeners = listeners;
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Total events published since creation.
    pub fn published(&self) -> u64 {
        self.inner.borrow().published
    }

    fn detach(inner: &Rc<RefCell<BusInner>>, id: u64) {
        let mut inner = inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|entry| entry.id != id);
        if inner.listeners.len() == before && inner.dispatching {
            inner.detached.push(id);
        }
    }
}

/// Detaches its listener when dropped.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    id: u64,
    bus: Weak<RefCell<BusInner>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            EventBus::detach(&inner, self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
