//! Scene lifecycle.
//!
//! A scene owns one physics registry, its entities (grouped by kind), the
//! current level, its delayed actions and its event subscriptions.
//!
//! ```text
//! Uninitialized --initialize--> Initialized --start--> Running <--> Paused
//!        any state --cleanup--> CleanedUp --initialize--> Initialized ...
//! ```
//!
//! `cleanup` releases everything the scene holds, so the same instance can be
//! initialized again as if freshly constructed.

use anyhow::bail;
use kinetic_shared::{
    body::Body,
    config::{SimConfig, Viewport},
    entity::{Entity, EntityId, EntityKind},
    event::{EventBus, EventName, GameEvent, Subscription},
    hud::HudSnapshot,
    level::{EntitySpawn, LevelConfig},
    physics::{PhysicsConfig, PhysicsWorld},
    render::{RenderBackend, Sprite},
    timer::{TimerHandle, TimerQueue},
};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    Uninitialized,
    Initialized,
    Running,
    Paused,
    CleanedUp,
}

/// Behavior every scene exposes to the loop and the application context.
pub trait Scene {
    /// Binds level data and spawns the starting entities.
    fn initialize(&mut self, level: LevelConfig) -> anyhow::Result<()>;
    fn start(&mut self);
    /// One fixed simulation step.
    fn update(&mut self, dt: f32);
    fn render(&self, renderer: &mut dyn RenderBackend);
    /// Releases entities, bodies, timers and subscriptions.
    fn cleanup(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn state(&self) -> SceneState;
    fn snapshot(&self) -> HudSnapshot;
    fn level_id(&self) -> Option<u32>;
    fn entity_count(&self) -> usize;
    fn body_count(&self) -> usize;
}

/// Index of an entity inside an [`EntityStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySlot {
    pub kind: EntityKind,
    pub index: usize,
}

/// Entities grouped by kind.
#[derive(Debug, Default)]
pub struct EntityStore {
    by_kind: [Vec<Entity>; EntityKind::COUNT],
}

impl EntityStore {
    pub fn push(&mut self, entity: Entity) -> EntitySlot {
        let kind = entity.kind();
        let list = &mut self.by_kind[kind.index()];
        list.push(entity);
        EntitySlot {
            kind,
            index: list.len() - 1,
        }
    }

    pub fn of_kind(&self, kind: EntityKind) -> &[Entity] {
        &self.by_kind[kind.index()]
    }

    pub fn find(&self, id: EntityId) -> Option<&Entity> {
        self.iter().find(|e| e.id() == id)
    }

    pub fn find_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.iter_mut().find(|e| e.id() == id)
    }

    /// Two distinct entities, mutably.
    pub fn pair_mut(&mut self, a: EntitySlot, b: EntitySlot) -> Option<(&mut Entity, &mut Entity)> {
        let (ka, kb) = (a.kind.index(), b.kind.index());
        if ka == kb {
            if a.index == b.index {
                return None;
            }
            let list = &mut self.by_kind[ka];
            let (lo, hi) = (a.index.min(b.index), a.index.max(b.index));
            if hi >= list.len() {
                return None;
            }
            let (head, tail) = list.split_at_mut(hi);
            let (low, high) = (&mut head[lo], &mut tail[0]);
            return Some(if a.index < b.index {
                (low, high)
            } else {
                (high, low)
            });
        }

        let (lo, hi) = (ka.min(kb), ka.max(kb));
        let (head, tail) = self.by_kind.split_at_mut(hi);
        let low = head[lo].get_mut(if ka < kb { a.index } else { b.index })?;
        let high = tail[0].get_mut(if ka < kb { b.index } else { a.index })?;
        Some(if ka < kb { (low, high) } else { (high, low) })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.by_kind.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.by_kind.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.by_kind.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops inactive entities and deregisters their bodies in one pass.
    pub fn remove_inactive(&mut self, physics: &mut PhysicsWorld) -> Vec<Entity> {
        let mut removed = Vec::new();
        for list in self.by_kind.iter_mut() {
            if list.iter().all(Entity::is_active) {
                continue;
            }
            let (live, dead): (Vec<_>, Vec<_>) =
                std::mem::take(list).into_iter().partition(Entity::is_active);
            *list = live;
            for entity in &dead {
                if let Err(e) = physics.remove_body(entity.body_handle()) {
                    warn!(id = ?entity.id(), error = %e, "Body already gone on despawn");
                }
            }
            removed.extend(dead);
        }
        removed
    }

    pub fn clear(&mut self) {
        for list in self.by_kind.iter_mut() {
            list.clear();
        }
    }
}

/// State and bookkeeping shared by every concrete scene.
pub struct SceneBase<A> {
    physics_config: PhysicsConfig,
    pub physics: PhysicsWorld,
    pub entities: EntityStore,
    pub timers: TimerQueue<A>,
    pub events: EventBus,
    pub viewport: Viewport,
    subscriptions: Vec<Subscription>,
    level: Option<LevelConfig>,
    state: SceneState,
    /// Simulated seconds since the level started.
    pub elapsed: f64,
    pub score: u32,
}

impl<A> SceneBase<A> {
    pub fn new(cfg: &SimConfig, events: EventBus) -> Self {
        let physics_config = cfg.physics();
        Self {
            physics_config,
            physics: PhysicsWorld::new(physics_config),
            entities: EntityStore::default(),
            timers: TimerQueue::new(),
            events,
            viewport: cfg.viewport,
            subscriptions: Vec::new(),
            level: None,
            state: SceneState::Uninitialized,
            elapsed: 0.0,
            score: 0,
        }
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    pub fn level(&self) -> Option<&LevelConfig> {
        self.level.as_ref()
    }

    pub fn level_id(&self) -> Option<u32> {
        self.level.as_ref().map(|l| l.id)
    }

    pub fn is_running(&self) -> bool {
        self.state == SceneState::Running
    }

    /// Validates and binds a level. Nothing is touched on error.
    pub fn bind_level(&mut self, level: LevelConfig) -> anyhow::Result<()> {
        match self.state {
            SceneState::Uninitialized | SceneState::CleanedUp => {}
            other => bail!("cannot initialize a scene in state {:?}; clean it up first", other),
        }
        level.validate()?;

        self.physics = PhysicsWorld::new(self.physics_config);
        self.elapsed = 0.0;
        self.score = 0;
        self.level = Some(level);
        self.state = SceneState::Initialized;
        Ok(())
    }

    pub fn start(&mut self) {
        if self.state == SceneState::Initialized {
            self.state = SceneState::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.state == SceneState::Running {
            self.state = SceneState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == SceneState::Paused {
            self.state = SceneState::Running;
        }
    }

    /// Registers a new entity with both the registry and the store.
    pub fn spawn(&mut self, kind: EntityKind, body: Body) -> EntityId {
        let entity = Entity::spawn(kind, body, &mut self.physics);
        self.insert(entity)
    }

    /// Spawns an entity described by level data.
    pub fn spawn_from(&mut self, spawn: &EntitySpawn) -> EntityId {
        let mut entity = Entity::spawn(spawn.kind, spawn.body(), &mut self.physics);
        entity.sprite = spawn.sprite.clone();
        if let Some(health) = spawn.health {
            entity.health = health;
        }
        self.insert(entity)
    }

    fn insert(&mut self, entity: Entity) -> EntityId {
        let id = entity.id();
        debug!(id = ?id, kind = %entity.kind(), "Spawned entity");
        self.entities.push(entity);
        id
    }

    /// Subscribes for the lifetime of the current level.
    pub fn subscribe(&mut self, name: EventName, callback: impl FnMut(&GameEvent) + 'static) {
        let sub = self.events.subscribe(name, callback);
        self.subscriptions.push(sub);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn schedule(&mut self, delay: f64, action: A) -> TimerHandle {
        self.timers.schedule(delay, action)
    }

    /// Removes inactive entities and their bodies.
    pub fn despawn_inactive(&mut self) -> Vec<Entity> {
        let removed = self.entities.remove_inactive(&mut self.physics);
        for entity in &removed {
            debug!(id = ?entity.id(), kind = %entity.kind(), "Despawned entity");
        }
        removed
    }

    /// Draws every live entity.
    pub fn render_entities(&self, renderer: &mut dyn RenderBackend) {
        for entity in self.entities.iter().filter(|e| e.is_active()) {
            let Ok(position) = entity.position(&self.physics) else {
                continue;
            };
            renderer.draw(Sprite {
                key: entity.sprite.as_deref(),
                position,
                rotation: entity.rotation,
                radius: entity.radius(),
            });
        }
    }

    /// Detaches listeners, cancels timers, kills every entity and empties the
    /// registry.
    pub fn teardown(&mut self) {
        self.subscriptions.clear();
        self.timers.clear();
        for entity in self.entities.iter_mut() {
            entity.cleanup();
        }
        self.entities.remove_inactive(&mut self.physics);
        self.physics.clear();
        self.level = None;
        self.elapsed = 0.0;
        self.score = 0;
        self.state = SceneState::CleanedUp;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::Cell;

    use super::*;
    use kinetic_shared::math::Vec2;

    /// Counts calls; used by loop tests.
    #[derive(Default)]
    pub(crate) struct CountingScene {
        pub updates: u32,
        pub renders: Cell<u32>,
    }

    impl Scene for CountingScene {
        fn initialize(&mut self, _level: LevelConfig) -> anyhow::Result<()> {
            Ok(())
        }
        fn start(&mut self) {}
        fn update(&mut self, _dt: f32) {
            self.updates += 1;
        }
        fn render(&self, _renderer: &mut dyn RenderBackend) {
            self.renders.set(self.renders.get() + 1);
        }
        fn cleanup(&mut self) {}
        fn pause(&mut self) {}
        fn resume(&mut self) {}
        fn state(&self) -> SceneState {
            SceneState::Running
        }
        fn snapshot(&self) -> HudSnapshot {
            HudSnapshot::default()
        }
        fn level_id(&self) -> Option<u32> {
            None
        }
        fn entity_count(&self) -> usize {
            0
        }
        fn body_count(&self) -> usize {
            0
        }
    }

    fn level() -> LevelConfig {
        LevelConfig {
            id: 1,
            entities: vec![EntitySpawn::new(EntityKind::Player, Vec2::new(10.0, 10.0))],
            objectives: Vec::new(),
            background: String::new(),
            music: String::new(),
            spawners: Vec::new(),
            next_level: None,
            seed: None,
        }
    }

    #[test]
    fn lifecycle_transitions() {
        let mut base: SceneBase<()> = SceneBase::new(&SimConfig::default(), EventBus::new());
        assert_eq!(base.state(), SceneState::Uninitialized);

        base.bind_level(level()).unwrap();
        assert_eq!(base.state(), SceneState::Initialized);
        assert!(base.bind_level(level()).is_err());

        base.start();
        base.pause();
        assert_eq!(base.state(), SceneState::Paused);
        base.resume();
        assert!(base.is_running());

        base.teardown();
        assert_eq!(base.state(), SceneState::CleanedUp);
        base.bind_level(level()).unwrap();
    }

    #[test]
    fn despawn_removes_entity_and_body_together() {
        let mut base: SceneBase<()> = SceneBase::new(&SimConfig::default(), EventBus::new());
        let keep = base.spawn(EntityKind::Obstacle, Body::new(Vec2::ZERO, 1.0));
        let doomed = base.spawn(EntityKind::Obstacle, Body::new(Vec2::new(50.0, 0.0), 1.0));
        base.entities.find_mut(doomed).unwrap().cleanup();

        let removed = base.despawn_inactive();

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id(), doomed);
        assert_eq!(base.entities.len(), 1);
        assert_eq!(base.physics.len(), 1);
        assert!(base.entities.find(keep).is_some());
        assert!(!base.physics.contains(removed[0].body_handle()));
    }

    #[test]
    fn teardown_drops_subscriptions_and_timers() {
        let bus = EventBus::new();
        let mut base: SceneBase<u8> = SceneBase::new(&SimConfig::default(), bus.clone());
        base.bind_level(level()).unwrap();
        base.subscribe(EventName::PlayerDeath, |_| {});
        base.schedule(1.0, 7);
        base.spawn(EntityKind::Vehicle, Body::new(Vec2::ZERO, 1.0));
        assert_eq!(bus.listener_count(), 1);
        assert_eq!(base.subscription_count(), 1);

        base.teardown();

        assert_eq!(bus.listener_count(), 0);
        assert_eq!(base.subscription_count(), 0);
        assert!(base.timers.is_empty());
        assert!(base.entities.is_empty());
        assert!(base.physics.is_empty());
    }

    #[test]
    fn pair_mut_across_and_within_kinds() {
        let mut base: SceneBase<()> = SceneBase::new(&SimConfig::default(), EventBus::new());
        base.spawn(EntityKind::Obstacle, Body::new(Vec2::ZERO, 1.0));
        base.spawn(EntityKind::Obstacle, Body::new(Vec2::ZERO, 1.0));
        base.spawn(EntityKind::Player, Body::new(Vec2::ZERO, 1.0));

        let o0 = EntitySlot { kind: EntityKind::Obstacle, index: 0 };
        let o1 = EntitySlot { kind: EntityKind::Obstacle, index: 1 };
        let p0 = EntitySlot { kind: EntityKind::Player, index: 0 };

        let (a, b) = base.entities.pair_mut(o1, o0).unwrap();
        assert_eq!((a.kind(), b.kind()), (EntityKind::Obstacle, EntityKind::Obstacle));
        assert_ne!(a.id(), b.id());

        let (a, b) = base.entities.pair_mut(o0, p0).unwrap();
        assert_eq!((a.kind(), b.kind()), (EntityKind::Obstacle, EntityKind::Player));
        let (a, b) = base.entities.pair_mut(p0, o0).unwrap();
        assert_eq!((a.kind(), b.kind()), (EntityKind::Player, EntityKind::Obstacle));

        assert!(base.entities.pair_mut(o0, o0).is_none());
    }
}
