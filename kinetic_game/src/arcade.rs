//! Arcade scene.
//!
//! Side-on playfield: the player runs along the floor, jumps and fires
//! projectiles while obstacles and vehicles enter from spawners. Gameplay
//! collisions follow the shared collision table; only pairs the table marks
//! as interacting are tested.
//!
//! Per tick:
//! 1. input -> forces/impulses on the player
//! 2. gravity + integration, spawners, viewport bounds
//! 3. typed collision checks and reactions
//! 4. despawn of everything that went inactive, bodies included
//! 5. objectives
//! 6. HUD snapshot

use std::{cell::RefCell, rc::Rc};

use kinetic_shared::{
    collision::{collision_rule, Reaction},
    config::SimConfig,
    entity::{Entity, EntityId, EntityKind},
    event::{EventBus, EventName, GameEvent},
    hud::{HudSink, HudSnapshot},
    input::{InputSource, Keys},
    level::{EntitySpawn, LevelConfig, Objective, Spawner},
    math::Vec2,
    render::RenderBackend,
    timer::TimerHandle,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::scene::{EntitySlot, Scene, SceneBase, SceneState};

/// Horizontal push while a direction key is held.
pub const MOVE_FORCE: f32 = 1500.0;
pub const JUMP_IMPULSE: f32 = 520.0;
pub const PROJECTILE_VELOCITY: Vec2 = Vec2::new(640.0, -240.0);
/// Seconds between shots.
pub const FIRE_COOLDOWN: f32 = 0.25;
/// Seconds the player ignores damage after taking a hit.
pub const INVULNERABLE_AFTER_HIT: f32 = 1.0;
/// Seconds between meeting the last objective and `level_complete`.
pub const COMPLETE_DELAY: f64 = 1.5;
/// How far outside the viewport an entity may drift before it is dropped.
pub const OOB_MARGIN: f32 = 120.0;
const GROUND_TOLERANCE: f32 = 0.5;
/// Spawns one spawner may emit in a single tick; the remaining backlog is
/// dropped.
pub const MAX_SPAWNS_PER_TICK: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcadeTimer {
    CompleteLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Playing,
    Won,
    Lost,
}

#[derive(Debug, Default)]
struct Progress {
    destroyed: [u32; EntityKind::COUNT],
}

struct SpawnerState {
    def: Spawner,
    clock: f32,
    spawned: u32,
}

impl SpawnerState {
    fn new(def: Spawner) -> Self {
        Self {
            def,
            clock: 0.0,
            spawned: 0,
        }
    }

    fn exhausted(&self) -> bool {
        self.def.limit.is_some_and(|limit| self.spawned >= limit)
    }
}

pub struct ArcadeScene {
    base: SceneBase<ArcadeTimer>,
    input: Box<dyn InputSource>,
    hud: Box<dyn HudSink>,
    rng: StdRng,
    spawners: Vec<SpawnerState>,
    progress: Rc<RefCell<Progress>>,
    objectives_met: Vec<bool>,
    completion: Option<TimerHandle>,
    outcome: Outcome,
    player: Option<EntityId>,
    fire_cooldown: f32,
    invulnerable: f32,
    jump_latched: bool,
}

impl ArcadeScene {
    pub fn new(
        cfg: &SimConfig,
        events: EventBus,
        input: Box<dyn InputSource>,
        hud: Box<dyn HudSink>,
    ) -> Self {
        Self {
            base: SceneBase::new(cfg, events),
            input,
            hud,
            rng: StdRng::seed_from_u64(0),
            spawners: Vec::new(),
            progress: Rc::default(),
            objectives_met: Vec::new(),
            completion: None,
            outcome: Outcome::Playing,
            player: None,
            fire_cooldown: 0.0,
            invulnerable: 0.0,
            jump_latched: false,
        }
    }

    pub fn base(&self) -> &SceneBase<ArcadeTimer> {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut SceneBase<ArcadeTimer> {
        &mut self.base
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn player(&self) -> Option<&Entity> {
        self.player.and_then(|id| self.base.entities.find(id))
    }

    pub fn score(&self) -> u32 {
        self.base.score
    }

    pub fn completion_pending(&self) -> bool {
        self.completion.is_some()
    }

    fn reset_gameplay(&mut self) {
        self.spawners.clear();
        self.progress = Rc::default();
        self.objectives_met.clear();
        self.completion = None;
        self.outcome = Outcome::Playing;
        self.player = None;
        self.fire_cooldown = 0.0;
        self.invulnerable = 0.0;
        self.jump_latched = false;
    }

    fn floor(&self) -> f32 {
        self.base.viewport.height
    }

    fn apply_input(&mut self, dt: f32) {
        self.fire_cooldown = (self.fire_cooldown - dt).max(0.0);
        self.invulnerable = (self.invulnerable - dt).max(0.0);
        let Some(player_id) = self.player else {
            return;
        };
        let input = self.input.snapshot();
        let floor = self.floor();

        let Some(player) = self.base.entities.find(player_id) else {
            return;
        };
        let Ok(body) = player.body(&self.base.physics) else {
            return;
        };
        let (position, radius) = (body.position, player.radius());
        let grounded = position.y + radius >= floor - GROUND_TOLERANCE;

        let horizontal = input.horizontal();
        if horizontal != 0.0 {
            if let Err(e) =
                player.apply_force(&mut self.base.physics, MOVE_FORCE, Vec2::new(horizontal, 0.0))
            {
                warn!(error = %e, "Player force dropped");
            }
        }

        if input.is_down(Keys::JUMP) {
            if !self.jump_latched && grounded {
                if let Err(e) = player.apply_impulse(&mut self.base.physics, JUMP_IMPULSE, -Vec2::UNIT_Y) {
                    warn!(error = %e, "Jump dropped");
                }
            }
            self.jump_latched = true;
        } else {
            self.jump_latched = false;
        }

        if input.is_down(Keys::FIRE) && self.fire_cooldown <= 0.0 {
            let projectile_radius = EntityKind::Projectile.default_radius();
            let mut shot = EntitySpawn::new(
                EntityKind::Projectile,
                position + Vec2::new(radius + projectile_radius + 1.0, 0.0),
            );
            shot.velocity = PROJECTILE_VELOCITY;
            shot.elasticity = 0.0;
            self.base.spawn_from(&shot);
            self.fire_cooldown = FIRE_COOLDOWN;
        }
    }

    fn integrate(&mut self, dt: f32) {
        self.base.physics.apply_gravity();
        let physics = &mut self.base.physics;
        for entity in self.base.entities.iter_mut() {
            if let Err(e) = entity.update(physics, dt) {
                warn!(id = ?entity.id(), error = %e, "Live entity lost its body");
                entity.cleanup();
                continue;
            }
            if !entity.is_active() {
                continue;
            }
            let Ok(body) = entity.body(physics) else {
                continue;
            };
            match entity.kind() {
                EntityKind::Projectile => entity.rotation = body.velocity.angle(),
                EntityKind::Obstacle | EntityKind::Vehicle => {
                    entity.rotation += body.velocity.x * dt / entity.radius().max(1.0);
                }
                EntityKind::Player => {}
            }
        }
    }

    fn run_spawners(&mut self, dt: f32) {
        let mut pending = Vec::new();
        for spawner in self.spawners.iter_mut() {
            if spawner.exhausted() {
                continue;
            }
            spawner.clock += dt;
            let mut burst = 0;
            while spawner.clock >= spawner.def.interval && !spawner.exhausted() {
                if burst == MAX_SPAWNS_PER_TICK {
                    spawner.clock %= spawner.def.interval;
                    break;
                }
                burst += 1;
                spawner.clock -= spawner.def.interval;
                spawner.spawned += 1;

                let def = &spawner.def;
                let y = if def.y_max > def.y_min {
                    self.rng.gen_range(def.y_min..=def.y_max)
                } else {
                    def.y_min
                };
                let boost = if def.jitter > 0.0 {
                    1.0 + self.rng.gen_range(0.0..=def.jitter)
                } else {
                    1.0
                };
                let mut spawn = EntitySpawn::new(def.kind, Vec2::new(def.x, y));
                spawn.velocity = def.velocity * boost;
                spawn.sprite = def.sprite.clone();
                pending.push(spawn);
            }
        }
        for spawn in &pending {
            self.base.spawn_from(spawn);
        }
    }

    /// Ground clamp, player walls, and out-of-range removal.
    fn enforce_bounds(&mut self) {
        let (width, height) = (self.base.viewport.width, self.base.viewport.height);
        let physics = &mut self.base.physics;

        for entity in self.base.entities.iter_mut() {
            if !entity.is_active() {
                continue;
            }
            let radius = entity.radius();
            let kind = entity.kind();
            let Ok(body) = entity.body_mut(physics) else {
                continue;
            };
            if body.is_static() {
                continue;
            }
            let floor = height - radius;
            let p = body.position;
            let out_of_range =
                p.x < -OOB_MARGIN || p.x > width + OOB_MARGIN || p.y < -OOB_MARGIN;

            match kind {
                EntityKind::Player => {
                    if p.x < radius {
                        body.position.x = radius;
                        body.velocity.x = body.velocity.x.max(0.0);
                    } else if p.x > width - radius {
                        body.position.x = width - radius;
                        body.velocity.x = body.velocity.x.min(0.0);
                    }
                    if p.y > floor {
                        body.position.y = floor;
                        body.velocity.y = body.velocity.y.min(0.0);
                    }
                }
                EntityKind::Projectile => {
                    if p.y > floor || out_of_range {
                        entity.cleanup();
                    }
                }
                EntityKind::Obstacle | EntityKind::Vehicle => {
                    if p.y > floor {
                        body.position.y = floor;
                        body.velocity.y = body.velocity.y.min(0.0);
                    }
                    if out_of_range {
                        debug!(id = ?entity.id(), kind = %kind, "Left the playfield");
                        entity.cleanup();
                    }
                }
            }
        }
    }

    fn resolve_collisions(&mut self) {
        let mut hits = Vec::new();
        let entities = &self.base.entities;
        let physics = &self.base.physics;

        for (i, &ka) in EntityKind::ALL.iter().enumerate() {
            for &kb in &EntityKind::ALL[i..] {
                if !collision_rule(ka, kb).interacts() {
                    continue;
                }
                let (la, lb) = (entities.of_kind(ka), entities.of_kind(kb));
                for (ia, a) in la.iter().enumerate() {
                    if !a.is_active() {
                        continue;
                    }
                    let start = if ka == kb { ia + 1 } else { 0 };
                    for (ib, b) in lb.iter().enumerate().skip(start) {
                        if !b.is_active() {
                            continue;
                        }
                        match a.overlaps(b, physics) {
                            Ok(true) => hits.push((
                                EntitySlot { kind: ka, index: ia },
                                EntitySlot { kind: kb, index: ib },
                            )),
                            Ok(false) => {}
                            Err(e) => warn!(error = %e, "Overlap test on a stale body"),
                        }
                    }
                }
            }
        }

        for (a, b) in hits {
            self.apply_hit(a, b);
        }
    }

    fn apply_hit(&mut self, sa: EntitySlot, sb: EntitySlot) {
        let shielded = self.invulnerable > 0.0;
        let Some((a, b)) = self.base.entities.pair_mut(sa, sb) else {
            return;
        };
        // An earlier hit in this pass may already have killed one side.
        if !a.is_active() || !b.is_active() {
            return;
        }
        let rule = collision_rule(a.kind(), b.kind());
        let spared = |e: &Entity| shielded && e.kind() == EntityKind::Player;
        let hit_a = if spared(&*a) { Reaction::Ignore } else { a.on_collision(b) };
        let hit_b = if spared(&*b) { Reaction::Ignore } else { b.on_collision(a) };
        let player_hurt = (a.kind() == EntityKind::Player && matches!(hit_a, Reaction::Damage(_)))
            || (b.kind() == EntityKind::Player && matches!(hit_b, Reaction::Damage(_)));

        let (a_id, a_kind, a_dead) = (a.id(), a.kind(), !a.is_active());
        let (b_id, b_kind, b_dead) = (b.id(), b.kind(), !b.is_active());
        let (a_body, b_body) = (a.body_handle(), b.body_handle());
        let (ra, rb) = (a.radius(), b.radius());

        if player_hurt {
            self.invulnerable = INVULNERABLE_AFTER_HIT;
        }

        if rule.physical {
            match self.base.physics.body_pair_mut(a_body, b_body) {
                Ok((body_a, body_b)) => {
                    body_a.handle_collision(body_b, ra, rb);
                }
                Err(e) => warn!(error = %e, "Physical response on a stale body"),
            }
        }

        if a_kind == EntityKind::Projectile && b_kind != EntityKind::Projectile {
            self.projectile_hit(b_kind, b_dead);
        } else if b_kind == EntityKind::Projectile && a_kind != EntityKind::Projectile {
            self.projectile_hit(a_kind, a_dead);
        }

        if a_dead {
            self.base
                .events
                .publish(GameEvent::EntityDestroyed { id: a_id, kind: a_kind });
        }
        if b_dead {
            self.base
                .events
                .publish(GameEvent::EntityDestroyed { id: b_id, kind: b_kind });
        }
    }

    fn projectile_hit(&mut self, target: EntityKind, destroyed: bool) {
        let points = if destroyed { target.score_value() } else { 0 };
        self.base.score += points;
        debug!(target = %target, points, "Projectile hit");
        self.base
            .events
            .publish(GameEvent::ProjectileHit { target, points });
    }

    fn check_player(&mut self) {
        let Some(id) = self.player else {
            return;
        };
        if self.base.entities.find(id).is_some_and(Entity::is_active) {
            return;
        }
        self.player = None;
        self.outcome = Outcome::Lost;
        if let Some(handle) = self.completion.take() {
            self.base.timers.cancel(handle);
        }
        let level = self.base.level_id().unwrap_or_default();
        info!(level, score = self.base.score, "Player died");
        self.base.events.publish(GameEvent::PlayerDeath { level });
    }

    fn evaluate_objectives(&mut self) {
        if self.objectives_met.is_empty() || self.completion.is_some() {
            return;
        }
        let Some(level) = self.base.level() else {
            return;
        };

        let mut newly_met = Vec::new();
        {
            let progress = self.progress.borrow();
            for (i, objective) in level.objectives.iter().enumerate() {
                if self.objectives_met[i] {
                    continue;
                }
                let met = match objective {
                    Objective::ReachScore { score } => self.base.score >= *score,
                    Objective::Survive { seconds } => self.base.elapsed >= f64::from(*seconds),
                    Objective::DestroyCount { kind, count } => {
                        progress.destroyed[kind.index()] >= *count
                    }
                    Objective::ClearKind { kind } => {
                        self.base
                            .entities
                            .of_kind(*kind)
                            .iter()
                            .all(|e| !e.is_active())
                            && self
                                .spawners
                                .iter()
                                .filter(|s| s.def.kind == *kind)
                                .all(SpawnerState::exhausted)
                    }
                };
                if met {
                    newly_met.push(i);
                }
            }
        }

        let level_id = level.id;
        for index in newly_met {
            self.objectives_met[index] = true;
            self.base
                .events
                .publish(GameEvent::ObjectiveMet { level: level_id, index });
        }

        if self.objectives_met.iter().all(|met| *met) {
            info!(level = level_id, delay = COMPLETE_DELAY, "All objectives met");
            self.completion = Some(self.base.schedule(COMPLETE_DELAY, ArcadeTimer::CompleteLevel));
        }
    }

    fn complete_level(&mut self) {
        self.completion = None;
        if self.outcome != Outcome::Playing {
            return;
        }
        self.outcome = Outcome::Won;
        let level = self.base.level_id().unwrap_or_default();
        info!(level, score = self.base.score, "Level complete");
        self.base.events.publish(GameEvent::LevelComplete {
            level,
            score: self.base.score,
        });
    }
}

impl Scene for ArcadeScene {
    fn initialize(&mut self, level: LevelConfig) -> anyhow::Result<()> {
        let spawns = level.entities.clone();
        let spawners = level.spawners.clone();
        let objectives = level.objectives.len();
        let seed = level.seed();
        let id = level.id;

        self.base.bind_level(level)?;
        self.reset_gameplay();
        self.rng = StdRng::seed_from_u64(seed);
        self.spawners = spawners.into_iter().map(SpawnerState::new).collect();
        self.objectives_met = vec![false; objectives];

        for spawn in &spawns {
            let entity = self.base.spawn_from(spawn);
            if spawn.kind == EntityKind::Player {
                self.player = Some(entity);
            }
        }

        let progress = self.progress.clone();
        self.base.subscribe(EventName::EntityDestroyed, move |event| {
            if let GameEvent::EntityDestroyed { kind, .. } = event {
                progress.borrow_mut().destroyed[kind.index()] += 1;
            }
        });

        info!(
            level = id,
            entities = spawns.len(),
            spawners = self.spawners.len(),
            objectives,
            "Scene initialized"
        );
        Ok(())
    }

    fn start(&mut self) {
        self.base.start();
    }

    fn update(&mut self, dt: f32) {
        if !self.base.is_running() {
            return;
        }
        self.base.elapsed += f64::from(dt);

        for action in self.base.timers.advance(f64::from(dt)) {
            match action {
                ArcadeTimer::CompleteLevel => self.complete_level(),
            }
        }

        if self.outcome == Outcome::Playing {
            self.apply_input(dt);
            self.integrate(dt);
            self.run_spawners(dt);
            self.enforce_bounds();
            self.resolve_collisions();
            self.check_player();
            self.base.despawn_inactive();
            if self.outcome == Outcome::Playing {
                self.evaluate_objectives();
            }
        }

        let snapshot = self.snapshot();
        self.hud.push(&snapshot);
    }

    fn render(&self, renderer: &mut dyn RenderBackend) {
        self.base.render_entities(renderer);
    }

    fn cleanup(&mut self) {
        let level = self.base.level_id();
        self.base.teardown();
        self.reset_gameplay();
        info!(?level, "Scene cleaned up");
    }

    fn pause(&mut self) {
        self.base.pause();
    }

    fn resume(&mut self) {
        self.base.resume();
    }

    fn state(&self) -> SceneState {
        self.base.state()
    }

    fn snapshot(&self) -> HudSnapshot {
        HudSnapshot {
            health: self.player().map_or(0.0, |p| p.health.max(0.0)),
            score: self.base.score,
            level: self.base.level_id().unwrap_or_default(),
            time: self.base.elapsed as f32,
        }
    }

    fn level_id(&self) -> Option<u32> {
        self.base.level_id()
    }

    fn entity_count(&self) -> usize {
        self.base.entities.len()
    }

    fn body_count(&self) -> usize {
        self.base.physics.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetic_shared::{
        hud::{NullHud, SharedHud},
        input::{NullInput, SharedInput},
    };

    const DT: f32 = 1.0 / 60.0;

    fn cfg(gravity: f32) -> SimConfig {
        SimConfig {
            gravity,
            ..Default::default()
        }
    }

    fn level(mut entities: Vec<EntitySpawn>) -> LevelConfig {
        entities.insert(0, EntitySpawn::new(EntityKind::Player, Vec2::new(100.0, 584.0)));
        LevelConfig {
            id: 1,
            entities,
            objectives: Vec::new(),
            background: String::new(),
            music: String::new(),
            spawners: Vec::new(),
            next_level: None,
            seed: None,
        }
    }

    fn fixed(kind: EntityKind, x: f32, y: f32) -> EntitySpawn {
        let mut spawn = EntitySpawn::new(kind, Vec2::new(x, y));
        spawn.is_static = true;
        spawn
    }

    fn record(bus: &EventBus) -> (Rc<RefCell<Vec<GameEvent>>>, kinetic_shared::event::Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let sub = bus.subscribe_all(move |e| sink.borrow_mut().push(e.clone()));
        (log, sub)
    }

    fn running(gravity: f32, level: LevelConfig, bus: &EventBus) -> ArcadeScene {
        let mut scene = ArcadeScene::new(&cfg(gravity), bus.clone(), Box::new(NullInput), Box::new(NullHud));
        scene.initialize(level).unwrap();
        scene.start();
        scene
    }

    #[test]
    fn cleanup_then_initialize_starts_from_scratch() {
        let bus = EventBus::new();
        let mut scene = running(980.0, level(vec![fixed(EntityKind::Obstacle, 400.0, 580.0)]), &bus);
        assert_eq!(scene.entity_count(), 2);
        assert_eq!(scene.body_count(), 2);
        assert_eq!(bus.listener_count(), 1);

        scene.cleanup();
        assert_eq!(scene.state(), SceneState::CleanedUp);
        assert_eq!(scene.entity_count(), 0);
        assert_eq!(scene.body_count(), 0);
        assert_eq!(bus.listener_count(), 0);

        scene.initialize(level(Vec::new())).unwrap();
        assert_eq!(scene.entity_count(), 1);
        assert_eq!(scene.body_count(), 1);
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn initialize_while_running_is_rejected() {
        let bus = EventBus::new();
        let mut scene = running(980.0, level(Vec::new()), &bus);
        assert!(scene.initialize(level(Vec::new())).is_err());
        assert_eq!(scene.state(), SceneState::Running);
        assert_eq!(scene.entity_count(), 1);
    }

    #[test]
    fn projectile_destroys_obstacle_and_scores() {
        let bus = EventBus::new();
        let (log, _sub) = record(&bus);
        let mut shot = EntitySpawn::new(EntityKind::Projectile, Vec2::new(200.0, 300.0));
        shot.velocity = Vec2::new(600.0, 0.0);
        let mut scene = running(0.0, level(vec![shot, fixed(EntityKind::Obstacle, 260.0, 300.0)]), &bus);

        for _ in 0..10 {
            scene.update(DT);
        }

        assert_eq!(scene.score(), EntityKind::Obstacle.score_value());
        assert_eq!(scene.entity_count(), 1, "only the player survives");
        assert_eq!(scene.body_count(), 1);

        let log = log.borrow();
        assert!(log.contains(&GameEvent::ProjectileHit {
            target: EntityKind::Obstacle,
            points: 10
        }));
        let destroyed = log
            .iter()
            .filter(|e| e.name() == EventName::EntityDestroyed)
            .count();
        assert_eq!(destroyed, 2);
    }

    #[test]
    fn lethal_hit_ends_the_level() {
        let bus = EventBus::new();
        let (log, _sub) = record(&bus);
        let mut lvl = level(vec![fixed(EntityKind::Obstacle, 135.0, 584.0)]);
        lvl.entities[0].health = Some(10.0);
        lvl.objectives = vec![Objective::Survive { seconds: 100.0 }];
        let mut scene = running(980.0, lvl, &bus);

        scene.update(DT);

        assert_eq!(scene.outcome(), Outcome::Lost);
        assert!(scene.player().is_none());
        assert_eq!(scene.snapshot().health, 0.0);
        assert!(log.borrow().contains(&GameEvent::PlayerDeath { level: 1 }));

        let published = bus.published();
        scene.update(DT);
        assert_eq!(bus.published(), published, "no gameplay after the outcome");
    }

    #[test]
    fn player_is_briefly_invulnerable_after_a_hit() {
        let bus = EventBus::new();
        let mut scene = running(0.0, level(vec![fixed(EntityKind::Vehicle, 140.0, 584.0)]), &bus);

        for _ in 0..10 {
            scene.update(DT);
        }

        let player = scene.player().unwrap();
        assert_eq!(player.health, 100.0 - kinetic_shared::collision::VEHICLE_DAMAGE);
        assert!(player.is_active());
    }

    #[test]
    fn objectives_complete_after_delay() {
        let bus = EventBus::new();
        let (log, _sub) = record(&bus);
        let mut lvl = level(Vec::new());
        lvl.objectives = vec![Objective::ReachScore { score: 0 }];
        let mut scene = running(980.0, lvl, &bus);

        scene.update(0.1);
        assert!(scene.completion_pending());
        assert!(log.borrow().contains(&GameEvent::ObjectiveMet { level: 1, index: 0 }));

        for _ in 0..20 {
            scene.update(0.1);
        }

        assert_eq!(scene.outcome(), Outcome::Won);
        let completions = log
            .borrow()
            .iter()
            .filter(|e| e.name() == EventName::LevelComplete)
            .count();
        assert_eq!(completions, 1);
    }

    #[test]
    fn spawners_are_deterministic_per_seed() {
        let mut lvl = level(Vec::new());
        lvl.spawners = vec![Spawner {
            kind: EntityKind::Vehicle,
            interval: 0.5,
            x: 820.0,
            y_min: 100.0,
            y_max: 400.0,
            velocity: Vec2::new(-100.0, 0.0),
            jitter: 0.5,
            limit: Some(3),
            sprite: None,
        }];

        let run = || {
            let bus = EventBus::new();
            let mut scene = running(0.0, lvl.clone(), &bus);
            for _ in 0..20 {
                scene.update(0.1);
            }
            scene
                .base()
                .entities
                .of_kind(EntityKind::Vehicle)
                .iter()
                .map(|e| e.position(&scene.base().physics).unwrap())
                .collect::<Vec<_>>()
        };

        let first = run();
        assert_eq!(first.len(), 3);
        assert_eq!(first, run());
    }

    #[test]
    fn long_tick_spawns_a_bounded_burst() {
        let mut lvl = level(Vec::new());
        lvl.spawners = vec![Spawner {
            kind: EntityKind::Vehicle,
            interval: 0.3,
            x: 700.0,
            y_min: 200.0,
            y_max: 200.0,
            velocity: Vec2::ZERO,
            jitter: 0.0,
            limit: None,
            sprite: None,
        }];
        let bus = EventBus::new();
        let mut scene = running(0.0, lvl, &bus);

        // Six spawns are due after two seconds.
        scene.update(2.0);
        assert_eq!(scene.entity_count(), 1 + MAX_SPAWNS_PER_TICK as usize);

        // Backlog was dropped, so a short tick adds nothing.
        scene.update(0.01);
        assert_eq!(scene.entity_count(), 1 + MAX_SPAWNS_PER_TICK as usize);
    }

    #[test]
    fn entities_leaving_the_playfield_are_dropped() {
        let bus = EventBus::new();
        let mut runaway = EntitySpawn::new(EntityKind::Vehicle, Vec2::new(-50.0, 300.0));
        runaway.velocity = Vec2::new(-1e4, 0.0);
        let mut scene = running(0.0, level(vec![runaway]), &bus);
        assert_eq!(scene.entity_count(), 2);
        assert_eq!(scene.body_count(), 2);

        scene.update(DT);
        assert_eq!(scene.entity_count(), 1);
        assert_eq!(scene.body_count(), 1);

        let mut shot = EntitySpawn::new(EntityKind::Projectile, Vec2::new(400.0, 590.0));
        shot.velocity = Vec2::new(0.0, 600.0);
        let mut scene = running(0.0, level(vec![shot]), &bus);
        scene.update(DT);
        assert_eq!(scene.entity_count(), 1);
        assert_eq!(scene.body_count(), 1);
        assert!(scene.base().entities.of_kind(EntityKind::Projectile).is_empty());
    }

    #[test]
    fn jump_needs_ground_and_a_fresh_press() {
        let bus = EventBus::new();
        let input = SharedInput::new();
        let hud = SharedHud::new();
        let mut scene = ArcadeScene::new(
            &cfg(980.0),
            bus.clone(),
            Box::new(input.clone()),
            Box::new(hud.clone()),
        );
        scene.initialize(level(Vec::new())).unwrap();
        scene.start();

        input.press(Keys::JUMP);
        scene.update(DT);
        let vy = scene.player().unwrap().velocity(&scene.base().physics).unwrap().y;
        assert!(vy < -400.0);

        // Still held: no second impulse.
        scene.update(DT);
        let vy2 = scene.player().unwrap().velocity(&scene.base().physics).unwrap().y;
        assert!(vy2 > vy);

        assert_eq!(hud.pushes(), 2);
        assert_eq!(hud.latest().unwrap().health, 100.0);
    }

    #[test]
    fn resting_player_stays_on_the_floor() {
        let bus = EventBus::new();
        let mut scene = running(980.0, level(Vec::new()), &bus);
        for _ in 0..60 {
            scene.update(DT);
        }
        let player = scene.player().unwrap();
        let body = player.body(&scene.base().physics).unwrap();
        assert_eq!(body.position.y, 600.0 - player.radius());
        assert_eq!(body.velocity.y, 0.0);
    }
}
