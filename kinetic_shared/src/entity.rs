//! Gameplay entities.
//!
//! An entity binds identity and activity state to exactly one body in the
//! physics registry. Physics calls go through the entity so that a dead
//! entity is a silent no-op, while a live entity holding a stale handle is a
//! loud error.
//!
//! Deactivating an entity only *marks* it for removal. The owning scene drops
//! the entity and its body in the same update pass.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::{
    arena::ArenaError,
    body::Body,
    collision::{collision_rule, Reaction},
    math::Vec2,
    physics::{BodyHandle, PhysicsWorld},
};

/// Opaque entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Allocates a process-unique id.
    pub fn new_unique() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Closed set of entity kinds. Collision behavior is keyed on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Obstacle,
    Projectile,
    Vehicle,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Player,
        EntityKind::Obstacle,
        EntityKind::Projectile,
        EntityKind::Vehicle,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        match self {
            EntityKind::Player => 0,
            EntityKind::Obstacle => 1,
            EntityKind::Projectile => 2,
            EntityKind::Vehicle => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Obstacle => "obstacle",
            EntityKind::Projectile => "projectile",
            EntityKind::Vehicle => "vehicle",
        }
    }

    pub fn default_radius(self) -> f32 {
        match self {
            EntityKind::Player => 16.0,
            EntityKind::Obstacle => 20.0,
            EntityKind::Projectile => 4.0,
            EntityKind::Vehicle => 28.0,
        }
    }

    pub fn default_mass(self) -> f32 {
        match self {
            EntityKind::Player => 1.0,
            EntityKind::Obstacle => 2.0,
            EntityKind::Projectile => 0.1,
            EntityKind::Vehicle => 8.0,
        }
    }

    pub fn default_health(self) -> f32 {
        match self {
            EntityKind::Player => 100.0,
            EntityKind::Vehicle => 100.0,
            EntityKind::Obstacle | EntityKind::Projectile => 1.0,
        }
    }

    /// Points awarded when this kind is destroyed by a projectile.
    pub fn score_value(self) -> u32 {
        match self {
            EntityKind::Obstacle => 10,
            EntityKind::Vehicle => 50,
            EntityKind::Player | EntityKind::Projectile => 0,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A simulated gameplay object.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    body: BodyHandle,
    radius: f32,
    /// Renderer-side resource key; never dereferenced by the simulation.
    pub sprite: Option<String>,
    pub health: f32,
    /// Cosmetic only; the physics state has no orientation.
    pub rotation: f32,
    active: bool,
}

impl Entity {
    /// Registers `body` with `physics` and wraps the handle.
    pub fn spawn(kind: EntityKind, body: Body, physics: &mut PhysicsWorld) -> Self {
        let radius = body.radius.unwrap_or_else(|| kind.default_radius());
        let body = physics.add_body(body.with_radius(radius));
        Self {
            id: EntityId::new_unique(),
            kind,
            body,
            radius,
            sprite: None,
            health: kind.default_health(),
            rotation: 0.0,
            active: true,
        }
    }

    pub fn with_health(mut self, health: f32) -> Self {
        self.health = health;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn body_handle(&self) -> BodyHandle {
        self.body
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn position(&self, physics: &PhysicsWorld) -> Result<Vec2, ArenaError> {
        physics.body(self.body).map(|b| b.position)
    }

    pub fn velocity(&self, physics: &PhysicsWorld) -> Result<Vec2, ArenaError> {
        physics.body(self.body).map(|b| b.velocity)
    }

    pub fn body<'w>(&self, physics: &'w PhysicsWorld) -> Result<&'w Body, ArenaError> {
        physics.body(self.body)
    }

    pub fn body_mut<'w>(&self, physics: &'w mut PhysicsWorld) -> Result<&'w mut Body, ArenaError> {
        physics.body_mut(self.body)
    }

    pub fn apply_force(
        &self,
        physics: &mut PhysicsWorld,
        magnitude: f32,
        direction: Vec2,
    ) -> Result<(), ArenaError> {
        if !self.active {
            return Ok(());
        }
        physics
            .body_mut(self.body)
            .map(|b| b.apply_force(magnitude, direction))
    }

    pub fn apply_impulse(
        &self,
        physics: &mut PhysicsWorld,
        magnitude: f32,
        direction: Vec2,
    ) -> Result<(), ArenaError> {
        if !self.active {
            return Ok(());
        }
        physics
            .body_mut(self.body)
            .map(|b| b.apply_impulse(magnitude, direction))
    }

    /// Integrates the owned body. No-op while inactive.
    pub fn update(&self, physics: &mut PhysicsWorld, dt: f32) -> Result<(), ArenaError> {
        if !self.active {
            return Ok(());
        }
        physics.body_mut(self.body).map(|b| b.update(dt))
    }

    /// Circle test against another entity using both declared radii.
    pub fn overlaps(&self, other: &Entity, physics: &PhysicsWorld) -> Result<bool, ArenaError> {
        let a = physics.body(self.body)?;
        let b = physics.body(other.body)?;
        Ok(a.check_collision(b, self.radius, other.radius))
    }

    /// Applies this entity's side of the collision rule against `other`.
    pub fn on_collision(&mut self, other: &Entity) -> Reaction {
        if !self.active {
            return Reaction::Ignore;
        }
        let reaction = collision_rule(self.kind, other.kind).first;
        self.react(reaction);
        reaction
    }

    /// Applies a reaction to this entity's state.
    pub fn react(&mut self, reaction: Reaction) {
        match reaction {
            Reaction::Ignore | Reaction::Bounce => {}
            Reaction::Damage(amount) => {
                self.health -= amount;
                if self.health <= 0.0 {
                    self.active = false;
                }
            }
            Reaction::Destroyed => self.active = false,
        }
    }

    /// Marks the entity dead. The body stays registered until the owner
    /// removes it.
    pub fn cleanup(&mut self) {
        self.active = false;
    }
}
