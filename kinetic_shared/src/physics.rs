//! Physics registry.
//!
//! Owns every live body in a generation-checked arena and runs the per-tick
//! pipeline: gravity, integration, then an optional pairwise contact scan.
//!
//! The scan is a naive O(n^2) pass over all pairs. Live body counts stay in
//! the tens, and scenes with typed gameplay collisions usually turn it off and
//! run their own checks instead.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    arena::{Arena, ArenaError, Handle},
    body::Body,
    math::Vec2,
};

pub type BodyHandle = Handle<Body>;

/// Radius assumed for bodies that never declared one.
pub const FALLBACK_RADIUS: f32 = 10.0;

/// Physics parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Acceleration along +Y, in units/s^2.
    pub gravity: f32,
    #[serde(default = "default_fallback_radius")]
    pub fallback_radius: f32,
    /// Whether `update` runs the generic pairwise contact scan.
    #[serde(default = "default_collision_scan")]
    pub collision_scan: bool,
}

fn default_fallback_radius() -> f32 {
    FALLBACK_RADIUS
}

fn default_collision_scan() -> bool {
    true
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 980.0,
            fallback_radius: default_fallback_radius(),
            collision_scan: default_collision_scan(),
        }
    }
}

/// A pair of bodies that overlapped during the contact scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub a: BodyHandle,
    pub b: BodyHandle,
    /// Whether an impulse was applied (false when the pair was separating).
    pub resolved: bool,
}

/// Registry of simulated bodies.
#[derive(Default)]
pub struct PhysicsWorld {
    config: PhysicsConfig,
    bodies: Arena<Body>,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            bodies: Arena::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn gravity(&self) -> f32 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        self.config.gravity = gravity;
    }

    pub fn set_collision_scan(&mut self, enabled: bool) {
        self.config.collision_scan = enabled;
    }

    pub fn add_body(&mut self, body: Body) -> BodyHandle {
        self.bodies.insert(body)
    }

    /// Removes a body by identity. A handle that was already removed is
    /// rejected rather than matched against a recycled slot.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<Body, ArenaError> {
        self.bodies.remove(handle)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    pub fn body(&self, handle: BodyHandle) -> Result<&Body, ArenaError> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body, ArenaError> {
        self.bodies.get_mut(handle)
    }

    pub fn body_pair_mut(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
    ) -> Result<(&mut Body, &mut Body), ArenaError> {
        self.bodies.get2_mut(a, b)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies.iter()
    }

    /// One tick: gravity, integration, then the contact scan if enabled.
    pub fn update(&mut self, dt: f32) -> Vec<Contact> {
        self.apply_gravity();
        self.integrate(dt);
        if self.config.collision_scan {
            self.resolve_contacts()
        } else {
            Vec::new()
        }
    }

    /// Applies `gravity * mass` along +Y to every movable body.
    pub fn apply_gravity(&mut self) {
        let gravity = self.config.gravity;
        if gravity == 0.0 {
            return;
        }
        for (_, body) in self.bodies.iter_mut() {
            if !body.is_static() {
                let mass = body.mass();
                body.apply_force(gravity * mass, Vec2::UNIT_Y);
            }
        }
    }

    pub fn integrate(&mut self, dt: f32) {
        for (_, body) in self.bodies.iter_mut() {
            body.update(dt);
        }
    }

    /// Pairwise scan over all bodies (i < j), resolving every overlap.
    pub fn resolve_contacts(&mut self) -> Vec<Contact> {
        let handles = self.bodies.handles();
        let fallback = self.config.fallback_radius;
        let mut contacts = Vec::new();

        for (i, &a) in handles.iter().enumerate() {
            for &b in &handles[i + 1..] {
                let Ok((body_a, body_b)) = self.bodies.get2_mut(a, b) else {
                    continue;
                };
                let r1 = body_a.radius.unwrap_or(fallback);
                let r2 = body_b.radius.unwrap_or(fallback);
                if body_a.check_collision(body_b, r1, r2) {
                    let resolved = body_a.handle_collision(body_b, r1, r2);
                    trace!(?a, ?b, resolved, "contact");
                    contacts.push(Contact { a, b, resolved });
                }
            }
        }
        contacts
    }

    /// Forgets every body without touching the bodies themselves.
    pub fn clear(&mut self) {
        self.bodies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(gravity: f32) -> PhysicsWorld {
        PhysicsWorld::new(PhysicsConfig {
            gravity,
            ..Default::default()
        })
    }

    #[test]
    fn gravity_accelerates_movable_bodies_only() {
        let mut w = world(10.0);
        let falling = w.add_body(Body::new(Vec2::ZERO, 3.0));
        let ground = w.add_body(Body::fixed(Vec2::new(500.0, 0.0)));

        w.update(1.0);

        assert_eq!(w.body(falling).unwrap().velocity, Vec2::new(0.0, 10.0));
        assert_eq!(w.body(falling).unwrap().position, Vec2::new(0.0, 10.0));
        assert_eq!(w.body(ground).unwrap().position, Vec2::new(500.0, 0.0));
    }

    #[test]
    fn zero_gravity_leaves_bodies_at_rest() {
        let mut w = world(10.0);
        let h = w.add_body(Body::new(Vec2::ZERO, 2.0));
        w.set_gravity(0.0);
        assert_eq!(w.gravity(), 0.0);

        w.update(1.0);

        assert_eq!(w.body(h).unwrap().velocity, Vec2::ZERO);
    }

    #[test]
    fn removed_body_leaves_the_pipeline() {
        let mut w = world(10.0);
        let a = w.add_body(Body::new(Vec2::ZERO, 1.0));
        let b = w.add_body(Body::new(Vec2::new(5.0, 0.0), 1.0));
        assert_eq!(w.len(), 2);

        let removed = w.remove_body(b).unwrap();
        w.update(1.0);

        assert_eq!(w.len(), 1);
        assert_eq!(removed.position, Vec2::new(5.0, 0.0));
        assert_eq!(removed.velocity, Vec2::ZERO);
        assert!(w.body(b).is_err());
        assert!(w.remove_body(b).is_err());
        assert_eq!(w.body(a).unwrap().velocity, Vec2::new(0.0, 10.0));
    }

    #[test]
    fn scan_uses_fallback_radius() {
        let mut w = world(0.0);
        let a = w.add_body(Body::new(Vec2::ZERO, 1.0).with_velocity(Vec2::new(1.0, 0.0)));
        let b = w.add_body(Body::new(Vec2::new(19.0, 0.0), 1.0));
        let far = w.add_body(Body::new(Vec2::new(100.0, 0.0), 1.0).with_radius(1.0));

        let contacts = w.update(0.0);

        assert_eq!(contacts.len(), 1);
        assert_eq!((contacts[0].a, contacts[0].b), (a, b));
        assert!(contacts[0].resolved);
        assert_eq!(w.body(b).unwrap().velocity.x, 1.0);
        assert_eq!(w.body(far).unwrap().velocity, Vec2::ZERO);
    }

    #[test]
    fn scan_can_be_disabled() {
        let mut w = world(0.0);
        w.set_collision_scan(false);
        w.add_body(Body::new(Vec2::ZERO, 1.0).with_velocity(Vec2::new(1.0, 0.0)));
        w.add_body(Body::new(Vec2::new(1.0, 0.0), 1.0));

        assert!(w.update(0.0).is_empty());
    }

    #[test]
    fn clear_keeps_body_values_intact() {
        let mut w = world(0.0);
        let h = w.add_body(Body::new(Vec2::new(1.0, 1.0), 1.0));
        w.clear();
        assert!(w.is_empty());
        assert!(!w.contains(h));
    }
}
