//! Point-mass body with force accumulation and circular contacts.
//!
//! Integration is semi-implicit Euler: drag, then velocity from acceleration,
//! then position from the *new* velocity, then the force accumulator resets.
//! That order is part of the numeric contract and must not be rearranged.
//!
//! A static body is immovable: forces, impulses, drag, integration and contact
//! resolution never touch its position or velocity.

use serde::{Deserialize, Serialize};

use crate::math::{Vec2, EPSILON};

/// Smallest mass a body can carry; keeps `1/mass` finite.
pub const MIN_MASS: f32 = 1e-4;

/// Fraction of penetration depth removed per contact.
pub const CORRECTION_BIAS: f32 = 0.2;

/// Normal used when two bodies sit on the exact same point.
pub const COINCIDENT_NORMAL: Vec2 = Vec2::UNIT_X;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Accumulated this step; cleared by [`Body::update`].
    pub acceleration: Vec2,
    mass: f32,
    drag_coefficient: f32,
    elasticity: f32,
    is_static: bool,
    /// Collision radius, if the owner declared one.
    pub radius: Option<f32>,
}

impl Body {
    pub fn new(position: Vec2, mass: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            mass: sanitize_mass(mass),
            drag_coefficient: 0.0,
            elasticity: 1.0,
            is_static: false,
            radius: None,
        }
    }

    /// An immovable body (walls, ground, fixed obstacles).
    pub fn fixed(position: Vec2) -> Self {
        Self {
            is_static: true,
            ..Self::new(position, 1.0)
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_drag(mut self, drag_coefficient: f32) -> Self {
        self.drag_coefficient = drag_coefficient.max(0.0);
        self
    }

    pub fn with_elasticity(mut self, elasticity: f32) -> Self {
        self.elasticity = elasticity.clamp(0.0, 1.0);
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius.max(0.0));
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn drag_coefficient(&self) -> f32 {
        self.drag_coefficient
    }

    pub fn elasticity(&self) -> f32 {
        self.elasticity
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Zero for static bodies.
    pub fn inverse_mass(&self) -> f32 {
        if self.is_static {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    /// Accumulates `magnitude * direction / mass` into acceleration.
    ///
    /// `direction` is used as given; a non-unit vector scales the force.
    pub fn apply_force(&mut self, magnitude: f32, direction: Vec2) {
        if self.is_static {
            return;
        }
        self.acceleration += direction * magnitude / self.mass;
    }

    /// Changes velocity immediately, bypassing integration.
    pub fn apply_impulse(&mut self, magnitude: f32, direction: Vec2) {
        if self.is_static {
            return;
        }
        self.velocity += direction * magnitude / self.mass;
    }

    /// Quadratic drag `0.5 * c * |v|^2` against the direction of motion.
    pub fn apply_drag(&mut self, _dt: f32) {
        if self.is_static || self.drag_coefficient == 0.0 {
            return;
        }
        let speed = self.speed();
        if speed == 0.0 {
            return;
        }
        let magnitude = 0.5 * self.drag_coefficient * speed * speed;
        self.apply_force(magnitude, -self.direction());
    }

    pub fn update(&mut self, dt: f32) {
        if self.is_static {
            return;
        }
        self.apply_drag(dt);
        self.velocity += self.acceleration * dt;
        self.position += self.velocity * dt;
        self.acceleration = Vec2::ZERO;
    }

    /// Strict circle overlap: touching exactly is not a collision.
    pub fn check_collision(&self, other: &Body, r1: f32, r2: f32) -> bool {
        self.position.distance(other.position) < r1 + r2
    }

    /// Impulse response plus positional correction for an overlapping pair.
    ///
    /// Returns `false` when the pair was skipped: already separating, or both
    /// bodies immovable.
    pub fn handle_collision(&mut self, other: &mut Body, r1: f32, r2: f32) -> bool {
        let delta = other.position - self.position;
        let distance = delta.len();
        let normal = if distance < EPSILON {
            COINCIDENT_NORMAL
        } else {
            delta / distance
        };

        let normal_velocity = (other.velocity - self.velocity).dot(normal);
        if normal_velocity > 0.0 {
            return false;
        }

        let inv_self = self.inverse_mass();
        let inv_other = other.inverse_mass();
        let inv_sum = inv_self + inv_other;
        if inv_sum <= 0.0 {
            return false;
        }

        let restitution = self.elasticity.min(other.elasticity);
        let j = -(1.0 + restitution) * normal_velocity / inv_sum;

        if !self.is_static {
            self.velocity -= normal * j * inv_self;
        }
        if !other.is_static {
            other.velocity += normal * j * inv_other;
        }

        let radius_sum = r1 + r2;
        let penetration = radius_sum - distance;
        if penetration > 0.0 && radius_sum > EPSILON {
            let correction = normal * (penetration * CORRECTION_BIAS);
            if !self.is_static {
                self.position -= correction * (r2 / radius_sum);
            }
            if !other.is_static {
                other.position += correction * (r1 / radius_sum);
            }
        }
        true
    }

    pub fn speed(&self) -> f32 {
        self.velocity.len()
    }

    /// Unit velocity, `(0, 0)` at rest.
    pub fn direction(&self) -> Vec2 {
        self.velocity.normalize_or_zero()
    }
}

fn sanitize_mass(mass: f32) -> f32 {
    if mass.is_finite() && mass > MIN_MASS {
        mass
    } else {
        MIN_MASS
    }
}
