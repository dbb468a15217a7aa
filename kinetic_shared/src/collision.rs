//! Gameplay collision table.
//!
//! Every (kind, kind) pair has exactly one rule. The match below is exhaustive,
//! so adding an [`EntityKind`] variant fails to compile until its row and
//! column are filled in.

use crate::entity::EntityKind;

/// Damage a player takes from touching an obstacle.
pub const OBSTACLE_DAMAGE: f32 = 20.0;
/// Damage a player takes from a vehicle.
pub const VEHICLE_DAMAGE: f32 = 35.0;
/// Damage a vehicle takes from a projectile.
pub const PROJECTILE_DAMAGE: f32 = 50.0;

/// What touching another entity does to *this* entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reaction {
    Ignore,
    /// Physical response only.
    Bounce,
    /// Lose health; at or below zero the entity is destroyed.
    Damage(f32),
    Destroyed,
}

impl Reaction {
    pub fn is_ignore(self) -> bool {
        matches!(self, Reaction::Ignore)
    }
}

/// The outcome of a pair touching, from both sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionRule {
    pub first: Reaction,
    pub second: Reaction,
    /// Whether the bodies also exchange an impulse.
    pub physical: bool,
}

impl CollisionRule {
    const IGNORE: Self = Self {
        first: Reaction::Ignore,
        second: Reaction::Ignore,
        physical: false,
    };

    const fn new(first: Reaction, second: Reaction, physical: bool) -> Self {
        Self {
            first,
            second,
            physical,
        }
    }

    /// Same rule with the sides swapped.
    pub fn flipped(self) -> Self {
        Self::new(self.second, self.first, self.physical)
    }

    /// Whether the pair needs checking at all.
    pub fn interacts(self) -> bool {
        self.physical || !self.first.is_ignore() || !self.second.is_ignore()
    }
}

/// Looks up the rule for `a` touching `b`.
pub fn collision_rule(a: EntityKind, b: EntityKind) -> CollisionRule {
    use EntityKind::*;
    use Reaction::*;

    match (a, b) {
        (Player, Player) => CollisionRule::IGNORE,
        (Player, Obstacle) => CollisionRule::new(Damage(OBSTACLE_DAMAGE), Destroyed, false),
        (Player, Projectile) => CollisionRule::IGNORE,
        (Player, Vehicle) => CollisionRule::new(Damage(VEHICLE_DAMAGE), Bounce, true),

        (Obstacle, Obstacle) => CollisionRule::new(Bounce, Bounce, true),
        (Obstacle, Projectile) => CollisionRule::new(Destroyed, Destroyed, false),
        (Obstacle, Vehicle) => CollisionRule::new(Bounce, Bounce, true),

        (Projectile, Projectile) => CollisionRule::IGNORE,
        (Projectile, Vehicle) => CollisionRule::new(Destroyed, Damage(PROJECTILE_DAMAGE), false),

        (Vehicle, Vehicle) => CollisionRule::new(Bounce, Bounce, true),

        (Obstacle, Player) | (Projectile, Player) | (Vehicle, Player) => {
            collision_rule(b, a).flipped()
        }
        (Projectile, Obstacle) | (Vehicle, Obstacle) | (Vehicle, Projectile) => {
            collision_rule(b, a).flipped()
        }
    }
}
