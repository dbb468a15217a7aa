//! Level data.
//!
//! Levels arrive as JSON from an external loader:
//! `{id, entities[], objectives[], background, music}` plus optional
//! `spawners[]`, `next_level` and `seed`.
//!
//! # Usage
//! ```ignore
//! let level = LevelConfig::from_json_str(&text)?;
//! println!("Level {}: {} entities", level.id, level.entities.len());
//! ```

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::{body::Body, entity::EntityKind, math::Vec2};

/// One entity placed in the level at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpawn {
    pub kind: EntityKind,
    pub position: Vec2,
    #[serde(default)]
    pub velocity: Vec2,
    #[serde(default)]
    pub mass: Option<f32>,
    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub drag: f32,
    #[serde(default = "default_elasticity")]
    pub elasticity: f32,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default)]
    pub health: Option<f32>,
    #[serde(default)]
    pub sprite: Option<String>,
}

fn default_elasticity() -> f32 {
    0.5
}

impl EntitySpawn {
    pub fn new(kind: EntityKind, position: Vec2) -> Self {
        Self {
            kind,
            position,
            velocity: Vec2::ZERO,
            mass: None,
            radius: None,
            drag: 0.0,
            elasticity: default_elasticity(),
            is_static: false,
            health: None,
            sprite: None,
        }
    }

    /// Builds the body described by this spawn, filling kind defaults.
    pub fn body(&self) -> Body {
        Body::new(
            self.position,
            self.mass.unwrap_or_else(|| self.kind.default_mass()),
        )
        .with_velocity(self.velocity)
        .with_drag(self.drag)
        .with_elasticity(self.elasticity)
        .with_radius(self.radius.unwrap_or_else(|| self.kind.default_radius()))
        .with_static(self.is_static)
    }
}

/// Shortest accepted spawner interval, in seconds.
pub const MIN_SPAWN_INTERVAL: f32 = 0.05;

/// Periodic source of new entities entering the playfield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spawner {
    pub kind: EntityKind,
    /// Seconds between spawns.
    pub interval: f32,
    /// Spawn x coordinate (usually just off the right edge).
    pub x: f32,
    /// Vertical range the spawn point is drawn from.
    pub y_min: f32,
    pub y_max: f32,
    pub velocity: Vec2,
    /// Random extra speed along `velocity`, as a fraction.
    #[serde(default)]
    pub jitter: f32,
    /// Stop after this many spawns.
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub sprite: Option<String>,
}

/// Completion predicate. A level completes when all its objectives hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Objective {
    ReachScore { score: u32 },
    Survive { seconds: f32 },
    DestroyCount { kind: EntityKind, count: u32 },
    /// No live entity of `kind` remains (and no spawner for it is pending).
    ClearKind { kind: EntityKind },
}

/// Level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub id: u32,
    pub entities: Vec<EntitySpawn>,
    #[serde(default)]
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub music: String,
    #[serde(default)]
    pub spawners: Vec<Spawner>,
    #[serde(default)]
    pub next_level: Option<u32>,
    /// Seed for spawner jitter; defaults to the level id.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl LevelConfig {
    /// Parses and validates a level.
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let level: Self = serde_json::from_str(s).context("parse level json")?;
        level
            .validate()
            .with_context(|| format!("invalid level {}", level.id))?;
        Ok(level)
    }

    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(u64::from(self.id))
    }

    /// Checks structural invariants before any scene state is touched.
    pub fn validate(&self) -> anyhow::Result<()> {
        let players = self
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Player)
            .count();
        if players != 1 {
            bail!("expected exactly one player spawn, found {}", players);
        }

        for (i, e) in self.entities.iter().enumerate() {
            if !(e.position.x.is_finite() && e.position.y.is_finite()) {
                bail!("entity {} has a non-finite position", i);
            }
            if !(e.velocity.x.is_finite() && e.velocity.y.is_finite()) {
                bail!("entity {} has a non-finite velocity", i);
            }
            if let Some(mass) = e.mass {
                if !(mass.is_finite() && mass > 0.0) {
                    bail!("entity {} has non-positive mass {}", i, mass);
                }
            }
            if let Some(radius) = e.radius {
                if !(radius.is_finite() && radius > 0.0) {
                    bail!("entity {} has non-positive radius {}", i, radius);
                }
            }
            if e.drag < 0.0 {
                bail!("entity {} has negative drag", i);
            }
            if !(0.0..=1.0).contains(&e.elasticity) {
                bail!("entity {} elasticity {} outside [0, 1]", i, e.elasticity);
            }
        }

        for (i, s) in self.spawners.iter().enumerate() {
            if s.kind == EntityKind::Player {
                bail!("spawner {} cannot spawn players", i);
            }
            if !(s.interval.is_finite() && s.interval >= MIN_SPAWN_INTERVAL) {
                bail!(
                    "spawner {} interval {} below the {}s minimum",
                    i,
                    s.interval,
                    MIN_SPAWN_INTERVAL
                );
            }
            if s.y_min > s.y_max {
                bail!("spawner {} has y_min > y_max", i);
            }
        }

        for (i, o) in self.objectives.iter().enumerate() {
            match o {
                Objective::Survive { seconds } if !(seconds.is_finite() && *seconds >= 0.0) => {
                    bail!("objective {} has invalid duration", i);
                }
                Objective::DestroyCount {
                    kind: EntityKind::Player,
                    ..
                }
                | Objective::ClearKind {
                    kind: EntityKind::Player,
                } => {
                    bail!("objective {} targets the player", i);
                }
                _ => {}
            }
        }
        Ok(())
    }
}
