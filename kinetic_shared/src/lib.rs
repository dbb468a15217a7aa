//! `kinetic_shared`
//!
//! Simulation libraries shared by the game loop, scenes and tests.
//!
//! Design goals:
//! - Deterministic: fixed steps, slot-ordered iteration, seeded randomness.
//! - Bodies are owned by the physics registry and addressed through
//!   generation-checked handles.
//! - Rendering, HUD and input are traits; the simulation never depends on a
//!   concrete collaborator.
//! - No `unsafe`.

pub mod arena;
pub mod body;
pub mod collision;
pub mod config;
pub mod entity;
pub mod event;
pub mod hud;
pub mod input;
pub mod level;
pub mod math;
pub mod physics;
pub mod render;
pub mod timer;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::arena::*;
    pub use crate::body::*;
    pub use crate::config::*;
    pub use crate::entity::*;
    pub use crate::event::*;
    pub use crate::math::*;
    pub use crate::physics::*;
}
