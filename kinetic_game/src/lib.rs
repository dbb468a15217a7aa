//! `kinetic_game`
//!
//! Runtime side of the simulation:
//! - Fixed-timestep frame driver with a frame-skip cap
//! - Scene lifecycle and the shared scene base
//! - The arcade scene (player, obstacles, vehicles, projectiles)
//! - Async level sources
//! - `Director`, the application context that swaps scenes
//!
//! Threading model:
//! - Single-threaded. Everything runs on the thread that drives frames.

pub mod app;
pub mod arcade;
pub mod game_loop;
pub mod loader;
pub mod scene;

pub use app::Director;
pub use arcade::ArcadeScene;
pub use game_loop::{FixedTimestep, FrameReport};
pub use scene::{Scene, SceneState};
