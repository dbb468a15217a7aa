//! Shared fixtures for the integration tests.

use std::cell::Cell;

use kinetic_game::scene::{Scene, SceneState};
use kinetic_shared::{
    hud::HudSnapshot,
    level::LevelConfig,
    render::{RenderBackend, Sprite},
};
use serde_json::json;

/// Installs a test-writer subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Counts frames and draw calls.
#[derive(Debug, Default)]
pub struct CountingRenderer {
    pub frames: u32,
    pub draws: u32,
    pub last_alpha: f32,
    open: bool,
}

impl RenderBackend for CountingRenderer {
    fn begin_frame(&mut self, alpha: f32) {
        assert!(!self.open, "begin_frame without end_frame");
        self.open = true;
        self.last_alpha = alpha;
    }

    fn draw(&mut self, _sprite: Sprite<'_>) {
        assert!(self.open, "draw outside a frame");
        self.draws += 1;
    }

    fn end_frame(&mut self) {
        self.open = false;
        self.frames += 1;
    }
}

/// Scene that only counts what the loop asks of it.
#[derive(Debug, Default)]
pub struct StepCounter {
    pub updates: u32,
    pub renders: Cell<u32>,
    pub last_dt: f32,
}

impl Scene for StepCounter {
    fn initialize(&mut self, _level: LevelConfig) -> anyhow::Result<()> {
        Ok(())
    }
    fn start(&mut self) {}
    fn update(&mut self, dt: f32) {
        self.updates += 1;
        self.last_dt = dt;
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

/// Level with a grounded player, one resting obstacle and a score goal.
pub fn level_json(id: u32, next_level: Option<u32>, score_goal: u32) -> String {
    json!({
        "id": id,
        "entities": [
            {"kind": "player", "position": {"x": 100.0, "y": 584.0}, "sprite": "hero"},
            {"kind": "obstacle", "position": {"x": 500.0, "y": 580.0}, "static": true, "sprite": "crate"}
        ],
        "objectives": [{"type": "reach_score", "score": score_goal}],
        "background": format!("bg_{id}.png"),
        "music": format!("track_{id}.ogg"),
        "next_level": next_level
    })
    .to_string()
}
