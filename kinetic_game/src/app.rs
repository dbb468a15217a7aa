//! Application context.
//!
//! The [`Director`] owns the collaborators that outlive any one level: the
//! event bus, the level source, the frame loop and the active scene.
//!
//! A transition has two halves. [`Director::load`] fetches and validates the
//! incoming level without borrowing the director, so the host can keep
//! running frames while it is pending. [`Director::activate`] then swaps the
//! level in synchronously; the current scene is only cleaned up once the new
//! level is known to be valid.

use std::{cell::Cell, future::Future, pin::Pin, rc::Rc};

use anyhow::Context;
use kinetic_shared::{
    config::SimConfig,
    event::{EventBus, EventName, GameEvent, Subscription},
    level::LevelConfig,
    render::RenderBackend,
};
use tracing::{info, warn};

use crate::{
    game_loop::{FixedTimestep, FrameReport, LoopState},
    loader::LevelSource,
    scene::Scene,
};

/// An in-flight level fetch, resolved to a validated config.
pub type LevelLoad = Pin<Box<dyn Future<Output = anyhow::Result<LevelConfig>>>>;

pub struct Director {
    events: EventBus,
    source: Rc<dyn LevelSource>,
    scene: Box<dyn Scene>,
    clock: FixedTimestep,
    next_level: Option<u32>,
    completed: Rc<Cell<Option<u32>>>,
    _on_complete: Subscription,
    levels_loaded: u32,
}

impl Director {
    /// `scene` must publish on `events`.
    pub fn new(
        cfg: &SimConfig,
        events: EventBus,
        source: Box<dyn LevelSource>,
        scene: Box<dyn Scene>,
    ) -> Self {
        let completed = Rc::new(Cell::new(None));
        let flag = completed.clone();
        let on_complete = events.subscribe(EventName::LevelComplete, move |event| {
            if let GameEvent::LevelComplete { level, .. } = event {
                flag.set(Some(*level));
            }
        });
        Self {
            events,
            source: Rc::from(source),
            scene,
            clock: FixedTimestep::from_config(cfg),
            next_level: None,
            completed,
            _on_complete: on_complete,
            levels_loaded: 0,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn scene(&self) -> &dyn Scene {
        self.scene.as_ref()
    }

    pub fn clock(&self) -> &FixedTimestep {
        &self.clock
    }

    pub fn levels_loaded(&self) -> u32 {
        self.levels_loaded
    }

    /// Starts fetching level `id`. The returned future holds its own handle
    /// on the source, so the director stays free while it is pending.
    pub fn load(&self, id: u32) -> LevelLoad {
        let source = self.source.clone();
        Box::pin(async move {
            let level = source.fetch(id).await?;
            level
                .validate()
                .with_context(|| format!("invalid level {id}"))?;
            Ok(level)
        })
    }

    /// Swaps in the result of [`Director::load`]. On any error, including a
    /// config that fails validation, the current scene keeps running
    /// untouched and `scene_load_failed` is published.
    pub fn activate(&mut self, id: u32, loaded: anyhow::Result<LevelConfig>) -> anyhow::Result<()> {
        let level = match loaded.and_then(|level| level.validate().map(|()| level)) {
            Ok(level) => level,
            Err(e) => return Err(self.load_failed(id, e)),
        };

        let previous = self.scene.level_id();
        let next_level = level.next_level;
        self.scene.cleanup();
        self.completed.set(None);
        if let Err(e) = self.scene.initialize(level) {
            return Err(self.load_failed(id, e));
        }
        self.scene.start();
        self.next_level = next_level;
        self.levels_loaded += 1;
        info!(?previous, level = id, ?next_level, "Scene transition");
        Ok(())
    }

    fn load_failed(&self, id: u32, e: anyhow::Error) -> anyhow::Error {
        let reason = format!("{e:#}");
        warn!(level = id, error = %reason, "Level load failed, keeping current scene");
        self.events.publish(GameEvent::SceneLoadFailed { level: id, reason });
        e
    }

    /// Loads `id` and swaps it in, with no frames running in between.
    pub async fn transition_to(&mut self, id: u32) -> anyhow::Result<()> {
        let loaded = self.load(id).await;
        self.activate(id, loaded)
    }

    /// The level to load next, once the current one has completed.
    pub fn pending_transition(&self) -> Option<u32> {
        let current = self.scene.level_id()?;
        match self.completed.get() {
            Some(done) if done == current => self.next_level,
            _ => None,
        }
    }

    /// Like [`Director::pending_transition`], but consumes the completion so
    /// a failed load is not retried every frame.
    pub fn take_pending_transition(&mut self) -> Option<u32> {
        let next = self.pending_transition()?;
        self.completed.set(None);
        Some(next)
    }

    /// Follows `next_level` after `level_complete`. Returns whether a
    /// transition happened.
    pub async fn advance(&mut self) -> anyhow::Result<bool> {
        let Some(next) = self.take_pending_transition() else {
            return Ok(false);
        };
        self.transition_to(next).await?;
        Ok(true)
    }

    pub fn start(&mut self, now: f64) {
        self.clock.start(now);
    }

    pub fn frame(&mut self, now: f64, renderer: &mut dyn RenderBackend) -> FrameReport {
        self.clock.frame(now, self.scene.as_mut(), renderer)
    }

    pub fn pause(&mut self) {
        if self.clock.state() == LoopState::Running {
            self.clock.pause();
            self.scene.pause();
            info!("Paused");
        }
    }

    pub fn resume(&mut self) {
        if self.clock.state() == LoopState::Paused {
            self.clock.resume();
            self.scene.resume();
            info!("Resumed");
        }
    }

    pub fn stop(&mut self) {
        self.clock.stop();
        self.scene.cleanup();
    }
}
