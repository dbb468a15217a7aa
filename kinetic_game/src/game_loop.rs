//! Fixed-timestep driver.
//!
//! The platform calls [`FixedTimestep::frame`] once per display refresh with a
//! monotonic timestamp. Elapsed time is banked into a debt counter and paid
//! off in constant-size simulation steps, so simulation rate is independent of
//! render rate. Rendering happens exactly once per callback.
//!
//! After a stall (backgrounded window, debugger) at most `max_frame_skip`
//! steps run in one callback; whole steps still owed after that are dropped
//! rather than carried, so a slow frame cannot snowball into slower ones.
//!
//! Determinism notes:
//! - The step size handed to the scene never varies.
//! - Wall-clock time only decides *how many* steps run, never their size.

use kinetic_shared::{config::SimConfig, render::RenderBackend};
use tracing::{trace, warn};

use crate::scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
    Paused,
}

/// What one frame callback did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameReport {
    pub steps: u32,
    /// Whole steps discarded because of the frame-skip cap.
    pub dropped_steps: u64,
    /// Leftover debt as a fraction of a step.
    pub alpha: f32,
    pub rendered: bool,
}

pub struct FixedTimestep {
    state: LoopState,
    step: f64,
    max_frame_skip: u32,
    debt: f64,
    last_time: Option<f64>,
    total_steps: u64,
    total_dropped: u64,
}

impl FixedTimestep {
    pub fn new(step: f64, max_frame_skip: u32) -> Self {
        Self {
            state: LoopState::Stopped,
            step: if step.is_finite() && step > 0.0 {
                step
            } else {
                1.0 / 60.0
            },
            max_frame_skip: max_frame_skip.max(1),
            debt: 0.0,
            last_time: None,
            total_steps: 0,
            total_dropped: 0,
        }
    }

    pub fn from_config(cfg: &SimConfig) -> Self {
        Self::new(cfg.fixed_time_step, cfg.max_frame_skip)
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn max_frame_skip(&self) -> u32 {
        self.max_frame_skip
    }

    /// Unpaid simulation time, in seconds.
    pub fn debt(&self) -> f64 {
        self.debt
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn total_dropped(&self) -> u64 {
        self.total_dropped
    }

    /// Starts (or restarts) with an empty accumulator at time `now`.
    pub fn start(&mut self, now: f64) {
        self.state = LoopState::Running;
        self.debt = 0.0;
        self.last_time = Some(now);
    }

    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
        self.debt = 0.0;
        self.last_time = None;
    }

    /// Freezes update and render. Accumulated debt is kept.
    pub fn pause(&mut self) {
        if self.state == LoopState::Running {
            self.state = LoopState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == LoopState::Paused {
            self.state = LoopState::Running;
        }
    }

    /// One platform frame callback.
    pub fn frame<S>(
        &mut self,
        now: f64,
        scene: &mut S,
        renderer: &mut dyn RenderBackend,
    ) -> FrameReport
    where
        S: Scene + ?Sized,
    {
        if self.state == LoopState::Stopped {
            return FrameReport::default();
        }

        let delta = match self.last_time {
            Some(last) => now - last,
            None => 0.0,
        };
        // Negative or NaN deltas (clock hiccups) bank nothing.
        let delta = if delta > 0.0 { delta } else { 0.0 };
        self.last_time = Some(now);

        if self.state == LoopState::Paused {
            return FrameReport::default();
        }

        self.debt += delta;
        let mut steps = 0;
        while self.debt >= self.step && steps < self.max_frame_skip {
            scene.update(self.step as f32);
            self.debt -= self.step;
            steps += 1;
        }
        self.total_steps += u64::from(steps);

        let mut dropped_steps = 0;
        if self.debt >= self.step {
            dropped_steps = (self.debt / self.step).floor() as u64;
            self.debt = (self.debt - dropped_steps as f64 * self.step).max(0.0);
            self.total_dropped += dropped_steps;
            warn!(
                dropped_steps,
                max_frame_skip = self.max_frame_skip,
                "Frame budget exceeded, dropping simulation debt"
            );
        }

        let alpha = (self.debt / self.step) as f32;
        renderer.begin_frame(alpha);
        scene.render(renderer);
        renderer.end_frame();

        trace!(steps, alpha, "frame");
        FrameReport {
            steps,
            dropped_steps,
            alpha,
            rendered: true,
        }
    }
}
