//! Rendering boundary.
//!
//! The simulation never draws. Once per frame callback the loop opens a frame
//! with the interpolation alpha, the scene emits one [`Sprite`] per live
//! entity, and the frame is closed.

use crate::math::Vec2;

/// What a renderer needs to draw one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite<'a> {
    pub key: Option<&'a str>,
    pub position: Vec2,
    pub rotation: f32,
    pub radius: f32,
}

/// A minimal rendering API.
pub trait RenderBackend {
    /// `alpha` is the fraction of a fixed step left in the accumulator, for
    /// interpolating between the last two simulated states.
    fn begin_frame(&mut self, alpha: f32);
    fn draw(&mut self, sprite: Sprite<'_>);
    fn end_frame(&mut self);
}

/// A no-op renderer useful for headless runs.
#[derive(Default)]
pub struct NullRenderer;

impl RenderBackend for NullRenderer {
    fn begin_frame(&mut self, _alpha: f32) {}
    fn draw(&mut self, _sprite: Sprite<'_>) {}
    fn end_frame(&mut self) {}
}
