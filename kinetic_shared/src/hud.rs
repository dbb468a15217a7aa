//! HUD boundary.
//!
//! The scene pushes one snapshot per tick; what the HUD does with it is its
//! own business.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct HudSnapshot {
    pub health: f32,
    pub score: u32,
    pub level: u32,
    /// Seconds since the level started.
    pub time: f32,
}

pub trait HudSink {
    fn push(&mut self, snapshot: &HudSnapshot);
}

/// Discards snapshots.
#[derive(Debug, Default)]
pub struct NullHud;

impl HudSink for NullHud {
    fn push(&mut self, _snapshot: &HudSnapshot) {}
}

/// Keeps the latest snapshot where another owner can read it.
#[derive(Debug, Clone, Default)]
pub struct SharedHud {
    latest: Rc<RefCell<Option<HudSnapshot>>>,
    pushes: Rc<Cell<u64>>,
}

impl SharedHud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<HudSnapshot> {
        *self.latest.borrow()
    }

    pub fn pushes(&self) -> u64 {
        self.pushes.get()
    }
}

impl HudSink for SharedHud {
    fn push(&mut self, snapshot: &HudSnapshot) {
        *self.latest.borrow_mut() = Some(*snapshot);
        self.pushes.set(self.pushes.get() + 1);
    }
}
