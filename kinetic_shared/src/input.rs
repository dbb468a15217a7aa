//! Input handling.
//!
//! Keyboard mapping belongs to the platform. The simulation only sees a
//! per-tick snapshot of which logical keys are held.

use std::{cell::Cell, rc::Rc};

bitflags::bitflags! {
    /// Logical keys.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Keys: u8 {
        const LEFT  = 1 << 0;
        const RIGHT = 1 << 1;
        const JUMP  = 1 << 2;
        const FIRE  = 1 << 3;
    }
}

/// Key state at a moment in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub held: Keys,
}

impl InputState {
    pub fn new(held: Keys) -> Self {
        Self { held }
    }

    pub fn is_down(self, key: Keys) -> bool {
        self.held.contains(key)
    }

    /// Horizontal intent in {-1, 0, 1}.
    pub fn horizontal(self) -> f32 {
        let mut x = 0.0;
        if self.is_down(Keys::LEFT) {
            x -= 1.0;
        }
        if self.is_down(Keys::RIGHT) {
            x += 1.0;
        }
        x
    }
}

/// Source of per-tick input snapshots.
pub trait InputSource {
    fn snapshot(&self) -> InputState;
}

/// Input shared between the platform (writer) and a scene (reader).
#[derive(Debug, Clone, Default)]
pub struct SharedInput {
    state: Rc<Cell<InputState>>,
}

impl SharedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, held: Keys) {
        self.state.set(InputState::new(held));
    }

    pub fn press(&self, key: Keys) {
        let mut s = self.state.get();
        s.held.insert(key);
        self.state.set(s);
    }

    pub fn release(&self, key: Keys) {
        let mut s = self.state.get();
        s.held.remove(key);
        self.state.set(s);
    }
}

impl InputSource for SharedInput {
    fn snapshot(&self) -> InputState {
        self.state.get()
    }
}

/// No keys, ever. Useful for headless runs.
#[derive(Debug, Default)]
pub struct NullInput;

impl InputSource for NullInput {
    fn snapshot(&self) -> InputState {
        InputState::default()
    }
}
