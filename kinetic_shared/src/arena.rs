//! Generation-checked arena.
//!
//! Values live in a dense slot vector. A `Handle<T>` names a slot index plus the
//! generation the slot had when the value was inserted. Removing a value bumps
//! the slot generation, so every handle to the removed value turns stale and
//! is rejected instead of silently addressing whatever reuses the slot.
//!
//! Iteration follows slot order, which keeps simulation passes deterministic.

use std::{fmt, marker::PhantomData};

/// Typed handle into an [`Arena`].
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _phantom: PhantomData,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

// Manual impls: derives would require `T: Clone`/`T: PartialEq`.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

/// Arena operation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    /// The handle's slot was freed (and possibly reused) since it was issued.
    StaleHandle { index: u32, generation: u32 },
    /// Two handles passed to a pair accessor name the same slot.
    SameSlot { index: u32 },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArenaError::StaleHandle { index, generation } => {
                write!(f, "stale handle {}v{}", index, generation)
            }
            ArenaError::SameSlot { index } => write!(f, "both handles address slot {}", index),
        }
    }
}

impl std::error::Error for ArenaError {}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Dense slot storage with a free list.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value and returns its handle.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle::new(index, 0)
    }

    /// Removes and returns the value, invalidating every copy of `handle`.
    pub fn remove(&mut self, handle: Handle<T>) -> Result<T, ArenaError> {
        let slot = self
            .live_slot_mut(handle)
            .ok_or(ArenaError::StaleHandle {
                index: handle.index,
                generation: handle.generation,
            })?;
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        value.ok_or(ArenaError::StaleHandle {
            index: handle.index,
            generation: handle.generation,
        })
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_ok()
    }

    pub fn get(&self, handle: Handle<T>) -> Result<&T, ArenaError> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
            .ok_or(ArenaError::StaleHandle {
                index: handle.index,
                generation: handle.generation,
            })
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Result<&mut T, ArenaError> {
        self.live_slot_mut(handle)
            .and_then(|slot| slot.value.as_mut())
            .ok_or(ArenaError::StaleHandle {
                index: handle.index,
                generation: handle.generation,
            })
    }

    /// Borrows two distinct live values mutably at once.
    pub fn get2_mut(
        &mut self,
        a: Handle<T>,
        b: Handle<T>,
    ) -> Result<(&mut T, &mut T), ArenaError> {
        if a.index == b.index {
            return Err(ArenaError::SameSlot { index: a.index });
        }
        // Validate both before splitting so the error names the stale one.
        self.get(a)?;
        self.get(b)?;

        let (lo, hi, swapped) = if a.index < b.index {
            (a.index as usize, b.index as usize, false)
        } else {
            (b.index as usize, a.index as usize, true)
        };
        let (head, tail) = self.slots.split_at_mut(hi);
        let (Some(first), Some(second)) = (head[lo].value.as_mut(), tail[0].value.as_mut()) else {
            return Err(ArenaError::StaleHandle {
                index: a.index,
                generation: a.generation,
            });
        };
        if swapped {
            Ok((second, first))
        } else {
            Ok((first, second))
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live handles in slot order.
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.iter().map(|(h, _)| h).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| (Handle::new(i as u32, slot.generation), v))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(move |v| (Handle::new(i as u32, generation), v))
        })
    }

    /// Drops every value. Outstanding handles all become stale.
    pub fn clear(&mut self) {
        self.free.clear();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free.push(i as u32);
        }
        // Pop order reuses low indices first.
        self.free.reverse();
        self.len = 0;
    }

    fn live_slot_mut(&mut self, handle: Handle<T>) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.value.is_some())
    }
}
