//! Fixed-capacity sprite table.

use crate::sprite::{Sprite, SpriteId};
use crate::MuxError;

/// Per-sprite state beyond the public attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Live {
    pub sprite: Sprite,
    /// Sprites after this one in Y-order within one interval.
    pub overlap: u8,
    /// Consecutive frames this sprite was deferred without being drawn.
    pub deferred_streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Free,
    Occupied(Live),
}

/// Sprite table with a free list. Capacity is fixed at construction.
#[derive(Debug, Clone)]
pub struct Registry {
    slots: Vec<Slot>,
    /// Free handles; the last pushed is reused first.
    free: Vec<SpriteId>,
}

impl Registry {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(usize::from(u8::MAX));
        Self {
            slots: vec![Slot::Free; capacity],
            free: (0..capacity)
                .rev()
                .map(|i| SpriteId::new(i as u8))
                .collect(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live sprite count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim a slot for `sprite`.
    ///
    /// # Errors
    ///
    /// Returns `CapacityExceeded` when every slot is live. Nothing is evicted.
    pub fn allocate(&mut self, sprite: Sprite) -> Result<SpriteId, MuxError> {
        let id = self.free.pop().ok_or(MuxError::CapacityExceeded {
            capacity: self.slots.len(),
        })?;
        self.slots[id.index()] = Slot::Occupied(Live {
            sprite,
            overlap: 0,
            deferred_streak: 0,
        });
        Ok(id)
    }

    /// Free the slot named by `id`, returning its last attributes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHandle` if `id` is not live.
    pub fn release(&mut self, id: SpriteId) -> Result<Sprite, MuxError> {
        let live = *self.live(id)?;
        self.slots[id.index()] = Slot::Free;
        self.free.push(id);
        Ok(live.sprite)
    }

    /// # Errors
    ///
    /// Returns `InvalidHandle` if `id` is not live.
    pub fn get(&self, id: SpriteId) -> Result<&Sprite, MuxError> {
        self.live(id).map(|live| &live.sprite)
    }

    #[must_use]
    pub fn contains(&self, id: SpriteId) -> bool {
        self.live(id).is_ok()
    }

    /// Live sprites in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (SpriteId, &Sprite)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Occupied(live) => Some((SpriteId::new(i as u8), &live.sprite)),
            Slot::Free => None,
        })
    }

    pub(crate) fn live(&self, id: SpriteId) -> Result<&Live, MuxError> {
        match self.slots.get(id.index()) {
            Some(Slot::Occupied(live)) => Ok(live),
            _ => Err(MuxError::InvalidHandle(id)),
        }
    }

    pub(crate) fn live_mut(&mut self, id: SpriteId) -> Result<&mut Live, MuxError> {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Occupied(live)) => Ok(live),
            _ => Err(MuxError::InvalidHandle(id)),
        }
    }
}
