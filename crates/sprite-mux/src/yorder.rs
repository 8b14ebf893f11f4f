//! Registry handles sorted by vertical position.
//!
//! The kernel walks this index top to bottom once per frame. It is kept
//! sorted incrementally: insertion scans from the bottom, a move bubbles the
//! entry by adjacent swaps, deletion shifts the tail down. Per-frame vertical
//! speed is small, so a move touches only a few neighbours.

use crate::sprite::SpriteId;

/// One slot of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub id: SpriteId,
    /// Copy of the sprite's `y`, kept in step by the engine.
    pub y: u8,
    /// Skipped by the kernel in the current or previous pass; retried with
    /// priority.
    pub deferred: bool,
}

#[derive(Debug, Clone, Default)]
pub struct YOrder {
    entries: Vec<Entry>,
}

impl YOrder {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, pos: usize) -> Option<&Entry> {
        self.entries.get(pos)
    }

    /// Handles in Y-order.
    pub fn ids(&self) -> impl Iterator<Item = SpriteId> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    #[must_use]
    pub fn position(&self, id: SpriteId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Insert `id` after every entry with `y` less than or equal to its own.
    ///
    /// Scans from the high-Y end, where new sprites usually spawn.
    pub fn insert(&mut self, id: SpriteId, y: u8) -> usize {
        let mut pos = self.entries.len();
        while pos > 0 && self.entries[pos - 1].y > y {
            pos -= 1;
        }
        self.entries.insert(
            pos,
            Entry {
                id,
                y,
                deferred: false,
            },
        );
        pos
    }

    /// Remove `id`, shifting later entries down by one.
    pub fn remove(&mut self, id: SpriteId) -> Option<Entry> {
        let pos = self.position(id)?;
        Some(self.entries.remove(pos))
    }

    /// Give `id` a new `y` and bubble it to its sorted place.
    ///
    /// The entry stops next to a run of equal `y` values, never inside it,
    /// and every other entry keeps its relative order. Returns the new
    /// position.
    pub fn reposition(&mut self, id: SpriteId, y: u8) -> Option<usize> {
        let mut pos = self.position(id)?;
        self.entries[pos].y = y;
        while pos + 1 < self.entries.len() && self.entries[pos + 1].y < y {
            self.entries.swap(pos, pos + 1);
            pos += 1;
        }
        while pos > 0 && self.entries[pos - 1].y > y {
            self.entries.swap(pos, pos - 1);
            pos -= 1;
        }
        Some(pos)
    }

    pub(crate) fn set_deferred(&mut self, pos: usize, deferred: bool) {
        if let Some(entry) = self.entries.get_mut(pos) {
            entry.deferred = deferred;
        }
    }

    /// True if adjacent entries never decrease in `y`.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].y <= w[1].y)
    }
}
