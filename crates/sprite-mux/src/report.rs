//! Per-frame kernel report.

use serde::Serialize;

use crate::sprite::SpriteId;

/// What one frame of the kernel did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub frame: u32,
    /// Candidates the kernel examined, in the order it examined them.
    pub considered: Vec<SpriteId>,
    /// Sprites that were bound and drawn.
    pub drawn: Vec<SpriteId>,
    /// Sprites left deferred for the next frame.
    pub deferred: Vec<SpriteId>,
    /// `RESPx` strobes issued during the active phase.
    pub repositions: u32,
    /// Bands in which neither channel held a sprite.
    pub void_bands: u16,
    pub worst_line_cycles: u16,
    pub overruns: u32,
}

impl FrameReport {
    #[must_use]
    pub fn new(frame: u32) -> Self {
        Self {
            frame,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn was_drawn(&self, id: SpriteId) -> bool {
        self.drawn.contains(&id)
    }
}
