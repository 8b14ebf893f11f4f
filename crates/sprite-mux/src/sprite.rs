//! Logical sprites and the graphics catalog they draw from.

use std::fmt;

use serde::Serialize;

use crate::MuxError;

/// Stable handle to a registry slot.
///
/// Handles are reused: once a sprite is deleted its handle may be returned
/// by the next `new_sprite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SpriteId(u8);

impl SpriteId {
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SpriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags::bitflags! {
    /// Size, reflection and priority flags, plus sticky collision results.
    #[derive(Default)]
    pub struct Style: u8 {
        /// Double-width player.
        const DOUBLE = 1 << 0;
        /// Quad-width player. Wins over `DOUBLE`.
        const QUAD = 1 << 1;
        /// Mirror the graphics horizontally.
        const REFLECT = 1 << 2;
        /// Prefer channel 0, which the TIA draws above channel 1.
        const PRIORITY = 1 << 3;
        /// Set by the kernel when the sprite touched the playfield.
        const HIT_PLAYFIELD = 1 << 6;
        /// Set by the kernel when the sprite touched the other channel.
        const HIT_SPRITE = 1 << 7;

        const COLLISIONS = Self::HIT_PLAYFIELD.bits | Self::HIT_SPRITE.bits;
    }
}

impl Style {
    /// NUSIZx value for this style.
    #[must_use]
    pub fn nusiz(self) -> u8 {
        if self.contains(Self::QUAD) {
            0x07
        } else if self.contains(Self::DOUBLE) {
            0x05
        } else {
            0x00
        }
    }

    /// REFPx value for this style.
    #[must_use]
    pub fn refp(self) -> u8 {
        if self.contains(Self::REFLECT) {
            0x08
        } else {
            0x00
        }
    }
}

/// Attributes of one live sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sprite {
    /// Horizontal pixel, `0..160`.
    pub x: u8,
    /// Vertical position, including the off-screen band above the playfield.
    pub y: u8,
    /// Catalog index.
    pub model: u8,
    pub style: Style,
}

/// Graphics and colour tables for one sprite shape, one byte per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub graphics: Vec<u8>,
    pub colors: Vec<u8>,
}

impl Model {
    /// A model drawn in a single colour.
    #[must_use]
    pub fn solid(graphics: &[u8], color: u8) -> Self {
        Self {
            graphics: graphics.to_vec(),
            colors: vec![color; graphics.len()],
        }
    }
}

/// The set of models sprites can reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<Model>,
}

impl ModelCatalog {
    #[must_use]
    pub fn new(models: Vec<Model>) -> Self {
        Self { models }
    }

    #[must_use]
    pub fn get(&self, model: u8) -> Option<&Model> {
        self.models.get(usize::from(model))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Check every model has exactly `height` lines and fits an 8-bit index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidModel` for the first mismatching entry.
    pub fn validate(&self, height: u8) -> Result<(), MuxError> {
        if self.models.len() > 256 {
            return Err(MuxError::InvalidModel {
                model: 256,
                reason: "catalog holds more than 256 models".to_string(),
            });
        }
        for (model, entry) in self.models.iter().enumerate() {
            let expected = usize::from(height);
            if entry.graphics.len() != expected || entry.colors.len() != expected {
                return Err(MuxError::InvalidModel {
                    model,
                    reason: format!(
                        "{} graphics / {} colour lines, expected {expected}",
                        entry.graphics.len(),
                        entry.colors.len()
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_register_values() {
        assert_eq!(Style::empty().nusiz(), 0x00);
        assert_eq!(Style::DOUBLE.nusiz(), 0x05);
        assert_eq!((Style::DOUBLE | Style::QUAD).nusiz(), 0x07);
        assert_eq!(Style::REFLECT.refp(), 0x08);
        assert_eq!(Style::PRIORITY.refp(), 0x00);
    }

    #[test]
    fn catalog_checks_heights() {
        let catalog = ModelCatalog::new(vec![Model::solid(&[0xFF; 8], 0x1E)]);
        assert!(catalog.validate(8).is_ok());
        assert!(matches!(
            catalog.validate(6),
            Err(MuxError::InvalidModel { model: 0, .. })
        ));
    }
}
