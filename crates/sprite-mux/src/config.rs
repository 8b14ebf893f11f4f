//! Engine configuration.

use serde::Deserialize;

use crate::MuxError;

/// Hard upper bound on registry capacity.
///
/// Overlap counts, the Y-order index and per-sprite flags are sized for
/// this; a configuration may ask for fewer slots, never more.
pub const MAX_SPRITES: usize = 16;

/// Scanlines handled per kernel iteration.
pub const BAND_LINES: u16 = 2;

/// Multiplexer configuration.
///
/// Capacity and geometry are fixed when the engine is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MuxConfig {
    /// Registry slots, `1..=MAX_SPRITES`.
    pub capacity: usize,
    /// Lines per sprite model.
    pub sprite_height: u8,
    /// Gap two sprites need to share a channel.
    pub margin: u8,
    /// Sprite `y` of the first visible line. Smaller `y` values sit in the
    /// off-screen band above the playfield.
    pub y_offset: u8,
    /// Lines in the active phase. Must be even.
    pub visible_lines: u16,
    /// Frames between automatic overlap recomputes in `run_frame`. Zero
    /// leaves recomputation to the caller.
    pub overlap_cadence: u32,
    pub background_color: u8,
    pub playfield_color: u8,
    /// CTRLPF value written before the active phase.
    pub playfield_control: u8,
    /// Consecutive deferrals after which a sprite is reported as starved.
    pub starvation_warning_frames: u32,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            capacity: 12,
            sprite_height: 8,
            margin: 4,
            y_offset: 32,
            visible_lines: 192,
            overlap_cadence: 4,
            background_color: 0x00,
            playfield_color: 0x44,
            playfield_control: 0x01,
            starvation_warning_frames: 8,
        }
    }
}

impl MuxConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, MuxError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| MuxError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Vertical distance within which two sprites compete for channels.
    #[must_use]
    pub fn interval(&self) -> u16 {
        u16::from(self.sprite_height) + u16::from(self.margin)
    }

    /// Sprite `y` one past the last visible line.
    #[must_use]
    pub fn y_bottom(&self) -> u16 {
        u16::from(self.y_offset) + self.visible_lines
    }

    /// Bands in the active phase.
    #[must_use]
    pub fn bands(&self) -> u16 {
        self.visible_lines / BAND_LINES
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first violated constraint.
    pub fn validate(&self) -> Result<(), MuxError> {
        let fail = |reason: &str| Err(MuxError::InvalidConfig(reason.to_string()));
        if self.capacity == 0 || self.capacity > MAX_SPRITES {
            return fail("capacity must be between 1 and 16");
        }
        if self.sprite_height == 0 {
            return fail("sprite_height must be non-zero");
        }
        if self.visible_lines == 0 || self.visible_lines % BAND_LINES != 0 {
            return fail("visible_lines must be a non-zero multiple of 2");
        }
        // Every visible extent must be expressible with an 8-bit y.
        if self.y_bottom() > 256 {
            return fail("y_offset + visible_lines exceeds the 8-bit y range");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MuxConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interval(), 12);
        assert_eq!(config.bands(), 96);
        assert_eq!(config.y_bottom(), 224);
    }

    #[test]
    fn json_overrides_defaults() {
        let config = MuxConfig::from_json(r#"{ "capacity": 4, "margin": 2 }"#).expect("valid");
        assert_eq!(config.capacity, 4);
        assert_eq!(config.interval(), 10);
        assert_eq!(config.visible_lines, 192);
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(MuxConfig::from_json(r#"{ "capacity": 17 }"#).is_err());
        assert!(MuxConfig::from_json(r#"{ "visible_lines": 191 }"#).is_err());
        assert!(MuxConfig::from_json(r#"{ "y_offset": 100 }"#).is_err());
        assert!(MuxConfig::from_json(r#"{ "flicker": true }"#).is_err());
    }
}
