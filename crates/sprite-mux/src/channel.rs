//! Hardware channel state.
//!
//! Each of the two player objects is a channel. A channel is bound to at most
//! one sprite at a time and walks `Unallocated -> Repositioning -> Active ->
//! Unallocated`. Blanking-time allocations skip `Repositioning`.

use crate::hpos::Positioning;
use crate::sprite::{SpriteId, Style};

/// Number of hardware channels.
pub const CHANNELS: usize = 2;

/// Lines `[start, end)` in sprite coordinates a binding covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub start: u16,
    pub end: u16,
}

impl Extent {
    #[must_use]
    pub fn contains(&self, line: u16) -> bool {
        (self.start..self.end).contains(&line)
    }
}

/// A sprite bound to a channel, with what the kernel needs to draw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub sprite: SpriteId,
    pub model: u8,
    pub extent: Extent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unallocated,
    /// Selected; waiting for its `RESPx` strobe (`strobed == false`) or for
    /// the `HMOVE` that follows it.
    Repositioning {
        binding: Binding,
        positioning: Positioning,
        strobed: bool,
    },
    Active(Binding),
}

impl ChannelState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ChannelState::Unallocated => "unallocated",
            ChannelState::Repositioning { .. } => "repositioning",
            ChannelState::Active(_) => "active",
        }
    }

    /// Sprite bound to the channel, if any.
    #[must_use]
    pub fn sprite(&self) -> Option<SpriteId> {
        match self {
            ChannelState::Unallocated => None,
            ChannelState::Repositioning { binding, .. } | ChannelState::Active(binding) => {
                Some(binding.sprite)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Channel {
    pub state: ChannelState,
    /// End of the last extent bound here. Orders free channels for service.
    pub current_y: u16,
    /// Collision latches gathered since the binding started.
    pub collisions: Style,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            state: ChannelState::Unallocated,
            current_y: 0,
            collisions: Style::empty(),
        }
    }
}

impl Channel {
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.state == ChannelState::Unallocated
    }

    /// Binding to draw on this line, if the channel is active and covers it.
    #[must_use]
    pub fn drawing(&self, line: u16) -> Option<Binding> {
        match self.state {
            ChannelState::Active(binding) if binding.extent.contains(line) => Some(binding),
            _ => None,
        }
    }

    /// Return to unallocated, handing back the binding and its collisions.
    pub fn release(&mut self) -> Option<(Binding, Style)> {
        let ChannelState::Active(binding) = self.state else {
            return None;
        };
        self.state = ChannelState::Unallocated;
        self.current_y = binding.extent.end;
        let hits = std::mem::replace(&mut self.collisions, Style::empty());
        Some((binding, hits))
    }
}

/// Free channel a sprite with `style` should take.
///
/// The free channel with the lower current y is serviced first, lower index
/// on ties. A `PRIORITY` sprite takes channel 0 whenever it is free so it
/// wins the player-over-player draw order.
#[must_use]
pub fn choose_free(channels: &[Channel; CHANNELS], style: Style) -> Option<usize> {
    if style.contains(Style::PRIORITY) && channels[0].is_free() {
        return Some(0);
    }
    (0..CHANNELS)
        .filter(|&c| channels[c].is_free())
        .min_by_key(|&c| (channels[c].current_y, c))
}

/// True when neither channel holds or awaits a sprite.
#[must_use]
pub fn is_void(channels: &[Channel; CHANNELS]) -> bool {
    channels.iter().all(Channel::is_free)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(sprite: u8, start: u16, end: u16) -> Channel {
        Channel {
            state: ChannelState::Active(Binding {
                sprite: SpriteId::new(sprite),
                model: 0,
                extent: Extent { start, end },
            }),
            current_y: 0,
            collisions: Style::empty(),
        }
    }

    #[test]
    fn draws_only_inside_extent() {
        let ch = active(1, 40, 48);
        assert!(ch.drawing(39).is_none());
        assert_eq!(ch.drawing(40).map(|b| b.sprite), Some(SpriteId::new(1)));
        assert!(ch.drawing(47).is_some());
        assert!(ch.drawing(48).is_none());
    }

    #[test]
    fn release_returns_collisions_and_records_end() {
        let mut ch = active(2, 10, 18);
        ch.collisions = Style::HIT_SPRITE;
        let (binding, hits) = ch.release().expect("active channel");
        assert_eq!(binding.sprite, SpriteId::new(2));
        assert_eq!(hits, Style::HIT_SPRITE);
        assert!(ch.is_free());
        assert_eq!(ch.current_y, 18);
        assert!(ch.collisions.is_empty());
        assert!(ch.release().is_none());
    }

    #[test]
    fn lower_current_y_is_serviced_first() {
        let mut channels = [Channel::default(), Channel::default()];
        assert_eq!(choose_free(&channels, Style::empty()), Some(0));
        channels[0].current_y = 60;
        channels[1].current_y = 20;
        assert_eq!(choose_free(&channels, Style::empty()), Some(1));
        assert_eq!(choose_free(&channels, Style::PRIORITY), Some(0));
    }

    #[test]
    fn busy_channels_are_skipped() {
        let channels = [active(0, 0, 8), Channel::default()];
        assert_eq!(choose_free(&channels, Style::PRIORITY), Some(1));
        assert!(!is_void(&channels));
        let both = [active(0, 0, 8), active(1, 0, 8)];
        assert_eq!(choose_free(&both, Style::empty()), None);
        assert!(is_void(&[Channel::default(), Channel::default()]));
    }
}
