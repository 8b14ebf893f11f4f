//! Horizontal positioning tables.
//!
//! A player is placed by strobing `RESPx` after a counted busy-wait (coarse,
//! 15 pixels per iteration) and then nudged by a signed `HMPx` nibble applied
//! on the next `HMOVE` (fine, -8..=7 pixels). Both tables are generated at
//! compile time from the TIA's own placement rules, so the kernel never
//! computes a position at run time.
//!
//! | Table       | Wait starts at | Waits  | Reach                     |
//! |-------------|----------------|--------|---------------------------|
//! | `BLANKING`  | cycle 4        | 0..=13 | every pixel               |
//! | `IN_KERNEL` | cycle 24       | 0..=9  | every pixel except 2..=10 |
//!
//! The in-kernel wait starts late because both channels are drawn first, and
//! it cannot run long because the strobe must finish inside the line.

use atari_tia::{WIDTH, apply_motion, coarse_position};

use crate::timing::{
    BLANKING_MAX_WAIT, BLANKING_WAIT_START, IN_KERNEL_MAX_WAIT, IN_KERNEL_WAIT_START, Op,
};

/// How to reach one pixel: busy-wait iterations, then the `HMPx` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Positioning {
    pub wait: u8,
    pub fine_motion: u8,
}

/// Positioning for every pixel under one line layout.
#[derive(Debug)]
pub struct PositionTable {
    wait_start: u16,
    max_wait: u8,
    entries: [Option<Positioning>; WIDTH],
}

impl PositionTable {
    #[allow(clippy::manual_range_contains)]
    const fn generate(wait_start: u16, max_wait: u8) -> Self {
        let mut entries = [None; WIDTH];
        let mut pixel = 0;
        while pixel < WIDTH {
            let mut wait = 0;
            while wait <= max_wait {
                let coarse = coarse_position(strobe_cycle(wait_start, wait));
                let mut nudge = coarse as i16 - pixel as i16;
                if nudge > (WIDTH / 2) as i16 {
                    nudge -= WIDTH as i16;
                } else if nudge < -((WIDTH / 2) as i16) {
                    nudge += WIDTH as i16;
                }
                if nudge >= -8 && nudge <= 7 {
                    entries[pixel] = Some(Positioning {
                        wait,
                        fine_motion: (nudge as i8 as u8) << 4,
                    });
                    break;
                }
                wait += 1;
            }
            pixel += 1;
        }
        Self {
            wait_start,
            max_wait,
            entries,
        }
    }

    /// Wait count and fine motion that land a player on `pixel`, or `None`
    /// if this layout cannot reach it.
    #[must_use]
    pub const fn positioning_for(&self, pixel: u8) -> Option<Positioning> {
        if pixel as usize >= WIDTH {
            return None;
        }
        self.entries[pixel as usize]
    }

    /// Line cycle on which the `RESPx` write lands after `wait` iterations.
    #[must_use]
    pub const fn strobe_cycle(&self, wait: u8) -> u16 {
        strobe_cycle(self.wait_start, wait)
    }

    #[must_use]
    pub const fn max_wait(&self) -> u8 {
        self.max_wait
    }

    /// Pixel the player ends on after strobe and `HMOVE`.
    #[must_use]
    pub const fn landing(&self, positioning: Positioning) -> u8 {
        apply_motion(
            coarse_position(self.strobe_cycle(positioning.wait)),
            positioning.fine_motion,
        )
    }
}

const fn strobe_cycle(wait_start: u16, wait: u8) -> u16 {
    wait_start + Op::Wait(wait).cost().get() + Op::Strobe.cost().get() - 1
}

/// Dedicated positioning lines during vertical blank.
pub static BLANKING: PositionTable =
    PositionTable::generate(BLANKING_WAIT_START.get(), BLANKING_MAX_WAIT);

/// The allocation line of a band, after both channels are drawn.
pub static IN_KERNEL: PositionTable =
    PositionTable::generate(IN_KERNEL_WAIT_START.get(), IN_KERNEL_MAX_WAIT);
