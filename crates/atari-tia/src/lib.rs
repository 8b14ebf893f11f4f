//! Atari TIA (Television Interface Adapter) register interface.
//!
//! The TIA has no framebuffer: software feeds it one line at a time. Each
//! scanline is 228 colour clocks (76 CPU cycles), of which the first 68 are
//! horizontal blank and the remaining 160 are visible pixels.
//!
//! This model is line-latched: register writes update state immediately and
//! each visible line is rendered from the register state at the moment the
//! line ends (a `WSYNC` strobe or the 76th cycle). Kernels that write their
//! graphics once per line see the same picture as on hardware; mid-line
//! register races are not modelled. Player copies (NUSIZ modes 1-4, 6) are
//! drawn as a single copy.
//!
//! # Registers used by sprite kernels
//!
//! | Write | Name   | Description                              |
//! |-------|--------|------------------------------------------|
//! | $00   | VSYNC  | Bit 1 starts vertical sync (new frame)   |
//! | $01   | VBLANK | Bit 1 blanks output                      |
//! | $02   | WSYNC  | Halt CPU until end of line               |
//! | $04/5 | NUSIZx | Player size (bits 2-0)                   |
//! | $06/7 | COLUPx | Player colour                            |
//! | $08   | COLUPF | Playfield colour                         |
//! | $09   | COLUBK | Background colour                        |
//! | $0A   | CTRLPF | Bit 0 reflect, bit 2 playfield priority  |
//! | $0B/C | REFPx  | Bit 3 reflects player graphics           |
//! | $0D-F | PF0-2  | Playfield bits                           |
//! | $10/1 | RESPx  | Strobe: player starts at current beam    |
//! | $1B/C | GRPx   | Player graphics                          |
//! | $20/1 | HMPx   | Fine motion, signed nibble in bits 7-4   |
//! | $2A   | HMOVE  | Apply fine motion                        |
//! | $2B   | HMCLR  | Clear all fine motion registers          |
//! | $2C   | CXCLR  | Clear collision latches                  |
//!
//! | Read  | Name   | Bit 7                                    |
//! |-------|--------|------------------------------------------|
//! | $02   | CXP0FB | Player 0 hit playfield                   |
//! | $03   | CXP1FB | Player 1 hit playfield                   |
//! | $07   | CXPPMM | Player 0 hit player 1                    |

mod palette;

use kernel_core::{Bus, Observable, Tickable, Value};

pub use palette::argb;

/// Write register addresses.
pub mod regs {
    pub const VSYNC: u8 = 0x00;
    pub const VBLANK: u8 = 0x01;
    pub const WSYNC: u8 = 0x02;
    pub const NUSIZ0: u8 = 0x04;
    pub const NUSIZ1: u8 = 0x05;
    pub const COLUP0: u8 = 0x06;
    pub const COLUP1: u8 = 0x07;
    pub const COLUPF: u8 = 0x08;
    pub const COLUBK: u8 = 0x09;
    pub const CTRLPF: u8 = 0x0A;
    pub const REFP0: u8 = 0x0B;
    pub const REFP1: u8 = 0x0C;
    pub const PF0: u8 = 0x0D;
    pub const PF1: u8 = 0x0E;
    pub const PF2: u8 = 0x0F;
    pub const RESP0: u8 = 0x10;
    pub const RESP1: u8 = 0x11;
    pub const GRP0: u8 = 0x1B;
    pub const GRP1: u8 = 0x1C;
    pub const HMP0: u8 = 0x20;
    pub const HMP1: u8 = 0x21;
    pub const HMOVE: u8 = 0x2A;
    pub const HMCLR: u8 = 0x2B;
    pub const CXCLR: u8 = 0x2C;

    /// Per-player register pairs, indexed by player number.
    pub const NUSIZ: [u8; 2] = [NUSIZ0, NUSIZ1];
    pub const COLUP: [u8; 2] = [COLUP0, COLUP1];
    pub const REFP: [u8; 2] = [REFP0, REFP1];
    pub const RESP: [u8; 2] = [RESP0, RESP1];
    pub const GRP: [u8; 2] = [GRP0, GRP1];
    pub const HMP: [u8; 2] = [HMP0, HMP1];
}

/// Collision read register addresses. The latch is bit 7.
pub mod cx {
    pub const CXP0FB: u8 = 0x02;
    pub const CXP1FB: u8 = 0x03;
    pub const CXPPMM: u8 = 0x07;

    /// Player/playfield latch per player number.
    pub const PLAYFIELD: [u8; 2] = [CXP0FB, CXP1FB];

    pub const LATCH: u8 = 0x80;
}

/// CPU cycles per scanline.
pub const LINE_CYCLES: u16 = 76;

/// Colour clocks per CPU cycle.
pub const CLOCKS_PER_CYCLE: u16 = 3;

/// Colour clocks of horizontal blank at the start of each line.
pub const HBLANK_CLOCKS: u16 = 68;

/// Visible pixels per line.
pub const WIDTH: usize = 160;

/// Players start drawing this many pixels after the beam position of the
/// `RESPx` strobe.
pub const PLAYER_START_DELAY: u16 = 5;

/// Pixel a player lands on when `RESPx` is strobed with the write completing
/// on CPU cycle `cycle` of the line.
///
/// A strobe during horizontal blank places the player at pixel 3.
#[must_use]
pub const fn coarse_position(cycle: u16) -> u8 {
    let clock = cycle * CLOCKS_PER_CYCLE;
    if clock < HBLANK_CLOCKS {
        3
    } else {
        ((clock - HBLANK_CLOCKS + PLAYER_START_DELAY) % WIDTH as u16) as u8
    }
}

/// Signed motion held in the high nibble of an `HMPx` value.
///
/// Positive values move the object left.
#[must_use]
pub const fn motion(hm: u8) -> i8 {
    (hm as i8) >> 4
}

/// Position after an `HMOVE` with fine-motion register `hm`.
#[must_use]
pub const fn apply_motion(x: u8, hm: u8) -> u8 {
    let moved = x as i16 - motion(hm) as i16;
    moved.rem_euclid(WIDTH as i16) as u8
}

/// One logged register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRecord {
    /// Line number since the last VSYNC.
    pub line: u16,
    /// CPU cycle within the line.
    pub cycle: u16,
    pub address: u8,
    pub value: u8,
}

/// Line-latched TIA video model.
pub struct Tia {
    line: u16,
    cycle: u16,
    /// Framebuffer rows rendered since the last VSYNC.
    row: usize,
    height: usize,
    vblank: bool,
    frame_count: u32,

    nusiz: [u8; 2],
    colup: [u8; 2],
    refp: [u8; 2],
    grp: [u8; 2],
    hmp: [u8; 2],
    position: [u8; 2],
    colupf: u8,
    colubk: u8,
    ctrlpf: u8,
    pf: [u8; 3],

    cxp_fb: [u8; 2],
    cxppmm: u8,

    framebuffer: Vec<u32>,
    write_log: Option<Vec<WriteRecord>>,
}

impl Tia {
    /// Create a TIA whose framebuffer holds `height` visible lines.
    #[must_use]
    pub fn new(height: usize) -> Self {
        Self {
            line: 0,
            cycle: 0,
            row: 0,
            height,
            vblank: true,
            frame_count: 0,
            nusiz: [0; 2],
            colup: [0; 2],
            refp: [0; 2],
            grp: [0; 2],
            hmp: [0; 2],
            position: [3; 2],
            colupf: 0,
            colubk: 0,
            ctrlpf: 0,
            pf: [0; 3],
            cxp_fb: [0; 2],
            cxppmm: 0,
            framebuffer: vec![0xFF00_0000; WIDTH * height],
            write_log: None,
        }
    }

    /// Start recording every register write.
    pub fn enable_write_log(&mut self) {
        self.write_log = Some(Vec::new());
    }

    /// Writes recorded since logging was enabled or last cleared.
    #[must_use]
    pub fn write_log(&self) -> &[WriteRecord] {
        self.write_log.as_deref().unwrap_or(&[])
    }

    pub fn clear_write_log(&mut self) {
        if let Some(log) = &mut self.write_log {
            log.clear();
        }
    }

    #[must_use]
    pub fn line(&self) -> u16 {
        self.line
    }

    #[must_use]
    pub fn cycle(&self) -> u16 {
        self.cycle
    }

    #[must_use]
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Framebuffer rows rendered since the last VSYNC.
    #[must_use]
    pub fn rows_rendered(&self) -> usize {
        self.row
    }

    /// Horizontal pixel of player `player` (0 or 1).
    #[must_use]
    pub fn player_position(&self, player: usize) -> u8 {
        self.position[player]
    }

    #[must_use]
    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer
    }

    #[must_use]
    pub fn framebuffer_width(&self) -> u32 {
        WIDTH as u32
    }

    #[must_use]
    pub fn framebuffer_height(&self) -> u32 {
        self.height as u32
    }

    /// ARGB pixel at (`x`, `row`).
    #[must_use]
    pub fn pixel(&self, x: usize, row: usize) -> u32 {
        self.framebuffer[row * WIDTH + x]
    }

    fn end_line(&mut self) {
        if !self.vblank && self.row < self.height {
            self.render_line(self.row);
            self.row += 1;
        }
        self.line = self.line.wrapping_add(1);
        self.cycle = 0;
    }

    fn render_line(&mut self, row: usize) {
        let pf_priority = self.ctrlpf & 0x04 != 0;
        for x in 0..WIDTH {
            let pf = self.playfield_bit(x);
            let p0 = self.player_bit(0, x);
            let p1 = self.player_bit(1, x);

            if p0 && pf {
                self.cxp_fb[0] |= cx::LATCH;
            }
            if p1 && pf {
                self.cxp_fb[1] |= cx::LATCH;
            }
            if p0 && p1 {
                self.cxppmm |= cx::LATCH;
            }

            let colour = if pf && pf_priority {
                self.colupf
            } else if p0 {
                self.colup[0]
            } else if p1 {
                self.colup[1]
            } else if pf {
                self.colupf
            } else {
                self.colubk
            };
            self.framebuffer[row * WIDTH + x] = argb(colour);
        }
    }

    /// Playfield is 40 bits of 4 pixels: PF0 bits 4-7, PF1 bits 7-0, PF2
    /// bits 0-7 on the left half. The right half repeats or mirrors it.
    fn playfield_bit(&self, x: usize) -> bool {
        let index = x / 4;
        let mut bit = index % 20;
        if index >= 20 && self.ctrlpf & 0x01 != 0 {
            bit = 19 - bit;
        }
        let set = match bit {
            0..=3 => self.pf[0] >> (4 + bit),
            4..=11 => self.pf[1] >> (11 - bit),
            _ => self.pf[2] >> (bit - 12),
        };
        set & 1 != 0
    }

    fn player_bit(&self, player: usize, x: usize) -> bool {
        let scale = match self.nusiz[player] & 0x07 {
            5 => 2,
            7 => 4,
            _ => 1,
        };
        let offset = (x + WIDTH - usize::from(self.position[player])) % WIDTH;
        if offset >= 8 * scale {
            return false;
        }
        let bit = offset / scale;
        let mask = if self.refp[player] & 0x08 != 0 {
            1u8 << bit
        } else {
            0x80u8 >> bit
        };
        self.grp[player] & mask != 0
    }

    fn start_frame(&mut self) {
        self.line = 0;
        self.cycle = 0;
        self.row = 0;
        self.frame_count = self.frame_count.wrapping_add(1);
    }
}

impl Default for Tia {
    fn default() -> Self {
        Self::new(192)
    }
}

impl Tickable for Tia {
    fn tick(&mut self) {
        self.cycle += 1;
        if self.cycle >= LINE_CYCLES {
            self.end_line();
        }
    }
}

impl Bus for Tia {
    fn read(&mut self, address: u8) -> u8 {
        match address & 0x0F {
            cx::CXP0FB => self.cxp_fb[0],
            cx::CXP1FB => self.cxp_fb[1],
            cx::CXPPMM => self.cxppmm,
            _ => 0,
        }
    }

    fn write(&mut self, address: u8, value: u8) {
        if let Some(log) = &mut self.write_log {
            log.push(WriteRecord {
                line: self.line,
                cycle: self.cycle,
                address,
                value,
            });
        }

        match address & 0x3F {
            regs::VSYNC => {
                if value & 0x02 != 0 {
                    self.start_frame();
                }
            }
            regs::VBLANK => self.vblank = value & 0x02 != 0,
            regs::WSYNC => self.end_line(),
            regs::NUSIZ0 => self.nusiz[0] = value,
            regs::NUSIZ1 => self.nusiz[1] = value,
            regs::COLUP0 => self.colup[0] = value,
            regs::COLUP1 => self.colup[1] = value,
            regs::COLUPF => self.colupf = value,
            regs::COLUBK => self.colubk = value,
            regs::CTRLPF => self.ctrlpf = value,
            regs::REFP0 => self.refp[0] = value,
            regs::REFP1 => self.refp[1] = value,
            regs::PF0 => self.pf[0] = value,
            regs::PF1 => self.pf[1] = value,
            regs::PF2 => self.pf[2] = value,
            regs::RESP0 => self.position[0] = coarse_position(self.cycle),
            regs::RESP1 => self.position[1] = coarse_position(self.cycle),
            regs::GRP0 => self.grp[0] = value,
            regs::GRP1 => self.grp[1] = value,
            regs::HMP0 => self.hmp[0] = value,
            regs::HMP1 => self.hmp[1] = value,
            regs::HMOVE => {
                for p in 0..2 {
                    self.position[p] = apply_motion(self.position[p], self.hmp[p]);
                }
            }
            regs::HMCLR => self.hmp = [0; 2],
            regs::CXCLR => {
                self.cxp_fb = [0; 2];
                self.cxppmm = 0;
            }
            _ => {}
        }
    }
}

impl Observable for Tia {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "line" => Some(self.line.into()),
            "cycle" => Some(self.cycle.into()),
            "row" => Some(u16::try_from(self.row).unwrap_or(u16::MAX).into()),
            "vblank" => Some(self.vblank.into()),
            "p0.x" => Some(self.position[0].into()),
            "p1.x" => Some(self.position[1].into()),
            "p0.grp" => Some(self.grp[0].into()),
            "p1.grp" => Some(self.grp[1].into()),
            "p0.motion" => Some(motion(self.hmp[0]).into()),
            "p1.motion" => Some(motion(self.hmp[1]).into()),
            "cxp0fb" => Some(self.cxp_fb[0].into()),
            "cxp1fb" => Some(self.cxp_fb[1].into()),
            "cxppmm" => Some(self.cxppmm.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "line",
            "cycle",
            "row",
            "vblank",
            "p0.x",
            "p1.x",
            "p0.grp",
            "p1.grp",
            "p0.motion",
            "p1.motion",
            "cxp0fb",
            "cxp1fb",
            "cxppmm",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_core::Cycles;

    /// Fresh TIA with output enabled and a new frame started.
    fn active_tia(height: usize) -> Tia {
        let mut tia = Tia::new(height);
        tia.write(regs::VSYNC, 0x02);
        tia.write(regs::VSYNC, 0x00);
        tia.write(regs::VBLANK, 0x00);
        tia
    }

    #[test]
    fn strobe_in_hblank_lands_on_pixel_3() {
        assert_eq!(coarse_position(0), 3);
        assert_eq!(coarse_position(22), 3);
        // Cycle 23 = colour clock 69, one past hblank.
        assert_eq!(coarse_position(23), 6);
    }

    #[test]
    fn coarse_steps_are_three_pixels_per_cycle() {
        assert_eq!(coarse_position(28), 21);
        assert_eq!(coarse_position(29), 24);
        // Clock 225 wraps past the right edge.
        assert_eq!(coarse_position(75), 2);
    }

    #[test]
    fn fine_motion_is_signed_and_leftward() {
        assert_eq!(motion(0x70), 7);
        assert_eq!(motion(0x80), -8);
        assert_eq!(motion(0xF0), -1);
        assert_eq!(apply_motion(20, 0x30), 17);
        assert_eq!(apply_motion(20, 0xD0), 23);
        assert_eq!(apply_motion(2, 0x50), 157);
    }

    #[test]
    fn resp_uses_current_cycle() {
        let mut tia = active_tia(4);
        tia.tick_n(Cycles::new(40));
        tia.write(regs::RESP1, 0);
        assert_eq!(tia.player_position(1), coarse_position(40));
        assert_eq!(tia.player_position(0), 3);
    }

    #[test]
    fn hmove_applies_both_players_and_hmclr_resets() {
        let mut tia = active_tia(4);
        tia.write(regs::HMP0, 0x20);
        tia.write(regs::HMP1, 0xE0);
        tia.write(regs::HMOVE, 0);
        assert_eq!(tia.player_position(0), 1);
        assert_eq!(tia.player_position(1), 5);
        tia.write(regs::HMCLR, 0);
        tia.write(regs::HMOVE, 0);
        assert_eq!(tia.player_position(0), 1);
    }

    #[test]
    fn wsync_ends_line_and_resets_cycle() {
        let mut tia = active_tia(4);
        tia.tick_n(Cycles::new(10));
        tia.write(regs::WSYNC, 0);
        assert_eq!(tia.line(), 1);
        assert_eq!(tia.cycle(), 0);
        assert_eq!(tia.rows_rendered(), 1);
    }

    #[test]
    fn line_ends_on_its_own_after_76_cycles() {
        let mut tia = active_tia(4);
        tia.tick_n(Cycles::new(LINE_CYCLES));
        assert_eq!(tia.line(), 1);
        assert_eq!(tia.cycle(), 0);
    }

    #[test]
    fn vblank_lines_are_not_rendered() {
        let mut tia = active_tia(4);
        tia.write(regs::VBLANK, 0x02);
        tia.write(regs::WSYNC, 0);
        assert_eq!(tia.rows_rendered(), 0);
        assert_eq!(tia.line(), 1);
    }

    #[test]
    fn player_graphics_render_at_position() {
        let mut tia = active_tia(1);
        tia.write(regs::COLUBK, 0x00);
        tia.write(regs::COLUP0, 0x0E);
        tia.write(regs::GRP0, 0b1000_0001);
        tia.write(regs::WSYNC, 0);
        // Player 0 sits at pixel 3 after reset.
        assert_eq!(tia.pixel(3, 0), argb(0x0E));
        assert_eq!(tia.pixel(4, 0), argb(0x00));
        assert_eq!(tia.pixel(10, 0), argb(0x0E));
    }

    #[test]
    fn reflected_and_double_width_player() {
        let mut tia = active_tia(1);
        tia.write(regs::COLUP1, 0x1E);
        tia.write(regs::GRP1, 0b1000_0000);
        tia.write(regs::REFP1, 0x08);
        tia.write(regs::NUSIZ1, 0x05);
        tia.write(regs::WSYNC, 0);
        // Reflected: bit 7 is drawn last; double width covers two pixels.
        assert_eq!(tia.pixel(3 + 14, 0), argb(0x1E));
        assert_eq!(tia.pixel(3 + 15, 0), argb(0x1E));
        assert_eq!(tia.pixel(3, 0), argb(0x00));
    }

    #[test]
    fn playfield_bit_order() {
        let mut tia = active_tia(1);
        tia.write(regs::COLUPF, 0x44);
        tia.write(regs::PF0, 0x10);
        tia.write(regs::PF1, 0x80);
        tia.write(regs::PF2, 0x01);
        tia.write(regs::WSYNC, 0);
        // PF0 bit 4 -> pixels 0-3, PF1 bit 7 -> 16-19, PF2 bit 0 -> 48-51.
        assert_eq!(tia.pixel(0, 0), argb(0x44));
        assert_eq!(tia.pixel(16, 0), argb(0x44));
        assert_eq!(tia.pixel(48, 0), argb(0x44));
        assert_eq!(tia.pixel(4, 0), argb(0x00));
        // Repeated on the right half.
        assert_eq!(tia.pixel(80, 0), argb(0x44));
    }

    #[test]
    fn collisions_latch_until_cleared() {
        let mut tia = active_tia(2);
        tia.write(regs::PF0, 0x10);
        tia.write(regs::GRP0, 0xFF);
        tia.write(regs::GRP1, 0xFF);
        tia.write(regs::WSYNC, 0);
        assert_eq!(tia.read(cx::CXP0FB), cx::LATCH);
        assert_eq!(tia.read(cx::CXP1FB), cx::LATCH);
        assert_eq!(tia.read(cx::CXPPMM), cx::LATCH);

        tia.write(regs::GRP0, 0);
        tia.write(regs::GRP1, 0);
        tia.write(regs::WSYNC, 0);
        assert_eq!(tia.read(cx::CXP0FB), cx::LATCH);

        tia.write(regs::CXCLR, 0);
        assert_eq!(tia.read(cx::CXP0FB), 0);
        assert_eq!(tia.read(cx::CXPPMM), 0);
    }

    #[test]
    fn write_log_records_beam_position() {
        let mut tia = active_tia(2);
        tia.enable_write_log();
        tia.tick_n(Cycles::new(12));
        tia.write(regs::GRP0, 0xAA);
        assert_eq!(
            tia.write_log(),
            &[WriteRecord {
                line: 0,
                cycle: 12,
                address: regs::GRP0,
                value: 0xAA,
            }]
        );
    }

    #[test]
    fn observable_positions() {
        let tia = Tia::new(1);
        assert_eq!(tia.query("p0.x"), Some(Value::U8(3)));
        assert_eq!(tia.query("nope"), None);
    }
}
