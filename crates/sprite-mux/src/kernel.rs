//! Dispatch kernel.
//!
//! Drives the two channels through one frame. `prepare` runs during vertical
//! blank: it binds up to two sprites (deferred ones first when they compete
//! for a channel) and positions them
//! on dedicated lines with the `BLANKING` table. `run` walks the visible area
//! two lines at a time:
//!
//! ```text
//! band k   line A  release ended extents (after one collision sample)
//!          line B  select the next candidate      -> Repositioning
//! band k+1 line B  strobe RESPx                   -> strobed
//! band k+2 line A  HMPx + HMOVE                   -> Active
//! ```
//!
//! so a candidate selected in band `k` can only be drawn from the first line
//! of band `k + 2`. A candidate that starts earlier, or whose column the
//! `IN_KERNEL` table cannot reach, is deferred and retried first on the next
//! frame. After the last band the frame is closed: active channels are
//! sampled one last time and every visible sprite that was not drawn is
//! deferred.

use atari_tia::{cx, regs};
use kernel_core::{Bus, Tickable};
use tracing::{debug, trace, warn};

use crate::background::Background;
use crate::channel::{self, Binding, CHANNELS, Channel, ChannelState, Extent};
use crate::config::{BAND_LINES, MuxConfig};
use crate::hpos::{BLANKING, IN_KERNEL, Positioning};
use crate::registry::Registry;
use crate::report::FrameReport;
use crate::sprite::{ModelCatalog, Style};
use crate::timing::{LOOKAHEAD_LIMIT, LineClock, MAX_PASSES_PER_SELECTION, Op};
use crate::yorder::{Entry, YOrder};

/// Lines with `VSYNC` held.
pub const VSYNC_LINES: u16 = 3;
/// Vertical blank lines after `VSYNC`, including channel setup.
pub const VBLANK_LINES: u16 = 37;
/// Blank lines after the visible area.
pub const OVERSCAN_LINES: u16 = 30;

/// Engine state the kernel reads. It writes only deferred markers, deferral
/// streaks and sticky collision flags.
pub(crate) struct Scene<'a> {
    pub config: &'a MuxConfig,
    pub catalog: &'a ModelCatalog,
    pub background: &'a Background,
    pub registry: &'a mut Registry,
    pub index: &'a mut YOrder,
}

impl Scene<'_> {
    fn extent(&self, entry: Entry) -> Extent {
        let start = u16::from(entry.y);
        Extent {
            start,
            end: start + u16::from(self.config.sprite_height),
        }
    }

    /// Some line of the sprite falls inside the visible area.
    fn is_visible(&self, entry: Entry) -> bool {
        let extent = self.extent(entry);
        extent.end > u16::from(self.config.y_offset) && extent.start < self.config.y_bottom()
    }

    fn overlap(&self, entry: Entry) -> u8 {
        self.registry.live(entry.id).map_or(0, |live| live.overlap)
    }

    fn style(&self, entry: Entry) -> Style {
        self.registry
            .get(entry.id)
            .map_or(Style::empty(), |sprite| sprite.style)
    }

    fn binding(&self, entry: Entry) -> Binding {
        Binding {
            sprite: entry.id,
            model: self.registry.get(entry.id).map_or(0, |sprite| sprite.model),
            extent: self.extent(entry),
        }
    }

    /// Graphics and colour for `binding` on `line`.
    fn line_data(&self, binding: Binding, line: u16) -> (u8, u8) {
        let row = usize::from(line - binding.extent.start);
        self.catalog.get(binding.model).map_or((0, 0), |model| {
            (
                model.graphics.get(row).copied().unwrap_or(0),
                model.colors.get(row).copied().unwrap_or(0),
            )
        })
    }
}

/// Channels plus the per-frame walk over the Y-order index.
#[derive(Debug, Clone, Default)]
pub(crate) struct Kernel {
    channels: [Channel; CHANNELS],
    /// Next Y-order position the selector looks at.
    cursor: usize,
    /// Y-order positions bound this frame.
    served: Vec<bool>,
    /// A strobe happened on the last allocation line.
    pending_hmove: bool,
    primed: bool,
    clock: LineClock,
    report: FrameReport,
}

impl Kernel {
    pub fn channels(&self) -> &[Channel; CHANNELS] {
        &self.channels
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Forget the blanking-time bind after the index changed under it.
    pub fn invalidate(&mut self) {
        self.primed = false;
    }

    /// Vertical sync and blank: reset per-frame state and bind the first
    /// two candidates.
    pub fn prepare<B: Bus + Tickable>(&mut self, scene: &mut Scene<'_>, bus: &mut B, frame: u32) {
        self.channels = Default::default();
        self.cursor = 0;
        self.served = vec![false; scene.index.len()];
        self.pending_hmove = false;
        self.clock = LineClock::new();
        self.report = FrameReport::new(frame);

        self.store(bus, regs::VBLANK, 0x02);
        self.store(bus, regs::VSYNC, 0x02);
        for _ in 0..VSYNC_LINES {
            self.clock.wsync(bus);
        }
        self.store(bus, regs::VSYNC, 0x00);
        self.store(bus, regs::COLUBK, scene.config.background_color);
        self.store(bus, regs::COLUPF, scene.config.playfield_color);
        self.store(bus, regs::CTRLPF, scene.config.playfield_control);
        self.store(bus, regs::GRP0, 0);
        self.store(bus, regs::GRP1, 0);
        self.store(bus, regs::CXCLR, 0);
        self.clock.wsync(bus);
        let mut lines = 1;

        for pos in initial_candidates(scene) {
            let entry = scene.index.entries()[pos];
            self.report.considered.push(entry.id);
            let Some(c) = channel::choose_free(&self.channels, scene.style(entry)) else {
                break;
            };
            let x = scene.registry.get(entry.id).map_or(0, |sprite| sprite.x);
            let Some(positioning) = BLANKING.positioning_for(x) else {
                continue;
            };
            lines += self.position_in_blank(scene, bus, c, entry, positioning);
            let binding = scene.binding(entry);
            self.channels[c].state = ChannelState::Repositioning {
                binding,
                positioning,
                strobed: true,
            };
            self.serve(scene, pos);
            debug!(sprite = %entry.id, channel = c, y = entry.y, "bound in blank");
        }

        if self.channels.iter().any(|ch| !ch.is_free()) {
            self.apply_fine_motion(bus);
            self.clock.wsync(bus);
            lines += 1;
        }
        for _ in lines..VBLANK_LINES {
            self.clock.wsync(bus);
        }
        self.primed = true;
    }

    /// One line for NUSIZx/REFPx, one for the strobe. Returns lines used.
    fn position_in_blank<B: Bus + Tickable>(
        &mut self,
        scene: &Scene<'_>,
        bus: &mut B,
        c: usize,
        entry: Entry,
        positioning: Positioning,
    ) -> u16 {
        let style = scene.style(entry);
        self.store(bus, regs::NUSIZ[c], style.nusiz());
        self.store(bus, regs::REFP[c], style.refp());
        self.clock.wsync(bus);

        self.clock.idle(bus, Op::RepositionSetup);
        self.clock.idle(bus, Op::Wait(positioning.wait));
        self.clock
            .access(bus, Op::Strobe, |b| b.write(regs::RESP[c], 0));
        self.clock.wsync(bus);
        2
    }

    /// The visible area, then overscan. Returns what happened.
    pub fn run<B: Bus + Tickable>(&mut self, scene: &mut Scene<'_>, bus: &mut B) -> FrameReport {
        let first = u16::from(scene.config.y_offset);
        for band in 0..scene.config.bands() {
            let line = first + band * BAND_LINES;
            self.control_line(scene, bus, band, line);
            self.allocation_line(scene, bus, line + 1, line + 2 * BAND_LINES);
        }
        self.close_frame(scene, bus);
        self.primed = false;

        self.report.worst_line_cycles = self.clock.worst().get();
        self.report.overruns = self.clock.overruns();
        std::mem::take(&mut self.report)
    }

    /// Line A: motion, draw, playfield, releases.
    fn control_line<B: Bus + Tickable>(
        &mut self,
        scene: &mut Scene<'_>,
        bus: &mut B,
        band: u16,
        line: u16,
    ) {
        if band == 0 {
            self.store(bus, regs::VBLANK, 0x00);
        }
        if self.pending_hmove {
            self.apply_fine_motion(bus);
        }
        self.draw(scene, bus, line);

        let row = scene.background.row(band);
        self.clock.access(bus, Op::Playfield, |b| {
            b.write(regs::PF0, row.pf0);
            b.write(regs::PF1, row.pf1);
            b.write(regs::PF2, row.pf2);
        });

        let mut ended = [false; CHANNELS];
        for (c, channel) in self.channels.iter().enumerate() {
            self.clock.idle(bus, Op::EndCheck);
            ended[c] = matches!(channel.state, ChannelState::Active(b) if b.extent.end <= line);
        }
        if ended.contains(&true) {
            self.sample_collisions(bus);
            for c in (0..CHANNELS).filter(|&c| ended[c]) {
                self.clock.idle(bus, Op::Release);
                self.release(scene, c);
            }
        }

        if channel::is_void(&self.channels) {
            self.report.void_bands += 1;
            trace!(band, "void");
        }
        self.clock.wsync(bus);
    }

    /// Line B: draw, then one strobe or one selection.
    fn allocation_line<B: Bus + Tickable>(
        &mut self,
        scene: &mut Scene<'_>,
        bus: &mut B,
        line: u16,
        reach: u16,
    ) {
        self.draw(scene, bus, line);
        if let Some(c) = self.awaiting_strobe() {
            self.strobe(bus, c);
        } else if self.channels.iter().any(Channel::is_free) {
            self.select(scene, bus, reach);
        }
        self.clock.wsync(bus);
    }

    fn draw<B: Bus + Tickable>(&mut self, scene: &Scene<'_>, bus: &mut B, line: u16) {
        for c in 0..CHANNELS {
            let data = self.channels[c]
                .drawing(line)
                .map(|binding| scene.line_data(binding, line));
            self.clock.access(bus, Op::Draw, |b| match data {
                Some((graphics, colour)) => {
                    b.write(regs::GRP[c], graphics);
                    b.write(regs::COLUP[c], colour);
                }
                None => b.write(regs::GRP[c], 0),
            });
        }
    }

    fn awaiting_strobe(&self) -> Option<usize> {
        self.channels.iter().position(|ch| {
            matches!(
                ch.state,
                ChannelState::Repositioning { strobed: false, .. }
            )
        })
    }

    fn strobe<B: Bus + Tickable>(&mut self, bus: &mut B, c: usize) {
        let ChannelState::Repositioning {
            binding,
            positioning,
            ..
        } = self.channels[c].state
        else {
            return;
        };
        self.clock.idle(bus, Op::RepositionSetup);
        self.clock.idle(bus, Op::Wait(positioning.wait));
        self.clock
            .access(bus, Op::Strobe, |b| b.write(regs::RESP[c], 0));
        self.channels[c].state = ChannelState::Repositioning {
            binding,
            positioning,
            strobed: true,
        };
        self.pending_hmove = true;
        self.report.repositions += 1;
        trace!(channel = c, wait = positioning.wait, "strobe");
    }

    /// Write both HMPx registers, `HMOVE`, and activate strobed channels.
    fn apply_fine_motion<B: Bus + Tickable>(&mut self, bus: &mut B) {
        let mut motion = [0u8; CHANNELS];
        for (c, channel) in self.channels.iter().enumerate() {
            if let ChannelState::Repositioning {
                positioning,
                strobed: true,
                ..
            } = channel.state
            {
                motion[c] = positioning.fine_motion;
            }
        }
        self.clock.access(bus, Op::FineMotion, |b| {
            b.write(regs::HMP0, motion[0]);
            b.write(regs::HMP1, motion[1]);
        });
        self.clock
            .access(bus, Op::Hmove, |b| b.write(regs::HMOVE, 0));

        for channel in &mut self.channels {
            if let ChannelState::Repositioning {
                binding,
                strobed: true,
                ..
            } = channel.state
            {
                channel.state = ChannelState::Active(binding);
                channel.collisions = Style::empty();
                self.report.drawn.push(binding.sprite);
            }
        }
        self.pending_hmove = false;
    }

    /// Read the latches, credit them to every active channel, clear them.
    fn sample_collisions<B: Bus + Tickable>(&mut self, bus: &mut B) {
        let (playfield, players) = self.clock.access(bus, Op::CollisionSample, |b| {
            let playfield = [b.read(cx::CXP0FB), b.read(cx::CXP1FB)];
            let players = b.read(cx::CXPPMM);
            b.write(regs::CXCLR, 0);
            (playfield, players)
        });
        for (c, channel) in self.channels.iter_mut().enumerate() {
            if !matches!(channel.state, ChannelState::Active(_)) {
                continue;
            }
            if playfield[c] & cx::LATCH != 0 {
                channel.collisions |= Style::HIT_PLAYFIELD;
            }
            if players & cx::LATCH != 0 {
                channel.collisions |= Style::HIT_SPRITE;
            }
        }
    }

    fn release(&mut self, scene: &mut Scene<'_>, c: usize) {
        let Some((binding, hits)) = self.channels[c].release() else {
            return;
        };
        if let Ok(live) = scene.registry.live_mut(binding.sprite) {
            live.sprite.style |= hits;
        }
        trace!(channel = c, sprite = %binding.sprite, "released");
    }

    /// Pick the next sprite for a free channel.
    ///
    /// The head is the first unserved visible entry at the cursor. Unless the
    /// head is itself deferred, up to `overlap(head)` entries after it are
    /// searched for a deferred one that is reachable. An unreachable head is
    /// deferred and the cursor moves on. Lookahead steps and skips over
    /// served entries share one budget; deferrals and skips over entries above
    /// the screen share another.
    fn select<B: Bus + Tickable>(&mut self, scene: &mut Scene<'_>, bus: &mut B, reach: u16) {
        self.clock.idle(bus, Op::Select);
        let mut steps = LOOKAHEAD_LIMIT;
        let mut passes = 0;
        let y_offset = u16::from(scene.config.y_offset);
        let y_bottom = scene.config.y_bottom();

        loop {
            while self.served.get(self.cursor).copied().unwrap_or(false) {
                if steps == 0 {
                    return;
                }
                steps -= 1;
                self.clock.idle(bus, Op::LookaheadStep);
                self.cursor += 1;
            }
            let Some(head) = scene.index.get(self.cursor).copied() else {
                return;
            };
            if u16::from(head.y) >= y_bottom {
                self.cursor = scene.index.len();
                return;
            }
            if scene.extent(head).end <= y_offset {
                if passes == MAX_PASSES_PER_SELECTION {
                    return;
                }
                passes += 1;
                self.clock.idle(bus, Op::Defer);
                self.cursor += 1;
                continue;
            }

            let mut pick = self.cursor;
            if !head.deferred {
                let window = scene.overlap(head).min(steps);
                for pos in (self.cursor + 1..scene.index.len()).take(usize::from(window)) {
                    steps -= 1;
                    self.clock.idle(bus, Op::LookaheadStep);
                    let entry = scene.index.entries()[pos];
                    let served = self.served.get(pos).copied().unwrap_or(false);
                    if !served && entry.deferred && self.reachable(scene, entry, reach).is_some() {
                        pick = pos;
                        break;
                    }
                }
            }

            let entry = scene.index.entries()[pick];
            match self.reachable(scene, entry, reach) {
                Some(positioning) => {
                    self.report.considered.push(entry.id);
                    self.allocate(scene, bus, pick, positioning);
                    if pick == self.cursor {
                        self.cursor += 1;
                    }
                    return;
                }
                None if passes < MAX_PASSES_PER_SELECTION => {
                    self.report.considered.push(entry.id);
                    passes += 1;
                    self.clock.idle(bus, Op::Defer);
                    scene.index.set_deferred(pick, true);
                    self.cursor += 1;
                    debug!(sprite = %entry.id, y = entry.y, reach, "deferred");
                }
                None => return,
            }
        }
    }

    /// In-kernel positioning for `entry`, if its first line is still ahead of
    /// `reach` and its column is reachable mid-frame.
    fn reachable(&self, scene: &Scene<'_>, entry: Entry, reach: u16) -> Option<Positioning> {
        if u16::from(entry.y) < reach || u16::from(entry.y) >= scene.config.y_bottom() {
            return None;
        }
        let x = scene.registry.get(entry.id).ok()?.x;
        IN_KERNEL.positioning_for(x)
    }

    fn allocate<B: Bus + Tickable>(
        &mut self,
        scene: &mut Scene<'_>,
        bus: &mut B,
        pos: usize,
        positioning: Positioning,
    ) {
        let entry = scene.index.entries()[pos];
        let style = scene.style(entry);
        let Some(c) = channel::choose_free(&self.channels, style) else {
            return;
        };
        self.clock.access(bus, Op::Allocate, |b| {
            b.write(regs::NUSIZ[c], style.nusiz());
            b.write(regs::REFP[c], style.refp());
        });
        self.channels[c].state = ChannelState::Repositioning {
            binding: scene.binding(entry),
            positioning,
            strobed: false,
        };
        self.serve(scene, pos);
        debug!(sprite = %entry.id, channel = c, y = entry.y, "allocated");
    }

    /// Mark `pos` bound for this frame and clear its deferral.
    fn serve(&mut self, scene: &mut Scene<'_>, pos: usize) {
        if let Some(served) = self.served.get_mut(pos) {
            *served = true;
        }
        scene.index.set_deferred(pos, false);
    }

    /// Overscan: last collision sample, release everything, defer whatever
    /// was visible but never drawn.
    fn close_frame<B: Bus + Tickable>(&mut self, scene: &mut Scene<'_>, bus: &mut B) {
        self.store(bus, regs::VBLANK, 0x02);
        if self
            .channels
            .iter()
            .any(|ch| matches!(ch.state, ChannelState::Active(_)))
        {
            self.sample_collisions(bus);
        }
        for c in 0..CHANNELS {
            if let ChannelState::Repositioning { binding, .. } = self.channels[c].state {
                // Bound too late to be shown.
                if let Some(served) = scene
                    .index
                    .position(binding.sprite)
                    .and_then(|pos| self.served.get_mut(pos))
                {
                    *served = false;
                }
                self.channels[c].state = ChannelState::Unallocated;
            }
            self.release(scene, c);
        }
        self.pending_hmove = false;

        for id in &self.report.drawn {
            if let Ok(live) = scene.registry.live_mut(*id) {
                live.deferred_streak = 0;
            }
        }
        let threshold = scene.config.starvation_warning_frames;
        for pos in 0..scene.index.len() {
            let entry = scene.index.entries()[pos];
            if self.served.get(pos).copied().unwrap_or(false) {
                continue;
            }
            if !scene.is_visible(entry) {
                scene.index.set_deferred(pos, false);
                continue;
            }
            if !entry.deferred {
                scene.index.set_deferred(pos, true);
            }
            self.report.deferred.push(entry.id);
            if let Ok(live) = scene.registry.live_mut(entry.id) {
                live.deferred_streak += 1;
                if threshold > 0 && live.deferred_streak == threshold {
                    warn!(
                        sprite = %entry.id,
                        frames = live.deferred_streak,
                        "sprite starved of channels"
                    );
                }
            }
        }

        self.clock.wsync(bus);
        for _ in 1..OVERSCAN_LINES {
            self.clock.wsync(bus);
        }
    }

    fn store<B: Bus + Tickable>(&mut self, bus: &mut B, address: u8, value: u8) {
        self.clock
            .access(bus, Op::Store, |b| b.write(address, value));
    }
}

/// Visible entries for the blanking-time bind, in the order they are tried.
///
/// A deferred entry goes first only when it competes with the head for a
/// channel: it starts within one interval of the head, or it can only be
/// drawn from blank. Deeper deferred entries are left to in-kernel selection,
/// whose lookahead prefers them. The rest follow in Y-order.
fn initial_candidates(scene: &Scene<'_>) -> Vec<usize> {
    let entries = scene.index.entries();
    let visible: Vec<usize> = (0..entries.len())
        .filter(|&pos| scene.is_visible(entries[pos]))
        .collect();
    let Some(&head) = visible.first() else {
        return Vec::new();
    };
    let limit = u16::from(entries[head].y) + scene.config.interval();
    let competes = |entry: Entry| {
        entry.deferred && (u16::from(entry.y) <= limit || blank_only(scene, entry))
    };

    let mut picks: Vec<usize> = visible
        .iter()
        .copied()
        .filter(|&pos| competes(entries[pos]))
        .take(CHANNELS)
        .collect();
    for pos in visible {
        if picks.len() == CHANNELS {
            break;
        }
        if !picks.contains(&pos) {
            picks.push(pos);
        }
    }
    picks
}

/// The kernel can never reach `entry` mid-frame: it starts before the first
/// in-kernel selection could show it, or its column is out of reach.
fn blank_only(scene: &Scene<'_>, entry: Entry) -> bool {
    let first_reach = u16::from(scene.config.y_offset) + 2 * BAND_LINES;
    u16::from(entry.y) < first_reach
        || scene
            .registry
            .get(entry.id)
            .ok()
            .is_none_or(|sprite| IN_KERNEL.positioning_for(sprite.x).is_none())
}
