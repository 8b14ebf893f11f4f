//! Cycle cost model.
//!
//! Every kernel operation declares its worst-case cost in CPU cycles. The
//! kernel charges these costs through a [`LineClock`], which also advances
//! the hardware model so each register access lands on the cycle a real
//! kernel would produce it. A band is two lines:
//!
//! - Line A (control): fine motion + `HMOVE` if a strobe happened last band
//!   (or, on the first band, the store that ends vertical blank), draw both
//!   channels, playfield, end-of-extent checks, at most one collision
//!   sample, releases.
//! - Line B (allocation): draw both channels, then either one selection or
//!   one repositioning strobe, never both.
//!
//! [`ControlLine`] and [`AllocationLine`] describe every shape a line can
//! take; `worst_case_line` folds over all of them.

use atari_tia::regs;
use kernel_core::{Bus, Cycles, Tickable};
use tracing::error;

/// CPU cycles per scanline.
pub const LINE_CYCLES: Cycles = Cycles::new(atari_tia::LINE_CYCLES);

/// Lookahead steps and served-entry skips allowed in one selection.
pub const LOOKAHEAD_LIMIT: u8 = 3;

/// Entries one selection may defer or skip before giving up for the band.
pub const MAX_PASSES_PER_SELECTION: u8 = 2;

/// Longest busy-wait the in-kernel repositioning line can afford.
pub const IN_KERNEL_MAX_WAIT: u8 = 9;

/// Longest busy-wait on a dedicated blanking line.
pub const BLANKING_MAX_WAIT: u8 = 13;

/// A kernel operation with a fixed worst-case cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `sta WSYNC`.
    Wsync,
    /// Write both HMPx registers.
    FineMotion,
    Hmove,
    /// Graphics and colour for one channel (blank path padded to match).
    Draw,
    /// PF0-PF2 for the band.
    Playfield,
    /// Compare one channel's extent end against the scan pointer.
    EndCheck,
    /// Read both player latches and CXPPMM, accumulate, CXCLR.
    CollisionSample,
    /// Return one channel to unallocated and fold its collisions back.
    Release,
    /// Load the head candidate and test reachability.
    Select,
    /// Inspect one entry past the head, or skip a served one.
    LookaheadStep,
    /// Mark one entry deferred (or pass an off-screen one) and advance.
    Defer,
    /// Bind a channel: pointers, extent, NUSIZx and REFPx.
    Allocate,
    /// Fetch wait count and fine motion from the positioning table.
    RepositionSetup,
    /// Busy-wait of `n` five-cycle iterations.
    Wait(u8),
    /// Loop exit plus `sta RESPx`.
    Strobe,
    /// `lda #imm / sta`, for frame setup outside the band loop.
    Store,
}

impl Op {
    #[must_use]
    pub const fn cost(self) -> Cycles {
        Cycles::new(match self {
            Op::Wsync | Op::Hmove | Op::Release | Op::LookaheadStep => 3,
            Op::EndCheck | Op::Defer | Op::RepositionSetup | Op::Strobe => 4,
            Op::Store => 5,
            Op::FineMotion => 6,
            Op::Allocate => 8,
            Op::Playfield | Op::Select => 9,
            Op::Draw => 10,
            Op::CollisionSample => 18,
            Op::Wait(n) => 5 * n as u16,
        })
    }
}

/// Cycle within the line at which the in-kernel busy-wait starts.
pub const IN_KERNEL_WAIT_START: Cycles = Op::Draw.cost().times(2).plus(Op::RepositionSetup.cost());

/// Cycle within a blanking line at which the busy-wait starts.
pub const BLANKING_WAIT_START: Cycles = Op::RepositionSetup.cost();

/// Shape of a band's first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlLine {
    /// First band of the frame: `VBLANK` is cleared before anything else.
    pub enable_output: bool,
    /// A strobe happened on the previous line, so fine motion is applied.
    pub hmove: bool,
    /// Channels whose extent ended (0-2).
    pub releases: u8,
}

impl ControlLine {
    #[must_use]
    pub const fn cost(self) -> Cycles {
        let mut total = Op::Draw.cost().times(2).plus(Op::Playfield.cost());
        total = total.plus(Op::EndCheck.cost().times(2));
        if self.enable_output {
            total = total.plus(Op::Store.cost());
        }
        if self.hmove {
            total = total.plus(Op::FineMotion.cost()).plus(Op::Hmove.cost());
        }
        if self.releases > 0 {
            total = total
                .plus(Op::CollisionSample.cost())
                .plus(Op::Release.cost().times(self.releases as u16));
        }
        total.plus(Op::Wsync.cost())
    }
}

/// Shape of a band's second line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationLine {
    Idle,
    Select {
        lookahead: u8,
        passes: u8,
        allocate: bool,
    },
    Reposition {
        wait: u8,
    },
}

impl AllocationLine {
    #[must_use]
    pub const fn cost(self) -> Cycles {
        let draws = Op::Draw.cost().times(2);
        let work = match self {
            AllocationLine::Idle => Cycles::ZERO,
            AllocationLine::Select {
                lookahead,
                passes,
                allocate,
            } => {
                let mut total = Op::Select.cost()
                    .plus(Op::LookaheadStep.cost().times(lookahead as u16))
                    .plus(Op::Defer.cost().times(passes as u16));
                if allocate {
                    total = total.plus(Op::Allocate.cost());
                }
                total
            }
            AllocationLine::Reposition { wait } => Op::RepositionSetup
                .cost()
                .plus(Op::Wait(wait).cost())
                .plus(Op::Strobe.cost()),
        };
        draws.plus(work).plus(Op::Wsync.cost())
    }
}

/// Cost of one dedicated positioning line during blanking.
#[must_use]
pub const fn blanking_line_cost(wait: u8) -> Cycles {
    Op::RepositionSetup
        .cost()
        .plus(Op::Wait(wait).cost())
        .plus(Op::Strobe.cost())
        .plus(Op::Wsync.cost())
}

/// Every control line shape. The first band never follows a strobe.
pub fn control_lines() -> impl Iterator<Item = ControlLine> {
    [(false, false), (false, true), (true, false)]
        .into_iter()
        .flat_map(|(enable_output, hmove)| {
            (0..=2).map(move |releases| ControlLine {
                enable_output,
                hmove,
                releases,
            })
        })
}

/// Every allocation line shape the kernel can produce.
pub fn allocation_lines() -> impl Iterator<Item = AllocationLine> {
    let selects = (0..=LOOKAHEAD_LIMIT).flat_map(|lookahead| {
        (0..=MAX_PASSES_PER_SELECTION).flat_map(move |passes| {
            [false, true].into_iter().map(move |allocate| AllocationLine::Select {
                lookahead,
                passes,
                allocate,
            })
        })
    });
    let repositions = (0..=IN_KERNEL_MAX_WAIT).map(|wait| AllocationLine::Reposition { wait });
    std::iter::once(AllocationLine::Idle)
        .chain(selects)
        .chain(repositions)
}

/// Most expensive line the kernel can emit.
#[must_use]
pub fn worst_case_line() -> Cycles {
    let control = control_lines().map(ControlLine::cost).max();
    let allocation = allocation_lines().map(AllocationLine::cost).max();
    control.max(allocation).unwrap_or(Cycles::ZERO)
}

/// Charges operations against the current line and keeps the bus in step.
///
/// Accesses made by an operation happen on its last cycle, so a store that
/// completes at cycle `n` of the line is seen by the bus at cycle `n - 1`
/// counting from zero.
#[derive(Debug, Clone, Default)]
pub struct LineClock {
    spent: Cycles,
    worst: Cycles,
    overruns: u32,
}

impl LineClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cycles spent on the current line so far.
    #[must_use]
    pub fn spent(&self) -> Cycles {
        self.spent
    }

    /// Most expensive completed line.
    #[must_use]
    pub fn worst(&self) -> Cycles {
        self.worst
    }

    /// Lines that exceeded `LINE_CYCLES`.
    #[must_use]
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Spend `op` with no bus access.
    pub fn idle<B: Tickable>(&mut self, bus: &mut B, op: Op) {
        let cost = op.cost();
        bus.tick_n(cost);
        self.spent += cost;
    }

    /// Spend `op`, performing `access` on its final cycle.
    pub fn access<B: Tickable, R>(
        &mut self,
        bus: &mut B,
        op: Op,
        access: impl FnOnce(&mut B) -> R,
    ) -> R {
        let cost = op.cost();
        if cost == Cycles::ZERO {
            return access(bus);
        }
        bus.tick_n(Cycles::new(cost.get() - 1));
        let result = access(bus);
        bus.tick();
        self.spent += cost;
        result
    }

    /// Finish the line with `WSYNC`. Returns what the line cost.
    pub fn wsync<B: Bus + Tickable>(&mut self, bus: &mut B) -> Cycles {
        let cost = Op::Wsync.cost();
        bus.tick_n(Cycles::new(cost.get() - 1));
        bus.write(regs::WSYNC, 0);
        let line = self.spent + cost;
        if !line.fits_within(LINE_CYCLES) {
            self.overruns += 1;
            error!(cycles = line.get(), "scanline exceeded its cycle budget");
        }
        self.worst = self.worst.max(line);
        self.spent = Cycles::ZERO;
        line
    }
}
