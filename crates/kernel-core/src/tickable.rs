//! Trait for components that advance with CPU cycles.

use crate::Cycles;

/// A component that can be advanced by CPU cycles.
///
/// The kernel charges every operation against its cycle budget and advances
/// the hardware model by the same amount before issuing the next access, so
/// register writes land on the cycle a real kernel would produce them.
pub trait Tickable {
    /// Advance by one CPU cycle.
    fn tick(&mut self);

    /// Advance by `count` cycles.
    ///
    /// Default implementation calls `tick()` in a loop. Implementations may
    /// override for efficiency, but must produce identical results.
    fn tick_n(&mut self, count: Cycles) {
        for _ in 0..count.get() {
            self.tick();
        }
    }
}
