//! Overlap estimation.
//!
//! For each sprite, count how many sprites after it in Y-order start within
//! one interval of its own `y`. Those are the sprites it competes with for
//! the two channels. The count bounds how far the kernel may look past a
//! sprite for a deferred neighbour, so a sprite with no competitors is never
//! skipped in favour of another.
//!
//! This is a batch pass, run in blanking at whatever cadence the game picks.
//! Counts go stale as sprites move; that only affects fairness, not picture
//! correctness.

use crate::registry::Registry;
use crate::yorder::{Entry, YOrder};

/// Overlap count for each position of a sorted index.
#[must_use]
pub fn overlap_counts(entries: &[Entry], interval: u16) -> Vec<u8> {
    entries
        .iter()
        .enumerate()
        .map(|(p, entry)| {
            let limit = u16::from(entry.y) + interval;
            let count = entries[p + 1..]
                .iter()
                .take_while(|next| u16::from(next.y) <= limit)
                .count();
            u8::try_from(count).unwrap_or(u8::MAX)
        })
        .collect()
}

/// Store fresh overlap counts on every live sprite.
pub(crate) fn recompute(index: &YOrder, registry: &mut Registry, interval: u16) {
    let counts = overlap_counts(index.entries(), interval);
    for (entry, count) in index.entries().iter().zip(counts) {
        if let Ok(live) = registry.live_mut(entry.id) {
            live.overlap = count;
        }
    }
}
