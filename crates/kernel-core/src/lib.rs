//! Core traits and types for cycle-budgeted display kernels.
//!
//! Time is counted in CPU cycles. A display kernel spends a fixed number of
//! cycles per scanline; everything it does is charged against that budget.

mod bus;
mod cycles;
mod observable;
mod tickable;

pub use bus::Bus;
pub use cycles::Cycles;
pub use observable::{Observable, Value};
pub use tickable::Tickable;
