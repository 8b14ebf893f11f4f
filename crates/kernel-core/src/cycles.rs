//! CPU cycle counts.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};

/// A count of CPU cycles.
///
/// Used both for positions within a scanline and for the declared cost of a
/// kernel operation. Scanline budgets are small, so a `u16` is plenty; sums
/// saturate rather than wrap so an overrun is never hidden by overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cycles(pub u16);

impl Cycles {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u16) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Const-context addition, saturating.
    #[must_use]
    pub const fn plus(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Const-context multiplication by an iteration count, saturating.
    #[must_use]
    pub const fn times(self, count: u16) -> Self {
        Self(self.0.saturating_mul(count))
    }

    /// Cycles left before `budget` is exhausted (zero if already over).
    #[must_use]
    pub const fn remaining_in(self, budget: Self) -> Self {
        Self(budget.0.saturating_sub(self.0))
    }

    /// True if this count fits inside `budget`.
    #[must_use]
    pub const fn fits_within(self, budget: Self) -> bool {
        self.0 <= budget.0
    }
}

impl Add for Cycles {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.plus(rhs)
    }
}

impl AddAssign for Cycles {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.plus(rhs);
    }
}

impl Mul<u16> for Cycles {
    type Output = Self;

    fn mul(self, rhs: u16) -> Self {
        self.times(rhs)
    }
}

impl Sum for Cycles {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Cycles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cycles", self.0)
    }
}
