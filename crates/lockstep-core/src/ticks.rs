//! The fundamental unit of time in the simulation.

use std::fmt;

/// A count of synchronous ticks.
///
/// One tick is one combinational evaluation followed by one atomic commit.
/// Counters built on this type only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The count one tick later. Saturates instead of wrapping.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The count one tick later when `event` held, otherwise unchanged.
    #[must_use]
    pub const fn bump_if(self, event: bool) -> Self {
        if event { self.next() } else { self }
    }
}

impl fmt::Display for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
