//! CPU core trait.

use crate::{Memory, Ticks};

/// A CPU core.
///
/// The memory is passed in, not owned, so test fixtures and hosts can inspect
/// it between ticks and swap in latency models freely.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Advance the CPU by one tick: evaluate every component against
    /// start-of-tick state, then commit all of them at once.
    fn tick<M: Memory>(&mut self, memory: &mut M);

    /// Returns the current program counter.
    fn pc(&self) -> u32;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true once the CPU has stopped making progress for good.
    fn is_halted(&self) -> bool;

    /// Ticks elapsed since reset.
    fn cycles(&self) -> Ticks;

    /// Reset the CPU to its initial state.
    fn reset(&mut self);
}
