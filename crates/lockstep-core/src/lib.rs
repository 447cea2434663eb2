//! Core traits and types for two-phase synchronous simulation.
//!
//! Everything advances in ticks. Each tick has a combinational phase, where
//! every component's outputs are pure functions of start-of-tick state, and a
//! commit phase, where all staged state replaces the current state at once.
//! No component ever observes another's update within the same tick.

mod bus;
mod cpu;
mod observable;
mod staged;
mod ticks;

pub use bus::{BusResponse, BusSignals, Memory, WORD_ADDRESS_MASK};
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use staged::Staged;
pub use ticks::Ticks;
