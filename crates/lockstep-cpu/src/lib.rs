//! Tick-accurate model of a small 32-bit processor.
//!
//! The processor is split the way the hardware is: a combinational ALU and
//! decoder, a prefetching fetcher that masters the memory bus, a register
//! file, and a control unit that sequences them. [`LockstepCpu`] steps all of
//! them together against any [`Memory`](lockstep_core::Memory).
//!
//! ```
//! use lockstep_core::Cpu;
//! use lockstep_cpu::{Instruction, LockstepCpu, SimpleMemory, mode};
//!
//! let mut memory = SimpleMemory::new(64);
//! memory.load_halves(0, &[Instruction::encode(0b0_0000, 0, 1, mode::REGISTER)]);
//!
//! let mut cpu = LockstepCpu::new();
//! cpu.set_register(1, 2);
//! cpu.run_until_retired(&mut memory, 16);
//! assert_eq!(cpu.register(0), 2);
//! ```

pub mod alu;
pub mod config;
pub mod control;
mod cpu;
pub mod decode;
pub mod ea;
pub mod fetcher;
pub mod flags;
pub mod image;
pub mod memory;
pub mod registers;
mod trap;

pub use config::{ConfigError, CpuConfig, DecoderConfig, ModeRange};
pub use cpu::{Counters, LockstepCpu, RunOutcome};
pub use decode::{mode, opcode, Decoded, Decoder, Instruction, ModeClass, Operation};
pub use flags::Status;
pub use image::{ImageError, ProgramImage};
pub use memory::{LatencyMemory, SimpleMemory};
pub use registers::{RegWrite, Registers};
pub use trap::Trap;
