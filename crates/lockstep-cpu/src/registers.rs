//! Register file and register snapshot.

use crate::flags::Status;

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 16;

/// One write-port transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegWrite {
    pub index: u8,
    pub value: u32,
}

impl RegWrite {
    #[must_use]
    pub const fn new(index: u8, value: u32) -> Self {
        Self { index, value }
    }
}

/// Sixteen 32-bit registers with two read ports and one write port.
///
/// Read ports are registered: an address presented during a tick is latched
/// at the boundary, and the port shows `regs[latched]` from the next tick on.
/// A write lands at the boundary too, so a read in the same tick sees the old
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterFile {
    regs: [u32; REGISTER_COUNT],
    read_addr: [u8; 2],
}

impl RegisterFile {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            regs: [0; REGISTER_COUNT],
            read_addr: [0; 2],
        }
    }

    /// Port outputs for this tick.
    #[must_use]
    pub fn read_ports(&self) -> [u32; 2] {
        self.read_addr.map(|index| self.get(index))
    }

    #[must_use]
    pub fn get(&self, index: u8) -> u32 {
        self.regs[usize::from(index) % REGISTER_COUNT]
    }

    /// Write outside the tick flow (test setup, host presets).
    pub fn set(&mut self, index: u8, value: u32) {
        self.regs[usize::from(index) % REGISTER_COUNT] = value;
    }

    #[must_use]
    pub const fn values(&self) -> [u32; REGISTER_COUNT] {
        self.regs
    }

    /// Successor state: latch new read addresses and apply the write.
    #[must_use]
    pub fn evaluate(&self, read: Option<[u8; 2]>, write: Option<RegWrite>) -> Self {
        let mut next = *self;
        if let Some(read) = read {
            next.read_addr = read;
        }
        if let Some(RegWrite { index, value }) = write {
            next.set(index, value);
        }
        next
    }
}

/// Architectural register snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers {
    /// General-purpose registers.
    pub r: [u32; REGISTER_COUNT],
    /// Halfword program counter.
    pub pc: u32,
    pub flags: Status,
}
