//! External memory bus with a request/acknowledge handshake.
//!
//! The requester drives [`BusSignals`] from registered state, so the memory
//! sees them at the start of a tick. The memory answers in the same tick with
//! a [`BusResponse`]. A transfer completes on the tick `ack` is high while the
//! request is still asserted:
//!
//! ```text
//! tick     0        1        2
//! read_en  ___/‾‾‾‾‾‾‾‾‾‾‾‾‾\___
//! address  ---< A          >---
//! ack      ____________/‾‾‾\___
//! data_in  ------------< D >---
//! ```
//!
//! The requester holds address and direction stable until `ack`. Dropping the
//! enable before `ack` withdraws the request; the memory treats it as never
//! issued. Reads and writes are never asserted together.

/// Mask for the 30-bit word address carried on the bus.
pub const WORD_ADDRESS_MASK: u32 = 0x3FFF_FFFF;

/// Requester-driven bus signals for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusSignals {
    /// Request a read at `address`.
    pub read_enable: bool,
    /// Request a write of `data_out` at `address`.
    pub write_enable: bool,
    /// 30-bit word address.
    pub address: u32,
    /// Write payload.
    pub data_out: u32,
}

impl BusSignals {
    /// No transfer requested.
    pub const IDLE: Self = Self {
        read_enable: false,
        write_enable: false,
        address: 0,
        data_out: 0,
    };

    /// Read request at a word address.
    #[must_use]
    pub const fn read(address: u32) -> Self {
        Self {
            read_enable: true,
            write_enable: false,
            address: address & WORD_ADDRESS_MASK,
            data_out: 0,
        }
    }

    /// Write request at a word address.
    #[must_use]
    pub const fn write(address: u32, data: u32) -> Self {
        Self {
            read_enable: false,
            write_enable: true,
            address: address & WORD_ADDRESS_MASK,
            data_out: data,
        }
    }

    /// True when either direction is requested.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.read_enable || self.write_enable
    }
}

/// Memory-driven bus signals for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusResponse {
    /// The requested transfer completes this tick.
    pub ack: bool,
    /// Read payload, meaningful only with `ack`.
    pub data_in: u32,
}

impl BusResponse {
    /// Not ready (or nothing requested).
    pub const WAIT: Self = Self {
        ack: false,
        data_in: 0,
    };

    /// Acknowledge a read with its data.
    #[must_use]
    pub const fn ready(data: u32) -> Self {
        Self {
            ack: true,
            data_in: data,
        }
    }

    /// Acknowledge a write.
    #[must_use]
    pub const fn written() -> Self {
        Self {
            ack: true,
            data_in: 0,
        }
    }
}

/// An external memory on the handshake bus.
///
/// Split in two like every other component: [`respond`](Memory::respond) is
/// the combinational phase and must not change state; [`clock`](Memory::clock)
/// is the commit phase and receives the same signals plus the response that
/// was given for them.
pub trait Memory {
    /// Answer the requester's signals for this tick.
    fn respond(&self, signals: &BusSignals) -> BusResponse;

    /// Commit this tick: apply acknowledged writes, advance latency counters.
    fn clock(&mut self, signals: &BusSignals, response: &BusResponse);
}
