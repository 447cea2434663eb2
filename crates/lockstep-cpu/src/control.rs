//! Control unit: the top-level sequencer.
//!
//! The control unit owns the program counter, the instruction latches and
//! the flags. Each tick it reads the fetcher's view and the register-file
//! ports, and produces its successor together with the commands the fetcher
//! and register file act on at the same boundary.
//!
//! ```text
//!            +--------------------------+
//!            v                          |
//!  Decode --(two-word)--> Decode2 --> Execute --(LOAD)--> LoadWait
//!    |  ^                               |                    |
//!    |  +-------------(retire)----------+--------------------+
//!    +--(invalid)--> Fetch (halted until reset)
//! ```

use lockstep_core::Ticks;
use log::{debug, trace, warn};

use crate::alu;
use crate::config::CpuConfig;
use crate::decode::{Decoded, Decoder, Operation};
use crate::ea::effective_address;
use crate::fetcher::{BusRequest, FetchCommand, FetchView};
use crate::flags::Status;
use crate::registers::RegWrite;
use crate::trap::Trap;

/// The program counter addresses halfwords with 31 significant bits.
pub const PC_MASK: u32 = 0x7FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlState {
    #[default]
    Decode,
    Decode2,
    Execute,
    LoadWait,
    /// Terminal: entered on a trap, left only by reset.
    Fetch,
}

impl ControlState {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Decode2 => "decode2",
            Self::Execute => "execute",
            Self::LoadWait => "load-wait",
            Self::Fetch => "fetch",
        }
    }
}

/// A retired STORE waiting for the next decode to put it on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingStore {
    /// Word address.
    pub address: u32,
    pub data: u32,
    /// Base-register update from an auto-modifying mode.
    pub writeback: Option<RegWrite>,
}

/// Commands produced alongside the successor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlOutputs {
    pub fetch: FetchCommand,
    /// Register indices to latch on the read ports.
    pub read_ports: Option<[u8; 2]>,
    pub write: Option<RegWrite>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlCounters {
    /// Every tick since reset.
    pub cycles: Ticks,
    /// Instructions retired (extended counters only).
    pub retired: Ticks,
    /// Ticks spent waiting for an instruction half, first or second.
    pub fetch_stalls: Ticks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlUnit {
    state: ControlState,
    pc: u32,
    lower: u16,
    upper: u16,
    pending_store: Option<PendingStore>,
    flags: Status,
    trap: Option<Trap>,
    decoder: Decoder,
    extended_counters: bool,
    counters: ControlCounters,
}

impl ControlUnit {
    #[must_use]
    pub const fn new(config: &CpuConfig) -> Self {
        Self {
            state: ControlState::Decode,
            pc: 0,
            lower: 0,
            upper: 0,
            pending_store: None,
            flags: Status(0),
            trap: None,
            decoder: Decoder::new(config.decoder),
            extended_counters: config.extended_counters,
            counters: ControlCounters {
                cycles: Ticks::ZERO,
                retired: Ticks::ZERO,
                fetch_stalls: Ticks::ZERO,
            },
        }
    }

    /// Clear all state and start decoding at halfword `entry`.
    pub fn reset_to(&mut self, entry: u32) {
        *self = Self {
            pc: entry & PC_MASK,
            decoder: self.decoder,
            extended_counters: self.extended_counters,
            ..Self::default()
        };
    }

    #[must_use]
    pub const fn state(&self) -> ControlState {
        self.state
    }

    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    #[must_use]
    pub const fn flags(&self) -> Status {
        self.flags
    }

    pub fn set_flags(&mut self, flags: Status) {
        self.flags = flags;
    }

    #[must_use]
    pub const fn trap(&self) -> Option<Trap> {
        self.trap
    }

    #[must_use]
    pub const fn pending_store(&self) -> Option<PendingStore> {
        self.pending_store
    }

    #[must_use]
    pub const fn counters(&self) -> ControlCounters {
        self.counters
    }

    #[must_use]
    pub const fn is_halted(&self) -> bool {
        matches!(self.state, ControlState::Fetch)
    }

    /// Successor state and outputs for one tick.
    ///
    /// `fetch` and `ports` are the fetcher and register-file outputs at the
    /// start of the tick.
    #[must_use]
    pub fn transition(&self, fetch: &FetchView, ports: [u32; 2]) -> (Self, ControlOutputs) {
        let mut next = *self;
        let mut out = ControlOutputs::default();
        next.counters.cycles = self.counters.cycles.next();

        match self.state {
            ControlState::Decode => next.decode(fetch, &mut out),
            ControlState::Decode2 => {
                if fetch.available > 0 {
                    next.upper = fetch.instruction;
                    out.fetch.advance = true;
                    next.state = ControlState::Execute;
                } else {
                    next.counters.fetch_stalls = self.counters.fetch_stalls.next();
                }
            }
            ControlState::Execute => next.execute(ports, &mut out),
            ControlState::LoadWait => {
                if let Some(data) = fetch.read_data {
                    let decoded = self.decoder.decode(self.lower);
                    out.write = Some(RegWrite::new(decoded.reg_a, data));
                    next.retire(&decoded);
                }
            }
            ControlState::Fetch => {}
        }

        if next.state != self.state {
            trace!(
                "pc {:#010X}: {} -> {}",
                self.pc,
                self.state.name(),
                next.state.name()
            );
        }
        (next, out)
    }

    fn decode(&mut self, fetch: &FetchView, out: &mut ControlOutputs) {
        if fetch.available == 0 {
            self.counters.fetch_stalls = self.counters.fetch_stalls.next();
            return;
        }
        if self.pending_store.is_some() && fetch.busy {
            return;
        }

        if let Some(store) = self.pending_store.take() {
            out.fetch.request = Some(BusRequest::write(store.address, store.data));
            out.write = store.writeback;
        }

        self.lower = fetch.instruction;
        self.upper = 0;
        let decoded = self.decoder.decode(fetch.instruction);
        out.fetch.advance = true;
        out.read_ports = Some([decoded.reg_a, decoded.reg_b]);

        match decoded.operation() {
            Err(trap) => self.raise(trap),
            Ok(_) if decoded.fetch_second => self.state = ControlState::Decode2,
            Ok(_) => self.state = ControlState::Execute,
        }
    }

    fn execute(&mut self, ports: [u32; 2], out: &mut ControlOutputs) {
        let decoded = self.decoder.decode(self.lower);
        let [a, b] = ports;
        let second = decoded.fetch_second.then_some(self.upper);

        let operation = match decoded.operation() {
            Ok(operation) => operation,
            Err(trap) => return self.raise(trap),
        };

        match operation {
            Operation::Alu(op) => {
                let result = alu::execute(a, b, self.flags.carry(), op);
                self.flags = Status::from_alu(&result);
                out.write = Some(RegWrite::new(decoded.reg_a, result.result));
                self.retire(&decoded);
            }
            Operation::Load => match effective_address(&decoded, b, second) {
                Ok(ea) => {
                    out.fetch.request = Some(BusRequest::read(ea.word_address()));
                    out.write = ea.writeback.map(|v| RegWrite::new(decoded.reg_b, v));
                    self.state = ControlState::LoadWait;
                }
                Err(trap) => self.raise(trap),
            },
            Operation::Store => match effective_address(&decoded, b, second) {
                Ok(ea) => {
                    self.pending_store = Some(PendingStore {
                        address: ea.word_address(),
                        data: a,
                        writeback: ea.writeback.map(|v| RegWrite::new(decoded.reg_b, v)),
                    });
                    self.retire(&decoded);
                }
                Err(trap) => self.raise(trap),
            },
        }
    }

    fn retire(&mut self, decoded: &Decoded) {
        debug!("retire {:#010X}: {decoded}", self.pc);
        let length = 1 + u32::from(decoded.fetch_second);
        self.pc = self.pc.wrapping_add(length) & PC_MASK;
        self.counters.retired = self.counters.retired.bump_if(self.extended_counters);
        self.state = ControlState::Decode;
    }

    fn raise(&mut self, trap: Trap) {
        warn!("trap at pc {:#010X} ({:#06X}): {trap}", self.pc, self.lower);
        self.trap = Some(trap);
        self.state = ControlState::Fetch;
    }
}
