//! Instruction prefetch unit and bus master.
//!
//! The fetcher owns the external bus. When idle it fills a 4-word circular
//! buffer ahead of the control unit; explicit loads and stores take priority
//! and suspend prefetching until they complete.
//!
//! The buffer holds 8 halves. `write_pos` counts words (mod 4), `read_pos`
//! counts halves (mod 8) and `available` is the number of unread halves. A
//! prefetch is only issued while `available < 7`, which leaves room for the
//! two halves it returns even if nothing is consumed in between.

use lockstep_core::{BusResponse, BusSignals, Ticks, WORD_ADDRESS_MASK};
use log::{debug, trace};

/// Words in the circular buffer.
pub const BUFFER_WORDS: usize = 4;
/// Halves in the circular buffer.
pub const BUFFER_HALVES: u8 = 8;
/// Prefetch is issued only below this many available halves.
pub const PREFETCH_LIMIT: u8 = 7;

/// Bus-master state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    /// Autonomous prefetch.
    #[default]
    IFetch,
    /// Explicit read in flight.
    Read,
    /// Explicit write in flight.
    Write,
}

impl FetchState {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IFetch => "ifetch",
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// Explicit transfer requested by the control unit. Addresses are word
/// addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusRequest {
    Read { address: u32 },
    Write { address: u32, data: u32 },
}

impl BusRequest {
    #[must_use]
    pub const fn read(address: u32) -> Self {
        Self::Read { address }
    }

    #[must_use]
    pub const fn write(address: u32, data: u32) -> Self {
        Self::Write { address, data }
    }

    const fn signals(self) -> BusSignals {
        match self {
            Self::Read { address } => BusSignals::read(address),
            Self::Write { address, data } => BusSignals::write(address, data),
        }
    }

    const fn state(self) -> FetchState {
        match self {
            Self::Read { .. } => FetchState::Read,
            Self::Write { .. } => FetchState::Write,
        }
    }
}

/// Control unit inputs for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchCommand {
    /// Consume the half at the read cursor.
    pub advance: bool,
    pub request: Option<BusRequest>,
}

/// What the control unit sees of the fetcher during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchView {
    pub available: u8,
    /// Half at the read cursor, meaningful only when `available > 0`.
    pub instruction: u16,
    /// An explicit write is in flight or queued.
    pub busy: bool,
    /// Data of an explicit read acknowledged on the previous tick.
    pub read_data: Option<u32>,
}

/// Fetcher event counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchCounters {
    /// Prefetch words written into the buffer.
    pub fills: Ticks,
    /// Explicit reads completed.
    pub reads: Ticks,
    /// Explicit writes completed.
    pub writes: Ticks,
    /// Ticks in which prefetch was held off by a full buffer or an explicit
    /// transfer.
    pub prefetch_blocked: Ticks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fetcher {
    state: FetchState,
    buffer: [u32; BUFFER_WORDS],
    write_pos: u8,
    read_pos: u8,
    available: u8,
    /// Word address of the next prefetch.
    prefetch_addr: u32,
    /// Registered bus outputs.
    bus: BusSignals,
    /// Explicit request waiting behind the one in flight.
    queued: Option<BusRequest>,
    read_data: Option<u32>,
    /// Reset landed on an odd halfword: the first fill only delivers the
    /// high half.
    skip_low_half: bool,
    extended_counters: bool,
    counters: FetchCounters,
}

impl Fetcher {
    #[must_use]
    pub fn new(extended_counters: bool) -> Self {
        Self {
            extended_counters,
            ..Self::default()
        }
    }

    /// Empty the buffer and restart prefetching at halfword `entry`.
    pub fn reset_to(&mut self, entry: u32) {
        let odd = entry & 1 != 0;
        *self = Self {
            prefetch_addr: (entry >> 1) & WORD_ADDRESS_MASK,
            read_pos: u8::from(odd),
            skip_low_half: odd,
            ..Self::new(self.extended_counters)
        };
    }

    #[must_use]
    pub const fn state(&self) -> FetchState {
        self.state
    }

    #[must_use]
    pub const fn available(&self) -> u8 {
        self.available
    }

    #[must_use]
    pub const fn bus_signals(&self) -> BusSignals {
        self.bus
    }

    #[must_use]
    pub const fn prefetch_address(&self) -> u32 {
        self.prefetch_addr
    }

    #[must_use]
    pub const fn counters(&self) -> FetchCounters {
        self.counters
    }

    /// Half at the read cursor, low half of each word first.
    #[must_use]
    pub fn instruction_at_cursor(&self) -> u16 {
        let word = self.buffer[usize::from(self.read_pos / 2)];
        (word >> (16 * u32::from(self.read_pos % 2))) as u16
    }

    /// An explicit write is in flight or queued.
    #[must_use]
    pub fn busy(&self) -> bool {
        self.state == FetchState::Write || matches!(self.queued, Some(BusRequest::Write { .. }))
    }

    #[must_use]
    pub const fn read_data(&self) -> Option<u32> {
        self.read_data
    }

    #[must_use]
    pub fn view(&self) -> FetchView {
        FetchView {
            available: self.available,
            instruction: self.instruction_at_cursor(),
            busy: self.busy(),
            read_data: self.read_data,
        }
    }

    /// Successor state for one tick, given the control unit's command and the
    /// memory's answer to this tick's bus signals.
    #[must_use]
    pub fn evaluate(&self, cmd: &FetchCommand, response: &BusResponse) -> Self {
        let mut next = *self;
        next.read_data = None;

        if cmd.advance && self.available > 0 {
            next.available -= 1;
            next.read_pos = (self.read_pos + 1) % BUFFER_HALVES;
        }

        match self.state {
            FetchState::IFetch => {
                // A queued request goes first; a new one takes its place.
                let request = self.queued.or(cmd.request);
                next.queued = self.queued.and(cmd.request);
                next.prefetch(self, request, response);
            }
            FetchState::Read | FetchState::Write => {
                debug_assert!(
                    self.queued.is_none() || cmd.request.is_none(),
                    "explicit request queue overflow"
                );
                next.queued = self.queued.or(cmd.request);
                next.transfer(self, response);
            }
        }

        next
    }

    fn prefetch(&mut self, prev: &Self, request: Option<BusRequest>, response: &BusResponse) {
        let outstanding = prev.bus.read_enable;
        let filled = outstanding && response.ack;

        if filled {
            let gained = if prev.skip_low_half { 1 } else { 2 };
            debug_assert!(
                self.available + gained <= BUFFER_HALVES,
                "instruction buffer overrun"
            );
            self.buffer[usize::from(prev.write_pos)] = response.data_in;
            self.write_pos = (prev.write_pos + 1) % BUFFER_WORDS as u8;
            self.available += gained;
            self.prefetch_addr = (prev.prefetch_addr + 1) & WORD_ADDRESS_MASK;
            self.skip_low_half = false;
            self.bus = BusSignals::IDLE;
            self.counters.fills = self.counters.fills.next();
            trace!(
                "prefetch ack @{:#010X}: {:#010X}, {} available",
                prev.prefetch_addr,
                response.data_in,
                self.available
            );
        }

        // The enable drops for at least one tick after every ack, so a new
        // prefetch is only issued from an idle bus.
        let blocked = if let Some(request) = request {
            if outstanding && !filled {
                trace!("prefetch @{:#010X} withdrawn", prev.prefetch_addr);
            }
            self.begin(request);
            true
        } else if !outstanding && prev.available < PREFETCH_LIMIT {
            self.bus = BusSignals::read(prev.prefetch_addr);
            trace!("prefetch issue @{:#010X}", prev.prefetch_addr);
            false
        } else {
            !outstanding
        };

        self.counters.prefetch_blocked = self
            .counters
            .prefetch_blocked
            .bump_if(self.extended_counters && blocked);
    }

    fn begin(&mut self, request: BusRequest) {
        debug!("explicit {request:?}");
        self.state = request.state();
        self.bus = request.signals();
    }

    fn transfer(&mut self, prev: &Self, response: &BusResponse) {
        let ext = self.extended_counters;
        self.counters.prefetch_blocked = self.counters.prefetch_blocked.bump_if(ext);
        if !response.ack {
            return;
        }

        match prev.state {
            FetchState::Read => {
                self.read_data = Some(response.data_in);
                self.counters.reads = self.counters.reads.bump_if(ext);
                debug!(
                    "explicit read @{:#010X} -> {:#010X}",
                    prev.bus.address, response.data_in
                );
            }
            FetchState::Write => {
                self.counters.writes = self.counters.writes.bump_if(ext);
                debug!(
                    "explicit write @{:#010X} <- {:#010X}",
                    prev.bus.address, prev.bus.data_out
                );
            }
            FetchState::IFetch => {}
        }
        self.state = FetchState::IFetch;
        self.bus = BusSignals::IDLE;
    }
}
