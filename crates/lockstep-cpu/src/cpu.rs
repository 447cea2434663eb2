//! The assembled processor: control unit, fetcher and register file stepped
//! in lockstep against an external memory.

use lockstep_core::{Cpu, Memory, Observable, Staged, Ticks, Value};
use log::info;

use crate::config::{ConfigError, CpuConfig};
use crate::control::{ControlCounters, ControlUnit};
use crate::fetcher::{FetchCounters, FetchState, Fetcher};
use crate::flags::{C, N, V, Z};
use crate::registers::{RegisterFile, Registers};
use crate::trap::Trap;

/// All diagnostic counters in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub cycles: Ticks,
    pub retired: Ticks,
    pub fetch_stalls: Ticks,
    pub fills: Ticks,
    pub reads: Ticks,
    pub writes: Ticks,
    pub prefetch_blocked: Ticks,
}

impl Counters {
    fn gather(control: ControlCounters, fetch: FetchCounters) -> Self {
        Self {
            cycles: control.cycles,
            retired: control.retired,
            fetch_stalls: control.fetch_stalls,
            fills: fetch.fills,
            reads: fetch.reads,
            writes: fetch.writes,
            prefetch_blocked: fetch.prefetch_blocked,
        }
    }
}

/// Why a run loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The control unit trapped.
    Halted(Trap),
    /// The tick budget ran out.
    BudgetExhausted,
}

/// The processor.
///
/// Every stateful component is double-buffered. A tick evaluates all of them
/// against start-of-tick state, stages the results, clocks the memory and
/// then commits everything together.
#[derive(Debug, Clone)]
pub struct LockstepCpu {
    control: Staged<ControlUnit>,
    fetcher: Staged<Fetcher>,
    registers: Staged<RegisterFile>,
    config: CpuConfig,
}

impl Default for LockstepCpu {
    fn default() -> Self {
        Self::new()
    }
}

impl LockstepCpu {
    /// Processor with the default configuration, reset to address 0.
    #[must_use]
    pub fn new() -> Self {
        Self::build(CpuConfig::default())
    }

    pub fn with_config(config: CpuConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: CpuConfig) -> Self {
        Self {
            control: Staged::new(ControlUnit::new(&config)),
            fetcher: Staged::new(Fetcher::new(config.extended_counters)),
            registers: Staged::new(RegisterFile::new()),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &CpuConfig {
        &self.config
    }

    /// Clear all state and start executing at halfword address `entry`.
    pub fn reset_to(&mut self, entry: u32) {
        self.control.force_mut().reset_to(entry);
        self.fetcher.force_mut().reset_to(entry);
        self.registers.force(RegisterFile::new());
        info!("reset to {entry:#010X}");
    }

    #[must_use]
    pub fn control(&self) -> &ControlUnit {
        self.control.current()
    }

    #[must_use]
    pub fn fetcher(&self) -> &Fetcher {
        self.fetcher.current()
    }

    #[must_use]
    pub fn register(&self, index: u8) -> u32 {
        self.registers.current().get(index)
    }

    /// Set a register outside the tick flow.
    pub fn set_register(&mut self, index: u8, value: u32) {
        self.registers.force_mut().set(index, value);
    }

    /// Set the carry flag outside the tick flow.
    pub fn set_carry(&mut self, carry: bool) {
        let control = self.control.force_mut();
        let mut flags = control.flags();
        flags.set_if(C, carry);
        control.set_flags(flags);
    }

    #[must_use]
    pub fn trap(&self) -> Option<Trap> {
        self.control().trap()
    }

    #[must_use]
    pub fn counters(&self) -> Counters {
        Counters::gather(self.control().counters(), self.fetcher().counters())
    }

    /// No explicit transfer is in flight or queued on the bus.
    #[must_use]
    pub fn bus_settled(&self) -> bool {
        let fetcher = self.fetcher();
        fetcher.state() == FetchState::IFetch && !fetcher.busy()
    }

    /// Tick until the control unit traps or `budget` ticks have elapsed.
    ///
    /// A store retired just before the trap is still let through to memory:
    /// the run only ends as halted once the bus has settled.
    pub fn run<M: Memory>(&mut self, memory: &mut M, budget: u64) -> RunOutcome {
        for _ in 0..budget {
            if let Some(trap) = self.settled_trap() {
                return RunOutcome::Halted(trap);
            }
            self.tick(memory);
        }
        self.settled_trap()
            .map_or(RunOutcome::BudgetExhausted, RunOutcome::Halted)
    }

    fn settled_trap(&self) -> Option<Trap> {
        self.trap().filter(|_| self.bus_settled())
    }

    /// Tick until the program counter moves (one instruction retired) or the
    /// processor halts. Returns the ticks taken, or `None` when `limit` ran
    /// out first.
    pub fn run_until_retired<M: Memory>(&mut self, memory: &mut M, limit: u64) -> Option<u64> {
        let start = self.pc();
        for taken in 1..=limit {
            self.tick(memory);
            if self.pc() != start || self.is_halted() {
                return Some(taken);
            }
        }
        None
    }
}

impl Cpu for LockstepCpu {
    type Registers = Registers;

    fn tick<M: Memory>(&mut self, memory: &mut M) {
        let fetcher = self.fetcher.current();
        let registers = self.registers.current();

        let signals = fetcher.bus_signals();
        let response = memory.respond(&signals);

        let (control, out) = self
            .control
            .current()
            .transition(&fetcher.view(), registers.read_ports());
        let fetcher = fetcher.evaluate(&out.fetch, &response);
        let registers = registers.evaluate(out.read_ports, out.write);

        self.control.stage(control);
        self.fetcher.stage(fetcher);
        self.registers.stage(registers);

        memory.clock(&signals, &response);

        self.control.commit();
        self.fetcher.commit();
        self.registers.commit();
    }

    fn pc(&self) -> u32 {
        self.control().pc()
    }

    fn registers(&self) -> Registers {
        Registers {
            r: self.registers.current().values(),
            pc: self.pc(),
            flags: self.control().flags(),
        }
    }

    fn is_halted(&self) -> bool {
        self.control().is_halted()
    }

    fn cycles(&self) -> Ticks {
        self.control().counters().cycles
    }

    fn reset(&mut self) {
        self.reset_to(0);
    }
}

impl Observable for LockstepCpu {
    fn query(&self, path: &str) -> Option<Value> {
        let control = self.control();
        let fetcher = self.fetcher();
        let flags = control.flags();
        let counters = self.counters();
        match path {
            "pc" => Some(control.pc().into()),
            "flags" => Some(flags.0.into()),
            "flags.c" => Some(flags.is_set(C).into()),
            "flags.z" => Some(flags.is_set(Z).into()),
            "flags.n" => Some(flags.is_set(N).into()),
            "flags.v" => Some(flags.is_set(V).into()),
            "state" => Some(control.state().name().into()),
            "halted" => Some(control.is_halted().into()),
            "trap" => Some(control.trap().map(|t| t.to_string()).into()),
            "fetcher.state" => Some(fetcher.state().name().into()),
            "fetcher.available" => Some(fetcher.available().into()),
            "fetcher.prefetch_address" => Some(fetcher.prefetch_address().into()),
            "fetcher.busy" => Some(fetcher.busy().into()),
            "counters.cycles" => Some(counters.cycles.into()),
            "counters.retired" => Some(counters.retired.into()),
            "counters.fetch_stalls" => Some(counters.fetch_stalls.into()),
            "counters.fills" => Some(counters.fills.into()),
            "counters.reads" => Some(counters.reads.into()),
            "counters.writes" => Some(counters.writes.into()),
            "counters.prefetch_blocked" => Some(counters.prefetch_blocked.into()),
            _ => {
                let index: u8 = path.strip_prefix('r')?.parse().ok()?;
                (usize::from(index) < crate::registers::REGISTER_COUNT)
                    .then(|| self.register(index).into())
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc",
            "r0",
            "r1",
            "r2",
            "r3",
            "r4",
            "r5",
            "r6",
            "r7",
            "r8",
            "r9",
            "r10",
            "r11",
            "r12",
            "r13",
            "r14",
            "r15",
            "flags",
            "flags.c",
            "flags.z",
            "flags.n",
            "flags.v",
            "state",
            "halted",
            "trap",
            "fetcher.state",
            "fetcher.available",
            "fetcher.prefetch_address",
            "fetcher.busy",
            "counters.cycles",
            "counters.retired",
            "counters.fetch_stalls",
            "counters.fills",
            "counters.reads",
            "counters.writes",
            "counters.prefetch_blocked",
        ]
    }
}
