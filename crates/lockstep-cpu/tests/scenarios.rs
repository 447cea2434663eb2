//! End-to-end programs run against the bus fixtures.

use lockstep_core::{BusResponse, BusSignals, Cpu, Memory, Observable, Ticks, Value};
use lockstep_cpu::fetcher::{FetchCommand, FetchState, Fetcher};
use lockstep_cpu::flags::{C, Z};
use lockstep_cpu::{
    mode, opcode, CpuConfig, Instruction, LatencyMemory, LockstepCpu, RunOutcome, SimpleMemory,
    Trap,
};

/// `0xFFFF` decodes as opcode `11111`, which nothing implements.
const HALT: u16 = 0xFFFF;

const ADD: u8 = 0b0_0000;
const ADC: u8 = 0b0_0001;
const SUB: u8 = 0b0_0010;
const MOV: u8 = 0b0_1111;

fn alu(op: u8, a: u8, b: u8) -> u16 {
    Instruction::encode(op, a, b, mode::REGISTER)
}

fn machine(program: &[u16]) -> (LockstepCpu, SimpleMemory) {
    let mut memory = SimpleMemory::new(256);
    memory.load_halves(0, program);
    (LockstepCpu::new(), memory)
}

fn run_to_halt<M: Memory>(cpu: &mut LockstepCpu, memory: &mut M) -> Trap {
    match cpu.run(memory, 1_000) {
        RunOutcome::Halted(trap) => trap,
        RunOutcome::BudgetExhausted => panic!("program did not halt, pc {:#X}", cpu.pc()),
    }
}

#[test]
fn add_register_to_register() {
    let (mut cpu, mut memory) = machine(&[alu(ADD, 0, 1), HALT]);
    cpu.set_register(1, 2);
    assert_eq!(run_to_halt(&mut cpu, &mut memory), Trap::InvalidOpcode { opcode: 0x1F });

    let regs = cpu.registers();
    assert_eq!(regs.r[0], 2);
    assert!(!regs.flags.is_set(C));
    assert!(!regs.flags.is_set(Z));
    assert_eq!(regs.pc, 1);
}

#[test]
fn carry_out_then_add_with_carry() {
    let (mut cpu, mut memory) = machine(&[alu(ADD, 0, 1), alu(ADC, 2, 3), HALT]);
    for r in 0..4 {
        cpu.set_register(r, 0x8000_0000);
    }

    assert!(cpu.run_until_retired(&mut memory, 20).is_some());
    assert_eq!(cpu.register(0), 0);
    assert_eq!(cpu.query("flags.c"), Some(Value::Bool(true)));
    assert_eq!(cpu.query("flags.z"), Some(Value::Bool(true)));

    assert!(cpu.run_until_retired(&mut memory, 20).is_some());
    assert_eq!(cpu.register(2), 1);
    assert_eq!(cpu.query("flags.c"), Some(Value::Bool(true)));
    assert_eq!(cpu.query("flags.z"), Some(Value::Bool(false)));
}

#[test]
fn flags_persist_across_non_alu_instructions() {
    let load = Instruction::encode(opcode::LOAD, 4, 5, mode::INDIRECT);
    let (mut cpu, mut memory) = machine(&[alu(SUB, 0, 1), load, alu(ADC, 2, 3), HALT]);
    cpu.set_register(1, 1);
    run_to_halt(&mut cpu, &mut memory);
    // 0 - 1 borrows; the LOAD leaves C alone; ADC 0 + 0 + 1.
    assert_eq!(cpu.register(0), 0xFFFF_FFFF);
    assert_eq!(cpu.register(2), 1);
}

#[test]
fn first_fill_makes_two_halves_available() {
    let mut memory = SimpleMemory::new(4);
    memory.load(0, &[0x3000_6000]);
    let mut fetcher = Fetcher::new(false);

    let idle = FetchCommand::default();
    let advance = FetchCommand {
        advance: true,
        request: None,
    };

    let mut step = |fetcher: &Fetcher, cmd: &FetchCommand| {
        let signals = fetcher.bus_signals();
        let response = memory.respond(&signals);
        let next = fetcher.evaluate(cmd, &response);
        memory.clock(&signals, &response);
        (next, response.ack)
    };

    let mut acked = false;
    while !acked {
        (fetcher, acked) = step(&fetcher, &idle);
    }
    assert_eq!(fetcher.available(), 2);

    let mut halves = Vec::new();
    for _ in 0..2 {
        halves.push(fetcher.instruction_at_cursor());
        (fetcher, _) = step(&fetcher, &advance);
    }
    assert_eq!(halves, vec![0x6000, 0x3000]);
}

#[test]
fn load_store_with_auto_modifying_modes() {
    let program = [
        Instruction::encode(opcode::LOAD, 2, 3, mode::POST_INCREMENT),
        Instruction::encode(opcode::STORE, 2, 3, mode::INDIRECT),
        Instruction::encode(opcode::STORE, 2, 6, mode::PRE_DECREMENT),
        alu(MOV, 5, 2),
        HALT,
    ];
    let (mut cpu, mut memory) = machine(&program);
    memory.poke(0x40, 0xCAFE_BABE);
    cpu.set_register(3, 0x100);
    cpu.set_register(6, 0x90);

    run_to_halt(&mut cpu, &mut memory);

    assert_eq!(cpu.register(2), 0xCAFE_BABE);
    assert_eq!(cpu.register(3), 0x104);
    assert_eq!(cpu.register(5), 0xCAFE_BABE);
    assert_eq!(cpu.register(6), 0x8C);
    assert_eq!(memory.peek(0x41), 0xCAFE_BABE);
    assert_eq!(memory.peek(0x23), 0xCAFE_BABE);
    assert_eq!(cpu.pc(), 4);
}

#[test]
fn store_before_halt_reaches_memory() {
    let program = [Instruction::encode(opcode::STORE, 1, 2, mode::INDIRECT), HALT];
    for latency in [0, 3] {
        let mut memory = LatencyMemory::new(SimpleMemory::new(128), latency);
        memory.inner_mut().load_halves(0, &program);
        let mut cpu = LockstepCpu::new();
        cpu.set_register(1, 0xABCD);
        cpu.set_register(2, 0x100);

        assert_eq!(run_to_halt(&mut cpu, &mut memory), Trap::InvalidOpcode { opcode: 0x1F });
        assert_eq!(cpu.pc(), 1);
        assert!(cpu.bus_settled());
        assert_eq!(memory.inner().peek(0x40), 0xABCD, "latency {latency}");
    }
}

/// Acknowledges reads at once and never acknowledges a write.
struct StuckWrites(SimpleMemory);

impl Memory for StuckWrites {
    fn respond(&self, signals: &BusSignals) -> BusResponse {
        if signals.write_enable {
            BusResponse::WAIT
        } else {
            self.0.respond(signals)
        }
    }

    fn clock(&mut self, signals: &BusSignals, response: &BusResponse) {
        self.0.clock(signals, response);
    }
}

#[test]
fn store_still_in_flight_is_not_reported_as_halted() {
    let mut memory = StuckWrites(SimpleMemory::new(128));
    memory
        .0
        .load_halves(0, &[Instruction::encode(opcode::STORE, 1, 2, mode::INDIRECT), HALT]);
    let mut cpu = LockstepCpu::new();
    cpu.set_register(1, 7);
    cpu.set_register(2, 0x100);

    assert_eq!(cpu.run(&mut memory, 200), RunOutcome::BudgetExhausted);
    assert!(cpu.is_halted());
    assert!(!cpu.bus_settled());
    assert_eq!(cpu.fetcher().state(), FetchState::Write);
    assert_eq!(memory.0.peek(0x40), 0);
}

#[test]
fn upper_bank_registers_execute() {
    let program = [alu(ADD, 9, 2), alu(SUB, 3, 12), alu(MOV, 15, 3), HALT];
    let (mut cpu, mut memory) = machine(&program);
    cpu.set_register(9, 40);
    cpu.set_register(2, 2);
    cpu.set_register(3, 100);
    cpu.set_register(12, 58);

    run_to_halt(&mut cpu, &mut memory);
    assert_eq!(cpu.register(9), 42);
    assert_eq!(cpu.register(3), 42);
    assert_eq!(cpu.register(15), 42);
    assert_eq!(cpu.query("r15"), Some(Value::U32(42)));
    assert_eq!(cpu.pc(), 3);
}

#[test]
fn displacement_load_consumes_two_words() {
    let program = [
        Instruction::encode(opcode::LOAD, 1, 2, mode::DISPLACEMENT),
        0xFFF8,
        alu(ADD, 1, 1),
        HALT,
    ];
    let (mut cpu, mut memory) = machine(&program);
    memory.poke(0x3E, 21);
    cpu.set_register(2, 0x100);

    run_to_halt(&mut cpu, &mut memory);
    assert_eq!(cpu.register(1), 42);
    assert_eq!(cpu.pc(), 3);
}

#[test]
fn traps_halt_until_reset() {
    let cases = [
        (
            Instruction::encode(ADD, 0, 1, 0b0_1101),
            Trap::ReservedMode { mode: 0b0_1101 },
        ),
        (
            Instruction::encode(opcode::LOAD, 0, 1, mode::INDEXED),
            Trap::UnimplementedMode { mode: mode::INDEXED },
        ),
        (
            Instruction::encode(ADD, 0, 1, mode::INDIRECT),
            Trap::InvalidOperand {
                opcode: ADD,
                mode: mode::INDIRECT,
            },
        ),
        (
            Instruction::encode(opcode::STORE, 0, 1, mode::REGISTER),
            Trap::InvalidOperand {
                opcode: opcode::STORE,
                mode: mode::REGISTER,
            },
        ),
    ];

    for (word, expected) in cases {
        let (mut cpu, mut memory) = machine(&[alu(ADD, 0, 1), word, alu(ADD, 0, 1)]);
        cpu.set_register(1, 1);
        assert_eq!(run_to_halt(&mut cpu, &mut memory), expected);
        assert!(cpu.is_halted());
        assert_eq!(cpu.pc(), 1, "{expected}");
        assert_eq!(cpu.register(0), 1);
        assert_eq!(cpu.query("trap"), Some(Value::String(expected.to_string())));

        // Ticking on changes nothing architectural.
        for _ in 0..20 {
            cpu.tick(&mut memory);
        }
        assert_eq!(cpu.pc(), 1);
        assert_eq!(cpu.register(0), 1);

        cpu.reset();
        assert!(!cpu.is_halted());
        assert_eq!(cpu.trap(), None);
    }
}

#[test]
fn every_instruction_retires_within_a_bound() {
    let mut program: Vec<u16> = (0..40u8)
        .map(|i| alu(i % 16, i % 8, (i + 3) % 16))
        .collect();
    program.push(HALT);

    for latency in [0, 1, 3] {
        let mut memory = LatencyMemory::new(SimpleMemory::new(64), latency);
        memory.inner_mut().load_halves(0, &program);
        let mut cpu = LockstepCpu::new();

        let bound = 8 + 4 * u64::from(latency);
        for i in 0..40 {
            let ticks = cpu.run_until_retired(&mut memory, bound);
            assert!(ticks.is_some(), "instruction {i} stuck at latency {latency}");
            assert!(!cpu.is_halted());
        }
        assert_eq!(cpu.pc(), 40);
    }
}

#[test]
fn slow_memory_gives_same_results() {
    let program = [
        alu(ADD, 0, 1),
        Instruction::encode(opcode::STORE, 0, 2, mode::POST_INCREMENT),
        Instruction::encode(opcode::LOAD, 3, 2, mode::PRE_DECREMENT),
        alu(ADD, 3, 3),
        HALT,
    ];

    for latency in [0, 2, 5] {
        let mut memory = LatencyMemory::new(SimpleMemory::new(128), latency);
        memory.inner_mut().load_halves(0, &program);
        let mut cpu = LockstepCpu::new();
        cpu.set_register(1, 7);
        cpu.set_register(2, 0x100);

        run_to_halt(&mut cpu, &mut memory);
        assert_eq!(cpu.register(0), 7, "latency {latency}");
        assert_eq!(cpu.register(2), 0x100);
        assert_eq!(cpu.register(3), 14);
        assert_eq!(memory.inner().peek(0x40), 7);
    }
}

#[test]
fn odd_entry_point() {
    let (mut cpu, mut memory) = machine(&[HALT, alu(ADD, 0, 1), HALT]);
    cpu.reset_to(1);
    cpu.set_register(1, 9);
    run_to_halt(&mut cpu, &mut memory);
    assert_eq!(cpu.register(0), 9);
    assert_eq!(cpu.pc(), 2);
}

#[test]
fn extended_counters_are_opt_in() {
    let program = [
        alu(ADD, 0, 1),
        Instruction::encode(opcode::STORE, 0, 2, mode::INDIRECT),
        Instruction::encode(opcode::LOAD, 3, 2, mode::INDIRECT),
        HALT,
    ];

    let (mut plain, mut memory) = machine(&program);
    run_to_halt(&mut plain, &mut memory);
    let counters = plain.counters();
    assert!(counters.fills > Ticks::ZERO);
    assert!(counters.fetch_stalls > Ticks::ZERO);
    assert_eq!(counters.cycles, plain.cycles());
    assert_eq!(counters.retired, Ticks::ZERO);
    assert_eq!(counters.reads, Ticks::ZERO);
    assert_eq!(counters.writes, Ticks::ZERO);
    assert_eq!(counters.prefetch_blocked, Ticks::ZERO);

    let config = CpuConfig {
        extended_counters: true,
        ..CpuConfig::default()
    };
    let mut cpu = LockstepCpu::with_config(config).expect("valid config");
    let mut memory = SimpleMemory::new(256);
    memory.load_halves(0, &program);
    run_to_halt(&mut cpu, &mut memory);
    let counters = cpu.counters();
    assert_eq!(counters.retired, Ticks(3));
    assert_eq!(counters.reads, Ticks(1));
    assert_eq!(counters.writes, Ticks(1));
    assert!(counters.prefetch_blocked > Ticks::ZERO);
    assert_eq!(cpu.query("counters.retired"), Some(Value::U64(3)));
}

#[test]
fn copy_demo_moves_four_words() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/copy.hex");
    let text = std::fs::read_to_string(path).expect("read demo");
    let image = lockstep_cpu::ProgramImage::from_hex(&text).expect("valid hex");

    let mut memory = LatencyMemory::new(SimpleMemory::new(256), 2);
    image.load_into(memory.inner_mut(), 0);
    memory.inner_mut().load(0x40, &[10, 20, 30, 40]);

    let mut cpu = LockstepCpu::new();
    cpu.set_register(1, 0x100);
    cpu.set_register(2, 0x200);
    run_to_halt(&mut cpu, &mut memory);
    assert_eq!(cpu.register(1), 0x110);
    assert_eq!(cpu.register(2), 0x210);
    for i in 0..4 {
        assert_eq!(memory.inner().peek(0x80 + i), 10 * (i + 1));
    }
}
