//! Instruction decoding.
//!
//! A 16-bit instruction word, from bit 0 upwards:
//!
//! ```text
//!  15      11 10   8 7    5 4       0
//! +----------+------+------+---------+
//! |   mode   |  rB  |  rA  | opcode  |
//! +----------+------+------+---------+
//! ```
//!
//! The mode field is read MSB-first as `m4 m3 m2 m1 m0`. With `m4` set the
//! operands are registers and `m0` picks which of the two register fields is
//! extended into the upper bank (`r8`..`r15`). With `m4` clear, `m3..m1`
//! select the addressing class and `m0` is free.

use std::fmt;

use crate::alu::AluOp;
use crate::config::DecoderConfig;
use crate::trap::Trap;

/// Opcode values outside the ALU range.
pub mod opcode {
    /// Highest ALU opcode. `0xxxx` is ALU operation `xxxx`.
    pub const ALU_LAST: u8 = 0b0_1111;
    /// `rA <- mem[EA]`.
    pub const LOAD: u8 = 0b1_0000;
    /// `mem[EA] <- rA`.
    pub const STORE: u8 = 0b1_0001;
}

/// Addressing-mode field values, one representative per class.
pub mod mode {
    pub const INDIRECT: u8 = 0b0_0000;
    pub const POST_INCREMENT: u8 = 0b0_0010;
    pub const PRE_DECREMENT: u8 = 0b0_0100;
    pub const REGISTER: u8 = 0b0_0110;
    pub const DISPLACEMENT: u8 = 0b0_1000;
    pub const INDEXED: u8 = 0b0_1010;
    /// `1xxx0`: register A in the upper bank.
    pub const EXTEND_A: u8 = 0b1_0000;
    /// `1xxx1`: register B in the upper bank.
    pub const EXTEND_B: u8 = 0b1_0001;
}

/// Raw fields of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Instruction {
    pub opcode: u8,
    pub field_a: u8,
    pub field_b: u8,
    pub mode: u8,
}

impl Instruction {
    #[must_use]
    pub const fn from_word(word: u16) -> Self {
        Self {
            opcode: (word & 0x1F) as u8,
            field_a: ((word >> 5) & 0x07) as u8,
            field_b: ((word >> 8) & 0x07) as u8,
            mode: ((word >> 11) & 0x1F) as u8,
        }
    }

    /// Pack the fields back into a word. Out-of-range field bits are dropped.
    #[must_use]
    pub const fn to_word(&self) -> u16 {
        (self.opcode as u16 & 0x1F)
            | ((self.field_a as u16 & 0x07) << 5)
            | ((self.field_b as u16 & 0x07) << 8)
            | ((self.mode as u16 & 0x1F) << 11)
    }

    /// Build the word for `opcode rA, rB` in `mode`, choosing the bank
    /// extension from the register numbers.
    ///
    /// Only register-to-register instructions reach the upper bank, and only
    /// one of their two registers at a time. When either register is 8 or
    /// above, `mode` is replaced by the matching extension mode, so `mode`
    /// must then be a register mode.
    #[must_use]
    pub const fn encode(opcode: u8, reg_a: u8, reg_b: u8, mode: u8) -> u16 {
        debug_assert!(
            reg_a < 8 || reg_b < 8,
            "only one register of an instruction can be in r8..r15"
        );
        debug_assert!(
            (reg_a < 8 && reg_b < 8) || ModeClass::from_mode(mode).is_register(),
            "r8..r15 are only reachable in register mode"
        );
        let mode = if reg_a >= 8 {
            mode::EXTEND_A
        } else if reg_b >= 8 {
            mode::EXTEND_B
        } else {
            mode
        };
        Self {
            opcode,
            field_a: reg_a & 0x07,
            field_b: reg_b & 0x07,
            mode,
        }
        .to_word()
    }
}

/// Addressing class selected by the mode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeClass {
    /// `[rB]`
    Indirect,
    /// `[rB]+`
    PostIncrement,
    /// `-[rB]`
    PreDecrement,
    /// `rA, rB`
    Register,
    /// `[rB + sext(word2)]`
    Displacement,
    /// `[rB + rC]`, with rC named by the second word.
    Indexed,
    /// `011xx`
    Reserved,
    /// `rA, rB` with one register in the upper bank.
    RegisterExtended,
}

impl ModeClass {
    #[must_use]
    pub const fn from_mode(mode: u8) -> Self {
        if mode & 0b1_0000 != 0 {
            return Self::RegisterExtended;
        }
        match (mode >> 1) & 0b111 {
            0b000 => Self::Indirect,
            0b001 => Self::PostIncrement,
            0b010 => Self::PreDecrement,
            0b011 => Self::Register,
            0b100 => Self::Displacement,
            0b101 => Self::Indexed,
            _ => Self::Reserved,
        }
    }

    /// Operands are registers, not memory.
    #[must_use]
    pub const fn is_register(self) -> bool {
        matches!(self, Self::Register | Self::RegisterExtended)
    }

    /// Operand is a memory location addressed through rB.
    #[must_use]
    pub const fn is_memory(self) -> bool {
        matches!(
            self,
            Self::Indirect
                | Self::PostIncrement
                | Self::PreDecrement
                | Self::Displacement
                | Self::Indexed
        )
    }
}

/// What an instruction does once its operands are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// ALU operation, carrying the 4-bit ALU opcode.
    Alu(u8),
    Load,
    Store,
}

/// A decoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub instruction: Instruction,
    /// Register index for port A, after bank extension.
    pub reg_a: u8,
    /// Register index for port B, after bank extension.
    pub reg_b: u8,
    pub class: ModeClass,
    /// A second instruction word follows.
    pub fetch_second: bool,
}

impl Decoded {
    #[must_use]
    pub const fn opcode(&self) -> u8 {
        self.instruction.opcode
    }

    #[must_use]
    pub const fn mode(&self) -> u8 {
        self.instruction.mode
    }

    /// Validate the opcode against the addressing class.
    pub fn operation(&self) -> Result<Operation, Trap> {
        let (opcode, mode) = (self.opcode(), self.mode());
        if self.class == ModeClass::Reserved {
            return Err(Trap::ReservedMode { mode });
        }
        match opcode {
            0..=opcode::ALU_LAST if self.class.is_register() => Ok(Operation::Alu(opcode)),
            0..=opcode::ALU_LAST => Err(Trap::InvalidOperand { opcode, mode }),
            opcode::LOAD | opcode::STORE if self.class == ModeClass::Indexed => {
                Err(Trap::UnimplementedMode { mode })
            }
            opcode::LOAD if self.class.is_memory() => Ok(Operation::Load),
            opcode::STORE if self.class.is_memory() => Ok(Operation::Store),
            opcode::LOAD | opcode::STORE => Err(Trap::InvalidOperand { opcode, mode }),
            _ => Err(Trap::InvalidOpcode { opcode }),
        }
    }
}

impl fmt::Display for Decoded {
    /// Assembly-style rendering, e.g. `ADC r0, r9` or `LOAD r2, [r3]+`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = (self.reg_a, self.reg_b);
        let name = match self.opcode() {
            op @ 0..=opcode::ALU_LAST => AluOp::mnemonic(op),
            opcode::LOAD => "LOAD",
            opcode::STORE => "STORE",
            _ => "???",
        };
        match self.class {
            ModeClass::Register | ModeClass::RegisterExtended => write!(f, "{name} r{a}, r{b}"),
            ModeClass::Indirect => write!(f, "{name} r{a}, [r{b}]"),
            ModeClass::PostIncrement => write!(f, "{name} r{a}, [r{b}]+"),
            ModeClass::PreDecrement => write!(f, "{name} r{a}, -[r{b}]"),
            ModeClass::Displacement => write!(f, "{name} r{a}, [r{b} + disp]"),
            ModeClass::Indexed => write!(f, "{name} r{a}, [r{b} + idx]"),
            ModeClass::Reserved => write!(f, "{name} <reserved {:#07b}>", self.mode()),
        }
    }
}

/// Stateless decoder parameterised by the two-word mode range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    #[must_use]
    pub const fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn decode(&self, word: u16) -> Decoded {
        let instruction = Instruction::from_word(word);
        let mode = instruction.mode;
        let extended = mode & 0b1_0000 != 0;
        let extend_b = mode & 0b0_0001 != 0;

        let reg_a = if extended && !extend_b {
            8 | instruction.field_a
        } else {
            instruction.field_a
        };
        let reg_b = if extended && extend_b {
            8 | instruction.field_b
        } else {
            instruction.field_b
        };

        Decoded {
            instruction,
            reg_a,
            reg_b,
            class: ModeClass::from_mode(mode),
            fetch_second: self.config.two_word_modes.contains(mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModeRange;

    #[test]
    fn fields_round_trip_for_every_word() {
        let decoder = Decoder::default();
        for word in 0..=u16::MAX {
            assert_eq!(decoder.decode(word).instruction.to_word(), word, "{word:#06X}");
        }
    }

    #[test]
    fn add_r0_r1_register_mode() {
        let word = Instruction::encode(0b0_0000, 0, 1, mode::REGISTER);
        let d = Decoder::default().decode(word);
        assert_eq!((d.reg_a, d.reg_b), (0, 1));
        assert_eq!(d.class, ModeClass::Register);
        assert!(!d.fetch_second);
        assert_eq!(d.operation(), Ok(Operation::Alu(0)));
        assert_eq!(d.to_string(), "ADD r0, r1");
    }

    #[test]
    fn extension_bit_selects_register() {
        let decoder = Decoder::default();
        let a = decoder.decode(Instruction::encode(0, 11, 2, mode::REGISTER));
        assert_eq!((a.reg_a, a.reg_b), (11, 2));
        assert_eq!(a.class, ModeClass::RegisterExtended);

        let b = decoder.decode(Instruction::encode(0, 2, 15, mode::REGISTER));
        assert_eq!((b.reg_a, b.reg_b), (2, 15));

        // Without m4, m0 set extends nothing.
        let plain = decoder.decode(Instruction::encode(0, 3, 4, mode::REGISTER | 1));
        assert_eq!((plain.reg_a, plain.reg_b), (3, 4));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "only one register")]
    fn encode_rejects_two_upper_bank_registers() {
        let _ = Instruction::encode(0, 9, 10, mode::REGISTER);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "only reachable in register mode")]
    fn encode_rejects_upper_bank_memory_operand() {
        let _ = Instruction::encode(opcode::LOAD, 9, 2, mode::INDIRECT);
    }

    #[test]
    fn mode_classes() {
        let expected = [
            (0b00000, ModeClass::Indirect),
            (0b00011, ModeClass::PostIncrement),
            (0b00100, ModeClass::PreDecrement),
            (0b00111, ModeClass::Register),
            (0b01001, ModeClass::Displacement),
            (0b01010, ModeClass::Indexed),
            (0b01100, ModeClass::Reserved),
            (0b01111, ModeClass::Reserved),
            (0b10110, ModeClass::RegisterExtended),
        ];
        for (mode, class) in expected {
            assert_eq!(ModeClass::from_mode(mode), class, "{mode:#07b}");
        }
    }

    #[test]
    fn second_word_follows_configured_range() {
        let decoder = Decoder::default();
        for mode in 0..=0b1_1111u8 {
            let d = decoder.decode(Instruction { mode, ..Instruction::default() }.to_word());
            assert_eq!(d.fetch_second, (0b01000..=0b01011).contains(&mode), "{mode:#07b}");
        }

        let narrow = Decoder::new(DecoderConfig {
            two_word_modes: ModeRange::new(0b01000, 0b01001),
        });
        let d = narrow.decode(Instruction::encode(opcode::LOAD, 0, 1, mode::INDEXED));
        assert!(!d.fetch_second);
    }

    #[test]
    fn invalid_combinations_trap() {
        let decoder = Decoder::default();
        let op = |word| decoder.decode(word).operation();

        assert_eq!(
            op(Instruction::encode(0, 0, 1, 0b01100)),
            Err(Trap::ReservedMode { mode: 0b01100 })
        );
        assert_eq!(
            op(Instruction::encode(0b10010, 0, 1, mode::INDIRECT)),
            Err(Trap::InvalidOpcode { opcode: 0b10010 })
        );
        assert_eq!(
            op(Instruction::encode(0b00000, 0, 1, mode::INDIRECT)),
            Err(Trap::InvalidOperand { opcode: 0, mode: mode::INDIRECT })
        );
        assert_eq!(
            op(Instruction::encode(opcode::LOAD, 0, 1, mode::REGISTER)),
            Err(Trap::InvalidOperand { opcode: opcode::LOAD, mode: mode::REGISTER })
        );
        assert_eq!(
            op(Instruction::encode(opcode::STORE, 0, 1, mode::INDEXED)),
            Err(Trap::UnimplementedMode { mode: mode::INDEXED })
        );
    }

    #[test]
    fn memory_operations() {
        let decoder = Decoder::default();
        let load = decoder.decode(Instruction::encode(opcode::LOAD, 2, 3, mode::POST_INCREMENT));
        assert_eq!(load.operation(), Ok(Operation::Load));
        assert_eq!(load.to_string(), "LOAD r2, [r3]+");

        let store = decoder.decode(Instruction::encode(opcode::STORE, 4, 5, mode::DISPLACEMENT));
        assert_eq!(store.operation(), Ok(Operation::Store));
        assert!(store.fetch_second);
    }
}
