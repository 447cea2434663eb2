//! Arithmetic-logic unit.
//!
//! Purely combinational: two 32-bit operands, a carry-in and a 4-bit opcode
//! in, a 32-bit result and flags out.
//!
//! Opcode map (bit 0 is the carry modifier for the arithmetic and shift
//! families):
//!
//! ```text
//!   000x  ADD / ADC          100x  LSH / LSHC
//!   001x  SUB / SBB          101x  RSH / RSHC
//!   0100  AND                110x  ADD / ADC (alias)
//!   0101  OR                 1110  AND (alias)
//!   0110  XOR                1111  MOV (pass B)
//!   0111  AND NOT
//! ```

/// Mask for the 33-bit intermediate used by the adder, subtractor and shifters.
const MASK_33: u64 = 0x1_FFFF_FFFF;

/// Bit 32 of a 33-bit intermediate: the carry/borrow out.
const CARRY_BIT: u64 = 1 << 32;

/// Shift amounts at or above this clear the whole 33-bit intermediate.
const SHIFT_WIDTH: u32 = 33;

/// Operation selected by a 4-bit ALU opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
    AndNot,
    ShiftLeft,
    ShiftRight,
    Move,
}

impl AluOp {
    /// Decode the low four bits of `opcode`. Every pattern is defined.
    #[must_use]
    pub const fn from_opcode(opcode: u8) -> Self {
        match opcode & 0x0F {
            0b0000 | 0b0001 | 0b1100 | 0b1101 => Self::Add,
            0b0010 | 0b0011 => Self::Sub,
            0b0100 | 0b1110 => Self::And,
            0b0101 => Self::Or,
            0b0110 => Self::Xor,
            0b0111 => Self::AndNot,
            0b1000 | 0b1001 => Self::ShiftLeft,
            0b1010 | 0b1011 => Self::ShiftRight,
            _ => Self::Move,
        }
    }

    /// Mnemonic, with the carry-using variant where the opcode selects it.
    #[must_use]
    pub const fn mnemonic(opcode: u8) -> &'static str {
        let with_carry = opcode & 1 != 0;
        match (Self::from_opcode(opcode), with_carry) {
            (Self::Add, false) => "ADD",
            (Self::Add, true) => "ADC",
            (Self::Sub, false) => "SUB",
            (Self::Sub, true) => "SBB",
            (Self::And, _) => "AND",
            (Self::Or, _) => "OR",
            (Self::Xor, _) => "XOR",
            (Self::AndNot, _) => "ANDN",
            (Self::ShiftLeft, false) => "LSH",
            (Self::ShiftLeft, true) => "LSHC",
            (Self::ShiftRight, false) => "RSH",
            (Self::ShiftRight, true) => "RSHC",
            (Self::Move, _) => "MOV",
        }
    }
}

/// ALU outputs for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AluOutput {
    pub result: u32,
    pub carry: bool,
    pub zero: bool,
    pub negative: bool,
    /// Present on the interface but never computed: always false.
    pub overflow: bool,
}

impl AluOutput {
    fn new(result: u32, carry: bool) -> Self {
        Self {
            result,
            carry,
            zero: result == 0,
            negative: result & 0x8000_0000 != 0,
            overflow: false,
        }
    }

    /// Split a 33-bit intermediate into result and carry-out.
    fn from_wide(wide: u64) -> Self {
        Self::new(wide as u32, wide & CARRY_BIT != 0)
    }
}

/// Evaluate the ALU.
///
/// The carry seen by the adder, subtractor and shifters is `carry_in` gated
/// by opcode bit 0, so each even/odd pair differs only in whether it honours
/// the incoming carry.
#[must_use]
pub fn execute(a: u32, b: u32, carry_in: bool, opcode: u8) -> AluOutput {
    let c = u64::from(carry_in && opcode & 1 != 0);
    let (a64, b64) = (u64::from(a), u64::from(b));

    match AluOp::from_opcode(opcode) {
        AluOp::Add => AluOutput::from_wide((a64 + b64 + c) & MASK_33),
        AluOp::Sub => AluOutput::from_wide(a64.wrapping_sub(b64 + c) & MASK_33),
        AluOp::And => AluOutput::new(a & b, false),
        AluOp::Or => AluOutput::new(a | b, false),
        AluOp::Xor => AluOutput::new(a ^ b, false),
        AluOp::AndNot => AluOutput::new(a & !b, false),
        AluOp::ShiftLeft => {
            // {c, A}: carry above bit 31, shifted out into bit 32.
            let wide = (c << 32) | a64;
            let shifted = if b < SHIFT_WIDTH { (wide << b) & MASK_33 } else { 0 };
            AluOutput::from_wide(shifted)
        }
        AluOp::ShiftRight => {
            // {A, c}: carry below bit 0, so a shift of 1 returns A itself.
            // No carry-out is produced for this family.
            let wide = (a64 << 1) | c;
            let shifted = if b < SHIFT_WIDTH { wide >> b } else { 0 };
            AluOutput::new(shifted as u32, false)
        }
        AluOp::Move => AluOutput::new(b, false),
    }
}
