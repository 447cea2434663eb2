//! Condition flags.
//!
//! The flag register is 4 bits:
//! - C (bit 0): Carry / borrow out of bit 31
//! - Z (bit 1): Zero result
//! - N (bit 2): Negative (bit 31 of the result)
//! - V (bit 3): Overflow (never set by any operation)

use crate::alu::AluOutput;

/// Carry flag.
pub const C: u8 = 0x01;
/// Zero flag.
pub const Z: u8 = 0x02;
/// Negative flag.
pub const N: u8 = 0x04;
/// Overflow flag.
pub const V: u8 = 0x08;

/// Flag register. Written only by ALU-producing instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status(pub u8);

impl Status {
    /// Capture all four flags from an ALU evaluation.
    #[must_use]
    pub fn from_alu(out: &AluOutput) -> Self {
        let mut s = Self(0);
        s.set_if(C, out.carry);
        s.set_if(Z, out.zero);
        s.set_if(N, out.negative);
        s.set_if(V, out.overflow);
        s
    }

    #[must_use]
    pub const fn is_set(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn set_if(&mut self, flag: u8, condition: bool) {
        if condition {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    #[must_use]
    pub const fn carry(self) -> bool {
        self.is_set(C)
    }
}

impl std::fmt::Display for Status {
    /// `NZCV` with clear flags shown as `-`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (flag, name) in [(N, 'N'), (Z, 'Z'), (C, 'C'), (V, 'V')] {
            let ch = if self.is_set(flag) { name } else { '-' };
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}
