//! Effective-address generation for LOAD and STORE.

use lockstep_core::WORD_ADDRESS_MASK;

use crate::decode::{Decoded, ModeClass};
use crate::trap::Trap;

/// Byte stride of a post-increment or pre-decrement.
pub const WORD_BYTES: u32 = 4;

/// Result of address generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveAddress {
    /// Byte address of the access.
    pub access: u32,
    /// New value for the base register, for the auto-modifying classes.
    pub writeback: Option<u32>,
}

impl EffectiveAddress {
    /// Word address driven on the bus.
    #[must_use]
    pub const fn word_address(&self) -> u32 {
        (self.access >> 2) & WORD_ADDRESS_MASK
    }
}

/// Compute the access address of `decoded` with base register value `base`.
///
/// `second_word` is the displacement for [`ModeClass::Displacement`]; a
/// missing second word (mode range configured without it) counts as zero.
pub fn effective_address(
    decoded: &Decoded,
    base: u32,
    second_word: Option<u16>,
) -> Result<EffectiveAddress, Trap> {
    let mode = decoded.mode();
    let (access, writeback) = match decoded.class {
        ModeClass::Indirect => (base, None),
        ModeClass::PostIncrement => (base, Some(base.wrapping_add(WORD_BYTES))),
        ModeClass::PreDecrement => {
            let address = base.wrapping_sub(WORD_BYTES);
            (address, Some(address))
        }
        ModeClass::Displacement => {
            let disp = i32::from(second_word.unwrap_or(0) as i16);
            (base.wrapping_add_signed(disp), None)
        }
        ModeClass::Indexed => return Err(Trap::UnimplementedMode { mode }),
        ModeClass::Reserved => return Err(Trap::ReservedMode { mode }),
        ModeClass::Register | ModeClass::RegisterExtended => {
            return Err(Trap::InvalidOperand {
                opcode: decoded.opcode(),
                mode,
            });
        }
    };
    Ok(EffectiveAddress { access, writeback })
}
