//! Invalid-encoding outcomes.

use thiserror::Error;

/// Why the control unit stopped in its terminal state.
///
/// Traps are machine state, recorded on the control unit and queryable
/// through `Observable`; they are never returned from `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Trap {
    /// Mode field in the reserved `011xx` range.
    #[error("reserved addressing mode {mode:#07b}")]
    ReservedMode { mode: u8 },
    /// Opcode outside the ALU, LOAD and STORE encodings.
    #[error("invalid opcode {opcode:#07b}")]
    InvalidOpcode { opcode: u8 },
    /// Valid opcode paired with an addressing class it does not accept.
    #[error("opcode {opcode:#07b} does not accept addressing mode {mode:#07b}")]
    InvalidOperand { opcode: u8, mode: u8 },
    /// Indexed addressing decodes but has no execution path.
    #[error("indexed addressing mode {mode:#07b} is not implemented")]
    UnimplementedMode { mode: u8 },
}

impl Trap {
    /// Short identifier used by observers.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ReservedMode { .. } => "reserved-mode",
            Self::InvalidOpcode { .. } => "invalid-opcode",
            Self::InvalidOperand { .. } => "invalid-operand",
            Self::UnimplementedMode { .. } => "unimplemented-mode",
        }
    }
}
