use intcode_derive::Error;

/// Errors that can occur while parsing a program image or executing it.
#[derive(Debug, Error)]
pub enum VMError {
    /// Instruction word whose opcode digits match no operation.
    #[error("unknown opcode {opcode} at address {pc}")]
    UnknownOpcode { opcode: i64, pc: i64 },
    /// Mode digit outside the defined range (0, 1, 2).
    #[error("invalid mode digit {digit} in instruction word at address {pc}")]
    InvalidModeDigit { digit: i64, pc: i64 },
    /// A write operand resolved under immediate mode; write targets must be addresses.
    #[error("{instruction} at address {pc} writes through an immediate-mode operand")]
    ImmediateWrite {
        instruction: &'static str,
        pc: i64,
    },
    /// Memory access below address zero.
    #[error("negative address {address}")]
    NegativeAddress { address: i64 },
    /// Program image token that is not a signed decimal integer.
    #[error("invalid program token: {token:?}")]
    InvalidToken { token: String },
    /// Program image with no instruction words at all.
    #[error("empty program image")]
    EmptyProgram,
}
