//! Addressing modes and instruction-word decoding.
//!
//! An instruction word packs an opcode into its low two decimal digits and
//! one addressing-mode digit per operand above them, least significant first:
//! `1002` is opcode `02` with operand modes `[0, 1]` (and position mode for
//! any operand beyond the written digits).

use crate::machine::errors::VMError;
use crate::machine::isa::Opcode;

/// Interpretation rule for a single operand.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Operand is an address to dereference.
    Position = 0,
    /// Operand is a literal value; never a valid write target.
    Immediate = 1,
    /// Operand is an offset from the machine's relative base.
    Relative = 2,
}

/// Validated mode digits of one instruction word.
///
/// Built by [`decode`]; lookups past the written digits yield
/// [`Mode::Position`].
#[derive(Copy, Clone, Debug)]
pub struct Modes(i64);

impl Modes {
    /// Returns the mode of operand `index` (zero-based).
    pub fn get(&self, index: u32) -> Mode {
        match (self.0 / 10_i64.pow(index)) % 10 {
            0 => Mode::Position,
            1 => Mode::Immediate,
            2 => Mode::Relative,
            // decode rejects any other digit
            _ => unreachable!("mode digits are validated at decode time"),
        }
    }
}

/// Splits the instruction word at `pc` into its opcode and operand modes.
///
/// The opcode is taken modulo 100 so the decode behaves uniformly for any
/// word value; every mode digit above it is validated eagerly, making later
/// [`Modes::get`] lookups infallible.
///
/// # Errors
/// Returns [`VMError::UnknownOpcode`] when the low digits match no operation
/// and [`VMError::InvalidModeDigit`] for a mode digit outside `0..=2`.
pub fn decode(word: i64, pc: i64) -> Result<(Opcode, Modes), VMError> {
    let opcode = Opcode::try_from(word.rem_euclid(100))
        .map_err(|_| VMError::UnknownOpcode {
            opcode: word.rem_euclid(100),
            pc,
        })?;

    let digits = word.div_euclid(100);
    let mut rest = digits;
    while rest != 0 {
        let digit = rest % 10;
        if !(0..=2).contains(&digit) {
            return Err(VMError::InvalidModeDigit { digit, pc });
        }
        rest /= 10;
    }

    Ok((opcode, Modes(digits)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_bare_opcode_defaults_to_position() {
        let (opcode, modes) = decode(2, 0).unwrap();
        assert_eq!(opcode, Opcode::Multiply);
        assert_eq!(modes.get(0), Mode::Position);
        assert_eq!(modes.get(1), Mode::Position);
        assert_eq!(modes.get(2), Mode::Position);
    }

    #[test]
    fn decode_mixed_modes_least_significant_first() {
        // 21002: opcode 02, operand modes [0, 1, 2]
        let (opcode, modes) = decode(21002, 0).unwrap();
        assert_eq!(opcode, Opcode::Multiply);
        assert_eq!(modes.get(0), Mode::Position);
        assert_eq!(modes.get(1), Mode::Immediate);
        assert_eq!(modes.get(2), Mode::Relative);
    }

    #[test]
    fn decode_missing_digits_default_to_position() {
        let (_, modes) = decode(104, 0).unwrap();
        assert_eq!(modes.get(0), Mode::Immediate);
        assert_eq!(modes.get(1), Mode::Position);
    }

    #[test]
    fn decode_rejects_unknown_opcode() {
        assert!(matches!(
            decode(42, 7),
            Err(VMError::UnknownOpcode { opcode: 42, pc: 7 })
        ));
    }

    #[test]
    fn decode_rejects_invalid_mode_digit() {
        assert!(matches!(
            decode(302, 5),
            Err(VMError::InvalidModeDigit { digit: 3, pc: 5 })
        ));
        assert!(matches!(
            decode(19001, 0),
            Err(VMError::InvalidModeDigit { digit: 9, .. })
        ));
    }

    #[test]
    fn decode_halt_with_modes() {
        let (opcode, _) = decode(1099, 0).unwrap();
        assert_eq!(opcode, Opcode::Halt);
    }
}
