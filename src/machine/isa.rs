//! Instruction set definitions.
//!
//! The [`for_each_opcode!`](crate::for_each_opcode) macro holds the canonical
//! opcode list and invokes a callback macro for code generation, so other
//! modules can generate opcode-related code without duplicating the table.
//!
//! This module generates:
//! - The [`Opcode`] enum with instruction-word mappings
//! - `TryFrom<i64>` for decoding the low two digits of an instruction word
//! - Mnemonic and operand-count lookups

use crate::machine::errors::VMError;

/// Invokes a callback macro with the complete opcode definition list.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            /// ADD a, b, dest ; dest = a + b
            Add = 1, "add" => 3,
            /// MUL a, b, dest ; dest = a * b
            Multiply = 2, "mul" => 3,
            /// IN dest ; dest = next value from the input channel (blocks while empty)
            Input = 3, "in" => 1,
            /// OUT a ; push a onto the output channel (blocks while full)
            Output = 4, "out" => 1,
            /// JNZ a, target ; if a != 0 then pc = target
            JumpIfTrue = 5, "jnz" => 2,
            /// JZ a, target ; if a == 0 then pc = target
            JumpIfFalse = 6, "jz" => 2,
            /// LT a, b, dest ; dest = 1 if a < b else 0
            LessThan = 7, "lt" => 3,
            /// EQ a, b, dest ; dest = 1 if a == b else 0
            Equals = 8, "eq" => 3,
            /// ARB a ; relative base += a
            AdjustRelativeBase = 9, "arb" => 1,
            /// HALT ; stop execution
            Halt = 99, "halt" => 0,
        }
    };
}

#[macro_export]
macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $code:literal, $mnemonic:literal => $operands:literal
        ),* $(,)?
    ) => {
        /// Operation selected by the low two digits of an instruction word.
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $code,
            )*
        }

        impl TryFrom<i64> for Opcode {
            type Error = VMError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                match value {
                    $( $code => Ok(Opcode::$name), )*
                    _ => Err(VMError::UnknownOpcode {
                        opcode: value,
                        pc: 0,
                    }),
                }
            }
        }

        impl Opcode {
            /// Returns the mnemonic used in diagnostics for this operation.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the number of operand words following the instruction word.
            pub const fn operand_count(&self) -> i64 {
                match self {
                    $( Opcode::$name => $operands, )*
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_try_from_valid() {
        assert_eq!(Opcode::try_from(1).unwrap(), Opcode::Add);
        assert_eq!(Opcode::try_from(9).unwrap(), Opcode::AdjustRelativeBase);
        assert_eq!(Opcode::try_from(99).unwrap(), Opcode::Halt);
    }

    #[test]
    fn opcode_try_from_invalid() {
        for code in [0, 10, 42, 98, 100, -1] {
            assert!(matches!(
                Opcode::try_from(code),
                Err(VMError::UnknownOpcode { opcode, .. }) if opcode == code
            ));
        }
    }

    #[test]
    fn operand_counts_match_instruction_widths() {
        assert_eq!(Opcode::Add.operand_count(), 3);
        assert_eq!(Opcode::Input.operand_count(), 1);
        assert_eq!(Opcode::JumpIfTrue.operand_count(), 2);
        assert_eq!(Opcode::Halt.operand_count(), 0);
    }

    #[test]
    fn mnemonics_are_stable() {
        assert_eq!(Opcode::Add.mnemonic(), "add");
        assert_eq!(Opcode::Halt.to_string(), "halt");
    }
}
