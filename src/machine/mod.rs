//! Integer-addressed virtual machine.
//!
//! The machine executes a linear stream of instruction words loaded from a
//! [`program::Program`] image. Each word decodes into an opcode plus a set of
//! per-operand addressing modes; execution mutates a sparse, growable address
//! space and suspends on channel I/O.
//!
//! # Architecture
//!
//! - **Address space**: sparse `i64 -> i64` mapping, unset cells read as zero
//! - **Instruction format**: `word % 100` is the opcode, the remaining digits
//!   (least significant first) select each operand's addressing mode
//! - **Execution model**: fetch/decode/execute loop with position, immediate,
//!   and relative operand resolution and a machine-local relative base
//! - **I/O model**: opcodes 3 and 4 block on the machine's input and output
//!   channels; no other operation suspends
//!
//! # Modules
//!
//! - [`errors`]: execution and parse error types
//! - [`isa`]: opcode table and mnemonic/arity mappings
//! - [`mode`]: addressing modes and instruction-word decoding
//! - [`memory`]: sparse address space with high-water tracking
//! - [`program`]: program image parsing
//! - [`vm`]: the machine itself

pub mod errors;
pub mod isa;
pub mod memory;
pub mod mode;
pub mod program;
pub mod vm;
