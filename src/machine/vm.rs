//! Core machine implementation.
//!
//! [`Machine`] runs the fetch/decode/execute loop over a sparse address
//! space. Every instance exclusively owns its memory and execution state; the
//! only interaction with the outside world is through the input and output
//! channels supplied at construction.

use crate::channel::Channel;
use crate::machine::errors::VMError;
use crate::machine::isa::Opcode;
use crate::machine::memory::Memory;
use crate::machine::mode::{Mode, Modes, decode};
use crate::machine::program::Program;
use std::sync::Arc;

/// A single virtual machine instance.
///
/// Created from a [`Program`] image and driven by [`run`](Machine::run),
/// which steps until the halt opcode or a fatal decode error. Opcode 3
/// suspends on the input channel and opcode 4 on the output channel; nothing
/// else blocks. After halt the memory stays inspectable through
/// [`snapshot`](Machine::snapshot) and trailing output can be collected with
/// [`drain_output`](Machine::drain_output).
#[derive(Debug)]
pub struct Machine {
    /// Sparse address space, seeded from the program image.
    memory: Memory,
    /// Address of the next instruction word.
    pc: i64,
    /// Offset added to relative-mode operands.
    relative_base: i64,
    /// Set by the halt opcode; terminal.
    halted: bool,
    input: Arc<Channel>,
    output: Arc<Channel>,
}

impl Machine {
    /// Creates a machine with freshly allocated default-capacity channels.
    ///
    /// The endpoints are reachable through [`input`](Machine::input) and
    /// [`output`](Machine::output) for seeding and draining.
    pub fn new(program: &Program) -> Machine {
        Machine::with_channels(
            program,
            Channel::with_default_capacity(),
            Channel::with_default_capacity(),
        )
    }

    /// Creates a machine wired to the given channels.
    ///
    /// This is how topologies share channels between instances: the output
    /// of one machine is passed as the input of the next.
    pub fn with_channels(program: &Program, input: Arc<Channel>, output: Arc<Channel>) -> Machine {
        Machine {
            memory: Memory::new(program.words()),
            pc: 0,
            relative_base: 0,
            halted: false,
            input,
            output,
        }
    }

    /// Returns the machine's input channel.
    pub fn input(&self) -> &Arc<Channel> {
        &self.input
    }

    /// Returns the machine's output channel.
    pub fn output(&self) -> &Arc<Channel> {
        &self.output
    }

    /// Returns true once the halt opcode has executed.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Returns the full address space from 0 through the highest address
    /// ever touched. Stable across repeated calls after halt.
    pub fn snapshot(&self) -> Vec<i64> {
        self.memory.snapshot()
    }

    /// Removes and returns everything buffered on the output channel.
    pub fn drain_output(&self) -> Vec<i64> {
        self.output.drain_all()
    }

    /// Executes instructions until the machine halts.
    ///
    /// # Errors
    /// Aborts with the decode or addressing error of the offending
    /// instruction; the machine is not resumable afterwards.
    pub async fn run(&mut self) -> Result<(), VMError> {
        while !self.halted {
            self.step().await?;
        }
        Ok(())
    }

    /// Decodes and executes the instruction at the program counter.
    async fn step(&mut self) -> Result<(), VMError> {
        let word = self.memory.read(self.pc)?;
        let (opcode, modes) = decode(word, self.pc)?;
        let instr = opcode.mnemonic();
        let fallthrough = self.pc + 1 + opcode.operand_count();

        self.pc = match opcode {
            Opcode::Add => self.op_add(instr, &modes, fallthrough)?,
            Opcode::Multiply => self.op_mul(instr, &modes, fallthrough)?,
            Opcode::Input => self.op_input(instr, &modes, fallthrough).await?,
            Opcode::Output => self.op_output(&modes, fallthrough).await?,
            Opcode::JumpIfTrue => self.op_jump_if_true(&modes, fallthrough)?,
            Opcode::JumpIfFalse => self.op_jump_if_false(&modes, fallthrough)?,
            Opcode::LessThan => self.op_less_than(instr, &modes, fallthrough)?,
            Opcode::Equals => self.op_equals(instr, &modes, fallthrough)?,
            Opcode::AdjustRelativeBase => self.op_adjust_relative_base(&modes, fallthrough)?,
            Opcode::Halt => self.op_halt(),
        };
        Ok(())
    }

    /// Resolves operand `index` for reading under its addressing mode.
    fn read_operand(&mut self, index: u32, modes: &Modes) -> Result<i64, VMError> {
        let raw = self.memory.read(self.pc + 1 + index as i64)?;
        match modes.get(index) {
            Mode::Position => self.memory.read(raw),
            Mode::Immediate => Ok(raw),
            Mode::Relative => self.memory.read(self.relative_base + raw),
        }
    }

    /// Resolves operand `index` as a write target and stores `value` there.
    ///
    /// Immediate mode names a literal, not an address, so writing through it
    /// is fatal.
    fn write_operand(
        &mut self,
        instr: &'static str,
        index: u32,
        modes: &Modes,
        value: i64,
    ) -> Result<(), VMError> {
        let raw = self.memory.read(self.pc + 1 + index as i64)?;
        match modes.get(index) {
            Mode::Position => self.memory.write(raw, value),
            Mode::Immediate => Err(VMError::ImmediateWrite {
                instruction: instr,
                pc: self.pc,
            }),
            Mode::Relative => self.memory.write(self.relative_base + raw, value),
        }
    }

    fn op_add(&mut self, instr: &'static str, modes: &Modes, next: i64) -> Result<i64, VMError> {
        let a = self.read_operand(0, modes)?;
        let b = self.read_operand(1, modes)?;
        self.write_operand(instr, 2, modes, a.wrapping_add(b))?;
        Ok(next)
    }

    fn op_mul(&mut self, instr: &'static str, modes: &Modes, next: i64) -> Result<i64, VMError> {
        let a = self.read_operand(0, modes)?;
        let b = self.read_operand(1, modes)?;
        self.write_operand(instr, 2, modes, a.wrapping_mul(b))?;
        Ok(next)
    }

    async fn op_input(
        &mut self,
        instr: &'static str,
        modes: &Modes,
        next: i64,
    ) -> Result<i64, VMError> {
        let value = self.input.take().await;
        self.write_operand(instr, 0, modes, value)?;
        Ok(next)
    }

    async fn op_output(&mut self, modes: &Modes, next: i64) -> Result<i64, VMError> {
        let value = self.read_operand(0, modes)?;
        self.output.put(value).await;
        Ok(next)
    }

    fn op_jump_if_true(&mut self, modes: &Modes, next: i64) -> Result<i64, VMError> {
        let condition = self.read_operand(0, modes)?;
        let target = self.read_operand(1, modes)?;
        Ok(if condition != 0 { target } else { next })
    }

    fn op_jump_if_false(&mut self, modes: &Modes, next: i64) -> Result<i64, VMError> {
        let condition = self.read_operand(0, modes)?;
        let target = self.read_operand(1, modes)?;
        Ok(if condition == 0 { target } else { next })
    }

    fn op_less_than(
        &mut self,
        instr: &'static str,
        modes: &Modes,
        next: i64,
    ) -> Result<i64, VMError> {
        let a = self.read_operand(0, modes)?;
        let b = self.read_operand(1, modes)?;
        self.write_operand(instr, 2, modes, i64::from(a < b))?;
        Ok(next)
    }

    fn op_equals(
        &mut self,
        instr: &'static str,
        modes: &Modes,
        next: i64,
    ) -> Result<i64, VMError> {
        let a = self.read_operand(0, modes)?;
        let b = self.read_operand(1, modes)?;
        self.write_operand(instr, 2, modes, i64::from(a == b))?;
        Ok(next)
    }

    fn op_adjust_relative_base(&mut self, modes: &Modes, next: i64) -> Result<i64, VMError> {
        let offset = self.read_operand(0, modes)?;
        self.relative_base += offset;
        Ok(next)
    }

    fn op_halt(&mut self) -> i64 {
        self.halted = true;
        self.pc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(text: &str) -> Program {
        text.parse().expect("test image parses")
    }

    async fn run_to_halt(text: &str) -> Machine {
        let mut machine = Machine::new(&image(text));
        machine.run().await.expect("test program halts cleanly");
        machine
    }

    #[tokio::test]
    async fn add_and_multiply_rewrite_memory() {
        assert_eq!(run_to_halt("1,0,0,0,99").await.snapshot(), [2, 0, 0, 0, 99]);
        assert_eq!(run_to_halt("2,3,0,3,99").await.snapshot(), [2, 3, 0, 6, 99]);
        assert_eq!(
            run_to_halt("2,4,4,5,99,0").await.snapshot(),
            [2, 4, 4, 5, 99, 9801]
        );
        assert_eq!(
            run_to_halt("1,1,1,4,99,5,6,0,99").await.snapshot(),
            [30, 1, 1, 4, 2, 5, 6, 0, 99]
        );
        assert_eq!(
            run_to_halt("1,9,10,3,2,3,11,0,99,30,40,50").await.snapshot(),
            [3500, 9, 10, 70, 2, 3, 11, 0, 99, 30, 40, 50]
        );
    }

    #[tokio::test]
    async fn input_writes_and_output_reads() {
        let mut machine = Machine::new(&image("3,0,4,0,99"));
        machine.input().put(42).await;
        machine.run().await.unwrap();
        assert_eq!(machine.drain_output(), vec![42]);
    }

    #[tokio::test]
    async fn quine_emits_its_own_image() {
        let text = "109,1,204,-1,1001,100,1,100,1008,100,16,101,1006,101,0,99";
        let machine = run_to_halt(text).await;
        assert_eq!(machine.drain_output(), image(text).words());
    }

    #[tokio::test]
    async fn sixteen_digit_arithmetic() {
        let machine = run_to_halt("1102,34915192,34915192,7,4,7,99,0").await;
        assert_eq!(machine.drain_output(), vec![1219070632396864]);

        let machine = run_to_halt("104,1125899906842624,99").await;
        assert_eq!(machine.drain_output(), vec![1125899906842624]);
    }

    #[tokio::test]
    async fn reads_beyond_image_yield_zero() {
        let machine = run_to_halt("4,10,99").await;
        assert_eq!(machine.drain_output(), vec![0]);
        // The read at address 10 extends the snapshot extent.
        assert_eq!(machine.snapshot().len(), 11);
    }

    #[tokio::test]
    async fn equals_in_position_and_immediate_mode() {
        for (input, expected) in [(8, 1), (7, 0)] {
            let mut machine = Machine::new(&image("3,9,8,9,10,9,4,9,99,-1,8"));
            machine.input().put(input).await;
            machine.run().await.unwrap();
            assert_eq!(machine.drain_output(), vec![expected]);

            let mut machine = Machine::new(&image("3,3,1108,-1,8,3,4,3,99"));
            machine.input().put(input).await;
            machine.run().await.unwrap();
            assert_eq!(machine.drain_output(), vec![expected]);
        }
    }

    #[tokio::test]
    async fn less_than_in_position_and_immediate_mode() {
        for (input, expected) in [(7, 1), (8, 0), (9, 0)] {
            let mut machine = Machine::new(&image("3,9,7,9,10,9,4,9,99,-1,8"));
            machine.input().put(input).await;
            machine.run().await.unwrap();
            assert_eq!(machine.drain_output(), vec![expected]);

            let mut machine = Machine::new(&image("3,3,1107,-1,8,3,4,3,99"));
            machine.input().put(input).await;
            machine.run().await.unwrap();
            assert_eq!(machine.drain_output(), vec![expected]);
        }
    }

    #[tokio::test]
    async fn jump_driven_three_way_comparison() {
        let text = "3,21,1008,21,8,20,1005,20,22,107,8,21,20,1006,20,31,\
                    1106,0,36,98,0,0,1002,21,125,20,4,20,1105,1,46,104,\
                    999,1105,1,46,1101,1000,1,20,4,20,1105,1,46,98,99";
        for (input, expected) in [(7, 999), (8, 1000), (9, 1001)] {
            let mut machine = Machine::new(&image(text));
            machine.input().put(input).await;
            machine.run().await.unwrap();
            assert_eq!(machine.drain_output(), vec![expected]);
        }
    }

    #[tokio::test]
    async fn jump_if_true_branches_on_any_nonzero_value() {
        // A negative condition must take the branch, skipping the output.
        let machine = run_to_halt("1105,-1,5,104,0,99").await;
        assert!(machine.drain_output().is_empty());
    }

    #[tokio::test]
    async fn relative_base_addresses_the_same_cells_as_position_mode() {
        // arb 5; write input-free: 21101 is add with relative dest.
        // add 7, 3 -> relative slot 0 (address 5), then emit address 5.
        let machine = run_to_halt("109,5,21101,7,3,0,4,5,99").await;
        assert_eq!(machine.drain_output(), vec![10]);
    }

    #[tokio::test]
    async fn unknown_opcode_aborts_with_context() {
        let mut machine = Machine::new(&image("42,0,0"));
        let err = machine.run().await.unwrap_err();
        assert!(matches!(err, VMError::UnknownOpcode { opcode: 42, pc: 0 }));
    }

    #[tokio::test]
    async fn immediate_write_target_is_fatal() {
        let mut machine = Machine::new(&image("10001,0,0,0,99"));
        let err = machine.run().await.unwrap_err();
        assert!(matches!(
            err,
            VMError::ImmediateWrite {
                instruction: "add",
                pc: 0
            }
        ));
    }

    #[tokio::test]
    async fn negative_write_address_is_fatal() {
        let mut machine = Machine::new(&image("1101,1,1,-1,99"));
        let err = machine.run().await.unwrap_err();
        assert!(matches!(err, VMError::NegativeAddress { address: -1 }));
    }

    #[tokio::test]
    async fn snapshot_is_stable_after_halt() {
        let machine = run_to_halt("1,0,0,0,99").await;
        assert!(machine.is_halted());
        let first = machine.snapshot();
        assert_eq!(first, machine.snapshot());
    }
}
