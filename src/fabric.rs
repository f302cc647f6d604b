//! Topology builders wiring machines and channels together.
//!
//! Every topology is assembled from the same two primitives: one spawned task
//! per [`Machine`] and shared [`Channel`]s passed in at construction. Blocking
//! channel hand-off gives pipelines and rings their lock-step alternation;
//! there is no scheduler beyond that.
//!
//! Liveness is the assembler's obligation: the machine never detects a `take`
//! whose matching `put` will never come. The builders in this module pair
//! every blocking read with an eventually-executed write, which is exactly
//! the property a custom topology must preserve.

use crate::channel::{Channel, Watcher};
use crate::machine::errors::VMError;
use crate::machine::program::Program;
use crate::machine::vm::Machine;
use crate::utils::wrapper_types::BoxFuture;
use crate::{error, info};
use intcode_derive::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Capacity of the channels between neighboring stages.
///
/// Has to hold a stage's pre-seeded phase plus the circulating signal; beyond
/// that, a small bound is what forces the lock-step hand-off.
const STAGE_CAPACITY: usize = 8;

/// How long a paired controller gets to finish up after its machine halts.
const CONTROLLER_GRACE: Duration = Duration::from_millis(100);

/// Errors surfaced by topology runs.
#[derive(Debug, Error)]
pub enum FabricError {
    /// A machine in the topology aborted with a fatal execution error.
    #[error("machine failed: {0}")]
    Machine(VMError),
    /// Every machine halted but the topology's result channel was empty.
    #[error("topology completed without a final output value")]
    NoOutput,
}

impl From<VMError> for FabricError {
    fn from(err: VMError) -> Self {
        FabricError::Machine(err)
    }
}

/// Runs a machine on its own task, returning the halted machine on success.
///
/// Fatal errors abort only this machine; they are logged here and handed back
/// through the join so the topology owner decides what to do with dependent
/// stages.
pub fn spawn(mut machine: Machine) -> JoinHandle<Result<Machine, VMError>> {
    tokio::spawn(async move {
        match machine.run().await {
            Ok(()) => Ok(machine),
            Err(err) => {
                error!("machine aborted: {}", err);
                Err(err)
            }
        }
    })
}

/// Awaits a spawned machine.
async fn join(handle: JoinHandle<Result<Machine, VMError>>) -> Result<Machine, VMError> {
    handle.await.expect("machine task panicked")
}

/// Single-instance topology: seeds the input channel with `inputs` up front,
/// runs the machine to halt, and returns it for snapshot and output draining.
pub async fn run_single(program: &Program, inputs: &[i64]) -> Result<Machine, FabricError> {
    // Batch runs have nobody draining mid-flight, so the output bound is
    // effectively lifted; the input just needs room for the whole seed.
    let input = Channel::new(inputs.len().max(1));
    let output = Channel::new(usize::MAX);
    let mut machine = Machine::with_channels(program, input, output);
    machine.input().put_all(inputs).await;
    machine.run().await?;
    Ok(machine)
}

/// Linear pipeline: stage `i`'s output channel is stage `i + 1`'s input.
///
/// Each stage is seeded with its phase setting, the first stage additionally
/// with `seed`; the last stage's final emission is the result. Stages run
/// concurrently and alternate on the blocking hand-off.
pub async fn run_pipeline(
    program: &Program,
    phases: &[i64],
    seed: i64,
) -> Result<i64, FabricError> {
    let channels: Vec<Arc<Channel>> = (0..=phases.len())
        .map(|_| Channel::new(STAGE_CAPACITY))
        .collect();
    for (channel, &phase) in channels.iter().zip(phases) {
        channel.put(phase).await;
    }
    channels[0].put(seed).await;

    info!("pipeline: {} stages", phases.len());
    let handles: Vec<_> = (0..phases.len())
        .map(|i| {
            spawn(Machine::with_channels(
                program,
                channels[i].clone(),
                channels[i + 1].clone(),
            ))
        })
        .collect();
    for handle in handles {
        join(handle).await?;
    }

    channels[phases.len()]
        .drain_all()
        .last()
        .copied()
        .ok_or(FabricError::NoOutput)
}

/// Feedback ring: a pipeline whose last output channel is the first input.
///
/// The signal circulates until every machine halts; only then is the value
/// resting on the ring's first channel the final one, so all stages are
/// joined before it is read.
pub async fn run_feedback_ring(
    program: &Program,
    phases: &[i64],
    seed: i64,
) -> Result<i64, FabricError> {
    let stages = phases.len();
    let channels: Vec<Arc<Channel>> = (0..stages).map(|_| Channel::new(STAGE_CAPACITY)).collect();
    for (channel, &phase) in channels.iter().zip(phases) {
        channel.put(phase).await;
    }
    channels[0].put(seed).await;

    info!("feedback ring: {} stages", stages);
    let handles: Vec<_> = (0..stages)
        .map(|i| {
            spawn(Machine::with_channels(
                program,
                channels[i].clone(),
                channels[(i + 1) % stages].clone(),
            ))
        })
        .collect();
    for handle in handles {
        join(handle).await?;
    }

    channels[0]
        .drain_all()
        .last()
        .copied()
        .ok_or(FabricError::NoOutput)
}

/// Companion task of a paired topology.
///
/// The controller reads what the machine emits from `events` (waking on the
/// readiness `watcher` when it wants to react per emission without consuming)
/// and writes the next directive into `commands`.
pub trait Controller: Send + 'static {
    fn drive(
        self: Box<Self>,
        commands: Arc<Channel>,
        events: Arc<Channel>,
        watcher: Watcher,
    ) -> BoxFuture<'static, ()>;
}

/// Paired cooperative topology: one machine, one controller, bidirectional
/// exchange until the machine halts.
///
/// The machine's halt ends the pairing. A controller that returns on its own
/// shortly after is joined normally; one still blocked on a channel that will
/// never be written again is released after [`CONTROLLER_GRACE`].
pub async fn run_paired<C: Controller>(
    program: &Program,
    controller: C,
) -> Result<Machine, FabricError> {
    let commands = Channel::new(STAGE_CAPACITY);
    let events = Channel::new(STAGE_CAPACITY);
    let watcher = events.subscribe();

    let machine = Machine::with_channels(program, commands.clone(), events.clone());
    let mut controller_handle =
        tokio::spawn(Box::new(controller).drive(commands, events, watcher));

    let machine = join(spawn(machine)).await?;

    if tokio::time::timeout(CONTROLLER_GRACE, &mut controller_handle)
        .await
        .is_err()
    {
        controller_handle.abort();
        let _ = controller_handle.await;
    }
    Ok(machine)
}

/// Ephemeral per-query topology: a fresh machine per probe.
///
/// Holds the program image and builds an isolated machine for every call, for
/// programs that must not carry state from one query to the next.
pub struct Prober {
    program: Program,
}

impl Prober {
    /// Creates a prober over the given program image.
    pub fn new(program: Program) -> Prober {
        Prober { program }
    }

    /// Runs one query against a fresh machine and returns everything it emitted.
    pub async fn query(&self, inputs: &[i64]) -> Result<Vec<i64>, FabricError> {
        let machine = run_single(&self.program, inputs).await?;
        Ok(machine.drain_output())
    }
}
