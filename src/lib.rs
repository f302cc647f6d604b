//! An integer-addressed virtual machine with a channel-based concurrency fabric.
//!
//! Provides the machine itself, blocking FIFO channels for its I/O, and the
//! topology builders that wire several machines together.

pub mod channel;
pub mod fabric;
pub mod machine;
pub mod utils;
