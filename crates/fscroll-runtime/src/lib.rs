#![forbid(unsafe_code)]

//! Runtime for FrankenScroll.
//!
//! [`ScrollProgram`] is the single-threaded loop that owns a
//! [`ScrollEngine`](fscroll_engine::ScrollEngine): scroll samples from the
//! host and page answers from background workers arrive as [`Msg`]s on one
//! queue and are applied one at a time. [`FetchSimulator`] runs the same
//! update logic without threads, holding every fetch until a test resolves it.

pub mod program;
pub mod simulator;

pub use program::{Cmd, Msg, ProgramHandle, RuntimeError, ScrollModel, ScrollProgram};
pub use simulator::{CmdRecord, FetchSimulator};
