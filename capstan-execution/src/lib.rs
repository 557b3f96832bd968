//! Capstan Execution Engine
//!
//! This crate wraps the external processing binaries: it launches commands,
//! captures their output streams, applies the retry policy, and bounds how
//! many invocations run at once.

pub mod command;
pub mod error;
pub mod invocation;
pub mod parallel;

// Re-export main types
pub use command::{execute, launch, CallOptions, CommandOutput, CommandSpec};
pub use error::{ExecutionError, ExecutionResult};
pub use invocation::{ArgValue, ProcessorJob};
pub use parallel::for_each_parallel;
