//! legendary engine adapter.
//!
//! - `legendary` - invocation arguments and binary lookup
//! - `process` - a spawned engine run with merged, line-oriented output
//! - `shutdown` - SIGINT then SIGKILL termination of the engine process

mod legendary;
mod process;
mod shutdown;

pub use legendary::{ENGINE_BINARY, LegendaryEngine, legendary_args};
pub use process::ProcessRun;
pub use shutdown::interrupt_child;
