#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![doc = include_str!("../README.md")]
//!
//! # Threading Notes
//!
//! [`Deferred::wait`] blocks only the calling thread. It never occupies an executor's worker, so
//! it's fine to wait on a value that will be filled by work queued on the same pool.

mod deferred;
pub use deferred::Deferred;

pub use deferred_runtime::{
	executor, Executor, Job, NewThread, Priority, Registration, ThreadPool, ThreadPoolBuilder,
	ThreadPoolHandle, Timeout,
};
#[cfg(feature = "global_executor")]
pub use deferred_runtime::GlobalExecutor;

#[doc = include_str!("../README.md")]
mod readme {}
