#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![doc = include_str!("../README.md")]
//!
//! # Cancellation Notes
//!
//! Cancellation is cooperative and best-effort. Cancelling a [`Task`] asks whatever produces its
//! result to stop, but a producer that finishes at the same moment wins: once a result is there,
//! it stays there. Cancelling a task that already has a result does nothing.

mod cancellation;
mod error;
mod fallback;
mod repeat;
mod task;

pub use cancellation::CancellationToken;
pub use error::{Cancelled, Error};
pub use repeat::DEFAULT_ATTEMPTS;
pub use task::Task;

pub use deferred::{
	Deferred, Executor, Job, NewThread, Priority, Registration, ThreadPool, ThreadPoolHandle,
	Timeout,
};
#[cfg(feature = "global_executor")]
pub use deferred::GlobalExecutor;

#[doc = include_str!("../README.md")]
mod readme {}
