#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![doc = include_str!("../README.md")]
//!
//! # Threading Notes
//!
//! Continuations are never run inline: neither by the registering call nor by [`CompletionSignal::fire`].  
//! They are always handed to their [`Executor`], and no internal lock is held while that happens.

pub mod executor;
pub mod signal;
pub mod slot;

mod timeout;

pub use executor::{Executor, Job, NewThread, Priority, ThreadPool, ThreadPoolBuilder, ThreadPoolHandle};
#[cfg(feature = "global_executor")]
pub use executor::GlobalExecutor;
pub use signal::{CompletionSignal, Registration};
pub use slot::OnceSlot;
pub use timeout::Timeout;

#[doc = include_str!("../README.md")]
mod readme {}
