//! Where continuations run.
//!
//! An [`Executor`] accepts [`Job`]s and runs them *asynchronously*, that is: never inside
//! [`Executor::submit`] itself. [`CompletionSignal`](`crate::CompletionSignal`) relies on this
//! to guarantee that continuations don't run inline in the registering or firing call.

use std::{sync::Arc, thread};

use tracing::warn;

mod thread_pool;
pub use thread_pool::{ThreadPool, ThreadPoolBuilder, ThreadPoolHandle};

#[cfg(feature = "global_executor")]
mod global;
#[cfg(feature = "global_executor")]
pub use global::GlobalExecutor;

/// A unit of work submitted to an [`Executor`].
pub type Job = Box<dyn 'static + Send + FnOnce()>;

/// Runs [`Job`]s asynchronously.
///
/// # Logic
///
/// `job` **must not** run synchronously inside [`.submit(job)`](`Executor::submit`).
/// `job` **should** run eventually. An executor that drops a job instead **should** log that.
pub trait Executor: Send + Sync {
	/// Submits `job` to run later, on whichever thread this executor chooses.
	fn submit(&self, job: Job);
}

impl<E: ?Sized + Executor> Executor for &E {
	fn submit(&self, job: Job) {
		(**self).submit(job);
	}
}

impl<E: ?Sized + Executor> Executor for Arc<E> {
	fn submit(&self, job: Job) {
		(**self).submit(job);
	}
}

impl<E: ?Sized + Executor> Executor for Box<E> {
	fn submit(&self, job: Job) {
		(**self).submit(job);
	}
}

/// Queue class hint for executors that distinguish between them.
///
/// Variants are ordered from most to least urgent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
	/// Work a caller is actively waiting on.
	UserInitiated,
	/// Everything without a more specific class.
	#[default]
	Default,
	/// Long-running work whose progress the caller may observe.
	Utility,
	/// Maintenance that can wait indefinitely.
	Background,
}

impl Priority {
	pub(crate) const COUNT: usize = 4;

	pub(crate) const fn index(self) -> usize {
		self as usize
	}
}

/// Runs each [`Job`] on a freshly spawned thread.
///
/// Mostly useful in tests and for rare, long-blocking work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NewThread;

impl Executor for NewThread {
	fn submit(&self, job: Job) {
		if let Err(error) = thread::Builder::new()
			.name("deferred-new-thread".to_owned())
			.spawn(job)
		{
			warn!(%error, "Failed to spawn a thread, dropping job.");
		}
	}
}
