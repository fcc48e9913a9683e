use std::sync::LazyLock;

use tracing::warn;

use super::{Executor, Job, NewThread, Priority, ThreadPool};

static GLOBAL_POOL: LazyLock<Option<ThreadPool>> = LazyLock::new(|| {
	ThreadPool::builder()
		.name("deferred-global")
		.build()
		.inspect_err(|error| {
			warn!(%error, "Failed to start the global thread pool, falling back to one thread per job.");
		})
		.ok()
});

/// The process-wide [`ThreadPool`], started on first use with one worker per available hardware thread.
///
/// This is a usable default [`Executor`] for continuations that don't need a dedicated pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GlobalExecutor {
	priority: Priority,
}

impl GlobalExecutor {
	/// The global pool's `priority` queue.
	#[must_use]
	pub const fn at(priority: Priority) -> Self {
		Self { priority }
	}

	/// The queue class this executor submits to.
	#[must_use]
	pub const fn priority(self) -> Priority {
		self.priority
	}
}

impl Executor for GlobalExecutor {
	fn submit(&self, job: Job) {
		match &*GLOBAL_POOL {
			Some(pool) => pool.submit_at(self.priority, job),
			None => NewThread.submit(job),
		}
	}
}
