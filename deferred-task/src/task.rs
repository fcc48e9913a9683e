use std::{
	fmt::{self, Debug, Formatter},
	panic::{catch_unwind, AssertUnwindSafe},
	sync::Arc,
};

use deferred::{Deferred, Executor, Registration, Timeout};
use tracing::{trace, warn};

use crate::{error::Panicked, Cancelled, CancellationToken, Error};

/// A fallible asynchronous operation: a [`Deferred`] result plus a way to ask it to stop.
///
/// A task is pending until its result is filled, then fulfilled ([`Ok`]) or failed ([`Err`]) for
/// good. Clones refer to the same operation.
pub struct Task<T> {
	pub(crate) future: Deferred<Result<T, Error>>,
	cancellation: Arc<dyn Send + Sync + Fn()>,
}

impl<T> Task<T> {
	/// A task whose result is `future`, and which runs `cancel` when cancelled while pending.
	///
	/// `cancel` **should** be idempotent, since it may be called more than once.
	pub fn new(
		future: Deferred<Result<T, Error>>,
		cancel: impl 'static + Send + Sync + Fn(),
	) -> Self {
		Self {
			future,
			cancellation: Arc::new(cancel),
		}
	}

	/// A task that already succeeded with `value`.
	pub fn success(value: T) -> Self {
		Self::from(Deferred::with_value(Ok(value)))
	}

	/// A task that already failed with `error`.
	pub fn failure(error: impl Into<Error>) -> Self {
		Self::from(Deferred::with_value(Err(error.into())))
	}

	/// Asks the work behind this task to stop. Does nothing once the task has a result.
	///
	/// The task may still succeed or fail normally afterwards.
	pub fn cancel(&self) {
		if self.future.is_filled() {
			return;
		}
		(self.cancellation)();
	}

	/// Whether the task has a result. Doesn't block.
	#[must_use]
	pub fn is_filled(&self) -> bool {
		self.future.is_filled()
	}

	/// The result, if there is one. Doesn't block.
	#[must_use]
	pub fn peek(&self) -> Option<&Result<T, Error>> {
		self.future.peek()
	}

	/// Blocks the calling thread until the task has a result or `timeout` elapses.
	#[must_use]
	pub fn wait(&self, timeout: impl Into<Timeout>) -> Option<&Result<T, Error>> {
		self.future.wait(timeout)
	}

	/// Resolves to the result once there is one.
	pub async fn value(&self) -> &Result<T, Error> {
		self.future.value().await
	}

	/// The underlying result.
	#[must_use]
	pub fn future(&self) -> &Deferred<Result<T, Error>> {
		&self.future
	}
}

impl<T: 'static + Send + Sync> Task<T> {
	/// Runs `work` on `executor`, passing it a [`CancellationToken`] that [`.cancel()`](`Task::cancel`) fills.
	///
	/// `work` is expected to check the token now and then. If cancellation is requested before
	/// `work` even starts, it is skipped and the task fails with [`Cancelled`]. If `work` panics,
	/// the task fails with an error carrying the panic message.
	pub fn spawn(
		executor: impl Executor,
		work: impl 'static + Send + FnOnce(&CancellationToken) -> Result<T, Error>,
	) -> Self {
		let token = CancellationToken::new();
		let result = Deferred::new();
		executor.submit(Box::new({
			let (token, result) = (token.clone(), result.clone());
			move || {
				let outcome = if token.is_cancelled() {
					trace!("Skipping cancelled task.");
					Err(Cancelled.into())
				} else {
					catch_unwind(AssertUnwindSafe(|| work(&token))).unwrap_or_else(|payload| {
						let panicked = Panicked::new(&*payload);
						warn!(%panicked, "Task work panicked.");
						Err(panicked.into())
					})
				};
				result.fill(outcome);
			}
		}));
		Self::new(result, move || {
			token.cancel();
		})
	}

	/// Calls `body` with the result on `executor` once there is one. Always asynchronous.
	pub fn upon(
		&self,
		executor: impl 'static + Executor,
		body: impl 'static + Send + FnOnce(&Result<T, Error>),
	) -> Registration {
		self.future.upon(executor, body)
	}
}

impl<T> From<Deferred<Result<T, Error>>> for Task<T> {
	/// A task that can't be cancelled.
	fn from(future: Deferred<Result<T, Error>>) -> Self {
		Self::new(future, || ())
	}
}

impl<T> Clone for Task<T> {
	fn clone(&self) -> Self {
		Self {
			future: self.future.clone(),
			cancellation: Arc::clone(&self.cancellation),
		}
	}
}

impl<T: Debug> Debug for Task<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Task")
			.field("result", &self.peek())
			.finish_non_exhaustive()
	}
}
