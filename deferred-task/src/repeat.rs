use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

use deferred::Executor;
use tracing::debug;

use crate::{Error, Task};

/// How many times [`Task::repeat`] retries after the first attempt.
pub const DEFAULT_ATTEMPTS: usize = 3;

impl<T: 'static + Clone + Send + Sync> Task<T> {
	/// [`Task::repeat_with`] that retries on any error, up to [`DEFAULT_ATTEMPTS`] times.
	pub fn repeat<E>(
		executor: E,
		start: impl 'static + Send + Sync + Fn() -> Result<Task<T>, Error>,
	) -> Task<T>
	where
		E: 'static + Executor + Clone,
	{
		Self::repeat_with(executor, DEFAULT_ATTEMPTS, |_| true, start)
	}

	/// Starts a task by calling `start`, then retries it by calling `start` again after each
	/// failure, up to `attempts` more times.
	///
	/// The first call to `start` happens right here in the calling context. If it returns [`Err`],
	/// so does the returned task, immediately. Retries are started on `executor`.
	///
	/// Before each retry, `should_retry` is asked about the error that **immediately preceded** it.
	/// Once it declines, neither it nor `start` is called again and the returned task fails with
	/// that same error.
	///
	/// A panic in `start` or `should_retry` during a retry counts as a failed attempt.
	///
	/// `start` is called at most `attempts + 1` times. With `attempts == 0`, it's still called once.
	///
	/// Cancelling the returned task reaches whichever attempt is in flight.
	pub fn repeat_with<E>(
		executor: E,
		attempts: usize,
		should_retry: impl 'static + Send + Sync + Fn(&Error) -> bool,
		start: impl 'static + Send + Sync + Fn() -> Result<Task<T>, Error>,
	) -> Task<T>
	where
		E: 'static + Executor + Clone,
	{
		let mut task = match start() {
			Ok(task) => task,
			Err(error) => {
				debug!(%error, "First attempt could not be started.");
				return Task::failure(error);
			}
		};

		let start = Arc::new(start);
		let should_retry = Arc::new(should_retry);
		let declined = Arc::new(AtomicBool::new(false));
		for attempt in 1..=attempts {
			let (start, should_retry, declined) = (
				Arc::clone(&start),
				Arc::clone(&should_retry),
				Arc::clone(&declined),
			);
			task = task.fallback(executor.clone(), move |error| {
				if declined.load(Ordering::Acquire) {
					return Err(error);
				}
				if should_retry(&error) {
					debug!(attempt, attempts, %error, "Retrying.");
					start()
				} else {
					debug!(attempt, %error, "Not retrying.");
					declined.store(true, Ordering::Release);
					Err(error)
				}
			});
		}
		task
	}
}

#[cfg(test)]
mod tests {
	use std::sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	};

	use deferred::NewThread;

	use crate::{Error, Task, DEFAULT_ATTEMPTS};

	#[test]
	fn default_attempts() {
		let calls = Arc::new(AtomicUsize::new(0));
		let task = Task::<()>::repeat(NewThread, {
			let calls = Arc::clone(&calls);
			move || {
				calls.fetch_add(1, Ordering::SeqCst);
				Ok(Task::failure(Error::msg("again")))
			}
		});

		assert!(task
			.wait(std::time::Duration::from_secs(5))
			.unwrap()
			.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), DEFAULT_ATTEMPTS + 1);
	}
}
