use std::panic::{catch_unwind, AssertUnwindSafe};

use deferred::{Deferred, Executor};
use tracing::{debug, trace, warn};

use crate::{error::Panicked, CancellationToken, Error, Task};

impl<T: 'static + Clone + Send + Sync> Task<T> {
	/// Substitutes the task `recover` starts if this one fails.
	///
	/// Once this task has a result, a continuation runs on `executor`:
	///
	/// - On success, the composite succeeds with the same value. `recover` is **not** called.
	/// - On failure, `recover` is called **once** with the error. If it returns a replacement task,
	///   the composite resolves to whatever that task resolves to. If it returns [`Err`] (or
	///   panics) instead, the composite fails with that error.
	///
	/// Cancelling the composite cancels this task if it's still pending, and the replacement task
	/// once (or if) there is one.
	pub fn fallback<E>(
		&self,
		executor: E,
		recover: impl 'static + Send + FnOnce(Error) -> Result<Task<T>, Error>,
	) -> Task<T>
	where
		E: 'static + Executor + Clone,
	{
		let token = CancellationToken::new();
		let result = Deferred::new();

		self.upon(executor.clone(), {
			let (token, result) = (token.clone(), result.clone());
			move |outcome| match outcome {
				Ok(value) => {
					trace!("Source task succeeded, recovery skipped.");
					result.fill(Ok(value.clone()));
				}
				Err(error) => match recover_contained(recover, error) {
					Ok(replacement) => {
						debug!(%error, "Source task failed, recovering.");
						// The forwarding continuation must not hold this registration, or a pending
						// replacement would keep itself alive through the token.
						token.upon(executor.clone(), {
							let replacement = replacement.clone();
							move || replacement.cancel()
						});
						replacement.upon(executor, move |outcome| {
							result.fill(outcome.clone());
						});
					}
					Err(error) => {
						debug!(%error, "Recovery declined.");
						result.fill(Err(error));
					}
				},
			}
		});

		let source = self.clone();
		Task::new(result, move || {
			source.cancel();
			token.cancel();
		})
	}
}

fn recover_contained<T>(
	recover: impl FnOnce(Error) -> Result<Task<T>, Error>,
	error: &Error,
) -> Result<Task<T>, Error> {
	let error = error.clone();
	catch_unwind(AssertUnwindSafe(move || recover(error))).unwrap_or_else(|payload| {
		let panicked = Panicked::new(&*payload);
		warn!(%panicked, "Recovery panicked.");
		Err(panicked.into())
	})
}
