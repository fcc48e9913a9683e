use deferred::{Deferred, Executor, Registration, Timeout};
use tracing::trace;

use crate::Cancelled;

/// A request to stop, as a single-assignment cell of `()`.
///
/// Producers observe it being filled as the stop request. Clones share the same request.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
	requested: Deferred<()>,
}

impl CancellationToken {
	/// A token nobody has cancelled yet.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Requests cancellation. Idempotent.
	///
	/// **Returns** whether this call made the request.
	#[allow(clippy::must_use_candidate)]
	pub fn cancel(&self) -> bool {
		let requested = self.requested.fill(());
		if requested {
			trace!("Cancellation requested.");
		}
		requested
	}

	/// Whether cancellation was requested.
	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		self.requested.is_filled()
	}

	/// For producers: `token.check()?` bails out with [`Cancelled`] once cancellation was requested.
	///
	/// # Errors
	///
	/// Iff cancellation was requested.
	pub fn check(&self) -> Result<(), Cancelled> {
		if self.is_cancelled() {
			Err(Cancelled)
		} else {
			Ok(())
		}
	}

	/// Runs `on_cancel` on `executor` once cancellation is requested.
	pub fn upon(
		&self,
		executor: impl 'static + Executor,
		on_cancel: impl 'static + Send + FnOnce(),
	) -> Registration {
		self.requested.upon(executor, move |_| on_cancel())
	}

	/// Blocks the calling thread until cancellation is requested or `timeout` elapses.
	///
	/// **Returns** whether cancellation was requested.
	#[must_use]
	pub fn wait(&self, timeout: impl Into<Timeout>) -> bool {
		self.requested.wait(timeout).is_some()
	}

	/// Resolves once cancellation is requested.
	pub async fn cancelled(&self) {
		self.requested.value().await;
	}
}
