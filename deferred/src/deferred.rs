use std::{
	fmt::{self, Debug, Formatter},
	sync::Arc,
};

use deferred_runtime::{Executor, OnceSlot, Registration, Timeout};

/// A value that may become determined ("filled") at some point, after which it never changes.
///
/// This is both the read capability ([`peek`](`Deferred::peek`), [`wait`](`Deferred::wait`),
/// [`upon`](`Deferred::upon`), [`value`](`Deferred::value`)) and the write capability
/// ([`fill`](`Deferred::fill`)) of one shared single-assignment slot.
///
/// Cloning a [`Deferred`] aliases the slot rather than copying it. The slot lives as long as the
/// longest-lived handle.
pub struct Deferred<T> {
	slot: Arc<OnceSlot<T>>,
}

impl<T> Deferred<T> {
	/// Creates an unfilled [`Deferred`].
	#[must_use]
	pub fn new() -> Self {
		Self {
			slot: Arc::new(OnceSlot::new()),
		}
	}

	/// Creates a [`Deferred`] that is already filled with `value`.
	#[must_use]
	pub fn with_value(value: T) -> Self {
		Self {
			slot: Arc::new(OnceSlot::with_value(value)),
		}
	}

	/// Determines the value.
	///
	/// Filling should usually be attempted only once. If it was already filled, `value` is dropped.
	///
	/// **Returns** whether this call supplied the value.
	#[allow(clippy::must_use_candidate)]
	pub fn fill(&self, value: T) -> bool {
		self.slot.try_fill(value).is_ok()
	}

	/// Like [`.fill(value)`](`Deferred::fill`), but hands `value` back if it was rejected.
	///
	/// # Errors
	///
	/// Iff this [`Deferred`] was already filled.
	pub fn try_fill(&self, value: T) -> Result<(), T> {
		self.slot.try_fill(value)
	}

	/// Whether the value is determined. Doesn't block.
	#[must_use]
	pub fn is_filled(&self) -> bool {
		self.slot.is_filled()
	}

	/// The value, if determined. Doesn't block.
	#[must_use]
	pub fn peek(&self) -> Option<&T> {
		self.slot.peek()
	}

	/// Waits synchronously for the value to become determined.
	///
	/// If it already is, this returns immediately.
	///
	/// **Returns** the value, or [`None`] if `timeout` elapsed first.
	///
	/// # Threading
	///
	/// Only the calling thread is blocked.
	#[must_use]
	pub fn wait(&self, timeout: impl Into<Timeout>) -> Option<&T> {
		self.slot.wait_for_value(timeout)
	}

	/// Resolves to the value once it's determined.
	pub async fn value(&self) -> &T {
		self.slot.value().await
	}

	/// Whether `this` and `other` are handles to the same slot.
	#[must_use]
	pub fn ptr_eq(this: &Self, other: &Self) -> bool {
		Arc::ptr_eq(&this.slot, &other.slot)
	}
}

impl<T: 'static + Send + Sync> Deferred<T> {
	/// Calls `body` with the value on `executor` once it is determined.
	///
	/// If the value is already determined, `body` is submitted immediately.
	/// `body` is **always** run asynchronously, never inside this call.
	///
	/// The returned [`Registration`] can be used to call it off again, best-effort.
	pub fn upon(
		&self,
		executor: impl 'static + Executor,
		body: impl 'static + Send + FnOnce(&T),
	) -> Registration {
		self.slot.on_filled(executor, body)
	}
}

impl<T> Clone for Deferred<T> {
	fn clone(&self) -> Self {
		Self {
			slot: Arc::clone(&self.slot),
		}
	}
}

impl<T> Default for Deferred<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Debug> Debug for Deferred<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Deferred")
			.field("value", &self.peek())
			.finish()
	}
}
