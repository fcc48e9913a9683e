//! [`OnceSlot`] is a single-assignment cell: it goes from empty to filled at most once, ever.
//!
//! The value is stored inline and guarded by an atomic state tag. Filling publishes the value
//! (release) before firing the slot's [`CompletionSignal`], so anything that observes the signal as
//! fired also observes the value.

use std::{
	cell::UnsafeCell,
	fmt::{self, Debug, Formatter},
	mem::MaybeUninit,
	sync::{
		atomic::{AtomicU8, Ordering},
		Arc,
	},
};

use crate::{CompletionSignal, Executor, Registration, Timeout};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const FILLED: u8 = 2;

/// A single-assignment cell with a [`CompletionSignal`] that fires when it's filled.
pub struct OnceSlot<T> {
	state: AtomicU8,
	value: UnsafeCell<MaybeUninit<T>>,
	signal: CompletionSignal,
}

// SAFETY: The value is written exactly once, by the thread that wins `EMPTY -> WRITING`, and only
// shared after `FILLED` is published. Sharing hands out `&T` across threads, hence `T: Sync`.
unsafe impl<T: Send + Sync> Sync for OnceSlot<T> {}

impl<T> OnceSlot<T> {
	/// Creates an empty slot.
	#[must_use]
	pub fn new() -> Self {
		Self {
			state: AtomicU8::new(EMPTY),
			value: UnsafeCell::new(MaybeUninit::uninit()),
			signal: CompletionSignal::new(),
		}
	}

	/// Creates a slot that is already filled with `value`. Its signal has already fired.
	#[must_use]
	pub fn with_value(value: T) -> Self {
		Self {
			state: AtomicU8::new(FILLED),
			value: UnsafeCell::new(MaybeUninit::new(value)),
			signal: CompletionSignal::fired(),
		}
	}

	/// Attempts the one-way empty-to-filled transition.
	///
	/// Exactly one call among any number of racing ones succeeds.
	///
	/// # Errors
	///
	/// Iff the slot was already filled (or is being filled by another thread). The rejected `value`
	/// is handed back rather than retained.
	pub fn try_fill(&self, value: T) -> Result<(), T> {
		if self
			.state
			.compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
			.is_err()
		{
			return Err(value);
		}

		// SAFETY: Winning `EMPTY -> WRITING` grants exclusive access until `FILLED` is published.
		unsafe { (*self.value.get()).write(value) };
		self.state.store(FILLED, Ordering::Release);
		self.signal.fire();
		Ok(())
	}

	/// Whether the slot is filled. Doesn't block.
	#[must_use]
	pub fn is_filled(&self) -> bool {
		self.state.load(Ordering::Acquire) == FILLED
	}

	/// The value, if the slot is filled. Once [`Some`], it never changes.
	#[must_use]
	pub fn peek(&self) -> Option<&T> {
		if self.is_filled() {
			// SAFETY: `FILLED` was published after the write and is final.
			Some(unsafe { (*self.value.get()).assume_init_ref() })
		} else {
			None
		}
	}

	/// Blocks the calling thread until the slot is filled or `timeout` elapses.
	#[must_use]
	pub fn wait_for_value(&self, timeout: impl Into<Timeout>) -> Option<&T> {
		if self.signal.wait_until_fired(timeout) {
			self.peek()
		} else {
			None
		}
	}

	/// Resolves to the value once the slot is filled.
	pub async fn value(&self) -> &T {
		loop {
			if let Some(value) = self.peek() {
				break value;
			}
			self.signal.until_fired().await;
		}
	}
}

impl<T: 'static + Send + Sync> OnceSlot<T> {
	/// Submits `body` with the value to `executor` once the slot is filled.
	///
	/// This is always asynchronous, even if the slot is already filled.
	pub fn on_filled(
		self: &Arc<Self>,
		executor: impl 'static + Executor,
		body: impl 'static + Send + FnOnce(&T),
	) -> Registration {
		let this = Arc::clone(self);
		self.signal.register(executor, move || {
			let value = this.peek();
			debug_assert!(value.is_some(), "Slot signal fired while empty.");
			if let Some(value) = value {
				body(value);
			}
		})
	}
}

impl<T> Default for OnceSlot<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Drop for OnceSlot<T> {
	fn drop(&mut self) {
		if *self.state.get_mut() == FILLED {
			// SAFETY: Filled means initialised, and `&mut self` means nobody else holds a reference.
			unsafe { self.value.get_mut().assume_init_drop() };
		}
	}
}

impl<T: Debug> Debug for OnceSlot<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("OnceSlot")
			.field("value", &self.peek())
			.finish_non_exhaustive()
	}
}
