//! [`CompletionSignal`] is a broadcast-once notification.
//!
//! It starts out pending and [fires](`CompletionSignal::fire`) exactly once. Continuations
//! [registered](`CompletionSignal::register`) before *or* after that are each submitted to their
//! [`Executor`] exactly once.
//!
//! # Implementation Notes
//!
//! A single [`AtomicPtr`] holds both pieces of state: the [`FIRED`] marker, or otherwise the head of
//! a push-only list of pending registrations. Firing swaps the marker in, which both flips the
//! state and detaches the list in one step, so a registration either lands in the list that the
//! firing thread drains or observes the marker and dispatches itself. Nodes are never unlinked
//! individually, which rules out ABA.
//!
//! Cancelling a [`Registration`] doesn't unlink it either. It flips the registration's own state,
//! so a cancelled node is skipped (and freed) once the list is drained.

use std::{
	cell::UnsafeCell,
	fmt::{self, Debug, Formatter},
	ptr,
	sync::{
		atomic::{AtomicPtr, AtomicU8, Ordering},
		Arc,
	},
};

use event_listener::{Event, Listener};
use tracing::trace;

use crate::{Executor, Job, Timeout};

/// Stands in for the list head once fired. Never the address of a [`Node`], since it's misaligned.
const FIRED: *mut Node = ptr::without_provenance_mut(1);

const PENDING: u8 = 0;
const SCHEDULED: u8 = 1;
const RUNNING: u8 = 2;
const CANCELLED: u8 = 3;

/// A broadcast-once notification. See the [module documentation](`self`).
pub struct CompletionSignal {
	/// [`FIRED`], or the newest pending registration (nullable).
	head: AtomicPtr<Node>,
	/// Blocked and async waiters. These don't go through an [`Executor`].
	waiters: Event,
}

struct Node {
	next: *mut Node,
	submit: Box<dyn Send + FnOnce(Job)>,
	entry: Arc<Entry>,
}

struct Entry {
	state: AtomicU8,
	continuation: UnsafeCell<Option<Job>>,
}

/// Handle to one [registered](`CompletionSignal::register`) continuation.
///
/// Dropping this handle does **not** cancel the continuation.
pub struct Registration {
	entry: Arc<Entry>,
}

// SAFETY: `continuation` is only touched by the one thread that moves `state` from
// `PENDING`/`SCHEDULED` into `RUNNING` or `CANCELLED`, which can happen only once.
unsafe impl Sync for Entry {}

impl Entry {
	/// # Safety
	///
	/// The caller **must** have just moved `state` into `RUNNING` or `CANCELLED`.
	unsafe fn take(&self) -> Option<Job> {
		unsafe { (*self.continuation.get()).take() }
	}

	fn run(&self) {
		if self
			.state
			.compare_exchange(SCHEDULED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
			.is_ok()
		{
			// SAFETY: Just moved into `RUNNING`.
			if let Some(continuation) = unsafe { self.take() } {
				continuation();
			}
		}
	}

	fn cancel(&self) -> bool {
		let mut state = self.state.load(Ordering::Acquire);
		while matches!(state, PENDING | SCHEDULED) {
			match self.state.compare_exchange_weak(
				state,
				CANCELLED,
				Ordering::AcqRel,
				Ordering::Acquire,
			) {
				Ok(_) => {
					// SAFETY: Just moved into `CANCELLED`.
					drop(unsafe { self.take() });
					return true;
				}
				Err(actual) => state = actual,
			}
		}
		false
	}
}

impl Node {
	/// Hands the continuation to its executor unless it was cancelled.
	fn dispatch(self: Box<Self>) -> bool {
		let Node { submit, entry, .. } = *self;
		if entry
			.state
			.compare_exchange(PENDING, SCHEDULED, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			return false;
		}
		submit(Box::new(move || entry.run()));
		true
	}
}

/// Takes ownership of a detached list, oldest registration first.
///
/// # Safety
///
/// `head` **must** be null or the head of a list that is unreachable for any other thread.
unsafe fn detach(mut head: *mut Node) -> Vec<Box<Node>> {
	let mut nodes = Vec::new();
	while !head.is_null() {
		// SAFETY: Each node was leaked from a `Box` and is now exclusively ours.
		let node = unsafe { Box::from_raw(head) };
		head = node.next;
		nodes.push(node);
	}
	nodes.reverse();
	nodes
}

impl CompletionSignal {
	/// Creates a new pending signal.
	#[must_use]
	pub fn new() -> Self {
		Self {
			head: AtomicPtr::new(ptr::null_mut()),
			waiters: Event::new(),
		}
	}

	/// Creates a signal that has already fired.
	#[must_use]
	pub fn fired() -> Self {
		Self {
			head: AtomicPtr::new(FIRED),
			waiters: Event::new(),
		}
	}

	/// Whether [`.fire()`](`CompletionSignal::fire`) has happened. Doesn't block.
	#[must_use]
	pub fn is_fired(&self) -> bool {
		self.head.load(Ordering::SeqCst) == FIRED
	}

	/// Schedules `continuation` to be submitted to `executor` once this signal fires.
	///
	/// If the signal already fired, the continuation is submitted right away, but still never
	/// runs inside this call.
	pub fn register(
		&self,
		executor: impl 'static + Executor,
		continuation: impl 'static + Send + FnOnce(),
	) -> Registration {
		let entry = Arc::new(Entry {
			state: AtomicU8::new(PENDING),
			continuation: UnsafeCell::new(Some(Box::new(continuation))),
		});
		let node = Box::into_raw(Box::new(Node {
			next: ptr::null_mut(),
			submit: Box::new(move |job| executor.submit(job)),
			entry: Arc::clone(&entry),
		}));

		let mut head = self.head.load(Ordering::Acquire);
		loop {
			if head == FIRED {
				// SAFETY: `node` was never published.
				unsafe { Box::from_raw(node) }.dispatch();
				break;
			}

			// SAFETY: `node` isn't published yet, so this write is still exclusive.
			unsafe { (*node).next = head };
			match self.head.compare_exchange_weak(
				head,
				node,
				Ordering::AcqRel,
				Ordering::Acquire,
			) {
				Ok(_) => break,
				Err(actual) => head = actual,
			}
		}

		Registration { entry }
	}

	/// Fires this signal, dispatching every pending registration.
	///
	/// **Returns** whether this call fired the signal. Later calls are no-ops.
	pub fn fire(&self) -> bool {
		let head = self.head.swap(FIRED, Ordering::SeqCst);
		if head == FIRED {
			return false;
		}
		self.waiters.notify(usize::MAX);

		// SAFETY: Swapping in `FIRED` detached the list. No other thread can reach it anymore.
		let nodes = unsafe { detach(head) };
		let registered = nodes.len();
		let dispatched = nodes
			.into_iter()
			.map(Node::dispatch)
			.filter(|&dispatched| dispatched)
			.count();
		trace!(registered, dispatched, "Completion signal fired.");
		true
	}

	/// Blocks the calling thread until this signal fires or `timeout` elapses.
	///
	/// **Returns** whether the signal fired.
	///
	/// # Threading
	///
	/// This doesn't occupy any [`Executor`]: the calling thread is woken directly by
	/// [`.fire()`](`CompletionSignal::fire`). Any number of threads may wait at once.
	pub fn wait_until_fired(&self, timeout: impl Into<Timeout>) -> bool {
		if self.is_fired() {
			return true;
		}

		let deadline = timeout.into().deadline();
		loop {
			let listener = self.waiters.listen();
			if self.is_fired() {
				return true;
			}

			match deadline {
				None => listener.wait(),
				Some(deadline) => {
					// Dropping the expired listener unregisters it.
					if listener.wait_deadline(deadline).is_none() {
						let fired = self.is_fired();
						if !fired {
							trace!("Timed out waiting for completion signal.");
						}
						return fired;
					}
				}
			}

			if self.is_fired() {
				return true;
			}
		}
	}

	/// Resolves once this signal has fired.
	pub async fn until_fired(&self) {
		while !self.is_fired() {
			let listener = self.waiters.listen();
			if self.is_fired() {
				break;
			}
			listener.await;
		}
	}
}

impl Default for CompletionSignal {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for CompletionSignal {
	fn drop(&mut self) {
		let head = *self.head.get_mut();
		if head != FIRED {
			// SAFETY: `&mut self`, so the list is exclusively ours.
			for node in unsafe { detach(head) } {
				node.entry.cancel();
			}
		}
	}
}

impl Debug for CompletionSignal {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("CompletionSignal")
			.field("fired", &self.is_fired())
			.finish_non_exhaustive()
	}
}

impl Registration {
	/// Requests that the continuation not run.
	///
	/// This succeeds while the signal is pending, and also after firing as long as the executor
	/// hasn't started the continuation yet. A cancelled continuation is dropped right away.
	///
	/// **Returns** whether this call cancelled it.
	#[allow(clippy::must_use_candidate)]
	pub fn cancel(&self) -> bool {
		let cancelled = self.entry.cancel();
		if cancelled {
			trace!("Cancelled registration.");
		}
		cancelled
	}

	/// Whether the registration was cancelled (by any means) before it could run.
	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		self.entry.state.load(Ordering::Acquire) == CANCELLED
	}

	/// Whether the executor started the continuation.
	#[must_use]
	pub fn has_started(&self) -> bool {
		self.entry.state.load(Ordering::Acquire) == RUNNING
	}
}

impl Debug for Registration {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let state = match self.entry.state.load(Ordering::Acquire) {
			PENDING => "pending",
			SCHEDULED => "scheduled",
			RUNNING => "started",
			_ => "cancelled",
		};
		f.debug_struct("Registration")
			.field("state", &state)
			.finish()
	}
}
