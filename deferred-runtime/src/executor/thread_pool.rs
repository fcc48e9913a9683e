use std::{
	collections::VecDeque,
	fmt::{self, Debug, Formatter},
	io,
	num::NonZeroUsize,
	panic::{catch_unwind, AssertUnwindSafe},
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
	thread::{self, JoinHandle},
};

use parking_lot::{Condvar, Mutex};
use scopeguard::guard;
use tracing::{debug, trace, warn};

use super::{Executor, Job, Priority};

/// A fixed set of worker threads draining one FIFO queue per [`Priority`].
///
/// Workers always take from the most urgent non-empty queue first.
/// A panicking job is caught and logged; its worker keeps running.
///
/// Dropping the pool lets the workers finish everything already queued, then joins them.
/// Jobs submitted through a [`ThreadPoolHandle`] after that are dropped with a warning.
pub struct ThreadPool {
	shared: Arc<Shared>,
	workers: Vec<JoinHandle<()>>,
}

/// An [`Executor`] submitting to one queue class of a [`ThreadPool`].
#[derive(Clone)]
pub struct ThreadPoolHandle {
	shared: Arc<Shared>,
	priority: Priority,
}

/// Configures a [`ThreadPool`] before starting its workers.
#[derive(Debug, Clone)]
#[must_use]
pub struct ThreadPoolBuilder {
	threads: Option<NonZeroUsize>,
	name: String,
}

struct Shared {
	name: String,
	queues: Mutex<Queues>,
	available: Condvar,
	live_workers: AtomicUsize,
}

struct Queues {
	by_priority: [VecDeque<Job>; Priority::COUNT],
	shutting_down: bool,
}

impl Queues {
	fn pop(&mut self) -> Option<Job> {
		self.by_priority.iter_mut().find_map(VecDeque::pop_front)
	}
}

impl ThreadPoolBuilder {
	/// Defaults to one worker per available hardware thread.
	pub fn threads(mut self, threads: NonZeroUsize) -> Self {
		self.threads = Some(threads);
		self
	}

	/// Prefix for the worker thread names.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	/// Starts the workers.
	///
	/// # Errors
	///
	/// Iff a worker thread couldn't be spawned. Workers started before that are shut down again.
	pub fn build(self) -> io::Result<ThreadPool> {
		let threads = self
			.threads
			.or_else(|| thread::available_parallelism().ok())
			.unwrap_or(NonZeroUsize::MIN);

		let mut pool = ThreadPool {
			shared: Arc::new(Shared {
				name: self.name,
				queues: Mutex::new(Queues {
					by_priority: Default::default(),
					shutting_down: false,
				}),
				available: Condvar::new(),
				live_workers: AtomicUsize::new(0),
			}),
			workers: Vec::with_capacity(threads.get()),
		};

		for index in 0..threads.get() {
			let shared = Arc::clone(&pool.shared);
			let worker = thread::Builder::new()
				.name(format!("{}-{index}", pool.shared.name))
				.spawn(move || run_worker(&shared, index))?;
			pool.workers.push(worker);
		}
		debug!(name = %pool.shared.name, threads = threads.get(), "Started thread pool.");
		Ok(pool)
	}
}

impl Default for ThreadPoolBuilder {
	fn default() -> Self {
		Self {
			threads: None,
			name: "deferred-pool".to_owned(),
		}
	}
}

impl ThreadPool {
	/// Starts a pool with `threads` workers.
	///
	/// # Errors
	///
	/// See [`ThreadPoolBuilder::build`].
	pub fn new(threads: NonZeroUsize) -> io::Result<Self> {
		Self::builder().threads(threads).build()
	}

	/// See [`ThreadPoolBuilder`].
	pub fn builder() -> ThreadPoolBuilder {
		ThreadPoolBuilder::default()
	}

	/// An [`Executor`] for the `priority` queue of this pool.
	#[must_use]
	pub fn handle(&self, priority: Priority) -> ThreadPoolHandle {
		ThreadPoolHandle {
			shared: Arc::clone(&self.shared),
			priority,
		}
	}

	/// Queues `job` with `priority`.
	pub fn submit_at(&self, priority: Priority, job: Job) {
		self.shared.submit(priority, job);
	}

	/// The number of workers this pool was started with.
	#[must_use]
	pub fn threads(&self) -> usize {
		self.workers.len()
	}

	/// The number of workers currently running their loop.
	#[must_use]
	pub fn live_workers(&self) -> usize {
		self.shared.live_workers.load(Ordering::Acquire)
	}
}

impl Executor for ThreadPool {
	fn submit(&self, job: Job) {
		self.shared.submit(Priority::Default, job);
	}
}

impl Executor for ThreadPoolHandle {
	fn submit(&self, job: Job) {
		self.shared.submit(self.priority, job);
	}
}

impl ThreadPoolHandle {
	/// The queue class this handle submits to.
	#[must_use]
	pub fn priority(&self) -> Priority {
		self.priority
	}

	/// The same pool, another queue class.
	#[must_use]
	pub fn with_priority(&self, priority: Priority) -> Self {
		Self {
			shared: Arc::clone(&self.shared),
			priority,
		}
	}
}

impl Shared {
	fn submit(&self, priority: Priority, job: Job) {
		let mut queues = self.queues.lock();
		if queues.shutting_down {
			drop(queues);
			warn!(name = %self.name, ?priority, "Thread pool is shut down, dropping job.");
			return;
		}
		queues.by_priority[priority.index()].push_back(job);
		drop(queues);
		self.available.notify_one();
	}
}

fn run_worker(shared: &Shared, index: usize) {
	shared.live_workers.fetch_add(1, Ordering::AcqRel);
	let _live = guard((), |()| {
		shared.live_workers.fetch_sub(1, Ordering::AcqRel);
		trace!(name = %shared.name, worker = index, "Worker stopped.");
	});

	loop {
		let job = {
			let mut queues = shared.queues.lock();
			loop {
				if let Some(job) = queues.pop() {
					break job;
				}
				if queues.shutting_down {
					return;
				}
				shared.available.wait(&mut queues);
			}
		};

		if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
			let message = payload
				.downcast_ref::<&str>()
				.copied()
				.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
				.unwrap_or("<non-string panic payload>");
			warn!(name = %shared.name, worker = index, panic = message, "Job panicked.");
		}
	}
}

impl Drop for ThreadPool {
	fn drop(&mut self) {
		self.shared.queues.lock().shutting_down = true;
		self.shared.available.notify_all();

		// A job may drop the last owner of its own pool.
		let current = thread::current().id();
		for worker in self.workers.drain(..) {
			if worker.thread().id() == current {
				continue;
			}
			if worker.join().is_err() {
				warn!(name = %self.shared.name, "Worker thread panicked outside of a job.");
			}
		}
	}
}

impl Debug for ThreadPool {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ThreadPool")
			.field("name", &self.shared.name)
			.field("threads", &self.workers.len())
			.finish_non_exhaustive()
	}
}

impl Debug for ThreadPoolHandle {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ThreadPoolHandle")
			.field("name", &self.shared.name)
			.field("priority", &self.priority)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::{sync::mpsc, time::Duration};

	use super::*;

	#[test]
	fn higher_priority_first() {
		let pool = ThreadPool::new(NonZeroUsize::MIN).unwrap();
		let (gate_tx, gate_rx) = mpsc::channel::<()>();
		let (tx, rx) = mpsc::channel();

		// Occupy the only worker so the following jobs queue up.
		pool.submit_at(
			Priority::Default,
			Box::new(move || gate_rx.recv().unwrap()),
		);
		for priority in [Priority::Background, Priority::Utility, Priority::UserInitiated] {
			let tx = tx.clone();
			pool.submit_at(priority, Box::new(move || tx.send(priority).unwrap()));
		}
		gate_tx.send(()).unwrap();

		let order: Vec<_> = (0..3)
			.map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
			.collect();
		assert_eq!(
			order,
			[Priority::UserInitiated, Priority::Utility, Priority::Background]
		);
	}

	#[test]
	fn survives_panicking_job() {
		let pool = ThreadPool::new(NonZeroUsize::MIN).unwrap();
		let (tx, rx) = mpsc::channel();

		pool.submit_at(Priority::Default, Box::new(|| panic!("job failure")));
		pool.submit_at(Priority::Default, Box::new(move || tx.send(()).unwrap()));

		rx.recv_timeout(Duration::from_secs(5)).unwrap();
		assert_eq!(pool.live_workers(), 1);
	}

	#[test]
	fn drop_drains_queue() {
		let pool = ThreadPool::new(NonZeroUsize::new(2).unwrap()).unwrap();
		let (tx, rx) = mpsc::channel();
		for n in 0..100 {
			let tx = tx.clone();
			pool.submit_at(Priority::Utility, Box::new(move || tx.send(n).unwrap()));
		}
		drop(tx);
		drop(pool);

		let mut received: Vec<i32> = rx.iter().collect();
		received.sort_unstable();
		assert_eq!(received, (0..100).collect::<Vec<_>>());
	}

	#[test]
	fn handle_outliving_pool_drops_jobs() {
		let pool = ThreadPool::new(NonZeroUsize::MIN).unwrap();
		let handle = pool.handle(Priority::Background);
		drop(pool);

		let marker = Arc::new(());
		let job_marker = Arc::clone(&marker);
		handle.submit(Box::new(move || drop(job_marker)));
		assert_eq!(Arc::strong_count(&marker), 1);
	}
}
