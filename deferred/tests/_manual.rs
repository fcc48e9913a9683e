#![allow(dead_code)]

use std::{mem, sync::Mutex};

use deferred::{Executor, Job};

/// An executor that only runs jobs when told to, on the calling thread.
#[derive(Default)]
pub struct Manual(Mutex<Vec<Job>>);

impl Manual {
	pub fn queued(&self) -> usize {
		self.0.lock().unwrap().len()
	}

	/// Runs everything queued so far, including jobs queued while doing so.
	pub fn run_all(&self) -> usize {
		let mut count = 0;
		loop {
			let jobs = mem::take(&mut *self.0.lock().unwrap());
			if jobs.is_empty() {
				break count;
			}
			count += jobs.len();
			for job in jobs {
				job();
			}
		}
	}
}

impl Executor for Manual {
	fn submit(&self, job: Job) {
		self.0.lock().unwrap().push(job);
	}
}
