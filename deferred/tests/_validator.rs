#![allow(dead_code)]

use std::{collections::VecDeque, fmt::Debug, sync::Mutex};

/// Records events from any thread, for asserting on them afterwards.
pub struct Validator<T>(Mutex<VecDeque<T>>);

impl<T> Validator<T> {
	pub const fn new() -> Self {
		Self(Mutex::new(VecDeque::new()))
	}

	pub fn push(&self, value: T) {
		self.0.lock().unwrap().push_back(value);
	}

	pub fn len(&self) -> usize {
		self.0.lock().unwrap().len()
	}

	#[track_caller]
	pub fn expect(&self, expected: impl IntoIterator<Item = T>)
	where
		T: Debug + Eq,
	{
		let mut binding = self.0.lock().unwrap();
		let mut a = binding.drain(..);
		let mut b = expected.into_iter();
		loop {
			match (a.next(), b.next()) {
				(None, None) => break,
				(a, b) => assert_eq!(a, b),
			}
		}
	}

	/// Like [`Validator::expect`], for events without a defined order.
	#[track_caller]
	pub fn expect_unordered(&self, expected: impl IntoIterator<Item = T>)
	where
		T: Debug + Ord,
	{
		let mut actual: Vec<T> = self.0.lock().unwrap().drain(..).collect();
		let mut expected: Vec<T> = expected.into_iter().collect();
		actual.sort();
		expected.sort();
		assert_eq!(actual, expected);
	}
}
