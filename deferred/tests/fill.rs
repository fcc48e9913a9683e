use std::{
	sync::{Arc, Barrier},
	thread,
};

use deferred::Deferred;
use proptest::prelude::*;

#[test]
fn fill_once() {
	let d = Deferred::new();
	assert!(!d.is_filled());
	assert_eq!(d.peek(), None);

	assert!(d.fill(1));
	assert!(!d.fill(2));
	assert_eq!(d.try_fill(3), Err(3));

	assert!(d.is_filled());
	assert_eq!(d.peek(), Some(&1));
}

#[test]
fn with_value() {
	let d = Deferred::with_value("ready");
	assert!(d.is_filled());
	assert!(!d.fill("late"));
	assert_eq!(d.peek(), Some(&"ready"));
}

#[test]
fn clones_alias() {
	let a = Deferred::new();
	let before = a.clone();
	assert!(Deferred::ptr_eq(&a, &before));
	assert!(!Deferred::ptr_eq(&a, &Deferred::new()));

	assert!(a.fill(String::from("shared")));
	let after = a.clone();

	assert_eq!(before.peek().map(String::as_str), Some("shared"));
	assert_eq!(after.peek().map(String::as_str), Some("shared"));
	assert!(!before.fill(String::from("other")));
	assert_eq!(a.peek().map(String::as_str), Some("shared"));
}

#[test]
fn value_released_with_last_handle() {
	let value = Arc::new(());
	let a = Deferred::new();
	let b = a.clone();
	assert!(a.fill(Arc::clone(&value)));

	drop(a);
	assert_eq!(Arc::strong_count(&value), 2);
	drop(b);
	assert_eq!(Arc::strong_count(&value), 1);
}

#[test]
fn losing_fill_is_released() {
	let d = Deferred::with_value(Arc::new(0));
	let loser = Arc::new(1);
	assert!(!d.fill(Arc::clone(&loser)));
	assert_eq!(Arc::strong_count(&loser), 1);
}

fn race(threads: usize) -> (usize, usize, Deferred<usize>) {
	let d = Deferred::new();
	let barrier = Arc::new(Barrier::new(threads));
	let handles: Vec<_> = (0..threads)
		.map(|n| {
			let (d, barrier) = (d.clone(), Arc::clone(&barrier));
			thread::spawn(move || {
				barrier.wait();
				d.fill(n).then_some(n)
			})
		})
		.collect();

	let winners: Vec<usize> = handles
		.into_iter()
		.filter_map(|handle| handle.join().unwrap())
		.collect();
	assert_eq!(winners.len(), 1);
	(winners[0], winners.len(), d)
}

#[test]
fn concurrent_fills_have_one_winner() {
	let (winner, _, d) = race(16);
	for _ in 0..100 {
		assert_eq!(d.peek(), Some(&winner));
	}
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(24))]

	#[test]
	fn at_most_one_fill(threads in 1_usize..12) {
		let (winner, winners, d) = race(threads);
		prop_assert_eq!(winners, 1);
		prop_assert!(winner < threads);
		let alias = d.clone();
		prop_assert_eq!(alias.peek(), Some(&winner));
	}
}
