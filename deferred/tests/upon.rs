use std::{
	num::NonZeroUsize,
	sync::{mpsc, Arc},
	thread,
	time::Duration,
};

use deferred::{Deferred, GlobalExecutor, Priority, ThreadPool};

mod _manual;
use _manual::Manual;

mod _validator;
use _validator::Validator;

#[test]
fn upon_is_asynchronous_when_filled() {
	let v = Arc::new(Validator::new());
	let executor = Arc::new(Manual::default());
	let d = Deferred::with_value(5);

	d.upon(Arc::clone(&executor), {
		let v = Arc::clone(&v);
		move |value| v.push(*value)
	});
	v.expect([]);
	assert_eq!(executor.queued(), 1);

	executor.run_all();
	v.expect([5]);
}

#[test]
fn upon_waits_for_fill() {
	let v = Arc::new(Validator::new());
	let executor = Arc::new(Manual::default());
	let d = Deferred::new();

	for tag in ["a", "b"] {
		let v = Arc::clone(&v);
		d.upon(Arc::clone(&executor), move |value: &&str| v.push(format!("{tag}{value}")));
	}
	assert_eq!(executor.run_all(), 0);

	assert!(d.fill("!"));
	v.expect([]);
	assert_eq!(executor.run_all(), 2);
	v.expect_unordered(["a!".to_owned(), "b!".to_owned()]);
}

#[test]
fn cancelled_upon_does_not_run() {
	let v = Arc::new(Validator::<i32>::new());
	let executor = Arc::new(Manual::default());
	let d = Deferred::new();

	let registration = d.upon(Arc::clone(&executor), {
		let v = Arc::clone(&v);
		move |value| v.push(*value)
	});
	assert!(registration.cancel());

	d.fill(1);
	executor.run_all();
	v.expect([]);
}

#[test]
fn ten_concurrent_registrations() {
	let pool = ThreadPool::new(NonZeroUsize::new(4).unwrap()).unwrap();
	let d = Deferred::new();
	let (tx, rx) = mpsc::channel();

	let registrars: Vec<_> = (0..10)
		.map(|_| {
			let (d, tx, executor) = (d.clone(), tx.clone(), pool.handle(Priority::Default));
			thread::spawn(move || {
				d.upon(executor, move |value: &u64| tx.send(*value).unwrap());
			})
		})
		.collect();
	for registrar in registrars {
		registrar.join().unwrap();
	}

	assert!(d.fill(99));
	let received: Vec<u64> = (0..10)
		.map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
		.collect();
	assert_eq!(received, [99; 10]);
	assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn registrations_racing_fill() {
	let d = Deferred::new();
	let (tx, rx) = mpsc::channel();

	let registrars: Vec<_> = (0..4)
		.map(|_| {
			let (d, tx) = (d.clone(), tx.clone());
			thread::spawn(move || {
				for _ in 0..25 {
					let tx = tx.clone();
					d.upon(GlobalExecutor::at(Priority::UserInitiated), move |value: &i32| {
						tx.send(*value).unwrap();
					});
				}
			})
		})
		.collect();
	d.fill(3);
	for registrar in registrars {
		registrar.join().unwrap();
	}
	drop(tx);

	let received: Vec<i32> = rx.iter().collect();
	assert_eq!(received.len(), 100);
	assert!(received.iter().all(|&value| value == 3));
}

#[test]
fn continuation_may_reenter() {
	let executor = Arc::new(Manual::default());
	let outer = Deferred::new();
	let inner = Deferred::new();

	outer.upon(Arc::clone(&executor), {
		let (executor, inner) = (Arc::clone(&executor), inner.clone());
		move |value: &i32| {
			inner.fill(value * 2);
			inner.upon(executor, |_| ());
		}
	});
	outer.fill(21);
	executor.run_all();

	assert_eq!(inner.peek(), Some(&42));
	assert_eq!(executor.queued(), 0);
}
