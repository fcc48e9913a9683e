use std::time::{Duration, Instant};

/// How long a blocking wait may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
	/// Don't block at all, only check.
	Now,
	/// Block until the wait is satisfied.
	Forever,
	/// Block for at most this long.
	After(Duration),
}

impl Timeout {
	/// The point in time this timeout expires at, starting now.
	///
	/// [`None`] means "never", including for intervals too large to represent.
	pub(crate) fn deadline(self) -> Option<Instant> {
		match self {
			Timeout::Now => Some(Instant::now()),
			Timeout::Forever => None,
			Timeout::After(interval) => Instant::now().checked_add(interval),
		}
	}
}

impl From<Duration> for Timeout {
	fn from(interval: Duration) -> Self {
		Self::After(interval)
	}
}

impl From<Option<Duration>> for Timeout {
	/// [`None`] waits [`Forever`](`Timeout::Forever`).
	fn from(interval: Option<Duration>) -> Self {
		interval.map_or(Self::Forever, Self::After)
	}
}
