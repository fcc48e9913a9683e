use std::{
	any::Any,
	error::Error as StdError,
	fmt::{self, Debug, Display, Formatter},
	sync::Arc,
};

/// Why a [`Task`](`crate::Task`) failed.
///
/// This can carry any error. Clones share the same underlying error, so every reader of a failed
/// task (and every [`fallback`](`crate::Task::fallback`) re-raising it) sees the very same one.
#[derive(Clone)]
pub struct Error(Arc<anyhow::Error>);

/// The error a producer reports when it stopped because it was asked to.
///
/// See [`CancellationToken::check`](`crate::CancellationToken::check`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, thiserror::Error)]
#[error("the task was cancelled")]
pub struct Cancelled;

/// A producer, `recover` or retry callback panicked instead of returning.
#[derive(Debug, Clone, thiserror::Error)]
#[error("the task panicked: {message}")]
pub(crate) struct Panicked {
	message: String,
}

impl Panicked {
	pub(crate) fn new(payload: &(dyn Any + Send)) -> Self {
		let message = payload
			.downcast_ref::<&str>()
			.map(|message| (*message).to_owned())
			.or_else(|| payload.downcast_ref::<String>().cloned())
			.unwrap_or_else(|| "<non-string panic payload>".to_owned());
		Self { message }
	}
}

impl Error {
	/// Wraps `error`.
	pub fn new(error: impl Into<anyhow::Error>) -> Self {
		Self(Arc::new(error.into()))
	}

	/// An error that is just a message.
	pub fn msg<M: 'static + Display + Debug + Send + Sync>(message: M) -> Self {
		Self::new(anyhow::Error::msg(message))
	}

	/// The underlying error as `E`, if it is one.
	#[must_use]
	pub fn downcast_ref<E: 'static + Display + Debug + Send + Sync>(&self) -> Option<&E> {
		self.0.downcast_ref()
	}

	/// Whether this is [`Cancelled`].
	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		self.downcast_ref::<Cancelled>().is_some()
	}

	/// Whether `this` and `other` are clones of the same error.
	#[must_use]
	pub fn ptr_eq(this: &Self, other: &Self) -> bool {
		Arc::ptr_eq(&this.0, &other.0)
	}

	/// The underlying [`anyhow::Error`].
	#[must_use]
	pub fn as_anyhow(&self) -> &anyhow::Error {
		&self.0
	}
}

impl<E: 'static + StdError + Send + Sync> From<E> for Error {
	fn from(error: E) -> Self {
		Self::new(error)
	}
}

impl Debug for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Debug::fmt(&*self.0, f)
	}
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Display::fmt(&*self.0, f)
	}
}
