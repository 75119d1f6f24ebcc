//! Time sources for the scheduler.
//!
//! The scheduler never reads the system time directly. It asks an injected
//! [`Clock`], which keeps task ordering deterministic under test.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// A monotonic millisecond time source.
pub trait Clock {
	/// Current time in milliseconds. Must never go backwards.
	fn now(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Box<C> {
	fn now(&self) -> u64 {
		(**self).now()
	}
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
	fn now(&self) -> u64 {
		(**self).now()
	}
}

/// Wall clock measured from the moment the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
	origin: Instant,
}

impl SystemClock {
	/// Create a clock whose time zero is now.
	pub fn new() -> Self {
		Self {
			origin: Instant::now(),
		}
	}
}

impl Default for SystemClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for SystemClock {
	fn now(&self) -> u64 {
		u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
	}
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle
/// while the scheduler owns another.
///
/// ## Example
///
/// ```
/// use arbor_scheduler::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let handle = clock.clone();
/// handle.advance(16);
/// assert_eq!(clock.now(), 16);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
	now: Rc<Cell<u64>>,
}

impl ManualClock {
	/// Create a clock starting at time zero.
	pub fn new() -> Self {
		Self::default()
	}

	/// Move the clock forward by `ms` milliseconds.
	pub fn advance(&self, ms: u64) {
		self.now.set(self.now.get().saturating_add(ms));
	}

	/// Jump to an absolute time. Panics if `ms` is in the past.
	pub fn set(&self, ms: u64) {
		assert!(
			ms >= self.now.get(),
			"ManualClock cannot go backwards ({} -> {})",
			self.now.get(),
			ms
		);
		self.now.set(ms);
	}
}

impl Clock for ManualClock {
	fn now(&self) -> u64 {
		self.now.get()
	}
}
