//! Task priorities and their timeouts.
//!
//! A priority maps to a timeout that is added to the current time when a
//! task is scheduled. The resulting expiration time is the task's sort key,
//! so higher priorities run first and equal priorities run in enqueue order.

use serde::{Deserialize, Serialize};

/// Timeout for [`Priority::Immediate`]; the task is already expired when queued.
pub const IMMEDIATE_PRIORITY_TIMEOUT: i64 = -1;
/// Timeout for [`Priority::UserBlocking`].
pub const USER_BLOCKING_PRIORITY_TIMEOUT: i64 = 250;
/// Timeout for [`Priority::Normal`].
pub const NORMAL_PRIORITY_TIMEOUT: i64 = 5000;
/// Timeout for [`Priority::Low`].
pub const LOW_PRIORITY_TIMEOUT: i64 = 10000;
/// Timeout for [`Priority::Idle`]. Max 31 bit integer, so idle tasks never expire in practice.
pub const IDLE_PRIORITY_TIMEOUT: i64 = 1_073_741_823;

/// Scheduling weight of a task.
///
/// Variants are ordered from most to least urgent, so `Priority::Immediate < Priority::Idle`.
///
/// ## Example
///
/// ```
/// use arbor_scheduler::Priority;
///
/// assert!(Priority::Immediate < Priority::Normal);
/// assert_eq!(Priority::UserBlocking.timeout(), 250);
/// ```
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
	/// Must run before anything else, including time slicing.
	Immediate,
	/// Result of direct user interaction (clicks, key presses).
	UserBlocking,
	/// Default priority for updates.
	#[default]
	Normal,
	/// Work that can be deferred.
	Low,
	/// Work that runs only when nothing else is pending.
	Idle,
}

impl Priority {
	/// All priorities from most to least urgent.
	pub const ALL: [Priority; 5] = [
		Priority::Immediate,
		Priority::UserBlocking,
		Priority::Normal,
		Priority::Low,
		Priority::Idle,
	];

	/// Timeout in milliseconds added to the current time to get the expiration time.
	pub const fn timeout(self) -> i64 {
		match self {
			Priority::Immediate => IMMEDIATE_PRIORITY_TIMEOUT,
			Priority::UserBlocking => USER_BLOCKING_PRIORITY_TIMEOUT,
			Priority::Normal => NORMAL_PRIORITY_TIMEOUT,
			Priority::Low => LOW_PRIORITY_TIMEOUT,
			Priority::Idle => IDLE_PRIORITY_TIMEOUT,
		}
	}

	/// Expiration time of a task scheduled at `now` with this priority.
	///
	/// Saturates at zero, so an immediate task scheduled at time zero is
	/// already expired.
	pub fn expiration_from(self, now: u64) -> u64 {
		now.saturating_add_signed(self.timeout())
	}
}
