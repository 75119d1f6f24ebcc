//! Scheduler error types.

use thiserror::Error;

/// Result type for scheduler construction.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler errors.
///
/// Running tasks is infallible; a panicking task unwinds through
/// [`Scheduler::perform_work_until_deadline`](crate::Scheduler::perform_work_until_deadline).
/// Only configuration can be rejected.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchedulerError {
	/// A frame interval of zero would yield before every task.
	#[error("frame interval must be at least 1ms, got {0}ms")]
	InvalidFrameInterval(u64),
}
