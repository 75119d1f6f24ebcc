//! Task records and callback types.

use std::fmt;

use crate::Priority;
use crate::scheduler::Scheduler;

/// Unique, monotonically increasing task identifier.
///
/// Ids break ties between tasks with the same expiration time, so tasks of
/// equal priority run in the order they were scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
	/// Raw numeric id.
	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for TaskId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "task#{}", self.0)
	}
}

/// A unit of work queued on the scheduler.
pub type TaskCallback = Box<dyn FnOnce(&TaskContext<'_>) -> TaskOutcome>;

/// What a task callback reports back to the work loop.
pub enum TaskOutcome {
	/// The task finished and can be removed from the queue.
	Complete,
	/// The task yielded mid-work. The continuation replaces the task's
	/// callback and the loop returns control to the host.
	Yield(TaskCallback),
}

impl TaskOutcome {
	/// Yield with `continuation` as the task's next callback.
	pub fn yield_with<F>(continuation: F) -> Self
	where
		F: FnOnce(&TaskContext<'_>) -> TaskOutcome + 'static,
	{
		TaskOutcome::Yield(Box::new(continuation))
	}

	/// Whether this outcome carries a continuation.
	pub fn is_yield(&self) -> bool {
		matches!(self, TaskOutcome::Yield(_))
	}
}

impl fmt::Debug for TaskOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TaskOutcome::Complete => f.write_str("Complete"),
			TaskOutcome::Yield(_) => f.write_str("Yield(..)"),
		}
	}
}

/// Context handed to a running task.
pub struct TaskContext<'a> {
	pub(crate) scheduler: &'a Scheduler,
	pub(crate) task: TaskId,
	pub(crate) did_timeout: bool,
}

impl<'a> TaskContext<'a> {
	/// The scheduler running this task.
	pub fn scheduler(&self) -> &'a Scheduler {
		self.scheduler
	}

	/// Id of the running task.
	pub fn task_id(&self) -> TaskId {
		self.task
	}

	/// True when the task's expiration time had passed before it started.
	///
	/// Expired work should finish without consulting [`should_yield`](Self::should_yield).
	pub fn did_timeout(&self) -> bool {
		self.did_timeout
	}

	/// Whether the current time slice is used up.
	pub fn should_yield(&self) -> bool {
		self.scheduler.should_yield()
	}
}

/// Heap ordering key. Field order matters: `sort_index` first, then `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct HeapKey {
	pub(crate) sort_index: u64,
	pub(crate) id: TaskId,
}

pub(crate) struct Task {
	pub(crate) priority: Priority,
	pub(crate) expiration_time: u64,
	/// `None` once the task completed while not at the top of the heap; the
	/// loop discards such entries when it reaches them.
	pub(crate) callback: Option<TaskCallback>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_heap_key_orders_by_sort_index_then_id() {
		let a = HeapKey {
			sort_index: 10,
			id: TaskId(2),
		};
		let b = HeapKey {
			sort_index: 10,
			id: TaskId(1),
		};
		let c = HeapKey {
			sort_index: 5,
			id: TaskId(3),
		};

		let mut keys = vec![a, b, c];
		keys.sort();
		assert_eq!(keys, vec![c, b, a]);
	}
}
