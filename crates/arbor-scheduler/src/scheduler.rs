//! The cooperative scheduler.
//!
//! Tasks live in a binary min-heap keyed by `(expiration time, id)`. A host
//! tick ([`Scheduler::perform_work_until_deadline`]) runs tasks until the
//! queue is empty or the frame interval is used up. Expired tasks are never
//! interrupted by the time slice.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::error::SchedulerResult;
use crate::priority::Priority;
use crate::task::{HeapKey, Task, TaskCallback, TaskContext, TaskId, TaskOutcome};

type HostCallback = Rc<dyn Fn()>;

/// Priority task scheduler with an injected clock.
///
/// `Scheduler` is a cheap handle; clones share the same queue. It is
/// single-threaded and re-entrant: a running task may schedule more tasks
/// or query [`should_yield`](Self::should_yield).
///
/// ## Example
///
/// ```
/// use arbor_scheduler::{ManualClock, Priority, Scheduler, TaskOutcome};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let scheduler = Scheduler::new(ManualClock::new());
/// let log = Rc::new(RefCell::new(Vec::new()));
///
/// for (name, priority) in [("idle", Priority::Idle), ("now", Priority::Immediate)] {
///     let log = log.clone();
///     scheduler.schedule_callback(priority, move |_| {
///         log.borrow_mut().push(name);
///         TaskOutcome::Complete
///     });
/// }
///
/// scheduler.run_until_idle();
/// assert_eq!(*log.borrow(), vec!["now", "idle"]);
/// ```
#[derive(Clone)]
pub struct Scheduler {
	inner: Rc<SchedulerInner>,
}

struct SchedulerInner {
	clock: Box<dyn Clock>,
	config: SchedulerConfig,
	state: RefCell<SchedulerState>,
	host_callback: RefCell<Option<HostCallback>>,
}

struct SchedulerState {
	task_queue: BinaryHeap<Reverse<HeapKey>>,
	tasks: HashMap<TaskId, Task>,
	task_id_counter: u64,
	is_host_callback_scheduled: bool,
	is_performing_work: bool,
	current_task: Option<TaskId>,
	current_priority: Priority,
	start_time: u64,
}

impl Scheduler {
	/// Create a scheduler with the default configuration.
	pub fn new(clock: impl Clock + 'static) -> Self {
		Self::build(Box::new(clock), SchedulerConfig::default())
	}

	/// Create a scheduler with a validated configuration.
	pub fn with_config(clock: impl Clock + 'static, config: SchedulerConfig) -> SchedulerResult<Self> {
		config.validate()?;
		Ok(Self::build(Box::new(clock), config))
	}

	fn build(clock: Box<dyn Clock>, config: SchedulerConfig) -> Self {
		Self {
			inner: Rc::new(SchedulerInner {
				clock,
				config,
				state: RefCell::new(SchedulerState {
					task_queue: BinaryHeap::new(),
					tasks: HashMap::new(),
					task_id_counter: 1,
					is_host_callback_scheduled: false,
					is_performing_work: false,
					current_task: None,
					current_priority: Priority::Normal,
					start_time: 0,
				}),
				host_callback: RefCell::new(None),
			}),
		}
	}

	/// Register the function that asks the host for a future tick.
	///
	/// It is called whenever a continuation gets armed; the host is expected
	/// to call [`perform_work_until_deadline`](Self::perform_work_until_deadline)
	/// soon after.
	pub fn set_host_callback(&self, callback: impl Fn() + 'static) {
		*self.inner.host_callback.borrow_mut() = Some(Rc::new(callback));
	}

	/// Current time from the injected clock.
	pub fn now(&self) -> u64 {
		self.inner.clock.now()
	}

	/// Frame interval this scheduler yields on.
	pub fn config(&self) -> &SchedulerConfig {
		&self.inner.config
	}

	/// Queue `callback` at `priority`.
	///
	/// # Arguments
	///
	/// * `priority` - Determines the expiration time and therefore the order
	/// * `callback` - Work to run; returns [`TaskOutcome::Yield`] to continue later
	pub fn schedule_callback<F>(&self, priority: Priority, callback: F) -> TaskId
	where
		F: FnOnce(&TaskContext<'_>) -> TaskOutcome + 'static,
	{
		let current_time = self.now();
		let expiration_time = priority.expiration_from(current_time);

		let (id, should_request) = {
			let mut state = self.inner.state.borrow_mut();
			let id = TaskId(state.task_id_counter);
			state.task_id_counter += 1;

			state.tasks.insert(
				id,
				Task {
					priority,
					expiration_time,
					callback: Some(Box::new(callback) as TaskCallback),
				},
			);
			state.task_queue.push(Reverse(HeapKey {
				sort_index: expiration_time,
				id,
			}));

			let should_request = !state.is_host_callback_scheduled && !state.is_performing_work;
			if should_request {
				state.is_host_callback_scheduled = true;
			}
			(id, should_request)
		};

		debug!(
			task = id.get(),
			?priority,
			expiration_time,
			"scheduled callback"
		);

		if should_request {
			self.request_host_callback();
		}
		id
	}

	/// True once the current host tick has run for at least one frame interval.
	pub fn should_yield(&self) -> bool {
		let start_time = self.inner.state.borrow().start_time;
		self.now().saturating_sub(start_time) >= self.inner.config.frame_interval_ms
	}

	/// Priority of the task currently running, or `Normal` outside of a task.
	pub fn current_priority(&self) -> Priority {
		self.inner.state.borrow().current_priority
	}

	/// Id of the task currently running.
	pub fn current_task(&self) -> Option<TaskId> {
		self.inner.state.borrow().current_task
	}

	/// Number of tasks still queued, including a yielded task waiting to resume.
	pub fn pending_tasks(&self) -> usize {
		self.inner
			.state
			.borrow()
			.tasks
			.values()
			.filter(|task| task.callback.is_some())
			.count()
	}

	/// Whether any task is waiting to run.
	pub fn has_pending_work(&self) -> bool {
		self.pending_tasks() > 0
	}

	/// Whether a host tick has been requested and not yet performed.
	pub fn is_host_callback_scheduled(&self) -> bool {
		self.inner.state.borrow().is_host_callback_scheduled
	}

	/// Run one host tick.
	///
	/// Returns `true` when work remains; in that case another host callback
	/// has already been requested.
	pub fn perform_work_until_deadline(&self) -> bool {
		let start_time = self.now();
		{
			let mut state = self.inner.state.borrow_mut();
			state.is_host_callback_scheduled = false;
			state.is_performing_work = true;
			state.start_time = start_time;
		}

		let has_more_work = {
			let _guard = WorkGuard { scheduler: self };
			self.work_loop(start_time)
		};

		if has_more_work {
			let should_request = {
				let mut state = self.inner.state.borrow_mut();
				let should_request = !state.is_host_callback_scheduled;
				state.is_host_callback_scheduled = true;
				should_request
			};
			if should_request {
				self.request_host_callback();
			}
		}
		has_more_work
	}

	/// Drive host ticks until the queue is empty.
	pub fn run_until_idle(&self) {
		while self.has_pending_work() {
			self.perform_work_until_deadline();
		}
	}

	fn request_host_callback(&self) {
		let callback = self.inner.host_callback.borrow().clone();
		if let Some(callback) = callback {
			callback();
		}
	}

	fn peek(&self) -> Option<(TaskId, u64)> {
		let state = self.inner.state.borrow();
		state
			.task_queue
			.peek()
			.map(|Reverse(key)| (key.id, state.tasks[&key.id].expiration_time))
	}

	fn pop(&self, id: TaskId) {
		let mut state = self.inner.state.borrow_mut();
		if state.task_queue.peek().is_some_and(|Reverse(key)| key.id == id) {
			state.task_queue.pop();
			state.tasks.remove(&id);
		}
	}

	fn work_loop(&self, initial_time: u64) -> bool {
		let mut current_time = initial_time;

		while let Some((id, expiration_time)) = self.peek() {
			if expiration_time > current_time && self.should_yield() {
				// Unexpired work can wait for the next tick.
				break;
			}

			let callback = {
				let mut state = self.inner.state.borrow_mut();
				let task = state
					.tasks
					.get_mut(&id)
					.expect("heap entry without a task record");
				let callback = task.callback.take();
				let priority = task.priority;
				if callback.is_some() {
					state.current_task = Some(id);
					state.current_priority = priority;
				}
				callback
			};

			let Some(callback) = callback else {
				self.pop(id);
				continue;
			};

			let did_timeout = expiration_time <= current_time;
			trace!(task = id.get(), did_timeout, "running task");
			let outcome = callback(&TaskContext {
				scheduler: self,
				task: id,
				did_timeout,
			});
			current_time = self.now();

			match outcome {
				TaskOutcome::Yield(continuation) => {
					if let Some(task) = self.inner.state.borrow_mut().tasks.get_mut(&id) {
						task.callback = Some(continuation);
					}
					trace!(task = id.get(), "task yielded");
					return true;
				}
				TaskOutcome::Complete => {
					// A task that is no longer the minimum stays queued with no
					// callback and is discarded when it surfaces.
					self.pop(id);
				}
			}
		}

		self.inner.state.borrow().task_queue.peek().is_some()
	}
}

impl fmt::Debug for Scheduler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.borrow();
		f.debug_struct("Scheduler")
			.field("pending_tasks", &state.tasks.len())
			.field("current_task", &state.current_task)
			.field("frame_interval_ms", &self.inner.config.frame_interval_ms)
			.finish()
	}
}

/// Resets the per-tick flags even when a task panics.
struct WorkGuard<'a> {
	scheduler: &'a Scheduler,
}

impl Drop for WorkGuard<'_> {
	fn drop(&mut self) {
		if let Ok(mut state) = self.scheduler.inner.state.try_borrow_mut() {
			state.current_task = None;
			state.current_priority = Priority::Normal;
			state.is_performing_work = false;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::ManualClock;
	use rstest::rstest;
	use std::cell::Cell;

	#[rstest]
	fn test_task_ids_start_at_one_and_increase() {
		let scheduler = Scheduler::new(ManualClock::new());
		let first = scheduler.schedule_callback(Priority::Normal, |_| TaskOutcome::Complete);
		let second = scheduler.schedule_callback(Priority::Normal, |_| TaskOutcome::Complete);
		assert_eq!(first.get(), 1);
		assert_eq!(second.get(), 2);
	}

	#[rstest]
	fn test_host_callback_requested_once_per_tick() {
		let scheduler = Scheduler::new(ManualClock::new());
		let requests = Rc::new(Cell::new(0));
		let counter = requests.clone();
		scheduler.set_host_callback(move || counter.set(counter.get() + 1));

		scheduler.schedule_callback(Priority::Normal, |_| TaskOutcome::Complete);
		scheduler.schedule_callback(Priority::Low, |_| TaskOutcome::Complete);
		assert_eq!(requests.get(), 1);
		assert!(scheduler.is_host_callback_scheduled());

		assert!(!scheduler.perform_work_until_deadline());
		assert!(!scheduler.is_host_callback_scheduled());
		assert_eq!(requests.get(), 1);
	}

	#[rstest]
	fn test_current_priority_visible_inside_task() {
		let scheduler = Scheduler::new(ManualClock::new());
		let seen = Rc::new(Cell::new(None));
		let slot = seen.clone();
		scheduler.schedule_callback(Priority::UserBlocking, move |cx| {
			slot.set(Some(cx.scheduler().current_priority()));
			TaskOutcome::Complete
		});

		scheduler.run_until_idle();
		assert_eq!(seen.get(), Some(Priority::UserBlocking));
		assert_eq!(scheduler.current_priority(), Priority::Normal);
	}

	#[rstest]
	fn test_task_completed_below_top_is_discarded_later() {
		let scheduler = Scheduler::new(ManualClock::new());
		let ran = Rc::new(RefCell::new(Vec::new()));

		let log = ran.clone();
		scheduler.schedule_callback(Priority::Normal, move |cx| {
			log.borrow_mut().push("normal");
			let log = log.clone();
			// Schedules a more urgent task, so this one is no longer the heap minimum.
			cx.scheduler().schedule_callback(Priority::Immediate, move |_| {
				log.borrow_mut().push("immediate");
				TaskOutcome::Complete
			});
			TaskOutcome::Complete
		});

		scheduler.run_until_idle();
		assert_eq!(*ran.borrow(), vec!["normal", "immediate"]);
		assert!(!scheduler.has_pending_work());
	}
}
