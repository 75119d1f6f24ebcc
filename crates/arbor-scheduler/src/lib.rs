//! Arbor Scheduler - cooperative, priority-ordered task scheduling
//!
//! This crate orders independent units of host-callback work by priority and
//! time-slices them, so no single unit blocks the host for longer than one
//! frame interval. It knows nothing about UI trees; the reconciler schedules
//! render work through it like any other task.
//!
//! ## Model
//!
//! - Every task gets an expiration time of `now + timeout(priority)`.
//! - Tasks sit in a binary min-heap ordered by `(expiration time, id)`, so
//!   equal priorities run first-in, first-out.
//! - A host tick runs tasks until the queue is empty or
//!   [`Scheduler::should_yield`] reports that the frame interval is used up.
//!   Expired tasks keep running regardless of the time slice.
//! - A task can return [`TaskOutcome::Yield`] with a continuation. The
//!   continuation replaces the task's callback and the tick ends.
//!
//! ## Example
//!
//! ```
//! use arbor_scheduler::{ManualClock, Priority, Scheduler, TaskOutcome};
//!
//! let clock = ManualClock::new();
//! let scheduler = Scheduler::new(clock.clone());
//!
//! scheduler.schedule_callback(Priority::Normal, move |cx| {
//!     if cx.should_yield() {
//!         return TaskOutcome::yield_with(|_| TaskOutcome::Complete);
//!     }
//!     TaskOutcome::Complete
//! });
//!
//! scheduler.run_until_idle();
//! assert!(!scheduler.has_pending_work());
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod priority;
pub mod scheduler;
pub mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_FRAME_INTERVAL_MS, SchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
pub use priority::Priority;
pub use scheduler::Scheduler;
pub use task::{TaskCallback, TaskContext, TaskId, TaskOutcome};
