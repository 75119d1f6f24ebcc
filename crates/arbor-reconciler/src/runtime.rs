//! The runtime: roots, scheduling and shared render state.
//!
//! A [`Runtime`] owns the fiber arena, the host renderer, and the scheduler
//! every root renders through. Updates from [`Root::render`] and from hook
//! setters end up in [`RuntimeInner::schedule_update_on_fiber`], which queues
//! at most one render task per root.
//!
//! Everything is single threaded. Interior state lives in `RefCell`s, and no
//! borrow is held while user code (components, reducers, effects, listeners)
//! runs, so user code may dispatch updates freely.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use arbor_scheduler::{Clock, Priority, Scheduler, SystemClock, TaskContext, TaskId, TaskOutcome};
use slotmap::SlotMap;
use tracing::{debug, trace, warn};

use crate::concurrent_updates::ConcurrentUpdates;
use crate::config::RuntimeConfig;
use crate::error::ArborResult;
use crate::events::EventRegistry;
use crate::fiber::{FiberArena, FiberId, FiberUpdateQueue, RootId, StateNode, WorkTag};
use crate::host::{HostHandle, HostRenderer};
use crate::props::Props;
use crate::root::Root;
use crate::update_queue::RootUpdate;
use crate::vnode::Children;

/// Bookkeeping of one root.
#[derive(Debug)]
pub(crate) struct FiberRoot {
	pub(crate) container: HostHandle,
	pub(crate) current: FiberId,
	pub(crate) finished_work: Option<FiberId>,
	/// Render task queued or running for this root.
	pub(crate) callback_node: Option<TaskId>,
	/// Updates arrived since the last render started.
	pub(crate) has_pending_update: bool,
	pub(crate) unmounted: bool,
}

/// Cursor of the render in flight.
#[derive(Debug, Default)]
pub(crate) struct WorkState {
	pub(crate) root: Option<RootId>,
	pub(crate) root_fiber: Option<FiberId>,
	pub(crate) wip: Option<FiberId>,
}

/// Fiber and live props of a host instance.
#[derive(Debug, Clone)]
pub(crate) struct InstanceRecord {
	pub(crate) fiber: FiberId,
	pub(crate) props: Props,
}

pub(crate) struct RuntimeInner {
	pub(crate) weak: Weak<RuntimeInner>,
	pub(crate) config: RuntimeConfig,
	pub(crate) scheduler: Scheduler,
	pub(crate) fibers: RefCell<FiberArena>,
	pub(crate) host: RefCell<Box<dyn HostRenderer>>,
	pub(crate) roots: RefCell<SlotMap<RootId, FiberRoot>>,
	pub(crate) concurrent_updates: ConcurrentUpdates,
	pub(crate) work: RefCell<WorkState>,
	pub(crate) instances: RefCell<HashMap<HostHandle, InstanceRecord>>,
	pub(crate) registry: EventRegistry,
	pub(crate) listening: RefCell<HashSet<HostHandle>>,
	pub(crate) update_priority: Cell<Priority>,
}

/// Task body rendering `root`.
pub(crate) fn root_task(
	runtime: Weak<RuntimeInner>,
	root: RootId,
) -> impl FnOnce(&TaskContext<'_>) -> TaskOutcome + 'static {
	move |cx| match runtime.upgrade() {
		Some(runtime) => runtime.perform_concurrent_work_on_root(root, cx),
		None => TaskOutcome::Complete,
	}
}

impl RuntimeInner {
	fn new(host: Box<dyn HostRenderer>, scheduler: Scheduler, config: RuntimeConfig) -> Rc<Self> {
		let update_priority = config.default_update_priority;
		Rc::new_cyclic(|weak| RuntimeInner {
			weak: weak.clone(),
			config,
			scheduler,
			fibers: RefCell::new(FiberArena::new()),
			host: RefCell::new(host),
			roots: RefCell::new(SlotMap::with_key()),
			concurrent_updates: ConcurrentUpdates::default(),
			work: RefCell::new(WorkState::default()),
			instances: RefCell::new(HashMap::new()),
			registry: EventRegistry::with_simple_events(),
			listening: RefCell::new(HashSet::new()),
			update_priority: Cell::new(update_priority),
		})
	}

	pub(crate) fn create_root(&self, container: HostHandle) -> RootId {
		let root = {
			let mut roots = self.roots.borrow_mut();
			let mut fibers = self.fibers.borrow_mut();
			roots.insert_with_key(|root| FiberRoot {
				container,
				current: fibers.create_host_root_fiber(root, container),
				finished_work: None,
				callback_node: None,
				has_pending_update: false,
				unmounted: false,
			})
		};
		debug!(?root, ?container, "created root");
		self.listen_to_all_supported_events(container);
		root
	}

	/// Queue a new description for `root` and schedule it.
	pub(crate) fn update_container(&self, root: RootId, element: Children) {
		let target = {
			let roots = self.roots.borrow();
			let Some(fiber_root) = roots.get(root) else {
				warn!(?root, "render on an unknown root");
				return;
			};
			if fiber_root.unmounted {
				warn!(?root, "render on an unmounted root is ignored");
				return;
			}
			let fibers = self.fibers.borrow();
			let current = fiber_root.current;
			let queue = match &fibers[current].update_queue {
				FiberUpdateQueue::Root(queue) => queue.clone(),
				_ => panic!("root fiber without an update queue"),
			};
			(current, queue)
		};

		let (fiber, queue) = target;
		self.concurrent_updates
			.enqueue_root(fiber, queue, RootUpdate { element });
		self.schedule_update_on_fiber(root);
	}

	pub(crate) fn unmount_root(&self, root: RootId) {
		self.update_container(root, Children::none());
		if let Some(fiber_root) = self.roots.borrow_mut().get_mut(root) {
			fiber_root.unmounted = true;
		}
		debug!(?root, "root unmounted");
	}

	/// Root owning `fiber`, found by walking `parent` links.
	pub(crate) fn get_root_for_updated_fiber(&self, fiber: FiberId) -> Option<RootId> {
		let fibers = self.fibers.borrow();
		let mut node = fiber;
		loop {
			let current = fibers.get(node)?;
			match current.parent {
				Some(parent) => node = parent,
				None => {
					return match (current.tag, current.state_node) {
						(WorkTag::Root, StateNode::Root { id, .. }) => Some(id),
						_ => None,
					};
				}
			}
		}
	}

	pub(crate) fn schedule_update_on_fiber(&self, root: RootId) {
		match self.roots.borrow_mut().get_mut(root) {
			Some(fiber_root) => fiber_root.has_pending_update = true,
			None => return,
		}
		self.ensure_root_is_scheduled(root);
	}

	/// Queue a render task for `root` unless one is already queued or running.
	pub(crate) fn ensure_root_is_scheduled(&self, root: RootId) {
		let existing = match self.roots.borrow().get(root) {
			Some(fiber_root) => fiber_root.callback_node,
			None => return,
		};
		if let Some(task) = existing {
			trace!(?root, task = task.get(), "root already scheduled");
			return;
		}

		let priority = self.update_priority.get();
		let task = self
			.scheduler
			.schedule_callback(priority, root_task(self.weak.clone(), root));
		if let Some(fiber_root) = self.roots.borrow_mut().get_mut(root) {
			fiber_root.callback_node = Some(task);
		}
		debug!(?root, task = task.get(), ?priority, "scheduled root");
	}

	pub(crate) fn container_of(&self, root: RootId) -> Option<HostHandle> {
		self.roots.borrow().get(root).map(|fiber_root| fiber_root.container)
	}

	pub(crate) fn is_unmounted(&self, root: RootId) -> bool {
		self.roots
			.borrow()
			.get(root)
			.is_none_or(|fiber_root| fiber_root.unmounted)
	}

	pub(crate) fn current_fiber(&self, root: RootId) -> Option<FiberId> {
		self.roots.borrow().get(root).map(|fiber_root| fiber_root.current)
	}
}

/// Renders one or more roots into a host.
///
/// Cloning is cheap; clones share the same runtime.
///
/// ## Example
///
/// ```
/// use arbor_reconciler::host::memory::MemoryHost;
/// use arbor_reconciler::vnode::VNode;
/// use arbor_reconciler::Runtime;
/// use arbor_scheduler::{ManualClock, Scheduler};
///
/// let host = MemoryHost::new();
/// let container = host.create_container();
/// let runtime = Runtime::new(host.clone(), Scheduler::new(ManualClock::new()));
///
/// let root = runtime.create_root(container);
/// root.render(VNode::element("p").text("hello").build());
/// runtime.flush();
///
/// assert_eq!(host.inner_html(container), "<p>hello</p>");
/// ```
#[derive(Clone)]
pub struct Runtime {
	inner: Rc<RuntimeInner>,
}

impl Runtime {
	/// A runtime with the default configuration and the given scheduler.
	pub fn new(host: impl HostRenderer + 'static, scheduler: Scheduler) -> Self {
		Self {
			inner: RuntimeInner::new(Box::new(host), scheduler, RuntimeConfig::default()),
		}
	}

	/// Start configuring a runtime.
	pub fn builder(host: impl HostRenderer + 'static) -> RuntimeBuilder {
		RuntimeBuilder {
			host: Box::new(host),
			clock: None,
			scheduler: None,
			config: RuntimeConfig::default(),
		}
	}

	/// Create a root rendering into `container` and attach the root-level
	/// event listeners to it.
	pub fn create_root(&self, container: HostHandle) -> Root {
		let id = self.inner.create_root(container);
		Root::new(id, self.inner.clone())
	}

	/// The scheduler render tasks run on.
	pub fn scheduler(&self) -> &Scheduler {
		&self.inner.scheduler
	}

	/// Active configuration.
	pub fn config(&self) -> &RuntimeConfig {
		&self.inner.config
	}

	/// Run scheduled work until nothing is left.
	pub fn flush(&self) {
		self.inner.scheduler.run_until_idle();
	}

	/// Run one scheduler tick. Returns whether work remains.
	pub fn tick(&self) -> bool {
		self.inner.scheduler.perform_work_until_deadline()
	}

	/// Whether a render has started and not yet committed.
	pub fn is_rendering(&self) -> bool {
		self.inner.work.borrow().root.is_some()
	}

	/// Number of live fibers across all roots.
	pub fn fiber_count(&self) -> usize {
		self.inner.fibers.borrow().len()
	}

	/// Fiber recorded for a host instance.
	///
	/// This is the fiber that created the instance or last committed a change
	/// to it. After a re-render that left the instance untouched it may be the
	/// alternate of the committed fiber. Both fibers own the same instance.
	pub fn fiber_for_instance(&self, instance: HostHandle) -> Option<FiberId> {
		self.inner
			.instances
			.borrow()
			.get(&instance)
			.map(|record| record.fiber)
	}

	/// Read the fiber arena.
	///
	/// Must not be called from inside a component or while rendering.
	pub fn with_fibers<R>(&self, inspect: impl FnOnce(&FiberArena) -> R) -> R {
		inspect(&self.inner.fibers.borrow())
	}
}

impl fmt::Debug for Runtime {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Runtime")
			.field("roots", &self.inner.roots.borrow().len())
			.field("fibers", &self.inner.fibers.borrow().len())
			.field("scheduler", &self.inner.scheduler)
			.finish()
	}
}

/// Builder for [`Runtime`].
///
/// ## Example
///
/// ```
/// use arbor_reconciler::config::RuntimeConfig;
/// use arbor_reconciler::host::memory::MemoryHost;
/// use arbor_reconciler::Runtime;
/// use arbor_scheduler::ManualClock;
///
/// let runtime = Runtime::builder(MemoryHost::new())
///     .clock(ManualClock::new())
///     .config(RuntimeConfig::default().with_time_slicing(false))
///     .build()
///     .unwrap();
/// assert!(!runtime.config().time_slicing);
/// ```
pub struct RuntimeBuilder {
	host: Box<dyn HostRenderer>,
	clock: Option<Box<dyn Clock>>,
	scheduler: Option<Scheduler>,
	config: RuntimeConfig,
}

impl RuntimeBuilder {
	/// Time source for the scheduler the builder creates.
	pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
		self.clock = Some(Box::new(clock));
		self
	}

	/// Use an existing scheduler instead of creating one.
	pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
		self.scheduler = Some(scheduler);
		self
	}

	/// Runtime settings.
	pub fn config(mut self, config: RuntimeConfig) -> Self {
		self.config = config;
		self
	}

	/// Validate the settings and create the runtime.
	pub fn build(self) -> ArborResult<Runtime> {
		self.config.validate()?;
		let scheduler = match self.scheduler {
			Some(scheduler) => scheduler,
			None => {
				let clock = self
					.clock
					.unwrap_or_else(|| Box::new(SystemClock::new()));
				Scheduler::with_config(clock, self.config.scheduler.clone())?
			}
		};
		Ok(Runtime {
			inner: RuntimeInner::new(self.host, scheduler, self.config),
		})
	}
}

impl fmt::Debug for RuntimeBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RuntimeBuilder")
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::host::memory::MemoryHost;
	use arbor_scheduler::ManualClock;
	use rstest::rstest;

	#[rstest]
	fn test_builder_rejects_invalid_config() {
		let mut config = RuntimeConfig::default();
		config.scheduler.frame_interval_ms = 0;
		let result = Runtime::builder(MemoryHost::new())
			.clock(ManualClock::new())
			.config(config)
			.build();
		assert!(result.is_err());
	}

	#[rstest]
	fn test_render_schedules_one_task_per_root() {
		let host = MemoryHost::new();
		let container = host.create_container();
		let runtime = Runtime::new(host, Scheduler::new(ManualClock::new()));
		let root = runtime.create_root(container);

		root.render("a");
		root.render("b");
		root.render("c");

		assert_eq!(runtime.scheduler().pending_tasks(), 1);
	}

	#[rstest]
	fn test_create_root_registers_listeners_once() {
		let host = MemoryHost::new();
		let container = host.create_container();
		let runtime = Runtime::new(host.clone(), Scheduler::new(ManualClock::new()));

		runtime.create_root(container);
		let registered = host.listener_count(container);
		runtime.create_root(container);

		assert!(registered > 0);
		assert_eq!(host.listener_count(container), registered);
	}
}
