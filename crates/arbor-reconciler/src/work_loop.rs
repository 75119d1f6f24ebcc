//! The work loop.
//!
//! A render walks the work-in-progress tree depth first. `begin_work` runs
//! on the way down and `complete_work` on the way up. The cursor lives in
//! [`WorkState`](crate::runtime::WorkState), so a time-sliced render can
//! return to the scheduler between any two fibers and resume at the same
//! fiber later.

use arbor_scheduler::{TaskContext, TaskOutcome};
use tracing::{debug, trace};

use crate::fiber::{FiberId, FiberProps, RootId};
use crate::runtime::{RuntimeInner, WorkState, root_task};

impl RuntimeInner {
	/// Body of a root's render task.
	pub(crate) fn perform_concurrent_work_on_root(
		&self,
		root: RootId,
		cx: &TaskContext<'_>,
	) -> TaskOutcome {
		let is_stale = self
			.roots
			.borrow()
			.get(root)
			.is_none_or(|fiber_root| fiber_root.callback_node != Some(cx.task_id()));
		if is_stale {
			trace!(?root, task = cx.task_id().get(), "stale root task");
			return TaskOutcome::Complete;
		}

		// Only one render may be in flight. Finish another root's suspended
		// render before starting on this one.
		let in_progress = self.work.borrow().root;
		if let Some(other) = in_progress
			&& other != root
		{
			debug!(?other, ?root, "finishing suspended render of another root");
			self.work_loop_sync();
			self.finish_concurrent_render(other);
		}

		if self.work.borrow().root != Some(root) {
			self.prepare_fresh_stack(root);
		}

		if self.config.time_slicing && !cx.did_timeout() {
			self.work_loop_concurrent(cx);
		} else {
			self.work_loop_sync();
		}

		if self.work.borrow().wip.is_some() {
			trace!(?root, "render yielded");
			return TaskOutcome::yield_with(root_task(self.weak.clone(), root));
		}

		self.finish_concurrent_render(root);
		TaskOutcome::Complete
	}

	/// Reset the cursor to a fresh copy of `root`'s current tree.
	fn prepare_fresh_stack(&self, root: RootId) {
		let current = {
			let mut roots = self.roots.borrow_mut();
			let fiber_root = &mut roots[root];
			fiber_root.has_pending_update = false;
			fiber_root.finished_work = None;
			fiber_root.current
		};

		trace!(fibers = ?self.concurrent_updates.fibers(), "updated fibers");
		self.concurrent_updates.finish_queueing();

		let wip = self
			.fibers
			.borrow_mut()
			.create_work_in_progress(current, FiberProps::None);
		*self.work.borrow_mut() = WorkState {
			root: Some(root),
			root_fiber: Some(wip),
			wip: Some(wip),
		};
		debug!(?root, "render started");
	}

	fn finish_concurrent_render(&self, root: RootId) {
		let finished = {
			let mut work = self.work.borrow_mut();
			work.root = None;
			work.wip = None;
			work.root_fiber.take()
		};
		let Some(finished) = finished else {
			return;
		};
		if let Some(fiber_root) = self.roots.borrow_mut().get_mut(root) {
			fiber_root.finished_work = Some(finished);
		}
		debug!(?root, "render finished");
		self.commit_root(root);
	}

	fn next_unit(&self) -> Option<FiberId> {
		self.work.borrow().wip
	}

	fn work_loop_sync(&self) {
		while let Some(unit) = self.next_unit() {
			self.perform_unit_of_work(unit);
		}
	}

	fn work_loop_concurrent(&self, cx: &TaskContext<'_>) {
		while let Some(unit) = self.next_unit() {
			if cx.should_yield() {
				break;
			}
			self.perform_unit_of_work(unit);
		}
	}

	fn perform_unit_of_work(&self, unit: FiberId) {
		let current = self.fibers.borrow()[unit].alternate;
		let next = self.begin_work(current, unit);
		{
			let mut fibers = self.fibers.borrow_mut();
			let fiber = &mut fibers[unit];
			fiber.memoized_props = fiber.pending_props.clone();
		}
		match next {
			Some(next) => self.work.borrow_mut().wip = Some(next),
			None => self.complete_unit_of_work(unit),
		}
	}

	/// Complete `unit` and its ancestors until one has a sibling left to begin.
	fn complete_unit_of_work(&self, unit: FiberId) {
		let mut completed = Some(unit);
		while let Some(fiber) = completed {
			let current = self.fibers.borrow()[fiber].alternate;
			self.complete_work(current, fiber);

			let (sibling, parent) = {
				let fibers = self.fibers.borrow();
				(fibers[fiber].sibling, fibers[fiber].parent)
			};
			if let Some(sibling) = sibling {
				self.work.borrow_mut().wip = Some(sibling);
				return;
			}
			completed = parent;
			self.work.borrow_mut().wip = parent;
		}
	}
}
