//! Begin phase: render one fiber and reconcile its children.

use tracing::trace;

use crate::child_fiber::ChildReconciler;
use crate::fiber::{FiberArena, FiberId, FiberUpdateQueue, MemoizedState, WorkTag};
use crate::flags::FiberFlags;
use crate::hooks::RenderContext;
use crate::runtime::RuntimeInner;
use crate::update_queue::RootState;
use crate::vnode::{Children, ElementType};

/// Reconcile `children` into `wip`. Without a current counterpart the whole
/// subtree is new and placements are not tracked.
pub(crate) fn reconcile_children(
	fibers: &mut FiberArena,
	current: Option<FiberId>,
	wip: FiberId,
	children: &Children,
) {
	let child = match current {
		None => ChildReconciler::new(fibers, false).reconcile_child_fibers(wip, None, children),
		Some(current) => {
			let current_first_child = fibers[current].child;
			ChildReconciler::new(fibers, true).reconcile_child_fibers(wip, current_first_child, children)
		}
	};
	fibers[wip].child = child;
}

impl RuntimeInner {
	/// Returns the next fiber to begin, or `None` when `wip` is a leaf.
	pub(crate) fn begin_work(&self, current: Option<FiberId>, wip: FiberId) -> Option<FiberId> {
		let tag = self.fibers.borrow()[wip].tag;
		trace!(fiber = ?wip, ?tag, "begin work");
		match tag {
			WorkTag::Root => self.update_host_root(current, wip),
			WorkTag::HostComponent => self.update_host_component(current, wip),
			WorkTag::FunctionComponent | WorkTag::Indeterminate => {
				self.update_function_component(current, wip)
			}
			WorkTag::HostText => None,
		}
	}

	fn update_host_root(&self, current: Option<FiberId>, wip: FiberId) -> Option<FiberId> {
		let mut fibers = self.fibers.borrow_mut();
		let queue = match &fibers[wip].update_queue {
			FiberUpdateQueue::Root(queue) => queue.clone(),
			_ => panic!("root fiber without an update queue"),
		};
		let updates = queue.borrow_mut().drain();
		let state = match &fibers[wip].memoized_state {
			MemoizedState::Root(state) => state.clone(),
			_ => RootState::default(),
		};
		let next_state = state.merge(updates);
		let element = next_state.element.clone();
		fibers[wip].memoized_state = MemoizedState::Root(next_state);

		reconcile_children(&mut fibers, current, wip, &element);
		fibers[wip].child
	}

	fn update_host_component(&self, current: Option<FiberId>, wip: FiberId) -> Option<FiberId> {
		let mut fibers = self.fibers.borrow_mut();
		let props = fibers[wip]
			.pending_props
			.as_element()
			.cloned()
			.expect("host component without props");
		let tag = fibers[wip]
			.element_type
			.as_ref()
			.and_then(ElementType::host_tag)
			.expect("host component without a tag")
			.to_string();

		let (is_direct_text_child, was_direct_text_child) = {
			let host = self.host.borrow();
			let previous = current.and_then(|current| fibers[current].memoized_props.as_element());
			(
				host.is_text_only_child(&tag, &props),
				previous.is_some_and(|previous| host.is_text_only_child(&tag, previous)),
			)
		};

		// A text-only child is written as content by the host, not as a fiber.
		let next_children = if is_direct_text_child {
			Children::none()
		} else {
			if was_direct_text_child {
				fibers[wip].flags |= FiberFlags::CONTENT_RESET;
			}
			props.children().clone()
		};

		reconcile_children(&mut fibers, current, wip, &next_children);
		fibers[wip].child
	}

	fn update_function_component(&self, current: Option<FiberId>, wip: FiberId) -> Option<FiberId> {
		let (component, props, current_hooks) = {
			let fibers = self.fibers.borrow();
			let fiber = &fibers[wip];
			let component = match &fiber.element_type {
				Some(ElementType::Component(component)) => component.clone(),
				other => panic!("function fiber with element type {other:?}"),
			};
			let props = fiber
				.pending_props
				.as_element()
				.cloned()
				.expect("function component without props");
			let current_hooks = current.and_then(|current| match &fibers[current].memoized_state {
				MemoizedState::Hooks(hooks) => Some(hooks.clone()),
				_ => None,
			});
			(component, props, current_hooks)
		};

		trace!(fiber = ?wip, component = component.name(), mount = current_hooks.is_none(), "render component");
		let mut cx = RenderContext::new(self.weak.clone(), wip, current_hooks);
		let children = component.render(&props, &mut cx);
		let rendered = cx.finish();

		let mut fibers = self.fibers.borrow_mut();
		let fiber = &mut fibers[wip];
		fiber.tag = WorkTag::FunctionComponent;
		fiber.memoized_state = MemoizedState::Hooks(rendered.hooks);
		fiber.update_queue = FiberUpdateQueue::Effects(rendered.effects);
		fiber.flags |= rendered.flags;

		reconcile_children(&mut fibers, current, wip, &children);
		fibers[wip].child
	}
}
